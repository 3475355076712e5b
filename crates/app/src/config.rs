use budget_client::Settings;
use clap::{Args, Parser, Subcommand};
use engine::Granularity;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/budget_sync.toml";
const ENV_PREFIX: &str = "BUDGET_SYNC";

#[derive(Debug, Parser)]
#[command(name = "budget-sync", disable_version_flag = true)]
pub struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    pub command: Command,
}

/// Connection overrides. The API key and encryption password are never read
/// from the command line.
#[derive(Debug, Default, Args)]
struct Overrides {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override server base URL (e.g. https://budget.example:5007).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override budget sync id.
    #[arg(long, global = true)]
    sync_id: Option<String>,
    /// Use generated demo data instead of a server.
    #[arg(long, global = true)]
    demo: bool,
    /// Override currency code (e.g. EUR).
    #[arg(long, global = true)]
    currency: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long, global = true)]
    timezone: Option<String>,
    /// Write diagnostics to this file instead of keeping them in memory.
    #[arg(long, global = true)]
    log_file: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Spend today, this month and last month, with daily and category buckets.
    Dashboard {
        /// Print the dashboard as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Accounts with their current balances.
    Accounts,
    /// Budget month figures, rechecked against their categories.
    Budget {
        /// Month as yyyy-MM; defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Transactions inside a recent window.
    Recent {
        #[arg(long, default_value = "day")]
        granularity: Granularity,
        #[arg(long, default_value_t = 7)]
        count: u32,
    },
    /// Inspect or clear the diagnostic log.
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum LogAction {
    Show,
    Clear,
}

pub fn load() -> Result<(Settings, Command)> {
    let cli = Cli::parse();
    let settings = resolve(&cli.overrides)?;
    Ok((settings, cli.command))
}

fn resolve(overrides: &Overrides) -> Result<Settings> {
    let config_path = overrides.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &overrides.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(sync_id) = &overrides.sync_id {
        settings.sync_id = sync_id.clone();
    }
    if overrides.demo {
        settings.demo_mode = true;
    }
    if let Some(currency) = &overrides.currency {
        settings.currency_code = currency.clone();
    }
    if let Some(timezone) = &overrides.timezone {
        settings.timezone = timezone.clone();
    }
    if let Some(log_file) = &overrides.log_file {
        settings.log_file = Some(log_file.clone());
    }
    if let Some(log_level) = &overrides.log_level {
        settings.log_level = log_level.clone();
    }

    Ok(settings)
}
