mod config;
mod error;
mod report;

use std::sync::Arc;

use api_types::MonthKey;
use budget_client::{BudgetApi, DiagnosticLog, Orchestrator, Redactor, Settings};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use engine::{Currency, Dashboard, EngineError, filter_window, window_start};

use crate::{
    config::{Command, LogAction},
    error::{AppError, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    let (settings, command) = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budget_sync={level},budget_client={level},engine={level}",
            level = settings.log_level
        ))
        .init();

    let log = Arc::new(diagnostic_log(&settings));

    if let Command::Log { action } = command {
        return match action {
            LogAction::Show => {
                let contents = log.contents()?;
                if contents.is_empty() {
                    println!("Diagnostic log is empty.");
                } else {
                    print!("{contents}");
                }
                Ok(())
            }
            LogAction::Clear => {
                log.clear()?;
                println!("Diagnostic log cleared.");
                Ok(())
            }
        };
    }

    let currency = Currency::try_from(settings.currency_code.as_str())?;
    let today = today_in(&settings.timezone)?;
    let api = budget_client::connect(&settings, Arc::clone(&log))?;
    let orchestrator = Orchestrator::new(api, Arc::clone(&log), settings.max_concurrent_fetches);
    tracing::debug!(?settings, %today, "session ready");

    match command {
        Command::Dashboard { json } => {
            // Last month is part of the dashboard, so fetch from its first day.
            let since = MonthKey::of(today).previous().first_day();
            let snapshot = orchestrator.load_snapshot(since).await?;
            let dashboard = Dashboard::build(&snapshot, today);
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                println!("{}", report::dashboard(&dashboard, &snapshot, currency));
            }
        }
        Command::Accounts => {
            let accounts = orchestrator.api().fetch_accounts().await?;
            let rows = orchestrator.account_balances(&accounts, None).await;
            println!("{}", report::accounts(&rows, currency));
        }
        Command::Budget { month } => {
            let month = match month {
                Some(raw) => raw.parse::<MonthKey>().map_err(EngineError::from)?,
                None => MonthKey::of(today),
            };
            let view = orchestrator.budget_month(month).await?;
            println!("{}", report::budget(&view, currency));
        }
        Command::Recent { granularity, count } => {
            let snapshot = orchestrator
                .load_snapshot(window_start(today, granularity, count))
                .await?;
            let recent = filter_window(&snapshot.transactions, today, granularity, count);
            println!("{}", report::transactions(&recent, &snapshot, currency));
        }
        Command::Log { .. } => {}
    }

    Ok(())
}

fn diagnostic_log(settings: &Settings) -> DiagnosticLog {
    let redactor = Redactor::for_settings(settings);
    match &settings.log_file {
        Some(path) => DiagnosticLog::to_file(path, redactor),
        None => DiagnosticLog::in_memory(redactor),
    }
    .with_max_bytes(settings.log_max_bytes)
}

fn today_in(timezone: &str) -> Result<NaiveDate> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| AppError::Timezone(timezone.to_string()))?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}
