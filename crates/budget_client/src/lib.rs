//! Backends for a budget server, and the fan-out logic on top of them.
//!
//! [`connect`] picks the live HTTP backend or the offline demo one from
//! [`Settings`]; everything else talks to the returned [`BudgetApi`].

use std::sync::Arc;

pub use api::BudgetApi;
pub use demo::{DemoClient, DemoClientBuilder};
pub use error::{ClientError, Result};
pub use live::{BODY_LOG_LIMIT, CreateFlags, LiveClient};
pub use log::{DiagnosticLog, Level, LogRecord, Redactor};
pub use orchestrator::{AccountBalance, BudgetMonthView, Orchestrator};
pub use settings::Settings;

mod api;
mod demo;
mod error;
mod live;
pub mod log;
mod orchestrator;
mod settings;

/// Backend selected by `settings.demo_mode`. Live settings are validated here,
/// before any request is made.
pub fn connect(settings: &Settings, log: Arc<DiagnosticLog>) -> Result<Arc<dyn BudgetApi>> {
    if settings.demo_mode {
        log.info("connect", "using demo backend", []);
        return Ok(Arc::new(DemoClient::builder().build()));
    }

    let client = LiveClient::new(settings, Arc::clone(&log))?;
    log.info(
        "connect",
        "using live backend",
        [
            ("server", settings.base_url.clone()),
            ("sync_id", settings.sync_id.clone()),
        ],
    );
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_mode_needs_no_connection_settings() {
        let settings = Settings {
            demo_mode: true,
            ..Settings::default()
        };
        let log = Arc::new(DiagnosticLog::in_memory(Redactor::new()));
        assert!(connect(&settings, log).is_ok());
    }

    #[test]
    fn live_mode_rejects_missing_server() {
        let log = Arc::new(DiagnosticLog::in_memory(Redactor::new()));
        let err = connect(&Settings::default(), log).err();
        assert!(matches!(err, Some(ClientError::Configuration(_))));
    }

    #[test]
    fn connect_log_hides_server_url() {
        let settings = Settings {
            base_url: "https://budget.home.example:5007".to_string(),
            api_key: "key".to_string(),
            sync_id: "sync".to_string(),
            ..Settings::default()
        };
        let log = Arc::new(DiagnosticLog::in_memory(Redactor::for_settings(&settings)));
        connect(&settings, Arc::clone(&log)).unwrap();

        let contents = log.contents().unwrap();
        assert!(contents.contains("<server-url>"));
        assert!(!contents.contains("budget.home.example"));
    }
}
