use std::fmt;

use serde::Deserialize;

/// Connection and session settings.
///
/// Secrets (`api_key`, `encryption_password`) are masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    /// Budget sync identifier; every request path is scoped under it.
    pub sync_id: String,
    pub encryption_password: Option<String>,
    pub demo_mode: bool,
    pub currency_code: String,
    /// IANA timezone used to decide what "today" is.
    pub timezone: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub log_file: Option<String>,
    pub log_max_bytes: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            sync_id: String::new(),
            encryption_password: None,
            demo_mode: false,
            currency_code: "EUR".to_string(),
            timezone: "UTC".to_string(),
            request_timeout_secs: 30,
            max_concurrent_fetches: 4,
            log_file: None,
            log_max_bytes: 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Encryption password, if one is set and non-blank.
    pub fn encryption_password(&self) -> Option<&str> {
        self.encryption_password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |set: bool| if set { "<set>" } else { "<unset>" };
        f.debug_struct("Settings")
            .field("base_url", &masked(!self.base_url.is_empty()))
            .field("api_key", &masked(!self.api_key.is_empty()))
            .field("sync_id", &self.sync_id)
            .field(
                "encryption_password",
                &masked(self.encryption_password().is_some()),
            )
            .field("demo_mode", &self.demo_mode)
            .field("currency_code", &self.currency_code)
            .field("timezone", &self.timezone)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("log_file", &self.log_file)
            .field("log_max_bytes", &self.log_max_bytes)
            .field("log_level", &self.log_level)
            .finish()
    }
}
