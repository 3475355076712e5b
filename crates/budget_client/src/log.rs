//! Diagnostic log that users can share without leaking their server.
//!
//! Records are written as JSON lines (`{timestamp, level, context, message,
//! metadata}`) and mirrored to `tracing`. Every string goes through a
//! [`Redactor`] first, so the configured base URL and credentials never reach
//! the sink. Writes are serialized behind a mutex.

use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::Settings;

pub const SERVER_PLACEHOLDER: &str = "<server-url>";
pub const API_KEY_PLACEHOLDER: &str = "<api-key>";
pub const SECRET_PLACEHOLDER: &str = "<redacted>";

const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Replaces known secret substrings with placeholders.
#[derive(Clone, Debug, Default)]
pub struct Redactor {
    secrets: Vec<(String, &'static str)>,
    hosts: Vec<String>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Blank values are ignored.
    pub fn secret(mut self, value: &str, placeholder: &'static str) -> Self {
        let value = value.trim();
        if value.is_empty() || self.secrets.iter().any(|(s, _)| s == value) {
            return self;
        }
        self.secrets.push((value.to_string(), placeholder));
        // Longest first, so the full URL is replaced before its host.
        self.secrets.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Register a server host. Unlike [`Redactor::secret`] it only matches
    /// where it is not part of a longer name, so `nas` leaves `dynasty` alone.
    pub fn host(mut self, host: &str) -> Self {
        let host = host.trim();
        if !host.is_empty() && !self.hosts.iter().any(|h| h == host) {
            self.hosts.push(host.to_string());
            self.hosts.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self
    }

    /// Base URL (as typed and as normalized), its host, the API key and the
    /// encryption password.
    pub fn for_settings(settings: &Settings) -> Self {
        let raw = settings.base_url.trim();
        // Without the trailing slash, so "<server-url>/v1/..." keeps its path.
        let mut redactor = Self::new()
            .secret(raw.trim_end_matches('/'), SERVER_PLACEHOLDER)
            .secret(&settings.api_key, API_KEY_PLACEHOLDER);
        if let Ok(url) = Url::parse(raw) {
            redactor = redactor.secret(url.as_str().trim_end_matches('/'), SERVER_PLACEHOLDER);
            if let Some(host) = url.host_str() {
                redactor = redactor.host(host);
            }
        }
        if let Some(password) = settings.encryption_password() {
            redactor = redactor.secret(password, SECRET_PLACEHOLDER);
        }
        redactor
    }

    pub fn redact(&self, text: &str) -> String {
        let text = self
            .secrets
            .iter()
            .fold(text.to_string(), |acc, (secret, placeholder)| {
                acc.replace(secret.as_str(), placeholder)
            });
        self.hosts
            .iter()
            .fold(text, |acc, host| replace_host(&acc, host))
    }
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.'
}

/// Replace `host` wherever it is not glued to other host characters.
fn replace_host(text: &str, host: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find(host) {
        let (head, tail) = rest.split_at(at);
        out.push_str(head);
        let after = &tail[host.len()..];
        let bounded = !out.chars().next_back().is_some_and(is_host_char)
            && !after.chars().next().is_some_and(is_host_char);
        out.push_str(if bounded { SERVER_PLACEHOLDER } else { host });
        rest = after;
    }
    out.push_str(rest);
    out
}

#[derive(Debug)]
enum Sink {
    File(PathBuf),
    Memory(String),
}

#[derive(Debug)]
pub struct DiagnosticLog {
    redactor: Redactor,
    max_bytes: u64,
    sink: Mutex<Sink>,
}

impl DiagnosticLog {
    /// Append to `path`, rotating to `<path>.1` past the size threshold.
    pub fn to_file(path: impl Into<PathBuf>, redactor: Redactor) -> Self {
        Self {
            redactor,
            max_bytes: DEFAULT_MAX_BYTES,
            sink: Mutex::new(Sink::File(path.into())),
        }
    }

    /// Keep records in memory, dropping the oldest past the size threshold.
    pub fn in_memory(redactor: Redactor) -> Self {
        Self {
            redactor,
            max_bytes: DEFAULT_MAX_BYTES,
            sink: Mutex::new(Sink::Memory(String::new())),
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes.max(1);
        self
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn log<I>(&self, level: Level, context: Option<&str>, message: &str, metadata: I)
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            context: context.map(|c| self.redactor.redact(c)),
            message: self.redactor.redact(message),
            metadata: metadata
                .into_iter()
                .map(|(key, value)| (key.to_string(), self.redactor.redact(&value)))
                .collect(),
        };

        let context = record.context.as_deref().unwrap_or("-");
        match level {
            Level::Info => tracing::info!(context, "{}", record.message),
            Level::Warning => tracing::warn!(context, "{}", record.message),
            Level::Error => tracing::error!(context, "{}", record.message),
        }

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("failed to serialize diagnostic record: {err}");
                return;
            }
        };
        if let Err(err) = self.append(&line) {
            tracing::warn!("failed to write diagnostic log: {err}");
        }
    }

    pub fn info<I>(&self, context: &str, message: &str, metadata: I)
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.log(Level::Info, Some(context), message, metadata);
    }

    pub fn warning<I>(&self, context: &str, message: &str, metadata: I)
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.log(Level::Warning, Some(context), message, metadata);
    }

    pub fn error<I>(&self, context: &str, message: &str, metadata: I)
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.log(Level::Error, Some(context), message, metadata);
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let incoming = line.len() as u64 + 1;
        match &mut *sink {
            Sink::File(path) => {
                let current = match fs::metadata(&*path) {
                    Ok(meta) => meta.len(),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
                    Err(err) => return Err(err),
                };
                if current > 0 && current + incoming > self.max_bytes {
                    fs::rename(&*path, backup_path(path))?;
                }
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let mut file = OpenOptions::new().create(true).append(true).open(&*path)?;
                writeln!(file, "{line}")?;
                file.flush()
            }
            Sink::Memory(buffer) => {
                while !buffer.is_empty() && buffer.len() as u64 + incoming > self.max_bytes {
                    match buffer.find('\n') {
                        Some(end) => {
                            buffer.drain(..=end);
                        }
                        None => buffer.clear(),
                    }
                }
                buffer.push_str(line);
                buffer.push('\n');
                Ok(())
            }
        }
    }

    /// Accumulated log text (current file only, not the rotated backup).
    pub fn contents(&self) -> io::Result<String> {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match &*sink {
            Sink::File(path) => match fs::read_to_string(path) {
                Ok(content) => Ok(content),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
                Err(err) => Err(err),
            },
            Sink::Memory(buffer) => Ok(buffer.clone()),
        }
    }

    /// Parse the accumulated text back into records, skipping blank lines.
    pub fn records(&self) -> io::Result<Vec<LogRecord>> {
        self.contents()?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(io::Error::from))
            .collect()
    }

    /// Drop every record, including the rotated backup.
    pub fn clear(&self) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *sink {
            Sink::File(path) => {
                for target in [path.clone(), backup_path(path)] {
                    match fs::remove_file(&target) {
                        Ok(()) => {}
                        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(())
            }
            Sink::Memory(buffer) => {
                buffer.clear();
                Ok(())
            }
        }
    }
}

fn backup_path(path: &std::path::Path) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".1");
    PathBuf::from(backup)
}
