use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures surfaced by a budget backend.
///
/// None of the variants carry the server base URL: transport errors are
/// stripped of their URL and HTTP bodies are redacted before they get here.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("http error {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl ClientError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }

    /// Status code for HTTP failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
