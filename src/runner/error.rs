use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the remote runner.
///
/// `Transport` and `Status` are transient; `Malformed` means the runner answered
/// with something that did not validate. The poll loop treats all three alike.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint}: runner answered HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
    #[error("{endpoint}: malformed response: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
    #[error("invalid runner URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl RunnerError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, RunnerError::Malformed { .. })
    }
}
