use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a single transfer can fail. All of them are recorded as a zero
/// result for the phase; none of them abort the measurement.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferError {
    /// Connection refused, DNS failure, timeout, or a body that broke off mid-transfer
    #[error("network failure: {0}")]
    Network(String),
    /// The server answered with a non-success status
    #[error("server responded with status {0}")]
    Server(u16),
    /// The download payload is not deployed on the server
    #[error("download resource missing at {0}")]
    ResourceMissing(String),
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransferError::Server(status.as_u16()),
            None => TransferError::Network(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequencerError {
    #[error("a measurement is already running")]
    Busy,
}
