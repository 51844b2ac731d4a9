use std::fmt;

#[derive(Debug)]
pub enum SyncError {
    /// Request failed or returned a non-2xx status. Never fatal: the next
    /// poll tick or user retry covers it.
    Network(String),
    /// The server processed the request but declined it (`success: false`),
    /// e.g. logging a habit entry that already exists. The optimistic
    /// visual must be rolled back.
    Rejected,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Network(message) => write!(f, "network failure: {message}"),
            SyncError::Rejected => write!(f, "server rejected the request"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err.to_string())
    }
}
