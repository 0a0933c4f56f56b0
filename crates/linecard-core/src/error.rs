use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Slot errors
    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    // Register I/O errors
    #[error("Transport error: {0}")]
    TransportError(String),

    // Resource errors
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    // Protocol errors
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    // Lifecycle errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a later status report can retry the failed operation.
    ///
    /// Transport failures leave the affected slot dimension untouched, so the
    /// next delivery of the same status recomputes the same diff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
