//! Error types for register transport operations.
//!
//! A transport failure is distinct from a malformed payload: the former is
//! raised by whatever carries register payloads to the firmware, the latter
//! by the codec. Both surface as [`linecard_core::Error`] once they leave
//! this crate.

use linecard_protocol::RegisterId;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors raised by a [`RegisterTransport`](crate::transport::RegisterTransport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Transport is not connected or has been disconnected.
    #[error("Transport disconnected: {device}")]
    Disconnected { device: String },

    /// Register access did not complete in time.
    #[error("{register} timed out after {duration_ms}ms")]
    Timeout {
        register: RegisterId,
        duration_ms: u64,
    },

    /// Firmware refused the register access.
    #[error("{register} rejected by firmware: {reason}")]
    Rejected {
        register: RegisterId,
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(register: RegisterId, duration_ms: u64) -> Self {
        Self::Timeout {
            register,
            duration_ms,
        }
    }

    /// Create a new rejection error.
    pub fn rejected(register: RegisterId, reason: impl Into<String>) -> Self {
        Self::Rejected {
            register,
            reason: reason.into(),
        }
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<TransportError> for linecard_core::Error {
    fn from(error: TransportError) -> Self {
        linecard_core::Error::TransportError(error.to_string())
    }
}
