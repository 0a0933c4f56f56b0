//! Line card registry configuration.
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! document is a valid configuration.
//!
//! # TOML Example
//!
//! ```toml
//! transport_timeout_ms = 2000
//! event_queue_depth = 64
//! poll_interval_ms = 1000
//! ```

use linecard_core::constants::{DEFAULT_EVENT_QUEUE_DEPTH, DEFAULT_TRANSPORT_TIMEOUT_MS};
use linecard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for a [`LineCards`](crate::manager::LineCards) registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineCardsConfig {
    /// Deadline for a single register access, in milliseconds.
    ///
    /// Applied by [`TimeoutTransport`](crate::transport::TimeoutTransport).
    pub transport_timeout_ms: u64,

    /// Capacity of the asynchronous status event queue.
    pub event_queue_depth: usize,

    /// Period of the optional status poller, in milliseconds.
    ///
    /// `None` relies on firmware events alone.
    pub poll_interval_ms: Option<u64>,
}

impl Default for LineCardsConfig {
    fn default() -> Self {
        Self {
            transport_timeout_ms: DEFAULT_TRANSPORT_TIMEOUT_MS,
            event_queue_depth: DEFAULT_EVENT_QUEUE_DEPTH,
            poll_interval_ms: None,
        }
    }
}

impl LineCardsConfig {
    /// Parse and validate a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is malformed or fails
    /// validation.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::Config(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or `Error::Config` if
    /// its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - `transport_timeout_ms` is zero
    /// - `event_queue_depth` is zero
    /// - `poll_interval_ms` is zero
    pub fn validate(&self) -> Result<()> {
        if self.transport_timeout_ms == 0 {
            return Err(Error::Config(
                "transport_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_queue_depth == 0 {
            return Err(Error::Config(
                "event_queue_depth must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == Some(0) {
            return Err(Error::Config(
                "poll_interval_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Register access deadline as a [`Duration`].
    #[must_use]
    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.transport_timeout_ms)
    }

    /// Poll period as a [`Duration`], if polling is enabled.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}
