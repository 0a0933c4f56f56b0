//! Register transport abstraction.
//!
//! A [`RegisterTransport`] moves raw register payloads between the host and
//! the management firmware. Everything above it works in terms of typed
//! registers; the helpers [`query_register`] and [`write_register`] do the
//! encoding on the way out and the decoding on the way back.
//!
//! The trait uses native `async fn` in traits (RPITIT) with an explicit
//! `Send` bound on the returned futures so that processing passes can run
//! on Tokio worker tasks.
//!
//! # Examples
//!
//! ```
//! use linecard_hardware::mock::MockFirmware;
//! use linecard_hardware::transport::query_register;
//! use linecard_protocol::{Capability, CapabilityRequest};
//!
//! #[tokio::main]
//! async fn main() -> linecard_core::Result<()> {
//!     let (firmware, _handle) = MockFirmware::new(4);
//!
//!     let capability: Capability =
//!         query_register(&firmware, CapabilityRequest::main_board()).await?;
//!     assert_eq!(capability.num_of_slots, 4);
//!     Ok(())
//! }
//! ```

use crate::config::LineCardsConfig;
use crate::error::{TransportError, TransportResult};
use bytes::Bytes;
use linecard_core::Result;
use linecard_protocol::{Register, RegisterId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Carrier of register payloads to and from the management firmware.
///
/// Payloads are exactly [`RegisterId::payload_len`] bytes on the way out.
/// Query responses are the firmware's copy of the register, which echoes
/// the request's index fields.
pub trait RegisterTransport: Send + Sync + 'static {
    /// Send a query and return the firmware's filled-in payload.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the firmware cannot be reached or
    /// refuses the access.
    fn query(
        &self,
        register: RegisterId,
        payload: Bytes,
    ) -> impl Future<Output = TransportResult<Bytes>> + Send;

    /// Write a register payload.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the firmware cannot be reached or
    /// refuses the access.
    fn write(
        &self,
        register: RegisterId,
        payload: Bytes,
    ) -> impl Future<Output = TransportResult<()>> + Send;
}

impl<T: RegisterTransport> RegisterTransport for Arc<T> {
    async fn query(&self, register: RegisterId, payload: Bytes) -> TransportResult<Bytes> {
        (**self).query(register, payload).await
    }

    async fn write(&self, register: RegisterId, payload: Bytes) -> TransportResult<()> {
        (**self).write(register, payload).await
    }
}

/// Query a register and decode the response.
///
/// # Errors
///
/// Returns `Error::TransportError` if the transport fails, or
/// `Error::ProtocolMismatch` if the response cannot be decoded.
pub async fn query_register<T, Req, Resp>(transport: &T, request: Req) -> Result<Resp>
where
    T: RegisterTransport,
    Req: Register,
    Resp: Register,
{
    debug_assert_eq!(Req::ID, Resp::ID);
    let payload = transport.query(Req::ID, request.encode()).await?;
    Resp::decode(&payload)
}

/// Encode and write a register.
///
/// # Errors
///
/// Returns `Error::TransportError` if the transport fails.
pub async fn write_register<T, Req>(transport: &T, request: Req) -> Result<()>
where
    T: RegisterTransport,
    Req: Register,
{
    transport.write(Req::ID, request.encode()).await?;
    Ok(())
}

/// Transport wrapper bounding every register access with a deadline.
///
/// An access that does not complete in time fails with
/// [`TransportError::Timeout`], which keeps `pre_fini` from waiting forever
/// on a processing pass stuck behind an unresponsive firmware.
#[derive(Debug)]
pub struct TimeoutTransport<T> {
    inner: T,
    timeout: Duration,
}

impl<T: RegisterTransport> TimeoutTransport<T> {
    /// Wrap `inner` with the given per-access timeout.
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wrap `inner` with the timeout configured in `config`.
    pub fn from_config(inner: T, config: &LineCardsConfig) -> Self {
        Self::new(inner, config.transport_timeout())
    }

    /// Get the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl<T: RegisterTransport> RegisterTransport for TimeoutTransport<T> {
    async fn query(&self, register: RegisterId, payload: Bytes) -> TransportResult<Bytes> {
        tokio::time::timeout(self.timeout, self.inner.query(register, payload))
            .await
            .map_err(|_| TransportError::timeout(register, self.timeout_ms()))?
    }

    async fn write(&self, register: RegisterId, payload: Bytes) -> TransportResult<()> {
        tokio::time::timeout(self.timeout, self.inner.write(register, payload))
            .await
            .map_err(|_| TransportError::timeout(register, self.timeout_ms()))?
    }
}
