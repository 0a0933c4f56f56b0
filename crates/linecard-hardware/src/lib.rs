//! Line card lifecycle management for modular switch chassis.
//!
//! This crate tracks the hot-pluggable line card slots of a chassis through
//! their lifecycle (provisioned, ready, active) by exchanging registers with
//! the switch's management firmware, and notifies interested components when
//! a card becomes usable or goes away.
//!
//! # Design Philosophy
//!
//! - **Async-first**: Register I/O goes through the [`RegisterTransport`]
//!   trait using native `async fn` in traits (Rust 1.90 + Edition 2024
//!   RPITIT).
//! - **Serialized per slot**: Status reports for one slot are applied one
//!   at a time; different slots proceed independently.
//! - **Mockable**: [`mock::MockFirmware`] simulates the firmware so the whole
//!   lifecycle runs without a switch.
//!
//! # Components
//!
//! | Module | Role |
//! |---|---|
//! | [`manager`] | [`LineCards`] registry, event worker, poller |
//! | `status` | per-slot processing pass |
//! | [`events`] | observer registration and dispatch |
//! | [`sensors`] | thermal sensor map discovery |
//! | [`devices`] | devices bound to active cards |
//! | [`transport`] | register transport seam and timeouts |
//!
//! # Examples
//!
//! ```
//! use linecard_hardware::{LineCards, LineCardsConfig, mock::MockFirmware};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> linecard_core::Result<()> {
//!     let (firmware, handle) = MockFirmware::new(2);
//!     let linecards = LineCards::initialize(Arc::new(firmware), LineCardsConfig::default())
//!         .await?
//!         .expect("modular chassis");
//!     handle.attach_event_sink(linecards.event_sender());
//!     linecards.post_init().await?;
//!
//!     assert_eq!(linecards.count(), 2);
//!
//!     linecards.pre_fini().await;
//!     linecards.fini();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod manager;
pub mod mock;
pub mod provision;
pub mod sensors;
pub(crate) mod status;
pub mod transport;
pub mod types;

pub use config::LineCardsConfig;
pub use devices::{DeviceBackend, DeviceBinder, LineCardDevice};
pub use error::{TransportError, TransportResult};
pub use events::{EventContext, LineCardEventOps, ObserverRegistry};
pub use manager::{LineCards, LineCardsBuilder, StatusEventSender};
pub use provision::{NoopProvisionHooks, ProvisionHooks};
pub use sensors::{SensorMap, SensorMapResolver};
pub use transport::{RegisterTransport, TimeoutTransport};
pub use types::{CardInfo, LineCardSnapshot, SlotChanges, SlotState};
