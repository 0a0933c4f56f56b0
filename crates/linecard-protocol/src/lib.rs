//! Register codec for line card management.
//!
//! Each firmware register is a fixed-size big-endian block whose fields sit
//! at fixed bit positions. The modules here describe those positions with
//! [`item::Item`] descriptors and expose typed requests and responses through
//! the [`Register`] trait:
//!
//! | Register | Request | Response |
//! |---|---|---|
//! | MDDQ (slot status) | [`SlotStatusRequest`] | [`SlotStatus`] |
//! | MDDC (slot control) | [`SlotControl`] | write acknowledgment only |
//! | MTECR (sensor capability) | [`SensorCapabilityRequest`] | [`SensorCapability`] |
//! | MGPIR (slot count) | [`CapabilityRequest`] | [`Capability`] |
//!
//! ```
//! use linecard_protocol::{Register, SlotStatus};
//!
//! let status = SlotStatus {
//!     slot_index: 3,
//!     provisioned: true,
//!     ready: true,
//!     ..SlotStatus::default()
//! };
//!
//! let payload = status.encode();
//! assert_eq!(SlotStatus::decode(&payload)?, status);
//! # Ok::<(), linecard_core::Error>(())
//! ```

pub mod item;
pub mod mddc;
pub mod mddq;
pub mod mgpir;
pub mod mtecr;
pub mod register;

pub use mddc::{ResetRequest, SlotControl};
pub use mddq::{QueryKind, SlotStatus, SlotStatusRequest};
pub use mgpir::{Capability, CapabilityRequest};
pub use mtecr::{SensorBitmap, SensorCapability, SensorCapabilityRequest};
pub use register::{Register, RegisterId};
