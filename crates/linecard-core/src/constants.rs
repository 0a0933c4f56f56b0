//! Core constants for line card management.
//!
//! This module defines the chassis-level limits shared by the register codec
//! and the slot lifecycle code. Register identifiers and field layouts live
//! next to their codecs in `linecard-protocol`; the values here are the ones
//! more than one crate has to agree on.
//!
//! # Slot Numbering
//!
//! Slots are numbered from 1. The firmware carries the slot index in a 4-bit
//! field, so a chassis can expose at most 15 modular slots. Index 0 addresses
//! the main board and never names a line card.
//!
//! ```
//! use linecard_core::constants::{MAX_SLOT_INDEX, MIN_SLOT_INDEX};
//!
//! fn is_line_card_slot(index: u8) -> bool {
//!     (MIN_SLOT_INDEX..=MAX_SLOT_INDEX).contains(&index)
//! }
//!
//! assert!(is_line_card_slot(1));
//! assert!(!is_line_card_slot(0));
//! assert!(!is_line_card_slot(16));
//! ```

// ============================================================================
// Slot Numbering
// ============================================================================

/// Lowest slot index that names a line card.
pub const MIN_SLOT_INDEX: u8 = 1;

/// Highest slot index representable in the 4-bit `slot_index` field.
pub const MAX_SLOT_INDEX: u8 = 15;

/// Slot index addressing the main board rather than a line card.
pub const MAIN_BOARD_SLOT_INDEX: u8 = 0;

// ============================================================================
// Sensors
// ============================================================================

/// Number of sensor positions covered by the sensor capability bitmap.
///
/// The bitmap spans 0x40 bytes, one bit per sensor.
///
/// # Value: 512 sensors
pub const MAX_SENSOR_COUNT: u16 = 512;

// ============================================================================
// Timeouts and Queues
// ============================================================================

/// Default bound on a single register query or write (milliseconds).
///
/// A transport that does not answer within this window is reported as a
/// transport error and the slot dimension being updated is left untouched.
///
/// # Value: 2000ms
pub const DEFAULT_TRANSPORT_TIMEOUT_MS: u64 = 2000;

/// Default capacity of the asynchronous slot-status event queue.
pub const DEFAULT_EVENT_QUEUE_DEPTH: usize = 64;
