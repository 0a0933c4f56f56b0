//! Mock transport implementations for testing and development.
//!
//! This module provides a simulated management firmware that can be
//! controlled programmatically without requiring a switch.

pub mod firmware;

pub use firmware::{MockFirmware, MockFirmwareHandle};
