//! Property-based tests for the register codec.
//!
//! These tests use proptest to generate values for every field within its
//! wire width and verify that decoding an encoded payload reproduces the
//! value, and that writing one field never disturbs another.

mod common;

use proptest::prelude::*;
use linecard_protocol::{Register, SensorCapability, SlotControl, SlotStatus, SlotStatusRequest};

proptest! {
    /// Property: slot status requests survive encode/decode.
    #[test]
    fn prop_slot_status_request_roundtrip(request in common::slot_status_request()) {
        let payload = request.encode();
        prop_assert_eq!(SlotStatusRequest::decode(&payload).unwrap(), request);
    }

    /// Property: slot status responses survive encode/decode.
    #[test]
    fn prop_slot_status_roundtrip(status in common::slot_status()) {
        let payload = status.encode();
        prop_assert_eq!(SlotStatus::decode(&payload).unwrap(), status);
    }

    /// Property: slot control commands survive encode/decode.
    #[test]
    fn prop_slot_control_roundtrip(control in common::slot_control()) {
        let payload = control.encode();
        prop_assert_eq!(SlotControl::decode(&payload).unwrap(), control);
    }

    /// Property: sensor capabilities survive encode/decode, bitmap included.
    #[test]
    fn prop_sensor_capability_roundtrip(capability in common::sensor_capability()) {
        let payload = capability.encode();
        prop_assert_eq!(SensorCapability::decode(&payload).unwrap(), capability);
    }

    /// Property: flipping one status flag changes exactly that flag.
    #[test]
    fn prop_status_flags_are_isolated(status in common::slot_status(), flag in 0usize..4) {
        let mut flipped = status;
        match flag {
            0 => flipped.provisioned = !status.provisioned,
            1 => flipped.shift_register_valid = !status.shift_register_valid,
            2 => flipped.ready = !status.ready,
            _ => flipped.active = !status.active,
        }

        let decoded = SlotStatus::decode(&flipped.encode()).unwrap();
        prop_assert_eq!(decoded, flipped);
        prop_assert_eq!(decoded.slot_index, status.slot_index);
        prop_assert_eq!(decoded.hw_revision, status.hw_revision);
        prop_assert_eq!(decoded.minor_version, status.minor_version);
        prop_assert_eq!(decoded.card_type, status.card_type);
    }

    /// Property: decoding never reads bits outside the defined fields.
    ///
    /// Garbage in reserved bits must not leak into any decoded field.
    #[test]
    fn prop_reserved_bits_are_ignored(status in common::slot_status(), noise in any::<u32>()) {
        let mut payload = status.encode().to_vec();
        // 0x10 bits 26..0 are reserved.
        let reserved = noise & 0x07ff_ffff;
        let word = u32::from_be_bytes([payload[0x10], payload[0x11], payload[0x12], payload[0x13]]) | reserved;
        payload[0x10..0x14].copy_from_slice(&word.to_be_bytes());
        // 0x04..0x10 and 0x1c.. are reserved entirely.
        payload[0x04..0x10].fill(0xff);
        payload[0x1c..].fill(0xff);

        prop_assert_eq!(SlotStatus::decode(&payload).unwrap(), status);
    }
}
