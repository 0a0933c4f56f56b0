//! Common test utilities for codec integration tests.
//!
//! Strategies generate register values restricted to the widths the wire
//! format can carry, so a decoded value can be compared with its source
//! field by field.

#![allow(dead_code)]

use proptest::prelude::*;
use linecard_protocol::{
    QueryKind, ResetRequest, SensorBitmap, SensorCapability, SlotControl, SlotStatus,
    SlotStatusRequest,
};

/// Strategy for 4-bit slot indices (0-15).
pub fn slot_index() -> impl Strategy<Value = u8> {
    0u8..=15
}

pub fn query_kind() -> impl Strategy<Value = QueryKind> {
    prop_oneof![Just(QueryKind::SlotInfo), Just(QueryKind::SlotName)]
}

pub fn reset_request() -> impl Strategy<Value = ResetRequest> {
    prop_oneof![
        Just(ResetRequest::NoAction),
        Just(ResetRequest::Reset),
        Just(ResetRequest::PowerCycle),
    ]
}

pub fn slot_status_request() -> impl Strategy<Value = SlotStatusRequest> {
    (any::<bool>(), query_kind(), slot_index()).prop_map(|(event_enable, query_kind, slot_index)| {
        SlotStatusRequest {
            event_enable,
            query_kind,
            slot_index,
        }
    })
}

pub fn slot_status() -> impl Strategy<Value = SlotStatus> {
    (
        slot_index(),
        any::<[bool; 4]>(),
        any::<u16>(),
        any::<u16>(),
        any::<u8>(),
    )
        .prop_map(
            |(slot_index, [provisioned, shift_register_valid, ready, active], hw_revision, minor_version, card_type)| {
                SlotStatus {
                    slot_index,
                    provisioned,
                    shift_register_valid,
                    ready,
                    active,
                    hw_revision,
                    minor_version,
                    card_type,
                }
            },
        )
}

pub fn slot_control() -> impl Strategy<Value = SlotControl> {
    (slot_index(), reset_request(), any::<bool>()).prop_map(
        |(slot_index, reset_request, device_enable)| SlotControl {
            slot_index,
            reset_request,
            device_enable,
        },
    )
}

pub fn sensor_capability() -> impl Strategy<Value = SensorCapability> {
    (
        slot_index(),
        0u16..=0x0fff,
        0u16..=0x0fff,
        0u8..=0x7f,
        prop::collection::vec(0u16..512, 0..64),
    )
        .prop_map(
            |(slot_index, sensor_count, last_sensor, internal_sensor_count, sensors)| {
                SensorCapability {
                    slot_index,
                    sensor_count,
                    last_sensor,
                    internal_sensor_count,
                    sensor_map: SensorBitmap::from_indices(sensors),
                }
            },
        )
}
