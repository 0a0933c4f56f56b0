//! Slot status query (MDDQ).
//!
//! A query names a slot and a query kind; the firmware answers with the same
//! payload filled in with the slot's provisioning, readiness and activation
//! flags and the identity of the card it holds. Writing the register with
//! `event_enable` set or cleared switches asynchronous slot-status events for
//! that slot on or off; those events carry the same response payload.
//!
//! # Layout
//!
//! ```text
//! 0x00  [31] event_enable   [23:16] query_kind   [3:0] slot_index
//! 0x10  [31] provisioned    [30] shift_register_valid
//!       [29:28] ready       [27] active
//! 0x14  [31:16] hw_revision [15:0] minor_version
//! 0x18  [7:0] card_type
//! ```

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::register::{Register, RegisterId};
use linecard_core::{Error, Result};

const EVENT_ENABLE: Item = Item::new("event_enable", 0x00, 31, 1);
const QUERY_KIND: Item = Item::new("query_kind", 0x00, 16, 8);
const SLOT_INDEX: Item = Item::new("slot_index", 0x00, 0, 4);
const PROVISIONED: Item = Item::new("provisioned", 0x10, 31, 1);
const SHIFT_REGISTER_VALID: Item = Item::new("shift_register_valid", 0x10, 30, 1);
// Firmware reports readiness as a 2-bit state: 0 not ready, 1 ready,
// 2 error. Only the ready state counts as ready.
const READY: Item = Item::new("ready", 0x10, 28, 2);
const READY_STATE: u32 = 1;
const ACTIVE: Item = Item::new("active", 0x10, 27, 1);
const HW_REVISION: Item = Item::new("hw_revision", 0x14, 16, 16);
const MINOR_VERSION: Item = Item::new("minor_version", 0x14, 0, 16);
const CARD_TYPE: Item = Item::new("card_type", 0x18, 0, 8);

/// What a slot status query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum QueryKind {
    /// Provisioning/readiness/activation flags and card identity.
    SlotInfo = 1,
    /// Slot name string.
    SlotName = 3,
}

impl TryFrom<u8> for QueryKind {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::SlotInfo),
            3 => Ok(Self::SlotName),
            other => Err(Error::ProtocolMismatch(format!(
                "Unknown MDDQ query kind {other}"
            ))),
        }
    }
}

/// Slot status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStatusRequest {
    /// Asynchronous event delivery for the slot (meaningful on write).
    pub event_enable: bool,
    pub query_kind: QueryKind,
    /// Raw 4-bit slot index.
    pub slot_index: u8,
}

impl SlotStatusRequest {
    /// Query the slot info of `slot_index` without touching event delivery.
    pub fn slot_info(slot_index: u8) -> Self {
        Self {
            event_enable: false,
            query_kind: QueryKind::SlotInfo,
            slot_index,
        }
    }

    /// Request that turns event delivery for `slot_index` on or off when written.
    pub fn event_delivery(slot_index: u8, enable: bool) -> Self {
        Self {
            event_enable: enable,
            query_kind: QueryKind::SlotInfo,
            slot_index,
        }
    }
}

impl Register for SlotStatusRequest {
    const ID: RegisterId = RegisterId::Mddq;

    fn pack(&self, buf: &mut [u8]) {
        EVENT_ENABLE.set_bool(buf, self.event_enable);
        QUERY_KIND.set(buf, u32::from(self.query_kind as u8));
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            event_enable: EVENT_ENABLE.get_bool(buf),
            query_kind: QueryKind::try_from(QUERY_KIND.get(buf) as u8)?,
            slot_index: SLOT_INDEX.get(buf) as u8,
        })
    }
}

/// Slot status as reported by the firmware.
///
/// `slot_index` is taken from the payload as-is; whether it names a slot of
/// this chassis is decided by the status processor, not the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotStatus {
    /// Raw 4-bit slot index.
    pub slot_index: u8,
    pub provisioned: bool,
    pub shift_register_valid: bool,
    pub ready: bool,
    pub active: bool,
    pub hw_revision: u16,
    /// INI file version applied to the card.
    pub minor_version: u16,
    /// Raw card type code; see [`linecard_core::CardType`].
    pub card_type: u8,
}

impl SlotStatus {
    /// Status of an empty slot.
    pub fn empty(slot_index: u8) -> Self {
        Self {
            slot_index,
            ..Self::default()
        }
    }
}

impl Register for SlotStatus {
    const ID: RegisterId = RegisterId::Mddq;

    fn pack(&self, buf: &mut [u8]) {
        QUERY_KIND.set(buf, u32::from(QueryKind::SlotInfo as u8));
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
        PROVISIONED.set_bool(buf, self.provisioned);
        SHIFT_REGISTER_VALID.set_bool(buf, self.shift_register_valid);
        READY.set(buf, if self.ready { READY_STATE } else { 0 });
        ACTIVE.set_bool(buf, self.active);
        HW_REVISION.set(buf, u32::from(self.hw_revision));
        MINOR_VERSION.set(buf, u32::from(self.minor_version));
        CARD_TYPE.set(buf, u32::from(self.card_type));
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            slot_index: SLOT_INDEX.get(buf) as u8,
            provisioned: PROVISIONED.get_bool(buf),
            shift_register_valid: SHIFT_REGISTER_VALID.get_bool(buf),
            ready: READY.get(buf) == READY_STATE,
            active: ACTIVE.get_bool(buf),
            hw_revision: HW_REVISION.get(buf) as u16,
            minor_version: MINOR_VERSION.get(buf) as u16,
            card_type: CARD_TYPE.get(buf) as u8,
        })
    }
}
