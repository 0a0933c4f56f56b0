//! Slot control (MDDC).
//!
//! Write-only register used to enable the devices of a ready card and to
//! request resets. The firmware acknowledges the write without a body.
//!
//! # Layout
//!
//! ```text
//! 0x00  [3:0] slot_index
//! 0x04  [31:29] reset_request   [28] device_enable
//! ```

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::register::{Register, RegisterId};
use linecard_core::{Error, Result};

const SLOT_INDEX: Item = Item::new("slot_index", 0x00, 0, 4);
const RESET_REQUEST: Item = Item::new("reset_request", 0x04, 29, 3);
const DEVICE_ENABLE: Item = Item::new("device_enable", 0x04, 28, 1);

/// Reset action requested together with a slot control write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ResetRequest {
    #[default]
    NoAction = 0,
    Reset = 1,
    PowerCycle = 2,
}

impl TryFrom<u8> for ResetRequest {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::NoAction),
            1 => Ok(Self::Reset),
            2 => Ok(Self::PowerCycle),
            other => Err(Error::ProtocolMismatch(format!(
                "Unknown MDDC reset request {other}"
            ))),
        }
    }
}

/// Slot control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotControl {
    /// Raw 4-bit slot index.
    pub slot_index: u8,
    pub reset_request: ResetRequest,
    pub device_enable: bool,
}

impl SlotControl {
    /// Activation command issued when a card reports ready.
    pub fn activate(slot_index: u8) -> Self {
        Self {
            slot_index,
            reset_request: ResetRequest::NoAction,
            device_enable: true,
        }
    }
}

impl Register for SlotControl {
    const ID: RegisterId = RegisterId::Mddc;

    fn pack(&self, buf: &mut [u8]) {
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
        RESET_REQUEST.set(buf, u32::from(self.reset_request as u8));
        DEVICE_ENABLE.set_bool(buf, self.device_enable);
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            slot_index: SLOT_INDEX.get(buf) as u8,
            reset_request: ResetRequest::try_from(RESET_REQUEST.get(buf) as u8)?,
            device_enable: DEVICE_ENABLE.get_bool(buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_activate_wire_layout() {
        let payload = SlotControl::activate(2).encode();
        assert_eq!(payload.len(), 0x30);
        assert_eq!(payload[..8], [0x00, 0x00, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00]);
    }

    #[rstest]
    #[case(ResetRequest::NoAction, 0x00)]
    #[case(ResetRequest::Reset, 0x20)]
    #[case(ResetRequest::PowerCycle, 0x40)]
    fn test_reset_request_bits(#[case] reset: ResetRequest, #[case] top_byte: u8) {
        let control = SlotControl {
            slot_index: 1,
            reset_request: reset,
            device_enable: false,
        };
        let payload = control.encode();
        assert_eq!(payload[4], top_byte);
        assert_eq!(SlotControl::decode(&payload).unwrap(), control);
    }

    #[test]
    fn test_unknown_reset_request() {
        let mut payload = SlotControl::activate(1).encode().to_vec();
        payload[4] = 0xe0;
        assert!(matches!(
            SlotControl::decode(&payload),
            Err(Error::ProtocolMismatch(_))
        ));
    }
}
