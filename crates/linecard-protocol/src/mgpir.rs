//! General purpose capability (MGPIR).
//!
//! Queried once against the main board to learn how many modular slots the
//! chassis exposes.
//!
//! # Layout
//!
//! ```text
//! 0x00  [31:28] slot_index  [27:24] device_type  [23:16] devices_per_flash
//!       [7:0] num_of_devices
//! 0x04  [15:8] num_of_slots  [7:0] num_of_modules
//! ```

use crate::item::Item;
use crate::register::{Register, RegisterId};
use linecard_core::Result;
use linecard_core::constants::MAIN_BOARD_SLOT_INDEX;

const SLOT_INDEX: Item = Item::new("slot_index", 0x00, 28, 4);
const DEVICE_TYPE: Item = Item::new("device_type", 0x00, 24, 4);
const DEVICES_PER_FLASH: Item = Item::new("devices_per_flash", 0x00, 16, 8);
const NUM_OF_DEVICES: Item = Item::new("num_of_devices", 0x00, 0, 8);
const NUM_OF_SLOTS: Item = Item::new("num_of_slots", 0x04, 8, 8);
const NUM_OF_MODULES: Item = Item::new("num_of_modules", 0x04, 0, 8);

/// Capability query for a board (slot 0 is the main board).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityRequest {
    pub slot_index: u8,
}

impl CapabilityRequest {
    pub fn main_board() -> Self {
        Self {
            slot_index: MAIN_BOARD_SLOT_INDEX,
        }
    }
}

impl Register for CapabilityRequest {
    const ID: RegisterId = RegisterId::Mgpir;

    fn pack(&self, buf: &mut [u8]) {
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            slot_index: SLOT_INDEX.get(buf) as u8,
        })
    }
}

/// Board capability answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capability {
    pub slot_index: u8,
    pub device_type: u8,
    pub devices_per_flash: u8,
    pub num_of_devices: u8,
    /// Number of modular line card slots.
    pub num_of_slots: u8,
    pub num_of_modules: u8,
}

impl Register for Capability {
    const ID: RegisterId = RegisterId::Mgpir;

    fn pack(&self, buf: &mut [u8]) {
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
        DEVICE_TYPE.set(buf, u32::from(self.device_type));
        DEVICES_PER_FLASH.set(buf, u32::from(self.devices_per_flash));
        NUM_OF_DEVICES.set(buf, u32::from(self.num_of_devices));
        NUM_OF_SLOTS.set(buf, u32::from(self.num_of_slots));
        NUM_OF_MODULES.set(buf, u32::from(self.num_of_modules));
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            slot_index: SLOT_INDEX.get(buf) as u8,
            device_type: DEVICE_TYPE.get(buf) as u8,
            devices_per_flash: DEVICES_PER_FLASH.get(buf) as u8,
            num_of_devices: NUM_OF_DEVICES.get(buf) as u8,
            num_of_slots: NUM_OF_SLOTS.get(buf) as u8,
            num_of_modules: NUM_OF_MODULES.get(buf) as u8,
        })
    }
}
