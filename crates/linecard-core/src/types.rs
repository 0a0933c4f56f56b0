use crate::{
    Result,
    constants::{MAX_SLOT_INDEX, MIN_SLOT_INDEX},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Line card slot identifier (1-based, 4-bit on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Create a new slot index with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the index is outside 1-15.
    pub fn new(index: u8) -> Result<Self> {
        if !(MIN_SLOT_INDEX..=MAX_SLOT_INDEX).contains(&index) {
            return Err(Error::InvalidSlot(format!(
                "Slot index must be {MIN_SLOT_INDEX}-{MAX_SLOT_INDEX}, got {index}"
            )));
        }
        Ok(SlotIndex(index))
    }

    /// Create a slot index that must also fit a chassis with `count` slots.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the index is 0 or greater than `count`.
    pub fn within(index: u8, count: u8) -> Result<Self> {
        let slot = Self::new(index)?;
        if index > count {
            return Err(Error::InvalidSlot(format!(
                "Slot index {index} exceeds slot count {count}"
            )));
        }
        Ok(slot)
    }

    /// Get the raw slot index as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Position of this slot in a 0-indexed slot table.
    #[must_use]
    pub fn table_offset(&self) -> usize {
        usize::from(self.0 - MIN_SLOT_INDEX)
    }

    /// Iterate over every slot of a chassis with `count` slots.
    ///
    /// Counts above 15 are clamped to the representable range.
    pub fn all(count: u8) -> impl Iterator<Item = SlotIndex> {
        (MIN_SLOT_INDEX..=count.min(MAX_SLOT_INDEX)).map(SlotIndex)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lc{}", self.0)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        SlotIndex::new(value)
    }
}

impl From<SlotIndex> for u8 {
    fn from(slot: SlotIndex) -> u8 {
        slot.0
    }
}

/// Known line card models.
///
/// The firmware reports the model as an 8-bit code. Codes outside this table
/// are not rejected by the codec; [`CardType::try_from`] reports them as
/// `Error::ProtocolMismatch` and the caller decides what that means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CardType {
    /// 16 ports of 100GbE (QSFP28).
    Qsfp28x16 = 0x01,
    /// 8 ports of 200GbE (QSFP56).
    Qsfp56x8 = 0x02,
    /// 4 ports of 400GbE (QSFP-DD).
    QsfpDdx4 = 0x03,
}

impl CardType {
    /// Wire code of this card type.
    #[must_use]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Number of front-panel ports on this card.
    #[must_use]
    pub fn port_count(&self) -> u8 {
        match self {
            Self::Qsfp28x16 => 16,
            Self::Qsfp56x8 => 8,
            Self::QsfpDdx4 => 4,
        }
    }

    /// Short model label, e.g. `16x100G`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Qsfp28x16 => "16x100G",
            Self::Qsfp56x8 => "8x200G",
            Self::QsfpDdx4 => "4x400G",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<u8> for CardType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0x01 => Ok(Self::Qsfp28x16),
            0x02 => Ok(Self::Qsfp56x8),
            0x03 => Ok(Self::QsfpDdx4),
            other => Err(Error::ProtocolMismatch(format!(
                "Unrecognized card type 0x{other:02x}"
            ))),
        }
    }
}
