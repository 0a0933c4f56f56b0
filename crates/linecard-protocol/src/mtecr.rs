//! Thermal sensor capability (MTECR).
//!
//! Describes which temperature sensors of a slot can be read. The answer
//! carries the number of supported sensors, the highest sensor position that
//! can be set, and a 512-bit map with one bit per sensor position.
//!
//! # Layout
//!
//! ```text
//! 0x00  [27:16] sensor_count   [11:0] last_sensor
//! 0x04  [31:28] slot_index     [6:0] internal_sensor_count
//! 0x20  sensor_map, 0x40 bytes, sensor 0 = LSB of byte 0x5f
//! ```

use std::fmt;

use crate::item::{BitArray, Item};
use crate::register::{Register, RegisterId};
use linecard_core::Result;
use linecard_core::constants::MAX_SENSOR_COUNT;

const SENSOR_COUNT: Item = Item::new("sensor_count", 0x00, 16, 12);
const LAST_SENSOR: Item = Item::new("last_sensor", 0x00, 0, 12);
const SLOT_INDEX: Item = Item::new("slot_index", 0x04, 28, 4);
const INTERNAL_SENSOR_COUNT: Item = Item::new("internal_sensor_count", 0x04, 0, 7);
const SENSOR_MAP_OFFSET: usize = 0x20;
// Addresses the map relative to its own first byte.
const SENSOR_MAP: BitArray = BitArray::new("sensor_map", 0x00, SENSOR_MAP_LEN);

/// Sensor map length in bytes.
pub const SENSOR_MAP_LEN: usize = 0x40;

/// One bit per sensor position, stored in wire order.
#[derive(Clone, PartialEq, Eq)]
pub struct SensorBitmap([u8; SENSOR_MAP_LEN]);

impl SensorBitmap {
    /// Bitmap with no sensor set.
    pub fn new() -> Self {
        Self([0; SENSOR_MAP_LEN])
    }

    /// Bitmap with exactly the given sensor positions set.
    ///
    /// Positions beyond the map width are ignored.
    pub fn from_indices<I: IntoIterator<Item = u16>>(indices: I) -> Self {
        let mut bitmap = Self::new();
        for index in indices {
            bitmap.set(index, true);
        }
        bitmap
    }

    /// Whether sensor `index` is present. Out-of-range positions are never set.
    #[must_use]
    pub fn is_set(&self, index: u16) -> bool {
        index < MAX_SENSOR_COUNT && SENSOR_MAP.get(&self.0, usize::from(index))
    }

    /// Mark sensor `index` present or absent. Out-of-range positions are ignored.
    pub fn set(&mut self, index: u16, present: bool) {
        if index < MAX_SENSOR_COUNT {
            SENSOR_MAP.set(&mut self.0, usize::from(index), present);
        }
    }

    /// Set positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..MAX_SENSOR_COUNT).filter(|index| self.is_set(*index))
    }

    /// Raw wire bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SENSOR_MAP_LEN] {
        &self.0
    }
}

impl Default for SensorBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SensorBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Sensor capability request for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCapabilityRequest {
    /// Raw 4-bit slot index.
    pub slot_index: u8,
}

impl Register for SensorCapabilityRequest {
    const ID: RegisterId = RegisterId::Mtecr;

    fn pack(&self, buf: &mut [u8]) {
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            slot_index: SLOT_INDEX.get(buf) as u8,
        })
    }
}

/// Sensor capability of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SensorCapability {
    /// Raw 4-bit slot index.
    pub slot_index: u8,
    /// Number of supported sensors (12 bits).
    pub sensor_count: u16,
    /// Upper bound of the sensor positions that may be set (12 bits).
    pub last_sensor: u16,
    /// Sensors internal to the ASIC (7 bits).
    pub internal_sensor_count: u8,
    pub sensor_map: SensorBitmap,
}

impl Register for SensorCapability {
    const ID: RegisterId = RegisterId::Mtecr;

    fn pack(&self, buf: &mut [u8]) {
        SENSOR_COUNT.set(buf, u32::from(self.sensor_count));
        LAST_SENSOR.set(buf, u32::from(self.last_sensor));
        SLOT_INDEX.set(buf, u32::from(self.slot_index));
        INTERNAL_SENSOR_COUNT.set(buf, u32::from(self.internal_sensor_count));
        buf[SENSOR_MAP_OFFSET..SENSOR_MAP_OFFSET + SENSOR_MAP_LEN]
            .copy_from_slice(self.sensor_map.as_bytes());
    }

    fn unpack(buf: &[u8]) -> Result<Self> {
        let mut map = [0u8; SENSOR_MAP_LEN];
        map.copy_from_slice(&buf[SENSOR_MAP_OFFSET..SENSOR_MAP_OFFSET + SENSOR_MAP_LEN]);
        Ok(Self {
            slot_index: SLOT_INDEX.get(buf) as u8,
            sensor_count: SENSOR_COUNT.get(buf) as u16,
            last_sensor: LAST_SENSOR.get(buf) as u16,
            internal_sensor_count: INTERNAL_SENSOR_COUNT.get(buf) as u8,
            sensor_map: SensorBitmap(map),
        })
    }
}
