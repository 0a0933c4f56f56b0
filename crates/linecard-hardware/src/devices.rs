//! Devices carried by an active line card.
//!
//! Once a card becomes active the host instantiates the devices on it: a
//! management CPLD and an EEPROM reached over the card's I2C segment, plus
//! devices that are registered directly with the host, such as gearboxes.
//! [`DeviceBinder`] does this as a line card observer: it creates the
//! devices listed for the card type on `got_active` and destroys them on
//! `got_inactive`.
//!
//! # Examples
//!
//! ```
//! use linecard_hardware::devices::{DeviceBinder, default_device_table};
//! use linecard_hardware::events::{EventContext, LineCardEventOps};
//! use linecard_hardware::mock::MockFirmware;
//! use std::sync::Arc;
//!
//! let (firmware, _handle) = MockFirmware::new(4);
//! let binder = Arc::new(DeviceBinder::new(Arc::new(firmware), default_device_table));
//!
//! // Register with a registry:
//! // linecards.event_ops_register(binder.clone(), Arc::new(()))?;
//! let _ops: Arc<dyn LineCardEventOps> = binder;
//! let _context: EventContext = Arc::new(());
//! ```

use crate::events::LineCardEventOps;
use crate::transport::RegisterTransport;
use crate::types::LineCardSnapshot;
use linecard_core::{CardType, SlotIndex};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// How a line card device is reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBackend {
    /// Device on the card's I2C segment.
    BusAttached {
        /// Bus number of the segment.
        bus: u16,
        /// 7-bit device address.
        address: u16,
    },

    /// Device registered directly with the host by name.
    DirectlyRegistered {
        /// Device name.
        name: String,
    },
}

impl fmt::Display for DeviceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusAttached { bus, address } => write!(f, "i2c-{bus}@0x{address:02x}"),
            Self::DirectlyRegistered { name } => write!(f, "{name}"),
        }
    }
}

/// A device instantiated for an active line card.
#[derive(Debug)]
pub struct LineCardDevice<T> {
    slot: SlotIndex,
    backend: DeviceBackend,
    transport: Arc<T>,
}

impl<T: RegisterTransport> LineCardDevice<T> {
    /// Instantiate a device on `slot`.
    pub fn create(slot: SlotIndex, backend: DeviceBackend, transport: Arc<T>) -> Self {
        info!("{} device {} created", slot, backend);
        Self {
            slot,
            backend,
            transport,
        }
    }

    /// Tear the device down.
    pub fn destroy(self) {
        info!("{} device {} destroyed", self.slot, self.backend);
    }

    /// Slot the device lives on.
    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    /// How the device is reached.
    pub fn backend(&self) -> &DeviceBackend {
        &self.backend
    }

    /// Register transport of the chassis the device belongs to.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

/// Devices carried by each card type.
///
/// Every card has its management CPLD at 0x32 and VPD EEPROM at 0x51 on
/// bus 0 of its segment. 200G and 400G cards add gearboxes.
pub fn default_device_table(card_type: CardType) -> Vec<DeviceBackend> {
    let mut devices = vec![
        DeviceBackend::BusAttached {
            bus: 0,
            address: 0x32,
        },
        DeviceBackend::BusAttached {
            bus: 0,
            address: 0x51,
        },
    ];
    let gearboxes = match card_type {
        CardType::Qsfp28x16 => 0,
        CardType::Qsfp56x8 => 2,
        CardType::QsfpDdx4 => 4,
    };
    devices.extend((0..gearboxes).map(|index| DeviceBackend::DirectlyRegistered {
        name: format!("gearbox{index}"),
    }));
    devices
}

type DeviceTable = dyn Fn(CardType) -> Vec<DeviceBackend> + Send + Sync;

/// Observer that binds devices to active line cards.
pub struct DeviceBinder<T> {
    transport: Arc<T>,
    table: Box<DeviceTable>,
    bound: Mutex<BTreeMap<SlotIndex, Vec<LineCardDevice<T>>>>,
}

impl<T: RegisterTransport> DeviceBinder<T> {
    /// Create a binder that looks devices up in `table`.
    pub fn new<F>(transport: Arc<T>, table: F) -> Self
    where
        F: Fn(CardType) -> Vec<DeviceBackend> + Send + Sync + 'static,
    {
        Self {
            transport,
            table: Box::new(table),
            bound: Mutex::new(BTreeMap::new()),
        }
    }

    fn bound(&self) -> MutexGuard<'_, BTreeMap<SlotIndex, Vec<LineCardDevice<T>>>> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Backends of the devices currently bound to `slot`.
    pub fn devices(&self, slot: SlotIndex) -> Vec<DeviceBackend> {
        self.bound()
            .get(&slot)
            .map(|devices| devices.iter().map(|d| d.backend().clone()).collect())
            .unwrap_or_default()
    }

    /// Total number of bound devices.
    pub fn device_count(&self) -> usize {
        self.bound().values().map(Vec::len).sum()
    }

    fn unbind(&self, slot: SlotIndex) {
        let devices = self.bound().remove(&slot);
        for device in devices.into_iter().flatten() {
            device.destroy();
        }
    }
}

impl<T: RegisterTransport> LineCardEventOps for DeviceBinder<T> {
    fn got_active(
        &self,
        slot: SlotIndex,
        linecard: &LineCardSnapshot,
        _context: &(dyn Any + Send + Sync),
    ) {
        let Some(card) = linecard.card else {
            warn!("{} active without card information, no devices bound", slot);
            return;
        };
        let card_type = match card.card_type() {
            Ok(card_type) => card_type,
            Err(e) => {
                warn!("{} has no device table: {}", slot, e);
                return;
            }
        };

        self.unbind(slot);
        let devices: Vec<_> = (self.table)(card_type)
            .into_iter()
            .map(|backend| LineCardDevice::create(slot, backend, Arc::clone(&self.transport)))
            .collect();
        self.bound().insert(slot, devices);
    }

    fn got_inactive(
        &self,
        slot: SlotIndex,
        _linecard: &LineCardSnapshot,
        _context: &(dyn Any + Send + Sync),
    ) {
        self.unbind(slot);
    }
}

impl<T> fmt::Debug for DeviceBinder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBinder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFirmware;
    use crate::types::CardInfo;

    fn active(slot: u8, card_type: u8) -> LineCardSnapshot {
        LineCardSnapshot {
            slot_index: SlotIndex::new(slot).unwrap(),
            provisioned: true,
            ready: true,
            active: true,
            card: Some(CardInfo {
                card_type,
                hw_revision: 1,
                ini_version: 1,
            }),
        }
    }

    fn binder() -> DeviceBinder<MockFirmware> {
        let (firmware, _handle) = MockFirmware::new(4);
        DeviceBinder::new(Arc::new(firmware), default_device_table)
    }

    #[test]
    fn test_backend_display() {
        let backend = DeviceBackend::BusAttached {
            bus: 3,
            address: 0x51,
        };
        assert_eq!(backend.to_string(), "i2c-3@0x51");

        let backend = DeviceBackend::DirectlyRegistered {
            name: "gearbox0".to_string(),
        };
        assert_eq!(backend.to_string(), "gearbox0");
    }

    #[test]
    fn test_binds_and_unbinds_on_activation_edges() {
        let binder = binder();
        let slot = SlotIndex::new(2).unwrap();

        binder.got_active(slot, &active(2, 0x03), &());
        assert_eq!(binder.devices(slot).len(), 6);

        binder.got_inactive(slot, &active(2, 0x03), &());
        assert!(binder.devices(slot).is_empty());
        assert_eq!(binder.device_count(), 0);
    }

    #[test]
    fn test_reactivation_replaces_devices() {
        let binder = binder();
        let slot = SlotIndex::new(1).unwrap();

        binder.got_active(slot, &active(1, 0x03), &());
        binder.got_active(slot, &active(1, 0x01), &());
        assert_eq!(binder.devices(slot).len(), 2);
    }

    #[test]
    fn test_unknown_card_type_binds_nothing() {
        let binder = binder();
        let slot = SlotIndex::new(1).unwrap();

        binder.got_active(slot, &active(1, 0x7e), &());
        assert_eq!(binder.device_count(), 0);
    }

    #[test]
    fn test_backend_serialization() {
        let backend = DeviceBackend::BusAttached {
            bus: 0,
            address: 0x32,
        };
        let json = serde_json::to_string(&backend).unwrap();
        assert_eq!(json, r#"{"bus_attached":{"bus":0,"address":50}}"#);
    }
}
