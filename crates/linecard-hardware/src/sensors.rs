//! Per-slot thermal sensor discovery.
//!
//! The firmware describes which of a card's sensors are populated through a
//! 512-bit presence bitmap. [`SensorMapResolver`] turns that bitmap into the
//! ordered list of sensor indices a thermal monitor should poll.

use crate::transport::{RegisterTransport, query_register};
use linecard_core::constants::MAX_SENSOR_COUNT;
use linecard_core::{Error, Result, SlotIndex};
use linecard_protocol::{SensorCapability, SensorCapabilityRequest};
use std::sync::Arc;
use tracing::debug;

/// Ordered list of populated sensor indices for one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorMap {
    sensors: Vec<u16>,
}

impl SensorMap {
    /// Empty map, for cards without sensors. Does not allocate.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a map from a decoded capability response.
    ///
    /// Scans bits `0..min(last_sensor, 512)` in ascending order and stops
    /// once `sensor_count` populated sensors were found. If the bitmap has
    /// fewer set bits than the firmware announced, the map holds only the
    /// sensors actually found.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfMemory` if the list cannot be allocated.
    pub fn from_capability(capability: &SensorCapability) -> Result<Self> {
        if capability.sensor_count == 0 {
            return Ok(Self::empty());
        }

        let wanted = usize::from(capability.sensor_count);
        let mut sensors = Vec::new();
        sensors
            .try_reserve_exact(wanted)
            .map_err(|e| Error::OutOfMemory(format!("sensor map of {wanted} entries: {e}")))?;

        let scan_end = capability.last_sensor.min(MAX_SENSOR_COUNT);
        sensors.extend(
            capability
                .sensor_map
                .iter()
                .take_while(|&index| index < scan_end)
                .take(wanted),
        );

        Ok(Self { sensors })
    }

    /// Number of sensors in the map.
    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Sensor indices in ascending order.
    #[must_use]
    pub fn sensors(&self) -> &[u16] {
        &self.sensors
    }

    /// Check if the map holds no sensor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Free the list. Releasing an empty map is a no-op.
    pub fn release(&mut self) {
        self.sensors = Vec::new();
    }
}

/// Queries sensor capabilities through a register transport.
#[derive(Debug)]
pub struct SensorMapResolver<T> {
    transport: Arc<T>,
}

impl<T> Clone for SensorMapResolver<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: RegisterTransport> SensorMapResolver<T> {
    /// Create a resolver over `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Resolve the sensor map of a slot.
    ///
    /// # Errors
    ///
    /// Returns `Error::TransportError` if the capability query fails,
    /// `Error::ProtocolMismatch` if the response is malformed, or
    /// `Error::OutOfMemory` if the list cannot be allocated.
    pub async fn resolve(&self, slot: SlotIndex) -> Result<SensorMap> {
        let request = SensorCapabilityRequest {
            slot_index: slot.as_u8(),
        };
        let capability: SensorCapability = query_register(&*self.transport, request).await?;
        let map = SensorMap::from_capability(&capability)?;
        debug!(
            "{} reports {} sensors, resolved {:?}",
            slot,
            capability.sensor_count,
            map.sensors()
        );
        Ok(map)
    }
}
