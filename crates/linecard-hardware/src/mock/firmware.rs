//! Mock management firmware for testing and development.
//!
//! [`MockFirmware`] answers register accesses the way the switch firmware
//! does, from an in-memory model of the chassis. The paired
//! [`MockFirmwareHandle`] drives that model: seating and removing cards,
//! powering them up, injecting failures and latency.
//!
//! When a slot's status changes and event delivery is enabled for it, the
//! firmware pushes the new status to the attached [`StatusEventSender`],
//! like the real firmware raising a slot status event.

use crate::error::{TransportError, TransportResult};
use crate::manager::StatusEventSender;
use crate::transport::RegisterTransport;
use bytes::Bytes;
use linecard_protocol::{
    Capability, QueryKind, Register, RegisterId, SensorCapability, SensorCapabilityRequest,
    SlotControl, SlotStatus, SlotStatusRequest,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Hardware revision reported for cards seated through the handle.
pub const MOCK_HW_REVISION: u16 = 0x0001;

/// INI version reported for cards seated through the handle.
pub const MOCK_INI_VERSION: u16 = 0x0007;

#[derive(Debug)]
struct FirmwareState {
    slot_count: u8,
    slots: HashMap<u8, SlotStatus>,
    sensors: HashMap<u8, SensorCapability>,
    events_enabled: HashSet<u8>,
    event_sink: Option<StatusEventSender>,
    control_writes: Vec<SlotControl>,
    query_counts: HashMap<RegisterId, usize>,
    fail_queries: usize,
    fail_writes: usize,
    fail_slots: HashMap<u8, usize>,
    latency: Option<Duration>,
    auto_activate: bool,
    connected: bool,
}

impl FirmwareState {
    fn status(&self, slot: u8) -> SlotStatus {
        self.slots
            .get(&slot)
            .copied()
            .unwrap_or_else(|| SlotStatus::empty(slot))
    }

    /// Store a slot's status and build the event it raises, if any.
    fn update(&mut self, slot: u8, status: SlotStatus) -> Option<(StatusEventSender, Bytes)> {
        let status = SlotStatus {
            slot_index: slot,
            ..status
        };
        let changed = self.status(slot) != status;
        self.slots.insert(slot, status);
        if changed {
            self.pending_event(slot)
        } else {
            None
        }
    }

    fn pending_event(&self, slot: u8) -> Option<(StatusEventSender, Bytes)> {
        if !self.events_enabled.contains(&slot) {
            return None;
        }
        let sink = self.event_sink.clone()?;
        Some((sink, self.status(slot).encode()))
    }

    /// Consume one injected failure for `slot`, if any is pending.
    fn take_slot_failure(&mut self, slot: u8) -> bool {
        match self.fail_slots.get_mut(&slot) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

fn raise(event: Option<(StatusEventSender, Bytes)>) {
    if let Some((sink, payload)) = event
        && let Err(e) = sink.try_deliver(payload)
    {
        warn!("Mock firmware dropped status event: {}", e);
    }
}

/// Slot index carried by a slot-addressed register payload.
fn addressed_slot(register: RegisterId, payload: &[u8]) -> Option<u8> {
    match register {
        RegisterId::Mddq => SlotStatusRequest::decode(payload).ok().map(|r| r.slot_index),
        RegisterId::Mddc => SlotControl::decode(payload).ok().map(|c| c.slot_index),
        RegisterId::Mtecr => SensorCapabilityRequest::decode(payload)
            .ok()
            .map(|r| r.slot_index),
        RegisterId::Mgpir => None,
    }
}

/// Mock management firmware.
///
/// # Examples
///
/// ```
/// use linecard_hardware::mock::MockFirmware;
/// use linecard_hardware::transport::query_register;
/// use linecard_protocol::{SlotStatus, SlotStatusRequest};
///
/// #[tokio::main]
/// async fn main() -> linecard_core::Result<()> {
///     let (firmware, handle) = MockFirmware::new(4);
///     handle.insert_card(2, 0x01);
///
///     let status: SlotStatus = query_register(&firmware, SlotStatusRequest::slot_info(2)).await?;
///     assert!(status.provisioned);
///     assert!(!status.ready);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockFirmware {
    state: Arc<Mutex<FirmwareState>>,
}

impl MockFirmware {
    /// Create a mock firmware for a chassis with `slot_count` slots.
    ///
    /// Returns a tuple of (MockFirmware, MockFirmwareHandle) where the
    /// handle drives the simulated chassis.
    pub fn new(slot_count: u8) -> (Self, MockFirmwareHandle) {
        let state = Arc::new(Mutex::new(FirmwareState {
            slot_count,
            slots: HashMap::new(),
            sensors: HashMap::new(),
            events_enabled: HashSet::new(),
            event_sink: None,
            control_writes: Vec::new(),
            query_counts: HashMap::new(),
            fail_queries: 0,
            fail_writes: 0,
            fail_slots: HashMap::new(),
            latency: None,
            auto_activate: true,
            connected: true,
        }));

        let firmware = Self {
            state: Arc::clone(&state),
        };
        let handle = MockFirmwareHandle { state };
        (firmware, handle)
    }

    fn lock(&self) -> MutexGuard<'_, FirmwareState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latency(&self) -> Option<Duration> {
        self.lock().latency
    }

    fn answer_query(&self, register: RegisterId, payload: &[u8]) -> TransportResult<Bytes> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::disconnected("mock firmware"));
        }
        *state.query_counts.entry(register).or_default() += 1;

        if state.fail_queries > 0 {
            state.fail_queries -= 1;
            return Err(TransportError::rejected(register, "injected query failure"));
        }
        if let Some(slot) = addressed_slot(register, payload)
            && state.take_slot_failure(slot)
        {
            let reason = format!("injected failure on lc{slot}");
            return Err(TransportError::rejected(register, reason));
        }

        let reject = |reason: &str| TransportError::rejected(register, reason);
        match register {
            RegisterId::Mgpir => Ok(Capability {
                num_of_slots: state.slot_count,
                ..Capability::default()
            }
            .encode()),
            RegisterId::Mddq => {
                let request =
                    SlotStatusRequest::decode(payload).map_err(|e| reject(&e.to_string()))?;
                if request.query_kind != QueryKind::SlotInfo {
                    return Err(reject("unsupported query kind"));
                }
                Ok(state.status(request.slot_index).encode())
            }
            RegisterId::Mtecr => {
                let request =
                    SensorCapabilityRequest::decode(payload).map_err(|e| reject(&e.to_string()))?;
                let capability = state
                    .sensors
                    .get(&request.slot_index)
                    .cloned()
                    .unwrap_or_else(|| SensorCapability {
                        slot_index: request.slot_index,
                        ..SensorCapability::default()
                    });
                Ok(capability.encode())
            }
            RegisterId::Mddc => Err(reject("register is write-only")),
        }
    }

    fn apply_write(
        &self,
        register: RegisterId,
        payload: &[u8],
    ) -> TransportResult<Option<(StatusEventSender, Bytes)>> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::disconnected("mock firmware"));
        }

        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(TransportError::rejected(register, "injected write failure"));
        }
        if let Some(slot) = addressed_slot(register, payload)
            && state.take_slot_failure(slot)
        {
            let reason = format!("injected failure on lc{slot}");
            return Err(TransportError::rejected(register, reason));
        }

        let reject = |reason: &str| TransportError::rejected(register, reason);
        match register {
            RegisterId::Mddq => {
                let request =
                    SlotStatusRequest::decode(payload).map_err(|e| reject(&e.to_string()))?;
                if request.event_enable {
                    state.events_enabled.insert(request.slot_index);
                } else {
                    state.events_enabled.remove(&request.slot_index);
                }
                Ok(None)
            }
            RegisterId::Mddc => {
                let control = SlotControl::decode(payload).map_err(|e| reject(&e.to_string()))?;
                state.control_writes.push(control);
                let slot = control.slot_index;
                let current = state.status(slot);
                if control.device_enable && state.auto_activate && current.ready {
                    debug!("Mock firmware activating lc{}", slot);
                    Ok(state.update(
                        slot,
                        SlotStatus {
                            active: true,
                            ..current
                        },
                    ))
                } else {
                    Ok(None)
                }
            }
            RegisterId::Mgpir | RegisterId::Mtecr => Err(reject("register is read-only")),
        }
    }
}

impl RegisterTransport for MockFirmware {
    async fn query(&self, register: RegisterId, payload: Bytes) -> TransportResult<Bytes> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }
        self.answer_query(register, &payload)
    }

    async fn write(&self, register: RegisterId, payload: Bytes) -> TransportResult<()> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }
        let event = self.apply_write(register, &payload)?;
        raise(event);
        Ok(())
    }
}

/// Handle for driving a mock firmware.
///
/// Cloning the handle gives another view of the same chassis.
#[derive(Debug, Clone)]
pub struct MockFirmwareHandle {
    state: Arc<Mutex<FirmwareState>>,
}

impl MockFirmwareHandle {
    fn lock(&self) -> MutexGuard<'_, FirmwareState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify(&self, slot: u8, change: impl FnOnce(&mut SlotStatus)) {
        let event = {
            let mut state = self.lock();
            let mut status = state.status(slot);
            change(&mut status);
            state.update(slot, status)
        };
        raise(event);
    }

    /// Route status events to a line card registry.
    pub fn attach_event_sink(&self, sink: StatusEventSender) {
        self.lock().event_sink = Some(sink);
    }

    /// Change the number of slots reported by MGPIR.
    pub fn set_slot_count(&self, slot_count: u8) {
        self.lock().slot_count = slot_count;
    }

    /// Replace a slot's status wholesale.
    pub fn set_status(&self, status: SlotStatus) {
        self.modify(status.slot_index, |current| *current = status);
    }

    /// Seat and provision a card of the given type code.
    pub fn insert_card(&self, slot: u8, card_type: u8) {
        self.modify(slot, |status| {
            *status = SlotStatus {
                slot_index: slot,
                provisioned: true,
                shift_register_valid: true,
                hw_revision: MOCK_HW_REVISION,
                minor_version: MOCK_INI_VERSION,
                card_type,
                ..SlotStatus::default()
            };
        });
    }

    /// Set or clear the ready flag, as after powering a card up or down.
    ///
    /// Clearing ready also clears active.
    pub fn set_ready(&self, slot: u8, ready: bool) {
        self.modify(slot, |status| {
            status.ready = ready;
            if !ready {
                status.active = false;
            }
        });
    }

    /// Set or clear the active flag directly.
    pub fn set_active(&self, slot: u8, active: bool) {
        self.modify(slot, |status| status.active = active);
    }

    /// Remove the card from a slot.
    pub fn remove_card(&self, slot: u8) {
        self.modify(slot, |status| *status = SlotStatus::empty(slot));
    }

    /// Re-raise the current status of a slot, changed or not.
    pub fn emit(&self, slot: u8) {
        let event = self.lock().pending_event(slot);
        raise(event);
    }

    /// Current status of a slot.
    pub fn status(&self, slot: u8) -> SlotStatus {
        self.lock().status(slot)
    }

    /// Set the sensor capability reported for `capability.slot_index`.
    pub fn set_sensor_capability(&self, capability: SensorCapability) {
        self.lock()
            .sensors
            .insert(capability.slot_index, capability);
    }

    /// Whether the firmware activates a ready card on the activation command.
    ///
    /// Enabled by default.
    pub fn set_auto_activate(&self, enabled: bool) {
        self.lock().auto_activate = enabled;
    }

    /// Delay every register access.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Fail the next `count` queries, whatever they address.
    pub fn fail_next_queries(&self, count: usize) {
        self.lock().fail_queries = count;
    }

    /// Fail the next `count` writes, whatever they address.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_writes = count;
    }

    /// Fail the next `count` accesses addressing `slot`.
    pub fn fail_slot(&self, slot: u8, count: usize) {
        self.lock().fail_slots.insert(slot, count);
    }

    /// Make every access fail as disconnected, or reconnect.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Whether event delivery is enabled for a slot.
    pub fn events_enabled(&self, slot: u8) -> bool {
        self.lock().events_enabled.contains(&slot)
    }

    /// Every slot control command received, oldest first.
    pub fn control_writes(&self) -> Vec<SlotControl> {
        self.lock().control_writes.clone()
    }

    /// Number of activation commands received for a slot.
    pub fn activation_count(&self, slot: u8) -> usize {
        self.lock()
            .control_writes
            .iter()
            .filter(|control| control.slot_index == slot && control.device_enable)
            .count()
    }

    /// Number of queries received for a register.
    pub fn query_count(&self, register: RegisterId) -> usize {
        self.lock()
            .query_counts
            .get(&register)
            .copied()
            .unwrap_or(0)
    }
}
