//! Common test utilities for line card lifecycle tests.

#![allow(dead_code)]

use linecard_core::SlotIndex;
use linecard_hardware::mock::{MockFirmware, MockFirmwareHandle};
use linecard_hardware::{
    LineCardEventOps, LineCardSnapshot, LineCards, LineCardsConfig, ProvisionHooks, SlotState,
};
use linecard_protocol::SlotStatus;
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Card type code of a 16x100G card.
pub const QSFP28_X16: u8 = 0x01;

/// Card type code of an 8x200G card.
pub const QSFP56_X8: u8 = 0x02;

pub fn slot(index: u8) -> SlotIndex {
    SlotIndex::new(index).unwrap()
}

/// One observer callback as seen by a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub observer: &'static str,
    pub slot: u8,
    pub active: bool,
}

pub type NotificationLog = Arc<Mutex<Vec<Notification>>>;

/// Observer appending every callback to a shared log.
pub struct Recorder {
    pub name: &'static str,
    pub log: NotificationLog,
}

impl Recorder {
    pub fn new(name: &'static str, log: &NotificationLog) -> Arc<dyn LineCardEventOps> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
        })
    }

    fn record(&self, slot: SlotIndex, active: bool) {
        self.log.lock().unwrap().push(Notification {
            observer: self.name,
            slot: slot.as_u8(),
            active,
        });
    }
}

impl LineCardEventOps for Recorder {
    fn got_active(&self, slot: SlotIndex, linecard: &LineCardSnapshot, _: &(dyn Any + Send + Sync)) {
        assert!(linecard.active);
        assert!(linecard.card.is_some());
        self.record(slot, true);
    }

    fn got_inactive(&self, slot: SlotIndex, linecard: &LineCardSnapshot, _: &(dyn Any + Send + Sync)) {
        assert!(!linecard.active);
        self.record(slot, false);
    }
}

pub fn notifications(log: &NotificationLog) -> Vec<Notification> {
    log.lock().unwrap().clone()
}

/// Provisioning hooks recording `(slot, provisioned)` edges.
#[derive(Default)]
pub struct CountingHooks {
    pub calls: Mutex<Vec<(u8, bool)>>,
}

impl CountingHooks {
    pub fn calls(&self) -> Vec<(u8, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProvisionHooks for CountingHooks {
    fn provision_set(&self, slot: SlotIndex, _status: &SlotStatus) {
        self.calls.lock().unwrap().push((slot.as_u8(), true));
    }

    fn provision_clear(&self, slot: SlotIndex) {
        self.calls.lock().unwrap().push((slot.as_u8(), false));
    }
}

/// Initialize a registry over a fresh mock firmware.
///
/// `prepare` seats cards before initialization. The firmware's event sink
/// is attached to the registry.
pub async fn setup(
    slot_count: u8,
    config: LineCardsConfig,
    prepare: impl FnOnce(&MockFirmwareHandle),
) -> (LineCards<MockFirmware>, MockFirmwareHandle, Arc<CountingHooks>) {
    let (firmware, handle) = MockFirmware::new(slot_count);
    prepare(&handle);

    let hooks = Arc::new(CountingHooks::default());
    let linecards = LineCards::builder(Arc::new(firmware))
        .config(config)
        .provision_hooks(hooks.clone())
        .initialize()
        .await
        .expect("initialize")
        .expect("modular chassis");
    handle.attach_event_sink(linecards.event_sender());

    (linecards, handle, hooks)
}

/// Wait until a slot reaches `state`, failing the test after two seconds.
pub async fn wait_for_state(linecards: &LineCards<MockFirmware>, index: u8, state: SlotState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let snapshot = linecards.snapshot(slot(index)).await.unwrap();
        if snapshot.state() == state {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "lc{index} stuck in {}, expected {state}",
            snapshot.state()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until the log holds `count` notifications.
pub async fn wait_for_notifications(log: &NotificationLog, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while log.lock().unwrap().len() < count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {count} notifications, got {:?}",
            notifications(log)
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
