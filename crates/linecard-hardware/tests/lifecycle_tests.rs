//! Integration tests for the line card lifecycle.
//!
//! These tests run a [`LineCards`] registry against the mock firmware and
//! drive cards through provisioning, activation and removal.

mod common;

use common::{
    CountingHooks, QSFP28_X16, QSFP56_X8, Recorder, notifications, setup, slot,
    wait_for_notifications, wait_for_state,
};
use linecard_core::Error;
use linecard_hardware::mock::MockFirmware;
use linecard_hardware::{
    DeviceBinder, EventContext, LineCardEventOps, LineCards, LineCardsConfig, SlotState,
    devices::default_device_table,
};
use linecard_protocol::{Register, SlotStatus};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_initialize_records_provisioning_only() {
    let (linecards, handle, hooks) = setup(4, LineCardsConfig::default(), |handle| {
        handle.insert_card(2, QSFP28_X16);
        handle.insert_card(4, QSFP28_X16);
        handle.set_ready(4, true);
    })
    .await;

    assert_eq!(linecards.count(), 4);
    assert_eq!(hooks.calls(), vec![(2, true), (4, true)]);

    let snapshot = linecards.snapshot(slot(4)).await.unwrap();
    assert_eq!(snapshot.state(), SlotState::Provisioned);
    assert!(snapshot.card.is_none());
    assert!(handle.control_writes().is_empty());
    assert!(!linecards.events_enabled(slot(4)).unwrap());
}

#[tokio::test]
async fn test_fixed_chassis_has_no_registry() {
    let (firmware, _handle) = MockFirmware::new(0);
    let result = LineCards::initialize(Arc::new(firmware), LineCardsConfig::default()).await;
    assert!(matches!(result, Ok(None)));
}

#[tokio::test]
async fn test_unaddressable_slot_count_rejected() {
    let (firmware, _handle) = MockFirmware::new(16);
    let result = LineCards::initialize(Arc::new(firmware), LineCardsConfig::default()).await;
    assert!(matches!(result, Err(Error::ProtocolMismatch(_))));
}

#[tokio::test]
async fn test_initialize_failure_unwinds_earlier_slots() {
    let (firmware, handle) = MockFirmware::new(4);
    handle.insert_card(1, QSFP28_X16);
    handle.insert_card(2, QSFP28_X16);
    handle.fail_slot(3, 1);

    let hooks = Arc::new(CountingHooks::default());
    let result = LineCards::builder(Arc::new(firmware))
        .provision_hooks(hooks.clone())
        .initialize()
        .await;

    assert!(matches!(result, Err(Error::TransportError(_))));
    assert_eq!(hooks.calls(), vec![(1, true), (2, true), (2, false), (1, false)]);
}

#[tokio::test]
async fn test_post_init_activates_ready_card() {
    let (linecards, handle, _hooks) = setup(2, LineCardsConfig::default(), |handle| {
        handle.insert_card(1, QSFP56_X8);
        handle.set_ready(1, true);
    })
    .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    linecards
        .event_ops_register(Recorder::new("ports", &log), Arc::new(()))
        .unwrap();

    linecards.post_init().await.unwrap();
    assert!(handle.events_enabled(1));
    assert!(handle.events_enabled(2));
    assert_eq!(handle.activation_count(1), 1);

    // The firmware raises an event once the card is active.
    wait_for_state(&linecards, 1, SlotState::Active).await;
    wait_for_notifications(&log, 1).await;

    let snapshot = linecards.snapshot(slot(1)).await.unwrap();
    let card = snapshot.card.unwrap();
    assert_eq!(card.card_type, QSFP56_X8);
    assert_eq!(card.ini_version, linecard_hardware::mock::firmware::MOCK_INI_VERSION);

    linecards.pre_fini().await;
}

#[tokio::test]
async fn test_duplicate_ready_reports_issue_one_activation() {
    let (linecards, handle, _hooks) = setup(2, LineCardsConfig::default(), |handle| {
        handle.set_auto_activate(false);
        handle.insert_card(2, QSFP28_X16);
        handle.set_ready(2, true);
    })
    .await;
    linecards.post_init().await.unwrap();

    let payload = handle.status(2).encode();
    let changes = linecards.process_status(None, &payload, false).await.unwrap();
    assert!(changes.is_empty());
    linecards.refresh(slot(2)).await.unwrap();

    assert_eq!(handle.activation_count(2), 1);
    assert_eq!(
        linecards.snapshot(slot(2)).await.unwrap().state(),
        SlotState::Ready
    );

    linecards.pre_fini().await;
}

#[tokio::test]
async fn test_observers_notified_in_registration_order() {
    let (linecards, handle, _hooks) = setup(4, LineCardsConfig::default(), |_| {}).await;
    linecards.post_init().await.unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let first = Recorder::new("first", &log);
    let context: EventContext = Arc::new(());
    linecards
        .event_ops_register(Arc::clone(&first), Arc::clone(&context))
        .unwrap();
    linecards
        .event_ops_register(Recorder::new("second", &log), Arc::new(()))
        .unwrap();

    handle.insert_card(3, QSFP28_X16);
    handle.set_ready(3, true);
    wait_for_notifications(&log, 2).await;

    let seen = notifications(&log);
    assert_eq!(seen[0].observer, "first");
    assert_eq!(seen[1].observer, "second");
    assert!(seen.iter().all(|n| n.slot == 3 && n.active));

    assert_eq!(linecards.event_ops_unregister(&first, &context), 1);
    handle.set_active(3, false);
    wait_for_notifications(&log, 3).await;

    let seen = notifications(&log);
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].observer, "second");
    assert!(!seen[2].active);

    linecards.pre_fini().await;
}

#[tokio::test]
async fn test_status_for_unknown_slot_rejected_without_change() {
    let (linecards, handle, hooks) = setup(4, LineCardsConfig::default(), |_| {}).await;

    for index in [0u8, 9] {
        let payload = SlotStatus {
            slot_index: index,
            provisioned: true,
            ready: true,
            ..SlotStatus::default()
        }
        .encode();
        let result = linecards.process_status(None, &payload, false).await;
        assert!(matches!(result, Err(Error::InvalidSlot(_))), "slot {index}");
    }

    assert!(hooks.calls().is_empty());
    assert!(handle.control_writes().is_empty());
    for snapshot in linecards.snapshots().await {
        assert_eq!(snapshot.state(), SlotState::Empty);
    }
    assert!(matches!(
        linecards.refresh(linecard_core::SlotIndex::new(9).unwrap()).await,
        Err(Error::InvalidSlot(_))
    ));
}

#[tokio::test]
async fn test_failed_activation_leaves_ready_clear_until_retry() {
    let (linecards, handle, _hooks) = setup(2, LineCardsConfig::default(), |handle| {
        handle.set_auto_activate(false);
    })
    .await;

    let payload = SlotStatus {
        slot_index: 1,
        provisioned: true,
        ready: true,
        card_type: QSFP28_X16,
        ..SlotStatus::default()
    }
    .encode();

    handle.fail_next_writes(1);
    let result = linecards.process_status(None, &payload, false).await;
    assert!(matches!(result, Err(ref e) if e.is_retryable()));

    let snapshot = linecards.snapshot(slot(1)).await.unwrap();
    assert!(snapshot.provisioned);
    assert!(!snapshot.ready);
    assert_eq!(handle.activation_count(1), 0);

    let changes = linecards.process_status(None, &payload, false).await.unwrap();
    assert_eq!(changes.provisioned, None);
    assert_eq!(changes.ready, Some(true));
    assert_eq!(handle.activation_count(1), 1);
}

#[tokio::test]
async fn test_post_init_failure_disables_event_delivery() {
    let (linecards, handle, _hooks) = setup(3, LineCardsConfig::default(), |_| {}).await;
    handle.fail_slot(2, 1);

    let result = linecards.post_init().await;
    assert!(matches!(result, Err(Error::TransportError(_))));

    for index in 1..=3 {
        assert!(!handle.events_enabled(index), "lc{index}");
        assert!(!linecards.events_enabled(slot(index)).unwrap());
    }

    linecards.pre_fini().await;
}

#[tokio::test]
async fn test_card_removal_deactivates_and_unprovisions() {
    let (linecards, handle, hooks) = setup(2, LineCardsConfig::default(), |handle| {
        handle.insert_card(2, QSFP28_X16);
        handle.set_ready(2, true);
    })
    .await;
    let log = Arc::new(Mutex::new(Vec::new()));
    linecards
        .event_ops_register(Recorder::new("ports", &log), Arc::new(()))
        .unwrap();
    linecards.post_init().await.unwrap();
    wait_for_notifications(&log, 1).await;

    handle.remove_card(2);
    wait_for_state(&linecards, 2, SlotState::Empty).await;
    wait_for_notifications(&log, 2).await;

    assert!(!notifications(&log)[1].active);
    assert_eq!(hooks.calls(), vec![(2, true), (2, false)]);
    assert!(linecards.snapshot(slot(2)).await.unwrap().card.is_none());

    linecards.pre_fini().await;
}

#[tokio::test]
async fn test_provision_cycle_without_ready_issues_no_activation() {
    let (linecards, handle, hooks) = setup(3, LineCardsConfig::default(), |_| {}).await;
    linecards.post_init().await.unwrap();

    handle.insert_card(2, QSFP28_X16);
    wait_for_state(&linecards, 2, SlotState::Provisioned).await;
    handle.remove_card(2);
    wait_for_state(&linecards, 2, SlotState::Empty).await;

    assert_eq!(hooks.calls(), vec![(2, true), (2, false)]);
    assert_eq!(handle.activation_count(2), 0);
    assert!(handle.control_writes().is_empty());

    linecards.pre_fini().await;
}

#[tokio::test(start_paused = true)]
async fn test_poller_picks_up_changes_without_events() {
    let (firmware, handle) = MockFirmware::new(2);
    let config = LineCardsConfig {
        poll_interval_ms: Some(100),
        ..LineCardsConfig::default()
    };
    let linecards = LineCards::initialize(Arc::new(firmware), config)
        .await
        .unwrap()
        .unwrap();
    linecards.post_init().await.unwrap();

    // No event sink attached: only the poller can notice this.
    handle.insert_card(1, QSFP28_X16);
    handle.set_ready(1, true);

    wait_for_state(&linecards, 1, SlotState::Active).await;
    assert_eq!(handle.activation_count(1), 1);

    linecards.pre_fini().await;
}

#[tokio::test]
async fn test_device_binder_follows_activation() {
    let (linecards, handle, _hooks) = setup(2, LineCardsConfig::default(), |_| {}).await;
    let binder = Arc::new(DeviceBinder::new(
        Arc::clone(linecards.transport()),
        default_device_table,
    ));
    let ops: Arc<dyn LineCardEventOps> = binder.clone();
    let context: EventContext = Arc::new(());
    linecards
        .event_ops_register(Arc::clone(&ops), Arc::clone(&context))
        .unwrap();
    linecards.post_init().await.unwrap();

    handle.insert_card(1, QSFP56_X8);
    handle.set_ready(1, true);
    wait_for_state(&linecards, 1, SlotState::Active).await;
    assert_eq!(binder.devices(slot(1)).len(), 4);

    handle.set_ready(1, false);
    wait_for_state(&linecards, 1, SlotState::Provisioned).await;
    assert_eq!(binder.device_count(), 0);

    linecards.event_ops_unregister(&ops, &context);
    linecards.pre_fini().await;
    linecards.fini();
}
