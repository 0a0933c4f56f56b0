//! Line card registry and lifecycle.
//!
//! [`LineCards`] owns the slot table of a modular chassis. It discovers the
//! slots, records the provisioning state of each, turns firmware status
//! reports into lifecycle transitions and notifies observers.
//!
//! # Architecture
//!
//! Status reports reach the registry through three paths, all ending in the
//! same per-slot processing pass:
//!
//! ```text
//! ┌────────────┐       ┌───────────────┐       ┌──────────────┐
//! │ Firmware   │──────►│  Event Queue  │──────►│ Event Worker │──┐
//! │ events     │       │  (mpsc)       │       │ task         │  │
//! └────────────┘       └───────────────┘       └──────────────┘  │
//!                                                                ▼
//! ┌────────────┐                                       ┌──────────────────┐
//! │ Poller     │──────────────────────────────────────►│ Per-slot pass    │──► Observers
//! │ task       │                                       │ (slot lock held) │
//! └────────────┘                                       └──────────────────┘
//!                                                                ▲
//! ┌────────────┐                                                 │
//! │ refresh()  │─────────────────────────────────────────────────┘
//! └────────────┘
//! ```
//!
//! # Lifecycle
//!
//! 1. [`LineCardsBuilder::initialize`] queries the slot count and records
//!    which slots are provisioned.
//! 2. [`LineCards::post_init`] starts the event worker, enables event
//!    delivery and brings every slot up to date.
//! 3. [`LineCards::pre_fini`] disables event delivery and waits for
//!    processing already in flight.
//! 4. [`LineCards::fini`] releases the registry.
//!
//! # Examples
//!
//! ```
//! use linecard_hardware::config::LineCardsConfig;
//! use linecard_hardware::manager::LineCards;
//! use linecard_hardware::mock::MockFirmware;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> linecard_core::Result<()> {
//!     let (firmware, handle) = MockFirmware::new(4);
//!     handle.insert_card(2, 0x01);
//!
//!     let Some(linecards) = LineCards::initialize(Arc::new(firmware), LineCardsConfig::default()).await? else {
//!         return Ok(());
//!     };
//!     linecards.post_init().await?;
//!
//!     let slot = linecard_core::SlotIndex::new(2)?;
//!     assert!(linecards.snapshot(slot).await?.provisioned);
//!
//!     linecards.pre_fini().await;
//!     linecards.fini();
//!     Ok(())
//! }
//! ```

use crate::config::LineCardsConfig;
use crate::events::{EventContext, LineCardEventOps, ObserverRegistry};
use crate::provision::{NoopProvisionHooks, ProvisionHooks};
use crate::sensors::SensorMapResolver;
use crate::status::{LineCardState, Slot, StatusProcessor};
use crate::transport::{RegisterTransport, TimeoutTransport, query_register, write_register};
use crate::types::{LineCardSnapshot, SlotChanges};
use bytes::Bytes;
use linecard_core::constants::MAX_SLOT_INDEX;
use linecard_core::{Error, Result, SlotIndex};
use linecard_protocol::{Capability, CapabilityRequest, Register, SlotStatus, SlotStatusRequest};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, RwLockReadGuard, mpsc};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

fn shutting_down() -> Error {
    Error::InvalidState("line card registry is shutting down".to_string())
}

/// Intake for asynchronous slot status payloads.
///
/// Obtained from [`LineCards::event_sender`] and handed to whatever receives
/// status events from the firmware. Payloads are queued and processed in
/// order by a single worker task.
#[derive(Debug, Clone)]
pub struct StatusEventSender {
    tx: mpsc::Sender<Bytes>,
}

impl StatusEventSender {
    /// Queue a status payload, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` once the registry has shut down.
    pub async fn deliver(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.tx
            .send(payload.into())
            .await
            .map_err(|_| shutting_down())
    }

    /// Queue a status payload without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Error::TransportError` if the queue is full, or
    /// `Error::InvalidState` once the registry has shut down.
    pub fn try_deliver(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.tx.try_send(payload.into()).map_err(|e| match e {
            TrySendError::Full(_) => {
                Error::TransportError("status event queue is full".to_string())
            }
            TrySendError::Closed(_) => shutting_down(),
        })
    }
}

/// State shared between the registry and its background tasks.
struct Shared<T> {
    /// Bounded by the configured transport timeout.
    transport: Arc<TimeoutTransport<Arc<T>>>,
    slots: Box<[Slot]>,
    observers: ObserverRegistry,
    hooks: Arc<dyn ProvisionHooks>,
    /// Set by `pre_fini`. Every pass holds a read guard.
    closed: RwLock<bool>,
}

impl<T: RegisterTransport> Shared<T> {
    fn processor(&self) -> StatusProcessor<'_, TimeoutTransport<Arc<T>>> {
        StatusProcessor {
            transport: &*self.transport,
            slots: &self.slots,
            observers: &self.observers,
            hooks: &*self.hooks,
        }
    }

    fn slot(&self, index: SlotIndex) -> Result<&Slot> {
        self.slots.get(index.table_offset()).ok_or_else(|| {
            Error::InvalidSlot(format!(
                "{index} exceeds slot count {}",
                self.slots.len()
            ))
        })
    }

    async fn enter(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let closed = self.closed.read().await;
        if *closed {
            return Err(shutting_down());
        }
        Ok(closed)
    }

    async fn process(
        &self,
        expected: Option<SlotIndex>,
        raw: &[u8],
        provision_only: bool,
    ) -> Result<SlotChanges> {
        let _open = self.enter().await?;
        self.processor().process(expected, raw, provision_only).await
    }

    /// Query a slot's status and run a pass on the response.
    async fn fetch_status(&self, slot: SlotIndex, provision_only: bool) -> Result<SlotChanges> {
        let _open = self.enter().await?;
        let request = SlotStatusRequest::slot_info(slot.as_u8());
        let raw = self.transport.query(SlotStatusRequest::ID, request.encode()).await?;
        self.processor().process(Some(slot), &raw, provision_only).await
    }

    async fn handle_event(&self, raw: &[u8]) {
        let reported = match SlotStatus::decode(raw) {
            Ok(status) => status.slot_index,
            Err(e) => {
                warn!("Dropping malformed status event: {}", e);
                return;
            }
        };

        let disabled = SlotIndex::new(reported)
            .and_then(|index| self.slot(index))
            .is_ok_and(|slot| !slot.events_enabled());
        if disabled {
            debug!("Dropping status event for lc{}, delivery disabled", reported);
            return;
        }

        if let Err(e) = self.process(None, raw, false).await {
            warn!("Status event for lc{} rejected: {}", reported, e);
        }
    }

    async fn set_event_delivery(&self, slot: &Slot, enable: bool) -> Result<()> {
        if !enable {
            slot.set_events_enabled(false);
        }
        let request = SlotStatusRequest::event_delivery(slot.index.as_u8(), enable);
        write_register(&*self.transport, request).await?;
        if enable {
            slot.set_events_enabled(true);
        }
        debug!("{} status events {}", slot.index, if enable { "enabled" } else { "disabled" });
        Ok(())
    }

    async fn clear_provisioning(&self, slot: &Slot) {
        let mut state = slot.state.lock().await;
        if state.provisioned {
            self.hooks.provision_clear(slot.index);
        }
        *state = LineCardState::default();
    }
}

/// Builder for a [`LineCards`] registry.
pub struct LineCardsBuilder<T> {
    transport: Arc<T>,
    config: LineCardsConfig,
    hooks: Arc<dyn ProvisionHooks>,
}

impl<T: RegisterTransport> LineCardsBuilder<T> {
    /// Set the registry configuration.
    pub fn config(mut self, config: LineCardsConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the hooks run on provisioned-flag edges.
    pub fn provision_hooks(mut self, hooks: Arc<dyn ProvisionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Discover the chassis slots and record their provisioning state.
    ///
    /// Returns `Ok(None)` for a fixed chassis without line card slots.
    /// Event delivery stays disabled until [`LineCards::post_init`].
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the configuration is invalid.
    /// - `Error::ProtocolMismatch` if the firmware reports more slots than
    ///   the slot index can address, or a malformed response.
    /// - `Error::OutOfMemory` if the slot table cannot be allocated.
    /// - `Error::TransportError` if a query fails or outlasts
    ///   `transport_timeout_ms`. Slots already recorded are unwound through
    ///   the `provision_clear` hook.
    ///
    /// Every register access the registry makes from here on is bounded by
    /// `transport_timeout_ms`.
    pub async fn initialize(self) -> Result<Option<LineCards<T>>> {
        let Self {
            transport,
            config,
            hooks,
        } = self;
        config.validate()?;
        let transport = Arc::new(TimeoutTransport::from_config(transport, &config));

        let capability: Capability =
            query_register(&*transport, CapabilityRequest::main_board()).await?;
        let count = capability.num_of_slots;
        if count == 0 {
            info!("Chassis has no line card slots");
            return Ok(None);
        }
        if count > MAX_SLOT_INDEX {
            return Err(Error::ProtocolMismatch(format!(
                "chassis reports {count} slots, at most {MAX_SLOT_INDEX} are addressable"
            )));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(usize::from(count))
            .map_err(|e| Error::OutOfMemory(format!("slot table of {count} entries: {e}")))?;
        slots.extend(SlotIndex::all(count).map(Slot::new));

        let (event_tx, event_rx) = mpsc::channel(config.event_queue_depth);
        let linecards = LineCards {
            shared: Arc::new(Shared {
                transport,
                slots: slots.into_boxed_slice(),
                observers: ObserverRegistry::new(),
                hooks,
                closed: RwLock::new(false),
            }),
            config,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            tasks: Mutex::new(JoinSet::new()),
            shutdown: CancellationToken::new(),
        };

        let shared = &linecards.shared;
        for (position, slot) in shared.slots.iter().enumerate() {
            if let Err(e) = shared.fetch_status(slot.index, true).await {
                error!("Initial status query for {} failed: {}", slot.index, e);
                for done in shared.slots[..position].iter().rev() {
                    shared.clear_provisioning(done).await;
                }
                return Err(e);
            }
        }

        info!("Line card registry initialized with {} slots", count);
        Ok(Some(linecards))
    }
}

/// Registry of the line card slots of one chassis.
pub struct LineCards<T> {
    shared: Arc<Shared<T>>,
    config: LineCardsConfig,
    event_tx: mpsc::Sender<Bytes>,
    event_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
    tasks: Mutex<JoinSet<()>>,
    shutdown: CancellationToken,
}

impl<T: RegisterTransport> LineCards<T> {
    /// Start building a registry over `transport`.
    pub fn builder(transport: Arc<T>) -> LineCardsBuilder<T> {
        LineCardsBuilder {
            transport,
            config: LineCardsConfig::default(),
            hooks: Arc::new(NoopProvisionHooks),
        }
    }

    /// Initialize a registry with no-op provisioning hooks.
    ///
    /// See [`LineCardsBuilder::initialize`].
    ///
    /// # Errors
    ///
    /// Same as [`LineCardsBuilder::initialize`].
    pub async fn initialize(transport: Arc<T>, config: LineCardsConfig) -> Result<Option<Self>> {
        Self::builder(transport).config(config).initialize().await
    }

    /// Start event processing and bring every slot up to date.
    ///
    /// For each slot in ascending order, enables event delivery and runs a
    /// full processing pass on a fresh status query.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if called twice or after `pre_fini`.
    /// - Any error of the failing slot. Event delivery is disabled again on
    ///   every slot already advanced, the failing one included.
    pub async fn post_init(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(shutting_down());
        }
        let event_rx = self
            .event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::InvalidState("post_init already ran".to_string()))?;

        self.spawn(run_event_worker(
            Arc::clone(&self.shared),
            event_rx,
            self.shutdown.clone(),
        ));

        let shared = &self.shared;
        for (position, slot) in shared.slots.iter().enumerate() {
            let result = match shared.set_event_delivery(slot, true).await {
                Ok(()) => shared.fetch_status(slot.index, false).await.map(|_| ()),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!("Bringing up {} failed: {}", slot.index, e);
                for done in shared.slots[..=position].iter().rev() {
                    if let Err(e) = shared.set_event_delivery(done, false).await {
                        warn!("Failed to disable status events for {}: {}", done.index, e);
                    }
                }
                return Err(e);
            }
        }

        if let Some(period) = self.config.poll_interval() {
            self.spawn(run_poller(
                Arc::clone(&self.shared),
                period,
                self.shutdown.clone(),
            ));
        }

        info!("Line card event processing started");
        Ok(())
    }

    /// Stop event processing.
    ///
    /// Disables event delivery on every slot, then waits until processing
    /// already in flight has finished. No observer callback runs after this
    /// returns, and every intake path fails with `Error::InvalidState`.
    /// Transport failures while disabling delivery are logged.
    pub async fn pre_fini(&self) {
        if *self.shared.closed.read().await {
            return;
        }

        for slot in self.shared.slots.iter() {
            if let Err(e) = self.shared.set_event_delivery(slot, false).await {
                warn!("Failed to disable status events for {}: {}", slot.index, e);
            }
        }

        self.shutdown.cancel();
        drop(self.event_rx.lock().unwrap_or_else(PoisonError::into_inner).take());
        *self.shared.closed.write().await = true;

        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                error!("Line card task panicked: {}", e);
            }
        }

        info!("Line card event processing drained");
    }

    /// Release the registry.
    ///
    /// Observers should have unregistered by now; any left behind are
    /// reported but not an error.
    pub fn fini(self) {
        let remaining = self.shared.observers.len();
        if remaining > 0 {
            warn!("{} line card observers still registered at fini", remaining);
        }
        if !self.shutdown.is_cancelled() {
            warn!("Line card registry finalized without pre_fini");
            self.shutdown.cancel();
        }
        info!("Line card registry finalized");
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spawn(task);
    }

    /// Number of slots in the chassis.
    pub fn count(&self) -> u8 {
        u8::try_from(self.shared.slots.len()).unwrap_or(MAX_SLOT_INDEX)
    }

    /// Indices of every slot, ascending.
    pub fn slot_indices(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.shared.slots.iter().map(|slot| slot.index)
    }

    /// Get the registry configuration.
    pub fn config(&self) -> &LineCardsConfig {
        &self.config
    }

    /// Get the register transport, without the timeout bound.
    pub fn transport(&self) -> &Arc<T> {
        self.shared.transport.inner()
    }

    /// Get the observer registry.
    pub fn observers(&self) -> &ObserverRegistry {
        &self.shared.observers
    }

    /// Register an observer. See [`ObserverRegistry::register`].
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfMemory` if the registration cannot be stored.
    pub fn event_ops_register(
        &self,
        ops: Arc<dyn LineCardEventOps>,
        context: EventContext,
    ) -> Result<()> {
        self.shared.observers.register(ops, context)
    }

    /// Unregister an observer. See [`ObserverRegistry::unregister`].
    pub fn event_ops_unregister(
        &self,
        ops: &Arc<dyn LineCardEventOps>,
        context: &EventContext,
    ) -> usize {
        self.shared.observers.unregister(ops, context)
    }

    /// Get an intake for asynchronous status payloads.
    pub fn event_sender(&self) -> StatusEventSender {
        StatusEventSender {
            tx: self.event_tx.clone(),
        }
    }

    /// Run a processing pass on a status payload.
    ///
    /// With `expected` set the payload must name that slot; otherwise it
    /// must name a slot of this chassis. With `provision_only` set only the
    /// provisioned flag is considered.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` after `pre_fini`, otherwise the errors
    /// of the pass itself (`InvalidSlot`, `ProtocolMismatch`,
    /// `TransportError`).
    pub async fn process_status(
        &self,
        expected: Option<SlotIndex>,
        raw: &[u8],
        provision_only: bool,
    ) -> Result<SlotChanges> {
        self.shared.process(expected, raw, provision_only).await
    }

    /// Query a slot's current status and process it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSlot` for a slot outside this chassis,
    /// `Error::InvalidState` after `pre_fini`, or the errors of the pass.
    pub async fn refresh(&self, slot: SlotIndex) -> Result<SlotChanges> {
        self.shared.slot(slot)?;
        self.shared.fetch_status(slot, false).await
    }

    /// Snapshot one slot.
    ///
    /// Waits for a processing pass running on the slot to finish.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSlot` for a slot outside this chassis.
    pub async fn snapshot(&self, slot: SlotIndex) -> Result<LineCardSnapshot> {
        let entry = self.shared.slot(slot)?;
        let state = entry.state.lock().await;
        Ok(state.snapshot(slot))
    }

    /// Snapshot every slot, ascending.
    pub async fn snapshots(&self) -> Vec<LineCardSnapshot> {
        let mut snapshots = Vec::with_capacity(self.shared.slots.len());
        for slot in self.shared.slots.iter() {
            snapshots.push(slot.state.lock().await.snapshot(slot.index));
        }
        snapshots
    }

    /// Check if status events are being accepted for a slot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSlot` for a slot outside this chassis.
    pub fn events_enabled(&self, slot: SlotIndex) -> Result<bool> {
        Ok(self.shared.slot(slot)?.events_enabled())
    }

    /// Get a sensor map resolver sharing this registry's transport.
    pub fn sensor_resolver(&self) -> SensorMapResolver<TimeoutTransport<Arc<T>>> {
        SensorMapResolver::new(Arc::clone(&self.shared.transport))
    }
}

impl<T> fmt::Debug for LineCards<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineCards")
            .field("slots", &self.shared.slots.len())
            .field("observers", &self.shared.observers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Drain the event queue until shutdown.
///
/// Cancellation is only observed between payloads, so a pass that has
/// started always completes.
async fn run_event_worker<T: RegisterTransport>(
    shared: Arc<Shared<T>>,
    mut events: mpsc::Receiver<Bytes>,
    shutdown: CancellationToken,
) {
    debug!("Status event worker started");
    loop {
        let raw = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            raw = events.recv() => match raw {
                Some(raw) => raw,
                None => break,
            },
        };
        shared.handle_event(&raw).await;
    }
    debug!("Status event worker stopped");
}

/// Refresh every slot once per `period` until shutdown.
async fn run_poller<T: RegisterTransport>(
    shared: Arc<Shared<T>>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    debug!("Status poller started, period {:?}", period);
    'poll: loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        for slot in shared.slots.iter() {
            if shutdown.is_cancelled() {
                break 'poll;
            }
            match shared.fetch_status(slot.index, false).await {
                Ok(_) => {}
                Err(Error::InvalidState(_)) => break 'poll,
                Err(e) => warn!("Polling {} failed: {}", slot.index, e),
            }
        }
    }
    debug!("Status poller stopped");
}
