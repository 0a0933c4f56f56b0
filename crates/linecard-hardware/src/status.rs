//! Slot status processing.
//!
//! A processing pass takes one raw slot status payload, diffs it against the
//! slot's recorded flags and acts on each edge:
//!
//! | Flag | Rising edge | Falling edge |
//! |---|---|---|
//! | provisioned | `provision_set` hook | `provision_clear` hook |
//! | ready | activation command (MDDC) | none |
//! | active | record card info, `got_active` | `got_inactive` |
//!
//! The whole pass runs under the slot's lock. Passes on one slot are
//! therefore serialized and a snapshot never shows a half-applied pass.

use crate::events::ObserverRegistry;
use crate::provision::ProvisionHooks;
use crate::transport::{RegisterTransport, write_register};
use crate::types::{CardInfo, LineCardSnapshot, SlotChanges};
use linecard_core::{CardType, Error, Result, SlotIndex};
use linecard_protocol::{Register, SlotControl, SlotStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Recorded flags of one slot.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LineCardState {
    pub provisioned: bool,
    pub ready: bool,
    pub active: bool,
    pub card: Option<CardInfo>,
}

impl LineCardState {
    pub fn snapshot(&self, slot_index: SlotIndex) -> LineCardSnapshot {
        LineCardSnapshot {
            slot_index,
            provisioned: self.provisioned,
            ready: self.ready,
            active: self.active,
            card: if self.ready || self.active {
                self.card
            } else {
                None
            },
        }
    }
}

/// One entry of the slot table.
#[derive(Debug)]
pub(crate) struct Slot {
    pub index: SlotIndex,
    pub state: Mutex<LineCardState>,
    pub events_enabled: AtomicBool,
}

impl Slot {
    pub fn new(index: SlotIndex) -> Self {
        Self {
            index,
            state: Mutex::new(LineCardState::default()),
            events_enabled: AtomicBool::new(false),
        }
    }

    pub fn events_enabled(&self) -> bool {
        self.events_enabled.load(Ordering::Acquire)
    }

    pub fn set_events_enabled(&self, enabled: bool) {
        self.events_enabled.store(enabled, Ordering::Release);
    }
}

/// Applies slot status payloads to the slot table.
pub(crate) struct StatusProcessor<'a, T> {
    pub transport: &'a T,
    pub slots: &'a [Slot],
    pub observers: &'a ObserverRegistry,
    pub hooks: &'a dyn ProvisionHooks,
}

impl<'a, T: RegisterTransport> StatusProcessor<'a, T> {
    /// Find the slot a payload refers to.
    ///
    /// With `expected` set the payload must name exactly that slot;
    /// otherwise it must name a slot of this chassis.
    pub fn resolve(&self, expected: Option<SlotIndex>, reported: u8) -> Result<&'a Slot> {
        let index = match expected {
            Some(expected) if expected.as_u8() != reported => {
                return Err(Error::InvalidSlot(format!(
                    "status reports slot {reported}, expected {expected}"
                )));
            }
            Some(expected) => expected,
            None => SlotIndex::within(reported, self.slot_count())?,
        };

        self.slots.get(index.table_offset()).ok_or_else(|| {
            Error::InvalidSlot(format!(
                "{index} exceeds slot count {}",
                self.slot_count()
            ))
        })
    }

    fn slot_count(&self) -> u8 {
        u8::try_from(self.slots.len()).unwrap_or(u8::MAX)
    }

    /// Run one processing pass.
    ///
    /// With `provision_only` set only the provisioned flag is considered.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolMismatch` if the payload cannot be decoded.
    /// - `Error::InvalidSlot` if the payload names the wrong slot. No state
    ///   changes in that case.
    /// - `Error::TransportError` if the activation command fails. The ready
    ///   flag stays clear so that the next report retries the command.
    pub async fn process(
        &self,
        expected: Option<SlotIndex>,
        raw: &[u8],
        provision_only: bool,
    ) -> Result<SlotChanges> {
        let status = SlotStatus::decode(raw)?;
        let slot = self.resolve(expected, status.slot_index)?;
        let index = slot.index;

        let mut state = slot.state.lock().await;
        let mut changes = SlotChanges::default();

        if status.provisioned != state.provisioned {
            if status.provisioned {
                self.hooks.provision_set(index, &status);
                info!("{} provisioned (card type 0x{:02x})", index, status.card_type);
            } else {
                self.hooks.provision_clear(index);
                info!("{} unprovisioned", index);
            }
            state.provisioned = status.provisioned;
            changes.provisioned = Some(status.provisioned);
        }

        if provision_only {
            return Ok(changes);
        }

        if status.ready != state.ready {
            if status.ready {
                let command = SlotControl::activate(index.as_u8());
                if let Err(e) = write_register(self.transport, command).await {
                    warn!("{} activation failed: {}", index, e);
                    return Err(e);
                }
                state.card = Some(CardInfo::from(&status));
                info!("{} ready, activation requested", index);
            } else {
                info!("{} no longer ready", index);
            }
            state.ready = status.ready;
            changes.ready = Some(status.ready);
        }

        if status.active != state.active {
            state.active = status.active;
            changes.active = Some(status.active);

            if status.active {
                state.card = Some(CardInfo::from(&status));
                match CardType::try_from(status.card_type) {
                    Ok(card_type) => {
                        info!("{} active: {} rev {}", index, card_type, status.hw_revision)
                    }
                    Err(e) => warn!("{} active with {}", index, e),
                }
                self.observers.dispatch_active(index, &state.snapshot(index));
            } else {
                info!("{} inactive", index);
                self.observers.dispatch_inactive(index, &state.snapshot(index));
            }
        }

        if !changes.is_empty() {
            debug!("{} pass applied {:?}", index, changes);
        }
        Ok(changes)
    }
}
