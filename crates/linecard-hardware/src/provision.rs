//! Hooks run when a slot's provisioned flag changes.
//!
//! Provisioning is where a platform checks that the card the firmware
//! provisioned is one it can drive (card type, power budget, CPLD and INI
//! versions). The registry calls these hooks with the slot's processing lock
//! held, before committing the new flag.

use linecard_core::SlotIndex;
use linecard_protocol::SlotStatus;

/// Strategy invoked on provisioned-flag edges.
///
/// Both methods default to doing nothing.
pub trait ProvisionHooks: Send + Sync {
    /// A card was provisioned in `slot`.
    fn provision_set(&self, slot: SlotIndex, status: &SlotStatus) {
        let _ = (slot, status);
    }

    /// The card in `slot` was unprovisioned.
    fn provision_clear(&self, slot: SlotIndex) {
        let _ = slot;
    }
}

/// Hooks that accept every card.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisionHooks;

impl ProvisionHooks for NoopProvisionHooks {}
