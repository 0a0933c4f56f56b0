//! Observer registration and dispatch.
//!
//! Components that care about line cards coming and going (port drivers,
//! environment monitors, device binders) implement [`LineCardEventOps`] and
//! register with the [`ObserverRegistry`] owned by a
//! [`LineCards`](crate::manager::LineCards) registry.
//!
//! # Concurrency
//!
//! The registration list is published as an immutable snapshot through
//! [`ArcSwap`]:
//!
//! * Dispatch loads the current snapshot without locking and iterates it in
//!   registration order.
//! * Register and unregister build a new list under a writer lock and swap
//!   it in. A dispatch already running keeps the list it loaded.
//!
//! Callbacks therefore run with no registry lock held and may themselves
//! register or unregister observers.

use crate::types::LineCardSnapshot;
use arc_swap::ArcSwap;
use linecard_core::{Error, Result, SlotIndex};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Opaque value handed back to an observer on every callback.
pub type EventContext = Arc<dyn Any + Send + Sync>;

/// Callbacks invoked on line card activation edges.
///
/// Callbacks are synchronous and run on the task processing the slot's
/// status, while that slot's processing lock is held. Long work should be
/// handed off to a separate task.
///
/// # Examples
///
/// ```
/// use linecard_core::SlotIndex;
/// use linecard_hardware::events::LineCardEventOps;
/// use linecard_hardware::types::LineCardSnapshot;
/// use std::any::Any;
///
/// struct PortDriver;
///
/// impl LineCardEventOps for PortDriver {
///     fn got_active(&self, slot: SlotIndex, linecard: &LineCardSnapshot, _context: &(dyn Any + Send + Sync)) {
///         println!("{slot} active: {:?}", linecard.card);
///     }
///
///     fn got_inactive(&self, slot: SlotIndex, _linecard: &LineCardSnapshot, _context: &(dyn Any + Send + Sync)) {
///         println!("{slot} inactive");
///     }
/// }
/// ```
pub trait LineCardEventOps: Send + Sync {
    /// Called after a slot became active.
    fn got_active(
        &self,
        slot: SlotIndex,
        linecard: &LineCardSnapshot,
        context: &(dyn Any + Send + Sync),
    );

    /// Called after a slot stopped being active.
    fn got_inactive(
        &self,
        slot: SlotIndex,
        linecard: &LineCardSnapshot,
        context: &(dyn Any + Send + Sync),
    );
}

#[derive(Clone)]
struct Registration {
    ops: Arc<dyn LineCardEventOps>,
    context: EventContext,
}

impl Registration {
    fn matches(&self, ops: &Arc<dyn LineCardEventOps>, context: &EventContext) -> bool {
        Arc::ptr_eq(&self.ops, ops) && Arc::ptr_eq(&self.context, context)
    }
}

/// Ordered list of observer registrations.
pub struct ObserverRegistry {
    entries: ArcSwap<Vec<Registration>>,
    writer: Mutex<()>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// Append an observer.
    ///
    /// The same `(ops, context)` pair may be registered more than once; each
    /// registration receives its own callbacks. Slots that are already
    /// active are not replayed to the new observer.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfMemory` if the new list cannot be allocated. The
    /// registry is unchanged in that case.
    pub fn register(&self, ops: Arc<dyn LineCardEventOps>, context: EventContext) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load();

        let mut next = Vec::new();
        next.try_reserve_exact(current.len() + 1)
            .map_err(|e| Error::OutOfMemory(format!("observer registration: {e}")))?;
        next.extend(current.iter().cloned());
        next.push(Registration { ops, context });

        let count = next.len();
        self.entries.store(Arc::new(next));
        debug!("Observer registered, {} total", count);
        Ok(())
    }

    /// Remove every registration of the `(ops, context)` pair.
    ///
    /// Pairs are compared by pointer identity. Returns the number of
    /// registrations removed; removing an unknown pair is a no-op.
    pub fn unregister(&self, ops: &Arc<dyn LineCardEventOps>, context: &EventContext) -> usize {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load_full();

        let next: Vec<Registration> = current
            .iter()
            .filter(|entry| !entry.matches(ops, context))
            .cloned()
            .collect();
        let removed = current.len() - next.len();

        if removed > 0 {
            self.entries.store(Arc::new(next));
            debug!("Observer unregistered, {} removed", removed);
        }
        removed
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Check if no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Invoke `got_active` on every registration, in registration order.
    pub fn dispatch_active(&self, slot: SlotIndex, linecard: &LineCardSnapshot) {
        for entry in self.entries.load_full().iter() {
            entry.ops.got_active(slot, linecard, &*entry.context);
        }
    }

    /// Invoke `got_inactive` on every registration, in registration order.
    pub fn dispatch_inactive(&self, slot: SlotIndex, linecard: &LineCardSnapshot) {
        for entry in self.entries.load_full().iter() {
            entry.ops.got_inactive(slot, linecard, &*entry.context);
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("registrations", &self.len())
            .finish()
    }
}
