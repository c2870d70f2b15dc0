//! The weak/strong ownership cell shared by the registry and the unload handoff.
//!
//! A registry entry normally observes its context weakly, so a collectible context
//! becomes unreachable as soon as its last [`crate::LoadContext`] handle is gone. While
//! an unload is in flight the same cell is promoted to a strong reference, which keeps
//! the context core alive for the native side until teardown is confirmed. Release is
//! unconditional and idempotent: whichever path completes the teardown demotes the
//! cell back to weak.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::context::ContextCore;

enum Slot {
    Weak(Weak<ContextCore>),
    Strong(Arc<ContextCore>),
}

/// Ownership cell holding either a weak or a strong reference to a context core.
pub(crate) struct HandleRef {
    slot: Mutex<Slot>,
}

impl HandleRef {
    /// Create a cell that only observes `core`.
    pub(crate) fn new_weak(core: Weak<ContextCore>) -> Self {
        Self {
            slot: Mutex::new(Slot::Weak(core)),
        }
    }

    /// Turn the cell into an owning reference.
    ///
    /// Returns `false` if the context is already gone and nothing could be promoted.
    pub(crate) fn promote(&self) -> bool {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Strong(_) => true,
            Slot::Weak(weak) => match weak.upgrade() {
                Some(core) => {
                    *slot = Slot::Strong(core);
                    true
                }
                None => false,
            },
        }
    }

    /// Demote the cell back to a weak reference.
    ///
    /// Safe to call any number of times. The strong reference is dropped after the
    /// cell lock is released, since it may be the last one keeping the core alive.
    pub(crate) fn release(&self) {
        let released = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Weak(_) => None,
                Slot::Strong(core) => {
                    let weak = Arc::downgrade(core);
                    match std::mem::replace(&mut *slot, Slot::Weak(weak)) {
                        Slot::Strong(core) => Some(core),
                        Slot::Weak(_) => None,
                    }
                }
            }
        };
        drop(released);
    }

    /// The referenced core, if it is still alive.
    pub(crate) fn get(&self) -> Option<Arc<ContextCore>> {
        match &*self.slot.lock() {
            Slot::Strong(core) => Some(Arc::clone(core)),
            Slot::Weak(weak) => weak.upgrade(),
        }
    }

    /// Whether the cell currently owns the core.
    pub(crate) fn is_strong(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Strong(_))
    }

    /// Whether the referenced core has been dropped.
    pub(crate) fn is_expired(&self) -> bool {
        match &*self.slot.lock() {
            Slot::Strong(_) => false,
            Slot::Weak(weak) => weak.strong_count() == 0,
        }
    }
}
