//! Host-wide table of load contexts.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    context::{ContextId, HandleRef},
    Error, Result,
};

struct RegistryState {
    next_id: u64,
    exiting: bool,
    entries: BTreeMap<ContextId, Arc<HandleRef>>,
}

/// Every context of a host, keyed by id, observed through its [`HandleRef`].
///
/// All operations take one short-lived lock; callbacks are never invoked while it is
/// held.
pub(crate) struct ContextRegistry {
    state: Mutex<RegistryState>,
}

impl ContextRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_id: 1,
                exiting: false,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// Allocate the id for a context about to be constructed.
    pub(crate) fn reserve_id(&self) -> Result<ContextId> {
        let mut state = self.state.lock();
        if state.exiting {
            return Err(Error::ProcessExiting);
        }

        let id = ContextId::new(state.next_id);
        state.next_id += 1;
        Ok(id)
    }

    /// Register the handle of a fully constructed context.
    pub(crate) fn insert(&self, id: ContextId, handle: Arc<HandleRef>) -> Result<()> {
        let mut state = self.state.lock();
        if state.exiting {
            return Err(Error::ProcessExiting);
        }

        state.entries.insert(id, handle);
        Ok(())
    }

    pub(crate) fn get(&self, id: ContextId) -> Option<Arc<HandleRef>> {
        self.state.lock().entries.get(&id).cloned()
    }

    /// The handles of all contexts that are still reachable, in id order.
    ///
    /// Entries whose context has been dropped are pruned.
    pub(crate) fn snapshot(&self) -> Vec<Arc<HandleRef>> {
        let mut state = self.state.lock();
        state.entries.retain(|_, handle| !handle.is_expired());
        state.entries.values().cloned().collect()
    }

    /// Enter the exiting state and take every entry out of the table.
    ///
    /// Returns nothing if the registry already exited.
    pub(crate) fn drain_for_exit(&self) -> Vec<Arc<HandleRef>> {
        let mut state = self.state.lock();
        if state.exiting {
            return Vec::new();
        }

        state.exiting = true;
        std::mem::take(&mut state.entries).into_values().collect()
    }

    pub(crate) fn is_exiting(&self) -> bool {
        self.state.lock().exiting
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}
