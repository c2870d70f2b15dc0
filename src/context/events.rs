//! Ordered subscriber lists for the `Resolving` and `Unloading` notifications.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::{context::LoadContext, identity::ModuleName, module::ModuleRc, Result};

/// Fallback resolver invoked when neither the hook nor the default context resolved a
/// reference. Returning `Ok(None)` passes the request on to the next subscriber.
pub type ResolvingHandler =
    dyn Fn(&LoadContext, &ModuleName) -> Result<Option<ModuleRc>> + Send + Sync;

/// Notification that a context finished tearing down.
pub type UnloadingHandler = dyn Fn(&LoadContext) + Send + Sync;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration on an event slot; used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscribers in registration order.
///
/// Invocation always works on a snapshot, so handlers may subscribe or unsubscribe
/// (themselves included) while a notification is being delivered.
pub(crate) struct EventSlot<H: ?Sized> {
    subscribers: Mutex<Vec<(SubscriptionId, Arc<H>)>>,
}

impl<H: ?Sized> EventSlot<H> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, handler: Arc<H>) -> SubscriptionId {
        let id = SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, handler));
        id
    }

    /// Returns `false` if `id` was not registered on this slot.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<H>> {
        self.subscribers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.lock().len()
    }
}
