//! The unload state machine.
//!
//! Three paths lead out of [`UnloadState::Alive`]:
//!
//! - an explicit [`crate::LoadContext::unload`],
//! - the last handle of a collectible, alive context being dropped ([`finalize`]),
//! - the host shutting down ([`sweep`]).
//!
//! The first two promote the registry handle to strong and hand a [`PendingRelease`]
//! to the native loader; completing that release fires `Unloading`. The shutdown sweep
//! skips the native round trip and fires `Unloading` directly. Every path moves the
//! state forward under the context's unload lock, so `Unloading` is delivered at most
//! once per context.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    context::{ContextCore, HandleRef, UnloadState},
    native::PendingRelease,
    Error, Result,
};

/// Explicit unload request.
pub(crate) fn unload(core: &Arc<ContextCore>) -> Result<()> {
    if !core.is_collectible() {
        return Err(Error::NotSupported(format!(
            "context {} is not collectible",
            core.id()
        )));
    }

    begin_unload(core)
}

/// Alive -> Unloading and the native handoff.
fn begin_unload(core: &Arc<ContextCore>) -> Result<()> {
    let state = core.state.lock();
    if state.get() != UnloadState::Alive {
        return Err(Error::AlreadyUnloaded(core.id()));
    }
    state.set(UnloadState::Unloading);
    core.handle.promote();

    info!(context = %core.id(), token = %core.token(), "unloading load context");
    let release = PendingRelease::new(Arc::clone(&core.handle), core.id(), core.token());
    core.host.loader().prepare_release(core.token(), release);
    Ok(())
}

/// Runs when the last [`crate::LoadContext`] handle of `core` goes away.
pub(crate) fn finalize(core: &Arc<ContextCore>) {
    if !core.is_collectible() || core.has_live_handle() {
        return;
    }
    if core.unload_state() != UnloadState::Alive {
        return;
    }

    debug!(context = %core.id(), "last handle dropped, unloading");
    if let Err(error) = begin_unload(core) {
        debug!(context = %core.id(), %error, "unload on drop skipped");
    }
}

/// Hand a context that never became reachable back to the native side.
///
/// Applies to non-collectible contexts as well.
pub(crate) fn discard(core: &Arc<ContextCore>) {
    if let Err(error) = begin_unload(core) {
        debug!(context = %core.id(), %error, "discard skipped");
    }
}

/// Completion of a [`PendingRelease`]: notify if still unloading, then drop the strong
/// reference.
pub(crate) fn complete_release(handle: &HandleRef) {
    if let Some(core) = handle.get() {
        on_unloading(&core);
    }
    handle.release();
}

/// Shutdown path: force the context out of Alive and notify without a native round trip.
pub(crate) fn sweep(core: &Arc<ContextCore>) {
    {
        let state = core.state.lock();
        if state.get() == UnloadState::Alive {
            state.set(UnloadState::Unloading);
        }
    }
    on_unloading(core);
}

/// Unloading -> Unloaded and delivery of the `Unloading` notification.
///
/// A no-op in any other state, which makes repeated completions harmless.
pub(crate) fn on_unloading(core: &Arc<ContextCore>) {
    let state = core.state.lock();
    if state.get() != UnloadState::Unloading {
        return;
    }
    state.set(UnloadState::Unloaded);

    let context = core.context();
    let handlers = core.unloading.snapshot();
    for handler in handlers {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(&context))) {
            warn!(
                context = %core.id(),
                panic = panic_message(payload.as_ref()),
                "unloading subscriber panicked"
            );
        }
    }
    drop(state);

    info!(context = %core.id(), "load context unloaded");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
