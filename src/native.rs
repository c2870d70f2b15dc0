//! The interface to the native loader collaborator.
//!
//! Image parsing, mapping and file access live behind [`NativeLoader`]. The load context
//! layer only asks it to create a counterpart for every context, to load images into
//! that counterpart and to tear it down again. In the other direction the native side
//! calls [`crate::Host::resolve`] whenever code references a module that is not yet
//! loaded into a context, and completes every [`PendingRelease`] it is handed.

use std::{fmt, path::Path, sync::Arc};

use bitflags::bitflags;

use crate::{
    context::{unload, ContextId, HandleRef},
    module::ModuleRc,
    Result,
};

bitflags! {
    /// Properties of a context passed to [`NativeLoader::create_context`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextFlags: u32 {
        /// The host's default context
        const DEFAULT = 0x0001;
        /// The context may be unloaded
        const COLLECTIBLE = 0x0002;
    }
}

/// Opaque handle of the native counterpart of a load context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeToken(u64);

impl NativeToken {
    /// Wrap a native handle value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw handle value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

/// The native side of module loading.
///
/// Implementations must be thread-safe: every method can be called concurrently from
/// arbitrary threads. Loads for one context are serialized by that context's unload
/// lock, which is held for the duration of `load_from_path` / `load_from_bytes`.
pub trait NativeLoader: Send + Sync {
    /// Allocate the native counterpart of the context `id`.
    ///
    /// # Errors
    /// A failure aborts the construction of the context.
    fn create_context(&self, id: ContextId, flags: ContextFlags) -> Result<NativeToken>;

    /// Begin native teardown of `token`.
    ///
    /// `release` owns the context until it is completed, either explicitly through
    /// [`PendingRelease::complete`] or by dropping it. The context's `Unloading`
    /// notification fires at that point.
    fn prepare_release(&self, token: NativeToken, release: PendingRelease);

    /// Load the image at `primary` (and optionally a companion file such as symbols).
    ///
    /// The returned module must report the context that owns `token`.
    ///
    /// # Errors
    /// Any loader failure is returned to the caller of the load unchanged.
    fn load_from_path(
        &self,
        token: NativeToken,
        primary: &Path,
        companion: Option<&Path>,
    ) -> Result<ModuleRc>;

    /// Load an in-memory image (and optionally a companion image).
    ///
    /// # Errors
    /// Any loader failure is returned to the caller of the load unchanged.
    fn load_from_bytes(
        &self,
        token: NativeToken,
        primary: &[u8],
        companion: Option<&[u8]>,
    ) -> Result<ModuleRc>;
}

/// A strong reference to an unloading context, handed to the native loader.
///
/// Consuming it (via [`PendingRelease::complete`] or drop) finishes the teardown exactly
/// once: the context moves to Unloaded, its `Unloading` subscribers run on the calling
/// thread, and the strong reference is released.
pub struct PendingRelease {
    handle: Option<Arc<HandleRef>>,
    context: ContextId,
    token: NativeToken,
}

impl PendingRelease {
    pub(crate) fn new(handle: Arc<HandleRef>, context: ContextId, token: NativeToken) -> Self {
        Self {
            handle: Some(handle),
            context,
            token,
        }
    }

    /// The context being torn down.
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// The native token of the context being torn down.
    #[must_use]
    pub fn token(&self) -> NativeToken {
        self.token
    }

    /// Signal that native teardown is complete.
    pub fn complete(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            unload::complete_release(&handle);
        }
    }
}

impl Drop for PendingRelease {
    fn drop(&mut self) {
        self.finish();
    }
}

impl fmt::Debug for PendingRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRelease")
            .field("context", &self.context)
            .field("token", &self.token)
            .field("completed", &self.handle.is_none())
            .finish()
    }
}
