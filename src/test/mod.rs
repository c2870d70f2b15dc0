//! Test doubles for the native side of module loading.
//!
//! [`MockLoader`] records every call it receives. Modules loaded from a path are named
//! after the file stem; modules loaded from bytes parse the image as a UTF-8 display
//! name, so `b"Lib, Version=1.2.0.0"` yields a module `Lib` of version 1.2.0.0.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::{
    module::{Module, ModuleOrigin, ModuleRc},
    native::{ContextFlags, NativeLoader, NativeToken, PendingRelease},
    ContextId, Error, ModuleName, Result,
};

#[derive(Default)]
struct MockState {
    deferred: bool,
    fail_create: AtomicBool,
    next_token: AtomicU64,
    contexts: Mutex<HashMap<NativeToken, (ContextId, ContextFlags)>>,
    pending: Mutex<Vec<PendingRelease>>,
    creates: AtomicUsize,
    loads: AtomicUsize,
    releases: AtomicUsize,
}

/// A recording [`NativeLoader`].
///
/// Clones share their state, so a test can keep one clone for inspection while the host
/// owns the other.
#[derive(Clone, Default)]
pub struct MockLoader {
    state: Arc<MockState>,
}

impl MockLoader {
    /// Completes every release immediately inside `prepare_release`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues releases until [`MockLoader::complete_pending`] is called.
    pub fn deferred() -> Self {
        Self {
            state: Arc::new(MockState {
                deferred: true,
                ..MockState::default()
            }),
        }
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Complete all queued releases, in the order they were handed over.
    pub fn complete_pending(&self) {
        let pending = std::mem::take(&mut *self.state.pending.lock());
        for release in pending {
            release.complete();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending.lock().len()
    }

    pub fn create_count(&self) -> usize {
        self.state.creates.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.state.loads.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    pub fn flags_of(&self, id: ContextId) -> Option<ContextFlags> {
        self.state
            .contexts
            .lock()
            .values()
            .find(|(context, _)| *context == id)
            .map(|(_, flags)| *flags)
    }

    fn owner(&self, token: NativeToken) -> Result<ContextId> {
        self.state
            .contexts
            .lock()
            .get(&token)
            .map(|(id, _)| *id)
            .ok_or_else(|| Error::Native(format!("unknown token {token}")))
    }
}

impl NativeLoader for MockLoader {
    fn create_context(&self, id: ContextId, flags: ContextFlags) -> Result<NativeToken> {
        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Native("create_context failed".to_string()));
        }

        self.state.creates.fetch_add(1, Ordering::SeqCst);
        let token = NativeToken::new(0x1000 + self.state.next_token.fetch_add(1, Ordering::SeqCst));
        self.state.contexts.lock().insert(token, (id, flags));
        Ok(token)
    }

    fn prepare_release(&self, _token: NativeToken, release: PendingRelease) {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
        if self.state.deferred {
            self.state.pending.lock().push(release);
        } else {
            release.complete();
        }
    }

    fn load_from_path(
        &self,
        token: NativeToken,
        primary: &Path,
        companion: Option<&Path>,
    ) -> Result<ModuleRc> {
        let context = self.owner(token)?;
        let stem = primary
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::Native(format!("no file name in {}", primary.display())))?;

        self.state.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Module::new_rc(
            ModuleName::simple(stem),
            context,
            ModuleOrigin::Path {
                primary: primary.to_path_buf(),
                companion: companion.map(Path::to_path_buf),
            },
        ))
    }

    fn load_from_bytes(
        &self,
        token: NativeToken,
        primary: &[u8],
        companion: Option<&[u8]>,
    ) -> Result<ModuleRc> {
        let context = self.owner(token)?;
        let display_name = std::str::from_utf8(primary)
            .map_err(|error| Error::Native(format!("image is not a display name: {error}")))?;
        let name = ModuleName::parse(display_name)?;

        self.state.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Module::new_rc(
            name,
            context,
            ModuleOrigin::Bytes {
                len: primary.len(),
                companion: companion.is_some(),
            },
        ))
    }
}

/// An absolute path for `file_name` that is valid on every platform.
pub fn absolute(file_name: &str) -> PathBuf {
    std::env::temp_dir().join(file_name)
}
