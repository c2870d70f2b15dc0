//! Shared fixtures for the integration tests.
//!
//! [`DiskLoader`] plays the native side: a module image is a text file whose content is
//! the module's display name, for example `Plugin.Core, Version=1.0.0.0`.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use alcove::{
    ContextFlags, ContextId, Error, Module, ModuleName, ModuleOrigin, ModuleRc, NativeLoader,
    NativeToken, PendingRelease, Result,
};
use tempfile::TempDir;

#[derive(Default)]
struct DiskState {
    deferred: bool,
    next_token: AtomicU64,
    owners: Mutex<HashMap<NativeToken, ContextId>>,
    pending: Mutex<Vec<PendingRelease>>,
}

/// Native loader that reads module images from disk.
#[derive(Clone, Default)]
pub struct DiskLoader {
    state: Arc<DiskState>,
}

impl DiskLoader {
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Keeps every release until [`DiskLoader::take_pending`] hands it out.
    pub fn deferred() -> Self {
        Self {
            state: Arc::new(DiskState {
                deferred: true,
                ..DiskState::default()
            }),
        }
    }

    pub fn take_pending(&self) -> Vec<PendingRelease> {
        std::mem::take(&mut *self.state.pending.lock().unwrap())
    }

    fn owner(&self, token: NativeToken) -> Result<ContextId> {
        self.state
            .owners
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .ok_or_else(|| Error::Native(format!("unknown context token {token}")))
    }
}

impl NativeLoader for DiskLoader {
    fn create_context(&self, id: ContextId, _flags: ContextFlags) -> Result<NativeToken> {
        let token = NativeToken::new(self.state.next_token.fetch_add(1, Ordering::SeqCst) + 1);
        self.state.owners.lock().unwrap().insert(token, id);
        Ok(token)
    }

    fn prepare_release(&self, _token: NativeToken, release: PendingRelease) {
        if self.state.deferred {
            self.state.pending.lock().unwrap().push(release);
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
        let image = fs::read_to_string(primary)?;
        if let Some(companion) = companion {
            fs::metadata(companion)?;
        }

        Ok(Module::new_rc(
            ModuleName::parse(image.trim())?,
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
        let image = std::str::from_utf8(primary)
            .map_err(|error| Error::Native(format!("invalid image: {error}")))?;

        Ok(Module::new_rc(
            ModuleName::parse(image.trim())?,
            context,
            ModuleOrigin::Bytes {
                len: primary.len(),
                companion: companion.is_some(),
            },
        ))
    }
}

/// A temporary plugin directory.
pub struct PluginDir {
    dir: TempDir,
}

impl PluginDir {
    pub fn new() -> std::result::Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Write an image for `display_name` as `<simple name>.dll` and return its path.
    pub fn add(
        &self,
        display_name: &str,
    ) -> std::result::Result<PathBuf, Box<dyn std::error::Error>> {
        let name = ModuleName::parse(display_name)?;
        let path = self.path_for(name.simple_name());
        fs::write(&path, display_name)?;
        Ok(path)
    }

    pub fn path_for(&self, simple_name: &str) -> PathBuf {
        self.dir.path().join(format!("{simple_name}.dll"))
    }
}
