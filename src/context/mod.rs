//! Load contexts: isolated namespaces for loading and resolving modules.
//!
//! A [`LoadContext`] owns the modules loaded into it, decides how references are
//! resolved through its [`LoadHook`] and `Resolving` subscribers, and, when
//! collectible, can be unloaded again while the process keeps running.
//!
//! # Architecture
//!
//! - **`ContextCore`**: the shared state of one context (id, flags, unload state,
//!   event slots, loaded modules). The registry observes it through a [`HandleRef`].
//! - **[`LoadContext`]**: the handle application code holds. All clones share one
//!   anchor; when the last clone of a collectible, still alive context is dropped, the
//!   anchor starts the unload on its own (see [`unload`]).
//! - **[`ContextBuilder`]**: constructs and registers contexts against a [`crate::Host`].
//!
//! # Unload States
//!
//! ```text
//! Alive --unload()/last drop/shutdown--> Unloading --native completion--> Unloaded
//! ```
//!
//! Transitions are monotonic and guarded by a per-context reentrant lock, which is also
//! held around every load so that no load can complete against a context whose native
//! side is tearing down.
//!
//! # Thread Safety
//!
//! [`LoadContext`] is [`Send`] and [`Sync`]; every operation may be called from any
//! thread. Subscriber callbacks run synchronously on the thread that triggered them.

mod builder;
mod events;
mod handle;
mod hook;
mod scope;
pub(crate) mod unload;

pub use builder::ContextBuilder;
pub use events::{ResolvingHandler, SubscriptionId, UnloadingHandler};
pub(crate) use handle::HandleRef;
pub use hook::{DeferToResolving, LoadHook};
pub use scope::{current_contextual, ContextScope};

use std::{
    cell::Cell,
    fmt,
    path::Path,
    sync::{Arc, Weak},
};

use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::{Mutex, ReentrantMutex};
use strum::Display;
use tracing::debug;

use crate::{
    context::events::EventSlot,
    host::HostShared,
    identity::ModuleName,
    module::ModuleRc,
    native::{ContextFlags, NativeToken},
    resolver, Error, Result,
};

/// Host-unique identifier of a load context.
///
/// Ids are allocated under the registry lock in construction order, start at 1 and are
/// never reused within one [`crate::Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a load context. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnloadState {
    /// Modules can be loaded and resolved
    Alive,
    /// Teardown was requested; the native side still owns the context
    Unloading,
    /// Teardown finished and `Unloading` was delivered
    Unloaded,
}

pub(crate) struct ContextCore {
    id: ContextId,
    name: Option<String>,
    flags: ContextFlags,
    token: NativeToken,
    /// Unload lock; reentrant so hooks and subscribers may call back into their context
    pub(crate) state: ReentrantMutex<Cell<UnloadState>>,
    hook: Box<dyn LoadHook>,
    pub(crate) resolving: EventSlot<ResolvingHandler>,
    pub(crate) unloading: EventSlot<UnloadingHandler>,
    /// Modules loaded into this context, in load order
    loaded: boxcar::Vec<ModuleRc>,
    /// Lower-cased simple name -> module bound in this context
    bindings: DashMap<String, ModuleRc>,
    pub(crate) handle: Arc<HandleRef>,
    anchor: Mutex<Weak<Anchor>>,
    pub(crate) host: Arc<HostShared>,
}

impl ContextCore {
    pub(crate) fn new(
        id: ContextId,
        name: Option<String>,
        flags: ContextFlags,
        token: NativeToken,
        hook: Box<dyn LoadHook>,
        host: Arc<HostShared>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id,
            name,
            flags,
            token,
            state: ReentrantMutex::new(Cell::new(UnloadState::Alive)),
            hook,
            resolving: EventSlot::new(),
            unloading: EventSlot::new(),
            loaded: boxcar::Vec::new(),
            bindings: DashMap::new(),
            handle: Arc::new(HandleRef::new_weak(weak.clone())),
            anchor: Mutex::new(Weak::new()),
            host,
        })
    }

    pub(crate) fn id(&self) -> ContextId {
        self.id
    }

    pub(crate) fn token(&self) -> NativeToken {
        self.token
    }

    pub(crate) fn is_collectible(&self) -> bool {
        self.flags.contains(ContextFlags::COLLECTIBLE)
    }

    pub(crate) fn is_default(&self) -> bool {
        self.flags.contains(ContextFlags::DEFAULT)
    }

    pub(crate) fn hook(&self) -> &dyn LoadHook {
        self.hook.as_ref()
    }

    pub(crate) fn unload_state(&self) -> UnloadState {
        self.state.lock().get()
    }

    /// The application-facing handle of this core.
    ///
    /// There is at most one live anchor per core; all handles share it.
    pub(crate) fn context(self: &Arc<Self>) -> LoadContext {
        let mut anchor = self.anchor.lock();
        if let Some(existing) = anchor.upgrade() {
            return LoadContext { anchor: existing };
        }

        let fresh = Arc::new(Anchor {
            core: Arc::clone(self),
        });
        *anchor = Arc::downgrade(&fresh);
        LoadContext { anchor: fresh }
    }

    /// Whether a handle other than a dying one is currently live.
    pub(crate) fn has_live_handle(&self) -> bool {
        self.anchor.lock().strong_count() > 0
    }

    /// Track a freshly loaded module. Must be called under the unload lock.
    fn record(&self, module: ModuleRc) -> Result<ModuleRc> {
        if module.context_id() != self.id {
            return Err(Error::Native(format!(
                "loader attributed '{}' to context {} while loading into context {}",
                module.simple_name(),
                module.context_id(),
                self.id
            )));
        }

        match self.bindings.entry(module.name().key()) {
            Entry::Occupied(_) => Err(Error::DuplicateModule {
                context: self.id,
                name: module.simple_name().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&module));
                self.loaded.push(Arc::clone(&module));
                Ok(module)
            }
        }
    }

    pub(crate) fn find_bound(&self, reference: &ModuleName) -> Option<ModuleRc> {
        self.bindings
            .get(&reference.key())
            .filter(|module| module.name().satisfies(reference))
            .map(|module| Arc::clone(module.value()))
    }

    fn bind(&self, reference: &ModuleName, module: &ModuleRc) {
        self.bindings
            .entry(reference.key())
            .or_insert_with(|| Arc::clone(module));
    }
}

impl Drop for ContextCore {
    fn drop(&mut self) {
        debug!(context = %self.id, "load context released");
    }
}

/// Shared by all clones of a [`LoadContext`]; its drop is the unload safety net.
struct Anchor {
    core: Arc<ContextCore>,
}

impl Drop for Anchor {
    fn drop(&mut self) {
        unload::finalize(&self.core);
    }
}

/// An isolated namespace into which modules are loaded and resolved.
///
/// Cloning is cheap; all clones refer to the same context. For collectible contexts,
/// dropping the last clone while the context is still alive starts the unload exactly as
/// [`LoadContext::unload`] would.
///
/// # Examples
///
/// ```rust,ignore
/// use alcove::{ContextBuilder, Host};
///
/// let host = Host::new(loader);
/// let plugins = ContextBuilder::new().name("plugins").collectible(true).build(&host)?;
///
/// let module = plugins.load_from_path("/opt/app/plugins/Plugin.Core.dll")?;
/// plugins.on_unloading(|ctx| println!("{ctx} is gone"));
/// plugins.unload()?;
/// # Ok::<(), alcove::Error>(())
/// ```
#[derive(Clone)]
pub struct LoadContext {
    anchor: Arc<Anchor>,
}

impl LoadContext {
    pub(crate) fn core(&self) -> &Arc<ContextCore> {
        &self.anchor.core
    }

    /// The host-unique id of this context.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.core().id
    }

    /// The diagnostic name given at construction.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.core().name.as_deref()
    }

    /// Whether this context can be unloaded.
    #[must_use]
    pub fn is_collectible(&self) -> bool {
        self.core().is_collectible()
    }

    /// Whether this is the host's default context.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.core().is_default()
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> UnloadState {
        self.core().unload_state()
    }

    /// The native counterpart of this context.
    #[must_use]
    pub fn token(&self) -> NativeToken {
        self.core().token
    }

    /// Load the module image at `path` into this context.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for empty (or, depending on [`crate::HostConfig`],
    /// relative) paths, [`Error::NotAlive`] once the context started unloading,
    /// [`Error::DuplicateModule`] if the simple name is already bound here, or whatever
    /// the native loader reports.
    pub fn load_from_path(&self, path: impl AsRef<Path>) -> Result<ModuleRc> {
        self.load_from_path_with(path.as_ref(), None)
    }

    /// Load the module image at `primary`, together with an optional companion file.
    ///
    /// # Errors
    /// See [`LoadContext::load_from_path`].
    pub fn load_from_path_with(
        &self,
        primary: &Path,
        companion: Option<&Path>,
    ) -> Result<ModuleRc> {
        self.check_path(primary)?;
        if let Some(companion) = companion {
            self.check_path(companion)?;
        }

        let core = self.core();
        let state = core.state.lock();
        if state.get() != UnloadState::Alive {
            return Err(Error::NotAlive(core.id));
        }

        debug!(context = %core.id, path = %primary.display(), "loading module from path");
        let module = core
            .host
            .loader()
            .load_from_path(core.token, primary, companion)?;
        core.record(module)
    }

    /// Load an in-memory module image into this context.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty image, otherwise as
    /// [`LoadContext::load_from_path`].
    pub fn load_from_bytes(&self, image: &[u8]) -> Result<ModuleRc> {
        self.load_from_bytes_with(image, None)
    }

    /// Load an in-memory module image together with an optional companion image.
    ///
    /// # Errors
    /// See [`LoadContext::load_from_bytes`].
    pub fn load_from_bytes_with(
        &self,
        image: &[u8],
        companion: Option<&[u8]>,
    ) -> Result<ModuleRc> {
        if image.is_empty() {
            return Err(Error::InvalidArgument("module image is empty".to_string()));
        }
        if companion.is_some_and(<[u8]>::is_empty) {
            return Err(Error::InvalidArgument("companion image is empty".to_string()));
        }

        let core = self.core();
        let state = core.state.lock();
        if state.get() != UnloadState::Alive {
            return Err(Error::NotAlive(core.id));
        }

        debug!(context = %core.id, len = image.len(), "loading module from bytes");
        let module = core
            .host
            .loader()
            .load_from_bytes(core.token, image, companion)?;
        core.record(module)
    }

    /// Resolve `reference` in this context.
    ///
    /// Modules already bound to this context are returned directly; otherwise the
    /// resolution pipeline runs (hook, default context, `Resolving` subscribers) and the
    /// result is bound for subsequent lookups.
    ///
    /// Lookup, pipeline and binding run under the unload lock, so concurrent requests
    /// for one context are serialized and a reference is resolved at most once.
    ///
    /// # Errors
    /// [`Error::NotAlive`] once the context started unloading,
    /// [`Error::ResolutionMismatch`] or [`Error::ModuleNotFound`] from the pipeline, or
    /// any error raised by the hook or a subscriber.
    pub fn load_from_name(&self, reference: &ModuleName) -> Result<ModuleRc> {
        let core = self.core();
        let state = core.state.lock();
        if state.get() != UnloadState::Alive {
            return Err(Error::NotAlive(core.id));
        }

        if let Some(module) = core.find_bound(reference) {
            return Ok(module);
        }

        let module = resolver::resolve(self, reference)?;
        core.bind(reference, &module);
        Ok(module)
    }

    /// A module bound in this context that satisfies `reference`, if any.
    #[must_use]
    pub fn find_loaded(&self, reference: &ModuleName) -> Option<ModuleRc> {
        self.core().find_bound(reference)
    }

    /// All modules loaded into this context by its own loading primitives, in load order.
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleRc> {
        let mut modules = Vec::with_capacity(self.core().loaded.count());
        for (_, module) in &self.core().loaded {
            modules.push(Arc::clone(module));
        }
        modules
    }

    /// Register a fallback resolver, invoked after the hook and the default context.
    pub fn on_resolving<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LoadContext, &ModuleName) -> Result<Option<ModuleRc>> + Send + Sync + 'static,
    {
        self.core().resolving.subscribe(Arc::new(handler))
    }

    /// Remove a `Resolving` subscription. Returns `false` if it was not registered.
    pub fn remove_resolving(&self, id: SubscriptionId) -> bool {
        self.core().resolving.unsubscribe(id)
    }

    /// Register a teardown notification, delivered once when the context is unloaded.
    pub fn on_unloading<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LoadContext) + Send + Sync + 'static,
    {
        self.core().unloading.subscribe(Arc::new(handler))
    }

    /// Remove an `Unloading` subscription. Returns `false` if it was not registered.
    pub fn remove_unloading(&self, id: SubscriptionId) -> bool {
        self.core().unloading.unsubscribe(id)
    }

    /// Start unloading this context.
    ///
    /// The native side is asked to tear the context down; `Unloading` fires once it
    /// confirms. Loads fail with [`Error::NotAlive`] from this point on.
    ///
    /// # Errors
    /// [`Error::NotSupported`] for non-collectible contexts, [`Error::AlreadyUnloaded`]
    /// if the context already left the Alive state.
    pub fn unload(&self) -> Result<()> {
        unload::unload(self.core())
    }

    /// Make this context the thread's current contextual context until the returned
    /// guard is dropped.
    #[must_use = "the scope ends when the guard is dropped"]
    pub fn enter_scope(&self) -> ContextScope {
        ContextScope::enter(self.clone())
    }

    fn check_path(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("path cannot be empty".to_string()));
        }
        if self.core().host.config().require_absolute_paths && !path.is_absolute() {
            return Err(Error::InvalidArgument(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

impl PartialEq for LoadContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.core(), other.core())
    }
}

impl Eq for LoadContext {}

impl fmt::Display for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "\"{}\" #{}", name, self.id()),
            None => write!(f, "#{}", self.id()),
        }
    }
}

impl fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("collectible", &self.is_collectible())
            .field("default", &self.is_default())
            .field("state", &self.state())
            .field("modules", &self.core().loaded.count())
            .finish()
    }
}
