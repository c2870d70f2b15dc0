//! The host: registry, default context and native loader of one process.
//!
//! A [`Host`] is the service object behind every [`LoadContext`]. It owns
//!
//! - the [`registry`] of all contexts, with the id counter and the exiting flag,
//! - the [`NativeLoader`] collaborator,
//! - the lazily created default context,
//! - the [`HostConfig`].
//!
//! Applications usually install one host for the whole process with
//! [`Host::init_global`], which hands back a [`GlobalHost`] guard that shuts the host down
//! when dropped; tests and embedders construct private hosts with [`Host::new`].
//!
//! # Shutdown
//!
//! [`Host::shutdown`] (also run when a host is dropped) locks out further construction,
//! then visits every registered context once: alive contexts move to Unloading, and
//! every context still owing its `Unloading` notification receives it. The registry lock
//! is not held while subscribers run.

mod config;
mod registry;

pub use config::HostConfig;

use std::{
    fmt,
    ops::Deref,
    sync::{Arc, OnceLock},
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    context::{unload, ContextCore, ContextId, DeferToResolving, LoadContext, LoadHook},
    host::registry::ContextRegistry,
    identity::ModuleName,
    module::{Module, ModuleRc},
    native::{ContextFlags, NativeLoader},
    Error, Result,
};

static GLOBAL: OnceLock<Host> = OnceLock::new();

pub(crate) struct HostShared {
    loader: Arc<dyn NativeLoader>,
    config: HostConfig,
    registry: ContextRegistry,
    default_id: OnceLock<ContextId>,
    /// Serializes default-context creation; never held together with the registry lock
    default_init: Mutex<()>,
}

impl HostShared {
    pub(crate) fn loader(&self) -> &dyn NativeLoader {
        self.loader.as_ref()
    }

    pub(crate) fn config(&self) -> &HostConfig {
        &self.config
    }

    pub(crate) fn create_context(
        self: &Arc<Self>,
        name: Option<String>,
        collectible: bool,
        is_default: bool,
        hook: Option<Box<dyn LoadHook>>,
    ) -> Result<LoadContext> {
        if self.registry.is_exiting() {
            return Err(Error::ProcessExiting);
        }
        if collectible && !self.config.enable_collectible_contexts {
            return Err(Error::NotSupported(
                "collectible contexts are disabled for this host".to_string(),
            ));
        }

        let id = self.registry.reserve_id()?;
        let mut flags = ContextFlags::empty();
        flags.set(ContextFlags::DEFAULT, is_default);
        flags.set(ContextFlags::COLLECTIBLE, collectible);

        let token = self.loader.create_context(id, flags)?;
        let hook = hook.unwrap_or_else(|| Box::new(DeferToResolving));
        let core = ContextCore::new(id, name, flags, token, hook, Arc::clone(self));
        let context = core.context();

        if let Err(error) = self.registry.insert(id, Arc::clone(&core.handle)) {
            unload::discard(&core);
            return Err(error);
        }

        // Non-collectible contexts live until shutdown
        if !collectible {
            core.handle.promote();
        }

        debug!(context = %context, %token, collectible, "load context created");
        Ok(context)
    }

    pub(crate) fn default_context(self: &Arc<Self>) -> Result<LoadContext> {
        if let Some(id) = self.default_id.get() {
            return self.registered(*id);
        }

        let _guard = self.default_init.lock();
        if let Some(id) = self.default_id.get() {
            return self.registered(*id);
        }

        let context = self.create_context(
            Some(self.config.default_context_name.to_string()),
            false,
            true,
            None,
        )?;
        let _ = self.default_id.set(context.id());
        Ok(context)
    }

    pub(crate) fn context(&self, id: ContextId) -> Option<LoadContext> {
        self.registry
            .get(id)
            .and_then(|handle| handle.get())
            .map(|core| core.context())
    }

    fn registered(&self, id: ContextId) -> Result<LoadContext> {
        match self.context(id) {
            Some(context) => Ok(context),
            None if self.registry.is_exiting() => Err(Error::ProcessExiting),
            None => Err(Error::ContextNotFound(id)),
        }
    }

    pub(crate) fn shutdown(&self) {
        let handles = self.registry.drain_for_exit();
        if handles.is_empty() {
            return;
        }

        info!(contexts = handles.len(), "shutting down load contexts");
        for handle in handles {
            if let Some(core) = handle.get() {
                unload::sweep(&core);
            }
            handle.release();
        }
    }
}

/// Owner of all load contexts of a process (or of a test).
///
/// # Examples
///
/// ```rust,ignore
/// use alcove::{Host, HostConfig, ModuleName};
///
/// let host = Host::new(loader);
/// let default = host.default_context()?;
/// let core = default.load_from_path("/opt/app/App.Core.dll")?;
///
/// // Called by the native loader for unresolved references
/// let module = host.resolve(default.id(), &ModuleName::parse("App.Core")?)?;
/// # Ok::<(), alcove::Error>(())
/// ```
pub struct Host {
    shared: Arc<HostShared>,
}

impl Host {
    /// Create a host with the default configuration.
    pub fn new<L: NativeLoader + 'static>(loader: L) -> Self {
        Self::with_config(loader, HostConfig::default())
    }

    /// Create a host with an explicit configuration.
    pub fn with_config<L: NativeLoader + 'static>(loader: L, config: HostConfig) -> Self {
        Self {
            shared: Arc::new(HostShared {
                loader: Arc::new(loader),
                config,
                registry: ContextRegistry::new(),
                default_id: OnceLock::new(),
                default_init: Mutex::new(()),
            }),
        }
    }

    /// Install the process-wide host.
    ///
    /// Statics are never dropped, so the global host cannot run its shutdown sweep on
    /// its own. The returned [`GlobalHost`] guard runs it when dropped; keep it alive in
    /// `main` for as long as contexts are in use. Calling [`Host::shutdown`] on
    /// [`Host::global`] before exit has the same effect.
    ///
    /// # Errors
    /// [`Error::AlreadyInitialized`] if a global host was installed before.
    pub fn init_global<L: NativeLoader + 'static>(
        loader: L,
        config: HostConfig,
    ) -> Result<GlobalHost> {
        let mut installed = false;
        let host = GLOBAL.get_or_init(|| {
            installed = true;
            Host::with_config(loader, config)
        });

        if installed {
            Ok(GlobalHost { host })
        } else {
            Err(Error::AlreadyInitialized)
        }
    }

    /// The process-wide host, if one was installed.
    #[must_use]
    pub fn global() -> Option<&'static Host> {
        GLOBAL.get()
    }

    pub(crate) fn shared(&self) -> &Arc<HostShared> {
        &self.shared
    }

    /// The configuration this host was created with.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        self.shared.config()
    }

    /// Create and register a context that uses [`DeferToResolving`] as its hook.
    ///
    /// # Errors
    /// See [`crate::ContextBuilder::build`].
    pub fn create_context(&self, name: Option<&str>, collectible: bool) -> Result<LoadContext> {
        self.shared
            .create_context(name.map(str::to_string), collectible, false, None)
    }

    /// The default context, created on first use.
    ///
    /// # Errors
    /// [`Error::ProcessExiting`] after shutdown, or the native loader's error if the
    /// context cannot be created.
    pub fn default_context(&self) -> Result<LoadContext> {
        self.shared.default_context()
    }

    /// The context with the given id, if it is still reachable.
    #[must_use]
    pub fn context(&self, id: ContextId) -> Option<LoadContext> {
        self.shared.context(id)
    }

    /// The context a module was loaded into.
    #[must_use]
    pub fn context_of(&self, module: &Module) -> Option<LoadContext> {
        self.shared.context(module.context_id())
    }

    /// All reachable contexts, in id order.
    #[must_use]
    pub fn contexts(&self) -> Vec<LoadContext> {
        self.shared
            .registry
            .snapshot()
            .into_iter()
            .filter_map(|handle| handle.get())
            .map(|core| core.context())
            .collect()
    }

    /// Resolve `reference` on behalf of the context `id`.
    ///
    /// This is the callback the native loader uses for references it cannot satisfy.
    ///
    /// # Errors
    /// [`Error::ContextNotFound`] if `id` is unknown or no longer reachable, otherwise
    /// the outcome of [`LoadContext::load_from_name`].
    pub fn resolve(&self, id: ContextId, reference: &ModuleName) -> Result<ModuleRc> {
        let context = self.context(id).ok_or(Error::ContextNotFound(id))?;
        context.load_from_name(reference)
    }

    /// Unload every context and refuse further construction. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Whether [`Host::shutdown`] has run.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.shared.registry.is_exiting()
    }
}

/// Guard over the process-wide host; dropping it runs [`Host::shutdown`].
///
/// Dereferences to the [`Host`].
#[must_use = "dropping the guard shuts the global host down"]
pub struct GlobalHost {
    host: &'static Host,
}

impl GlobalHost {
    /// The global host with a `'static` lifetime.
    pub fn host(&self) -> &'static Host {
        self.host
    }
}

impl Deref for GlobalHost {
    type Target = Host;

    fn deref(&self) -> &Host {
        self.host
    }
}

impl Drop for GlobalHost {
    fn drop(&mut self) {
        self.host.shutdown();
    }
}

impl fmt::Debug for GlobalHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalHost").field(self.host).finish()
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.shared.config)
            .field("contexts", &self.shared.registry.len())
            .field("default", &self.shared.default_id.get())
            .field("exiting", &self.is_exiting())
            .finish_non_exhaustive()
    }
}
