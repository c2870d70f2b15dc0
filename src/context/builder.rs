//! Fluent construction of load contexts.

use crate::{
    context::{hook::LoadHook, LoadContext},
    Host, Result,
};

/// Builder for [`LoadContext`] instances.
///
/// # Examples
///
/// ```rust,ignore
/// use alcove::{ContextBuilder, Host};
///
/// let host = Host::new(loader);
/// let ctx = ContextBuilder::new()
///     .name("plugins")
///     .collectible(true)
///     .hook(|ctx: &alcove::LoadContext, reference: &alcove::ModuleName| Ok(None))
///     .build(&host)?;
/// ```
#[derive(Default)]
pub struct ContextBuilder {
    name: Option<String>,
    collectible: bool,
    hook: Option<Box<dyn LoadHook>>,
}

impl ContextBuilder {
    /// Creates a builder for an unnamed, non-collectible context that defers all
    /// resolution to its `Resolving` subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic name shown by `Display` and in logs.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the context may later be unloaded.
    #[must_use]
    pub fn collectible(mut self, collectible: bool) -> Self {
        self.collectible = collectible;
        self
    }

    /// The resolution override consulted first for every reference.
    #[must_use]
    pub fn hook(mut self, hook: impl LoadHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Construct and register the context.
    ///
    /// # Errors
    /// [`crate::Error::ProcessExiting`] once `host` shut down,
    /// [`crate::Error::NotSupported`] for collectible contexts when the host disables
    /// them, or the native loader's error if it cannot create the context.
    pub fn build(self, host: &Host) -> Result<LoadContext> {
        host.shared()
            .create_context(self.name, self.collectible, false, self.hook)
    }
}
