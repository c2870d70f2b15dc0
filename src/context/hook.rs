//! The overridable first stage of resolution.

use crate::{context::LoadContext, identity::ModuleName, module::ModuleRc, Result};

/// Per-context resolution override, consulted before any other pipeline stage.
///
/// Returning `Ok(None)` lets the request fall through to the default context and then
/// to the context's `Resolving` subscribers. A returned module must carry the requested
/// simple name, otherwise resolution fails with [`crate::Error::ResolutionMismatch`].
///
/// Closures with the matching signature implement this trait.
///
/// # Examples
///
/// ```rust,ignore
/// use alcove::{ContextBuilder, LoadContext, ModuleName};
///
/// let plugins = ContextBuilder::new()
///     .name("plugins")
///     .collectible(true)
///     .hook(|ctx: &LoadContext, reference: &ModuleName| {
///         let path = plugin_dir.join(format!("{}.dll", reference.simple_name()));
///         if path.exists() {
///             ctx.load_from_path(path).map(Some)
///         } else {
///             Ok(None)
///         }
///     })
///     .build(&host)?;
/// ```
pub trait LoadHook: Send + Sync {
    /// Try to resolve `reference` for `context`.
    ///
    /// # Errors
    /// Any error is surfaced to the caller of the resolution unchanged.
    fn load(&self, context: &LoadContext, reference: &ModuleName) -> Result<Option<ModuleRc>>;
}

/// A hook that never resolves anything itself; the default context uses it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferToResolving;

impl LoadHook for DeferToResolving {
    fn load(&self, _context: &LoadContext, _reference: &ModuleName) -> Result<Option<ModuleRc>> {
        Ok(None)
    }
}

impl<F> LoadHook for F
where
    F: Fn(&LoadContext, &ModuleName) -> Result<Option<ModuleRc>> + Send + Sync,
{
    fn load(&self, context: &LoadContext, reference: &ModuleName) -> Result<Option<ModuleRc>> {
        self(context, reference)
    }
}
