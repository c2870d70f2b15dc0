//! The three-stage resolution pipeline.
//!
//! A reference that is not yet bound to a context is resolved by trying, in order:
//!
//! 1. the context's [`crate::LoadHook`],
//! 2. the modules bound to the host's default context (skipped for the default context
//!    itself),
//! 3. the context's `Resolving` subscribers, in registration order.
//!
//! The first stage that produces a module wins. Modules returned by the hook or by a
//! subscriber must carry the requested simple name (compared case-insensitively);
//! anything else is a programming error reported as [`Error::ResolutionMismatch`].

use tracing::debug;

use crate::{context::LoadContext, identity::ModuleName, module::ModuleRc, Error, Result};

pub(crate) fn resolve(context: &LoadContext, reference: &ModuleName) -> Result<ModuleRc> {
    if let Some(module) = resolve_with_hook(context, reference)? {
        return Ok(module);
    }

    if let Some(module) = resolve_from_default(context, reference) {
        return Ok(module);
    }

    resolve_with_event(context, reference)
}

fn resolve_with_hook(context: &LoadContext, reference: &ModuleName) -> Result<Option<ModuleRc>> {
    match context.core().hook().load(context, reference)? {
        Some(module) => {
            debug!(context = %context, module = %reference, "resolved by hook");
            validate(reference, module).map(Some)
        }
        None => Ok(None),
    }
}

fn resolve_from_default(context: &LoadContext, reference: &ModuleName) -> Option<ModuleRc> {
    if context.is_default() {
        return None;
    }

    let default = match context.core().host.default_context() {
        Ok(default) => default,
        Err(error) => {
            debug!(context = %context, %error, "default context unavailable");
            return None;
        }
    };

    let module = default.find_loaded(reference)?;
    debug!(context = %context, module = %reference, "resolved from default context");
    Some(module)
}

fn resolve_with_event(context: &LoadContext, reference: &ModuleName) -> Result<ModuleRc> {
    for handler in context.core().resolving.snapshot() {
        if let Some(module) = handler(context, reference)? {
            debug!(context = %context, module = %reference, "resolved by subscriber");
            return validate(reference, module);
        }
    }

    debug!(context = %context, module = %reference, "unresolved");
    Err(Error::ModuleNotFound(reference.simple_name().to_string()))
}

fn validate(reference: &ModuleName, module: ModuleRc) -> Result<ModuleRc> {
    if module.name().has_simple_name(reference.simple_name()) {
        Ok(module)
    } else {
        Err(Error::ResolutionMismatch {
            requested: reference.simple_name().to_string(),
            returned: module.simple_name().to_string(),
        })
    }
}
