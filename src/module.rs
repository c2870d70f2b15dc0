//! Loaded modules as seen by the load context layer.
//!
//! A [`Module`] is produced by the native loader and never parsed or inspected here beyond
//! its [`ModuleName`]. It records the context it was loaded into, which is what
//! [`crate::Host::context_of`] answers.

use std::{fmt, path::PathBuf, sync::Arc};

use crate::{context::ContextId, identity::ModuleName};

/// A reference-counted pointer to a [`Module`]
pub type ModuleRc = Arc<Module>;

/// Where the image of a module came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Loaded from a file, with an optional companion file (e.g. symbols)
    Path {
        /// Path of the primary image
        primary: PathBuf,
        /// Path of the companion image, if one was supplied
        companion: Option<PathBuf>,
    },
    /// Loaded from an in-memory image
    Bytes {
        /// Size of the primary image in bytes
        len: usize,
        /// Whether a companion image was supplied
        companion: bool,
    },
    /// Created by the native side without a backing image
    Dynamic,
}

/// A module loaded into exactly one load context.
#[derive(Debug)]
pub struct Module {
    name: ModuleName,
    context: ContextId,
    origin: ModuleOrigin,
}

impl Module {
    /// Create a module that belongs to `context`.
    ///
    /// Called by [`crate::NativeLoader`] implementations once an image has been mapped.
    pub fn new(name: ModuleName, context: ContextId, origin: ModuleOrigin) -> Self {
        Self {
            name,
            context,
            origin,
        }
    }

    /// Create a shared module, see [`Module::new`].
    pub fn new_rc(name: ModuleName, context: ContextId, origin: ModuleOrigin) -> ModuleRc {
        Arc::new(Self::new(name, context, origin))
    }

    /// The full name of this module.
    #[must_use]
    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    /// The simple name of this module.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.simple_name()
    }

    /// The id of the context this module was loaded into.
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Where the image came from.
    #[must_use]
    pub fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (context {})", self.name, self.context)
    }
}
