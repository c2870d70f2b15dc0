//! # alcove Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! of the alcove library. Import it to get quick access to everything needed to create
//! contexts, load modules and react to their lifecycle.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all alcove operations
pub use crate::Error;

/// The result type used throughout alcove
pub use crate::Result;

/// Host-wide configuration
pub use crate::HostConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Owner of all load contexts
pub use crate::{GlobalHost, Host};

/// Load contexts and their construction
pub use crate::{ContextBuilder, ContextId, LoadContext, UnloadState};

/// Resolution override and its no-op default
pub use crate::{DeferToResolving, LoadHook};

/// Event subscription handles
pub use crate::SubscriptionId;

/// Thread-local contextual context
pub use crate::{current_contextual, ContextScope};

// ================================================================================================
// Modules and Identities
// ================================================================================================

/// Loaded modules
pub use crate::{Module, ModuleOrigin, ModuleRc};

/// Module references
pub use crate::{ModuleName, ModuleVersion, PublicKeyToken};

// ================================================================================================
// Native Interface
// ================================================================================================

/// The native loader collaborator
pub use crate::{ContextFlags, NativeLoader, NativeToken, PendingRelease};
