use thiserror::Error;

use crate::context::ContextId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is surfaced to the caller (or to the native loader calling back into the
/// host) immediately; nothing in this crate retries internally.
///
/// # Error Categories
///
/// ## Rejected before any native call
/// - [`Error::InvalidArgument`] - Empty or relative path, empty image
/// - [`Error::NotSupported`] - Collectible context without capability, unloading a
///   non-collectible context
/// - [`Error::ProcessExiting`] - The host has run its shutdown sweep
///
/// ## Lifecycle
/// - [`Error::AlreadyUnloaded`] - `unload` called on a context that is no longer alive
/// - [`Error::NotAlive`] - A load was attempted during or after unload
/// - [`Error::ContextNotFound`] - The native side referenced an unknown or expired context
///
/// ## Resolution
/// - [`Error::ResolutionMismatch`] - A hook or subscriber returned the wrong module
/// - [`Error::ModuleNotFound`] - No pipeline stage resolved the reference
/// - [`Error::DuplicateModule`] - A context already holds a module with that simple name
///
/// # Examples
///
/// ```rust,ignore
/// use alcove::{Error, Host};
///
/// match context.unload() {
///     Ok(()) => println!("teardown requested"),
///     Err(Error::NotSupported(reason)) => eprintln!("cannot unload: {reason}"),
///     Err(Error::AlreadyUnloaded(id)) => eprintln!("context {id} already unloaded"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An argument was rejected before reaching the native loader.
    ///
    /// Raised for empty paths, relative paths when absolute paths are required by the
    /// [`crate::HostConfig`], and empty module images.
    #[error("Invalid argument - {0}")]
    InvalidArgument(String),

    /// The requested operation is not supported by this context or host.
    ///
    /// Raised when a collectible context is requested while the host has collectible
    /// contexts disabled, and when `unload` is called on a non-collectible context.
    #[error("Operation not supported - {0}")]
    NotSupported(String),

    /// `unload` was called on a context that already left the Alive state.
    #[error("Load context {0} has already been unloaded")]
    AlreadyUnloaded(ContextId),

    /// A load was attempted against a context that is unloading or unloaded.
    #[error("Load context {0} is not alive")]
    NotAlive(ContextId),

    /// A hook or a `Resolving` subscriber returned a module whose simple name disagrees
    /// with the requested one.
    ///
    /// This indicates a programming error in the override or subscriber.
    #[error("Resolution returned '{returned}' for requested module '{requested}'")]
    ResolutionMismatch {
        /// The simple name that was requested
        requested: String,
        /// The simple name of the module that was returned instead
        returned: String,
    },

    /// No stage of the resolution pipeline produced a module.
    #[error("Could not resolve module '{0}'")]
    ModuleNotFound(String),

    /// A module with the same simple name is already loaded into the context.
    #[error("Load context {context} already contains a module named '{name}'")]
    DuplicateModule {
        /// The context the load was attempted against
        context: ContextId,
        /// The conflicting simple name
        name: String,
    },

    /// The host ran its shutdown sweep; no new contexts can be created.
    #[error("The host is shutting down, no new load contexts can be created")]
    ProcessExiting,

    /// The referenced context is unknown or no longer alive.
    #[error("Load context {0} does not exist")]
    ContextNotFound(ContextId),

    /// A process-wide host was already installed.
    #[error("A global host has already been initialized")]
    AlreadyInitialized,

    /// A module display name could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The native loader reported a failure.
    #[error("Native loader error - {0}")]
    Native(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
