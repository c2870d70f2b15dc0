//! Host configuration
//!
//! Capabilities and argument checks that apply to every context of one [`crate::Host`].

/// Configuration for a [`crate::Host`]
///
/// The configuration is fixed at host construction and shared by all of its contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Allow collectible (unloadable) contexts (default: true)
    /// When disabled, constructing a collectible context fails with `NotSupported`
    pub enable_collectible_contexts: bool,

    /// Reject relative paths in `load_from_path` (default: true)
    pub require_absolute_paths: bool,

    /// Diagnostic name of the lazily created default context (default: "Default")
    pub default_context_name: &'static str,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            enable_collectible_contexts: true,
            require_absolute_paths: true,
            default_context_name: "Default",
        }
    }
}

impl HostConfig {
    /// Creates a configuration for hosts whose native side cannot unload code
    #[must_use]
    pub fn non_collectible() -> Self {
        Self {
            enable_collectible_contexts: false,
            ..Self::default()
        }
    }

    /// Creates a permissive configuration that also accepts relative paths
    ///
    /// Relative paths are resolved by the native loader against its own working directory.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            require_absolute_paths: false,
            ..Self::default()
        }
    }
}
