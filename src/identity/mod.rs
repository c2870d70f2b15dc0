//! Module references and identity.
//!
//! Every module that moves through a load context is identified by a [`ModuleName`]:
//! a simple name plus version, culture, public key token and processor architecture.
//! Requests arriving at the resolution pipeline are `ModuleName`s, and every result is
//! checked against the request by simple name (case-insensitive).
//!
//! # Key Components
//!
//! - [`ModuleName`] - Module reference, parsed from and rendered to display-name form
//! - [`ModuleVersion`] - Four-part version numbering with compatibility rules
//! - [`ProcessorArchitecture`] - Optional architecture qualifier
//! - [`PublicKeyToken`] - 8-byte strong name token, derivable from a full public key
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use alcove::identity::{ModuleName, ModuleVersion};
//!
//! let plugin = ModuleName::new("Plugin.Core", ModuleVersion::new(2, 1, 0, 0));
//!
//! let parsed = ModuleName::parse(
//!     "Plugin.Core, Version=2.1.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
//! )?;
//! assert!(parsed.has_simple_name("plugin.core"));
//! # Ok::<(), alcove::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All types in this module are plain values and implement [`Send`] and [`Sync`].

pub use name::{ModuleName, ModuleVersion, ProcessorArchitecture};
pub use token::PublicKeyToken;

mod name;
mod token;
