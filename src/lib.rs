// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # alcove
//!
//! Process-wide load contexts: isolated namespaces into which code modules are loaded,
//! resolved and, for collectible contexts, unloaded again without restarting the process.
//!
//! ## Features
//!
//! - **Isolation** - every [`LoadContext`] binds its own modules; the same simple name can
//!   be loaded into several contexts side by side
//! - **Ordered resolution** - references are resolved by the context's [`LoadHook`], then
//!   by the host's default context, then by `Resolving` subscribers
//! - **Collectible contexts** - [`LoadContext::unload`], dropping the last handle, or
//!   [`Host::shutdown`] tear a context down and deliver `Unloading` exactly once
//! - **Pluggable native side** - image parsing and mapping stay behind [`NativeLoader`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use alcove::prelude::*;
//!
//! let host = Host::init_global(MyNativeLoader::new(), HostConfig::default())?;
//!
//! let plugins = ContextBuilder::new()
//!     .name("plugins")
//!     .collectible(true)
//!     .build(&host)?;
//!
//! plugins.on_resolving(|ctx, reference| {
//!     let path = plugin_dir().join(format!("{}.dll", reference.simple_name()));
//!     if path.exists() { ctx.load_from_path(path).map(Some) } else { Ok(None) }
//! });
//! plugins.on_unloading(|ctx| println!("{ctx} unloaded"));
//!
//! let module = plugins.load_from_name(&ModuleName::parse("Plugin.Core, Version=1.0.0.0")?)?;
//! println!("loaded {module}");
//!
//! plugins.unload()?;
//!
//! // Dropping the guard runs the shutdown sweep for every remaining context
//! drop(host);
//! # Ok::<(), alcove::Error>(())
//! ```
//!
//! ## Threading
//!
//! Every type is [`Send`] and [`Sync`] except [`ContextScope`]. Resolution and
//! unload notifications run synchronously on the thread that triggered them.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber; applications decide
//! where the output goes.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,ignore
/// use alcove::prelude::*;
///
/// let host = Host::new(loader);
/// let ctx = ContextBuilder::new().collectible(true).build(&host)?;
/// # Ok::<(), alcove::Error>(())
/// ```
pub mod prelude;

pub mod identity;
pub mod native;

mod context;
mod host;
mod module;
mod resolver;

/// `alcove` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `alcove` Error type
///
/// Every fallible operation in this crate reports one of its variants.
pub use error::Error;

/// Load contexts, their construction, events and scopes.
pub use context::{
    current_contextual, ContextBuilder, ContextId, ContextScope, DeferToResolving, LoadContext,
    LoadHook, ResolvingHandler, SubscriptionId, UnloadState, UnloadingHandler,
};

/// The owner of all contexts and its configuration.
pub use host::{GlobalHost, Host, HostConfig};

/// Module identities.
pub use identity::{ModuleName, ModuleVersion, ProcessorArchitecture, PublicKeyToken};

/// Loaded modules.
pub use module::{Module, ModuleOrigin, ModuleRc};

/// The native loader interface.
pub use native::{ContextFlags, NativeLoader, NativeToken, PendingRelease};
