//! # Bindery - Binding Registry for Dependency Injection
//!
//! Registers single bindings and set/map multibindings into a concurrent
//! container, creating the backing collection bindings lazily the first time
//! an element needs them, and builds values by invoking constructors with
//! resolved arguments.
//!
//! ## Features
//!
//! - **Three binding modes** - single, into-set, into-map
//! - **Lazy collections** - the `Set<T>` / `Map<K, T>` binding is created
//!   exactly once, by whichever element arrives first
//! - **Singleton or provider** - memoized once under concurrent first access,
//!   or a fresh value per resolution
//! - **Tags** - any `Eq + Hash + Debug` value distinguishes bindings of one type
//! - **Injected invocation** - callables declare their parameter keys up front
//! - **Observable** - optional `tracing` events for every registration
//!
//! ## Quick Start
//!
//! ```rust
//! use bindery::{BindingConfig, Container, Registrar};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! trait Plugin: Send + Sync {
//!     fn name(&self) -> &str;
//! }
//!
//! struct Metrics;
//! impl Plugin for Metrics {
//!     fn name(&self) -> &str {
//!         "metrics"
//!     }
//! }
//!
//! let container = Container::new();
//! let registrar = Registrar::new(&container);
//!
//! registrar
//!     .register(BindingConfig::single().singleton(), "app", || Database {
//!         url: "postgres://localhost".into(),
//!     })
//!     .unwrap();
//!
//! registrar
//!     .register(BindingConfig::into_set(), "plugins", || {
//!         Box::new(Metrics) as Box<dyn Plugin>
//!     })
//!     .unwrap();
//!
//! container.freeze();
//!
//! let db = container.get::<Database>().unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//!
//! let plugins = container.set::<Box<dyn Plugin>>(None).unwrap();
//! assert_eq!(plugins.len(), 1);
//! ```
//!
//! ## Map Multibindings
//!
//! ```rust
//! use bindery::{BindingConfig, Container, Registrar};
//!
//! struct Handler(&'static str);
//!
//! let container = Container::new();
//! let registrar = Registrar::new(&container);
//!
//! registrar
//!     .register(BindingConfig::into_map("get"), "routes", || Handler("list"))
//!     .unwrap();
//! registrar
//!     .register(BindingConfig::into_map("post"), "routes", || Handler("create"))
//!     .unwrap();
//! container.freeze();
//!
//! let handlers = container.map::<&'static str, Handler>(None).unwrap();
//! assert_eq!(handlers.get(&"post").unwrap().0, "create");
//!
//! let providers = container.provider_map::<&'static str, Handler>(None).unwrap();
//! assert_eq!(providers.get(&"get").unwrap().get().0, "list");
//! ```

mod container;
mod error;
mod factory;
pub mod invoker;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod multibinding;
mod provider;
mod registrar;
mod registry;
mod storage;

pub use container::*;
pub use error::*;
pub use factory::*;
pub use invoker::{
    Arguments, Callable, Constructible, Constructor, Resolver, construct, invoke,
};
pub use key::*;
pub use multibinding::*;
pub use provider::*;
pub use registrar::*;
pub use registry::*;

#[cfg(feature = "derive")]
pub use bindery_derive::Inject;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BindingConfig, Constructible, Constructor, Container, DiError, Injectable, Lifetime, Map,
        ProviderMap, Registrar, Result, Set, Tag, TypeKey, construct,
    };
    pub use std::sync::Arc;
}
