//! Binding registrar
//!
//! Single entry point for registering a binding: it picks the multiplicity,
//! wraps the factory with the requested lifetime, creates collection
//! bindings on first need, and reports each successful registration.
//!
//! # Example
//!
//! ```rust
//! use bindery::{BindingConfig, Container, Registrar};
//!
//! #[derive(Debug)]
//! struct Logger(&'static str);
//!
//! let container = Container::new();
//! let registrar = Registrar::new(&container);
//!
//! registrar.register(BindingConfig::into_set(), "ConsoleModule", || Logger("console")).unwrap();
//! registrar.register(BindingConfig::into_set(), "FileModule", || Logger("file")).unwrap();
//! registrar
//!     .register(BindingConfig::into_map("json").singleton(), "JsonModule", || Logger("json"))
//!     .unwrap();
//!
//! container.freeze();
//!
//! assert_eq!(container.set::<Logger>(None).unwrap().len(), 2);
//! assert_eq!(container.map::<&'static str, Logger>(None).unwrap().get(&"json").unwrap().0, "json");
//! ```

use crate::container::{Container, ElementBind};
use crate::factory::AnyFactory;
use crate::invoker::{Constructible, construct};
use crate::key::{Tag, TypeDescriptor, TypeKey};
use crate::multibinding::{Entry, Set};
use crate::provider::{BindingMode, Injectable, Lifetime, MapKey};
use crate::registry::{CollectionHandle, CollectionRegistry};
use crate::{DiError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// How a binding contributes to its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Multibinding<K = ()> {
    /// The only binding for the key
    Single,
    /// One member of the key's `Set<T>`
    IntoSet,
    /// The entry for map key `K` in the key's `Map<K, T>`
    IntoMap(K),
}

/// Per-registration configuration: lifetime, multiplicity and tag.
#[derive(Debug, Clone)]
pub struct BindingConfig<K = ()> {
    pub lifetime: Lifetime,
    pub mode: Multibinding<K>,
    pub tag: Option<Tag>,
}

impl BindingConfig<()> {
    /// A single binding with provider lifetime.
    pub fn single() -> Self {
        Self {
            lifetime: Lifetime::Provider,
            mode: Multibinding::Single,
            tag: None,
        }
    }

    /// A set member with provider lifetime.
    pub fn into_set() -> Self {
        Self {
            lifetime: Lifetime::Provider,
            mode: Multibinding::IntoSet,
            tag: None,
        }
    }
}

impl Default for BindingConfig<()> {
    fn default() -> Self {
        Self::single()
    }
}

impl<K: MapKey> BindingConfig<K> {
    /// A map entry under `key` with provider lifetime.
    pub fn into_map(key: K) -> Self {
        Self {
            lifetime: Lifetime::Provider,
            mode: Multibinding::IntoMap(key),
            tag: None,
        }
    }
}

impl<K: 'static> BindingConfig<K> {
    pub fn singleton(mut self) -> Self {
        self.lifetime = Lifetime::Singleton;
        self
    }

    pub fn provider(mut self) -> Self {
        self.lifetime = Lifetime::Provider;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn tagged(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The mode as reported in registration events.
    pub fn binding_mode(&self) -> BindingMode {
        match self.mode {
            Multibinding::Single => BindingMode::Single,
            Multibinding::IntoSet => BindingMode::IntoSet,
            Multibinding::IntoMap(_) => BindingMode::IntoMap {
                key_type: TypeDescriptor::of::<K>(),
            },
        }
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// A successful registration.
#[derive(Debug, Clone)]
pub struct RegistrationEvent {
    pub mode: BindingMode,
    pub lifetime: Lifetime,
    pub tag: Option<Tag>,
    pub type_descriptor: TypeDescriptor,
    pub source_name: String,
}

/// Receives an event for every successful registration.
///
/// Observers are advisory: they run after the binding is in place and
/// cannot fail the registration.
pub trait RegistrationObserver: Send + Sync {
    fn on_registered(&self, event: &RegistrationEvent);
}

// =============================================================================
// Registrar
// =============================================================================

/// Registers bindings into a [`Container`].
pub struct Registrar {
    container: Container,
    collections: CollectionRegistry,
    observers: Vec<Arc<dyn RegistrationObserver>>,
}

impl Registrar {
    pub fn new(container: &Container) -> Self {
        Self {
            container: container.clone(),
            collections: CollectionRegistry::new(container),
            observers: Vec::new(),
        }
    }

    /// Add an observer for registration events.
    pub fn with_observer(mut self, observer: Arc<dyn RegistrationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[inline]
    pub fn collections(&self) -> &CollectionRegistry {
        &self.collections
    }

    /// Register a binding for `T` produced by a zero-argument factory.
    ///
    /// `source_name` names the registering code in errors and events.
    pub fn register<T, K, F>(&self, config: BindingConfig<K>, source_name: &str, factory: F) -> Result<()>
    where
        T: Injectable,
        K: MapKey,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_with(config, source_name, move |_: &Container| Ok(factory()))
    }

    /// Register a binding for `T` whose factory resolves other bindings.
    pub fn register_with<T, K, F>(
        &self,
        config: BindingConfig<K>,
        source_name: &str,
        factory: F,
    ) -> Result<()>
    where
        T: Injectable,
        K: MapKey,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        let mode = config.binding_mode();
        let BindingConfig {
            lifetime,
            mode: multibinding,
            tag,
        } = config;

        match multibinding {
            Multibinding::Single => {
                let key = TypeKey::with_tag::<T>(tag.clone());
                self.container
                    .bind(key, AnyFactory::from_container_fn(lifetime, factory))
                    .map_err(|err| attribute(err, source_name))?;
            }
            Multibinding::IntoSet => {
                let set_key = TypeKey::with_tag::<Set<T>>(tag.clone());
                let element_key = TypeKey::with_tag::<T>(tag.clone());
                let collection_tag = tag.clone();
                self.bind_element(
                    &set_key,
                    &element_key,
                    source_name,
                    AnyFactory::from_container_fn(lifetime, factory),
                    || self.collections.ensure_set_binding::<T>(collection_tag),
                )?;
            }
            Multibinding::IntoMap(map_key) => {
                let entries_key = TypeKey::with_tag::<Set<Entry<K, T>>>(tag.clone());
                let element_key = TypeKey::with_tag::<Entry<K, T>>(tag.clone());
                let collection_tag = tag.clone();
                let entry_factory = AnyFactory::from_container_fn(lifetime, move |container| {
                    Ok(Entry {
                        key: map_key.clone(),
                        value: Arc::new(factory(container)?),
                    })
                });
                self.bind_element(
                    &entries_key,
                    &element_key,
                    source_name,
                    entry_factory,
                    || self.collections.ensure_map_binding::<K, T>(collection_tag),
                )?;
            }
        }

        self.emit(RegistrationEvent {
            mode,
            lifetime,
            tag,
            type_descriptor: TypeDescriptor::of::<T>(),
            source_name: source_name.to_owned(),
        });
        Ok(())
    }

    /// Register `T` built by [`construct`] against the container.
    pub fn register_constructed<T, K>(&self, config: BindingConfig<K>, source_name: &str) -> Result<()>
    where
        T: Constructible,
        K: MapKey,
    {
        self.register_with(config, source_name, |container: &Container| {
            construct::<T, _>(container)
        })
    }

    /// Bind an element optimistically; if its collection is missing, ensure
    /// the collection and retry exactly once.
    fn bind_element(
        &self,
        collection_key: &TypeKey,
        element_key: &TypeKey,
        source_name: &str,
        factory: AnyFactory,
        ensure: impl FnOnce() -> Result<CollectionHandle>,
    ) -> Result<()> {
        let factory = match self
            .container
            .bind_into_collection(collection_key, element_key, factory)?
        {
            ElementBind::Bound => return Ok(()),
            ElementBind::CollectionMissing(factory) => factory,
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            collection = %collection_key,
            source = source_name,
            "Collection missing, creating it before retrying"
        );

        let handle = ensure().map_err(|err| attribute(err, source_name))?;

        match self
            .container
            .bind_into_collection(collection_key, element_key, factory)?
        {
            ElementBind::Bound => Ok(()),
            ElementBind::CollectionMissing(_) => {
                let blocking = handle.existing().unwrap_or(collection_key);
                Err(DiError::conflict(blocking, source_name))
            }
        }
    }

    fn emit(&self, event: RegistrationEvent) {
        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            mode = %event.mode,
            lifetime = %event.lifetime,
            tag = ?event.tag,
            service = event.type_descriptor.name(),
            source = %event.source_name,
            "Registered binding"
        );

        for observer in &self.observers {
            observer.on_registered(&event);
        }
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("container", &self.container)
            .field("collections", &self.collections)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Attribute a raw host rejection to the registering source.
fn attribute(err: DiError, source_name: &str) -> DiError {
    match err {
        DiError::AlreadyRegistered { key } => DiError::BindingConflict {
            key,
            source_name: source_name.to_owned(),
        },
        other => other,
    }
}
