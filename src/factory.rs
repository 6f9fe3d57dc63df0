//! Factory types for creating bound values
//!
//! Factories encapsulate how a value is produced and how long it lives.
//! Both variants store a type-erased init function so the container tables
//! stay monomorphization-free.

use crate::container::Container;
use crate::provider::{Injectable, Lifetime};
use crate::Result;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A type-erased bound value.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Type-erased factory function. Receives the container it is resolved from.
pub(crate) type InitFn = Arc<dyn Fn(&Container) -> Result<AnyValue> + Send + Sync>;

// =============================================================================
// Singleton Factory
// =============================================================================

/// Singleton factory - creates the value on first resolve and caches it.
///
/// Concurrent first resolves block on the same cell, so the init function
/// runs at most once. A failed init is not cached.
pub struct SingletonFactory {
    init: InitFn,
    instance: OnceCell<AnyValue>,
    type_name: &'static str,
}

impl SingletonFactory {
    pub(crate) fn new(type_name: &'static str, init: InitFn) -> Self {
        Self {
            init,
            instance: OnceCell::new(),
            type_name,
        }
    }

    /// Get the instance, creating it if necessary
    #[inline]
    pub fn resolve(&self, container: &Container) -> Result<AnyValue> {
        #[cfg(feature = "logging")]
        if self.instance.get().is_some() {
            trace!(
                target: "bindery",
                service = self.type_name,
                "Singleton already initialized, returning cached instance"
            );
        }

        let instance = self.instance.get_or_try_init(|| {
            #[cfg(feature = "logging")]
            debug!(
                target: "bindery",
                service = self.type_name,
                "Singleton initializing on first access"
            );

            (self.init)(container)
        })?;

        Ok(Arc::clone(instance))
    }

    /// Whether the value has been created yet
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

// =============================================================================
// Provider Factory
// =============================================================================

/// Provider factory - creates a new value on every resolve
pub struct ProviderFactory {
    factory: InitFn,
    type_name: &'static str,
}

impl ProviderFactory {
    pub(crate) fn new(type_name: &'static str, factory: InitFn) -> Self {
        Self { factory, type_name }
    }

    /// Create a new instance
    #[inline]
    pub fn create(&self, container: &Container) -> Result<AnyValue> {
        #[cfg(feature = "logging")]
        trace!(
            target: "bindery",
            service = self.type_name,
            "Creating new provider instance"
        );

        (self.factory)(container)
    }
}

// =============================================================================
// AnyFactory
// =============================================================================

/// Type-erased factory handed to the container.
///
/// An enum rather than `Box<dyn Factory>`: there are exactly two lifetimes
/// and the match is cheaper than a vtable call on the resolve path.
pub enum AnyFactory {
    /// Created once, then shared
    Singleton(SingletonFactory),
    /// Created on every resolve
    Provider(ProviderFactory),
}

impl AnyFactory {
    /// Wrap an already type-erased init function.
    pub(crate) fn erased(lifetime: Lifetime, type_name: &'static str, init: InitFn) -> Self {
        match lifetime {
            Lifetime::Singleton => Self::Singleton(SingletonFactory::new(type_name, init)),
            Lifetime::Provider => Self::Provider(ProviderFactory::new(type_name, init)),
        }
    }

    /// Factory from a zero-argument function.
    pub fn from_fn<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::erased(
            lifetime,
            std::any::type_name::<T>(),
            Arc::new(move |_: &Container| -> Result<AnyValue> {
                Ok(Arc::new(factory()) as AnyValue)
            }),
        )
    }

    /// Factory from a function that may resolve other bindings.
    pub fn from_container_fn<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        Self::erased(
            lifetime,
            std::any::type_name::<T>(),
            Arc::new(move |container: &Container| {
                factory(container).map(|value| Arc::new(value) as AnyValue)
            }),
        )
    }

    /// Resolve the value
    #[inline]
    pub fn resolve(&self, container: &Container) -> Result<AnyValue> {
        match self {
            AnyFactory::Singleton(f) => f.resolve(container),
            AnyFactory::Provider(f) => f.create(container),
        }
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        match self {
            AnyFactory::Singleton(_) => Lifetime::Singleton,
            AnyFactory::Provider(_) => Lifetime::Provider,
        }
    }

    /// Name of the produced type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            AnyFactory::Singleton(f) => f.type_name,
            AnyFactory::Provider(f) => f.type_name,
        }
    }
}

impl std::fmt::Debug for AnyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyFactory")
            .field("lifetime", &self.lifetime())
            .field("type_name", &self.type_name())
            .finish()
    }
}
