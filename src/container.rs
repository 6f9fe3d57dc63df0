//! Host container
//!
//! The `Container` stores bindings and resolves them. Its lifecycle has two
//! phases: bindings are accumulated during setup, then [`Container::freeze`]
//! closes registration and opens resolution.
//!
//! The raw capabilities here (`bind`, `bind_into_collection`,
//! `declare_collection`, `resolve`) are what [`Registrar`](crate::Registrar)
//! builds on; most callers should register through it.

use crate::factory::{AnyFactory, AnyValue};
use crate::key::{Tag, TypeKey};
use crate::multibinding::{CollectionSpec, Entry, Map, ProviderMap, Set};
use crate::provider::{Injectable, MapKey};
use crate::storage::{Insert, ServiceStorage};
use crate::{DiError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Outcome of [`Container::declare_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// The collection binding was created by this call
    Created,
    /// A collection binding already existed under the key
    AlreadyDeclared,
}

/// Outcome of [`Container::bind_into_collection`].
#[derive(Debug)]
pub enum ElementBind {
    /// The element was added to the collection
    Bound,
    /// No collection is declared under the key; the factory is handed back
    /// so the caller can declare the collection and retry
    CollectionMissing(AnyFactory),
}

/// Dependency injection container.
///
/// Cheap to clone: clones share the same bindings and freeze state.
///
/// # Examples
///
/// ```rust
/// use bindery::{AnyFactory, Container, Lifetime, TypeKey};
///
/// struct Database { url: String }
///
/// let container = Container::new();
/// container
///     .bind(
///         TypeKey::of::<Database>(),
///         AnyFactory::from_fn(Lifetime::Singleton, || Database { url: "postgres://localhost".into() }),
///     )
///     .unwrap();
/// container.freeze();
///
/// let db = container.get::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    storage: Arc<ServiceStorage>,
    frozen: Arc<AtomicBool>,
}

impl Container {
    /// Create a new, empty container in the setup phase.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "bindery", "Creating new container");

        Self {
            storage: Arc::new(ServiceStorage::new()),
            frozen: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a container with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "bindery", capacity, "Creating new container with capacity");

        Self {
            storage: Arc::new(ServiceStorage::with_capacity(capacity)),
            frozen: Arc::new(AtomicBool::new(false)),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a single binding.
    ///
    /// Fails with [`DiError::AlreadyRegistered`] if the key is already bound.
    pub fn bind(&self, key: TypeKey, factory: AnyFactory) -> Result<()> {
        self.check_not_frozen()?;

        #[cfg(feature = "logging")]
        trace!(
            target: "bindery",
            key = %key,
            lifetime = %factory.lifetime(),
            "Binding single"
        );

        match self.storage.insert_binding(key.clone(), factory) {
            Insert::Inserted => Ok(()),
            Insert::Occupied => Err(DiError::already_registered(&key)),
        }
    }

    /// Add an element to a declared collection.
    ///
    /// Returns [`ElementBind::CollectionMissing`] if `collection_key` was never
    /// declared. That is the only outcome that signals a missing collection.
    pub fn bind_into_collection(
        &self,
        collection_key: &TypeKey,
        element_key: &TypeKey,
        factory: AnyFactory,
    ) -> Result<ElementBind> {
        self.check_not_frozen()?;

        match self.storage.push_element(collection_key, factory) {
            Ok(()) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "bindery",
                    collection = %collection_key,
                    element = %element_key,
                    "Bound element into collection"
                );
                #[cfg(not(feature = "logging"))]
                let _ = element_key;

                Ok(ElementBind::Bound)
            }
            Err(factory) => Ok(ElementBind::CollectionMissing(factory)),
        }
    }

    /// Declare an aggregating collection binding under `key`.
    ///
    /// Declaring an existing collection is not an error and reports
    /// [`Declaration::AlreadyDeclared`]. Declaring over a key that holds a
    /// single binding is a conflict.
    pub fn declare_collection(&self, key: TypeKey, spec: CollectionSpec) -> Result<Declaration> {
        self.check_not_frozen()?;

        match self.storage.declare_collection(key.clone(), spec) {
            Some(Insert::Inserted) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "bindery",
                    collection = %key,
                    element = %spec.element(),
                    "Declared collection binding"
                );
                Ok(Declaration::Created)
            }
            Some(Insert::Occupied) => Ok(Declaration::AlreadyDeclared),
            None => Err(DiError::already_registered(&key)),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// End the setup phase. Further registrations fail with
    /// [`DiError::Locked`]; resolution becomes available.
    #[inline]
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            binding_count = self.storage.len(),
            "Container frozen - no further registrations allowed"
        );
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    #[inline]
    fn check_not_frozen(&self) -> Result<()> {
        if self.is_frozen() {
            Err(DiError::Locked)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the value bound under `key`.
    ///
    /// Single bindings are checked first, then collections. Collection
    /// elements are resolved in registration order and assembled.
    pub fn resolve(&self, key: &TypeKey) -> Result<AnyValue> {
        if !self.is_frozen() {
            return Err(DiError::NotFrozen);
        }

        if let Some(factory) = self.storage.binding(key) {
            #[cfg(feature = "logging")]
            trace!(target: "bindery", key = %key, "Resolving single binding");

            return factory.resolve(self);
        }

        if let Some((spec, elements)) = self.storage.collection(key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "bindery",
                key = %key,
                elements = elements.len(),
                "Resolving collection binding"
            );

            let values = elements
                .iter()
                .map(|factory| factory.resolve(self))
                .collect::<Result<Vec<_>>>()?;
            return spec.assemble(values);
        }

        #[cfg(feature = "logging")]
        debug!(target: "bindery", key = %key, "No binding found");

        Err(DiError::not_found(key))
    }

    /// Resolve `key` and downcast to `T`.
    pub fn resolve_as<T: Injectable>(&self, key: &TypeKey) -> Result<Arc<T>> {
        self.resolve(key)?
            .downcast::<T>()
            .map_err(|_| DiError::creation_failed::<T>(format!("value bound under {key} has a different type")))
    }

    /// Resolve the untagged binding for `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bindery::{AnyFactory, Container, Lifetime, TypeKey};
    ///
    /// struct MyService;
    ///
    /// let container = Container::new();
    /// container
    ///     .bind(TypeKey::of::<MyService>(), AnyFactory::from_fn(Lifetime::Singleton, || MyService))
    ///     .unwrap();
    /// container.freeze();
    ///
    /// let service = container.get::<MyService>().unwrap();
    /// ```
    #[inline]
    pub fn get<T: Injectable>(&self) -> Result<Arc<T>> {
        self.resolve_as(&TypeKey::of::<T>())
    }

    /// Resolve the binding for `T` under `tag`.
    #[inline]
    pub fn get_tagged<T: Injectable>(&self, tag: impl Into<Tag>) -> Result<Arc<T>> {
        self.resolve_as(&TypeKey::tagged::<T>(tag))
    }

    /// Resolve the untagged binding for `T`, `None` on any failure.
    #[inline]
    pub fn try_get<T: Injectable>(&self) -> Option<Arc<T>> {
        self.get::<T>().ok()
    }

    /// Resolve the set multibinding for `T`.
    #[inline]
    pub fn set<T: Injectable>(&self, tag: Option<Tag>) -> Result<Arc<Set<T>>> {
        self.resolve_as(&TypeKey::with_tag::<Set<T>>(tag))
    }

    /// Resolve the map multibinding from `K` to `T`.
    #[inline]
    pub fn map<K: MapKey, T: Injectable>(&self, tag: Option<Tag>) -> Result<Arc<Map<K, T>>> {
        self.resolve_as(&TypeKey::with_tag::<Map<K, T>>(tag))
    }

    /// Resolve the map multibinding from `K` to a provider of `T`.
    #[inline]
    pub fn provider_map<K: MapKey, T: Injectable>(
        &self,
        tag: Option<Tag>,
    ) -> Result<Arc<ProviderMap<K, T>>> {
        self.resolve_as(&TypeKey::with_tag::<ProviderMap<K, T>>(tag))
    }

    /// Resolve the raw pair set backing a map multibinding.
    #[inline]
    pub fn entries<K: MapKey, T: Injectable>(
        &self,
        tag: Option<Tag>,
    ) -> Result<Arc<Set<Entry<K, T>>>> {
        self.set::<Entry<K, T>>(tag)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Check if `key` is bound (singly or as a collection).
    #[inline]
    pub fn contains_key(&self, key: &TypeKey) -> bool {
        self.storage.contains(key)
    }

    /// Check if a collection is declared under `key`.
    #[inline]
    pub fn has_collection(&self, key: &TypeKey) -> bool {
        self.storage.has_collection(key)
    }

    /// Number of bindings (collections count once).
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// All bound keys, in no particular order.
    pub fn keys(&self) -> Vec<TypeKey> {
        self.storage.keys()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("storage", &self.storage)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
