//! Binding tables for the container
//!
//! Uses DashMap for lock-free concurrent reads. Factories are stored behind
//! `Arc` and cloned out of the map before they run, so no shard lock is held
//! while user code executes.

use crate::factory::AnyFactory;
use crate::key::TypeKey;
use crate::multibinding::CollectionSpec;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// A declared collection and the elements bound into it so far.
pub(crate) struct Collection {
    spec: CollectionSpec,
    elements: Vec<Arc<AnyFactory>>,
}

/// Outcome of inserting into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insert {
    Inserted,
    Occupied,
}

/// Thread-safe storage for single bindings and collection bindings.
pub(crate) struct ServiceStorage {
    bindings: DashMap<TypeKey, Arc<AnyFactory>, RandomState>,
    collections: DashMap<TypeKey, Collection, RandomState>,
}

impl ServiceStorage {
    /// Create new empty storage.
    ///
    /// 8 shards: binding tables are small and written only during setup.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            collections: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Insert a single binding unless the key is already taken by a
    /// binding or a collection.
    pub fn insert_binding(&self, key: TypeKey, factory: AnyFactory) -> Insert {
        if self.collections.contains_key(&key) {
            return Insert::Occupied;
        }
        match self.bindings.entry(key) {
            Entry::Occupied(_) => Insert::Occupied,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(factory));
                Insert::Inserted
            }
        }
    }

    /// Declare a collection. `None` if a single binding holds the key.
    pub fn declare_collection(&self, key: TypeKey, spec: CollectionSpec) -> Option<Insert> {
        if self.bindings.contains_key(&key) {
            return None;
        }
        match self.collections.entry(key) {
            Entry::Occupied(_) => Some(Insert::Occupied),
            Entry::Vacant(slot) => {
                slot.insert(Collection {
                    spec,
                    elements: Vec::new(),
                });
                Some(Insert::Inserted)
            }
        }
    }

    /// Append an element to a declared collection, handing the factory
    /// back if the collection does not exist.
    pub fn push_element(
        &self,
        collection_key: &TypeKey,
        factory: AnyFactory,
    ) -> std::result::Result<(), AnyFactory> {
        match self.collections.get_mut(collection_key) {
            Some(mut collection) => {
                collection.elements.push(Arc::new(factory));
                Ok(())
            }
            None => Err(factory),
        }
    }

    /// Get a single binding's factory
    #[inline]
    pub fn binding(&self, key: &TypeKey) -> Option<Arc<AnyFactory>> {
        self.bindings.get(key).map(|f| Arc::clone(f.value()))
    }

    /// Snapshot a collection's spec and element factories
    #[inline]
    pub fn collection(&self, key: &TypeKey) -> Option<(CollectionSpec, Vec<Arc<AnyFactory>>)> {
        self.collections
            .get(key)
            .map(|c| (c.spec, c.elements.clone()))
    }

    /// Check if a key is bound, either singly or as a collection
    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.bindings.contains_key(key) || self.collections.contains_key(key)
    }

    #[inline]
    pub fn has_collection(&self, key: &TypeKey) -> bool {
        self.collections.contains_key(key)
    }

    /// Number of single bindings plus declared collections
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len() + self.collections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.collections.is_empty()
    }

    /// All bound keys
    pub fn keys(&self) -> Vec<TypeKey> {
        self.bindings
            .iter()
            .map(|r| r.key().clone())
            .chain(self.collections.iter().map(|r| r.key().clone()))
            .collect()
    }
}

impl Default for ServiceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStorage")
            .field("bindings", &self.bindings.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multibinding::Set;
    use crate::provider::Lifetime;

    #[allow(dead_code)]
    struct TestService {
        value: i32,
    }

    fn factory(value: i32) -> AnyFactory {
        AnyFactory::from_fn(Lifetime::Provider, move || TestService { value })
    }

    #[test]
    fn test_storage_insert_once() {
        let storage = ServiceStorage::new();
        let key = TypeKey::of::<TestService>();

        assert_eq!(storage.insert_binding(key.clone(), factory(1)), Insert::Inserted);
        assert_eq!(storage.insert_binding(key.clone(), factory(2)), Insert::Occupied);
        assert!(storage.contains(&key));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_storage_collection_lifecycle() {
        let storage = ServiceStorage::new();
        let key = TypeKey::of::<Set<TestService>>();

        assert!(storage.push_element(&key, factory(1)).is_err());

        assert_eq!(
            storage.declare_collection(key.clone(), CollectionSpec::set::<TestService>()),
            Some(Insert::Inserted)
        );
        assert_eq!(
            storage.declare_collection(key.clone(), CollectionSpec::set::<TestService>()),
            Some(Insert::Occupied)
        );

        assert!(storage.push_element(&key, factory(1)).is_ok());
        assert!(storage.push_element(&key, factory(2)).is_ok());

        let (spec, elements) = storage.collection(&key).unwrap();
        assert_eq!(spec.element(), crate::TypeDescriptor::of::<TestService>());
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_single_and_collection_keys_exclude_each_other() {
        let storage = ServiceStorage::new();
        let key = TypeKey::of::<Set<TestService>>();

        storage.insert_binding(key.clone(), factory(0));
        assert_eq!(
            storage.declare_collection(key.clone(), CollectionSpec::set::<TestService>()),
            None
        );

        let other = TypeKey::tagged::<Set<TestService>>("other");
        storage.declare_collection(other.clone(), CollectionSpec::set::<TestService>());
        assert_eq!(storage.insert_binding(other, factory(0)), Insert::Occupied);
    }

    #[test]
    fn test_storage_keys() {
        let storage = ServiceStorage::new();
        storage.insert_binding(TypeKey::of::<TestService>(), factory(3));
        storage.declare_collection(
            TypeKey::of::<Set<TestService>>(),
            CollectionSpec::set::<TestService>(),
        );

        let keys = storage.keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&TypeKey::of::<TestService>()));
        assert!(!storage.is_empty());
    }
}
