//! Aggregate values produced by multibindings
//!
//! - [`Set<T>`] collects every value bound into the set slot for `T`
//! - [`Map<K, T>`] maps each registered key to its value
//! - [`ProviderMap<K, T>`] maps each key to a [`Provider<T>`] of its value
//!
//! Map multibindings are stored as a set of [`Entry<K, T>`] pairs; the two
//! map shapes are derived from that set at resolution time.

use crate::factory::AnyValue;
use crate::key::TypeDescriptor;
use crate::provider::{Injectable, MapKey};
use crate::{DiError, Result};
use ahash::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

// =============================================================================
// Set
// =============================================================================

/// All values bound into one set slot, in registration order.
///
/// Each registration contributes exactly one element; two registrations
/// producing equal values yield two elements.
pub struct Set<T> {
    items: Vec<Arc<T>>,
}

impl<T> Set<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Arc<T>] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a Set<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

// =============================================================================
// Map
// =============================================================================

/// One `(key, value)` pair of a map multibinding.
pub struct Entry<K, T> {
    pub key: K,
    pub value: Arc<T>,
}

impl<K: fmt::Debug, T: fmt::Debug> fmt::Debug for Entry<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entry").field(&self.key).field(&self.value).finish()
    }
}

/// Map from each registered key to its value.
pub struct Map<K, T> {
    entries: HashMap<K, Arc<T>, RandomState>,
}

impl<K: MapKey, T: Injectable> Map<K, T> {
    /// Collect a pair set into a map. A later entry replaces an earlier
    /// one with the same key.
    pub(crate) fn from_entries(entries: &Set<Entry<K, T>>) -> Self {
        let mut map = HashMap::with_capacity_and_hasher(entries.len(), RandomState::new());
        for entry in entries {
            if map.insert(entry.key.clone(), Arc::clone(&entry.value)).is_some() {
                #[cfg(feature = "logging")]
                debug!(
                    target: "bindery",
                    key = ?entry.key,
                    value = std::any::type_name::<T>(),
                    "Map entry replaced by a later registration"
                );
            }
        }
        Self { entries: map }
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&Arc<T>> {
        self.entries.get(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Arc<T>)> {
        self.entries.iter()
    }
}

impl<K: fmt::Debug, T: fmt::Debug> fmt::Debug for Map<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// A provider that always yields the same value.
pub struct Provider<T> {
    value: Arc<T>,
}

impl<T> Provider<T> {
    #[inline]
    pub fn fixed(value: Arc<T>) -> Self {
        Self { value }
    }

    #[inline]
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.value).finish()
    }
}

/// Map from each registered key to a provider of its value.
pub struct ProviderMap<K, T> {
    entries: HashMap<K, Provider<T>, RandomState>,
}

impl<K: MapKey, T: Injectable> ProviderMap<K, T> {
    pub(crate) fn from_map(map: &Map<K, T>) -> Self {
        let entries = map
            .iter()
            .map(|(key, value)| (key.clone(), Provider::fixed(Arc::clone(value))))
            .collect();
        Self { entries }
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&Provider<T>> {
        self.entries.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Provider<T>)> {
        self.entries.iter()
    }
}

// =============================================================================
// Collection declarations
// =============================================================================

/// Assembles resolved elements into the aggregate value.
pub(crate) type AssembleFn = fn(Vec<AnyValue>) -> Result<AnyValue>;

/// Shape of a collection binding: its element type and how to assemble it.
///
/// Passed to [`Container::declare_collection`](crate::Container::declare_collection).
#[derive(Clone, Copy)]
pub struct CollectionSpec {
    element: TypeDescriptor,
    assemble: AssembleFn,
}

impl CollectionSpec {
    /// A `Set<T>` collection.
    pub fn set<T: Injectable>() -> Self {
        Self {
            element: TypeDescriptor::of::<T>(),
            assemble: assemble_set::<T>,
        }
    }

    /// The pair set backing a `Map<K, T>`.
    pub fn entries<K: MapKey, T: Injectable>() -> Self {
        Self::set::<Entry<K, T>>()
    }

    #[inline]
    pub fn element(&self) -> TypeDescriptor {
        self.element
    }

    #[inline]
    pub(crate) fn assemble(&self, values: Vec<AnyValue>) -> Result<AnyValue> {
        (self.assemble)(values)
    }
}

impl fmt::Debug for CollectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionSpec")
            .field("element", &self.element)
            .finish()
    }
}

fn assemble_set<T: Injectable>(values: Vec<AnyValue>) -> Result<AnyValue> {
    let items = values
        .into_iter()
        .map(|value| {
            value
                .downcast::<T>()
                .map_err(|_| DiError::creation_failed::<Set<T>>("element has the wrong type"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(Set { items }) as AnyValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erased<T: Injectable>(value: T) -> AnyValue {
        Arc::new(value)
    }

    #[test]
    fn test_assemble_set() {
        let spec = CollectionSpec::set::<u32>();
        let set = spec
            .assemble(vec![erased(1u32), erased(2u32), erased(1u32)])
            .unwrap()
            .downcast::<Set<u32>>()
            .unwrap();

        let values: Vec<u32> = set.iter().map(|v| **v).collect();
        assert_eq!(values, vec![1, 2, 1]);
    }

    #[test]
    fn test_assemble_rejects_wrong_element() {
        let spec = CollectionSpec::set::<u32>();
        assert!(matches!(
            spec.assemble(vec![erased("nope")]),
            Err(DiError::CreationFailed { .. })
        ));
    }

    #[test]
    fn test_map_from_entries() {
        let set = CollectionSpec::entries::<&'static str, u32>()
            .assemble(vec![
                erased(Entry { key: "a", value: Arc::new(1u32) }),
                erased(Entry { key: "b", value: Arc::new(2u32) }),
            ])
            .unwrap()
            .downcast::<Set<Entry<&'static str, u32>>>()
            .unwrap();

        let map = Map::from_entries(&set);
        assert_eq!(map.len(), 2);
        assert_eq!(**map.get(&"a").unwrap(), 1);

        let providers = ProviderMap::from_map(&map);
        let provider = providers.get(&"b").unwrap();
        assert!(Arc::ptr_eq(&provider.get(), map.get(&"b").unwrap()));
    }

    #[test]
    fn test_map_keeps_last_entry_for_duplicate_keys() {
        let set = Set {
            items: vec![
                Arc::new(Entry { key: 1u8, value: Arc::new("x") }),
                Arc::new(Entry { key: 2u8, value: Arc::new("z") }),
                Arc::new(Entry { key: 1u8, value: Arc::new("y") }),
            ],
        };

        let map = Map::from_entries(&set);
        assert_eq!(map.len(), 2);
        assert_eq!(**map.get(&1).unwrap(), "y");
        assert_eq!(**map.get(&2).unwrap(), "z");
    }
}
