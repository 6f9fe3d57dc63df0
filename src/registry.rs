//! Collection registry
//!
//! Guarantees that the aggregating binding behind a set or map multibinding
//! is created exactly once per container, no matter how many elements bind
//! into it or in which order.
//!
//! Creation for a given collection key runs inside that key's `DashMap`
//! entry, which serializes concurrent creators of the same collection. A
//! creator that still loses a race (for example through a second registry on
//! the same container) sees [`Declaration::AlreadyDeclared`] from the host
//! and treats the collection as present.

use crate::container::{Container, Declaration};
use crate::factory::AnyFactory;
use crate::key::{Tag, TypeKey};
use crate::multibinding::{CollectionSpec, Entry, Map, ProviderMap, Set};
use crate::provider::{Injectable, Lifetime, MapKey};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;

#[cfg(feature = "logging")]
use tracing::debug;

/// Shape of a collection binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionShape {
    /// `Set<T>`
    Set,
    /// `Set<Entry<K, T>>` with derived `Map<K, T>` and `ProviderMap<K, T>`
    Map,
}

/// Handle to an ensured collection binding.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    key: TypeKey,
    shape: CollectionShape,
    created: bool,
    existing: Option<TypeKey>,
}

impl CollectionHandle {
    /// Key of the collection that elements bind into.
    ///
    /// For map collections this is the `Set<Entry<K, T>>` pair set.
    #[inline]
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    #[inline]
    pub fn shape(&self) -> CollectionShape {
        self.shape
    }

    /// Whether this call created the collection binding.
    #[inline]
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// The already-bound key that made this call skip creation, if any.
    #[inline]
    pub fn existing(&self) -> Option<&TypeKey> {
        self.existing.as_ref()
    }
}

/// Lazily creates collection bindings in a container.
pub struct CollectionRegistry {
    container: Container,
    records: DashMap<TypeKey, CollectionShape, RandomState>,
}

impl CollectionRegistry {
    pub fn new(container: &Container) -> Self {
        Self {
            container: container.clone(),
            records: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Ensure the `Set<T>` collection binding under `tag` exists.
    ///
    /// Idempotent: a second call for the same element type and tag leaves
    /// the container unchanged and reports the existing collection.
    pub fn ensure_set_binding<T: Injectable>(&self, tag: Option<Tag>) -> Result<CollectionHandle> {
        let key = TypeKey::with_tag::<Set<T>>(tag);

        match self.records.entry(key.clone()) {
            MapEntry::Occupied(_) => Ok(CollectionHandle {
                key,
                shape: CollectionShape::Set,
                created: false,
                existing: None,
            }),
            MapEntry::Vacant(slot) => {
                #[cfg(feature = "logging")]
                debug!(target: "bindery", collection = %key, "Creating Set<...> binding");

                let declaration = self
                    .container
                    .declare_collection(key.clone(), CollectionSpec::set::<T>())?;
                slot.insert(CollectionShape::Set);

                Ok(CollectionHandle {
                    key,
                    shape: CollectionShape::Set,
                    created: declaration == Declaration::Created,
                    existing: None,
                })
            }
        }
    }

    /// Ensure the three bindings behind a `K -> T` map multibinding exist:
    ///
    /// 1. `Set<Entry<K, T>>`, the pair set elements bind into
    /// 2. `Map<K, T>`, derived from the pair set
    /// 3. `ProviderMap<K, T>`, derived from the map
    ///
    /// The three are treated as one group: if any of them is already bound,
    /// none is created.
    pub fn ensure_map_binding<K: MapKey, T: Injectable>(
        &self,
        tag: Option<Tag>,
    ) -> Result<CollectionHandle> {
        let entries_key = TypeKey::with_tag::<Set<Entry<K, T>>>(tag.clone());
        let map_key = TypeKey::with_tag::<Map<K, T>>(tag.clone());
        let providers_key = TypeKey::with_tag::<ProviderMap<K, T>>(tag);

        let group = [&entries_key, &map_key, &providers_key];

        let slot = match self.records.entry(entries_key.clone()) {
            MapEntry::Occupied(_) => {
                let existing = self.first_bound(group);
                return Ok(CollectionHandle {
                    key: entries_key,
                    shape: CollectionShape::Map,
                    created: false,
                    existing,
                });
            }
            MapEntry::Vacant(slot) => slot,
        };

        let existing = self.first_bound(group);

        let created = if existing.is_some() {
            false
        } else {
            #[cfg(feature = "logging")]
            debug!(
                target: "bindery",
                collection = %entries_key,
                map = %map_key,
                providers = %providers_key,
                "Creating Set<...> and Map<...> bindings"
            );

            let declaration = self
                .container
                .declare_collection(entries_key.clone(), CollectionSpec::entries::<K, T>())?;

            if declaration == Declaration::Created {
                let source = entries_key.clone();
                self.bind_derived(
                    map_key.clone(),
                    AnyFactory::from_container_fn(Lifetime::Provider, move |container| {
                        let entries = container.resolve_as::<Set<Entry<K, T>>>(&source)?;
                        Ok(Map::from_entries(&entries))
                    }),
                )?;

                self.bind_derived(
                    providers_key,
                    AnyFactory::from_container_fn(Lifetime::Provider, move |container| {
                        let map = container.resolve_as::<Map<K, T>>(&map_key)?;
                        Ok(ProviderMap::from_map(&map))
                    }),
                )?;
            }
            declaration == Declaration::Created
        };

        slot.insert(CollectionShape::Map);

        Ok(CollectionHandle {
            key: entries_key,
            shape: CollectionShape::Map,
            created,
            existing,
        })
    }

    fn first_bound(&self, keys: [&TypeKey; 3]) -> Option<TypeKey> {
        keys.into_iter()
            .find(|key| self.container.contains_key(key))
            .cloned()
    }

    /// Bind a derived map binding; an existing binding counts as present.
    fn bind_derived(&self, key: TypeKey, factory: AnyFactory) -> Result<()> {
        match self.container.bind(key, factory) {
            Ok(()) | Err(DiError::AlreadyRegistered { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Shape recorded for a collection key, if this registry ensured it.
    #[inline]
    pub fn recorded(&self, key: &TypeKey) -> Option<CollectionShape> {
        self.records.get(key).map(|shape| *shape)
    }

    /// Number of collections this registry has ensured.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRegistry")
            .field("collections", &self.records.len())
            .finish()
    }
}
