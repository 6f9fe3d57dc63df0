//! Provider traits for dependency injection
//!
//! These types define what can be bound and how a binding behaves.

use crate::key::TypeDescriptor;
use std::fmt;

/// Marker trait for types that can be bound in the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {
    /// Returns the type name for debugging
    #[inline]
    fn type_name_of() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Values usable as map multibinding keys.
pub trait MapKey: Eq + std::hash::Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<K> MapKey for K where K: Eq + std::hash::Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Lifetime of a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Computed once on first resolve, then cached and shared
    Singleton,

    /// Computed fresh on every resolve
    #[default]
    Provider,
}

impl Lifetime {
    /// `Singleton` when `singleton` is set, `Provider` otherwise.
    #[inline]
    pub fn from_flag(singleton: bool) -> Self {
        if singleton {
            Self::Singleton
        } else {
            Self::Provider
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Provider => "provider",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multiplicity of a binding, as recorded in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// The only binding for its key
    Single,
    /// One member of a `Set<T>`
    IntoSet,
    /// One entry of a `Map<K, T>`
    IntoMap { key_type: TypeDescriptor },
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::IntoSet => f.write_str("into_set"),
            Self::IntoMap { key_type } => write!(f, "into_map<{}>", key_type),
        }
    }
}
