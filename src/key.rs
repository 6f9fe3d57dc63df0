//! Binding keys
//!
//! A [`TypeKey`] identifies one bindable slot in the container: a concrete
//! (fully parameterized) type plus an optional [`Tag`]. `Vec<i32>` and
//! `Vec<String>` are different keys because their `TypeId`s differ.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a concrete type, including its generic parameters.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Descriptor for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name (for diagnostics only, never compared).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Tag
// =============================================================================

/// Object-safe view of a tag value.
trait TagValue: Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_tag(&self, other: &dyn TagValue) -> bool;
    fn hash_tag(&self, state: &mut dyn Hasher);
}

impl<T> TagValue for T
where
    T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_tag(&self, other: &dyn TagValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn hash_tag(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// An opaque value that disambiguates bindings of the same type.
///
/// Any `Eq + Hash + Debug` value can be a tag. Two tags are equal only if
/// they hold the same type and compare equal, so `Tag::new(1u8)` and
/// `Tag::new(1u16)` are different tags.
///
/// String tags are normalized: `Tag::from("primary")` and
/// `Tag::from(String::from("primary"))` are equal.
///
/// # Examples
///
/// ```rust
/// use bindery::Tag;
///
/// #[derive(Debug, PartialEq, Eq, Hash)]
/// enum Region { Eu, Us }
///
/// assert_eq!(Tag::from("primary"), Tag::from(String::from("primary")));
/// assert_ne!(Tag::new(Region::Eu), Tag::new(Region::Us));
/// ```
#[derive(Clone)]
pub struct Tag(Arc<dyn TagValue>);

impl Tag {
    /// Wrap an arbitrary value as a tag.
    pub fn new<T>(value: T) -> Self
    where
        T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    /// Borrow the tag value if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// The tag as a string slice, if it is a string tag.
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<String>().map(String::as_str)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.eq_tag(other.0.as_ref())
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_tag(state);
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// =============================================================================
// TypeKey
// =============================================================================

/// A bindable type plus an optional disambiguating tag.
///
/// Two keys are equal iff both the type and the tag are equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    descriptor: TypeDescriptor,
    tag: Option<Tag>,
}

impl TypeKey {
    /// Untagged key for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            tag: None,
        }
    }

    /// Key for `T` under `tag`.
    #[inline]
    pub fn tagged<T: ?Sized + 'static>(tag: impl Into<Tag>) -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            tag: Some(tag.into()),
        }
    }

    /// Key for `T` with an optional tag.
    #[inline]
    pub fn with_tag<T: ?Sized + 'static>(tag: Option<Tag>) -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            tag,
        }
    }

    /// Build a key from an existing descriptor.
    #[inline]
    pub fn from_descriptor(descriptor: TypeDescriptor, tag: Option<Tag>) -> Self {
        Self { descriptor, tag }
    }

    #[inline]
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.descriptor.name()
    }

    #[inline]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{} (tag={:?})", self.descriptor.name(), tag),
            None => f.write_str(self.descriptor.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generic_parameters_distinguish_keys() {
        assert_ne!(TypeKey::of::<Vec<i32>>(), TypeKey::of::<Vec<String>>());
        assert_eq!(TypeKey::of::<Vec<i32>>(), TypeKey::of::<Vec<i32>>());
    }

    #[test]
    fn test_tag_participates_in_equality() {
        let primary = TypeKey::tagged::<u32>("primary");
        let replica = TypeKey::tagged::<u32>("replica");
        let untagged = TypeKey::of::<u32>();

        assert_ne!(primary, replica);
        assert_ne!(primary, untagged);
        assert_eq!(primary, TypeKey::tagged::<u32>(String::from("primary")));
    }

    #[test]
    fn test_tags_of_different_types_differ() {
        assert_ne!(Tag::new(1u8), Tag::new(1u16));
        assert_eq!(Tag::new(7u64), Tag::new(7u64));
    }

    #[test]
    fn test_keys_hash_consistently() {
        let mut keys = HashSet::new();
        keys.insert(TypeKey::tagged::<u32>("a"));
        keys.insert(TypeKey::tagged::<u32>(String::from("a")));
        keys.insert(TypeKey::of::<u32>());

        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeKey::of::<u32>().to_string(), "u32");
        assert_eq!(
            TypeKey::tagged::<u32>("primary").to_string(),
            "u32 (tag=\"primary\")"
        );
    }

    #[test]
    fn test_tag_downcast() {
        let tag = Tag::from("primary");
        assert_eq!(tag.as_str(), Some("primary"));
        assert!(tag.downcast_ref::<u32>().is_none());
    }
}
