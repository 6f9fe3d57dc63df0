//! Error types for binding registration and resolution

use crate::key::TypeKey;
use thiserror::Error;

/// Errors that can occur during registration, resolution or invocation
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Nothing is bound under the key
    #[error("No binding found for {key}")]
    NotFound { key: TypeKey },

    /// The container refused to redefine an existing binding
    #[error("Binding already registered: {key}")]
    AlreadyRegistered { key: TypeKey },

    /// A registration clashed with an existing binding
    #[error("Binding conflict for {key} (registered by {source_name})")]
    BindingConflict { key: TypeKey, source_name: String },

    /// A parameter of a callable could not be resolved
    #[error("Unresolved dependency {key} for parameter {position} of {callable}")]
    UnresolvedDependency {
        callable: &'static str,
        position: usize,
        key: TypeKey,
    },

    /// More than one constructor is marked as the injection target
    #[error("Ambiguous constructor for {type_name}: more than one is marked injectable")]
    AmbiguousConstructor { type_name: &'static str },

    /// Several constructors exist and none is marked as the injection target
    #[error("No injectable constructor for {type_name}")]
    NoInjectableConstructor { type_name: &'static str },

    /// A method was invoked without its receiver
    #[error("{callable} requires a receiver")]
    MissingReceiver { callable: &'static str },

    /// A resolved argument did not have the declared parameter type
    #[error("Argument {position} is not a {expected}")]
    ArgumentMismatch {
        position: usize,
        expected: &'static str,
    },

    /// Factory failed to create a value
    #[error("Failed to create {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// Container is frozen and cannot be modified
    #[error("Container is frozen - cannot register new bindings")]
    Locked,

    /// Container has not been frozen yet and cannot be queried
    #[error("Container is not frozen - bindings cannot be resolved during setup")]
    NotFrozen,
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: &TypeKey) -> Self {
        Self::NotFound { key: key.clone() }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create an AlreadyRegistered error
    #[inline]
    pub fn already_registered(key: &TypeKey) -> Self {
        Self::AlreadyRegistered { key: key.clone() }
    }

    /// Create a BindingConflict error attributed to `source_name`
    #[inline]
    pub fn conflict(key: &TypeKey, source_name: &str) -> Self {
        Self::BindingConflict {
            key: key.clone(),
            source_name: source_name.to_owned(),
        }
    }

    /// The key this error is about, if any
    pub fn key(&self) -> Option<&TypeKey> {
        match self {
            Self::NotFound { key }
            | Self::AlreadyRegistered { key }
            | Self::BindingConflict { key, .. }
            | Self::UnresolvedDependency { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
