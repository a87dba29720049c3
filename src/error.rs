//! Error types.
//!
//! [`ConfigurationError`] is the only error a resolver can produce, and only at
//! construction. Resolution itself never fails; the remaining errors belong to
//! the registry and the manifest.

use std::path::PathBuf;

use thiserror::Error;

/// A marker type that cannot be looked up along a namespace chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("marker `{0}` is repeatable; lookup of repeatable markers is not supported")]
    Repeatable(String),

    #[error("marker `{0}` is not applicable to namespaces")]
    NotNamespaceApplicable(String),
}

/// A malformed namespace name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty namespace name is not allowed")]
    Empty,

    #[error("invalid namespace '{0}': cannot start or end with '.'")]
    DanglingSeparator(String),

    #[error("invalid namespace '{0}': empty segment")]
    EmptySegment(String),

    #[error("invalid namespace '{path}': segment '{segment}' must start with letter or underscore")]
    BadSegmentStart { path: String, segment: String },

    #[error("invalid namespace '{path}': segment '{segment}' contains invalid character '{ch}'")]
    BadCharacter {
        path: String,
        segment: String,
        ch: char,
    },
}

/// Errors raised by [`NamespaceRegistry`](crate::NamespaceRegistry) writers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("namespace '{0}' is not loaded")]
    NotLoaded(String),

    #[error("marker `{marker}` cannot be attached to namespace '{path}': not applicable to namespaces")]
    NotApplicable { marker: String, path: String },

    #[error("namespace '{0}' already has a deferred source")]
    AlreadyDeferred(String),

    #[error("namespace '{0}' is already loaded")]
    AlreadyLoaded(String),
}

/// Errors while reading or installing a marker manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("manifest parsing error")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("preloaded namespace '{0}' is not declared under [namespaces]")]
    UnknownPreload(String),

    #[error("namespace '{path}' declares unknown marker `{marker}`")]
    UnknownMarker { path: String, marker: String },

    #[error("namespace '{path}': invalid value for marker `{marker}`")]
    Decode {
        path: String,
        marker: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
