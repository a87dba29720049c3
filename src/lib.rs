//! # Inherited Namespace Markers (ns-marker)
//!
//! Resolves the nearest effective marker for a dot-separated namespace: the
//! marker applied directly to it, or the one inherited from its nearest marked
//! ancestor. Namespaces are discovered at runtime; a level that is not loaded
//! yet is forced through a [`NamespaceLoader`].
//!
//! ## Design
//!
//! ```text
//!  resolve("a.b.c.d")
//!        │
//!        ▼
//!  ┌───────────┐  miss  ┌──────────────────────────────┐  probe  ┌─────────────────┐
//!  │   cache   │ ─────► │ chain: a.b.c.d, a.b.c, a.b, a │ ──────► │ NamespaceLoader │
//!  └───────────┘        └──────────────────────────────┘         └─────────────────┘
//!        ▲                            │ propagate farthest → nearest
//!        └────────── batch insert ────┘
//! ```
//!
//! Every visited level is cached in one batch, present or absent, and never
//! touched again. Later queries on any of those levels are one map lookup.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ns_marker::*;
//!
//! #[derive(Debug, Marker)]
//! #[marker_info(targets(namespace))]
//! struct Owner(&'static str);
//!
//! let registry = Arc::new(NamespaceRegistry::new());
//! registry.register_with("app.billing", MarkerSet::new().with(Owner("payments")))?;
//!
//! let mut resolver = AnnotationResolver::<Owner, _>::new(registry.clone())?;
//! assert_eq!(resolver.resolve("app.billing.invoices").unwrap().0, "payments");
//! assert!(resolver.resolve("app").is_none());
//! ```

extern crate self as ns_marker;

pub mod bevy;
pub mod error;
pub mod expand;
pub mod loader;
pub mod manifest;
pub mod marker;
pub mod registry;
pub mod resolver;

pub use error::{ConfigurationError, ManifestError, PathError, RegistryError};
pub use expand::{
    Ancestors, SEPARATOR, ancestors, depth_of, expand, is_within, parent_of, validate,
};
pub use loader::{NamespaceHandle, NamespaceLoader};
pub use manifest::{Manifest, ManifestEntry, MarkerDecoder};
pub use marker::{
    Marker, MarkerDescriptor, MarkerInfo, MarkerSet, MarkerTarget, check_descriptor,
};
pub use registry::{LoadedNamespace, NamespaceRegistry, NamespaceSource};
pub use resolver::{
    AnnotationResolver, ProbeStrategy, Resolution, ResolverConfig, ResolverStats, SharedResolver,
};

pub use ns_marker_macro::Marker;
