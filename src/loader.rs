//! Loader contract consumed by the resolver.

use std::sync::Arc;

use crate::marker::Marker;

/// A loaded namespace.
pub trait NamespaceHandle {
    fn name(&self) -> &str;

    /// The marker of type `M` applied directly to this namespace.
    ///
    /// Never consults ancestors.
    fn marker<M: Marker>(&self) -> Option<Arc<M>>;
}

/// Source of namespaces for a resolver.
///
/// `loaded` reports what is already materialized and may grow between calls.
/// `force_load` materializes one namespace on demand and returns `None` both
/// when the namespace does not exist and when it carries no metadata at all.
pub trait NamespaceLoader {
    type Handle: NamespaceHandle;

    fn loaded(&self) -> Vec<Self::Handle>;

    fn force_load(&self, name: &str) -> Option<Self::Handle>;
}

impl<L: NamespaceLoader + ?Sized> NamespaceLoader for &L {
    type Handle = L::Handle;

    #[inline]
    fn loaded(&self) -> Vec<Self::Handle> {
        (**self).loaded()
    }

    #[inline]
    fn force_load(&self, name: &str) -> Option<Self::Handle> {
        (**self).force_load(name)
    }
}

impl<L: NamespaceLoader + ?Sized> NamespaceLoader for Arc<L> {
    type Handle = L::Handle;

    #[inline]
    fn loaded(&self) -> Vec<Self::Handle> {
        (**self).loaded()
    }

    #[inline]
    fn force_load(&self, name: &str) -> Option<Self::Handle> {
        (**self).force_load(name)
    }
}

impl<H: NamespaceHandle> NamespaceHandle for Arc<H> {
    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }

    #[inline]
    fn marker<M: Marker>(&self) -> Option<Arc<M>> {
        (**self).marker::<M>()
    }
}
