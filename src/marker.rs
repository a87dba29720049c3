//! Marker types and their descriptors.
//!
//! A marker is any `'static` value type implementing [`Marker`]. Its
//! [`MarkerInfo`] states how the type may be applied; resolvers inspect it
//! through the [`MarkerDescriptor`] trait so the checks can be exercised with
//! hand-written descriptors.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigurationError;

/// Declaration scopes a marker type may be applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerTarget {
    Namespace,
    Type,
    Function,
    Field,
    Parameter,
}

/// Construction-time facts about a marker type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerInfo {
    /// Display name, also the key used by manifests.
    pub name: &'static str,
    /// Whether one declaration may carry several instances.
    pub repeatable: bool,
    /// Allowed scopes. Empty means unrestricted.
    pub targets: &'static [MarkerTarget],
}

impl MarkerInfo {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            repeatable: false,
            targets: &[],
        }
    }

    pub const fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub const fn targets(mut self, targets: &'static [MarkerTarget]) -> Self {
        self.targets = targets;
        self
    }
}

/// Typed metadata that can be attached to a namespace.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Debug, Marker)]
/// #[marker_info(targets(namespace, type))]
/// struct Internal;
/// ```
pub trait Marker: Any + Send + Sync + fmt::Debug {
    const INFO: MarkerInfo;
}

/// Introspection over a marker type.
pub trait MarkerDescriptor {
    fn marker_name(&self) -> &str;

    fn is_repeatable(&self) -> bool;

    fn is_applicable_to(&self, target: MarkerTarget) -> bool;
}

impl MarkerDescriptor for MarkerInfo {
    fn marker_name(&self) -> &str {
        self.name
    }

    fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    fn is_applicable_to(&self, target: MarkerTarget) -> bool {
        self.targets.is_empty() || self.targets.contains(&target)
    }
}

/// Reject descriptors that cannot be resolved along a namespace chain.
///
/// Repeatability is checked before scope.
pub fn check_descriptor(
    descriptor: &dyn MarkerDescriptor,
) -> Result<(), ConfigurationError> {
    if descriptor.is_repeatable() {
        return Err(ConfigurationError::Repeatable(
            descriptor.marker_name().to_string(),
        ));
    }
    if !descriptor.is_applicable_to(MarkerTarget::Namespace) {
        return Err(ConfigurationError::NotNamespaceApplicable(
            descriptor.marker_name().to_string(),
        ));
    }
    Ok(())
}

/// Direct markers of one namespace, at most one per marker type.
#[derive(Clone, Default)]
pub struct MarkerSet {
    markers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    infos: Vec<(TypeId, MarkerInfo)>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<M: Marker>(mut self, marker: M) -> Self {
        self.insert(marker);
        self
    }

    /// Store a marker, returning the one it replaces.
    pub fn insert<M: Marker>(&mut self, marker: M) -> Option<Arc<M>> {
        self.insert_arc(Arc::new(marker))
    }

    pub fn insert_arc<M: Marker>(&mut self, marker: Arc<M>) -> Option<Arc<M>> {
        let previous = self.markers.insert(TypeId::of::<M>(), marker);
        if previous.is_none() {
            self.infos.push((TypeId::of::<M>(), M::INFO));
        }
        previous.and_then(|old| old.downcast::<M>().ok())
    }

    #[inline]
    pub fn get<M: Marker>(&self) -> Option<Arc<M>> {
        let erased = self.markers.get(&TypeId::of::<M>())?.clone();
        erased.downcast::<M>().ok()
    }

    #[inline]
    pub fn contains<M: Marker>(&self) -> bool {
        self.markers.contains_key(&TypeId::of::<M>())
    }

    /// Move every marker of `other` into this set, replacing same-typed ones.
    pub fn merge(&mut self, other: MarkerSet) {
        for (id, info) in other.infos {
            if !self.markers.contains_key(&id) {
                self.infos.push((id, info));
            }
        }
        self.markers.extend(other.markers);
    }

    /// Descriptors of the stored marker types, in insertion order.
    pub fn infos(&self) -> impl Iterator<Item = &MarkerInfo> + '_ {
        self.infos.iter().map(|(_, info)| info)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.infos.iter().map(|(_, info)| info.name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl fmt::Debug for MarkerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
