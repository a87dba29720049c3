//! Namespace registry: the default, in-process [`NamespaceLoader`].
//!
//! A namespace is either *loaded* (its markers are materialized and reported
//! by [`NamespaceLoader::loaded`]) or *deferred* (a source closure produces its
//! markers the first time someone forces it). Anything else does not exist.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::RegistryError;
use crate::expand::validate;
use crate::loader::{NamespaceHandle, NamespaceLoader};
use crate::marker::{Marker, MarkerDescriptor, MarkerInfo, MarkerSet, MarkerTarget};

/// Produces the markers of a deferred namespace.
///
/// Returning `None` means the namespace exists but carries no metadata.
/// Sources run under the registry's write lock and must not call back into it.
pub type NamespaceSource = Box<dyn FnOnce() -> Option<MarkerSet> + Send + Sync>;

/// A materialized namespace.
#[derive(Clone, Debug)]
pub struct LoadedNamespace {
    path: String,
    markers: MarkerSet,
}

impl LoadedNamespace {
    pub fn new(path: impl Into<String>, markers: MarkerSet) -> Self {
        Self {
            path: path.into(),
            markers,
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }
}

impl NamespaceHandle for LoadedNamespace {
    #[inline]
    fn name(&self) -> &str {
        &self.path
    }

    #[inline]
    fn marker<M: Marker>(&self) -> Option<Arc<M>> {
        self.markers.get::<M>()
    }
}

#[derive(Default)]
struct RegistryState {
    loaded: HashMap<String, Arc<LoadedNamespace>>,
    deferred: HashMap<String, NamespaceSource>,
    force_loads: usize,
}

impl RegistryState {
    /// Load `path`, merging into an existing entry.
    fn load(&mut self, path: &str, markers: MarkerSet) {
        let merged = match self.loaded.get(path) {
            Some(existing) if !markers.is_empty() => {
                let mut set = existing.markers.clone();
                set.merge(markers);
                set
            }
            Some(_) => return,
            None => markers,
        };
        self.loaded.insert(
            path.to_string(),
            Arc::new(LoadedNamespace::new(path, merged)),
        );
    }
}

/// One namespace of a batch applied by [`NamespaceRegistry::apply`].
pub(crate) enum Pending {
    Load(String, MarkerSet),
    Defer(String, NamespaceSource),
}

/// Live namespace registry.
///
/// Provides:
/// - Eager registration of namespaces, with or without markers
/// - Deferred namespaces materialized on the first forced load
/// - Copy-on-write marker updates (handles already handed out keep their snapshot)
///
/// Ancestors are never created implicitly: registering `"a.b.c"` does not load
/// `"a.b"`.
#[derive(Default)]
pub struct NamespaceRegistry {
    state: RwLock<RegistryState>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a namespace with no markers.
    ///
    /// Registering a path that is already loaded is a no-op.
    ///
    /// # Errors
    ///
    /// - Returns error if the path is malformed
    /// - Returns error if the path has a pending deferred source
    pub fn register(&self, path: &str) -> Result<(), RegistryError> {
        validate(path)?;
        let mut state = self.state.write();
        if state.loaded.contains_key(path) {
            return Ok(());
        }
        if state.deferred.contains_key(path) {
            return Err(RegistryError::AlreadyDeferred(path.to_string()));
        }
        state.loaded.insert(
            path.to_string(),
            Arc::new(LoadedNamespace::new(path, MarkerSet::new())),
        );
        Ok(())
    }

    /// Load a namespace together with its markers.
    ///
    /// Markers of an already loaded namespace are merged, replacing those of
    /// the same type.
    pub fn register_with(
        &self,
        path: &str,
        markers: MarkerSet,
    ) -> Result<(), RegistryError> {
        validate(path)?;
        for info in markers.infos() {
            check_applicable(info, path)?;
        }

        let mut state = self.state.write();
        if state.deferred.contains_key(path) {
            return Err(RegistryError::AlreadyDeferred(path.to_string()));
        }
        state.load(path, markers);
        Ok(())
    }

    /// Apply a batch of loads and deferrals under one write lock.
    ///
    /// Conflicts are checked for the whole batch first, so an error leaves the
    /// registry untouched. Paths and markers must already be validated.
    pub(crate) fn apply(&self, batch: Vec<Pending>) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        for pending in &batch {
            match pending {
                Pending::Load(path, _) | Pending::Defer(path, _)
                    if state.deferred.contains_key(path) =>
                {
                    return Err(RegistryError::AlreadyDeferred(path.clone()));
                }
                Pending::Defer(path, _) if state.loaded.contains_key(path) => {
                    return Err(RegistryError::AlreadyLoaded(path.clone()));
                }
                _ => {}
            }
        }

        for pending in batch {
            match pending {
                Pending::Load(path, markers) => state.load(&path, markers),
                Pending::Defer(path, source) => {
                    state.deferred.insert(path, source);
                }
            }
        }
        Ok(())
    }

    /// Attach a marker to a loaded namespace.
    ///
    /// Returns the marker of the same type it replaces, if any.
    pub fn set_marker<M: Marker>(
        &self,
        path: &str,
        marker: M,
    ) -> Result<Option<Arc<M>>, RegistryError> {
        check_applicable(&M::INFO, path)?;

        let mut state = self.state.write();
        let Some(existing) = state.loaded.get(path) else {
            return Err(RegistryError::NotLoaded(path.to_string()));
        };
        let mut markers = existing.markers.clone();
        let previous = markers.insert(marker);
        state.loaded.insert(
            path.to_string(),
            Arc::new(LoadedNamespace::new(path, markers)),
        );
        Ok(previous)
    }

    /// Declare a namespace whose markers are produced on demand.
    ///
    /// The source runs at most once, on the first forced load of `path`.
    pub fn defer<F>(&self, path: &str, source: F) -> Result<(), RegistryError>
    where
        F: FnOnce() -> Option<MarkerSet> + Send + Sync + 'static,
    {
        validate(path)?;
        let mut state = self.state.write();
        if state.loaded.contains_key(path) {
            return Err(RegistryError::AlreadyLoaded(path.to_string()));
        }
        if state.deferred.contains_key(path) {
            return Err(RegistryError::AlreadyDeferred(path.to_string()));
        }
        state.deferred.insert(path.to_string(), Box::new(source));
        Ok(())
    }

    /// The loaded namespace at `path`, without forcing anything.
    pub fn get(&self, path: &str) -> Option<Arc<LoadedNamespace>> {
        self.state.read().loaded.get(path).cloned()
    }

    /// Check if a namespace is loaded.
    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.state.read().loaded.contains_key(path)
    }

    /// Check if a namespace is waiting for its first forced load.
    #[inline]
    pub fn is_deferred(&self, path: &str) -> bool {
        self.state.read().deferred.contains_key(path)
    }

    /// Number of loaded namespaces.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.read().loaded.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.read().loaded.is_empty()
    }

    /// Loaded paths in alphabetical order.
    pub fn loaded_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.read().loaded.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Total number of `force_load` calls served so far.
    #[inline]
    pub fn force_load_count(&self) -> usize {
        self.state.read().force_loads
    }
}

impl NamespaceLoader for NamespaceRegistry {
    type Handle = Arc<LoadedNamespace>;

    fn loaded(&self) -> Vec<Self::Handle> {
        self.state.read().loaded.values().cloned().collect()
    }

    fn force_load(&self, name: &str) -> Option<Self::Handle> {
        let mut state = self.state.write();
        state.force_loads += 1;

        if let Some(ns) = state.loaded.get(name) {
            return Some(ns.clone());
        }
        let Some(source) = state.deferred.remove(name) else {
            trace!(namespace = name, "force load: unknown namespace");
            return None;
        };

        match source() {
            Some(markers) => {
                debug!(
                    namespace = name,
                    markers = markers.len(),
                    "materialized deferred namespace"
                );
                let ns = Arc::new(LoadedNamespace::new(name, markers));
                state.loaded.insert(name.to_string(), ns.clone());
                Some(ns)
            }
            None => {
                debug!(namespace = name, "deferred namespace carries no metadata");
                None
            }
        }
    }
}

impl fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("NamespaceRegistry")
            .field("loaded", &state.loaded.len())
            .field("deferred", &state.deferred.len())
            .field("force_loads", &state.force_loads)
            .finish()
    }
}

pub(crate) fn check_applicable(info: &MarkerInfo, path: &str) -> Result<(), RegistryError> {
    if info.is_applicable_to(MarkerTarget::Namespace) {
        Ok(())
    } else {
        Err(RegistryError::NotApplicable {
            marker: info.name.to_string(),
            path: path.to_string(),
        })
    }
}
