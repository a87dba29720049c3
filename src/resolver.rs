//! Inherited marker resolution.
//!
//! [`AnnotationResolver`] answers "which `M` applies to namespace `x`?" by
//! walking `x`'s ancestor chain, forcing namespaces to load as needed, and
//! propagating the nearest marker down the chain.
//!
//! ## Caching
//!
//! Every level visited by a query is cached, present or absent, in one batch.
//! Entries are never removed or altered, so a second query for any visited
//! level is a single map lookup with no loader activity. A forced load that
//! finds nothing is remembered as absence and never retried.
//!
//! ## Probing
//!
//! With [`ProbeStrategy::Exhaustive`] (the default) a query keeps probing past
//! the first marked ancestor up to the top-level segment or the first cached
//! level, paying extra loads once so that later queries on the same chain are
//! free. [`ProbeStrategy::FirstMatch`] stops at the first directly marked level.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::ConfigurationError;
use crate::expand::{expand, is_within};
use crate::loader::{NamespaceHandle, NamespaceLoader};
use crate::marker::{Marker, MarkerDescriptor, check_descriptor};

/// Cached state of one namespace.
#[derive(Debug)]
pub enum Resolution<M> {
    /// Never looked up.
    Unqueried,
    /// Resolved to a marker, direct or inherited.
    Present(Arc<M>),
    /// Looked up, no marker anywhere along the chain.
    Absent,
}

impl<M> Resolution<M> {
    fn from_marker(marker: Option<Arc<M>>) -> Self {
        match marker {
            Some(m) => Resolution::Present(m),
            None => Resolution::Absent,
        }
    }

    /// The resolved marker, if any.
    #[inline]
    pub fn marker(&self) -> Option<Arc<M>> {
        match self {
            Resolution::Present(m) => Some(m.clone()),
            Resolution::Unqueried | Resolution::Absent => None,
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unqueried)
    }
}

impl<M> Clone for Resolution<M> {
    fn clone(&self) -> Self {
        match self {
            Resolution::Unqueried => Resolution::Unqueried,
            Resolution::Present(m) => Resolution::Present(m.clone()),
            Resolution::Absent => Resolution::Absent,
        }
    }
}

impl<M: PartialEq> PartialEq for Resolution<M> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resolution::Unqueried, Resolution::Unqueried) => true,
            (Resolution::Absent, Resolution::Absent) => true,
            (Resolution::Present(a), Resolution::Present(b)) => a == b,
            _ => false,
        }
    }
}

/// How far a cache miss probes up the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// Probe every uncached level up to the top-level segment.
    #[default]
    Exhaustive,
    /// Stop at the first level carrying its own marker.
    FirstMatch,
}

/// Resolver configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    pub probe: ProbeStrategy,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the probe strategy.
    pub fn probe(mut self, probe: ProbeStrategy) -> Self {
        self.probe = probe;
        self
    }
}

/// Counters accumulated over a resolver's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub hits: usize,
    pub misses: usize,
    pub forced_loads: usize,
}

/// Resolves the nearest effective marker of type `M` for a namespace.
///
/// Single-threaded: `resolve` takes `&mut self`. Wrap in [`SharedResolver`]
/// to share one cache across threads.
pub struct AnnotationResolver<M: Marker, L: NamespaceLoader> {
    loader: L,
    config: ResolverConfig,
    cache: HashMap<String, Resolution<M>>,
    stats: ResolverStats,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Marker, L: NamespaceLoader> AnnotationResolver<M, L> {
    /// Create a resolver for `M`, validating `M::INFO`.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::Repeatable`] if `M` is declared repeatable
    /// - [`ConfigurationError::NotNamespaceApplicable`] if `M` cannot target namespaces
    pub fn new(loader: L) -> Result<Self, ConfigurationError> {
        Self::with_config(loader, ResolverConfig::default())
    }

    pub fn with_config(
        loader: L,
        config: ResolverConfig,
    ) -> Result<Self, ConfigurationError> {
        check_descriptor(&M::INFO)?;
        Ok(Self::unchecked(loader, config))
    }

    /// Create a resolver validated against an explicit descriptor instead of `M::INFO`.
    pub fn with_descriptor(
        descriptor: &dyn MarkerDescriptor,
        loader: L,
    ) -> Result<Self, ConfigurationError> {
        check_descriptor(descriptor)?;
        Ok(Self::unchecked(loader, ResolverConfig::default()))
    }

    pub(crate) fn unchecked(loader: L, config: ResolverConfig) -> Self {
        Self {
            loader,
            config,
            cache: HashMap::new(),
            stats: ResolverStats::default(),
            _marker: PhantomData,
        }
    }

    /// The marker effective for `name`: its own, or the nearest ancestor's.
    ///
    /// Never fails. Unknown namespaces, namespaces without metadata and failed
    /// forced loads all count as "no marker here".
    pub fn resolve(&mut self, name: &str) -> Option<Arc<M>> {
        if let Some(hit) = self.cache.get(name) {
            self.stats.hits += 1;
            trace!(namespace = name, marker = M::INFO.name, "cache hit");
            return hit.marker();
        }
        self.stats.misses += 1;

        let chain = expand(name);
        let preloaded: HashMap<String, L::Handle> = self
            .loader
            .loaded()
            .into_iter()
            .filter(|ns| is_within(name, ns.name()))
            .map(|ns| (ns.name().to_string(), ns))
            .collect();
        debug!(
            namespace = name,
            marker = M::INFO.name,
            chain = chain.len(),
            preloaded = preloaded.len(),
            "cache miss"
        );

        // Direct markers, nearest first, up to the first cached level.
        let mut probed: Vec<(&str, Option<Arc<M>>)> = Vec::with_capacity(chain.len());
        let mut terminal: Option<Arc<M>> = None;
        let mut forced = 0usize;

        for level in chain {
            if let Some(entry) = self.cache.get(level) {
                trace!(namespace = level, "stopped at cached level");
                terminal = entry.marker();
                break;
            }

            let direct = match preloaded.get(level) {
                Some(ns) => ns.marker::<M>(),
                None => {
                    forced += 1;
                    self.loader.force_load(level).and_then(|ns| ns.marker::<M>())
                }
            };
            trace!(namespace = level, direct = direct.is_some(), "probed");

            let matched = direct.is_some();
            probed.push((level, direct));
            if matched && self.config.probe == ProbeStrategy::FirstMatch {
                break;
            }
        }
        self.stats.forced_loads += forced;

        // Propagate farthest to nearest, then cache the whole segment.
        let visited = probed.len();
        let mut inherited = terminal;
        for (level, direct) in probed.into_iter().rev() {
            let effective = direct.or_else(|| inherited.clone());
            self.cache
                .insert(level.to_string(), Resolution::from_marker(effective.clone()));
            inherited = effective;
        }
        debug!(
            namespace = name,
            marker = M::INFO.name,
            cached = visited,
            forced,
            "resolved"
        );

        self.cache
            .entry(name.to_string())
            .or_insert(Resolution::Absent)
            .marker()
    }

    /// Cached state of `name`, without loading anything.
    pub fn cached(&self, name: &str) -> Resolution<M> {
        self.cache
            .get(name)
            .cloned()
            .unwrap_or(Resolution::Unqueried)
    }

    /// Number of cached namespaces.
    #[inline]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    #[inline]
    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    #[inline]
    pub fn loader(&self) -> &L {
        &self.loader
    }
}

impl<M: Marker, L: NamespaceLoader> fmt::Debug for AnnotationResolver<M, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationResolver")
            .field("marker", &M::INFO.name)
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// An [`AnnotationResolver`] behind one mutex.
///
/// The lock is held for a whole `resolve`, so concurrent queries observe the
/// same append-only cache.
pub struct SharedResolver<M: Marker, L: NamespaceLoader> {
    inner: Mutex<AnnotationResolver<M, L>>,
}

impl<M: Marker, L: NamespaceLoader> SharedResolver<M, L> {
    pub fn new(loader: L) -> Result<Self, ConfigurationError> {
        AnnotationResolver::new(loader).map(Self::from)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<M>> {
        self.inner.lock().resolve(name)
    }

    pub fn cached(&self, name: &str) -> Resolution<M> {
        self.inner.lock().cached(name)
    }

    pub fn stats(&self) -> ResolverStats {
        self.inner.lock().stats()
    }

    pub fn into_inner(self) -> AnnotationResolver<M, L> {
        self.inner.into_inner()
    }
}

impl<M: Marker, L: NamespaceLoader> From<AnnotationResolver<M, L>>
    for SharedResolver<M, L>
{
    fn from(resolver: AnnotationResolver<M, L>) -> Self {
        Self {
            inner: Mutex::new(resolver),
        }
    }
}

impl<M: Marker, L: NamespaceLoader> fmt::Debug for SharedResolver<M, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedResolver")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}
