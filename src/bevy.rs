//! Bevy integration for namespace markers.
//!
//! Provides:
//! - `NamespaceMarkerPlugin`: inserts the shared registry and a per-marker resolver as Resources
//! - `MarkerIndex`: the resolver resource systems query through `ResMut`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bevy::prelude::*;
//! use ns_marker::bevy::*;
//! use ns_marker::{Marker, NamespaceRegistry};
//!
//! #[derive(Debug, Marker)]
//! struct Owner(&'static str);
//!
//! fn main() {
//!     let registry = Arc::new(NamespaceRegistry::new());
//!     App::new()
//!         .add_plugins(NamespaceMarkerPlugin::<Owner>::try_new(registry).unwrap())
//!         .add_systems(Update, report_owner)
//!         .run();
//! }
//!
//! fn report_owner(mut owners: ResMut<MarkerIndex<Owner>>) {
//!     if let Some(owner) = owners.resolve("game.combat.melee") {
//!         info!("owned by {}", owner.0);
//!     }
//! }
//! ```

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use ::bevy::prelude::*;
use tracing::warn;

use crate::{
    error::ConfigurationError,
    marker::{Marker, check_descriptor},
    registry::NamespaceRegistry,
    resolver::{AnnotationResolver, Resolution, ResolverConfig, ResolverStats},
};

// =============================================================================
// Plugin
// =============================================================================

/// Bevy plugin resolving markers of type `M`.
///
/// Add one plugin per marker type; all of them share the first registry
/// inserted:
///
/// ```ignore
/// App::new()
///     .add_plugins(NamespaceMarkerPlugin::<Owner>::try_new(registry.clone())?)
///     .add_plugins(NamespaceMarkerPlugin::<Deprecated>::try_new(registry)?)
/// ```
pub struct NamespaceMarkerPlugin<M: Marker> {
    registry: Arc<NamespaceRegistry>,
    config: ResolverConfig,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Marker> NamespaceMarkerPlugin<M> {
    /// Create a plugin, validating `M` up front so `build` cannot fail.
    pub fn try_new(registry: Arc<NamespaceRegistry>) -> Result<Self, ConfigurationError> {
        check_descriptor(&M::INFO)?;
        Ok(Self {
            registry,
            config: ResolverConfig::default(),
            _marker: PhantomData,
        })
    }

    /// Builder method: resolver configuration.
    ///
    /// Default: [`ResolverConfig::default`]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }
}

impl<M: Marker> Plugin for NamespaceMarkerPlugin<M> {
    fn build(&self, app: &mut App) {
        match app.world().get_resource::<Registry>() {
            Some(existing) if !Arc::ptr_eq(&existing.0, &self.registry) => {
                warn!(
                    marker = M::INFO.name,
                    "a different NamespaceRegistry is already installed; the plugin resolves against its own"
                );
            }
            Some(_) => {}
            None => {
                app.insert_resource(Registry(self.registry.clone()));
            }
        }

        app.insert_resource(MarkerIndex::<M> {
            resolver: AnnotationResolver::unchecked(self.registry.clone(), self.config),
        });
    }
}

// =============================================================================
// Resources
// =============================================================================

/// The shared namespace registry.
#[derive(Resource, Clone, Debug)]
pub struct Registry(pub Arc<NamespaceRegistry>);

impl Deref for Registry {
    type Target = NamespaceRegistry;

    fn deref(&self) -> &NamespaceRegistry {
        &self.0
    }
}

/// Resolver for markers of type `M`.
#[derive(Resource, Debug)]
pub struct MarkerIndex<M: Marker> {
    resolver: AnnotationResolver<M, Arc<NamespaceRegistry>>,
}

impl<M: Marker> MarkerIndex<M> {
    #[inline]
    pub fn resolve(&mut self, name: &str) -> Option<Arc<M>> {
        self.resolver.resolve(name)
    }

    #[inline]
    pub fn cached(&self, name: &str) -> Resolution<M> {
        self.resolver.cached(name)
    }

    #[inline]
    pub fn stats(&self) -> ResolverStats {
        self.resolver.stats()
    }
}

// =============================================================================
// Tests
// =============================================================================
