//! Marker manifests: namespaces and their markers declared in TOML.
//!
//! ```toml
//! # Loaded eagerly; every other namespace waits for a forced load
//! preload = ["app"]
//!
//! [namespaces."app.billing"]
//! Owner = { team = "payments" }
//!
//! [namespaces."app.empty"]   # exists, carries no metadata
//! ```
//!
//! Each key inside a namespace table names a marker type by its
//! [`MarkerInfo::name`](crate::MarkerInfo); the value is deserialized into
//! that type by a [`MarkerDecoder`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ManifestError;
use crate::expand::validate;
use crate::marker::{Marker, MarkerSet};
use crate::registry::{NamespaceRegistry, Pending, check_applicable};

/// Parsed marker manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Entries sorted by path.
    entries: Vec<ManifestEntry>,
}

/// One declared namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Full dot-separated path (e.g., "app.billing")
    pub path: String,
    /// Loaded eagerly instead of on demand
    pub preload: bool,
    /// Raw marker values keyed by marker name
    pub markers: BTreeMap<String, toml::Value>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    preload: Vec<String>,
    #[serde(default)]
    namespaces: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl Manifest {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::Io(path.to_path_buf(), e))?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(content)?;

        for path in raw.namespaces.keys() {
            validate(path)?;
        }
        for path in &raw.preload {
            validate(path)?;
            if !raw.namespaces.contains_key(path) {
                return Err(ManifestError::UnknownPreload(path.clone()));
            }
        }

        // BTreeMap iteration keeps entries sorted by path
        let entries = raw
            .namespaces
            .into_iter()
            .map(|(path, markers)| ManifestEntry {
                preload: raw.preload.contains(&path),
                path,
                markers,
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type DecodeFn =
    Box<dyn Fn(&str, toml::Value, &mut MarkerSet) -> Result<(), ManifestError> + Send + Sync>;

/// Turns raw manifest values into typed markers.
///
/// ```ignore
/// let decoder = MarkerDecoder::new().with::<Owner>().with::<Deprecated>();
/// ```
#[derive(Default)]
pub struct MarkerDecoder {
    decoders: HashMap<&'static str, DecodeFn>,
}

impl MarkerDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept markers of type `M` under the key `M::INFO.name`.
    pub fn with<M: Marker + DeserializeOwned>(mut self) -> Self {
        self.decoders.insert(
            M::INFO.name,
            Box::new(|path: &str, value: toml::Value, set: &mut MarkerSet| {
                let marker = value.try_into::<M>().map_err(|source| ManifestError::Decode {
                    path: path.to_string(),
                    marker: M::INFO.name.to_string(),
                    source,
                })?;
                set.insert(marker);
                Ok(())
            }),
        );
        self
    }

    /// Decode every marker of one entry.
    pub fn decode(&self, entry: &ManifestEntry) -> Result<MarkerSet, ManifestError> {
        let mut set = MarkerSet::new();
        for (name, value) in &entry.markers {
            let Some(decode) = self.decoders.get(name.as_str()) else {
                return Err(ManifestError::UnknownMarker {
                    path: entry.path.clone(),
                    marker: name.clone(),
                });
            };
            decode(&entry.path, value.clone(), &mut set)?;
        }
        Ok(set)
    }
}

impl std::fmt::Debug for MarkerDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("MarkerDecoder").field("markers", &names).finish()
    }
}

impl NamespaceRegistry {
    /// Register every namespace of a manifest.
    ///
    /// Preloaded entries are loaded right away; the rest become deferred
    /// namespaces. Every entry is decoded and checked against the current
    /// registry state before anything is registered, so any error leaves the
    /// registry untouched.
    pub fn install(
        &self,
        manifest: &Manifest,
        decoder: &MarkerDecoder,
    ) -> Result<(), ManifestError> {
        let mut decoded = Vec::with_capacity(manifest.len());
        for entry in manifest.entries() {
            let markers = decoder.decode(entry)?;
            for info in markers.infos() {
                check_applicable(info, &entry.path)?;
            }
            decoded.push((entry, markers));
        }

        let batch = decoded
            .into_iter()
            .map(|(entry, markers)| {
                let path = entry.path.clone();
                if entry.preload {
                    Pending::Load(path, markers)
                } else if markers.is_empty() {
                    Pending::Defer(path, Box::new(|| None::<MarkerSet>))
                } else {
                    Pending::Defer(path, Box::new(move || Some(markers)))
                }
            })
            .collect();
        self.apply(batch)?;
        debug!(namespaces = manifest.len(), "installed manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PathError, RegistryError};
    use crate::loader::{NamespaceHandle, NamespaceLoader};
    use crate::marker::{MarkerInfo, MarkerTarget};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Owner {
        team: String,
    }

    impl Marker for Owner {
        const INFO: MarkerInfo = MarkerInfo::new("Owner");
    }

    #[derive(Debug, Deserialize)]
    struct ColumnHint {}

    impl Marker for ColumnHint {
        const INFO: MarkerInfo =
            MarkerInfo::new("ColumnHint").targets(&[MarkerTarget::Field]);
    }

    const SAMPLE: &str = r#"
preload = ["app"]

[namespaces.app]

[namespaces."app.billing"]
Owner = { team = "payments" }

[namespaces."app.empty"]
"#;

    #[test]
    fn parse_entries_sorted() {
        let manifest = Manifest::from_str(SAMPLE).unwrap();
        let paths: Vec<&str> = manifest.entries().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["app", "app.billing", "app.empty"]);

        assert!(manifest.get("app").unwrap().preload);
        assert!(!manifest.get("app.billing").unwrap().preload);
        assert_eq!(manifest.get("app.billing").unwrap().markers.len(), 1);
    }

    #[test]
    fn parse_empty_manifest() {
        let manifest = Manifest::from_str("").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn rejects_malformed_path() {
        let err = Manifest::from_str("[namespaces.\"a..b\"]\n").unwrap_err();
        assert!(matches!(err, ManifestError::Path(PathError::EmptySegment(_))));
    }

    #[test]
    fn rejects_undeclared_preload() {
        let err = Manifest::from_str("preload = [\"ghost\"]\n").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownPreload(p) if p == "ghost"));
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let err = Manifest::from_str("module_name = \"Tags\"\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn decode_typed_marker() {
        let manifest = Manifest::from_str(SAMPLE).unwrap();
        let decoder = MarkerDecoder::new().with::<Owner>();

        let set = decoder.decode(manifest.get("app.billing").unwrap()).unwrap();
        assert_eq!(
            set.get::<Owner>().as_deref(),
            Some(&Owner {
                team: "payments".into()
            })
        );
    }

    #[test]
    fn decode_unknown_marker() {
        let manifest = Manifest::from_str(SAMPLE).unwrap();
        let err = MarkerDecoder::new()
            .decode(manifest.get("app.billing").unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::UnknownMarker { marker, .. } if marker == "Owner"
        ));
    }

    #[test]
    fn decode_bad_value() {
        let manifest =
            Manifest::from_str("[namespaces.app]\nOwner = { team = 7 }\n").unwrap();
        let err = MarkerDecoder::new()
            .with::<Owner>()
            .decode(manifest.get("app").unwrap())
            .unwrap_err();
        assert!(matches!(err, ManifestError::Decode { .. }));
    }

    #[test]
    fn install_preloads_and_defers() {
        let manifest = Manifest::from_str(SAMPLE).unwrap();
        let registry = NamespaceRegistry::new();
        registry
            .install(&manifest, &MarkerDecoder::new().with::<Owner>())
            .unwrap();

        assert!(registry.contains("app"));
        assert!(registry.is_deferred("app.billing"));
        assert!(registry.is_deferred("app.empty"));

        let billing = registry.force_load("app.billing").unwrap();
        assert_eq!(billing.marker::<Owner>().unwrap().team, "payments");
        assert!(registry.force_load("app.empty").is_none());
    }

    #[test]
    fn install_rejects_non_namespace_marker_without_side_effects() {
        let manifest =
            Manifest::from_str("[namespaces.a]\n\n[namespaces.b]\nColumnHint = {}\n").unwrap();
        let registry = NamespaceRegistry::new();
        let err = registry
            .install(&manifest, &MarkerDecoder::new().with::<ColumnHint>())
            .unwrap_err();

        assert!(matches!(err, ManifestError::Registry(_)));
        assert!(!registry.is_deferred("a"));
    }

    #[test]
    fn install_conflict_leaves_registry_untouched() {
        let manifest = Manifest::from_str(
            "preload = [\"b\"]\n\n[namespaces.a]\n\n[namespaces.b]\n\n[namespaces.z]\n",
        )
        .unwrap();
        let registry = NamespaceRegistry::new();
        registry.register("z").unwrap();

        let err = registry.install(&manifest, &MarkerDecoder::new()).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Registry(RegistryError::AlreadyLoaded(p)) if p == "z"
        ));
        assert!(!registry.is_deferred("a"));
        assert!(!registry.contains("b"));
        assert_eq!(registry.loaded_paths(), vec!["z"]);

        // Nothing half-installed blocks a retry on a fresh registry
        let fresh = NamespaceRegistry::new();
        fresh.install(&manifest, &MarkerDecoder::new()).unwrap();
        assert!(fresh.is_deferred("z"));
    }

    #[test]
    fn install_preload_merges_into_loaded_namespace() {
        let manifest = Manifest::from_str(
            "preload = [\"app\"]\n\n[namespaces.app]\nOwner = { team = \"core\" }\n",
        )
        .unwrap();
        let registry = NamespaceRegistry::new();
        registry.register("app").unwrap();

        registry
            .install(&manifest, &MarkerDecoder::new().with::<Owner>())
            .unwrap();
        let app = registry.get("app").unwrap();
        assert_eq!(app.marker::<Owner>().unwrap().team, "core");
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(manifest.len(), 3);

        let missing = Manifest::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ManifestError::Io(..)));
    }
}
