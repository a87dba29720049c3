use std::fmt;
use std::sync::Arc;

use ns_marker::*;
use serde::Deserialize;

#[derive(Debug, Marker)]
struct Plain;

#[derive(Debug, Marker)]
#[marker_info(name = "audit", repeatable)]
struct Audit;

#[derive(Debug, Marker)]
#[marker_info(targets(field, parameter))]
struct Column;

#[derive(Debug, Marker)]
struct Tagged<T: fmt::Debug + Send + Sync + 'static>(T);

#[derive(Debug, PartialEq, Deserialize, Marker)]
#[marker_info(targets(namespace))]
struct Owner {
    team: String,
}

#[derive(Debug, PartialEq, Deserialize, Marker)]
#[marker_info(name = "stability", targets(namespace, type))]
struct Stability {
    level: String,
    #[serde(default)]
    since: Option<u32>,
}

#[test]
fn derived_info() {
    assert_eq!(Plain::INFO, MarkerInfo::new("Plain"));
    assert_eq!(Audit::INFO, MarkerInfo::new("audit").repeatable());
    assert_eq!(
        Column::INFO.targets,
        &[MarkerTarget::Field, MarkerTarget::Parameter]
    );
    assert_eq!(Tagged::<u8>::INFO.name, "Tagged");
    assert!(Stability::INFO.is_applicable_to(MarkerTarget::Type));
    assert!(!Stability::INFO.is_applicable_to(MarkerTarget::Field));
}

#[test]
fn derived_markers_are_validated() {
    let registry = Arc::new(NamespaceRegistry::new());

    assert!(AnnotationResolver::<Plain, _>::new(registry.clone()).is_ok());
    assert_eq!(
        AnnotationResolver::<Audit, _>::new(registry.clone()).err(),
        Some(ConfigurationError::Repeatable("audit".into()))
    );
    assert_eq!(
        AnnotationResolver::<Column, _>::new(registry.clone()).err(),
        Some(ConfigurationError::NotNamespaceApplicable("Column".into()))
    );

    let err = registry
        .register_with("app", MarkerSet::new().with(Column))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::NotApplicable { marker, .. } if marker == "Column"
    ));
}

const MANIFEST: &str = r#"
preload = ["app", "app.billing"]

[namespaces.app]
Owner = { team = "platform" }

[namespaces."app.billing"]
Owner = { team = "payments" }

[namespaces."app.billing.legacy"]
stability = { level = "deprecated", since = 2 }

[namespaces."app.search"]
stability = { level = "experimental" }
"#;

#[test]
fn manifest_drives_resolution() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let decoder = MarkerDecoder::new().with::<Owner>().with::<Stability>();

    let registry = Arc::new(NamespaceRegistry::new());
    registry.install(&manifest, &decoder).unwrap();
    assert_eq!(registry.loaded_paths(), vec!["app", "app.billing"]);

    let mut owners = AnnotationResolver::<Owner, _>::new(registry.clone()).unwrap();
    let mut stability = AnnotationResolver::<Stability, _>::new(registry.clone()).unwrap();

    assert_eq!(
        owners.resolve("app.billing.legacy.invoices").map(|o| o.team.clone()),
        Some("payments".to_string())
    );
    assert_eq!(
        owners.resolve("app.search").map(|o| o.team.clone()),
        Some("platform".to_string())
    );

    let legacy = stability.resolve("app.billing.legacy.invoices").unwrap();
    assert_eq!(legacy.level, "deprecated");
    assert_eq!(legacy.since, Some(2));
    assert!(stability.resolve("app.billing").is_none());
    assert_eq!(
        stability.resolve("app.search.index").map(|s| s.since),
        Some(None)
    );

    // Deferred entries were materialized by the forced loads
    assert!(registry.contains("app.billing.legacy"));
    assert!(registry.contains("app.search"));
}

#[test]
fn manifest_rejects_unregistered_marker_name() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let registry = NamespaceRegistry::new();

    let err = registry
        .install(&manifest, &MarkerDecoder::new().with::<Owner>())
        .unwrap_err();
    assert!(matches!(
        err,
        ManifestError::UnknownMarker { marker, .. } if marker == "stability"
    ));
    assert!(registry.is_empty());
}
