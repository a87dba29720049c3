//! Loading namespaces and markers from a TOML manifest.
//!
//! This example shows how to:
//! - Declare namespaces and their markers in TOML
//! - Decode marker values into typed markers with `MarkerDecoder`
//! - Preload some namespaces and defer the rest until first use
//! - Share one resolver across threads with `SharedResolver`

use std::sync::Arc;

use ns_marker::*;
use serde::Deserialize;

#[derive(Debug, Deserialize, Marker)]
#[marker_info(targets(namespace))]
struct Owner {
    team: String,
}

#[derive(Debug, Deserialize, Marker)]
#[marker_info(name = "stability", targets(namespace, type))]
struct Stability {
    level: String,
}

const MANIFEST: &str = r#"
preload = ["services"]

[namespaces.services]
Owner = { team = "platform" }

[namespaces."services.billing"]
Owner = { team = "payments" }
stability = { level = "stable" }

[namespaces."services.search"]
stability = { level = "experimental" }

[namespaces."services.search.index"]
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse and install
    let manifest = Manifest::from_str(MANIFEST)?;
    let decoder = MarkerDecoder::new().with::<Owner>().with::<Stability>();

    println!("Manifest entries:");
    for entry in manifest.entries() {
        let markers: Vec<&str> = entry.markers.keys().map(String::as_str).collect();
        println!(
            "  {:<24} preload={:<5} markers={:?}",
            entry.path, entry.preload, markers
        );
    }
    println!();

    let registry = Arc::new(NamespaceRegistry::new());
    registry.install(&manifest, &decoder)?;
    println!("Loaded after install: {:?}", registry.loaded_paths());
    println!();

    // 2. Resolve from several threads through one cache
    let owners = Arc::new(SharedResolver::<Owner, _>::new(registry.clone())?);
    let handles: Vec<_> = [
        "services.billing.invoices",
        "services.search.index.shards",
        "services.auth",
    ]
    .into_iter()
    .map(|name| {
        let owners = owners.clone();
        std::thread::spawn(move || (name, owners.resolve(name)))
    })
    .collect();

    println!("Owner resolution:");
    for handle in handles {
        let Ok((name, owner)) = handle.join() else {
            continue;
        };
        let team = owner.map(|o| o.team.clone()).unwrap_or_else(|| "(none)".into());
        println!("  {:<30} → {}", name, team);
    }
    println!();

    // 3. A second marker type over the same registry
    let mut stability = AnnotationResolver::<Stability, _>::new(registry.clone())?;

    println!("Stability resolution:");
    for name in ["services.search.index", "services.billing", "services"] {
        let level = stability
            .resolve(name)
            .map(|s| s.level.clone())
            .unwrap_or_else(|| "(unspecified)".into());
        println!("  {:<30} → {}", name, level);
    }
    println!();

    println!("Loaded after resolution: {:?}", registry.loaded_paths());
    println!("Forced loads served:     {}", registry.force_load_count());

    Ok(())
}
