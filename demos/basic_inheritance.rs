//! Basic marker inheritance along a namespace chain.
//!
//! This example shows how to:
//! - Derive `Marker` for plain Rust types
//! - Register namespaces eagerly and on demand
//! - Resolve the nearest marker for a namespace, direct or inherited
//! - Inspect the resolver cache and its counters

use std::sync::Arc;

use ns_marker::*;

#[derive(Debug, Marker)]
#[marker_info(targets(namespace, type))]
struct Owner(&'static str);

#[derive(Debug, Marker)]
#[marker_info(name = "deprecated", targets(namespace))]
struct Deprecated {
    note: &'static str,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build a registry
    let registry = Arc::new(NamespaceRegistry::new());
    registry.register_with("game", MarkerSet::new().with(Owner("engine")))?;
    registry.register("game.combat")?;
    registry.register_with(
        "game.combat.legacy",
        MarkerSet::new()
            .with(Owner("combat"))
            .with(Deprecated { note: "use game.combat.v2" }),
    )?;

    // Materialized the first time a resolver reaches it
    registry.defer("game.audio", || {
        println!("  (loading game.audio)");
        Some(MarkerSet::new().with(Owner("audio")))
    })?;

    println!("Registry:");
    println!("  loaded:   {:?}", registry.loaded_paths());
    println!("  deferred: game.audio");
    println!();

    // 2. Resolve owners
    let mut owners = AnnotationResolver::<Owner, _>::new(registry.clone())?;

    println!("Owner resolution:");
    for name in [
        "game.combat.legacy.sword",
        "game.combat.melee",
        "game.audio.music",
        "game",
        "editor",
    ] {
        match owners.resolve(name) {
            Some(owner) => println!("  {:<26} → {}", name, owner.0),
            None => println!("  {:<26} → (none)", name),
        }
    }
    println!();

    // 3. A different marker type resolves on its own chain
    let mut deprecations = AnnotationResolver::<Deprecated, _>::new(registry.clone())?;

    println!("Deprecation resolution:");
    for name in ["game.combat.legacy.bow", "game.combat"] {
        match deprecations.resolve(name) {
            Some(d) => println!("  {:<26} → deprecated: {}", name, d.note),
            None => println!("  {:<26} → current", name),
        }
    }
    println!();

    // 4. Cache and counters
    println!("Cache:");
    println!("  game.combat        = {:?}", owners.cached("game.combat"));
    println!("  game.combat.ranged = {:?}", owners.cached("game.combat.ranged"));
    println!("  cached levels: {}", owners.cached_len());
    println!("  stats:         {:?}", owners.stats());

    owners.resolve("game.combat.legacy");
    println!("  after repeat:  {:?}", owners.stats());

    Ok(())
}
