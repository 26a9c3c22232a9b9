use std::path::PathBuf;
use stylescope_core::StylescopeEngine;
use tracing::info;

pub async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let root = std::fs::canonicalize(&path)?;
    let engine = StylescopeEngine::builder(root.clone()).build();

    info!("Indexing workspace at: {}...", root.display());
    let start = std::time::Instant::now();
    let from_cache = engine.initialize().await?;
    let stats = engine.stats();

    info!(
        "Index {} in {:?}",
        if from_cache { "loaded from cache" } else { "built" },
        start.elapsed()
    );
    info!("Paths: {}", stats.paths);
    info!("Modules with dependents: {}", stats.modules_with_dependents);
    info!("Dependency edges: {}", stats.dependency_edges);

    for module in engine.modules_with_dependents().iter().take(10) {
        info!(
            " - {} ({} dependents)",
            module.strip_prefix(&root).unwrap_or(module).display(),
            engine.dependents_of(module).len()
        );
    }

    if !engine.shutdown().await {
        tracing::warn!("Index could not be persisted");
    }
    Ok(())
}
