use std::path::PathBuf;
use stylescope_core::persistence::SnapshotStore;
use tracing::info;

pub async fn run(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        let root = std::fs::canonicalize(&path)?;
        let store = SnapshotStore::for_workspace(&root);
        info!("Clearing index for workspace at: {}...", root.display());
        store.remove()?;
        info!("Workspace index cleared.");
    } else {
        let base = SnapshotStore::base_dir();
        info!("Clearing all indices at: {}...", base.display());
        match tokio::fs::remove_dir_all(&base).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("All indices cleared.");
    }
    Ok(())
}
