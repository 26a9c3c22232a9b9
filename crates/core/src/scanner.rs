//! Workspace walk for the initial population.

use crate::error::Result;
use crate::resolve::PathResolver;
use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use std::path::{Path, PathBuf};

/// Module and script files of a workspace, each list sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkspaceFiles {
    pub modules: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
}

/// Walks the workspace honouring `.gitignore` and the exclude globs.
pub fn scan_workspace(resolver: &PathResolver, exclude: &[String]) -> Result<WorkspaceFiles> {
    let root = resolver.root();
    let overrides = exclude_overrides(root, exclude)?;

    let mut files = WorkspaceFiles::default();
    for entry in WalkBuilder::new(root).overrides(overrides).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if resolver.is_module_path(&path) {
            files.modules.push(path);
        } else if resolver.is_script_path(&path) {
            files.scripts.push(path);
        }
    }

    files.modules.sort();
    files.scripts.sort();
    Ok(files)
}

fn exclude_overrides(root: &Path, exclude: &[String]) -> Result<Override> {
    let mut builder = OverrideBuilder::new(root);
    for glob in exclude {
        builder.add(&format!("!{glob}"))?;
        // Also match the directory itself so the walk prunes it.
        if let Some(dir) = glob.strip_suffix("/**") {
            builder.add(&format!("!{dir}"))?;
        }
    }
    Ok(builder.build()?)
}
