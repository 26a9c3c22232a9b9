//! Import specifier resolution and workspace-relative path keys.

use crate::config::IndexConfig;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    aliases: Vec<(String, String)>,
    module_extensions: Vec<String>,
    script_extensions: Vec<String>,
}

impl PathResolver {
    pub fn new(root: PathBuf, config: &IndexConfig) -> Self {
        Self {
            root: normalize(&root),
            aliases: config
                .aliases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            module_extensions: config.module_extensions.clone(),
            script_extensions: config.script_extensions.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path an import specifier points at. Aliases are tried first
    /// (first matching prefix wins), then the importer's directory.
    pub fn resolve_import(&self, importer: &Path, specifier: &str) -> PathBuf {
        for (alias, target) in &self.aliases {
            if let Some(rest) = specifier.strip_prefix(alias.as_str()) {
                return normalize(
                    &self
                        .root
                        .join(target.trim_start_matches('/'))
                        .join(rest.trim_start_matches('/')),
                );
            }
        }

        let candidate = Path::new(specifier);
        if candidate.is_absolute() {
            return normalize(candidate);
        }
        let base = importer.parent().unwrap_or(&self.root);
        normalize(&base.join(candidate))
    }

    /// Interning key of a path: workspace-relative with `/` separators.
    /// Paths outside the workspace keep their normalized absolute form.
    pub fn relative_key(&self, path: &Path) -> String {
        let absolute = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        };
        match absolute.strip_prefix(&self.root) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => absolute.to_string_lossy().into_owned(),
        }
    }

    pub fn absolute_path(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// `<name>.module.<ext>` for one of the configured module extensions.
    pub fn is_module_path(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        self.module_extensions
            .iter()
            .any(|ext| name.ends_with(&format!(".module.{ext}")))
    }

    pub fn is_script_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.script_extensions.iter().any(|s| *s == e)
            })
            .unwrap_or(false)
    }
}

/// Lexically collapses `.` and `..` components without touching the disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
