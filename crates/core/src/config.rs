//! Index configuration.
//!
//! Read from the LSP `initializationOptions` object or from a
//! `.stylescope.json` file at the workspace root. Every field has a default,
//! so a partial (or absent) configuration is always valid.

use crate::error::{Result, StylescopeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = ".stylescope.json";

pub const DEFAULT_MODULE_EXTENSIONS: &[&str] = &[
    "css", "scss", "sass", "less", "styl", "stylus", "pcss", "postcss",
];

pub const DEFAULT_SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebounceConfig {
    pub analysis_ms: u64,
    pub symbol_refresh_ms: u64,
    pub save_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            analysis_ms: 300,
            symbol_refresh_ms: 300,
            save_ms: 1000,
        }
    }
}

impl DebounceConfig {
    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_ms)
    }

    pub fn symbol_refresh(&self) -> Duration {
        Duration::from_millis(self.symbol_refresh_ms)
    }

    pub fn save(&self) -> Duration {
        Duration::from_millis(self.save_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    /// Import prefix -> workspace-relative replacement directory.
    pub aliases: BTreeMap<String, String>,
    /// Globs excluded from the workspace scan.
    pub exclude: Vec<String>,
    pub module_extensions: Vec<String>,
    pub script_extensions: Vec<String>,
    pub debounce: DebounceConfig,
    pub max_queue_length: usize,
    pub symbol_cache_capacity: usize,
    pub process_on_edit: bool,
    pub process_on_save: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            aliases: BTreeMap::new(),
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/dist/**".to_string(),
                "**/build/**".to_string(),
            ],
            module_extensions: DEFAULT_MODULE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            script_extensions: DEFAULT_SCRIPT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            debounce: DebounceConfig::default(),
            max_queue_length: 100,
            symbol_cache_capacity: 3,
            process_on_edit: true,
            process_on_save: true,
        }
    }
}

impl IndexConfig {
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let config: IndexConfig = serde_json::from_value(value)
            .map_err(|e| StylescopeError::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Like [`IndexConfig::from_json_value`], but a malformed value is logged
    /// and replaced by the defaults.
    pub fn from_json_value_or_default(value: Option<serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => Self::default(),
            Some(value) => Self::from_json_value(value).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid configuration: {}", e);
                Self::default()
            }),
        }
    }

    /// Load `.stylescope.json` from the workspace root, if present.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Self::from_json_value(value)
    }

    pub fn load_or_default(root: &Path) -> Self {
        Self::load(root).unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to read {} under {}: {}. Using defaults.",
                CONFIG_FILE_NAME,
                root.display(),
                e
            );
            Self::default()
        })
    }

    fn normalized(mut self) -> Self {
        self.max_queue_length = self.max_queue_length.max(1);
        self.symbol_cache_capacity = self.symbol_cache_capacity.max(1);
        for ext in self
            .module_extensions
            .iter_mut()
            .chain(self.script_extensions.iter_mut())
        {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
        self
    }
}
