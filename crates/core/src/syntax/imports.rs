use super::{ImportExtractor, ImportStatement};
use regex::Regex;

const DEFAULT_MODULE_EXTENSIONS: [&str; 8] =
    ["css", "scss", "sass", "less", "styl", "stylus", "pcss", "postcss"];

/// Finds `import styles from './x.module.css'` statements.
#[derive(Debug, Clone)]
pub struct RegexImportExtractor {
    pattern: Option<Regex>,
}

impl RegexImportExtractor {
    pub fn new<S: AsRef<str>>(module_extensions: &[S]) -> Self {
        let extensions = module_extensions
            .iter()
            .map(|e| regex::escape(e.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(
            r#"import\s+([\w$]+)\s+from\s+['"]([^'"\n]+\.module\.(?:{extensions}))['"]"#
        );
        let pattern = match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("Invalid import pattern for {:?}: {}", extensions, e);
                None
            }
        };
        Self { pattern }
    }
}

impl Default for RegexImportExtractor {
    fn default() -> Self {
        Self::new(&DEFAULT_MODULE_EXTENSIONS)
    }
}

impl ImportExtractor for RegexImportExtractor {
    fn extract(&self, text: &str) -> Vec<ImportStatement> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let statement = caps.get(0)?;
                let binding = caps.get(1)?;
                let specifier = caps.get(2)?;
                Some(ImportStatement {
                    binding: binding.as_str().to_string(),
                    specifier: specifier.as_str().to_string(),
                    statement_offset: statement.start(),
                    specifier_offset: specifier.start(),
                })
            })
            .collect()
    }
}
