use crate::syntax::LexicalRegions;
use regex::Regex;

/// A `binding.className` access found in script code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassUsage {
    pub name: String,
    /// Byte offset of the class name (after the dot).
    pub offset: usize,
}

/// Finds member accesses on `binding` outside strings and comments.
///
/// Accesses where the binding is itself a member (`theme.styles.x`) or the
/// tail of a longer identifier (`mystyles.x`) are not usages.
pub fn find_usages(text: &str, binding: &str, regions: &LexicalRegions) -> Vec<ClassUsage> {
    let pattern = format!(r"{}\.([A-Za-z0-9_$]+)", regex::escape(binding));
    let Ok(re) = Regex::new(&pattern) else {
        tracing::debug!("Unusable import binding {:?}", binding);
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let preceded_by_member = text[..whole.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c == '.' || c == '$' || c == '_' || c.is_alphanumeric());
            if preceded_by_member || regions.in_string_or_comment(whole.start()) {
                return None;
            }
            Some(ClassUsage {
                name: name.as_str().to_string(),
                offset: name.start(),
            })
        })
        .collect()
}
