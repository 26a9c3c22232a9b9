use super::lexer::{quoted_end, scan_stylesheet};
use super::{RegionKind, StyleRule, StylesheetParser};
use crate::document::Dialect;
use crate::error::{Result, StylescopeError};

/// Tolerant rule scanner for brace-delimited stylesheets.
///
/// Reports every qualified rule, nested ones included, with the offset of its
/// selector. Unbalanced braces and unterminated comments or strings simply
/// end at EOF. At-rule preludes (`@media`, `@include`, ...) are not reported
/// but their blocks are descended into.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafeCssParser;

impl StylesheetParser for SafeCssParser {
    fn parse(&self, text: &str, dialect: Dialect) -> Result<Vec<StyleRule>> {
        if text.contains('\0') {
            return Err(StylescopeError::Parsing(
                "binary content is not a stylesheet".to_string(),
            ));
        }
        Ok(scan_rules(text, dialect.has_line_comments()))
    }
}

fn scan_rules(text: &str, line_comments: bool) -> Vec<StyleRule> {
    let masked = mask_comments(text, line_comments);
    let bytes = masked.as_bytes();
    let mut rules = Vec::new();
    let mut prelude_start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' | b'"' => {
                prelude_start.get_or_insert(i);
                i = quoted_end(bytes, i, b);
                continue;
            }
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                prelude_start.get_or_insert(i);
                i = masked[i..]
                    .find('}')
                    .map(|p| i + p + 1)
                    .unwrap_or(bytes.len());
                continue;
            }
            b'{' => {
                if let Some(start) = prelude_start.take() {
                    let prelude = masked[start..i].trim_end();
                    if !prelude.starts_with('@') && !prelude.is_empty() {
                        rules.push(StyleRule {
                            selector: prelude.to_string(),
                            selector_offset: start,
                        });
                    }
                }
            }
            b'}' | b';' => prelude_start = None,
            _ if b.is_ascii_whitespace() => {}
            _ => {
                prelude_start.get_or_insert(i);
            }
        }
        i += 1;
    }

    rules
}

/// Copy of `text` with every comment byte replaced by a space, so offsets
/// are preserved and comment content never reaches a selector.
fn mask_comments(text: &str, line_comments: bool) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for (range, kind) in scan_stylesheet(text.as_bytes(), line_comments) {
        if kind == RegionKind::Comment {
            bytes[range].fill(b' ');
        }
    }
    // Whole UTF-8 sequences are either kept or blanked, so this cannot fail.
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, dialect: Dialect) -> Vec<StyleRule> {
        SafeCssParser.parse(text, dialect).unwrap()
    }

    #[test]
    fn test_flat_rules_with_offsets() {
        let text = ".a { color: red; }\n  .b, .c:hover { }";
        let rules = parse(text, Dialect::Css);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selector, ".a");
        assert_eq!(rules[0].selector_offset, 0);
        assert_eq!(rules[1].selector, ".b, .c:hover");
        assert_eq!(rules[1].selector_offset, text.find(".b").unwrap());
    }

    #[test]
    fn test_nested_and_at_rules() {
        let text = "@media (min-width: 1px) { .wide { } }\n.card { padding: 0; &.active { } .title { } }";
        let selectors: Vec<_> = parse(text, Dialect::Scss)
            .into_iter()
            .map(|r| r.selector)
            .collect();
        assert_eq!(selectors, vec![".wide", ".card", "&.active", ".title"]);
    }

    #[test]
    fn test_comments_never_reach_selectors() {
        let text = "/* .ghost { } */\n// .line { }\n.real /* .inner */ { }";
        let rules = parse(text, Dialect::Less);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].selector.starts_with(".real"));
        assert!(!rules[0].selector.contains("inner"));
        assert_eq!(rules[0].selector_offset, text.find(".real").unwrap());
    }

    #[test]
    fn test_malformed_input_does_not_fail() {
        let rules = parse(".open { color: red; .inner { ", Dialect::Scss);
        assert_eq!(rules.len(), 2);
        assert!(parse("}}} .x {", Dialect::Css).len() == 1);
        assert!(SafeCssParser.parse("\0\0", Dialect::Css).is_err());
    }
}
