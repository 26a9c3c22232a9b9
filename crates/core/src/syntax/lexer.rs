use super::{LexicalRegions, RegionKind, TokenClassifier};
use crate::document::Dialect;
use std::ops::Range;

/// Single-pass lexical scanner for scripts and stylesheets.
///
/// Script regions follow JS/TS lexing: `//` and `/* */` comments, quoted
/// strings, regular expression literals, and template literals whose `${}`
/// bodies are code again. Stylesheets have block comments, quoted strings and,
/// for preprocessor dialects, `//` line comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalClassifier;

impl TokenClassifier for LexicalClassifier {
    fn classify(&self, text: &str, dialect: Dialect) -> LexicalRegions {
        let regions = if dialect.is_script() {
            scan_script(text.as_bytes())
        } else if dialect.is_stylesheet() {
            scan_stylesheet(text.as_bytes(), dialect.has_line_comments())
        } else {
            Vec::new()
        };
        LexicalRegions::new(regions)
    }
}

type Regions = Vec<(Range<usize>, RegionKind)>;

fn scan_script(bytes: &[u8]) -> Regions {
    let mut regions = Vec::new();
    // One brace depth per open `${` expression.
    let mut templates: Vec<usize> = Vec::new();
    let mut prev: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = line_end(bytes, i);
                regions.push((i..end, RegionKind::Comment));
                i = end;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = block_comment_end(bytes, i + 2);
                regions.push((i..end, RegionKind::Comment));
                i = end;
                continue;
            }
            // `</tag>` and `/>` close JSX elements
            b'/' if regex_allowed(prev) && bytes.get(i + 1) != Some(&b'>') => {
                if let Some(end) = regex_end(bytes, i) {
                    regions.push((i..end, RegionKind::String));
                    prev = Some(b'/');
                    i = end;
                    continue;
                }
            }
            b'\'' | b'"' => {
                let end = quoted_end(bytes, i, b);
                regions.push((i..end, RegionKind::String));
                prev = Some(b);
                i = end;
                continue;
            }
            b'`' => {
                let (end, opened) = template_chunk(bytes, i + 1);
                regions.push((i..end, RegionKind::String));
                if opened {
                    templates.push(0);
                    prev = Some(b'{');
                } else {
                    prev = Some(b'`');
                }
                i = end;
                continue;
            }
            b'{' => {
                if let Some(depth) = templates.last_mut() {
                    *depth += 1;
                }
            }
            b'}' if templates.last() == Some(&0) => {
                templates.pop();
                let (end, opened) = template_chunk(bytes, i + 1);
                regions.push((i + 1..end, RegionKind::String));
                if opened {
                    templates.push(0);
                    prev = Some(b'{');
                } else {
                    prev = Some(b'`');
                }
                i = end;
                continue;
            }
            b'}' => {
                if let Some(depth) = templates.last_mut() {
                    *depth -= 1;
                }
            }
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            prev = Some(b);
        }
        i += 1;
    }

    regions
}

pub(super) fn scan_stylesheet(bytes: &[u8], line_comments: bool) -> Regions {
    let mut regions = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = block_comment_end(bytes, i + 2);
                regions.push((i..end, RegionKind::Comment));
                i = end;
            }
            // `url(http://...)` is not a comment
            b'/' if line_comments
                && bytes.get(i + 1) == Some(&b'/')
                && (i == 0 || bytes[i - 1] != b':') =>
            {
                let end = line_end(bytes, i);
                regions.push((i..end, RegionKind::Comment));
                i = end;
            }
            q @ (b'\'' | b'"') => {
                let end = quoted_end(bytes, i, q);
                regions.push((i..end, RegionKind::String));
                i = end;
            }
            _ => i += 1,
        }
    }

    regions
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| from + p)
        .unwrap_or(bytes.len())
}

/// End (exclusive) of a block comment whose body starts at `from`.
fn block_comment_end(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| rest.windows(2).position(|w| w == b"*/"))
        .map(|p| from + p + 2)
        .unwrap_or(bytes.len())
}

/// End (exclusive) of a quoted string; unterminated strings stop at the line end.
pub(super) fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Scans template literal text starting at `from`. Returns the end of the
/// string chunk and whether it stopped at a `${` (expression opened) rather
/// than at the closing backtick.
fn template_chunk(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, false),
            b'$' if bytes.get(i + 1) == Some(&b'{') => return (i + 2, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

fn regex_allowed(prev: Option<u8>) -> bool {
    match prev {
        None => true,
        Some(b) => matches!(
            b,
            b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';'
                | b'+' | b'-' | b'*' | b'%' | b'>' | b'~' | b'^'
        ),
    }
}

/// End of a regular expression literal starting at `start`, flags included.
/// `None` when the line ends first, in which case the slash is an operator.
fn regex_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(text: &str) -> LexicalRegions {
        LexicalClassifier.classify(text, Dialect::Script)
    }

    #[test]
    fn test_script_comments_and_strings() {
        let text = "a; // styles.x\n/* styles.y */ 'styles.z' \"q\"";
        let regions = script(text);
        assert!(regions.in_comment(text.find("styles.x").unwrap()));
        assert!(regions.in_comment(text.find("styles.y").unwrap()));
        assert!(regions.in_string(text.find("styles.z").unwrap()));
        assert!(!regions.in_string_or_comment(0));
    }

    #[test]
    fn test_template_expressions_are_code() {
        let text = "const c = `btn ${styles.active} ${`inner ${styles.deep}`} styles.text`;";
        let regions = script(text);
        assert!(!regions.in_string_or_comment(text.find("styles.active").unwrap()));
        assert!(!regions.in_string_or_comment(text.find("styles.deep").unwrap()));
        assert!(regions.in_string(text.find("inner").unwrap()));
        assert!(regions.in_string(text.find("styles.text").unwrap()));
        assert!(regions.in_string(text.find("btn").unwrap()));
    }

    #[test]
    fn test_object_braces_inside_template_expression() {
        let text = "`${fn({ a: 1 })} styles.after` + styles.code";
        let regions = script(text);
        assert!(regions.in_string(text.find("styles.after").unwrap()));
        assert!(!regions.in_string_or_comment(text.find("styles.code").unwrap()));
    }

    #[test]
    fn test_regex_literal_and_division() {
        let text = "const r = /'[/]/g; const d = a / b; styles.x";
        let regions = script(text);
        assert!(regions.in_string(text.find("'[").unwrap()));
        assert!(!regions.in_string_or_comment(text.find("styles.x").unwrap()));
        assert!(!regions.in_string_or_comment(text.find("a / b").unwrap() + 2));
    }

    #[test]
    fn test_jsx_tags_do_not_open_regex_literals() {
        let text = "<li><a className={styles.link}>x</a> <span className={styles.missing}>y</span></li>";
        let regions = script(text);
        assert!(!regions.in_string_or_comment(text.find("styles.missing").unwrap()));

        let text = "<img className={styles.a} /><b className={styles.missing} />";
        let regions = script(text);
        assert!(!regions.in_string_or_comment(text.find("styles.missing").unwrap()));
    }

    #[test]
    fn test_regex_after_operators_still_detected() {
        let text = "const ok = x > /'styles.q'/.test(s); styles.after";
        let regions = script(text);
        assert!(regions.in_string(text.find("styles.q").unwrap()));
        assert!(!regions.in_string_or_comment(text.find("styles.after").unwrap()));
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let text = "x /* open\nstyles.a";
        assert!(script(text).in_comment(text.len() - 1));
    }

    #[test]
    fn test_stylesheet_line_comments_depend_on_dialect() {
        let text = "// .a {}\n.b { background: url(http://x/y.png); }";
        let scss = LexicalClassifier.classify(text, Dialect::Scss);
        let css = LexicalClassifier.classify(text, Dialect::Css);
        assert!(scss.in_comment(3));
        assert!(!css.in_comment(3));
        assert!(!scss.in_comment(text.find("//x").unwrap()));
    }
}
