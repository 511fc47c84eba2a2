//! Indentation-encoded dump parser.
//!
//! A dump is one line per element or property, indented with two spaces per
//! level, optionally drawn with box glyphs:
//!
//! ```text
//! === Visual Tree ===
//! Timestamp: 2024-05-01 10:00:00
//! Grid #Uid:3f2a#
//!   Size: 100×50 | Position: (0,0)
//!   ├─ Label "Hi"
//!   └─ Button [Submit]
//! ```
//!
//! Parsing never fails. Lines it cannot make sense of become elements whose
//! name is the whole trimmed line.

use super::node::{NodeKind, TreeNode};
use crate::store::StoreSnapshot;

/// Leading spaces per depth level. Odd counts round down.
pub const INDENT_UNIT: usize = 2;

const HEADER_MARKERS: &[&str] =
    &["===", "Timestamp:", "Current Page:", "Main Page:", "Navigation Context:"];

const PROPERTY_KEYWORDS: &[&str] =
    &["Size:", "Position:", "Handler:", "PlatformView:", "PlatformBounds:", "Load Time:"];

const INLINE_PROPERTY_KEYS: &[&str] = &["Size:", "Position:", "H:", "V:"];

const BRANCH_GLYPHS: &[char] = &['├', '└', '│', '─', '┬', '┼', '|', '-', '+', '`'];

const UID_OPEN: &str = "#Uid:";
const UID_CLOSE: char = '#';

/// Converts dump text into a forest of [`TreeNode`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpParser;

impl DumpParser {
    /// Creates a parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses a dump into roots in dump order.
    #[must_use]
    pub fn parse(&self, text: &str) -> Vec<TreeNode> {
        build_forest(text, None)
    }

    /// Parses a dump and fills `load_time_ms` for nodes whose correlation id
    /// is present in `samples`.
    #[must_use]
    pub fn parse_annotated(&self, text: &str, samples: &StoreSnapshot) -> Vec<TreeNode> {
        build_forest(text, Some(samples))
    }
}

fn build_forest(text: &str, samples: Option<&StoreSnapshot>) -> Vec<TreeNode> {
    let mut roots: Vec<TreeNode> = Vec::new();
    // Open ancestors; each is attached to the entry beneath it when popped.
    let mut stack: Vec<TreeNode> = Vec::new();
    let mut parsed = 0usize;

    for line in text.lines() {
        let Some(mut node) = parse_line(line) else {
            continue;
        };
        parsed += 1;

        if let (Some(samples), Some(id)) = (samples, node.id.as_deref()) {
            node.load_time_ms = samples.get(id);
        }

        while stack.last().is_some_and(|top| top.depth >= node.depth) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(node);
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    tracing::debug!(nodes = parsed, roots = roots.len(), "parsed dump");
    roots
}

fn close_top(stack: &mut Vec<TreeNode>, roots: &mut Vec<TreeNode>) {
    let Some(node) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Parses a single dump line. Returns `None` for headers and blank lines.
#[must_use]
pub fn parse_line(line: &str) -> Option<TreeNode> {
    let trimmed = line.trim();
    if is_skipped(trimmed) {
        return None;
    }

    let depth = indent_depth(line);
    let content = strip_branch_prefix(trimmed);
    if content.is_empty() {
        return None;
    }

    let (content, id) = take_correlation_id(content);

    let (kind, name, details) = if is_property(&content) {
        let (name, details) = split_property(&content);
        (NodeKind::Property, name, details)
    } else {
        let (name, details) = split_element(&content);
        (NodeKind::Element, name, details)
    };

    Some(TreeNode::new(name, details, depth).with_kind(kind).with_id(id))
}

fn is_skipped(trimmed: &str) -> bool {
    trimmed.is_empty() || HEADER_MARKERS.iter().any(|marker| trimmed.starts_with(marker))
}

/// Leading spaces divided by [`INDENT_UNIT`].
#[must_use]
pub fn indent_depth(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count() / INDENT_UNIT
}

fn strip_branch_prefix(text: &str) -> &str {
    let mut current = text;
    loop {
        let rest = current.trim_start_matches(BRANCH_GLYPHS);
        if rest.len() == current.len() {
            return current;
        }
        // Only a glyph run followed by whitespace is a prefix; "-5" is content.
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            current = rest.trim_start();
        } else {
            return current;
        }
    }
}

fn is_property(content: &str) -> bool {
    PROPERTY_KEYWORDS.iter().any(|keyword| content.starts_with(keyword))
        || (content.contains('|') && INLINE_PROPERTY_KEYS.iter().any(|key| content.contains(key)))
}

fn split_property(content: &str) -> (String, String) {
    match content.split_once(':') {
        Some((name, details)) => (name.trim().to_string(), details.trim().to_string()),
        None => (content.trim().to_string(), String::new()),
    }
}

fn split_element(content: &str) -> (String, String) {
    split_enclosed(content, '[', ']', false)
        .or_else(|| split_enclosed(content, '"', '"', true))
        .or_else(|| split_enclosed(content, '(', ')', false))
        .unwrap_or_else(|| (content.trim().to_string(), String::new()))
}

/// Splits `name <open>details<close>`. Quoted details keep their quotes.
fn split_enclosed(
    content: &str,
    open: char,
    close: char,
    keep_delimiters: bool,
) -> Option<(String, String)> {
    let start = content.find(open)?;
    let end = content.rfind(close)?;
    if end <= start {
        return None;
    }

    let name = content[..start].trim();
    let details = if keep_delimiters {
        &content[start..end + close.len_utf8()]
    } else {
        &content[start + open.len_utf8()..end]
    }
    .trim();

    if name.is_empty() {
        Some((details.to_string(), String::new()))
    } else {
        Some((name.to_string(), details.to_string()))
    }
}

/// Removes the first `#Uid:<token>#` marker, returning the remaining text and
/// the token. The leftmost marker wins, so a marker in the name takes
/// priority over one in the details. An empty token yields no id.
fn take_correlation_id(content: &str) -> (String, Option<String>) {
    let Some(start) = content.find(UID_OPEN) else {
        return (content.to_string(), None);
    };
    let token_start = start + UID_OPEN.len();
    let Some(token_len) = content[token_start..].find(UID_CLOSE) else {
        return (content.to_string(), None);
    };
    let token_end = token_start + token_len;

    let token = content[token_start..token_end].trim();
    let id = (!token.is_empty()).then(|| token.to_string());

    let before = content[..start].trim_end();
    let after = content[token_end + UID_CLOSE.len_utf8()..].trim_start();
    let hugs_delimiter =
        after.starts_with(&[']', '"', ')'][..]) || before.ends_with(&['[', '"', '('][..]);
    let remaining = match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (_, true) => before.to_string(),
        _ if hugs_delimiter => format!("{before}{after}"),
        _ => format!("{before} {after}"),
    };

    (remaining, id)
}
