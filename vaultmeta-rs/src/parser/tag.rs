//! Tag parsing (#tag and #tag/subtag).

use crate::parser::code_block::is_in_code;
use crate::parser::Body;
use crate::types::Span;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// Characters that end a tag: whitespace, general and supplemental
// punctuation blocks, and ASCII punctuation other than `/`, `-` and `_`.
const TAG_STOP: &str = r##"\s\x{2000}-\x{206F}\x{2E00}-\x{2E7F}'!"#$%&()*+,.:;<=>?@^`{|}~\[\]\\"##;

// A tag starts at the beginning of a line or after whitespace.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)(?:^|\s)#([^{s}]+)", s = TAG_STOP)).unwrap());

static VALID_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^[^{s}]+$", s = TAG_STOP)).unwrap());

// Wikilinks and embeds.
static WIKILINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!?\[\[[^\]\n]*\]\]").unwrap());

// Markdown link targets, inline `](...)` and autolinks `<scheme://...>`.
static LINK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\([^)\n]*\)|<[a-zA-Z][\w+.-]*:[^>\s]*>").unwrap());

/// A tag occurrence. Offsets are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    /// Tag name without the leading `#`.
    pub name: String,
    /// The `#name` token.
    pub span: Span,
}

/// Parse all tags from a note body.
pub fn parse_tags(body: &Body<'_>) -> Vec<ParsedTag> {
    let links = link_ranges(body.text);
    let mut tags = Vec::new();

    for cap in TAG.captures_iter(body.text) {
        let name = cap.get(1).unwrap();
        let start = name.start() - 1;
        let end = name.end();

        if is_in_code(start, &body.code) || links.iter().any(|r| r.contains(&start)) {
            continue;
        }
        if name.as_str().chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        tags.push(ParsedTag {
            name: name.as_str().to_string(),
            span: body.span(start, end),
        });
    }

    tags
}

fn link_ranges(content: &str) -> Vec<Range<usize>> {
    WIKILINK
        .find_iter(content)
        .chain(LINK_TARGET.find_iter(content))
        .map(|m| m.start()..m.end())
        .collect()
}

/// Check that a tag name (without `#`) can be written and read back as a
/// single tag.
pub fn is_valid_tag(name: &str) -> bool {
    VALID_TAG.is_match(name)
        && !name.chars().all(|c| c.is_ascii_digit())
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.contains("//")
}

/// Rename a tag that equals `old` or lives below it (`old/...`).
///
/// Returns `None` when the tag is unaffected.
pub fn rename_hierarchical(tag: &str, old: &str, new: &str) -> Option<String> {
    if tag == old {
        return Some(new.to_string());
    }
    tag.strip_prefix(old)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| format!("{}/{}", new, rest))
}
