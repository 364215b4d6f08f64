//! Inline field parsing: `[key:: value]`, `(key:: value)` and `key:: value`.

use crate::parser::code_block::{is_in_code, is_in_fence};
use crate::parser::Body;
use crate::types::{Span, Wrapping};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// Characters allowed in a key. Spaces are allowed after the first character.
const KEY_CHARS: &str = r"\p{L}\p{N}_\-/*~`\x{FE0F}\x{200D}\p{Extended_Pictographic}";

// Markdown emphasis around a key, kept as markup.
const KEY_MARKUP: &[char] = &['*', '_', '~', '`'];

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\[([{k}][{k} ]*)::([^\]]*(?:\]\][^\]]*)*)\]",
        k = KEY_CHARS
    ))
    .unwrap()
});

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\(([{k}][{k} ]*)::([^)]*)\)", k = KEY_CHARS)).unwrap()
});

// Line form: optional indent, block quote, list marker and task checkbox
// before the key.
static LINE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^([ \t]*(?:>[ \t]*)*(?:(?:[-*+]|\d+[.)])[ \t]+)?(?:\[.\][ \t]+)?)([{k}][{k} ]*)::(.*)$",
        k = KEY_CHARS
    ))
    .unwrap()
});

static VALID_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^[{k}](?:[{k} ]*[{k}])?$", k = KEY_CHARS)).unwrap());

/// Check that a key can be written as `key:: value` and read back as the
/// same key.
pub fn is_valid_inline_key(key: &str) -> bool {
    VALID_KEY.is_match(key) && !key.starts_with(KEY_MARKUP) && !key.ends_with(KEY_MARKUP)
}

/// An inline field found in a note body. Offsets are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    /// Logical key: trimmed, emphasis markup stripped.
    pub key: String,
    /// Trimmed value (empty for `key::`).
    pub value: String,
    pub wrapping: Wrapping,
    /// The whole field, delimiters included. For the line form this runs
    /// from the key markup to the end of the line.
    pub span: Span,
    /// The logical key text inside the field.
    pub key_range: Range<usize>,
    /// The trimmed value. Empty values get an empty range right after the
    /// separator and any whitespace following it.
    pub value_range: Range<usize>,
}

/// Parse all inline fields from a note body.
pub fn parse_inline_fields(body: &Body<'_>) -> Vec<ParsedField> {
    let mut fields = Vec::new();
    let mut offset = 0;

    for line in body.text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if is_in_fence(line_start, &body.code) {
            continue;
        }
        let text = line.trim_end_matches(['\n', '\r']);
        if !text.contains("::") {
            continue;
        }

        let mut wrapped = Vec::new();
        for (regex, wrapping, open) in [
            (&*BRACKETED, Wrapping::Brackets, '['),
            (&*PARENTHESIZED, Wrapping::Parens, '('),
        ] {
            for cap in regex.captures_iter(text) {
                let whole = cap.get(0).unwrap();
                // `[[...` and `((...` are links and block references.
                if text[..whole.start()].ends_with(open) || text[whole.end()..].starts_with(close_of(open)) {
                    continue;
                }
                if is_in_code(line_start + whole.start(), &body.code) {
                    continue;
                }
                let key = cap.get(1).unwrap();
                let value = cap.get(2).unwrap();
                if value.as_str().starts_with(':') {
                    continue;
                }
                if let Some(field) = build_field(
                    body,
                    line_start,
                    wrapping,
                    whole.start()..whole.end(),
                    key.start()..key.end(),
                    value.start()..value.end(),
                    text,
                ) {
                    wrapped.push(field);
                }
            }
        }

        if !wrapped.is_empty() {
            wrapped.sort_by_key(|f| f.span.start);
            fields.extend(wrapped);
            continue;
        }

        if let Some(cap) = LINE_FIELD.captures(text) {
            let key = cap.get(2).unwrap();
            let value = cap.get(3).unwrap();
            if value.as_str().starts_with(':') || is_in_code(line_start + key.start(), &body.code) {
                continue;
            }
            if let Some(field) = build_field(
                body,
                line_start,
                Wrapping::Line,
                key.start()..text.len(),
                key.start()..key.end(),
                value.start()..value.end(),
                text,
            ) {
                fields.push(field);
            }
        }
    }

    fields
}

fn close_of(open: char) -> char {
    if open == '[' { ']' } else { ')' }
}

// Build a field from line-relative ranges.
fn build_field(
    body: &Body<'_>,
    line_start: usize,
    wrapping: Wrapping,
    whole: Range<usize>,
    key: Range<usize>,
    value: Range<usize>,
    text: &str,
) -> Option<ParsedField> {
    let raw_key = &text[key.clone()];
    let trimmed = raw_key.trim_end();
    let clean = trimmed.trim_start_matches(KEY_MARKUP);
    let open_len = trimmed.len() - clean.len();
    let clean = clean.trim_end_matches(KEY_MARKUP);
    let clean_trimmed = clean.trim();
    if clean_trimmed.is_empty() {
        return None;
    }
    let key_start = key.start + open_len + (clean.len() - clean.trim_start().len());
    let key_range = key_start..key_start + clean_trimmed.len();

    let raw_value = &text[value.clone()];
    let leading = raw_value.len() - raw_value.trim_start().len();
    let value_text = raw_value.trim();
    let value_start = value.start + leading;
    let value_range = value_start..value_start + value_text.len();

    let base = body.offset + line_start;
    Some(ParsedField {
        key: clean_trimmed.to_string(),
        value: value_text.to_string(),
        wrapping,
        span: body.span(line_start + whole.start, line_start + whole.end),
        key_range: base + key_range.start..base + key_range.end,
        value_range: base + value_range.start..base + value_range.end,
    })
}

/// Format a new inline field on its own line.
pub fn format_inline_field(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{}::", key)
    } else {
        format!("{}:: {}", key, value)
    }
}
