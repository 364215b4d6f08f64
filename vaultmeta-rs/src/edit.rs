//! Byte-range edits against a note's original text.

use std::ops::Range;

/// Replace `range` of the original text with `text`. Empty ranges insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }
}

/// Apply edits to `original`.
///
/// Edits are applied in order of position; edits at the same position keep
/// the order they were given in. Deletions that overlap or touch are merged.
/// A deletion that starts a line and runs to the end of a text without a
/// final line ending also takes the line ending before it. Any other edit
/// overlapping one already applied is dropped with a warning.
pub fn apply_edits(original: &str, edits: Vec<Edit>) -> String {
    let edits = coalesce(original, edits);

    let mut out = String::with_capacity(original.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            if edit.text.is_empty() {
                cursor = cursor.max(edit.range.end);
                continue;
            }
            tracing::warn!(
                start = edit.range.start,
                end = edit.range.end,
                "dropping overlapping edit"
            );
            continue;
        }
        tracing::trace!(start = edit.range.start, end = edit.range.end, text = %edit.text, "edit");
        out.push_str(&original[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&original[cursor..]);
    out
}

fn coalesce(original: &str, mut edits: Vec<Edit>) -> Vec<Edit> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut merged: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if let Some(last) = merged.last_mut()
            && last.text.is_empty()
            && edit.text.is_empty()
            && !edit.range.is_empty()
            && edit.range.start <= last.range.end
        {
            last.range.end = last.range.end.max(edit.range.end);
            continue;
        }
        merged.push(edit);
    }

    if !original.ends_with('\n')
        && let Some(pos) = merged.iter().rposition(|e| e.text.is_empty() && !e.range.is_empty())
    {
        let range = merged[pos].range.clone();
        let before = &original[..range.start];
        if range.end == original.len() && range.start > 0 && before.ends_with('\n') {
            let start = range.start - if before.ends_with("\r\n") { 2 } else { 1 };
            let clear = pos == 0 || merged[pos - 1].range.end <= start;
            if clear {
                merged[pos].range.start = start;
            }
        }
    }
    merged
}

/// The range covering the whole line around `span`, including its line
/// ending when it has one.
pub fn whole_line(original: &str, span: Range<usize>) -> Range<usize> {
    let line_start = original[..span.start].rfind('\n').map_or(0, |i| i + 1);
    match original[span.end..].find('\n') {
        Some(i) => line_start..span.end + i + 1,
        None => line_start..original.len(),
    }
}

/// Text between the start of the line and `offset`.
pub fn line_prefix(original: &str, offset: usize) -> &str {
    let line_start = original[..offset].rfind('\n').map_or(0, |i| i + 1);
    &original[line_start..offset]
}

/// Text between `offset` and the end of the line (line ending excluded).
pub fn line_suffix(original: &str, offset: usize) -> &str {
    let rest = &original[offset..];
    let end = rest.find('\n').unwrap_or(rest.len());
    rest[..end].trim_end_matches('\r')
}
