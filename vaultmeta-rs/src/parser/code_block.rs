//! Code regions, which are inert for metadata and tag extraction.

use regex::Regex;
use std::sync::LazyLock;

/// A byte range covered by a fenced code block or an inline code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Fenced block (vs inline code).
    pub fenced: bool,
}

// Opening fence: up to three spaces of indent, then ``` or ~~~ (or longer).
static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap());

// Inline code with one or two backticks, on a single line.
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"``(?:[^`\n]|`[^`\n])+``|`[^`\n]+`").unwrap());

/// Find fenced code blocks and inline code in `content`.
///
/// An unterminated fence runs to the end of the content. Returned ranges are
/// sorted by start offset and never overlap.
pub fn find_code_ranges(content: &str) -> Vec<CodeRange> {
    let mut ranges = Vec::new();

    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let line_end = offset + line.len();
        let text = line.trim_end_matches(['\n', '\r']);

        match open {
            None => {
                if let Some(caps) = FENCE.captures(text) {
                    let fence = &caps[1];
                    let fence_char = fence.chars().next().unwrap_or('`');
                    // Backtick fences may not carry backticks in the info string.
                    let info = &text[caps[0].len()..];
                    if fence_char == '~' || !info.contains('`') {
                        open = Some((offset, fence_char, fence.len()));
                    }
                }
            }
            Some((start, fence_char, fence_len)) => {
                let trimmed = text.trim();
                if trimmed.len() >= fence_len && trimmed.chars().all(|c| c == fence_char) {
                    ranges.push(CodeRange {
                        start,
                        end: offset + text.len(),
                        fenced: true,
                    });
                    open = None;
                }
            }
        }
        offset = line_end;
    }
    if let Some((start, _, _)) = open {
        ranges.push(CodeRange {
            start,
            end: content.len(),
            fenced: true,
        });
    }

    let fenced = ranges.clone();
    for m in INLINE_CODE.find_iter(content) {
        let inside_fence = fenced
            .iter()
            .any(|r| m.start() < r.end && r.start < m.end());
        if !inside_fence {
            ranges.push(CodeRange {
                start: m.start(),
                end: m.end(),
                fenced: false,
            });
        }
    }

    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Check if a byte offset is inside any code range.
pub fn is_in_code(offset: usize, ranges: &[CodeRange]) -> bool {
    ranges.iter().any(|r| offset >= r.start && offset < r.end)
}

/// Check if a line starting at `offset` belongs to a fenced block.
pub fn is_in_fence(offset: usize, ranges: &[CodeRange]) -> bool {
    ranges
        .iter()
        .any(|r| r.fenced && offset >= r.start && offset <= r.end)
}
