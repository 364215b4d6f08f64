//! Heading detection, used to anchor insertions after the title.

use crate::parser::code_block::is_in_fence;
use crate::parser::Body;
use regex::Regex;
use std::sync::LazyLock;

// ATX-style heading: # Heading, ## Heading, etc.
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}#{1,6}(?:[ \t]|$)").unwrap());

/// Absolute offset just past the first heading line (after its line
/// ending), skipping fenced code.
pub fn first_heading_end(body: &Body<'_>) -> Option<usize> {
    let mut offset = 0;
    for line in body.text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if is_in_fence(line_start, &body.code) {
            continue;
        }
        if HEADING.is_match(line.trim_end_matches(['\n', '\r'])) {
            return Some(body.offset + offset);
        }
    }
    None
}
