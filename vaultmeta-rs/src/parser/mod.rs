//! Parsers for the metadata syntaxes of a markdown note.

pub mod code_block;
pub mod frontmatter;
pub mod heading;
pub mod inline_field;
pub mod tag;

pub use code_block::{find_code_ranges, CodeRange};
pub use frontmatter::{parse_yaml_mapping, segment_entries, split_frontmatter, FrontmatterSplit};
pub use heading::first_heading_end;
pub use inline_field::{format_inline_field, is_valid_inline_key, parse_inline_fields, ParsedField};
pub use tag::{is_valid_tag, parse_tags, rename_hierarchical, ParsedTag};

use crate::types::{line_of, Span};

/// The body of a note: the text after the frontmatter block.
///
/// Code ranges are relative to `text`; spans built through [`Body::span`]
/// are absolute offsets into the whole note.
#[derive(Debug, Clone)]
pub struct Body<'a> {
    pub text: &'a str,
    /// Byte offset of the body in the note.
    pub offset: usize,
    /// Line number of the first body line (1-indexed).
    pub first_line: usize,
    pub code: Vec<CodeRange>,
}

impl<'a> Body<'a> {
    pub fn new(content: &'a str, offset: usize) -> Self {
        let text = &content[offset..];
        Self {
            text,
            offset,
            first_line: line_of(content, offset),
            code: find_code_ranges(text),
        }
    }

    /// Absolute span for a body-relative range.
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(
            self.offset + start,
            self.offset + end,
            self.first_line + line_of(self.text, start) - 1,
        )
    }
}
