//! Note representation: the metadata model of one document.
//!
//! A note keeps its original text untouched. Edits change the structured
//! and inline views; the current serialization is the original text with
//! the edits implied by those views applied. When an edit rewrites text
//! that both the field and the tag view were read from, the pending edits
//! are folded into a new working text and the views are read again.

use crate::block::StructuredBlock;
use crate::edit::{apply_edits, Edit};
use crate::encoding::{self, SourceEncoding};
use crate::error::Result;
use crate::inline::{entangled, InlineMetadata, InlineTags};
use crate::parser::{
    first_heading_end, is_valid_inline_key, parse_inline_fields, parse_tags, split_frontmatter, Body,
};
use crate::types::{InsertLocation, MetaArea, OrderedMap};
use crate::value::FieldValue;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A problem found while parsing a note. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    /// Line the problem was reported for (1-indexed).
    pub line: usize,
    pub message: String,
}

/// Read-only copy of a note's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataSnapshot {
    pub path: PathBuf,
    pub frontmatter: OrderedMap<FieldValue>,
    pub inline_metadata: OrderedMap<Vec<String>>,
    pub tags: Vec<String>,
}

/// Represents a note in the vault.
#[derive(Debug, Clone)]
pub struct Note {
    /// Path relative to vault root (e.g., "proj/My Project.md").
    path: PathBuf,
    original: String,
    /// Text the parsed spans point into. Equal to `original` until the
    /// views are read again.
    base: String,
    encoding: SourceEncoding,
    eol: &'static str,
    block: StructuredBlock,
    inline: InlineMetadata,
    tags: InlineTags,
    body_start: usize,
    heading_end: Option<usize>,
    /// Where fields moved by `move_inline` are written.
    moved_to: Option<InsertLocation>,
    diagnostics: Vec<ParseDiagnostic>,
}

struct Views {
    block: StructuredBlock,
    inline: InlineMetadata,
    tags: InlineTags,
    body_start: usize,
    heading_end: Option<usize>,
}

impl Views {
    fn read(text: &str) -> Self {
        let split = split_frontmatter(text);
        let body = Body::new(text, split.body_start);
        Self {
            block: StructuredBlock::parse(&split),
            inline: InlineMetadata::from_parsed(parse_inline_fields(&body)),
            tags: InlineTags::from_parsed(parse_tags(&body)),
            heading_end: first_heading_end(&body),
            body_start: split.body_start,
        }
    }
}

impl Note {
    /// Parse a note from UTF-8 text.
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self::with_encoding(path.into(), text.into(), SourceEncoding::utf8())
    }

    /// Decode and parse a note from raw bytes.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self> {
        let path = path.into();
        let (text, encoding) = encoding::decode(bytes, &path)?;
        Ok(Self::with_encoding(path, text, encoding))
    }

    fn with_encoding(path: PathBuf, original: String, encoding: SourceEncoding) -> Self {
        let Views {
            block,
            inline,
            tags,
            body_start,
            heading_end,
        } = Views::read(&original);

        let mut diagnostics = Vec::new();
        if let Some(message) = block.error() {
            tracing::warn!(path = %path.display(), error = message, "unreadable frontmatter left untouched");
            diagnostics.push(ParseDiagnostic {
                line: 1,
                message: format!("frontmatter: {}", message),
            });
        }

        let eol = if original.contains("\r\n") { "\r\n" } else { "\n" };

        tracing::debug!(
            path = %path.display(),
            frontmatter = block.keys().len(),
            inline = inline.keys().len(),
            tags = tags.names().len(),
            "parsed note"
        );

        Self {
            path,
            eol,
            block,
            inline,
            tags,
            body_start,
            heading_end,
            moved_to: None,
            diagnostics,
            encoding,
            base: original.clone(),
            original,
        }
    }

    /// Path relative to the vault root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The text the note was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn encoding(&self) -> &SourceEncoding {
        &self.encoding
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    pub fn block(&self) -> &StructuredBlock {
        &self.block
    }

    pub fn inline(&self) -> &InlineMetadata {
        &self.inline
    }

    pub fn inline_tags(&self) -> &InlineTags {
        &self.tags
    }

    pub fn frontmatter(&self) -> OrderedMap<FieldValue> {
        self.block.to_map()
    }

    pub fn inline_metadata(&self) -> OrderedMap<Vec<String>> {
        self.inline.to_map()
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.names()
    }

    pub fn snapshot(&self) -> MetadataSnapshot {
        MetadataSnapshot {
            path: self.path.clone(),
            frontmatter: self.frontmatter(),
            inline_metadata: self.inline_metadata(),
            tags: self.tags(),
        }
    }

    /// Keys of one area.
    pub fn keys(&self, area: MetaArea) -> Vec<String> {
        match area {
            MetaArea::Frontmatter => self.block.keys().into_iter().map(str::to_string).collect(),
            MetaArea::Inline => self.inline.keys(),
        }
    }

    /// Keys of both areas, frontmatter first, without repeats.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys = self.keys(MetaArea::Frontmatter);
        for key in self.inline.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn values(&self, area: MetaArea, key: &str) -> Vec<String> {
        match area {
            MetaArea::Frontmatter => self.block.values(key),
            MetaArea::Inline => self.inline.values(key),
        }
    }

    /// Values of a key in both areas, without repeats.
    pub fn all_values(&self, key: &str) -> Vec<String> {
        let mut values = self.block.values(key);
        for value in self.inline.values(key) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// The document as it would be written now.
    pub fn serialize(&self, location: InsertLocation) -> String {
        let mut edits = self.edits();
        if let Some(insertion) = self.insertion(location) {
            edits.push(insertion);
        }
        apply_edits(&self.base, edits)
    }

    /// In-place edits against `base`, insertions excluded.
    fn edits(&self) -> Vec<Edit> {
        let mut edits = Vec::new();
        if self.block.is_dirty() {
            let range = self.block.source_range().unwrap_or(0..0);
            edits.push(Edit::replace(range, self.block.render(self.eol)));
        }
        edits.extend(self.inline.edits(&self.base));
        edits.extend(self.tags.edits(&self.base));
        edits
    }

    /// Whether the serialization differs from the original text.
    pub fn is_modified(&self, location: InsertLocation) -> bool {
        self.serialize(location) != self.original
    }

    fn insertion(&self, location: InsertLocation) -> Option<Edit> {
        let mut lines = self.inline.inserted_lines();
        lines.extend(self.tags.inserted_line());
        if lines.is_empty() {
            return None;
        }

        let anchor = match self.moved_to.unwrap_or(location) {
            InsertLocation::Top => self.body_start,
            InsertLocation::AfterTitle => self.heading_end.unwrap_or(self.body_start),
            InsertLocation::Bottom => self.base.len(),
        };
        let block = lines.join(self.eol);
        let at_unterminated_end = anchor == self.base.len()
            && !self.base.is_empty()
            && !self.base.ends_with('\n');
        let text = if at_unterminated_end {
            format!("{}{}", self.eol, block)
        } else {
            format!("{}{}", block, self.eol)
        };
        Some(Edit::insert(anchor, text))
    }

    /// Make `text` the new baseline after it was written.
    pub(crate) fn rebase(&mut self, text: String) {
        let encoding = SourceEncoding {
            reencoded: false,
            ..self.encoding
        };
        *self = Self::with_encoding(self.path.clone(), text, encoding);
    }

    /// Fold the in-place edits into `base` and read every view again.
    /// Pending insertions are carried over.
    fn resync(&mut self) {
        let fields = self.inline.inserted();
        let tags = self.tags.inserted();
        let text = apply_edits(&self.base, self.edits());

        let views = Views::read(&text);
        self.block = views.block;
        self.inline = views.inline;
        self.tags = views.tags;
        self.body_start = views.body_start;
        self.heading_end = views.heading_end;
        self.base = text;

        for (key, value) in &fields {
            self.inline.add(key, value);
        }
        for tag in &tags {
            self.tags.add(tag);
        }
        tracing::debug!(path = %self.path.display(), "re-read views after nested edit");
    }

    /// Keep both views in step with the text after a change.
    fn settle(&mut self, changed: bool) -> bool {
        if changed && entangled(&self.inline, &self.tags) {
            self.resync();
        }
        changed
    }

    pub(crate) fn add_key(&mut self, area: MetaArea, key: &str) -> bool {
        match area {
            MetaArea::Frontmatter => self.block.add_key(key),
            MetaArea::Inline => self.inline.add(key, ""),
        }
    }

    pub(crate) fn add_value(&mut self, area: MetaArea, key: &str, value: &str) -> bool {
        let changed = match area {
            MetaArea::Frontmatter => self.block.add_value(key, value),
            MetaArea::Inline => self.inline.add(key, value),
        };
        self.settle(changed)
    }

    pub(crate) fn add_tag(&mut self, tag: &str) -> bool {
        self.tags.add(tag)
    }

    pub(crate) fn rename_key(&mut self, old: &str, new: &str) -> bool {
        let changed = self.block.rename_key(old, new) | self.inline.rename_key(old, new);
        self.settle(changed)
    }

    pub(crate) fn rename_value(&mut self, key: &str, old: &str, new: &str) -> bool {
        let changed =
            self.block.rename_value(key, old, new) | self.inline.rename_value(key, old, new);
        self.settle(changed)
    }

    pub(crate) fn rename_tag(&mut self, old: &str, new: &str) -> bool {
        let changed = self.tags.rename(old, new);
        self.settle(changed)
    }

    pub(crate) fn remove_key(&mut self, key: &str) -> bool {
        let changed = self.block.remove_key(key) | self.inline.remove_key(key);
        self.settle(changed)
    }

    pub(crate) fn remove_value(&mut self, key: &str, value: &str) -> bool {
        let changed = self.block.remove_value(key, value) | self.inline.remove_value(key, value);
        self.settle(changed)
    }

    pub(crate) fn remove_tag(&mut self, tag: &str) -> bool {
        let changed = self.tags.remove(tag);
        self.settle(changed)
    }

    /// Move every parsed inline field to `location`. Returns whether the
    /// text changes.
    pub(crate) fn move_inline(&mut self, location: InsertLocation) -> bool {
        let before = self.serialize(location);
        let mut moved = self.clone();
        if !moved.inline.detach() {
            return false;
        }
        moved.moved_to = Some(location);
        if moved.serialize(location) == before {
            return false;
        }
        *self = moved;
        true
    }

    /// Move every key of the other area into `to`. Returns whether any key
    /// moved.
    pub(crate) fn transpose_all(&mut self, to: MetaArea) -> bool {
        let mut changed = false;
        for key in self.keys(to.opposite()) {
            changed |= self.transpose_key(to, &key);
        }
        changed
    }

    /// Move every value of `key` to the other area.
    pub(crate) fn transpose_key(&mut self, to: MetaArea, key: &str) -> bool {
        match to {
            MetaArea::Inline => {
                let Some(value) = self.block.get(key) else {
                    return false;
                };
                if value.is_mapping() || !is_valid_inline_key(key) {
                    tracing::warn!(path = %self.path.display(), key, "cannot write key as inline metadata");
                    return false;
                }
                let values = value.values();
                if values.iter().any(|v| !self.inline.accepts(key, v)) {
                    tracing::warn!(path = %self.path.display(), key, "value cannot be written as inline metadata");
                    return false;
                }
                self.block.remove_key(key);
                if values.is_empty() {
                    self.inline.add(key, "");
                }
                for value in &values {
                    self.inline.add(key, value);
                }
                self.settle(true)
            }
            MetaArea::Frontmatter => {
                if !self.inline.contains_key(key) || !self.accepts_block_values(key) {
                    return false;
                }
                let values = self.inline.values(key);
                self.inline.remove_key(key);
                if values.is_empty() {
                    self.block.add_key(key);
                }
                for value in &values {
                    self.block.add_value(key, value);
                }
                self.settle(true)
            }
        }
    }

    /// Move one value of `key` to the same key in the other area.
    pub(crate) fn transpose_value(&mut self, to: MetaArea, key: &str, value: &str) -> bool {
        match to {
            MetaArea::Inline => {
                if !self.block.contains_value(key, value)
                    || !is_valid_inline_key(key)
                    || !self.inline.accepts(key, value)
                {
                    return false;
                }
                self.block.remove_value(key, value);
                self.inline.add(key, value);
                self.settle(true)
            }
            MetaArea::Frontmatter => {
                if !self.inline.contains_value(key, value) || !self.accepts_block_values(key) {
                    return false;
                }
                self.inline.remove_value(key, value);
                self.block.add_value(key, value);
                self.settle(true)
            }
        }
    }

    fn accepts_block_values(&self, key: &str) -> bool {
        if !self.block.is_editable() {
            tracing::warn!(path = %self.path.display(), "frontmatter is unreadable; skipping");
            return false;
        }
        !self.block.get(key).is_some_and(FieldValue::is_mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "---\ntitle: Sample\ntags: [a, b]\n---\n# Sample\n\nstatus:: open\nSee #project/alpha.\n";

    #[test]
    fn test_parse_views() {
        let note = Note::parse("sample.md", SAMPLE);
        assert_eq!(note.keys(MetaArea::Frontmatter), vec!["title", "tags"]);
        assert_eq!(note.values(MetaArea::Frontmatter, "tags"), vec!["a", "b"]);
        assert_eq!(note.values(MetaArea::Inline, "status"), vec!["open"]);
        assert_eq!(note.tags(), vec!["project/alpha"]);
        assert!(note.diagnostics().is_empty());
    }

    #[test]
    fn test_unmodified_serialization_is_identity() {
        let note = Note::parse("sample.md", SAMPLE);
        for location in [InsertLocation::Top, InsertLocation::AfterTitle, InsertLocation::Bottom] {
            assert_eq!(note.serialize(location), SAMPLE);
        }
        assert!(!note.is_modified(InsertLocation::Bottom));
    }

    #[test]
    fn test_rename_key_in_both_areas() {
        let mut note = Note::parse("n.md", "---\nstatus: new\n---\nstatus:: open\n");
        assert!(note.rename_key("status", "state"));
        assert_eq!(
            note.serialize(InsertLocation::Bottom),
            "---\nstate: new\n---\nstate:: open\n"
        );
    }

    #[test]
    fn test_insert_locations() {
        let text = "---\na: 1\n---\nintro\n# Title\nbody\n";
        let mut note = Note::parse("n.md", text);
        assert!(note.add_value(MetaArea::Inline, "k", "v"));
        assert!(note.add_tag("new"));

        assert_eq!(
            note.serialize(InsertLocation::Top),
            "---\na: 1\n---\nk:: v\n#new\nintro\n# Title\nbody\n"
        );
        assert_eq!(
            note.serialize(InsertLocation::AfterTitle),
            "---\na: 1\n---\nintro\n# Title\nk:: v\n#new\nbody\n"
        );
        assert_eq!(
            note.serialize(InsertLocation::Bottom),
            "---\na: 1\n---\nintro\n# Title\nbody\nk:: v\n#new\n"
        );
    }

    #[test]
    fn test_bottom_without_trailing_newline() {
        let mut note = Note::parse("n.md", "text");
        assert!(note.add_tag("t"));
        assert_eq!(note.serialize(InsertLocation::Bottom), "text\n#t");
    }

    #[test]
    fn test_after_title_falls_back_to_top() {
        let mut note = Note::parse("n.md", "no heading\n");
        assert!(note.add_tag("t"));
        assert_eq!(note.serialize(InsertLocation::AfterTitle), "#t\nno heading\n");
    }

    #[test]
    fn test_block_created_and_removed() {
        let mut note = Note::parse("n.md", "body\n");
        assert!(note.add_value(MetaArea::Frontmatter, "status", "draft"));
        assert_eq!(
            note.serialize(InsertLocation::Top),
            "---\nstatus: draft\n---\nbody\n"
        );

        let mut note = Note::parse("n.md", "---\nstatus: draft\n---\nbody\n");
        assert!(note.remove_key("status"));
        assert_eq!(note.serialize(InsertLocation::Top), "body\n");
    }

    #[test]
    fn test_new_block_and_top_insertion_order() {
        let mut note = Note::parse("n.md", "body\n");
        assert!(note.add_key(MetaArea::Frontmatter, "a"));
        assert!(note.add_tag("t"));
        assert_eq!(
            note.serialize(InsertLocation::Top),
            "---\na:\n---\n#t\nbody\n"
        );
    }

    #[test]
    fn test_transpose_round_trip() {
        let mut note = Note::parse("n.md", "---\nk: [a, b]\nx: 1\n---\nbody\n");
        assert!(note.transpose_key(MetaArea::Inline, "k"));
        assert!(!note.block().contains_key("k"));
        assert_eq!(note.values(MetaArea::Inline, "k"), vec!["a", "b"]);
        assert_eq!(
            note.serialize(InsertLocation::Bottom),
            "---\nx: 1\n---\nbody\nk:: a\nk:: b\n"
        );

        assert!(note.transpose_key(MetaArea::Frontmatter, "k"));
        assert_eq!(note.values(MetaArea::Frontmatter, "k"), vec!["a", "b"]);
        assert!(!note.inline().contains_key("k"));
    }

    #[test]
    fn test_transpose_single_value() {
        let mut note = Note::parse("n.md", "---\nk: [a, b]\n---\n");
        assert!(note.transpose_value(MetaArea::Inline, "k", "a"));
        assert_eq!(note.values(MetaArea::Frontmatter, "k"), vec!["b"]);
        assert_eq!(note.values(MetaArea::Inline, "k"), vec!["a"]);
        assert!(!note.transpose_value(MetaArea::Inline, "k", "missing"));
    }

    #[test]
    fn test_malformed_frontmatter_diagnostic() {
        let text = "---\nkey: [unclosed\n---\nstatus:: ok\n";
        let mut note = Note::parse("bad.md", text);
        assert_eq!(note.diagnostics().len(), 1);
        assert!(note.frontmatter().is_empty());
        assert_eq!(note.values(MetaArea::Inline, "status"), vec!["ok"]);
        assert!(!note.add_key(MetaArea::Frontmatter, "x"));
        assert!(!note.transpose_key(MetaArea::Frontmatter, "status"));
        assert_eq!(note.serialize(InsertLocation::Bottom), text);
    }

    #[test]
    fn test_rebase() {
        let mut note = Note::parse("n.md", "a:: 1\n");
        assert!(note.rename_value("a", "1", "2"));
        let written = note.serialize(InsertLocation::Bottom);
        note.rebase(written.clone());
        assert_eq!(note.original(), written);
        assert!(!note.is_modified(InsertLocation::Bottom));
        assert_eq!(note.values(MetaArea::Inline, "a"), vec!["2"]);
    }

    #[test]
    fn test_crlf_insertion() {
        let mut note = Note::parse("n.md", "line\r\n");
        assert!(note.add_value(MetaArea::Inline, "k", "v"));
        assert_eq!(note.serialize(InsertLocation::Bottom), "line\r\nk:: v\r\n");
    }

    #[test]
    fn test_delete_trailing_lines_without_final_eol() {
        let mut note = Note::parse("n.md", "intro\nk:: a\nk:: b");
        assert!(note.remove_key("k"));
        let written = note.serialize(InsertLocation::Bottom);
        assert_eq!(written, "intro");
        assert!(Note::parse("n.md", written).inline_metadata().is_empty());

        let mut note = Note::parse("n.md", "intro\n#x\n#x");
        assert!(note.remove_tag("x"));
        assert_eq!(note.serialize(InsertLocation::Bottom), "intro");
    }

    #[test]
    fn test_value_rename_drops_tag_inside_value() {
        let mut note = Note::parse("n.md", "status:: #todo\n");
        assert_eq!(note.tags(), vec!["todo"]);
        assert!(note.rename_value("status", "#todo", "done"));
        assert!(note.tags().is_empty());
        assert_eq!(note.serialize(InsertLocation::Bottom), "status:: done\n");
        assert_eq!(note.original(), "status:: #todo\n");
        assert!(note.is_modified(InsertLocation::Bottom));

        assert!(note.rename_value("status", "done", "#next"));
        assert_eq!(note.tags(), vec!["next"]);
        assert!(note.rename_tag("next", "later"));
        assert_eq!(note.values(MetaArea::Inline, "status"), vec!["#later"]);
        assert_eq!(note.serialize(InsertLocation::Bottom), "status:: #later\n");
    }

    #[test]
    fn test_tag_delete_inside_field_updates_value() {
        let mut note = Note::parse("n.md", "Task [due:: #today] #today\n");
        assert!(note.remove_tag("today"));
        assert!(note.tags().is_empty());
        assert!(note.values(MetaArea::Inline, "due").is_empty());
        let written = note.serialize(InsertLocation::Bottom);
        assert_eq!(Note::parse("n.md", written).tags(), Vec::<String>::new());
    }

    #[test]
    fn test_resync_keeps_pending_insertions() {
        let mut note = Note::parse("n.md", "---\na: 1\n---\nstatus:: #todo\n");
        assert!(note.add_tag("added"));
        assert!(note.add_value(MetaArea::Frontmatter, "b", "two"));
        assert!(note.remove_key("status"));
        assert_eq!(note.tags(), vec!["added"]);
        assert_eq!(
            note.serialize(InsertLocation::Bottom),
            "---\na: 1\nb: two\n---\n#added\n"
        );
    }

    #[test]
    fn test_move_inline() {
        let text = "---\na: 1\n---\n# Title\nintro [k:: v] more\nowner:: sam\n";
        let mut note = Note::parse("n.md", text);
        assert!(note.move_inline(InsertLocation::AfterTitle));
        assert_eq!(
            note.serialize(InsertLocation::Bottom),
            "---\na: 1\n---\n# Title\nk:: v\nowner:: sam\nintro more\n"
        );
        assert_eq!(note.values(MetaArea::Inline, "owner"), vec!["sam"]);

        let mut note = Note::parse("n.md", "body\nk:: v\n");
        assert!(!note.move_inline(InsertLocation::Bottom));
        assert!(!Note::parse("n.md", "body\n").move_inline(InsertLocation::Top));
    }

    #[test]
    fn test_transpose_all() {
        let mut note = Note::parse("n.md", "---\na: 1\nb: [x, y]\n---\nbody\n");
        assert!(note.transpose_all(MetaArea::Inline));
        assert!(note.frontmatter().is_empty());
        assert_eq!(
            note.serialize(InsertLocation::Bottom),
            "body\na:: 1\nb:: x\nb:: y\n"
        );
        assert!(!note.transpose_all(MetaArea::Inline));
    }

    #[test]
    fn test_transpose_skips_multiline_value() {
        let text = "---\nnote: |\n  one\n  two\n---\nbody\n";
        let mut note = Note::parse("n.md", text);
        assert!(!note.transpose_key(MetaArea::Inline, "note"));
        assert_eq!(note.serialize(InsertLocation::Bottom), text);
    }
}
