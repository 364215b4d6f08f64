//! The frontmatter block of a note.
//!
//! Entries keep the source text they were parsed from. Untouched entries are
//! re-emitted verbatim, a renamed key only swaps the key token, and entries
//! whose value changed are rendered again in their original style.

use crate::parser::{parse_yaml_mapping, segment_entries, FrontmatterSplit};
use crate::types::OrderedMap;
use crate::value::{render_scalar, FieldValue};
use std::ops::Range;

/// How an entry's value was written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueStyle {
    /// `key: value`
    Scalar,
    /// `key: [a, b]`
    Flow,
    /// `key:` followed by `- item` lines with the given indent.
    Block(String),
    /// A nested mapping.
    Nested,
}

impl ValueStyle {
    fn detect(value: &FieldValue, raw: Option<&RawText>) -> Self {
        match value {
            FieldValue::Mapping(_) => ValueStyle::Nested,
            FieldValue::Scalar(_) => ValueStyle::Scalar,
            FieldValue::Sequence(_) => {
                let Some(raw) = raw else {
                    return ValueStyle::Block("  ".to_string());
                };
                let after_key = &raw.text[raw.key_range.end..];
                let first_line = after_key.lines().next().unwrap_or("");
                let inline = first_line.trim_start().trim_start_matches(':').trim();
                if inline.starts_with('[') {
                    return ValueStyle::Flow;
                }
                let indent = raw
                    .text
                    .lines()
                    .skip(1)
                    .find(|line| line.trim_start().starts_with('-'))
                    .map(|line| line[..line.len() - line.trim_start().len()].to_string())
                    .unwrap_or_else(|| "  ".to_string());
                ValueStyle::Block(indent)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawText {
    text: String,
    key_range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockEntry {
    key: String,
    value: FieldValue,
    style: ValueStyle,
    raw: Option<RawText>,
    key_changed: bool,
    value_changed: bool,
}

impl BlockEntry {
    fn new(key: &str, value: FieldValue) -> Self {
        Self {
            key: key.to_string(),
            style: ValueStyle::detect(&value, None),
            value,
            raw: None,
            key_changed: false,
            value_changed: true,
        }
    }

    fn set_value(&mut self, value: FieldValue) {
        if self.style == ValueStyle::Scalar && value.is_sequence() {
            self.style = ValueStyle::Block("  ".to_string());
        }
        self.value = value;
        self.value_changed = true;
    }

    fn render(&self, eol: &str) -> String {
        if let Some(raw) = &self.raw
            && !self.value_changed
        {
            if !self.key_changed {
                return raw.text.clone();
            }
            return format!(
                "{}{}{}",
                &raw.text[..raw.key_range.start],
                render_scalar(&self.key, false),
                &raw.text[raw.key_range.end..]
            );
        }
        self.render_fresh(eol)
    }

    fn render_fresh(&self, eol: &str) -> String {
        let key = render_scalar(&self.key, false);
        match (&self.value, &self.style) {
            (FieldValue::Scalar(s), _) if s.is_empty() => format!("{}:{}", key, eol),
            (FieldValue::Scalar(s), _) => format!("{}: {}{}", key, render_scalar(s, false), eol),
            (FieldValue::Sequence(items), ValueStyle::Flow) => {
                let items: Vec<String> = items.iter().map(|item| render_item(item, true)).collect();
                format!("{}: [{}]{}", key, items.join(", "), eol)
            }
            (FieldValue::Sequence(items), style) => {
                let indent = match style {
                    ValueStyle::Block(indent) => indent.as_str(),
                    _ => "  ",
                };
                let mut out = format!("{}:{}", key, eol);
                for item in items {
                    out.push_str(&format!("{}- {}{}", indent, render_item(item, false), eol));
                }
                out
            }
            (FieldValue::Mapping(_), _) => {
                let yaml = serde_yaml::to_string(&self.value.to_yaml()).unwrap_or_default();
                let mut out = format!("{}:{}", key, eol);
                for line in yaml.lines() {
                    out.push_str(&format!("  {}{}", line, eol));
                }
                out
            }
        }
    }
}

fn render_item(item: &FieldValue, flow: bool) -> String {
    match item {
        FieldValue::Scalar(s) => render_scalar(s, flow),
        // JSON is valid flow-style YAML.
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockSource {
    range: Range<usize>,
    opening: String,
    closing: String,
    preamble: String,
}

/// The structured metadata block at the top of a note.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuredBlock {
    entries: Vec<BlockEntry>,
    source: Option<BlockSource>,
    dirty: bool,
    error: Option<String>,
}

impl StructuredBlock {
    /// Build the block from a split document.
    ///
    /// Malformed YAML leaves the block empty and read-only, with the parse
    /// error recorded; the raw text stays in the document untouched.
    pub fn parse(split: &FrontmatterSplit<'_>) -> Self {
        let (Some(yaml), Some(range)) = (split.yaml, split.block.clone()) else {
            return Self::default();
        };

        let mut source = BlockSource {
            range,
            opening: split.opening.to_string(),
            closing: split.closing.to_string(),
            preamble: String::new(),
        };

        let parsed = match parse_yaml_mapping(yaml) {
            Ok(parsed) => parsed,
            Err(message) => {
                return Self {
                    entries: Vec::new(),
                    source: Some(source),
                    dirty: false,
                    error: Some(message),
                };
            }
        };

        let segments = segment_entries(yaml);
        let aligned = segments.entries.len() == parsed.len()
            && segments
                .entries
                .iter()
                .zip(&parsed)
                .all(|(raw, (key, _))| raw.key == *key);
        if aligned {
            source.preamble = segments.preamble.to_string();
        } else {
            tracing::debug!("frontmatter layout not recognized; entries will be re-rendered on change");
        }

        let entries = parsed
            .into_iter()
            .enumerate()
            .map(|(i, (key, value))| {
                let raw = aligned.then(|| RawText {
                    text: segments.entries[i].text.to_string(),
                    key_range: segments.entries[i].key_range.clone(),
                });
                BlockEntry {
                    key,
                    style: ValueStyle::detect(&value, raw.as_ref()),
                    value: value.dedup(),
                    raw,
                    key_changed: false,
                    value_changed: false,
                }
            })
            .collect();

        Self {
            entries,
            source: Some(source),
            dirty: false,
            error: None,
        }
    }

    /// The parse error, if the block could not be read.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the block accepts edits.
    pub fn is_editable(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Byte range of the block in the original text, if the note has one.
    pub fn source_range(&self) -> Option<Range<usize>> {
        self.source.as_ref().map(|s| s.range.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Scalar values under a key.
    pub fn values(&self, key: &str) -> Vec<String> {
        self.get(key).map(FieldValue::values).unwrap_or_default()
    }

    pub fn contains_value(&self, key: &str, value: &str) -> bool {
        self.values(key).iter().any(|v| v == value)
    }

    /// Snapshot of the entries.
    pub fn to_map(&self) -> OrderedMap<FieldValue> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    fn entry(&self, key: &str) -> Option<&BlockEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut BlockEntry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    /// Add a key with an empty value. No-op if the key exists.
    pub fn add_key(&mut self, key: &str) -> bool {
        if !self.is_editable() || self.contains_key(key) {
            return false;
        }
        self.entries.push(BlockEntry::new(key, FieldValue::empty()));
        self.dirty = true;
        true
    }

    /// Add a value under a key, creating the key if needed. No-op if the
    /// value is already present or the key holds a nested mapping.
    pub fn add_value(&mut self, key: &str, value: &str) -> bool {
        if !self.is_editable() {
            return false;
        }
        let Some(entry) = self.entry_mut(key) else {
            self.entries
                .push(BlockEntry::new(key, FieldValue::Scalar(value.to_string())));
            self.dirty = true;
            return true;
        };

        let new_value = match &entry.value {
            FieldValue::Mapping(_) => {
                tracing::debug!(key, "cannot add a value to a nested mapping");
                return false;
            }
            FieldValue::Scalar(s) if s.is_empty() => FieldValue::Scalar(value.to_string()),
            FieldValue::Scalar(s) if s == value => return false,
            FieldValue::Scalar(s) => FieldValue::Sequence(vec![
                FieldValue::Scalar(s.clone()),
                FieldValue::Scalar(value.to_string()),
            ]),
            FieldValue::Sequence(items) => {
                let item = FieldValue::Scalar(value.to_string());
                if items.contains(&item) {
                    return false;
                }
                let mut items = items.clone();
                items.push(item);
                FieldValue::Sequence(items)
            }
        };
        entry.set_value(new_value);
        self.dirty = true;
        true
    }

    /// Rename a key. If `new` exists, the values of `old` are merged into it
    /// and duplicates collapse.
    pub fn rename_key(&mut self, old: &str, new: &str) -> bool {
        if !self.is_editable() || old == new || !self.contains_key(old) {
            return false;
        }

        if self.contains_key(new) {
            let old_is_mapping = self.get(old).is_some_and(FieldValue::is_mapping);
            let new_is_mapping = self.get(new).is_some_and(FieldValue::is_mapping);
            if old_is_mapping || new_is_mapping {
                tracing::warn!(old, new, "cannot merge a nested mapping; key left unchanged");
                return false;
            }
            for value in self.values(old) {
                self.add_value(new, &value);
            }
            self.remove_key(old);
            return true;
        }

        if let Some(entry) = self.entry_mut(old) {
            entry.key = new.to_string();
            entry.key_changed = true;
        }
        self.dirty = true;
        true
    }

    /// Replace one value under a key. If `new` is already present, `old` is
    /// dropped instead.
    pub fn rename_value(&mut self, key: &str, old: &str, new: &str) -> bool {
        if !self.is_editable() || old == new || !self.contains_value(key, old) {
            return false;
        }
        let Some(entry) = self.entry_mut(key) else {
            return false;
        };
        let new_value = match &entry.value {
            FieldValue::Sequence(items) => {
                let target = FieldValue::Scalar(new.to_string());
                let has_new = items.contains(&target);
                let mut renamed = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        FieldValue::Scalar(s) if s == old => {
                            if !has_new && !renamed.contains(&target) {
                                renamed.push(target.clone());
                            }
                        }
                        other => renamed.push(other.clone()),
                    }
                }
                FieldValue::Sequence(renamed)
            }
            _ => FieldValue::Scalar(new.to_string()),
        };
        entry.set_value(new_value);
        self.dirty = true;
        true
    }

    /// Remove a key and return its value.
    pub fn take_key(&mut self, key: &str) -> Option<FieldValue> {
        if !self.is_editable() {
            return None;
        }
        let index = self.entries.iter().position(|e| e.key == key)?;
        self.dirty = true;
        Some(self.entries.remove(index).value)
    }

    pub fn remove_key(&mut self, key: &str) -> bool {
        self.take_key(key).is_some()
    }

    /// Remove one value. Removing the last value removes the key.
    pub fn remove_value(&mut self, key: &str, value: &str) -> bool {
        if !self.is_editable() || !self.contains_value(key, value) {
            return false;
        }
        let Some(entry) = self.entry_mut(key) else {
            return false;
        };
        let remaining = match &entry.value {
            FieldValue::Sequence(items) => {
                let kept: Vec<FieldValue> = items
                    .iter()
                    .filter(|item| !matches!(item, FieldValue::Scalar(s) if s == value))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(FieldValue::Sequence(kept))
                }
            }
            _ => None,
        };
        match remaining {
            Some(value) => entry.set_value(value),
            None => {
                self.entries.retain(|e| e.key != key);
            }
        }
        self.dirty = true;
        true
    }

    /// Render the whole block, delimiters included. An emptied block
    /// renders as nothing.
    pub fn render(&self, eol: &str) -> String {
        let preamble = self.source.as_ref().map(|s| s.preamble.as_str()).unwrap_or("");
        if self.entries.is_empty() && preamble.trim().is_empty() {
            return String::new();
        }

        let default_delimiter = format!("---{}", eol);
        let (opening, closing) = match &self.source {
            Some(source) => (source.opening.as_str(), source.closing.as_str()),
            None => (default_delimiter.as_str(), default_delimiter.as_str()),
        };

        let mut out = String::from(opening);
        out.push_str(preamble);
        for entry in &self.entries {
            out.push_str(&entry.render(eol));
        }
        out.push_str(closing);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::split_frontmatter;
    use pretty_assertions::assert_eq;

    fn block(content: &str) -> StructuredBlock {
        StructuredBlock::parse(&split_frontmatter(content))
    }

    #[test]
    fn test_untouched_block_renders_verbatim() {
        let content = "---\n# note\ntitle:   Spaced\ntags:\n  - a\n  - b\n---\nbody";
        let b = block(content);
        assert_eq!(b.render("\n"), "---\n# note\ntitle:   Spaced\ntags:\n  - a\n  - b\n---\n");
        assert!(!b.is_dirty());
    }

    #[test]
    fn test_rename_key_swaps_only_the_key() {
        let mut b = block("---\ntags: [a, b]  # keep\nother: x\n---\n");
        assert!(b.rename_key("tags", "topics"));
        assert_eq!(b.render("\n"), "---\ntopics: [a, b]  # keep\nother: x\n---\n");
    }

    #[test]
    fn test_rename_key_merges_values() {
        let mut b = block("---\ntags: [a, b]\ntopics: [b, c]\n---\n");
        assert!(b.rename_key("tags", "topics"));
        assert_eq!(b.keys(), vec!["topics"]);
        assert_eq!(b.values("topics"), vec!["b", "c", "a"]);
        assert_eq!(b.render("\n"), "---\ntopics: [b, c, a]\n---\n");
    }

    #[test]
    fn test_add_value_styles() {
        let mut b = block("---\nstatus: new\nlist:\n- x\n---\n");
        assert!(b.add_value("status", "open"));
        assert!(b.add_value("list", "y"));
        assert!(!b.add_value("list", "y"));
        assert_eq!(
            b.render("\n"),
            "---\nstatus:\n  - new\n  - open\nlist:\n- x\n- y\n---\n"
        );
    }

    #[test]
    fn test_add_key_idempotent() {
        let mut b = block("---\na: 1\n---\n");
        assert!(!b.add_key("a"));
        assert!(b.add_key("b"));
        assert!(!b.add_key("b"));
        assert_eq!(b.render("\n"), "---\na: 1\nb:\n---\n");
    }

    #[test]
    fn test_remove_value() {
        let mut b = block("---\nstatus: [new, archived]\n---\n");
        assert!(b.remove_value("status", "new"));
        assert_eq!(b.render("\n"), "---\nstatus: [archived]\n---\n");

        let mut b = block("---\nstatus: [new]\nx: 1\n---\n");
        assert!(b.remove_value("status", "new"));
        assert_eq!(b.keys(), vec!["x"]);
    }

    #[test]
    fn test_emptied_block_renders_nothing() {
        let mut b = block("---\nstatus: new\n---\n");
        assert!(b.remove_key("status"));
        assert_eq!(b.render("\n"), "");
    }

    #[test]
    fn test_new_block() {
        let mut b = StructuredBlock::default();
        assert!(b.add_value("status", "draft"));
        assert_eq!(b.render("\n"), "---\nstatus: draft\n---\n");
    }

    #[test]
    fn test_rename_value() {
        let mut b = block("---\nstatus: [new, old]\n---\n");
        assert!(b.rename_value("status", "new", "fresh"));
        assert_eq!(b.values("status"), vec!["fresh", "old"]);
        assert!(b.rename_value("status", "old", "fresh"));
        assert_eq!(b.values("status"), vec!["fresh"]);
        assert!(!b.rename_value("status", "missing", "x"));
    }

    #[test]
    fn test_malformed_block_is_read_only() {
        let mut b = block("---\nkey: [unclosed\n---\nbody");
        assert!(b.error().is_some());
        assert!(b.is_empty());
        assert!(!b.add_key("x"));
        assert!(!b.is_dirty());
    }

    #[test]
    fn test_nested_mapping_values_not_addressable() {
        let mut b = block("---\nmeta:\n  a: 1\n---\n");
        assert!(b.values("meta").is_empty());
        assert!(!b.add_value("meta", "x"));
        assert!(b.remove_key("meta"));
    }

    #[test]
    fn test_duplicate_sequence_items_collapse() {
        let b = block("---\ntags: [a, b, a]\n---\n");
        assert_eq!(b.values("tags"), vec!["a", "b"]);
    }

    #[test]
    fn test_crlf_new_entries() {
        let mut b = block("---\r\na: 1\r\n---\r\n");
        assert!(b.add_value("b", "2"));
        assert_eq!(b.render("\r\n"), "---\r\na: 1\r\nb: 2\r\n---\r\n");
    }
}
