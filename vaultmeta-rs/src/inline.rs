//! Inline metadata and tags of a note body.
//!
//! Every physical occurrence is tracked with the span it was parsed from.
//! Logical views (keys, value sets, tag names) collapse duplicates.

use crate::edit::{line_prefix, line_suffix, whole_line, Edit};
use crate::parser::{
    format_inline_field, parse_inline_fields, rename_hierarchical, Body, ParsedField, ParsedTag,
};
use crate::types::{OrderedMap, Wrapping};

/// One inline field occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineField {
    key: String,
    value: String,
    origin: Option<ParsedField>,
    deleted: bool,
}

impl InlineField {
    fn inserted(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            origin: None,
            deleted: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn wrapping(&self) -> Wrapping {
        self.origin.as_ref().map_or(Wrapping::Line, |o| o.wrapping)
    }

    /// Where the field was parsed from; `None` for fields added since.
    pub fn origin(&self) -> Option<&ParsedField> {
        self.origin.as_ref()
    }

    fn is_live(&self) -> bool {
        !self.deleted
    }

    /// A parsed occurrence whose text will change.
    fn is_rewritten(&self) -> bool {
        self.origin
            .as_ref()
            .is_some_and(|o| self.deleted || self.key != o.key || self.value != o.value)
    }

    /// Whether `value` written into this occurrence reads back as the same
    /// key and value.
    pub fn accepts_value(&self, value: &str) -> bool {
        let text = match self.wrapping() {
            Wrapping::Line => format_inline_field(&self.key, value),
            Wrapping::Brackets => format!("[{}:: {}]", self.key, value),
            Wrapping::Parens => format!("({}:: {})", self.key, value),
        };
        reads_back(&text, &self.key, value)
    }

    fn edits(&self, original: &str, out: &mut Vec<Edit>) {
        let Some(origin) = &self.origin else {
            return;
        };

        if self.deleted {
            let range = match origin.wrapping {
                Wrapping::Line => {
                    if line_prefix(original, origin.span.start).trim().is_empty() {
                        whole_line(original, origin.span.range())
                    } else {
                        origin.span.range()
                    }
                }
                Wrapping::Brackets | Wrapping::Parens => {
                    let start = origin.span.start;
                    if original[..start].ends_with(' ') {
                        start - 1..origin.span.end
                    } else {
                        origin.span.range()
                    }
                }
            };
            out.push(Edit::delete(range));
            return;
        }

        if self.key != origin.key {
            out.push(Edit::replace(origin.key_range.clone(), self.key.clone()));
        }
        if self.value != origin.value {
            let range = origin.value_range.clone();
            let needs_space = origin.value.is_empty() && original[..range.start].ends_with("::");
            let text = if needs_space {
                format!(" {}", self.value)
            } else {
                self.value.clone()
            };
            out.push(Edit::replace(range, text));
        }
    }
}

/// All inline fields of a note.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineMetadata {
    fields: Vec<InlineField>,
}

impl InlineMetadata {
    pub fn from_parsed(parsed: Vec<ParsedField>) -> Self {
        let fields = parsed
            .into_iter()
            .map(|origin| InlineField {
                key: origin.key.clone(),
                value: origin.value.clone(),
                origin: Some(origin),
                deleted: false,
            })
            .collect();
        Self { fields }
    }

    /// Live occurrences, parsed and inserted.
    pub fn fields(&self) -> impl Iterator<Item = &InlineField> {
        self.fields.iter().filter(|f| f.is_live())
    }

    /// Distinct keys in order of first occurrence.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for field in self.fields() {
            if !keys.contains(&field.key) {
                keys.push(field.key.clone());
            }
        }
        keys
    }

    /// Distinct non-empty values of a key.
    pub fn values(&self, key: &str) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for field in self.fields().filter(|f| f.key == key && !f.value.is_empty()) {
            if !values.contains(&field.value) {
                values.push(field.value.clone());
            }
        }
        values
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields().any(|f| f.key == key)
    }

    pub fn contains_value(&self, key: &str, value: &str) -> bool {
        self.fields().any(|f| f.key == key && f.value == value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    pub fn to_map(&self) -> OrderedMap<Vec<String>> {
        self.keys()
            .into_iter()
            .map(|key| {
                let values = self.values(&key);
                (key, values)
            })
            .collect()
    }

    /// Add `key:: value` (or a bare `key::` when `value` is empty).
    ///
    /// No-op if the pair exists, or if `value` is empty and the key exists.
    /// A bare `key::` occurrence is filled in rather than adding a second
    /// field.
    pub fn add(&mut self, key: &str, value: &str) -> bool {
        if value.is_empty() {
            if self.contains_key(key) {
                return false;
            }
        } else if self.contains_value(key, value) {
            return false;
        } else if let Some(bare) = self
            .fields
            .iter_mut()
            .find(|f| f.is_live() && f.key == key && f.value.is_empty())
        {
            bare.value = value.to_string();
            return true;
        }
        self.fields.push(InlineField::inserted(key, value));
        true
    }

    /// Rename every occurrence of a key. Value sets of `old` and `new`
    /// merge; duplicate pairs collapse in the logical view.
    pub fn rename_key(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return false;
        }
        let mut changed = false;
        for field in self.fields.iter_mut().filter(|f| f.is_live() && f.key == old) {
            field.key = new.to_string();
            changed = true;
        }
        changed
    }

    pub fn rename_value(&mut self, key: &str, old: &str, new: &str) -> bool {
        if old == new {
            return false;
        }
        let mut changed = false;
        for field in self
            .fields
            .iter_mut()
            .filter(|f| f.is_live() && f.key == key && f.value == old)
        {
            field.value = new.to_string();
            changed = true;
        }
        changed
    }

    /// Delete every occurrence of a key.
    pub fn remove_key(&mut self, key: &str) -> bool {
        self.delete_where(|f| f.key == key)
    }

    /// Delete every occurrence of a pair. When no value is left under the
    /// key, bare `key::` occurrences go as well.
    pub fn remove_value(&mut self, key: &str, value: &str) -> bool {
        let changed = self.delete_where(|f| f.key == key && f.value == value);
        if changed && self.values(key).is_empty() {
            self.remove_key(key);
        }
        changed
    }

    /// Delete every parsed field and queue it to be written again at the
    /// insert location.
    pub fn detach(&mut self) -> bool {
        let parsed: Vec<(String, String)> = self
            .fields
            .iter()
            .filter(|f| f.is_live() && f.origin.is_some())
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect();
        if parsed.is_empty() {
            return false;
        }
        for field in self.fields.iter_mut().filter(|f| f.origin.is_some()) {
            field.deleted = true;
        }
        for (key, value) in &parsed {
            self.add(key, value);
        }
        true
    }

    /// Whether `value` can be added under `key` and read back unchanged.
    pub fn accepts(&self, key: &str, value: &str) -> bool {
        match self
            .fields()
            .find(|f| f.key == key && f.value.is_empty() && !value.is_empty())
        {
            Some(bare) => bare.accepts_value(value),
            None => reads_back(&format_inline_field(key, value), key, value),
        }
    }

    fn delete_where(&mut self, pred: impl Fn(&InlineField) -> bool) -> bool {
        let mut changed = false;
        self.fields.retain_mut(|field| {
            if !field.is_live() || !pred(field) {
                return true;
            }
            changed = true;
            if field.origin.is_none() {
                return false;
            }
            field.deleted = true;
            true
        });
        changed
    }

    /// In-place edits for parsed occurrences.
    pub(crate) fn edits(&self, original: &str) -> Vec<Edit> {
        let mut out = Vec::new();
        for field in &self.fields {
            field.edits(original, &mut out);
        }
        out
    }

    /// Fields added since parsing, one per line.
    pub(crate) fn inserted_lines(&self) -> Vec<String> {
        self.fields()
            .filter(|f| f.origin.is_none())
            .map(|f| format_inline_field(&f.key, &f.value))
            .collect()
    }

    pub(crate) fn inserted(&self) -> Vec<(String, String)> {
        self.fields()
            .filter(|f| f.origin.is_none())
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect()
    }
}

fn reads_back(text: &str, key: &str, value: &str) -> bool {
    let parsed = parse_inline_fields(&Body::new(text, 0));
    matches!(parsed.as_slice(), [field] if field.key == key && field.value == value)
}

/// Whether a pending change rewrites text both views were parsed from: a
/// changed field holding a tag, a changed tag inside a field, or a tag
/// written into a field value.
pub(crate) fn entangled(inline: &InlineMetadata, tags: &InlineTags) -> bool {
    let tag_spans: Vec<_> = tags.tags.iter().filter_map(|t| t.origin.as_ref()).map(|o| &o.span).collect();
    let field_rewrites = inline.fields.iter().filter(|f| f.is_rewritten()).any(|field| {
        field.value.contains('#')
            || field
                .origin
                .as_ref()
                .is_some_and(|o| tag_spans.iter().any(|span| o.span.contains(span)))
    });
    field_rewrites
        || tags.tags.iter().filter(|t| t.is_rewritten()).any(|tag| {
            tag.origin.as_ref().is_some_and(|t| {
                inline
                    .fields
                    .iter()
                    .filter_map(|f| f.origin.as_ref())
                    .any(|f| f.span.contains(&t.span))
            })
        })
}

/// One tag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOccurrence {
    name: String,
    origin: Option<ParsedTag>,
    deleted: bool,
}

impl TagOccurrence {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Option<&ParsedTag> {
        self.origin.as_ref()
    }

    fn is_rewritten(&self) -> bool {
        self.origin
            .as_ref()
            .is_some_and(|o| self.deleted || self.name != o.name)
    }

    fn edits(&self, original: &str, out: &mut Vec<Edit>) {
        let Some(origin) = &self.origin else {
            return;
        };
        let span = origin.span.range();
        if self.deleted {
            let alone = line_prefix(original, span.start).trim().is_empty()
                && line_suffix(original, span.end).trim().is_empty();
            let range = if alone {
                whole_line(original, span)
            } else {
                span
            };
            out.push(Edit::delete(range));
        } else if self.name != origin.name {
            out.push(Edit::replace(span, format!("#{}", self.name)));
        }
    }
}

/// All tags of a note body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineTags {
    tags: Vec<TagOccurrence>,
}

impl InlineTags {
    pub fn from_parsed(parsed: Vec<ParsedTag>) -> Self {
        let tags = parsed
            .into_iter()
            .map(|origin| TagOccurrence {
                name: origin.name.clone(),
                origin: Some(origin),
                deleted: false,
            })
            .collect();
        Self { tags }
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &TagOccurrence> {
        self.tags.iter().filter(|t| !t.deleted)
    }

    /// Distinct tag names in order of first occurrence.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for tag in self.occurrences() {
            if !names.contains(&tag.name) {
                names.push(tag.name.clone());
            }
        }
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.occurrences().any(|t| t.name == name)
    }

    pub fn add(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.tags.push(TagOccurrence {
            name: name.to_string(),
            origin: None,
            deleted: false,
        });
        true
    }

    /// Rename tags equal to `old` or below it (`old/...`).
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for tag in self.tags.iter_mut().filter(|t| !t.deleted) {
            if let Some(renamed) = rename_hierarchical(&tag.name, old, new)
                && renamed != tag.name
            {
                tag.name = renamed;
                changed = true;
            }
        }
        changed
    }

    /// Delete every occurrence of exactly `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        let mut changed = false;
        self.tags.retain_mut(|tag| {
            if tag.deleted || tag.name != name {
                return true;
            }
            changed = true;
            if tag.origin.is_none() {
                return false;
            }
            tag.deleted = true;
            true
        });
        changed
    }

    pub(crate) fn edits(&self, original: &str) -> Vec<Edit> {
        let mut out = Vec::new();
        for tag in &self.tags {
            tag.edits(original, &mut out);
        }
        out
    }

    pub(crate) fn inserted(&self) -> Vec<String> {
        self.occurrences()
            .filter(|t| t.origin.is_none())
            .map(|t| t.name.clone())
            .collect()
    }

    /// Tags added since parsing, as one line.
    pub(crate) fn inserted_line(&self) -> Option<String> {
        let inserted: Vec<String> = self
            .occurrences()
            .filter(|t| t.origin.is_none())
            .map(|t| format!("#{}", t.name))
            .collect();
        if inserted.is_empty() {
            None
        } else {
            Some(inserted.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::apply_edits;
    use crate::parser::{parse_inline_fields, parse_tags, Body};
    use pretty_assertions::assert_eq;

    fn inline(content: &str) -> InlineMetadata {
        InlineMetadata::from_parsed(parse_inline_fields(&Body::new(content, 0)))
    }

    fn tags(content: &str) -> InlineTags {
        InlineTags::from_parsed(parse_tags(&Body::new(content, 0)))
    }

    #[test]
    fn test_logical_view_collapses_duplicates() {
        let meta = inline("a:: 1\n[a:: 1] and [a:: 2]\nb::\n");
        assert_eq!(meta.keys(), vec!["a", "b"]);
        assert_eq!(meta.values("a"), vec!["1", "2"]);
        assert!(meta.values("b").is_empty());
        assert_eq!(meta.fields().count(), 4);
    }

    #[test]
    fn test_rename_key_keeps_markup() {
        let content = "**status**:: open\n";
        let mut meta = inline(content);
        assert!(meta.rename_key("status", "state"));
        assert_eq!(apply_edits(content, meta.edits(content)), "**state**:: open\n");
    }

    #[test]
    fn test_rename_value_in_brackets() {
        let content = "Due [when:: today] ok";
        let mut meta = inline(content);
        assert!(meta.rename_value("when", "today", "tomorrow"));
        assert_eq!(apply_edits(content, meta.edits(content)), "Due [when:: tomorrow] ok");
    }

    #[test]
    fn test_fill_bare_field() {
        let content = "reviewed::\n";
        let mut meta = inline(content);
        assert!(meta.add("reviewed", "yes"));
        assert!(meta.inserted_lines().is_empty());
        assert_eq!(apply_edits(content, meta.edits(content)), "reviewed:: yes\n");
    }

    #[test]
    fn test_add_idempotent() {
        let mut meta = inline("a:: 1\n");
        assert!(!meta.add("a", "1"));
        assert!(!meta.add("a", ""));
        assert!(meta.add("a", "2"));
        assert!(!meta.add("a", "2"));
        assert_eq!(meta.inserted_lines(), vec!["a:: 2"]);
    }

    #[test]
    fn test_delete_line_field_removes_line() {
        let content = "intro\nstatus:: done\noutro\n";
        let mut meta = inline(content);
        assert!(meta.remove_key("status"));
        assert_eq!(apply_edits(content, meta.edits(content)), "intro\noutro\n");
    }

    #[test]
    fn test_delete_list_field_keeps_marker() {
        let content = "- status:: done\n";
        let mut meta = inline(content);
        assert!(meta.remove_value("status", "done"));
        assert_eq!(apply_edits(content, meta.edits(content)), "- \n");
    }

    #[test]
    fn test_delete_bracketed_field() {
        let content = "Task [due:: monday] [owner:: sam]\n";
        let mut meta = inline(content);
        assert!(meta.remove_key("due"));
        assert_eq!(apply_edits(content, meta.edits(content)), "Task [owner:: sam]\n");
    }

    #[test]
    fn test_remove_last_value_removes_bare_fields() {
        let mut meta = inline("k::\nk:: v\n");
        assert!(meta.remove_value("k", "v"));
        assert!(!meta.contains_key("k"));
    }

    #[test]
    fn test_removing_inserted_field_drops_it() {
        let mut meta = InlineMetadata::default();
        assert!(meta.add("k", "v"));
        assert!(meta.remove_key("k"));
        assert!(meta.inserted_lines().is_empty());
    }

    #[test]
    fn test_tag_rename_and_delete() {
        let content = "See #project/alpha and #project/alpha.\n";
        let mut t = tags(content);
        assert!(t.rename("project", "initiative"));
        assert_eq!(t.names(), vec!["initiative/alpha"]);
        let renamed = apply_edits(content, t.edits(content));
        assert_eq!(renamed, "See #initiative/alpha and #initiative/alpha.\n");

        assert!(t.remove("initiative/alpha"));
        assert_eq!(apply_edits(content, t.edits(content)), "See  and .\n");
    }

    #[test]
    fn test_tag_alone_on_line_removes_line() {
        let content = "text\n#todo\nmore\n";
        let mut t = tags(content);
        assert!(t.remove("todo"));
        assert_eq!(apply_edits(content, t.edits(content)), "text\nmore\n");
    }

    #[test]
    fn test_tag_add_idempotent() {
        let mut t = tags("#a\n");
        assert!(!t.add("a"));
        assert!(t.add("b"));
        assert!(t.add("c"));
        assert_eq!(t.inserted_line(), Some("#b #c".to_string()));
    }

    #[test]
    fn test_rename_tag_prefix_only_on_segment() {
        let mut t = tags("#ab #a/b\n");
        assert!(t.rename("a", "z"));
        assert_eq!(t.names(), vec!["ab", "z/b"]);
    }

    #[test]
    fn test_delete_consecutive_last_lines() {
        let content = "intro\nk:: a\nk:: b";
        let mut meta = inline(content);
        assert!(meta.remove_key("k"));
        assert_eq!(apply_edits(content, meta.edits(content)), "intro");

        let content = "intro\n#x\n#x";
        let mut t = tags(content);
        assert!(t.remove("x"));
        assert_eq!(apply_edits(content, t.edits(content)), "intro");
    }

    #[test]
    fn test_accepts_value_respects_delimiters() {
        let meta = inline("Due [k:: a] ok\n(p:: b)\nline:: c\n");
        let field = |key: &str| meta.fields().find(|f| f.key() == key).unwrap();
        assert!(field("k").accepts_value("x y"));
        assert!(!field("k").accepts_value("x] y"));
        assert!(!field("p").accepts_value("x) y"));
        assert!(field("line").accepts_value("x] y"));
        assert!(!field("line").accepts_value("[a:: b]"));

        assert!(meta.accepts("new", "plain"));
        assert!(!meta.accepts("new", "(x:: y)"));
    }

    #[test]
    fn test_accepts_checks_bare_field_form() {
        let meta = inline("Task [due::]\n");
        assert!(meta.accepts("due", "friday"));
        assert!(!meta.accepts("due", "fri]day"));
    }

    #[test]
    fn test_detach_queues_fields() {
        let content = "a:: 1\nb::\n";
        let mut meta = inline(content);
        assert!(meta.detach());
        assert_eq!(meta.inserted_lines(), vec!["a:: 1", "b::"]);
        assert_eq!(apply_edits(content, meta.edits(content)), "");
        assert!(!InlineMetadata::default().detach());
    }
}
