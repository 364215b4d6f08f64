//! YAML frontmatter splitting and top-level entry segmentation.

use crate::value::FieldValue;
use serde_yaml::Value;
use std::ops::Range;

/// Frontmatter extraction result. All offsets are byte offsets into the
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    /// The raw YAML (without delimiters), if a block is present.
    pub yaml: Option<&'a str>,
    /// The whole block, delimiter lines included.
    pub block: Option<Range<usize>>,
    /// The opening delimiter line, including its line ending.
    pub opening: &'a str,
    /// The closing delimiter line, including its line ending (if any).
    pub closing: &'a str,
    /// Where the body starts.
    pub body_start: usize,
}

impl<'a> FrontmatterSplit<'a> {
    fn none() -> Self {
        Self {
            yaml: None,
            block: None,
            opening: "",
            closing: "",
            body_start: 0,
        }
    }
}

/// Split content into frontmatter and body.
///
/// The block must start on the very first line with `---` and is closed by
/// the next line consisting of `---`. Without a closing line there is no
/// block.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    let mut lines = content.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return FrontmatterSplit::none();
    };
    if !is_delimiter(first) || !first.ends_with('\n') {
        return FrontmatterSplit::none();
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            let end = offset + line.len();
            return FrontmatterSplit {
                yaml: Some(&content[yaml_start..offset]),
                block: Some(0..end),
                opening: first,
                closing: line,
                body_start: end,
            };
        }
        offset += line.len();
    }

    FrontmatterSplit::none()
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).trim_end() == "---"
}

/// Parse the YAML of a block into ordered top-level entries.
///
/// An empty block is an empty mapping. Anything that is not a mapping, or
/// does not parse, is reported as an error message.
pub fn parse_yaml_mapping(yaml: &str) -> std::result::Result<Vec<(String, FieldValue)>, String> {
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(map) => match FieldValue::from_yaml(&Value::Mapping(map)) {
            FieldValue::Mapping(entries) => Ok(entries),
            _ => Ok(Vec::new()),
        },
        Value::Tagged(tagged) => Err(format!("unexpected tag {}", tagged.tag)),
        _ => Err("frontmatter is not a key/value mapping".to_string()),
    }
}

/// The source text of one top-level entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<'a> {
    /// Key as written (unquoted).
    pub key: String,
    /// Entry text: the key line and all continuation lines.
    pub text: &'a str,
    /// Range of the key token within `text` (quotes included).
    pub key_range: Range<usize>,
}

/// Block YAML cut into top-level entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegments<'a> {
    /// Comments and blank lines before the first entry.
    pub preamble: &'a str,
    pub entries: Vec<RawEntry<'a>>,
}

/// Cut the YAML of a block into its top-level entries.
///
/// A line starting at column 0 with a key followed by `:` starts an entry.
/// Everything up to the next such line (indented values, sequence items,
/// comments) belongs to it.
pub fn segment_entries(yaml: &str) -> RawSegments<'_> {
    let mut starts: Vec<(usize, String, Range<usize>)> = Vec::new();
    let mut offset = 0;
    for line in yaml.split_inclusive('\n') {
        if let Some((key, range)) = entry_key(line) {
            starts.push((offset, key, range));
        }
        offset += line.len();
    }

    let preamble_end = starts.first().map(|(start, _, _)| *start).unwrap_or(yaml.len());
    let mut entries = Vec::with_capacity(starts.len());
    for (i, (start, key, key_range)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|(s, _, _)| *s).unwrap_or(yaml.len());
        entries.push(RawEntry {
            key: key.clone(),
            text: &yaml[*start..end],
            key_range: key_range.clone(),
        });
    }

    RawSegments {
        preamble: &yaml[..preamble_end],
        entries,
    }
}

/// Read the key of a top-level entry line.
fn entry_key(line: &str) -> Option<(String, Range<usize>)> {
    let text = line.trim_end_matches(['\n', '\r']);
    let first = text.chars().next()?;
    if first.is_whitespace() || matches!(first, '-' | '#' | '?' | '[' | '{' | '.' | '%') {
        return None;
    }

    let (key, key_end) = match first {
        '"' => double_quoted(text)?,
        '\'' => single_quoted(text)?,
        _ => {
            let colon = plain_key_end(text)?;
            let key = text[..colon].trim_end();
            if key.is_empty() {
                return None;
            }
            (key.to_string(), key.len())
        }
    };

    let rest = text[key_end..].trim_start_matches([' ', '\t']);
    let after = rest.strip_prefix(':')?;
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }
    Some((key, 0..key_end))
}

// Position of the first ':' followed by whitespace or the end of the line.
fn plain_key_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b':' && matches!(bytes.get(i + 1), None | Some(b' ') | Some(b'\t')) {
            return Some(i);
        }
        if *b == b' ' && bytes.get(i + 1) == Some(&b'#') {
            return None;
        }
    }
    None
}

fn double_quoted(text: &str) -> Option<(String, usize)> {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => {
                let literal = &text[..=i];
                let key = serde_json::from_str::<String>(literal)
                    .unwrap_or_else(|_| literal[1..literal.len() - 1].to_string());
                return Some((key, i + 1));
            }
            _ => escaped = false,
        }
    }
    None
}

fn single_quoted(text: &str) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            let key = text[1..i].replace("''", "'");
            return Some((key, i + 1));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_frontmatter_basic() {
        let content = "---\ntitle: Test\n---\n# Body";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("title: Test\n"));
        assert_eq!(split.block, Some(0..20));
        assert_eq!(&content[split.body_start..], "# Body");
        assert_eq!(split.closing, "---\n");
    }

    #[test]
    fn test_split_frontmatter_empty_block() {
        let split = split_frontmatter("---\n---\nbody");
        assert_eq!(split.yaml, Some(""));
        assert_eq!(split.body_start, 8);
    }

    #[test]
    fn test_split_frontmatter_closing_at_eof() {
        let content = "---\na: 1\n---";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("a: 1\n"));
        assert_eq!(split.closing, "---");
        assert_eq!(split.body_start, content.len());
    }

    #[test]
    fn test_split_frontmatter_crlf() {
        let content = "---\r\na: 1\r\n---\r\nbody";
        let split = split_frontmatter(content);
        assert_eq!(split.yaml, Some("a: 1\r\n"));
        assert_eq!(&content[split.body_start..], "body");
    }

    #[test]
    fn test_no_frontmatter() {
        assert_eq!(split_frontmatter("# Title\n---\n").yaml, None);
        assert_eq!(split_frontmatter("---\nno close\n").yaml, None);
        assert_eq!(split_frontmatter("").yaml, None);
        assert_eq!(split_frontmatter("---").yaml, None);
    }

    #[test]
    fn test_parse_yaml_mapping() {
        let entries = parse_yaml_mapping("b: 1\na: [x, y]\n").unwrap();
        assert_eq!(entries[0].0, "b");
        assert_eq!(entries[1].0, "a");
        assert!(parse_yaml_mapping("").unwrap().is_empty());
        assert!(parse_yaml_mapping("# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_yaml_mapping_errors() {
        assert!(parse_yaml_mapping("a: [unclosed\n").is_err());
        assert!(parse_yaml_mapping("- just\n- a list\n").is_err());
        assert!(parse_yaml_mapping("plain text\n").is_err());
    }

    #[test]
    fn test_segment_entries() {
        let yaml = "# comment\ntitle: Hello\ntags:\n  - a\n  - b\nstatus: [new]\n";
        let segments = segment_entries(yaml);
        assert_eq!(segments.preamble, "# comment\n");
        let keys: Vec<_> = segments.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "tags", "status"]);
        assert_eq!(segments.entries[1].text, "tags:\n  - a\n  - b\n");
        assert_eq!(segments.entries[2].key_range, 0..6);
    }

    #[test]
    fn test_segment_quoted_keys() {
        let yaml = "\"my key\": 1\n'it''s': 2\nurl: http://example.com\n";
        let segments = segment_entries(yaml);
        let keys: Vec<_> = segments.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["my key", "it's", "url"]);
        assert_eq!(segments.entries[0].key_range, 0..8);
    }

    #[test]
    fn test_segment_top_level_sequence_lines_ignored() {
        let yaml = "tags:\n- a\n- b\nnext: x\n";
        let segments = segment_entries(yaml);
        assert_eq!(segments.entries.len(), 2);
        assert_eq!(segments.entries[0].text, "tags:\n- a\n- b\n");
    }
}
