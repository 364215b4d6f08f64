//! Frontmatter values as a tagged variant.
//!
//! YAML is parsed with `serde_yaml` and immediately converted into
//! [`FieldValue`], so the rest of the crate walks an explicit tree instead of
//! a dynamically-typed document.

use regex::Regex;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_yaml::Value as YamlValue;
use std::sync::LazyLock;

/// A frontmatter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A single scalar. YAML numbers and booleans are kept in their source
    /// spelling; `null` and empty values are the empty string.
    Scalar(String),
    /// A sequence of values.
    Sequence(Vec<FieldValue>),
    /// A nested mapping, in source order.
    Mapping(Vec<(String, FieldValue)>),
}

impl FieldValue {
    /// The empty scalar (`key:` with no value).
    pub fn empty() -> Self {
        FieldValue::Scalar(String::new())
    }

    /// Convert a parsed YAML value.
    pub fn from_yaml(value: &YamlValue) -> Self {
        match value {
            YamlValue::Null => FieldValue::empty(),
            YamlValue::Bool(b) => FieldValue::Scalar(b.to_string()),
            YamlValue::Number(n) => FieldValue::Scalar(n.to_string()),
            YamlValue::String(s) => FieldValue::Scalar(s.clone()),
            YamlValue::Sequence(seq) => {
                FieldValue::Sequence(seq.iter().map(FieldValue::from_yaml).collect())
            }
            YamlValue::Mapping(map) => FieldValue::Mapping(
                map.iter()
                    .map(|(k, v)| (yaml_key_to_string(k), FieldValue::from_yaml(v)))
                    .collect(),
            ),
            YamlValue::Tagged(tagged) => FieldValue::from_yaml(&tagged.value),
        }
    }

    /// Convert back into a YAML value (used to render nested mappings).
    pub fn to_yaml(&self) -> YamlValue {
        match self {
            FieldValue::Scalar(s) if s.is_empty() => YamlValue::Null,
            FieldValue::Scalar(s) => YamlValue::String(s.clone()),
            FieldValue::Sequence(items) => {
                YamlValue::Sequence(items.iter().map(FieldValue::to_yaml).collect())
            }
            FieldValue::Mapping(entries) => {
                let mut map = serde_yaml::Mapping::new();
                for (k, v) in entries {
                    map.insert(YamlValue::String(k.clone()), v.to_yaml());
                }
                YamlValue::Mapping(map)
            }
        }
    }

    /// The addressable values of a key: the scalar itself, or the scalar
    /// items of a sequence. Nested mappings expose no values.
    pub fn values(&self) -> Vec<String> {
        match self {
            FieldValue::Scalar(s) if s.is_empty() => Vec::new(),
            FieldValue::Scalar(s) => vec![s.clone()],
            FieldValue::Sequence(items) => items
                .iter()
                .filter_map(|item| match item {
                    FieldValue::Scalar(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            FieldValue::Mapping(_) => Vec::new(),
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, FieldValue::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, FieldValue::Sequence(_))
    }

    /// Remove repeated scalar items from a sequence, keeping first occurrences.
    pub fn dedup(self) -> Self {
        match self {
            FieldValue::Sequence(items) => {
                let mut kept: Vec<FieldValue> = Vec::with_capacity(items.len());
                for item in items {
                    if !kept.contains(&item) {
                        kept.push(item);
                    }
                }
                FieldValue::Sequence(kept)
            }
            other => other,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Scalar(s) => serializer.serialize_str(s),
            FieldValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

fn yaml_key_to_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

// A plain YAML scalar must not start with an indicator character, must not
// contain ": " or " #", and must not end with ':' or whitespace.
static PLAIN_SCALAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^\s\-?:,\[\]{}#&*!|>'"%@`][^\n]*$"#).unwrap()
});

/// Render a scalar for YAML output, quoting only when a plain scalar would
/// not read back as the same string. `flow` marks a position inside `[...]`.
pub fn render_scalar(value: &str, flow: bool) -> String {
    let plain = PLAIN_SCALAR.is_match(value)
        && !value.contains(": ")
        && !value.contains(" #")
        && !value.ends_with(':')
        && !value.ends_with(char::is_whitespace)
        && !(flow && value.contains([',', '[', ']', '{', '}']))
        && reads_back_as(value);

    if plain {
        value.to_string()
    } else {
        // A JSON string literal is a valid YAML double-quoted scalar.
        serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
    }
}

// Plain text that YAML would resolve to null, or to a number spelled
// differently (`1e3`, `0x10`), has to be quoted.
fn reads_back_as(value: &str) -> bool {
    match serde_yaml::from_str::<YamlValue>(value) {
        Ok(YamlValue::String(s)) => s == value,
        Ok(YamlValue::Number(n)) => n.to_string() == value,
        Ok(YamlValue::Bool(b)) => b.to_string() == value,
        _ => false,
    }
}
