//! The transformation engine: a fixed catalogue of metadata operations
//! applied to every note in a scope.
//!
//! Operations are validated before any note is touched, act on each note
//! independently, and only change the in-memory models. Nothing is written
//! until a commit.

use crate::error::{Result, VaultError};
use crate::note::Note;
use crate::parser::{is_valid_inline_key, is_valid_tag};
use crate::scope::{Matcher, Scope};
use crate::types::{InsertLocation, MetaArea};
use crate::vault::VaultIndex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A metadata operation.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Add a key with no value.
    AddKey { area: MetaArea, key: String },
    /// Add a value under a key, creating the key if needed.
    AddValue {
        area: MetaArea,
        key: String,
        value: String,
    },
    AddTag { tag: String },
    /// Rename a key in both areas. Value sets merge if `new` exists.
    RenameKey { old: String, new: String },
    RenameValue {
        key: String,
        old: String,
        new: String,
    },
    /// Rename a tag and every tag below it.
    RenameTag { old: String, new: String },
    DeleteKey { key: Matcher },
    DeleteValue { key: Matcher, value: Matcher },
    DeleteTag { tag: Matcher },
    /// Move a key, or a single value of it, to the other area. Without a
    /// key every key of the other area moves.
    Transpose {
        to: MetaArea,
        key: Option<String>,
        value: Option<String>,
    },
    /// Rewrite every inline field of a note at one location.
    MoveInline { location: InsertLocation },
}

impl Operation {
    /// Short name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::AddKey { .. } => "add_key",
            Operation::AddValue { .. } => "add_value",
            Operation::AddTag { .. } => "add_tag",
            Operation::RenameKey { .. } => "rename_key",
            Operation::RenameValue { .. } => "rename_value",
            Operation::RenameTag { .. } => "rename_tag",
            Operation::DeleteKey { .. } => "delete_key",
            Operation::DeleteValue { .. } => "delete_value",
            Operation::DeleteTag { .. } => "delete_tag",
            Operation::Transpose { .. } => "transpose",
            Operation::MoveInline { .. } => "move_inline",
        }
    }

    /// Check every target before any note is touched.
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::AddKey { area, key } => validate_new_key(key, *area == MetaArea::Inline),
            Operation::AddValue { area, key, value } => {
                validate_new_key(key, *area == MetaArea::Inline)?;
                validate_value(value)
            }
            Operation::AddTag { tag } => validate_tag(tag),
            Operation::RenameKey { old, new } => {
                validate_existing(old, "key")?;
                validate_new_key(new, true)
            }
            Operation::RenameValue { key, old, new } => {
                validate_existing(key, "key")?;
                validate_existing(old, "value")?;
                validate_value(new)
            }
            Operation::RenameTag { old, new } => {
                validate_existing(strip_hash(old), "tag")?;
                validate_tag(new)
            }
            Operation::DeleteKey { key } => validate_matcher(key, "key"),
            Operation::DeleteValue { key, value } => {
                validate_matcher(key, "key")?;
                validate_matcher(value, "value")
            }
            Operation::DeleteTag { tag } => validate_matcher(tag, "tag"),
            Operation::Transpose { key, value, .. } => match (key, value) {
                (Some(key), value) => {
                    validate_existing(key, "key")?;
                    match value {
                        Some(value) => validate_existing(value, "value"),
                        None => Ok(()),
                    }
                }
                (None, Some(value)) => Err(VaultError::invalid_target(format!(
                    "value '{}' given without a key",
                    value
                ))),
                (None, None) => Ok(()),
            },
            Operation::MoveInline { .. } => Ok(()),
        }
    }

    /// Check that every value written into inline text reads back as the
    /// same key and value in this note.
    fn check_note(&self, note: &Note) -> Result<()> {
        let (key, value) = match self {
            Operation::AddValue {
                area: MetaArea::Inline,
                key,
                value,
            } if !note.inline().accepts(key, value) => (key, value),
            Operation::RenameValue { key, old, new }
                if note
                    .inline()
                    .fields()
                    .any(|f| f.key() == key && f.value() == old && !f.accepts_value(new)) =>
            {
                (key, new)
            }
            _ => return Ok(()),
        };
        Err(VaultError::invalid_target(format!(
            "'{}' would not read back as a value of '{}' in {}",
            value,
            key,
            note.path().display()
        )))
    }

    /// Apply to one note. Returns whether the note changed.
    fn apply_to(&self, note: &mut Note) -> bool {
        match self {
            Operation::AddKey { area, key } => note.add_key(*area, key),
            Operation::AddValue { area, key, value } => note.add_value(*area, key, value),
            Operation::AddTag { tag } => note.add_tag(strip_hash(tag)),
            Operation::RenameKey { old, new } => note.rename_key(old, new),
            Operation::RenameValue { key, old, new } => note.rename_value(key, old, new),
            Operation::RenameTag { old, new } => note.rename_tag(strip_hash(old), strip_hash(new)),
            Operation::DeleteKey { key } => {
                let mut changed = false;
                for k in key.select(&note.all_keys()) {
                    changed |= note.remove_key(&k);
                }
                changed
            }
            Operation::DeleteValue { key, value } => {
                let mut changed = false;
                for k in key.select(&note.all_keys()) {
                    for v in value.select(&note.all_values(&k)) {
                        changed |= note.remove_value(&k, &v);
                    }
                }
                changed
            }
            Operation::DeleteTag { tag } => {
                let mut changed = false;
                for t in select_tags(tag, &note.tags()) {
                    changed |= note.remove_tag(&t);
                }
                changed
            }
            Operation::Transpose { to, key, value } => match (key, value) {
                (Some(key), Some(value)) => note.transpose_value(*to, key, value),
                (Some(key), None) => note.transpose_key(*to, key),
                (None, _) => note.transpose_all(*to),
            },
            Operation::MoveInline { location } => note.move_inline(*location),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddKey { area, key } => write!(f, "add key '{}' to {}", key, area),
            Operation::AddValue { area, key, value } => {
                write!(f, "add '{}: {}' to {}", key, value, area)
            }
            Operation::AddTag { tag } => write!(f, "add tag #{}", strip_hash(tag)),
            Operation::RenameKey { old, new } => write!(f, "rename key '{}' to '{}'", old, new),
            Operation::RenameValue { key, old, new } => {
                write!(f, "rename '{}' value '{}' to '{}'", key, old, new)
            }
            Operation::RenameTag { old, new } => {
                write!(f, "rename tag #{} to #{}", strip_hash(old), strip_hash(new))
            }
            Operation::DeleteKey { key } => write!(f, "delete key {}", key),
            Operation::DeleteValue { key, value } => write!(f, "delete value {} of {}", value, key),
            Operation::DeleteTag { tag } => write!(f, "delete tag {}", tag),
            Operation::Transpose { to, key: Some(key), value: Some(value) } => {
                write!(f, "move '{}: {}' to {}", key, value, to)
            }
            Operation::Transpose { to, key: Some(key), value: None } => {
                write!(f, "move key '{}' to {}", key, to)
            }
            Operation::Transpose { to, key: None, .. } => write!(f, "move all metadata to {}", to),
            Operation::MoveInline { location } => {
                write!(f, "move inline metadata to {}", location)
            }
        }
    }
}

/// An operation bound to a scope, consumed when applied.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    operation: Operation,
    scope: Scope,
}

impl PendingOperation {
    pub fn new(operation: Operation, scope: Scope) -> Self {
        Self { operation, scope }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// What an operation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    pub operation: String,
    /// Notes changed by the operation, by path.
    pub affected: Vec<PathBuf>,
}

impl OperationReport {
    pub fn count(&self) -> usize {
        self.affected.len()
    }
}

/// Apply a pending operation to every note in its scope.
///
/// Returns `InvalidTarget` without touching any note if a target is
/// malformed or a value could not be written into a note in scope. Notes
/// outside the scope are never touched.
pub fn apply(index: &mut VaultIndex, pending: PendingOperation) -> Result<OperationReport> {
    let PendingOperation { operation, scope } = pending;
    operation.validate()?;
    for note in index.notes().iter().filter(|n| scope.matches(n)) {
        operation.check_note(note)?;
    }

    let mut report = OperationReport {
        operation: operation.to_string(),
        affected: Vec::new(),
    };
    for note in index.notes_mut() {
        if !scope.matches(note) {
            continue;
        }
        if operation.apply_to(note) {
            tracing::debug!(path = %note.path().display(), operation = operation.kind(), "note changed");
            report.affected.push(note.path().to_path_buf());
        }
    }

    tracing::info!(
        operation = operation.kind(),
        affected = report.count(),
        "applied operation"
    );
    Ok(report)
}

fn select_tags(matcher: &Matcher, tags: &[String]) -> Vec<String> {
    match matcher {
        Matcher::Exact(name) => {
            let name = strip_hash(name);
            tags.iter().filter(|t| *t == name).cloned().collect()
        }
        Matcher::Pattern(_) => matcher.select(tags),
    }
}

fn strip_hash(tag: &str) -> &str {
    tag.strip_prefix('#').unwrap_or(tag)
}

fn validate_existing(target: &str, what: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(VaultError::invalid_target(format!("{} is empty", what)));
    }
    if target.contains(['\n', '\r']) {
        return Err(VaultError::invalid_target(format!(
            "{} '{}' contains a newline",
            what, target
        )));
    }
    Ok(())
}

/// A key that will be written. Inline keys must read back as the same key.
fn validate_new_key(key: &str, inline: bool) -> Result<()> {
    validate_existing(key, "key")?;
    if key != key.trim() {
        return Err(VaultError::invalid_target(format!(
            "key '{}' has surrounding whitespace",
            key
        )));
    }
    if key.contains("::") || key.contains(['#', '[', ']', '(', ')']) {
        return Err(VaultError::invalid_target(format!(
            "key '{}' contains a structural delimiter",
            key
        )));
    }
    if inline && !is_valid_inline_key(key) {
        return Err(VaultError::invalid_target(format!(
            "key '{}' cannot be used as inline metadata",
            key
        )));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<()> {
    validate_existing(value, "value")?;
    if value != value.trim() {
        return Err(VaultError::invalid_target(format!(
            "value '{}' has surrounding whitespace",
            value
        )));
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<()> {
    let name = strip_hash(tag);
    if !is_valid_tag(name) {
        return Err(VaultError::invalid_target(format!("invalid tag '{}'", tag)));
    }
    Ok(())
}

fn validate_matcher(matcher: &Matcher, what: &str) -> Result<()> {
    match matcher {
        Matcher::Exact(target) => validate_existing(target, what),
        Matcher::Pattern(_) => Ok(()),
    }
}
