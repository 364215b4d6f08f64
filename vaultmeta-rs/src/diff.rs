//! Line-level diffs between a note's original text and its serialization.

use crate::note::Note;
use crate::types::InsertLocation;
use crate::vault::VaultIndex;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::PathBuf;

/// Kind of a diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineChange {
    Added,
    Removed,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub change: LineChange,
    /// Line content without its line ending.
    pub text: String,
}

/// The pending changes of one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDiff {
    pub path: PathBuf,
    pub additions: usize,
    pub removals: usize,
    /// Changed lines with up to three lines of context, in hunks.
    pub hunks: Vec<Vec<DiffLine>>,
}

impl NoteDiff {
    /// Unified-style text: `+`, `-` and ` ` prefixes, hunks separated by
    /// `...`.
    pub fn render(&self) -> String {
        let mut output = String::new();
        for (idx, hunk) in self.hunks.iter().enumerate() {
            if idx > 0 {
                output.push_str("...\n");
            }
            for line in hunk {
                let sign = match line.change {
                    LineChange::Added => "+",
                    LineChange::Removed => "-",
                    LineChange::Context => " ",
                };
                output.push_str(sign);
                output.push_str(&line.text);
                output.push('\n');
            }
        }
        output
    }
}

/// Diff two texts line by line.
pub fn diff_texts(path: impl Into<PathBuf>, original: &str, modified: &str) -> NoteDiff {
    let diff = TextDiff::from_lines(original, modified);
    let mut additions = 0;
    let mut removals = 0;
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(3) {
        let mut hunk = Vec::new();
        for op in &group {
            for change in diff.iter_changes(op) {
                let kind = match change.tag() {
                    ChangeTag::Delete => {
                        removals += 1;
                        LineChange::Removed
                    }
                    ChangeTag::Insert => {
                        additions += 1;
                        LineChange::Added
                    }
                    ChangeTag::Equal => LineChange::Context,
                };
                hunk.push(DiffLine {
                    change: kind,
                    text: change.value().trim_end_matches(['\n', '\r']).to_string(),
                });
            }
        }
        hunks.push(hunk);
    }

    NoteDiff {
        path: path.into(),
        additions,
        removals,
        hunks,
    }
}

/// Diff of a note's pending changes, or `None` if it has none.
pub fn diff_note(note: &Note, location: InsertLocation) -> Option<NoteDiff> {
    let modified = note.serialize(location);
    if modified == note.original() {
        return None;
    }
    Some(diff_texts(note.path(), note.original(), &modified))
}

/// Diffs of every modified note, by path. Never changes the index.
pub fn preview(index: &VaultIndex) -> Vec<NoteDiff> {
    let location = index.insert_location();
    index
        .notes()
        .iter()
        .filter_map(|note| diff_note(note, location))
        .collect()
}
