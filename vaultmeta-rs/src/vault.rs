//! Vault context and the in-memory index of its notes.

use crate::error::{Result, VaultError};
use crate::note::{Note, ParseDiagnostic};
use crate::scope::Scope;
use crate::types::{InsertLocation, MetaArea};
use glob::glob;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Paths excluded from a vault unless configured otherwise.
pub fn default_exclude_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(".git"), PathBuf::from(".obsidian")]
}

/// Vault-wide settings shared by the index, the engine and the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultContext {
    /// Root path of the vault.
    pub root: PathBuf,
    /// Paths relative to the root whose contents are never indexed.
    pub exclude_paths: Vec<PathBuf>,
    /// Where new inline metadata and tags are written.
    pub insert_location: InsertLocation,
}

impl VaultContext {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VaultError::VaultNotFound(root));
        }
        Ok(Self {
            root,
            exclude_paths: default_exclude_paths(),
            insert_location: InsertLocation::default(),
        })
    }

    pub fn with_exclude_paths(mut self, exclude_paths: Vec<PathBuf>) -> Self {
        self.exclude_paths = exclude_paths;
        self
    }

    pub fn with_insert_location(mut self, insert_location: InsertLocation) -> Self {
        self.insert_location = insert_location;
        self
    }

    /// Get the full path to a note.
    pub fn note_path(&self, relative_path: &Path) -> PathBuf {
        self.root.join(relative_path)
    }

    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        self.exclude_paths
            .iter()
            .any(|excluded| relative_path.starts_with(excluded))
    }

    /// List all markdown files in the vault, relative to the root and sorted.
    pub fn list_notes(&self) -> Result<Vec<PathBuf>> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{}/**/*", root.trim_end_matches('/'));

        let mut notes = Vec::new();
        for entry in glob(&pattern)? {
            match entry {
                Ok(path) => {
                    if !path.is_file() || !is_markdown(&path) {
                        continue;
                    }
                    if let Ok(relative) = path.strip_prefix(&self.root)
                        && !self.is_excluded(relative)
                    {
                        notes.push(relative.to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "glob error");
                }
            }
        }

        notes.sort();
        Ok(notes)
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
}

/// A document left out of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNote {
    pub path: PathBuf,
    pub reason: String,
}

/// A parse diagnostic with the note it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDiagnostic {
    pub path: PathBuf,
    #[serde(flatten)]
    pub diagnostic: ParseDiagnostic,
}

/// Summary of an index.
#[derive(Debug, Clone, Serialize)]
pub struct VaultInfo {
    pub root: PathBuf,
    pub insert_location: InsertLocation,
    pub notes: usize,
    /// Notes selected by the scope the summary was taken with.
    pub in_scope: usize,
    pub modified: usize,
    pub skipped: Vec<SkippedNote>,
    pub diagnostics: Vec<NoteDiagnostic>,
}

/// Union of the metadata of a set of notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataSummary {
    pub notes: usize,
    pub frontmatter: BTreeMap<String, BTreeSet<String>>,
    pub inline_metadata: BTreeMap<String, BTreeSet<String>>,
    pub tags: BTreeSet<String>,
}

/// All notes of a vault, parsed once per run.
#[derive(Debug, Clone)]
pub struct VaultIndex {
    context: VaultContext,
    notes: Vec<Note>,
    skipped: Vec<SkippedNote>,
}

impl VaultIndex {
    /// Read and parse every included document.
    ///
    /// Documents that cannot be read or decoded are skipped with a warning.
    pub fn build(context: VaultContext) -> Result<Self> {
        let mut notes = Vec::new();
        let mut skipped = Vec::new();

        for relative in context.list_notes()? {
            let bytes = match std::fs::read(context.note_path(&relative)) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %relative.display(), error = %e, "skipping unreadable note");
                    skipped.push(SkippedNote {
                        path: relative,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            match Note::from_bytes(relative.clone(), &bytes) {
                Ok(note) => notes.push(note),
                Err(e) => {
                    tracing::warn!(path = %relative.display(), error = %e, "skipping note");
                    skipped.push(SkippedNote {
                        path: relative,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(notes = notes.len(), skipped = skipped.len(), "indexed vault");
        Ok(Self {
            context,
            notes,
            skipped,
        })
    }

    /// Build an index from already parsed notes.
    pub fn from_notes(context: VaultContext, mut notes: Vec<Note>) -> Self {
        notes.sort_by(|a, b| a.path().cmp(b.path()));
        Self {
            context,
            notes,
            skipped: Vec::new(),
        }
    }

    pub fn context(&self) -> &VaultContext {
        &self.context
    }

    pub fn insert_location(&self) -> InsertLocation {
        self.context.insert_location
    }

    /// Notes sorted by path.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub(crate) fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    pub fn note(&self, path: &Path) -> Option<&Note> {
        self.notes.iter().find(|n| n.path() == path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.note(path).is_some()
    }

    pub fn skipped(&self) -> &[SkippedNote] {
        &self.skipped
    }

    pub fn in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a Note> + 'a {
        self.notes.iter().filter(move |n| scope.matches(n))
    }

    /// Notes whose serialization differs from their original text, by path.
    pub fn modified_notes(&self) -> Vec<&Note> {
        let location = self.insert_location();
        self.notes
            .iter()
            .filter(|n| n.is_modified(location))
            .collect()
    }

    pub fn info(&self, scope: &Scope) -> VaultInfo {
        let diagnostics = self
            .notes
            .iter()
            .flat_map(|note| {
                note.diagnostics().iter().map(|d| NoteDiagnostic {
                    path: note.path().to_path_buf(),
                    diagnostic: d.clone(),
                })
            })
            .collect();

        VaultInfo {
            root: self.context.root.clone(),
            insert_location: self.insert_location(),
            notes: self.notes.len(),
            in_scope: self.in_scope(scope).count(),
            modified: self.modified_notes().len(),
            skipped: self.skipped.clone(),
            diagnostics,
        }
    }

    /// Union of keys, values and tags over the notes in scope.
    pub fn metadata_summary(&self, scope: &Scope) -> MetadataSummary {
        let mut summary = MetadataSummary::default();
        for note in self.in_scope(scope) {
            summary.notes += 1;
            for (area, target) in [
                (MetaArea::Frontmatter, &mut summary.frontmatter),
                (MetaArea::Inline, &mut summary.inline_metadata),
            ] {
                for key in note.keys(area) {
                    let values = note.values(area, &key);
                    target.entry(key).or_default().extend(values);
                }
            }
            summary.tags.extend(note.tags());
        }
        summary
    }
}
