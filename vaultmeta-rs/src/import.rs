//! Bulk import of metadata from a CSV file with `path,type,key,value`
//! columns.
//!
//! The whole file is validated against the index before anything is
//! applied; one bad row rejects the import.

use crate::engine::{self, Operation, PendingOperation};
use crate::error::{Result, VaultError};
use crate::scope::{Matcher, Scope};
use crate::types::MetaArea;
use crate::vault::VaultIndex;
use clap::ValueEnum;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// The columns an import file must have.
pub const IMPORT_COLUMNS: [&str; 4] = ["path", "type", "key", "value"];

/// How imported rows combine with the metadata already in a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImportMode {
    /// Only add; existing metadata is kept.
    #[default]
    Merge,
    /// Delete all metadata of each listed note first.
    Replace,
}

/// The `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Frontmatter,
    InlineMetadata,
    Tag,
}

impl ImportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "frontmatter" => Some(ImportKind::Frontmatter),
            "inline_metadata" => Some(ImportKind::InlineMetadata),
            "tag" => Some(ImportKind::Tag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Frontmatter => "frontmatter",
            ImportKind::InlineMetadata => "inline_metadata",
            ImportKind::Tag => "tag",
        }
    }
}

/// One row of an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRow {
    /// CSV line the row came from (1-indexed, header is line 1).
    pub line: usize,
    pub path: PathBuf,
    pub kind: ImportKind,
    pub key: String,
    pub value: String,
}

impl ImportRow {
    /// The add operation this row stands for.
    fn operation(&self) -> Operation {
        match self.kind {
            ImportKind::Tag => Operation::AddTag {
                tag: self.value.clone(),
            },
            ImportKind::Frontmatter | ImportKind::InlineMetadata => {
                let area = if self.kind == ImportKind::Frontmatter {
                    MetaArea::Frontmatter
                } else {
                    MetaArea::Inline
                };
                if self.value.is_empty() {
                    Operation::AddKey {
                        area,
                        key: self.key.clone(),
                    }
                } else {
                    Operation::AddValue {
                        area,
                        key: self.key.clone(),
                        value: self.value.clone(),
                    }
                }
            }
        }
    }

    fn error(&self, error: VaultError) -> VaultError {
        VaultError::import(format!("line {}: {}", self.line, error))
    }
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows: usize,
    /// Notes changed by the import, by path.
    pub affected: Vec<PathBuf>,
}

/// A validated import, grouped by note.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    rows: Vec<ImportRow>,
}

impl ImportPlan {
    /// Read and validate an import file.
    pub fn from_path(path: &Path, index: &VaultIndex) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, index)
    }

    /// Read and validate CSV data against the index.
    pub fn from_reader<R: Read>(reader: R, index: &VaultIndex) -> Result<Self> {
        let plan = Self::parse(reader)?;
        plan.validate(index)?;
        Ok(plan)
    }

    /// Read CSV data, checking only its shape.
    fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(VaultError::import("empty CSV file"));
        }
        let mut columns = [0usize; 4];
        for (slot, name) in columns.iter_mut().zip(IMPORT_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| VaultError::import(format!("missing '{}' column", name)))?;
        }
        let [path_col, type_col, key_col, value_col] = columns;

        let mut rows = Vec::new();
        for (i, record) in csv.records().enumerate() {
            let record = record?;
            let line = i + 2;
            let field = |col: usize| record.get(col).unwrap_or("").to_string();

            let kind_text = field(type_col);
            let kind = ImportKind::parse(&kind_text).ok_or_else(|| {
                VaultError::import(format!(
                    "line {}: invalid type '{}', must be one of 'frontmatter', 'inline_metadata', 'tag'",
                    line, kind_text
                ))
            })?;
            let path = field(path_col);
            if path.is_empty() {
                return Err(VaultError::import(format!("line {}: empty path", line)));
            }

            rows.push(ImportRow {
                line,
                path: PathBuf::from(path),
                kind,
                key: field(key_col),
                value: field(value_col),
            });
        }

        if rows.is_empty() {
            return Err(VaultError::import("CSV file has no rows"));
        }
        Ok(Self { rows })
    }

    /// Check that every path is indexed and every row is a valid add.
    pub fn validate(&self, index: &VaultIndex) -> Result<()> {
        for row in &self.rows {
            if !index.contains(&row.path) {
                return Err(VaultError::import(format!(
                    "line {}: '{}' does not exist in the vault; paths must be relative to the vault root",
                    row.line,
                    row.path.display()
                )));
            }
            row.operation().validate().map_err(|e| row.error(e))?;
        }
        Ok(())
    }

    pub fn rows(&self) -> &[ImportRow] {
        &self.rows
    }

    /// Distinct note paths in order of first appearance.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for row in &self.rows {
            if !paths.contains(&row.path) {
                paths.push(row.path.clone());
            }
        }
        paths
    }

    /// Apply the rows as add operations, each scoped to its note.
    ///
    /// The plan is validated again and applied to a copy of the index; the
    /// index only changes when every row applies.
    pub fn apply(self, index: &mut VaultIndex, mode: ImportMode) -> Result<ImportReport> {
        self.validate(index)?;
        let mut staged = index.clone();
        let mut affected: Vec<PathBuf> = Vec::new();
        let mut record = |paths: Vec<PathBuf>| {
            for path in paths {
                if !affected.contains(&path) {
                    affected.push(path);
                }
            }
        };

        for path in self.paths() {
            if mode == ImportMode::Replace {
                tracing::debug!(path = %path.display(), "replacing all metadata");
                let everything = Matcher::pattern(".*")?;
                for operation in [
                    Operation::DeleteKey {
                        key: everything.clone(),
                    },
                    Operation::DeleteTag { tag: everything },
                ] {
                    let report = engine::apply(
                        &mut staged,
                        PendingOperation::new(operation, Scope::document(path.clone())),
                    )?;
                    record(report.affected);
                }
            }

            for row in self.rows.iter().filter(|r| r.path == path) {
                let report = engine::apply(
                    &mut staged,
                    PendingOperation::new(row.operation(), Scope::document(path.clone())),
                )
                .map_err(|e| row.error(e))?;
                record(report.affected);
            }
        }

        *index = staged;
        affected.sort();
        Ok(ImportReport {
            rows: self.rows.len(),
            affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::types::InsertLocation;
    use crate::vault::VaultContext;
    use pretty_assertions::assert_eq;

    fn index() -> VaultIndex {
        let context = VaultContext {
            root: PathBuf::from("/vault"),
            exclude_paths: Vec::new(),
            insert_location: InsertLocation::Bottom,
        };
        VaultIndex::from_notes(
            context,
            vec![
                Note::parse("a.md", "---\nold: x\n---\n#stale\n"),
                Note::parse("b.md", "body\n"),
            ],
        )
    }

    fn import_error(csv: &str) -> String {
        match ImportPlan::from_reader(csv.as_bytes(), &index()) {
            Err(VaultError::ImportValidation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other.map(|p| p.rows.len())),
        }
    }

    #[test]
    fn test_validation_errors() {
        assert!(import_error("").contains("empty"));
        assert!(import_error("path,type,key\na.md,tag,,x\n").contains("'value'"));
        assert!(import_error("path,type,key,value\n").contains("no rows"));
        assert!(import_error("path,type,key,value\na.md,tags,,x\n").contains("invalid type"));
        assert!(import_error("path,type,key,value\nmissing.md,tag,,x\n").contains("does not exist"));
        assert!(import_error("path,type,key,value\na.md,tag,,two words\n").contains("line 2"));
    }

    #[test]
    fn test_merge_import() {
        let mut idx = index();
        let csv = "path,type,key,value\n\
                   a.md,frontmatter,status,new\n\
                   a.md,inline_metadata,owner,sam\n\
                   b.md,tag,,imported\n\
                   b.md,frontmatter,reviewed,\n";
        let plan = ImportPlan::from_reader(csv.as_bytes(), &idx).unwrap();
        assert_eq!(plan.paths(), vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
        let report = plan.apply(&mut idx, ImportMode::Merge).unwrap();
        assert_eq!(report.rows, 4);
        assert_eq!(report.affected.len(), 2);

        let a = idx.note(Path::new("a.md")).unwrap();
        assert_eq!(
            a.serialize(InsertLocation::Bottom),
            "---\nold: x\nstatus: new\n---\n#stale\nowner:: sam\n"
        );
        let b = idx.note(Path::new("b.md")).unwrap();
        assert_eq!(
            b.serialize(InsertLocation::Bottom),
            "---\nreviewed:\n---\nbody\n#imported\n"
        );
    }

    #[test]
    fn test_replace_import() {
        let mut idx = index();
        let csv = "path,type,key,value\na.md,frontmatter,status,new\n";
        let plan = ImportPlan::from_reader(csv.as_bytes(), &idx).unwrap();
        plan.apply(&mut idx, ImportMode::Replace).unwrap();
        let a = idx.note(Path::new("a.md")).unwrap();
        assert_eq!(a.serialize(InsertLocation::Bottom), "---\nstatus: new\n---\n");
        let b = idx.note(Path::new("b.md")).unwrap();
        assert_eq!(b.serialize(InsertLocation::Bottom), "body\n");
    }

    #[test]
    fn test_failed_validation_mutates_nothing() {
        let idx = index();
        let csv = "path,type,key,value\na.md,frontmatter,ok,1\nnope.md,tag,,x\n";
        assert!(ImportPlan::from_reader(csv.as_bytes(), &idx).is_err());
        assert!(idx.modified_notes().is_empty());
    }

    #[test]
    fn test_header_case_and_column_order() {
        let csv = "Value,Key,Type,Path\n1,k,Frontmatter,a.md\n";
        let plan = ImportPlan::parse(csv.as_bytes()).unwrap();
        assert_eq!(plan.rows()[0].kind, ImportKind::Frontmatter);
        assert_eq!(plan.rows()[0].path, PathBuf::from("a.md"));
        assert_eq!(plan.rows()[0].value, "1");
    }

    #[test]
    fn test_apply_validates_unchecked_plan() {
        let mut idx = index();
        let csv = "path,type,key,value
a.md,frontmatter,fine,1
b.md,tag,,two words
";
        let plan = ImportPlan::parse(csv.as_bytes()).unwrap();
        let result = plan.apply(&mut idx, ImportMode::Merge);
        assert!(matches!(result, Err(VaultError::ImportValidation(_))));
        assert!(idx.modified_notes().is_empty());
    }

    #[test]
    fn test_failing_row_leaves_index_untouched() {
        let context = VaultContext {
            root: PathBuf::from("/vault"),
            exclude_paths: Vec::new(),
            insert_location: InsertLocation::Bottom,
        };
        let mut idx = VaultIndex::from_notes(
            context,
            vec![
                Note::parse("a.md", "body\n"),
                Note::parse("b.md", "Task [due::]\n"),
            ],
        );
        let csv = "path,type,key,value
a.md,tag,,first
b.md,inline_metadata,due,fri]day
";
        let plan = ImportPlan::from_reader(csv.as_bytes(), &idx).unwrap();
        match plan.apply(&mut idx, ImportMode::Merge) {
            Err(VaultError::ImportValidation(msg)) => assert!(msg.starts_with("line 3")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(idx.modified_notes().is_empty());
    }
}
