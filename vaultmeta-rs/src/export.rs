//! Export note metadata to CSV, JSON or the import template.

use crate::error::Result;
use crate::import::IMPORT_COLUMNS;
use crate::note::{MetadataSnapshot, Note};
use crate::scope::Scope;
use crate::types::MetaArea;
use crate::value::FieldValue;
use crate::vault::VaultIndex;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

/// Separator between multiple values in one CSV cell.
pub const VALUE_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// One row per note, one column per key.
    #[default]
    Csv,
    /// Array of per-note metadata objects.
    Json,
    /// `path,type,key,value` rows, readable by `import`.
    Template,
}

/// Statistics from an export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub notes: usize,
    pub rows: usize,
}

/// Export the metadata of the notes in scope.
pub fn export<W: Write>(
    index: &VaultIndex,
    scope: &Scope,
    format: ExportFormat,
    writer: W,
) -> Result<ExportStats> {
    let notes: Vec<&Note> = index.in_scope(scope).collect();
    let stats = match format {
        ExportFormat::Csv => export_csv(&notes, writer)?,
        ExportFormat::Json => export_json(&notes, writer)?,
        ExportFormat::Template => export_template(&notes, writer)?,
    };
    tracing::debug!(?format, notes = stats.notes, rows = stats.rows, "exported metadata");
    Ok(stats)
}

fn cell(value: &FieldValue) -> Result<String> {
    if value.is_mapping() {
        return Ok(serde_json::to_string(value)?);
    }
    Ok(value.values().join(VALUE_SEPARATOR))
}

fn export_csv<W: Write>(notes: &[&Note], writer: W) -> Result<ExportStats> {
    let mut frontmatter_keys: Vec<String> = Vec::new();
    let mut inline_keys: Vec<String> = Vec::new();
    for note in notes {
        for (area, keys) in [
            (MetaArea::Frontmatter, &mut frontmatter_keys),
            (MetaArea::Inline, &mut inline_keys),
        ] {
            for key in note.keys(area) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
    }
    frontmatter_keys.sort();
    inline_keys.sort();

    let mut csv = csv::Writer::from_writer(writer);
    let mut headers = vec!["path".to_string()];
    headers.extend(frontmatter_keys.iter().map(|k| format!("frontmatter.{}", k)));
    headers.extend(inline_keys.iter().map(|k| format!("inline.{}", k)));
    headers.push("tags".to_string());
    csv.write_record(&headers)?;

    for note in notes {
        let frontmatter = note.frontmatter();
        let inline = note.inline_metadata();

        let mut record = vec![note.path().to_string_lossy().into_owned()];
        for key in &frontmatter_keys {
            record.push(match frontmatter.get(key) {
                Some(value) => cell(value)?,
                None => String::new(),
            });
        }
        for key in &inline_keys {
            record.push(
                inline
                    .get(key)
                    .map(|values| values.join(VALUE_SEPARATOR))
                    .unwrap_or_default(),
            );
        }
        record.push(note.tags().join(VALUE_SEPARATOR));
        csv.write_record(&record)?;
    }
    csv.flush()?;

    Ok(ExportStats {
        notes: notes.len(),
        rows: notes.len(),
    })
}

fn export_json<W: Write>(notes: &[&Note], mut writer: W) -> Result<ExportStats> {
    let snapshots: Vec<MetadataSnapshot> = notes.iter().map(|n| n.snapshot()).collect();
    serde_json::to_writer_pretty(&mut writer, &snapshots)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(ExportStats {
        notes: notes.len(),
        rows: notes.len(),
    })
}

fn export_template<W: Write>(notes: &[&Note], writer: W) -> Result<ExportStats> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(IMPORT_COLUMNS)?;

    let mut rows = 0;
    for note in notes {
        let path = note.path().to_string_lossy().into_owned();
        let path = path.as_str();
        for (area, kind) in [
            (MetaArea::Frontmatter, "frontmatter"),
            (MetaArea::Inline, "inline_metadata"),
        ] {
            for key in note.keys(area) {
                let values = note.values(area, &key);
                if values.is_empty() {
                    csv.write_record([path, kind, key.as_str(), ""])?;
                    rows += 1;
                }
                for value in &values {
                    csv.write_record([path, kind, key.as_str(), value.as_str()])?;
                    rows += 1;
                }
            }
        }
        for tag in note.tags() {
            csv.write_record([path, "tag", "", tag.as_str()])?;
            rows += 1;
        }
    }
    csv.flush()?;

    Ok(ExportStats {
        notes: notes.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportMode, ImportPlan};
    use crate::types::InsertLocation;
    use crate::vault::VaultContext;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};

    fn index() -> VaultIndex {
        let context = VaultContext {
            root: PathBuf::from("/vault"),
            exclude_paths: Vec::new(),
            insert_location: InsertLocation::Bottom,
        };
        VaultIndex::from_notes(
            context,
            vec![
                Note::parse("a.md", "---\nstatus: [new, open]\ndraft:\n---\nowner:: sam\n#todo\n"),
                Note::parse("b.md", "#project #todo\n"),
            ],
        )
    }

    fn render(format: ExportFormat) -> String {
        let mut out = Vec::new();
        export(&index(), &Scope::all(), format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_csv_export() {
        assert_eq!(
            render(ExportFormat::Csv),
            "path,frontmatter.draft,frontmatter.status,inline.owner,tags\n\
             a.md,,\"new, open\",sam,todo\n\
             b.md,,,,\"project, todo\"\n"
        );
    }

    #[test]
    fn test_template_export() {
        assert_eq!(
            render(ExportFormat::Template),
            "path,type,key,value\n\
             a.md,frontmatter,status,new\n\
             a.md,frontmatter,status,open\n\
             a.md,frontmatter,draft,\n\
             a.md,inline_metadata,owner,sam\n\
             a.md,tag,,todo\n\
             b.md,tag,,project\n\
             b.md,tag,,todo\n"
        );
    }

    #[test]
    fn test_json_export() {
        let json: serde_json::Value = serde_json::from_str(&render(ExportFormat::Json)).unwrap();
        assert_eq!(json[0]["path"], "a.md");
        assert_eq!(json[0]["frontmatter"]["status"], serde_json::json!(["new", "open"]));
        assert_eq!(json[0]["inline_metadata"]["owner"], serde_json::json!(["sam"]));
        assert_eq!(json[1]["tags"], serde_json::json!(["project", "todo"]));
    }

    #[test]
    fn test_template_reimports_without_changes() {
        let mut idx = index();
        let mut out = Vec::new();
        export(&idx, &Scope::all(), ExportFormat::Template, &mut out).unwrap();
        let plan = ImportPlan::from_reader(out.as_slice(), &idx).unwrap();
        let report = plan.apply(&mut idx, ImportMode::Merge).unwrap();
        assert!(report.affected.is_empty());
        assert!(idx.note(Path::new("a.md")).is_some());
    }

    #[test]
    fn test_export_respects_scope() {
        let mut out = Vec::new();
        let scope = Scope::document("b.md");
        let stats = export(&index(), &scope, ExportFormat::Template, &mut out).unwrap();
        assert_eq!(stats.notes, 1);
        assert_eq!(stats.rows, 2);
    }
}
