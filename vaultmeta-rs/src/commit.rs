//! The commit writer: the only code path that writes notes.

use crate::diff::{preview, NoteDiff};
use crate::encoding;
use crate::error::{Result, VaultError};
use crate::vault::{VaultContext, VaultIndex};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Whether a commit writes or only previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Write,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub dry_run: bool,
    /// Notes written (or that would be written on a dry run).
    pub written: Vec<PathBuf>,
    pub failed: Vec<WriteFailure>,
    pub diffs: Vec<NoteDiff>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write every note with pending changes.
///
/// Each note is written in its resolved encoding and rebased on the written
/// text. A failure is recorded and the remaining notes are still written;
/// nothing is rolled back. A dry run returns the preview only.
pub fn commit(index: &mut VaultIndex, mode: CommitMode) -> CommitReport {
    let diffs = preview(index);
    let mut report = CommitReport {
        dry_run: mode == CommitMode::DryRun,
        written: Vec::new(),
        failed: Vec::new(),
        diffs,
    };

    if mode == CommitMode::DryRun {
        report.written = report.diffs.iter().map(|d| d.path.clone()).collect();
        return report;
    }

    let context = index.context().clone();
    let location = context.insert_location;
    for note in index.notes_mut() {
        let text = note.serialize(location);
        if text == note.original() {
            continue;
        }
        match write_note(&context, note.path(), &text, note.encoding()) {
            Ok(()) => {
                tracing::debug!(path = %note.path().display(), "wrote note");
                report.written.push(note.path().to_path_buf());
                note.rebase(text);
            }
            Err(e) => {
                tracing::warn!(path = %note.path().display(), error = %e, "write failed");
                report.failed.push(WriteFailure {
                    path: note.path().to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "commit finished"
    );
    report
}

fn write_note(
    context: &VaultContext,
    relative: &Path,
    text: &str,
    source: &encoding::SourceEncoding,
) -> Result<()> {
    let bytes = encoding::encode(text, source, relative)?;
    std::fs::write(context.note_path(relative), bytes).map_err(|e| VaultError::Write {
        path: relative.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{apply, Operation, PendingOperation};
    use crate::scope::Scope;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, VaultIndex) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "---\nstatus: new\n---\n#todo\n").unwrap();
        fs::write(dir.path().join("b.md"), "#todo\n").unwrap();
        fs::write(dir.path().join("c.md"), "untouched\n").unwrap();
        let index = VaultIndex::build(VaultContext::new(dir.path()).unwrap()).unwrap();
        (dir, index)
    }

    fn rename_todo(index: &mut VaultIndex) {
        apply(
            index,
            PendingOperation::new(
                Operation::RenameTag {
                    old: "todo".into(),
                    new: "next".into(),
                },
                Scope::all(),
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (dir, mut index) = setup();
        rename_todo(&mut index);
        let report = commit(&mut index, CommitMode::DryRun);
        assert!(report.dry_run);
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.diffs.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("b.md")).unwrap(), "#todo\n");
        assert_eq!(index.modified_notes().len(), 2);
    }

    #[test]
    fn test_commit_writes_and_rebases() {
        let (dir, mut index) = setup();
        let before = fs::metadata(dir.path().join("c.md")).unwrap().modified().unwrap();
        rename_todo(&mut index);
        let report = commit(&mut index, CommitMode::Write);
        assert!(report.is_success());
        assert_eq!(
            report.written,
            vec![PathBuf::from("a.md"), PathBuf::from("b.md")]
        );
        assert_eq!(fs::read_to_string(dir.path().join("b.md")).unwrap(), "#next\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "---\nstatus: new\n---\n#next\n"
        );
        assert!(index.modified_notes().is_empty());
        let after = fs::metadata(dir.path().join("c.md")).unwrap().modified().unwrap();
        assert_eq!(before, after);

        let again = commit(&mut index, CommitMode::Write);
        assert!(again.written.is_empty());
    }

    #[test]
    fn test_write_failure_does_not_stop_batch() {
        let (dir, mut index) = setup();
        rename_todo(&mut index);
        // A directory in place of the file makes the write fail.
        fs::remove_file(dir.path().join("a.md")).unwrap();
        fs::create_dir(dir.path().join("a.md")).unwrap();

        let report = commit(&mut index, CommitMode::Write);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, PathBuf::from("a.md"));
        assert_eq!(report.written, vec![PathBuf::from("b.md")]);
        assert_eq!(fs::read_to_string(dir.path().join("b.md")).unwrap(), "#next\n");
        assert_eq!(index.modified_notes().len(), 1);
    }

    #[test]
    fn test_commit_keeps_windows_1252() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("w.md"), b"caf\xE9 #todo\n").unwrap();
        let mut index = VaultIndex::build(VaultContext::new(dir.path()).unwrap()).unwrap();
        rename_todo(&mut index);
        let report = commit(&mut index, CommitMode::Write);
        assert!(report.is_success());
        assert_eq!(fs::read(dir.path().join("w.md")).unwrap(), b"caf\xE9 #next\n".to_vec());
    }
}
