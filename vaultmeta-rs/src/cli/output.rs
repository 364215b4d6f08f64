//! Output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::commit::CommitReport;
use crate::diff::NoteDiff;
use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;

/// Helper for formatting and printing output.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Print a serializable value in the configured format.
    pub fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Toml => toml::to_string_pretty(value)?,
        })
    }

    /// Print a message to stderr if not in quiet mode.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// One note's pending or written change.
#[derive(Debug, Serialize)]
pub struct ChangeOutput {
    pub path: PathBuf,
    pub additions: usize,
    pub removals: usize,
    /// Rendered diff with `+`/`-` line prefixes.
    pub diff: String,
}

impl From<&NoteDiff> for ChangeOutput {
    fn from(diff: &NoteDiff) -> Self {
        Self {
            path: diff.path.clone(),
            additions: diff.additions,
            removals: diff.removals,
            diff: diff.render(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailureOutput {
    pub path: PathBuf,
    pub message: String,
}

/// Result of an editing command.
#[derive(Debug, Serialize)]
pub struct EditOutput {
    /// The operation that was applied.
    pub operation: String,
    /// Whether the changes were written to disk.
    pub committed: bool,
    pub notes_changed: usize,
    pub changes: Vec<ChangeOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailureOutput>,
}

impl EditOutput {
    pub fn new(operation: impl Into<String>, report: &CommitReport) -> Self {
        Self {
            operation: operation.into(),
            committed: !report.dry_run,
            notes_changed: report.diffs.len(),
            changes: report.diffs.iter().map(ChangeOutput::from).collect(),
            failed: report
                .failed
                .iter()
                .map(|f| FailureOutput {
                    path: f.path.clone(),
                    message: f.message.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_texts;

    #[test]
    fn test_edit_output_from_dry_run() {
        let report = CommitReport {
            dry_run: true,
            written: vec![PathBuf::from("a.md")],
            failed: Vec::new(),
            diffs: vec![diff_texts("a.md", "#a\n", "#b\n")],
        };
        let output = EditOutput::new("rename_tag", &report);
        assert!(!output.committed);
        assert_eq!(output.notes_changed, 1);
        assert_eq!(output.changes[0].diff, "-#a\n+#b\n");

        let json = Output::new(OutputFormat::Json, false).render(&output).unwrap();
        assert!(json.contains("\"operation\": \"rename_tag\""));
        assert!(!json.contains("failed"));
    }
}
