//! Inspect command: print metadata of the notes in scope.

use crate::cli::args::InspectArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::note::Note;
use crate::types::{MetaArea, OrderedMap};
use crate::vault::VaultIndex;
use serde::Serialize;
use std::path::PathBuf;

/// Metadata of one area of a note.
#[derive(Debug, Serialize)]
pub struct AreaOutput {
    pub path: PathBuf,
    pub area: String,
    pub metadata: OrderedMap<Vec<String>>,
}

impl AreaOutput {
    fn new(note: &Note, area: MetaArea) -> Self {
        Self {
            path: note.path().to_path_buf(),
            area: area.to_string(),
            metadata: note
                .keys(area)
                .into_iter()
                .map(|key| {
                    let values = note.values(area, &key);
                    (key, values)
                })
                .collect(),
        }
    }
}

pub fn inspect(index: &VaultIndex, args: &InspectArgs, output: &Output) -> Result<ExitCode> {
    let scope = args.scope.to_scope()?;

    if args.summary {
        output.print(&index.metadata_summary(&scope))?;
        return Ok(ExitCode::Success);
    }

    match args.area {
        Some(area) => {
            let notes: Vec<AreaOutput> = index
                .in_scope(&scope)
                .map(|note| AreaOutput::new(note, area))
                .collect();
            output.print(&notes)?;
        }
        None => {
            let notes: Vec<_> = index.in_scope(&scope).map(Note::snapshot).collect();
            output.print(&notes)?;
        }
    }
    Ok(ExitCode::Success)
}
