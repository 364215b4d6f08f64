//! Import command.

use crate::cli::args::ImportArgs;
use crate::cli::edit::finish;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::import::{ImportMode, ImportPlan};
use crate::vault::VaultIndex;

pub fn import(index: &mut VaultIndex, args: &ImportArgs, output: &Output) -> Result<ExitCode> {
    let plan = ImportPlan::from_path(&args.file, index)?;
    let mode = if args.replace {
        ImportMode::Replace
    } else {
        ImportMode::Merge
    };
    let report = plan.apply(index, mode)?;
    output.info(&format!(
        "Imported {} row(s) into {} note(s)",
        report.rows,
        report.affected.len()
    ));
    finish(index, "import", &args.commit, output)
}
