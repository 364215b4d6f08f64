//! Export command.

use crate::cli::args::ExportArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::export::export as export_metadata;
use crate::vault::VaultIndex;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

pub fn export(index: &VaultIndex, args: &ExportArgs, output: &Output) -> Result<ExitCode> {
    let scope = args.scope.to_scope()?;
    let stats = if args.file == Path::new("-") {
        export_metadata(index, &scope, args.format, io::stdout().lock())?
    } else {
        let file = BufWriter::new(File::create(&args.file)?);
        let stats = export_metadata(index, &scope, args.format, file)?;
        output.print(&stats)?;
        stats
    };
    output.info(&format!("Exported {} note(s)", stats.notes));
    Ok(ExitCode::Success)
}
