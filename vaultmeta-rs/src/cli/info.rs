//! Vault info command.

use crate::cli::args::InfoArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::vault::VaultIndex;

/// Print the index summary: notes indexed, skipped documents and parse
/// diagnostics.
pub fn info(index: &VaultIndex, args: &InfoArgs, output: &Output) -> Result<ExitCode> {
    let info = index.info(&args.scope.to_scope()?);
    if !info.skipped.is_empty() {
        output.info(&format!("{} document(s) skipped", info.skipped.len()));
    }
    output.print(&info)?;
    Ok(ExitCode::Success)
}
