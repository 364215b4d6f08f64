//! Editing commands: stage one operation, preview its diff and, with
//! `--commit`, write it.

use crate::cli::args::{
    AddKeyArgs, AddTagArgs, AddValueArgs, CommitArgs, DeleteKeyArgs, DeleteTagArgs,
    DeleteValueArgs, MoveInlineArgs, RenameKeyArgs, RenameTagArgs, RenameValueArgs, TransposeArgs,
};
use crate::cli::output::{EditOutput, Output};
use crate::commit::{commit, CommitMode};
use crate::engine::{self, Operation, PendingOperation};
use crate::error::{ExitCode, Result};
use crate::scope::Scope;
use crate::vault::VaultIndex;

/// Apply a staged operation, then preview or commit.
pub fn run(
    index: &mut VaultIndex,
    operation: Operation,
    scope: Scope,
    commit_args: &CommitArgs,
    output: &Output,
) -> Result<ExitCode> {
    let report = engine::apply(index, PendingOperation::new(operation, scope))?;
    finish(index, &report.operation, commit_args, output)
}

/// Preview or write whatever is pending in the index and print the result.
pub fn finish(
    index: &mut VaultIndex,
    operation: &str,
    commit_args: &CommitArgs,
    output: &Output,
) -> Result<ExitCode> {
    let mode = commit_args.mode();
    let report = commit(index, mode);

    if mode == CommitMode::DryRun && !report.diffs.is_empty() {
        output.info("Preview only; pass --commit to write these changes");
    }
    output.print(&EditOutput::new(operation, &report))?;

    if report.is_success() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::WriteFailures)
    }
}

pub fn add_key(index: &mut VaultIndex, args: &AddKeyArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::AddKey {
        area: args.area,
        key: args.key.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn add_value(index: &mut VaultIndex, args: &AddValueArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::AddValue {
        area: args.area,
        key: args.key.clone(),
        value: args.value.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn add_tag(index: &mut VaultIndex, args: &AddTagArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::AddTag {
        tag: args.tag.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn rename_key(index: &mut VaultIndex, args: &RenameKeyArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::RenameKey {
        old: args.old.clone(),
        new: args.new.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn rename_value(
    index: &mut VaultIndex,
    args: &RenameValueArgs,
    output: &Output,
) -> Result<ExitCode> {
    let operation = Operation::RenameValue {
        key: args.key.clone(),
        old: args.old.clone(),
        new: args.new.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn rename_tag(index: &mut VaultIndex, args: &RenameTagArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::RenameTag {
        old: args.old.clone(),
        new: args.new.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn delete_key(index: &mut VaultIndex, args: &DeleteKeyArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::DeleteKey {
        key: args.scope.matcher(&args.key)?,
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn delete_value(
    index: &mut VaultIndex,
    args: &DeleteValueArgs,
    output: &Output,
) -> Result<ExitCode> {
    let operation = Operation::DeleteValue {
        key: args.scope.matcher(&args.key)?,
        value: args.scope.matcher(&args.value)?,
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn delete_tag(index: &mut VaultIndex, args: &DeleteTagArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::DeleteTag {
        tag: args.scope.matcher(args.tag.trim_start_matches('#'))?,
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn transpose(index: &mut VaultIndex, args: &TransposeArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::Transpose {
        to: args.to,
        key: args.key.clone(),
        value: args.value.clone(),
    };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}

pub fn move_inline(index: &mut VaultIndex, args: &MoveInlineArgs, output: &Output) -> Result<ExitCode> {
    let operation = Operation::MoveInline { location: args.to };
    run(index, operation, args.scope.to_scope()?, &args.commit, output)
}
