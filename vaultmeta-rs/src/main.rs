//! vaultmeta CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vaultmeta::cli::args::{Cli, Commands};
use vaultmeta::cli::output::Output;
use vaultmeta::cli::{edit, export, import, info, inspect};
use vaultmeta::config::Config;
use vaultmeta::error::{ExitCode as VaultExitCode, VaultError};
use vaultmeta::vault::VaultIndex;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides the verbosity flags; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<VaultExitCode, VaultError> {
    let config = Config::load(cli.config.as_deref())?;
    let context = config.resolve(cli.vault.as_deref(), cli.vault_name.as_deref())?;
    let mut index = VaultIndex::build(context)?;

    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Info(args) => info::info(&index, args, &output),
        Commands::Inspect(args) => inspect::inspect(&index, args, &output),
        Commands::AddKey(args) => edit::add_key(&mut index, args, &output),
        Commands::AddValue(args) => edit::add_value(&mut index, args, &output),
        Commands::AddTag(args) => edit::add_tag(&mut index, args, &output),
        Commands::RenameKey(args) => edit::rename_key(&mut index, args, &output),
        Commands::RenameValue(args) => edit::rename_value(&mut index, args, &output),
        Commands::RenameTag(args) => edit::rename_tag(&mut index, args, &output),
        Commands::DeleteKey(args) => edit::delete_key(&mut index, args, &output),
        Commands::DeleteValue(args) => edit::delete_value(&mut index, args, &output),
        Commands::DeleteTag(args) => edit::delete_tag(&mut index, args, &output),
        Commands::Transpose(args) => edit::transpose(&mut index, args, &output),
        Commands::MoveInline(args) => edit::move_inline(&mut index, args, &output),
        Commands::Import(args) => import::import(&mut index, args, &output),
        Commands::Export(args) => export::export(&index, args, &output),
    }
}
