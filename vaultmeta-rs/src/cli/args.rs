//! CLI argument definitions using clap.

use crate::commit::CommitMode;
use crate::error::Result;
use crate::export::ExportFormat;
use crate::scope::{Matcher, NoteFilter, Scope};
use crate::types::{InsertLocation, MetaArea};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vaultmeta")]
#[command(author, version, about = "Batch edits to frontmatter, inline metadata and tags in markdown vaults", long_about = None)]
pub struct Cli {
    /// Path to the vault (bypasses the config file)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Name of a vault in the config file
    #[arg(long, global = true)]
    pub vault_name: Option<String>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show notes indexed, skipped documents and parse diagnostics
    Info(InfoArgs),

    /// Print the metadata of the notes in scope
    Inspect(InspectArgs),

    /// Add a key without a value
    #[command(name = "add-key")]
    AddKey(AddKeyArgs),

    /// Add a value to a key, creating the key if needed
    #[command(name = "add-value")]
    AddValue(AddValueArgs),

    /// Add an inline tag
    #[command(name = "add-tag")]
    AddTag(AddTagArgs),

    /// Rename a key in both frontmatter and inline metadata
    #[command(name = "rename-key")]
    RenameKey(RenameKeyArgs),

    /// Rename one value of a key
    #[command(name = "rename-value")]
    RenameValue(RenameValueArgs),

    /// Rename a tag and its child tags
    #[command(name = "rename-tag")]
    RenameTag(RenameTagArgs),

    /// Delete keys
    #[command(name = "delete-key")]
    DeleteKey(DeleteKeyArgs),

    /// Delete values of keys
    #[command(name = "delete-value")]
    DeleteValue(DeleteValueArgs),

    /// Delete tags
    #[command(name = "delete-tag")]
    DeleteTag(DeleteTagArgs),

    /// Move a key, one value of it, or everything between frontmatter and inline metadata
    Transpose(TransposeArgs),

    /// Rewrite all inline metadata of each note at one location
    #[command(name = "move-inline")]
    MoveInline(MoveInlineArgs),

    /// Import metadata from a path,type,key,value CSV file
    Import(ImportArgs),

    /// Export the metadata of the notes in scope
    Export(ExportArgs),
}

/// Filters selecting which notes a command touches.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Only notes whose vault-relative path matches this regex
    #[arg(long = "path", value_name = "REGEX")]
    pub path_filter: Option<String>,

    /// Only notes that have this key
    #[arg(long = "key", value_name = "KEY")]
    pub key_filter: Option<String>,

    /// Only notes where the filtered key has this value
    #[arg(long = "value", value_name = "VALUE", requires = "key_filter")]
    pub value_filter: Option<String>,

    /// Only notes with this tag (or a child of it)
    #[arg(long = "tag", value_name = "TAG")]
    pub tag_filter: Option<String>,

    /// Treat key, value and tag arguments as full-match regexes
    #[arg(long)]
    pub regex: bool,
}

impl ScopeArgs {
    pub fn to_scope(&self) -> Result<Scope> {
        let mut scope = Scope::all();
        if let Some(pattern) = &self.path_filter {
            scope = scope.with(NoteFilter::path(pattern)?);
        }
        if let Some(key) = &self.key_filter {
            let value = match &self.value_filter {
                Some(value) => Some(self.matcher(value)?),
                None => None,
            };
            scope = scope.with(NoteFilter::Key {
                key: self.matcher(key)?,
                value,
            });
        }
        if let Some(tag) = &self.tag_filter {
            scope = scope.with(NoteFilter::Tag(self.matcher(tag.trim_start_matches('#'))?));
        }
        Ok(scope)
    }

    pub fn matcher(&self, arg: &str) -> Result<Matcher> {
        Matcher::from_arg(arg, self.regex)
    }
}

/// Whether an editing command writes its changes.
#[derive(Args, Debug, Clone, Default)]
pub struct CommitArgs {
    /// Write the changes to disk
    #[arg(long)]
    pub commit: bool,

    /// Only preview, even with --commit
    #[arg(long)]
    pub dry_run: bool,
}

impl CommitArgs {
    pub fn mode(&self) -> CommitMode {
        if self.commit && !self.dry_run {
            CommitMode::Write
        } else {
            CommitMode::DryRun
        }
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Only show one metadata area
    #[arg(long, value_enum)]
    pub area: Option<MetaArea>,

    /// Show the union of keys, values and tags instead of per-note metadata
    #[arg(long)]
    pub summary: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug)]
pub struct AddKeyArgs {
    pub key: String,

    /// Area to add the key to
    #[arg(long, value_enum, default_value = "frontmatter")]
    pub area: MetaArea,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct AddValueArgs {
    pub key: String,
    pub value: String,

    /// Area to add the value to
    #[arg(long, value_enum, default_value = "frontmatter")]
    pub area: MetaArea,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct AddTagArgs {
    pub tag: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct RenameKeyArgs {
    pub old: String,
    pub new: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct RenameValueArgs {
    pub key: String,
    pub old: String,
    pub new: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct RenameTagArgs {
    pub old: String,
    pub new: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct DeleteKeyArgs {
    /// Key to delete (a regex with --regex)
    pub key: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct DeleteValueArgs {
    /// Key whose values are deleted (a regex with --regex)
    pub key: String,
    /// Value to delete (a regex with --regex)
    pub value: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct DeleteTagArgs {
    /// Tag to delete (a regex with --regex)
    pub tag: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct TransposeArgs {
    /// Area to move metadata into
    #[arg(long, value_enum)]
    pub to: MetaArea,

    /// Key to move; every key of the other area when omitted
    pub key: Option<String>,

    /// Move only this value of the key
    #[arg(requires = "key")]
    pub value: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct MoveInlineArgs {
    /// Where the fields are written
    #[arg(long, value_enum)]
    pub to: InsertLocation,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file with path, type, key and value columns
    pub file: PathBuf,

    /// Delete all metadata of each listed note before importing
    #[arg(long)]
    pub replace: bool,

    #[command(flatten)]
    pub commit: CommitArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file, or `-` for stdout
    pub file: PathBuf,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    #[command(flatten)]
    pub scope: ScopeArgs,
}
