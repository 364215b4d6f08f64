//! Error types and exit codes for vaultmeta.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes used by the CLI.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOTE_NOT_FOUND: i32 = 2;
    pub const INVALID_TARGET: i32 = 5;
    pub const IMPORT_VALIDATION: i32 = 6;
    pub const WRITE_FAILURES: i32 = 7;
}

/// Main error type for vaultmeta operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// An operation argument (key, value or tag) was empty or malformed.
    /// Raised before any note is touched.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// A document could not be decoded or encoded safely.
    #[error("Encoding error in {path}: {message}")]
    Encoding { path: PathBuf, message: String },

    /// Commit-time failure for a single document.
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// A bulk import failed validation; nothing was applied.
    #[error("Import validation failed: {0}")]
    ImportValidation(String),

    #[error("Note not found: {0}")]
    NoteNotFound(PathBuf),

    #[error("Vault not found at: {0}")]
    VaultNotFound(PathBuf),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(String),
}

impl VaultError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            VaultError::NoteNotFound(_) => exit_code::NOTE_NOT_FOUND,
            VaultError::InvalidTarget(_) => exit_code::INVALID_TARGET,
            VaultError::ImportValidation(_) => exit_code::IMPORT_VALIDATION,
            VaultError::Write { .. } => exit_code::WRITE_FAILURES,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    pub(crate) fn invalid_target(message: impl Into<String>) -> Self {
        VaultError::InvalidTarget(message.into())
    }

    pub(crate) fn import(message: impl Into<String>) -> Self {
        VaultError::ImportValidation(message.into())
    }
}

/// Result type alias for vaultmeta operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    WriteFailures,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::WriteFailures => exit_code::WRITE_FAILURES,
        }
    }
}
