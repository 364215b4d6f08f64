//! vaultmeta - staged, reviewable batch edits to the metadata of
//! Obsidian-style markdown vaults.
//!
//! # Overview
//!
//! A note's metadata lives in three places: the YAML frontmatter block,
//! inline `key:: value` fields and inline `#tags`. vaultmeta parses all
//! three into editable views over the note's original text, applies
//! add, rename, delete and transpose operations to the notes selected by a
//! [`Scope`], shows the result as a line diff and writes only the notes
//! that changed.
//!
//! Everything outside a changed metadata span is written back byte for
//! byte.
//!
//! # Example
//!
//! ```no_run
//! use vaultmeta::{commit, CommitMode, Operation, PendingOperation, Scope, VaultContext, VaultIndex};
//!
//! let context = VaultContext::new("/path/to/vault").unwrap();
//! let mut index = VaultIndex::build(context).unwrap();
//!
//! let rename = Operation::RenameTag { old: "todo".into(), new: "next".into() };
//! vaultmeta::apply(&mut index, PendingOperation::new(rename, Scope::all())).unwrap();
//!
//! for diff in vaultmeta::preview(&index) {
//!     print!("{}", diff.render());
//! }
//! let report = commit(&mut index, CommitMode::Write);
//! assert!(report.is_success());
//! ```

pub mod block;
pub mod cli;
pub mod commit;
pub mod config;
pub mod diff;
pub mod edit;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod export;
pub mod import;
pub mod inline;
pub mod note;
pub mod parser;
pub mod scope;
pub mod types;
pub mod value;
pub mod vault;

// Re-export main types at crate root
pub use commit::{commit, CommitMode, CommitReport};
pub use config::Config;
pub use diff::{preview, NoteDiff};
pub use engine::{apply, Operation, OperationReport, PendingOperation};
pub use error::{Result, VaultError};
pub use note::{MetadataSnapshot, Note};
pub use scope::{Matcher, NoteFilter, Scope};
pub use types::*;
pub use value::FieldValue;
pub use vault::{VaultContext, VaultIndex};
