//! CLI command implementations.

pub mod args;
pub mod output;

pub mod edit;
pub mod export;
pub mod import;
pub mod info;
pub mod inspect;

pub use args::{Cli, Commands};
pub use output::Output;
