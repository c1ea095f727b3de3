//! Command implementations
//!
//! Each command is a module with an execute function that takes parsed CLI args
//! and runs the operation against the tag store and repository records.

pub mod completions;
pub mod config;
pub mod query;
pub mod tag;
pub mod tags;

// Re-export execute functions for convenience
pub use completions::execute as completions;
pub use config::execute as config;
pub use query::execute as query;
pub use tag::execute as tag;
pub use tag::{bulk as bulk_tag, retag, show, untag};
pub use tags::execute as tags;

use crate::RepotagError;
use dialoguer::Confirm;

/// Prompt user for yes/no confirmation using dialoguer
fn confirm(prompt: &str, quiet: bool) -> Result<bool, RepotagError> {
    if quiet {
        return Ok(true);
    }

    Confirm::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| RepotagError::InvalidInput(format!("Confirmation failed: {e}")))
}
