//! Command-line interface definitions and parsing
//!
//! This module defines the CLI structure for repotag using the `clap` crate.
//!
//! # Commands
//!
//! - **tag / untag / retag**: manage explicit tags of one repository
//! - **bulk-tag**: add or remove tags on every repository under a directory
//!   or matching tag patterns
//! - **show**: explicit and implicit tags of one repository
//! - **tags**: tag statistics and global removal
//! - **query**: filter repository records by query and tag patterns
//! - **config**: read and write configuration values
//! - **completions**: generate shell completion scripts
//!
//! # Examples
//!
//! ```
//! use clap::Parser;
//! use repotag::cli::{Cli, Commands};
//!
//! let cli = Cli::parse_from(["repotag", "query", "stars > 10", "-t", "work/*"]);
//! assert!(matches!(cli.command, Commands::Query(_)));
//! ```

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;

/// Main CLI structure for parsing command-line arguments
#[derive(Parser, Debug)]
#[command(name = "repotag")]
#[command(about = "Organize local git repositories with hierarchical tags", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use this configuration file instead of the default
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use this tag store file (overrides config)
    #[arg(long = "store", value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add tags to a repository
    #[command(visible_alias = "t")]
    Tag {
        /// Repository path or id
        repo: String,

        /// Tags to add (hierarchical: work/client, lang:python)
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove tags from a repository
    #[command(visible_alias = "u")]
    Untag {
        /// Repository path or id
        repo: String,

        /// Tags to remove
        tags: Vec<String>,

        /// Remove all explicit tags from the repository
        #[arg(long = "all", conflicts_with = "tags")]
        all: bool,
    },

    /// Replace one tag of a repository with another
    Retag {
        /// Repository path or id
        repo: String,

        /// Tag to replace
        old: String,

        /// Replacement tag
        new: String,
    },

    /// Add or remove tags on many repositories at once
    BulkTag(BulkTagArgs),

    /// Show the tags of a repository
    Show {
        /// Repository path or id
        repo: String,

        /// Only show explicitly assigned tags
        #[arg(long = "explicit")]
        explicit: bool,
    },

    /// Manage tags across all repositories
    Tags {
        #[command(subcommand)]
        command: TagsCommands,
    },

    /// Filter repositories by query and tag patterns
    #[command(visible_alias = "q")]
    Query(QueryArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Arguments of the query command
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Query expression (e.g. "stars > 10 and language == 'Python'")
    #[arg(value_name = "EXPR")]
    pub query: Option<String>,

    /// Tag patterns to filter by (can specify multiple: -t work/* -t lang:rust)
    #[arg(short = 't', long = "tag", value_name = "PATTERN")]
    pub tags: Vec<String>,

    /// Require all tag patterns to match (AND logic, default is OR)
    #[arg(long = "all-tags")]
    pub all_tags: bool,

    /// Fuzzy match threshold, 0-1 or 0-100 (overrides config)
    #[arg(long = "threshold", value_name = "N")]
    pub threshold: Option<f64>,

    /// Read records as JSONL from a file, or '-' for stdin
    #[arg(long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Fields to output (comma separated, dotted paths allowed)
    #[arg(long = "fields", value_name = "FIELDS", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Output format (overrides config)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Stop after this many matches
    #[arg(long = "limit", value_name = "N")]
    pub limit: Option<usize>,
}

/// Arguments of the bulk-tag command
#[derive(Args, Debug, Clone, Default)]
#[command(group(ArgGroup::new("target").required(true).args(["dir", "filter"])))]
#[command(group(ArgGroup::new("change").required(true).multiple(true).args(["add", "remove"])))]
pub struct BulkTagArgs {
    /// Tags to add (can specify multiple: -a work -a priority/high)
    #[arg(short = 'a', long = "add", value_name = "TAG")]
    pub add: Vec<String>,

    /// Tags to remove
    #[arg(short = 'r', long = "remove", value_name = "TAG")]
    pub remove: Vec<String>,

    /// Every git repository found under this directory (recursively)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<String>,

    /// Repositories whose tags match these patterns
    #[arg(short = 'f', long = "filter", value_name = "PATTERN")]
    pub filter: Vec<String>,

    /// Require all filter patterns to match (AND logic, default is OR)
    #[arg(long = "all-tags")]
    pub all_tags: bool,

    /// Show what would change without saving
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Tag management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TagsCommands {
    /// List all tags with usage counts
    List {
        /// Display hierarchical tags as a tree
        #[arg(long = "tree")]
        tree: bool,
    },

    /// Remove a tag from every repository
    #[command(visible_alias = "rm")]
    Remove {
        /// Tag to remove
        tag: String,

        /// Do not ask for confirmation
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

/// Configuration management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Configuration key=value (e.g., fuzzy_threshold=0.7)
        #[arg(value_name = "KEY=VALUE")]
        setting: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key to retrieve (e.g., output_format)
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Print the configuration file path
    Path,
}
