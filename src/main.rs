//! Repotag CLI application entry point
//!
//! Organizes local git repositories with hierarchical tags and a small
//! query language.
//!
//! # Usage
//!
//! ```bash
//! # Tag a repository
//! repotag tag ~/github/tool work/client stack:rust
//!
//! # Tag every repository under a directory, or matching tag patterns
//! repotag bulk-tag -a client/acme -d ~/work
//! repotag bulk-tag -a deprecated -r active -f lang/perl
//!
//! # Show explicit and implicit tags
//! repotag show ~/github/tool
//!
//! # Query repositories
//! repotag query "stars > 10 and language == 'Python'" -t 'work/*'
//! repotag query --input repos.jsonl --format table "topics contains 'ml'"
//!
//! # Tag statistics
//! repotag tags list --tree
//!
//! # Quiet mode (only output results), verbose logging to stderr
//! repotag -q tags list
//! repotag -vv query 'not archived'
//! ```
//!
//! # Configuration
//!
//! Configuration is stored in the user's config directory
//! (`~/.config/repotag/config.toml` on Linux) and written with defaults on
//! first run. Logging honours `RUST_LOG`.

use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use repotag::{
    RepotagError,
    cli::{Cli, Commands},
    commands,
    config::RepotagConfig,
    records::MetadataStore,
    tags::TagStore,
};

type Result<T> = std::result::Result<T, RepotagError>;

/// Set up the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` raises and `-q` lowers the level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("repotag={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the tag store from `--store`, the configured path, or the default
fn open_store(store: Option<PathBuf>, config: &RepotagConfig) -> Result<TagStore> {
    let path = match store {
        Some(path) => path,
        None => config.tag_store_path()?,
    };
    tracing::debug!(path = %path.display(), "opening tag store");
    Ok(TagStore::load(path)?)
}

/// Handle commands that operate on the tag store
fn handle_store_command(command: &Commands, config: &RepotagConfig, store: &mut TagStore, quiet: bool) -> Result<()> {
    match command {
        Commands::Tag { repo, tags } => commands::tag(store, repo, tags, quiet),
        Commands::Untag { repo, tags, all } => commands::untag(store, repo, tags, *all, quiet),
        Commands::Retag { repo, old, new } => commands::retag(store, repo, old, new, quiet),
        Commands::BulkTag(args) => commands::bulk_tag(store, config, args, quiet),
        Commands::Show { repo, explicit } => {
            let metadata = MetadataStore::load(&config.metadata_store_path()?)?;
            commands::show(store, &metadata, repo, *explicit, quiet)
        }
        Commands::Tags { command } => commands::tags(store, command, quiet),
        Commands::Query(args) => commands::query(args, config, store),
        Commands::Config { .. } | Commands::Completions { .. } => Err(RepotagError::InvalidInput(
            "command does not use the tag store".into(),
        )),
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        commands::completions(*shell);
        return Ok(());
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => RepotagConfig::config_path()?,
    };
    let config = RepotagConfig::load_from(&config_path)?;
    let quiet = cli.quiet || config.quiet;

    if let Commands::Config { command } = &cli.command {
        return commands::config(config, &config_path, command, quiet);
    }

    let mut store = open_store(cli.store, &config)?;
    handle_store_command(&cli.command, &config, &mut store, quiet)
}

/// Main entry point for the repotag application
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
