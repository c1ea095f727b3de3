//! Tag, untag, retag, bulk-tag and show commands

use colored::Colorize;
use std::path::Path;

use crate::cli::BulkTagArgs;
use crate::config::RepotagConfig;
use crate::filter::RepoFilter;
use crate::query::EvalOptions;
use crate::records::{MetadataStore, canonical_path, discover_repositories};
use crate::tags::{Tag, TagStore, normalize_id};
use crate::{RepotagError, output};

type Result<T> = std::result::Result<T, RepotagError>;

/// Repository id for a command-line argument.
///
/// Resolved the same way as discovered repositories and metadata store
/// keys: existing paths are canonicalized, anything else (a remote URL, a
/// moved checkout) is used as given after `~` expansion.
#[must_use]
pub fn resolve_repo(repo: &str) -> String {
    let expanded = normalize_id(repo);
    canonical_path(&expanded).to_string_lossy().into_owned()
}

/// Execute the tag command - add tags to a repository
///
/// # Errors
/// Returns an error if a tag is invalid or reserved, or the store cannot be saved
pub fn execute(store: &mut TagStore, repo: &str, tags: &[String], quiet: bool) -> Result<()> {
    if tags.is_empty() {
        return Err(RepotagError::InvalidInput("No tags provided".into()));
    }

    let id = resolve_repo(repo);
    let added = store.update(|s| s.add_tags(&id, tags))?;
    if !quiet {
        println!("Tagged {id} with: {} ({added} new)", canonical_names(tags).join(", "));
    }
    Ok(())
}

/// Canonical spelling of a tag, as stored
fn canonical_name(tag: &str) -> String {
    Tag::parse(tag).map_or_else(|_| tag.trim().to_string(), |t| t.to_string())
}

fn canonical_names(tags: &[String]) -> Vec<String> {
    tags.iter().map(|t| canonical_name(t)).collect()
}

/// Execute the untag command - remove tags from a repository
///
/// # Errors
/// Returns an error if no tags are given without `--all`, or the store cannot be saved
pub fn untag(store: &mut TagStore, repo: &str, tags: &[String], all: bool, quiet: bool) -> Result<()> {
    let id = resolve_repo(repo);

    if all {
        if !super::confirm(&format!("Remove all tags from {id}?"), quiet)? {
            if !quiet {
                println!("Cancelled.");
            }
            return Ok(());
        }
        let cleared = store.update(|s| Ok(s.clear(&id)))?;
        if !quiet {
            if cleared {
                println!("Removed all tags from {id}");
            } else {
                println!("{id} has no explicit tags");
            }
        }
    } else if !tags.is_empty() {
        let removed = store.update(|s| Ok(s.remove_tags(&id, tags)))?;
        if !quiet {
            println!("Removed {removed} tag(s) from {id}");
        }
    } else {
        return Err(RepotagError::InvalidInput(
            "No tags provided. Specify tags or use --all to remove all tags".into(),
        ));
    }
    Ok(())
}

/// Execute the retag command - replace one tag with another
///
/// # Errors
/// Returns an error if either tag is invalid or the store cannot be saved
pub fn retag(store: &mut TagStore, repo: &str, old: &str, new: &str, quiet: bool) -> Result<()> {
    let id = resolve_repo(repo);
    let had_old = store.update(|s| s.move_tag(&id, old, new))?;
    if !quiet {
        if had_old {
            println!("Retagged {id}: {} -> {}", canonical_name(old), canonical_name(new));
        } else {
            println!("{id} did not have '{}'; added {}", canonical_name(old), canonical_name(new));
        }
    }
    Ok(())
}

/// Ids of the repositories a bulk-tag run applies to
fn bulk_targets(store: &TagStore, config: &RepotagConfig, args: &BulkTagArgs) -> Result<Vec<String>> {
    if let Some(dir) = &args.dir {
        if !canonical_path(dir).is_dir() {
            return Err(RepotagError::InvalidInput(format!("Directory not found: {dir}")));
        }
        let found = discover_repositories(&[dir], true);
        return Ok(found.iter().map(|p| p.to_string_lossy().into_owned()).collect());
    }
    if args.filter.is_empty() {
        return Err(RepotagError::InvalidInput("Specify --dir or at least one --filter pattern".into()));
    }

    let filter = RepoFilter::parse(None, &args.filter, args.all_tags, EvalOptions::default())?;
    let mut records = super::query::load_records(config)?;
    for record in &mut records {
        crate::filter::annotate(record, store);
    }
    Ok(filter.apply(records).into_iter().map(|r| r.id).collect())
}

/// Execute the bulk-tag command - add and remove tags on every repository
/// under a directory or matching tag patterns
///
/// # Errors
/// Returns an error if no repository is selected, a tag to add is invalid
/// or reserved (nothing changes), or the store cannot be saved
pub fn bulk(store: &mut TagStore, config: &RepotagConfig, args: &BulkTagArgs, quiet: bool) -> Result<()> {
    let targets = bulk_targets(store, config, args)?;
    if targets.is_empty() {
        return Err(RepotagError::InvalidInput("No repositories found to tag".into()));
    }

    if args.dry_run {
        let changed = store.clone().bulk_update(&targets, &args.add, &args.remove)?;
        if !quiet {
            println!("{}", "=== Dry Run Mode ===".yellow().bold());
            print_changes(&changed, targets.len());
            println!("\n{}", "Run without --dry-run to apply changes.".yellow());
        }
        return Ok(());
    }

    let prompt = format!(
        "Update {} repositories (add [{}], remove [{}])?",
        targets.len(),
        canonical_names(&args.add).join(", "),
        canonical_names(&args.remove).join(", ")
    );
    if !super::confirm(&prompt, quiet)? {
        if !quiet {
            println!("Cancelled.");
        }
        return Ok(());
    }

    let changed = store.update(|s| s.bulk_update(&targets, &args.add, &args.remove))?;
    tracing::info!(selected = targets.len(), changed = changed.len(), "bulk tag");
    if !quiet {
        print_changes(&changed, targets.len());
    }
    Ok(())
}

fn print_changes(changed: &[String], selected: usize) {
    println!("Updated {} of {selected} repositories", changed.len());
    for (i, id) in changed.iter().enumerate().take(10) {
        println!("  {}. {id}", i + 1);
    }
    if changed.len() > 10 {
        println!("  ... and {} more", changed.len() - 10);
    }
}

/// Execute the show command - print the tags of a repository
///
/// Implicit tags are derived from the metadata store entry when there is
/// one, otherwise from the path alone.
///
/// # Errors
/// Currently infallible; returns `Result` for symmetry with other commands
pub fn show(store: &TagStore, metadata: &MetadataStore, repo: &str, explicit: bool, quiet: bool) -> Result<()> {
    let id = resolve_repo(repo);
    let tags = if explicit {
        store.explicit_tags(&id)
    } else {
        let record = metadata.record_for(Path::new(&id));
        store.list_tags(&record)
    };

    let tags: Vec<String> = tags.iter().map(ToString::to_string).collect();
    println!("{}", output::repo_with_tags(&id, &tags, quiet));
    Ok(())
}
