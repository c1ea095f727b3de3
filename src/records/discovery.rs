//! Repository discovery
//!
//! Walks the configured directories and yields every directory that holds a
//! `.git` entry. Nothing here runs git.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Expand a leading `~` to the home directory
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Stable id for a repository location.
///
/// `~` is expanded and existing paths are canonicalized, so a checkout
/// reached through a symlink or a relative path has one id. Anything that
/// does not exist on disk (a remote URL, a moved checkout) is kept as is.
#[must_use]
pub fn canonical_path(path: &str) -> PathBuf {
    let expanded = expand_home(path);
    expanded.canonicalize().unwrap_or(expanded)
}

fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Find git repositories under `dirs`.
///
/// Without `recursive` only each directory itself and its immediate
/// children are checked. With `recursive` the whole tree is walked, but the
/// walk does not descend into a repository once found. Results are sorted
/// and deduplicated. Missing directories are skipped with a warning.
///
/// Roots are canonicalized first, so results use the same ids as
/// [`canonical_path`].
#[must_use]
pub fn discover_repositories<S: AsRef<str>>(dirs: &[S], recursive: bool) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in dirs {
        let root = canonical_path(dir.as_ref());
        if !root.is_dir() {
            tracing::warn!(dir = %root.display(), "repository directory does not exist, skipping");
            continue;
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut walker = WalkDir::new(&root).max_depth(max_depth).sort_by_file_name().into_iter();

        loop {
            let entry = match walker.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() || entry.file_name() == OsStr::new(".git") {
                continue;
            }
            if is_repository(entry.path()) {
                tracing::debug!(path = %entry.path().display(), "found repository");
                found.push(entry.into_path());
                walker.skip_current_dir();
            }
        }
    }

    found.sort();
    found.dedup();
    found
}
