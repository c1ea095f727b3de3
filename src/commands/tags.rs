//! Tags command - global tag management

use std::collections::BTreeMap;
use std::io::Write;

use crate::tags::{Tag, TagStore};
use crate::{RepotagError, cli::TagsCommands, output};

type Result<T> = std::result::Result<T, RepotagError>;

/// Execute the tags management command
///
/// # Errors
/// Returns an error if the store cannot be saved or user interaction fails
pub fn execute(store: &mut TagStore, command: &TagsCommands, quiet: bool) -> Result<()> {
    match command {
        TagsCommands::List { tree } => list_all_tags(store, *tree, quiet),
        TagsCommands::Remove { tag, yes } => remove_tag_globally(store, tag, *yes || quiet, quiet),
    }
}

fn list_all_tags(store: &TagStore, tree: bool, quiet: bool) -> Result<()> {
    let counts = store.tag_counts();

    if counts.is_empty() {
        if !quiet {
            println!("No tags found in store.");
        }
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if tree {
        if !quiet {
            writeln!(out, "Tags in store (tree view):")?;
        }
        write_tree(&mut out, &counts, quiet)?;
    } else {
        if !quiet {
            writeln!(out, "Tags in store:")?;
        }
        for (tag, count) in &counts {
            writeln!(out, "{}", output::tag_with_count(&tag.to_string(), *count, quiet))?;
        }
    }
    Ok(())
}

/// Node of the display tree; `count` is `None` for prefixes nobody is tagged with
#[derive(Default)]
struct TreeNode {
    count: Option<usize>,
    children: BTreeMap<String, TreeNode>,
}

fn build_tree(counts: &BTreeMap<Tag, usize>) -> TreeNode {
    let mut root = TreeNode::default();
    for (tag, count) in counts {
        let mut node = &mut root;
        for component in tag.components() {
            node = node.children.entry(component.clone()).or_default();
        }
        node.count = Some(*count);
    }
    root
}

/// Render hierarchical tags with box drawing characters
fn write_tree<W: Write>(out: &mut W, counts: &BTreeMap<Tag, usize>, quiet: bool) -> std::io::Result<()> {
    let root = build_tree(counts);
    for (name, node) in &root.children {
        let line = match node.count {
            Some(count) => output::tag_with_count(name, count, quiet),
            None if quiet => name.clone(),
            None => format!("  {name}"),
        };
        writeln!(out, "{line}")?;
        write_children(out, node, "", quiet)?;
    }
    Ok(())
}

fn write_children<W: Write>(out: &mut W, node: &TreeNode, indent: &str, quiet: bool) -> std::io::Result<()> {
    let last_index = node.children.len().saturating_sub(1);
    for (idx, (name, child)) in node.children.iter().enumerate() {
        let is_last = idx == last_index;
        let branch = if is_last { "└── " } else { "├── " };
        let margin = if quiet { "" } else { "  " };

        match child.count {
            Some(count) if !quiet => writeln!(out, "{margin}{indent}{branch}{name}  ({count} repo(s))")?,
            _ => writeln!(out, "{margin}{indent}{branch}{name}")?,
        }

        let next_indent = format!("{indent}{}", if is_last { "    " } else { "│   " });
        write_children(out, child, &next_indent, quiet)?;
    }
    Ok(())
}

fn remove_tag_globally(store: &mut TagStore, tag: &str, skip_confirm: bool, quiet: bool) -> Result<()> {
    let parsed = Tag::parse(tag)?;
    let repos: Vec<String> = store
        .repositories()
        .filter(|id| store.explicit_tags(id).contains(&parsed))
        .map(str::to_string)
        .collect();

    if repos.is_empty() {
        if !quiet {
            println!("Tag '{parsed}' not found in store.");
        }
        return Ok(());
    }

    if !quiet {
        println!("Found tag '{parsed}' in {} repo(s):", repos.len());
        for repo in &repos {
            println!("  - {repo}");
        }
        println!();
    }

    if !super::confirm("Remove tag from all repositories?", skip_confirm)? {
        if !quiet {
            println!("Cancelled.");
        }
        return Ok(());
    }

    let touched = store.update(|s| Ok(s.remove_tag_everywhere(tag)))?;
    if !quiet {
        println!("Removed tag '{parsed}' from {touched} repo(s).");
    }
    Ok(())
}
