//! Materialises a commit's tree onto the filesystem.

use crate::{GitError, Result};
use pith_storage::{Commit, FileMode, ObjectDatabase, ObjectId, ObjectType, Tree};
use std::fs;
use std::path::{Path, PathBuf};

/// What a checkout wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSummary {
    /// Regular files written.
    pub files: usize,
    /// Directories created or reused.
    pub directories: usize,
    /// Entries left out because their mode is not supported.
    pub skipped: Vec<PathBuf>,
}

/// Writes the tree of `commit` under `root`, overwriting existing files.
pub fn checkout<D: ObjectDatabase + ?Sized>(
    db: &D,
    commit: &ObjectId,
    root: &Path,
) -> Result<CheckoutSummary> {
    let object = db.get_typed(commit, ObjectType::Commit)?;
    let parsed = Commit::parse(&object.data)?;
    let tree = parsed.tree;
    tracing::info!(
        commit = %commit,
        tree = %tree,
        parents = parsed.parents.len(),
        root = %root.display(),
        "checking out"
    );

    let mut summary = CheckoutSummary::default();
    fs::create_dir_all(root)?;
    checkout_tree(db, &tree, root, &mut summary)?;

    if !summary.skipped.is_empty() {
        tracing::warn!(skipped = summary.skipped.len(), "checkout skipped entries");
    }
    Ok(summary)
}

fn checkout_tree<D: ObjectDatabase + ?Sized>(
    db: &D,
    id: &ObjectId,
    dir: &Path,
    summary: &mut CheckoutSummary,
) -> Result<()> {
    let object = db.get_typed(id, ObjectType::Tree)?;
    let tree = Tree::parse(&object.data)?;

    for entry in tree.entries() {
        check_entry_name(&entry.name)?;
        let path = dir.join(&entry.name);

        match entry.mode {
            FileMode::Regular => {
                let blob = db.get_typed(&entry.id, ObjectType::Blob)?;
                fs::write(&path, &blob.data)?;
                tracing::debug!(path = %path.display(), size = blob.data.len(), "wrote file");
                summary.files += 1;
            }
            FileMode::Directory => {
                fs::create_dir_all(&path)?;
                summary.directories += 1;
                checkout_tree(db, &entry.id, &path, summary)?;
            }
            mode => {
                tracing::warn!(path = %path.display(), mode = mode.as_str(), "unsupported mode, skipping");
                summary.skipped.push(path);
            }
        }
    }
    Ok(())
}

/// Rejects names that would escape or alias the directory being written.
fn check_entry_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name == ".git" || name.contains('/') {
        return Err(GitError::format(format!("unsafe tree entry name {name:?}")));
    }
    Ok(())
}
