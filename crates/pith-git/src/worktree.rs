//! Snapshots a directory into blob and tree objects.

use crate::{GitError, Result};
use pith_storage::{FileMode, ObjectDatabase, ObjectId, ObjectType, Tree, TreeEntry};
use std::fs;
use std::path::Path;

/// Stores every file under `dir` and returns the root tree id.
///
/// `.git` is skipped, as are symbolic links. Directories that end up with
/// no entries are left out of their parent; the root always yields a tree.
pub fn write_tree<D: ObjectDatabase + ?Sized>(db: &D, dir: &Path) -> Result<ObjectId> {
    let tree = build_tree(db, dir)?;
    let id = db.put(ObjectType::Tree, &tree.serialize())?;
    tracing::info!(tree = %id, entries = tree.entries().len(), "wrote tree");
    Ok(id)
}

fn build_tree<D: ObjectDatabase + ?Sized>(db: &D, dir: &Path) -> Result<Tree> {
    let mut entries = Vec::new();

    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        let name = dirent.file_name().into_string().map_err(|raw| {
            GitError::format(format!("file name {raw:?} is not valid UTF-8"))
        })?;
        if name == ".git" {
            continue;
        }

        let path = dirent.path();
        let file_type = dirent.file_type()?;
        if file_type.is_dir() {
            let subtree = build_tree(db, &path)?;
            if subtree.is_empty() {
                tracing::debug!(path = %path.display(), "omitting empty directory");
                continue;
            }
            let id = db.put(ObjectType::Tree, &subtree.serialize())?;
            entries.push(TreeEntry::new(FileMode::Directory, name, id));
        } else if file_type.is_file() {
            let content = fs::read(&path)?;
            let id = db.put(ObjectType::Blob, &content)?;
            entries.push(TreeEntry::new(file_mode(&dirent.metadata()?), name, id));
        } else {
            tracing::warn!(path = %path.display(), "not a regular file or directory, skipping");
        }
    }

    Ok(Tree::new(entries)?)
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        FileMode::Executable
    } else {
        FileMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> FileMode {
    FileMode::Regular
}
