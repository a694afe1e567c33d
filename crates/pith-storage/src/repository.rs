//! Repository directory management.

use crate::{CompressionLevel, ObjectStore, RefStore, Result, StorageError};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the git directory inside a work tree.
pub const GIT_DIR_NAME: &str = ".git";

/// A git repository on disk: a work tree plus its git directory.
#[derive(Debug, Clone)]
pub struct Repository {
    work_tree: PathBuf,
    git_dir: PathBuf,
    /// Object store (`.git/objects`).
    pub objects: ObjectStore,
    /// Reference store (`.git/HEAD`, `.git/refs`).
    pub refs: RefStore,
}

impl Repository {
    fn at(work_tree: &Path) -> Self {
        let git_dir = work_tree.join(GIT_DIR_NAME);
        Self {
            work_tree: work_tree.to_path_buf(),
            objects: ObjectStore::open(git_dir.join("objects")),
            refs: RefStore::open(&git_dir),
            git_dir,
        }
    }

    /// Creates the git directory skeleton inside `work_tree` with HEAD
    /// pointing at `default_branch`. Re-initialising an existing repository
    /// only rewrites HEAD.
    pub fn init(work_tree: impl AsRef<Path>, default_branch: &str) -> Result<Self> {
        let work_tree = work_tree.as_ref();
        fs::create_dir_all(work_tree)?;

        let repo = Self::at(work_tree);
        fs::create_dir_all(repo.objects.root())?;
        fs::create_dir_all(repo.git_dir.join("refs").join("heads"))?;
        repo.refs
            .set_symbolic("HEAD", &format!("refs/heads/{default_branch}"))?;

        tracing::info!(path = %repo.git_dir.display(), "initialized repository");
        Ok(repo)
    }

    /// Opens an existing repository whose git directory lives in `work_tree`.
    pub fn open(work_tree: impl AsRef<Path>) -> Result<Self> {
        let repo = Self::at(work_tree.as_ref());
        if !repo.git_dir.join("HEAD").is_file() || !repo.objects.root().is_dir() {
            return Err(StorageError::NotFound(format!(
                "not a repository: {}",
                repo.work_tree.display()
            )));
        }
        Ok(repo)
    }

    /// Sets the compression level used for new objects.
    pub fn with_compression(mut self, level: CompressionLevel) -> Self {
        self.objects = self.objects.with_compression(level);
        self
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}
