//! Git reference management on disk.

use crate::{ObjectId, Result, StorageError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SYMREF_PREFIX: &str = "ref: ";
const MAX_SYMREF_DEPTH: usize = 5;

/// A git reference (branch, tag, or symbolic ref).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference (e.g., HEAD -> refs/heads/main).
    Symbolic(String),
}

impl Reference {
    /// Returns the object ID if this is a direct reference.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }

    fn parse(name: &str, content: &str) -> Result<Self> {
        let content = content.trim_end();
        if let Some(target) = content.strip_prefix(SYMREF_PREFIX) {
            return Ok(Self::Symbolic(target.trim().to_string()));
        }
        ObjectId::from_hex(content)
            .map(Self::Direct)
            .map_err(|_| StorageError::InvalidRef(format!("{name}: {content:?}")))
    }

    fn to_file_content(&self) -> String {
        match self {
            Self::Direct(id) => format!("{id}\n"),
            Self::Symbolic(target) => format!("{SYMREF_PREFIX}{target}\n"),
        }
    }
}

/// Reference store rooted at a git directory (`HEAD`, `refs/...`).
#[derive(Debug, Clone)]
pub struct RefStore {
    git_dir: PathBuf,
}

impl RefStore {
    /// Opens the reference store of a git directory.
    pub fn open(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    fn ref_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('/')
            && name
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != "..");
        if !valid {
            return Err(StorageError::InvalidRef(name.to_string()));
        }
        Ok(self.git_dir.join(Path::new(name)))
    }

    /// Gets a reference by name.
    pub fn get(&self, name: &str) -> Result<Reference> {
        let path = self.ref_path(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Reference::parse(name, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::InvalidRef(format!("{name} does not exist")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, reference: &Reference) -> Result<()> {
        let path = self.ref_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, reference.to_file_content())?;
        tracing::debug!(name = %name, target = ?reference, "updated reference");
        Ok(())
    }

    /// Sets a reference to point to an object.
    pub fn set(&self, name: &str, target: ObjectId) -> Result<()> {
        self.write(name, &Reference::Direct(target))
    }

    /// Sets a symbolic reference.
    pub fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        self.ref_path(target)?;
        self.write(name, &Reference::Symbolic(target.to_string()))
    }

    /// Points `refs/heads/<branch>` at a commit.
    pub fn set_branch(&self, branch: &str, target: ObjectId) -> Result<()> {
        self.set(&format!("refs/heads/{branch}"), target)
    }

    /// Resolves a reference to an object ID, following symbolic links.
    pub fn resolve(&self, name: &str) -> Result<ObjectId> {
        let mut current = name.to_string();
        for _ in 0..MAX_SYMREF_DEPTH {
            match self.get(&current)? {
                Reference::Direct(id) => return Ok(id),
                Reference::Symbolic(target) => current = target,
            }
        }
        Err(StorageError::InvalidRef(format!(
            "{name}: symbolic refs nested too deeply"
        )))
    }

    /// Resolves HEAD to a commit.
    pub fn resolve_head(&self) -> Result<ObjectId> {
        self.resolve("HEAD")
    }

    /// Gets the current branch name (if HEAD is symbolic).
    pub fn current_branch(&self) -> Option<String> {
        match self.get("HEAD").ok()? {
            Reference::Symbolic(target) => {
                target.strip_prefix("refs/heads/").map(|s| s.to_string())
            }
            Reference::Direct(_) => None,
        }
    }
}
