//! Tree objects: directory listings of `(mode, name, id)` entries.

use crate::{GitObject, ObjectId, ObjectType, Result, StorageError};
use std::fmt;

/// File mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Subdirectory (`40000`).
    Directory,
    /// Regular, non-executable file (`100644`).
    Regular,
    /// Executable file (`100755`).
    Executable,
    /// Symbolic link (`120000`).
    Symlink,
    /// Submodule commit (`160000`).
    Gitlink,
}

impl FileMode {
    /// Returns the mode as written inside tree payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "40000",
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Gitlink => "160000",
        }
    }

    /// Parses a mode string, accepting the zero-padded directory form too.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "40000" | "040000" => Ok(Self::Directory),
            "100644" => Ok(Self::Regular),
            "100755" => Ok(Self::Executable),
            "120000" => Ok(Self::Symlink),
            "160000" => Ok(Self::Gitlink),
            _ => Err(StorageError::format(format!("unknown file mode: {s}"))),
        }
    }

    /// Type of object an entry with this mode points at.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Directory => ObjectType::Tree,
            Self::Gitlink => ObjectType::Commit,
            Self::Regular | Self::Executable | Self::Symlink => ObjectType::Blob,
        }
    }
}

impl fmt::Display for FileMode {
    /// Six-digit form used by `ls-tree` output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0>6}", self.as_str())
    }
}

/// A single entry in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }
}

/// A parsed tree. Entries are always kept in ascending byte order of name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Builds a tree from entries given in any order. Names must be unique.
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(StorageError::format(format!(
                "duplicate tree entry {:?}",
                pair[0].name
            )));
        }
        Ok(Self { entries })
    }

    /// Returns the entries in serialization order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the entries as `"<mode> <name>\0<20-byte id>"` records.
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for entry in &self.entries {
            data.extend_from_slice(entry.mode.as_str().as_bytes());
            data.push(b' ');
            data.extend_from_slice(entry.name.as_bytes());
            data.push(0);
            data.extend_from_slice(entry.id.as_bytes());
        }
        data
    }

    /// Builds the tree object for this listing.
    pub fn to_object(&self) -> GitObject {
        GitObject::new(ObjectType::Tree, self.serialize())
    }

    /// Parses a tree payload. Entry order is preserved as stored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut rest = data;

        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| StorageError::format("tree entry missing mode separator"))?;
            let mode = std::str::from_utf8(&rest[..space])
                .map_err(|_| StorageError::format("tree entry mode is not UTF-8"))?;
            let mode = FileMode::parse(mode)?;
            rest = &rest[space + 1..];

            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| StorageError::format("tree entry missing name terminator"))?;
            let name = String::from_utf8(rest[..nul].to_vec())
                .map_err(|_| StorageError::format("tree entry name is not UTF-8"))?;
            rest = &rest[nul + 1..];

            if rest.len() < ObjectId::LEN {
                return Err(StorageError::format(format!(
                    "tree entry {name} truncated before object id"
                )));
            }
            let id = ObjectId::from_slice(&rest[..ObjectId::LEN])?;
            rest = &rest[ObjectId::LEN..];

            entries.push(TreeEntry { mode, name, id });
        }

        Ok(Self { entries })
    }
}
