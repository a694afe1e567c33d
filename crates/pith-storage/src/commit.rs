//! Commit objects.

use crate::{GitObject, ObjectId, ObjectType, Result, StorageError};

/// The metadata of a commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commits, in order.
    pub parents: Vec<ObjectId>,
    /// Author line value, e.g. `Name <mail> 1700000000 +0000`.
    pub author: String,
    /// Committer line value.
    pub committer: String,
    /// Message, stored after the blank line.
    pub message: String,
}

impl Commit {
    /// Serializes the commit payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut content = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            content.push_str(&format!("parent {}\n", parent));
        }
        content.push_str(&format!("author {}\n", self.author));
        content.push_str(&format!("committer {}\n", self.committer));
        content.push('\n');
        content.push_str(&self.message);
        if !self.message.ends_with('\n') {
            content.push('\n');
        }
        content.into_bytes()
    }

    /// Builds the commit object.
    pub fn to_object(&self) -> GitObject {
        GitObject::new(ObjectType::Commit, self.serialize())
    }

    /// Extracts the tree id from the first line of a commit payload.
    pub fn tree_of(data: &[u8]) -> Result<ObjectId> {
        let first_line = data.split(|&b| b == b'\n').next().unwrap_or_default();
        let hex = first_line
            .strip_prefix(b"tree ")
            .ok_or_else(|| StorageError::format("commit does not start with a tree line"))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| StorageError::format("commit tree id is not UTF-8"))?;
        ObjectId::from_hex(hex)
    }

    /// Parses the headers and message of a commit payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let tree = Self::tree_of(data)?;
        let text = String::from_utf8_lossy(data);
        let (headers, message) = text.split_once("\n\n").unwrap_or((&text, ""));

        let mut parents = Vec::new();
        let mut author = String::new();
        let mut committer = String::new();
        for line in headers.lines().skip(1) {
            if let Some(hex) = line.strip_prefix("parent ") {
                parents.push(ObjectId::from_hex(hex)?);
            } else if let Some(value) = line.strip_prefix("author ") {
                author = value.to_string();
            } else if let Some(value) = line.strip_prefix("committer ") {
                committer = value.to_string();
            }
        }

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: message.to_string(),
        })
    }
}
