//! Loose object store on the filesystem.

use crate::codec::{self, CompressionLevel};
use crate::{GitObject, ObjectDatabase, ObjectId, ObjectType, Result, StorageError};
use bytes::Bytes;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Filesystem-backed object store using the `objects/<2 hex>/<38 hex>` layout.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    /// The `objects` directory.
    root: PathBuf,
    level: CompressionLevel,
}

impl ObjectStore {
    /// Opens a store rooted at an `objects` directory. The directory is
    /// created lazily on first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            level: CompressionLevel::default(),
        }
    }

    /// Sets the compression level used for new objects.
    pub fn with_compression(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Returns the `objects` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path an object is stored at.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.loose_path_parts();
        self.root.join(dir).join(file)
    }

    /// Lists all object IDs currently on disk.
    pub fn list_objects(&self) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::new();
        let fan_out = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };

        for dir in fan_out {
            let dir = dir?;
            let prefix = dir.file_name().to_string_lossy().into_owned();
            if prefix.len() != 2 || !dir.file_type()?.is_dir() {
                continue;
            }
            for file in fs::read_dir(dir.path())? {
                let name = file?.file_name().to_string_lossy().into_owned();
                if let Ok(id) = ObjectId::from_hex(&format!("{prefix}{name}")) {
                    ids.push(id);
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

impl ObjectDatabase for ObjectStore {
    fn put(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::hash_object(object_type, payload);
        let path = self.object_path(&id);
        if path.exists() {
            tracing::trace!(id = %id, "object already stored");
            return Ok(id);
        }

        let (_, compressed) = codec::encode(object_type, payload, self.level)?;

        let dir = path
            .parent()
            .ok_or_else(|| StorageError::format(format!("no fan-out directory for {id}")))?;
        fs::create_dir_all(dir)?;

        // Readers must never see a partially written object.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&compressed)?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        tracing::debug!(id = %id, kind = %object_type, size = payload.len(), "stored object");
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> Result<GitObject> {
        let compressed = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_hex()))
            }
            Err(e) => return Err(e.into()),
        };

        let (object_type, _size, payload) = codec::decode(&compressed)?;
        Ok(GitObject {
            id: *id,
            object_type,
            data: Bytes::from(payload),
        })
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }
}
