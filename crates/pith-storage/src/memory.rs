//! In-memory object store.

use crate::{GitObject, ObjectDatabase, ObjectId, ObjectType, Result, StorageError};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Content-addressed object store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Objects indexed by their SHA-1 hash.
    objects: RwLock<HashMap<ObjectId, GitObject>>,
}

impl MemoryStore {
    /// Creates a new empty object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Lists all object IDs.
    pub fn list_objects(&self) -> Vec<ObjectId> {
        self.objects.read().keys().copied().collect()
    }
}

impl ObjectDatabase for MemoryStore {
    fn put(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let object = GitObject::new(object_type, payload.to_vec());
        let id = object.id;
        self.objects.write().entry(id).or_insert(object);
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> Result<GitObject> {
        self.objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_hex()))
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.objects.read().contains_key(id)
    }
}
