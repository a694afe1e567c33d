//! Object database trait.
//!
//! Defines the interface every object store implements. Pack decoding,
//! delta resolution, checkout and the plumbing commands only ever talk to
//! a store through this trait.

use crate::{GitObject, ObjectId, ObjectType, Result};
use std::sync::Arc;

/// Content-addressed object storage.
///
/// `put` must be idempotent: storing identical content twice is a no-op
/// that returns the same id.
pub trait ObjectDatabase {
    /// Stores a payload under its content hash and returns the hash.
    fn put(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId>;

    /// Retrieves an object by ID, failing with `NotFound` if absent.
    fn get(&self, id: &ObjectId) -> Result<GitObject>;

    /// Checks if an object exists.
    fn exists(&self, id: &ObjectId) -> bool;

    /// Stores an already-built object.
    fn put_object(&self, object: &GitObject) -> Result<ObjectId> {
        self.put(object.object_type, &object.data)
    }

    /// Retrieves an object and checks its type.
    fn get_typed(&self, id: &ObjectId, expected: ObjectType) -> Result<GitObject> {
        let object = self.get(id)?;
        object.expect_type(expected)?;
        Ok(object)
    }
}

impl<T: ObjectDatabase + ?Sized> ObjectDatabase for Arc<T> {
    fn put(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        (**self).put(object_type, payload)
    }

    fn get(&self, id: &ObjectId) -> Result<GitObject> {
        (**self).get(id)
    }

    fn exists(&self, id: &ObjectId) -> bool {
        (**self).exists(id)
    }
}

impl<T: ObjectDatabase + ?Sized> ObjectDatabase for &T {
    fn put(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        (**self).put(object_type, payload)
    }

    fn get(&self, id: &ObjectId) -> Result<GitObject> {
        (**self).get(id)
    }

    fn exists(&self, id: &ObjectId) -> bool {
        (**self).exists(id)
    }
}
