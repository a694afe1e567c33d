//! Loose object storage for Pith.
//!
//! This crate provides content-addressed storage for git objects
//! (blobs, trees, commits, tags) in the canonical loose layout, plus
//! reference management and the repository directory skeleton.

mod codec;
mod commit;
mod error;
mod memory;
mod object;
mod refs;
mod repository;
mod store;
mod traits;
mod tree;

pub use codec::{decode, encode, CompressionLevel};
pub use commit::Commit;
pub use error::StorageError;
pub use memory::MemoryStore;
pub use object::{GitObject, ObjectId, ObjectType};
pub use refs::{RefStore, Reference};
pub use repository::Repository;
pub use store::ObjectStore;
pub use traits::ObjectDatabase;
pub use tree::{FileMode, Tree, TreeEntry};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
