//! Loose object store behaviour as seen by plumbing callers.

use pith_storage::{
    decode, Commit, FileMode, GitObject, ObjectDatabase, ObjectType, Repository, Tree, TreeEntry,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_snapshot_graph_roundtrip() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path(), "master").unwrap();
    let store = &repo.objects;

    let readme = store.put(ObjectType::Blob, b"# readme\n").unwrap();
    let main = store.put(ObjectType::Blob, b"fn main() {}\n").unwrap();
    let src_tree = Tree::new(vec![TreeEntry::new(FileMode::Regular, "main.rs", main)]).unwrap();
    let src = store.put_object(&src_tree.to_object()).unwrap();
    let root = store
        .put_object(
            &Tree::new(vec![
                TreeEntry::new(FileMode::Directory, "src", src),
                TreeEntry::new(FileMode::Regular, "README.md", readme),
            ])
            .unwrap()
            .to_object(),
        )
        .unwrap();

    let commit = Commit {
        tree: root,
        parents: Vec::new(),
        author: "A U Thor <author@example.com> 1700000000 +0000".into(),
        committer: "A U Thor <author@example.com> 1700000000 +0000".into(),
        message: "initial\n".into(),
    };
    let commit_id = store.put_object(&commit.to_object()).unwrap();
    repo.refs.set_branch("master", commit_id).unwrap();

    let head = repo.refs.resolve_head().unwrap();
    let stored = store.get_typed(&head, ObjectType::Commit).unwrap();
    assert_eq!(Commit::tree_of(&stored.data).unwrap(), root);

    let tree = Tree::parse(&store.get_typed(&root, ObjectType::Tree).unwrap().data).unwrap();
    let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["README.md", "src"]);
}

#[test]
fn test_on_disk_bytes_decode_with_header() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path(), "master").unwrap();
    let id = repo.objects.put(ObjectType::Blob, b"").unwrap();
    assert_eq!(id, GitObject::blob(Vec::new()).id);

    let raw = fs::read(repo.objects.object_path(&id)).unwrap();
    let (object_type, size, payload) = decode(&raw).unwrap();
    assert_eq!(object_type, ObjectType::Blob);
    assert_eq!(size, 0);
    assert!(payload.is_empty());
}

#[test]
fn test_redundant_puts_leave_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path(), "master").unwrap();

    let payloads: Vec<Vec<u8>> = (0..16).map(|i| vec![i as u8; i * 31]).collect();
    let first: Vec<_> = payloads
        .iter()
        .map(|p| repo.objects.put(ObjectType::Blob, p).unwrap())
        .collect();
    let snapshot: Vec<_> = first
        .iter()
        .map(|id| fs::read(repo.objects.object_path(id)).unwrap())
        .collect();

    for (payload, id) in payloads.iter().zip(&first).rev() {
        assert_eq!(repo.objects.put(ObjectType::Blob, payload).unwrap(), *id);
    }
    for (id, bytes) in first.iter().zip(&snapshot) {
        assert_eq!(&fs::read(repo.objects.object_path(id)).unwrap(), bytes);
        assert_eq!(repo.objects.get(id).unwrap().object_type, ObjectType::Blob);
    }
    assert_eq!(repo.objects.list_objects().unwrap().len(), payloads.len());
}
