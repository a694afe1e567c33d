//! Clones from a local smart HTTP fixture server.

use pith_git::varint::{self, DELTA_SEED_BITS};
use pith_git::{
    clone_repository, want_request, CloneOptions, GitError, HttpTransport, PackBuilder,
    PktLineWriter, ADVERTISEMENT_CONTENT_TYPE, REQUEST_CONTENT_TYPE,
};
use pith_storage::{Commit, FileMode, GitObject, ObjectId, ObjectType, Tree, TreeEntry};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_CONTENT: &[u8] = b"line one\nline two\nline three\n";
const DELTA_CONTENT: &[u8] = b"line one\nline two\nline 3\n";

struct Fixture {
    commit: ObjectId,
    expected: Vec<ObjectId>,
    advertisement: Vec<u8>,
    pack: Vec<u8>,
}

/// One commit whose tree holds `a.txt` (stored whole) and `b.txt`
/// (sent as a delta against `a.txt`).
fn fixture() -> Fixture {
    let base = GitObject::blob(BASE_CONTENT.to_vec());
    let derived = ObjectId::hash_object(ObjectType::Blob, DELTA_CONTENT);

    let tree = Tree::new(vec![
        TreeEntry::new(FileMode::Regular, "b.txt", derived),
        TreeEntry::new(FileMode::Regular, "a.txt", base.id),
    ])
    .unwrap()
    .to_object();
    let commit = Commit {
        tree: tree.id,
        parents: Vec::new(),
        author: "Fixture <fixture@example.com> 1700000000 +0000".to_string(),
        committer: "Fixture <fixture@example.com> 1700000000 +0000".to_string(),
        message: "Initial commit\n".to_string(),
    }
    .to_object();

    let mut delta = varint::encode(BASE_CONTENT.len() as u64, DELTA_SEED_BITS, 0);
    delta.extend(varint::encode(
        DELTA_CONTENT.len() as u64,
        DELTA_SEED_BITS,
        0,
    ));
    // copy "line one\nline two\n", then insert "line 3\n"
    delta.extend_from_slice(&[0x90, 18]);
    delta.push(7);
    delta.extend_from_slice(b"line 3\n");

    let mut expected = vec![commit.id, tree.id, base.id, derived];
    expected.sort();

    let mut builder = PackBuilder::new();
    builder.add(commit.clone());
    builder.add_ref_delta(base.id, delta);
    builder.add(tree);
    builder.add(base);
    let pack = builder.build().unwrap();

    let mut writer = PktLineWriter::new(Vec::new());
    writer.write_line("# service=git-upload-pack").unwrap();
    writer.flush_pkt().unwrap();
    let mut first = format!("{} HEAD", commit.id).into_bytes();
    first.push(0);
    first.extend_from_slice(b"multi_ack side-band-64k symref=HEAD:refs/heads/main\n");
    writer.write_data(&first).unwrap();
    writer
        .write_line(&format!("{} refs/heads/main", commit.id))
        .unwrap();
    writer.flush_pkt().unwrap();

    Fixture {
        commit: commit.id,
        expected,
        advertisement: writer.into_inner(),
        pack,
    }
}

async fn serve(fixture: &Fixture) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.git/info/refs"))
        .and(query_param("service", "git-upload-pack"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(fixture.advertisement.clone(), ADVERTISEMENT_CONTENT_TYPE),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut response = b"0008NAK\n".to_vec();
    response.extend_from_slice(&fixture.pack);
    Mock::given(method("POST"))
        .and(path("/demo.git/git-upload-pack"))
        .and(header("content-type", REQUEST_CONTENT_TYPE))
        .and(body_bytes(want_request(&fixture.commit).unwrap()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(response, "application/x-git-upload-pack-result"),
        )
        .expect(1)
        .mount(&server)
        .await;

    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clone_end_to_end() {
    let fixture = fixture();
    let server = serve(&fixture).await;
    let url = format!("{}/demo.git", server.uri());

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("demo");
    let target = dest.clone();
    let (repo, outcome) = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new("pith/test", None)?;
        clone_repository(&transport, &url, &target, &CloneOptions::default())
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(outcome.head, fixture.commit);
    assert_eq!(outcome.branch, "main");
    assert_eq!(outcome.objects, 3);
    assert_eq!(outcome.deltas, 1);
    assert_eq!(outcome.checkout.files, 2);

    assert_eq!(fs::read(dest.join("a.txt")).unwrap(), BASE_CONTENT);
    assert_eq!(fs::read(dest.join("b.txt")).unwrap(), DELTA_CONTENT);

    assert_eq!(repo.objects.list_objects().unwrap(), fixture.expected);

    assert_eq!(
        fs::read_to_string(dest.join(".git/HEAD")).unwrap(),
        "ref: refs/heads/main\n"
    );
    assert_eq!(
        fs::read_to_string(dest.join(".git/refs/heads/main")).unwrap(),
        format!("{}\n", fixture.commit)
    );
    assert_eq!(repo.refs.resolve_head().unwrap(), fixture.commit);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clone_missing_repository() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let url = format!("{}/missing.git", server.uri());

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("missing");
    let result = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new("pith/test", None)?;
        clone_repository(&transport, &url, &dest, &CloneOptions::default())
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(GitError::Fetch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clone_rejects_dumb_server() {
    let fixture = fixture();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/demo.git/info/refs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(fixture.advertisement.clone(), "text/plain"),
        )
        .mount(&server)
        .await;
    let url = format!("{}/demo.git", server.uri());

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("demo");
    let result = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new("pith/test", None)?;
        clone_repository(&transport, &url, &dest, &CloneOptions::default())
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(GitError::Fetch(_))));
}
