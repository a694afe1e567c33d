//! CLI command implementations.

use crate::config::Config;
use anyhow::Context as _;
use pith_git::{clone_repository, write_tree, CloneOptions, HttpTransport};
use pith_storage::{
    Commit, GitObject, ObjectDatabase, ObjectId, ObjectType, Repository, StorageError, Tree,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("not a valid object name: {0}")]
    BadObjectName(String),

    #[error("cannot derive a directory name from {0:?}")]
    NoDirectoryName(String),

    #[error("destination {0} already exists and is not empty")]
    DestinationExists(PathBuf),
}

pub type Result<T> = anyhow::Result<T>;

/// What `cat-file` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatMode {
    Pretty,
    Type,
    Size,
    Exists,
}

/// Which columns `ls-tree` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Full,
    Long,
    NameOnly,
    ObjectOnly,
}

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    /// Work tree the command operates on.
    pub work_tree: PathBuf,
    pub config: Config,
}

impl Context {
    fn repo(&self) -> Result<Repository> {
        let repo = Repository::open(&self.work_tree)
            .with_context(|| format!("no repository at {}", self.work_tree.display()))?;
        Ok(repo.with_compression(self.config.compression))
    }
}

/// Initialize a new repository.
pub fn init(ctx: &Context, branch: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let branch = branch.unwrap_or(&ctx.config.default_branch);
    let repo = Repository::init(&ctx.work_tree, branch)
        .with_context(|| format!("failed to initialize {}", ctx.work_tree.display()))?;

    writeln!(
        out,
        "Initialized empty Pith repository in {}",
        repo.git_dir().display()
    )?;
    Ok(())
}

/// Hash a file as a blob, optionally storing it.
pub fn hash_object(ctx: &Context, file: &Path, write: bool, out: &mut dyn Write) -> Result<()> {
    let content =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    let id = if write {
        ctx.repo()?.objects.put(ObjectType::Blob, &content)?
    } else {
        ObjectId::hash_object(ObjectType::Blob, &content)
    };

    writeln!(out, "{id}")?;
    Ok(())
}

/// Inspect an object. Returns false when `-e` finds nothing.
pub fn cat_file(ctx: &Context, mode: CatMode, name: &str, out: &mut dyn Write) -> Result<bool> {
    let repo = ctx.repo()?;

    if mode == CatMode::Exists {
        return Ok(resolve_name(&repo, name)
            .map(|id| repo.objects.exists(&id))
            .unwrap_or(false));
    }

    let id = resolve_name(&repo, name)?;
    let object = repo.objects.get(&id)?;
    match mode {
        CatMode::Type => writeln!(out, "{}", object.object_type)?,
        CatMode::Size => writeln!(out, "{}", object.size())?,
        CatMode::Pretty if object.object_type == ObjectType::Tree => {
            write_tree_listing(&repo, &object, ListFormat::Full, out)?;
        }
        CatMode::Pretty => out.write_all(&object.data)?,
        CatMode::Exists => {}
    }
    Ok(true)
}

/// List a tree, or the tree of a commit.
pub fn ls_tree(ctx: &Context, name: &str, format: ListFormat, out: &mut dyn Write) -> Result<()> {
    let repo = ctx.repo()?;
    let id = resolve_name(&repo, name)?;

    let mut object = repo.objects.get(&id)?;
    if object.object_type == ObjectType::Commit {
        let tree = Commit::tree_of(&object.data)?;
        object = repo.objects.get_typed(&tree, ObjectType::Tree)?;
    }
    object.expect_type(ObjectType::Tree)?;

    write_tree_listing(&repo, &object, format, out)
}

fn write_tree_listing(
    repo: &Repository,
    tree: &GitObject,
    format: ListFormat,
    out: &mut dyn Write,
) -> Result<()> {
    for entry in Tree::parse(&tree.data)?.entries() {
        let kind = entry.mode.object_type();
        match format {
            ListFormat::NameOnly => writeln!(out, "{}", entry.name)?,
            ListFormat::ObjectOnly => writeln!(out, "{}", entry.id)?,
            ListFormat::Full => {
                writeln!(out, "{} {kind} {}\t{}", entry.mode, entry.id, entry.name)?;
            }
            ListFormat::Long => {
                let size = if kind == ObjectType::Blob {
                    repo.objects.get(&entry.id)?.size().to_string()
                } else {
                    "-".to_string()
                };
                writeln!(
                    out,
                    "{} {kind} {} {size:>7}\t{}",
                    entry.mode, entry.id, entry.name
                )?;
            }
        }
    }
    Ok(())
}

/// Snapshot the work tree and print the root tree id.
pub fn write_tree_cmd(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let repo = ctx.repo()?;
    let id = write_tree(&repo.objects, repo.work_tree())?;
    writeln!(out, "{id}")?;
    Ok(())
}

/// Create a commit object from a tree.
pub fn commit_tree(
    ctx: &Context,
    tree: &str,
    parents: &[String],
    message: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let repo = ctx.repo()?;

    let tree = resolve_name(&repo, tree)?;
    repo.objects
        .get_typed(&tree, ObjectType::Tree)
        .with_context(|| format!("{tree} is not a tree"))?;

    let parents = parents
        .iter()
        .map(|name| {
            let id = resolve_name(&repo, name)?;
            repo.objects
                .get_typed(&id, ObjectType::Commit)
                .with_context(|| format!("parent {id} is not a commit"))?;
            Ok(id)
        })
        .collect::<Result<Vec<_>>>()?;

    let identity = ctx.config.identity();
    let commit = Commit {
        tree,
        parents,
        author: identity.clone(),
        committer: identity,
        message: message.to_string(),
    };
    let id = repo.objects.put_object(&commit.to_object())?;
    tracing::info!(commit = %id, tree = %tree, "created commit");

    writeln!(out, "{id}")?;
    Ok(())
}

/// Clone a repository over smart HTTP.
pub fn clone(
    ctx: &Context,
    url: &str,
    dir: Option<&Path>,
    default_branch: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let dest = match dir {
        Some(dir) => ctx.work_tree.join(dir),
        None => ctx.work_tree.join(directory_name(url)?),
    };
    if dest.exists() && dest.read_dir()?.next().is_some() {
        return Err(CliError::DestinationExists(dest).into());
    }

    let options = CloneOptions {
        default_branch: default_branch
            .unwrap_or(&ctx.config.default_branch)
            .to_string(),
        compression: ctx.config.compression,
    };
    let transport = HttpTransport::new(&ctx.config.user_agent, ctx.config.timeout())?;
    let (_, outcome) = clone_repository(&transport, url, &dest, &options)
        .with_context(|| format!("failed to clone {url}"))?;

    writeln!(out, "Cloned into '{}'", dest.display())?;
    writeln!(
        out,
        "  objects: {} ({} from deltas)",
        outcome.objects + outcome.deltas,
        outcome.deltas
    )?;
    writeln!(out, "  files:   {}", outcome.checkout.files)?;
    if !outcome.checkout.skipped.is_empty() {
        writeln!(out, "  skipped: {}", outcome.checkout.skipped.len())?;
    }
    writeln!(out, "  HEAD:    {} ({})", outcome.head, outcome.branch)?;
    Ok(())
}

/// Last path segment of a URL without a `.git` suffix.
fn directory_name(url: &str) -> Result<String> {
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() || name.contains(':') {
        return Err(CliError::NoDirectoryName(url.to_string()).into());
    }
    Ok(name.to_string())
}

/// Resolves a full hex id, a ref such as `HEAD`, or a branch name.
fn resolve_name(repo: &Repository, name: &str) -> Result<ObjectId> {
    if let Ok(id) = name.parse::<ObjectId>() {
        return Ok(id);
    }
    for candidate in [name.to_string(), format!("refs/heads/{name}")] {
        match repo.refs.resolve(&candidate) {
            Ok(id) => return Ok(id),
            Err(StorageError::NotFound(_) | StorageError::InvalidRef(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(CliError::BadObjectName(name.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context {
            work_tree: dir.path().to_path_buf(),
            config: Config::default(),
        };
        init(&ctx, None, &mut Vec::new()).unwrap();
        (dir, ctx)
    }

    fn run(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_init_writes_head() {
        let dir = TempDir::new().unwrap();
        let ctx = Context {
            work_tree: dir.path().to_path_buf(),
            config: Config::default(),
        };
        let output = run(|out| init(&ctx, Some("trunk"), out));
        assert!(output.starts_with("Initialized empty Pith repository in "));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".git/HEAD")).unwrap(),
            "ref: refs/heads/trunk\n"
        );
    }

    #[test]
    fn test_hash_object_and_cat_file() {
        let (dir, ctx) = setup();
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, b"hello\n").unwrap();

        let printed = run(|out| hash_object(&ctx, &file, false, out));
        assert_eq!(printed, "ce013625030ba8dba906f756967f9e9ca394464a\n");
        let hex = printed.trim();

        // not written yet
        assert!(!cat_file(&ctx, CatMode::Exists, hex, &mut Vec::new()).unwrap());

        run(|out| hash_object(&ctx, &file, true, out));
        assert!(cat_file(&ctx, CatMode::Exists, hex, &mut Vec::new()).unwrap());
        assert_eq!(
            run(|out| cat_file(&ctx, CatMode::Pretty, hex, out).map(|_| ())),
            "hello\n"
        );
        assert_eq!(
            run(|out| cat_file(&ctx, CatMode::Type, hex, out).map(|_| ())),
            "blob\n"
        );
        assert_eq!(
            run(|out| cat_file(&ctx, CatMode::Size, hex, out).map(|_| ())),
            "6\n"
        );
    }

    #[test]
    fn test_write_tree_commit_tree_ls_tree() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join("a.txt"), b"alpha\n").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/guide.md"), b"# guide\n").unwrap();

        let tree = run(|out| write_tree_cmd(&ctx, out)).trim().to_string();
        let listing = run(|out| ls_tree(&ctx, &tree, ListFormat::Full, out));
        let lines: Vec<_> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("100644 blob "));
        assert!(lines[0].ends_with("\ta.txt"));
        assert!(lines[1].starts_with("040000 tree "));
        assert!(lines[1].ends_with("\tdocs"));

        assert_eq!(
            run(|out| ls_tree(&ctx, &tree, ListFormat::NameOnly, out)),
            "a.txt\ndocs\n"
        );
        let long = run(|out| ls_tree(&ctx, &tree, ListFormat::Long, out));
        assert!(long.lines().next().unwrap().contains("      6\ta.txt"));
        assert!(long.lines().nth(1).unwrap().contains("      -\tdocs"));

        let commit = run(|out| commit_tree(&ctx, &tree, &[], "first", out))
            .trim()
            .to_string();
        assert_eq!(
            run(|out| cat_file(&ctx, CatMode::Type, &commit, out).map(|_| ())),
            "commit\n"
        );
        let body = run(|out| cat_file(&ctx, CatMode::Pretty, &commit, out).map(|_| ()));
        assert!(body.starts_with(&format!("tree {tree}\n")));
        assert!(body.ends_with("\nfirst\n"));

        // a commit lists as its tree
        assert_eq!(
            run(|out| ls_tree(&ctx, &commit, ListFormat::ObjectOnly, out)).lines().count(),
            2
        );

        let child = run(|out| commit_tree(&ctx, &tree, &[commit.clone()], "second", out));
        let body = run(|out| cat_file(&ctx, CatMode::Pretty, child.trim(), out).map(|_| ()));
        assert!(body.contains(&format!("parent {commit}\n")));
    }

    #[test]
    fn test_commit_tree_type_checks() {
        let (dir, ctx) = setup();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        let blob = run(|out| hash_object(&ctx, &file, true, out))
            .trim()
            .to_string();

        assert!(commit_tree(&ctx, &blob, &[], "m", &mut Vec::new()).is_err());

        let tree = run(|out| write_tree_cmd(&ctx, out)).trim().to_string();
        assert!(commit_tree(&ctx, &tree, &[blob], "m", &mut Vec::new()).is_err());
    }

    #[test]
    fn test_bad_object_name() {
        let (_dir, ctx) = setup();
        let err = cat_file(&ctx, CatMode::Type, "no-such-thing", &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::BadObjectName(_))
        ));
    }

    #[test]
    fn test_commands_need_repository() {
        let dir = TempDir::new().unwrap();
        let ctx = Context {
            work_tree: dir.path().to_path_buf(),
            config: Config::default(),
        };
        assert!(write_tree_cmd(&ctx, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_directory_name() {
        assert_eq!(
            directory_name("https://example.com/org/tool.git").unwrap(),
            "tool"
        );
        assert_eq!(directory_name("http://host/repo/").unwrap(), "repo");
        assert!(directory_name("https://example.com/.git").is_err());
        assert!(directory_name("http://host:8080").is_err());
    }

    #[test]
    fn test_clone_refuses_non_empty_destination() {
        let (dir, ctx) = setup();
        std::fs::create_dir(dir.path().join("busy")).unwrap();
        std::fs::write(dir.path().join("busy/file"), b"x").unwrap();

        let err = clone(
            &ctx,
            "http://127.0.0.1:9/busy.git",
            None,
            None,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::DestinationExists(_))
        ));
    }
}
