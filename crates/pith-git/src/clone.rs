//! Clone orchestration: init, negotiate, unpack, checkout.

use crate::checkout::{checkout, CheckoutSummary};
use crate::negotiate::negotiate;
use crate::pack::PackParser;
use crate::transport::Transport;
use crate::Result;
use pith_storage::{CompressionLevel, ObjectId, Repository};
use std::path::Path;

/// Settings for [`clone_repository`].
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Branch recorded when the remote does not reveal which branch HEAD is.
    pub default_branch: String,
    /// Compression for objects written to the new repository.
    pub compression: CompressionLevel,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            default_branch: "master".to_string(),
            compression: CompressionLevel::default(),
        }
    }
}

/// What a clone produced.
#[derive(Debug, Clone)]
pub struct CloneOutcome {
    /// Commit checked out.
    pub head: ObjectId,
    /// Branch HEAD now points at.
    pub branch: String,
    /// Objects stored directly from the pack.
    pub objects: usize,
    /// Objects rebuilt from deltas.
    pub deltas: usize,
    /// Files and directories written.
    pub checkout: CheckoutSummary,
}

/// Clones the repository at `url` into `dest`.
///
/// On failure the partially populated `dest` is left in place.
pub fn clone_repository<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    dest: &Path,
    options: &CloneOptions,
) -> Result<(Repository, CloneOutcome)> {
    let repo =
        Repository::init(dest, &options.default_branch)?.with_compression(options.compression);
    tracing::info!(url = %url, dest = %dest.display(), "cloning");

    let negotiation = negotiate(transport, url)?;
    let head = negotiation.head;
    let branch = negotiation
        .refs
        .head_branch()
        .unwrap_or_else(|| options.default_branch.clone());

    repo.refs.set_branch(&branch, head)?;
    repo.refs.set_symbolic("HEAD", &format!("refs/heads/{branch}"))?;

    let unpacked = PackParser::new(&negotiation.pack).unpack(&repo.objects)?;
    let summary = checkout(&repo.objects, &head, repo.work_tree())?;

    tracing::info!(
        head = %head,
        branch = %branch,
        objects = unpacked.objects,
        deltas = unpacked.deltas,
        files = summary.files,
        "clone complete"
    );

    let outcome = CloneOutcome {
        head,
        branch,
        objects: unpacked.objects,
        deltas: unpacked.deltas,
        checkout: summary,
    };
    Ok((repo, outcome))
}
