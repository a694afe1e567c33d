//! Git transfer for Pith.
//!
//! This crate implements the client half of the smart HTTP protocol
//! needed to clone a repository: pkt-line framing, ref negotiation,
//! pack decoding, reference-delta resolution, and checkout of the
//! fetched commit into a work tree.

mod checkout;
mod clone;
pub mod delta;
mod error;
mod negotiate;
mod pack;
mod pktline;
mod resolve;
mod transport;
pub mod varint;
mod worktree;

pub use checkout::{checkout, CheckoutSummary};
pub use clone::{clone_repository, CloneOptions, CloneOutcome};
pub use error::GitError;
pub use negotiate::{
    negotiate, parse_advertisement, want_request, AdvertisedRefs, Negotiation,
    ADVERTISEMENT_CONTENT_TYPE, REQUEST_CONTENT_TYPE,
};
pub use pack::{PackBuilder, PackEntry, PackHeader, PackParser, UnpackSummary};
pub use pktline::{PktLine, PktLineReader, PktLineWriter};
pub use resolve::{resolve_deltas, PendingDelta};
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use worktree::write_tree;

/// Result type for git protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;
