//! Smart HTTP ref negotiation (client side).
//!
//! Implements the minimal two-request fetch: read the ref advertisement,
//! then ask for exactly the commit HEAD points at.
//! See: https://git-scm.com/docs/http-protocol

use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::transport::{HttpResponse, Transport};
use crate::{GitError, Result};
use pith_storage::ObjectId;
use std::collections::BTreeMap;
use std::io::Read;

/// Service the client speaks to.
pub const UPLOAD_PACK_SERVICE: &str = "git-upload-pack";
/// Content type of the ref advertisement.
pub const ADVERTISEMENT_CONTENT_TYPE: &str = "application/x-git-upload-pack-advertisement";
/// Content type of the pack request.
pub const REQUEST_CONTENT_TYPE: &str = "application/x-git-upload-pack-request";

const SERVICE_LINE: &str = "# service=git-upload-pack";
const ACKNOWLEDGEMENT: &str = "NAK";
const EMPTY_REPO_REF: &str = "capabilities^{}";

/// References advertised by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisedRefs {
    /// Ref name to object id.
    pub refs: BTreeMap<String, ObjectId>,
    /// Capabilities sent after the first ref.
    pub capabilities: Vec<String>,
}

impl AdvertisedRefs {
    /// Returns the commit HEAD points at.
    pub fn head(&self) -> Result<ObjectId> {
        self.refs
            .get("HEAD")
            .copied()
            .ok_or_else(|| GitError::protocol("no HEAD reference advertised"))
    }

    /// Finds the branch whose tip equals HEAD.
    ///
    /// Prefers the target named by a `symref=HEAD:` capability, then the
    /// first matching `refs/heads/*` entry.
    pub fn head_branch(&self) -> Option<String> {
        let head = self.refs.get("HEAD")?;

        let symref = self
            .capabilities
            .iter()
            .find_map(|cap| cap.strip_prefix("symref=HEAD:"))
            .filter(|target| self.refs.get(*target) == Some(head));

        symref
            .map(str::to_string)
            .or_else(|| {
                self.refs
                    .iter()
                    .find(|(name, id)| name.starts_with("refs/heads/") && *id == head)
                    .map(|(name, _)| name.clone())
            })
            .and_then(|name| name.strip_prefix("refs/heads/").map(str::to_string))
    }
}

/// Result of a completed negotiation.
#[derive(Debug)]
pub struct Negotiation {
    /// The advertisement the pack was requested from.
    pub refs: AdvertisedRefs,
    /// The commit that was requested.
    pub head: ObjectId,
    /// Raw pack stream, exactly as received after the acknowledgement.
    pub pack: Vec<u8>,
}

/// Performs the advertisement and pack request against `repo_url`.
pub fn negotiate<T: Transport + ?Sized>(transport: &T, repo_url: &str) -> Result<Negotiation> {
    let base = repo_url.trim_end_matches('/');

    let info_url = format!("{base}/info/refs?service={UPLOAD_PACK_SERVICE}");
    let response = transport.get(&info_url)?;
    check_response(&response, &info_url, Some(ADVERTISEMENT_CONTENT_TYPE))?;

    let refs = parse_advertisement(response.body)?;
    let head = refs.head()?;
    tracing::info!(head = %head, refs = refs.refs.len(), "received ref advertisement");

    let pack_url = format!("{base}/{UPLOAD_PACK_SERVICE}");
    let response = transport.post(&pack_url, REQUEST_CONTENT_TYPE, want_request(&head)?)?;
    check_response(&response, &pack_url, None)?;

    let mut reader = PktLineReader::new(response.body);
    match reader.read()? {
        Some(pkt) if pkt.as_str() == Some(ACKNOWLEDGEMENT) => {}
        other => {
            return Err(GitError::protocol(format!(
                "expected {ACKNOWLEDGEMENT} acknowledgement, got {other:?}"
            )))
        }
    }

    let mut pack = Vec::new();
    reader.into_inner().read_to_end(&mut pack)?;
    tracing::info!(bytes = pack.len(), "received pack");

    Ok(Negotiation { refs, head, pack })
}

fn check_response(response: &HttpResponse, url: &str, content_type: Option<&str>) -> Result<()> {
    if response.status != 200 {
        return Err(GitError::Fetch(format!(
            "{url} returned status {}",
            response.status
        )));
    }
    if let Some(expected) = content_type {
        if response.content_type.as_deref() != Some(expected) {
            return Err(GitError::Fetch(format!(
                "{url} returned content type {:?}, expected {expected}",
                response.content_type
            )));
        }
    }
    Ok(())
}

/// Parses a framed ref advertisement.
pub fn parse_advertisement<R: Read>(body: R) -> Result<AdvertisedRefs> {
    let mut reader = PktLineReader::new(body);

    match reader.read()? {
        Some(pkt) if pkt.as_str() == Some(SERVICE_LINE) => {}
        other => {
            return Err(GitError::protocol(format!(
                "expected {SERVICE_LINE:?}, got {other:?}"
            )))
        }
    }

    let mut advertised = AdvertisedRefs::default();
    let mut seen_separator = false;
    loop {
        match reader.read()? {
            None => break,
            Some(PktLine::Flush) if !seen_separator && advertised.refs.is_empty() => {
                seen_separator = true;
            }
            Some(PktLine::Flush) => break,
            Some(PktLine::Data(data)) => {
                seen_separator = true;
                parse_ref_line(&data, &mut advertised)?;
            }
            Some(other) => {
                return Err(GitError::protocol(format!(
                    "unexpected packet in advertisement: {other:?}"
                )))
            }
        }
    }

    Ok(advertised)
}

fn parse_ref_line(data: &[u8], advertised: &mut AdvertisedRefs) -> Result<()> {
    let line = data.strip_suffix(b"\n").unwrap_or(data);
    let (head, capabilities) = match line.iter().position(|&b| b == 0) {
        Some(nul) => (&line[..nul], Some(&line[nul + 1..])),
        None => (line, None),
    };

    let head = std::str::from_utf8(head)
        .map_err(|_| GitError::protocol("ref line is not UTF-8"))?;
    let (hash, name) = head
        .split_once(' ')
        .ok_or_else(|| GitError::protocol(format!("malformed ref line {head:?}")))?;
    let id = ObjectId::from_hex(hash)
        .map_err(|_| GitError::protocol(format!("malformed object id {hash:?}")))?;
    if name.is_empty() {
        return Err(GitError::protocol("ref line has no name"));
    }

    if let Some(capabilities) = capabilities {
        advertised.capabilities = String::from_utf8_lossy(capabilities)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        tracing::debug!(capabilities = ?advertised.capabilities, "server capabilities");
    }

    if name != EMPTY_REPO_REF {
        tracing::debug!(name = %name, id = %id, "advertised ref");
        advertised.refs.insert(name.to_string(), id);
    }
    Ok(())
}

/// Builds the pack request body: one want line, a flush, and `done`.
pub fn want_request(head: &ObjectId) -> Result<Vec<u8>> {
    let mut writer = PktLineWriter::new(Vec::new());
    writer.write_line(&format!("want {head}"))?;
    writer.flush_pkt()?;
    writer.write_line("done")?;
    Ok(writer.into_inner())
}
