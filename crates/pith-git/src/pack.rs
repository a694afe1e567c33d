//! Git pack file format implementation.
//!
//! Pack files are the format used by git for efficient object transfer.
//! See: https://git-scm.com/docs/pack-format

use crate::resolve::{resolve_deltas, PendingDelta};
use crate::varint::{self, PACK_SEED_BITS};
use crate::{GitError, Result};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use pith_storage::{GitObject, ObjectDatabase, ObjectId, ObjectType};
use sha1::{Digest, Sha1};
use std::io::Write;

/// Magic bytes at the start of a pack file.
const PACK_SIGNATURE: &[u8; 4] = b"PACK";
/// Version written by [`PackBuilder`].
const PACK_VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const TRAILER_LEN: usize = 20;
/// Upper bound on the up-front allocation for an inflated entry.
const MAX_PREALLOC: usize = 16 << 20;
const INFLATE_CHUNK: usize = 32 * 1024;

const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

/// Fixed-size header at the start of a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    /// Pack format version (2 or 3).
    pub version: u32,
    /// Number of entries that follow.
    pub entries: u32,
}

/// One decoded pack entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackEntry {
    /// A complete object.
    Object {
        object_type: ObjectType,
        data: Vec<u8>,
    },
    /// A delta against the object named by `base`.
    RefDelta { base: ObjectId, delta: Vec<u8> },
}

/// What [`PackParser::unpack`] stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Entries stored as-is.
    pub objects: usize,
    /// Entries reconstructed from deltas.
    pub deltas: usize,
    /// Every stored id, direct objects first, in pack order.
    pub ids: Vec<ObjectId>,
}

/// Builds a pack file from a set of entries.
pub struct PackBuilder {
    entries: Vec<PackEntry>,
}

impl PackBuilder {
    /// Creates a new pack builder.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an object to the pack.
    pub fn add(&mut self, object: GitObject) {
        self.entries.push(PackEntry::Object {
            object_type: object.object_type,
            data: object.data.to_vec(),
        });
    }

    /// Adds an object from the store by ID.
    pub fn add_from_store<D: ObjectDatabase + ?Sized>(
        &mut self,
        db: &D,
        id: &ObjectId,
    ) -> Result<()> {
        let object = db.get(id)?;
        self.add(object);
        Ok(())
    }

    /// Adds a reference delta against `base`.
    pub fn add_ref_delta(&mut self, base: ObjectId, delta: Vec<u8>) {
        self.entries.push(PackEntry::RefDelta { base, delta });
    }

    /// Builds the pack file, trailer included.
    pub fn build(self) -> Result<Vec<u8>> {
        let mut pack = Vec::new();

        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&PACK_VERSION.to_be_bytes());
        let count = u32::try_from(self.entries.len())
            .map_err(|_| GitError::format("too many pack entries"))?;
        pack.extend_from_slice(&count.to_be_bytes());

        for entry in &self.entries {
            Self::write_entry(&mut pack, entry)?;
        }

        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);

        Ok(pack)
    }

    /// Writes a single entry.
    fn write_entry(pack: &mut Vec<u8>, entry: &PackEntry) -> Result<()> {
        let (type_code, payload) = match entry {
            PackEntry::Object { object_type, data } => (object_type.pack_type(), data),
            PackEntry::RefDelta { delta, .. } => (REF_DELTA, delta),
        };

        pack.extend(varint::encode(
            payload.len() as u64,
            PACK_SEED_BITS,
            type_code << 4,
        ));
        if let PackEntry::RefDelta { base, .. } = entry {
            pack.extend_from_slice(base.as_bytes());
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload)?;
        pack.extend(encoder.finish()?);

        Ok(())
    }
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a pack file held in memory.
pub struct PackParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackParser<'a> {
    /// Creates a new pack parser.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads the 12-byte pack header.
    pub fn read_header(&mut self) -> Result<PackHeader> {
        let header = self
            .data
            .get(self.pos..self.pos + HEADER_LEN)
            .ok_or_else(|| GitError::format("pack too small for header"))?;

        if &header[0..4] != PACK_SIGNATURE {
            return Err(GitError::protocol(format!(
                "invalid pack signature {:?}",
                String::from_utf8_lossy(&header[0..4])
            )));
        }

        let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if version != 2 && version != 3 {
            return Err(GitError::format(format!(
                "unsupported pack version: {version}"
            )));
        }
        let entries = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);

        self.pos += HEADER_LEN;
        Ok(PackHeader { version, entries })
    }

    /// Decodes the entry at the cursor.
    pub fn next_entry(&mut self) -> Result<PackEntry> {
        let offset = self.pos;
        let rest = &self.data[self.pos..];
        let first = *rest
            .first()
            .ok_or_else(|| GitError::format("unexpected end of pack"))?;
        let (size, used) = varint::decode(rest, PACK_SEED_BITS)?;
        self.pos += used;

        let type_code = (first >> 4) & 0x07;
        let entry = match type_code {
            OFS_DELTA => {
                return Err(GitError::Unimplemented(format!(
                    "offset delta at pack offset {offset}"
                )))
            }
            REF_DELTA => {
                let base = self
                    .data
                    .get(self.pos..self.pos + ObjectId::LEN)
                    .ok_or_else(|| GitError::format("ref delta base truncated"))?;
                let base = ObjectId::from_slice(base)?;
                self.pos += ObjectId::LEN;
                PackEntry::RefDelta {
                    base,
                    delta: self.inflate(size)?,
                }
            }
            code => {
                let object_type = ObjectType::from_pack_type(code).ok_or_else(|| {
                    GitError::format(format!("invalid entry type {code} at offset {offset}"))
                })?;
                PackEntry::Object {
                    object_type,
                    data: self.inflate(size)?,
                }
            }
        };

        tracing::debug!(offset, type_code, size, "read pack entry");
        Ok(entry)
    }

    /// Inflates one zlib stream and moves the cursor past its end.
    fn inflate(&mut self, declared: u64) -> Result<Vec<u8>> {
        let capacity = usize::try_from(declared)
            .unwrap_or(MAX_PREALLOC)
            .min(MAX_PREALLOC);
        let mut out = Vec::with_capacity(capacity);
        let input = &self.data[self.pos..];
        let mut stream = Decompress::new(true);

        loop {
            if out.capacity() - out.len() < INFLATE_CHUNK {
                out.reserve(INFLATE_CHUNK);
            }
            let (read, written) = (stream.total_in(), stream.total_out());
            let status = stream
                .decompress_vec(&input[read as usize..], &mut out, FlushDecompress::None)
                .map_err(|e| GitError::format(format!("inflate at offset {}: {e}", self.pos)))?;

            if status == Status::StreamEnd {
                break;
            }
            if stream.total_in() == read && stream.total_out() == written {
                return Err(GitError::format(format!(
                    "zlib stream at offset {} ends early",
                    self.pos
                )));
            }
        }
        self.pos += stream.total_in() as usize;

        if out.len() as u64 != declared {
            tracing::warn!(
                declared,
                inflated = out.len(),
                "pack entry size differs from header"
            );
        }
        Ok(out)
    }

    /// Checks whatever follows the last entry.
    pub fn verify_trailer(&self) -> Result<()> {
        match self.data.len() - self.pos {
            0 => {
                tracing::warn!("pack has no trailing checksum");
                Ok(())
            }
            TRAILER_LEN => {
                let computed = Sha1::digest(&self.data[..self.pos]);
                if computed.as_slice() != &self.data[self.pos..] {
                    return Err(GitError::format(format!(
                        "pack checksum mismatch: computed {}, trailer {}",
                        hex::encode(computed),
                        hex::encode(&self.data[self.pos..])
                    )));
                }
                Ok(())
            }
            extra => Err(GitError::format(format!(
                "{extra} unexpected bytes after last pack entry"
            ))),
        }
    }

    /// Stores every entry, then resolves the queued deltas.
    pub fn unpack<D: ObjectDatabase + ?Sized>(&mut self, db: &D) -> Result<UnpackSummary> {
        let header = self.read_header()?;
        tracing::info!(
            version = header.version,
            entries = header.entries,
            "unpacking"
        );

        let mut ids = Vec::new();
        let mut pending = Vec::new();
        for _ in 0..header.entries {
            match self.next_entry()? {
                PackEntry::Object { object_type, data } => {
                    ids.push(db.put(object_type, &data)?);
                }
                PackEntry::RefDelta { base, delta } => {
                    pending.push(PendingDelta { base, delta });
                }
            }
        }
        self.verify_trailer()?;

        let objects = ids.len();
        let deltas = pending.len();
        ids.extend(resolve_deltas(db, pending)?);

        tracing::info!(objects, deltas, "pack unpacked");
        Ok(UnpackSummary {
            objects,
            deltas,
            ids,
        })
    }
}
