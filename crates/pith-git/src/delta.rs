//! Git delta instruction streams.
//!
//! A delta starts with the base ("source") size and the result ("target")
//! size, then a sequence of copy-from-base and insert-literal instructions
//! that rebuild the target byte for byte.
//! See: https://git-scm.com/docs/pack-format#_deltified_representation

use crate::varint::{self, DELTA_SEED_BITS};
use crate::{GitError, Result};

const COPY: u8 = 0x80;
/// A copy with all size bits clear copies this many bytes.
const DEFAULT_COPY_SIZE: usize = 0x10000;
/// Upper bound on the up-front allocation for the target buffer.
const MAX_PREALLOC: usize = 16 << 20;

/// A single delta instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOp<'a> {
    /// Copy `len` bytes of the base starting at `offset`.
    Copy { offset: usize, len: usize },
    /// Append literal bytes carried in the stream.
    Insert(&'a [u8]),
}

impl DeltaOp<'_> {
    /// Number of target bytes the instruction produces.
    pub fn len(&self) -> usize {
        match self {
            Self::Copy { len, .. } => *len,
            Self::Insert(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sizes declared at the start of a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaHeader {
    /// Length of the base object the delta applies to.
    pub source_size: usize,
    /// Length of the reconstructed object.
    pub target_size: usize,
}

/// Parses the header, returning it with an iterator over the instructions.
pub fn parse(delta: &[u8]) -> Result<(DeltaHeader, Instructions<'_>)> {
    let (source_size, used) = varint::decode(delta, DELTA_SEED_BITS)?;
    let (target_size, used2) = varint::decode(&delta[used..], DELTA_SEED_BITS)?;

    let header = DeltaHeader {
        source_size: to_usize(source_size)?,
        target_size: to_usize(target_size)?,
    };
    Ok((
        header,
        Instructions {
            data: delta,
            pos: used + used2,
        },
    ))
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| GitError::format(format!("delta size {value} too large")))
}

/// Iterator over the instructions of a delta stream.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Instructions<'a> {
    fn byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| GitError::format("delta instruction truncated"))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads the little-endian bytes selected by the low `count` bits of `mask`.
    fn sparse_le(&mut self, mask: u8, count: u32) -> Result<usize> {
        let mut value = 0usize;
        for i in 0..count {
            if mask & (1 << i) != 0 {
                value |= usize::from(self.byte()?) << (8 * i);
            }
        }
        Ok(value)
    }

    fn next_op(&mut self) -> Result<DeltaOp<'a>> {
        let opcode = self.byte()?;

        if opcode & COPY != 0 {
            let offset = self.sparse_le(opcode & 0x0f, 4)?;
            let len = match self.sparse_le((opcode >> 4) & 0x07, 3)? {
                0 => DEFAULT_COPY_SIZE,
                len => len,
            };
            return Ok(DeltaOp::Copy { offset, len });
        }

        let len = usize::from(opcode);
        if len == 0 {
            return Err(GitError::format("reserved delta opcode 0"));
        }
        let end = self.pos + len;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| {
            GitError::format(format!(
                "insert of {len} bytes runs past end of delta ({} left)",
                self.data.len() - self.pos
            ))
        })?;
        self.pos = end;
        Ok(DeltaOp::Insert(bytes))
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<DeltaOp<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let op = self.next_op();
        if op.is_err() {
            // Stop after the first malformed instruction.
            self.pos = self.data.len();
        }
        Some(op)
    }
}

/// Rebuilds the target object from `base` and a delta stream.
pub fn apply(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let (header, instructions) = parse(delta)?;
    if header.source_size != base.len() {
        return Err(GitError::format(format!(
            "delta expects a {}-byte base, found {} bytes",
            header.source_size,
            base.len()
        )));
    }

    let mut target = Vec::with_capacity(header.target_size.min(MAX_PREALLOC));
    for op in instructions {
        let op = op?;
        if target.len() + op.len() > header.target_size {
            return Err(GitError::format(format!(
                "delta overshoots target size {} at instruction {op:?}",
                header.target_size
            )));
        }

        match op {
            DeltaOp::Copy { offset, len } => {
                let source = offset
                    .checked_add(len)
                    .and_then(|end| base.get(offset..end))
                    .ok_or_else(|| {
                        GitError::format(format!(
                            "copy {offset}+{len} outside {}-byte base",
                            base.len()
                        ))
                    })?;
                target.extend_from_slice(source);
            }
            DeltaOp::Insert(bytes) => target.extend_from_slice(bytes),
        }
    }

    if target.len() != header.target_size {
        return Err(GitError::format(format!(
            "delta produced {} bytes, expected {}",
            target.len(),
            header.target_size
        )));
    }
    Ok(target)
}
