//! Base-128 size encoding shared by pack entry headers and delta headers.
//!
//! Each byte carries 7 payload bits (little-endian groups) and sets its most
//! significant bit when another byte follows. The first byte may carry fewer
//! payload bits: pack entry headers reserve bits 4-6 of the first byte for
//! the object type, leaving a 4-bit seed; delta headers use the full 7 bits.

use crate::{GitError, Result};

/// Seed width of pack entry headers.
pub const PACK_SEED_BITS: u32 = 4;
/// Seed width of delta source/target sizes.
pub const DELTA_SEED_BITS: u32 = 7;

const CONTINUE: u8 = 0x80;

/// Decodes an integer from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(bytes: &[u8], seed_bits: u32) -> Result<(u64, usize)> {
    debug_assert!((1..=7).contains(&seed_bits));

    let first = *bytes
        .first()
        .ok_or_else(|| GitError::format("truncated size header"))?;
    let mut value = u64::from(first) & ((1u64 << seed_bits) - 1);
    let mut shift = seed_bits;
    let mut consumed = 1;
    let mut byte = first;

    while byte & CONTINUE != 0 {
        byte = *bytes
            .get(consumed)
            .ok_or_else(|| GitError::format("truncated size header"))?;
        consumed += 1;

        let chunk = u64::from(byte & 0x7f);
        if shift >= 64 || (shift > 57 && chunk >> (64 - shift) != 0) {
            return Err(GitError::format("size header overflows 64 bits"));
        }
        value |= chunk << shift;
        shift += 7;
    }

    Ok((value, consumed))
}

/// Encodes `value`, OR-ing `prefix` into the bits of the first byte above the seed.
pub fn encode(value: u64, seed_bits: u32, prefix: u8) -> Vec<u8> {
    debug_assert!((1..=7).contains(&seed_bits));

    let mut out = Vec::with_capacity(10);
    let mut first = prefix | (value & ((1u64 << seed_bits) - 1)) as u8;
    let mut rest = value >> seed_bits;
    if rest > 0 {
        first |= CONTINUE;
    }
    out.push(first);

    while rest > 0 {
        let mut byte = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest > 0 {
            byte |= CONTINUE;
        }
        out.push(byte);
    }
    out
}
