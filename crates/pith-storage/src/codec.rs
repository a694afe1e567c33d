//! Loose object encoding.
//!
//! A loose object is the zlib-compressed stream `"<type> <size>\0<payload>"`.
//! Its identity is the SHA-1 of the uncompressed stream.

use crate::{ObjectId, ObjectType, Result, StorageError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Compression level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// No compression
    None,
    /// Fast compression (lower ratio)
    Fast,
    /// Default compression (balanced)
    #[default]
    Default,
    /// Best compression (slower, higher ratio)
    Best,
}

impl CompressionLevel {
    /// Converts to flate2 compression level.
    pub fn to_flate2(self) -> flate2::Compression {
        match self {
            CompressionLevel::None => flate2::Compression::none(),
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
        }
    }
}

/// Encodes a payload into its loose form, returning the hash and compressed bytes.
pub fn encode(
    object_type: ObjectType,
    payload: &[u8],
    level: CompressionLevel,
) -> Result<(ObjectId, Vec<u8>)> {
    let id = ObjectId::hash_object(object_type, payload);

    let mut encoder = ZlibEncoder::new(Vec::new(), level.to_flate2());
    encoder.write_all(&object_type.header(payload.len()))?;
    encoder.write_all(payload)?;
    let compressed = encoder.finish()?;

    Ok((id, compressed))
}

/// Decodes loose object bytes into `(type, declared size, payload)`.
pub fn decode(compressed: &[u8]) -> Result<(ObjectType, usize, Vec<u8>)> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| StorageError::format(format!("inflate failed: {e}")))?;
    if decoder.total_in() != compressed.len() as u64 {
        return Err(StorageError::format(format!(
            "{} trailing bytes after zlib stream",
            compressed.len() as u64 - decoder.total_in()
        )));
    }

    let space = inflated
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| StorageError::format("missing space in object header"))?;
    let nul = inflated[space..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| p + space)
        .ok_or_else(|| StorageError::format("missing NUL in object header"))?;

    let type_name = std::str::from_utf8(&inflated[..space])
        .map_err(|_| StorageError::format("object type is not UTF-8"))?;
    let object_type = ObjectType::parse(type_name)?;

    let size_str = std::str::from_utf8(&inflated[space + 1..nul])
        .map_err(|_| StorageError::format("object size is not UTF-8"))?;
    if size_str.is_empty()
        || !size_str.bytes().all(|b| b.is_ascii_digit())
        || (size_str.len() > 1 && size_str.starts_with('0'))
    {
        return Err(StorageError::format(format!(
            "invalid object size: {size_str:?}"
        )));
    }
    let size: usize = size_str
        .parse()
        .map_err(|_| StorageError::format(format!("invalid object size: {size_str}")))?;

    let payload = inflated.split_off(nul + 1);
    if payload.len() != size {
        return Err(StorageError::format(format!(
            "declared size {size} but payload is {} bytes",
            payload.len()
        )));
    }

    Ok((object_type, size, payload))
}
