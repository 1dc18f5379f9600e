//! Value codecs
//!
//! A codec reversibly transforms a payload into the encoded bytes held by a
//! `ContentStore`. The store treats encoded bytes as opaque.

use crate::error::{CacheError, Result};

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Reversible payload encoding.
///
/// `decode(encode(p)) == p` must hold for every payload. Decoding bytes that
/// were not produced by `encode` fails with `CacheError::CorruptFormat`.
pub trait ValueCodec {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>>;

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Zstandard compression
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ValueCodec for ZstdCodec {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(zstd::encode_all(payload, self.level)?)
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(encoded)
            .map_err(|e| CacheError::CorruptFormat(format!("zstd decode failed: {}", e)))
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}

/// Stores payloads unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl ValueCodec for IdentityCodec {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        Ok(encoded.to_vec())
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}
