//! Keys and key derivation
//!
//! A `Key` is the fixed-width digest of an external identifier. Keys order by
//! unsigned lexicographic byte comparison, which is what the derived `Ord` on
//! a byte array gives us.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};
use crate::storage::KEY_WIDTH;

/// A 32-byte key identifying one cached entry
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key([u8; KEY_WIDTH]);

impl Key {
    /// Create a key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_WIDTH]) -> Self {
        Key(bytes)
    }

    /// Create a key from a slice, which must be exactly `KEY_WIDTH` long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_WIDTH] = bytes.try_into().map_err(|_| {
            CacheError::CorruptFormat(format!(
                "Key must be {} bytes, got {}",
                KEY_WIDTH,
                bytes.len()
            ))
        })?;
        Ok(Key(arr))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_WIDTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| CacheError::CorruptFormat(format!("Invalid key hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Short prefix for log lines
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.short())
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// Key Derivation
// =============================================================================

/// Maps an identifier (e.g. a URL) to a key.
///
/// Equal identifiers must always produce equal keys. Distinct identifiers are
/// assumed not to collide; a collision would alias two identifiers to one entry.
pub trait KeyDeriver {
    fn derive(&self, identifier: &str) -> Key;
}

/// SHA-256 over the UTF-8 bytes of the identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Deriver;

impl KeyDeriver for Sha256Deriver {
    fn derive(&self, identifier: &str) -> Key {
        let digest: [u8; KEY_WIDTH] = Sha256::digest(identifier.as_bytes()).into();
        Key(digest)
    }
}

impl<F> KeyDeriver for F
where
    F: Fn(&str) -> Key,
{
    fn derive(&self, identifier: &str) -> Key {
        self(identifier)
    }
}
