//! Shard file format parameters
//!
//! The integer width and byte order of every length field are part of the
//! on-disk format. They are fixed per tree, never taken from the host.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Width of a key in bytes (a SHA-256 digest)
pub const KEY_WIDTH: usize = 32;

/// Default width of a length field in bytes
pub const DEFAULT_LEN_WIDTH: u8 = 5;

/// Byte order used for length fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Immutable description of the shard encoding, owned once by a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    len_width: u8,
    byte_order: ByteOrder,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            len_width: DEFAULT_LEN_WIDTH,
            byte_order: ByteOrder::Little,
        }
    }
}

impl FormatConfig {
    /// Create a format with the given length width (1..=8 bytes)
    pub fn new(len_width: u8, byte_order: ByteOrder) -> Result<Self> {
        if !(1..=8).contains(&len_width) {
            return Err(CacheError::Config(format!(
                "Length width must be between 1 and 8 bytes, got {}",
                len_width
            )));
        }
        Ok(Self {
            len_width,
            byte_order,
        })
    }

    pub fn len_width(&self) -> usize {
        self.len_width as usize
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Largest length representable in one length field
    pub fn max_len(&self) -> u64 {
        if self.len_width >= 8 {
            u64::MAX
        } else {
            (1u64 << (8 * self.len_width as u32)) - 1
        }
    }

    /// Append `len` as a fixed-width integer
    pub fn put_len(&self, len: u64, out: &mut Vec<u8>) -> Result<()> {
        if len > self.max_len() {
            return Err(CacheError::ValueTooLarge {
                len,
                max: self.max_len(),
            });
        }

        let width = self.len_width();
        match self.byte_order {
            ByteOrder::Little => out.extend_from_slice(&len.to_le_bytes()[..width]),
            ByteOrder::Big => out.extend_from_slice(&len.to_be_bytes()[8 - width..]),
        }
        Ok(())
    }

    /// Decode a fixed-width integer; `bytes` must be exactly `len_width` long
    pub fn get_len(&self, bytes: &[u8]) -> Result<u64> {
        let width = self.len_width();
        if bytes.len() != width {
            return Err(CacheError::CorruptFormat(format!(
                "Length field: expected {} bytes, got {}",
                width,
                bytes.len()
            )));
        }

        let mut buf = [0u8; 8];
        let len = match self.byte_order {
            ByteOrder::Little => {
                buf[..width].copy_from_slice(bytes);
                u64::from_le_bytes(buf)
            }
            ByteOrder::Big => {
                buf[8 - width..].copy_from_slice(bytes);
                u64::from_be_bytes(buf)
            }
        };
        Ok(len)
    }
}
