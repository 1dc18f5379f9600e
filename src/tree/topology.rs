//! Topology manifest
//!
//! Routing keys cannot be derived from shard indices, so they are persisted
//! next to the shards.
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                          │
//! │   Magic: "SCTP" (4) | Version: u16 (2) | BodyLen: u32 (4)  │
//! ├────────────────────────────────────────────────────────────┤
//! │ Body: bincode(Topology)                                    │
//! ├────────────────────────────────────────────────────────────┤
//! │ Footer: BodyCRC32 u32 (4)                                  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//! All header and footer integers are little-endian.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::key::Key;
use crate::storage::FormatConfig;

/// Magic bytes identifying a topology manifest
const MAGIC: &[u8; 4] = b"SCTP";

/// Current manifest version
const VERSION: u16 = 1;

/// Magic (4) + Version (2) + BodyLen (4)
const HEADER_SIZE: usize = 10;

/// BodyCRC (4)
const FOOTER_SIZE: usize = 4;

/// Persisted routing information for a shard tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Shard encoding every leaf was written with
    pub format: FormatConfig,
    /// Split threshold in force when saved
    pub split_threshold: u64,
    /// (shard index, routing key) of every internal node
    pub routes: Vec<(u64, Key)>,
}

impl Topology {
    /// Encode into the framed manifest layout
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        let body_len = u32::try_from(body.len()).map_err(|_| CacheError::ValueTooLarge {
            len: body.len() as u64,
            max: u32::MAX as u64,
        })?;

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len() + FOOTER_SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&body_len.to_le_bytes());
        out.extend_from_slice(&body);
        out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        Ok(out)
    }

    /// Decode and verify a framed manifest
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(CacheError::CorruptFormat(format!(
                "Topology too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(CacheError::CorruptFormat(format!(
                "Invalid topology magic: expected SCTP, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(CacheError::CorruptFormat(format!(
                "Unsupported topology version: {}",
                version
            )));
        }

        let body_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        if bytes.len() != HEADER_SIZE + body_len + FOOTER_SIZE {
            return Err(CacheError::CorruptFormat(format!(
                "Topology length mismatch: body {} bytes, file {} bytes",
                body_len,
                bytes.len()
            )));
        }

        let body = &bytes[HEADER_SIZE..HEADER_SIZE + body_len];
        let footer = &bytes[HEADER_SIZE + body_len..];
        let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let actual_crc = crc32fast::hash(body);
        if stored_crc != actual_crc {
            return Err(CacheError::CorruptFormat(format!(
                "Topology checksum mismatch: stored {:08x}, computed {:08x}",
                stored_crc, actual_crc
            )));
        }

        bincode::deserialize(body)
            .map_err(|e| CacheError::CorruptFormat(format!("Topology body: {}", e)))
    }

    /// Write the manifest and sync it
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Read the manifest, or `None` if it was never written
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Self::decode(&bytes).map(Some)
    }
}
