//! Content Store
//!
//! Ordered key/value store backing one shard. Keys and encoded values live in
//! two parallel vectors sorted ascending by key; index `i` of one always
//! pairs with index `i` of the other.

use std::io::{self, Read, Write};

use crate::error::{CacheError, Result};
use crate::key::Key;

use super::format::{FormatConfig, KEY_WIDTH};

/// Upper bound on speculative pre-allocation while reading a shard
const MAX_PREALLOC_ENTRIES: usize = 1 << 16;

/// How much of a store is held in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Residency {
    /// Nothing in memory; the shard file is the only copy
    Offloaded,
    /// Keys only, values left on disk
    IndexOnly,
    /// Keys and values
    Full,
}

/// Sorted, parallel-vector key/value store
#[derive(Debug, Clone, PartialEq)]
pub struct ContentStore {
    keys: Vec<Key>,
    values: Vec<Vec<u8>>,
    residency: Residency,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Create an empty, fully resident store
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            residency: Residency::Full,
        }
    }

    /// Number of resident keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Resident keys, ascending
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Smallest key in the store
    pub fn first_key(&self) -> Option<Key> {
        self.keys.first().copied()
    }

    /// Largest key in the store
    pub fn last_key(&self) -> Option<Key> {
        self.keys.last().copied()
    }

    /// Iterate over (key, encoded value) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &[u8])> {
        self.keys
            .iter()
            .zip(self.values.iter().map(|v| v.as_slice()))
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Look up the encoded value for `key`
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn lookup(&self, key: &Key) -> Result<Option<&[u8]>> {
        self.require(Residency::Full)?;
        Ok(self
            .keys
            .binary_search(key)
            .ok()
            .map(|idx| self.values[idx].as_slice()))
    }

    /// Check whether `key` is present (keys only are needed)
    pub fn contains(&self, key: &Key) -> Result<bool> {
        self.require(Residency::IndexOnly)?;
        Ok(self.keys.binary_search(key).is_ok())
    }

    /// Insert or overwrite the value for `key`
    ///
    /// Returns the previous value if the key was already present.
    pub fn upsert(&mut self, key: Key, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        self.require(Residency::Full)?;
        match self.keys.binary_search(&key) {
            Ok(idx) => Ok(Some(std::mem::replace(&mut self.values[idx], value))),
            Err(idx) => {
                self.keys.insert(idx, key);
                self.values.insert(idx, value);
                Ok(None)
            }
        }
    }

    /// Partition into (lesser, greater) at `len / 2`
    ///
    /// Both vectors are cut at the same index, so every key keeps its value.
    /// The store is consumed.
    pub fn split(mut self) -> Result<(ContentStore, ContentStore)> {
        self.require(Residency::Full)?;
        self.check_parallel()?;

        let mid = self.keys.len() / 2;
        let greater = ContentStore {
            keys: self.keys.split_off(mid),
            values: self.values.split_off(mid),
            residency: Residency::Full,
        };
        let lesser = ContentStore {
            keys: self.keys,
            values: self.values,
            residency: Residency::Full,
        };

        Ok((lesser, greater))
    }

    /// Drop all in-memory content; the shard must be reloaded from disk
    pub fn offload(&mut self) {
        self.keys = Vec::new();
        self.values = Vec::new();
        self.residency = Residency::Offloaded;
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Exact number of bytes `serialize` will produce
    pub fn encoded_len(&self, format: &FormatConfig) -> usize {
        let width = format.len_width();
        width
            + self.keys.len() * KEY_WIDTH
            + self.values.iter().map(|v| width + v.len()).sum::<usize>()
    }

    /// Serialize the store into the shard layout
    pub fn serialize(&self, format: &FormatConfig) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len(format));
        self.write_to(&mut out, format)?;
        Ok(out)
    }

    /// Write the shard layout:
    ///
    /// ```text
    /// entry_count                  [len_width]
    /// entry_count x key            [32 each, ascending]
    /// entry_count x (value_len     [len_width]
    ///                value_bytes)  [value_len]
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W, format: &FormatConfig) -> Result<()> {
        self.require(Residency::Full)?;
        self.check_parallel()?;

        let mut len_buf = Vec::with_capacity(8);
        format.put_len(self.keys.len() as u64, &mut len_buf)?;
        writer.write_all(&len_buf)?;

        for key in &self.keys {
            writer.write_all(key.as_bytes())?;
        }

        for value in &self.values {
            len_buf.clear();
            format.put_len(value.len() as u64, &mut len_buf)?;
            writer.write_all(&len_buf)?;
            writer.write_all(value)?;
        }

        Ok(())
    }

    /// Deserialize a complete shard from bytes
    pub fn deserialize(bytes: &[u8], format: &FormatConfig) -> Result<Self> {
        let mut reader = bytes;
        Self::read_from(&mut reader, format)
    }

    /// Read a complete shard; trailing bytes are rejected
    pub fn read_from<R: Read>(reader: &mut R, format: &FormatConfig) -> Result<Self> {
        let keys = read_keys(reader, format)?;

        let mut values = Vec::with_capacity(keys.len().min(MAX_PREALLOC_ENTRIES));
        let mut len_buf = vec![0u8; format.len_width()];
        for i in 0..keys.len() {
            read_field(reader, &mut len_buf, "value length")?;
            let len = format.get_len(&len_buf)?;

            let mut value = Vec::new();
            let got = reader.by_ref().take(len).read_to_end(&mut value)?;
            if got as u64 != len {
                return Err(CacheError::CorruptFormat(format!(
                    "Value {} truncated: expected {} bytes, got {}",
                    i, len, got
                )));
            }
            values.push(value);
        }

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(CacheError::CorruptFormat(
                "Trailing bytes after last value".to_string(),
            ));
        }

        Ok(Self {
            keys,
            values,
            residency: Residency::Full,
        })
    }

    /// Read only the entry count and keys, leaving values on disk
    pub fn read_index_from<R: Read>(reader: &mut R, format: &FormatConfig) -> Result<Self> {
        let keys = read_keys(reader, format)?;
        Ok(Self {
            keys,
            values: Vec::new(),
            residency: Residency::IndexOnly,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn require(&self, need: Residency) -> Result<()> {
        if self.residency < need {
            return Err(CacheError::NotResident(format!(
                "need {:?}, have {:?}",
                need, self.residency
            )));
        }
        Ok(())
    }

    fn check_parallel(&self) -> Result<()> {
        if self.keys.len() != self.values.len() {
            return Err(CacheError::InvariantViolation(format!(
                "{} keys but {} values",
                self.keys.len(),
                self.values.len()
            )));
        }
        Ok(())
    }
}

/// Read the entry count and the sorted key block
fn read_keys<R: Read>(reader: &mut R, format: &FormatConfig) -> Result<Vec<Key>> {
    let mut len_buf = vec![0u8; format.len_width()];
    read_field(reader, &mut len_buf, "entry count")?;
    let count = format.get_len(&len_buf)?;

    let mut keys: Vec<Key> = Vec::with_capacity((count as usize).min(MAX_PREALLOC_ENTRIES));
    let mut key_buf = [0u8; KEY_WIDTH];
    for i in 0..count {
        read_field(reader, &mut key_buf, "key block")?;
        let key = Key::from_bytes(key_buf);

        if let Some(prev) = keys.last() {
            if *prev >= key {
                return Err(CacheError::CorruptFormat(format!(
                    "Keys not strictly ascending at index {}",
                    i
                )));
            }
        }
        keys.push(key);
    }

    Ok(keys)
}

/// `read_exact` that reports a short read as a format error
fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CacheError::CorruptFormat(format!("Truncated {}", what)),
        _ => CacheError::Io(e),
    })
}
