//! Shard Layout
//!
//! File naming for a tree's shards. Shard `i` lives at `{dir}/{stem}.{i}`;
//! the routing manifest lives at `{dir}/{stem}.topology`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::format::FormatConfig;
use super::store::ContentStore;

const TOPOLOGY_SUFFIX: &str = "topology";

/// Maps shard indices to file paths under one directory
#[derive(Debug, Clone)]
pub struct ShardLayout {
    dir: PathBuf,
    stem: String,
}

impl ShardLayout {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Path of the shard file for `index`
    pub fn shard_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, index))
    }

    /// Path of the routing manifest
    pub fn topology_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, TOPOLOGY_SUFFIX))
    }

    /// Parse a shard index from a file name
    /// "cache.42" → Some(42)
    pub fn parse_shard_index(&self, path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        let index = name.strip_prefix(self.stem.as_str())?.strip_prefix('.')?;
        index.parse().ok()
    }

    /// Indices of all shard files present on disk, ascending
    pub fn discover(&self) -> Result<Vec<u64>> {
        let mut indices = Vec::new();
        if !self.dir.exists() {
            return Ok(indices);
        }

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(index) = self.parse_shard_index(&path) {
                    indices.push(index);
                }
            }
        }

        indices.sort_unstable();
        Ok(indices)
    }

    // =========================================================================
    // Shard File I/O
    // =========================================================================

    /// Write a store to its shard file and sync it
    pub fn write_shard(&self, index: u64, store: &ContentStore, format: &FormatConfig) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.shard_path(index))?;

        let mut writer = BufWriter::new(file);
        store.write_to(&mut writer, format)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Read a complete shard file
    pub fn read_shard(&self, index: u64, format: &FormatConfig) -> Result<ContentStore> {
        let mut reader = BufReader::new(File::open(self.shard_path(index))?);
        ContentStore::read_from(&mut reader, format)
    }

    /// Read only the key block of a shard file
    pub fn read_shard_index(&self, index: u64, format: &FormatConfig) -> Result<ContentStore> {
        let mut reader = BufReader::new(File::open(self.shard_path(index))?);
        ContentStore::read_index_from(&mut reader, format)
    }

    /// Remove a shard file if present
    pub fn remove_shard(&self, index: u64) -> Result<()> {
        let path = self.shard_path(index);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
