//! Configuration for shardcache
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::codec::DEFAULT_COMPRESSION_LEVEL;
use crate::error::{CacheError, Result};
use crate::storage::FormatConfig;

/// Main configuration for a cache instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding all cache files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {shard_stem}.topology   (routing keys)
    ///     ├── {shard_stem}.0          (root shard, until it splits)
    ///     └── {shard_stem}.N          (one file per leaf)
    pub data_dir: PathBuf,

    /// Base name of shard files
    pub shard_stem: String,

    /// Encoding of shard files
    pub format: FormatConfig,

    // -------------------------------------------------------------------------
    // Tree Configuration
    // -------------------------------------------------------------------------
    /// Max entries per leaf before it splits
    pub split_threshold: usize,

    /// How `ByteCache::open` loads existing shards
    pub open_mode: LoadMode,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// zstd level used by the default codec
    pub compression_level: i32,
}

/// How much of each shard to read when loading a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Keys only; values are read on first access
    IndexOnly,

    /// Keys and values
    Full,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./shardcache_data"),
            shard_stem: "cache".to_string(),
            format: FormatConfig::default(),
            split_threshold: 4096,
            open_mode: LoadMode::IndexOnly,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the tree cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.split_threshold == 0 {
            return Err(CacheError::Config(
                "split_threshold must be positive".to_string(),
            ));
        }
        if self.shard_stem.is_empty() {
            return Err(CacheError::Config("shard_stem must not be empty".to_string()));
        }
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.compression_level) {
            return Err(CacheError::Config(format!(
                "compression_level {} outside supported range {}..={}",
                self.compression_level,
                levels.start(),
                levels.end()
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the shard file base name
    pub fn shard_stem(mut self, stem: impl Into<String>) -> Self {
        self.config.shard_stem = stem.into();
        self
    }

    /// Set the shard encoding
    pub fn format(mut self, format: FormatConfig) -> Self {
        self.config.format = format;
        self
    }

    /// Set the max entries per leaf
    pub fn split_threshold(mut self, threshold: usize) -> Self {
        self.config.split_threshold = threshold;
        self
    }

    /// Set how existing data is loaded on open
    pub fn open_mode(mut self, mode: LoadMode) -> Self {
        self.config.open_mode = mode;
        self
    }

    /// Set the zstd compression level
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
