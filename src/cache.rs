//! Cache Module
//!
//! The public face of the crate: identifiers in, payloads out.
//!
//! ## Responsibilities
//! - Derive keys from identifiers and encode/decode payloads
//! - Route every operation through the shard tree
//! - Hydrate index-only or offloaded shards before they are needed
//! - Save and reload the whole tree

use std::fs;

use tracing::{debug, info};

use crate::codec::{ValueCodec, ZstdCodec};
use crate::config::{Config, LoadMode};
use crate::error::Result;
use crate::key::{Key, KeyDeriver, Sha256Deriver};
use crate::storage::{Residency, ShardLayout};
use crate::tree::{ShardTree, TreeStats};

/// Content-addressed byte cache
///
/// ## Concurrency Model
/// Single-threaded: every operation takes `&mut self` and runs to completion.
/// Hosts that need shared access should wrap the cache in their own lock.
pub struct ByteCache<D = Sha256Deriver, C = ZstdCodec> {
    config: Config,
    layout: ShardLayout,
    tree: ShardTree,
    deriver: D,
    codec: C,
}

impl ByteCache {
    /// Open or create a cache with SHA-256 keys and zstd values
    pub fn open(config: Config) -> Result<Self> {
        let codec = ZstdCodec::new(config.compression_level);
        Self::with_parts(config, Sha256Deriver, codec)
    }
}

impl<D: KeyDeriver, C: ValueCodec> ByteCache<D, C> {
    /// Open or create a cache with a custom deriver and codec
    ///
    /// Existing shards in `data_dir` are loaded according to
    /// `config.open_mode`.
    pub fn with_parts(config: Config, deriver: D, codec: C) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let layout = ShardLayout::new(&config.data_dir, config.shard_stem.clone());
        let tree = ShardTree::load(
            &layout,
            config.split_threshold,
            config.format,
            config.open_mode,
        )?;

        info!(
            data_dir = %config.data_dir.display(),
            codec = codec.name(),
            threshold = config.split_threshold,
            "Opened cache"
        );

        Ok(Self {
            config,
            layout,
            tree,
            deriver,
            codec,
        })
    }

    /// Check whether `identifier` has a cached payload
    ///
    /// Only the key block of the owning shard is needed.
    pub fn is_cached(&mut self, identifier: &str) -> Result<bool> {
        let key = self.deriver.derive(identifier);
        self.tree.hydrate(&key, &self.layout, Residency::IndexOnly)?;
        self.tree.contains(&key)
    }

    /// Cache `payload` under `identifier`, replacing any previous payload
    pub fn store(&mut self, identifier: &str, payload: &[u8]) -> Result<()> {
        let key = self.deriver.derive(identifier);
        let encoded = self.codec.encode(payload)?;
        debug!(
            key = %key.short(),
            payload_len = payload.len(),
            encoded_len = encoded.len(),
            "Store"
        );

        self.tree.hydrate(&key, &self.layout, Residency::Full)?;
        self.tree.insert(key, encoded)?;
        Ok(())
    }

    /// Fetch the payload for `identifier`; `Ok(None)` if not cached
    pub fn fetch(&mut self, identifier: &str) -> Result<Option<Vec<u8>>> {
        let key = self.deriver.derive(identifier);
        self.tree.hydrate(&key, &self.layout, Residency::Full)?;

        match self.tree.lookup(&key)? {
            Some(encoded) => Ok(Some(self.codec.decode(encoded)?)),
            None => Ok(None),
        }
    }

    /// Persist every modified shard and the topology manifest
    pub fn save_all(&mut self) -> Result<()> {
        self.tree.save_all(&self.layout)?;
        Ok(())
    }

    /// Replace the in-memory tree with the persisted one, keys only
    ///
    /// Unsaved changes are discarded.
    pub fn load_index_only(&mut self) -> Result<()> {
        self.reload(LoadMode::IndexOnly)
    }

    /// Replace the in-memory tree with the persisted one, keys and values
    ///
    /// Unsaved changes are discarded.
    pub fn load_full(&mut self) -> Result<()> {
        self.reload(LoadMode::Full)
    }

    /// Save, then release the in-memory content of every shard
    ///
    /// Shards are read back from disk on next access.
    pub fn offload(&mut self) -> Result<()> {
        self.save_all()?;
        let offloaded = self.tree.offload_all();
        debug!(offloaded, "Offloaded shards");
        Ok(())
    }

    /// Close the cache, persisting pending changes
    pub fn close(mut self) -> Result<()> {
        self.save_all()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn stats(&self) -> TreeStats {
        self.tree.stats()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &ShardLayout {
        &self.layout
    }

    pub fn tree(&self) -> &ShardTree {
        &self.tree
    }

    /// Key that `identifier` maps to
    pub fn key_for(&self, identifier: &str) -> Key {
        self.deriver.derive(identifier)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn reload(&mut self, mode: LoadMode) -> Result<()> {
        self.tree = ShardTree::load(
            &self.layout,
            self.config.split_threshold,
            self.config.format,
            mode,
        )?;
        Ok(())
    }
}
