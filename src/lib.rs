//! # shardcache
//!
//! A content-addressed, disk-persistable cache for byte payloads such as
//! fetched documents:
//! - Keys are fixed-width digests of an identifier (SHA-256 by default)
//! - Values are compressed before storage (zstd by default)
//! - Each shard is a sorted key/value store with binary-search access
//! - Shards split in half once they exceed a threshold, forming a binary tree
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ByteCache                            │
//! │        is_cached / store / fetch / save / load              │
//! └───────────┬─────────────────────────────────┬───────────────┘
//!             │                                 │
//!      ┌──────▼──────┐                   ┌──────▼──────┐
//!      │ KeyDeriver  │                   │ ValueCodec  │
//!      │  (SHA-256)  │                   │   (zstd)    │
//!      └──────┬──────┘                   └──────┬──────┘
//!             └────────────────┬────────────────┘
//!                              ▼
//!                      ┌───────────────┐
//!                      │   ShardTree   │  routing keys, split
//!                      └───────┬───────┘
//!                  ┌───────────┴───────────┐
//!                  ▼                       ▼
//!          ┌──────────────┐        ┌──────────────┐
//!          │ ContentStore │  ...   │ ContentStore │  one per leaf
//!          └──────┬───────┘        └──────┬───────┘
//!                 ▼                       ▼
//!            {stem}.1                {stem}.2        shard files
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod codec;
pub mod storage;
pub mod tree;
pub mod cache;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::{Config, LoadMode};
pub use key::{Key, KeyDeriver, Sha256Deriver};
pub use codec::{IdentityCodec, ValueCodec, ZstdCodec};
pub use storage::{ContentStore, FormatConfig};
pub use tree::ShardTree;
pub use cache::ByteCache;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of shardcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
