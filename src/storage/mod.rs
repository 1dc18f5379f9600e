//! Storage Module
//!
//! In-memory shard stores and their on-disk representation.
//!
//! ## Responsibilities
//! - Keep entries sorted by key with O(log n) lookup and insertion
//! - Split an overloaded store into two halves
//! - Persist stores to shard files in a fixed, host-independent layout
//! - Load shards fully or index-only
//!
//! ## Shard File Format
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Entry Count   (len_width bytes, default 5)     │
//! ├────────────────────────────────────────────────┤
//! │ Key Block                                      │
//! │   [Key: 32] ... entry_count times, ascending   │
//! ├────────────────────────────────────────────────┤
//! │ Value Block                                    │
//! │   [ValueLen: len_width][Value]                 │
//! │   ... entry_count times, same order as keys    │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! All length fields share one width and byte order (little-endian by
//! default), described by a `FormatConfig`.

mod format;
mod layout;
mod store;

pub use format::{ByteOrder, FormatConfig, DEFAULT_LEN_WIDTH, KEY_WIDTH};
pub use layout::ShardLayout;
pub use store::{ContentStore, Residency};
