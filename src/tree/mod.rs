//! Shard Tree Module
//!
//! A binary tree over the key space whose leaves each own one
//! `ContentStore`. A leaf that grows past the split threshold is replaced
//! by an internal node routing to two half-size leaves.
//!
//! ## Responsibilities
//! - Route lookups and inserts to the owning leaf
//! - Split overloaded leaves (the only node transition; there is no merge)
//! - Persist leaves as shard files and routing keys as a topology manifest
//! - Rebuild the tree from disk, fully or index-only
//! - Hydrate offloaded or index-only leaves on demand
//!
//! ```text
//!                 [0: key < R0 ?]
//!                /               \
//!        [1: leaf]               [2: key < R2 ?]
//!                                 /           \
//!                          [5: leaf]        [6: leaf]
//! ```

mod node;
mod topology;

use std::collections::{HashMap, HashSet};
use std::fs;

use tracing::{debug, info, warn};

use crate::config::LoadMode;
use crate::error::{CacheError, Result};
use crate::key::Key;
use crate::storage::{ContentStore, FormatConfig, Residency, ShardLayout};

pub use node::{child_indices, Leaf, Node};
pub use topology::Topology;

/// Shape and residency summary of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub leaf_count: usize,
    pub internal_count: usize,
    pub depth: usize,
    /// Keys currently held in memory across all leaves
    pub resident_entries: usize,
    pub dirty_leaves: usize,
}

/// Self-splitting binary tree of shard stores
#[derive(Debug)]
pub struct ShardTree {
    root: Node,
    split_threshold: usize,
    format: FormatConfig,
}

impl ShardTree {
    /// Create a tree holding a single empty leaf
    pub fn new(split_threshold: usize, format: FormatConfig) -> Result<Self> {
        if split_threshold == 0 {
            return Err(CacheError::Config(
                "split_threshold must be positive".to_string(),
            ));
        }

        Ok(Self {
            root: Node::Leaf(Leaf::new(0, ContentStore::new(), true)),
            split_threshold,
            format,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn split_threshold(&self) -> usize {
        self.split_threshold
    }

    pub fn format(&self) -> &FormatConfig {
        &self.format
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Insert or overwrite an encoded value
    ///
    /// Only the leaf that received the write is checked against the split
    /// threshold. Returns the previous value if one was replaced.
    pub fn insert(&mut self, key: Key, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        self.root.insert(key, value, self.split_threshold)
    }

    /// Look up an encoded value; `Ok(None)` if absent
    pub fn lookup(&self, key: &Key) -> Result<Option<&[u8]>> {
        self.root.leaf_for(key).store.lookup(key)
    }

    /// Check membership (index-only leaves suffice)
    pub fn contains(&self, key: &Key) -> Result<bool> {
        self.root.leaf_for(key).store.contains(key)
    }

    /// Leaf whose key range covers `key`
    pub fn leaf_for(&self, key: &Key) -> &Leaf {
        self.root.leaf_for(key)
    }

    /// All leaves, left to right
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.root.collect_leaves(&mut out);
        out
    }

    /// (shard index, routing key) of every internal node
    pub fn routes(&self) -> Vec<(u64, Key)> {
        let mut out = Vec::new();
        self.root.collect_routes(&mut out);
        out
    }

    pub fn stats(&self) -> TreeStats {
        let leaves = self.leaves();
        TreeStats {
            leaf_count: leaves.len(),
            internal_count: self.routes().len(),
            depth: self.root.depth(),
            resident_entries: leaves.iter().map(|l| l.store.len()).sum(),
            dirty_leaves: leaves.iter().filter(|l| l.dirty).count(),
        }
    }

    /// Verify ordering and routing bounds for every resident leaf
    pub fn check_invariants(&self) -> Result<()> {
        check_node(&self.root, None, None)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write every dirty leaf and the topology manifest
    ///
    /// Shard files left behind by a leaf that has since split (their index is
    /// now an internal node) are removed. Files the tree does not route to
    /// are never touched. Returns the number of shard files written.
    pub fn save_all(&mut self, layout: &ShardLayout) -> Result<usize> {
        fs::create_dir_all(layout.dir())?;

        let format = self.format;
        let mut written = 0;
        let mut leaf_count = 0;

        let mut leaves = Vec::new();
        self.root.collect_leaves_mut(&mut leaves);
        for leaf in leaves {
            leaf_count += 1;
            if leaf.dirty {
                layout.write_shard(leaf.index, &leaf.store, &format)?;
                leaf.dirty = false;
                written += 1;
                debug!(shard = leaf.index, entries = leaf.store.len(), "Wrote shard");
            }
        }

        let topology = Topology {
            format,
            split_threshold: self.split_threshold as u64,
            routes: self.routes(),
        };
        topology.write(&layout.topology_path())?;

        let internal: HashSet<u64> = topology.routes.iter().map(|(index, _)| *index).collect();
        for index in layout.discover()? {
            if internal.contains(&index) {
                warn!(shard = index, "Removing stale shard file");
                layout.remove_shard(index)?;
            }
        }

        info!(
            written,
            leaves = leaf_count,
            routes = topology.routes.len(),
            "Saved shard tree"
        );
        Ok(written)
    }

    /// Rebuild a tree from its shard files and topology manifest
    ///
    /// A directory with no manifest and no root shard yields an empty tree.
    /// Non-root shard files without a manifest to route them are reported as
    /// `CorruptFormat` rather than ignored.
    pub fn load(
        layout: &ShardLayout,
        split_threshold: usize,
        format: FormatConfig,
        mode: LoadMode,
    ) -> Result<Self> {
        let routes: HashMap<u64, Key> = match Topology::read(&layout.topology_path())? {
            Some(topology) => {
                if topology.format != format {
                    return Err(CacheError::Config(format!(
                        "Shards were written with {:?}, configured {:?}",
                        topology.format, format
                    )));
                }
                if topology.split_threshold != split_threshold as u64 {
                    debug!(
                        saved = topology.split_threshold,
                        configured = split_threshold,
                        "Split threshold changed since last save"
                    );
                }
                topology.routes.into_iter().collect()
            }
            None => {
                let orphans: Vec<u64> =
                    layout.discover()?.into_iter().filter(|&index| index != 0).collect();
                if !orphans.is_empty() {
                    return Err(CacheError::CorruptFormat(format!(
                        "Topology manifest missing but shard files {:?} exist",
                        orphans
                    )));
                }
                HashMap::new()
            }
        };

        let mut tree = Self::new(split_threshold, format)?;
        tree.root = build_node(0, &routes, layout, &format, mode)?;

        let built = tree.routes().len();
        if built != routes.len() {
            return Err(CacheError::CorruptFormat(format!(
                "Topology lists {} routing keys but only {} are reachable",
                routes.len(),
                built
            )));
        }

        tree.check_invariants()?;

        let stats = tree.stats();
        info!(
            leaves = stats.leaf_count,
            depth = stats.depth,
            entries = stats.resident_entries,
            mode = ?mode,
            "Loaded shard tree"
        );
        Ok(tree)
    }

    /// Make sure the leaf owning `key` holds at least `need` in memory,
    /// reading its shard file if not. Returns whether a file was read.
    pub fn hydrate(&mut self, key: &Key, layout: &ShardLayout, need: Residency) -> Result<bool> {
        let format = self.format;
        let (lower, upper) = self.bounds_for(key);
        let leaf = self.root.leaf_for_mut(key);

        if leaf.store.residency() >= need {
            return Ok(false);
        }

        let store = match need {
            Residency::Full => layout.read_shard(leaf.index, &format)?,
            _ => layout.read_shard_index(leaf.index, &format)?,
        };
        check_range(leaf.index, &store, lower.as_ref(), upper.as_ref())?;

        debug!(
            shard = leaf.index,
            entries = store.len(),
            residency = ?store.residency(),
            "Hydrated shard"
        );
        leaf.store = store;
        Ok(true)
    }

    /// Drop in-memory content of every clean leaf; returns how many were
    /// offloaded. Dirty leaves are kept so no write is lost.
    pub fn offload_all(&mut self) -> usize {
        let mut leaves = Vec::new();
        self.root.collect_leaves_mut(&mut leaves);

        let mut offloaded = 0;
        for leaf in leaves {
            if !leaf.dirty && leaf.store.residency() != Residency::Offloaded {
                leaf.store.offload();
                offloaded += 1;
            }
        }
        offloaded
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Key range [lower, upper) of the leaf covering `key`
    fn bounds_for(&self, key: &Key) -> (Option<Key>, Option<Key>) {
        let mut lower = None;
        let mut upper = None;
        let mut node = &self.root;

        while let Node::Internal {
            routing_key,
            left,
            right,
            ..
        } = node
        {
            if key < routing_key {
                upper = Some(*routing_key);
                node = left.as_ref();
            } else {
                lower = Some(*routing_key);
                node = right.as_ref();
            }
        }

        (lower, upper)
    }
}

/// Recursively rebuild the subtree rooted at shard `index`
fn build_node(
    index: u64,
    routes: &HashMap<u64, Key>,
    layout: &ShardLayout,
    format: &FormatConfig,
    mode: LoadMode,
) -> Result<Node> {
    if let Some(routing_key) = routes.get(&index) {
        let (left, right) = child_indices(index)?;
        return Ok(Node::Internal {
            index,
            routing_key: *routing_key,
            left: Box::new(build_node(left, routes, layout, format, mode)?),
            right: Box::new(build_node(right, routes, layout, format, mode)?),
        });
    }

    if !layout.shard_path(index).exists() {
        if index == 0 && routes.is_empty() {
            return Ok(Node::Leaf(Leaf::new(0, ContentStore::new(), true)));
        }
        return Err(CacheError::CorruptFormat(format!(
            "Missing shard file for leaf {}",
            index
        )));
    }

    let store = match mode {
        LoadMode::Full => layout.read_shard(index, format)?,
        LoadMode::IndexOnly => layout.read_shard_index(index, format)?,
    };
    Ok(Node::Leaf(Leaf::new(index, store, false)))
}

fn check_node(node: &Node, lower: Option<&Key>, upper: Option<&Key>) -> Result<()> {
    match node {
        Node::Leaf(leaf) => check_range(leaf.index, &leaf.store, lower, upper),
        Node::Internal {
            index,
            routing_key,
            left,
            right,
        } => {
            let below_lower = lower.is_some_and(|lo| routing_key < lo);
            let above_upper = upper.is_some_and(|hi| routing_key >= hi);
            if below_lower || above_upper {
                return Err(CacheError::CorruptFormat(format!(
                    "Routing key of shard {} lies outside its parent range",
                    index
                )));
            }

            let (left_index, right_index) = child_indices(*index)?;
            if left.index() != left_index || right.index() != right_index {
                return Err(CacheError::InvariantViolation(format!(
                    "Children of shard {} are {} and {}",
                    index,
                    left.index(),
                    right.index()
                )));
            }

            check_node(left, lower, Some(routing_key))?;
            check_node(right, Some(routing_key), upper)
        }
    }
}

/// Every resident key of `store` must be strictly ascending and lie in
/// [lower, upper)
fn check_range(
    index: u64,
    store: &ContentStore,
    lower: Option<&Key>,
    upper: Option<&Key>,
) -> Result<()> {
    let keys = store.keys();

    if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(CacheError::CorruptFormat(format!(
            "Shard {} keys are not strictly ascending",
            index
        )));
    }

    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return Ok(());
    };

    if lower.is_some_and(|lo| first < lo) || upper.is_some_and(|hi| last >= hi) {
        return Err(CacheError::CorruptFormat(format!(
            "Shard {} holds keys outside its routing range",
            index
        )));
    }

    Ok(())
}
