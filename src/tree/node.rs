//! Shard tree nodes
//!
//! Shard indices follow complete-binary-tree addressing: the root is 0 and
//! the children of `i` are `2i + 1` and `2i + 2`.

use tracing::info;

use crate::error::{CacheError, Result};
use crate::key::Key;
use crate::storage::{ContentStore, Residency};

/// Indices of the two children of shard `index`
pub fn child_indices(index: u64) -> Result<(u64, u64)> {
    let left = index
        .checked_mul(2)
        .and_then(|i| i.checked_add(1))
        .ok_or_else(|| {
            CacheError::InvariantViolation(format!("Shard index overflow below {}", index))
        })?;
    let right = left.checked_add(1).ok_or_else(|| {
        CacheError::InvariantViolation(format!("Shard index overflow below {}", index))
    })?;
    Ok((left, right))
}

/// A leaf owning one shard store
#[derive(Debug)]
pub struct Leaf {
    pub(crate) index: u64,
    pub(crate) store: ContentStore,
    /// Changed since last persisted
    pub(crate) dirty: bool,
}

impl Leaf {
    pub(crate) fn new(index: u64, store: ContentStore, dirty: bool) -> Self {
        Self {
            index,
            store,
            dirty,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A shard tree node
///
/// For `Internal`, every key under `left` is `< routing_key` and every key
/// under `right` is `>= routing_key`.
#[derive(Debug)]
pub enum Node {
    Leaf(Leaf),
    Internal {
        index: u64,
        routing_key: Key,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn index(&self) -> u64 {
        match self {
            Node::Leaf(leaf) => leaf.index,
            Node::Internal { index, .. } => *index,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Leaf whose key range covers `key`
    pub fn leaf_for(&self, key: &Key) -> &Leaf {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal {
                routing_key,
                left,
                right,
                ..
            } => {
                if key < routing_key {
                    left.leaf_for(key)
                } else {
                    right.leaf_for(key)
                }
            }
        }
    }

    pub(crate) fn leaf_for_mut(&mut self, key: &Key) -> &mut Leaf {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal {
                routing_key,
                left,
                right,
                ..
            } => {
                if key < routing_key {
                    left.leaf_for_mut(key)
                } else {
                    right.leaf_for_mut(key)
                }
            }
        }
    }

    /// Upsert into the owning leaf, splitting it if it now holds more than
    /// `threshold` entries
    pub(crate) fn insert(
        &mut self,
        key: Key,
        value: Vec<u8>,
        threshold: usize,
    ) -> Result<Option<Vec<u8>>> {
        match self {
            Node::Internal {
                routing_key,
                left,
                right,
                ..
            } => {
                if key < *routing_key {
                    left.insert(key, value, threshold)
                } else {
                    right.insert(key, value, threshold)
                }
            }
            Node::Leaf(leaf) => {
                let previous = leaf.store.upsert(key, value)?;
                leaf.dirty = true;
                let overloaded = leaf.store.len() > threshold;

                if overloaded {
                    self.split_leaf()?;
                }
                Ok(previous)
            }
        }
    }

    /// Turn this leaf into an internal node over two fresh leaves
    ///
    /// The routing key is the smallest key of the greater half.
    pub(crate) fn split_leaf(&mut self) -> Result<()> {
        let Node::Leaf(leaf) = self else {
            return Err(CacheError::InvariantViolation(
                "Cannot split an internal node".to_string(),
            ));
        };

        if leaf.store.residency() != Residency::Full {
            return Err(CacheError::NotResident(format!(
                "shard {} must be fully loaded to split",
                leaf.index
            )));
        }

        let index = leaf.index;
        let (left_index, right_index) = child_indices(index)?;

        let (lesser, greater) = std::mem::take(&mut leaf.store).split()?;
        let routing_key = greater.first_key().ok_or_else(|| {
            CacheError::InvariantViolation(format!("Split of shard {} left greater half empty", index))
        })?;

        info!(
            shard = index,
            routing_key = %routing_key.short(),
            left = left_index,
            left_entries = lesser.len(),
            right = right_index,
            right_entries = greater.len(),
            "Split shard"
        );

        *self = Node::Internal {
            index,
            routing_key,
            left: Box::new(Node::Leaf(Leaf::new(left_index, lesser, true))),
            right: Box::new(Node::Leaf(Leaf::new(right_index, greater, true))),
        };

        Ok(())
    }

    pub(crate) fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Node::Leaf(leaf) => out.push(leaf),
            Node::Internal { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }

    pub(crate) fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Leaf>) {
        match self {
            Node::Leaf(leaf) => out.push(leaf),
            Node::Internal { left, right, .. } => {
                left.collect_leaves_mut(out);
                right.collect_leaves_mut(out);
            }
        }
    }

    /// (shard index, routing key) for every internal node, pre-order
    pub(crate) fn collect_routes(&self, out: &mut Vec<(u64, Key)>) {
        if let Node::Internal {
            index,
            routing_key,
            left,
            right,
        } = self
        {
            out.push((*index, *routing_key));
            left.collect_routes(out);
            right.collect_routes(out);
        }
    }

    pub(crate) fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}
