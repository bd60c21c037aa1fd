//! Orphan block pool (§9: "Specify an explicit bounded map `previous_hash ->
//! [block]` with a cap ... and LRU eviction to bound memory").
//!
//! The teacher crate had no notion of orphans — `Ledger::apply_block`
//! rejected anything whose `prev_hash` didn't match the tip outright. This
//! pool is new: a multimap keyed by the missing parent's hash, backed by an
//! `lru::LruCache` so that if the pool fills up with blocks that never find
//! their parent, the oldest-inserted entries are evicted first rather than
//! the pool growing without bound.

use lru::LruCache;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

use crate::block::Block;
use crate::Hash;

/// Bounded pool of blocks parked because their parent hasn't arrived yet,
/// keyed by `previous_hash` so arrival of the parent can look up all of its
/// waiting children in one step.
pub struct OrphanPool {
    by_parent: LruCache<Hash, VecDeque<Block>>,
    /// Every currently-parked block's own hash mapped to its `previous_hash`,
    /// so [`Self::chain_depth`] can walk an orphan's ancestor chain without
    /// scanning every bucket.
    by_hash: HashMap<Hash, Hash>,
    max_orphans: usize,
    total: usize,
}

impl OrphanPool {
    /// `capacity` bounds the number of distinct `previous_hash` keys; total
    /// blocks held are additionally capped at `max_orphans` across all keys.
    pub fn new(capacity: usize, max_orphans: usize) -> Self {
        Self {
            by_parent: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
            by_hash: HashMap::new(),
            max_orphans,
            total: 0,
        }
    }

    /// Parks `block`, evicting the least-recently-touched parent bucket if
    /// the pool is at capacity.
    pub fn insert(&mut self, block: Block) {
        if self.total >= self.max_orphans {
            if let Some((_, evicted)) = self.by_parent.pop_lru() {
                for evicted_block in &evicted {
                    self.by_hash.remove(&evicted_block.hash());
                }
                self.total -= evicted.len();
            }
        }
        let parent = block.header.previous_hash;
        self.by_hash.insert(block.hash(), parent);
        let bucket = self.by_parent.get_or_insert_mut(parent, VecDeque::new);
        bucket.push_back(block);
        self.total += 1;
    }

    /// Removes and returns every block waiting on `parent_hash`, for replay
    /// after that parent is successfully connected.
    pub fn take_children(&mut self, parent_hash: &Hash) -> Vec<Block> {
        match self.by_parent.pop(parent_hash) {
            Some(bucket) => {
                self.total -= bucket.len();
                for block in &bucket {
                    self.by_hash.remove(&block.hash());
                }
                bucket.into_iter().collect()
            }
            None => Vec::new(),
        }
    }

    /// Number of already-parked ancestor orphans found by walking backward
    /// from `hash` through [`Self::by_hash`]: `hash` itself, then its
    /// parent's entry, and so on, stopping the first time a hash isn't
    /// itself a parked orphan. Used to bound how long a chain of orphans
    /// still waiting on a common, never-arrived ancestor may grow.
    pub fn chain_depth(&self, hash: &Hash) -> usize {
        let mut depth = 0;
        let mut current = *hash;
        while let Some(parent) = self.by_hash.get(&current) {
            depth += 1;
            current = *parent;
        }
        depth
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
