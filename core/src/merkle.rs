//! Append-only, fixed-depth Merkle tree (C1).
//!
//! Used for both the notes commitment tree and the nullifier commitment
//! tree; which domain it belongs to is entirely determined by the
//! [`crate::hasher::TreeHasher`] strategy it is constructed with.
//!
//! The tree keeps the full leaf sequence in memory (a `Vec<Hash>`) rather
//! than only the rightmost authentication path. This makes `root_at` and
//! `witness` for any past size a matter of replaying a prefix of the leaf
//! vector rather than maintaining incremental per-size snapshots — simpler
//! to reason about, at the cost of `O(size)` reconstruction instead of
//! `O(log size)`. Pruning (discarding leaves older than some size) is out
//! of scope, so this is never unbounded in a way the spec requires handling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hasher::TreeHasher;
use crate::Hash;

/// Sibling hashes from a leaf to the root at a particular historical size,
/// i.e. an authentication path / Merkle witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPath {
    pub leaf_index: u32,
    pub tree_size: u32,
    pub siblings: Vec<Hash>,
}

impl AuthPath {
    /// Recomputes the root that `leaf` authenticates to under this path.
    pub fn compute_root<H: TreeHasher>(&self, hasher: &H, leaf: Hash) -> Hash {
        let mut idx = self.leaf_index;
        let mut current = leaf;
        for (level, sibling) in self.siblings.iter().enumerate() {
            current = if idx % 2 == 0 {
                hasher.hash_node(&current, sibling, level as u8)
            } else {
                hasher.hash_node(sibling, &current, level as u8)
            };
            idx /= 2;
        }
        current
    }

    /// Whether `leaf` authenticates to `expected_root` under this path.
    pub fn verifies<H: TreeHasher>(&self, hasher: &H, leaf: Hash, expected_root: Hash) -> bool {
        self.compute_root(hasher, leaf) == expected_root
    }
}

/// Append-only binary Merkle tree of fixed depth `D`.
#[derive(Debug, Clone)]
pub struct MerkleTree<H: TreeHasher> {
    hasher: H,
    depth: u8,
    leaves: Vec<Hash>,
    index: HashMap<Hash, u32>,
    empty_hashes: Vec<Hash>,
}

impl<H: TreeHasher> MerkleTree<H> {
    /// Constructs an empty tree of the given `depth` (leaf capacity `2^depth`).
    pub fn new(hasher: H, depth: u8) -> Self {
        let empty_hashes = Self::build_empty_hashes(&hasher, depth);
        Self {
            hasher,
            depth,
            leaves: Vec::new(),
            index: HashMap::new(),
            empty_hashes,
        }
    }

    fn build_empty_hashes(hasher: &H, depth: u8) -> Vec<Hash> {
        let mut table = Vec::with_capacity(depth as usize + 1);
        table.push(hasher.empty_leaf());
        for level in 0..depth {
            let prev = table[level as usize];
            table.push(hasher.hash_node(&prev, &prev, level));
        }
        table
    }

    fn empty_hash(&self, level: u8) -> Hash {
        self.empty_hashes[level as usize]
    }

    fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Appends `leaf`, returning its index.
    pub fn append(&mut self, leaf: Hash) -> Result<u32> {
        if self.leaves.len() as u64 >= self.capacity() {
            return Err(Error::TreeFull);
        }
        let idx = self.leaves.len() as u32;
        self.leaves.push(leaf);
        self.index.entry(leaf).or_insert(idx);
        Ok(idx)
    }

    /// Current number of leaves.
    pub fn size(&self) -> u32 {
        self.leaves.len() as u32
    }

    /// Root hash at the current size.
    pub fn root(&self) -> Hash {
        self.compute_root(self.leaves.len())
    }

    /// Root hash the tree had when it contained exactly `size` leaves.
    pub fn root_at(&self, size: u32) -> Result<Hash> {
        if size as usize > self.leaves.len() {
            return Err(Error::WitnessUnavailable);
        }
        Ok(self.compute_root(size as usize))
    }

    fn compute_root(&self, size: usize) -> Hash {
        if size == 0 {
            return self.empty_hash(self.depth);
        }
        let mut level: Vec<Hash> = self.leaves[..size].to_vec();
        for d in 0..self.depth {
            let empty = self.empty_hash(d);
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            let mut i = 0;
            while i < level.len() {
                let left = level[i];
                let right = if i + 1 < level.len() { level[i + 1] } else { empty };
                next.push(self.hasher.hash_node(&left, &right, d));
                i += 2;
            }
            level = next;
        }
        level[0]
    }

    /// Authentication path for the leaf at `index`, as the tree stood when
    /// it contained `at_size` leaves. Fails if `index >= at_size` or if
    /// `at_size` exceeds what this tree has ever held.
    pub fn witness(&self, index: u32, at_size: u32) -> Result<AuthPath> {
        if index >= at_size {
            return Err(Error::LeafOutOfRange);
        }
        if at_size as usize > self.leaves.len() {
            return Err(Error::WitnessUnavailable);
        }
        let mut level: Vec<Hash> = self.leaves[..at_size as usize].to_vec();
        let mut idx = index as usize;
        let mut siblings = Vec::with_capacity(self.depth as usize);
        for d in 0..self.depth {
            let empty = self.empty_hash(d);
            let sibling_idx = idx ^ 1;
            let sibling = level.get(sibling_idx).copied().unwrap_or(empty);
            siblings.push(sibling);

            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            let mut i = 0;
            while i < level.len() {
                let left = level[i];
                let right = if i + 1 < level.len() { level[i + 1] } else { empty };
                next.push(self.hasher.hash_node(&left, &right, d));
                i += 2;
            }
            level = next;
            idx /= 2;
        }
        Ok(AuthPath {
            leaf_index: index,
            tree_size: at_size,
            siblings,
        })
    }

    /// Discards leaves `[new_size, size)`. Idempotent if `new_size >= size`.
    pub fn truncate(&mut self, new_size: u32) {
        let new_size = new_size as usize;
        if new_size >= self.leaves.len() {
            return;
        }
        self.leaves.truncate(new_size);
        self.index.retain(|_, idx| (*idx as usize) < new_size);
    }

    /// Index of `leaf`, if present (first occurrence).
    pub fn contains(&self, leaf: &Hash) -> Option<u32> {
        self.index.get(leaf).copied()
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// All leaves currently held, in insertion order. Used by the chain
    /// engine when it needs to rebuild a pristine tree for a side-chain
    /// snapshot.
    pub fn leaves(&self) -> &[Hash] {
        &self.leaves
    }
}
