//! Hash strategy objects injected into the Merkle trees (C1) and used for
//! header/transaction hashing.
//!
//! §9's "strategy polymorphism" note says the production cryptographic
//! primitives (Pedersen hashing for notes) are specified only at their
//! contract boundary. This module provides that boundary: a small
//! [`TreeHasher`] trait with domain-separated Blake2 implementations
//! standing in for the two distinct production hashers (notes, nullifiers)
//! the spec names. Swapping in a real Pedersen hasher for notes means
//! implementing this trait; nothing else in the tree or chain-engine code
//! changes.

use blake2::{Blake2s256, Digest};

use crate::Hash;

/// Capability set a Merkle tree needs from its domain: combine two children
/// into a parent, and produce the canonical value for an empty leaf.
pub trait TreeHasher: Clone + Send + Sync {
    /// Combines `left` and `right` into their parent at `level` (0 = the
    /// level just above the leaves). `level` is folded into the hash input
    /// so that nodes at different heights never collide even if their
    /// children happen to match.
    fn hash_node(&self, left: &Hash, right: &Hash, level: u8) -> Hash;

    /// The canonical value of an empty leaf, used to pad missing right
    /// children (§4.1: "root of the current size, padded with the
    /// canonical empty-subtree hashes for missing right children").
    fn empty_leaf(&self) -> Hash;
}

fn blake2s_domain(tag: &[u8], parts: &[&[u8]]) -> Hash {
    let mut hasher = Blake2s256::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Domain-separated hasher for the notes commitment tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteTreeHasher;

impl TreeHasher for NoteTreeHasher {
    fn hash_node(&self, left: &Hash, right: &Hash, level: u8) -> Hash {
        blake2s_domain(b"umbra-note-node", &[&[level], left, right])
    }

    fn empty_leaf(&self) -> Hash {
        blake2s_domain(b"umbra-note-empty", &[])
    }
}

/// Domain-separated hasher for the nullifier commitment tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullifierTreeHasher;

impl TreeHasher for NullifierTreeHasher {
    fn hash_node(&self, left: &Hash, right: &Hash, level: u8) -> Hash {
        blake2s_domain(b"umbra-nullifier-node", &[&[level], left, right])
    }

    fn empty_leaf(&self) -> Hash {
        blake2s_domain(b"umbra-nullifier-empty", &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_and_nullifier_hashers_are_domain_separated() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let note_node = NoteTreeHasher.hash_node(&a, &b, 0);
        let null_node = NullifierTreeHasher.hash_node(&a, &b, 0);
        assert_ne!(note_node, null_node);
    }

    #[test]
    fn level_changes_output() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let at_0 = NoteTreeHasher.hash_node(&a, &b, 0);
        let at_1 = NoteTreeHasher.hash_node(&a, &b, 1);
        assert_ne!(at_0, at_1);
    }
}
