//! **Umbra** core: the block-accepting state machine of a privacy-preserving,
//! shielded-transaction, proof-of-work blockchain.
//!
//! This crate owns validation, chain selection, reorganization, and the four
//! structures a connected block mutates atomically: the block index, the
//! notes commitment tree, the nullifier commitment tree, and the per-asset
//! supply ledger. Networking, wallet key management, RPC surfaces, and the
//! zero-knowledge proof system itself are deliberately kept outside this
//! crate (see the sibling `network`, `wallet`, `rpc`, and `zk` crates); this
//! crate only calls into them through narrow trait boundaries
//! ([`verifier::ProofVerifier`], [`mempool::MempoolHandle`]).

pub mod asset;
pub mod block;
pub mod chain;
pub mod error;
pub mod events;
pub mod hasher;
pub mod header;
pub mod merkle;
pub mod mempool;
pub mod orphan;
pub mod params;
pub mod store;
pub mod target;
pub mod transaction;
pub mod verifier;

/// 32-byte hash used throughout the crate: block hashes, note commitments,
/// nullifiers, asset ids, and transaction hashes.
pub type Hash = [u8; 32];

/// The all-zero sentinel used as `previous_hash` for genesis and as the
/// "no ancestor" marker when walking chains.
pub const ZERO_HASH: Hash = [0u8; 32];
