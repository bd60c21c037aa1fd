//! Verifier (C6): non-contextual and contextual validation rules (§4.3).
//!
//! The teacher crate's `Ledger::validate_tx` mixed a little of both layers
//! together (signature check plus a UTXO-existence lookup) in one function.
//! This module splits them the way §4.3 requires: [`check_non_contextual`]
//! needs no chain state and is safe to run on gossip before a block has a
//! known parent; [`check_contextual`] is evaluated against a specific
//! ancestor (almost always the prospective parent) and needs read access to
//! the notes tree, nullifier tree, and asset ledger as they stood there.

use primitive_types::U256;

use crate::asset::AssetLedger;
use crate::block::Block;
use crate::error::{Error, Result};
use crate::hasher::{NoteTreeHasher, NullifierTreeHasher};
use crate::header::BlockHeader;
use crate::merkle::MerkleTree;
use crate::params::ConsensusParameters;
use crate::target::{hash_meets_target, next_target};
use crate::transaction::{Transaction, TransactionKind};
use crate::Hash;

/// The pure-function boundary to the zero-knowledge proof system (§1: "This
/// spec treats proof verification as a pure function `verify_proofs(tx) ->
/// bool`"). Implemented outside the CORE crate (see the `zk` crate).
pub trait ProofVerifier: Send + Sync {
    fn verify_proofs(&self, tx: &Transaction) -> bool;
}

/// A `ProofVerifier` that accepts everything; used by tests that want to
/// exercise chain-engine logic without wiring in a real proof backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllProofs;

impl ProofVerifier for AcceptAllProofs {
    fn verify_proofs(&self, _tx: &Transaction) -> bool {
        true
    }
}

/// Read-only view of chain state as of a specific ancestor, needed to run
/// [`check_contextual`] against a block other than the live tip (e.g. a
/// side-chain entry, per §9's "full contextual verification at side-chain
/// entry" decision recorded in DESIGN.md).
pub struct ChainView<'a> {
    pub parent: &'a BlockHeader,
    pub notes: &'a MerkleTree<NoteTreeHasher>,
    pub nullifiers: &'a MerkleTree<NullifierTreeHasher>,
    pub assets: &'a AssetLedger,
    pub now_ms: i64,
}

/// Non-contextual checks: pure, no chain state, safe for mempool/gossip.
pub fn check_non_contextual(
    block: &Block,
    params: &ConsensusParameters,
    proofs: &dyn ProofVerifier,
) -> Result<()> {
    block.check_structure()?;

    if block.serialized_size() > params.max_block_size_bytes {
        return Err(Error::BlockTooLarge);
    }

    if Block::compute_transactions_hash(&block.transactions) != block.header.transactions_hash {
        return Err(Error::InvalidNoteCommitment);
    }

    if !hash_meets_target(&block.hash(), block.header.target) {
        return Err(Error::InvalidPow);
    }

    let mut seen_nullifiers = std::collections::HashSet::new();
    for tx in &block.transactions {
        if tx.element_count() == 0 {
            return Err(Error::EmptyTransaction);
        }
        // The miner's-fee transaction mints the block reward; it has no
        // spends authorizing it and so no binding signature to check.
        if !tx.is_miners_fee() && tx.verify_signature().is_err() {
            return Err(Error::BadSignature);
        }
        if !proofs.verify_proofs(tx) {
            return Err(Error::InvalidTransactionProof);
        }
        if !tx.is_miners_fee() && tx.fee < params.min_fee {
            return Err(Error::FeeTooLow);
        }
        for nullifier in tx.nullifiers() {
            if !seen_nullifiers.insert(*nullifier) {
                return Err(Error::DuplicateNullifier);
            }
        }
    }

    let miners_fee = block
        .miners_fee_transaction()
        .ok_or(Error::InvalidMinersFee)?;
    let collected: i64 = block.standard_transactions().iter().map(|tx| tx.fee).sum();
    let expected_reward = params.mining_reward(block.header.sequence) as i64;
    if miners_fee.fee != -(collected + expected_reward) {
        return Err(Error::InvalidMinersFee);
    }

    Ok(())
}

/// Contextual checks: evaluated against `view`, the chain state as of the
/// prospective parent (or an ancestor, for side-chain entry).
pub fn check_contextual(
    block: &Block,
    view: &ChainView,
    params: &ConsensusParameters,
    grandparent_timestamp_ms: i64,
) -> Result<()> {
    if block.header.sequence != view.parent.sequence + 1 {
        return Err(Error::InvalidSequence);
    }

    if block.header.timestamp < view.parent.timestamp {
        return Err(Error::InvalidTimestamp);
    }
    if params.sequential_time_enforced(block.header.sequence)
        && block.header.timestamp <= view.parent.timestamp
    {
        return Err(Error::InvalidTimestamp);
    }
    if block.header.timestamp > view.now_ms + params.allowed_future_seconds * 1000 {
        return Err(Error::InvalidTimestamp);
    }

    let expected_target = next_target(
        view.parent.target,
        view.parent.timestamp,
        grandparent_timestamp_ms,
        params,
    );
    if block.header.target != expected_target {
        return Err(Error::InvalidTarget);
    }

    let version = params.latest_transaction_version_at(block.header.sequence);
    for tx in &block.transactions {
        if tx.version != version {
            return Err(Error::InvalidTransactionVersion);
        }
        if tx.expiration != 0 && tx.expiration <= block.header.sequence {
            return Err(Error::TxExpired);
        }

        for spend in &tx.spends {
            let historical_root = view
                .notes
                .root_at(spend.tree_size)
                .map_err(|_| Error::InvalidSpendRoot)?;
            if historical_root != spend.root {
                return Err(Error::InvalidSpendRoot);
            }
            if view.nullifiers.contains(&spend.nullifier).is_some() {
                return Err(Error::DuplicateNullifier);
            }
        }

        for mint in &tx.mints {
            let expected_id = derive_asset_id(&mint.creator, &mint.name, &mint.metadata, mint.nonce);
            if expected_id != mint.asset_id {
                return Err(Error::InvalidAssetId);
            }
            if let Some(existing) = view.assets.get(&mint.asset_id) {
                if existing.owner != mint.owner_public_key {
                    return Err(Error::AssetOwnerMismatch);
                }
                if mint.transfer_ownership_to.is_some()
                    && !params.ownership_transfer_allowed(block.header.sequence)
                {
                    return Err(Error::InvalidTransactionVersion);
                }
            }
        }

        for burn in &tx.burns {
            let asset = view.assets.get(&burn.asset_id).ok_or(Error::UnknownAsset)?;
            if asset.supply < burn.value {
                return Err(Error::SupplyUnderflow);
            }
        }
    }

    Ok(())
}

/// `id = H(creator || name || metadata || nonce)`, per §3.
pub fn derive_asset_id(creator: &Hash, name: &[u8], metadata: &[u8], nonce: u8) -> Hash {
    use blake2::{Blake2s256, Digest};
    let mut hasher = Blake2s256::new();
    hasher.update(b"umbra-asset-id");
    hasher.update(creator);
    hasher.update(name);
    hasher.update(metadata);
    hasher.update([nonce]);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Verifies that appending `block`'s outputs/nullifiers to the given trees
/// would reproduce the header's committed roots and sizes — the "post-connect
/// invariants (checked as a dry-run)" from §4.3. Callers perform the dry-run
/// on scratch clones of the trees and discard them on failure.
pub fn check_post_connect_invariants(
    block: &Block,
    notes_after: &MerkleTree<NoteTreeHasher>,
    nullifiers_after: &MerkleTree<NullifierTreeHasher>,
) -> Result<()> {
    if notes_after.root() != block.header.note_commitment.root
        || notes_after.size() != block.header.note_commitment.size
    {
        return Err(Error::InvalidNoteCommitment);
    }
    if nullifiers_after.root() != block.header.nullifier_commitment.root
        || nullifiers_after.size() != block.header.nullifier_commitment.size
    {
        return Err(Error::InvalidNullifierCommitment);
    }
    Ok(())
}

/// `true` if `candidate`'s cumulative work beats `current`'s, with the §4.6
/// tie-break: equal work favors the lexicographically-lower hash.
pub fn is_heavier(candidate_work: U256, candidate_hash: &Hash, current_work: U256, current_hash: &Hash) -> bool {
    match candidate_work.cmp(&current_work) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate_hash < current_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TreeCommitment;
    use crate::transaction::{Output, Proof, ENCRYPTED_NOTE_LEN};

    fn miners_fee(fee: i64) -> Transaction {
        Transaction {
            kind: TransactionKind::MinersFee,
            version: 2,
            fee,
            expiration: 0,
            randomized_public_key: [0u8; 32],
            spends: vec![],
            outputs: vec![Output {
                note_commitment: [7u8; 32],
                proof: Proof::default(),
                encrypted_note: [0u8; ENCRYPTED_NOTE_LEN],
            }],
            mints: vec![],
            burns: vec![],
            signature: [0u8; 64],
        }
    }

    fn block_with_fee(fee: i64) -> Block {
        let transactions = vec![miners_fee(fee)];
        let header = BlockHeader {
            sequence: 1,
            previous_hash: [0u8; 32],
            note_commitment: TreeCommitment::new([1u8; 32], 1),
            nullifier_commitment: TreeCommitment::new([0u8; 32], 0),
            target: U256::MAX,
            randomness: 0,
            timestamp: 0,
            graffiti: [0u8; 32],
            transactions_hash: Block::compute_transactions_hash(&transactions),
        };
        Block {
            header,
            transactions,
        }
    }

    #[test]
    fn non_contextual_accepts_well_formed_block() {
        let params = ConsensusParameters::default();
        let expected_reward = params.mining_reward(1) as i64;
        let block = block_with_fee(-expected_reward);
        assert!(check_non_contextual(&block, &params, &AcceptAllProofs).is_ok());
    }

    #[test]
    fn non_contextual_rejects_unbalanced_miners_fee() {
        let params = ConsensusParameters::default();
        let block = block_with_fee(-1);
        assert_eq!(
            check_non_contextual(&block, &params, &AcceptAllProofs),
            Err(Error::InvalidMinersFee)
        );
    }

    #[test]
    fn non_contextual_rejects_failing_pow() {
        let params = ConsensusParameters::default();
        let expected_reward = params.mining_reward(1) as i64;
        let mut block = block_with_fee(-expected_reward);
        block.header.target = U256::zero();
        assert_eq!(
            check_non_contextual(&block, &params, &AcceptAllProofs),
            Err(Error::InvalidPow)
        );
    }

    #[test]
    fn heavier_tiebreaks_on_lower_hash() {
        let work = U256::from(10u64);
        assert!(is_heavier(work, &[1u8; 32], work, &[2u8; 32]));
        assert!(!is_heavier(work, &[2u8; 32], work, &[1u8; 32]));
        assert!(is_heavier(U256::from(11u64), &[9u8; 32], work, &[0u8; 32]));
    }

    #[test]
    fn asset_id_derivation_is_order_sensitive() {
        let a = derive_asset_id(&[1u8; 32], b"x", b"y", 0);
        let b = derive_asset_id(&[1u8; 32], b"xy", b"", 0);
        assert_ne!(a, b);
    }
}
