//! Error taxonomy for the **Umbra** core crate.
//!
//! All high-level operations return [`crate::Result`], a convenient alias for
//! `core::result::Result<T, Error>`. The variants mirror the reason taxonomy
//! a block-accepting state machine needs to report back to its caller: most
//! of them double as the `reason` returned from [`crate::chain::ChainEngine::add_block`],
//! and each carries a [`PeerScoreImpact`] so callers can score peers without
//! re-deriving it from the variant.

use thiserror::Error;

/// How much a given rejection should cost the peer that sent the block, in
/// the judgement of the node that rejected it. The CORE never talks to a
/// peer directly; it only hands this value back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeerScoreImpact {
    None,
    Low,
    Medium,
    High,
    Max,
}

/// Core crate error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// The block's hash was already present in the store.
    #[error("duplicate block")]
    Duplicate,

    /// The block's parent is not yet known; it has been parked.
    #[error("orphan block, parent unknown")]
    Orphan,

    /// The orphan pool is full and this chain of orphans exceeds the cap.
    #[error("orphan chain too long")]
    OrphanChainTooLong,

    /// Header hash does not satisfy the declared target.
    #[error("proof of work does not meet target")]
    InvalidPow,

    /// The header's target does not match the value computed by retargeting.
    #[error("computed target does not match header")]
    InvalidTarget,

    /// Timestamp is out of the allowed window relative to the parent / now.
    #[error("timestamp out of allowed range")]
    InvalidTimestamp,

    /// `sequence` is not exactly one greater than the parent's.
    #[error("block sequence is non-sequential")]
    InvalidSequence,

    /// A transaction's proof failed verification.
    #[error("transaction proof failed verification")]
    InvalidTransactionProof,

    /// A transaction's binding signature failed verification.
    #[error("signature verification failed")]
    BadSignature,

    /// The same nullifier is spent twice (within the block, or versus the
    /// main-chain nullifier set up to the parent).
    #[error("duplicate nullifier")]
    DuplicateNullifier,

    /// Appending the block's outputs does not reproduce the header's
    /// committed note-tree root/size.
    #[error("note commitment mismatch")]
    InvalidNoteCommitment,

    /// Appending the block's nullifiers does not reproduce the header's
    /// committed nullifier-tree root/size.
    #[error("nullifier commitment mismatch")]
    InvalidNullifierCommitment,

    /// The miner's-fee transaction's fee does not balance the block.
    #[error("miner's fee does not balance the block")]
    InvalidMinersFee,

    /// A transaction's declared structure is empty (no spends/outputs/mints/burns).
    #[error("transaction has no spends, outputs, mints, or burns")]
    EmptyTransaction,

    /// Fee is below the configured minimum.
    #[error("fee below minimum")]
    FeeTooLow,

    /// Serialized block size exceeds the configured maximum.
    #[error("block exceeds maximum size")]
    BlockTooLarge,

    /// A spend's `root` does not match any historical note-tree root
    /// reachable from the chain prefix ending at the parent.
    #[error("spend root not found on the active chain")]
    InvalidSpendRoot,

    /// A mint's `asset_id` does not match its declared creator/name/metadata/nonce.
    #[error("asset id does not match mint fields")]
    InvalidAssetId,

    /// A mint claims an asset owned by someone other than the mint's creator.
    #[error("asset owner mismatch")]
    AssetOwnerMismatch,

    /// A burn (or mint ownership transfer) would underflow the asset's supply.
    #[error("asset supply underflow")]
    SupplyUnderflow,

    /// Referenced asset does not exist.
    #[error("asset not found")]
    UnknownAsset,

    /// The transaction's `version` does not match the version active at its
    /// block's sequence.
    #[error("transaction version not active at this height")]
    InvalidTransactionVersion,

    /// A transaction's `expiration` has passed at this height.
    #[error("transaction has expired")]
    TxExpired,

    /// Merkle tree is already at its maximum capacity for its depth.
    #[error("merkle tree is full")]
    TreeFull,

    /// A witness was requested for a size the tree can no longer reconstruct.
    #[error("witness unavailable for requested size")]
    WitnessUnavailable,

    /// The requested leaf index is not yet part of the tree at the requested size.
    #[error("leaf index out of range for requested tree size")]
    LeafOutOfRange,

    /// An ancestor / common-ancestor walk could not find a requested block.
    #[error("unknown block")]
    UnknownBlock,

    /// Underlying persistent store failed. Fatal: the writer surfaces this and
    /// leaves the chain in its last-committed state.
    #[error("storage error: {0}")]
    Storage(String),

    /// Placeholder for errors originating from external crates.
    #[error("{0}")]
    Other(&'static str),
}

impl Error {
    /// The peer score impact prescribed by the reason taxonomy for this error.
    pub fn peer_score_impact(&self) -> PeerScoreImpact {
        use Error::*;
        match self {
            Duplicate | Orphan => PeerScoreImpact::None,
            TxExpired => PeerScoreImpact::Medium,
            InvalidTimestamp => PeerScoreImpact::High,
            OrphanChainTooLong
            | InvalidPow
            | InvalidTarget
            | InvalidSequence
            | InvalidTransactionProof
            | BadSignature
            | DuplicateNullifier
            | InvalidNoteCommitment
            | InvalidNullifierCommitment
            | InvalidMinersFee
            | EmptyTransaction
            | FeeTooLow
            | BlockTooLarge
            | InvalidSpendRoot
            | InvalidAssetId
            | AssetOwnerMismatch
            | SupplyUnderflow
            | UnknownAsset
            | InvalidTransactionVersion
            | TreeFull
            | WitnessUnavailable
            | LeafOutOfRange
            | UnknownBlock => PeerScoreImpact::Max,
            Storage(_) | Other(_) => PeerScoreImpact::None,
        }
    }

    /// Whether this reason indicates the block should be parked as an orphan
    /// rather than rejected outright.
    pub fn is_orphan(&self) -> bool {
        matches!(self, Error::Orphan)
    }
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
