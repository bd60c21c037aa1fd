//! Consensus parameters for **Umbra** core.
//!
//! [`ConsensusParameters`] centralises every tunable the verifier and chain
//! engine consult: target spacing, time tolerances, fee floor, activation
//! heights, and the reward schedule. It is constructed via
//! [`ConsensusParametersBuilder`] using the same fluent-builder pattern the
//! teacher crate used for its single-field `Config`, generalised to the
//! wider parameter set a shielded chain needs.
//!
//! ```
//! use umbra_core::params::ConsensusParameters;
//!
//! let params = ConsensusParameters::default();
//! assert_eq!(params.tree_depth, 32);
//! ```

use serde::{Deserialize, Serialize};

/// Runtime consensus configuration shared across the crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsensusParameters {
    /// Human-readable network identifier (e.g. "main", "test").
    pub network: String,

    /// Depth of the notes and nullifier Merkle trees.
    pub tree_depth: u8,

    /// Target spacing between blocks, in milliseconds.
    pub target_block_time_ms: i64,

    /// Number of blocks over which the retarget damping window is measured.
    pub retarget_window: u32,

    /// How far into the future (seconds) a block's timestamp may be, relative
    /// to the node's own clock.
    pub allowed_future_seconds: i64,

    /// Sequence at which `enforce_sequential_time` activates: beyond this
    /// height, timestamps must be strictly greater than the parent's.
    pub enforce_sequential_time_activation: u32,

    /// Sequence at which mint ownership transfer (`transfer_ownership_to`,
    /// transaction version >= 2) activates.
    pub ownership_transfer_activation: u32,

    /// Minimum fee (in the base unit) a non-miner's-fee transaction must pay.
    pub min_fee: i64,

    /// Maximum serialized block size, in bytes.
    pub max_block_size_bytes: usize,

    /// Block reward paid at sequence 1 (genesis), before any halving.
    pub initial_block_reward: u64,

    /// Number of blocks between successive reward halvings.
    pub halving_interval: u32,

    /// Cap on the number of parked orphan blocks, per §9's orphan pool note.
    pub max_orphans: usize,

    /// Cap on the number of ancestors walked while chasing an orphan's
    /// parent chain before giving up with `OrphanChainTooLong`.
    pub max_orphan_chain_length: usize,
}

impl Default for ConsensusParameters {
    fn default() -> Self {
        Self {
            network: "main".into(),
            tree_depth: 32,
            target_block_time_ms: 60_000,
            retarget_window: 17,
            allowed_future_seconds: 15 * 60,
            enforce_sequential_time_activation: 1,
            ownership_transfer_activation: 1,
            min_fee: 0,
            max_block_size_bytes: 2 * 1024 * 1024,
            initial_block_reward: 20 * 10u64.pow(8),
            halving_interval: 2_100_000,
            max_orphans: 1024,
            max_orphan_chain_length: 1024,
        }
    }
}

impl ConsensusParameters {
    /// The latest transaction version active at `sequence`, per §4.2's
    /// version-gating rule.
    pub fn latest_transaction_version_at(&self, sequence: u32) -> u8 {
        if sequence >= self.ownership_transfer_activation {
            2
        } else {
            1
        }
    }

    /// The block subsidy paid to the miner at `sequence`, per the halving
    /// schedule decided in SPEC_FULL.md's Open Questions section.
    pub fn mining_reward(&self, sequence: u32) -> u64 {
        let halvings = sequence / self.halving_interval.max(1);
        if halvings >= 64 {
            0
        } else {
            self.initial_block_reward >> halvings
        }
    }

    /// Whether timestamps must be strictly increasing at `sequence`.
    pub fn sequential_time_enforced(&self, sequence: u32) -> bool {
        sequence >= self.enforce_sequential_time_activation
    }

    /// Whether mint ownership transfer is permitted at `sequence`.
    pub fn ownership_transfer_allowed(&self, sequence: u32) -> bool {
        sequence >= self.ownership_transfer_activation
    }
}

/// Fluent builder for [`ConsensusParameters`].
pub struct ConsensusParametersBuilder {
    inner: ConsensusParameters,
}

impl ConsensusParametersBuilder {
    /// Starts a new builder pre-populated with [`ConsensusParameters::default`].
    pub fn new() -> Self {
        Self {
            inner: ConsensusParameters::default(),
        }
    }

    pub fn network<S: Into<String>>(mut self, name: S) -> Self {
        self.inner.network = name.into();
        self
    }

    pub fn tree_depth(mut self, depth: u8) -> Self {
        self.inner.tree_depth = depth;
        self
    }

    pub fn target_block_time_ms(mut self, ms: i64) -> Self {
        self.inner.target_block_time_ms = ms;
        self
    }

    pub fn retarget_window(mut self, window: u32) -> Self {
        self.inner.retarget_window = window;
        self
    }

    pub fn allowed_future_seconds(mut self, secs: i64) -> Self {
        self.inner.allowed_future_seconds = secs;
        self
    }

    pub fn min_fee(mut self, fee: i64) -> Self {
        self.inner.min_fee = fee;
        self
    }

    pub fn max_block_size_bytes(mut self, bytes: usize) -> Self {
        self.inner.max_block_size_bytes = bytes;
        self
    }

    pub fn initial_block_reward(mut self, reward: u64) -> Self {
        self.inner.initial_block_reward = reward;
        self
    }

    pub fn halving_interval(mut self, interval: u32) -> Self {
        self.inner.halving_interval = interval;
        self
    }

    pub fn max_orphans(mut self, cap: usize) -> Self {
        self.inner.max_orphans = cap;
        self
    }

    pub fn max_orphan_chain_length(mut self, cap: usize) -> Self {
        self.inner.max_orphan_chain_length = cap;
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> ConsensusParameters {
        self.inner
    }
}

impl Default for ConsensusParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}
