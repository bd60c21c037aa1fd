//! Mempool interface (C10): the narrow contract the chain engine expects
//! from a pending-transaction pool (§4.7).
//!
//! Mempool admission policy is explicitly out of scope (§1); this module
//! only defines the trait `ChainEngine` calls into on connect/disconnect, so
//! the CORE can be exercised and tested without a real mempool implementation
//! (see `NullMempool` below, used by tests and as the default when no
//! mempool is wired in).

use crate::block::Block;

/// What the chain engine expects to be able to tell a mempool.
pub trait MempoolHandle: Send {
    /// A block connected to the main chain: remove transactions whose
    /// nullifiers now appear on chain, and any transaction whose
    /// `expiration <= head.sequence`.
    fn on_connect_block(&mut self, block: &Block, head_sequence: u32);

    /// A block was disconnected: its transactions' nullifiers are released,
    /// so they should be reconsidered for re-admission.
    fn on_disconnect_block(&mut self, block: &Block);
}

/// No-op mempool, used where nothing downstream of the CORE needs the
/// callback (e.g. genesis bootstrapping, most unit tests).
#[derive(Debug, Default)]
pub struct NullMempool;

impl MempoolHandle for NullMempool {
    fn on_connect_block(&mut self, _block: &Block, _head_sequence: u32) {}
    fn on_disconnect_block(&mut self, _block: &Block) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{BlockHeader, TreeCommitment};
    use primitive_types::U256;
    use std::collections::HashSet;

    /// A recording mempool used only to exercise the trait's call shape in
    /// tests elsewhere in the crate.
    #[derive(Debug, Default)]
    pub struct RecordingMempool {
        pub connected: Vec<u32>,
        pub disconnected: Vec<u32>,
        pub pending_expirations: HashSet<u32>,
    }

    impl MempoolHandle for RecordingMempool {
        fn on_connect_block(&mut self, block: &Block, head_sequence: u32) {
            self.connected.push(block.header.sequence);
            self.pending_expirations.retain(|exp| *exp > head_sequence);
        }

        fn on_disconnect_block(&mut self, block: &Block) {
            self.disconnected.push(block.header.sequence);
        }
    }

    fn dummy_block(sequence: u32) -> Block {
        Block {
            header: BlockHeader {
                sequence,
                previous_hash: [0u8; 32],
                note_commitment: TreeCommitment::new([0u8; 32], 0),
                nullifier_commitment: TreeCommitment::new([0u8; 32], 0),
                target: U256::MAX,
                randomness: 0,
                timestamp: 0,
                graffiti: [0u8; 32],
                transactions_hash: [0u8; 32],
            },
            transactions: vec![],
        }
    }

    #[test]
    fn null_mempool_ignores_callbacks() {
        let mut mempool = NullMempool;
        mempool.on_connect_block(&dummy_block(1), 1);
        mempool.on_disconnect_block(&dummy_block(1));
    }

    #[test]
    fn recording_mempool_prunes_expired_on_connect() {
        let mut mempool = RecordingMempool::default();
        mempool.pending_expirations.insert(5);
        mempool.pending_expirations.insert(10);
        mempool.on_connect_block(&dummy_block(6), 6);
        assert_eq!(mempool.connected, vec![6]);
        assert!(!mempool.pending_expirations.contains(&5));
        assert!(mempool.pending_expirations.contains(&10));
    }
}
