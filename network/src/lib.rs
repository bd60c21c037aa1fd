//! Gossip/sync adapter: the narrow collaborator that hands deserialized
//! blocks to a `ChainEngine` and turns its verdict into peer-scoring, per
//! §1's "networking... left outside this spec" / §10.6 boundary-demonstration
//! scope. Swarm/transport construction and actual wire framing are a node
//! binary's job, not this crate's.

use libp2p::PeerId;

use umbra_core::block::Block;
use umbra_core::chain::ChainEngine;
use umbra_core::error::PeerScoreImpact;
use umbra_core::mempool::MempoolHandle;
use umbra_core::store::BlockStore;
use umbra_core::verifier::ProofVerifier;

/// Gossipsub topic new blocks are announced on.
pub const BLOCKS_TOPIC: &str = "umbra/blocks/1";

/// Additive delta for libp2p gossipsub's peer-scoring, derived from the
/// reason `ChainEngine::add_block` rejected a block for.
fn score_delta(impact: PeerScoreImpact) -> f64 {
    match impact {
        PeerScoreImpact::None => 0.0,
        PeerScoreImpact::Low => -1.0,
        PeerScoreImpact::Medium => -10.0,
        PeerScoreImpact::High => -50.0,
        PeerScoreImpact::Max => -100.0,
    }
}

/// Hands gossiped blocks to a `ChainEngine` and reports the per-peer score
/// delta the caller's gossipsub behaviour should apply. Owns the engine but
/// no transport; wiring a swarm around this is the node binary's job.
pub struct GossipHandler<S: BlockStore, P: ProofVerifier, M: MempoolHandle> {
    engine: ChainEngine<S, P, M>,
}

impl<S, P, M> GossipHandler<S, P, M>
where
    S: BlockStore,
    P: ProofVerifier,
    M: MempoolHandle,
{
    pub fn new(engine: ChainEngine<S, P, M>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ChainEngine<S, P, M> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ChainEngine<S, P, M> {
        &mut self.engine
    }

    /// Processes one gossiped block from `peer`. Returns whether it was
    /// connected and the score delta to apply to that peer.
    pub fn handle_block(&mut self, peer: PeerId, block: Block, now_ms: i64) -> (bool, f64) {
        let result = self.engine.add_block(block, now_ms);
        if let Some(reason) = &result.reason {
            tracing::debug!(%peer, ?reason, "rejected gossiped block");
        }
        (result.added, score_delta(result.score))
    }
}
