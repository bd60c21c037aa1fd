//! Read-only RPC surface over a `ChainEngine`. Kept thin per §10.6: "no
//! write/mutation RPCs, since single-transaction admission and mining are
//! out of scope" — every method here is a direct pass-through to one of
//! `ChainEngine`'s existing read operations (§3's "external readers obtain
//! read-only snapshots via explicit operations").

use std::sync::{Arc, Mutex};

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use umbra_core::block::Block;
use umbra_core::chain::{ChainEngine, ChainSnapshot};
use umbra_core::header::BlockHeader;
use umbra_core::mempool::MempoolHandle;
use umbra_core::merkle::AuthPath;
use umbra_core::store::BlockStore;
use umbra_core::verifier::ProofVerifier;
use umbra_core::Hash;

#[rpc(server)]
pub trait UmbraRpc {
    #[method(name = "head")]
    fn head(&self) -> RpcResult<Option<BlockHeader>>;

    #[method(name = "getHeader")]
    fn get_header(&self, hash: Hash) -> RpcResult<Option<BlockHeader>>;

    #[method(name = "getBlock")]
    fn get_block(&self, hash: Hash) -> RpcResult<Option<Block>>;

    #[method(name = "notesWitness")]
    fn notes_witness(&self, leaf_index: u32, at_size: u32) -> RpcResult<Option<AuthPath>>;

    #[method(name = "snapshot")]
    fn snapshot(&self) -> RpcResult<Option<ChainSnapshot>>;
}

/// Shares one `ChainEngine` behind a mutex across RPC calls; every method
/// below only holds the lock for the duration of a cheap clone, never across
/// an await point.
pub struct UmbraRpcServerImpl<S: BlockStore, P: ProofVerifier, M: MempoolHandle> {
    engine: Arc<Mutex<ChainEngine<S, P, M>>>,
}

impl<S: BlockStore, P: ProofVerifier, M: MempoolHandle> UmbraRpcServerImpl<S, P, M> {
    pub fn new(engine: Arc<Mutex<ChainEngine<S, P, M>>>) -> Self {
        Self { engine }
    }
}

impl<S, P, M> UmbraRpcServer for UmbraRpcServerImpl<S, P, M>
where
    S: BlockStore + Send + Sync + 'static,
    P: ProofVerifier + Send + Sync + 'static,
    M: MempoolHandle + Send + Sync + 'static,
{
    fn head(&self) -> RpcResult<Option<BlockHeader>> {
        Ok(self.engine.lock().expect("engine lock poisoned").head())
    }

    fn get_header(&self, hash: Hash) -> RpcResult<Option<BlockHeader>> {
        Ok(self
            .engine
            .lock()
            .expect("engine lock poisoned")
            .get_header(&hash))
    }

    fn get_block(&self, hash: Hash) -> RpcResult<Option<Block>> {
        Ok(self
            .engine
            .lock()
            .expect("engine lock poisoned")
            .get_block(&hash))
    }

    fn notes_witness(&self, leaf_index: u32, at_size: u32) -> RpcResult<Option<AuthPath>> {
        Ok(self
            .engine
            .lock()
            .expect("engine lock poisoned")
            .notes_witness(leaf_index, at_size))
    }

    fn snapshot(&self) -> RpcResult<Option<ChainSnapshot>> {
        Ok(self.engine.lock().expect("engine lock poisoned").snapshot())
    }
}
