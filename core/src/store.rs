//! Block store (C7): persistent hash→header, hash→transactions,
//! sequence→hashes, and top-level metadata.
//!
//! The teacher crate had no persistence layer at all — `Ledger` was a plain
//! in-memory `HashMap`. This module keeps that in-memory shape as
//! [`MemoryBlockStore`] (used by tests, and as the reference implementation
//! the trait's contract is checked against) and adds [`SledBlockStore`] as
//! the production backend, since a full node needs to survive a restart.
//! Both share the [`BlockStore`] trait so [`crate::chain::ChainEngine`] is
//! generic over persistence and tests never need a real database on disk.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sled::transaction::Transactional;

use crate::block::Block;
use crate::error::{Error, Result};
use crate::header::BlockHeader;
use crate::Hash;

/// Top-level pointers the store tracks outside the per-block indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreMeta {
    pub heaviest_hash: Option<Hash>,
    pub latest_hash: Option<Hash>,
    pub genesis_hash: Option<Hash>,
}

/// Persistent mapping the chain engine reads and writes. A call to any
/// mutating method is expected to be atomic with respect to process crashes;
/// the engine relies on this to make `add_block` crash-safe.
pub trait BlockStore {
    fn put_block(&mut self, block: &Block) -> Result<()>;
    fn get_header(&self, hash: &Hash) -> Result<Option<BlockHeader>>;
    fn get_block(&self, hash: &Hash) -> Result<Option<Block>>;
    fn has_block(&self, hash: &Hash) -> Result<bool>;
    fn hashes_at_sequence(&self, sequence: u32) -> Result<Vec<Hash>>;
    fn meta(&self) -> Result<StoreMeta>;
    fn put_meta(&mut self, meta: &StoreMeta) -> Result<()>;
}

/// Reference `BlockStore` implementation: plain in-memory maps. Used by
/// tests and as the store the `proptest` laws run against.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    headers: HashMap<Hash, BlockHeader>,
    blocks: HashMap<Hash, Block>,
    sequence_index: HashMap<u32, BTreeSet<Hash>>,
    meta: StoreMeta,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put_block(&mut self, block: &Block) -> Result<()> {
        let hash = block.hash();
        self.sequence_index
            .entry(block.header.sequence)
            .or_default()
            .insert(hash);
        self.headers.insert(hash, block.header.clone());
        self.blocks.insert(hash, block.clone());
        Ok(())
    }

    fn get_header(&self, hash: &Hash) -> Result<Option<BlockHeader>> {
        Ok(self.headers.get(hash).cloned())
    }

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        Ok(self.blocks.get(hash).cloned())
    }

    fn has_block(&self, hash: &Hash) -> Result<bool> {
        Ok(self.headers.contains_key(hash))
    }

    fn hashes_at_sequence(&self, sequence: u32) -> Result<Vec<Hash>> {
        Ok(self
            .sequence_index
            .get(&sequence)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn meta(&self) -> Result<StoreMeta> {
        Ok(self.meta.clone())
    }

    fn put_meta(&mut self, meta: &StoreMeta) -> Result<()> {
        self.meta = meta.clone();
        Ok(())
    }
}

/// `sled`-backed `BlockStore`. `put_block` writes the header, block body, and
/// sequence index entry through `sled`'s multi-tree `Transactional` API so
/// the three land as one atomic commit — the boundary §4.4 requires for a
/// single connect/disconnect write.
pub struct SledBlockStore {
    headers: sled::Tree,
    blocks: sled::Tree,
    sequence_index: sled::Tree,
    meta: sled::Tree,
}

impl SledBlockStore {
    pub fn open(db: &sled::Db) -> Result<Self> {
        let headers = db
            .open_tree("headers")
            .map_err(|e| Error::Storage(e.to_string()))?;
        let blocks = db
            .open_tree("blocks")
            .map_err(|e| Error::Storage(e.to_string()))?;
        let sequence_index = db
            .open_tree("sequence_index")
            .map_err(|e| Error::Storage(e.to_string()))?;
        let meta = db
            .open_tree("meta")
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self {
            headers,
            blocks,
            sequence_index,
            meta,
        })
    }

    fn sequence_key(sequence: u32, hash: &Hash) -> Vec<u8> {
        let mut key = Vec::with_capacity(36);
        key.extend_from_slice(&sequence.to_be_bytes());
        key.extend_from_slice(hash);
        key
    }
}

impl BlockStore for SledBlockStore {
    fn put_block(&mut self, block: &Block) -> Result<()> {
        let hash = block.hash();
        let header_bytes = block.header.to_bytes();
        let block_bytes = block.to_bytes();
        let sequence_key = Self::sequence_key(block.header.sequence, &hash);

        (&self.headers, &self.blocks, &self.sequence_index)
            .transaction(|(headers, blocks, sequence_index)| {
                headers.insert(&hash, header_bytes.clone())?;
                blocks.insert(&hash, block_bytes.clone())?;
                sequence_index.insert(sequence_key.clone(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<()>| Error::Storage(format!("{e:?}")))?;

        // All three trees share one underlying `sled::Db`, so flushing any
        // one of them fsyncs the whole commit.
        self.headers.flush().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    fn get_header(&self, hash: &Hash) -> Result<Option<BlockHeader>> {
        match self
            .headers
            .get(hash)
            .map_err(|e| Error::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(
                BlockHeader::from_bytes(&bytes).map_err(|e| Error::Storage(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        match self
            .blocks
            .get(hash)
            .map_err(|e| Error::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(
                Block::from_bytes(&bytes).map_err(|e| Error::Storage(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn has_block(&self, hash: &Hash) -> Result<bool> {
        self.headers
            .contains_key(hash)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    fn hashes_at_sequence(&self, sequence: u32) -> Result<Vec<Hash>> {
        let mut start = sequence.to_be_bytes().to_vec();
        start.extend_from_slice(&[0u8; 32]);
        let mut end = sequence.to_be_bytes().to_vec();
        end.extend_from_slice(&[0xFFu8; 32]);
        let mut out = Vec::new();
        for item in self.sequence_index.range(start..=end) {
            let (key, _) = item.map_err(|e| Error::Storage(e.to_string()))?;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&key[4..36]);
            out.push(hash);
        }
        Ok(out)
    }

    fn meta(&self) -> Result<StoreMeta> {
        match self
            .meta
            .get(b"meta")
            .map_err(|e| Error::Storage(e.to_string()))?
        {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| Error::Storage(e.to_string()))
            }
            None => Ok(StoreMeta::default()),
        }
    }

    fn put_meta(&mut self, meta: &StoreMeta) -> Result<()> {
        let bytes = bincode::serialize(meta).map_err(|e| Error::Storage(e.to_string()))?;
        self.meta
            .insert(b"meta", bytes)
            .map_err(|e| Error::Storage(e.to_string()))?;
        self.meta.flush().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TreeCommitment;
    use crate::transaction::{Output, Proof, Transaction, TransactionKind, ENCRYPTED_NOTE_LEN};
    use primitive_types::U256;

    fn sample_block(sequence: u32, previous_hash: Hash) -> Block {
        let transactions = vec![Transaction {
            kind: TransactionKind::MinersFee,
            version: 2,
            fee: -1,
            expiration: 0,
            randomized_public_key: [0u8; 32],
            spends: vec![],
            outputs: vec![Output {
                note_commitment: [sequence as u8; 32],
                proof: Proof::default(),
                encrypted_note: [0u8; ENCRYPTED_NOTE_LEN],
            }],
            mints: vec![],
            burns: vec![],
            signature: [0u8; 64],
        }];
        let header = BlockHeader {
            sequence,
            previous_hash,
            note_commitment: TreeCommitment::new([1u8; 32], sequence),
            nullifier_commitment: TreeCommitment::new([0u8; 32], 0),
            target: U256::MAX,
            randomness: 0,
            timestamp: sequence as i64,
            graffiti: [0u8; 32],
            transactions_hash: Block::compute_transactions_hash(&transactions),
        };
        Block {
            header,
            transactions,
        }
    }

    #[test]
    fn memory_store_round_trips_block_and_header() {
        let mut store = MemoryBlockStore::new();
        let block = sample_block(1, [0u8; 32]);
        let hash = block.hash();
        store.put_block(&block).unwrap();
        assert!(store.has_block(&hash).unwrap());
        assert_eq!(store.get_block(&hash).unwrap().unwrap(), block);
        assert_eq!(store.get_header(&hash).unwrap().unwrap(), block.header);
        assert_eq!(store.hashes_at_sequence(1).unwrap(), vec![hash]);
    }

    #[test]
    fn memory_store_tracks_meta() {
        let mut store = MemoryBlockStore::new();
        let meta = StoreMeta {
            heaviest_hash: Some([1u8; 32]),
            latest_hash: Some([1u8; 32]),
            genesis_hash: Some([1u8; 32]),
        };
        store.put_meta(&meta).unwrap();
        assert_eq!(store.meta().unwrap(), meta);
    }

    #[test]
    fn sled_store_round_trips_block_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let mut store = SledBlockStore::open(&db).unwrap();
        let block = sample_block(1, [0u8; 32]);
        let hash = block.hash();
        store.put_block(&block).unwrap();
        assert!(store.has_block(&hash).unwrap());
        assert_eq!(store.get_block(&hash).unwrap().unwrap(), block);
        assert_eq!(store.hashes_at_sequence(1).unwrap(), vec![hash]);
    }
}
