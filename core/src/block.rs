//! Block container and wire format (§6).
//!
//! Grounded on the teacher's `Block` (`core/src/lib.rs`): a header plus an
//! ordered transaction list, with the first transaction holding a special
//! role (the teacher's coinbase; here, the miner's-fee transaction). The
//! teacher's `calc_merkle_root` concatenation hash is replaced by the
//! header's `transactions_hash`, computed the same "hash the concatenation
//! of transaction hashes" way but over the full transaction set, not just
//! a placeholder root.

use std::io::{self, Read, Write};

use blake2::{Blake2s256, Digest};
use byteorder::{ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::header::BlockHeader;
use crate::transaction::{Transaction, TransactionKind};
use crate::Hash;

/// A header plus its transactions. The first transaction is always the
/// miner's-fee transaction (§4.3: "the first transaction ... and only the
/// first ... is a miner's-fee transaction").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Hash of the concatenation of transaction hashes, in order. This is
    /// what `BlockHeader::transactions_hash` must commit to.
    pub fn compute_transactions_hash(transactions: &[Transaction]) -> Hash {
        let mut hasher = Blake2s256::new();
        for tx in transactions {
            hasher.update(tx.hash());
        }
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    /// The block's identifying hash: its header's hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// The single miner's-fee transaction. Present on every well-formed
    /// block; absence is a non-contextual validation failure.
    pub fn miners_fee_transaction(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Transactions other than the miner's-fee transaction.
    pub fn standard_transactions(&self) -> &[Transaction] {
        if self.transactions.is_empty() {
            &[]
        } else {
            &self.transactions[1..]
        }
    }

    /// Canonical wire encoding: `header || varint(tx_count) || for each tx:
    /// varint(len) || tx_bytes`, per §6.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.write_to(w)?;
        write_varint(w, self.transactions.len() as u64)?;
        for tx in &self.transactions {
            let bytes = tx.to_bytes();
            write_varint(w, bytes.len() as u64)?;
            w.write_all(&bytes)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf).expect("write to Vec never fails");
        buf
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let header = BlockHeader::read_from(r)?;
        let tx_count = read_varint(r)?;
        let mut transactions = Vec::with_capacity(tx_count as usize);
        for i in 0..tx_count {
            let len = read_varint(r)? as usize;
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes)?;
            let kind = if i == 0 {
                TransactionKind::MinersFee
            } else {
                TransactionKind::Standard
            };
            let mut cursor = io::Cursor::new(bytes);
            transactions.push(Transaction::read_from(&mut cursor, kind)?);
        }
        Ok(Self {
            header,
            transactions,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = io::Cursor::new(bytes);
        Self::read_from(&mut cursor)
    }

    /// Serialized size in bytes, checked against
    /// [`crate::params::ConsensusParameters::max_block_size_bytes`].
    pub fn serialized_size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Non-contextual structural checks that don't require chain state:
    /// exactly one miner's-fee transaction in the first slot, no further
    /// miner's-fee transactions, and no structurally-empty transactions.
    pub fn check_structure(&self) -> Result<()> {
        if self.transactions.is_empty() {
            return Err(Error::InvalidMinersFee);
        }
        if !matches!(self.transactions[0].kind, TransactionKind::MinersFee) {
            return Err(Error::InvalidMinersFee);
        }
        for tx in &self.transactions[1..] {
            if matches!(tx.kind, TransactionKind::MinersFee) {
                return Err(Error::InvalidMinersFee);
            }
        }
        for tx in &self.transactions {
            if tx.element_count() == 0 {
                return Err(Error::EmptyTransaction);
            }
        }
        Ok(())
    }
}

/// Unsigned LEB128: 7 payload bits per byte, continuation in the high bit.
fn write_varint<W: Write>(w: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            return w.write_u8(byte);
        }
        w.write_u8(byte | 0x80)?;
    }
}

fn read_varint<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = r.read_u8()?;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint too long"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TreeCommitment;
    use crate::transaction::{Output, Proof, ENCRYPTED_NOTE_LEN};
    use primitive_types::U256;

    fn miners_fee_tx() -> Transaction {
        Transaction {
            kind: TransactionKind::MinersFee,
            version: 2,
            fee: -20_00000000,
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

    fn sample_block() -> Block {
        let transactions = vec![miners_fee_tx()];
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
    fn wire_round_trip() {
        let block = sample_block();
        let bytes = block.to_bytes();
        let decoded = Block::from_bytes(&bytes).unwrap();
        assert_eq!(block, decoded);
    }

    #[test]
    fn structure_requires_leading_miners_fee() {
        let mut block = sample_block();
        block.transactions[0].kind = TransactionKind::Standard;
        assert_eq!(block.check_structure(), Err(Error::InvalidMinersFee));
    }

    #[test]
    fn structure_rejects_second_miners_fee() {
        let mut block = sample_block();
        block.transactions.push(miners_fee_tx());
        assert_eq!(block.check_structure(), Err(Error::InvalidMinersFee));
    }

    #[test]
    fn structure_rejects_empty_transaction() {
        let mut block = sample_block();
        block.transactions[0].outputs.clear();
        assert_eq!(block.check_structure(), Err(Error::EmptyTransaction));
    }

    #[test]
    fn varint_round_trips_multi_byte_values() {
        for value in [0u64, 1, 127, 128, 300, 16_384, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value).unwrap();
            if value >= 128 {
                assert!(buf.len() > 1, "value {value} should need continuation bytes");
            }
            let mut cursor = io::Cursor::new(buf);
            assert_eq!(read_varint(&mut cursor).unwrap(), value);
        }
    }

    #[test]
    fn wire_round_trip_with_many_transactions() {
        let mut block = sample_block();
        for i in 0..200u8 {
            let mut tx = miners_fee_tx();
            tx.kind = TransactionKind::Standard;
            tx.outputs[0].note_commitment = [i; 32];
            block.transactions.push(tx);
        }
        block.header.transactions_hash = Block::compute_transactions_hash(&block.transactions);
        let bytes = block.to_bytes();
        let decoded = Block::from_bytes(&bytes).unwrap();
        assert_eq!(block, decoded);
    }
}
