//! Block header, canonical wire serialization, and PoW hash (C4).
//!
//! The teacher crate's `BlockHeader` carried UTXO-era fields (`index`,
//! `merkle_root`, `nonce`, `difficulty`) hashed via `bincode` + Blake2b512.
//! This header carries the shielded-chain fields the wire format commits to
//! instead, and is hashed over its *exact* big-endian byte layout (not
//! `bincode`'s representation) so the hash is stable across serializer
//! versions and matches peers running other implementations of the same
//! wire format.

use blake2::{Blake2s256, Digest};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

use crate::target::block_work;
use crate::Hash;

/// A commitment to the state of a Merkle tree: its root and the number of
/// leaves it had at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeCommitment {
    pub root: Hash,
    pub size: u32,
}

impl TreeCommitment {
    pub const fn new(root: Hash, size: u32) -> Self {
        Self { root, size }
    }
}

/// Block header: the portion of a block that is hashed for proof-of-work
/// and that downstream blocks commit to via `previous_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub sequence: u32,
    pub previous_hash: Hash,
    pub note_commitment: TreeCommitment,
    pub nullifier_commitment: TreeCommitment,
    pub target: U256,
    pub randomness: u64,
    pub timestamp: i64,
    pub graffiti: Hash,
    pub transactions_hash: Hash,
}

impl BlockHeader {
    /// Canonical big-endian wire encoding, per the external block wire
    /// format: `sequence || previous_hash || note_root || note_size ||
    /// nullifier_root || nullifier_size || target || randomness ||
    /// timestamp || graffiti || transactions_hash`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.sequence)?;
        w.write_all(&self.previous_hash)?;
        w.write_all(&self.note_commitment.root)?;
        w.write_u32::<BigEndian>(self.note_commitment.size)?;
        w.write_all(&self.nullifier_commitment.root)?;
        w.write_u32::<BigEndian>(self.nullifier_commitment.size)?;
        let mut target_bytes = [0u8; 32];
        self.target.to_big_endian(&mut target_bytes);
        w.write_all(&target_bytes)?;
        w.write_u64::<BigEndian>(self.randomness)?;
        w.write_i64::<BigEndian>(self.timestamp)?;
        w.write_all(&self.graffiti)?;
        w.write_all(&self.transactions_hash)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let sequence = r.read_u32::<BigEndian>()?;
        let mut previous_hash = [0u8; 32];
        r.read_exact(&mut previous_hash)?;
        let mut note_root = [0u8; 32];
        r.read_exact(&mut note_root)?;
        let note_size = r.read_u32::<BigEndian>()?;
        let mut nullifier_root = [0u8; 32];
        r.read_exact(&mut nullifier_root)?;
        let nullifier_size = r.read_u32::<BigEndian>()?;
        let mut target_bytes = [0u8; 32];
        r.read_exact(&mut target_bytes)?;
        let randomness = r.read_u64::<BigEndian>()?;
        let timestamp = r.read_i64::<BigEndian>()?;
        let mut graffiti = [0u8; 32];
        r.read_exact(&mut graffiti)?;
        let mut transactions_hash = [0u8; 32];
        r.read_exact(&mut transactions_hash)?;
        Ok(Self {
            sequence,
            previous_hash,
            note_commitment: TreeCommitment::new(note_root, note_size),
            nullifier_commitment: TreeCommitment::new(nullifier_root, nullifier_size),
            target: U256::from_big_endian(&target_bytes),
            randomness,
            timestamp,
            graffiti,
            transactions_hash,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(136);
        self.write_to(&mut buf).expect("write to Vec never fails");
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = io::Cursor::new(bytes);
        Self::read_from(&mut cursor)
    }

    /// The header's hash: the PoW input and this block's identifier.
    pub fn hash(&self) -> Hash {
        let digest = Blake2s256::digest(self.to_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    /// This block's own contribution to cumulative work: `2^256 / (target+1)`.
    pub fn work(&self) -> U256 {
        block_work(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            sequence: 7,
            previous_hash: [1u8; 32],
            note_commitment: TreeCommitment::new([2u8; 32], 5),
            nullifier_commitment: TreeCommitment::new([3u8; 32], 2),
            target: U256::from(12345u64),
            randomness: 99,
            timestamp: 1_700_000_000_000,
            graffiti: [4u8; 32],
            transactions_hash: [5u8; 32],
        }
    }

    #[test]
    fn round_trips_through_wire_bytes() {
        let header = sample_header();
        let bytes = header.to_bytes();
        let decoded = BlockHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn hash_is_deterministic_and_sensitive_to_every_field() {
        let header = sample_header();
        let h1 = header.hash();
        let h2 = header.hash();
        assert_eq!(h1, h2);

        let mut perturbed = header.clone();
        perturbed.randomness += 1;
        assert_ne!(perturbed.hash(), h1);
    }
}
