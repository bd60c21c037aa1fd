//! Property-style laws (§10.4): universally-quantified invariants that a
//! hand-written table of example cases would under-cover. The example-based
//! reorg/disconnect scenarios in `core_tests.rs` already cover reversibility
//! for specific named situations; the properties here instead range over
//! arbitrary wire bytes and arbitrary leaf sequences.

use proptest::collection::vec as pvec;
use proptest::prelude::*;

use umbra_core::hasher::NoteTreeHasher;
use umbra_core::header::{BlockHeader, TreeCommitment};
use umbra_core::merkle::MerkleTree;
use umbra_core::transaction::{
    Burn, Mint, Output, Proof, Spend, Transaction, TransactionKind, ENCRYPTED_NOTE_LEN, PROOF_LEN,
};

fn arb_hash() -> impl Strategy<Value = [u8; 32]> {
    pvec(any::<u8>(), 32).prop_map(|v| v.try_into().unwrap())
}

fn arb_proof() -> impl Strategy<Value = Proof> {
    pvec(any::<u8>(), PROOF_LEN).prop_map(|v| Proof(v.try_into().unwrap()))
}

fn arb_header() -> impl Strategy<Value = BlockHeader> {
    (
        any::<u32>(),
        arb_hash(),
        arb_hash(),
        any::<u32>(),
        arb_hash(),
        any::<u32>(),
        any::<u64>(),
        any::<u64>(),
        any::<i64>(),
        arb_hash(),
        arb_hash(),
    )
        .prop_map(
            |(
                sequence,
                previous_hash,
                note_root,
                note_size,
                nullifier_root,
                nullifier_size,
                target_low,
                randomness,
                timestamp,
                graffiti,
                transactions_hash,
            )| {
                BlockHeader {
                    sequence,
                    previous_hash,
                    note_commitment: TreeCommitment::new(note_root, note_size),
                    nullifier_commitment: TreeCommitment::new(nullifier_root, nullifier_size),
                    // Wire format commits the full 256-bit target; a u64-sized
                    // value exercises the encoding without needing a U256
                    // strategy of its own.
                    target: primitive_types::U256::from(target_low),
                    randomness,
                    timestamp,
                    graffiti,
                    transactions_hash,
                }
            },
        )
}

fn arb_spend() -> impl Strategy<Value = Spend> {
    (arb_proof(), arb_hash(), arb_hash(), arb_hash(), any::<u32>(), arb_hash(), pvec(any::<u8>(), 64)).prop_map(
        |(proof, value_commitment, randomized_public_key, root, tree_size, nullifier, sig)| Spend {
            proof,
            value_commitment,
            randomized_public_key,
            root,
            tree_size,
            nullifier,
            signature: sig.try_into().unwrap(),
        },
    )
}

fn arb_output() -> impl Strategy<Value = Output> {
    (arb_hash(), arb_proof(), pvec(any::<u8>(), ENCRYPTED_NOTE_LEN)).prop_map(
        |(note_commitment, proof, note)| Output {
            note_commitment,
            proof,
            encrypted_note: note.try_into().unwrap(),
        },
    )
}

fn arb_mint() -> impl Strategy<Value = Mint> {
    (
        arb_hash(),
        arb_hash(),
        pvec(any::<u8>(), 0..8),
        pvec(any::<u8>(), 0..8),
        any::<u8>(),
        arb_hash(),
        any::<u64>(),
        proptest::option::of(arb_hash()),
    )
        .prop_map(
            |(asset_id, creator, name, metadata, nonce, owner_public_key, value, transfer_ownership_to)| Mint {
                asset_id,
                creator,
                name,
                metadata,
                nonce,
                owner_public_key,
                value,
                transfer_ownership_to,
            },
        )
}

fn arb_burn() -> impl Strategy<Value = Burn> {
    (arb_hash(), any::<u64>()).prop_map(|(asset_id, value)| Burn { asset_id, value })
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        any::<u8>(),
        any::<i64>(),
        any::<u32>(),
        arb_hash(),
        pvec(arb_spend(), 0..3),
        pvec(arb_output(), 0..3),
        pvec(arb_mint(), 0..2),
        pvec(arb_burn(), 0..2),
        pvec(any::<u8>(), 64),
    )
        .prop_map(
            |(version, fee, expiration, randomized_public_key, spends, outputs, mints, burns, sig)| Transaction {
                kind: TransactionKind::Standard,
                version,
                fee,
                expiration,
                randomized_public_key,
                spends,
                outputs,
                mints,
                burns,
                signature: sig.try_into().unwrap(),
            },
        )
}

proptest! {
    /// Any header round-trips through its canonical wire bytes unchanged.
    #[test]
    fn header_round_trips_through_wire_bytes(header in arb_header()) {
        let bytes = header.to_bytes();
        let decoded = BlockHeader::from_bytes(&bytes).unwrap();
        prop_assert_eq!(header, decoded);
    }

    /// Any transaction (bounded element counts, to keep cases small) round-trips
    /// through its wire encoding unchanged.
    #[test]
    fn transaction_round_trips_through_wire_bytes(tx in arb_transaction()) {
        let bytes = tx.to_bytes();
        let mut cursor = std::io::Cursor::new(bytes.as_slice());
        let decoded = Transaction::read_from(&mut cursor, TransactionKind::Standard).unwrap();
        prop_assert_eq!(tx.version, decoded.version);
        prop_assert_eq!(tx.fee, decoded.fee);
        prop_assert_eq!(tx.expiration, decoded.expiration);
        prop_assert_eq!(tx.randomized_public_key, decoded.randomized_public_key);
        prop_assert_eq!(tx.spends, decoded.spends);
        prop_assert_eq!(tx.outputs, decoded.outputs);
        prop_assert_eq!(tx.mints, decoded.mints);
        prop_assert_eq!(tx.burns, decoded.burns);
        prop_assert_eq!(tx.signature, decoded.signature);
    }

    /// For any sequence of appended leaves and any leaf index within it, the
    /// witness produced for that leaf authenticates it against the tree's
    /// current root — the core guarantee §4.1 calls "authentication path
    /// witnesses".
    #[test]
    fn witness_authenticates_every_leaf_against_the_current_root(
        leaves in pvec(arb_hash(), 1..12),
    ) {
        let mut tree = MerkleTree::new(NoteTreeHasher, 8);
        for leaf in &leaves {
            tree.append(*leaf).unwrap();
        }
        let root = tree.root();
        let size = tree.size();

        for (index, leaf) in leaves.iter().enumerate() {
            let witness = tree.witness(index as u32, size).unwrap();
            prop_assert_eq!(witness.compute_root(&NoteTreeHasher, *leaf), root);
        }
    }

    /// `root_at` for a past size is stable no matter how many more leaves get
    /// appended afterward — historical spend roots (§4.3) must stay valid.
    #[test]
    fn historical_root_is_stable_across_further_appends(
        first in pvec(arb_hash(), 1..8),
        rest in pvec(arb_hash(), 0..8),
    ) {
        let mut tree = MerkleTree::new(NoteTreeHasher, 8);
        for leaf in &first {
            tree.append(*leaf).unwrap();
        }
        let historical_root = tree.root();
        let historical_size = tree.size();

        for leaf in &rest {
            tree.append(*leaf).unwrap();
        }

        prop_assert_eq!(tree.root_at(historical_size).unwrap(), historical_root);
    }
}
