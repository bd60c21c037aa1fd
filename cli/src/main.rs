//! Umbra node CLI: loads consensus parameters, builds a genesis block, and
//! boots a `ChainEngine` from it. No networking loop or miner here — both
//! are out of scope per §1, kept as separate thin crates (`network`,
//! `wallet`) this binary only wires together at the edges.

use clap::{Parser, Subcommand};
use primitive_types::U256;

use umbra_core::block::Block;
use umbra_core::chain::ChainEngine;
use umbra_core::hasher::{NoteTreeHasher, NullifierTreeHasher};
use umbra_core::header::{BlockHeader, TreeCommitment};
use umbra_core::mempool::NullMempool;
use umbra_core::merkle::MerkleTree;
use umbra_core::params::ConsensusParameters;
use umbra_core::store::MemoryBlockStore;
use umbra_core::transaction::{Output, Proof, Transaction, TransactionKind, ENCRYPTED_NOTE_LEN};
use umbra_core::verifier::AcceptAllProofs;
use umbra_core::ZERO_HASH;

#[derive(Parser)]
#[command(name = "umbra")]
#[command(about = "Umbra node CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot a fresh in-memory node from a synthetic genesis block and print its head.
    Node {
        /// Target spacing between blocks, in milliseconds.
        #[arg(long, default_value_t = 60_000)]
        target_block_time_ms: i64,
    },
    /// Print a demo wallet's spending/viewing key pair.
    Wallet,
}

/// Builds a single-miner's-fee genesis block under `params`. Real deployments
/// distribute a fixed genesis block out of band; this stub constructs one
/// from scratch so `Commands::Node` has something to boot from.
fn build_genesis(params: &ConsensusParameters) -> Block {
    let notes = MerkleTree::new(NoteTreeHasher, params.tree_depth);
    let nullifiers = MerkleTree::new(NullifierTreeHasher, params.tree_depth);

    let reward = params.mining_reward(1) as i64;
    let miners_fee = Transaction {
        kind: TransactionKind::MinersFee,
        version: params.latest_transaction_version_at(1),
        fee: -reward,
        expiration: 0,
        randomized_public_key: ZERO_HASH,
        spends: vec![],
        outputs: vec![Output {
            note_commitment: [1u8; 32],
            proof: Proof::default(),
            encrypted_note: [0u8; ENCRYPTED_NOTE_LEN],
        }],
        mints: vec![],
        burns: vec![],
        signature: [0u8; 64],
    };
    let transactions = vec![miners_fee];

    let mut notes_after = notes;
    notes_after
        .append([1u8; 32])
        .expect("empty tree always has room for one leaf");

    let header = BlockHeader {
        sequence: 1,
        previous_hash: ZERO_HASH,
        note_commitment: TreeCommitment::new(notes_after.root(), notes_after.size()),
        nullifier_commitment: TreeCommitment::new(nullifiers.root(), nullifiers.size()),
        target: U256::MAX,
        randomness: 0,
        // Must be strictly greater than the virtual genesis parent's
        // timestamp (0) once sequential-time enforcement activates at
        // sequence 1, the default; `target_block_time_ms` is a convenient
        // nonzero choice.
        timestamp: params.target_block_time_ms,
        graffiti: ZERO_HASH,
        transactions_hash: Block::compute_transactions_hash(&transactions),
    };
    Block { header, transactions }
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Node { target_block_time_ms } => {
            let mut params = ConsensusParameters::default();
            params.target_block_time_ms = target_block_time_ms;

            let genesis = build_genesis(&params);
            let engine = ChainEngine::new(
                genesis,
                params,
                AcceptAllProofs,
                NullMempool,
                MemoryBlockStore::new(),
            )
            .expect("genesis block is valid under its own consensus parameters");

            // Wired through the gossip adapter even though this stub never
            // opens a socket: the real node hands every inbound block to the
            // same `GossipHandler::handle_block` path a libp2p event loop
            // would drive.
            let gossip = umbra_network::GossipHandler::new(engine);
            let head = gossip
                .engine()
                .head()
                .expect("engine always has a head after construction");
            println!(
                "umbra node booted: sequence={} hash={}",
                head.sequence,
                hex::encode(head.hash())
            );
        }
        Commands::Wallet => {
            let key = umbra_wallet::SpendingKey::from_seed([0u8; 32]);
            println!("demo spending key public: {}", hex::encode(key.public_key()));
        }
    }
}
