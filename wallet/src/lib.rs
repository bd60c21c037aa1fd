//! Shielded wallet key management: the narrow collaborator CORE never calls
//! into (note decryption for *display* is explicitly out of scope, per §1).
//!
//! A shielded wallet needs two key roles where the teacher's transparent
//! model only needed one: a `SpendingKey` that can authorize spends
//! (produces the binding signature §6 describes) and a `ViewingKey` derived
//! from it that can recognize notes addressed to this wallet without being
//! able to spend them. This crate models both, still a stub: it derives
//! keys and exposes the signing keypair a spend's `signature` field needs,
//! but performs no note scanning or balance tracking (out of scope).

use blake2::{Blake2s256, Digest};
use ed25519_dalek::{Keypair, PublicKey, SecretKey};
use serde::{Deserialize, Serialize};

/// A key capable of authorizing spends: wraps the Ed25519 keypair a
/// `Transaction`'s binding signature is produced with.
pub struct SpendingKey {
    keypair: Keypair,
}

impl SpendingKey {
    /// Derives a spending key from a 32-byte seed. Real wallets source the
    /// seed from a CSPRNG or a mnemonic; this crate only needs a
    /// deterministic path for now since key derivation UX is out of scope.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let secret = SecretKey::from_bytes(&seed).expect("32-byte secret is always valid");
        let public = PublicKey::from(&secret);
        Self {
            keypair: Keypair { secret, public },
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Derives this key's `ViewingKey`. One-way: a `ViewingKey` cannot
    /// reconstruct the spending key it came from.
    pub fn viewing_key(&self) -> ViewingKey {
        let mut hasher = Blake2s256::new();
        hasher.update(b"umbra-viewing-key");
        hasher.update(self.keypair.secret.as_bytes());
        let digest = hasher.finalize();
        let mut tag = [0u8; 32];
        tag.copy_from_slice(&digest);
        ViewingKey { tag }
    }
}

/// A key that recognizes notes addressed to a wallet without being able to
/// spend them. Note decryption/display itself is out of scope here; this
/// type only carries the tag a future scanner would match incoming note
/// ciphertexts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewingKey {
    tag: [u8; 32],
}

impl ViewingKey {
    pub fn tag(&self) -> [u8; 32] {
        self.tag
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewing_key_is_deterministic_and_one_way() {
        let key = SpendingKey::from_seed([7u8; 32]);
        let viewing_a = key.viewing_key();
        let viewing_b = key.viewing_key();
        assert_eq!(viewing_a, viewing_b);
        assert_ne!(viewing_a.tag(), key.public_key());
    }

    #[test]
    fn distinct_seeds_yield_distinct_viewing_keys() {
        let a = SpendingKey::from_seed([1u8; 32]).viewing_key();
        let b = SpendingKey::from_seed([2u8; 32]).viewing_key();
        assert_ne!(a, b);
    }
}
