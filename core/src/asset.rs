//! Asset ledger (C8): mint/burn supply tracking and ownership transfer.
//!
//! Grounded on the teacher's `Ledger` (`core/src/ledger.rs`): a `HashMap`
//! keyed by an identifier, mutated by applying a block's transactions in
//! order. The teacher's ledger only ever applied blocks forward; this one
//! additionally supports the exact inverse mutation (`disconnect_mint`,
//! `disconnect_burn`) that a chain reorganization needs, since assets (unlike
//! a UTXO set) track running totals rather than a simple set membership and
//! so can't be "disconnected" by just re-inserting a removed entry.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::transaction::{Burn, Mint};
use crate::Hash;

/// A fungible asset, created by its first mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: Hash,
    pub creator: Hash,
    pub name: Vec<u8>,
    pub metadata: Vec<u8>,
    pub nonce: u8,
    /// Current owner, authorised to mint further supply or transfer
    /// ownership. Starts as `creator`.
    pub owner: Hash,
    /// Total units ever minted minus total units ever burned.
    pub supply: u64,
    /// The transaction that first minted this asset.
    pub created_tx_hash: Hash,
    /// Hash of the block whose first mint created this asset, if that block
    /// is still known to the caller at creation time.
    pub first_block_hash: Option<Hash>,
    /// Sequence of the block named by `first_block_hash`.
    pub sequence: Option<u32>,
}

/// Tracks every [`Asset`] ever minted and its current supply/owner.
#[derive(Debug, Clone, Default)]
pub struct AssetLedger {
    assets: HashMap<Hash, Asset>,
}

impl AssetLedger {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    pub fn get(&self, asset_id: &Hash) -> Option<&Asset> {
        self.assets.get(asset_id)
    }

    /// Applies a mint forward: creates the asset on first sight, or adds to
    /// its supply (and possibly transfers ownership) on subsequent mints.
    ///
    /// Mirrors the teacher's "spend inputs, insert outputs" forward-only
    /// mutation in `Ledger::apply_block`, generalised to a running-total
    /// field instead of set insertion.
    pub fn connect_mint(
        &mut self,
        mint: &Mint,
        tx_hash: Hash,
        at_sequence: u32,
        block_hash: Hash,
        transfer_allowed_at: impl Fn(u32) -> bool,
    ) -> Result<()> {
        if !self.assets.contains_key(&mint.asset_id) {
            if mint.owner_public_key != mint.creator {
                return Err(Error::AssetOwnerMismatch);
            }
            self.assets.insert(
                mint.asset_id,
                Asset {
                    id: mint.asset_id,
                    creator: mint.creator,
                    name: mint.name.clone(),
                    metadata: mint.metadata.clone(),
                    nonce: mint.nonce,
                    owner: mint.owner_public_key,
                    supply: mint.value,
                    created_tx_hash: tx_hash,
                    first_block_hash: Some(block_hash),
                    sequence: Some(at_sequence),
                },
            );
            return Ok(());
        }

        let asset = self.assets.get_mut(&mint.asset_id).expect("checked above");
        if asset.owner != mint.owner_public_key {
            return Err(Error::AssetOwnerMismatch);
        }
        asset.supply = asset
            .supply
            .checked_add(mint.value)
            .ok_or(Error::SupplyUnderflow)?;
        if let Some(new_owner) = mint.transfer_ownership_to {
            if !transfer_allowed_at(at_sequence) {
                return Err(Error::InvalidTransactionVersion);
            }
            asset.owner = new_owner;
        }
        Ok(())
    }

    /// Exact inverse of [`Self::connect_mint`]: used when a block is
    /// disconnected during reorganization.
    pub fn disconnect_mint(&mut self, mint: &Mint, previous_owner: Hash, was_first_mint: bool) -> Result<()> {
        if was_first_mint {
            self.assets.remove(&mint.asset_id);
            return Ok(());
        }
        let asset = self
            .assets
            .get_mut(&mint.asset_id)
            .ok_or(Error::UnknownAsset)?;
        asset.supply = asset
            .supply
            .checked_sub(mint.value)
            .ok_or(Error::SupplyUnderflow)?;
        asset.owner = previous_owner;
        Ok(())
    }

    /// Applies a burn forward, reducing supply.
    pub fn connect_burn(&mut self, burn: &Burn, owner_public_key: Hash) -> Result<()> {
        let asset = self
            .assets
            .get_mut(&burn.asset_id)
            .ok_or(Error::UnknownAsset)?;
        if asset.owner != owner_public_key {
            return Err(Error::AssetOwnerMismatch);
        }
        asset.supply = asset
            .supply
            .checked_sub(burn.value)
            .ok_or(Error::SupplyUnderflow)?;
        Ok(())
    }

    /// Exact inverse of [`Self::connect_burn`].
    pub fn disconnect_burn(&mut self, burn: &Burn) -> Result<()> {
        let asset = self
            .assets
            .get_mut(&burn.asset_id)
            .ok_or(Error::UnknownAsset)?;
        asset.supply = asset
            .supply
            .checked_add(burn.value)
            .ok_or(Error::SupplyUnderflow)?;
        Ok(())
    }

    /// Whether `owner_public_key` currently owns `asset_id`, required by the
    /// verifier before accepting a further mint or a burn.
    pub fn is_owner(&self, asset_id: &Hash, owner_public_key: &Hash) -> bool {
        self.assets
            .get(asset_id)
            .map(|a| &a.owner == owner_public_key)
            .unwrap_or(false)
    }
}
