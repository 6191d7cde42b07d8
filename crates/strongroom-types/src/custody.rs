//! Custody records for Strongroom
//!
//! The vault's persisted state is exactly these records: per-owner per-asset
//! credits, recipient bindings, and the batch deposit items the relay accepts.

use crate::{Address, Amount, TokenId};
use serde::{Deserialize, Serialize};

/// A withdrawable fungible balance, keyed by (owner, asset).
///
/// Created only by the relay's deposit path. Repeated deposits accumulate
/// both the amount and the fee; withdrawal removes the record entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleCredit {
    /// Accumulated withdrawable amount.
    pub amount: Amount,
    /// Fee owed by the withdrawer at release time, fixed at deposit time.
    pub fee: Amount,
}

/// A withdrawable non-fungible item, keyed by (owner, asset, token id).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleCredit {
    /// Whether the item is currently held and releasable.
    pub withdrawable: bool,
    /// Fee owed by the withdrawer at release time.
    pub fee: Amount,
}

/// The address authorized to withdraw an owner's credits.
///
/// Created on first self-registration or first successful signed rotation;
/// mutated only by rotation; never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientBinding {
    /// Current recipient.
    pub recipient: Address,
    /// True when the binding was created by the owner's one-time
    /// self-registration rather than a signed rotation.
    pub self_registered: bool,
}

/// One item of a best-effort fungible batch transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleDeposit {
    pub owner: Address,
    pub asset: Address,
    pub amount: Amount,
    pub fee: Amount,
}

/// One item of a best-effort non-fungible batch transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleDeposit {
    pub owner: Address,
    pub asset: Address,
    pub token_id: TokenId,
    pub fee: Amount,
}
