//! Error types for Strongroom
//!
//! All errors are explicit, terminal, synchronous failures of the call that
//! raised them. A failed call leaves persisted state unchanged; the one
//! scoped exception is the per-item independence of batch relay transfers.

use crate::{Address, Amount};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for Strongroom operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Strongroom error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Caller lacks the role the entry point requires.
    #[error("caller {caller} lacks the required role")]
    Unauthorized { caller: Address },

    /// Recipient self-registration was already performed for this owner.
    #[error("owner {owner} already has a recipient binding")]
    AlreadyRegistered { owner: Address },

    /// Rotation signature did not verify, or was not signed by the trusted
    /// authority.
    #[error("rotation authorization signature is invalid")]
    InvalidSignature,

    /// Rotation authorization expired before the call.
    #[error("rotation authorization expired at {expiry}")]
    Expired { expiry: DateTime<Utc> },

    /// Rotation authorization was already consumed.
    #[error("rotation authorization has already been consumed")]
    Replayed,

    /// Caller is not the bound recipient for this owner.
    #[error("caller {caller} is not the recipient bound for owner {owner}")]
    NotRecipient { caller: Address, owner: Address },

    /// Withdrawal payment does not cover the recorded fee.
    #[error("payment {payment} is below the recorded fee {fee}")]
    InsufficientFee { payment: Amount, fee: Amount },

    /// No live credit exists for the requested asset.
    #[error("nothing to withdraw for the requested asset")]
    NothingToWithdraw,

    /// Fee reduction exceeds the recorded fee.
    #[error("fee reduction {requested} exceeds the recorded fee {fee}")]
    FeeUnderflow { requested: Amount, fee: Amount },

    /// Payment extraction exceeds the accrued pool.
    #[error("requested {requested} exceeds the accrued payment pool {pool}")]
    InsufficientPool { requested: Amount, pool: Amount },

    /// The external asset registry rejected the move.
    #[error("external asset transfer was rejected: {reason}")]
    TransferFailed { reason: String },

    /// Checked amount arithmetic overflowed.
    #[error("amount arithmetic overflowed")]
    AmountOverflow,
}

impl VaultError {
    /// Stable error code for logs and API surfaces.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired { .. } => "EXPIRED",
            Self::Replayed => "REPLAYED",
            Self::NotRecipient { .. } => "NOT_RECIPIENT",
            Self::InsufficientFee { .. } => "INSUFFICIENT_FEE",
            Self::NothingToWithdraw => "NOTHING_TO_WITHDRAW",
            Self::FeeUnderflow { .. } => "FEE_UNDERFLOW",
            Self::InsufficientPool { .. } => "INSUFFICIENT_POOL",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
        }
    }
}
