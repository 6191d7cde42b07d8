//! Strongroom Registry - the external asset-registry seam
//!
//! The vault and relay never reimplement token semantics; they only invoke
//! the registries custodied assets live in. This crate defines that seam as
//! async traits and ships in-memory reference registries with the same
//! ownership/allowance preconditions real registries enforce, used by the
//! test suites and the demo.
//!
//! Registry failures are typed and observable - a rejected move is an `Err`,
//! never a silent no-op.

pub mod fungible;
pub mod non_fungible;

pub use fungible::*;
pub use non_fungible::*;

use strongroom_types::{Address, Amount, TokenId};
use thiserror::Error;

/// Errors an asset registry can reject a move with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("holder {holder} has {available}, needs {required}")]
    InsufficientBalance {
        holder: Address,
        available: Amount,
        required: Amount,
    },

    #[error("spender {spender} allowance is {available}, needs {required}")]
    InsufficientAllowance {
        spender: Address,
        available: Amount,
        required: Amount,
    },

    #[error("{claimed} does not own token {token_id} of asset {asset}")]
    NotOwner {
        asset: Address,
        token_id: TokenId,
        claimed: Address,
    },

    #[error("operator {operator} is not approved for owner {owner}")]
    NotApproved { owner: Address, operator: Address },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
