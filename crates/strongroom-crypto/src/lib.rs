//! Strongroom Crypto - Cryptographic primitives for the custody vault
//!
//! This crate provides:
//! - Key generation and management (Ed25519)
//! - Digital signatures over signable domain messages
//! - Hashing (SHA-256)
//! - The rotation-authorization trust boundary
//!
//! # Trust Boundary
//!
//! Verification never throws past this crate uninspected: callers receive a
//! typed `Verification` outcome and compare the verified identity to their
//! trusted authority themselves.

pub mod authorization;
pub mod hash;
pub mod keys;
pub mod signature;

pub use authorization::*;
pub use hash::*;
pub use keys::*;
pub use signature::*;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
