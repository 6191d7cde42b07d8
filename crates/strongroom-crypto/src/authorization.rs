//! Rotation authorizations
//!
//! A recipient rotation is permitted only by a message signed by the trusted
//! off-system authority. The message binds the owner, the target recipient,
//! an expiry, and the vault's own address, so an authorization issued for one
//! deployment can never be replayed against another.

use crate::hash::sha256;
use crate::signature::{verify_signer, Signable, Signature, Verification};
use crate::{CryptoResult, KeyPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongroom_types::Address;

/// The structured statement a trusted authority signs to rotate an owner's
/// recipient binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationAuthorization {
    /// Owner whose binding rotates.
    pub owner: Address,
    /// Recipient the binding rotates to.
    pub new_recipient: Address,
    /// Validity deadline; the vault rejects the message at or after it.
    pub expiry: DateTime<Utc>,
    /// The vault instance this authorization is bound to.
    pub vault: Address,
}

impl RotationAuthorization {
    /// Full message digest. The vault keys its consumed-authorization set on
    /// this value, so any field change yields a fresh, independently usable
    /// authorization.
    pub fn digest(&self) -> [u8; 32] {
        sha256(&self.signable_bytes())
    }
}

impl Signable for RotationAuthorization {
    fn signable_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(20 + 20 + 8 + 20);
        bytes.extend_from_slice(self.owner.as_bytes());
        bytes.extend_from_slice(self.new_recipient.as_bytes());
        bytes.extend_from_slice(&self.expiry.timestamp().to_be_bytes());
        bytes.extend_from_slice(self.vault.as_bytes());
        bytes
    }
}

/// Sign a rotation authorization as the trusted authority.
pub fn authorize_rotation(
    authority: &KeyPair,
    message: &RotationAuthorization,
) -> CryptoResult<Signature> {
    crate::signature::sign(authority, message)
}

/// Establish who signed a rotation authorization.
///
/// The caller compares the verified identity to its trusted authority; this
/// function only answers "who signed these exact fields".
pub fn verify_rotation(signature: &Signature, message: &RotationAuthorization) -> Verification {
    verify_signer(signature, message)
}
