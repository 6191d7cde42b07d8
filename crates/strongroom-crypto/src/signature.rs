//! Digital signatures for Strongroom

use crate::{CryptoError, CryptoResult, KeyPair, PublicKey};
use ed25519_dalek::{Signature as Ed25519Signature, Signer, Verifier};
use serde::{Deserialize, Serialize};

/// A digital signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Hex-encoded signature bytes
    pub signature: String,
    /// Public key of the signer
    pub public_key: PublicKey,
    /// Timestamp of signing
    pub signed_at: i64,
}

impl Signature {
    /// Sign a message
    pub fn sign(keypair: &KeyPair, message: &[u8]) -> CryptoResult<Self> {
        let signature = keypair
            .signing_key()
            .try_sign(message)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        Ok(Self {
            signature: hex::encode(signature.to_bytes()),
            public_key: PublicKey::from_keypair(keypair),
            signed_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Verify the signature against its embedded public key
    pub fn verify(&self, message: &[u8]) -> bool {
        let Ok(signature_bytes) = hex::decode(&self.signature) else {
            return false;
        };
        if signature_bytes.len() != 64 {
            return false;
        }

        let mut sig_array = [0u8; 64];
        sig_array.copy_from_slice(&signature_bytes);

        let signature = Ed25519Signature::from_bytes(&sig_array);
        let Ok(verifying_key) = self.public_key.to_verifying_key() else {
            return false;
        };

        verifying_key.verify(message, &signature).is_ok()
    }
}

/// Signable trait for types that can be signed
pub trait Signable {
    /// Get the bytes to sign
    fn signable_bytes(&self) -> Vec<u8>;
}

/// Outcome of signer verification.
///
/// Malformed signatures and keys land on `Invalid` like any failed check;
/// nothing from the verification path escapes as a panic or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The signature checks out; here is who signed it.
    Verified(PublicKey),
    /// The signature does not check out.
    Invalid,
}

/// Sign any Signable type
pub fn sign<T: Signable>(keypair: &KeyPair, item: &T) -> CryptoResult<Signature> {
    Signature::sign(keypair, &item.signable_bytes())
}

/// Establish who signed a Signable item.
pub fn verify_signer<T: Signable>(signature: &Signature, item: &T) -> Verification {
    if signature.verify(&item.signable_bytes()) {
        Verification::Verified(signature.public_key.clone())
    } else {
        Verification::Invalid
    }
}
