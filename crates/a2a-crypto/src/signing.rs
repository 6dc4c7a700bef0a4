//! Ed25519 signing/verification.

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand_core::OsRng;

use crate::error::CryptoError;

/// An Ed25519 key pair. The `signing_key` holds the 32-byte seed plus the
/// derived public key; it is never serialized in plaintext (see
/// [`crate::key_store`] for at-rest encryption).
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn seed_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Generates a new Ed25519 key pair. Thin, named wrapper matching spec
/// §4.1's `generate_keypair()` contract.
pub fn generate_keypair() -> KeyPair {
    KeyPair::generate()
}

/// Signs `bytes` with `private_key` (a 32-byte Ed25519 seed).
pub fn sign(private_key: &[u8; 32], bytes: &[u8]) -> [u8; 64] {
    KeyPair::from_seed(private_key).sign(bytes)
}

/// Verifies a signature against a public key and message. Fails closed on
/// any malformed input rather than raising.
pub fn verify(public_key: &[u8], bytes: &[u8], signature: &[u8]) -> bool {
    let Ok(pk_arr): Result<[u8; 32], _> = public_key.try_into() else {
        return false;
    };
    let Ok(sig_arr): Result<[u8; 64], _> = signature.try_into() else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pk_arr) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&sig_arr);
    verifying_key.verify(bytes, &signature).is_ok()
}

/// Same as [`verify`] but returns a typed error instead of a bare bool, for
/// call sites that want to propagate `why` a verification failed.
pub fn verify_checked(public_key: &[u8], bytes: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    if verify(public_key, bytes, signature) {
        Ok(())
    } else {
        Err(CryptoError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = KeyPair::generate();
        let msg = b"hello a2a";
        let sig = kp.sign(msg);
        assert!(verify(&kp.public_key(), msg, &sig));
    }

    #[test]
    fn verify_fails_closed_on_malformed_input() {
        assert!(!verify(&[0u8; 4], b"x", &[0u8; 4]));
        assert!(!verify(&[0u8; 32], b"x", &[0u8; 64]));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(!verify(&kp.public_key(), b"tampered", &sig));
    }
}
