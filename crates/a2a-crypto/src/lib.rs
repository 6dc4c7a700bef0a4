//! Cryptographic primitives for the A2A coordination fabric: Ed25519
//! signing, X25519 key agreement with HKDF-SHA256 derivation, AES-256-GCM
//! AEAD, and at-rest encrypted key storage.

pub mod aead;
pub mod agreement;
pub mod error;
pub mod key_store;
pub mod signing;

pub use aead::{aead_decrypt, aead_encrypt};
pub use agreement::{derive_session_key, derive_shared_key, AgreementKeyPair, EphemeralKeyPair};
pub use error::CryptoError;
pub use signing::{generate_keypair, sign, verify, verify_checked, KeyPair};
