//! X25519 key agreement with HKDF-SHA256 derivation.
//!
//! The handshake uses ephemeral X25519 key pairs; the resulting shared
//! secret is never used directly as a session key, only as HKDF input
//! keying material under a fixed, protocol-specific info label.

use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::CryptoError;

/// The HKDF info label binding derived session keys to this protocol and
/// version, preventing cross-protocol key reuse.
pub const SESSION_KEY_INFO: &[u8] = b"a2a-v1-session-key";

/// A long-lived or ephemeral X25519 key pair used for ECDH.
pub struct AgreementKeyPair {
    secret: StaticSecret,
}

impl AgreementKeyPair {
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub fn public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.secret).to_bytes()
    }
}

/// A one-shot ephemeral key pair for a single handshake, consumed by
/// [`EphemeralKeyPair::agree`] so the secret cannot accidentally be reused.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Consumes this ephemeral secret against a peer public key and derives
    /// a 32-byte session key via ECDH followed by HKDF-SHA256.
    pub fn agree(self, peer_public: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
        let peer = PublicKey::from(*peer_public);
        let shared = self.secret.diffie_hellman(&peer);
        derive_session_key(shared.as_bytes())
    }
}

/// Derives a 32-byte session key from raw ECDH output via
/// HKDF-SHA256(salt=None, ikm=shared_secret, info=[`SESSION_KEY_INFO`]).
pub fn derive_session_key(shared_secret: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32];
    hk.expand(SESSION_KEY_INFO, &mut okm)
        .map_err(|e| CryptoError::Derivation(e.to_string()))?;
    Ok(okm)
}

/// Performs a non-ephemeral ECDH agreement (used by long-lived identity
/// keys where a handshake needs a stable shared secret) followed by the
/// same HKDF derivation as [`EphemeralKeyPair::agree`].
pub fn derive_shared_key(own_secret: &AgreementKeyPair, peer_public: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let peer = PublicKey::from(*peer_public);
    let shared = own_secret.secret.diffie_hellman(&peer);
    derive_session_key(shared.as_bytes())
}
