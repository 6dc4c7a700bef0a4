//! AES-256-GCM authenticated encryption.
//!
//! Contract: nonces are always freshly random per message; a caller must
//! never reuse a nonce under the same key. The nonce is not secret and is
//! prepended to the ciphertext on the wire so the receiver can recover it.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};

use crate::error::CryptoError;

pub const NONCE_LEN: usize = 12;

/// Encrypts `plaintext` under `key` with a fresh random nonce, optionally
/// binding `aad` (additional authenticated data, e.g. the message header).
/// Returns `nonce || ciphertext_with_tag`.
pub fn aead_encrypt(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::Aead(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts data produced by [`aead_encrypt`]. Fails closed (returns an
/// error, never panics) on truncated input or tag mismatch.
pub fn aead_decrypt(key: &[u8; 32], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::InvalidInput("ciphertext shorter than nonce".into()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::Aead("decryption failed: bad key, tag, or aad".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = [7u8; 32];
        let sealed = aead_encrypt(&key, b"payload", b"header").unwrap();
        let opened = aead_decrypt(&key, &sealed, b"header").unwrap();
        assert_eq!(opened, b"payload");
    }

    #[test]
    fn decrypt_rejects_wrong_aad() {
        let key = [7u8; 32];
        let sealed = aead_encrypt(&key, b"payload", b"header").unwrap();
        assert!(aead_decrypt(&key, &sealed, b"wrong").is_err());
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let key = [7u8; 32];
        let mut sealed = aead_encrypt(&key, b"payload", b"").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(aead_decrypt(&key, &sealed, b"").is_err());
    }

    #[test]
    fn two_encryptions_use_distinct_nonces() {
        let key = [1u8; 32];
        let a = aead_encrypt(&key, b"same", b"").unwrap();
        let b = aead_encrypt(&key, b"same", b"").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }
}
