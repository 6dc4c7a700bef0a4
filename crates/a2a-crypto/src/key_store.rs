//! At-rest encrypted key storage.
//!
//! Versioned binary format: magic, header, KDF params, then ciphertext.
//! Keys are wrapped with PBKDF2-HMAC-SHA256 (minimum 600,000 iterations)
//! feeding AES-256-GCM, so a key file is useless without the passphrase
//! that derived its wrapping key.

use std::io::Write as _;
use std::path::Path;

use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{aead_decrypt, aead_encrypt};
use crate::error::CryptoError;

const MAGIC: &[u8; 8] = b"A2A-GKEY";
const FORMAT_VERSION: u16 = 1;
const SALT_LEN: usize = 16;

/// Minimum PBKDF2 iteration count this store will accept on write or trust
/// on read; anything weaker is rejected as [`CryptoError::Unsupported`].
pub const MIN_PBKDF2_ITERATIONS: u32 = 600_000;

/// Plaintext key material, zeroized on drop. Holds whatever raw bytes the
/// caller asked to protect — an Ed25519 seed, an X25519 scalar, or both
/// concatenated.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypts `plaintext` under a key derived from `passphrase`, returning
/// the serialized on-disk format:
/// `magic(8) || version(2) || iterations(4) || salt(16) || nonce+ciphertext`.
pub fn encrypt_key(plaintext: &[u8], passphrase: &[u8], iterations: u32) -> Result<Vec<u8>, CryptoError> {
    if iterations < MIN_PBKDF2_ITERATIONS {
        return Err(CryptoError::InvalidInput(format!(
            "pbkdf2 iterations {iterations} below minimum {MIN_PBKDF2_ITERATIONS}"
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut derived_key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase, &salt, iterations, &mut derived_key);

    let mut header = Vec::with_capacity(8 + 2 + 4 + SALT_LEN);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
    header.extend_from_slice(&iterations.to_be_bytes());
    header.extend_from_slice(&salt);

    let sealed = aead_encrypt(&derived_key, plaintext, &header)?;
    derived_key.zeroize();

    let mut out = header;
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Reverses [`encrypt_key`], recovering the plaintext key material.
pub fn decrypt_key(blob: &[u8], passphrase: &[u8]) -> Result<SensitiveBytes, CryptoError> {
    if blob.len() < 8 + 2 + 4 + SALT_LEN {
        return Err(CryptoError::InvalidInput("key blob truncated".into()));
    }
    let (magic, rest) = blob.split_at(8);
    if magic != MAGIC {
        return Err(CryptoError::InvalidInput("bad key blob magic".into()));
    }
    let (version_bytes, rest) = rest.split_at(2);
    let version = u16::from_be_bytes(version_bytes.try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(CryptoError::Unsupported(version));
    }
    let (iter_bytes, rest) = rest.split_at(4);
    let iterations = u32::from_be_bytes(iter_bytes.try_into().unwrap());
    if iterations < MIN_PBKDF2_ITERATIONS {
        return Err(CryptoError::Unsupported(version));
    }
    let (salt, sealed) = rest.split_at(SALT_LEN);

    let mut derived_key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut derived_key);

    let header = &blob[..8 + 2 + 4 + SALT_LEN];
    let plaintext = aead_decrypt(&derived_key, sealed, header);
    derived_key.zeroize();

    Ok(SensitiveBytes::new(plaintext?))
}

/// Writes an encrypted key blob to `path` with owner-only permissions
/// (mode 0600 on unix) so the key material is never left world- or
/// group-readable.
pub fn write_key_file(path: &Path, plaintext: &[u8], passphrase: &[u8], iterations: u32) -> Result<(), CryptoError> {
    let blob = encrypt_key(plaintext, passphrase, iterations)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| CryptoError::Io(e.to_string()))?;
        file.write_all(&blob).map_err(|e| CryptoError::Io(e.to_string()))?;
    }
    #[cfg(not(unix))]
    {
        std::fs::write(path, &blob).map_err(|e| CryptoError::Io(e.to_string()))?;
    }

    Ok(())
}

/// Reads and decrypts a key file written by [`write_key_file`].
pub fn load_key_file(path: &Path, passphrase: &[u8]) -> Result<SensitiveBytes, CryptoError> {
    let blob = std::fs::read(path).map_err(|e| CryptoError::Io(e.to_string()))?;
    decrypt_key(&blob, passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let plaintext = b"super secret seed material......";
        let blob = encrypt_key(plaintext, b"hunter2", MIN_PBKDF2_ITERATIONS).unwrap();
        let recovered = decrypt_key(&blob, b"hunter2").unwrap();
        assert_eq!(recovered.as_slice(), plaintext);
    }

    #[test]
    fn wrong_passphrase_fails() {
        let blob = encrypt_key(b"seed", b"correct", MIN_PBKDF2_ITERATIONS).unwrap();
        assert!(decrypt_key(&blob, b"wrong").is_err());
    }

    #[test]
    fn iterations_below_minimum_rejected() {
        assert!(encrypt_key(b"seed", b"pw", 1_000).is_err());
    }

    #[test]
    fn corrupted_magic_rejected() {
        let mut blob = encrypt_key(b"seed", b"pw", MIN_PBKDF2_ITERATIONS).unwrap();
        blob[0] ^= 0xFF;
        assert!(decrypt_key(&blob, b"pw").is_err());
    }

    #[test]
    fn file_round_trip_with_owner_only_permissions() {
        let dir = std::env::temp_dir().join(format!("a2a-key-store-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("identity.key");
        write_key_file(&path, b"seed-bytes", b"pw", MIN_PBKDF2_ITERATIONS).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }

        let recovered = load_key_file(&path, b"pw").unwrap();
        assert_eq!(recovered.as_slice(), b"seed-bytes");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
