//! Local error type for the `a2a-crypto` crate.

use a2a_types::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("aead operation failed: {0}")]
    Aead(String),
    #[error("key derivation failed: {0}")]
    Derivation(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported key format version {0}")]
    Unsupported(u16),
    #[error("io error: {0}")]
    Io(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::Aead(_) => "CRYPTO_AEAD_FAILED",
            Self::Derivation(_) => "CRYPTO_DERIVATION_FAILED",
            Self::InvalidInput(_) => "CRYPTO_INVALID_INPUT",
            Self::Unsupported(_) => "CRYPTO_UNSUPPORTED_VERSION",
            Self::Io(_) => "CRYPTO_IO_ERROR",
        }
    }
}

impl From<CryptoError> for a2a_types::error::A2aError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidSignature(_) | CryptoError::VerificationFailed => {
                a2a_types::error::A2aError::AuthenticationFailed(err.to_string())
            }
            other => a2a_types::error::A2aError::InvalidArgument(other.to_string()),
        }
    }
}
