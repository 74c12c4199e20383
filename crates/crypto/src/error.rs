//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid G1 point encoding")]
    InvalidG1Point,

    #[error("Invalid G2 point encoding")]
    InvalidG2Point,

    #[error("Invalid scalar encoding")]
    InvalidScalar,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Encryption proof verification failed")]
    EncryptionProofFailed,

    #[error("DLEQ proof verification failed")]
    DleqVerificationFailed,

    #[error("Threshold signature verification failed")]
    SignatureVerificationFailed,

    #[error("Insufficient threshold shares: need {required}, got {got}")]
    InsufficientShares { required: usize, got: usize },

    #[error("Invalid threshold: {threshold} of {total}")]
    InvalidThreshold { threshold: usize, total: usize },

    #[error("Duplicate share index")]
    DuplicateShareIndex,

    #[error("Lagrange interpolation failed")]
    LagrangeInterpolationFailed,

    #[error("Key derivation failed")]
    KeyDerivationFailed,
}
