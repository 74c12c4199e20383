//! The ciphertext capability the auction core is written against.
//!
//! The core only ever holds [`CiphertextHandle`]s. It can ask the engine to
//! ingest an external ciphertext, compare and select between handles, and
//! flag handles for public decryption, but there is no way to decrypt
//! through this interface.

use std::sync::Arc;

use thiserror::Error;

use auction_types::{CiphertextHandle, EncryptedValue, EncryptionProof, InputContext};

use crate::error::AuctionError;

/// Failures reported by a ciphertext engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Input proof rejected")]
    InvalidInputProof,

    #[error("Malformed ciphertext")]
    MalformedCiphertext,

    #[error("Unknown handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("Type mismatch for handle {0}")]
    TypeMismatch(CiphertextHandle),

    #[error("Engine backend failure: {0}")]
    Backend(String),
}

impl EngineError {
    /// Map a failure while ingesting a bidder's ciphertext.
    ///
    /// Anything the bidder controls becomes [`AuctionError::InvalidCiphertext`].
    pub fn into_ingest_error(self) -> AuctionError {
        match self {
            EngineError::InvalidInputProof
            | EngineError::MalformedCiphertext
            | EngineError::TypeMismatch(_) => AuctionError::InvalidCiphertext,
            other => AuctionError::Engine(other.to_string()),
        }
    }
}

impl From<EngineError> for AuctionError {
    fn from(err: EngineError) -> Self {
        AuctionError::Engine(err.to_string())
    }
}

/// Homomorphic operations over encrypted unsigned integers.
pub trait CiphertextEngine: Send + Sync {
    /// Encrypt a public constant (used for the initial zero and bid indices).
    fn trivial_encrypt(&self, value: u64) -> Result<CiphertextHandle, EngineError>;

    /// Verify an external ciphertext against its proof in `context` and
    /// register it as a uint64 handle.
    fn ingest_external(
        &self,
        ciphertext: &EncryptedValue,
        proof: &EncryptionProof,
        context: &InputContext,
    ) -> Result<CiphertextHandle, EngineError>;

    /// Encrypted `lhs > rhs` (bool handle).
    fn greater_than(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError>;

    /// Encrypted `condition ? if_true : if_false`.
    fn select(
        &self,
        condition: &CiphertextHandle,
        if_true: &CiphertextHandle,
        if_false: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError>;

    fn mark_publicly_decryptable(&self, handle: &CiphertextHandle) -> Result<(), EngineError>;

    fn is_publicly_decryptable(&self, handle: &CiphertextHandle) -> bool;

    /// Whether the handle was produced by this engine.
    fn is_valid(&self, handle: &CiphertextHandle) -> bool;
}

impl<T: CiphertextEngine + ?Sized> CiphertextEngine for Arc<T> {
    fn trivial_encrypt(&self, value: u64) -> Result<CiphertextHandle, EngineError> {
        (**self).trivial_encrypt(value)
    }

    fn ingest_external(
        &self,
        ciphertext: &EncryptedValue,
        proof: &EncryptionProof,
        context: &InputContext,
    ) -> Result<CiphertextHandle, EngineError> {
        (**self).ingest_external(ciphertext, proof, context)
    }

    fn greater_than(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        (**self).greater_than(lhs, rhs)
    }

    fn select(
        &self,
        condition: &CiphertextHandle,
        if_true: &CiphertextHandle,
        if_false: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        (**self).select(condition, if_true, if_false)
    }

    fn mark_publicly_decryptable(&self, handle: &CiphertextHandle) -> Result<(), EngineError> {
        (**self).mark_publicly_decryptable(handle)
    }

    fn is_publicly_decryptable(&self, handle: &CiphertextHandle) -> bool {
        (**self).is_publicly_decryptable(handle)
    }

    fn is_valid(&self, handle: &CiphertextHandle) -> bool {
        (**self).is_valid(handle)
    }
}
