//! Reference ciphertext engine.
//!
//! Every value the engine stores is an IBE ciphertext under the network
//! public key, addressed to [`INPUT_IDENTITY`]. The engine holds the
//! extracted identity key for that identity, which lets it evaluate
//! comparisons and selections by opening its operands and encrypting the
//! result afresh. Handles are derived from a counter and the ciphertext
//! body, so encrypting the same value twice yields unrelated handles.
//!
//! The auction module sees this crate only through [`CiphertextEngine`].
//! [`PublicDecryptor`] is the separate capability handed to the decryption
//! authority; it refuses any handle that was not flagged publicly
//! decryptable.
//!
//! The store only grows. Each accepted bid leaves about five ciphertexts
//! behind (the ingested bid, the comparison result, the encrypted index and
//! the new running maximum and leader), and superseded intermediates are
//! never evicted because [`CiphertextEngine`] has no release operation. The
//! engine is meant for tests and the mock chain, not long-running nodes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bls12_381::Scalar;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use auction_crypto::{
    decode_value, decrypt, encode_value, encrypt, extract_identity_key, verify_encryption_proof,
    CryptoError, IbeParams,
};
use auction_module::{CiphertextEngine, EngineError};
use auction_types::{
    CiphertextHandle, EncryptedValue, EncryptionProof, G1Point, G2Point, InputContext, ValueKind,
    INPUT_IDENTITY,
};

/// Errors from the reference engine.
#[derive(Debug, Error)]
pub enum CoprocessorError {
    #[error("Unknown handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("Handle {0} is not publicly decryptable")]
    NotPubliclyDecryptable(CiphertextHandle),

    #[error("Type mismatch for handle {0}")]
    TypeMismatch(CiphertextHandle),

    #[error("Input proof rejected")]
    InvalidInputProof,

    #[error("Ciphertext payload is malformed")]
    MalformedPayload,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<CoprocessorError> for EngineError {
    fn from(err: CoprocessorError) -> Self {
        match err {
            CoprocessorError::UnknownHandle(h) => EngineError::UnknownHandle(h),
            CoprocessorError::TypeMismatch(h) => EngineError::TypeMismatch(h),
            CoprocessorError::InvalidInputProof => EngineError::InvalidInputProof,
            CoprocessorError::MalformedPayload => EngineError::MalformedCiphertext,
            other => EngineError::Backend(other.to_string()),
        }
    }
}

/// Decryption of handles that were flagged for public reveal.
pub trait PublicDecryptor: Send + Sync {
    fn decrypt_public(&self, handle: &CiphertextHandle) -> Result<u64, CoprocessorError>;
}

impl<T: PublicDecryptor + ?Sized> PublicDecryptor for Arc<T> {
    fn decrypt_public(&self, handle: &CiphertextHandle) -> Result<u64, CoprocessorError> {
        (**self).decrypt_public(handle)
    }
}

/// A ciphertext held by the engine.
#[derive(Clone, Debug)]
pub struct StoredCiphertext {
    pub ciphertext: EncryptedValue,
    pub kind: ValueKind,
    pub publicly_decryptable: bool,
}

/// In-process ciphertext engine.
pub struct LocalCoprocessor {
    params: IbeParams,
    input_key: G1Point,
    store: RwLock<HashMap<CiphertextHandle, StoredCiphertext>>,
    counter: AtomicU64,
}

impl LocalCoprocessor {
    /// Create an engine from the network key and the extracted input key.
    pub fn new(params: IbeParams, input_key: G1Point) -> Self {
        Self {
            params,
            input_key,
            store: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Create an engine for a network whose master secret is known locally.
    pub fn from_master_secret(master_secret: &Scalar) -> Self {
        Self::new(
            IbeParams::from_master_secret(master_secret),
            extract_identity_key(master_secret, INPUT_IDENTITY),
        )
    }

    /// Network public key clients encrypt bids under.
    pub fn network_key(&self) -> G2Point {
        self.params.to_g2_point()
    }

    pub fn params(&self) -> &IbeParams {
        &self.params
    }

    /// Number of stored ciphertexts.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, handle: &CiphertextHandle) -> Option<StoredCiphertext> {
        self.store.read().get(handle).cloned()
    }

    fn next_handle(&self, ciphertext: &EncryptedValue, kind: ValueKind) -> CiphertextHandle {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(b"SEALED_AUCTION_HANDLE_V1");
        hasher.update(n.to_le_bytes());
        hasher.update(ciphertext.body_digest());
        CiphertextHandle::from_digest(hasher.finalize().into(), kind)
    }

    fn insert(&self, ciphertext: EncryptedValue, kind: ValueKind) -> CiphertextHandle {
        let handle = self.next_handle(&ciphertext, kind);
        self.store.write().insert(
            handle,
            StoredCiphertext {
                ciphertext,
                kind,
                publicly_decryptable: false,
            },
        );
        handle
    }

    /// Encrypt `value` and store it under a fresh handle.
    fn store_value(&self, value: u64, kind: ValueKind) -> Result<CiphertextHandle, CoprocessorError> {
        let ciphertext = encrypt(
            &self.params,
            INPUT_IDENTITY,
            &encode_value(value, kind),
            &mut OsRng,
        )?;
        Ok(self.insert(ciphertext, kind))
    }

    /// Open a stored ciphertext. Never exposed outside the engine except
    /// through [`PublicDecryptor`].
    fn open(&self, handle: &CiphertextHandle) -> Result<(u64, ValueKind), CoprocessorError> {
        let stored = self
            .store
            .read()
            .get(handle)
            .cloned()
            .ok_or(CoprocessorError::UnknownHandle(*handle))?;
        let (value, kind) = self.open_ciphertext(&stored.ciphertext)?;
        if kind != stored.kind {
            return Err(CoprocessorError::TypeMismatch(*handle));
        }
        Ok((value, kind))
    }

    fn open_ciphertext(&self, ciphertext: &EncryptedValue) -> Result<(u64, ValueKind), CoprocessorError> {
        let payload = decrypt(ciphertext, &self.input_key).map_err(|err| match err {
            CryptoError::AuthenticationFailed => CoprocessorError::MalformedPayload,
            other => CoprocessorError::Crypto(other),
        })?;
        decode_value(&payload).ok_or(CoprocessorError::MalformedPayload)
    }

    fn open_uint(&self, handle: &CiphertextHandle) -> Result<u64, CoprocessorError> {
        match self.open(handle)? {
            (value, ValueKind::Uint64) => Ok(value),
            _ => Err(CoprocessorError::TypeMismatch(*handle)),
        }
    }
}

impl CiphertextEngine for LocalCoprocessor {
    fn trivial_encrypt(&self, value: u64) -> Result<CiphertextHandle, EngineError> {
        Ok(self.store_value(value, ValueKind::Uint64)?)
    }

    fn ingest_external(
        &self,
        ciphertext: &EncryptedValue,
        proof: &EncryptionProof,
        context: &InputContext,
    ) -> Result<CiphertextHandle, EngineError> {
        verify_encryption_proof(ciphertext, proof, context)
            .map_err(|_| CoprocessorError::InvalidInputProof)?;

        match self.open_ciphertext(ciphertext)? {
            (_, ValueKind::Uint64) => {}
            _ => return Err(EngineError::MalformedCiphertext),
        }

        let handle = self.insert(ciphertext.clone(), ValueKind::Uint64);
        debug!(auction_id = %context.auction_id, handle = %handle, "Ingested external ciphertext");
        Ok(handle)
    }

    fn greater_than(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        let a = self.open_uint(lhs)?;
        let b = self.open_uint(rhs)?;
        Ok(self.store_value((a > b) as u64, ValueKind::Bool)?)
    }

    fn select(
        &self,
        condition: &CiphertextHandle,
        if_true: &CiphertextHandle,
        if_false: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        let (cond, kind) = self.open(condition)?;
        if kind != ValueKind::Bool {
            return Err(EngineError::TypeMismatch(*condition));
        }
        let (t, t_kind) = self.open(if_true)?;
        let (f, f_kind) = self.open(if_false)?;
        if t_kind != f_kind {
            return Err(EngineError::TypeMismatch(*if_false));
        }
        Ok(self.store_value(if cond == 1 { t } else { f }, t_kind)?)
    }

    fn mark_publicly_decryptable(&self, handle: &CiphertextHandle) -> Result<(), EngineError> {
        let mut store = self.store.write();
        let stored = store
            .get_mut(handle)
            .ok_or(EngineError::UnknownHandle(*handle))?;
        stored.publicly_decryptable = true;
        debug!(handle = %handle, "Marked publicly decryptable");
        Ok(())
    }

    fn is_publicly_decryptable(&self, handle: &CiphertextHandle) -> bool {
        self.store
            .read()
            .get(handle)
            .is_some_and(|s| s.publicly_decryptable)
    }

    fn is_valid(&self, handle: &CiphertextHandle) -> bool {
        self.store.read().contains_key(handle)
    }
}

impl PublicDecryptor for LocalCoprocessor {
    fn decrypt_public(&self, handle: &CiphertextHandle) -> Result<u64, CoprocessorError> {
        if !self.is_publicly_decryptable(handle) {
            if self.is_valid(handle) {
                return Err(CoprocessorError::NotPubliclyDecryptable(*handle));
            }
            return Err(CoprocessorError::UnknownHandle(*handle));
        }
        self.open(handle).map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_crypto::encrypt_with_proof;
    use auction_crypto::ibe::random_scalar;

    fn engine() -> LocalCoprocessor {
        LocalCoprocessor::from_master_secret(&random_scalar(&mut OsRng))
    }

    fn input(
        engine: &LocalCoprocessor,
        value: u64,
        context: &InputContext,
    ) -> (EncryptedValue, EncryptionProof) {
        encrypt_with_proof(
            engine.params(),
            INPUT_IDENTITY,
            &encode_value(value, ValueKind::Uint64),
            context,
            &mut OsRng,
        )
        .unwrap()
    }

    fn reveal(engine: &LocalCoprocessor, handle: &CiphertextHandle) -> u64 {
        engine.mark_publicly_decryptable(handle).unwrap();
        engine.decrypt_public(handle).unwrap()
    }

    #[test]
    fn test_trivial_encrypt_handles_are_distinct() {
        let engine = engine();
        let a = engine.trivial_encrypt(0).unwrap();
        let b = engine.trivial_encrypt(0).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.kind(), Some(ValueKind::Uint64));
        assert!(engine.is_valid(&a));
        assert!(!engine.is_valid(&CiphertextHandle::default()));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_compare_and_select() {
        let engine = engine();
        let ctx = InputContext::new("nft-1", [1u8; 32]);
        let (ct, proof) = input(&engine, 80, &ctx);

        let bid = engine.ingest_external(&ct, &proof, &ctx).unwrap();
        let current = engine.trivial_encrypt(50).unwrap();

        let gt = engine.greater_than(&bid, &current).unwrap();
        assert_eq!(gt.kind(), Some(ValueKind::Bool));
        let max = engine.select(&gt, &bid, &current).unwrap();
        assert_eq!(reveal(&engine, &max), 80);

        let lt = engine.greater_than(&current, &bid).unwrap();
        let max = engine.select(&lt, &current, &bid).unwrap();
        assert_eq!(reveal(&engine, &max), 80);

        // Equal values are not greater.
        let same = engine.trivial_encrypt(80).unwrap();
        let eq = engine.greater_than(&same, &bid).unwrap();
        assert_eq!(reveal(&engine, &eq), 0);
    }

    #[test]
    fn test_type_checks() {
        let engine = engine();
        let a = engine.trivial_encrypt(1).unwrap();
        let b = engine.trivial_encrypt(2).unwrap();
        let cond = engine.greater_than(&a, &b).unwrap();

        assert!(matches!(
            engine.greater_than(&cond, &a),
            Err(EngineError::TypeMismatch(_))
        ));
        assert!(matches!(
            engine.select(&a, &a, &b),
            Err(EngineError::TypeMismatch(_))
        ));
        assert!(matches!(
            engine.select(&cond, &a, &cond),
            Err(EngineError::TypeMismatch(_))
        ));
        assert!(matches!(
            engine.greater_than(&CiphertextHandle([7u8; 32]), &a),
            Err(EngineError::UnknownHandle(_))
        ));
    }

    #[test]
    fn test_ingest_rejects_wrong_context() {
        let engine = engine();
        let ctx = InputContext::new("nft-1", [1u8; 32]);
        let (ct, proof) = input(&engine, 10, &ctx);

        let replay = InputContext::new("nft-2", [1u8; 32]);
        assert_eq!(
            engine.ingest_external(&ct, &proof, &replay),
            Err(EngineError::InvalidInputProof)
        );
        assert!(engine.is_empty());
    }

    #[test]
    fn test_ingest_rejects_foreign_network_key() {
        let engine = engine();
        let other = LocalCoprocessor::from_master_secret(&random_scalar(&mut OsRng));
        let ctx = InputContext::new("nft-1", [1u8; 32]);

        // Well-formed and correctly proven, but encrypted for another network.
        let (ct, proof) = input(&other, 10, &ctx);
        assert_eq!(
            engine.ingest_external(&ct, &proof, &ctx),
            Err(EngineError::MalformedCiphertext)
        );
    }

    #[test]
    fn test_ingest_rejects_bool_payload() {
        let engine = engine();
        let ctx = InputContext::new("nft-1", [1u8; 32]);
        let (ct, proof) = encrypt_with_proof(
            engine.params(),
            INPUT_IDENTITY,
            &encode_value(1, ValueKind::Bool),
            &ctx,
            &mut OsRng,
        )
        .unwrap();

        assert_eq!(
            engine.ingest_external(&ct, &proof, &ctx),
            Err(EngineError::MalformedCiphertext)
        );
    }

    #[test]
    fn test_public_decryption_requires_flag() {
        let engine = engine();
        let handle = engine.trivial_encrypt(42).unwrap();

        assert!(matches!(
            engine.decrypt_public(&handle),
            Err(CoprocessorError::NotPubliclyDecryptable(_))
        ));
        assert!(matches!(
            engine.decrypt_public(&CiphertextHandle([1u8; 32])),
            Err(CoprocessorError::UnknownHandle(_))
        ));

        engine.mark_publicly_decryptable(&handle).unwrap();
        assert!(engine.is_publicly_decryptable(&handle));
        assert_eq!(engine.decrypt_public(&handle).unwrap(), 42);
    }
}
