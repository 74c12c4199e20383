//! Cleartext stand-in for a ciphertext engine, used by unit tests.
//!
//! "Ciphertexts" are little-endian u64 bytes and an input proof is valid when
//! its commitment starts with the input context digest. Reveal proofs are
//! the reveal digest itself, accepted only if every value matches the table.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use auction_types::{
    compute_reveal_digest, decode_clear_values, encode_clear_values, sha256, CiphertextHandle,
    EncryptedValue, EncryptionProof, G2Point, InputContext, Scalar, ValueKind,
};

use crate::engine::{CiphertextEngine, EngineError};
use crate::reveal::DecryptionProofVerifier;

#[derive(Debug, Default)]
pub(crate) struct ClearEngine {
    values: RwLock<HashMap<CiphertextHandle, (u64, ValueKind)>>,
    public: RwLock<HashSet<CiphertextHandle>>,
    counter: AtomicU64,
}

impl ClearEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared() -> (Arc<Self>, ClearVerifier) {
        let engine = Arc::new(Self::new());
        let verifier = ClearVerifier(Arc::clone(&engine));
        (engine, verifier)
    }

    /// Build an external input for `value` bound to `context`.
    pub(crate) fn encrypt_input(value: u64, context: &InputContext) -> (EncryptedValue, EncryptionProof) {
        let mut commitment = [0u8; 96];
        commitment[..32].copy_from_slice(&context.digest());
        (
            EncryptedValue {
                ephemeral_pubkey: G2Point::default(),
                ciphertext: value.to_le_bytes().to_vec(),
                tag: [0u8; 16],
                nonce: [0u8; 12],
            },
            EncryptionProof {
                commitment: G2Point(commitment),
                response: Scalar::default(),
            },
        )
    }

    /// Decrypt publicly decryptable handles and "prove" it.
    pub(crate) fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
    ) -> Result<(Vec<u8>, Vec<u8>), EngineError> {
        let public = self.public.read();
        let values = self.values.read();
        let clear = handles
            .iter()
            .map(|h| {
                if !public.contains(h) {
                    return Err(EngineError::UnknownHandle(*h));
                }
                values
                    .get(h)
                    .map(|(v, _)| *v)
                    .ok_or(EngineError::UnknownHandle(*h))
            })
            .collect::<Result<Vec<u64>, _>>()?;
        let abi = encode_clear_values(&clear);
        let proof = compute_reveal_digest(handles, &abi).to_vec();
        Ok((abi, proof))
    }

    pub(crate) fn value_of(&self, handle: &CiphertextHandle) -> Option<u64> {
        self.values.read().get(handle).map(|(v, _)| *v)
    }

    fn insert(&self, value: u64, kind: ValueKind) -> CiphertextHandle {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let handle = CiphertextHandle::from_digest(sha256(&n.to_le_bytes()), kind);
        self.values.write().insert(handle, (value, kind));
        handle
    }

    fn lookup(&self, handle: &CiphertextHandle) -> Result<(u64, ValueKind), EngineError> {
        self.values
            .read()
            .get(handle)
            .copied()
            .ok_or(EngineError::UnknownHandle(*handle))
    }
}

impl CiphertextEngine for ClearEngine {
    fn trivial_encrypt(&self, value: u64) -> Result<CiphertextHandle, EngineError> {
        Ok(self.insert(value, ValueKind::Uint64))
    }

    fn ingest_external(
        &self,
        ciphertext: &EncryptedValue,
        proof: &EncryptionProof,
        context: &InputContext,
    ) -> Result<CiphertextHandle, EngineError> {
        if proof.commitment.0[..32] != context.digest() {
            return Err(EngineError::InvalidInputProof);
        }
        let bytes: [u8; 8] = ciphertext
            .ciphertext
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::MalformedCiphertext)?;
        Ok(self.insert(u64::from_le_bytes(bytes), ValueKind::Uint64))
    }

    fn greater_than(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        let (a, ka) = self.lookup(lhs)?;
        let (b, kb) = self.lookup(rhs)?;
        if ka != ValueKind::Uint64 {
            return Err(EngineError::TypeMismatch(*lhs));
        }
        if kb != ValueKind::Uint64 {
            return Err(EngineError::TypeMismatch(*rhs));
        }
        Ok(self.insert((a > b) as u64, ValueKind::Bool))
    }

    fn select(
        &self,
        condition: &CiphertextHandle,
        if_true: &CiphertextHandle,
        if_false: &CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        let (c, kc) = self.lookup(condition)?;
        if kc != ValueKind::Bool {
            return Err(EngineError::TypeMismatch(*condition));
        }
        let (t, kt) = self.lookup(if_true)?;
        let (f, kf) = self.lookup(if_false)?;
        if kt != kf {
            return Err(EngineError::TypeMismatch(*if_false));
        }
        Ok(self.insert(if c == 1 { t } else { f }, kt))
    }

    fn mark_publicly_decryptable(&self, handle: &CiphertextHandle) -> Result<(), EngineError> {
        self.lookup(handle)?;
        self.public.write().insert(*handle);
        Ok(())
    }

    fn is_publicly_decryptable(&self, handle: &CiphertextHandle) -> bool {
        self.public.read().contains(handle)
    }

    fn is_valid(&self, handle: &CiphertextHandle) -> bool {
        self.values.read().contains_key(handle)
    }
}

/// Accepts a reveal when the proof is the reveal digest and every value
/// matches the engine's table.
#[derive(Clone, Debug)]
pub(crate) struct ClearVerifier(pub(crate) Arc<ClearEngine>);

impl DecryptionProofVerifier for ClearVerifier {
    fn verify_proof(
        &self,
        handles: &[CiphertextHandle],
        clear_values: &[u8],
        proof: &[u8],
    ) -> bool {
        if proof != compute_reveal_digest(handles, clear_values).as_slice() {
            return false;
        }
        let Ok(values) = decode_clear_values(clear_values, handles.len()) else {
            return false;
        };
        handles
            .iter()
            .zip(values)
            .all(|(h, v)| self.0.value_of(h) == Some(v))
    }
}
