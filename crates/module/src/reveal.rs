//! Reveal verification.
//!
//! The decryption authority hands back ABI-encoded cleartexts together with
//! a proof that they are the decryptions of a given handle list. Verifying
//! that proof is the only way a cleartext enters auction state.
//!
//! Checks, in order:
//! 1. the auction has not already been concluded
//! 2. every handle was flagged publicly decryptable by the engine
//! 3. the ABI payload holds exactly one word per handle
//! 4. the injected [`DecryptionProofVerifier`] accepts the proof

use tracing::{debug, warn};

use auction_crypto::verify_threshold_signature;
use auction_types::{
    compute_reveal_digest, decode_clear_values, AuctionRecord, CiphertextHandle, DecryptionProof,
    G2Point,
};

use crate::engine::CiphertextEngine;
use crate::error::AuctionError;

/// Handles paired with their verified cleartexts, in reveal order.
pub type RevealedValues = Vec<(CiphertextHandle, u64)>;

/// Decides whether `proof` attests that `clear_values` decrypt `handles`.
pub trait DecryptionProofVerifier: Send + Sync {
    fn verify_proof(&self, handles: &[CiphertextHandle], clear_values: &[u8], proof: &[u8])
        -> bool;
}

impl<F> DecryptionProofVerifier for F
where
    F: Fn(&[CiphertextHandle], &[u8], &[u8]) -> bool + Send + Sync,
{
    fn verify_proof(
        &self,
        handles: &[CiphertextHandle],
        clear_values: &[u8],
        proof: &[u8],
    ) -> bool {
        self(handles, clear_values, proof)
    }
}

/// Accepts threshold BLS signatures from the KMS committee.
///
/// The proof is a borsh-encoded [`DecryptionProof`] whose signature must
/// verify over the reveal digest under the committee public key.
#[derive(Clone, Debug)]
pub struct KmsSignatureVerifier {
    committee_key: G2Point,
    threshold: usize,
}

impl KmsSignatureVerifier {
    pub fn new(committee_key: G2Point, threshold: usize) -> Self {
        Self {
            committee_key,
            threshold,
        }
    }

    pub fn committee_key(&self) -> &G2Point {
        &self.committee_key
    }
}

impl DecryptionProofVerifier for KmsSignatureVerifier {
    fn verify_proof(
        &self,
        handles: &[CiphertextHandle],
        clear_values: &[u8],
        proof: &[u8],
    ) -> bool {
        let Some(proof) = DecryptionProof::from_bytes(proof) else {
            warn!("Undecodable decryption proof");
            return false;
        };

        let mut signers = proof.signers.clone();
        signers.sort_unstable();
        signers.dedup();
        if signers.len() != proof.signers.len() || signers.len() < self.threshold {
            warn!(
                signers = proof.signers.len(),
                threshold = self.threshold,
                "Decryption proof signer set rejected"
            );
            return false;
        }

        let digest = compute_reveal_digest(handles, clear_values);
        match verify_threshold_signature(&proof.signature, &digest, &self.committee_key) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Decryption proof signature rejected");
                false
            }
        }
    }
}

/// Verify a reveal for `record` and return the cleartexts.
pub fn verify_reveal<E, V>(
    engine: &E,
    verifier: &V,
    record: &AuctionRecord,
    handles: &[CiphertextHandle],
    clear_values: &[u8],
    proof: &[u8],
) -> Result<RevealedValues, AuctionError>
where
    E: CiphertextEngine + ?Sized,
    V: DecryptionProofVerifier + ?Sized,
{
    if record.concluded {
        return Err(AuctionError::AlreadyVerified);
    }

    if handles.is_empty() || !handles.iter().all(|h| engine.is_publicly_decryptable(h)) {
        warn!(auction_id = %record.auction_id, "Reveal names a handle that is not publicly decryptable");
        return Err(AuctionError::ProofVerificationFailed);
    }

    let values = decode_clear_values(clear_values, handles.len()).map_err(|err| {
        warn!(auction_id = %record.auction_id, error = %err, "Malformed clear values");
        AuctionError::ProofVerificationFailed
    })?;

    if !verifier.verify_proof(handles, clear_values, proof) {
        return Err(AuctionError::ProofVerificationFailed);
    }

    debug!(auction_id = %record.auction_id, handles = handles.len(), "Reveal verified");
    Ok(handles.iter().copied().zip(values).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ClearEngine;
    use auction_crypto::ibe::random_scalar;
    use auction_crypto::{
        aggregate_partial_signatures, deal_shares, generate_partial_signature, IbeParams,
    };
    use auction_types::{encode_clear_values, G1Point, HighestBidder};
    use rand::rngs::OsRng;

    fn record(engine: &ClearEngine) -> AuctionRecord {
        let highest_bid = engine.trivial_encrypt(80).unwrap();
        let leader = engine.trivial_encrypt(1).unwrap();
        engine.mark_publicly_decryptable(&highest_bid).unwrap();
        engine.mark_publicly_decryptable(&leader).unwrap();
        AuctionRecord {
            auction_id: "nft-1".into(),
            creator: [0u8; 32],
            start_time: 1000,
            end_time: 4600,
            active: true,
            concluded: false,
            highest_bid,
            highest_bidder_index: leader,
            highest_bidder: HighestBidder::Sealed(leader),
            outcome: None,
        }
    }

    fn accept_all(_: &[CiphertextHandle], _: &[u8], _: &[u8]) -> bool {
        true
    }

    #[test]
    fn test_verify_returns_mapping() {
        let (engine, verifier) = ClearEngine::shared();
        let record = record(&engine);
        let handles = record.reveal_handles();
        let (clear, proof) = engine.public_decrypt(&handles).unwrap();

        let values = verify_reveal(&engine, &verifier, &record, &handles, &clear, &proof).unwrap();

        assert_eq!(values, vec![(handles[0], 80), (handles[1], 1)]);
    }

    #[test]
    fn test_wrong_values_rejected() {
        let (engine, verifier) = ClearEngine::shared();
        let record = record(&engine);
        let handles = record.reveal_handles();
        let (_, proof) = engine.public_decrypt(&handles).unwrap();

        let result = verify_reveal(
            &engine,
            &verifier,
            &record,
            &handles,
            &encode_clear_values(&[81, 1]),
            &proof,
        );
        assert_eq!(result, Err(AuctionError::ProofVerificationFailed));
    }

    #[test]
    fn test_handle_not_publicly_decryptable() {
        let engine = ClearEngine::new();
        let record = record(&engine);
        let private = engine.trivial_encrypt(80).unwrap();

        let result = verify_reveal(
            &engine,
            &accept_all,
            &record,
            &[private],
            &encode_clear_values(&[80]),
            b"",
        );
        assert_eq!(result, Err(AuctionError::ProofVerificationFailed));
    }

    #[test]
    fn test_length_mismatch() {
        let engine = ClearEngine::new();
        let record = record(&engine);

        let result = verify_reveal(
            &engine,
            &accept_all,
            &record,
            &record.reveal_handles(),
            &encode_clear_values(&[80]),
            b"",
        );
        assert_eq!(result, Err(AuctionError::ProofVerificationFailed));
    }

    #[test]
    fn test_already_verified() {
        let engine = ClearEngine::new();
        let mut record = record(&engine);
        record.concluded = true;

        let result = verify_reveal(
            &engine,
            &accept_all,
            &record,
            &record.reveal_handles(),
            &encode_clear_values(&[80, 1]),
            b"",
        );
        assert_eq!(result, Err(AuctionError::AlreadyVerified));
    }

    #[test]
    fn test_kms_signature_verifier() {
        let secret = random_scalar(&mut OsRng);
        let committee_key = IbeParams::from_master_secret(&secret).to_g2_point();
        let shares = deal_shares(&secret, 2, 3, &mut OsRng).unwrap();

        let handles = [CiphertextHandle([5u8; 32]), CiphertextHandle([6u8; 32])];
        let clear = encode_clear_values(&[80, 1]);
        let digest = compute_reveal_digest(&handles, &clear);

        let partials: Vec<(u32, G1Point)> = shares[..2]
            .iter()
            .map(|share| {
                let p = generate_partial_signature(
                    &share.secret,
                    &digest,
                    share.index,
                    &share.public_key_affine(),
                    &mut OsRng,
                );
                (p.validator_index, p.partial_sig)
            })
            .collect();
        let signature = aggregate_partial_signatures(&partials, 2).unwrap();
        let proof = DecryptionProof {
            signature,
            signers: vec![1, 2],
        };

        let verifier = KmsSignatureVerifier::new(committee_key, 2);
        assert!(verifier.verify_proof(&handles, &clear, &proof.to_bytes()));

        // Different cleartext, same signature.
        assert!(!verifier.verify_proof(&handles, &encode_clear_values(&[79, 1]), &proof.to_bytes()));

        // Too few signers claimed.
        let short = DecryptionProof {
            signers: vec![1],
            ..proof.clone()
        };
        assert!(!verifier.verify_proof(&handles, &clear, &short.to_bytes()));

        assert!(!verifier.verify_proof(&handles, &clear, b"garbage"));
    }
}
