//! Decryption authority for auction reveals.
//!
//! A t-of-n KMS committee reveals handles that the ciphertext engine has
//! flagged publicly decryptable:
//! 1. A proposer decrypts the handles and ABI-encodes the cleartexts
//! 2. Each member independently decrypts the same handles and, only if it
//!    gets the same cleartexts, signs the reveal digest with its key share
//! 3. The coordinator verifies each partial signature's DLEQ proof
//! 4. Once t shares are in, they are aggregated into a threshold BLS
//!    signature: the decryption proof the auction module verifies

use std::collections::{BTreeMap, HashMap};

use bls12_381::{G2Projective, Scalar};
use group::Curve;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::{debug, info, warn};

use auction_coprocessor::{CoprocessorError, PublicDecryptor};
use auction_crypto::ibe::{compress_g2, random_scalar};
use auction_crypto::{
    aggregate_partial_signatures, deal_committed_shares, generate_partial_signature,
    verify_partial_signature, verify_share, CryptoError, SecretShare,
};
use auction_types::{
    compute_reveal_digest, encode_clear_values, CiphertextHandle, DecryptionProof, G1Point,
    G2Point, PartialDecryptionShare,
};

/// Errors that can occur during reveal coordination.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Duplicate share from member {0}")]
    DuplicateShare(u32),

    #[error("Invalid DLEQ proof from member {0}")]
    InvalidProof(u32),

    #[error("Threshold not met: have {have}, need {need}")]
    ThresholdNotMet { have: usize, need: usize },

    #[error("Invalid member index {0}")]
    InvalidMember(u32),

    #[error("Share of member {0} does not match the dealing commitments")]
    InvalidShare(u32),

    #[error("Committee key does not match the dealing commitments")]
    CommitteeKeyMismatch,

    #[error("Reveal request not found")]
    RequestNotFound,

    #[error("Nothing to reveal")]
    EmptyRequest,

    #[error("Clear values do not match the handles' decryption")]
    ValueMismatch,

    #[error("Decryption failed: {0}")]
    Decryption(#[from] CoprocessorError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// State of a reveal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionState {
    /// Collecting partial shares
    Collecting,
    /// Threshold met, ready to aggregate
    Ready,
    /// Proof produced
    Completed,
}

/// A single reveal being coordinated.
#[derive(Debug, Clone)]
pub struct DecryptionRequest {
    /// Reveal digest, doubling as the request id
    pub request_id: [u8; 32],
    pub handles: Vec<CiphertextHandle>,
    /// ABI-encoded cleartexts, one word per handle
    pub clear_values: Vec<u8>,
    /// Collected partial shares (member index -> share)
    pub shares: BTreeMap<u32, PartialDecryptionShare>,
    pub state: DecryptionState,
    pub threshold: usize,
}

impl DecryptionRequest {
    pub fn new(handles: Vec<CiphertextHandle>, clear_values: Vec<u8>, threshold: usize) -> Self {
        Self {
            request_id: compute_reveal_digest(&handles, &clear_values),
            handles,
            clear_values,
            shares: BTreeMap::new(),
            state: DecryptionState::Collecting,
            threshold,
        }
    }

    /// Check if threshold is met.
    pub fn threshold_met(&self) -> bool {
        self.shares.len() >= self.threshold
    }
}

/// Collects and checks partial signatures, then aggregates them.
#[derive(Debug)]
pub struct DecryptionCoordinator {
    /// Active reveal requests
    requests: HashMap<[u8; 32], DecryptionRequest>,
    /// Public keys of committee members (index -> pk)
    member_public_keys: HashMap<u32, G1Point>,
    threshold: usize,
}

impl DecryptionCoordinator {
    pub fn new(threshold: usize) -> Self {
        Self {
            requests: HashMap::new(),
            member_public_keys: HashMap::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Register a member's public key.
    pub fn register_member(&mut self, index: u32, public_key: G1Point) {
        info!(member_index = index, "Registered KMS member public key");
        self.member_public_keys.insert(index, public_key);
    }

    /// Start a reveal of `handles` as `clear_values`.
    pub fn start_reveal(
        &mut self,
        handles: Vec<CiphertextHandle>,
        clear_values: Vec<u8>,
    ) -> Result<[u8; 32], CoordinatorError> {
        if handles.is_empty() {
            return Err(CoordinatorError::EmptyRequest);
        }

        let request = DecryptionRequest::new(handles, clear_values, self.threshold);
        let request_id = request.request_id;

        info!(
            request_id = hex::encode(request_id),
            handles = request.handles.len(),
            "Started reveal request"
        );

        self.requests.entry(request_id).or_insert(request);
        Ok(request_id)
    }

    /// Submit a partial signature share.
    pub fn submit_share(
        &mut self,
        request_id: [u8; 32],
        share: PartialDecryptionShare,
    ) -> Result<DecryptionState, CoordinatorError> {
        let member_index = share.validator_index;

        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(CoordinatorError::RequestNotFound)?;

        if request.shares.contains_key(&member_index) {
            return Err(CoordinatorError::DuplicateShare(member_index));
        }

        let member_pk = self
            .member_public_keys
            .get(&member_index)
            .ok_or(CoordinatorError::InvalidMember(member_index))?;

        if verify_partial_signature(&share, &request.request_id, member_pk).is_err() {
            warn!(
                member_index,
                request_id = hex::encode(request_id),
                "Invalid DLEQ proof"
            );
            return Err(CoordinatorError::InvalidProof(member_index));
        }

        debug!(
            member_index,
            request_id = hex::encode(request_id),
            shares_collected = request.shares.len() + 1,
            threshold = request.threshold,
            "Accepted partial share"
        );

        request.shares.insert(member_index, share);

        if request.threshold_met() && request.state == DecryptionState::Collecting {
            request.state = DecryptionState::Ready;
            info!(
                request_id = hex::encode(request_id),
                "Threshold met, ready to aggregate"
            );
        }

        Ok(request.state.clone())
    }

    /// Aggregate shares into a decryption proof.
    pub fn aggregate(&mut self, request_id: [u8; 32]) -> Result<DecryptionProof, CoordinatorError> {
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(CoordinatorError::RequestNotFound)?;

        if !request.threshold_met() {
            return Err(CoordinatorError::ThresholdNotMet {
                have: request.shares.len(),
                need: request.threshold,
            });
        }

        let shares: Vec<(u32, G1Point)> = request
            .shares
            .iter()
            .take(request.threshold)
            .map(|(idx, share)| (*idx, share.partial_sig.clone()))
            .collect();

        let signature = aggregate_partial_signatures(&shares, request.threshold)?;
        request.state = DecryptionState::Completed;

        info!(
            request_id = hex::encode(request_id),
            signers = shares.len(),
            "Reveal proof aggregated"
        );

        Ok(DecryptionProof {
            signature,
            signers: shares.iter().map(|(idx, _)| *idx).collect(),
        })
    }

    pub fn remove_request(&mut self, request_id: &[u8; 32]) -> Option<DecryptionRequest> {
        self.requests.remove(request_id)
    }
}

/// One KMS committee member.
///
/// A member never signs cleartexts it has not decrypted itself.
pub struct KmsNode<D> {
    share: SecretShare,
    decryptor: D,
}

impl<D: PublicDecryptor> KmsNode<D> {
    pub fn new(share: SecretShare, decryptor: D) -> Self {
        Self { share, decryptor }
    }

    pub fn index(&self) -> u32 {
        self.share.index
    }

    pub fn public_key(&self) -> G1Point {
        self.share.public_key()
    }

    /// Decrypt publicly decryptable handles.
    pub fn decrypt_handles(&self, handles: &[CiphertextHandle]) -> Result<Vec<u64>, CoordinatorError> {
        handles
            .iter()
            .map(|h| self.decryptor.decrypt_public(h).map_err(CoordinatorError::from))
            .collect()
    }

    /// Check `clear_values` against our own decryption and sign the digest.
    pub fn sign_reveal<R: RngCore + CryptoRng>(
        &self,
        handles: &[CiphertextHandle],
        clear_values: &[u8],
        rng: &mut R,
    ) -> Result<PartialDecryptionShare, CoordinatorError> {
        let values = self.decrypt_handles(handles)?;
        if encode_clear_values(&values) != clear_values {
            warn!(member_index = self.index(), "Refusing to sign mismatched clear values");
            return Err(CoordinatorError::ValueMismatch);
        }

        let digest = compute_reveal_digest(handles, clear_values);
        Ok(generate_partial_signature(
            &self.share.secret,
            &digest,
            self.share.index,
            &self.share.public_key_affine(),
            rng,
        ))
    }
}

/// The committee as a whole: answers public decryption requests with
/// ABI-encoded cleartexts and a decryption proof.
pub struct DecryptionAuthority<D> {
    nodes: Vec<KmsNode<D>>,
    coordinator: Mutex<DecryptionCoordinator>,
    committee_key: G2Point,
}

impl<D: PublicDecryptor> DecryptionAuthority<D> {
    pub fn new(nodes: Vec<KmsNode<D>>, committee_key: G2Point, threshold: usize) -> Self {
        let mut coordinator = DecryptionCoordinator::new(threshold);
        for node in &nodes {
            coordinator.register_member(node.index(), node.public_key());
        }
        Self {
            nodes,
            coordinator: Mutex::new(coordinator),
            committee_key,
        }
    }

    /// Committee public key reveal proofs verify against.
    pub fn committee_key(&self) -> &G2Point {
        &self.committee_key
    }

    pub fn threshold(&self) -> usize {
        self.coordinator.lock().threshold()
    }

    /// Reveal `handles`: returns `(abi_clear_values, decryption_proof)`.
    pub fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
    ) -> Result<(Vec<u8>, Vec<u8>), CoordinatorError> {
        let proposer = self.nodes.first().ok_or(CoordinatorError::ThresholdNotMet {
            have: 0,
            need: self.threshold(),
        })?;
        let clear_values = encode_clear_values(&proposer.decrypt_handles(handles)?);

        let mut coordinator = self.coordinator.lock();
        let request_id = coordinator.start_reveal(handles.to_vec(), clear_values.clone())?;

        for node in &self.nodes {
            let share = match node.sign_reveal(handles, &clear_values, &mut OsRng) {
                Ok(share) => share,
                Err(err) => {
                    warn!(member_index = node.index(), error = %err, "Member declined to sign");
                    continue;
                }
            };
            match coordinator.submit_share(request_id, share) {
                Ok(DecryptionState::Ready) => break,
                Ok(_) => {}
                Err(CoordinatorError::DuplicateShare(_)) => {}
                Err(err) => warn!(member_index = node.index(), error = %err, "Share rejected"),
            }
        }

        let result = coordinator.aggregate(request_id);
        coordinator.remove_request(&request_id);
        let proof = result?;

        Ok((clear_values, proof.to_bytes()))
    }
}

/// Output of a trusted-dealer committee setup.
pub struct CommitteeSetup {
    pub committee_key: G2Point,
    pub shares: Vec<SecretShare>,
    /// Feldman commitments to the dealing polynomial
    pub commitments: Vec<G2Point>,
    pub threshold: usize,
}

impl CommitteeSetup {
    /// Deal a fresh committee key into `total` shares.
    pub fn deal<R: RngCore + CryptoRng>(
        threshold: usize,
        total: usize,
        rng: &mut R,
    ) -> Result<Self, CoordinatorError> {
        let secret = random_scalar(rng);
        Self::from_secret(&secret, threshold, total, rng)
    }

    pub fn from_secret<R: RngCore + CryptoRng>(
        secret: &Scalar,
        threshold: usize,
        total: usize,
        rng: &mut R,
    ) -> Result<Self, CoordinatorError> {
        let (shares, commitments) = deal_committed_shares(secret, threshold, total, rng)?;
        let committee_key = compress_g2(&(G2Projective::generator() * secret).to_affine());
        let setup = Self {
            committee_key,
            shares,
            commitments,
            threshold,
        };
        setup.verify_shares()?;

        info!(threshold, total, "Dealt KMS committee key");
        Ok(setup)
    }

    /// Check every share and the committee key against the commitments.
    pub fn verify_shares(&self) -> Result<(), CoordinatorError> {
        if self.commitments.first() != Some(&self.committee_key) {
            return Err(CoordinatorError::CommitteeKeyMismatch);
        }
        for share in &self.shares {
            if !verify_share(share, &self.commitments) {
                warn!(member_index = share.index, "Dealt share failed verification");
                return Err(CoordinatorError::InvalidShare(share.index));
            }
        }
        Ok(())
    }

    /// Build the decryption authority, giving every member `decryptor`.
    pub fn into_authority<D: PublicDecryptor + Clone>(self, decryptor: D) -> DecryptionAuthority<D> {
        let nodes = self
            .shares
            .into_iter()
            .map(|share| KmsNode::new(share, decryptor.clone()))
            .collect();
        DecryptionAuthority::new(nodes, self.committee_key, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_coprocessor::LocalCoprocessor;
    use auction_module::{CiphertextEngine, DecryptionProofVerifier, KmsSignatureVerifier};
    use std::sync::Arc;

    type Authority = DecryptionAuthority<Arc<LocalCoprocessor>>;

    fn setup(threshold: usize, total: usize) -> (Arc<LocalCoprocessor>, Authority) {
        let engine = Arc::new(LocalCoprocessor::from_master_secret(&random_scalar(&mut OsRng)));
        let authority = CommitteeSetup::deal(threshold, total, &mut OsRng)
            .unwrap()
            .into_authority(Arc::clone(&engine));
        (engine, authority)
    }

    fn public_value(engine: &LocalCoprocessor, value: u64) -> CiphertextHandle {
        let handle = engine.trivial_encrypt(value).unwrap();
        engine.mark_publicly_decryptable(&handle).unwrap();
        handle
    }

    #[test]
    fn test_coordinator_creation() {
        let coordinator = DecryptionCoordinator::new(3);
        assert_eq!(coordinator.threshold(), 3);
    }

    #[test]
    fn test_dealt_shares_checked_against_commitments() {
        let mut setup = CommitteeSetup::deal(2, 3, &mut OsRng).unwrap();
        assert_eq!(setup.commitments.len(), 2);
        assert!(setup.verify_shares().is_ok());

        setup.shares[1].secret += Scalar::from(1u64);
        assert!(matches!(
            setup.verify_shares(),
            Err(CoordinatorError::InvalidShare(2))
        ));

        let mut setup = CommitteeSetup::deal(2, 3, &mut OsRng).unwrap();
        setup.committee_key = CommitteeSetup::deal(2, 3, &mut OsRng).unwrap().committee_key;
        assert!(matches!(
            setup.verify_shares(),
            Err(CoordinatorError::CommitteeKeyMismatch)
        ));
    }

    #[test]
    fn test_threshold_not_met_error() {
        let mut coordinator = DecryptionCoordinator::new(3);
        let request_id = coordinator
            .start_reveal(vec![CiphertextHandle([1u8; 32])], encode_clear_values(&[5]))
            .unwrap();

        assert!(matches!(
            coordinator.aggregate(request_id),
            Err(CoordinatorError::ThresholdNotMet { have: 0, need: 3 })
        ));
        assert!(matches!(
            coordinator.start_reveal(vec![], vec![]),
            Err(CoordinatorError::EmptyRequest)
        ));
    }

    #[test]
    fn test_share_checks() {
        let setup = CommitteeSetup::deal(2, 3, &mut OsRng).unwrap();
        let mut coordinator = DecryptionCoordinator::new(2);
        for share in &setup.shares {
            coordinator.register_member(share.index, share.public_key());
        }

        let handles = vec![CiphertextHandle([1u8; 32])];
        let clear = encode_clear_values(&[5]);
        let request_id = coordinator.start_reveal(handles.clone(), clear.clone()).unwrap();

        let member = &setup.shares[0];
        let good = generate_partial_signature(
            &member.secret,
            &request_id,
            member.index,
            &member.public_key_affine(),
            &mut OsRng,
        );
        assert!(matches!(
            coordinator.submit_share(request_id, good.clone()),
            Ok(DecryptionState::Collecting)
        ));
        assert!(matches!(
            coordinator.submit_share(request_id, good),
            Err(CoordinatorError::DuplicateShare(1))
        ));

        // Signed over a different digest.
        let member = &setup.shares[1];
        let wrong = generate_partial_signature(
            &member.secret,
            b"other",
            member.index,
            &member.public_key_affine(),
            &mut OsRng,
        );
        assert!(matches!(
            coordinator.submit_share(request_id, wrong),
            Err(CoordinatorError::InvalidProof(2))
        ));

        let mut stranger = generate_partial_signature(
            &member.secret,
            &request_id,
            member.index,
            &member.public_key_affine(),
            &mut OsRng,
        );
        stranger.validator_index = 9;
        assert!(matches!(
            coordinator.submit_share(request_id, stranger),
            Err(CoordinatorError::InvalidMember(9))
        ));
    }

    #[test]
    fn test_public_decrypt_produces_verifiable_proof() {
        let (engine, authority) = setup(2, 3);
        let handles = [public_value(&engine, 80), public_value(&engine, 1)];

        let (clear, proof) = authority.public_decrypt(&handles).unwrap();
        assert_eq!(clear, encode_clear_values(&[80, 1]));

        let decoded = DecryptionProof::from_bytes(&proof).unwrap();
        assert_eq!(decoded.signers.len(), 2);

        let verifier = KmsSignatureVerifier::new(authority.committee_key().clone(), 2);
        assert!(verifier.verify_proof(&handles, &clear, &proof));
        assert!(!verifier.verify_proof(&handles, &encode_clear_values(&[81, 1]), &proof));
    }

    #[test]
    fn test_refuses_private_handles() {
        let (engine, authority) = setup(2, 3);
        let private = engine.trivial_encrypt(80).unwrap();

        assert!(matches!(
            authority.public_decrypt(&[private]),
            Err(CoordinatorError::Decryption(
                CoprocessorError::NotPubliclyDecryptable(_)
            ))
        ));
    }

    #[test]
    fn test_node_refuses_mismatched_values() {
        let engine = Arc::new(LocalCoprocessor::from_master_secret(&random_scalar(&mut OsRng)));
        let setup = CommitteeSetup::deal(2, 3, &mut OsRng).unwrap();
        let node = KmsNode::new(setup.shares[0].clone(), Arc::clone(&engine));

        let handle = public_value(&engine, 80);
        assert!(matches!(
            node.sign_reveal(&[handle], &encode_clear_values(&[79]), &mut OsRng),
            Err(CoordinatorError::ValueMismatch)
        ));
        assert!(node
            .sign_reveal(&[handle], &encode_clear_values(&[80]), &mut OsRng)
            .is_ok());
    }
}
