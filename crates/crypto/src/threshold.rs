//! Threshold BLS signatures over reveal digests.
//!
//! In a (t, n) KMS committee:
//! - n members each hold a secret share sk_i of the committee key s
//! - Any t members can jointly sign a reveal digest
//! - Fewer than t members learn nothing about s
//!
//! # Partial Signature
//!
//! For message `m`, member i computes:
//! σ_i = sk_i · H(m)
//! together with a DLEQ proof that log_g(pk_i) = log_{H(m)}(σ_i).
//!
//! # Aggregation
//!
//! Given t partial signatures, compute:
//! σ = Σ λ_i · σ_i
//!
//! where λ_i are Lagrange coefficients.
//!
//! # Verification
//!
//! e(σ, G2) == e(H(m), PK) with PK = s·G2.

use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use auction_types::{DiscreteLogProof, G1Point, G2Point, PartialDecryptionShare, Scalar as TypesScalar};

use crate::error::CryptoError;
use crate::ibe::{
    compress_g1, decompress_g1, decompress_g2, hash_to_g1, random_scalar, scalar_from_digest,
};

/// Generate a partial signature on a message.
///
/// # Arguments
/// * `secret_share` - Member's secret share sk_i
/// * `message` - The message to sign (a reveal digest)
/// * `validator_index` - The member's index (1-based)
/// * `public_key` - Member's public key g^sk_i for the DLEQ proof
///
/// # Returns
/// A partial share with DLEQ proof of correctness
pub fn generate_partial_signature<R: RngCore + CryptoRng>(
    secret_share: &Scalar,
    message: &[u8],
    validator_index: u32,
    public_key: &G1Affine,
    rng: &mut R,
) -> PartialDecryptionShare {
    let msg_point = hash_to_g1(message);

    // σ_i = sk_i · H(m)
    let partial_sig = (G1Projective::from(msg_point) * secret_share).to_affine();

    let proof = generate_dleq_proof(secret_share, &msg_point, public_key, &partial_sig, rng);

    PartialDecryptionShare {
        validator_index,
        partial_sig: compress_g1(&partial_sig),
        proof,
    }
}

/// Verify a partial signature against the member's public key.
pub fn verify_partial_signature(
    share: &PartialDecryptionShare,
    message: &[u8],
    public_key: &G1Point,
) -> Result<(), CryptoError> {
    let pk = decompress_g1(&public_key.0)?;
    let partial_sig = decompress_g1(&share.partial_sig.0)?;
    let msg_point = hash_to_g1(message);

    verify_dleq_proof(&share.proof, &msg_point, &pk, &partial_sig)
}

/// Aggregate partial signatures using Lagrange interpolation.
///
/// # Arguments
/// * `shares` - Vector of (validator_index, partial_signature) pairs
/// * `threshold` - Minimum number of shares required
///
/// # Returns
/// The aggregated signature σ = Σ λ_i · σ_i
pub fn aggregate_partial_signatures(
    shares: &[(u32, G1Point)],
    threshold: usize,
) -> Result<G1Point, CryptoError> {
    if shares.len() < threshold {
        return Err(CryptoError::InsufficientShares {
            required: threshold,
            got: shares.len(),
        });
    }

    let unique: HashSet<u32> = shares.iter().map(|(idx, _)| *idx).collect();
    if unique.len() != shares.len() {
        return Err(CryptoError::DuplicateShareIndex);
    }

    let indices: Vec<u32> = shares.iter().map(|(idx, _)| *idx).collect();

    let mut result = G1Projective::identity();
    for (idx, sig_point) in shares {
        let sig = decompress_g1(&sig_point.0)?;
        let lambda = lagrange_coefficient(*idx, &indices)?;
        result += G1Projective::from(sig) * lambda;
    }

    Ok(compress_g1(&result.to_affine()))
}

/// Verify an aggregated signature against the committee public key.
pub fn verify_threshold_signature(
    signature: &G1Point,
    message: &[u8],
    public_key: &G2Point,
) -> Result<(), CryptoError> {
    let sigma = decompress_g1(&signature.0)?;
    let pk = decompress_g2(&public_key.0)?;

    if bool::from(sigma.is_identity()) || bool::from(pk.is_identity()) {
        return Err(CryptoError::SignatureVerificationFailed);
    }

    let msg_point = hash_to_g1(message);
    if pairing(&sigma, &G2Affine::generator()) == pairing(&msg_point, &pk) {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

/// Compute Lagrange coefficient for index i given all indices.
///
/// λ_i = Π_{j≠i} (x_j / (x_j - x_i))
///
/// evaluated at x=0 for secret reconstruction.
pub(crate) fn lagrange_coefficient(i: u32, indices: &[u32]) -> Result<Scalar, CryptoError> {
    if i == 0 {
        return Err(CryptoError::LagrangeInterpolationFailed);
    }

    let i_scalar = Scalar::from(i as u64);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;

    for &j in indices {
        if j == i {
            continue;
        }

        let j_scalar = Scalar::from(j as u64);
        numerator *= j_scalar;

        let diff = j_scalar - i_scalar;
        if diff == Scalar::ZERO {
            return Err(CryptoError::LagrangeInterpolationFailed);
        }
        denominator *= diff;
    }

    let denom_inv = Option::<Scalar>::from(denominator.invert())
        .ok_or(CryptoError::LagrangeInterpolationFailed)?;

    Ok(numerator * denom_inv)
}

/// Generate a DLEQ proof (Discrete Log Equality).
///
/// Proves: log_g(pk) = log_h(sig)
///
/// Uses the Chaum-Pedersen protocol.
fn generate_dleq_proof<R: RngCore + CryptoRng>(
    secret: &Scalar,
    h: &G1Affine,   // H(m)
    pk: &G1Affine,  // g^sk
    sig: &G1Affine, // h^sk
    rng: &mut R,
) -> DiscreteLogProof {
    let k = random_scalar(rng);

    let g = G1Affine::generator();
    let r1 = (G1Projective::from(g) * k).to_affine(); // g^k
    let r2 = (G1Projective::from(*h) * k).to_affine(); // h^k

    let c = dleq_challenge(h, pk, sig, &r1, &r2);

    // s = k - c·sk
    let s = k - c * secret;

    DiscreteLogProof {
        challenge: TypesScalar(c.to_bytes()),
        response: TypesScalar(s.to_bytes()),
    }
}

/// Verify a DLEQ proof.
fn verify_dleq_proof(
    proof: &DiscreteLogProof,
    h: &G1Affine,
    pk: &G1Affine,
    sig: &G1Affine,
) -> Result<(), CryptoError> {
    let c = Option::<Scalar>::from(Scalar::from_bytes(&proof.challenge.0))
        .ok_or(CryptoError::InvalidScalar)?;
    let s = Option::<Scalar>::from(Scalar::from_bytes(&proof.response.0))
        .ok_or(CryptoError::InvalidScalar)?;

    let g = G1Affine::generator();

    // r1 = g^s · pk^c
    let r1 = (G1Projective::from(g) * s + G1Projective::from(*pk) * c).to_affine();

    // r2 = h^s · sig^c
    let r2 = (G1Projective::from(*h) * s + G1Projective::from(*sig) * c).to_affine();

    if c == dleq_challenge(h, pk, sig, &r1, &r2) {
        Ok(())
    } else {
        Err(CryptoError::DleqVerificationFailed)
    }
}

fn dleq_challenge(
    h: &G1Affine,
    pk: &G1Affine,
    sig: &G1Affine,
    r1: &G1Affine,
    r2: &G1Affine,
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(G1Affine::generator().to_compressed());
    hasher.update(h.to_compressed());
    hasher.update(pk.to_compressed());
    hasher.update(sig.to_compressed());
    hasher.update(r1.to_compressed());
    hasher.update(r2.to_compressed());
    scalar_from_digest(&hasher.finalize())
}
