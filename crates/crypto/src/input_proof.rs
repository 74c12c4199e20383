//! Proof of well-formed encryption for external inputs.
//!
//! A client proves knowledge of the ephemeral scalar r behind U = r·G2 with a
//! Schnorr proof whose challenge binds the symmetric ciphertext body and the
//! [`InputContext`] (auction id and bidder). Without r nobody can produce a
//! proof, so a ciphertext copied from another bidder, or replayed into a
//! different auction, is rejected at ingestion.
//!
//! ```text
//! prover:   k ← random, R = k·G2, c = H(U, R, ctx, body), s = k + c·r
//! verifier: s·G2 == R + c·U
//! ```

use bls12_381::{G2Affine, G2Projective, Scalar};
use group::Curve;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use auction_types::{EncryptedValue, EncryptionProof, InputContext, Scalar as TypesScalar};

use crate::error::CryptoError;
use crate::ibe::{
    compress_g2, decompress_g2, encrypt_with_randomness, random_scalar, scalar_from_digest,
    IbeParams,
};

/// Encrypt a payload to `identity` and prove it was well formed.
pub fn encrypt_with_proof<R: RngCore + CryptoRng>(
    params: &IbeParams,
    identity: &[u8],
    plaintext: &[u8],
    context: &InputContext,
    rng: &mut R,
) -> Result<(EncryptedValue, EncryptionProof), CryptoError> {
    let (ciphertext, r) = encrypt_with_randomness(params, identity, plaintext, rng)?;
    let proof = prove_encryption(&r, &ciphertext, context, rng)?;
    Ok((ciphertext, proof))
}

/// Produce the Schnorr proof for a ciphertext encrypted with randomness `r`.
pub fn prove_encryption<R: RngCore + CryptoRng>(
    r: &Scalar,
    ciphertext: &EncryptedValue,
    context: &InputContext,
    rng: &mut R,
) -> Result<EncryptionProof, CryptoError> {
    let u = decompress_g2(&ciphertext.ephemeral_pubkey.0)?;

    let k = random_scalar(rng);
    let commitment = (G2Projective::generator() * k).to_affine();

    let c = challenge(&u, &commitment, ciphertext, context);
    let s = k + c * r;

    Ok(EncryptionProof {
        commitment: compress_g2(&commitment),
        response: TypesScalar(s.to_bytes()),
    })
}

/// Verify a proof of well-formed encryption in its submission context.
pub fn verify_encryption_proof(
    ciphertext: &EncryptedValue,
    proof: &EncryptionProof,
    context: &InputContext,
) -> Result<(), CryptoError> {
    let u = decompress_g2(&ciphertext.ephemeral_pubkey.0)?;
    if bool::from(u.is_identity()) {
        return Err(CryptoError::EncryptionProofFailed);
    }

    let commitment = decompress_g2(&proof.commitment.0)?;
    let s = Option::<Scalar>::from(Scalar::from_bytes(&proof.response.0))
        .ok_or(CryptoError::InvalidScalar)?;

    let c = challenge(&u, &commitment, ciphertext, context);

    let lhs = G2Projective::generator() * s;
    let rhs = G2Projective::from(commitment) + G2Projective::from(u) * c;

    if lhs.to_affine() == rhs.to_affine() {
        Ok(())
    } else {
        Err(CryptoError::EncryptionProofFailed)
    }
}

fn challenge(
    u: &G2Affine,
    commitment: &G2Affine,
    ciphertext: &EncryptedValue,
    context: &InputContext,
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(b"SEALED_AUCTION_INPUT_PROOF_V1");
    hasher.update(G2Affine::generator().to_compressed());
    hasher.update(u.to_compressed());
    hasher.update(commitment.to_compressed());
    hasher.update(context.digest());
    hasher.update(ciphertext.body_digest());
    scalar_from_digest(&hasher.finalize())
}
