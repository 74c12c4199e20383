//! Shamir secret sharing with Feldman commitments for the KMS committee key.
//!
//! A trusted dealer splits the committee secret s into n shares so that any t
//! of them reconstruct s (or, in practice, jointly sign with it). Feldman
//! commitments let each member check its share without learning s.

use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};

use auction_types::{G1Point, G2Point};

use crate::error::CryptoError;
use crate::ibe::{compress_g1, random_scalar};

/// One member's share of the committee secret.
#[derive(Clone, Debug)]
pub struct SecretShare {
    /// Member index (1-based)
    pub index: u32,
    pub secret: Scalar,
}

impl SecretShare {
    /// Member public key g1^sk_i, used to check DLEQ proofs.
    pub fn public_key(&self) -> G1Point {
        compress_g1(&self.public_key_affine())
    }

    pub fn public_key_affine(&self) -> G1Affine {
        (G1Projective::generator() * self.secret).to_affine()
    }
}

/// Generate a random polynomial of degree t-1 with given constant term.
///
/// Returns coefficients [a_0, a_1, ..., a_{t-1}] where a_0 is the secret.
pub fn generate_polynomial<R: RngCore + CryptoRng>(
    secret: &Scalar,
    threshold: usize,
    rng: &mut R,
) -> Vec<Scalar> {
    let mut coefficients = Vec::with_capacity(threshold);
    coefficients.push(*secret);

    for _ in 1..threshold {
        coefficients.push(random_scalar(rng));
    }

    coefficients
}

/// Evaluate polynomial at a point using Horner's method.
pub fn evaluate_polynomial(coefficients: &[Scalar], x: &Scalar) -> Scalar {
    let mut result = Scalar::ZERO;
    for coeff in coefficients.iter().rev() {
        result = result * x + coeff;
    }
    result
}

/// Split `secret` into `total` shares with reconstruction threshold `threshold`.
pub fn deal_shares<R: RngCore + CryptoRng>(
    secret: &Scalar,
    threshold: usize,
    total: usize,
    rng: &mut R,
) -> Result<Vec<SecretShare>, CryptoError> {
    deal_committed_shares(secret, threshold, total, rng).map(|(shares, _)| shares)
}

/// Like [`deal_shares`], also returning the Feldman commitments to the
/// polynomial. `commitments[0]` is g2^secret.
pub fn deal_committed_shares<R: RngCore + CryptoRng>(
    secret: &Scalar,
    threshold: usize,
    total: usize,
    rng: &mut R,
) -> Result<(Vec<SecretShare>, Vec<G2Point>), CryptoError> {
    if threshold == 0 || threshold > total || total > u32::MAX as usize {
        return Err(CryptoError::InvalidThreshold { threshold, total });
    }

    let coefficients = generate_polynomial(secret, threshold, rng);
    let shares = (1..=total as u32)
        .map(|index| SecretShare {
            index,
            secret: evaluate_polynomial(&coefficients, &Scalar::from(index as u64)),
        })
        .collect();

    Ok((shares, generate_commitments(&coefficients)))
}

/// Generate Feldman commitments C_i = g2^{a_i} for polynomial coefficients.
pub fn generate_commitments(coefficients: &[Scalar]) -> Vec<G2Point> {
    coefficients
        .iter()
        .map(|coeff| G2Point((G2Projective::generator() * coeff).to_affine().to_compressed()))
        .collect()
}

/// Verify a share against Feldman commitments: g2^{share} = Π C_i^{x^i}.
pub fn verify_share(share: &SecretShare, commitments: &[G2Point]) -> bool {
    let lhs = (G2Projective::generator() * share.secret).to_affine();

    let x = Scalar::from(share.index as u64);
    let mut x_power = Scalar::ONE;
    let mut rhs = G2Projective::identity();

    for commitment in commitments {
        let Some(c) = Option::<G2Affine>::from(G2Affine::from_compressed(&commitment.0)) else {
            return false;
        };
        rhs += G2Projective::from(c) * x_power;
        x_power *= x;
    }

    lhs == rhs.to_affine()
}
