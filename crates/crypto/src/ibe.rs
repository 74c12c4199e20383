//! Identity-Based Encryption using BLS12-381 pairings.
//!
//! Every encrypted value in the system, whether a bid submitted by a client or
//! the result of a homomorphic operation, is a Boneh-Franklin style ciphertext
//! under the network public key for [`auction_types::INPUT_IDENTITY`].
//!
//! # Encryption
//!
//! To encrypt a message `m` to identity `id`:
//! 1. Compute id_hash = H_1(id) ∈ G1
//! 2. Sample random scalar r
//! 3. Compute U = r·G2 (ephemeral public key)
//! 4. Compute shared = e(id_hash, MPK)^r
//! 5. Derive symmetric key from shared
//! 6. Encrypt m with AES-GCM
//!
//! # Decryption
//!
//! Given the extracted key σ = s·H_1(id):
//! 1. Compute shared = e(σ, U)
//! 2. Derive symmetric key from shared
//! 3. Decrypt ciphertext with AES-GCM

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use group::Curve;
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use auction_types::{EncryptedValue, G1Point, G2Point, ValueKind};

use crate::error::CryptoError;

/// Length of an encoded value payload: u64 little-endian plus kind tag.
pub const VALUE_PAYLOAD_LEN: usize = 9;

/// Domain separation tag for hashing identities and messages to G1.
const HASH_TO_G1_DST: &[u8] = b"SEALED_AUCTION_BLS12381G1_XMD:SHA-256_TAI_";

/// Parameters for IBE encryption.
#[derive(Clone, Debug)]
pub struct IbeParams {
    /// Master public key (MPK = s·G2 where s is the master secret)
    pub mpk: G2Affine,
}

impl IbeParams {
    /// Create IBE params from serialized G2 point.
    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self, CryptoError> {
        let mpk = decompress_g2(bytes)?;
        Ok(Self { mpk })
    }

    /// Create IBE params from G2Point type.
    pub fn from_g2_point(point: &G2Point) -> Result<Self, CryptoError> {
        Self::from_bytes(&point.0)
    }

    /// Create IBE params for a master secret.
    pub fn from_master_secret(master_secret: &Scalar) -> Self {
        Self {
            mpk: (G2Projective::generator() * master_secret).to_affine(),
        }
    }

    pub fn to_g2_point(&self) -> G2Point {
        compress_g2(&self.mpk)
    }
}

/// Encode a value and its kind as an encryption payload.
pub fn encode_value(value: u64, kind: ValueKind) -> [u8; VALUE_PAYLOAD_LEN] {
    let mut out = [0u8; VALUE_PAYLOAD_LEN];
    out[..8].copy_from_slice(&value.to_le_bytes());
    out[8] = kind as u8;
    out
}

/// Decode a payload produced by [`encode_value`].
pub fn decode_value(payload: &[u8]) -> Option<(u64, ValueKind)> {
    if payload.len() != VALUE_PAYLOAD_LEN {
        return None;
    }
    let kind = ValueKind::from_tag(payload[8])?;
    let mut value = [0u8; 8];
    value.copy_from_slice(&payload[..8]);
    let value = u64::from_le_bytes(value);
    if kind == ValueKind::Bool && value > 1 {
        return None;
    }
    Some((value, kind))
}

/// Encrypt a message to an identity.
pub fn encrypt<R: RngCore + CryptoRng>(
    params: &IbeParams,
    identity: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<EncryptedValue, CryptoError> {
    encrypt_with_randomness(params, identity, plaintext, rng).map(|(ciphertext, _)| ciphertext)
}

/// Encrypt a message and return the ephemeral scalar r alongside it.
///
/// The scalar is the witness for [`crate::input_proof::prove_encryption`] and
/// must be discarded after proving.
pub(crate) fn encrypt_with_randomness<R: RngCore + CryptoRng>(
    params: &IbeParams,
    identity: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<(EncryptedValue, Scalar), CryptoError> {
    // 1. Hash identity to G1
    let id_hash = hash_to_g1(identity);

    // 2. Sample random scalar r
    let r = random_scalar(rng);

    // 3. Compute ephemeral public key U = r·G2
    let u_affine = (G2Projective::generator() * r).to_affine();

    // 4. e(H(id), MPK)^r = e(r·H(id), MPK)
    let r_id_hash = (G1Projective::from(id_hash) * r).to_affine();
    let shared_gt = pairing(&r_id_hash, &params.mpk);

    // 5. Derive symmetric key from shared secret
    let key = derive_key_from_gt(&shared_gt)?;

    // 6. Encrypt with AES-GCM
    let mut nonce_bytes = [0u8; 12];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| {
        CryptoError::EncryptionFailed(format!("Failed to create cipher: {}", e))
    })?;

    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext_with_tag = cipher.encrypt(nonce, plaintext).map_err(|e| {
        CryptoError::EncryptionFailed(format!("AES-GCM encryption failed: {}", e))
    })?;

    // Split ciphertext and tag
    let tag_start = ciphertext_with_tag.len() - 16;
    let ciphertext = ciphertext_with_tag[..tag_start].to_vec();
    let mut tag = [0u8; 16];
    tag.copy_from_slice(&ciphertext_with_tag[tag_start..]);

    let encrypted = EncryptedValue {
        ephemeral_pubkey: compress_g2(&u_affine),
        ciphertext,
        tag,
        nonce: nonce_bytes,
    };

    Ok((encrypted, r))
}

/// Decrypt a ciphertext using the extracted identity key σ.
pub fn decrypt(
    ciphertext: &EncryptedValue,
    decryption_key: &G1Point,
) -> Result<Vec<u8>, CryptoError> {
    let sigma = decompress_g1(&decryption_key.0)?;
    let u = decompress_g2(&ciphertext.ephemeral_pubkey.0)?;

    // e(σ, U) = e(s·H(id), r·G2) = e(H(id), MPK)^r
    let shared_gt = pairing(&sigma, &u);

    let key = derive_key_from_gt(&shared_gt)?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::DecryptionFailed(format!("Failed to create cipher: {}", e)))?;

    let nonce = Nonce::from_slice(&ciphertext.nonce);

    let mut ct_with_tag = ciphertext.ciphertext.clone();
    ct_with_tag.extend_from_slice(&ciphertext.tag);

    cipher
        .decrypt(nonce, ct_with_tag.as_ref())
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Extract the identity key σ = s·H(id) from the master secret.
pub fn extract_identity_key(master_secret: &Scalar, identity: &[u8]) -> G1Point {
    let id_hash = hash_to_g1(identity);
    compress_g1(&(G1Projective::from(id_hash) * master_secret).to_affine())
}

/// Hash arbitrary data to a G1 point.
///
/// Try-and-increment: candidate x-coordinates are drawn from SHA-256 until one
/// lies on the curve, then the cofactor is cleared so the result is in the
/// prime-order subgroup with an unknown discrete log.
pub fn hash_to_g1(data: &[u8]) -> G1Affine {
    let mut counter = 0u32;
    loop {
        if let Some(point) = try_hash_to_g1(data, counter) {
            return point;
        }
        counter += 1;
    }
}

fn try_hash_to_g1(data: &[u8], counter: u32) -> Option<G1Affine> {
    let block = |index: u8| {
        Sha256::new()
            .chain_update(HASH_TO_G1_DST)
            .chain_update(data)
            .chain_update(counter.to_le_bytes())
            .chain_update([index])
            .finalize()
    };
    let h0 = block(0);
    let h1 = block(1);

    let mut x = [0u8; 48];
    x[..32].copy_from_slice(&h0);
    x[32..].copy_from_slice(&h1[..16]);

    // Compression flag set, infinity flag clear, sort flag from the hash.
    let sign = h1[16] & 1;
    x[0] = (x[0] & 0x1f) | 0x80 | (sign << 5);

    let candidate = Option::<G1Affine>::from(G1Affine::from_compressed_unchecked(&x))?;
    let point = G1Projective::from(candidate).clear_cofactor();
    if bool::from(point.is_identity()) {
        return None;
    }
    Some(point.to_affine())
}

/// Generate a random scalar.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_wide(&bytes)
}

/// Reduce a 32-byte digest to a scalar.
pub fn scalar_from_digest(digest: &[u8]) -> Scalar {
    let mut wide = [0u8; 64];
    let len = digest.len().min(64);
    wide[..len].copy_from_slice(&digest[..len]);
    Scalar::from_bytes_wide(&wide)
}

/// Derive a symmetric key from a GT element.
fn derive_key_from_gt(gt: &bls12_381::Gt) -> Result<[u8; 32], CryptoError> {
    let gt_bytes = gt_to_bytes(gt);

    let hk = Hkdf::<Sha256>::new(None, &gt_bytes);
    let mut key = [0u8; 32];
    hk.expand(b"SEALED-AUCTION-IBE-KEY", &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;

    Ok(key)
}

/// Serialize a GT element to bytes.
fn gt_to_bytes(gt: &bls12_381::Gt) -> Vec<u8> {
    // Gt has no canonical encoding in bls12_381; its debug form is deterministic.
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", gt).as_bytes());
    hasher.finalize().to_vec()
}

/// Compress a G1 point to bytes.
pub fn compress_g1(point: &G1Affine) -> G1Point {
    G1Point(point.to_compressed())
}

/// Decompress a G1 point from bytes.
pub fn decompress_g1(bytes: &[u8; 48]) -> Result<G1Affine, CryptoError> {
    Option::from(G1Affine::from_compressed(bytes)).ok_or(CryptoError::InvalidG1Point)
}

/// Compress a G2 point to bytes.
pub fn compress_g2(point: &G2Affine) -> G2Point {
    G2Point(point.to_compressed())
}

/// Decompress a G2 point from bytes.
pub fn decompress_g2(bytes: &[u8; 96]) -> Result<G2Affine, CryptoError> {
    Option::from(G2Affine::from_compressed(bytes)).ok_or(CryptoError::InvalidG2Point)
}
