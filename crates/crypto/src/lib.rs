//! BLS12-381 primitives for sealed-bid auctions.
//!
//! # Overview
//!
//! 1. **Inputs**: bid values are IBE-encrypted under the network public key to
//!    a fixed input identity. Only the ciphertext engine holds the extracted
//!    identity key.
//!
//! 2. **Input proofs**: each external ciphertext carries a Schnorr proof of
//!    knowledge of its encryption randomness, bound to the auction and bidder
//!    it is submitted for.
//!
//! 3. **Reveal signatures**: a t-of-n KMS committee signs the digest of
//!    (handles, clear values). Each member's partial signature carries a DLEQ
//!    proof; t partials aggregate into a BLS signature checkable against the
//!    committee public key with one pairing equation.
//!
//! 4. **Key dealing**: Shamir sharing with Feldman commitments splits the
//!    committee secret.

pub mod error;
pub mod ibe;
pub mod input_proof;
pub mod shamir;
pub mod threshold;

pub use error::CryptoError;
pub use ibe::{decrypt, decode_value, encode_value, encrypt, extract_identity_key, IbeParams};
pub use input_proof::{encrypt_with_proof, verify_encryption_proof};
pub use shamir::{deal_committed_shares, deal_shares, verify_share, SecretShare};
pub use threshold::{
    aggregate_partial_signatures, generate_partial_signature, verify_partial_signature,
    verify_threshold_signature,
};
