//! Core type definitions for sealed-bid auctions over encrypted handles.
//!
//! This crate provides the shared data structures used across the auction system,
//! including curve point encodings, ciphertext handles, auction records, ledger
//! entries, published events and decryption proofs.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

pub mod abi;

pub use abi::{decode_clear_values, encode_clear_values, AbiError};

// =========================
// CRYPTOGRAPHIC PRIMITIVES
// =========================

/// Compressed G1 point on BLS12-381 (48 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G1Point(#[serde_as(as = "[_; 48]")] pub [u8; 48]);

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

/// Compressed G2 point on BLS12-381 (96 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 96]")] pub [u8; 96]);

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 96])
    }
}

/// Scalar field element (32 bytes, little-endian)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Scalar(#[serde_as(as = "[_; 32]")] pub [u8; 32]);

impl Default for Scalar {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

// =========================
// ENCRYPTED VALUES
// =========================

/// Kind of plaintext a ciphertext handle refers to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 0,
    Uint64 = 5,
}

impl ValueKind {
    /// Decode a kind from its tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ValueKind::Bool),
            5 => Some(ValueKind::Uint64),
            _ => None,
        }
    }
}

/// Opaque reference to an encrypted value.
///
/// The last byte carries the [`ValueKind`] tag; the rest is a digest chosen by
/// the ciphertext engine. The all-zero handle is the "uninitialized" handle and
/// never refers to a ciphertext.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    /// Position of the kind tag inside the handle.
    pub const KIND_BYTE: usize = 31;

    /// Build a handle from an engine digest, stamping the value kind.
    pub fn from_digest(digest: [u8; 32], kind: ValueKind) -> Self {
        let mut bytes = digest;
        bytes[Self::KIND_BYTE] = kind as u8;
        Self(bytes)
    }

    /// Kind of the referenced value, if the tag is recognised.
    pub fn kind(&self) -> Option<ValueKind> {
        ValueKind::from_tag(self.0[Self::KIND_BYTE])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex handle, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", self.to_hex())
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// IBE ciphertext of a single encrypted value.
///
/// Produced by the encryption client for bid inputs and by the ciphertext
/// engine for the results of homomorphic operations.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EncryptedValue {
    /// Ephemeral public key: U = r·G2
    pub ephemeral_pubkey: G2Point,

    /// AES-256-GCM encrypted payload (value || kind)
    pub ciphertext: Vec<u8>,

    /// Authentication tag
    pub tag: [u8; 16],

    /// Nonce for AEAD
    pub nonce: [u8; 12],
}

impl EncryptedValue {
    /// Digest of the symmetric part of the ciphertext.
    pub fn body_digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.ciphertext);
        hasher.update(self.tag);
        hasher.update(self.nonce);
        hasher.finalize().into()
    }
}

/// Proof that an [`EncryptedValue`] was produced by someone who knows its
/// encryption randomness, bound to the context it is submitted in.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EncryptionProof {
    /// Schnorr commitment R = k·G2
    pub commitment: G2Point,
    /// Response s = k + c·r
    pub response: Scalar,
}

/// Context an external ciphertext is bound to when it is ingested.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct InputContext {
    pub auction_id: AuctionId,
    pub bidder: Address,
}

impl InputContext {
    pub fn new(auction_id: impl Into<AuctionId>, bidder: Address) -> Self {
        Self {
            auction_id: auction_id.into(),
            bidder,
        }
    }

    /// Domain-separated digest of the context.
    pub fn digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"SEALED_AUCTION_INPUT_V1:");
        hasher.update((self.auction_id.len() as u32).to_le_bytes());
        hasher.update(self.auction_id.as_bytes());
        hasher.update(self.bidder);
        hasher.finalize().into()
    }
}

// =========================
// THRESHOLD DECRYPTION
// =========================

/// Partial reveal signature from a KMS committee member
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PartialDecryptionShare {
    pub validator_index: u32,
    pub partial_sig: G1Point,
    pub proof: DiscreteLogProof,
}

/// DLEQ proof for partial signature correctness
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DiscreteLogProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

/// Proof that ABI-encoded clear values are the decryptions of a handle list.
///
/// `signature` is the aggregated threshold BLS signature over the reveal
/// digest (see [`compute_reveal_digest`]).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub signature: G1Point,
    pub signers: Vec<u32>,
}

impl DecryptionProof {
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing into a Vec cannot fail.
        borsh::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

// =========================
// AUCTION TYPES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Auction identifier (item or asset id)
pub type AuctionId = String;

/// Lifecycle phase of an auction, derived from its timestamps and flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// Before start_time
    NotYetOpen,
    /// Accepting bids
    Open,
    /// Deactivated before the window closed
    Inactive,
    /// Window closed, awaiting reveal
    Expired,
    /// Winner revealed
    Concluded,
}

/// Who currently leads an auction, as far as the public can tell.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum HighestBidder {
    /// No bid accepted yet
    None,
    /// Encrypted ledger index of the leading bid
    Sealed(CiphertextHandle),
    /// Winner after a verified reveal
    Revealed(Address),
}

impl HighestBidder {
    pub fn is_none(&self) -> bool {
        matches!(self, HighestBidder::None)
    }
}

/// Registry entry for one auction.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub auction_id: AuctionId,
    pub creator: Address,

    // Timing
    pub start_time: u64,
    pub end_time: u64,

    // Flags
    pub active: bool,
    pub concluded: bool,

    // Running maximum, never decrypted by the core
    pub highest_bid: CiphertextHandle,
    pub highest_bidder_index: CiphertextHandle,
    pub highest_bidder: HighestBidder,

    /// Set once by a verified reveal
    pub outcome: Option<RevealedOutcome>,
}

impl AuctionRecord {
    /// Handles whose cleartexts conclude the auction, in reveal order.
    pub fn reveal_handles(&self) -> [CiphertextHandle; 2] {
        [self.highest_bid, self.highest_bidder_index]
    }
}

/// Public outcome committed after the reveal proof verified.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RevealedOutcome {
    pub winner: Option<Address>,
    pub winning_bid: u64,
    pub num_bids: u32,
    pub concluded_at: u64,
    pub proof_hash: [u8; 32],
}

/// A submitted bid (stored in the ledger)
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: Address,
    pub handle: CiphertextHandle,
    pub timestamp: u64,
}

/// Public view of an auction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionDetails {
    pub auction_id: AuctionId,
    pub start_time: u64,
    pub end_time: u64,
    pub highest_bidder: HighestBidder,
    pub active: bool,
}

/// Notifications published for indexers and UIs.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    AuctionCreated {
        auction_id: AuctionId,
        start_time: u64,
        end_time: u64,
    },
    BidPlaced {
        auction_id: AuctionId,
        bidder: Address,
    },
    AuctionConcluded {
        auction_id: AuctionId,
        winner: Option<Address>,
        winning_bid: u64,
    },
}

impl AuctionEvent {
    pub fn auction_id(&self) -> &str {
        match self {
            AuctionEvent::AuctionCreated { auction_id, .. }
            | AuctionEvent::BidPlaced { auction_id, .. }
            | AuctionEvent::AuctionConcluded { auction_id, .. } => auction_id,
        }
    }
}

// =========================
// HELPER FUNCTIONS
// =========================

/// IBE identity every bid input is encrypted to.
pub const INPUT_IDENTITY: &[u8] = b"SEALED_AUCTION_INPUT_IDENTITY_V1";

/// Compute the digest the KMS committee signs when revealing handles.
pub fn compute_reveal_digest(handles: &[CiphertextHandle], abi_clear_values: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"SEALED_AUCTION_REVEAL_V1");
    hasher.update((handles.len() as u32).to_le_bytes());
    for handle in handles {
        hasher.update(handle.0);
    }
    hasher.update(abi_clear_values);
    hasher.finalize().into()
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

/// Parse a hex address, left-aligned and zero padded to 32 bytes.
pub fn parse_address(s: &str) -> Option<Address> {
    let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
    if bytes.len() > 32 {
        return None;
    }
    let mut addr = [0u8; 32];
    addr[..bytes.len()].copy_from_slice(&bytes);
    Some(addr)
}
