//! RPC-compatible types for the mock chain.
//!
//! These are JSON-serializable versions of the core auction types. Binary
//! values (addresses, handles, ciphertexts, proofs) travel as hex strings; a
//! leading `0x` is accepted on input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_module::{AuctionSummary, CallOutcome};
use auction_types::{
    parse_address, Address, AuctionDetails, AuctionEvent, AuctionPhase, Bid, EncryptedValue,
    EncryptionProof, G2Point, HighestBidder, RevealedOutcome, Scalar,
};

/// Errors decoding RPC parameters.
#[derive(Debug, Error)]
pub enum RpcParseError {
    #[error("Invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{field} must be {expected} bytes, got {got}")]
    Length {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Invalid call message: {0}")]
    Call(String),
}

pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

pub fn decode_hex(field: &'static str, s: &str) -> Result<Vec<u8>, RpcParseError> {
    hex::decode(s.trim_start_matches("0x")).map_err(|source| RpcParseError::Hex { field, source })
}

pub fn decode_fixed<const N: usize>(field: &'static str, s: &str) -> Result<[u8; N], RpcParseError> {
    let bytes = decode_hex(field, s)?;
    let got = bytes.len();
    bytes.try_into().map_err(|_| RpcParseError::Length {
        field,
        expected: N,
        got,
    })
}

pub fn decode_address(s: &str) -> Result<Address, RpcParseError> {
    parse_address(s).ok_or_else(|| RpcParseError::Address(s.to_string()))
}

/// Block info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Keys clients need to talk to the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Hex-encoded G2 point (96 bytes) bids are encrypted under
    pub network_public_key: String,
    /// Hex-encoded G2 point (96 bytes) reveal proofs verify against
    pub kms_public_key: String,
    pub threshold: u32,
    pub validators: u32,
}

impl NetworkInfo {
    pub fn network_key(&self) -> Result<G2Point, RpcParseError> {
        decode_fixed("network_public_key", &self.network_public_key).map(G2Point)
    }
}

/// Parameters for opening an auction now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionParams {
    pub sender: String,
    pub auction_id: String,
    /// Seconds from the current chain time
    pub duration: u64,
}

/// Parameters for opening an auction over an explicit window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAuctionParams {
    pub sender: String,
    pub auction_id: String,
    pub start_time: u64,
    pub end_time: u64,
}

/// IBE ciphertext for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedValueRpc {
    /// Hex-encoded G2 point (96 bytes)
    pub ephemeral_pubkey: String,
    /// Hex-encoded ciphertext bytes
    pub ciphertext: String,
    /// Hex-encoded tag (16 bytes)
    pub tag: String,
    /// Hex-encoded nonce (12 bytes)
    pub nonce: String,
}

impl From<&EncryptedValue> for EncryptedValueRpc {
    fn from(ct: &EncryptedValue) -> Self {
        Self {
            ephemeral_pubkey: encode_hex(ct.ephemeral_pubkey.0),
            ciphertext: encode_hex(&ct.ciphertext),
            tag: encode_hex(ct.tag),
            nonce: encode_hex(ct.nonce),
        }
    }
}

impl TryFrom<&EncryptedValueRpc> for EncryptedValue {
    type Error = RpcParseError;

    fn try_from(rpc: &EncryptedValueRpc) -> Result<Self, Self::Error> {
        Ok(Self {
            ephemeral_pubkey: G2Point(decode_fixed("ephemeral_pubkey", &rpc.ephemeral_pubkey)?),
            ciphertext: decode_hex("ciphertext", &rpc.ciphertext)?,
            tag: decode_fixed("tag", &rpc.tag)?,
            nonce: decode_fixed("nonce", &rpc.nonce)?,
        })
    }
}

/// Proof of well-formed encryption for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionProofRpc {
    /// Hex-encoded G2 point (96 bytes)
    pub commitment: String,
    /// Hex-encoded scalar (32 bytes)
    pub response: String,
}

impl From<&EncryptionProof> for EncryptionProofRpc {
    fn from(proof: &EncryptionProof) -> Self {
        Self {
            commitment: encode_hex(proof.commitment.0),
            response: encode_hex(proof.response.0),
        }
    }
}

impl TryFrom<&EncryptionProofRpc> for EncryptionProof {
    type Error = RpcParseError;

    fn try_from(rpc: &EncryptionProofRpc) -> Result<Self, Self::Error> {
        Ok(Self {
            commitment: G2Point(decode_fixed("commitment", &rpc.commitment)?),
            response: Scalar(decode_fixed("response", &rpc.response)?),
        })
    }
}

/// Parameters for placing an encrypted bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidParams {
    pub sender: String,
    pub auction_id: String,
    pub ciphertext: EncryptedValueRpc,
    pub proof: EncryptionProofRpc,
}

/// Cleartexts and decryption proof for an auction's reveal handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealRpc {
    pub auction_id: String,
    /// Hex-encoded handles, in reveal order
    pub handles: Vec<String>,
    /// Decoded cleartexts, one per handle
    pub values: Vec<u64>,
    /// Hex-encoded ABI words
    pub clear_values: String,
    /// Hex-encoded decryption proof
    pub decryption_proof: String,
}

/// Parameters for concluding an auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcludeParams {
    pub sender: String,
    pub auction_id: String,
    /// Hex-encoded ABI words
    pub clear_values: String,
    /// Hex-encoded decryption proof
    pub decryption_proof: String,
}

impl ConcludeParams {
    pub fn from_reveal(sender: String, reveal: &RevealRpc) -> Self {
        Self {
            sender,
            auction_id: reveal.auction_id.clone(),
            clear_values: reveal.clear_values.clone(),
            decryption_proof: reveal.decryption_proof.clone(),
        }
    }
}

/// A borsh-encoded `AuctionCall`, hex on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCallParams {
    pub sender: String,
    pub call: String,
}

/// Public leader of an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HighestBidderRpc {
    None,
    Sealed { handle: String },
    Revealed { address: String },
}

impl From<&HighestBidder> for HighestBidderRpc {
    fn from(bidder: &HighestBidder) -> Self {
        match bidder {
            HighestBidder::None => Self::None,
            HighestBidder::Sealed(handle) => Self::Sealed {
                handle: handle.to_hex(),
            },
            HighestBidder::Revealed(address) => Self::Revealed {
                address: encode_hex(address),
            },
        }
    }
}

/// Auction details for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionDetailsRpc {
    pub auction_id: String,
    pub start_time: u64,
    pub end_time: u64,
    pub highest_bidder: HighestBidderRpc,
    pub active: bool,
}

impl From<&AuctionDetails> for AuctionDetailsRpc {
    fn from(details: &AuctionDetails) -> Self {
        Self {
            auction_id: details.auction_id.clone(),
            start_time: details.start_time,
            end_time: details.end_time,
            highest_bidder: (&details.highest_bidder).into(),
            active: details.active,
        }
    }
}

/// Ledger entry for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRpc {
    pub bidder: String,
    pub handle: String,
    pub timestamp: u64,
}

impl From<&Bid> for BidRpc {
    fn from(bid: &Bid) -> Self {
        Self {
            bidder: encode_hex(bid.bidder),
            handle: bid.handle.to_hex(),
            timestamp: bid.timestamp,
        }
    }
}

/// Revealed outcome for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRpc {
    pub winner: Option<String>,
    pub winning_bid: u64,
    pub num_bids: u32,
    pub concluded_at: u64,
    pub proof_hash: String,
}

impl From<&RevealedOutcome> for OutcomeRpc {
    fn from(outcome: &RevealedOutcome) -> Self {
        Self {
            winner: outcome.winner.map(encode_hex),
            winning_bid: outcome.winning_bid,
            num_bids: outcome.num_bids,
            concluded_at: outcome.concluded_at,
            proof_hash: encode_hex(outcome.proof_hash),
        }
    }
}

/// Listing entry for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionSummaryRpc {
    pub auction_id: String,
    pub creator: String,
    pub phase: String,
    pub start_time: u64,
    pub end_time: u64,
    pub num_bids: u64,
    pub outcome: Option<OutcomeRpc>,
}

impl From<&AuctionSummary> for AuctionSummaryRpc {
    fn from(summary: &AuctionSummary) -> Self {
        Self {
            auction_id: summary.auction_id.clone(),
            creator: encode_hex(summary.creator),
            phase: phase_name(summary.phase).to_string(),
            start_time: summary.start_time,
            end_time: summary.end_time,
            num_bids: summary.num_bids,
            outcome: summary.outcome.as_ref().map(Into::into),
        }
    }
}

pub fn phase_name(phase: AuctionPhase) -> &'static str {
    match phase {
        AuctionPhase::NotYetOpen => "not_yet_open",
        AuctionPhase::Open => "open",
        AuctionPhase::Inactive => "inactive",
        AuctionPhase::Expired => "expired",
        AuctionPhase::Concluded => "concluded",
    }
}

/// Published event for RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRpc {
    AuctionCreated {
        auction_id: String,
        start_time: u64,
        end_time: u64,
    },
    BidPlaced {
        auction_id: String,
        bidder: String,
    },
    AuctionConcluded {
        auction_id: String,
        winner: Option<String>,
        winning_bid: u64,
    },
}

impl From<&AuctionEvent> for EventRpc {
    fn from(event: &AuctionEvent) -> Self {
        match event {
            AuctionEvent::AuctionCreated {
                auction_id,
                start_time,
                end_time,
            } => Self::AuctionCreated {
                auction_id: auction_id.clone(),
                start_time: *start_time,
                end_time: *end_time,
            },
            AuctionEvent::BidPlaced { auction_id, bidder } => Self::BidPlaced {
                auction_id: auction_id.clone(),
                bidder: encode_hex(bidder),
            },
            AuctionEvent::AuctionConcluded {
                auction_id,
                winner,
                winning_bid,
            } => Self::AuctionConcluded {
                auction_id: auction_id.clone(),
                winner: winner.map(encode_hex),
                winning_bid: *winning_bid,
            },
        }
    }
}

/// Result of a submitted call message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallOutcomeRpc {
    Created { auction: AuctionDetailsRpc },
    BidAccepted { index: u64 },
    Concluded { outcome: OutcomeRpc },
}

impl From<&CallOutcome> for CallOutcomeRpc {
    fn from(outcome: &CallOutcome) -> Self {
        match outcome {
            CallOutcome::Created(details) => Self::Created {
                auction: details.into(),
            },
            CallOutcome::BidAccepted { index } => Self::BidAccepted { index: *index },
            CallOutcome::Concluded(outcome) => Self::Concluded {
                outcome: outcome.into(),
            },
        }
    }
}
