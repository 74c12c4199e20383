//! Bid creation and encryption.

use rand::{CryptoRng, RngCore};
use thiserror::Error;

use auction_crypto::{encode_value, encrypt_with_proof, IbeParams};
use auction_module::AuctionCall;
use auction_types::{
    Address, EncryptedValue, EncryptionProof, G2Point, InputContext, ValueKind, INPUT_IDENTITY,
};
use mock_chain::types::PlaceBidParams;

/// Errors that can occur during bid creation.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("Invalid network public key")]
    InvalidNetworkKey,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// A prepared bid ready for submission.
#[derive(Debug, Clone)]
pub struct PreparedBid {
    /// IBE ciphertext of the bid value
    pub ciphertext: EncryptedValue,
    /// Proof of well-formed encryption, bound to `context`
    pub proof: EncryptionProof,
    /// Auction and bidder the proof is bound to
    pub context: InputContext,
    /// Original bid value (keep secret)
    pub bid_value: u64,
}

impl PreparedBid {
    /// RPC parameters for `auction_placeBid`.
    pub fn to_params(&self, sender: &str) -> PlaceBidParams {
        PlaceBidParams {
            sender: sender.to_string(),
            auction_id: self.context.auction_id.clone(),
            ciphertext: (&self.ciphertext).into(),
            proof: (&self.proof).into(),
        }
    }

    /// Call message placing this bid.
    pub fn into_call(self) -> AuctionCall {
        AuctionCall::PlaceBid {
            auction_id: self.context.auction_id,
            ciphertext: self.ciphertext,
            proof: self.proof,
        }
    }
}

/// Encrypt a bid for an auction.
///
/// The value is encrypted under the network key to the input identity, and
/// the proof binds the ciphertext to `(auction_id, bidder)`: the bid only
/// ingests when submitted by `bidder` to `auction_id`.
pub fn encrypt_bid<R: RngCore + CryptoRng>(
    network_key: &G2Point,
    auction_id: &str,
    bidder: Address,
    bid_value: u64,
    rng: &mut R,
) -> Result<PreparedBid, BidError> {
    let params = IbeParams::from_g2_point(network_key).map_err(|_| BidError::InvalidNetworkKey)?;
    let context = InputContext::new(auction_id, bidder);

    let (ciphertext, proof) = encrypt_with_proof(
        &params,
        INPUT_IDENTITY,
        &encode_value(bid_value, ValueKind::Uint64),
        &context,
        rng,
    )
    .map_err(|e| BidError::EncryptionFailed(e.to_string()))?;

    Ok(PreparedBid {
        ciphertext,
        proof,
        context,
        bid_value,
    })
}

/// Builder for creating bids.
pub struct BidBuilder {
    network_key: G2Point,
    auction_id: String,
    bidder: Address,
    bid_value: u64,
}

impl BidBuilder {
    pub fn new(network_key: G2Point, auction_id: impl Into<String>, bidder: Address) -> Self {
        Self {
            network_key,
            auction_id: auction_id.into(),
            bidder,
            bid_value: 0,
        }
    }

    /// Set the bid value.
    pub fn bid_value(mut self, value: u64) -> Self {
        self.bid_value = value;
        self
    }

    /// Build the prepared bid.
    pub fn build<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<PreparedBid, BidError> {
        encrypt_bid(
            &self.network_key,
            &self.auction_id,
            self.bidder,
            self.bid_value,
            rng,
        )
    }
}
