//! Auction module error types.

use thiserror::Error;

use auction_types::AuctionId;

/// Errors that can occur in the auction module.
///
/// Every variant is a synchronous rejection: the call that returned it left
/// the registry, the ledger and the event log untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Auction not found: {0}")]
    NotFound(AuctionId),

    #[error("Auction already exists: {0}")]
    AlreadyExists(AuctionId),

    #[error("Auction not yet open: starts at {start_time}, now {now}")]
    NotYetOpen { start_time: u64, now: u64 },

    #[error("Auction expired: ended at {end_time}, now {now}")]
    Expired { end_time: u64, now: u64 },

    #[error("Auction is not active")]
    Inactive,

    #[error("Invalid ciphertext")]
    InvalidCiphertext,

    #[error("Invalid decryption proof")]
    InvalidProof,

    #[error("Auction already concluded")]
    AlreadyConcluded,

    #[error("Auction still active: ends at {end_time}, now {now}")]
    StillActive { end_time: u64, now: u64 },

    #[error("Bid index {index} out of range (count {count})")]
    IndexOutOfRange { index: u64, count: u64 },

    #[error("Decryption proof verification failed")]
    ProofVerificationFailed,

    #[error("Reveal already verified")]
    AlreadyVerified,

    #[error("Invalid auction window")]
    InvalidWindow,

    #[error("Invalid auction id")]
    InvalidAuctionId,

    #[error("Ciphertext engine error: {0}")]
    Engine(String),
}
