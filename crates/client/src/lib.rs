//! Client SDK for bidding in sealed-bid auctions.
//!
//! This crate provides a high-level API for:
//! - Encrypting bids under the network key, with a proof bound to the
//!   auction and bidder
//! - Submitting bids and call messages to a chain node
//! - Requesting reveals and concluding auctions
//! - Querying auction state

pub mod bid;
pub mod query;

pub use bid::{encrypt_bid, BidBuilder, BidError, PreparedBid};
pub use query::{AuctionClient, ClientError};
