//! Append-only bid ledger for a single auction.

use borsh::{BorshDeserialize, BorshSerialize};

use auction_types::Bid;

use crate::error::AuctionError;

/// Ordered sequence of accepted bids.
///
/// Bids are only ever appended; there is no way to remove or reorder them.
#[derive(Clone, Debug, Default, BorshSerialize, BorshDeserialize)]
pub struct BidLedger {
    bids: Vec<Bid>,
}

impl BidLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bid and return its insertion index.
    pub fn append(&mut self, bid: Bid) -> u64 {
        self.bids.push(bid);
        self.count() - 1
    }

    pub fn count(&self) -> u64 {
        self.bids.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Get the bid at `index`.
    pub fn get(&self, index: u64) -> Result<&Bid, AuctionError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.bids.get(i))
            .ok_or(AuctionError::IndexOutOfRange {
                index,
                count: self.count(),
            })
    }

    /// Bids in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Bid> {
        self.bids.iter()
    }
}
