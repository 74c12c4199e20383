//! Event publication.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use auction_types::{AuctionEvent, Address};

/// Destination for auction events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AuctionEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: AuctionEvent) {
        (**self).emit(event)
    }
}

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RwLock<Vec<AuctionEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuctionEvent> {
        self.events.read().clone()
    }

    /// Events recorded at or after position `offset`.
    pub fn since(&self, offset: usize) -> Vec<AuctionEvent> {
        self.events.read().iter().skip(offset).cloned().collect()
    }

    pub fn for_auction(&self, auction_id: &str) -> Vec<AuctionEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.auction_id() == auction_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: AuctionEvent) {
        match &event {
            AuctionEvent::AuctionCreated {
                auction_id,
                start_time,
                end_time,
            } => info!(auction_id = %auction_id, start_time, end_time, "AuctionCreated"),
            AuctionEvent::BidPlaced { auction_id, bidder } => {
                info!(auction_id = %auction_id, bidder = %short_hex(bidder), "BidPlaced")
            }
            AuctionEvent::AuctionConcluded {
                auction_id,
                winner,
                winning_bid,
            } => info!(
                auction_id = %auction_id,
                winner = %winner.as_ref().map(short_hex).unwrap_or_else(|| "none".into()),
                winning_bid,
                "AuctionConcluded"
            ),
        }
        self.events.write().push(event);
    }
}

fn short_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(&address[..4]))
}
