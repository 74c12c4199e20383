//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state. Every
//! per-auction query fails with `NotFound` for an unknown id.

use serde::{Deserialize, Serialize};

use auction_types::{
    Address, AuctionDetails, AuctionId, AuctionPhase, AuctionRecord, Bid, CiphertextHandle,
    RevealedOutcome,
};

use crate::error::AuctionError;
use crate::lifecycle;
use crate::state::{AuctionRegistry, AuctionSlot};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Public view of one auction.
    GetAuction { auction_id: AuctionId },

    /// Number of accepted bids.
    GetBidCount { auction_id: AuctionId },

    /// A ledger entry by insertion index.
    GetBid { auction_id: AuctionId, index: u64 },

    /// Handle of the running maximum.
    GetHighestBid { auction_id: AuctionId },

    /// Handles a conclusion must reveal, in order.
    GetRevealHandles { auction_id: AuctionId },

    /// Revealed outcome, once concluded.
    GetResult { auction_id: AuctionId },

    /// All auctions (paginated, sorted by id).
    ListAuctions { offset: u64, limit: u64 },

    /// Auctions currently accepting bids.
    ActiveAuctions,

    /// Closed auctions still waiting for their reveal.
    PendingReveal,
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Auction(AuctionDetails),
    BidCount(u64),
    Bid(Bid),
    HighestBid(CiphertextHandle),
    RevealHandles(Vec<CiphertextHandle>),
    Result(Option<RevealedOutcome>),
    AuctionList(Vec<AuctionSummary>),
    AuctionIds(Vec<AuctionId>),
}

/// Handle a query at time `now`.
pub fn handle_query(
    registry: &AuctionRegistry,
    query: AuctionQuery,
    now: u64,
) -> Result<AuctionQueryResponse, AuctionError> {
    Ok(match query {
        AuctionQuery::GetAuction { auction_id } => {
            AuctionQueryResponse::Auction(get_auction_details(registry, &auction_id, now)?)
        }

        AuctionQuery::GetBidCount { auction_id } => {
            AuctionQueryResponse::BidCount(get_bid_count(registry, &auction_id)?)
        }

        AuctionQuery::GetBid { auction_id, index } => {
            AuctionQueryResponse::Bid(get_bid(registry, &auction_id, index)?)
        }

        AuctionQuery::GetHighestBid { auction_id } => {
            AuctionQueryResponse::HighestBid(get_highest_bid(registry, &auction_id)?)
        }

        AuctionQuery::GetRevealHandles { auction_id } => {
            AuctionQueryResponse::RevealHandles(get_reveal_handles(registry, &auction_id)?)
        }

        AuctionQuery::GetResult { auction_id } => {
            AuctionQueryResponse::Result(get_result(registry, &auction_id)?)
        }

        AuctionQuery::ListAuctions { offset, limit } => AuctionQueryResponse::AuctionList(
            get_auction_summaries(registry, offset as usize, limit as usize, now),
        ),

        AuctionQuery::ActiveAuctions => AuctionQueryResponse::AuctionList(
            get_active_auctions(registry, now),
        ),

        AuctionQuery::PendingReveal => {
            AuctionQueryResponse::AuctionIds(get_pending_reveal(registry, now))
        }
    })
}

/// Public details of an auction.
///
/// `active` is reported as of `now`: an auction whose window has passed is
/// inactive even before anyone concludes it.
pub fn get_auction_details(
    registry: &AuctionRegistry,
    auction_id: &str,
    now: u64,
) -> Result<AuctionDetails, AuctionError> {
    let slot = registry.slot(auction_id)?;
    let slot = slot.lock();
    Ok(details(&slot.record, now))
}

pub fn details(record: &AuctionRecord, now: u64) -> AuctionDetails {
    AuctionDetails {
        auction_id: record.auction_id.clone(),
        start_time: record.start_time,
        end_time: record.end_time,
        highest_bidder: record.highest_bidder.clone(),
        active: lifecycle::is_active(record, now),
    }
}

pub fn get_bid_count(registry: &AuctionRegistry, auction_id: &str) -> Result<u64, AuctionError> {
    Ok(registry.slot(auction_id)?.lock().ledger.count())
}

pub fn get_bid(
    registry: &AuctionRegistry,
    auction_id: &str,
    index: u64,
) -> Result<Bid, AuctionError> {
    let slot = registry.slot(auction_id)?;
    let slot = slot.lock();
    slot.ledger.get(index).cloned()
}

pub fn get_highest_bid(
    registry: &AuctionRegistry,
    auction_id: &str,
) -> Result<CiphertextHandle, AuctionError> {
    Ok(registry.slot(auction_id)?.lock().record.highest_bid)
}

pub fn get_reveal_handles(
    registry: &AuctionRegistry,
    auction_id: &str,
) -> Result<Vec<CiphertextHandle>, AuctionError> {
    Ok(registry.slot(auction_id)?.lock().record.reveal_handles().to_vec())
}

pub fn get_result(
    registry: &AuctionRegistry,
    auction_id: &str,
) -> Result<Option<RevealedOutcome>, AuctionError> {
    Ok(registry.slot(auction_id)?.lock().record.outcome.clone())
}

/// Summary of an auction for listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub auction_id: AuctionId,
    pub creator: Address,
    pub phase: AuctionPhase,
    pub start_time: u64,
    pub end_time: u64,
    pub num_bids: u64,
    pub outcome: Option<RevealedOutcome>,
}

impl AuctionSummary {
    /// Create summary from a slot at time `now`.
    pub fn from_slot(slot: &AuctionSlot, now: u64) -> Self {
        let record = &slot.record;
        Self {
            auction_id: record.auction_id.clone(),
            creator: record.creator,
            phase: lifecycle::phase(record, now),
            start_time: record.start_time,
            end_time: record.end_time,
            num_bids: slot.ledger.count(),
            outcome: record.outcome.clone(),
        }
    }
}

/// Get auction summaries for listing.
pub fn get_auction_summaries(
    registry: &AuctionRegistry,
    offset: usize,
    limit: usize,
    now: u64,
) -> Vec<AuctionSummary> {
    registry
        .slots()
        .iter()
        .skip(offset)
        .take(limit)
        .map(|slot| AuctionSummary::from_slot(&slot.lock(), now))
        .collect()
}

/// Get active auctions (currently accepting bids).
pub fn get_active_auctions(registry: &AuctionRegistry, now: u64) -> Vec<AuctionSummary> {
    registry
        .slots()
        .iter()
        .filter_map(|slot| {
            let slot = slot.lock();
            lifecycle::is_active(&slot.record, now).then(|| AuctionSummary::from_slot(&slot, now))
        })
        .collect()
}

/// Get auctions whose window closed but which are not concluded yet.
pub fn get_pending_reveal(registry: &AuctionRegistry, now: u64) -> Vec<AuctionId> {
    registry
        .slots()
        .iter()
        .filter_map(|slot| {
            let slot = slot.lock();
            lifecycle::is_pending_reveal(&slot.record, now).then(|| slot.record.auction_id.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::HighestBidder;

    fn insert(registry: &AuctionRegistry, id: &str, start_time: u64, end_time: u64) {
        let slot = AuctionSlot::new(AuctionRecord {
            auction_id: id.to_string(),
            creator: [1u8; 32],
            start_time,
            end_time,
            active: true,
            concluded: false,
            highest_bid: CiphertextHandle([3u8; 32]),
            highest_bidder_index: CiphertextHandle([4u8; 32]),
            highest_bidder: HighestBidder::None,
            outcome: None,
        });
        registry.insert(id, slot, |_| ()).unwrap();
    }

    #[test]
    fn test_unknown_auction() {
        let registry = AuctionRegistry::new();
        for query in [
            AuctionQuery::GetAuction {
                auction_id: "x".into(),
            },
            AuctionQuery::GetBidCount {
                auction_id: "x".into(),
            },
            AuctionQuery::GetBid {
                auction_id: "x".into(),
                index: 0,
            },
            AuctionQuery::GetHighestBid {
                auction_id: "x".into(),
            },
        ] {
            assert_eq!(
                handle_query(&registry, query, 0),
                Err(AuctionError::NotFound("x".into()))
            );
        }
    }

    #[test]
    fn test_details_and_handles() {
        let registry = AuctionRegistry::new();
        insert(&registry, "nft-1", 1000, 4600);

        let details = get_auction_details(&registry, "nft-1", 2000).unwrap();
        assert!(details.active);
        assert_eq!(details.end_time, 4600);
        assert!(!get_auction_details(&registry, "nft-1", 5000).unwrap().active);

        assert_eq!(
            get_highest_bid(&registry, "nft-1").unwrap(),
            CiphertextHandle([3u8; 32])
        );
        assert_eq!(
            get_reveal_handles(&registry, "nft-1").unwrap(),
            vec![CiphertextHandle([3u8; 32]), CiphertextHandle([4u8; 32])]
        );
        assert_eq!(get_bid_count(&registry, "nft-1"), Ok(0));
        assert!(matches!(
            get_bid(&registry, "nft-1", 0),
            Err(AuctionError::IndexOutOfRange { index: 0, count: 0 })
        ));
        assert_eq!(get_result(&registry, "nft-1"), Ok(None));
    }

    #[test]
    fn test_listing_by_phase() {
        let registry = AuctionRegistry::new();
        insert(&registry, "a", 1000, 2000);
        insert(&registry, "b", 1500, 5000);
        insert(&registry, "c", 3000, 9000);

        let all = get_auction_summaries(&registry, 0, 10, 2500);
        let phases: Vec<AuctionPhase> = all.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                AuctionPhase::Expired,
                AuctionPhase::Open,
                AuctionPhase::NotYetOpen
            ]
        );

        assert_eq!(get_auction_summaries(&registry, 1, 1, 2500)[0].auction_id, "b");

        let active = get_active_auctions(&registry, 2500);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].auction_id, "b");

        assert_eq!(get_pending_reveal(&registry, 2500), vec!["a".to_string()]);
    }
}
