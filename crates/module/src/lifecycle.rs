//! Auction phases, derived from the clock and the record's flags.
//!
//! Phases are never stored. `concluded` is the only terminal flag; the rest
//! follows from `(now, start_time, end_time, active)`.

use auction_types::{AuctionPhase, AuctionRecord};

use crate::error::AuctionError;

/// Current phase of an auction.
pub fn phase(record: &AuctionRecord, now: u64) -> AuctionPhase {
    if record.concluded {
        AuctionPhase::Concluded
    } else if now < record.start_time {
        AuctionPhase::NotYetOpen
    } else if now > record.end_time {
        AuctionPhase::Expired
    } else if !record.active {
        AuctionPhase::Inactive
    } else {
        AuctionPhase::Open
    }
}

/// Check that a bid placed at `now` may be accepted.
pub fn ensure_accepting_bids(record: &AuctionRecord, now: u64) -> Result<(), AuctionError> {
    if now < record.start_time {
        return Err(AuctionError::NotYetOpen {
            start_time: record.start_time,
            now,
        });
    }
    if now > record.end_time {
        return Err(AuctionError::Expired {
            end_time: record.end_time,
            now,
        });
    }
    if !record.active || record.concluded {
        return Err(AuctionError::Inactive);
    }
    Ok(())
}

/// Check that the auction may be concluded at `now`.
pub fn ensure_concludable(record: &AuctionRecord, now: u64) -> Result<(), AuctionError> {
    if now <= record.end_time {
        return Err(AuctionError::StillActive {
            end_time: record.end_time,
            now,
        });
    }
    if record.concluded {
        return Err(AuctionError::AlreadyConcluded);
    }
    Ok(())
}

/// Whether the auction is publicly reported as active at `now`.
pub fn is_active(record: &AuctionRecord, now: u64) -> bool {
    phase(record, now) == AuctionPhase::Open
}

/// Whether the auction has closed and still waits for its reveal.
pub fn is_pending_reveal(record: &AuctionRecord, now: u64) -> bool {
    phase(record, now) == AuctionPhase::Expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::{CiphertextHandle, HighestBidder};

    fn record() -> AuctionRecord {
        AuctionRecord {
            auction_id: "nft-1".into(),
            creator: [0u8; 32],
            start_time: 1000,
            end_time: 4600,
            active: true,
            concluded: false,
            highest_bid: CiphertextHandle::default(),
            highest_bidder_index: CiphertextHandle::default(),
            highest_bidder: HighestBidder::None,
            outcome: None,
        }
    }

    #[test]
    fn test_phase_boundaries() {
        let r = record();
        assert_eq!(phase(&r, 999), AuctionPhase::NotYetOpen);
        assert_eq!(phase(&r, 1000), AuctionPhase::Open);
        assert_eq!(phase(&r, 4600), AuctionPhase::Open);
        assert_eq!(phase(&r, 4601), AuctionPhase::Expired);
    }

    #[test]
    fn test_inactive_and_concluded() {
        let mut r = record();
        r.active = false;
        assert_eq!(phase(&r, 2000), AuctionPhase::Inactive);
        assert_eq!(ensure_accepting_bids(&r, 2000), Err(AuctionError::Inactive));

        r.concluded = true;
        assert_eq!(phase(&r, 5000), AuctionPhase::Concluded);
        assert!(!is_pending_reveal(&r, 5000));
    }

    #[test]
    fn test_bid_window_errors() {
        let r = record();
        assert_eq!(
            ensure_accepting_bids(&r, 500),
            Err(AuctionError::NotYetOpen {
                start_time: 1000,
                now: 500
            })
        );
        assert_eq!(
            ensure_accepting_bids(&r, 5000),
            Err(AuctionError::Expired {
                end_time: 4600,
                now: 5000
            })
        );
        assert!(ensure_accepting_bids(&r, 1000).is_ok());
        assert!(ensure_accepting_bids(&r, 4600).is_ok());
    }

    #[test]
    fn test_concludable() {
        let mut r = record();
        assert!(matches!(
            ensure_concludable(&r, 4600),
            Err(AuctionError::StillActive { .. })
        ));
        assert!(ensure_concludable(&r, 4601).is_ok());
        assert!(is_pending_reveal(&r, 4601));

        r.concluded = true;
        assert_eq!(ensure_concludable(&r, 4700), Err(AuctionError::AlreadyConcluded));
    }
}
