//! The auction house: registry, ciphertext engine, reveal verifier, clock
//! and event sink wired together behind a thread-safe API.
//!
//! Calls on the same auction are serialized on that auction's slot lock;
//! calls on different auctions run in parallel. Events are emitted after
//! the slot has been updated and while its lock is still held, so the
//! per-auction event order matches the ledger order.

use std::sync::Arc;

use tracing::{info, warn};

use auction_types::{
    Address, AuctionDetails, AuctionEvent, AuctionId, Bid, CiphertextHandle, EncryptedValue,
    EncryptionProof, RevealedOutcome,
};

use crate::call::{AuctionCall, CallOutcome};
use crate::clock::{Clock, SystemClock};
use crate::engine::CiphertextEngine;
use crate::error::AuctionError;
use crate::events::EventSink;
use crate::genesis::DefaultAuctionParams;
use crate::handlers::{
    handle_conclude_auction, handle_create_auction, handle_place_bid, window_from_duration,
    CallContext, HandlerResult,
};
use crate::queries::{self, AuctionQuery, AuctionQueryResponse, AuctionSummary};
use crate::reveal::{self, DecryptionProofVerifier, RevealedValues};
use crate::state::AuctionRegistry;

pub struct AuctionHouse<E, V, C = SystemClock> {
    registry: AuctionRegistry,
    engine: E,
    verifier: V,
    clock: C,
    events: Arc<dyn EventSink>,
    params: DefaultAuctionParams,
}

impl<E, V, C> AuctionHouse<E, V, C>
where
    E: CiphertextEngine,
    V: DecryptionProofVerifier,
    C: Clock,
{
    pub fn new(engine: E, verifier: V, clock: C, events: Arc<dyn EventSink>) -> Self {
        Self {
            registry: AuctionRegistry::new(),
            engine,
            verifier,
            clock,
            events,
            params: DefaultAuctionParams::default(),
        }
    }

    pub fn with_params(mut self, params: DefaultAuctionParams) -> Self {
        self.params = params;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Open an auction now, running for `duration` seconds.
    pub fn create_auction(
        &self,
        creator: Address,
        auction_id: &str,
        duration: u64,
    ) -> HandlerResult<AuctionDetails> {
        let now = self.clock.now();
        let (start_time, end_time) = window_from_duration(now, duration)?;
        self.open(creator, auction_id, start_time, end_time, now)
    }

    /// Open an auction over an explicit window.
    pub fn schedule_auction(
        &self,
        creator: Address,
        auction_id: &str,
        start_time: u64,
        end_time: u64,
    ) -> HandlerResult<AuctionDetails> {
        let now = self.clock.now();
        self.open(creator, auction_id, start_time, end_time, now)
    }

    fn open(
        &self,
        creator: Address,
        auction_id: &str,
        start_time: u64,
        end_time: u64,
        now: u64,
    ) -> HandlerResult<AuctionDetails> {
        let ctx = CallContext {
            sender: creator,
            timestamp: now,
        };
        if self.registry.contains(auction_id) {
            return Err(AuctionError::AlreadyExists(auction_id.to_string()));
        }
        let slot = handle_create_auction(
            &self.engine,
            &ctx,
            &self.params,
            auction_id,
            start_time,
            end_time,
        )?;

        // A racing creation of the same id is caught again under the map lock.
        self.registry.insert(auction_id, slot, |slot| {
            self.events.emit(AuctionEvent::AuctionCreated {
                auction_id: auction_id.to_string(),
                start_time,
                end_time,
            });
            queries::details(&slot.record, now)
        })
    }

    /// Submit an encrypted bid; returns its ledger index.
    pub fn place_bid(
        &self,
        auction_id: &str,
        ciphertext: &EncryptedValue,
        proof: &EncryptionProof,
        bidder: Address,
    ) -> HandlerResult<u64> {
        let slot = self.registry.slot(auction_id)?;
        let mut slot = slot.lock();
        let ctx = CallContext {
            sender: bidder,
            timestamp: self.clock.now(),
        };

        let index = handle_place_bid(&mut slot, &self.engine, &ctx, ciphertext, proof)
            .inspect_err(|err| warn!(auction_id, error = %err, "Bid rejected"))?;

        self.events.emit(AuctionEvent::BidPlaced {
            auction_id: auction_id.to_string(),
            bidder,
        });
        Ok(index)
    }

    /// Conclude with revealed cleartexts for the auction's reveal handles.
    pub fn conclude_auction(
        &self,
        auction_id: &str,
        clear_values: &[u8],
        decryption_proof: &[u8],
        caller: Address,
    ) -> HandlerResult<RevealedOutcome> {
        let slot = self.registry.slot(auction_id)?;
        let mut slot = slot.lock();
        let ctx = CallContext {
            sender: caller,
            timestamp: self.clock.now(),
        };

        let outcome = handle_conclude_auction(
            &mut slot,
            &self.engine,
            &self.verifier,
            &ctx,
            clear_values,
            decryption_proof,
        )
        .inspect_err(|err| warn!(auction_id, error = %err, "Conclusion rejected"))?;

        info!(
            auction_id,
            winning_bid = outcome.winning_bid,
            num_bids = outcome.num_bids,
            "Auction concluded"
        );
        self.events.emit(AuctionEvent::AuctionConcluded {
            auction_id: auction_id.to_string(),
            winner: outcome.winner,
            winning_bid: outcome.winning_bid,
        });
        Ok(outcome)
    }

    /// Check a reveal against an auction without concluding it.
    pub fn verify_reveal(
        &self,
        auction_id: &str,
        handles: &[CiphertextHandle],
        clear_values: &[u8],
        proof: &[u8],
    ) -> HandlerResult<RevealedValues> {
        let slot = self.registry.slot(auction_id)?;
        let slot = slot.lock();
        reveal::verify_reveal(
            &self.engine,
            &self.verifier,
            &slot.record,
            handles,
            clear_values,
            proof,
        )
    }

    /// Execute a call message on behalf of `sender`.
    pub fn dispatch(&self, sender: Address, call: AuctionCall) -> HandlerResult<CallOutcome> {
        match call {
            AuctionCall::CreateAuction {
                auction_id,
                duration,
            } => self
                .create_auction(sender, &auction_id, duration)
                .map(CallOutcome::Created),

            AuctionCall::ScheduleAuction {
                auction_id,
                start_time,
                end_time,
            } => self
                .schedule_auction(sender, &auction_id, start_time, end_time)
                .map(CallOutcome::Created),

            AuctionCall::PlaceBid {
                auction_id,
                ciphertext,
                proof,
            } => self
                .place_bid(&auction_id, &ciphertext, &proof, sender)
                .map(|index| CallOutcome::BidAccepted { index }),

            AuctionCall::ConcludeAuction {
                auction_id,
                clear_values,
                decryption_proof,
            } => self
                .conclude_auction(&auction_id, &clear_values, &decryption_proof, sender)
                .map(CallOutcome::Concluded),
        }
    }

    // === Queries ===

    pub fn query(&self, query: AuctionQuery) -> HandlerResult<AuctionQueryResponse> {
        queries::handle_query(&self.registry, query, self.clock.now())
    }

    pub fn get_auction_details(&self, auction_id: &str) -> HandlerResult<AuctionDetails> {
        queries::get_auction_details(&self.registry, auction_id, self.clock.now())
    }

    pub fn get_bid_count(&self, auction_id: &str) -> HandlerResult<u64> {
        queries::get_bid_count(&self.registry, auction_id)
    }

    pub fn get_bid(&self, auction_id: &str, index: u64) -> HandlerResult<Bid> {
        queries::get_bid(&self.registry, auction_id, index)
    }

    pub fn get_highest_bid(&self, auction_id: &str) -> HandlerResult<CiphertextHandle> {
        queries::get_highest_bid(&self.registry, auction_id)
    }

    pub fn get_reveal_handles(&self, auction_id: &str) -> HandlerResult<Vec<CiphertextHandle>> {
        queries::get_reveal_handles(&self.registry, auction_id)
    }

    pub fn get_result(&self, auction_id: &str) -> HandlerResult<Option<RevealedOutcome>> {
        queries::get_result(&self.registry, auction_id)
    }

    pub fn list_auctions(&self, offset: usize, limit: usize) -> Vec<AuctionSummary> {
        queries::get_auction_summaries(&self.registry, offset, limit, self.clock.now())
    }

    pub fn active_auctions(&self) -> Vec<AuctionSummary> {
        queries::get_active_auctions(&self.registry, self.clock.now())
    }

    pub fn pending_reveal(&self) -> Vec<AuctionId> {
        queries::get_pending_reveal(&self.registry, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::AuctionError;
    use crate::events::EventLog;
    use crate::testing::{ClearEngine, ClearVerifier};
    use auction_types::{encode_clear_values, HighestBidder, InputContext};
    use std::thread;

    const SELLER: Address = [0x01; 32];
    const ALICE: Address = [0xAA; 32];
    const BOB: Address = [0xBB; 32];
    const CAROL: Address = [0xCC; 32];

    type TestHouse = AuctionHouse<Arc<ClearEngine>, ClearVerifier, Arc<ManualClock>>;

    struct Fixture {
        house: TestHouse,
        engine: Arc<ClearEngine>,
        clock: Arc<ManualClock>,
        log: Arc<EventLog>,
    }

    fn fixture(now: u64) -> Fixture {
        let (engine, verifier) = ClearEngine::shared();
        let clock = Arc::new(ManualClock::new(now));
        let log = Arc::new(EventLog::new());
        let house = AuctionHouse::new(
            Arc::clone(&engine),
            verifier,
            Arc::clone(&clock),
            log.clone(),
        );
        Fixture {
            house,
            engine,
            clock,
            log,
        }
    }

    impl Fixture {
        fn bid_at(&self, id: &str, bidder: Address, value: u64, at: u64) -> HandlerResult<u64> {
            self.clock.set(at);
            let (ct, proof) = ClearEngine::encrypt_input(value, &InputContext::new(id, bidder));
            self.house.place_bid(id, &ct, &proof, bidder)
        }

        fn reveal(&self, id: &str) -> (Vec<u8>, Vec<u8>) {
            let handles = self.house.get_reveal_handles(id).unwrap();
            self.engine.public_decrypt(&handles).unwrap()
        }
    }

    #[test]
    fn test_nft_scenario() {
        let f = fixture(1000);
        let details = f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        assert_eq!((details.start_time, details.end_time), (1000, 4600));
        assert!(details.active);
        assert!(details.highest_bidder.is_none());

        f.bid_at("nft-1", ALICE, 50, 1100).unwrap();
        f.bid_at("nft-1", BOB, 80, 1200).unwrap();
        f.bid_at("nft-1", CAROL, 30, 1300).unwrap();
        assert_eq!(f.house.get_bid_count("nft-1"), Ok(3));
        assert!(matches!(
            f.house.get_auction_details("nft-1").unwrap().highest_bidder,
            HighestBidder::Sealed(_)
        ));

        f.clock.set(4700);
        let (clear, proof) = f.reveal("nft-1");
        let outcome = f
            .house
            .conclude_auction("nft-1", &clear, &proof, SELLER)
            .unwrap();
        assert_eq!(outcome.winner, Some(BOB));
        assert_eq!(outcome.winning_bid, 80);

        assert_eq!(
            f.log.events().last(),
            Some(&AuctionEvent::AuctionConcluded {
                auction_id: "nft-1".into(),
                winner: Some(BOB),
                winning_bid: 80,
            })
        );
        assert_eq!(f.log.for_auction("nft-1").len(), 5);

        let details = f.house.get_auction_details("nft-1").unwrap();
        assert!(!details.active);
        assert_eq!(details.highest_bidder, HighestBidder::Revealed(BOB));
        assert_eq!(f.house.get_bid("nft-1", 1).unwrap().bidder, BOB);
    }

    #[test]
    fn test_bid_after_end_is_expired() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        f.bid_at("nft-1", ALICE, 50, 1100).unwrap();
        let events = f.log.len();

        let result = f.bid_at("nft-1", BOB, 80, 5000);
        assert_eq!(
            result,
            Err(AuctionError::Expired {
                end_time: 4600,
                now: 5000
            })
        );
        assert_eq!(f.house.get_bid_count("nft-1"), Ok(1));
        assert_eq!(f.log.len(), events);
    }

    #[test]
    fn test_scheduled_auction_not_yet_open() {
        let f = fixture(1000);
        f.house
            .schedule_auction(SELLER, "later", 2000, 5600)
            .unwrap();

        assert!(!f.house.get_auction_details("later").unwrap().active);
        assert!(matches!(
            f.bid_at("later", ALICE, 10, 1500),
            Err(AuctionError::NotYetOpen { .. })
        ));
        assert_eq!(f.bid_at("later", ALICE, 10, 2000), Ok(0));
    }

    #[test]
    fn test_duplicate_and_unknown_auction() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();

        assert_eq!(
            f.house.create_auction(SELLER, "nft-1", 3600).err(),
            Some(AuctionError::AlreadyExists("nft-1".into()))
        );
        assert_eq!(
            f.bid_at("nope", ALICE, 1, 1100),
            Err(AuctionError::NotFound("nope".into()))
        );
        assert_eq!(
            f.house.get_highest_bid("nope"),
            Err(AuctionError::NotFound("nope".into()))
        );
        assert_eq!(f.log.len(), 1);
    }

    #[test]
    fn test_second_conclusion_rejected() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        f.bid_at("nft-1", ALICE, 50, 1100).unwrap();

        f.clock.set(4700);
        let (clear, proof) = f.reveal("nft-1");
        let first = f
            .house
            .conclude_auction("nft-1", &clear, &proof, SELLER)
            .unwrap();

        assert_eq!(
            f.house.conclude_auction("nft-1", &clear, &proof, SELLER),
            Err(AuctionError::AlreadyConcluded)
        );
        let handles = f.house.get_reveal_handles("nft-1").unwrap();
        assert_eq!(
            f.house.verify_reveal("nft-1", &handles, &clear, &proof),
            Err(AuctionError::AlreadyVerified)
        );
        assert_eq!(f.house.get_result("nft-1"), Ok(Some(first)));
    }

    #[test]
    fn test_bad_proof_leaves_auction_open_for_reveal() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        f.bid_at("nft-1", ALICE, 50, 1100).unwrap();

        f.clock.set(4700);
        let (_, proof) = f.reveal("nft-1");
        let result =
            f.house
                .conclude_auction("nft-1", &encode_clear_values(&[500, 0]), &proof, SELLER);
        assert_eq!(result, Err(AuctionError::InvalidProof));

        assert_eq!(f.house.get_result("nft-1"), Ok(None));
        assert_eq!(f.house.pending_reveal(), vec!["nft-1".to_string()]);

        let (clear, proof) = f.reveal("nft-1");
        assert!(f.house.conclude_auction("nft-1", &clear, &proof, SELLER).is_ok());
        assert!(f.house.pending_reveal().is_empty());
    }

    #[test]
    fn test_verify_reveal_mapping() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        f.bid_at("nft-1", ALICE, 42, 1100).unwrap();

        let handles = f.house.get_reveal_handles("nft-1").unwrap();
        let (clear, proof) = f.reveal("nft-1");
        let values = f
            .house
            .verify_reveal("nft-1", &handles, &clear, &proof)
            .unwrap();

        assert_eq!(values, vec![(handles[0], 42), (handles[1], 0)]);
        // Verification alone does not conclude.
        assert_eq!(f.house.get_result("nft-1"), Ok(None));
    }

    #[test]
    fn test_dispatch_calls() {
        let f = fixture(1000);
        let created = f
            .house
            .dispatch(
                SELLER,
                AuctionCall::CreateAuction {
                    auction_id: "nft-1".into(),
                    duration: 600,
                },
            )
            .unwrap();
        assert!(matches!(created, CallOutcome::Created(_)));

        let (ciphertext, proof) =
            ClearEngine::encrypt_input(7, &InputContext::new("nft-1", ALICE));
        let call = AuctionCall::PlaceBid {
            auction_id: "nft-1".into(),
            ciphertext,
            proof,
        };
        let decoded = AuctionCall::from_bytes(&call.to_bytes()).unwrap();
        assert_eq!(
            f.house.dispatch(ALICE, decoded),
            Ok(CallOutcome::BidAccepted { index: 0 })
        );

        let response = f
            .house
            .query(AuctionQuery::GetBidCount {
                auction_id: "nft-1".into(),
            })
            .unwrap();
        assert_eq!(response, AuctionQueryResponse::BidCount(1));
    }

    #[test]
    fn test_concurrent_bids_across_auctions() {
        let f = fixture(1000);
        for id in ["a", "b", "c", "d"] {
            f.house.create_auction(SELLER, id, 3600).unwrap();
        }
        f.clock.set(1100);

        let house = &f.house;
        thread::scope(|scope| {
            for (n, id) in ["a", "b", "c", "d"].into_iter().enumerate() {
                scope.spawn(move || {
                    for value in 0..20u64 {
                        let bidder = [n as u8 + value as u8; 32];
                        let (ct, proof) =
                            ClearEngine::encrypt_input(value, &InputContext::new(id, bidder));
                        house.place_bid(id, &ct, &proof, bidder).unwrap();
                    }
                });
            }
        });

        for id in ["a", "b", "c", "d"] {
            assert_eq!(house.get_bid_count(id), Ok(20));
            let highest = house.get_highest_bid(id).unwrap();
            assert_eq!(f.engine.value_of(&highest), Some(19));
        }
        assert_eq!(f.house.active_auctions().len(), 4);
    }

    #[test]
    fn test_concurrent_bids_on_one_auction() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        f.clock.set(1100);

        let values = [10u64, 40, 25, 40, 5, 40, 30, 15];
        let barrier = std::sync::Barrier::new(values.len());
        let house = &f.house;
        thread::scope(|scope| {
            for (n, value) in values.into_iter().enumerate() {
                let barrier = &barrier;
                scope.spawn(move || {
                    let bidder = [n as u8 + 1; 32];
                    let (ct, proof) =
                        ClearEngine::encrypt_input(value, &InputContext::new("nft-1", bidder));
                    barrier.wait();
                    house.place_bid("nft-1", &ct, &proof, bidder).unwrap();
                });
            }
        });
        assert_eq!(house.get_bid_count("nft-1"), Ok(values.len() as u64));

        // The leader is whoever reached 40 first in ledger order.
        let first_max = (0..values.len() as u64)
            .map(|i| house.get_bid("nft-1", i).unwrap().bidder)
            .find(|bidder| values[bidder[0] as usize - 1] == 40)
            .unwrap();

        f.clock.set(4700);
        let (clear, proof) = f.reveal("nft-1");
        let outcome = house.conclude_auction("nft-1", &clear, &proof, SELLER).unwrap();
        assert_eq!(outcome.winning_bid, 40);
        assert_eq!(outcome.winner, Some(first_max));
        assert_eq!(outcome.num_bids, values.len() as u32);
    }

    #[test]
    fn test_concurrent_conclusions_on_one_auction() {
        let f = fixture(1000);
        f.house.create_auction(SELLER, "nft-1", 3600).unwrap();
        f.bid_at("nft-1", ALICE, 50, 1100).unwrap();
        f.bid_at("nft-1", BOB, 80, 1200).unwrap();

        f.clock.set(4700);
        let (clear, proof) = f.reveal("nft-1");

        let callers = 6;
        let barrier = std::sync::Barrier::new(callers);
        let house = &f.house;
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..callers)
                .map(|_| {
                    let (barrier, clear, proof) = (&barrier, &clear, &proof);
                    scope.spawn(move || {
                        barrier.wait();
                        house.conclude_auction("nft-1", clear, proof, SELLER)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| *err == AuctionError::AlreadyConcluded));

        let concluded = f
            .log
            .for_auction("nft-1")
            .into_iter()
            .filter(|e| matches!(e, AuctionEvent::AuctionConcluded { .. }))
            .count();
        assert_eq!(concluded, 1);
        assert_eq!(
            house.get_result("nft-1").unwrap().unwrap().winner,
            Some(BOB)
        );
    }

    #[test]
    fn test_created_event_precedes_racing_bids() {
        let f = fixture(1000);
        let house = &f.house;
        let barrier = std::sync::Barrier::new(2);

        thread::scope(|scope| {
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                house.create_auction(SELLER, "nft-1", 3600).unwrap();
            });
            scope.spawn(move || {
                let (ct, proof) =
                    ClearEngine::encrypt_input(7, &InputContext::new("nft-1", ALICE));
                barrier.wait();
                // Retry until the auction exists.
                loop {
                    match house.place_bid("nft-1", &ct, &proof, ALICE) {
                        Err(AuctionError::NotFound(_)) => thread::yield_now(),
                        other => {
                            other.unwrap();
                            break;
                        }
                    }
                }
            });
        });

        let events = f.log.for_auction("nft-1");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AuctionEvent::AuctionCreated { .. }));
        assert!(matches!(events[1], AuctionEvent::BidPlaced { .. }));
    }
}
