//! Call handlers for the auction module.
//!
//! Each handler runs every fallible step (validation, ciphertext engine
//! calls, proof verification) before it touches the slot, so an error
//! leaves the auction exactly as it was.

use tracing::{debug, info};

use auction_types::{
    sha256, Address, AuctionRecord, Bid, CiphertextHandle, EncryptedValue, EncryptionProof,
    HighestBidder, InputContext, RevealedOutcome,
};

use crate::engine::{CiphertextEngine, EngineError};
use crate::error::AuctionError;
use crate::genesis::DefaultAuctionParams;
use crate::lifecycle::{ensure_accepting_bids, ensure_concludable};
use crate::reveal::{verify_reveal, DecryptionProofVerifier};
use crate::state::AuctionSlot;

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current timestamp (unix seconds)
    pub timestamp: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Validate a window and build the slot for a new auction.
///
/// The running maximum and the leader index both start as encrypted zero
/// and are flagged publicly decryptable, so an auction without bids can
/// still be concluded.
pub fn handle_create_auction<E: CiphertextEngine + ?Sized>(
    engine: &E,
    ctx: &CallContext,
    params: &DefaultAuctionParams,
    auction_id: &str,
    start_time: u64,
    end_time: u64,
) -> HandlerResult<AuctionSlot> {
    if auction_id.is_empty() {
        return Err(AuctionError::InvalidAuctionId);
    }
    if start_time > end_time || end_time < ctx.timestamp {
        return Err(AuctionError::InvalidWindow);
    }
    let duration = end_time - start_time;
    if duration < params.min_duration || duration > params.max_duration {
        return Err(AuctionError::InvalidWindow);
    }

    let highest_bid = engine.trivial_encrypt(0)?;
    let highest_bidder_index = engine.trivial_encrypt(0)?;
    engine.mark_publicly_decryptable(&highest_bid)?;
    engine.mark_publicly_decryptable(&highest_bidder_index)?;

    info!(auction_id, start_time, end_time, "Creating auction");

    Ok(AuctionSlot::new(AuctionRecord {
        auction_id: auction_id.to_string(),
        creator: ctx.sender,
        start_time,
        end_time,
        active: true,
        concluded: false,
        highest_bid,
        highest_bidder_index,
        highest_bidder: HighestBidder::None,
        outcome: None,
    }))
}

/// Window for an auction that opens at `now` and runs for `duration`.
pub fn window_from_duration(now: u64, duration: u64) -> HandlerResult<(u64, u64)> {
    let end_time = now.checked_add(duration).ok_or(AuctionError::InvalidWindow)?;
    Ok((now, end_time))
}

/// Handle PlaceBid: ingest the ciphertext, fold it into the running maximum
/// and append it to the ledger. Returns the bid's ledger index.
pub fn handle_place_bid<E: CiphertextEngine + ?Sized>(
    slot: &mut AuctionSlot,
    engine: &E,
    ctx: &CallContext,
    ciphertext: &EncryptedValue,
    proof: &EncryptionProof,
) -> HandlerResult<u64> {
    let record = &slot.record;
    ensure_accepting_bids(record, ctx.timestamp)?;

    let context = InputContext::new(record.auction_id.as_str(), ctx.sender);
    let handle = engine
        .ingest_external(ciphertext, proof, &context)
        .map_err(EngineError::into_ingest_error)?;

    let index = slot.ledger.count();
    let (highest_bid, highest_bidder_index) = fold_bid(engine, record, &handle, index)?;

    debug!(
        auction_id = %record.auction_id,
        index,
        handle = %handle,
        highest = %highest_bid,
        "Bid folded into running maximum"
    );

    slot.ledger.append(Bid {
        bidder: ctx.sender,
        handle,
        timestamp: ctx.timestamp,
    });
    let record = &mut slot.record;
    record.highest_bid = highest_bid;
    record.highest_bidder_index = highest_bidder_index;
    record.highest_bidder = HighestBidder::Sealed(highest_bidder_index);

    Ok(index)
}

/// `gt = bid > highest; highest = gt ? bid : highest; leader = gt ? index : leader`
///
/// Both selections run regardless of the comparison's value. Strict
/// greater-than keeps the earlier bidder on ties.
fn fold_bid<E: CiphertextEngine + ?Sized>(
    engine: &E,
    record: &AuctionRecord,
    bid: &CiphertextHandle,
    index: u64,
) -> HandlerResult<(CiphertextHandle, CiphertextHandle)> {
    let gt = engine.greater_than(bid, &record.highest_bid)?;
    let encrypted_index = engine.trivial_encrypt(index)?;

    let highest_bid = engine.select(&gt, bid, &record.highest_bid)?;
    let leader = engine.select(&gt, &encrypted_index, &record.highest_bidder_index)?;

    engine.mark_publicly_decryptable(&highest_bid)?;
    engine.mark_publicly_decryptable(&leader)?;

    Ok((highest_bid, leader))
}

/// Handle ConcludeAuction: verify the reveal of `[highest_bid,
/// highest_bidder_index]` and record the winner.
pub fn handle_conclude_auction<E, V>(
    slot: &mut AuctionSlot,
    engine: &E,
    verifier: &V,
    ctx: &CallContext,
    clear_values: &[u8],
    decryption_proof: &[u8],
) -> HandlerResult<RevealedOutcome>
where
    E: CiphertextEngine + ?Sized,
    V: DecryptionProofVerifier + ?Sized,
{
    ensure_concludable(&slot.record, ctx.timestamp)?;

    let handles = slot.record.reveal_handles();
    let revealed = verify_reveal(
        engine,
        verifier,
        &slot.record,
        &handles,
        clear_values,
        decryption_proof,
    )
    .map_err(|err| match err {
        AuctionError::ProofVerificationFailed => AuctionError::InvalidProof,
        other => other,
    })?;

    let winning_bid = revealed[0].1;
    let leader = revealed[1].1;

    let winner = if slot.ledger.is_empty() {
        None
    } else {
        // A verified index always points into the ledger.
        let bid = slot
            .ledger
            .get(leader)
            .map_err(|_| AuctionError::InvalidProof)?;
        Some(bid.bidder)
    };

    let outcome = RevealedOutcome {
        winner,
        winning_bid,
        num_bids: u32::try_from(slot.ledger.count()).unwrap_or(u32::MAX),
        concluded_at: ctx.timestamp,
        proof_hash: sha256(decryption_proof),
    };

    let record = &mut slot.record;
    record.active = false;
    record.concluded = true;
    record.highest_bidder = match winner {
        Some(address) => HighestBidder::Revealed(address),
        None => HighestBidder::None,
    };
    record.outcome = Some(outcome.clone());

    Ok(outcome)
}
