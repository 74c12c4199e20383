//! In-memory auction registry.
//!
//! Each auction lives in its own [`AuctionSlot`] (registry entry plus bid
//! ledger) behind a mutex, so calls on one auction are serialized while
//! different auctions proceed in parallel. The outer map lock is only held
//! long enough to look up or insert a slot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use auction_types::{AuctionId, AuctionRecord};

use crate::error::AuctionError;
use crate::ledger::BidLedger;

/// Registry entry and ledger for one auction.
#[derive(Clone, Debug)]
pub struct AuctionSlot {
    pub record: AuctionRecord,
    pub ledger: BidLedger,
}

impl AuctionSlot {
    pub fn new(record: AuctionRecord) -> Self {
        Self {
            record,
            ledger: BidLedger::new(),
        }
    }
}

/// Shared handle to a slot.
pub type SlotRef = Arc<Mutex<AuctionSlot>>;

/// Auction id → slot.
#[derive(Debug, Default)]
pub struct AuctionRegistry {
    slots: RwLock<HashMap<AuctionId, SlotRef>>,
}

impl AuctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, auction_id: &str) -> bool {
        self.slots.read().contains_key(auction_id)
    }

    /// Look up the slot for an auction.
    pub fn slot(&self, auction_id: &str) -> Result<SlotRef, AuctionError> {
        self.slots
            .read()
            .get(auction_id)
            .cloned()
            .ok_or_else(|| AuctionError::NotFound(auction_id.to_string()))
    }

    /// Insert a prebuilt slot and run `on_insert` on it before any other
    /// caller can lock it.
    ///
    /// The existence check and the insertion happen under one map write
    /// lock, so two concurrent creations of the same id cannot both succeed.
    /// `on_insert` runs after the map lock is released but with the new
    /// slot still locked.
    pub fn insert<R, F>(&self, auction_id: &str, slot: AuctionSlot, on_insert: F) -> Result<R, AuctionError>
    where
        F: FnOnce(&AuctionSlot) -> R,
    {
        let mut slots = self.slots.write();
        if slots.contains_key(auction_id) {
            return Err(AuctionError::AlreadyExists(auction_id.to_string()));
        }

        let slot = Arc::new(Mutex::new(slot));
        let guard = slot.lock();
        slots.insert(auction_id.to_string(), Arc::clone(&slot));
        drop(slots);

        let result = on_insert(&guard);
        Ok(result)
    }

    /// All auction ids, sorted.
    pub fn ids(&self) -> Vec<AuctionId> {
        let mut ids: Vec<AuctionId> = self.slots.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All slots, sorted by auction id.
    pub fn slots(&self) -> Vec<SlotRef> {
        let slots = self.slots.read();
        let mut entries: Vec<(&AuctionId, &SlotRef)> = slots.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, slot)| Arc::clone(slot)).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
