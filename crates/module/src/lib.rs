//! Sealed-bid auction module over encrypted bid handles.
//!
//! Bids arrive as ciphertexts and are folded into a running maximum with
//! homomorphic comparison and selection, so no bid value is ever in the
//! clear while the auction is open. After the window closes, a decryption
//! authority reveals the maximum (and the encrypted index of whoever holds
//! it) together with a proof; the auction concludes only if that proof
//! verifies.
//!
//! # Architecture
//!
//! - `engine`: the ciphertext capability the module is written against
//! - `state`: per-auction slots behind a registry lock
//! - `ledger`: append-only bid ledger
//! - `lifecycle`: phases derived from the clock
//! - `handlers`: business logic for each call
//! - `reveal`: reveal verification and the KMS signature verifier
//! - `house`: the thread-safe service tying it all together
//! - `call` / `queries`: message and query types
//! - `events`, `clock`, `genesis`, `error`
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{AuctionHouse, EventLog, KmsSignatureVerifier, SystemClock};
//!
//! let house = AuctionHouse::new(engine, KmsSignatureVerifier::new(kms_key, 2), SystemClock, log);
//! house.create_auction(seller, "nft-1", 3600)?;
//! house.place_bid("nft-1", &ciphertext, &proof, bidder)?;
//! // after the window, with cleartexts from the decryption authority
//! house.conclude_auction("nft-1", &clear_values, &decryption_proof, caller)?;
//! ```

pub mod call;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod house;
pub mod ledger;
pub mod lifecycle;
pub mod queries;
pub mod reveal;
pub mod state;

#[cfg(test)]
mod testing;

pub use call::{AuctionCall, CallOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CiphertextEngine, EngineError};
pub use error::AuctionError;
pub use events::{EventLog, EventSink};
pub use genesis::{AuctionGenesisConfig, DefaultAuctionParams, GenesisValidationError, ThresholdConfig};
pub use handlers::{CallContext, HandlerResult};
pub use house::AuctionHouse;
pub use ledger::BidLedger;
pub use queries::{AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use reveal::{DecryptionProofVerifier, KmsSignatureVerifier, RevealedValues};
pub use state::{AuctionRegistry, AuctionSlot};
