//! JSON-RPC surface of the mock chain.
//!
//! The chain hosts one auction house wired to a local ciphertext engine, a
//! dealt KMS committee acting as decryption authority, and a manual clock
//! that only moves through the admin methods.

use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::info;

use auction_coprocessor::LocalCoprocessor;
use auction_crypto::ibe::random_scalar;
use auction_module::{
    AuctionCall, AuctionError, AuctionGenesisConfig, AuctionHouse, EventLog,
    GenesisValidationError, KmsSignatureVerifier, ManualClock,
};
use auction_types::{decode_clear_values, G2Point};
use decryption_coordinator::{CommitteeSetup, CoordinatorError, DecryptionAuthority};

use crate::types::*;

/// Seconds the clock moves per simulated block.
pub const BLOCK_TIME: u64 = 12;

pub type ChainHouse = AuctionHouse<Arc<LocalCoprocessor>, KmsSignatureVerifier, Arc<ManualClock>>;

/// Errors bringing up the chain.
#[derive(Debug, Error)]
pub enum ChainSetupError {
    #[error(transparent)]
    Genesis(#[from] GenesisValidationError),

    #[error("Committee setup failed: {0}")]
    Committee(#[from] CoordinatorError),
}

/// Shared chain state.
pub struct ChainState {
    house: ChainHouse,
    authority: DecryptionAuthority<Arc<LocalCoprocessor>>,
    events: Arc<EventLog>,
    clock: Arc<ManualClock>,
    block_height: RwLock<u64>,
    network_key: G2Point,
    validators: u32,
}

impl ChainState {
    /// Bring up a chain from genesis, generating the network key and
    /// dealing the KMS committee locally.
    pub fn new(genesis: &AuctionGenesisConfig, initial_timestamp: u64) -> Result<Self, ChainSetupError> {
        genesis.validate()?;

        let threshold = genesis.threshold.t as usize;
        let validators = genesis.threshold.n;

        let engine = Arc::new(LocalCoprocessor::from_master_secret(&random_scalar(&mut OsRng)));
        let committee = CommitteeSetup::deal(threshold, validators as usize, &mut OsRng)?;
        let verifier = KmsSignatureVerifier::new(committee.committee_key.clone(), threshold);
        let authority = committee.into_authority(engine.clone());

        let clock = Arc::new(ManualClock::new(initial_timestamp));
        let events = Arc::new(EventLog::new());
        let house = AuctionHouse::new(engine.clone(), verifier, clock.clone(), events.clone())
            .with_params(genesis.default_params.clone());

        info!(threshold, validators, initial_timestamp, "Chain initialized");

        Ok(Self {
            house,
            authority,
            events,
            clock,
            block_height: RwLock::new(0),
            network_key: engine.network_key(),
            validators,
        })
    }

    pub fn house(&self) -> &ChainHouse {
        &self.house
    }

    pub fn authority(&self) -> &DecryptionAuthority<Arc<LocalCoprocessor>> {
        &self.authority
    }

    pub fn block_info(&self) -> BlockInfo {
        BlockInfo {
            height: *self.block_height.read(),
            timestamp: self.house.now(),
        }
    }

    fn advance_block(&self) -> BlockInfo {
        let mut height = self.block_height.write();
        *height += 1;
        let timestamp = self.clock.advance(BLOCK_TIME);
        BlockInfo {
            height: *height,
            timestamp,
        }
    }

    fn set_timestamp(&self, timestamp: u64) {
        self.clock.set(timestamp);
    }

    fn network_info(&self) -> NetworkInfo {
        NetworkInfo {
            network_public_key: encode_hex(self.network_key.0),
            kms_public_key: encode_hex(self.authority.committee_key().0),
            threshold: self.authority.threshold() as u32,
            validators: self.validators,
        }
    }

    /// Reveal the auction's running maximum and leader once bidding closed.
    fn request_reveal(&self, auction_id: &str) -> Result<RevealRpc, String> {
        let details = self.house.get_auction_details(auction_id).map_err(|e| e.to_string())?;
        let now = self.house.now();
        if now <= details.end_time {
            return Err(AuctionError::StillActive {
                end_time: details.end_time,
                now,
            }
            .to_string());
        }
        if self.house.get_result(auction_id).map_err(|e| e.to_string())?.is_some() {
            return Err(AuctionError::AlreadyConcluded.to_string());
        }

        let handles = self.house.get_reveal_handles(auction_id).map_err(|e| e.to_string())?;
        let (clear_values, proof) = self
            .authority
            .public_decrypt(&handles)
            .map_err(|e| format!("Reveal failed: {}", e))?;
        let values = decode_clear_values(&clear_values, handles.len()).map_err(|e| e.to_string())?;

        info!(auction_id, "Reveal produced");
        Ok(RevealRpc {
            auction_id: auction_id.to_string(),
            handles: handles.iter().map(|h| h.to_hex()).collect(),
            values,
            clear_values: encode_hex(&clear_values),
            decryption_proof: encode_hex(&proof),
        })
    }
}

/// RPC API definition for the mock chain.
#[rpc(server, client)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    // ============ Chain Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get the network encryption key and committee key.
    #[method(name = "chain_getNetworkKey")]
    async fn chain_get_network_key(&self) -> Result<NetworkInfo, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Open an auction now.
    #[method(name = "auction_create")]
    async fn auction_create(
        &self,
        params: CreateAuctionParams,
    ) -> Result<AuctionDetailsRpc, ErrorObjectOwned>;

    /// Open an auction over an explicit window.
    #[method(name = "auction_schedule")]
    async fn auction_schedule(
        &self,
        params: ScheduleAuctionParams,
    ) -> Result<AuctionDetailsRpc, ErrorObjectOwned>;

    /// Submit an encrypted bid; returns its ledger index.
    #[method(name = "auction_placeBid")]
    async fn auction_place_bid(&self, params: PlaceBidParams) -> Result<u64, ErrorObjectOwned>;

    /// Ask the decryption authority to reveal a closed auction.
    #[method(name = "auction_requestReveal")]
    async fn auction_request_reveal(&self, auction_id: String) -> Result<RevealRpc, ErrorObjectOwned>;

    /// Conclude an auction with revealed cleartexts and their proof.
    #[method(name = "auction_conclude")]
    async fn auction_conclude(&self, params: ConcludeParams) -> Result<OutcomeRpc, ErrorObjectOwned>;

    /// Execute a borsh-encoded call message.
    #[method(name = "auction_submitCall")]
    async fn auction_submit_call(
        &self,
        params: SubmitCallParams,
    ) -> Result<CallOutcomeRpc, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get auction by ID.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(&self, auction_id: String) -> Result<AuctionDetailsRpc, ErrorObjectOwned>;

    /// Get the number of bids placed in an auction.
    #[method(name = "query_getBidCount")]
    async fn query_get_bid_count(&self, auction_id: String) -> Result<u64, ErrorObjectOwned>;

    /// Get one ledger entry.
    #[method(name = "query_getBid")]
    async fn query_get_bid(&self, auction_id: String, index: u64) -> Result<BidRpc, ErrorObjectOwned>;

    /// Get the handle of the running maximum.
    #[method(name = "query_getHighestBid")]
    async fn query_get_highest_bid(&self, auction_id: String) -> Result<String, ErrorObjectOwned>;

    /// Get the revealed outcome, if concluded.
    #[method(name = "query_getResult")]
    async fn query_get_result(&self, auction_id: String) -> Result<Option<OutcomeRpc>, ErrorObjectOwned>;

    /// List auctions in id order.
    #[method(name = "query_listAuctions")]
    async fn query_list_auctions(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned>;

    /// Get ids of auctions waiting for a reveal.
    #[method(name = "query_pendingReveal")]
    async fn query_pending_reveal(&self) -> Result<Vec<String>, ErrorObjectOwned>;

    /// Get published events, for one auction or from a log offset.
    #[method(name = "query_getEvents")]
    async fn query_get_events(
        &self,
        auction_id: Option<String>,
        since: Option<usize>,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned>;
}

/// Default page size for `query_listAuctions`.
const DEFAULT_LIST_LIMIT: usize = 100;

/// Implementation of the mock chain RPC server.
#[derive(Clone)]
pub struct MockChainServer {
    state: Arc<ChainState>,
}

impl MockChainServer {
    pub fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }

    fn auction_error(action: &str, err: AuctionError) -> ErrorObjectOwned {
        Self::rpc_error(&format!("{}: {}", action, err))
    }

    fn parse_error(err: RpcParseError) -> ErrorObjectOwned {
        Self::rpc_error(&err.to_string())
    }

    fn sender(s: &str) -> Result<auction_types::Address, ErrorObjectOwned> {
        decode_address(s).map_err(Self::parse_error)
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        Ok(self.state.advance_block())
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        self.state.set_timestamp(timestamp);
        info!("Timestamp set to {}", timestamp);
        Ok(true)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        Ok(self.state.block_info())
    }

    async fn chain_get_network_key(&self) -> Result<NetworkInfo, ErrorObjectOwned> {
        Ok(self.state.network_info())
    }

    async fn auction_create(
        &self,
        params: CreateAuctionParams,
    ) -> Result<AuctionDetailsRpc, ErrorObjectOwned> {
        let creator = Self::sender(&params.sender)?;
        let details = self
            .state
            .house
            .create_auction(creator, &params.auction_id, params.duration)
            .map_err(|e| Self::auction_error("Failed to create auction", e))?;
        Ok((&details).into())
    }

    async fn auction_schedule(
        &self,
        params: ScheduleAuctionParams,
    ) -> Result<AuctionDetailsRpc, ErrorObjectOwned> {
        let creator = Self::sender(&params.sender)?;
        let details = self
            .state
            .house
            .schedule_auction(creator, &params.auction_id, params.start_time, params.end_time)
            .map_err(|e| Self::auction_error("Failed to schedule auction", e))?;
        Ok((&details).into())
    }

    async fn auction_place_bid(&self, params: PlaceBidParams) -> Result<u64, ErrorObjectOwned> {
        let bidder = Self::sender(&params.sender)?;
        let ciphertext = (&params.ciphertext).try_into().map_err(Self::parse_error)?;
        let proof = (&params.proof).try_into().map_err(Self::parse_error)?;

        self.state
            .house
            .place_bid(&params.auction_id, &ciphertext, &proof, bidder)
            .map_err(|e| Self::auction_error("Failed to place bid", e))
    }

    async fn auction_request_reveal(&self, auction_id: String) -> Result<RevealRpc, ErrorObjectOwned> {
        self.state
            .request_reveal(&auction_id)
            .map_err(|e| Self::rpc_error(&e))
    }

    async fn auction_conclude(&self, params: ConcludeParams) -> Result<OutcomeRpc, ErrorObjectOwned> {
        let caller = Self::sender(&params.sender)?;
        let clear_values =
            decode_hex("clear_values", &params.clear_values).map_err(Self::parse_error)?;
        let proof =
            decode_hex("decryption_proof", &params.decryption_proof).map_err(Self::parse_error)?;

        let outcome = self
            .state
            .house
            .conclude_auction(&params.auction_id, &clear_values, &proof, caller)
            .map_err(|e| Self::auction_error("Failed to conclude auction", e))?;
        Ok((&outcome).into())
    }

    async fn auction_submit_call(
        &self,
        params: SubmitCallParams,
    ) -> Result<CallOutcomeRpc, ErrorObjectOwned> {
        let sender = Self::sender(&params.sender)?;
        let bytes = decode_hex("call", &params.call).map_err(Self::parse_error)?;
        let call = AuctionCall::from_bytes(&bytes)
            .map_err(|e| Self::parse_error(RpcParseError::Call(e.to_string())))?;

        let outcome = self
            .state
            .house
            .dispatch(sender, call)
            .map_err(|e| Self::auction_error("Call failed", e))?;
        Ok((&outcome).into())
    }

    async fn query_get_auction(&self, auction_id: String) -> Result<AuctionDetailsRpc, ErrorObjectOwned> {
        self.state
            .house
            .get_auction_details(&auction_id)
            .map(|d| (&d).into())
            .map_err(|e| Self::rpc_error(&e.to_string()))
    }

    async fn query_get_bid_count(&self, auction_id: String) -> Result<u64, ErrorObjectOwned> {
        self.state
            .house
            .get_bid_count(&auction_id)
            .map_err(|e| Self::rpc_error(&e.to_string()))
    }

    async fn query_get_bid(&self, auction_id: String, index: u64) -> Result<BidRpc, ErrorObjectOwned> {
        self.state
            .house
            .get_bid(&auction_id, index)
            .map(|b| (&b).into())
            .map_err(|e| Self::rpc_error(&e.to_string()))
    }

    async fn query_get_highest_bid(&self, auction_id: String) -> Result<String, ErrorObjectOwned> {
        self.state
            .house
            .get_highest_bid(&auction_id)
            .map(|h| h.to_hex())
            .map_err(|e| Self::rpc_error(&e.to_string()))
    }

    async fn query_get_result(&self, auction_id: String) -> Result<Option<OutcomeRpc>, ErrorObjectOwned> {
        self.state
            .house
            .get_result(&auction_id)
            .map(|r| r.as_ref().map(Into::into))
            .map_err(|e| Self::rpc_error(&e.to_string()))
    }

    async fn query_list_auctions(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned> {
        Ok(self
            .state
            .house
            .list_auctions(offset.unwrap_or(0), limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .iter()
            .map(Into::into)
            .collect())
    }

    async fn query_pending_reveal(&self) -> Result<Vec<String>, ErrorObjectOwned> {
        Ok(self.state.house.pending_reveal())
    }

    async fn query_get_events(
        &self,
        auction_id: Option<String>,
        since: Option<usize>,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let events = match auction_id {
            Some(id) => self.state.events.for_auction(&id),
            None => self.state.events.since(since.unwrap_or(0)),
        };
        Ok(events.iter().map(Into::into).collect())
    }
}
