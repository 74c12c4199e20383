//! Typed access to a mock chain node.
//!
//! Wraps the generated `MockChainApiClient` methods with the steps a bidder
//! or seller actually performs: fetch the network key and encrypt locally
//! before bidding, or request a reveal and conclude with it.

use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::info;

use auction_types::G2Point;
use mock_chain::types::{
    decode_address, AuctionDetailsRpc, BidRpc, ConcludeParams, CreateAuctionParams,
    NetworkInfo, OutcomeRpc, RevealRpc, RpcParseError, ScheduleAuctionParams,
};
use mock_chain::MockChainApiClient;

use crate::bid::{encrypt_bid, BidError};

/// Errors talking to a chain node.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    #[error(transparent)]
    Bid(#[from] BidError),

    #[error(transparent)]
    Parse(#[from] RpcParseError),
}

/// Client for one chain node.
pub struct AuctionClient {
    rpc: HttpClient,
}

impl AuctionClient {
    pub fn connect(url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            rpc: HttpClientBuilder::default().build(url)?,
        })
    }

    /// Raw RPC client, for methods not wrapped here.
    pub fn rpc(&self) -> &HttpClient {
        &self.rpc
    }

    pub async fn network_info(&self) -> Result<NetworkInfo, ClientError> {
        Ok(self.rpc.chain_get_network_key().await?)
    }

    pub async fn network_key(&self) -> Result<G2Point, ClientError> {
        Ok(self.network_info().await?.network_key()?)
    }

    pub async fn create_auction(
        &self,
        sender: &str,
        auction_id: &str,
        duration: u64,
    ) -> Result<AuctionDetailsRpc, ClientError> {
        let params = CreateAuctionParams {
            sender: sender.to_string(),
            auction_id: auction_id.to_string(),
            duration,
        };
        Ok(self.rpc.auction_create(params).await?)
    }

    pub async fn schedule_auction(
        &self,
        sender: &str,
        auction_id: &str,
        start_time: u64,
        end_time: u64,
    ) -> Result<AuctionDetailsRpc, ClientError> {
        let params = ScheduleAuctionParams {
            sender: sender.to_string(),
            auction_id: auction_id.to_string(),
            start_time,
            end_time,
        };
        Ok(self.rpc.auction_schedule(params).await?)
    }

    /// Encrypt `amount` locally and submit it; returns the ledger index.
    pub async fn place_bid(
        &self,
        sender: &str,
        auction_id: &str,
        amount: u64,
    ) -> Result<u64, ClientError> {
        let network_key = self.network_key().await?;
        let bidder = decode_address(sender)?;
        let bid = encrypt_bid(&network_key, auction_id, bidder, amount, &mut OsRng)?;

        let index = self.rpc.auction_place_bid(bid.to_params(sender)).await?;
        info!(auction_id, index, "Bid submitted");
        Ok(index)
    }

    /// Request the reveal of a closed auction and conclude with it.
    pub async fn reveal_and_conclude(
        &self,
        sender: &str,
        auction_id: &str,
    ) -> Result<(RevealRpc, OutcomeRpc), ClientError> {
        let reveal = self.rpc.auction_request_reveal(auction_id.to_string()).await?;
        let outcome = self
            .rpc
            .auction_conclude(ConcludeParams::from_reveal(sender.to_string(), &reveal))
            .await?;
        Ok((reveal, outcome))
    }

    pub async fn auction(&self, auction_id: &str) -> Result<AuctionDetailsRpc, ClientError> {
        Ok(self.rpc.query_get_auction(auction_id.to_string()).await?)
    }

    /// Every ledger entry of an auction, in placement order.
    pub async fn bids(&self, auction_id: &str) -> Result<Vec<BidRpc>, ClientError> {
        let count = self.rpc.query_get_bid_count(auction_id.to_string()).await?;
        let mut bids = Vec::with_capacity(count as usize);
        for index in 0..count {
            bids.push(self.rpc.query_get_bid(auction_id.to_string(), index).await?);
        }
        Ok(bids)
    }
}
