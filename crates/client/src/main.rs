//! CLI for interacting with sealed-bid auctions.
//!
//! This binary provides commands for:
//! - Creating and scheduling auctions
//! - Submitting encrypted bids (encrypted locally)
//! - Revealing and concluding closed auctions
//! - Querying auction state and events
//! - Driving the mock chain clock

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use auction_client::AuctionClient;
use mock_chain::types::{AuctionDetailsRpc, EventRpc, HighestBidderRpc, OutcomeRpc};
use mock_chain::MockChainApiClient;

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for sealed-bid auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an auction now
    Create {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction_id: String,

        /// Bidding window in seconds
        #[arg(long)]
        duration: u64,
    },

    /// Open an auction over an explicit window
    Schedule {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction_id: String,

        /// Start time (unix timestamp)
        #[arg(long)]
        start_time: u64,

        /// End time (unix timestamp)
        #[arg(long)]
        end_time: u64,
    },

    /// Submit an encrypted bid
    Bid {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction_id: String,

        /// Bid amount (encrypted before it leaves this machine)
        #[arg(long)]
        amount: u64,
    },

    /// Request the reveal of a closed auction and conclude it
    Reveal {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction_id: String,
    },

    /// Get auction details
    GetAuction {
        #[arg(long)]
        auction_id: String,
    },

    /// List auctions
    ListAuctions {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Get the number of bids in an auction
    BidCount {
        #[arg(long)]
        auction_id: String,
    },

    /// Get one bid from an auction's ledger
    GetBid {
        #[arg(long)]
        auction_id: String,

        #[arg(long)]
        index: u64,
    },

    /// Get auction result
    GetResult {
        #[arg(long)]
        auction_id: String,
    },

    /// Show published events
    Events {
        /// Only events of this auction
        #[arg(long)]
        auction_id: Option<String>,

        /// Skip this many events of the global log
        #[arg(long)]
        since: Option<usize>,
    },

    /// Get the network and committee keys
    NetworkKey,

    /// Advance chain time by one block (for testing)
    AdvanceBlock,

    /// Set chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set
        #[arg(long)]
        timestamp: u64,
    },
}

fn print_auction(a: &AuctionDetailsRpc) {
    println!("Auction {}:", a.auction_id);
    println!("  Start: {}", a.start_time);
    println!("  End: {}", a.end_time);
    println!("  Active: {}", a.active);
    match &a.highest_bidder {
        HighestBidderRpc::None => println!("  Highest Bidder: none"),
        HighestBidderRpc::Sealed { handle } => println!("  Highest Bidder: sealed ({})", handle),
        HighestBidderRpc::Revealed { address } => println!("  Highest Bidder: {}", address),
    }
}

fn print_outcome(auction_id: &str, r: &OutcomeRpc) {
    println!("Result for auction {}:", auction_id);
    println!("  Winner: {}", r.winner.as_deref().unwrap_or("none"));
    println!("  Winning Bid: {}", r.winning_bid);
    println!("  Bids: {}", r.num_bids);
    println!("  Concluded At: {}", r.concluded_at);
    println!("  Proof Hash: {}", r.proof_hash);
}

fn print_event(event: &EventRpc) {
    match event {
        EventRpc::AuctionCreated {
            auction_id,
            start_time,
            end_time,
        } => println!("  AuctionCreated {} [{}, {}]", auction_id, start_time, end_time),
        EventRpc::BidPlaced { auction_id, bidder } => {
            println!("  BidPlaced {} by {}", auction_id, bidder)
        }
        EventRpc::AuctionConcluded {
            auction_id,
            winner,
            winning_bid,
        } => println!(
            "  AuctionConcluded {} winner={} bid={}",
            auction_id,
            winner.as_deref().unwrap_or("none"),
            winning_bid
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?)
                .add_directive("auction_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = AuctionClient::connect(&cli.rpc)?;
    let rpc = client.rpc();

    match cli.command {
        Commands::Create {
            sender,
            auction_id,
            duration,
        } => {
            let details = client.create_auction(&sender, &auction_id, duration).await?;
            info!("Created auction {}", details.auction_id);
            print_auction(&details);
        }

        Commands::Schedule {
            sender,
            auction_id,
            start_time,
            end_time,
        } => {
            let details = client
                .schedule_auction(&sender, &auction_id, start_time, end_time)
                .await?;
            info!("Scheduled auction {}", details.auction_id);
            print_auction(&details);
        }

        Commands::Bid {
            sender,
            auction_id,
            amount,
        } => {
            let index = client.place_bid(&sender, &auction_id, amount).await?;
            println!("Bid submitted successfully");
            println!("  Auction ID: {}", auction_id);
            println!("  Amount: {} (encrypted)", amount);
            println!("  Ledger Index: {}", index);
        }

        Commands::Reveal { sender, auction_id } => {
            let (reveal, outcome) = client.reveal_and_conclude(&sender, &auction_id).await?;
            println!("Revealed handles:");
            for (handle, value) in reveal.handles.iter().zip(&reveal.values) {
                println!("  {} = {}", handle, value);
            }
            print_outcome(&auction_id, &outcome);
        }

        Commands::GetAuction { auction_id } => {
            print_auction(&client.auction(&auction_id).await?);
        }

        Commands::ListAuctions { offset, limit } => {
            let auctions = rpc.query_list_auctions(Some(offset), Some(limit)).await?;
            if auctions.is_empty() {
                println!("No auctions found");
            } else {
                println!("Auctions:");
                for a in auctions {
                    println!(
                        "  [{}] {} - {} bids ({})",
                        a.auction_id, a.phase, a.num_bids, a.creator
                    );
                }
            }
        }

        Commands::BidCount { auction_id } => {
            let count = rpc.query_get_bid_count(auction_id.clone()).await?;
            println!("Auction {} has {} bid(s)", auction_id, count);
        }

        Commands::GetBid { auction_id, index } => {
            let bid = rpc.query_get_bid(auction_id, index).await?;
            println!("Bid {}:", index);
            println!("  Bidder: {}", bid.bidder);
            println!("  Handle: {}", bid.handle);
            println!("  Timestamp: {}", bid.timestamp);
        }

        Commands::GetResult { auction_id } => {
            match rpc.query_get_result(auction_id.clone()).await? {
                Some(r) => print_outcome(&auction_id, &r),
                None => println!("Auction {} not concluded yet", auction_id),
            }
        }

        Commands::Events { auction_id, since } => {
            let events = rpc.query_get_events(auction_id, since).await?;
            if events.is_empty() {
                println!("No events");
            } else {
                println!("Events:");
                events.iter().for_each(print_event);
            }
        }

        Commands::NetworkKey => {
            let info = client.network_info().await?;
            println!("Network Public Key: {}", info.network_public_key);
            println!("KMS Public Key: {}", info.kms_public_key);
            println!("Threshold: {}/{}", info.threshold, info.validators);
        }

        Commands::AdvanceBlock => {
            let info = rpc.admin_advance_block().await?;
            println!("Block advanced: height={}, timestamp={}", info.height, info.timestamp);
        }

        Commands::SetTimestamp { timestamp } => {
            rpc.admin_set_timestamp(timestamp).await?;
            println!("Timestamp set to {}", timestamp);
        }
    }

    Ok(())
}
