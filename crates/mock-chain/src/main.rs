//! Mock chain server for local testing of sealed-bid auctions.
//!
//! Runs a JSON-RPC server that hosts the auction module, a local ciphertext
//! engine and a dealt KMS committee, with a clock driven by the admin API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::server::Server;
use tracing::info;

use auction_module::AuctionGenesisConfig;
use mock_chain::{ChainState, MockChainApiServer, MockChainServer};

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "Local JSON-RPC chain hosting sealed-bid auctions")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis config (JSON); threshold and duration bounds are taken from it
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Signatures required to reveal (overrides genesis)
    #[arg(long)]
    threshold: Option<u32>,

    /// KMS committee size (overrides genesis)
    #[arg(long)]
    validators: Option<u32>,

    /// Initial chain timestamp (unix seconds)
    #[arg(long, default_value_t = 0)]
    initial_timestamp: u64,
}

fn load_genesis(args: &Args) -> Result<AuctionGenesisConfig> {
    let mut genesis = match &args.genesis {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading genesis file {}", path.display()))?;
            AuctionGenesisConfig::from_json(&json)?
        }
        None => AuctionGenesisConfig::default(),
    };

    if let Some(t) = args.threshold {
        genesis.threshold.t = t;
    }
    if let Some(n) = args.validators {
        genesis.threshold.n = n;
    }
    Ok(genesis)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("auction_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let args = Args::parse();
    let genesis = load_genesis(&args)?;
    let state = ChainState::new(&genesis, args.initial_timestamp)?;

    info!("Starting mock chain server on {}", args.listen);

    let server = Server::builder().build(args.listen).await?;
    let handle = server.start(MockChainServer::new(state).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
