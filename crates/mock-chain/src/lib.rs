//! Mock chain for local testing of sealed-bid auctions.
//!
//! Hosts the auction module behind a JSON-RPC server with a controllable
//! clock, a local ciphertext engine and a KMS committee that answers reveal
//! requests. The generated `MockChainApiClient` trait is what the CLI and
//! the integration tests talk to.

pub mod server;
pub mod types;

pub use server::{
    ChainHouse, ChainSetupError, ChainState, MockChainApiClient, MockChainApiServer,
    MockChainServer, BLOCK_TIME,
};
