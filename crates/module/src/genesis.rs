//! Genesis configuration for the auction module.
//!
//! Holds the committee shape the node deals at startup and the bounds
//! applied to every new auction window. Keys are never configured here: the
//! node that hosts the house generates them and holds their secrets.

use serde::{Deserialize, Serialize};

/// Genesis configuration for the auction module.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuctionGenesisConfig {
    /// Committee threshold (t-of-n)
    pub threshold: ThresholdConfig,

    /// Bounds for new auctions
    #[serde(default)]
    pub default_params: DefaultAuctionParams,
}

/// Threshold configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum number of signers (threshold)
    pub t: u32,
    /// Total number of committee members
    pub n: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { t: 2, n: 3 }
    }
}

/// Default parameters for new auctions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultAuctionParams {
    /// Shortest allowed window (seconds)
    pub min_duration: u64,
    /// Longest allowed window (seconds)
    pub max_duration: u64,
}

impl Default for DefaultAuctionParams {
    fn default() -> Self {
        Self {
            min_duration: 60,
            max_duration: 30 * 24 * 3600, // 30 days
        }
    }
}

impl AuctionGenesisConfig {
    /// Create a genesis config for a t-of-n committee.
    pub fn with_threshold(t: u32, n: u32) -> Self {
        Self {
            threshold: ThresholdConfig { t, n },
            ..Default::default()
        }
    }

    /// Parse and validate a JSON genesis file.
    pub fn from_json(json: &str) -> Result<Self, GenesisValidationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GenesisValidationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.threshold.t == 0 {
            return Err(GenesisValidationError::InvalidThreshold(
                "Threshold cannot be zero".into(),
            ));
        }
        if self.threshold.t > self.threshold.n {
            return Err(GenesisValidationError::InvalidThreshold(
                "Threshold cannot exceed committee size".into(),
            ));
        }

        if self.default_params.min_duration == 0 {
            return Err(GenesisValidationError::InvalidDefaultParams(
                "Minimum duration cannot be zero".into(),
            ));
        }
        if self.default_params.min_duration > self.default_params.max_duration {
            return Err(GenesisValidationError::InvalidDefaultParams(
                "Minimum duration exceeds maximum".into(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid threshold configuration: {0}")]
    InvalidThreshold(String),

    #[error("Invalid default parameters: {0}")]
    InvalidDefaultParams(String),

    #[error("Failed to parse genesis config: {0}")]
    Parse(String),
}
