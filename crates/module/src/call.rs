//! Call message types for the auction module.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use auction_types::{AuctionDetails, AuctionId, EncryptedValue, EncryptionProof, RevealedOutcome};

/// Call messages for the auction module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    /// Open an auction now, running for `duration` seconds.
    CreateAuction { auction_id: AuctionId, duration: u64 },

    /// Open an auction over an explicit window.
    ScheduleAuction {
        auction_id: AuctionId,
        start_time: u64,
        end_time: u64,
    },

    /// Submit an encrypted bid with its proof of well-formed encryption.
    PlaceBid {
        auction_id: AuctionId,
        ciphertext: EncryptedValue,
        proof: EncryptionProof,
    },

    /// Conclude with the revealed cleartexts (permissionless).
    ConcludeAuction {
        auction_id: AuctionId,
        clear_values: Vec<u8>,
        decryption_proof: Vec<u8>,
    },
}

impl AuctionCall {
    pub fn auction_id(&self) -> &str {
        match self {
            AuctionCall::CreateAuction { auction_id, .. }
            | AuctionCall::ScheduleAuction { auction_id, .. }
            | AuctionCall::PlaceBid { auction_id, .. }
            | AuctionCall::ConcludeAuction { auction_id, .. } => auction_id,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        borsh::from_slice(bytes)
    }
}

/// What a successfully executed call produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    Created(AuctionDetails),
    BidAccepted { index: u64 },
    Concluded(RevealedOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_encoding() {
        let call = AuctionCall::ConcludeAuction {
            auction_id: "nft-1".into(),
            clear_values: vec![0u8; 64],
            decryption_proof: vec![1, 2, 3],
        };
        let decoded = AuctionCall::from_bytes(&call.to_bytes()).unwrap();
        assert_eq!(decoded, call);
        assert_eq!(decoded.auction_id(), "nft-1");

        assert!(AuctionCall::from_bytes(&[9u8]).is_err());
    }
}
