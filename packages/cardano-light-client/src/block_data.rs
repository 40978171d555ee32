//! Block data: a Cardano block header and body as submitted by a relayer

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{consensus_state::ConsensusState, error::CardanoClientError, height::Height};

/// A single Cardano block, the header message of the client
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockData {
    /// IBC height, the block number in the chain's revision
    pub height: Height,
    /// Slot of the block
    pub slot: u64,
    /// Hex block hash
    pub hash: String,
    /// Hex hash of the previous block
    pub prev_hash: String,
    /// Epoch the block belongs to
    pub epoch_no: u64,
    /// Header CBOR
    #[serde_as(as = "Hex")]
    pub header_cbor: Vec<u8>,
    /// Block body CBOR
    #[serde_as(as = "Hex")]
    pub body_cbor: Vec<u8>,
    /// Nonce of the block's epoch
    #[serde_as(as = "Hex")]
    pub epoch_nonce: Vec<u8>,
    /// Block time in unix seconds
    pub timestamp: u64,
    /// Chain id of the producing chain
    pub chain_id: String,
}

impl BlockData {
    /// Checks that every field is set
    ///
    /// # Errors
    /// Returns the error kind of the first unset field.
    pub fn validate_basic(&self) -> Result<(), CardanoClientError> {
        if self.height.revision_height == 0 {
            return Err(CardanoClientError::InvalidBlockDataHeight {
                reason: "block data cannot have zero revision height".to_string(),
            });
        }
        if self.slot == 0 {
            return Err(CardanoClientError::InvalidBlockDataSlot {
                reason: "block data cannot have zero slot".to_string(),
            });
        }
        if self.header_cbor.is_empty() {
            return Err(CardanoClientError::InvalidHeaderCbor(
                "header cbor in block data cannot be empty".to_string(),
            ));
        }
        if self.hash.trim().is_empty() {
            return Err(CardanoClientError::InvalidBlockDataHash(
                "hash in block data cannot be empty".to_string(),
            ));
        }
        if self.prev_hash.trim().is_empty() {
            return Err(CardanoClientError::InvalidBlockDataHash(
                "previous hash in block data cannot be empty".to_string(),
            ));
        }
        if self.epoch_nonce.is_empty() {
            return Err(CardanoClientError::InvalidBlockDataEpochNonce(
                "epoch nonce in block data cannot be empty".to_string(),
            ));
        }
        if self.timestamp == 0 {
            return Err(CardanoClientError::InvalidBlockDataTimestamp(
                "timestamp in block data is invalid".to_string(),
            ));
        }
        if self.chain_id.trim().is_empty() {
            return Err(CardanoClientError::InvalidChainId {
                reason: "chain id in block data cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The consensus state this block installs
    #[must_use]
    pub const fn consensus_state(&self) -> ConsensusState {
        ConsensusState {
            timestamp: self.timestamp,
            slot: self.slot,
        }
    }

    /// Whether `other` names the same block, ignoring hash case
    #[must_use]
    pub fn same_hash(&self, other: &str) -> bool {
        self.hash.eq_ignore_ascii_case(other)
    }
}
