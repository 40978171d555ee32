//! Misbehaviour evidence: two blocks that could not both have been produced honestly

use serde::{Deserialize, Serialize};

use crate::{block_data::BlockData, error::CardanoClientError};

/// Two conflicting blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misbehaviour {
    /// Client the evidence is submitted to
    #[serde(default)]
    pub client_id: String,
    /// Block at the greater or equal height
    pub block_data_1: BlockData,
    /// The other block
    pub block_data_2: BlockData,
}

impl Misbehaviour {
    /// Time of the misbehaviour: the later of both block times
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.block_data_1.timestamp.max(self.block_data_2.timestamp)
    }

    /// Checks that both blocks are well formed, from the same chain, and ordered by height
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidMisbehaviour`].
    pub fn validate_basic(&self) -> Result<(), CardanoClientError> {
        if self.block_data_1.chain_id != self.block_data_2.chain_id {
            return Err(CardanoClientError::InvalidMisbehaviour(
                "block datas must have identical chain ids".to_string(),
            ));
        }
        self.block_data_1.validate_basic().map_err(|e| {
            CardanoClientError::InvalidMisbehaviour(format!("block data 1 failed validation: {e}"))
        })?;
        self.block_data_2.validate_basic().map_err(|e| {
            CardanoClientError::InvalidMisbehaviour(format!("block data 2 failed validation: {e}"))
        })?;
        if self.block_data_1.height < self.block_data_2.height {
            return Err(CardanoClientError::InvalidMisbehaviour(format!(
                "block data 1 height is less than block data 2 height ({} < {})",
                self.block_data_1.height, self.block_data_2.height
            )));
        }
        Ok(())
    }
}
