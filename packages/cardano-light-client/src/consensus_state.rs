//! Cardano consensus state

use serde::{Deserialize, Serialize};

use crate::error::CardanoClientError;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Snapshot of a verified block: its time and slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsensusState {
    /// Block time in unix seconds
    pub timestamp: u64,
    /// Slot of the block
    pub slot: u64,
}

impl ConsensusState {
    /// Both fields must be set
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidConsensusState`] if either field is zero.
    pub fn validate(&self) -> Result<(), CardanoClientError> {
        if self.timestamp == 0 {
            return Err(CardanoClientError::InvalidConsensusState {
                reason: "timestamp cannot be zero".to_string(),
            });
        }
        if self.slot == 0 {
            return Err(CardanoClientError::InvalidConsensusState {
                reason: "slot cannot be zero".to_string(),
            });
        }
        Ok(())
    }

    /// Block time in nanoseconds
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidConsensusState`] on overflow.
    pub fn timestamp_nanos(&self) -> Result<u64, CardanoClientError> {
        self.timestamp
            .checked_mul(NANOS_PER_SECOND)
            .ok_or_else(|| CardanoClientError::InvalidConsensusState {
                reason: format!("timestamp {} overflows nanoseconds", self.timestamp),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_are_rejected() {
        assert!(ConsensusState { timestamp: 0, slot: 1 }.validate().is_err());
        assert!(ConsensusState { timestamp: 1, slot: 0 }.validate().is_err());
        ConsensusState {
            timestamp: 1_707_122_673,
            slot: 1_214_009,
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn nanos_conversion_checks_overflow() {
        let cs = ConsensusState {
            timestamp: 1_707_122_694,
            slot: 1,
        };
        assert_eq!(cs.timestamp_nanos().unwrap(), 1_707_122_694_000_000_000);
        assert!(ConsensusState {
            timestamp: u64::MAX,
            slot: 1
        }
        .timestamp_nanos()
        .is_err());
    }
}
