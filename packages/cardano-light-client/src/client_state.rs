//! Cardano client state

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{
    error::CardanoClientError,
    height::{parse_chain_id_revision, Height},
    pool::Validator,
};

/// Longest chain id accepted
pub const MAX_CHAIN_ID_LENGTH: usize = 50;

/// Policy ids identifying the auth tokens of the counterparty's IBC objects
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenConfigs {
    /// `policy_id || asset_name` of the handler token, hex
    pub handler_token_unit: String,
    /// Minting policy of client tokens, hex
    pub client_policy_id: String,
    /// Minting policy of connection tokens, hex
    pub connection_policy_id: String,
    /// Minting policy of channel tokens, hex
    pub channel_policy_id: String,
}

/// NFT marking the counterparty's host state UTXO
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostStateNft {
    /// Minting policy id
    #[serde_as(as = "Hex")]
    pub policy_id: Vec<u8>,
    /// Asset name
    #[serde_as(as = "Hex")]
    pub token_name: Vec<u8>,
}

/// The client state of the Cardano light client
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientState {
    /// Chain id of the counterparty
    pub chain_id: String,
    /// Latest verified height
    pub latest_height: Height,
    /// Height the client was frozen at, zero while active
    #[serde(default)]
    pub frozen_height: Height,
    /// Maximum age in seconds of the consensus states misbehaviour evidence builds on
    pub valid_after: u64,
    /// Unix time of the counterparty's genesis
    pub genesis_time: u64,
    /// Epoch of the latest verified block
    pub current_epoch: u64,
    /// Slots per epoch
    pub epoch_length: u64,
    /// Slots per KES period
    pub slot_per_kes_period: u64,
    /// Stake pools allowed to produce blocks in the current epoch
    pub current_validator_set: Vec<Validator>,
    /// Stake pools expected for the next epoch
    pub next_validator_set: Vec<Validator>,
    /// Seconds a consensus state stays trusted
    pub trusting_period: u64,
    /// Upgrade path keys
    #[serde(default)]
    pub upgrade_path: Vec<String>,
    /// Auth token policies of the counterparty's IBC objects
    pub token_configs: TokenConfigs,
    /// Host state NFT, required to accept Mithril headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_state_nft: Option<HostStateNft>,
}

impl ClientState {
    /// Checks the client state invariants
    ///
    /// # Errors
    /// - [`CardanoClientError::InvalidChainId`] on a blank or too long chain id
    /// - [`CardanoClientError::InvalidTrustingPeriod`] on a zero trusting period
    /// - [`CardanoClientError::InvalidHeight`] on a zero latest height or a revision mismatch
    /// - [`CardanoClientError::InvalidEpochLength`] and
    ///   [`CardanoClientError::InvalidSlotPerKesPeriod`] on zero lengths
    /// - [`CardanoClientError::InvalidUpgradeClient`] on a blank upgrade path key
    pub fn validate(&self) -> Result<(), CardanoClientError> {
        let chain_id = self.chain_id.trim();
        if chain_id.is_empty() {
            return Err(CardanoClientError::InvalidChainId {
                reason: "chain id cannot be blank".to_string(),
            });
        }
        if chain_id.len() > MAX_CHAIN_ID_LENGTH {
            return Err(CardanoClientError::InvalidChainId {
                reason: format!(
                    "chain id is {} characters long, max is {MAX_CHAIN_ID_LENGTH}",
                    chain_id.len()
                ),
            });
        }
        if self.trusting_period == 0 {
            return Err(CardanoClientError::InvalidTrustingPeriod);
        }

        let revision = parse_chain_id_revision(&self.chain_id);
        if self.latest_height.revision_number != revision {
            return Err(CardanoClientError::InvalidHeight {
                reason: format!(
                    "latest height revision {} does not match chain id revision {revision}",
                    self.latest_height.revision_number
                ),
            });
        }
        if self.latest_height.revision_height == 0 {
            return Err(CardanoClientError::InvalidHeight {
                reason: "latest height cannot be zero".to_string(),
            });
        }
        if self.epoch_length == 0 {
            return Err(CardanoClientError::InvalidEpochLength);
        }
        if self.slot_per_kes_period == 0 {
            return Err(CardanoClientError::InvalidSlotPerKesPeriod);
        }

        if let Some(index) = self.upgrade_path.iter().position(|k| k.trim().is_empty()) {
            return Err(CardanoClientError::InvalidUpgradeClient(format!(
                "upgrade path key {index} cannot be blank"
            )));
        }

        Ok(())
    }

    /// A frozen client never becomes active again
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        !self.frozen_height.is_zero()
    }

    /// Revision of the counterparty chain
    #[must_use]
    pub fn revision(&self) -> u64 {
        parse_chain_id_revision(&self.chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixture_client_state;

    #[test]
    fn fixture_client_state_is_valid() {
        fixture_client_state().validate().unwrap();
    }

    #[test]
    fn rejects_every_broken_invariant() {
        let cases: Vec<(&str, fn(&mut ClientState))> = vec![
            ("blank chain id", |cs| cs.chain_id = "   ".to_string()),
            ("long chain id", |cs| cs.chain_id = "c".repeat(MAX_CHAIN_ID_LENGTH + 1)),
            ("zero trusting period", |cs| cs.trusting_period = 0),
            ("revision mismatch", |cs| cs.latest_height.revision_number = 1),
            ("chain id revision mismatch", |cs| cs.chain_id = "cardano-2".to_string()),
            ("zero epoch length", |cs| cs.epoch_length = 0),
            ("zero slot per kes", |cs| cs.slot_per_kes_period = 0),
            ("zero latest height", |cs| cs.latest_height.revision_height = 0),
            ("blank upgrade key", |cs| {
                cs.upgrade_path = vec!["upgrade".to_string(), String::new()];
            }),
        ];

        for (name, mutate) in cases {
            let mut cs = fixture_client_state();
            mutate(&mut cs);
            assert!(cs.validate().is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn error_kinds_match_the_broken_field() {
        let mut cs = fixture_client_state();
        cs.chain_id = String::new();
        assert!(matches!(cs.validate(), Err(CardanoClientError::InvalidChainId { .. })));

        let mut cs = fixture_client_state();
        cs.trusting_period = 0;
        assert!(matches!(cs.validate(), Err(CardanoClientError::InvalidTrustingPeriod)));

        let mut cs = fixture_client_state();
        cs.epoch_length = 0;
        assert!(matches!(cs.validate(), Err(CardanoClientError::InvalidEpochLength)));

        let mut cs = fixture_client_state();
        cs.slot_per_kes_period = 0;
        assert!(matches!(cs.validate(), Err(CardanoClientError::InvalidSlotPerKesPeriod)));

        let mut cs = fixture_client_state();
        cs.upgrade_path = vec![" ".to_string()];
        assert!(matches!(cs.validate(), Err(CardanoClientError::InvalidUpgradeClient(_))));
    }

    #[test]
    fn revisioned_chain_id_needs_matching_height() {
        let mut cs = fixture_client_state();
        cs.chain_id = "cardano-2".to_string();
        cs.latest_height.revision_number = 2;
        cs.validate().unwrap();
        assert_eq!(cs.revision(), 2);
    }

    #[test]
    fn frozen_iff_frozen_height_is_set() {
        let mut cs = fixture_client_state();
        assert!(!cs.is_frozen());
        cs.frozen_height = Height::new(0, 1);
        assert!(cs.is_frozen());
        cs.frozen_height = Height::new(1, 0);
        assert!(cs.is_frozen());
    }

    #[test]
    fn host_state_nft_serializes_as_hex() {
        let mut cs = fixture_client_state();
        cs.host_state_nft = Some(HostStateNft {
            policy_id: vec![0xab; 28],
            token_name: b"host".to_vec(),
        });
        let json = serde_json::to_value(&cs).unwrap();
        assert_eq!(json["host_state_nft"]["token_name"], "686f7374");
        let back: ClientState = serde_json::from_value(json).unwrap();
        assert_eq!(back, cs);

        let without = serde_json::to_value(fixture_client_state()).unwrap();
        assert!(without.get("host_state_nft").is_none());
    }
}
