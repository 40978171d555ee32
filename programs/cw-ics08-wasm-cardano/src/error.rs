//! Defines the [`ContractError`] type.

use cardano_light_client::CardanoClientError;
use cosmwasm_std::StdError;
use thiserror::Error;

/// Error types that can be returned by contract operations
#[derive(Error, Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ContractError {
    /// Standard `CosmWasm` error
    #[error("{0}")]
    Std(#[from] StdError),

    /// Deserializing client state failed
    #[error("deserializing client state failed: {0}")]
    DeserializeClientStateFailed(#[source] serde_json::Error),

    /// Deserializing consensus state failed
    #[error("deserializing consensus state failed: {0}")]
    DeserializeConsensusStateFailed(#[source] serde_json::Error),

    /// Deserializing client message failed
    #[error("deserializing client message failed: {0}")]
    DeserializeClientMessageFailed(#[source] CardanoClientError),

    /// Initializing the client failed
    #[error("instantiating client failed: {0}")]
    InstantiateFailed(#[source] CardanoClientError),

    /// Client state not found
    #[error("client state not found")]
    ClientStateNotFound,

    /// Verify client message failed
    #[error("verify client message failed: {0}")]
    VerifyClientMessageFailed(#[source] CardanoClientError),

    /// Update state failed
    #[error("update state failed: {0}")]
    UpdateStateFailed(#[source] CardanoClientError),

    /// Freezing the client failed
    #[error("update state on misbehaviour failed: {0}")]
    UpdateStateOnMisbehaviourFailed(#[source] CardanoClientError),

    /// Verify membership failed
    #[error("verify membership failed: {0}")]
    VerifyMembershipFailed(#[source] CardanoClientError),

    /// Verify non-membership failed
    #[error("verify non-membership failed: {0}")]
    VerifyNonMembershipFailed(#[source] CardanoClientError),

    /// Timestamp at height failed
    #[error("timestamp at height failed: {0}")]
    TimestampAtHeightFailed(#[source] CardanoClientError),

    /// Status failed
    #[error("status failed: {0}")]
    StatusFailed(#[source] CardanoClientError),

    /// The merkle path holds no utf-8 path
    #[error("invalid merkle path: {0}")]
    InvalidMerklePath(String),

    /// The message is not supported by this client
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    // Generic translation errors
    /// Prost encoding error
    #[error("prost encoding error: {0}")]
    ProstEncodeError(#[from] prost::EncodeError),

    /// Prost decoding error
    #[error("prost decoding error: {0}")]
    ProstDecodeError(#[from] prost::DecodeError),

    /// Serde JSON error
    #[error("serde json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}
