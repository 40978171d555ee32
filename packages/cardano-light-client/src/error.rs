//! Error types for the Cardano light client

use thiserror::Error;

use crate::height::Height;

/// Codespace under which the error codes of this client are registered on the host chain
pub const ERROR_CODESPACE: &str = "099-cardano";

/// Main error type for Cardano light client operations
#[derive(Error, Debug)]
pub enum CardanoClientError {
    /// Client state or message is not a Cardano one
    #[error("invalid client type: {0}")]
    InvalidClientType(String),

    /// Chain id is blank, too long or does not match
    #[error("invalid chain id: {reason}")]
    InvalidChainId {
        /// Reason for error
        reason: String,
    },

    /// Trusting period must be positive
    #[error("trusting period must be greater than zero")]
    InvalidTrustingPeriod,

    /// Height is zero, has the wrong revision or is beyond the latest height
    #[error("invalid height: {reason}")]
    InvalidHeight {
        /// Reason for error
        reason: String,
    },

    /// Epoch length must be positive
    #[error("epoch length must be greater than zero")]
    InvalidEpochLength,

    /// Slots per KES period must be positive
    #[error("slots per KES period must be greater than zero")]
    InvalidSlotPerKesPeriod,

    /// Consensus state is zeroed or otherwise unusable
    #[error("invalid consensus state: {reason}")]
    InvalidConsensusState {
        /// Reason for error
        reason: String,
    },

    /// Header CBOR is empty or cannot be decoded
    #[error("invalid header cbor: {0}")]
    InvalidHeaderCbor(String),

    /// Block data height is zero or disagrees with the header
    #[error("invalid block data height: {reason}")]
    InvalidBlockDataHeight {
        /// Reason for error
        reason: String,
    },

    /// Block data slot is zero or disagrees with the header
    #[error("invalid block data slot: {reason}")]
    InvalidBlockDataSlot {
        /// Reason for error
        reason: String,
    },

    /// Block hash or previous hash is missing
    #[error("invalid block data hash: {0}")]
    InvalidBlockDataHash(String),

    /// Epoch nonce is missing or malformed
    #[error("invalid block data epoch nonce: {0}")]
    InvalidBlockDataEpochNonce(String),

    /// Block timestamp is missing
    #[error("invalid block data timestamp: {0}")]
    InvalidBlockDataTimestamp(String),

    /// Operational certificate or KES signature does not verify
    #[error("bad signature: {0}")]
    BadSignature(String),

    /// VRF proof does not verify or its output differs from the header
    #[error("bad vrf: {0}")]
    BadVrf(String),

    /// Recomputed block body hash differs from the one committed in the header
    #[error("bad body hash: header commits to {expected}, body hashes to {computed}")]
    BadBodyHash {
        /// Body hash committed in the header
        expected: String,
        /// Body hash recomputed from the body
        computed: String,
    },

    /// A public key has the wrong size or is not a valid curve point
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// No consensus state stored at the given height
    #[error("consensus state not found at height {0}")]
    ConsensusStateNotFound(Height),

    /// No client state stored
    #[error("client state not found")]
    ClientStateNotFound,

    /// No processed time stored for the given height
    #[error("processed time not found for height {0}")]
    ProcessedTimeNotFound(Height),

    /// No processed height stored for the given height
    #[error("processed height not found for height {0}")]
    ProcessedHeightNotFound(Height),

    /// Packet delay period has not elapsed yet
    #[error("delay period has not passed: {reason}")]
    DelayPeriodNotPassed {
        /// Reason for error
        reason: String,
    },

    /// Trusted consensus state is older than allowed
    #[error("trusting period expired: consensus state is {elapsed}s old, allowed {allowed}s")]
    TrustingPeriodExpired {
        /// Age of the consensus state in seconds
        elapsed: u64,
        /// Allowed age in seconds
        allowed: u64,
    },

    /// The block producer is not part of the active stake pool set
    #[error("invalid validator set: {0}")]
    InvalidValidatorSet(String),

    /// The block producer is not part of the projected stake pool set of a new epoch
    #[error("block producer is not part of the stake pool set of epoch {epoch}")]
    InvalidSposNewEpoch {
        /// Epoch the set was projected to
        epoch: u64,
    },

    /// Upgrade path is malformed or upgrades are not supported
    #[error("invalid upgrade client: {0}")]
    InvalidUpgradeClient(String),

    /// Mithril Merkle proof is malformed or does not hash to its root
    #[error("invalid merkle mountain range proof: {0}")]
    InvalidMkProof(String),

    /// A required leaf is not part of the Mithril proof
    #[error("leaf not in proof: {0}")]
    LeafNotInProof(String),

    /// Transaction body matches none of the known eras
    #[error("transaction body does not match any supported era")]
    UnsupportedTxEra,

    /// Output does not hold exactly one host state NFT
    #[error("host state nft missing: {0}")]
    HostNftMissing(String),

    /// Output carries no inline datum
    #[error("host state output has no inline datum")]
    NoInlineDatum,

    /// Stored value does not match the expected value
    #[error("membership verification failed: {0}")]
    FailedMembershipVerification(String),

    /// A value exists where absence was expected
    #[error("non-membership verification failed: {0}")]
    FailedNonMembershipVerification(String),

    /// The operation or path category is not supported
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Block data is structurally valid but inconsistent
    #[error("invalid block data: {0}")]
    InvalidBlockData(String),

    /// Misbehaviour evidence is malformed
    #[error("invalid misbehaviour: {0}")]
    InvalidMisbehaviour(String),

    /// Mithril header is malformed or inconsistent
    #[error("invalid mithril header: {0}")]
    InvalidMithrilHeader(String),

    /// Mithril proof certifies no transaction
    #[error("no certified transaction in proof")]
    NoCertifiedTransaction,

    /// Datum does not follow the expected schema
    #[error("invalid datum: {0}")]
    InvalidDatum(String),

    /// Client is frozen
    #[error("client is frozen")]
    ClientFrozen,

    /// CBOR decoding failed
    #[error("cbor decoding failed: {0}")]
    Cbor(#[from] pallas_codec::minicbor::decode::Error),

    /// Hex decoding failed
    #[error("hex decoding failed: {0}")]
    Hex(#[from] hex::FromHexError),

    /// JSON (de)serialization failed
    #[error("json (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Protobuf decoding failed
    #[error("protobuf decoding failed: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// Protobuf encoding failed
    #[error("protobuf encoding failed: {0}")]
    ProtoEncode(#[from] prost::EncodeError),
}

impl CardanoClientError {
    /// Numeric error code registered under [`ERROR_CODESPACE`].
    ///
    /// Codes 2 to 27 follow the registration order of the host module, later kinds
    /// are appended after them.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::InvalidChainId { .. } => 2,
            Self::InvalidTrustingPeriod => 3,
            Self::InvalidBlockDataHeight { .. } => 5,
            Self::InvalidBlockDataSlot { .. } => 6,
            Self::ProcessedTimeNotFound(_) => 9,
            Self::ProcessedHeightNotFound(_) => 10,
            Self::DelayPeriodNotPassed { .. } => 11,
            Self::TrustingPeriodExpired { .. } => 12,
            Self::InvalidValidatorSet(_) => 15,
            Self::InvalidHeaderCbor(_) => 16,
            Self::InvalidBlockDataHash(_) => 17,
            Self::InvalidBlockDataEpochNonce(_) => 19,
            Self::InvalidEpochLength => 21,
            Self::InvalidSlotPerKesPeriod => 22,
            Self::InvalidBlockData(_)
            | Self::BadSignature(_)
            | Self::BadVrf(_)
            | Self::BadBodyHash { .. }
            | Self::MalformedKey(_) => 25,
            Self::InvalidSposNewEpoch { .. } => 26,
            Self::InvalidConsensusState { .. } => 27,
            Self::InvalidClientType(_) => 28,
            Self::InvalidHeight { .. } => 29,
            Self::ConsensusStateNotFound(_) => 30,
            Self::ClientStateNotFound => 31,
            Self::InvalidUpgradeClient(_) => 32,
            Self::InvalidMkProof(_) => 33,
            Self::LeafNotInProof(_) => 34,
            Self::UnsupportedTxEra => 35,
            Self::HostNftMissing(_) => 36,
            Self::NoInlineDatum => 37,
            Self::FailedMembershipVerification(_) => 38,
            Self::FailedNonMembershipVerification(_) => 39,
            Self::NotImplemented(_) => 40,
            Self::InvalidMisbehaviour(_) => 41,
            Self::InvalidMithrilHeader(_) => 42,
            Self::NoCertifiedTransaction => 43,
            Self::InvalidDatum(_)
            | Self::Cbor(_)
            | Self::Hex(_)
            | Self::Json(_)
            | Self::ProtoDecode(_)
            | Self::ProtoEncode(_) => 44,
            Self::ClientFrozen => 45,
            Self::InvalidBlockDataTimestamp(_) => 46,
        }
    }
}
