//! Datums the counterparty publishes in UTXOs, with their CBOR codecs.
//!
//! Decoding accepts the `PlutusData` form found on chain; encoding writes the canonical form
//! used for the entries of the verification store.

use pallas_codec::minicbor::{
    data::Type,
    decode::{self, Decoder},
    encode::{self, Encoder, Write},
    Decode, Encode,
};

use crate::{
    cbor::{self, CONSTR_TAG_BASE},
    height::Height,
};

/// `(revision_number, revision_height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HeightDatum {
    /// Revision number
    pub revision_number: u64,
    /// Revision height
    pub revision_height: u64,
}

impl From<HeightDatum> for Height {
    fn from(h: HeightDatum) -> Self {
        Self::new(h.revision_number, h.revision_height)
    }
}

impl From<Height> for HeightDatum {
    fn from(h: Height) -> Self {
        Self {
            revision_number: h.revision_number,
            revision_height: h.revision_height,
        }
    }
}

impl<'b, C> Decode<'b, C> for HeightDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "revision_number")?;
        let revision_number = d.u64()?;
        r.expect(d, "revision_height")?;
        let revision_height = d.u64()?;
        r.finish(d)?;
        Ok(Self {
            revision_number,
            revision_height,
        })
    }
}

impl<C> Encode<C> for HeightDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.u64(self.revision_number)?.u64(self.revision_height)?;
        Ok(())
    }
}

/// Tendermint trust level fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrustLevelDatum {
    /// Numerator
    pub numerator: u64,
    /// Denominator
    pub denominator: u64,
}

impl<'b, C> Decode<'b, C> for TrustLevelDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "numerator")?;
        let numerator = d.u64()?;
        r.expect(d, "denominator")?;
        let denominator = d.u64()?;
        r.finish(d)?;
        Ok(Self {
            numerator,
            denominator,
        })
    }
}

impl<C> Encode<C> for TrustLevelDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.u64(self.numerator)?.u64(self.denominator)?;
        Ok(())
    }
}

/// ICS23 leaf spec
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeafSpecDatum {
    /// Hash operation
    pub hash: i32,
    /// Hash operation applied to the key
    pub prehash_key: i32,
    /// Hash operation applied to the value
    pub prehash_value: i32,
    /// Length operation
    pub length: i32,
    /// Leaf prefix
    pub prefix: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for LeafSpecDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "hash")?;
        let hash = d.i32()?;
        r.expect(d, "prehash_key")?;
        let prehash_key = d.i32()?;
        r.expect(d, "prehash_value")?;
        let prehash_value = d.i32()?;
        r.expect(d, "length")?;
        let length = d.i32()?;
        r.expect(d, "prefix")?;
        let prefix = cbor::bytes(d)?;
        r.finish(d)?;
        Ok(Self {
            hash,
            prehash_key,
            prehash_value,
            length,
            prefix,
        })
    }
}

impl<C> Encode<C> for LeafSpecDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(5)?
            .i32(self.hash)?
            .i32(self.prehash_key)?
            .i32(self.prehash_value)?
            .i32(self.length)?
            .bytes(&self.prefix)?;
        Ok(())
    }
}

/// ICS23 inner node spec
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InnerSpecDatum {
    /// Child ordering
    pub child_order: Vec<i32>,
    /// Child size
    pub child_size: i32,
    /// Minimum prefix length
    pub min_prefix_length: i32,
    /// Maximum prefix length
    pub max_prefix_length: i32,
    /// Hash of an empty child
    pub empty_child: Vec<u8>,
    /// Hash operation
    pub hash: i32,
}

impl<'b, C> Decode<'b, C> for InnerSpecDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "child_order")?;
        let child_order = cbor::list(d, Decoder::i32)?;
        r.expect(d, "child_size")?;
        let child_size = d.i32()?;
        r.expect(d, "min_prefix_length")?;
        let min_prefix_length = d.i32()?;
        r.expect(d, "max_prefix_length")?;
        let max_prefix_length = d.i32()?;
        r.expect(d, "empty_child")?;
        let empty_child = cbor::bytes(d)?;
        r.expect(d, "hash")?;
        let hash = d.i32()?;
        r.finish(d)?;
        Ok(Self {
            child_order,
            child_size,
            min_prefix_length,
            max_prefix_length,
            empty_child,
            hash,
        })
    }
}

impl<C> Encode<C> for InnerSpecDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(6)?.array(self.child_order.len() as u64)?;
        for order in &self.child_order {
            e.i32(*order)?;
        }
        e.i32(self.child_size)?
            .i32(self.min_prefix_length)?
            .i32(self.max_prefix_length)?
            .bytes(&self.empty_child)?
            .i32(self.hash)?;
        Ok(())
    }
}

/// ICS23 proof spec
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProofSpecDatum {
    /// Leaf spec
    pub leaf_spec: LeafSpecDatum,
    /// Inner node spec
    pub inner_spec: InnerSpecDatum,
    /// Maximum depth
    pub max_depth: i32,
    /// Minimum depth
    pub min_depth: i32,
    /// Whether keys are prehashed before comparison
    pub prehash_key_before_comparison: bool,
}

impl<'b, C> Decode<'b, C> for ProofSpecDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "leaf_spec")?;
        let leaf_spec = LeafSpecDatum::decode(d, ctx)?;
        r.expect(d, "inner_spec")?;
        let inner_spec = InnerSpecDatum::decode(d, ctx)?;
        r.expect(d, "max_depth")?;
        let max_depth = d.i32()?;
        r.expect(d, "min_depth")?;
        let min_depth = d.i32()?;
        r.expect(d, "prehash_key_before_comparison")?;
        let prehash_key_before_comparison = if d.datatype()? == Type::Bool {
            d.bool()?
        } else {
            cbor::enum_tag(d)? != CONSTR_TAG_BASE
        };
        r.finish(d)?;
        Ok(Self {
            leaf_spec,
            inner_spec,
            max_depth,
            min_depth,
            prehash_key_before_comparison,
        })
    }
}

impl<C> Encode<C> for ProofSpecDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(5)?;
        self.leaf_spec.encode(e, ctx)?;
        self.inner_spec.encode(e, ctx)?;
        e.i32(self.max_depth)?.i32(self.min_depth)?;
        cbor::write_enum_tag(e, CONSTR_TAG_BASE + u64::from(self.prehash_key_before_comparison))
    }
}

/// A Tendermint client state as stored by the counterparty.
///
/// Durations are nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientStateDatum {
    /// Chain id, UTF-8
    pub chain_id: Vec<u8>,
    /// Trust level
    pub trust_level: TrustLevelDatum,
    /// Trusting period in nanoseconds
    pub trusting_period: u64,
    /// Unbonding period in nanoseconds
    pub unbonding_period: u64,
    /// Maximum clock drift in nanoseconds
    pub max_clock_drift: u64,
    /// Frozen height
    pub frozen_height: HeightDatum,
    /// Latest height
    pub latest_height: HeightDatum,
    /// Proof specs, absent in older datums
    pub proof_specs: Vec<ProofSpecDatum>,
}

impl<'b, C> Decode<'b, C> for ClientStateDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "chain_id")?;
        let chain_id = cbor::bytes(d)?;
        r.expect(d, "trust_level")?;
        let trust_level = TrustLevelDatum::decode(d, ctx)?;
        r.expect(d, "trusting_period")?;
        let trusting_period = d.u64()?;
        r.expect(d, "unbonding_period")?;
        let unbonding_period = d.u64()?;
        r.expect(d, "max_clock_drift")?;
        let max_clock_drift = d.u64()?;
        r.expect(d, "frozen_height")?;
        let frozen_height = HeightDatum::decode(d, ctx)?;
        r.expect(d, "latest_height")?;
        let latest_height = HeightDatum::decode(d, ctx)?;
        let proof_specs = if r.next(d)? {
            cbor::list(d, |d| ProofSpecDatum::decode(d, ctx))?
        } else {
            Vec::new()
        };
        r.finish(d)?;
        Ok(Self {
            chain_id,
            trust_level,
            trusting_period,
            unbonding_period,
            max_clock_drift,
            frozen_height,
            latest_height,
            proof_specs,
        })
    }
}

impl<C> Encode<C> for ClientStateDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(8)?.bytes(&self.chain_id)?;
        self.trust_level.encode(e, ctx)?;
        e.u64(self.trusting_period)?
            .u64(self.unbonding_period)?
            .u64(self.max_clock_drift)?;
        self.frozen_height.encode(e, ctx)?;
        self.latest_height.encode(e, ctx)?;
        e.array(self.proof_specs.len() as u64)?;
        for spec in &self.proof_specs {
            spec.encode(e, ctx)?;
        }
        Ok(())
    }
}

/// A Tendermint consensus state as stored by the counterparty
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsensusStateDatum {
    /// Block time in nanoseconds
    pub timestamp: u64,
    /// Hash of the next validator set
    pub next_validators_hash: Vec<u8>,
    /// Commitment root hash
    pub root_hash: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for ConsensusStateDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "timestamp")?;
        let timestamp = d.u64()?;
        r.expect(d, "next_validators_hash")?;
        let next_validators_hash = cbor::bytes(d)?;
        r.expect(d, "root")?;
        let mut root = cbor::open_record(d)?;
        root.expect(d, "root.hash")?;
        let root_hash = cbor::bytes(d)?;
        root.finish(d)?;
        r.finish(d)?;
        Ok(Self {
            timestamp,
            next_validators_hash,
            root_hash,
        })
    }
}

impl<C> Encode<C> for ConsensusStateDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(3)?
            .u64(self.timestamp)?
            .bytes(&self.next_validators_hash)?
            .array(1)?
            .bytes(&self.root_hash)?;
        Ok(())
    }
}

/// Auth token identifying the UTXO of an IBC object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenDatum {
    /// Minting policy id
    pub policy_id: Vec<u8>,
    /// Asset name
    pub name: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for TokenDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "policy_id")?;
        let policy_id = cbor::bytes(d)?;
        r.expect(d, "name")?;
        let name = cbor::bytes(d)?;
        r.finish(d)?;
        Ok(Self { policy_id, name })
    }
}

impl<C> Encode<C> for TokenDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.bytes(&self.policy_id)?.bytes(&self.name)?;
        Ok(())
    }
}

/// Datum of a client UTXO: the client state and all of its consensus states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientDatum {
    /// Client state
    pub client_state: ClientStateDatum,
    /// Consensus states by height, in encoded order
    pub consensus_states: Vec<(HeightDatum, ConsensusStateDatum)>,
    /// Auth token
    pub token: TokenDatum,
}

impl<'b, C> Decode<'b, C> for ClientDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "state")?;
        let mut state = cbor::open_record(d)?;
        state.expect(d, "client_state")?;
        let client_state = ClientStateDatum::decode(d, ctx)?;
        state.expect(d, "consensus_states")?;
        let consensus_states = {
            let ctx = &mut *ctx;
            let mut seq = cbor::open_map(d)?;
            let mut out = Vec::new();
            while seq.next(d)? {
                let height = HeightDatum::decode(d, ctx)?;
                out.push((height, ConsensusStateDatum::decode(d, ctx)?));
            }
            seq.finish(d)?;
            out
        };
        state.finish(d)?;
        r.expect(d, "token")?;
        let token = TokenDatum::decode(d, ctx)?;
        r.finish(d)?;
        Ok(Self {
            client_state,
            consensus_states,
            token,
        })
    }
}

impl<C> Encode<C> for ClientDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.array(2)?;
        self.client_state.encode(e, ctx)?;
        e.map(self.consensus_states.len() as u64)?;
        for (height, consensus_state) in &self.consensus_states {
            height.encode(e, ctx)?;
            consensus_state.encode(e, ctx)?;
        }
        self.token.encode(e, ctx)
    }
}

/// Connection version
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionDatum {
    /// Version identifier
    pub identifier: Vec<u8>,
    /// Supported features
    pub features: Vec<Vec<u8>>,
}

impl<'b, C> Decode<'b, C> for VersionDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "identifier")?;
        let identifier = cbor::bytes(d)?;
        r.expect(d, "features")?;
        let features = cbor::list(d, cbor::bytes)?;
        r.finish(d)?;
        Ok(Self {
            identifier,
            features,
        })
    }
}

impl<C> Encode<C> for VersionDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?
            .bytes(&self.identifier)?
            .array(self.features.len() as u64)?;
        for feature in &self.features {
            e.bytes(feature)?;
        }
        Ok(())
    }
}

/// Counterparty of a connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionCounterpartyDatum {
    /// Counterparty client id
    pub client_id: Vec<u8>,
    /// Counterparty connection id
    pub connection_id: Vec<u8>,
    /// Counterparty commitment key prefix
    pub key_prefix: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for ConnectionCounterpartyDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "client_id")?;
        let client_id = cbor::bytes(d)?;
        r.expect(d, "connection_id")?;
        let connection_id = cbor::bytes(d)?;
        r.expect(d, "prefix")?;
        let mut prefix = cbor::open_record(d)?;
        prefix.expect(d, "prefix.key_prefix")?;
        let key_prefix = cbor::bytes(d)?;
        prefix.finish(d)?;
        r.finish(d)?;
        Ok(Self {
            client_id,
            connection_id,
            key_prefix,
        })
    }
}

impl<C> Encode<C> for ConnectionCounterpartyDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(3)?
            .bytes(&self.client_id)?
            .bytes(&self.connection_id)?
            .array(1)?
            .bytes(&self.key_prefix)?;
        Ok(())
    }
}

/// Connection end.
///
/// `state` is the raw constructor tag number, `121 + ibc state`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionEndDatum {
    /// Client id
    pub client_id: Vec<u8>,
    /// Compatible versions
    pub versions: Vec<VersionDatum>,
    /// State tag
    pub state: u64,
    /// Counterparty
    pub counterparty: ConnectionCounterpartyDatum,
    /// Delay period in nanoseconds
    pub delay_period: u64,
}

impl<'b, C> Decode<'b, C> for ConnectionEndDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "client_id")?;
        let client_id = cbor::bytes(d)?;
        r.expect(d, "versions")?;
        let versions = cbor::list(d, |d| VersionDatum::decode(d, ctx))?;
        r.expect(d, "state")?;
        let state = cbor::enum_tag(d)?;
        r.expect(d, "counterparty")?;
        let counterparty = ConnectionCounterpartyDatum::decode(d, ctx)?;
        r.expect(d, "delay_period")?;
        let delay_period = d.u64()?;
        r.finish(d)?;
        Ok(Self {
            client_id,
            versions,
            state,
            counterparty,
            delay_period,
        })
    }
}

impl<C> Encode<C> for ConnectionEndDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(5)?
            .bytes(&self.client_id)?
            .array(self.versions.len() as u64)?;
        for version in &self.versions {
            version.encode(e, ctx)?;
        }
        cbor::write_enum_tag(e, self.state)?;
        self.counterparty.encode(e, ctx)?;
        e.u64(self.delay_period)?;
        Ok(())
    }
}

/// Datum of a connection UTXO
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionDatum {
    /// Connection end
    pub state: ConnectionEndDatum,
    /// Auth token
    pub token: TokenDatum,
}

impl<'b, C> Decode<'b, C> for ConnectionDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "state")?;
        let state = ConnectionEndDatum::decode(d, ctx)?;
        r.expect(d, "token")?;
        let token = TokenDatum::decode(d, ctx)?;
        r.finish(d)?;
        Ok(Self { state, token })
    }
}

impl<C> Encode<C> for ConnectionDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        self.state.encode(e, ctx)?;
        self.token.encode(e, ctx)
    }
}

/// Counterparty of a channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelCounterpartyDatum {
    /// Counterparty port id
    pub port_id: Vec<u8>,
    /// Counterparty channel id
    pub channel_id: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for ChannelCounterpartyDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "port_id")?;
        let port_id = cbor::bytes(d)?;
        r.expect(d, "channel_id")?;
        let channel_id = cbor::bytes(d)?;
        r.finish(d)?;
        Ok(Self {
            port_id,
            channel_id,
        })
    }
}

impl<C> Encode<C> for ChannelCounterpartyDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.bytes(&self.port_id)?.bytes(&self.channel_id)?;
        Ok(())
    }
}

/// Channel end.
///
/// `state` and `ordering` are raw constructor tag numbers, `121 + ibc enum value`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelDatum {
    /// State tag
    pub state: u64,
    /// Ordering tag
    pub ordering: u64,
    /// Counterparty
    pub counterparty: ChannelCounterpartyDatum,
    /// Connection hops
    pub connection_hops: Vec<Vec<u8>>,
    /// Channel version
    pub version: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for ChannelDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "state")?;
        let state = cbor::enum_tag(d)?;
        r.expect(d, "ordering")?;
        let ordering = cbor::enum_tag(d)?;
        r.expect(d, "counterparty")?;
        let counterparty = ChannelCounterpartyDatum::decode(d, ctx)?;
        r.expect(d, "connection_hops")?;
        let connection_hops = cbor::list(d, cbor::bytes)?;
        r.expect(d, "version")?;
        let version = cbor::bytes(d)?;
        r.finish(d)?;
        Ok(Self {
            state,
            ordering,
            counterparty,
            connection_hops,
            version,
        })
    }
}

impl<C> Encode<C> for ChannelDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(5)?;
        cbor::write_enum_tag(e, self.state)?;
        cbor::write_enum_tag(e, self.ordering)?;
        self.counterparty.encode(e, ctx)?;
        e.array(self.connection_hops.len() as u64)?;
        for hop in &self.connection_hops {
            e.bytes(hop)?;
        }
        e.bytes(&self.version)?;
        Ok(())
    }
}

/// Channel end together with its packet bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelStateDatum {
    /// Channel end
    pub channel: ChannelDatum,
    /// Next send sequence
    pub next_sequence_send: u64,
    /// Next receive sequence
    pub next_sequence_recv: u64,
    /// Next acknowledgement sequence
    pub next_sequence_ack: u64,
    /// Packet commitments by sequence
    pub packet_commitment: Vec<(u64, Vec<u8>)>,
    /// Packet receipts by sequence
    pub packet_receipt: Vec<(u64, Vec<u8>)>,
    /// Packet acknowledgements by sequence
    pub packet_acknowledgement: Vec<(u64, Vec<u8>)>,
}

impl<'b, C> Decode<'b, C> for ChannelStateDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "channel")?;
        let channel = ChannelDatum::decode(d, ctx)?;
        r.expect(d, "next_sequence_send")?;
        let next_sequence_send = d.u64()?;
        r.expect(d, "next_sequence_recv")?;
        let next_sequence_recv = d.u64()?;
        r.expect(d, "next_sequence_ack")?;
        let next_sequence_ack = d.u64()?;
        r.expect(d, "packet_commitment")?;
        let packet_commitment = cbor::map(d, Decoder::u64, cbor::bytes)?;
        r.expect(d, "packet_receipt")?;
        let packet_receipt = cbor::map(d, Decoder::u64, cbor::bytes)?;
        r.expect(d, "packet_acknowledgement")?;
        let packet_acknowledgement = cbor::map(d, Decoder::u64, cbor::bytes)?;
        r.finish(d)?;
        Ok(Self {
            channel,
            next_sequence_send,
            next_sequence_recv,
            next_sequence_ack,
            packet_commitment,
            packet_receipt,
            packet_acknowledgement,
        })
    }
}

fn encode_sequence_map<W: Write>(
    e: &mut Encoder<W>,
    entries: &[(u64, Vec<u8>)],
) -> Result<(), encode::Error<W::Error>> {
    e.map(entries.len() as u64)?;
    for (sequence, value) in entries {
        e.u64(*sequence)?.bytes(value)?;
    }
    Ok(())
}

impl<C> Encode<C> for ChannelStateDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(7)?;
        self.channel.encode(e, ctx)?;
        e.u64(self.next_sequence_send)?
            .u64(self.next_sequence_recv)?
            .u64(self.next_sequence_ack)?;
        encode_sequence_map(e, &self.packet_commitment)?;
        encode_sequence_map(e, &self.packet_receipt)?;
        encode_sequence_map(e, &self.packet_acknowledgement)
    }
}

/// Datum of a channel UTXO
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelDatumWithPort {
    /// Channel state
    pub state: ChannelStateDatum,
    /// Port the channel is bound to
    pub port_id: Vec<u8>,
    /// Auth token
    pub token: TokenDatum,
}

impl<'b, C> Decode<'b, C> for ChannelDatumWithPort {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "state")?;
        let state = ChannelStateDatum::decode(d, ctx)?;
        r.expect(d, "port_id")?;
        let port_id = cbor::bytes(d)?;
        r.expect(d, "token")?;
        let token = TokenDatum::decode(d, ctx)?;
        r.finish(d)?;
        Ok(Self {
            state,
            port_id,
            token,
        })
    }
}

impl<C> Encode<C> for ChannelDatumWithPort {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.array(3)?;
        self.state.encode(e, ctx)?;
        e.bytes(&self.port_id)?;
        self.token.encode(e, ctx)
    }
}
