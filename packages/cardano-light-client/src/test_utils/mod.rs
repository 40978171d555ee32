//! Fixtures and an in-memory store for tests
//!
//! The block fixtures are a preprod block at height 303388, the first block of epoch 3,
//! produced by a pool of the local devnet.

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::{collections::BTreeMap, ops::Bound};

use ibc_proto::{
    google::protobuf::{Duration, Timestamp},
    ibc::{
        core::{
            channel::v1::{Channel, Counterparty as ChannelCounterparty},
            client::v1::Height as ProtoHeight,
            commitment::v1::{MerklePrefix, MerkleRoot},
            connection::v1::{ConnectionEnd, Counterparty as ConnectionCounterparty, Version},
        },
        lightclients::tendermint::v1::{
            ClientState as TmClientState, ConsensusState as TmConsensusState, Fraction,
        },
    },
};
use pallas_codec::minicbor::{data::Tag, Encoder};

use crate::{
    block,
    block_data::BlockData,
    cbor::{self, CONSTR_TAG_BASE, ENCODED_CBOR_TAG, SET_TAG},
    client_state::{ClientState, HostStateNft, TokenConfigs},
    consensus_state::ConsensusState,
    context::HostContext,
    crypto,
    datum::{
        ChannelCounterpartyDatum, ChannelDatum, ChannelDatumWithPort, ChannelStateDatum,
        ClientDatum, ClientStateDatum, ConnectionCounterpartyDatum, ConnectionDatum,
        ConnectionEndDatum, ConsensusStateDatum, HeightDatum, InnerSpecDatum, LeafSpecDatum,
        ProofSpecDatum, TokenDatum, TrustLevelDatum, VersionDatum,
    },
    height::Height,
    mithril::{
        header::{CardanoTransactionSnapshot, MithrilCertificate, MithrilHeader},
        host_state::HostStateDatum,
        mmr::{calculate_root, leaf_index_to_mmr_size, leaf_index_to_pos, MKProof, MKTreeNode},
        proof::{
            transaction_leaf, BlockRange, CardanoTransactionsProofs, CardanoTransactionsSetProof,
            MKMapProof,
        },
    },
    pool::Validator,
    store::{ClientStore, ClientStoreRead},
    update,
};

/// Bech32 id of the pool producing the fixture block
pub const FIXTURE_POOL_ID: &str = "pool13gsek6vd8dhqxsu346zvae30r4mtd77yth07fcc7p49kqc3fd09";
/// Hash of the VRF key of that pool
pub const FIXTURE_VRF_KEY_HASH: &str =
    "fec17ed60cbf2ec5be3f061fb4de0b6ef1f20947cfbfce5fb2783d12f3f69ff5";
/// Hash of the only transaction of the fixture block
pub const FIXTURE_TX_BODY_HASH: &str =
    "c0d6a9c4a5989e0735d9e903a46d5391fa1bf1276752bde3d390ae42017c6cb6";
/// Body hash committed in the fixture header
pub const FIXTURE_BODY_HASH: &str =
    "73e7c8324d657fbb5acb99aeaf06aba17f9431360c4bcda97b45038ba464700c";
/// Hash of the fixture header
pub const FIXTURE_BLOCK_HASH: &str =
    "17e149f64bcdb3c02cfaf474bda7b72c101c3d8f0ef63d98e8ab1bb1426fdef6";
/// Slots per KES period of the devnet
pub const FIXTURE_SLOT_PER_KES_PERIOD: u64 = 129_600;

const FIXTURE_PREV_HASH: &str = "40b933e31ffbb08a719d6166bb076cdf1558f3ff6130c02acd6fa15f359a7bd5";
const FIXTURE_EPOCH_NONCE: &str =
    "05B05B22EDD9CE5A1868BF7BAF80934AB56E3D9305F385A5F68CB41848A721B1";
const FIXTURE_HEADER_HEX: &str = include_str!("fixtures/header.hex");
const FIXTURE_BODY_HEX: &str = include_str!("fixtures/body.hex");

/// Time and slot of the consensus state the fixture client starts from
const TRUSTED_TIMESTAMP: u64 = 1_707_122_673;
const TRUSTED_SLOT: u64 = 1_214_009;

const HANDLER_TOKEN_UNIT: &str =
    "fe912a0d634c0901850f70fed4612f967e5b9074b3033d7e2085109a68616e646c6572";
const CLIENT_POLICY_ID: &str = "592de1385d612694eed18d767901c4731b34663e6aec79beaca88dab";
const CONNECTION_POLICY_ID: &str = "6b6d53a4fd4c7b1d8e3a0f5e7e4d2a7c1b9f3e8d0c6a5b4e3f2d1c0b";
const CHANNEL_POLICY_ID: &str = "c0f8e8aa6a2a0b19e1a1d6a4c5b3e7f2d9c8b7a6e5f4d3c2b1a09f8e";

/// Policy of the HostState NFT used by the Mithril fixtures
pub const HOST_STATE_NFT_POLICY: [u8; 28] = [0x4a; 28];
/// Token name of the HostState NFT
pub const HOST_STATE_NFT_NAME: &[u8] = b"handler";

/// An in-memory client store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn range(&self, start: &[u8], end: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        if start >= end {
            return Vec::new();
        }
        self.entries
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl ClientStoreRead for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn last_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        self.range(start, end).pop()
    }

    fn first_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        self.range(start, end).into_iter().next()
    }
}

impl ClientStore for MemoryStore {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }

    fn remove(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

/// Header CBOR of the fixture block
pub fn fixture_header() -> Vec<u8> {
    hex::decode(FIXTURE_HEADER_HEX.trim()).expect("fixture header is hex")
}

/// Body CBOR of the fixture block
pub fn fixture_block_body() -> Vec<u8> {
    hex::decode(FIXTURE_BODY_HEX.trim()).expect("fixture body is hex")
}

/// Nonce of epoch 3
pub fn fixture_epoch_nonce() -> Vec<u8> {
    hex::decode(FIXTURE_EPOCH_NONCE).expect("fixture nonce is hex")
}

/// Body of the only transaction of the fixture block
pub fn babbage_tx_body() -> Vec<u8> {
    block::decode_block_body(&fixture_block_body())
        .expect("fixture body decodes")
        .swap_remove(0)
        .body
}

/// Token configuration of the devnet handler
pub fn fixture_token_configs() -> TokenConfigs {
    TokenConfigs {
        handler_token_unit: HANDLER_TOKEN_UNIT.to_string(),
        client_policy_id: CLIENT_POLICY_ID.to_string(),
        connection_policy_id: CONNECTION_POLICY_ID.to_string(),
        channel_policy_id: CHANNEL_POLICY_ID.to_string(),
    }
}

fn fixture_validators() -> Vec<Validator> {
    vec![Validator {
        vrf_key_hash: FIXTURE_VRF_KEY_HASH.to_uppercase(),
        pool_id: FIXTURE_POOL_ID.to_string(),
    }]
}

/// A client one block behind the fixture block, still in epoch 2
pub fn fixture_client_state() -> ClientState {
    ClientState {
        chain_id: "1".to_string(),
        latest_height: Height::new(0, 303_387),
        frozen_height: Height::default(),
        valid_after: 7200,
        genesis_time: 1_705_895_324,
        current_epoch: 2,
        epoch_length: 423_000,
        slot_per_kes_period: FIXTURE_SLOT_PER_KES_PERIOD,
        current_validator_set: fixture_validators(),
        next_validator_set: fixture_validators(),
        trusting_period: 950_400,
        upgrade_path: Vec::new(),
        token_configs: fixture_token_configs(),
        host_state_nft: None,
    }
}

/// The fixture block as submitted by a relayer
pub fn fixture_block_data() -> BlockData {
    BlockData {
        height: Height::new(0, 303_388),
        slot: 1_214_030,
        hash: FIXTURE_BLOCK_HASH.to_string(),
        prev_hash: FIXTURE_PREV_HASH.to_string(),
        epoch_no: 3,
        header_cbor: fixture_header(),
        body_cbor: fixture_block_body(),
        epoch_nonce: fixture_epoch_nonce(),
        timestamp: 1_707_122_694,
        chain_id: "1".to_string(),
    }
}

/// Host context the fixture client is created in
pub fn fixture_ctx() -> HostContext {
    HostContext {
        block_time_ns: TRUSTED_TIMESTAMP * 1_000_000_000,
        block_height: Height::new(0, 1),
    }
}

/// A store initialized with [`fixture_client_state`]
pub fn fixture_store() -> (MemoryStore, ClientState) {
    let client_state = fixture_client_state();
    let consensus_state = ConsensusState {
        timestamp: TRUSTED_TIMESTAMP,
        slot: TRUSTED_SLOT,
    };
    let mut store = MemoryStore::default();
    update::initialize(
        &mut store,
        &client_state,
        &consensus_state,
        vec![0; 32],
        &fixture_ctx(),
    )
    .expect("fixture client initializes");
    (store, client_state)
}

fn encoder() -> Encoder<Vec<u8>> {
    Encoder::new(Vec::new())
}

/// Builds Babbage style transaction bodies
#[derive(Debug, Clone)]
pub struct TxBodyBuilder {
    fields: BTreeMap<u64, Vec<u8>>,
    outputs: Vec<Vec<u8>>,
    certificates: Vec<Vec<u8>>,
}

impl Default for TxBodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TxBodyBuilder {
    /// One input, no outputs and a fee
    pub fn new() -> Self {
        let mut inputs = encoder();
        inputs
            .array(1)
            .and_then(|e| e.array(2))
            .and_then(|e| e.bytes(&[0x5c; 32]))
            .and_then(|e| e.u64(0))
            .expect("encode inputs");
        let mut fee = encoder();
        fee.u64(200_000).expect("encode fee");

        let mut fields = BTreeMap::new();
        fields.insert(0, inputs.into_writer());
        fields.insert(2, fee.into_writer());
        Self {
            fields,
            outputs: Vec::new(),
            certificates: Vec::new(),
        }
    }

    /// Appends a map style output holding `coin`, the `(policy, name, quantity)` assets and an
    /// optional inline datum
    pub fn with_output(mut self, coin: u64, assets: &[(Vec<u8>, Vec<u8>, u64)], inline_datum: Option<&[u8]>) -> Self {
        let mut policies: BTreeMap<&[u8], Vec<(&[u8], u64)>> = BTreeMap::new();
        for (policy, name, quantity) in assets {
            policies
                .entry(policy.as_slice())
                .or_default()
                .push((name.as_slice(), *quantity));
        }

        let mut address = vec![0x60_u8];
        address.extend([0x42; 28]);

        let mut e = encoder();
        e.map(if inline_datum.is_some() { 3 } else { 2 })
            .and_then(|e| e.u64(0))
            .and_then(|e| e.bytes(&address))
            .and_then(|e| e.u64(1))
            .expect("encode output");
        if policies.is_empty() {
            e.u64(coin).expect("encode coin");
        } else {
            e.array(2)
                .and_then(|e| e.u64(coin))
                .and_then(|e| e.map(policies.len() as u64))
                .expect("encode value");
            for (policy, names) in &policies {
                e.bytes(policy)
                    .and_then(|e| e.map(names.len() as u64))
                    .expect("encode policy");
                for (name, quantity) in names {
                    e.bytes(name).and_then(|e| e.u64(*quantity)).expect("encode asset");
                }
            }
        }
        if let Some(datum) = inline_datum {
            e.u64(2)
                .and_then(|e| e.array(2))
                .and_then(|e| e.u64(1))
                .and_then(|e| e.tag(Tag::new(ENCODED_CBOR_TAG)))
                .and_then(|e| e.bytes(datum))
                .expect("encode datum");
        }
        self.outputs.push(e.into_writer());
        self
    }

    /// Appends a pool registration certificate
    pub fn with_pool_registration(mut self, operator: &[u8], vrf_key_hash: &[u8]) -> Self {
        let mut reward_account = vec![0xe0_u8];
        reward_account.extend_from_slice(operator);

        let mut e = encoder();
        e.array(10)
            .and_then(|e| e.u64(3))
            .and_then(|e| e.bytes(operator))
            .and_then(|e| e.bytes(vrf_key_hash))
            .and_then(|e| e.u64(500_000_000))
            .and_then(|e| e.u64(340_000_000))
            .and_then(|e| e.tag(Tag::new(30)))
            .and_then(|e| e.array(2))
            .and_then(|e| e.u64(1))
            .and_then(|e| e.u64(20))
            .and_then(|e| e.bytes(&reward_account))
            .and_then(|e| e.array(0))
            .and_then(|e| e.array(0))
            .and_then(|e| e.null())
            .expect("encode pool registration");
        self.certificates.push(e.into_writer());
        self
    }

    /// Appends a pool retirement certificate
    pub fn with_pool_retirement(mut self, operator: &[u8], epoch: u64) -> Self {
        let mut e = encoder();
        e.array(3)
            .and_then(|e| e.u64(4))
            .and_then(|e| e.bytes(operator))
            .and_then(|e| e.u64(epoch))
            .expect("encode pool retirement");
        self.certificates.push(e.into_writer());
        self
    }

    /// Appends a stake key registration certificate
    pub fn with_stake_registration(mut self) -> Self {
        let mut e = encoder();
        e.array(2)
            .and_then(|e| e.u64(0))
            .and_then(|e| e.array(2))
            .and_then(|e| e.u64(0))
            .and_then(|e| e.bytes(&[0x77; 28]))
            .expect("encode stake registration");
        self.certificates.push(e.into_writer());
        self
    }

    /// Encodes the body with its keys in ascending order
    pub fn build(mut self) -> Vec<u8> {
        let mut outputs = encoder();
        outputs
            .array(self.outputs.len() as u64)
            .expect("encode outputs");
        for output in &self.outputs {
            outputs.writer_mut().extend_from_slice(output);
        }
        self.fields.entry(1).or_insert_with(|| outputs.into_writer());

        if !self.certificates.is_empty() {
            let mut certificates = encoder();
            certificates
                .tag(Tag::new(SET_TAG))
                .and_then(|e| e.array(self.certificates.len() as u64))
                .expect("encode certificates");
            for certificate in &self.certificates {
                certificates.writer_mut().extend_from_slice(certificate);
            }
            self.fields.insert(4, certificates.into_writer());
        }

        let mut e = encoder();
        e.map(self.fields.len() as u64).expect("encode body");
        for (key, value) in &self.fields {
            e.u64(*key).expect("encode key");
            e.writer_mut().extend_from_slice(value);
        }
        e.into_writer()
    }
}

/// A block body holding `tx_bodies`, each with an empty witness set and no auxiliary data
pub fn block_body_with_txs(tx_bodies: &[Vec<u8>]) -> Vec<u8> {
    let mut e = encoder();
    e.array(tx_bodies.len() as u64).expect("encode block body");
    for body in tx_bodies {
        e.array(3)
            .and_then(|e| e.str(&hex::encode(body)))
            .and_then(|e| e.str("a0"))
            .and_then(|e| e.str(""))
            .expect("encode transaction");
    }
    e.into_writer()
}

/// Constructor tag of the IBC enum value `value`
const fn enum_tag(value: u64) -> u64 {
    CONSTR_TAG_BASE + value
}

fn iavl_spec() -> ProofSpecDatum {
    ProofSpecDatum {
        leaf_spec: LeafSpecDatum {
            hash: 1,
            prehash_key: 0,
            prehash_value: 1,
            length: 1,
            prefix: vec![0],
        },
        inner_spec: InnerSpecDatum {
            child_order: vec![0, 1],
            child_size: 33,
            min_prefix_length: 4,
            max_prefix_length: 12,
            empty_child: Vec::new(),
            hash: 1,
        },
        max_depth: 0,
        min_depth: 0,
        prehash_key_before_comparison: false,
    }
}

fn auth_token(name: &str) -> TokenDatum {
    TokenDatum {
        policy_id: hex::decode(CLIENT_POLICY_ID).expect("policy is hex"),
        name: name.as_bytes().to_vec(),
    }
}

/// Datum of a client UTXO tracking a Tendermint chain
pub fn client_datum() -> ClientDatum {
    let consensus_state = |timestamp: u64, fill: u8| ConsensusStateDatum {
        timestamp,
        next_validators_hash: vec![fill; 32],
        root_hash: vec![fill.wrapping_add(1); 32],
    };
    ClientDatum {
        client_state: ClientStateDatum {
            chain_id: b"sidechain".to_vec(),
            trust_level: TrustLevelDatum {
                numerator: 1,
                denominator: 3,
            },
            trusting_period: 1_209_600_000_000_000,
            unbonding_period: 1_814_400_000_000_000,
            max_clock_drift: 10_000_000_000,
            frozen_height: HeightDatum::default(),
            latest_height: HeightDatum {
                revision_number: 1,
                revision_height: 120,
            },
            proof_specs: vec![iavl_spec()],
        },
        consensus_states: vec![
            (
                HeightDatum {
                    revision_number: 1,
                    revision_height: 119,
                },
                consensus_state(1_707_122_600_123_456_789, 0x10),
            ),
            (
                HeightDatum {
                    revision_number: 1,
                    revision_height: 120,
                },
                consensus_state(1_707_122_606_000_000_000, 0x20),
            ),
        ],
        token: auth_token("ibc_client"),
    }
}

/// Datum of an open connection UTXO
pub fn connection_datum() -> ConnectionDatum {
    ConnectionDatum {
        state: ConnectionEndDatum {
            client_id: b"07-tendermint-0".to_vec(),
            versions: vec![VersionDatum {
                identifier: b"1".to_vec(),
                features: vec![b"ORDER_ORDERED".to_vec(), b"ORDER_UNORDERED".to_vec()],
            }],
            state: enum_tag(3),
            counterparty: ConnectionCounterpartyDatum {
                client_id: b"099-cardano-0".to_vec(),
                connection_id: b"connection-0".to_vec(),
                key_prefix: b"ibc".to_vec(),
            },
            delay_period: 0,
        },
        token: auth_token("ibc_connection"),
    }
}

/// Datum of an open unordered transfer channel with packets in flight
pub fn channel_datum_with_port() -> ChannelDatumWithPort {
    ChannelDatumWithPort {
        state: ChannelStateDatum {
            channel: ChannelDatum {
                state: enum_tag(3),
                ordering: enum_tag(1),
                counterparty: ChannelCounterpartyDatum {
                    port_id: b"transfer".to_vec(),
                    channel_id: b"channel-3".to_vec(),
                },
                connection_hops: vec![b"connection-0".to_vec()],
                version: b"ics20-1".to_vec(),
            },
            next_sequence_send: 4,
            next_sequence_recv: 3,
            next_sequence_ack: 2,
            packet_commitment: vec![(2, vec![0xc2; 32]), (3, vec![0xc3; 32])],
            packet_receipt: vec![(1, Vec::new()), (2, Vec::new())],
            packet_acknowledgement: vec![(1, vec![0xa1; 32])],
        },
        port_id: b"port-100".to_vec(),
        token: auth_token("ibc_channel"),
    }
}

fn proto_duration(nanos: u64) -> Duration {
    Duration {
        seconds: i64::try_from(nanos / 1_000_000_000).expect("duration fits"),
        nanos: i32::try_from(nanos % 1_000_000_000).expect("nanos fit"),
    }
}

const fn proto_height(height: HeightDatum) -> ProtoHeight {
    ProtoHeight {
        revision_number: height.revision_number,
        revision_height: height.revision_height,
    }
}

fn utf8(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).expect("fixture strings are utf-8")
}

/// The Tendermint client state a counterparty holds for `datum`
pub fn tm_client_state(datum: &ClientStateDatum) -> TmClientState {
    TmClientState {
        chain_id: utf8(&datum.chain_id),
        trust_level: Some(Fraction {
            numerator: datum.trust_level.numerator,
            denominator: datum.trust_level.denominator,
        }),
        trusting_period: Some(proto_duration(datum.trusting_period)),
        unbonding_period: Some(proto_duration(datum.unbonding_period)),
        max_clock_drift: Some(proto_duration(datum.max_clock_drift)),
        frozen_height: Some(proto_height(datum.frozen_height)),
        latest_height: Some(proto_height(datum.latest_height)),
        ..Default::default()
    }
}

/// The Tendermint consensus state a counterparty holds for `datum`
pub fn tm_consensus_state(datum: &ConsensusStateDatum) -> TmConsensusState {
    let duration = proto_duration(datum.timestamp);
    TmConsensusState {
        timestamp: Some(Timestamp {
            seconds: duration.seconds,
            nanos: duration.nanos,
        }),
        root: Some(MerkleRoot {
            hash: datum.root_hash.clone(),
        }),
        next_validators_hash: datum.next_validators_hash.clone(),
    }
}

fn enum_value(tag: u64) -> i32 {
    i32::try_from(tag - CONSTR_TAG_BASE).expect("enum values are small")
}

/// The connection end a counterparty holds for `datum`
pub fn tm_connection_end(datum: &ConnectionEndDatum) -> ConnectionEnd {
    ConnectionEnd {
        client_id: utf8(&datum.client_id),
        versions: datum
            .versions
            .iter()
            .map(|v| Version {
                identifier: utf8(&v.identifier),
                features: v.features.iter().map(|f| utf8(f)).collect(),
            })
            .collect(),
        state: enum_value(datum.state),
        counterparty: Some(ConnectionCounterparty {
            client_id: utf8(&datum.counterparty.client_id),
            connection_id: utf8(&datum.counterparty.connection_id),
            prefix: Some(MerklePrefix {
                key_prefix: datum.counterparty.key_prefix.clone(),
            }),
        }),
        delay_period: datum.delay_period,
    }
}

/// The channel end a counterparty holds for `datum`
pub fn tm_channel(datum: &ChannelDatum) -> Channel {
    Channel {
        state: enum_value(datum.state),
        ordering: enum_value(datum.ordering),
        counterparty: Some(ChannelCounterparty {
            port_id: utf8(&datum.counterparty.port_id),
            channel_id: utf8(&datum.counterparty.channel_id),
        }),
        connection_hops: datum.connection_hops.iter().map(|h| utf8(h)).collect(),
        version: utf8(&datum.version),
        ..Default::default()
    }
}

/// Aggregator proofs certifying `tx_hashes`: one range holding every transaction, next to
/// another range
pub fn transactions_proof(tx_hashes: &[&str]) -> CardanoTransactionsProofs {
    let last = u64::try_from(tx_hashes.len()).expect("few transactions") - 1;
    let leaves: Vec<(u64, MKTreeNode)> = (0..)
        .zip(tx_hashes)
        .map(|(index, tx_hash)| (leaf_index_to_pos(index), transaction_leaf(tx_hash)))
        .collect();
    let size = leaf_index_to_mmr_size(last);
    let sub_root = calculate_root(leaves.clone(), size, &[]).expect("sub range root");
    let sub_proof = MKMapProof {
        master_proof: MKProof {
            inner_root: sub_root.clone(),
            inner_leaves: leaves,
            inner_proof_size: size,
            inner_proof_items: Vec::new(),
        },
        sub_proofs: Vec::new(),
    };

    let range = BlockRange { start: 0, end: 15 };
    let range_leaf = MKTreeNode::from(range).merge(&sub_root);
    let sibling = MKTreeNode::from(BlockRange { start: 15, end: 30 })
        .merge(&MKTreeNode::new(vec![0x5a; 32]));
    let master_root = calculate_root(
        vec![(0, range_leaf.clone())],
        3,
        std::slice::from_ref(&sibling),
    )
    .expect("master root");

    CardanoTransactionsProofs {
        certificate_hash: String::new(),
        certified_transactions: vec![CardanoTransactionsSetProof {
            transactions_hashes: tx_hashes.iter().map(ToString::to_string).collect(),
            proof: MKMapProof {
                master_proof: MKProof {
                    inner_root: master_root,
                    inner_leaves: vec![(0, range_leaf)],
                    inner_proof_size: 3,
                    inner_proof_items: vec![sibling],
                },
                sub_proofs: vec![(range, sub_proof)],
            },
        }],
        non_certified_transactions: Vec::new(),
        latest_block_number: 29,
    }
}

/// Inline datum of a HostState output committing to `ibc_state_root`
pub fn host_state_datum(ibc_state_root: [u8; 32]) -> Vec<u8> {
    cbor::to_vec(&HostStateDatum {
        version: 3,
        ibc_state_root: ibc_state_root.to_vec(),
        next_client_sequence: 1,
        next_connection_sequence: 1,
        next_channel_sequence: 4,
        bound_port: vec![99, 100],
        last_update_time: 1_707_122_694_000,
        nft_policy: HOST_STATE_NFT_POLICY.to_vec(),
    })
    .expect("host state datum encodes")
}

/// A handler transaction: a change output, then the HostState output holding `nft_quantity`
/// NFTs and `inline_datum`
pub fn host_state_tx_body(nft_quantity: u64, inline_datum: Option<&[u8]>) -> Vec<u8> {
    TxBodyBuilder::new()
        .with_output(9_000_000, &[], None)
        .with_output(
            2_000_000,
            &[(
                HOST_STATE_NFT_POLICY.to_vec(),
                HOST_STATE_NFT_NAME.to_vec(),
                nft_quantity,
            )],
            inline_datum,
        )
        .build()
}

/// [`fixture_client_state`] tracking the HostState NFT
pub fn mithril_client_state() -> ClientState {
    ClientState {
        host_state_nft: Some(HostStateNft {
            policy_id: HOST_STATE_NFT_POLICY.to_vec(),
            token_name: HOST_STATE_NFT_NAME.to_vec(),
        }),
        ..fixture_client_state()
    }
}

/// A Mithril header ten blocks past `client_state` whose HostState output commits to
/// `ibc_state_root`
pub fn mithril_header(client_state: &ClientState, ibc_state_root: [u8; 32]) -> MithrilHeader {
    let body = host_state_tx_body(1, Some(&host_state_datum(ibc_state_root)));
    let tx_hash = hex::encode(crypto::blake2b_256(&body));
    let other_tx = "7d".repeat(32);
    let proofs = transactions_proof(&[&tx_hash, &other_tx]);
    let merkle_root = proofs.certified_transactions[0].merkle_root();

    let certificate_hash = hex::encode(crypto::blake2b_256(merkle_root.as_bytes()));
    let epoch = client_state.current_epoch;
    let block_number = client_state.latest_height.revision_height + 10;

    MithrilHeader {
        transaction_snapshot: CardanoTransactionSnapshot {
            merkle_root: merkle_root.clone(),
            epoch,
            block_number,
            certificate_hash: certificate_hash.clone(),
        },
        transaction_snapshot_certificate: MithrilCertificate {
            hash: certificate_hash,
            previous_hash: "00".repeat(32),
            epoch,
            merkle_root,
            latest_block_number: block_number,
            sealed_at: "2024-02-05T08:44:53Z".to_string(),
            multi_signature: String::new(),
        },
        host_state_tx_hash: tx_hash,
        host_state_tx_body_cbor: body,
        host_state_tx_output_index: 1,
        host_state_tx_proof: serde_json::to_string(&proofs).expect("proofs serialize"),
    }
}
