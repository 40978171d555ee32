//! Indexing of the counterparty's IBC datums.
//!
//! The counterparty keeps each IBC object in a UTXO marked by an auth token. When a block is
//! installed, every output carrying a recognized token has its datum split into one store
//! entry per sub-state, under the proof path grammar used by membership verification:
//! `{height}/{category}/{tx_hash}/{output_index}[/suffix]`.

use sha3::{Digest, Sha3_256};
use tracing::{debug, warn};

use crate::{
    block::UtxoOutput,
    cbor,
    client_state::TokenConfigs,
    datum::{ChannelDatumWithPort, ClientDatum, ConnectionDatum},
    error::CardanoClientError,
    height::Height,
    store::{self, ClientStore},
};

/// Path categories of indexed entries
pub mod category {
    /// Counterparty client state
    pub const CLIENT: &str = "client";
    /// Counterparty consensus state
    pub const CONSENSUS: &str = "consensus";
    /// Connection end
    pub const CONNECTION: &str = "connection";
    /// Channel end
    pub const CHANNEL: &str = "channel";
    /// Packet commitment
    pub const COMMITMENTS: &str = "commitments";
    /// Packet acknowledgement
    pub const ACKS: &str = "acks";
    /// Packet receipt
    pub const RECEIPTS: &str = "receipts";
    /// Next receive sequence
    pub const NEXT_SEQUENCE_RECV: &str = "nextsequencerecv";
    /// Next send sequence
    pub const NEXT_SEQUENCE_SEND: &str = "nextsequencesend";
    /// Next acknowledgement sequence
    pub const NEXT_SEQUENCE_ACK: &str = "nextsequenceack";
}

/// Token type hashed into client token names
pub const CLIENT_TOKEN_TYPE: &str = "ibc_client";
/// Token type hashed into connection token names
pub const CONNECTION_TOKEN_TYPE: &str = "connection";
/// Token type hashed into channel token names
pub const CHANNEL_TOKEN_TYPE: &str = "channel";

/// Value stored under the extra receipt key
const RECEIPT_MARKER: [u8; 1] = [1];

/// Asset name prefix minted by the handler for objects of `token_type`:
/// `hex(sha3_256(handler_unit)[..20]) || hex(sha3_256(token_type)[..4])`
///
/// # Errors
/// Returns [`CardanoClientError::Hex`] if `handler_token_unit` is not hex.
pub fn ibc_token_prefix(handler_token_unit: &str, token_type: &str) -> Result<String, CardanoClientError> {
    let handler = Sha3_256::digest(hex::decode(handler_token_unit)?);
    let kind = Sha3_256::digest(token_type.as_bytes());
    Ok(format!("{}{}", hex::encode(&handler[..20]), hex::encode(&kind[..4])))
}

/// Lowercase `policy_id || asset name prefix` of each auth token kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPrefixes {
    /// Client tokens
    pub client: String,
    /// Connection tokens
    pub connection: String,
    /// Channel tokens
    pub channel: String,
}

impl TokenPrefixes {
    /// Derives the prefixes from the token configuration
    ///
    /// # Errors
    /// Returns [`CardanoClientError::Hex`] if the handler token unit is not hex.
    pub fn new(configs: &TokenConfigs) -> Result<Self, CardanoClientError> {
        let prefix = |policy_id: &str, token_type: &str| -> Result<String, CardanoClientError> {
            Ok(format!(
                "{policy_id}{}",
                ibc_token_prefix(&configs.handler_token_unit, token_type)?
            )
            .to_lowercase())
        };
        Ok(Self {
            client: prefix(&configs.client_policy_id, CLIENT_TOKEN_TYPE)?,
            connection: prefix(&configs.connection_policy_id, CONNECTION_TOKEN_TYPE)?,
            channel: prefix(&configs.channel_policy_id, CHANNEL_TOKEN_TYPE)?,
        })
    }
}

/// `{height}/{category}/{tx_hash}/{output_index}`, the proof path of an indexed output
#[must_use]
pub fn proof_path(height: Height, category: &str, tx_hash: &str, output_index: u64) -> String {
    format!("{height}/{category}/{}/{output_index}", tx_hash.to_lowercase())
}

/// Accumulates the writes of one block
struct Indexer<'a, S: ClientStore + ?Sized> {
    store: &'a mut S,
    keys: Vec<String>,
}

impl<S: ClientStore + ?Sized> Indexer<'_, S> {
    fn put(&mut self, path: &str, value: &[u8]) {
        let key = store::utxo_key(path);
        self.store.set(key.as_bytes(), value);
        self.keys.push(key);
    }

    fn client(&mut self, height: Height, utxo: &UtxoOutput, datum: &ClientDatum) -> Result<(), CardanoClientError> {
        let path = proof_path(height, category::CLIENT, &utxo.tx_hash, utxo.output_index);
        self.put(&path, &cbor::to_vec(&datum.client_state)?);

        let path = proof_path(height, category::CONSENSUS, &utxo.tx_hash, utxo.output_index);
        for (consensus_height, consensus_state) in &datum.consensus_states {
            let consensus_height = Height::from(*consensus_height);
            self.put(&format!("{path}/{consensus_height}"), &cbor::to_vec(consensus_state)?);
        }
        Ok(())
    }

    fn connection(&mut self, height: Height, utxo: &UtxoOutput, datum: &ConnectionDatum) -> Result<(), CardanoClientError> {
        let path = proof_path(height, category::CONNECTION, &utxo.tx_hash, utxo.output_index);
        self.put(&path, &cbor::to_vec(&datum.state)?);
        Ok(())
    }

    fn channel(
        &mut self,
        height: Height,
        utxo: &UtxoOutput,
        datum: &ChannelDatumWithPort,
        channel_sequence: u64,
    ) -> Result<(), CardanoClientError> {
        let port_id = String::from_utf8_lossy(&datum.port_id);
        let channel_id = format!("channel-{channel_sequence}");
        let at = |category: &str| {
            format!(
                "{}/{port_id}/{channel_id}",
                proof_path(height, category, &utxo.tx_hash, utxo.output_index)
            )
        };
        let state = &datum.state;

        self.put(&at(category::CHANNEL), &cbor::to_vec(&state.channel)?);
        for (sequence, commitment) in &state.packet_commitment {
            self.put(&format!("{}/{sequence}", at(category::COMMITMENTS)), commitment);
        }
        for (sequence, ack) in &state.packet_acknowledgement {
            self.put(&format!("{}/{sequence}", at(category::ACKS)), ack);
        }
        for (sequence, receipt) in &state.packet_receipt {
            // hosts reject empty values
            let receipt = if receipt.is_empty() { &RECEIPT_MARKER[..] } else { receipt };
            self.put(&format!("{}/{sequence}", at(category::RECEIPTS)), receipt);
            self.put(
                &format!("{}/{port_id}/{channel_id}/{sequence}", category::RECEIPTS),
                &RECEIPT_MARKER,
            );
        }
        self.put(&at(category::NEXT_SEQUENCE_RECV), &state.next_sequence_recv.to_be_bytes());
        self.put(&at(category::NEXT_SEQUENCE_SEND), &state.next_sequence_send.to_be_bytes());
        self.put(&at(category::NEXT_SEQUENCE_ACK), &state.next_sequence_ack.to_be_bytes());
        Ok(())
    }

    /// Indexes `utxo` under the first token it carries that names an IBC object with a
    /// decodable datum. Returns whether one matched.
    fn try_ibc_object(
        &mut self,
        prefixes: &TokenPrefixes,
        height: Height,
        utxo: &UtxoOutput,
        datum: &[u8],
    ) -> Result<bool, CardanoClientError> {
        for token in &utxo.tokens {
            let asset_name = token.asset_name.to_lowercase();
            if asset_name.contains(&prefixes.client) {
                if let Ok(datum) = cbor::from_slice::<ClientDatum>(datum) {
                    self.client(height, utxo, &datum)?;
                    return Ok(true);
                }
            } else if asset_name.contains(&prefixes.connection) {
                if let Ok(datum) = cbor::from_slice::<ConnectionDatum>(datum) {
                    self.connection(height, utxo, &datum)?;
                    return Ok(true);
                }
            } else if asset_name.contains(&prefixes.channel) {
                if let Ok(datum) = cbor::from_slice::<ChannelDatumWithPort>(datum) {
                    let Some(sequence) = channel_sequence(&asset_name, &prefixes.channel) else {
                        warn!(asset_name, "channel token without a sequence");
                        continue;
                    };
                    self.channel(height, utxo, &datum, sequence)?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// The channel sequence carried by a channel token: the hex encoded decimal digits following
/// the prefix
fn channel_sequence(asset_name: &str, prefix: &str) -> Option<u64> {
    let digits = hex::decode(asset_name.replace(prefix, "")).ok()?;
    String::from_utf8(digits).ok()?.parse().ok()
}

/// Indexes the outputs of a block installed at `height`. Outputs carrying a datum and at
/// least one native token are candidates; those matching no IBC object are stored whole as
/// JSON under `{height}/{tx_hash}/{output_index}`.
///
/// Returns the store keys written, in write order.
///
/// # Errors
/// Returns an error if the token configuration is malformed, a candidate datum is not hex,
/// or an entry cannot be encoded.
pub fn index_utxos<S: ClientStore + ?Sized>(
    store: &mut S,
    token_configs: &TokenConfigs,
    height: Height,
    utxos: &[UtxoOutput],
) -> Result<Vec<String>, CardanoClientError> {
    let candidates: Vec<&UtxoOutput> = utxos
        .iter()
        .filter(|utxo| !utxo.datum_hex.is_empty() && utxo.tokens.len() > 1)
        .collect();
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let prefixes = TokenPrefixes::new(token_configs)?;
    let mut indexer = Indexer {
        store,
        keys: Vec::new(),
    };
    for utxo in candidates {
        let datum = hex::decode(&utxo.datum_hex)?;
        if !indexer.try_ibc_object(&prefixes, height, utxo, &datum)? {
            let path = format!("{height}/{}/{}", utxo.tx_hash.to_lowercase(), utxo.output_index);
            indexer.put(&path, &serde_json::to_vec(utxo)?);
        }
    }

    debug!(%height, keys = indexer.keys.len(), "indexed utxos");
    Ok(indexer.keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{UtxoToken, LOVELACE},
        datum::{ChannelStateDatum, ClientStateDatum},
        store::ClientStoreRead,
        test_utils::{
            channel_datum_with_port, client_datum, connection_datum, fixture_token_configs,
            MemoryStore,
        },
    };

    const TX: &str = "ABCDEF0000000000000000000000000000000000000000000000000000000001";

    fn utxo(asset_name: String, datum: &[u8]) -> UtxoOutput {
        UtxoOutput {
            tx_hash: TX.to_string(),
            output_index: 2,
            tokens: vec![
                UtxoToken {
                    asset_name: LOVELACE.to_string(),
                    quantity: 2_000_000,
                },
                UtxoToken {
                    asset_name,
                    quantity: 1,
                },
            ],
            datum_hex: hex::encode(datum),
        }
    }

    fn height() -> Height {
        Height::new(0, 303_387)
    }

    #[test]
    fn token_prefix_hashes_handler_and_type() {
        let handler = "aa".repeat(28) + "68616e646c6572";
        let prefix = ibc_token_prefix(&handler, CLIENT_TOKEN_TYPE).unwrap();
        assert_eq!(prefix.len(), 48);

        let handler_hash = Sha3_256::digest(hex::decode(&handler).unwrap());
        assert!(prefix.starts_with(&hex::encode(&handler_hash[..20])));
        assert_ne!(prefix, ibc_token_prefix(&handler, CHANNEL_TOKEN_TYPE).unwrap());
        assert!(matches!(
            ibc_token_prefix("xyz", CLIENT_TOKEN_TYPE),
            Err(CardanoClientError::Hex(_))
        ));
    }

    #[test]
    fn client_datum_is_split_into_client_and_consensus_states() {
        let configs = fixture_token_configs();
        let prefixes = TokenPrefixes::new(&configs).unwrap();
        let datum = client_datum();
        let mut store = MemoryStore::default();

        let keys = index_utxos(
            &mut store,
            &configs,
            height(),
            &[utxo(format!("{}3030", prefixes.client), &cbor::to_vec(&datum).unwrap())],
        )
        .unwrap();

        let tx = TX.to_lowercase();
        let client_key = format!("utxos/0-303387/client/{tx}/2");
        assert_eq!(keys[0], client_key);
        assert_eq!(keys.len(), 1 + datum.consensus_states.len());
        let stored: ClientStateDatum =
            cbor::from_slice(&store.get(client_key.as_bytes()).unwrap()).unwrap();
        assert_eq!(stored, datum.client_state);

        let (consensus_height, consensus_state) = &datum.consensus_states[0];
        let consensus_key = format!(
            "utxos/0-303387/consensus/{tx}/2/{}",
            Height::from(*consensus_height)
        );
        assert_eq!(
            store.get(consensus_key.as_bytes()).unwrap(),
            cbor::to_vec(consensus_state).unwrap()
        );
    }

    #[test]
    fn connection_datum_is_stored_as_connection_end() {
        let configs = fixture_token_configs();
        let prefixes = TokenPrefixes::new(&configs).unwrap();
        let datum = connection_datum();
        let mut store = MemoryStore::default();

        let keys = index_utxos(
            &mut store,
            &configs,
            height(),
            &[utxo(format!("{}30", prefixes.connection), &cbor::to_vec(&datum).unwrap())],
        )
        .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(store.get(keys[0].as_bytes()).unwrap(), cbor::to_vec(&datum.state).unwrap());
    }

    #[test]
    fn channel_datum_fans_out_per_packet_and_sequence() {
        let configs = fixture_token_configs();
        let prefixes = TokenPrefixes::new(&configs).unwrap();
        let datum = channel_datum_with_port();
        let port = String::from_utf8(datum.port_id.clone()).unwrap();
        let mut store = MemoryStore::default();

        // sequence "12" hex encoded
        let asset_name = format!("{}3132", prefixes.channel).to_uppercase();
        let keys = index_utxos(
            &mut store,
            &configs,
            height(),
            &[utxo(asset_name, &cbor::to_vec(&datum).unwrap())],
        )
        .unwrap();

        let tx = TX.to_lowercase();
        let base = |category: &str| format!("utxos/0-303387/{category}/{tx}/2/{port}/channel-12");
        assert_eq!(keys[0], base(category::CHANNEL));
        assert_eq!(
            store.get(base(category::CHANNEL).as_bytes()).unwrap(),
            cbor::to_vec(&datum.state.channel).unwrap()
        );

        let ChannelStateDatum {
            packet_commitment,
            packet_receipt,
            packet_acknowledgement,
            next_sequence_recv,
            ..
        } = &datum.state;
        for (sequence, commitment) in packet_commitment {
            let key = format!("{}/{sequence}", base(category::COMMITMENTS));
            assert_eq!(store.get(key.as_bytes()).as_ref(), Some(commitment));
        }
        for (sequence, ack) in packet_acknowledgement {
            let key = format!("{}/{sequence}", base(category::ACKS));
            assert_eq!(store.get(key.as_bytes()).as_ref(), Some(ack));
        }
        for (sequence, _) in packet_receipt {
            let key = format!("{}/{sequence}", base(category::RECEIPTS));
            assert!(store.get(key.as_bytes()).is_some());
            let extra = format!("utxos/receipts/{port}/channel-12/{sequence}");
            assert_eq!(store.get(extra.as_bytes()), Some(vec![1]));
        }
        assert_eq!(
            store.get(base(category::NEXT_SEQUENCE_RECV).as_bytes()),
            Some(next_sequence_recv.to_be_bytes().to_vec())
        );
        assert!(keys.contains(&base(category::NEXT_SEQUENCE_SEND)));
        assert!(keys.contains(&base(category::NEXT_SEQUENCE_ACK)));
    }

    #[test]
    fn unmatched_output_is_stored_whole() {
        let configs = fixture_token_configs();
        let mut store = MemoryStore::default();
        let output = utxo("ff".repeat(30), &[0xd8, 0x79, 0x80]);

        let keys = index_utxos(&mut store, &configs, height(), &[output.clone()]).unwrap();
        let key = format!("utxos/0-303387/{}/2", TX.to_lowercase());
        assert_eq!(keys, vec![key.clone()]);
        let stored: UtxoOutput = serde_json::from_slice(&store.get(key.as_bytes()).unwrap()).unwrap();
        assert_eq!(stored, output);
    }

    #[test]
    fn datum_of_the_wrong_kind_falls_back() {
        let configs = fixture_token_configs();
        let prefixes = TokenPrefixes::new(&configs).unwrap();
        let mut store = MemoryStore::default();
        let output = utxo(
            format!("{}30", prefixes.client),
            &cbor::to_vec(&connection_datum()).unwrap(),
        );

        let keys = index_utxos(&mut store, &configs, height(), &[output]).unwrap();
        assert_eq!(keys, vec![format!("utxos/0-303387/{}/2", TX.to_lowercase())]);
    }

    #[test]
    fn outputs_without_datum_or_tokens_are_skipped() {
        let configs = fixture_token_configs();
        let mut store = MemoryStore::default();
        let mut no_datum = utxo("ff".repeat(30), &[]);
        no_datum.datum_hex.clear();
        let mut lovelace_only = utxo("ff".repeat(30), &[0xd8, 0x79, 0x80]);
        lovelace_only.tokens.truncate(1);

        let keys = index_utxos(&mut store, &configs, height(), &[no_datum, lovelace_only]).unwrap();
        assert!(keys.is_empty());
        assert!(store.is_empty());
    }
}
