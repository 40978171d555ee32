//! Block body handling: body hash recomputation and extraction of UTXO outputs and stake
//! pool certificates.
//!
//! The body travels as a CBOR list of `[tx_body_hex, witness_set_hex, aux_data_hex]` text
//! triples, the aux data being an empty string when a transaction has none.

use pallas_codec::minicbor::{self, data::Tag, Decoder, Encoder};
use serde::{Deserialize, Serialize};

use crate::{
    cbor, crypto,
    error::CardanoClientError,
    pool::{PoolRegistration, PoolRetirement},
    tx::{PoolCertificate, TransactionBody},
};

/// Body hash of a block without transactions
pub const EMPTY_BLOCK_BODY_HASH: [u8; 32] = [
    0x29, 0x57, 0x1d, 0x16, 0xf0, 0x81, 0x70, 0x9b,
    0x3c, 0x48, 0x65, 0x18, 0x60, 0x07, 0x7b, 0xeb,
    0xf9, 0x34, 0x0a, 0xbb, 0x3f, 0xc7, 0x13, 0x34,
    0x43, 0xc5, 0x4f, 0x1f, 0x5a, 0x5e, 0xdc, 0xf1,
];

/// Pseudo asset name of the ada amount of an output
pub const LOVELACE: &str = "lovelace";

/// Tag wrapping Alonzo style auxiliary data
const AUX_DATA_TAG: u64 = 259;

/// Encoded head of [`AUX_DATA_TAG`]
const AUX_DATA_TAG_BYTES: [u8; 3] = [0xd9, 0x01, 0x03];

/// One transaction of a block body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTx {
    /// Transaction body CBOR
    pub body: Vec<u8>,
    /// Witness set CBOR
    pub witness_set: Vec<u8>,
    /// Auxiliary data CBOR, if any
    pub aux_data: Option<Vec<u8>>,
}

/// Token held by a UTXO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoToken {
    /// [`LOVELACE`] or `policy_id_hex || asset_name_hex`
    pub asset_name: String,
    /// Quantity held
    pub quantity: u64,
}

/// A transaction output as seen by the UTXO verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    /// Lowercase hex transaction id
    pub tx_hash: String,
    /// Index of the output in its transaction
    pub output_index: u64,
    /// Lovelace first, then every native asset
    pub tokens: Vec<UtxoToken>,
    /// Inline datum CBOR as hex, empty when absent
    pub datum_hex: String,
}

/// Everything the client consumes from a block body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOutput {
    /// Outputs of every transaction, in block order
    pub utxos: Vec<UtxoOutput>,
    /// Pool registrations, in block order
    pub registrations: Vec<PoolRegistration>,
    /// Pool retirements, in block order
    pub retirements: Vec<PoolRetirement>,
}

/// Decodes a block body
///
/// # Errors
/// Returns [`CardanoClientError::InvalidBlockData`] if the body is not a list of hex triples.
pub fn decode_block_body(body_cbor: &[u8]) -> Result<Vec<BlockTx>, CardanoClientError> {
    let mut d = Decoder::new(body_cbor);
    let triples = cbor::list(&mut d, |d| cbor::list(d, cbor::text))
        .map_err(|e| CardanoClientError::InvalidBlockData(format!("block body: {e}")))?;

    triples
        .into_iter()
        .enumerate()
        .map(|(index, triple)| {
            let [body, witness_set, aux_data]: [String; 3] = triple.try_into().map_err(|t: Vec<String>| {
                CardanoClientError::InvalidBlockData(format!(
                    "transaction {index} has {} parts, expected 3",
                    t.len()
                ))
            })?;
            Ok(BlockTx {
                body: hex::decode(body)?,
                witness_set: hex::decode(witness_set)?,
                aux_data: if aux_data.is_empty() {
                    None
                } else {
                    Some(hex::decode(aux_data)?)
                },
            })
        })
        .collect()
}

/// Recomputes the block body hash:
/// `blake2b_256(h(bodies) || h(witness_sets) || h(aux_data_map) || h(invalid_txs))`.
///
/// Auxiliary data is keyed by transaction index and wrapped in tag 259 unless it already is.
///
/// # Errors
/// Returns [`CardanoClientError::InvalidBlockData`] if a container header cannot be written.
pub fn body_hash(txs: &[BlockTx]) -> Result<[u8; 32], CardanoClientError> {
    if txs.is_empty() {
        return Ok(EMPTY_BLOCK_BODY_HASH);
    }

    let bodies = raw_list(txs.iter().map(|tx| tx.body.as_slice()))?;
    let witness_sets = raw_list(txs.iter().map(|tx| tx.witness_set.as_slice()))?;

    let aux: Vec<(u64, &[u8])> = txs
        .iter()
        .enumerate()
        .filter_map(|(i, tx)| tx.aux_data.as_deref().map(|aux| (i as u64, aux)))
        .collect();
    let mut e = Encoder::new(Vec::new());
    e.map(aux.len() as u64).map_err(encode_error)?;
    for (index, data) in aux {
        e.u64(index).map_err(encode_error)?;
        if !data.starts_with(&AUX_DATA_TAG_BYTES) {
            e.tag(Tag::new(AUX_DATA_TAG)).map_err(encode_error)?;
        }
        e.writer_mut().extend_from_slice(data);
    }
    let aux_map = e.into_writer();

    let invalid_txs = [0x80];

    let mut hashes = Vec::with_capacity(128);
    hashes.extend(crypto::blake2b_256(&bodies));
    hashes.extend(crypto::blake2b_256(&witness_sets));
    hashes.extend(crypto::blake2b_256(&aux_map));
    hashes.extend(crypto::blake2b_256(&invalid_txs));
    Ok(crypto::blake2b_256(&hashes))
}

/// A definite CBOR array whose items are the given pre-encoded values
fn raw_list<'a>(
    items: impl ExactSizeIterator<Item = &'a [u8]>,
) -> Result<Vec<u8>, CardanoClientError> {
    let mut e = Encoder::new(Vec::new());
    e.array(items.len() as u64).map_err(encode_error)?;
    for item in items {
        e.writer_mut().extend_from_slice(item);
    }
    Ok(e.into_writer())
}

fn encode_error(e: minicbor::encode::Error<core::convert::Infallible>) -> CardanoClientError {
    CardanoClientError::InvalidBlockData(e.to_string())
}

/// Extracts UTXO outputs and pool certificates from the transactions of a block
///
/// # Errors
/// Returns an error if a transaction body cannot be decoded or a pool id cannot be encoded.
pub fn extract_block_output(txs: &[BlockTx]) -> Result<BlockOutput, CardanoClientError> {
    let mut out = BlockOutput::default();
    for (tx_index, tx) in txs.iter().enumerate() {
        let body = TransactionBody::decode(&tx.body)?;
        let tx_hash = body.hash_hex();
        let tx_index = tx_index as u64;

        for (output_index, output) in body.outputs.iter().enumerate() {
            let mut tokens = vec![UtxoToken {
                asset_name: LOVELACE.to_string(),
                quantity: output.coin,
            }];
            tokens.extend(output.assets.iter().map(|asset| UtxoToken {
                asset_name: format!("{}{}", hex::encode(&asset.policy_id), hex::encode(&asset.name)),
                quantity: asset.quantity,
            }));
            out.utxos.push(UtxoOutput {
                tx_hash: tx_hash.clone(),
                output_index: output_index as u64,
                tokens,
                datum_hex: output.inline_datum.as_deref().map(hex::encode).unwrap_or_default(),
            });
        }

        for certificate in body.pool_certificates {
            match certificate {
                PoolCertificate::Registration {
                    operator,
                    vrf_key_hash,
                } => out.registrations.push(PoolRegistration {
                    pool_id: crypto::pool_id_bech32(&operator)?,
                    vrf_key_hash: hex::encode(vrf_key_hash),
                    tx_index,
                }),
                PoolCertificate::Retirement { operator, epoch } => {
                    out.retirements.push(PoolRetirement {
                        pool_id: crypto::pool_id_bech32(&operator)?,
                        retire_epoch: epoch,
                        tx_index,
                    });
                }
            }
        }
    }
    Ok(out)
}
