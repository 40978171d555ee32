//! Transaction bodies as the light client consumes them: outputs (coin, native assets, inline
//! datum) and stake pool certificates.
//!
//! Era detection and ledger decoding go through `pallas_traverse`. Block bodies carry the
//! transaction body, witness set and auxiliary data separately, so a body is wrapped into a
//! transaction with an empty witness set before decoding. The transaction id only depends on
//! the body bytes.

use pallas_primitives::{alonzo, conway};
use pallas_traverse::{Era, MultiEraCert, MultiEraOutput, MultiEraTx};

use crate::error::CardanoClientError;

/// CBOR head of a four element array
const TX_HEAD: u8 = 0x84;

/// Empty witness set, `is_valid = true` and no auxiliary data
const TX_TAIL: [u8; 3] = [0xa0, 0xf5, 0xf6];

/// One native asset held by an output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Minting policy id
    pub policy_id: Vec<u8>,
    /// Asset name
    pub name: Vec<u8>,
    /// Quantity
    pub quantity: u64,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxOutput {
    /// Lovelace amount
    pub coin: u64,
    /// Native assets in encoded order
    pub assets: Vec<Asset>,
    /// Inline datum CBOR, if the output carries one
    pub inline_datum: Option<Vec<u8>>,
}

impl TxOutput {
    fn from_multi_era(output: &MultiEraOutput<'_>) -> Self {
        let value = output.value();
        let mut assets = Vec::new();
        for policy in value.assets() {
            for asset in policy.assets() {
                assets.push(Asset {
                    policy_id: policy.policy().to_vec(),
                    name: asset.name().to_vec(),
                    quantity: asset.output_coin().unwrap_or_default(),
                });
            }
        }

        let inline_datum = match output.datum() {
            Some(conway::MintedDatumOption::Data(data)) => Some(data.0.raw_cbor().to_vec()),
            _ => None,
        };

        Self {
            coin: value.coin(),
            assets,
            inline_datum,
        }
    }

    /// Total quantity of `(policy_id, name)` held by the output
    #[must_use]
    pub fn asset_quantity(&self, policy_id: &[u8], name: &[u8]) -> u64 {
        self.assets
            .iter()
            .filter(|a| a.policy_id == policy_id && a.name == name)
            .map(|a| a.quantity)
            .sum()
    }
}

/// Stake pool certificates. Other certificate kinds are dropped while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolCertificate {
    /// Pool registration or update of its parameters
    Registration {
        /// Pool operator key hash
        operator: Vec<u8>,
        /// Blake2b-256 hash of the pool's VRF key
        vrf_key_hash: Vec<u8>,
    },
    /// Announced pool retirement
    Retirement {
        /// Pool operator key hash
        operator: Vec<u8>,
        /// Epoch the pool retires in
        epoch: u64,
    },
}

impl PoolCertificate {
    fn from_multi_era(cert: &MultiEraCert<'_>) -> Option<Self> {
        if let Some(cert) = cert.as_alonzo() {
            return match cert {
                alonzo::Certificate::PoolRegistration {
                    operator,
                    vrf_keyhash,
                    ..
                } => Some(Self::Registration {
                    operator: operator.to_vec(),
                    vrf_key_hash: vrf_keyhash.to_vec(),
                }),
                alonzo::Certificate::PoolRetirement(operator, epoch) => Some(Self::Retirement {
                    operator: operator.to_vec(),
                    epoch: *epoch,
                }),
                _ => None,
            };
        }
        match cert.as_conway()? {
            conway::Certificate::PoolRegistration {
                operator,
                vrf_keyhash,
                ..
            } => Some(Self::Registration {
                operator: operator.to_vec(),
                vrf_key_hash: vrf_keyhash.to_vec(),
            }),
            conway::Certificate::PoolRetirement(operator, epoch) => Some(Self::Retirement {
                operator: operator.to_vec(),
                epoch: *epoch,
            }),
            _ => None,
        }
    }
}

/// Decoded transaction body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    /// Era the body was decoded as
    pub era: Era,
    /// Blake2b-256 of the body bytes
    pub hash: [u8; 32],
    /// Outputs in order
    pub outputs: Vec<TxOutput>,
    /// Pool certificates in order
    pub pool_certificates: Vec<PoolCertificate>,
}

impl TransactionBody {
    /// Lowercase hex transaction id
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Decodes a Shelley based body, trying the eras newest first
    ///
    /// # Errors
    /// Returns [`CardanoClientError::UnsupportedTxEra`] if no era accepts the body.
    pub fn decode(bytes: &[u8]) -> Result<Self, CardanoClientError> {
        let mut tx_cbor = Vec::with_capacity(bytes.len() + 1 + TX_TAIL.len());
        tx_cbor.push(TX_HEAD);
        tx_cbor.extend_from_slice(bytes);
        tx_cbor.extend_from_slice(&TX_TAIL);

        let tx = MultiEraTx::decode(&tx_cbor).map_err(|_| CardanoClientError::UnsupportedTxEra)?;
        if tx.era() == Era::Byron {
            return Err(CardanoClientError::UnsupportedTxEra);
        }

        Ok(Self {
            era: tx.era(),
            hash: *tx.hash(),
            outputs: tx.outputs().iter().map(TxOutput::from_multi_era).collect(),
            pool_certificates: tx
                .certs()
                .iter()
                .filter_map(PoolCertificate::from_multi_era)
                .collect(),
        })
    }
}
