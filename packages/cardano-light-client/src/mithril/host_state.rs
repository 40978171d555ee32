//! The HostState UTXO: the output whose inline datum commits to the Cardano IBC state root.

use pallas_codec::minicbor::{
    decode::{self, Decoder},
    encode::{self, Encoder, Write},
    Decode, Encode,
};
use tracing::debug;

use crate::{cbor, error::CardanoClientError, tx::TransactionBody};

/// Length of the IBC state root
pub const IBC_STATE_ROOT_LENGTH: usize = 32;

/// Handler state committed by the HostState datum
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostStateDatum {
    /// Datum schema version
    pub version: u64,
    /// Root of the IBC commitment tree
    pub ibc_state_root: Vec<u8>,
    /// Next client sequence
    pub next_client_sequence: u64,
    /// Next connection sequence
    pub next_connection_sequence: u64,
    /// Next channel sequence
    pub next_channel_sequence: u64,
    /// Ports bound by applications
    pub bound_port: Vec<u64>,
    /// Time of the last handler update, milliseconds
    pub last_update_time: u64,
    /// Policy id of the HostState NFT
    pub nft_policy: Vec<u8>,
}

impl<'b, C> Decode<'b, C> for HostStateDatum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut r = cbor::open_record(d)?;
        r.expect(d, "state")?;
        let mut state = cbor::open_record(d)?;
        state.expect(d, "version")?;
        let version = d.u64()?;
        state.expect(d, "ibc_state_root")?;
        let ibc_state_root = cbor::bytes(d)?;
        state.expect(d, "next_client_sequence")?;
        let next_client_sequence = d.u64()?;
        state.expect(d, "next_connection_sequence")?;
        let next_connection_sequence = d.u64()?;
        state.expect(d, "next_channel_sequence")?;
        let next_channel_sequence = d.u64()?;
        state.expect(d, "bound_port")?;
        let bound_port = cbor::list(d, Decoder::u64)?;
        state.expect(d, "last_update_time")?;
        let last_update_time = d.u64()?;
        state.finish(d)?;
        r.expect(d, "nft_policy")?;
        let nft_policy = cbor::bytes(d)?;
        r.finish(d)?;
        Ok(Self {
            version,
            ibc_state_root,
            next_client_sequence,
            next_connection_sequence,
            next_channel_sequence,
            bound_port,
            last_update_time,
            nft_policy,
        })
    }
}

impl<C> Encode<C> for HostStateDatum {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> Result<(), encode::Error<W::Error>> {
        e.tag(cbor::constr_tag(0))?.array(2)?;
        e.tag(cbor::constr_tag(0))?
            .array(7)?
            .u64(self.version)?
            .bytes(&self.ibc_state_root)?
            .u64(self.next_client_sequence)?
            .u64(self.next_connection_sequence)?
            .u64(self.next_channel_sequence)?
            .array(self.bound_port.len() as u64)?;
        for port in &self.bound_port {
            e.u64(*port)?;
        }
        e.u64(self.last_update_time)?.bytes(&self.nft_policy)?;
        Ok(())
    }
}

/// Extracts the IBC state root from the inline datum of a HostState datum
///
/// # Errors
/// Returns [`CardanoClientError::InvalidDatum`] if the datum does not decode or the root is
/// not 32 bytes long.
pub fn extract_ibc_state_root_from_datum(
    datum_cbor: &[u8],
) -> Result<[u8; IBC_STATE_ROOT_LENGTH], CardanoClientError> {
    let datum: HostStateDatum = cbor::from_slice(datum_cbor)
        .map_err(|e| CardanoClientError::InvalidDatum(format!("host state datum: {e}")))?;
    datum.ibc_state_root.as_slice().try_into().map_err(|_| {
        CardanoClientError::InvalidDatum(format!(
            "ibc_state_root is {} bytes, expected {IBC_STATE_ROOT_LENGTH}",
            datum.ibc_state_root.len()
        ))
    })
}

/// Extracts the IBC state root carried by the HostState output of a transaction.
///
/// The output index is supplied by the relayer and is only trusted once the output is shown
/// to hold exactly one HostState NFT.
///
/// # Errors
/// - [`CardanoClientError::UnsupportedTxEra`] if the body matches no era
/// - [`CardanoClientError::InvalidMithrilHeader`] if the body hash differs from `tx_hash`
/// - [`CardanoClientError::HostNftMissing`] if the output is missing or lacks the NFT
/// - [`CardanoClientError::NoInlineDatum`] if the output has no inline datum
/// - [`CardanoClientError::InvalidDatum`] if the datum does not carry a 32 byte root
pub fn extract_ibc_state_root_from_host_state_tx(
    tx_body_cbor: &[u8],
    tx_hash: &str,
    output_index: u64,
    nft_policy_id: &[u8],
    nft_token_name: &[u8],
) -> Result<[u8; IBC_STATE_ROOT_LENGTH], CardanoClientError> {
    let body = TransactionBody::decode(tx_body_cbor)?;
    if !body.hash_hex().eq_ignore_ascii_case(tx_hash) {
        return Err(CardanoClientError::InvalidMithrilHeader(format!(
            "host state tx body hashes to {}, header names {tx_hash}",
            body.hash_hex()
        )));
    }

    let output = usize::try_from(output_index)
        .ok()
        .and_then(|index| body.outputs.get(index))
        .ok_or_else(|| {
            CardanoClientError::HostNftMissing(format!(
                "output {output_index} out of range, transaction has {}",
                body.outputs.len()
            ))
        })?;

    let quantity = output.asset_quantity(nft_policy_id, nft_token_name);
    if quantity != 1 {
        return Err(CardanoClientError::HostNftMissing(format!(
            "output {output_index} holds {quantity} units of {}{}",
            hex::encode(nft_policy_id),
            hex::encode(nft_token_name)
        )));
    }

    let datum = output
        .inline_datum
        .as_deref()
        .ok_or(CardanoClientError::NoInlineDatum)?;
    let root = extract_ibc_state_root_from_datum(datum)?;
    debug!(tx_hash, output_index, root = %hex::encode(root), "extracted ibc state root");
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        host_state_datum, host_state_tx_body, HOST_STATE_NFT_NAME, HOST_STATE_NFT_POLICY,
    };

    fn tx_hash(body: &[u8]) -> String {
        hex::encode(crate::crypto::blake2b_256(body))
    }

    #[test]
    fn extracts_root_from_host_state_output() {
        let body = host_state_tx_body(1, Some(&host_state_datum([0xaa; 32])));
        let root = extract_ibc_state_root_from_host_state_tx(
            &body,
            &tx_hash(&body).to_uppercase(),
            1,
            &HOST_STATE_NFT_POLICY,
            HOST_STATE_NFT_NAME,
        )
        .unwrap();
        assert_eq!(root, [0xaa; 32]);
    }

    #[test]
    fn output_without_nft_is_rejected() {
        let body = host_state_tx_body(1, Some(&host_state_datum([0xaa; 32])));
        let hash = tx_hash(&body);
        // output 0 is the change output
        assert!(matches!(
            extract_ibc_state_root_from_host_state_tx(&body, &hash, 0, &HOST_STATE_NFT_POLICY, HOST_STATE_NFT_NAME),
            Err(CardanoClientError::HostNftMissing(_))
        ));
        assert!(matches!(
            extract_ibc_state_root_from_host_state_tx(&body, &hash, 5, &HOST_STATE_NFT_POLICY, HOST_STATE_NFT_NAME),
            Err(CardanoClientError::HostNftMissing(_))
        ));
        assert!(matches!(
            extract_ibc_state_root_from_host_state_tx(&body, &hash, 1, &HOST_STATE_NFT_POLICY, b"other"),
            Err(CardanoClientError::HostNftMissing(_))
        ));
    }

    #[test]
    fn two_nft_units_are_rejected() {
        let body = host_state_tx_body(2, Some(&host_state_datum([0xaa; 32])));
        assert!(matches!(
            extract_ibc_state_root_from_host_state_tx(
                &body,
                &tx_hash(&body),
                1,
                &HOST_STATE_NFT_POLICY,
                HOST_STATE_NFT_NAME
            ),
            Err(CardanoClientError::HostNftMissing(_))
        ));
    }

    #[test]
    fn output_without_datum_is_rejected() {
        let body = host_state_tx_body(1, None);
        assert!(matches!(
            extract_ibc_state_root_from_host_state_tx(
                &body,
                &tx_hash(&body),
                1,
                &HOST_STATE_NFT_POLICY,
                HOST_STATE_NFT_NAME
            ),
            Err(CardanoClientError::NoInlineDatum)
        ));
    }

    #[test]
    fn hash_mismatch_is_rejected() {
        let body = host_state_tx_body(1, Some(&host_state_datum([0xaa; 32])));
        assert!(matches!(
            extract_ibc_state_root_from_host_state_tx(
                &body,
                &"00".repeat(32),
                1,
                &HOST_STATE_NFT_POLICY,
                HOST_STATE_NFT_NAME
            ),
            Err(CardanoClientError::InvalidMithrilHeader(_))
        ));
    }

    #[test]
    fn short_root_is_invalid_datum() {
        let datum = HostStateDatum {
            ibc_state_root: vec![0xaa; 31],
            ..Default::default()
        };
        let bytes = cbor::to_vec(&datum).unwrap();
        assert!(matches!(
            extract_ibc_state_root_from_datum(&bytes),
            Err(CardanoClientError::InvalidDatum(_))
        ));
    }

    #[test]
    fn datum_starts_with_constructor_zero() {
        let bytes = host_state_datum([0xaa; 32]);
        assert_eq!(&bytes[..3], &[0xd8, 0x79, 0x82]);
        let decoded: HostStateDatum = cbor::from_slice(&bytes).unwrap();
        assert_eq!(decoded.ibc_state_root, vec![0xaa; 32]);
        assert_eq!(decoded.nft_policy, HOST_STATE_NFT_POLICY.to_vec());
    }
}
