//! Praos (Babbage/Conway) block header decoding and verification.
//!
//! Headers are decoded with `pallas_primitives`; the raw header body is kept since it is the
//! message signed by the KES key.

use pallas_codec::minicbor::{self, Decoder};
use pallas_primitives::babbage::MintedHeader;
use tracing::debug;

use crate::{
    block,
    crypto::{self, kes, vrf},
    error::CardanoClientError,
};

/// Operational certificate binding a KES hot key to the pool's cold key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationalCert {
    /// KES verification key
    pub hot_vkey: Vec<u8>,
    /// Certificate counter
    pub sequence_number: u64,
    /// KES period the hot key starts at
    pub kes_period: u64,
    /// Cold key signature over `hot_vkey || BE64(sequence_number) || BE64(kes_period)`
    pub sigma: Vec<u8>,
}

impl OperationalCert {
    fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.hot_vkey.len() + 16);
        out.extend_from_slice(&self.hot_vkey);
        out.extend_from_slice(&self.sequence_number.to_be_bytes());
        out.extend_from_slice(&self.kes_period.to_be_bytes());
        out
    }
}

/// Decoded Praos header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PraosHeader {
    /// Block number
    pub block_number: u64,
    /// Slot
    pub slot: u64,
    /// Hash of the previous header, absent for the first block
    pub prev_hash: Option<Vec<u8>>,
    /// Pool cold verification key
    pub issuer_vkey: Vec<u8>,
    /// Pool VRF verification key
    pub vrf_vkey: Vec<u8>,
    /// Leader VRF output
    pub vrf_output: Vec<u8>,
    /// Leader VRF proof
    pub vrf_proof: Vec<u8>,
    /// Size of the block body
    pub body_size: u64,
    /// Hash of the block body
    pub body_hash: Vec<u8>,
    /// Operational certificate
    pub operational_cert: OperationalCert,
    /// KES signature over the raw header body
    pub kes_signature: Vec<u8>,
    /// Raw header body bytes, the KES signed message
    pub raw_body: Vec<u8>,
    /// Blake2b-256 of the whole header
    pub hash: [u8; 32],
}

/// Result of a successful header verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedHeader {
    /// Lowercase hex blake2b-256 of the VRF verification key
    pub vrf_key_hash: String,
    /// Block number
    pub block_number: u64,
    /// Slot
    pub slot: u64,
    /// Lowercase hex header hash
    pub block_hash: String,
}

impl PraosHeader {
    /// Decodes a header
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidHeaderCbor`] if the bytes are not a Praos header.
    pub fn decode(header_cbor: &[u8]) -> Result<Self, CardanoClientError> {
        Self::decode_inner(header_cbor)
            .map_err(|e| CardanoClientError::InvalidHeaderCbor(e.to_string()))
    }

    fn decode_inner(header_cbor: &[u8]) -> Result<Self, minicbor::decode::Error> {
        let mut d = Decoder::new(header_cbor);
        let header: MintedHeader<'_> = d.decode()?;
        if d.position() != header_cbor.len() {
            return Err(minicbor::decode::Error::message("trailing bytes after header"));
        }

        let body = &header.header_body;
        let cert = &body.operational_cert;
        Ok(Self {
            block_number: body.block_number,
            slot: body.slot,
            prev_hash: body.prev_hash.as_ref().map(|hash| hash.to_vec()),
            issuer_vkey: body.issuer_vkey.to_vec(),
            vrf_vkey: body.vrf_vkey.to_vec(),
            vrf_output: body.vrf_result.0.to_vec(),
            vrf_proof: body.vrf_result.1.to_vec(),
            body_size: body.block_body_size,
            body_hash: body.block_body_hash.to_vec(),
            operational_cert: OperationalCert {
                hot_vkey: cert.operational_cert_hot_vkey.to_vec(),
                sequence_number: cert.operational_cert_sequence_number,
                kes_period: cert.operational_cert_kes_period,
                sigma: cert.operational_cert_sigma.to_vec(),
            },
            kes_signature: header.body_signature.to_vec(),
            raw_body: body.raw_cbor().to_vec(),
            hash: crypto::blake2b_256(header_cbor),
        })
    }

    /// KES period of the header's slot relative to the start of the hot key
    ///
    /// # Errors
    /// Returns [`CardanoClientError::BadSignature`] if the slot precedes the hot key.
    pub fn kes_period(&self, slot_per_kes_period: u64) -> Result<u64, CardanoClientError> {
        if slot_per_kes_period == 0 {
            return Err(CardanoClientError::InvalidSlotPerKesPeriod);
        }
        (self.slot / slot_per_kes_period)
            .checked_sub(self.operational_cert.kes_period)
            .ok_or_else(|| {
                CardanoClientError::BadSignature(format!(
                    "slot {} is before the operational certificate's kes period {}",
                    self.slot, self.operational_cert.kes_period
                ))
            })
    }

    /// Checks the operational certificate and the KES signature
    ///
    /// # Errors
    /// Returns [`CardanoClientError::BadSignature`] if either signature does not verify.
    pub fn verify_signatures(&self, slot_per_kes_period: u64) -> Result<(), CardanoClientError> {
        let cert = &self.operational_cert;
        crypto::verify_ed25519(&self.issuer_vkey, &cert.signed_bytes(), &cert.sigma).map_err(
            |e| CardanoClientError::BadSignature(format!("operational certificate: {e}")),
        )?;
        let period = self.kes_period(slot_per_kes_period)?;
        kes::verify_sum6(&cert.hot_vkey, period, &self.raw_body, &self.kes_signature)
    }

    /// Checks the leader VRF proof against the epoch nonce
    ///
    /// # Errors
    /// Returns [`CardanoClientError::BadVrf`] if the proof does not verify or the output differs.
    pub fn verify_vrf(&self, epoch_nonce: &[u8]) -> Result<(), CardanoClientError> {
        let seed = vrf::praos_seed(self.slot, epoch_nonce);
        let output = vrf::verify(&self.vrf_vkey, &self.vrf_proof, &seed)?;
        if output.as_slice() != self.vrf_output.as_slice() {
            return Err(CardanoClientError::BadVrf(
                "vrf output differs from the header".to_string(),
            ));
        }
        Ok(())
    }

    /// Lowercase hex blake2b-256 of the VRF key, the identity used for pool membership
    #[must_use]
    pub fn vrf_key_hash(&self) -> String {
        hex::encode(crypto::blake2b_256(&self.vrf_vkey))
    }
}

/// Verifies a header together with its block body.
///
/// # Errors
/// - [`CardanoClientError::InvalidHeaderCbor`] if the header cannot be decoded
/// - [`CardanoClientError::BadSignature`] if the operational certificate or KES signature fails
/// - [`CardanoClientError::BadVrf`] if the VRF proof fails
/// - [`CardanoClientError::BadBodyHash`] if the body does not hash to the header's commitment
pub fn verify_header(
    header_cbor: &[u8],
    body_cbor: &[u8],
    epoch_nonce: &[u8],
    slot_per_kes_period: u64,
) -> Result<VerifiedHeader, CardanoClientError> {
    let header = PraosHeader::decode(header_cbor)?;
    header.verify_signatures(slot_per_kes_period)?;
    header.verify_vrf(epoch_nonce)?;

    let txs = block::decode_block_body(body_cbor)?;
    let computed = block::body_hash(&txs)?;
    if computed.as_slice() != header.body_hash.as_slice() {
        return Err(CardanoClientError::BadBodyHash {
            expected: hex::encode(&header.body_hash),
            computed: hex::encode(computed),
        });
    }

    let verified = VerifiedHeader {
        vrf_key_hash: header.vrf_key_hash(),
        block_number: header.block_number,
        slot: header.slot,
        block_hash: hex::encode(header.hash),
    };
    debug!(
        block_number = verified.block_number,
        slot = verified.slot,
        block_hash = %verified.block_hash,
        "verified praos header"
    );
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        fixture_block_body, fixture_epoch_nonce, fixture_header, FIXTURE_BLOCK_HASH,
        FIXTURE_SLOT_PER_KES_PERIOD, FIXTURE_VRF_KEY_HASH,
    };

    #[test]
    fn decodes_fixture_header() {
        let header = PraosHeader::decode(&fixture_header()).unwrap();
        assert_eq!(header.block_number, 303_388);
        assert_eq!(header.slot, 1_214_030);
        assert_eq!(
            header.prev_hash.as_deref().map(hex::encode).as_deref(),
            Some("40b933e31ffbb08a719d6166bb076cdf1558f3ff6130c02acd6fa15f359a7bd5")
        );
        assert_eq!(header.kes_signature.len(), kes::SUM6_SIGNATURE_SIZE);
        assert_eq!(hex::encode(header.hash), FIXTURE_BLOCK_HASH);
        assert_eq!(header.vrf_key_hash(), FIXTURE_VRF_KEY_HASH);
        assert_eq!(header.kes_period(FIXTURE_SLOT_PER_KES_PERIOD).unwrap(), 9);
    }

    #[test]
    fn verifies_fixture_header() {
        let verified = verify_header(
            &fixture_header(),
            &fixture_block_body(),
            &fixture_epoch_nonce(),
            FIXTURE_SLOT_PER_KES_PERIOD,
        )
        .unwrap();
        assert_eq!(verified.vrf_key_hash, FIXTURE_VRF_KEY_HASH);
        assert_eq!(verified.block_number, 303_388);
        assert_eq!(verified.slot, 1_214_030);
        assert_eq!(verified.block_hash, FIXTURE_BLOCK_HASH);
    }

    #[test]
    fn wrong_epoch_nonce_fails_vrf() {
        let mut nonce = fixture_epoch_nonce();
        nonce[0] ^= 1;
        assert!(matches!(
            verify_header(
                &fixture_header(),
                &fixture_block_body(),
                &nonce,
                FIXTURE_SLOT_PER_KES_PERIOD
            ),
            Err(CardanoClientError::BadVrf(_))
        ));

        let truncated = &fixture_epoch_nonce()[..31];
        assert!(matches!(
            verify_header(
                &fixture_header(),
                &fixture_block_body(),
                truncated,
                FIXTURE_SLOT_PER_KES_PERIOD
            ),
            Err(CardanoClientError::BadVrf(_))
        ));
    }

    #[test]
    fn wrong_kes_period_length_fails_signature() {
        assert!(matches!(
            verify_header(
                &fixture_header(),
                &fixture_block_body(),
                &fixture_epoch_nonce(),
                FIXTURE_SLOT_PER_KES_PERIOD * 2
            ),
            Err(CardanoClientError::BadSignature(_))
        ));
    }

    #[test]
    fn tampered_header_body_fails_kes() {
        let mut header = PraosHeader::decode(&fixture_header()).unwrap();
        header.raw_body[4] ^= 0x01;
        assert!(matches!(
            header.verify_signatures(FIXTURE_SLOT_PER_KES_PERIOD),
            Err(CardanoClientError::BadSignature(_))
        ));
    }

    #[test]
    fn other_body_fails_body_hash() {
        assert!(matches!(
            verify_header(
                &fixture_header(),
                &[0x80],
                &fixture_epoch_nonce(),
                FIXTURE_SLOT_PER_KES_PERIOD
            ),
            Err(CardanoClientError::BadBodyHash { .. })
        ));
    }

    #[test]
    fn garbage_is_invalid_header_cbor() {
        assert!(matches!(
            PraosHeader::decode(&[0x82, 0x01]),
            Err(CardanoClientError::InvalidHeaderCbor(_))
        ));
    }
}
