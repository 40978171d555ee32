//! Hashing, signature and encoding primitives used by the header verifier

pub mod kes;
pub mod vrf;

use bech32::{Bech32, Hrp};
use blake2::{
    digest::{consts::U32, Digest},
    Blake2b, Blake2b512, Blake2s256,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::CardanoClientError;

/// Human readable part of bech32 stake pool ids
pub const POOL_ID_HRP: &str = "pool";

/// Blake2b with a 32 byte digest, the hash used for blocks, transactions and keys
#[must_use]
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    Blake2b::<U32>::digest(data).into()
}

/// Blake2b with a 64 byte digest
#[must_use]
pub fn blake2b_512(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Blake2b512::digest(data));
    out
}

/// Blake2s with a 32 byte digest, the hash of Mithril Merkle trees
#[must_use]
pub fn blake2s_256(data: &[u8]) -> [u8; 32] {
    Blake2s256::digest(data).into()
}

/// Encodes a stake pool key hash as a bech32 `pool1...` id
///
/// # Errors
/// Returns [`CardanoClientError::MalformedKey`] if the bytes cannot be encoded.
pub fn pool_id_bech32(pool_key_hash: &[u8]) -> Result<String, CardanoClientError> {
    let hrp = Hrp::parse(POOL_ID_HRP).map_err(|e| CardanoClientError::MalformedKey(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, pool_key_hash)
        .map_err(|e| CardanoClientError::MalformedKey(e.to_string()))
}

/// Parses a 32 byte ed25519 verification key
///
/// # Errors
/// Returns [`CardanoClientError::MalformedKey`] on a wrong length or an invalid point.
pub fn ed25519_key(bytes: &[u8]) -> Result<VerifyingKey, CardanoClientError> {
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        CardanoClientError::MalformedKey(format!("ed25519 key must be 32 bytes, got {}", bytes.len()))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| CardanoClientError::MalformedKey(e.to_string()))
}

/// Verifies an ed25519 signature
///
/// # Errors
/// - [`CardanoClientError::MalformedKey`] if the key is not a valid point
/// - [`CardanoClientError::BadSignature`] if the signature is malformed or does not verify
pub fn verify_ed25519(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CardanoClientError> {
    let key = ed25519_key(public_key)?;
    let signature: [u8; 64] = signature.try_into().map_err(|_| {
        CardanoClientError::BadSignature(format!(
            "ed25519 signature must be 64 bytes, got {}",
            signature.len()
        ))
    })?;
    key.verify(message, &Signature::from_bytes(&signature))
        .map_err(|e| CardanoClientError::BadSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2_known_answers() {
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
        assert_eq!(
            hex::encode(blake2s_256(b"abc")),
            "508c5e8c327c14e2e1a72ba34eeb452f37458b209ed63a294d999b4c86675982"
        );
        assert_eq!(
            hex::encode(&blake2b_512(b"abc")[..8]),
            "ba80a53f981c4d0d"
        );
    }

    #[test]
    fn pool_id_roundtrips_through_bech32() {
        let key_hash = hex::decode("8a219b698d3b6e034391ae84cee62f1d76b6fbc45ddfe4e31e0d4b60")
            .unwrap();
        let pool_id = pool_id_bech32(&key_hash).unwrap();
        assert_eq!(pool_id, "pool13gsek6vd8dhqxsu346zvae30r4mtd77yth07fcc7p49kqc3fd09");

        let (hrp, data) = bech32::decode(&pool_id).unwrap();
        assert_eq!(hrp.as_str(), POOL_ID_HRP);
        assert_eq!(data, key_hash);
    }

    #[test]
    fn ed25519_rejects_wrong_lengths() {
        assert!(matches!(
            verify_ed25519(&[0u8; 31], b"msg", &[0u8; 64]),
            Err(CardanoClientError::MalformedKey(_))
        ));
        let key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        assert!(matches!(
            verify_ed25519(key.verifying_key().as_bytes(), b"msg", &[0u8; 63]),
            Err(CardanoClientError::BadSignature(_))
        ));
    }
}
