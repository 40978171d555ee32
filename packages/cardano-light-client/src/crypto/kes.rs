//! Sum composition key evolving signatures (`Sum6KES` over ed25519) as used by Praos headers.
//!
//! Verification is done by `pallas_crypto`. A depth `d` signature is
//! `sig_{d-1} || vk_left || vk_right` and the verification key at depth `d` is
//! `blake2b_256(vk_left || vk_right)`.

use pallas_crypto::kes::{common::PublicKey, summed_kes::Sum6KesSig, traits::KesSig};

use crate::error::CardanoClientError;

/// Depth of the KES tree used by Cardano
pub const SUM6_DEPTH: u32 = 6;

/// Total size of a `Sum6KES` signature: an ed25519 leaf plus two keys per level
pub const SUM6_SIGNATURE_SIZE: usize = 64 + SUM6_DEPTH as usize * 64;

/// Number of periods a `Sum6KES` key is valid for
pub const SUM6_TOTAL_PERIODS: u64 = 1 << SUM6_DEPTH;

/// Verifies a `Sum6KES` signature for the given period
///
/// # Errors
/// - [`CardanoClientError::BadSignature`] on a wrong size, an out of range period or a failed check
/// - [`CardanoClientError::MalformedKey`] if the verification key is not 32 bytes
pub fn verify_sum6(
    verification_key: &[u8],
    period: u64,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CardanoClientError> {
    if signature.len() != SUM6_SIGNATURE_SIZE {
        return Err(CardanoClientError::BadSignature(format!(
            "kes signature must be {SUM6_SIGNATURE_SIZE} bytes, got {}",
            signature.len()
        )));
    }
    let period = u32::try_from(period)
        .ok()
        .filter(|p| u64::from(*p) < SUM6_TOTAL_PERIODS)
        .ok_or_else(|| {
            CardanoClientError::BadSignature(format!(
                "kes period {period} is outside of the key lifetime of {SUM6_TOTAL_PERIODS} periods"
            ))
        })?;

    let key = PublicKey::from_bytes(verification_key)
        .map_err(|e| CardanoClientError::MalformedKey(format!("kes verification key: {e:?}")))?;
    let signature = Sum6KesSig::from_bytes(signature)
        .map_err(|e| CardanoClientError::BadSignature(format!("kes signature: {e:?}")))?;
    signature
        .verify(period, &key, message)
        .map_err(|e| CardanoClientError::BadSignature(format!("kes signature: {e:?}")))
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;
    use crate::crypto;

    struct Tree {
        leaves: Vec<SigningKey>,
    }

    impl Tree {
        fn new() -> Self {
            let leaves = (0..SUM6_TOTAL_PERIODS)
                .map(|i| SigningKey::from_bytes(&[u8::try_from(i).unwrap() + 1; 32]))
                .collect();
            Self { leaves }
        }

        // verification key of the subtree covering `count` leaves starting at `first`
        fn vk(&self, first: usize, count: usize) -> [u8; 32] {
            if count == 1 {
                return self.leaves[first].verifying_key().to_bytes();
            }
            let half = count / 2;
            let mut keys = self.vk(first, half).to_vec();
            keys.extend(self.vk(first + half, half));
            crypto::blake2b_256(&keys)
        }

        fn sign(&self, period: usize, message: &[u8]) -> Vec<u8> {
            let mut signature = self.leaves[period].sign(message).to_bytes().to_vec();
            let mut count = 1;
            while count < self.leaves.len() {
                let first = (period / (count * 2)) * count * 2;
                signature.extend(self.vk(first, count));
                signature.extend(self.vk(first + count, count));
                count *= 2;
            }
            signature
        }
    }

    #[test]
    fn verifies_every_tenth_period() {
        let tree = Tree::new();
        let root = tree.vk(0, tree.leaves.len());
        for period in (0..64).step_by(10) {
            let signature = tree.sign(period, b"header body");
            assert_eq!(signature.len(), SUM6_SIGNATURE_SIZE);
            verify_sum6(&root, period as u64, b"header body", &signature).unwrap();
        }
    }

    #[test]
    fn rejects_wrong_period_and_message() {
        let tree = Tree::new();
        let root = tree.vk(0, tree.leaves.len());
        let signature = tree.sign(9, b"header body");

        assert!(matches!(
            verify_sum6(&root, 8, b"header body", &signature),
            Err(CardanoClientError::BadSignature(_))
        ));
        assert!(matches!(
            verify_sum6(&root, 9, b"other body", &signature),
            Err(CardanoClientError::BadSignature(_))
        ));
        assert!(matches!(
            verify_sum6(&root, 64, b"header body", &signature),
            Err(CardanoClientError::BadSignature(_))
        ));
    }

    #[test]
    fn rejects_wrong_root_and_size() {
        let tree = Tree::new();
        let signature = tree.sign(0, b"m");

        assert!(matches!(
            verify_sum6(&[0u8; 32], 0, b"m", &signature),
            Err(CardanoClientError::BadSignature(_))
        ));
        assert!(matches!(
            verify_sum6(&tree.vk(0, 64), 0, b"m", &signature[1..]),
            Err(CardanoClientError::BadSignature(_))
        ));
    }
}
