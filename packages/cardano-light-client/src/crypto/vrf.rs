//! Praos VRF verification: ECVRF-ED25519-SHA512-Elligator2 (IETF draft 03, suite `0x04`).

use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    montgomery::MontgomeryPoint,
    scalar::Scalar,
};
use primitive_types::{U256, U512};
use sha2::{Digest, Sha512};

use crate::{crypto, error::CardanoClientError};

/// Suite identifier of ECVRF-ED25519-SHA512-Elligator2
const SUITE: u8 = 0x04;

/// Size of a VRF proof: `gamma (32) || c (16) || s (32)`
pub const PROOF_SIZE: usize = 80;

/// Size of a VRF output
pub const OUTPUT_SIZE: usize = 64;

/// `2^255 - 19`
const P: U256 = U256([
    0xffff_ffff_ffff_ffed,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0x7fff_ffff_ffff_ffff,
]);

/// Montgomery `A` coefficient of curve25519
const MONTGOMERY_A: u64 = 486_662;

/// Builds the VRF input of a Praos header: `blake2b_256(BE64(slot) || epoch_nonce)`
#[must_use]
pub fn praos_seed(slot: u64, epoch_nonce: &[u8]) -> [u8; 32] {
    let mut input = Vec::with_capacity(8 + epoch_nonce.len());
    input.extend_from_slice(&slot.to_be_bytes());
    input.extend_from_slice(epoch_nonce);
    crypto::blake2b_256(&input)
}

/// Verifies a VRF proof for `alpha` and returns the 64 byte VRF output
///
/// # Errors
/// - [`CardanoClientError::MalformedKey`] if the public key is not a valid point
/// - [`CardanoClientError::BadVrf`] if the proof is malformed or does not verify
pub fn verify(
    public_key: &[u8],
    proof: &[u8],
    alpha: &[u8],
) -> Result<[u8; OUTPUT_SIZE], CardanoClientError> {
    let y = decompress(public_key)
        .ok_or_else(|| CardanoClientError::MalformedKey("vrf key is not a curve point".into()))?;
    if proof.len() != PROOF_SIZE {
        return Err(CardanoClientError::BadVrf(format!(
            "proof must be {PROOF_SIZE} bytes, got {}",
            proof.len()
        )));
    }

    let gamma = decompress(&proof[..32])
        .ok_or_else(|| CardanoClientError::BadVrf("gamma is not a curve point".into()))?;
    let mut c_bytes = [0u8; 32];
    c_bytes[..16].copy_from_slice(&proof[32..48]);
    let c = Scalar::from_bytes_mod_order(c_bytes);
    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&proof[48..80]);
    let s = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes))
        .ok_or_else(|| CardanoClientError::BadVrf("s is not a canonical scalar".into()))?;

    let h = hash_to_curve(public_key, alpha)?;
    let u = EdwardsPoint::vartime_double_scalar_mul_basepoint(&(-c), &y, &s);
    let v = s * h - c * gamma;

    let challenge = hash_points(&[h, gamma, u, v]);
    if challenge[..16] != proof[32..48] {
        return Err(CardanoClientError::BadVrf("challenge mismatch".into()));
    }

    let mut hasher = Sha512::new();
    hasher.update([SUITE, 0x03]);
    hasher.update(gamma.mul_by_cofactor().compress().as_bytes());
    let mut output = [0u8; OUTPUT_SIZE];
    output.copy_from_slice(&hasher.finalize());
    Ok(output)
}

fn decompress(bytes: &[u8]) -> Option<EdwardsPoint> {
    let bytes: [u8; 32] = bytes.try_into().ok()?;
    CompressedEdwardsY(bytes).decompress()
}

fn hash_points(points: &[EdwardsPoint]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update([SUITE, 0x02]);
    for point in points {
        hasher.update(point.compress().as_bytes());
    }
    let mut challenge = [0u8; 64];
    challenge.copy_from_slice(&hasher.finalize());
    challenge
}

/// Elligator2 hash to curve of draft 03, as implemented by libsodium's `from_uniform`
fn hash_to_curve(public_key: &[u8], alpha: &[u8]) -> Result<EdwardsPoint, CardanoClientError> {
    let mut hasher = Sha512::new();
    hasher.update([SUITE, 0x01]);
    hasher.update(public_key);
    hasher.update(alpha);
    let digest = hasher.finalize();

    let mut r_bytes = [0u8; 32];
    r_bytes.copy_from_slice(&digest[..32]);
    r_bytes[31] &= 0x7f;
    let r = U256::from_little_endian(&r_bytes);

    let a = U256::from(MONTGOMERY_A);
    let one = U256::one();

    // x = -A / (1 + 2r^2)
    let denominator = add(mul(U256::from(2u8), mul(r, r)), one);
    let mut x = neg(mul(a, invert(denominator)));

    // e = legendre(x^3 + A x^2 + x)
    let x2 = mul(x, x);
    let e = add(add(mul(x2, x), mul(a, x2)), x);
    let chi = pow(e, (P - one) / U256::from(2u8));
    if chi == P - one {
        x = sub(neg(x), a);
    }

    let mut u = [0u8; 32];
    for (i, byte) in u.iter_mut().enumerate() {
        *byte = x.byte(i);
    }
    MontgomeryPoint(u)
        .to_edwards(0)
        .map(|point| point.mul_by_cofactor())
        .ok_or_else(|| CardanoClientError::BadVrf("hash to curve produced no point".into()))
}

fn reduce(wide: U512) -> U256 {
    let reduced = wide % U512::from(P);
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = reduced.byte(i);
    }
    U256::from_little_endian(&bytes)
}

fn mul(a: U256, b: U256) -> U256 {
    reduce(a.full_mul(b))
}

fn add(a: U256, b: U256) -> U256 {
    reduce(U512::from(a) + U512::from(b))
}

fn neg(a: U256) -> U256 {
    let a = reduce(U512::from(a));
    if a.is_zero() {
        a
    } else {
        P - a
    }
}

fn sub(a: U256, b: U256) -> U256 {
    add(a, neg(b))
}

fn pow(base: U256, exponent: U256) -> U256 {
    let mut result = U256::one();
    for i in (0..exponent.bits()).rev() {
        result = mul(result, result);
        if exponent.bit(i) {
            result = mul(result, base);
        }
    }
    result
}

fn invert(a: U256) -> U256 {
    pow(a, P - U256::from(2u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_inverse() {
        let a = U256::from(123_456_789u64);
        assert_eq!(mul(a, invert(a)), U256::one());
        assert_eq!(add(P - U256::one(), U256::from(2u8)), U256::one());
        assert_eq!(sub(U256::zero(), U256::one()), P - U256::one());
    }

    #[test]
    fn hash_to_curve_lands_in_prime_order_subgroup() {
        let key = [9u8; 32];
        let point = hash_to_curve(&key, b"alpha").unwrap();
        assert!(point.is_torsion_free());
        assert!(!point.is_small_order());
        assert_eq!(point, hash_to_curve(&key, b"alpha").unwrap());
        assert_ne!(point, hash_to_curve(&key, b"beta").unwrap());
    }

    #[test]
    fn rejects_malformed_proofs() {
        let key = curve25519_dalek::constants::ED25519_BASEPOINT_COMPRESSED.to_bytes();
        assert!(matches!(
            verify(&key, &[0u8; 79], b"alpha"),
            Err(CardanoClientError::BadVrf(_))
        ));

        let mut proof = [0u8; PROOF_SIZE];
        proof[..32].copy_from_slice(&key);
        proof[48..].copy_from_slice(&[0xff; 32]);
        assert!(matches!(
            verify(&key, &proof, b"alpha"),
            Err(CardanoClientError::BadVrf(_))
        ));

        assert!(matches!(
            verify(&[1u8; 31], &proof, b"alpha"),
            Err(CardanoClientError::MalformedKey(_))
        ));
    }
}
