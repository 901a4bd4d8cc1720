//! Conversions between integers and BLS12-381 scalars, and sampling of bounded integers.
//!
//! Proofs that cross the two commitment domains carry their challenges and responses as
//! unbounded integers. They are reduced modulo the scalar order only when they enter Pedersen
//! arithmetic; the residue ring consumes them unreduced.

use crate::common::*;
use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

/// Width of Fiat-Shamir integer challenges, in bits.
pub const CHALLENGE_BITS: u64 = 256;

/// Statistical distance parameter for masking witnesses, in bits.
pub const STATISTICAL_SECURITY_BITS: u64 = 80;

/// Little-endian bytes of the BLS12-381 scalar field order.
const SCALAR_ORDER_LE: [u8; 32] = [
    0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0x02, 0xa4, 0xbd, 0x53,
    0x05, 0xd8, 0xa1, 0x09, 0x08, 0xd8, 0x39, 0x33, 0x48, 0x7d, 0x9d, 0x29, 0x53, 0xa7, 0xed, 0x73,
];

/// The order of the BLS12-381 scalar field.
pub fn scalar_order() -> BigInt {
    BigInt::from_bytes_le(Sign::Plus, &SCALAR_ORDER_LE)
}

/// Reduce an integer modulo the scalar order and convert it to a [`Scalar`].
///
/// Negative integers map to their additive inverse, so `scalar_from_integer(-x)` is
/// `-scalar_from_integer(x)`.
pub fn scalar_from_integer(value: &BigInt) -> Scalar {
    let reduced = value.mod_floor(&scalar_order());
    let (_, digits) = reduced.to_bytes_le();
    let mut bytes = [0u8; 32];
    bytes[..digits.len()].copy_from_slice(&digits);
    Option::from(Scalar::from_bytes(&bytes)).expect("value was reduced below the scalar order")
}

/// Convert a signed machine integer to a [`Scalar`].
pub fn scalar_from_i64(value: i64) -> Scalar {
    let magnitude = Scalar::from(value.unsigned_abs());
    if value.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// The canonical non-negative integer representing a [`Scalar`].
pub fn scalar_to_integer(scalar: &Scalar) -> BigInt {
    BigInt::from_bytes_le(Sign::Plus, &scalar.to_bytes())
}

/// Interpret a digest as a non-negative big-endian integer.
pub fn integer_from_digest(digest: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, digest)
}

/// Sample an integer uniformly from `[-radius, radius)`.
pub fn random_in_radius(rng: &mut impl Rng, radius: &BigUint) -> BigInt {
    let diameter = radius << 1u32;
    let draw = BigInt::from(rng.gen_biguint_below(&diameter));
    draw - BigInt::from(radius.clone())
}

/// Sample an integer uniformly from `[0, bound)`.
pub fn random_below(rng: &mut impl Rng, bound: &BigUint) -> BigInt {
    BigInt::from(rng.gen_biguint_below(bound))
}

/// Widen a radius so that values drawn from it statistically hide a witness of magnitude
/// `radius` multiplied by a [`CHALLENGE_BITS`]-bit challenge.
pub fn masking_radius(radius: &BigUint) -> BigUint {
    radius << (CHALLENGE_BITS + STATISTICAL_SECURITY_BITS)
}

/// Modular inverse of `value` modulo `modulus`, if it exists.
pub(crate) fn mod_inverse(value: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    if modulus.is_zero() {
        return None;
    }
    let value = BigInt::from(value % modulus);
    let modulus = BigInt::from(modulus.clone());
    let extended = value.extended_gcd(&modulus);
    if !extended.gcd.is_one() {
        return None;
    }
    extended.x.mod_floor(&modulus).to_biguint()
}
