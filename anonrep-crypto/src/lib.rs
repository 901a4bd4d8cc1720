//! This crate includes the cryptographic core of an anonymous reputation system:
//! - Pedersen commitments over the prime-order groups of BLS12-381, with homomorphic updates,
//!   re-randomization and base rotation.
//! - Fujisaki-Okamoto commitments over the composite-order residue ring Z*_N, with a
//!   non-negativity argument built on Legendre's three-square theorem and a cut-and-choose proof
//!   that the ring generators were derived honestly.
//! - A proof that a Pedersen commitment and a Fujisaki-Okamoto commitment open to the same value.
//! - Linkable ring signatures for one-vote-per-identity voting.
//! - A verifiable shuffle that permutes and re-encrypts (pseudonym, commitment) tables.
//! - Schnorr signatures under per-round pseudonyms.

#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod algebra;
pub mod encoding;
pub mod fujiokam;
pub mod integer;
pub mod lrs;
pub mod pedersen;
pub mod proofs;
pub mod residue;
pub mod schnorr;
pub mod shuffle;
pub mod three_square;

mod primes;
mod serde;

pub use crate::encoding::Encode;
pub use crate::serde::{SerializeElement, SerializeG1, SerializeG2};

use crate::common::*;
use ::serde::*;
use ff::Field;
use num_bigint::BigInt;
use thiserror::*;

/// Error types that may arise from cryptographic operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caused by attempting to build a non-negativity argument on a negative value.
    #[error("tried to build a non-negativity argument on a negative value ({0})")]
    NegativeValue(BigInt),
    /// Caused by bytes that do not decode to the expected type.
    #[error("malformed encoding: {0}")]
    Decode(String),
    /// Caused by combining residues that live in different rings.
    #[error("residues belong to different moduli")]
    ModulusMismatch,
    /// Caused by a value that is not invertible modulo the ring modulus.
    #[error("value is not a unit modulo N")]
    NotAUnit,
    /// Caused by a ring signature whose size disagrees with the ring of public keys.
    #[error("expected a ring of {expected} keys, got {got}")]
    RingSize {
        /// The number of public keys in the ring.
        expected: usize,
        /// The number of responses carried by the signature.
        got: usize,
    },
    /// Caused by a signer index outside the ring.
    #[error("signer index {index} is outside a ring of size {size}")]
    SignerIndex {
        /// The requested index.
        index: usize,
        /// The ring size.
        size: usize,
    },
    /// Caused by the private key not matching the public key at the signer index.
    #[error("private key does not match the public key at index {0}")]
    KeyMismatch(usize),
    /// Caused by lists of mismatched length, such as an honesty challenge of the wrong size.
    #[error("expected {expected} items, got {got}")]
    LengthMismatch {
        /// The expected number of items.
        expected: usize,
        /// The number of items received.
        got: usize,
    },
    /// Caused by asking a shuffle to apply a zero factor, which is not invertible.
    #[error("shuffle factors must be non-zero")]
    ZeroFactor,
}

/// Blinding factor for a Pedersen commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindingFactor(#[serde(with = "SerializeElement")] pub(crate) Scalar);

impl BlindingFactor {
    /// Generate a new blinding factor uniformly at random from the set of possible [`Scalar`]s.
    pub fn new(rng: &mut impl Rng) -> Self {
        Self(Scalar::random(rng))
    }

    /// Construct a blinding factor from the scalar representing it.
    ///
    /// **warning:** this should only be used when the opening of a commitment is already known,
    /// e.g. when it was sent over the wire.
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// The blinding factor that contributes nothing to a commitment.
    pub fn zero() -> Self {
        Self(Scalar::ZERO)
    }

    /// Convert to the inner scalar representing this blinding factor.
    pub fn to_scalar(&self) -> Scalar {
        self.0
    }

    pub(crate) fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

impl std::ops::Add for BlindingFactor {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for BlindingFactor {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

pub use common::{random_non_zero_scalar, Rng};

mod common {
    //! Common types used internally.

    pub use crate::BlindingFactor;
    pub use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
    pub use group::{Group, GroupEncoding};

    /// A trait synonym for a cryptographically secure random number generator. This trait is
    /// blanket-implemented for all valid types and will never need to be implemented by-hand.
    pub trait Rng: rand_core::CryptoRng + rand_core::RngCore {}
    impl<T: rand_core::CryptoRng + rand_core::RngCore> Rng for T {}

    /// Select a non-identity element from the group uniformly at random.
    pub fn random_non_identity<G>(rng: &mut impl Rng) -> G
    where
        G: Group<Scalar = Scalar>,
    {
        loop {
            let g = G::random(&mut *rng);
            if !bool::from(g.is_identity()) {
                return g;
            }
        }
    }

    /// Hash a message to a G1 point whose discrete logarithm nobody knows.
    pub fn hash_to_g1(domain: &[u8], message: &[u8]) -> G1Projective {
        use bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve};
        <G1Projective as HashToCurve<ExpandMsgXmd<sha2::Sha256>>>::hash_to_curve(message, domain)
    }

    /// Select a non-zero scalar uniformly at random.
    pub fn random_non_zero_scalar(rng: &mut impl Rng) -> Scalar {
        use ff::Field;
        loop {
            let s = Scalar::random(&mut *rng);
            if !bool::from(s.is_zero()) {
                return s;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;

    /// Seeded rng for replicable tests.
    pub(crate) fn rng() -> rand::rngs::StdRng {
        const TEST_RNG_SEED: [u8; 32] = *b"NEVER USE THIS FOR ANYTHING REAL";
        rand::rngs::StdRng::from_seed(TEST_RNG_SEED)
    }
}
