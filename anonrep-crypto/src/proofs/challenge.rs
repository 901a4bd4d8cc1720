//! Functionality for building Fiat-Shamir challenges.
//!
//! Proofs over the prime-order groups finish the transcript into a [`Challenge`] scalar. Proofs
//! that cross into the residue ring need an unreduced integer challenge instead, produced by
//! [`ChallengeBuilder::finish_integer`]. Every transcript starts with a domain-separation label,
//! and every input is length-prefixed, so two distinct transcripts never hash the same bytes.

use crate::{
    common::*,
    integer::{integer_from_digest, CHALLENGE_BITS},
    residue::Residue,
};
use num_bigint::BigInt;
use sha3::{Digest, Sha3_256};

/// A trait implemented by types which can feed their public components into a
/// [`ChallengeBuilder`].
pub trait ChallengeInput {
    /// Incorporate public components of this type into a [`ChallengeBuilder`].
    fn consume(&self, builder: &mut ChallengeBuilder);
}

impl<'a, T: ChallengeInput + ?Sized> ChallengeInput for &'a T {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        (**self).consume(builder);
    }
}

impl<T: ChallengeInput> ChallengeInput for [T] {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes((self.len() as u64).to_le_bytes());
        for item in self {
            item.consume(builder);
        }
    }
}

impl<T: ChallengeInput> ChallengeInput for Vec<T> {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        self.as_slice().consume(builder);
    }
}

impl ChallengeInput for Scalar {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.to_bytes());
    }
}

impl ChallengeInput for G1Projective {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.to_bytes());
    }
}

impl ChallengeInput for G2Projective {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.to_bytes());
    }
}

impl ChallengeInput for Residue {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.modulus().to_bytes_be());
        builder.consume_bytes(self.value().to_bytes_be());
    }
}

impl ChallengeInput for BigInt {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.to_signed_bytes_be());
    }
}

/// A challenge scalar for use in a Schnorr-style proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge(Scalar);

impl Challenge {
    /// Retrieve the internal scalar value.
    pub fn to_scalar(self) -> Scalar {
        self.0
    }

    /// Wrap a scalar chosen by the prover, such as the simulated share of an OR-proof challenge.
    pub(crate) fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }
}

/// Holds state used when building a challenge using the Fiat-Shamir heuristic.
#[derive(Debug, Clone)]
#[allow(missing_copy_implementations)]
pub struct ChallengeBuilder {
    hasher: Sha3_256,
}

impl ChallengeBuilder {
    /// Initialize a new transcript under a domain-separation label.
    pub fn new(label: &[u8]) -> Self {
        let mut builder = Self {
            hasher: Sha3_256::new(),
        };
        builder.consume_bytes(label);
        builder
    }

    /// Incorporate public data from some given type into the challenge.
    pub fn consume<T: ChallengeInput + ?Sized>(&mut self, object: &T) {
        object.consume(self);
    }

    /// A conveniently chainable variant of [`ChallengeBuilder::consume`].
    pub fn with<T: ChallengeInput + ?Sized>(mut self, object: &T) -> Self {
        object.consume(&mut self);
        self
    }

    /// Incorporate arbitrary bytes into the challenge.
    pub fn consume_bytes(&mut self, bytes: impl AsRef<[u8]>) {
        let bytes = bytes.as_ref();
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// A conveniently chainable variant of [`ChallengeBuilder::consume_bytes`].
    pub fn with_bytes(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.consume_bytes(bytes);
        self
    }

    /// Consume the builder and generate a [`Challenge`] from the accumulated data.
    pub fn finish(self) -> Challenge {
        let mut wide = [0u8; 64];
        wide[..32].copy_from_slice(self.hasher.finalize().as_ref());
        Challenge(Scalar::from_bytes_wide(&wide))
    }

    /// Consume the builder and generate a non-negative integer challenge of
    /// [`CHALLENGE_BITS`] bits.
    pub fn finish_integer(self) -> BigInt {
        let digest = self.hasher.finalize();
        debug_assert_eq!(digest.len() as u64 * 8, CHALLENGE_BITS);
        integer_from_digest(digest.as_ref())
    }
}
