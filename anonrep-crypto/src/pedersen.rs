//! Pedersen commitments \[1\] over the prime-order pairing groups from BLS12-381 \[2\].
//!
//! A [`PedersenBase`] holds the two generators `GT` and `HT`. A value `x` is committed as
//! `x·GT + r·HT` for a blinding factor `r`. Commitments add homomorphically, and re-randomizing a
//! commitment folds a fresh multiple of `HT` into it without changing the committed value.
//!
//! Reputation tables are shuffled by multiplying every commitment by a secret factor `E`. Instead
//! of tracking `E` per element, the base is rotated by the same factor, and a commitment opens
//! under the rotated base with its original `(x, r)`.
//!
//! ```
//! # use anonrep_crypto::pedersen::PedersenBase;
//! # use bls12_381::{G1Projective, Scalar};
//! # let mut rng = rand::thread_rng();
//! let base = PedersenBase::<G1Projective>::new(&mut rng);
//! let (five, r5) = base.commit(&mut rng, Scalar::from(5u64));
//! let (two, r2) = base.commit(&mut rng, Scalar::from(2u64));
//! assert!(base.verify(Scalar::from(7u64), r5 + r2, &(five + two)));
//!
//! let e = Scalar::from(11u64);
//! let rotated = base.rotate(e);
//! assert!(rotated.verify(Scalar::from(5u64), r5, &five.scale(e)));
//! ```
//!
//! ## References
//!
//! 1. Torben Pyrds Pedersen. "Non-interactive and information-theoretic secure verifiable secret
//!    sharing". 1992. URL: <https://www.cs.cornell.edu/courses/cs754/2001fa/129.PDF>
//!
//! 2. D. Boneh, S. Gorbunov, R. Wahby, H. Wee, and Z. Zhang. "BLS Signatures, Version 4".
//!    Internet-draft, IETF. 2021. URL:
//!    <https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-bls-signature-04>

use crate::{
    common::*,
    encoding::Encode,
    proofs::{ChallengeBuilder, ChallengeInput},
    serde::SerializeElement,
};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A Pedersen commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "G: SerializeElement")]
pub struct Commitment<G>(#[serde(with = "SerializeElement")] pub(crate) G)
where
    G: Group<Scalar = Scalar>;

impl<G: Group<Scalar = Scalar>> Commitment<G> {
    /// Wrap a group element that is claimed to be a commitment.
    pub fn from_element(element: G) -> Self {
        Self(element)
    }

    /// Get the inner group element representing the commitment.
    pub fn to_element(self) -> G {
        self.0
    }

    /// Multiply the commitment by a scalar.
    ///
    /// The result opens to the same value and blinding factor under the base rotated by `factor`.
    pub fn scale(self, factor: Scalar) -> Self {
        Self(self.0 * factor)
    }
}

impl<G: Group<Scalar = Scalar>> Add for Commitment<G> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl<G: Group<Scalar = Scalar>> Sub for Commitment<G> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl<G: Group<Scalar = Scalar> + GroupEncoding> ChallengeInput for Commitment<G> {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.0.to_bytes());
    }
}

impl<G: Group<Scalar = Scalar> + SerializeElement> Encode for Commitment<G> {}

/// Generators for Pedersen commitments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "G: SerializeElement")]
pub struct PedersenBase<G>
where
    G: Group<Scalar = Scalar>,
{
    #[serde(with = "SerializeElement")]
    g: G,
    #[serde(with = "SerializeElement")]
    h: G,
}

impl<G: Group<Scalar = Scalar>> PedersenBase<G> {
    /// Generate a new base with generators chosen uniformly at random.
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            g: random_non_identity(&mut *rng),
            h: random_non_identity(&mut *rng),
        }
    }

    /// Produce a base from known generators.
    pub fn from_generators(g: G, h: G) -> Self {
        Self { g, h }
    }

    /// The value generator `GT`.
    pub fn g(&self) -> &G {
        &self.g
    }

    /// The blinding generator `HT`.
    pub fn h(&self) -> &G {
        &self.h
    }

    /// Commit to `x` under a fresh uniformly random blinding factor.
    pub fn commit(&self, rng: &mut impl Rng, x: Scalar) -> (Commitment<G>, BlindingFactor) {
        let bf = BlindingFactor::new(rng);
        (self.commit_with_r(x, bf), bf)
    }

    /// Commit to `x` under the given blinding factor.
    pub fn commit_with_r(&self, x: Scalar, bf: BlindingFactor) -> Commitment<G> {
        Commitment(self.g * x + self.h * bf.as_scalar())
    }

    /// Check that `commitment` opens to `x` under `bf`.
    pub fn verify(&self, x: Scalar, bf: BlindingFactor, commitment: &Commitment<G>) -> bool {
        self.commit_with_r(x, bf) == *commitment
    }

    /// Fold a fresh multiple of `HT` into the commitment.
    ///
    /// Returns the new commitment and the added blinding, which must be added to the old blinding
    /// factor to open the result.
    pub fn randomize(
        &self,
        rng: &mut impl Rng,
        commitment: &Commitment<G>,
    ) -> (Commitment<G>, BlindingFactor) {
        let extra = BlindingFactor::new(rng);
        (Commitment(commitment.0 + self.h * extra.as_scalar()), extra)
    }

    /// Multiply both generators by `factor`.
    pub fn rotate(&self, factor: Scalar) -> Self {
        Self {
            g: self.g * factor,
            h: self.h * factor,
        }
    }
}

impl PedersenBase<G1Projective> {
    /// Derive a base from a public label by hashing to the curve.
    ///
    /// Neither generator has a known discrete logarithm relative to the other, so no party holds a
    /// trapdoor for the resulting commitments.
    pub fn from_label(label: &[u8]) -> Self {
        Self {
            g: hash_to_g1(b"ANONREP-V01-PEDERSEN-GT", label),
            h: hash_to_g1(b"ANONREP-V01-PEDERSEN-HT", label),
        }
    }
}

impl<G: Group<Scalar = Scalar> + GroupEncoding> ChallengeInput for PedersenBase<G> {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.g.to_bytes());
        builder.consume_bytes(self.h.to_bytes());
    }
}

impl<G: Group<Scalar = Scalar> + SerializeElement> Encode for PedersenBase<G> {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::integer::scalar_from_i64;
    use ff::Field;

    fn commit_open<G: Group<Scalar = Scalar>>() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G>::new(&mut rng);
        let x = Scalar::random(&mut rng);

        let (com, bf) = base.commit(&mut rng, x);
        assert!(base.verify(x, bf, &com));
        assert_eq!(com, base.commit_with_r(x, bf));
    }

    #[test]
    fn commit_open_g1() {
        commit_open::<G1Projective>()
    }

    #[test]
    fn commit_open_g2() {
        commit_open::<G2Projective>()
    }

    fn commit_does_not_open_on_wrong_value<G: Group<Scalar = Scalar>>() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G>::new(&mut rng);
        let x = Scalar::random(&mut rng);
        let bad_x = Scalar::random(&mut rng);
        assert_ne!(x, bad_x, "unfortunate RNG seed: bad_x should be different");

        let (com, bf) = base.commit(&mut rng, x);
        assert!(!base.verify(bad_x, bf, &com));
    }

    #[test]
    fn commit_does_not_open_on_wrong_value_g1() {
        commit_does_not_open_on_wrong_value::<G1Projective>()
    }

    #[test]
    fn commit_does_not_open_on_wrong_value_g2() {
        commit_does_not_open_on_wrong_value::<G2Projective>()
    }

    fn commit_does_not_open_on_wrong_bf<G: Group<Scalar = Scalar>>() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G>::new(&mut rng);
        let x = Scalar::random(&mut rng);
        let (com, bf) = base.commit(&mut rng, x);
        let bad_bf = BlindingFactor::new(&mut rng);
        assert_ne!(bf, bad_bf, "unfortunate RNG seed: bad_bf should be different");

        assert!(!base.verify(x, bad_bf, &com));
    }

    #[test]
    fn commit_does_not_open_on_wrong_bf_g1() {
        commit_does_not_open_on_wrong_bf::<G1Projective>()
    }

    #[test]
    fn commit_does_not_open_on_wrong_bf_g2() {
        commit_does_not_open_on_wrong_bf::<G2Projective>()
    }

    fn commit_does_not_open_on_random_commit<G: Group<Scalar = Scalar>>() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G>::new(&mut rng);
        let x = Scalar::random(&mut rng);
        let (com, bf) = base.commit(&mut rng, x);

        let bad_com = Commitment::<G>(G::random(&mut rng));
        assert_ne!(com, bad_com, "unfortunate RNG seed: bad_com should be different");
        assert!(!base.verify(x, bf, &bad_com));
    }

    #[test]
    fn commit_does_not_open_on_random_commit_g1() {
        commit_does_not_open_on_random_commit::<G1Projective>()
    }

    #[test]
    fn commit_does_not_open_on_random_commit_g2() {
        commit_does_not_open_on_random_commit::<G2Projective>()
    }

    fn commitments_are_homomorphic<G: Group<Scalar = Scalar>>() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G>::new(&mut rng);
        let x1 = Scalar::random(&mut rng);
        let x2 = Scalar::random(&mut rng);
        let (c1, r1) = base.commit(&mut rng, x1);
        let (c2, r2) = base.commit(&mut rng, x2);

        assert!(base.verify(x1 + x2, r1 + r2, &(c1 + c2)));
        assert!(base.verify(x1 - x2, r1 - r2, &(c1 - c2)));
    }

    #[test]
    fn commitments_are_homomorphic_g1() {
        commitments_are_homomorphic::<G1Projective>()
    }

    #[test]
    fn commitments_are_homomorphic_g2() {
        commitments_are_homomorphic::<G2Projective>()
    }

    #[test]
    fn signed_updates_apply_homomorphically() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G1Projective>::new(&mut rng);
        let (com, bf) = base.commit(&mut rng, Scalar::from(5u64));

        let delta = base.commit_with_r(scalar_from_i64(-2), BlindingFactor::zero());
        assert!(base.verify(Scalar::from(3u64), bf, &(com + delta)));
    }

    #[test]
    fn randomized_commitments_open_with_combined_blinding() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G1Projective>::new(&mut rng);
        let x = Scalar::from(9u64);
        let (com, bf) = base.commit(&mut rng, x);
        let (fresh, extra) = base.randomize(&mut rng, &com);

        assert_ne!(com, fresh, "unfortunate RNG seed: randomization was trivial");
        assert!(base.verify(x, bf + extra, &fresh));
        assert!(!base.verify(x, bf, &fresh));
    }

    #[test]
    fn scaled_commitments_open_under_rotated_base() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G1Projective>::new(&mut rng);
        let x = Scalar::from(5u64);
        let (com, bf) = base.commit(&mut rng, x);
        let e = Scalar::random(&mut rng);

        let rotated = base.rotate(e);
        assert!(rotated.verify(x, bf, &com.scale(e)));
        assert!(!base.verify(x, bf, &com.scale(e)));
    }

    #[test]
    fn labelled_bases_are_deterministic() {
        let a = PedersenBase::from_label(b"round zero");
        let b = PedersenBase::from_label(b"round zero");
        let c = PedersenBase::from_label(b"round one");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.g(), a.h());
    }

    #[test]
    fn commitments_decode_only_from_valid_points() {
        let mut rng = crate::test::rng();
        let base = PedersenBase::<G1Projective>::new(&mut rng);
        let (com, _) = base.commit(&mut rng, Scalar::from(1u64));
        let bytes = com.to_bytes();
        assert_eq!(Commitment::<G1Projective>::from_bytes(&bytes).unwrap(), com);

        // Clearing the compression flag makes the point encoding invalid.
        let mut corrupted = bytes;
        corrupted[0] &= 0x7f;
        assert!(Commitment::<G1Projective>::from_bytes(&corrupted).is_err());
    }
}
