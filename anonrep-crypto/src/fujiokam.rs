//! Fujisaki-Okamoto commitments over the residue ring Z*_N.
//!
//! The modulus is `N = (2p + 1)(2q + 1)` for Sophie Germain primes `p` and `q`. The blinding
//! generator `H1` is a square, so it generates the subgroup of quadratic residues of order `pq`,
//! and the value generators `G1..G6` are powers of `H1`. A commitment to an integer `x` is
//! `G1^x · H1^r`.
//!
//! The group order is hidden from everyone but the party that generated `N`, so commitment
//! randomness cannot be drawn uniformly modulo the order. It is drawn from `[-radius, radius)`
//! with `radius = 2^16 · N`, which statistically hides the committed value.
//!
//! The party that generates the base keeps [`GeneratorSecrets`] only until it has answered the
//! honesty challenges of its peers (see [`generate_honesty_proof`]); the factorization itself is
//! never part of a [`FujiOkamBase`].

mod honesty;

pub use self::honesty::*;

use crate::{
    common::*,
    encoding::Encode,
    integer::random_in_radius,
    primes::{is_probable_prime, random_sophie_germain_prime},
    proofs::{ChallengeBuilder, ChallengeInput},
    residue::Residue,
    Error,
};
use arrayvec::ArrayVec;
use num_bigint::{BigInt, BigUint, RandBigInt};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::iter;

/// Number of value generators `G1..G6` in a base.
pub const GENERATOR_COUNT: usize = 6;

/// Multiplier from `N` to the randomness radius.
const RADIUS_FACTOR: u32 = 0x10000;

/// The secret factorization of a Fujisaki-Okamoto modulus.
///
/// Holds the Sophie Germain primes `p` and `q`; the modulus is `(2p + 1)(2q + 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePrimeFactors {
    p: BigUint,
    q: BigUint,
}

impl SafePrimeFactors {
    /// Sample two distinct Sophie Germain primes of `bits` bits each.
    pub fn generate(rng: &mut impl Rng, bits: u64) -> Self {
        let p = random_sophie_germain_prime(&mut *rng, bits);
        loop {
            let q = random_sophie_germain_prime(&mut *rng, bits);
            if q != p {
                return Self { p, q };
            }
        }
    }

    /// Use known Sophie Germain primes, checking that both they and their safe primes are prime.
    pub fn new(p: BigUint, q: BigUint) -> Result<Self, Error> {
        for prime in [&p, &q] {
            if !is_probable_prime(prime) || !is_probable_prime(&((prime << 1u32) + 1u32)) {
                return Err(Error::Decode(format!("{} is not a Sophie Germain prime", prime)));
            }
        }
        if p == q {
            return Err(Error::Decode("factors must be distinct".to_string()));
        }
        Ok(Self { p, q })
    }

    /// The modulus `N = (2p + 1)(2q + 1)`.
    pub fn modulus(&self) -> BigUint {
        ((&self.p << 1u32) + 1u32) * ((&self.q << 1u32) + 1u32)
    }

    /// Sample a generator of the quadratic residues of Z*_N.
    fn random_quadratic_residue_generator(&self, rng: &mut impl Rng) -> Residue {
        let n = self.modulus();
        let p = BigInt::from(self.p.clone());
        let q = BigInt::from(self.q.clone());
        loop {
            let h = Residue::from_integer(&BigInt::from(rng.gen_biguint_below(&n)), &n);
            if !h.is_unit() {
                continue;
            }
            let h1 = h.mul(&h).expect("a residue shares its own modulus");
            // H1 has order pq exactly when neither H1^p nor H1^q collapses to one.
            let is_generator = !h1.is_one()
                && !h1.pow(&p).map_or(true, |x| x.is_one())
                && !h1.pow(&q).map_or(true, |x| x.is_one());
            if is_generator {
                return h1;
            }
        }
    }
}

/// The secret exponents `αk` with `Gk = H1^αk`.
///
/// Only needed to answer honesty challenges; the holder should drop it once every peer has
/// checked the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSecrets {
    alphas: [BigInt; GENERATOR_COUNT],
}

impl GeneratorSecrets {
    pub(crate) fn alpha(&self, index: usize) -> &BigInt {
        &self.alphas[index]
    }
}

/// Public parameters for Fujisaki-Okamoto commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFujiOkamBase", into = "RawFujiOkamBase")]
pub struct FujiOkamBase {
    n: BigUint,
    generators: [Residue; GENERATOR_COUNT],
    h1: Residue,
    radius: BigUint,
}

#[derive(Serialize, Deserialize)]
struct RawFujiOkamBase {
    n: BigUint,
    generators: [Residue; GENERATOR_COUNT],
    h1: Residue,
}

impl TryFrom<RawFujiOkamBase> for FujiOkamBase {
    type Error = Error;

    fn try_from(raw: RawFujiOkamBase) -> Result<Self, Error> {
        FujiOkamBase::from_generators(raw.n, raw.generators, raw.h1)
    }
}

impl From<FujiOkamBase> for RawFujiOkamBase {
    fn from(base: FujiOkamBase) -> Self {
        Self {
            n: base.n,
            generators: base.generators,
            h1: base.h1,
        }
    }
}

impl FujiOkamBase {
    /// Generate a fresh base from a factorization.
    ///
    /// Returns the base and the exponents relating each `Gk` to `H1`.
    pub fn generate(rng: &mut impl Rng, factors: &SafePrimeFactors) -> (Self, GeneratorSecrets) {
        let n = factors.modulus();
        let radius = radius_for(&n);
        let h1 = factors.random_quadratic_residue_generator(&mut *rng);

        let alphas = iter::repeat_with(|| random_in_radius(&mut *rng, &radius))
            .take(GENERATOR_COUNT)
            .collect::<ArrayVec<_, GENERATOR_COUNT>>()
            .into_inner()
            .expect("length mismatch impossible");
        let generators = alphas
            .iter()
            .map(|alpha| h1.pow(alpha).expect("H1 is a unit"))
            .collect::<ArrayVec<_, GENERATOR_COUNT>>()
            .into_inner()
            .expect("length mismatch impossible");

        (
            Self {
                n,
                generators,
                h1,
                radius,
            },
            GeneratorSecrets { alphas },
        )
    }

    /// Assemble a base from public generators, as received from the party that generated it.
    ///
    /// Every generator must be a unit of Z*_N, and `H1` must not be the identity.
    pub fn from_generators(
        n: BigUint,
        generators: [Residue; GENERATOR_COUNT],
        h1: Residue,
    ) -> Result<Self, Error> {
        for residue in generators.iter().chain(iter::once(&h1)) {
            if residue.modulus() != &n {
                return Err(Error::ModulusMismatch);
            }
            if !residue.is_unit() {
                return Err(Error::NotAUnit);
            }
        }
        if h1.is_one() {
            return Err(Error::Decode("H1 must not be the identity".to_string()));
        }
        let radius = radius_for(&n);
        Ok(Self {
            n,
            generators,
            h1,
            radius,
        })
    }

    /// The modulus `N`.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// The value generator `Gk`, for `k` in `1..=6`.
    ///
    /// # Panics
    /// Panics if `k` is not a generator index.
    pub fn g(&self, k: usize) -> &Residue {
        assert!(
            (1..=GENERATOR_COUNT).contains(&k),
            "generator index {} is outside G1..G6",
            k
        );
        &self.generators[k - 1]
    }

    /// All value generators, `G1` first.
    pub fn generators(&self) -> &[Residue; GENERATOR_COUNT] {
        &self.generators
    }

    /// The blinding generator `H1`.
    pub fn h1(&self) -> &Residue {
        &self.h1
    }

    /// Commitment randomness is drawn from `[-radius, radius)`.
    pub fn radius(&self) -> &BigUint {
        &self.radius
    }

    /// Twice the radius.
    pub fn diameter(&self) -> BigUint {
        &self.radius << 1u32
    }

    /// Sample commitment randomness from `[-radius, radius)`.
    pub fn random_exponent(&self, rng: &mut impl Rng) -> BigInt {
        random_in_radius(rng, &self.radius)
    }

    /// Commit to `x` under fresh randomness; returns the commitment and the randomness.
    pub fn commit(&self, rng: &mut impl Rng, x: &BigInt) -> (FoCommitment, BigInt) {
        let r = self.random_exponent(rng);
        (self.commit_with_r(x, &r), r)
    }

    /// Commit to `x` under the given randomness: `G1^x · H1^r`.
    pub fn commit_with_r(&self, x: &BigInt, r: &BigInt) -> FoCommitment {
        FoCommitment(
            self.commit_to(self.g(1), x, r)
                .expect("generators of a validated base are units"),
        )
    }

    /// Check that `commitment` opens to `x` under `r`.
    pub fn verify(&self, x: &BigInt, r: &BigInt, commitment: &FoCommitment) -> bool {
        self.commit_with_r(x, r) == *commitment
    }

    /// Multiply in a fresh power of `H1`; returns the new commitment and the added randomness.
    pub fn randomize(
        &self,
        rng: &mut impl Rng,
        commitment: &FoCommitment,
    ) -> Result<(FoCommitment, BigInt), Error> {
        let extra = self.random_exponent(rng);
        let blinding = self.h1.pow(&extra)?;
        Ok((FoCommitment(commitment.0.mul(&blinding)?), extra))
    }

    /// `g^x · H1^r` for an arbitrary residue `g`.
    pub(crate) fn commit_to(&self, g: &Residue, x: &BigInt, r: &BigInt) -> Result<Residue, Error> {
        g.pow(x)?.mul(&self.h1.pow(r)?)
    }

    /// Whether a received residue lives in this base's ring.
    pub(crate) fn contains(&self, residue: &Residue) -> bool {
        residue.modulus() == &self.n && residue.is_unit()
    }
}

fn radius_for(n: &BigUint) -> BigUint {
    n * BigUint::from(RADIUS_FACTOR)
}

impl ChallengeInput for FujiOkamBase {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.n.to_bytes_be());
        for g in &self.generators {
            builder.consume(g);
        }
        builder.consume(&self.h1);
    }
}

impl Encode for FujiOkamBase {}

/// A Fujisaki-Okamoto commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoCommitment(Residue);

impl FoCommitment {
    /// Wrap a residue that is claimed to be a commitment.
    pub fn from_residue(residue: Residue) -> Self {
        Self(residue)
    }

    /// The residue representing this commitment.
    pub fn as_residue(&self) -> &Residue {
        &self.0
    }

    /// Homomorphic addition of the committed values.
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        Ok(Self(self.0.mul(&other.0)?))
    }

    /// Homomorphic subtraction of the committed values.
    pub fn sub(&self, other: &Self) -> Result<Self, Error> {
        Ok(Self(self.0.mul(&other.0.inverse()?)?))
    }
}

impl ChallengeInput for FoCommitment {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.0);
    }
}

impl Encode for FoCommitment {}
