#![allow(dead_code)]

use anonrep_crypto::fujiokam::{FujiOkamBase, GeneratorSecrets, SafePrimeFactors};
use anonrep_crypto::pedersen::PedersenBase;
use bls12_381::G1Projective;
use rand::SeedableRng;

// Seeded rng for replicable tests.
pub fn seeded_rng() -> (impl rand::CryptoRng + rand::RngCore) {
    const TEST_RNG_SEED: [u8; 32] = *b"NEVER USE THIS FOR ANYTHING REAL";
    rand::rngs::StdRng::from_seed(TEST_RNG_SEED)
}

/// Bit length of the Sophie Germain primes behind test moduli; small enough to generate quickly.
pub const TEST_PRIME_BITS: u64 = 48;

/// Everything a coordinator sets up for the commitments of one round.
pub struct Fixture {
    pub pedersen: PedersenBase<G1Projective>,
    pub fujiokam: FujiOkamBase,
    pub secrets: GeneratorSecrets,
}

pub fn fixture(rng: &mut (impl rand::CryptoRng + rand::RngCore)) -> Fixture {
    let factors = SafePrimeFactors::generate(&mut *rng, TEST_PRIME_BITS);
    let (fujiokam, secrets) = FujiOkamBase::generate(&mut *rng, &factors);
    Fixture {
        pedersen: PedersenBase::new(&mut *rng),
        fujiokam,
        secrets,
    }
}

/// The modulus `N = 7 · 11 = 77` built from the Sophie Germain primes 3 and 5.
pub fn toy_factors() -> SafePrimeFactors {
    SafePrimeFactors::new(3u32.into(), 5u32.into()).unwrap()
}
