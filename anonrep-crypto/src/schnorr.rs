//! Schnorr signatures under pseudonyms.
//!
//! A pseudonym is `x·g` for a client's long-term secret `x` and the round generator `g`, so the
//! generator is an explicit input everywhere: a signature made under one round's generator does
//! not verify under another's.

use crate::{
    common::*,
    encoding::Encode,
    proofs::{Challenge, ChallengeBuilder},
    serde::SerializeElement,
};
use ff::Field;
use serde::{Deserialize, Serialize};

const SCHNORR_LABEL: &[u8] = b"ANONREP-V01-SCHNORR";

/// A Schnorr signature `(c, s)` with `c = H(g, pk, s·g + c·pk, msg)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "SerializeElement")]
    c: Scalar,
    #[serde(with = "SerializeElement")]
    s: Scalar,
}

impl Encode for Signature {}

/// Sign `message` with secret `x` under generator `g`.
pub fn sign(rng: &mut impl Rng, g: &G1Projective, x: &Scalar, message: &[u8]) -> Signature {
    let public_key = g * x;
    let k = random_non_zero_scalar(&mut *rng);
    let c = challenge(g, &public_key, &(g * k), message).to_scalar();
    Signature { c, s: k - c * x }
}

/// Verify a signature by the holder of `public_key = x·g`.
pub fn verify(
    g: &G1Projective,
    public_key: &G1Projective,
    message: &[u8],
    signature: &Signature,
) -> bool {
    if bool::from(signature.c.is_zero()) {
        return false;
    }
    let commitment = g * signature.s + public_key * signature.c;
    challenge(g, public_key, &commitment, message).to_scalar() == signature.c
}

fn challenge(
    g: &G1Projective,
    public_key: &G1Projective,
    commitment: &G1Projective,
    message: &[u8],
) -> Challenge {
    ChallengeBuilder::new(SCHNORR_LABEL)
        .with(g)
        .with(public_key)
        .with(commitment)
        .with_bytes(message)
        .finish()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signatures_verify() {
        let mut rng = crate::test::rng();
        let g = random_non_identity::<G1Projective>(&mut rng);
        let x = Scalar::random(&mut rng);
        let signature = sign(&mut rng, &g, &x, b"post this");
        assert!(verify(&g, &(g * x), b"post this", &signature));
    }

    #[test]
    fn signatures_fail_under_another_generator() {
        let mut rng = crate::test::rng();
        let g = random_non_identity::<G1Projective>(&mut rng);
        let next_round = g * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);
        let signature = sign(&mut rng, &g, &x, b"post this");
        assert!(!verify(&next_round, &(next_round * x), b"post this", &signature));
    }

    #[test]
    fn signatures_fail_on_another_message() {
        let mut rng = crate::test::rng();
        let g = random_non_identity::<G1Projective>(&mut rng);
        let x = Scalar::random(&mut rng);
        let signature = sign(&mut rng, &g, &x, b"post this");
        assert!(!verify(&g, &(g * x), b"post that", &signature));
    }

    #[test]
    fn signatures_fail_under_another_key() {
        let mut rng = crate::test::rng();
        let g = random_non_identity::<G1Projective>(&mut rng);
        let x = Scalar::random(&mut rng);
        let y = Scalar::random(&mut rng);
        let signature = sign(&mut rng, &g, &x, b"post this");
        assert!(!verify(&g, &(g * y), b"post this", &signature));
    }
}
