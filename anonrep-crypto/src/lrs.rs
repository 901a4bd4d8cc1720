//! Linkable ring signatures \[1\] over G1.
//!
//! A ring is the list of pseudonyms `y_i = x_i·g` for the round generator `g`. The signer's tag
//! `Y0 = x·h` uses a base `h` hashed from `g`, the ring and the message, so the same signer
//! produces the same tag every time it signs the same message over the same ring. Verifiers
//! detect a repeated vote by a repeated tag without learning which ring member cast it.
//!
//! The signature is the challenge `c_0` that starts the ring, one response per ring member, and
//! the tag. Verification walks the ring once and checks that it closes back on `c_0`.
//!
//! ## References
//!
//! 1. Joseph K. Liu, Victor K. Wei, and Duncan S. Wong. "Linkable Spontaneous Anonymous Group
//!    Signature for Ad Hoc Groups". ACISP 2004.

use crate::{
    common::*,
    encoding::Encode,
    proofs::{Challenge, ChallengeBuilder},
    serde::SerializeElement,
    Error,
};
use ff::Field;
use serde::{Deserialize, Serialize};

const LRS_LABEL: &[u8] = b"ANONREP-V01-LRS";
const LRS_TAG_DST: &[u8] = b"ANONREP-V01-LRS-TAG-BASE";

/// A linkable ring signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkableSignature {
    #[serde(with = "SerializeElement")]
    c0: Scalar,
    #[serde(with = "SerializeElement")]
    responses: Vec<Scalar>,
    #[serde(with = "SerializeElement")]
    tag: G1Projective,
}

impl LinkableSignature {
    /// The linkability tag `Y0`.
    pub fn tag(&self) -> &G1Projective {
        &self.tag
    }

    /// Number of ring members the signature covers.
    pub fn ring_size(&self) -> usize {
        self.responses.len()
    }
}

impl Encode for LinkableSignature {}

/// The public context of a ring signature: generator, ring and message.
struct RingContext<'a> {
    g: &'a G1Projective,
    ring: &'a [G1Projective],
    message: &'a [u8],
    h: G1Projective,
}

impl<'a> RingContext<'a> {
    fn new(g: &'a G1Projective, ring: &'a [G1Projective], message: &'a [u8]) -> Self {
        let mut input = g.to_bytes().as_ref().to_vec();
        for member in ring {
            input.extend_from_slice(member.to_bytes().as_ref());
        }
        input.extend_from_slice(message);
        let h = hash_to_g1(LRS_TAG_DST, &input);
        Self {
            g,
            ring,
            message,
            h,
        }
    }

    fn link(&self, tag: &G1Projective, z1: &G1Projective, z2: &G1Projective) -> Challenge {
        ChallengeBuilder::new(LRS_LABEL)
            .with(self.g)
            .with(self.ring)
            .with(tag)
            .with_bytes(self.message)
            .with(z1)
            .with(z2)
            .finish()
    }
}

/// Sign `message` as member `signer` of `ring`, holding secret `x` with `ring[signer] = x·g`.
pub fn sign(
    rng: &mut impl Rng,
    message: &[u8],
    g: &G1Projective,
    ring: &[G1Projective],
    signer: usize,
    x: &Scalar,
) -> Result<LinkableSignature, Error> {
    let n = ring.len();
    if signer >= n {
        return Err(Error::SignerIndex {
            index: signer,
            size: n,
        });
    }
    if g * x != ring[signer] {
        return Err(Error::KeyMismatch(signer));
    }

    let context = RingContext::new(g, ring, message);
    let tag = context.h * x;

    let mut challenges = vec![Scalar::ZERO; n];
    let mut responses = vec![Scalar::ZERO; n];

    let u = random_non_zero_scalar(&mut *rng);
    challenges[(signer + 1) % n] = context.link(&tag, &(g * u), &(context.h * u)).to_scalar();

    let mut i = (signer + 1) % n;
    while i != signer {
        responses[i] = Scalar::random(&mut *rng);
        let z1 = g * responses[i] + ring[i] * challenges[i];
        let z2 = context.h * responses[i] + tag * challenges[i];
        challenges[(i + 1) % n] = context.link(&tag, &z1, &z2).to_scalar();
        i = (i + 1) % n;
    }
    responses[signer] = u - challenges[signer] * x;

    Ok(LinkableSignature {
        c0: challenges[0],
        responses,
        tag,
    })
}

/// Verify `signature` over `message` and `ring`.
///
/// The verifier does not learn, and is not told, which member signed.
pub fn verify(
    message: &[u8],
    g: &G1Projective,
    ring: &[G1Projective],
    signature: &LinkableSignature,
) -> bool {
    check_ring_size(ring, signature).is_ok() && closes(message, g, ring, signature)
}

/// Check that the signature carries one response per ring member.
pub fn check_ring_size(ring: &[G1Projective], signature: &LinkableSignature) -> Result<(), Error> {
    if ring.is_empty() || signature.responses.len() != ring.len() {
        Err(Error::RingSize {
            expected: ring.len(),
            got: signature.responses.len(),
        })
    } else {
        Ok(())
    }
}

fn closes(
    message: &[u8],
    g: &G1Projective,
    ring: &[G1Projective],
    sig: &LinkableSignature,
) -> bool {
    if bool::from(sig.tag.is_identity()) {
        return false;
    }
    let context = RingContext::new(g, ring, message);
    let mut c = sig.c0;
    for (member, s) in ring.iter().zip(&sig.responses) {
        let z1 = g * s + member * c;
        let z2 = context.h * s + sig.tag * c;
        c = context.link(&sig.tag, &z1, &z2).to_scalar();
    }
    c == sig.c0
}

/// Whether two signatures over the same message and ring came from the same signer.
pub fn linked(first: &LinkableSignature, second: &LinkableSignature) -> bool {
    first.tag == second.tag
}

#[cfg(test)]
mod test {
    use super::*;

    struct Ring {
        g: G1Projective,
        secrets: Vec<Scalar>,
        keys: Vec<G1Projective>,
    }

    fn ring(rng: &mut impl Rng, n: usize) -> Ring {
        let g = random_non_identity::<G1Projective>(&mut *rng);
        let secrets: Vec<Scalar> = (0..n).map(|_| Scalar::random(&mut *rng)).collect();
        let keys = secrets.iter().map(|x| g * x).collect();
        Ring { g, secrets, keys }
    }

    #[test]
    fn every_member_can_sign() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 5);
        for (index, x) in secrets.iter().enumerate() {
            let sig = sign(&mut rng, b"vote +1 on 3", &g, &keys, index, x).unwrap();
            assert!(verify(b"vote +1 on 3", &g, &keys, &sig), "member {}", index);
        }
    }

    #[test]
    fn single_member_rings_work() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 1);
        let sig = sign(&mut rng, b"alone", &g, &keys, 0, &secrets[0]).unwrap();
        assert!(verify(b"alone", &g, &keys, &sig));
    }

    #[test]
    fn same_signer_same_message_links() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 4);
        let first = sign(&mut rng, b"message 1", &g, &keys, 2, &secrets[2]).unwrap();
        let second = sign(&mut rng, b"message 1", &g, &keys, 2, &secrets[2]).unwrap();
        assert_ne!(first, second, "unfortunate RNG seed: signatures should differ");
        assert!(linked(&first, &second));
        assert_eq!(first.tag(), second.tag());
    }

    #[test]
    fn different_signers_do_not_link() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 4);
        let first = sign(&mut rng, b"message 1", &g, &keys, 0, &secrets[0]).unwrap();
        let second = sign(&mut rng, b"message 1", &g, &keys, 1, &secrets[1]).unwrap();
        assert!(!linked(&first, &second));
    }

    #[test]
    fn tags_differ_across_messages() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 3);
        let first = sign(&mut rng, b"message 1", &g, &keys, 0, &secrets[0]).unwrap();
        let second = sign(&mut rng, b"message 2", &g, &keys, 0, &secrets[0]).unwrap();
        assert!(!linked(&first, &second));
    }

    #[test]
    fn permuted_or_swapped_rings_fail() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 4);
        let sig = sign(&mut rng, b"msg", &g, &keys, 1, &secrets[1]).unwrap();

        let mut permuted = keys.clone();
        permuted.swap(0, 3);
        assert!(!verify(b"msg", &g, &permuted, &sig));

        let mut swapped = keys.clone();
        swapped[2] = g * Scalar::random(&mut rng);
        assert!(!verify(b"msg", &g, &swapped, &sig));
    }

    #[test]
    fn wrong_message_or_generator_fails() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 3);
        let sig = sign(&mut rng, b"msg", &g, &keys, 1, &secrets[1]).unwrap();
        assert!(!verify(b"other", &g, &keys, &sig));
        assert!(!verify(b"msg", &(g + g), &keys, &sig));
    }

    #[test]
    fn mismatched_ring_sizes_are_rejected() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 3);
        let sig = sign(&mut rng, b"msg", &g, &keys, 0, &secrets[0]).unwrap();
        assert_eq!(
            check_ring_size(&keys[..2], &sig),
            Err(Error::RingSize {
                expected: 2,
                got: 3
            })
        );
        assert!(!verify(b"msg", &g, &keys[..2], &sig));
        assert!(!verify(b"msg", &g, &[], &sig));
    }

    #[test]
    fn signing_checks_index_and_key() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 3);
        assert_eq!(
            sign(&mut rng, b"msg", &g, &keys, 3, &secrets[0]),
            Err(Error::SignerIndex { index: 3, size: 3 })
        );
        assert_eq!(
            sign(&mut rng, b"msg", &g, &keys, 1, &secrets[0]),
            Err(Error::KeyMismatch(1))
        );
    }

    #[test]
    fn forged_tags_fail() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 3);
        let mut sig = sign(&mut rng, b"msg", &g, &keys, 0, &secrets[0]).unwrap();
        sig.tag = random_non_identity(&mut rng);
        assert!(!verify(b"msg", &g, &keys, &sig));
    }

    #[test]
    fn signatures_decode_from_their_encoding() {
        let mut rng = crate::test::rng();
        let Ring { g, secrets, keys } = ring(&mut rng, 2);
        let sig = sign(&mut rng, b"msg", &g, &keys, 1, &secrets[1]).unwrap();
        let bytes = sig.to_bytes();
        assert_eq!(LinkableSignature::from_bytes(&bytes).unwrap(), sig);
        assert!(LinkableSignature::from_bytes(&bytes[1..]).is_err());
    }
}
