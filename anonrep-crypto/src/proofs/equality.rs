//! Proof that a Pedersen commitment and a Fujisaki-Okamoto commitment open to the same integer.
//!
//! The challenge and the responses are integers. They enter Pedersen arithmetic reduced modulo
//! the scalar order, and the residue ring unreduced, so the same `s1` opens both sides.

use crate::{
    common::*,
    encoding::Encode,
    fujiokam::{FoCommitment, FujiOkamBase},
    integer::{
        masking_radius, random_below, random_in_radius, scalar_from_integer, scalar_order,
        scalar_to_integer,
    },
    pedersen::{Commitment, PedersenBase},
    proofs::ChallengeBuilder,
    residue::Residue,
    Error,
};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

const EQUALITY_LABEL: &[u8] = b"ANONREP-V01-ARG-EQUAL";

/// A non-interactive proof that `PComm = x·GT + rP·HT` and `FOComm = G1^x · H1^rF` share `x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityProof {
    /// The challenge `c`.
    pub(crate) c: BigInt,
    /// `s1 = x·c + t1`.
    pub(crate) s1: BigInt,
    /// `s2 = rP·c + t2`.
    pub(crate) s2: BigInt,
    /// `s3 = rF·c + t3`.
    pub(crate) s3: BigInt,
}

impl Encode for EqualityProof {}

/// Prove that `p_comm` and `fo_comm` both commit to `x`.
///
/// `rp` opens the Pedersen commitment and `rf` the Fujisaki-Okamoto commitment.
#[allow(clippy::too_many_arguments)]
pub fn prove_equal(
    rng: &mut impl Rng,
    pedersen: &PedersenBase<G1Projective>,
    fujiokam: &FujiOkamBase,
    x: &BigInt,
    p_comm: &Commitment<G1Projective>,
    rp: BlindingFactor,
    fo_comm: &FoCommitment,
    rf: &BigInt,
) -> Result<EqualityProof, Error> {
    let mask_radius = masking_radius(fujiokam.radius());
    let t1 = random_in_radius(&mut *rng, &mask_radius);
    let t2 = random_below(&mut *rng, scalar_order().magnitude());
    let t3 = random_in_radius(&mut *rng, &mask_radius);

    let big_t1 = pedersen.commit_with_r(
        scalar_from_integer(&t1),
        BlindingFactor::from_scalar(scalar_from_integer(&t2)),
    );
    let big_t2 = fujiokam.commit_to(fujiokam.g(1), &t1, &t3)?;

    let c = challenge(pedersen, fujiokam, p_comm, fo_comm, &big_t1, &big_t2);

    Ok(EqualityProof {
        s1: x * &c + t1,
        s2: scalar_to_integer(rp.as_scalar()) * &c + t2,
        s3: rf * &c + t3,
        c,
    })
}

/// Verify an [`EqualityProof`] for `p_comm` and `fo_comm`.
pub fn verify_equal(
    pedersen: &PedersenBase<G1Projective>,
    fujiokam: &FujiOkamBase,
    p_comm: &Commitment<G1Projective>,
    fo_comm: &FoCommitment,
    proof: &EqualityProof,
) -> bool {
    if !fujiokam.contains(fo_comm.as_residue()) {
        return false;
    }

    let c_scalar = scalar_from_integer(&proof.c);
    let big_t1 = pedersen.commit_with_r(
        scalar_from_integer(&proof.s1),
        BlindingFactor::from_scalar(scalar_from_integer(&proof.s2)),
    ) - p_comm.scale(c_scalar);

    let big_t2 = fujiokam
        .commit_to(fujiokam.g(1), &proof.s1, &proof.s3)
        .and_then(|t| t.mul(&fo_comm.as_residue().pow(&-&proof.c)?));
    let big_t2 = match big_t2 {
        Ok(t) => t,
        Err(_) => return false,
    };

    proof.c == challenge(pedersen, fujiokam, p_comm, fo_comm, &big_t1, &big_t2)
}

fn challenge(
    pedersen: &PedersenBase<G1Projective>,
    fujiokam: &FujiOkamBase,
    p_comm: &Commitment<G1Projective>,
    fo_comm: &FoCommitment,
    big_t1: &Commitment<G1Projective>,
    big_t2: &Residue,
) -> BigInt {
    ChallengeBuilder::new(EQUALITY_LABEL)
        .with(pedersen)
        .with(fujiokam)
        .with(p_comm)
        .with(fo_comm)
        .with(big_t1)
        .with(big_t2)
        .finish_integer()
}
