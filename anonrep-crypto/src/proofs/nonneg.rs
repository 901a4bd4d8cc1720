//! Non-negativity argument for Fujisaki-Okamoto commitments.
//!
//! The prover decomposes `4x + 1 = a² + b² + d²` (see [`crate::three_square`]), commits to
//! `x, a, b, d` under `G2..G5`, and puts the cross term
//! `delta = 4·rx - 2(a·ra + b·rb + d·rd)` under `G6`. With challenge `e` the verifier computes
//! `delta' = e(4x' + e) - a'² - b'² - d'²`, which collapses to `e·delta - (ra² + rb² + rd²)`
//! exactly when the decomposition is valid, and checks
//!
//! - `C^e · Cr = G2^x' · G3^a' · G4^b' · G5^d' · G6^delta' · H1^r'`
//! - `commitx^e · commitrx = G1^x' · H1^R`
//!
//! The second equation ties `x'` to the value inside the statement commitment. An integer `x`
//! with `4x + 1` a sum of three squares cannot be negative, so the two together show `x >= 0`.

use crate::{
    algebra::product_of_powers,
    encoding::Encode,
    fujiokam::{FoCommitment, FujiOkamBase},
    integer::{masking_radius, random_in_radius},
    proofs::ChallengeBuilder,
    residue::Residue,
    three_square::decompose,
    Error, Rng,
};
use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Serialize};

const NONNEG_LABEL: &[u8] = b"ANONREP-V01-ARG-NONNEG";

/// A non-interactive proof that a Fujisaki-Okamoto commitment opens to a non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonnegProof {
    /// Commitment `G1^rx · H1^rrx` to the mask of `x`.
    pub(crate) commitrx: Residue,
    /// Commitment to `x`, the decomposition and the cross term.
    pub(crate) c: Residue,
    /// Commitment to the masks.
    pub(crate) cr: Residue,
    /// `R = e·rc + rrx`.
    pub(crate) big_r: BigInt,
    /// `x' = x·e + rx`.
    pub(crate) x_response: BigInt,
    /// `a' = a·e + ra`.
    pub(crate) a_response: BigInt,
    /// `b' = b·e + rb`.
    pub(crate) b_response: BigInt,
    /// `d' = d·e + rd`.
    pub(crate) d_response: BigInt,
    /// `r' = r·e + rr`.
    pub(crate) r_response: BigInt,
}

impl Encode for NonnegProof {}

/// Prove that `commitx = G1^x · H1^rc` commits to a non-negative `x`.
///
/// Fails with [`Error::NegativeValue`] if `x < 0`.
pub fn prove_nonneg(
    rng: &mut impl Rng,
    base: &FujiOkamBase,
    x: &BigInt,
    commitx: &FoCommitment,
    rc: &BigInt,
) -> Result<NonnegProof, Error> {
    let magnitude = match x.to_biguint() {
        Some(magnitude) => magnitude,
        None => return Err(Error::NegativeValue(x.clone())),
    };
    let (a, b, d) = decompose(&magnitude);
    let (a, b, d) = (BigInt::from(a), BigInt::from(b), BigInt::from(d));

    let mask_radius = masking_radius(base.radius());
    let mut mask = || random_in_radius(&mut *rng, &mask_radius);
    let (rx, ra, rb, rd) = (mask(), mask(), mask(), mask());
    let (rr, rrx) = (mask(), mask());
    let r = base.random_exponent(&mut *rng);

    let delta = BigInt::from(4) * &rx - BigInt::from(2) * (&a * &ra + &b * &rb + &d * &rd);
    let c = product_of_powers(&[
        (base.g(2), x),
        (base.g(3), &a),
        (base.g(4), &b),
        (base.g(5), &d),
        (base.g(6), &delta),
        (base.h1(), &r),
    ])?;
    let mask_square_sum = -(&ra * &ra + &rb * &rb + &rd * &rd);
    let cr = product_of_powers(&[
        (base.g(2), &rx),
        (base.g(3), &ra),
        (base.g(4), &rb),
        (base.g(5), &rd),
        (base.g(6), &mask_square_sum),
        (base.h1(), &rr),
    ])?;
    let commitrx = base.commit_to(base.g(1), &rx, &rrx)?;

    let e = challenge(base, commitx, &commitrx, &c, &cr);

    Ok(NonnegProof {
        big_r: &e * rc + rrx,
        x_response: x * &e + rx,
        a_response: a * &e + ra,
        b_response: b * &e + rb,
        d_response: d * &e + rd,
        r_response: r * &e + rr,
        commitrx,
        c,
        cr,
    })
}

/// Verify a [`NonnegProof`] for `commitx`.
///
/// Malformed proofs, including residues from another ring, are rejected rather than reported as
/// errors.
pub fn verify_nonneg(base: &FujiOkamBase, commitx: &FoCommitment, proof: &NonnegProof) -> bool {
    let in_ring = [
        commitx.as_residue(),
        &proof.commitrx,
        &proof.c,
        &proof.cr,
    ]
    .iter()
    .all(|residue| base.contains(residue));
    if !in_ring {
        return false;
    }
    check_equations(base, commitx, proof).unwrap_or(false)
}

fn check_equations(
    base: &FujiOkamBase,
    commitx: &FoCommitment,
    proof: &NonnegProof,
) -> Result<bool, Error> {
    let e = challenge(base, commitx, &proof.commitrx, &proof.c, &proof.cr);

    let (x_, a_, b_, d_) = (
        &proof.x_response,
        &proof.a_response,
        &proof.b_response,
        &proof.d_response,
    );
    let delta_ = &e * (BigInt::from(4) * x_ + &e) - a_ * a_ - b_ * b_ - d_ * d_;

    let lhs = proof.c.pow(&e)?.mul(&proof.cr)?;
    let rhs = product_of_powers(&[
        (base.g(2), x_),
        (base.g(3), a_),
        (base.g(4), b_),
        (base.g(5), d_),
        (base.g(6), &delta_),
        (base.h1(), &proof.r_response),
    ])?;
    if lhs != rhs {
        return Ok(false);
    }

    let lhs = commitx.as_residue().pow(&e)?.mul(&proof.commitrx)?;
    let rhs = base.commit_to(base.g(1), x_, &proof.big_r)?;
    Ok(lhs == rhs)
}

fn challenge(
    base: &FujiOkamBase,
    commitx: &FoCommitment,
    commitrx: &Residue,
    c: &Residue,
    cr: &Residue,
) -> BigInt {
    let e = ChallengeBuilder::new(NONNEG_LABEL)
        .with(base)
        .with(commitx)
        .with(commitrx)
        .with(c)
        .with(cr)
        .finish_integer();
    debug_assert!(!e.is_negative());
    e
}
