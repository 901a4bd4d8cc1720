/*!
Proof that a client may spend part of its reputation.

A client whose table entry is `PCommr = rep·GT + r·HT` proves it holds at least `ind` as follows:

1. it commits to `ind` as `PCommind` and reveals `ind` with the blinding factor `rind`,
2. anyone can form `PCommd = PCommr - PCommind`, a commitment to `d = rep - ind`,
3. it commits to `d` again under the Fujisaki-Okamoto base as `FOCommd`,
4. it proves `FOCommd` opens to a non-negative integer, and
5. it proves `PCommd` and `FOCommd` open to the same value.

Pedersen values live in the scalar field, where "non-negative" means nothing, so the range
argument runs on the integer commitment and the equality proof carries it across.
*/

use crate::{types::*, Rng};
use anonrep_crypto::proofs::{
    prove_equal, prove_nonneg, verify_equal, verify_nonneg, EqualityProof, NonnegProof,
};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A spend of `ind` reputation points with its proof of sufficiency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendProof {
    /// The amount spent.
    pub ind: u64,
    /// `PCommind`, the commitment to `ind`.
    pub ind_commitment: Commitment<G1Projective>,
    /// `rind`, the blinding factor opening `PCommind`.
    pub ind_blinding: BlindingFactor,
    /// `PCommd`, the commitment to the remainder.
    pub remainder_commitment: Commitment<G1Projective>,
    /// `FOCommd`, the integer commitment to the remainder.
    pub fo_remainder_commitment: FoCommitment,
    /// Proof that the remainder is non-negative.
    pub nonneg: NonnegProof,
    /// Proof that both remainder commitments open to the same value.
    pub equality: EqualityProof,
}

impl Encode for SpendProof {}

impl SpendProof {
    /// Prove that `reputation_commitment`, which opens to `reputation` with `blinding`, holds at
    /// least `ind`.
    ///
    /// Fails with [`anonrep_crypto::Error::NegativeValue`] if `ind` exceeds `reputation`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rng: &mut impl Rng,
        pedersen: &PedersenBase<G1Projective>,
        fujiokam: &FujiOkamBase,
        reputation: i64,
        blinding: BlindingFactor,
        reputation_commitment: &Commitment<G1Projective>,
        ind: u64,
    ) -> Result<Self, anonrep_crypto::Error> {
        let remainder = BigInt::from(reputation) - BigInt::from(ind);

        let (ind_commitment, ind_blinding) = pedersen.commit(&mut *rng, Scalar::from(ind));
        let remainder_commitment = *reputation_commitment - ind_commitment;
        let remainder_blinding = blinding - ind_blinding;

        let (fo_remainder_commitment, fo_blinding) = fujiokam.commit(&mut *rng, &remainder);
        let nonneg = prove_nonneg(
            &mut *rng,
            fujiokam,
            &remainder,
            &fo_remainder_commitment,
            &fo_blinding,
        )?;
        let equality = prove_equal(
            &mut *rng,
            pedersen,
            fujiokam,
            &remainder,
            &remainder_commitment,
            remainder_blinding,
            &fo_remainder_commitment,
            &fo_blinding,
        )?;

        Ok(Self {
            ind,
            ind_commitment,
            ind_blinding,
            remainder_commitment,
            fo_remainder_commitment,
            nonneg,
            equality,
        })
    }
}

/// The first check a [`SpendProof`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendCheckFailure {
    /// `PCommind` does not open to `ind` with `rind`.
    Recommitment,
    /// `PCommd` is not `PCommr - PCommind`.
    Subtraction,
    /// The non-negativity argument failed.
    Nonnegative,
    /// The equality proof failed.
    Equality,
}

impl fmt::Display for SpendCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            SpendCheckFailure::Recommitment => "recommitment",
            SpendCheckFailure::Subtraction => "subtraction",
            SpendCheckFailure::Nonnegative => "non-negativity",
            SpendCheckFailure::Equality => "equality",
        };
        write!(f, "spend proof failed the {} check", stage)
    }
}

/// Check a spend against the spender's table entry.
///
/// The checks run in a fixed order and the first failure is reported.
pub fn verify_spend(
    pedersen: &PedersenBase<G1Projective>,
    fujiokam: &FujiOkamBase,
    reputation_commitment: &Commitment<G1Projective>,
    spend: &SpendProof,
) -> Result<(), SpendCheckFailure> {
    if !pedersen.verify(Scalar::from(spend.ind), spend.ind_blinding, &spend.ind_commitment) {
        return Err(SpendCheckFailure::Recommitment);
    }
    if *reputation_commitment - spend.ind_commitment != spend.remainder_commitment {
        return Err(SpendCheckFailure::Subtraction);
    }
    if !verify_nonneg(fujiokam, &spend.fo_remainder_commitment, &spend.nonneg) {
        return Err(SpendCheckFailure::Nonnegative);
    }
    if !verify_equal(
        pedersen,
        fujiokam,
        &spend.remainder_commitment,
        &spend.fo_remainder_commitment,
        &spend.equality,
    ) {
        return Err(SpendCheckFailure::Equality);
    }
    Ok(())
}
