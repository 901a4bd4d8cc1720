//! A client spending part of its reputation: the reputation commitment from the table, a
//! commitment to the spend, and proofs that the remainder is non-negative in both commitment
//! systems.

mod test_utils;

use anonrep_crypto::fujiokam::FoCommitment;
use anonrep_crypto::integer::scalar_from_i64;
use anonrep_crypto::pedersen::Commitment;
use anonrep_crypto::proofs::{
    prove_equal, prove_nonneg, verify_equal, verify_nonneg, EqualityProof, NonnegProof,
};
use anonrep_crypto::{BlindingFactor, Error, Rng};
use bls12_381::G1Projective;
use num_bigint::BigInt;
use test_utils::{fixture, seeded_rng, Fixture};

struct Spend {
    remainder: Commitment<G1Projective>,
    fo_remainder: FoCommitment,
    nonneg: Result<NonnegProof, Error>,
    equality: EqualityProof,
}

fn spend(
    rng: &mut impl Rng,
    fixture: &Fixture,
    reputation: i64,
    ind: i64,
    claimed_remainder: i64,
) -> Spend {
    let Fixture {
        pedersen, fujiokam, ..
    } = fixture;
    let (table_entry, r) = pedersen.commit(&mut *rng, scalar_from_i64(reputation));
    let (spent, r_ind) = pedersen.commit(&mut *rng, scalar_from_i64(ind));
    let remainder = table_entry - spent;
    let r_d: BlindingFactor = r - r_ind;

    let d = BigInt::from(claimed_remainder);
    let (fo_remainder, r_f) = fujiokam.commit(&mut *rng, &d);
    let nonneg = prove_nonneg(&mut *rng, fujiokam, &d, &fo_remainder, &r_f);
    let equality = prove_equal(
        &mut *rng,
        pedersen,
        fujiokam,
        &d,
        &remainder,
        r_d,
        &fo_remainder,
        &r_f,
    )
    .unwrap();
    Spend {
        remainder,
        fo_remainder,
        nonneg,
        equality,
    }
}

#[test]
fn spending_within_reputation_verifies() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let Spend {
        remainder,
        fo_remainder,
        nonneg,
        equality,
    } = spend(&mut rng, &fixture, 5, 3, 2);

    assert!(verify_nonneg(&fixture.fujiokam, &fo_remainder, &nonneg.unwrap()));
    assert!(verify_equal(
        &fixture.pedersen,
        &fixture.fujiokam,
        &remainder,
        &fo_remainder,
        &equality
    ));
}

#[test]
fn spending_everything_verifies() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let Spend {
        remainder,
        fo_remainder,
        nonneg,
        equality,
    } = spend(&mut rng, &fixture, 5, 5, 0);

    assert!(verify_nonneg(&fixture.fujiokam, &fo_remainder, &nonneg.unwrap()));
    assert!(verify_equal(
        &fixture.pedersen,
        &fixture.fujiokam,
        &remainder,
        &fo_remainder,
        &equality
    ));
}

#[test]
fn overspending_cannot_prove_non_negativity() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let Spend { nonneg, .. } = spend(&mut rng, &fixture, 5, 10, -5);
    assert_eq!(nonneg.unwrap_err(), Error::NegativeValue(BigInt::from(-5)));
}

#[test]
fn overspending_with_a_false_remainder_fails_equality() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    // The client hides a positive remainder in the FO commitment instead of the true -5.
    let Spend {
        remainder,
        fo_remainder,
        nonneg,
        equality,
    } = spend(&mut rng, &fixture, 5, 10, 5);

    assert!(verify_nonneg(&fixture.fujiokam, &fo_remainder, &nonneg.unwrap()));
    assert!(!verify_equal(
        &fixture.pedersen,
        &fixture.fujiokam,
        &remainder,
        &fo_remainder,
        &equality
    ));
}
