//! The generator honesty exchange between the party that built a Fujisaki-Okamoto base and a
//! client that receives it.

mod test_utils;

use anonrep_crypto::fujiokam::{
    answer_honesty_challenge, check_honesty, generate_honesty_proof, FujiOkamBase,
    HonestyChallenge, GENERATOR_COUNT,
};
use anonrep_crypto::Encode;
use test_utils::{fixture, seeded_rng, toy_factors};

const SIZE: usize = 80;

#[test]
fn honest_generators_pass() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);

    let (commitments, witness) = generate_honesty_proof(&mut rng, &fixture.fujiokam, SIZE);
    let challenge = HonestyChallenge::random(&mut rng, SIZE);
    let answer = answer_honesty_challenge(&fixture.secrets, &witness, &challenge).unwrap();
    assert_eq!(
        check_honesty(&fixture.fujiokam, &commitments, &challenge, &answer),
        0
    );
}

#[test]
fn honest_generators_pass_over_the_toy_modulus() {
    let mut rng = seeded_rng();
    let (base, secrets) = FujiOkamBase::generate(&mut rng, &toy_factors());

    let (commitments, witness) = generate_honesty_proof(&mut rng, &base, 8);
    let challenge = HonestyChallenge::random(&mut rng, 8);
    let answer = answer_honesty_challenge(&secrets, &witness, &challenge).unwrap();
    assert_eq!(check_honesty(&base, &commitments, &challenge, &answer), 0);
}

#[test]
fn a_generator_with_unknown_exponent_is_caught() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let base = &fixture.fujiokam;

    // Shift G3 by H1 so the generator secrets no longer describe it.
    let mut generators = base.generators().clone();
    generators[2] = generators[2].mul(base.h1()).unwrap();
    let forged =
        FujiOkamBase::from_generators(base.n().clone(), generators, base.h1().clone()).unwrap();

    let (commitments, witness) = generate_honesty_proof(&mut rng, &forged, SIZE);
    let challenge = HonestyChallenge::random(&mut rng, SIZE);
    let answer = answer_honesty_challenge(&fixture.secrets, &witness, &challenge).unwrap();

    let first_opened = challenge.bits()[2 * SIZE..3 * SIZE]
        .iter()
        .position(|bit| *bit)
        .expect("unfortunate RNG seed: G3 was never challenged");
    assert_eq!(
        check_honesty(&forged, &commitments, &challenge, &answer),
        2 * SIZE + first_opened + 1
    );
}

#[test]
fn transcripts_survive_the_wire() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let base = FujiOkamBase::from_bytes(&fixture.fujiokam.to_bytes()).unwrap();
    assert_eq!(base, fixture.fujiokam);

    let (commitments, witness) = generate_honesty_proof(&mut rng, &fixture.fujiokam, 4);
    let received = anonrep_crypto::fujiokam::HonestyCommitments::from_bytes(
        &commitments.to_bytes(),
    )
    .unwrap();
    assert_eq!(received.size(), 4);
    assert_eq!(received.commitments().len(), 4 * GENERATOR_COUNT);

    let challenge = HonestyChallenge::random(&mut rng, 4);
    let answer = answer_honesty_challenge(&fixture.secrets, &witness, &challenge).unwrap();
    assert_eq!(check_honesty(&base, &received, &challenge, &answer), 0);
}
