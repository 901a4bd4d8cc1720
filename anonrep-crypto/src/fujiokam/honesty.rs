//! Cut-and-choose proof that the generators `G1..G6` of a base lie in the subgroup generated by
//! `H1`.
//!
//! For every generator `Gk` and every round `i`, the prover publishes `T = H1^β` for a fresh mask
//! `β`. The verifier answers each `T` with a challenge bit. On `false` the prover reveals `β` and
//! the verifier checks `H1^β = T`; on `true` the prover reveals `β - αk` and the verifier checks
//! `H1^(β - αk) · Gk = T`. A prover that does not know `αk` can answer at most one of the two
//! challenges for each `T`, so it is caught with probability `1 - 2^-size` per generator.

use super::{FujiOkamBase, GeneratorSecrets, GENERATOR_COUNT};
use crate::{
    common::*,
    encoding::Encode,
    integer::{random_in_radius, STATISTICAL_SECURITY_BITS},
    residue::Residue,
    Error,
};
use num_bigint::BigInt;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

/// The published masks `T = H1^β`, `size` of them per generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonestyCommitments {
    size: usize,
    commitments: Vec<Residue>,
}

impl HonestyCommitments {
    /// Number of rounds per generator.
    pub fn size(&self) -> usize {
        self.size
    }

    /// All commitments, ordered by generator and then by round.
    pub fn commitments(&self) -> &[Residue] {
        &self.commitments
    }
}

impl Encode for HonestyCommitments {}

/// The prover's masks `β`, kept until the challenge arrives.
#[derive(Debug, Clone)]
pub struct HonestyWitness {
    masks: Vec<BigInt>,
}

/// One challenge bit per published commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonestyChallenge {
    bits: Vec<bool>,
}

impl HonestyChallenge {
    /// Draw independent uniform bits for a proof with `size` rounds per generator.
    pub fn random(rng: &mut impl Rng, size: usize) -> Self {
        Self {
            bits: (0..size * GENERATOR_COUNT).map(|_| rng.gen::<bool>()).collect(),
        }
    }

    /// Use known challenge bits.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// The challenge bits.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }
}

impl Encode for HonestyChallenge {}

/// The prover's answers, one integer per challenge bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonestyAnswer {
    answers: Vec<BigInt>,
}

impl HonestyAnswer {
    /// The answers, in challenge order.
    pub fn answers(&self) -> &[BigInt] {
        &self.answers
    }

    #[cfg(test)]
    pub(crate) fn answers_mut(&mut self) -> &mut Vec<BigInt> {
        &mut self.answers
    }
}

impl Encode for HonestyAnswer {}

/// Start an honesty proof with `size` rounds for each of the six generators.
///
/// Masks are drawn wide enough that `β - αk` statistically hides `αk`.
pub fn generate_honesty_proof(
    rng: &mut impl Rng,
    base: &FujiOkamBase,
    size: usize,
) -> (HonestyCommitments, HonestyWitness) {
    let mask_radius = base.radius() << STATISTICAL_SECURITY_BITS;
    let masks: Vec<BigInt> = (0..size * GENERATOR_COUNT)
        .map(|_| random_in_radius(&mut *rng, &mask_radius))
        .collect();
    let commitments = masks
        .iter()
        .map(|beta| base.h1().pow(beta).expect("H1 is a unit"))
        .collect();
    (
        HonestyCommitments { size, commitments },
        HonestyWitness { masks },
    )
}

/// Answer a challenge on a proof started by [`generate_honesty_proof`].
pub fn answer_honesty_challenge(
    secrets: &GeneratorSecrets,
    witness: &HonestyWitness,
    challenge: &HonestyChallenge,
) -> Result<HonestyAnswer, Error> {
    if challenge.bits.len() != witness.masks.len() {
        return Err(Error::LengthMismatch {
            expected: witness.masks.len(),
            got: challenge.bits.len(),
        });
    }
    let size = witness.masks.len() / GENERATOR_COUNT;
    let answers = witness
        .masks
        .iter()
        .zip(&challenge.bits)
        .enumerate()
        .map(|(index, (beta, bit))| {
            if *bit {
                beta - secrets.alpha(index / size)
            } else {
                beta.clone()
            }
        })
        .collect();
    Ok(HonestyAnswer { answers })
}

/// Check answers to an honesty challenge.
///
/// Returns `0` if every round passes. Otherwise returns `k · size + i + 1`, the one-based position
/// of the first failing round `i` of generator `G(k+1)`. Commitments or answers missing for a
/// challenged position fail at that position; any other length disagreement fails at
/// `6 · size + 1`. A proof with no rounds shows nothing and fails at position 1.
pub fn check_honesty(
    base: &FujiOkamBase,
    commitments: &HonestyCommitments,
    challenge: &HonestyChallenge,
    answer: &HonestyAnswer,
) -> usize {
    let size = commitments.size;
    if size == 0 {
        return 1;
    }
    let expected = size.saturating_mul(GENERATOR_COUNT);

    for (index, bit) in challenge.bits.iter().enumerate().take(expected) {
        let passed = match (commitments.commitments.get(index), answer.answers.get(index)) {
            (Some(t), Some(ans)) => check_round(base, index / size, *bit, t, ans),
            _ => false,
        };
        if !passed {
            return index + 1;
        }
    }

    let lengths_agree = challenge.bits.len() == expected
        && commitments.commitments.len() == expected
        && answer.answers.len() == expected;
    if lengths_agree {
        0
    } else {
        expected + 1
    }
}

fn check_round(base: &FujiOkamBase, k: usize, bit: bool, t: &Residue, answer: &BigInt) -> bool {
    if !base.contains(t) {
        return false;
    }
    let revealed = match base.h1().pow(answer) {
        Ok(revealed) => revealed,
        Err(_) => return false,
    };
    let expected = if bit {
        revealed.mul(&base.generators()[k])
    } else {
        Ok(revealed)
    };
    expected.map_or(false, |expected| &expected == t)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fujiokam::{test::toy_factors, SafePrimeFactors};

    const SIZE: usize = 80;

    #[test]
    fn honest_generators_pass() {
        let mut rng = crate::test::rng();
        let factors = SafePrimeFactors::generate(&mut rng, 32);
        let (base, secrets) = FujiOkamBase::generate(&mut rng, &factors);

        let (commitments, witness) = generate_honesty_proof(&mut rng, &base, SIZE);
        let challenge = HonestyChallenge::random(&mut rng, SIZE);
        let answer = answer_honesty_challenge(&secrets, &witness, &challenge).unwrap();

        assert_eq!(commitments.commitments().len(), SIZE * GENERATOR_COUNT);
        assert_eq!(check_honesty(&base, &commitments, &challenge, &answer), 0);
    }

    #[test]
    fn corrupted_answer_reports_its_index() {
        let mut rng = crate::test::rng();
        let factors = SafePrimeFactors::generate(&mut rng, 32);
        let (base, secrets) = FujiOkamBase::generate(&mut rng, &factors);

        let (commitments, witness) = generate_honesty_proof(&mut rng, &base, SIZE);
        let challenge = HonestyChallenge::random(&mut rng, SIZE);
        let mut answer = answer_honesty_challenge(&secrets, &witness, &challenge).unwrap();

        // Round 7 of G3.
        let index = 2 * SIZE + 7;
        answer.answers_mut()[index] += 1;
        assert_eq!(
            check_honesty(&base, &commitments, &challenge, &answer),
            index + 1
        );
    }

    #[test]
    fn a_generator_outside_h1_is_caught() {
        let mut rng = crate::test::rng();
        let factors = SafePrimeFactors::generate(&mut rng, 32);
        let (base, secrets) = FujiOkamBase::generate(&mut rng, &factors);

        // -1 is a unit but not a quadratic residue, so it is not a power of H1.
        let minus_one = Residue::from_integer(&BigInt::from(-1), base.n());
        let mut generators = base.generators().clone();
        generators[4] = minus_one;
        let dishonest =
            FujiOkamBase::from_generators(base.n().clone(), generators, base.h1().clone())
                .unwrap();

        let (commitments, witness) = generate_honesty_proof(&mut rng, &dishonest, SIZE);
        let challenge = HonestyChallenge::random(&mut rng, SIZE);
        let answer = answer_honesty_challenge(&secrets, &witness, &challenge).unwrap();

        let first_true = challenge.bits()[4 * SIZE..5 * SIZE]
            .iter()
            .position(|bit| *bit)
            .expect("unfortunate RNG seed: G5 was never challenged");
        assert_eq!(
            check_honesty(&dishonest, &commitments, &challenge, &answer),
            4 * SIZE + first_true + 1
        );
    }

    #[test]
    fn empty_proofs_fail() {
        let mut rng = crate::test::rng();
        let (base, _) = FujiOkamBase::generate(&mut rng, &toy_factors());
        let commitments = HonestyCommitments {
            size: 0,
            commitments: Vec::new(),
        };
        let answer = HonestyAnswer {
            answers: Vec::new(),
        };
        let challenge = HonestyChallenge::random(&mut rng, 0);
        assert_eq!(check_honesty(&base, &commitments, &challenge, &answer), 1);
    }

    #[test]
    fn mismatched_challenge_is_an_error() {
        let mut rng = crate::test::rng();
        let (base, secrets) = FujiOkamBase::generate(&mut rng, &toy_factors());
        let (_, witness) = generate_honesty_proof(&mut rng, &base, 4);
        let challenge = HonestyChallenge::random(&mut rng, 5);
        assert_eq!(
            answer_honesty_challenge(&secrets, &witness, &challenge),
            Err(Error::LengthMismatch {
                expected: 24,
                got: 30
            })
        );
    }

    #[test]
    fn truncated_answers_fail_at_the_first_missing_position() {
        let mut rng = crate::test::rng();
        let (base, secrets) = FujiOkamBase::generate(&mut rng, &toy_factors());
        let (commitments, witness) = generate_honesty_proof(&mut rng, &base, 4);
        let challenge = HonestyChallenge::random(&mut rng, 4);
        let mut answer = answer_honesty_challenge(&secrets, &witness, &challenge).unwrap();
        answer.answers_mut().truncate(10);
        assert_eq!(check_honesty(&base, &commitments, &challenge, &answer), 11);
    }
}
