//! Proofs that several G1 points share one discrete logarithm.
//!
//! A [`DleqStatement`] lists pairs `(X_j, Y_j)` and claims a single witness `w` with
//! `Y_j = w·X_j` for every `j`. The proof is the usual three-move protocol: commitments
//! `A_j = k·X_j`, a challenge `c`, and the response `z = k + c·w`, accepted when
//! `z·X_j = A_j + c·Y_j`.
//!
//! The challenge is supplied by the caller. The verifiable shuffle composes many of these proofs
//! under one Fiat-Shamir challenge, splitting it across the two branches of an OR-proof with
//! [`DleqProof::simulate`].

use crate::{
    common::*,
    proofs::{Challenge, ChallengeBuilder, ChallengeInput},
    serde::SerializeElement,
};
use ff::Field;
use serde::*;

/// The public statement of a discrete-logarithm-equality proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DleqStatement {
    bases: Vec<G1Projective>,
    images: Vec<G1Projective>,
}

impl DleqStatement {
    /// Build a statement from `(base, image)` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (G1Projective, G1Projective)>) -> Self {
        let (bases, images) = pairs.into_iter().unzip();
        Self { bases, images }
    }

    /// Number of `(base, image)` pairs.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Whether the statement has no pairs.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Whether `witness` satisfies the statement.
    pub fn holds_for(&self, witness: Scalar) -> bool {
        self.bases
            .iter()
            .zip(&self.images)
            .all(|(base, image)| base * witness == *image)
    }
}

impl ChallengeInput for DleqStatement {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.bases);
        builder.consume(&self.images);
    }
}

/// Fully constructed proof that a [`DleqStatement`] holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DleqProof {
    /// The commitments `A_j`.
    #[serde(with = "SerializeElement")]
    commitments: Vec<G1Projective>,
    /// The response `z`.
    #[serde(with = "SerializeElement")]
    response: Scalar,
}

impl DleqProof {
    /// Produce an accepting transcript for an arbitrary challenge without knowing the witness.
    ///
    /// Used for the branch of an OR-proof that the prover cannot satisfy.
    pub fn simulate(rng: &mut impl Rng, statement: &DleqStatement, challenge: Challenge) -> Self {
        let response = Scalar::random(&mut *rng);
        let c = challenge.to_scalar();
        let commitments = statement
            .bases
            .iter()
            .zip(&statement.images)
            .map(|(base, image)| base * response - image * c)
            .collect();
        Self {
            commitments,
            response,
        }
    }

    /// Verify the proof against `statement` under the given challenge.
    pub fn verify_proof(&self, statement: &DleqStatement, challenge: Challenge) -> bool {
        if self.commitments.len() != statement.len() {
            return false;
        }
        let c = challenge.to_scalar();
        statement
            .bases
            .iter()
            .zip(&statement.images)
            .zip(&self.commitments)
            .all(|((base, image), commitment)| base * self.response == commitment + image * c)
    }
}

impl ChallengeInput for DleqProof {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.commitments);
    }
}

/// A partially-built [`DleqProof`].
///
/// Built up to (but not including) the challenge phase.
#[derive(Debug, Clone)]
pub struct DleqProofBuilder {
    commitments: Vec<G1Projective>,
    commitment_scalar: Scalar,
}

impl DleqProofBuilder {
    /// Run the commitment phase for `statement`.
    pub fn generate_proof_commitments(rng: &mut impl Rng, statement: &DleqStatement) -> Self {
        let commitment_scalar = Scalar::random(&mut *rng);
        let commitments = statement
            .bases
            .iter()
            .map(|base| base * commitment_scalar)
            .collect();
        Self {
            commitments,
            commitment_scalar,
        }
    }

    /// Run the response phase with the statement's witness.
    pub fn generate_proof_response(self, witness: Scalar, challenge: Challenge) -> DleqProof {
        DleqProof {
            commitments: self.commitments,
            response: self.commitment_scalar + challenge.to_scalar() * witness,
        }
    }
}

impl ChallengeInput for DleqProofBuilder {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.commitments);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn statement(rng: &mut impl Rng, witness: Scalar, size: usize) -> DleqStatement {
        DleqStatement::new((0..size).map(|_| {
            let base = random_non_identity::<G1Projective>(&mut *rng);
            (base, base * witness)
        }))
    }

    fn challenge_for(statement: &DleqStatement, builder: &DleqProofBuilder) -> Challenge {
        ChallengeBuilder::new(b"dleq test")
            .with(statement)
            .with(builder)
            .finish()
    }

    #[test]
    fn honest_proofs_verify() {
        let mut rng = crate::test::rng();
        let witness = Scalar::random(&mut rng);
        let statement = statement(&mut rng, witness, 3);
        assert!(statement.holds_for(witness));

        let builder = DleqProofBuilder::generate_proof_commitments(&mut rng, &statement);
        let challenge = challenge_for(&statement, &builder);
        let proof = builder.generate_proof_response(witness, challenge);
        assert!(proof.verify_proof(&statement, challenge));
    }

    #[test]
    fn wrong_witness_fails() {
        let mut rng = crate::test::rng();
        let witness = Scalar::random(&mut rng);
        let statement = statement(&mut rng, witness, 2);

        let builder = DleqProofBuilder::generate_proof_commitments(&mut rng, &statement);
        let challenge = challenge_for(&statement, &builder);
        let proof = builder.generate_proof_response(witness + Scalar::ONE, challenge);
        assert!(!proof.verify_proof(&statement, challenge));
    }

    #[test]
    fn unequal_logarithms_fail() {
        let mut rng = crate::test::rng();
        let witness = Scalar::random(&mut rng);
        let base = random_non_identity::<G1Projective>(&mut rng);
        let other = random_non_identity::<G1Projective>(&mut rng);
        let statement =
            DleqStatement::new([(base, base * witness), (other, other * (witness + witness))]);
        assert!(!statement.holds_for(witness));

        let builder = DleqProofBuilder::generate_proof_commitments(&mut rng, &statement);
        let challenge = challenge_for(&statement, &builder);
        let proof = builder.generate_proof_response(witness, challenge);
        assert!(!proof.verify_proof(&statement, challenge));
    }

    #[test]
    fn simulated_proofs_verify_only_under_their_challenge() {
        let mut rng = crate::test::rng();
        let witness = Scalar::random(&mut rng);
        let statement = statement(&mut rng, witness, 2);
        let chosen = ChallengeBuilder::new(b"chosen").finish();
        let other = ChallengeBuilder::new(b"other").finish();

        let proof = DleqProof::simulate(&mut rng, &statement, chosen);
        assert!(proof.verify_proof(&statement, chosen));
        assert!(!proof.verify_proof(&statement, other));
    }
}
