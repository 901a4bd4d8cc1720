//! Verifiable shuffle of (pseudonym key, reputation commitment) tables.
//!
//! A shuffle multiplies every key by a secret key factor and every commitment by a secret value
//! factor, then permutes the entries. The generator `g` under which keys are pseudonyms and the
//! Pedersen base under which commitments open are rotated by the same factors, so after the
//! shuffle a key is still `x·g'` for the same long-term secret `x`, and a commitment still opens
//! to its old `(value, blinding)` under the rotated base.
//!
//! The permutation is realized as `n` layers of an odd-even transposition network. Every layer
//! draws fresh factors `a, e`, and every 2×2 switch in it proves with a CDS OR-proof that its two
//! outputs are the inputs scaled by `(a, e)` either in order or crossed. Positions without a
//! partner prove the same relation directly. All switch proofs share one Fiat-Shamir challenge.
//! The product of the layer key factors equals the requested key factor, so a server can strip or
//! apply its round key while hiding where each entry went.
//!
//! A single entry still gets its one layer, so its scaling is proven like any other. An empty table
//! keeps its bases and carries no layers.

use crate::{
    common::*,
    encoding::Encode,
    pedersen::{Commitment, PedersenBase},
    proofs::{
        Challenge, ChallengeBuilder, ChallengeInput, DleqProof, DleqProofBuilder, DleqStatement,
    },
    serde::SerializeElement,
    Error,
};
use ff::Field;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const SHUFFLE_LABEL: &[u8] = b"ANONREP-V01-SHUFFLE";

/// One row of a reputation table: a pseudonym key and the commitment to its reputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The pseudonym key, `x·g` for the owner's long-term secret `x`.
    #[serde(with = "SerializeElement")]
    pub key: G1Projective,
    /// Commitment to the owner's reputation.
    pub value: Commitment<G1Projective>,
}

impl Entry {
    /// Construct an entry.
    pub fn new(key: G1Projective, value: Commitment<G1Projective>) -> Self {
        Self { key, value }
    }

    fn scale(&self, key_factor: Scalar, value_factor: Scalar) -> Self {
        Self {
            key: self.key * key_factor,
            value: self.value.scale(value_factor),
        }
    }
}

impl ChallengeInput for Entry {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.key);
        builder.consume(&self.value);
    }
}

impl Encode for Entry {}

/// The public bases a table is expressed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleBases {
    /// The generator keys are pseudonyms under.
    #[serde(with = "SerializeElement")]
    pub g: G1Projective,
    /// The base commitments open under.
    pub pedersen: PedersenBase<G1Projective>,
}

impl ShuffleBases {
    /// Construct bases.
    pub fn new(g: G1Projective, pedersen: PedersenBase<G1Projective>) -> Self {
        Self { g, pedersen }
    }

    fn rotate(&self, key_factor: Scalar, value_factor: Scalar) -> Self {
        Self {
            g: self.g * key_factor,
            pedersen: self.pedersen.rotate(value_factor),
        }
    }

    fn is_degenerate(&self) -> bool {
        let generators = [self.g, *self.pedersen.g(), *self.pedersen.h()];
        generators.iter().any(|element| bool::from(element.is_identity()))
    }
}

impl ChallengeInput for ShuffleBases {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.g);
        builder.consume(&self.pedersen);
    }
}

impl Encode for ShuffleBases {}

/// Proof that one branch of a switch holds: keys scaled by the layer's key factor and values by
/// its value factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProof {
    key: DleqProof,
    value: DleqProof,
}

impl BranchProof {
    fn verify(&self, statement: &BranchStatement, challenge: Challenge) -> bool {
        self.key.verify_proof(&statement.key, challenge)
            && self.value.verify_proof(&statement.value, challenge)
    }
}

impl ChallengeInput for BranchProof {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.key);
        builder.consume(&self.value);
    }
}

/// Proof for one position or pair of positions in a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchProof {
    /// A 2×2 switch: branch 0 proves the pair passed straight through, branch 1 that it crossed.
    Pair {
        /// Per-branch challenges, summing to the shuffle challenge.
        #[serde(with = "SerializeElement")]
        challenges: [Scalar; 2],
        /// Per-branch proofs.
        branches: [BranchProof; 2],
    },
    /// A position without a partner in this layer.
    Single {
        /// The proof that the position was scaled in place.
        branch: BranchProof,
    },
}

impl ChallengeInput for SwitchProof {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        match self {
            SwitchProof::Pair { branches, .. } => builder.consume(branches.as_slice()),
            SwitchProof::Single { branch } => builder.consume(branch),
        }
    }
}

/// One layer of the network: its output table and the proofs for each of its switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleLayer {
    bases: ShuffleBases,
    entries: Vec<Entry>,
    switches: Vec<SwitchProof>,
}

/// Proof that a table is a permuted, re-scaled copy of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleProof {
    layers: Vec<ShuffleLayer>,
}

impl ShuffleProof {
    /// Number of network layers, one per entry.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl Encode for ShuffleProof {}

/// The output of [`shuffle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shuffled {
    /// The shuffled table.
    pub entries: Vec<Entry>,
    /// The rotated bases the shuffled table is expressed under.
    pub bases: ShuffleBases,
    /// Proof of correct shuffling.
    pub proof: ShuffleProof,
}

impl Encode for Shuffled {}

/// Position of a switch within a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pair(usize),
    Single(usize),
}

/// Even layers pair `(0, 1), (2, 3), ...`; odd layers pair `(1, 2), (3, 4), ...`.
fn layer_plan(size: usize, layer: usize) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(size);
    let mut position = 0;
    if layer % 2 == 1 {
        slots.push(Slot::Single(0));
        position = 1;
    }
    while position < size {
        if position + 1 < size {
            slots.push(Slot::Pair(position));
            position += 2;
        } else {
            slots.push(Slot::Single(position));
            position += 1;
        }
    }
    slots
}

/// The DLEQ statements for one branch of a switch.
struct BranchStatement {
    key: DleqStatement,
    value: DleqStatement,
}

impl BranchStatement {
    /// Statements claiming each `(input, output)` pair was scaled from the `previous` to the
    /// `next` bases.
    fn new(previous: &ShuffleBases, next: &ShuffleBases, pairs: &[(&Entry, &Entry)]) -> Self {
        let key = DleqStatement::new(
            std::iter::once((previous.g, next.g))
                .chain(pairs.iter().map(|(input, output)| (input.key, output.key))),
        );
        let value = DleqStatement::new(
            [
                (*previous.pedersen.g(), *next.pedersen.g()),
                (*previous.pedersen.h(), *next.pedersen.h()),
            ]
            .into_iter()
            .chain(
                pairs
                    .iter()
                    .map(|(input, output)| (input.value.0, output.value.0)),
            ),
        );
        Self { key, value }
    }

    fn straight(
        previous: &ShuffleBases,
        next: &ShuffleBases,
        inputs: &[Entry],
        outputs: &[Entry],
        i: usize,
    ) -> Self {
        Self::new(
            previous,
            next,
            &[(&inputs[i], &outputs[i]), (&inputs[i + 1], &outputs[i + 1])],
        )
    }

    fn crossed(
        previous: &ShuffleBases,
        next: &ShuffleBases,
        inputs: &[Entry],
        outputs: &[Entry],
        i: usize,
    ) -> Self {
        Self::new(
            previous,
            next,
            &[(&inputs[i], &outputs[i + 1]), (&inputs[i + 1], &outputs[i])],
        )
    }

    fn single(
        previous: &ShuffleBases,
        next: &ShuffleBases,
        inputs: &[Entry],
        outputs: &[Entry],
        i: usize,
    ) -> Self {
        Self::new(previous, next, &[(&inputs[i], &outputs[i])])
    }
}

/// A branch after the commitment phase.
enum PendingBranch {
    Real {
        key: DleqProofBuilder,
        value: DleqProofBuilder,
    },
    Simulated(BranchProof),
}

impl PendingBranch {
    fn real(rng: &mut impl Rng, statement: &BranchStatement) -> Self {
        PendingBranch::Real {
            key: DleqProofBuilder::generate_proof_commitments(&mut *rng, &statement.key),
            value: DleqProofBuilder::generate_proof_commitments(&mut *rng, &statement.value),
        }
    }

    fn simulated(rng: &mut impl Rng, statement: &BranchStatement, challenge: Challenge) -> Self {
        PendingBranch::Simulated(BranchProof {
            key: DleqProof::simulate(&mut *rng, &statement.key, challenge),
            value: DleqProof::simulate(&mut *rng, &statement.value, challenge),
        })
    }

    /// Respond to `challenge`; simulated branches already carry their responses.
    fn finish(self, factors: (Scalar, Scalar), challenge: Challenge) -> BranchProof {
        match self {
            PendingBranch::Real { key, value } => BranchProof {
                key: key.generate_proof_response(factors.0, challenge),
                value: value.generate_proof_response(factors.1, challenge),
            },
            PendingBranch::Simulated(proof) => proof,
        }
    }
}

impl ChallengeInput for PendingBranch {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        match self {
            PendingBranch::Real { key, value } => {
                builder.consume(key);
                builder.consume(value);
            }
            PendingBranch::Simulated(proof) => builder.consume(proof),
        }
    }
}

enum PendingSwitch {
    Pair {
        real: usize,
        simulated_challenge: Challenge,
        branches: [PendingBranch; 2],
    },
    Single(PendingBranch),
}

impl PendingSwitch {
    fn finish(self, factors: (Scalar, Scalar), challenge: Challenge) -> SwitchProof {
        match self {
            PendingSwitch::Pair {
                real,
                simulated_challenge,
                branches,
            } => {
                let simulated = simulated_challenge.to_scalar();
                let real_challenge = challenge.to_scalar() - simulated;
                let mut challenges = [simulated; 2];
                challenges[real] = real_challenge;
                SwitchProof::Pair {
                    challenges,
                    branches: branches.map(|branch| {
                        branch.finish(factors, Challenge::from_scalar(real_challenge))
                    }),
                }
            }
            PendingSwitch::Single(branch) => SwitchProof::Single {
                branch: branch.finish(factors, challenge),
            },
        }
    }
}

impl ChallengeInput for PendingSwitch {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        match self {
            PendingSwitch::Pair { branches, .. } => builder.consume(branches.as_slice()),
            PendingSwitch::Single(branch) => builder.consume(branch),
        }
    }
}

struct PendingLayer {
    factors: (Scalar, Scalar),
    bases: ShuffleBases,
    entries: Vec<Entry>,
    switches: Vec<PendingSwitch>,
}

/// Shuffle `entries`, multiplying every key (and `g`) by `key_factor` and every commitment (and
/// the Pedersen base) by a fresh random factor.
pub fn shuffle(
    rng: &mut impl Rng,
    bases: &ShuffleBases,
    entries: &[Entry],
    key_factor: Scalar,
) -> Result<Shuffled, Error> {
    if bool::from(key_factor.is_zero()) {
        return Err(Error::ZeroFactor);
    }
    let size = entries.len();

    if size == 0 {
        return Ok(Shuffled {
            entries: Vec::new(),
            bases: *bases,
            proof: ShuffleProof { layers: Vec::new() },
        });
    }

    // The last layer's key factor makes the product come out to `key_factor`.
    let mut key_factors: Vec<Scalar> = (1..size)
        .map(|_| random_non_zero_scalar(&mut *rng))
        .collect();
    let product = key_factors.iter().fold(Scalar::ONE, |acc, a| acc * a);
    let product_inverse: Option<Scalar> = product.invert().into();
    key_factors
        .push(key_factor * product_inverse.expect("a product of non-zero scalars is non-zero"));

    let mut ranks: Vec<usize> = (0..size).collect();
    ranks.shuffle(&mut *rng);

    let mut previous_bases = *bases;
    let mut previous_entries = entries.to_vec();
    let mut pending = Vec::with_capacity(size);
    for (layer, key_factor) in key_factors.into_iter().enumerate() {
        let value_factor = random_non_zero_scalar(&mut *rng);
        let next_bases = previous_bases.rotate(key_factor, value_factor);
        let mut next_entries = previous_entries.clone();
        let mut switches = Vec::new();

        for slot in layer_plan(size, layer) {
            match slot {
                Slot::Single(i) => {
                    next_entries[i] = previous_entries[i].scale(key_factor, value_factor);
                    let statement = BranchStatement::single(
                        &previous_bases,
                        &next_bases,
                        &previous_entries,
                        &next_entries,
                        i,
                    );
                    switches.push(PendingSwitch::Single(PendingBranch::real(
                        &mut *rng, &statement,
                    )));
                }
                Slot::Pair(i) => {
                    let crossed = ranks[i] > ranks[i + 1];
                    let (first, second) = if crossed {
                        ranks.swap(i, i + 1);
                        (i + 1, i)
                    } else {
                        (i, i + 1)
                    };
                    next_entries[i] = previous_entries[first].scale(key_factor, value_factor);
                    next_entries[i + 1] = previous_entries[second].scale(key_factor, value_factor);

                    let statements = [
                        BranchStatement::straight(
                            &previous_bases,
                            &next_bases,
                            &previous_entries,
                            &next_entries,
                            i,
                        ),
                        BranchStatement::crossed(
                            &previous_bases,
                            &next_bases,
                            &previous_entries,
                            &next_entries,
                            i,
                        ),
                    ];
                    let real = usize::from(crossed);
                    let simulated_challenge = Challenge::from_scalar(Scalar::random(&mut *rng));
                    let mut branch = |index: usize| {
                        if index == real {
                            PendingBranch::real(&mut *rng, &statements[index])
                        } else {
                            PendingBranch::simulated(
                                &mut *rng,
                                &statements[index],
                                simulated_challenge,
                            )
                        }
                    };
                    let branches = [branch(0), branch(1)];
                    switches.push(PendingSwitch::Pair {
                        real,
                        simulated_challenge,
                        branches,
                    });
                }
            }
        }

        pending.push(PendingLayer {
            factors: (key_factor, value_factor),
            bases: next_bases,
            entries: next_entries.clone(),
            switches,
        });
        previous_bases = next_bases;
        previous_entries = next_entries;
    }
    debug_assert!(ranks.windows(2).all(|pair| pair[0] < pair[1]));

    let mut builder = ChallengeBuilder::new(SHUFFLE_LABEL).with(bases).with(entries);
    for layer in &pending {
        builder.consume(&layer.bases);
        builder.consume(&layer.entries);
        builder.consume(layer.switches.as_slice());
    }
    let challenge = builder.finish();

    let layers: Vec<ShuffleLayer> = pending
        .into_iter()
        .map(|layer| ShuffleLayer {
            bases: layer.bases,
            entries: layer.entries,
            switches: layer
                .switches
                .into_iter()
                .map(|switch| switch.finish(layer.factors, challenge))
                .collect(),
        })
        .collect();

    Ok(Shuffled {
        entries: previous_entries,
        bases: previous_bases,
        proof: ShuffleProof { layers },
    })
}

/// Verify that `output_entries` under `output_bases` is a shuffle of `input_entries` under
/// `input_bases`.
pub fn verify_shuffle(
    input_bases: &ShuffleBases,
    input_entries: &[Entry],
    output_bases: &ShuffleBases,
    output_entries: &[Entry],
    proof: &ShuffleProof,
) -> bool {
    let size = input_entries.len();
    if output_entries.len() != size {
        return false;
    }
    if input_bases.is_degenerate() {
        return false;
    }
    if size == 0 {
        return proof.layers.is_empty() && output_bases == input_bases;
    }

    if proof.layers.len() != size {
        return false;
    }
    let well_formed = proof
        .layers
        .iter()
        .all(|layer| layer.entries.len() == size && !layer.bases.is_degenerate());
    if !well_formed {
        return false;
    }
    match proof.layers.last() {
        Some(last) if last.bases == *output_bases && last.entries == output_entries => {}
        _ => return false,
    }

    let mut builder = ChallengeBuilder::new(SHUFFLE_LABEL)
        .with(input_bases)
        .with(input_entries);
    for layer in &proof.layers {
        builder.consume(&layer.bases);
        builder.consume(&layer.entries);
        builder.consume(&layer.switches);
    }
    let challenge = builder.finish();

    let mut previous_bases = input_bases;
    let mut previous_entries = input_entries;
    for (index, layer) in proof.layers.iter().enumerate() {
        if !verify_layer(
            previous_bases,
            previous_entries,
            layer,
            &layer_plan(size, index),
            challenge,
        ) {
            return false;
        }
        previous_bases = &layer.bases;
        previous_entries = &layer.entries;
    }
    true
}

fn verify_layer(
    previous_bases: &ShuffleBases,
    previous_entries: &[Entry],
    layer: &ShuffleLayer,
    plan: &[Slot],
    challenge: Challenge,
) -> bool {
    if layer.switches.len() != plan.len() {
        return false;
    }
    let (next_bases, next_entries) = (&layer.bases, layer.entries.as_slice());

    plan.iter().zip(&layer.switches).all(|(slot, switch)| match (slot, switch) {
        (Slot::Single(i), SwitchProof::Single { branch }) => {
            let statement = BranchStatement::single(
                previous_bases,
                next_bases,
                previous_entries,
                next_entries,
                *i,
            );
            branch.verify(&statement, challenge)
        }
        (
            Slot::Pair(i),
            SwitchProof::Pair {
                challenges,
                branches,
            },
        ) => {
            if challenges[0] + challenges[1] != challenge.to_scalar() {
                return false;
            }
            let straight = BranchStatement::straight(
                previous_bases,
                next_bases,
                previous_entries,
                next_entries,
                *i,
            );
            let crossed = BranchStatement::crossed(
                previous_bases,
                next_bases,
                previous_entries,
                next_entries,
                *i,
            );
            branches[0].verify(&straight, Challenge::from_scalar(challenges[0]))
                && branches[1].verify(&crossed, Challenge::from_scalar(challenges[1]))
        }
        _ => false,
    })
}
