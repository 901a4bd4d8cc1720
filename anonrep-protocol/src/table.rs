//! The reputation table and the transcript it collects on its way through the server chain.
//!
//! Between rounds the table lists every client's long-term key `x·G` next to a Pedersen commitment
//! to its reputation. At the start of a round each server shuffles the table with its round key,
//! so the keys that come out of the chain are pseudonyms `x·g` under the round generator `g`.
//! Every shuffle is appended to a [`TableTranscript`] together with its proof, so the next hop and
//! finally the coordinator can check the whole chain.

use crate::{types::*, Error, NodeId, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compressed encoding of a G1 key, used to index keys in maps and to print them in logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId([u8; 48]);

impl From<&G1Projective> for KeyId {
    fn from(key: &G1Projective) -> Self {
        Self(G1Affine::from(key).to_compressed())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = base64::encode_config(self.0, base64::URL_SAFE_NO_PAD);
        write!(f, "{}", &encoded[..12])
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self)
    }
}

/// A table of (key, commitment) entries and the bases they are expressed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// The key generator and the Pedersen base.
    pub bases: ShuffleBases,
    /// One entry per client.
    pub entries: Vec<Entry>,
}

impl Table {
    /// Construct a table.
    pub fn new(bases: ShuffleBases, entries: Vec<Entry>) -> Self {
        Self { bases, entries }
    }

    /// Position of `key` in the table.
    pub fn position(&self, key: &G1Projective) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.key == key)
    }

    /// The reputation commitment filed under `key`.
    pub fn commitment_of(&self, key: &G1Projective) -> Option<Commitment<G1Projective>> {
        self.position(key).map(|index| self.entries[index].value)
    }

    /// The keys in table order. During a round this is the ring for votes.
    pub fn keys(&self) -> Vec<G1Projective> {
        self.entries.iter().map(|entry| entry.key).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Encode for Table {}

/// One server's shuffle: the table it produced and the proof that it is a shuffle of its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// The server that shuffled.
    pub server: NodeId,
    /// The shuffled table.
    pub table: Table,
    /// Proof of correct shuffling.
    pub proof: ShuffleProof,
}

/// A table together with every shuffle applied to it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTranscript {
    start: Table,
    hops: Vec<Hop>,
}

impl TableTranscript {
    /// Start a transcript from a table nobody has shuffled yet.
    pub fn new(start: Table) -> Self {
        Self {
            start,
            hops: Vec::new(),
        }
    }

    /// The table the chain started from.
    pub fn start(&self) -> &Table {
        &self.start
    }

    /// The shuffles applied so far, in chain order.
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// The most recent table.
    pub fn latest(&self) -> &Table {
        self.hops.last().map_or(&self.start, |hop| &hop.table)
    }

    /// Consume the transcript, keeping only the most recent table.
    pub fn into_latest(mut self) -> Table {
        match self.hops.pop() {
            Some(hop) => hop.table,
            None => self.start,
        }
    }

    /// Shuffle the most recent table with `key_factor` on behalf of `server` and append the result.
    pub fn extend(
        &mut self,
        rng: &mut impl Rng,
        server: NodeId,
        key_factor: Scalar,
    ) -> Result<&Table, Error> {
        let input = self.latest();
        let shuffled = shuffle(rng, &input.bases, &input.entries, key_factor)?;
        self.hops.push(Hop {
            server,
            table: Table::new(shuffled.bases, shuffled.entries),
            proof: shuffled.proof,
        });
        Ok(self.latest())
    }

    /// Check the most recent shuffle, if there is one.
    pub fn verify_latest(&self) -> Result<(), Error> {
        match self.hops.len() {
            0 => Ok(()),
            len => self.verify_hop(len - 1),
        }
    }

    /// Check every shuffle in the transcript.
    pub fn verify(&self) -> Result<(), Error> {
        (0..self.hops.len()).try_for_each(|hop| self.verify_hop(hop))
    }

    #[cfg(test)]
    pub(crate) fn hops_mut(&mut self) -> &mut Vec<Hop> {
        &mut self.hops
    }

    fn verify_hop(&self, hop: usize) -> Result<(), Error> {
        let input = if hop == 0 {
            &self.start
        } else {
            &self.hops[hop - 1].table
        };
        let output = &self.hops[hop];
        let verified = verify_shuffle(
            &input.bases,
            &input.entries,
            &output.table.bases,
            &output.table.entries,
            &output.proof,
        );
        if verified {
            Ok(())
        } else {
            Err(Error::ShuffleRejected { hop })
        }
    }
}

impl Encode for TableTranscript {}
