//! A shuffling server in the chain.
//!
//! At the start of a round the server checks the previous hop's shuffle, then shuffles the table
//! with its round key `k`, which turns every key `y` into `y·k` and the generator `g` into `g·k`.
//! At the end of the round the table comes back in the opposite direction and the server shuffles
//! it with `k⁻¹`, checking that every key it strips is one it saw on the way in. It then draws a
//! fresh round key, so pseudonyms do not repeat across rounds.
//!
//! Servers also co-sign bridge assignments, after re-checking the requester's spend against their
//! own copy of the round table.

use crate::{
    config::ServerConfig,
    event::*,
    logging::SERVER_TARGET,
    spend::{verify_spend, SpendProof},
    table::*,
    types::*,
    Error, NodeId, Phase, Rng,
};
use anonrep_crypto::random_non_zero_scalar;
use ff::Field;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// A server's state.
#[derive(Debug)]
pub struct Server {
    id: NodeId,
    config: ServerConfig,
    signing_key: Scalar,
    public_key: G1Projective,
    previous: Option<NodeId>,
    next: NodeId,
    fujiokam: Option<FujiOkamBase>,
    round_key: Scalar,
    /// Maps the pseudonyms this server produced to the keys it was given.
    key_map: HashMap<KeyId, KeyId>,
    table: Option<Table>,
}

impl Server {
    /// Set up server `id` with a new signing key.
    pub fn new(rng: &mut impl Rng, id: NodeId, config: ServerConfig) -> Self {
        let signing_key = Scalar::random(&mut *rng);
        Self {
            id,
            config,
            signing_key,
            public_key: G1Projective::generator() * signing_key,
            previous: None,
            next: NodeId::Coordinator,
            fujiokam: None,
            round_key: random_non_zero_scalar(&mut *rng),
            key_map: HashMap::new(),
            table: None,
        }
    }

    /// This server's address.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The server's configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The server's long-term signing key.
    pub fn public_key(&self) -> &G1Projective {
        &self.public_key
    }

    /// The hops on either side, once the coordinator has placed this server.
    pub fn neighbours(&self) -> Option<(NodeId, NodeId)> {
        self.previous.map(|previous| (previous, self.next))
    }

    /// Where the server stands, as far as its own state shows.
    pub fn phase(&self) -> Phase {
        match (self.previous, &self.table) {
            (None, _) => Phase::Configuration,
            (Some(_), Some(_)) => Phase::Message,
            (Some(_), None) if !self.key_map.is_empty() => Phase::Announce,
            (Some(_), None) => Phase::ReadyForNewRound,
        }
    }

    /// The pseudonym table of the current round, if one is published.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// The request that asks the coordinator for a place in the chain.
    pub fn register(&self) -> Outbound {
        Outbound::new(
            NodeId::Coordinator,
            Event::ServerRegister {
                public_key: self.public_key,
            },
        )
    }

    /// Process one event.
    pub fn handle(
        &mut self,
        from: NodeId,
        event: Event,
        rng: &mut impl Rng,
    ) -> Result<Vec<Outbound>, Error> {
        match event {
            Event::ServerRegisterReply { previous, fujiokam } => {
                self.expect_coordinator(from)?;
                info!(target: SERVER_TARGET, server = %self.id, %previous, "joined the chain");
                self.previous = Some(previous);
                self.fujiokam = Some(fujiokam);
                Ok(Vec::new())
            }
            Event::UpdateNextHop { next } => {
                self.expect_coordinator(from)?;
                debug!(target: SERVER_TARGET, server = %self.id, %next, "next hop updated");
                self.next = next;
                Ok(Vec::new())
            }
            Event::Announcement { transcript } => self.announce(rng, from, transcript),
            Event::AnnouncementFinalize { table } => {
                self.expect_coordinator(from)?;
                self.table = Some(table);
                Ok(Vec::new())
            }
            Event::RoundEnd { transcript } => self.strip(rng, from, transcript),
            Event::SignAssignments {
                request,
                nym,
                spend,
                assignments,
            } => {
                self.expect_coordinator(from)?;
                let signatures = self.endorse(rng, &nym, &spend, &assignments);
                Ok(vec![Outbound::new(
                    NodeId::Coordinator,
                    Event::GotSignatures {
                        request,
                        signatures,
                    },
                )])
            }
            other => Err(Error::UnexpectedEvent {
                phase: self.phase(),
                event: other.name(),
            }),
        }
    }

    fn announce(
        &mut self,
        rng: &mut impl Rng,
        from: NodeId,
        mut transcript: TableTranscript,
    ) -> Result<Vec<Outbound>, Error> {
        if self.previous != Some(from) {
            return Err(Error::MissingPeer(from));
        }
        transcript.verify_latest()?;

        let inputs = transcript.latest().keys();
        let _ = transcript.extend(&mut *rng, self.id, self.round_key)?;
        self.key_map = inputs
            .iter()
            .map(|key| (KeyId::from(&(key * self.round_key)), KeyId::from(key)))
            .collect();
        self.table = None;

        info!(
            target: SERVER_TARGET,
            server = %self.id,
            entries = inputs.len(),
            "shuffled announcement"
        );
        Ok(vec![Outbound::new(
            self.next,
            Event::Announcement { transcript },
        )])
    }

    fn strip(
        &mut self,
        rng: &mut impl Rng,
        from: NodeId,
        mut transcript: TableTranscript,
    ) -> Result<Vec<Outbound>, Error> {
        if from != self.next {
            return Err(Error::MissingPeer(from));
        }
        let previous = self.previous.ok_or(Error::MissingPeer(self.id))?;
        transcript.verify_latest()?;

        let inverse = Option::<Scalar>::from(self.round_key.invert())
            .ok_or(anonrep_crypto::Error::ZeroFactor)?;
        let stripped = transcript.extend(&mut *rng, self.id, inverse)?;

        let announced: HashSet<KeyId> = self.key_map.values().copied().collect();
        if let Some(entry) = stripped
            .entries
            .iter()
            .find(|entry| !announced.contains(&KeyId::from(&entry.key)))
        {
            return Err(Error::UnknownPseudonym {
                key: KeyId::from(&entry.key),
            });
        }

        self.round_key = random_non_zero_scalar(&mut *rng);
        self.key_map.clear();
        self.table = None;

        info!(target: SERVER_TARGET, server = %self.id, "stripped round key");
        Ok(vec![Outbound::new(previous, Event::RoundEnd { transcript })])
    }

    fn endorse(
        &self,
        rng: &mut impl Rng,
        nym: &G1Projective,
        spend: &SpendProof,
        assignments: &[Assignment],
    ) -> Option<Vec<schnorr::Signature>> {
        let table = self.table.as_ref()?;
        let fujiokam = self.fujiokam.as_ref()?;
        let commitment = table.commitment_of(nym)?;

        if let Err(failure) = verify_spend(&table.bases.pedersen, fujiokam, &commitment, spend) {
            warn!(target: SERVER_TARGET, server = %self.id, %failure, "refusing assignment");
            return None;
        }
        let within_spend = assignments.len() as u64 <= spend.ind;
        if !within_spend || assignments.iter().any(|a| &a.requester != nym) {
            warn!(
                target: SERVER_TARGET,
                server = %self.id,
                "assignment does not match the request"
            );
            return None;
        }

        let generator = G1Projective::generator();
        Some(
            assignments
                .iter()
                .map(|assignment| {
                    schnorr::sign(&mut *rng, &generator, &self.signing_key, &assignment.to_bytes())
                })
                .collect(),
        )
    }

    fn expect_coordinator(&self, from: NodeId) -> Result<(), Error> {
        match from {
            NodeId::Coordinator => Ok(()),
            other => Err(Error::MissingPeer(other)),
        }
    }
}
