/*!
The coordinator keeps the reputation table, the message board and the vote tallies.

It drives every round through its phases:

1. `start_round` admits waiting clients with their starting credit and sends the table into the
   server chain.
2. When the last server returns it, the coordinator checks every shuffle, publishes the
   pseudonym table and opens the board for messages.
3. `start_vote` opens voting; every vote is a linkable ring signature over the round's
   pseudonyms, and a repeated tag is refused.
4. `end_round` folds the tallies into the commitments and sends the table back through the chain,
   which strips the round keys off again.

The coordinator learns neither which client owns a pseudonym nor how much reputation a
commitment holds, except for the starting credit it hands out itself.
*/

use crate::{
    config::CoordinatorConfig,
    event::*,
    logging::COORDINATOR_TARGET,
    spend::{verify_spend, SpendProof},
    table::*,
    types::*,
    Error, NodeId, Phase, Rng,
};
use anonrep_crypto::integer::scalar_from_i64;
use ff::Field;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct Bridge {
    address: String,
    provider: G1Projective,
    assigned: bool,
}

#[derive(Debug)]
struct PendingRequest {
    client: NodeId,
    bridges: Vec<usize>,
    assignments: Vec<SignedAssignment>,
    awaiting: BTreeSet<NodeId>,
}

/// The coordinator's state.
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinatorConfig,
    phase: Phase,
    signing_key: Scalar,
    public_key: G1Projective,
    fujiokam: FujiOkamBase,
    generator_secrets: GeneratorSecrets,
    honesty_sessions: HashMap<NodeId, HonestyWitness>,
    servers: Vec<(NodeId, G1Projective)>,
    clients: BTreeMap<NodeId, G1Projective>,
    waiting_clients: Vec<NodeId>,
    table: Table,
    message_log: Vec<G1Projective>,
    tallies: BTreeMap<KeyId, Tally>,
    vote_tags: HashSet<KeyId>,
    bridges: Vec<Bridge>,
    requests: BTreeMap<u64, PendingRequest>,
    next_request: u64,
}

impl Coordinator {
    /// Set up a coordinator with a freshly generated integer commitment modulus.
    pub fn new(rng: &mut impl Rng, config: CoordinatorConfig) -> Self {
        let factors = SafePrimeFactors::generate(&mut *rng, config.fujiokam_prime_bits);
        Self::with_factors(rng, config, &factors)
    }

    /// Set up a coordinator over a known factorization.
    pub fn with_factors(
        rng: &mut impl Rng,
        config: CoordinatorConfig,
        factors: &SafePrimeFactors,
    ) -> Self {
        let (fujiokam, generator_secrets) = FujiOkamBase::generate(&mut *rng, factors);
        let signing_key = Scalar::random(&mut *rng);
        let bases = ShuffleBases::new(
            G1Projective::generator(),
            PedersenBase::from_label(config.pedersen_label.as_bytes()),
        );
        info!(target: COORDINATOR_TARGET, modulus_bits = fujiokam.n().bits(), "coordinator ready");
        Self {
            config,
            phase: Phase::Configuration,
            signing_key,
            public_key: G1Projective::generator() * signing_key,
            fujiokam,
            generator_secrets,
            honesty_sessions: HashMap::new(),
            servers: Vec::new(),
            clients: BTreeMap::new(),
            waiting_clients: Vec::new(),
            table: Table::new(bases, Vec::new()),
            message_log: Vec::new(),
            tallies: BTreeMap::new(),
            vote_tags: HashSet::new(),
            bridges: Vec::new(),
            requests: BTreeMap::new(),
            next_request: 1,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The table: long-term keys between rounds, pseudonyms during a round.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The integer commitment parameters.
    pub fn fujiokam(&self) -> &FujiOkamBase {
        &self.fujiokam
    }

    /// The coordinator's long-term signing key.
    pub fn public_key(&self) -> &G1Projective {
        &self.public_key
    }

    /// The servers in chain order.
    pub fn servers(&self) -> Vec<NodeId> {
        self.servers.iter().map(|(id, _)| *id).collect()
    }

    /// Number of messages posted this round.
    pub fn message_count(&self) -> usize {
        self.message_log.len()
    }

    /// The net votes counted so far this round.
    pub fn tallies(&self) -> Vec<Tally> {
        self.tallies.values().copied().collect()
    }

    /// Stop accepting servers and wait for the first round.
    pub fn finish_configuration(&mut self) -> Result<(), Error> {
        self.expect_phase(&[Phase::Configuration], "finish_configuration")?;
        info!(target: COORDINATOR_TARGET, servers = self.servers.len(), "configuration closed");
        self.phase = Phase::ReadyForNewRound;
        Ok(())
    }

    /// Admit waiting clients and send the table into the server chain.
    pub fn start_round(&mut self, rng: &mut impl Rng) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::ReadyForNewRound], "start_round")?;
        let mut outbound = Vec::new();

        let credit = Scalar::from(self.config.starting_credit);
        for client in self.waiting_clients.drain(..) {
            let key = self.clients[&client];
            let (value, blinding) = self.table.bases.pedersen.commit(&mut *rng, credit);
            self.table.entries.push(Entry::new(key, value));
            outbound.push(Outbound::new(
                client,
                Event::InitialBlinding {
                    credit: self.config.starting_credit,
                    blinding,
                },
            ));
            debug!(target: COORDINATOR_TARGET, %client, "admitted client");
        }

        self.message_log.clear();
        self.tallies.clear();
        self.vote_tags.clear();
        self.bridges.clear();
        self.requests.clear();

        match self.servers.first() {
            Some(&(first, _)) => {
                info!(target: COORDINATOR_TARGET, entries = self.table.len(), "announcing");
                self.phase = Phase::Announce;
                let transcript = TableTranscript::new(self.table.clone());
                outbound.push(Outbound::new(first, Event::Announcement { transcript }));
            }
            None => outbound.extend(self.publish_pseudonyms()),
        }
        Ok(outbound)
    }

    /// Open voting on the round's messages.
    pub fn start_vote(&mut self) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message], "start_vote")?;
        info!(target: COORDINATOR_TARGET, messages = self.message_log.len(), "voting opened");
        self.phase = Phase::Vote;
        self.vote_tags.clear();
        Ok(self.to_clients(Event::VoteStart))
    }

    /// Apply the tallies and send the table back through the chain.
    pub fn end_round(&mut self) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message, Phase::Vote], "end_round")?;

        let pedersen = self.table.bases.pedersen;
        for entry in &mut self.table.entries {
            if let Some(tally) = self.tallies.get(&KeyId::from(&entry.key)) {
                let delta = scalar_from_i64(tally.delta);
                entry.value = entry.value + pedersen.commit_with_r(delta, BlindingFactor::zero());
            }
        }
        let tallies = self.tallies();
        info!(target: COORDINATOR_TARGET, tallies = tallies.len(), "round closing");

        let mut outbound = self.to_clients(Event::RoundEndTally { tallies });
        match self.servers.last() {
            Some(&(last, _)) => {
                self.phase = Phase::RoundEnd;
                let transcript = TableTranscript::new(self.table.clone());
                outbound.push(Outbound::new(last, Event::RoundEnd { transcript }));
            }
            None => self.phase = Phase::ReadyForNewRound,
        }
        Ok(outbound)
    }

    /// Process one event.
    pub fn handle(
        &mut self,
        from: NodeId,
        event: Event,
        rng: &mut impl Rng,
    ) -> Result<Vec<Outbound>, Error> {
        match event {
            Event::ServerRegister { public_key } => self.register_server(from, public_key),
            Event::ClientRegister { public_key } => self.register_client(rng, from, public_key),
            Event::HonestyChallenge { challenge } => self.answer_honesty(from, &challenge),
            Event::Announcement { transcript } => self.finish_announcement(from, transcript),
            Event::Message {
                text,
                nym,
                signature,
                spend,
            } => self.post_message(from, text, nym, &signature, &spend),
            Event::Vote {
                message_id,
                up,
                nym,
                signature,
            } => self.count_vote(from, message_id, up, &nym, &signature),
            Event::RoundEnd { transcript } => self.finish_round(from, transcript),
            Event::PostBridge {
                address,
                nym,
                signature,
            } => self.post_bridge(address, nym, &signature),
            Event::RequestBridges {
                nym,
                spend,
                signature,
            } => self.request_bridges(rng, from, nym, spend, &signature),
            Event::GotSignatures {
                request,
                signatures,
            } => self.collect_signatures(from, request, signatures),
            other => Err(self.unexpected(other.name())),
        }
    }

    fn register_server(
        &mut self,
        server: NodeId,
        public_key: G1Projective,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Configuration], "ServerRegister")?;
        if self.servers.iter().any(|(id, _)| *id == server) {
            warn!(target: COORDINATOR_TARGET, %server, "server registered twice");
            return Ok(Vec::new());
        }

        let mut outbound = Vec::new();
        let previous = match self.servers.last() {
            Some(&(last, _)) => {
                outbound.push(Outbound::new(last, Event::UpdateNextHop { next: server }));
                last
            }
            None => NodeId::Coordinator,
        };
        self.servers.push((server, public_key));
        info!(target: COORDINATOR_TARGET, %server, %previous, "server joined the chain");

        outbound.push(Outbound::new(
            server,
            Event::ServerRegisterReply {
                previous,
                fujiokam: self.fujiokam.clone(),
            },
        ));
        Ok(outbound)
    }

    fn register_client(
        &mut self,
        rng: &mut impl Rng,
        client: NodeId,
        public_key: G1Projective,
    ) -> Result<Vec<Outbound>, Error> {
        if self.clients.contains_key(&client) {
            warn!(target: COORDINATOR_TARGET, %client, "client registered twice");
            return Ok(Vec::new());
        }
        let _ = self.clients.insert(client, public_key);
        self.waiting_clients.push(client);

        let (honesty, witness) =
            generate_honesty_proof(&mut *rng, &self.fujiokam, self.config.honesty_proof_size);
        let _ = self.honesty_sessions.insert(client, witness);
        info!(
            target: COORDINATOR_TARGET,
            %client,
            key = %KeyId::from(&public_key),
            "client registered"
        );

        Ok(vec![Outbound::new(
            client,
            Event::RegisterConfirmation {
                fujiokam: self.fujiokam.clone(),
                honesty,
            },
        )])
    }

    fn answer_honesty(
        &mut self,
        client: NodeId,
        challenge: &HonestyChallenge,
    ) -> Result<Vec<Outbound>, Error> {
        // Each proof answers exactly one challenge: answering two would reveal the exponents.
        let witness = self
            .honesty_sessions
            .remove(&client)
            .ok_or(Error::MissingPeer(client))?;
        let answer = answer_honesty_challenge(&self.generator_secrets, &witness, challenge)?;
        Ok(vec![Outbound::new(client, Event::HonestyAnswer { answer })])
    }

    fn finish_announcement(
        &mut self,
        from: NodeId,
        transcript: TableTranscript,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Announce], "Announcement")?;
        if self.servers.last().map(|(id, _)| *id) != Some(from) {
            return Err(Error::MissingPeer(from));
        }
        self.check_transcript(&transcript, false)?;

        self.table = transcript.into_latest();
        Ok(self.publish_pseudonyms())
    }

    fn publish_pseudonyms(&mut self) -> Vec<Outbound> {
        info!(target: COORDINATOR_TARGET, entries = self.table.len(), "pseudonyms published");
        self.phase = Phase::Message;
        let event = Event::AnnouncementFinalize {
            table: self.table.clone(),
        };
        let mut outbound = self.to_clients(event.clone());
        outbound.extend(self.to_servers(event));
        outbound
    }

    fn post_message(
        &mut self,
        from: NodeId,
        text: String,
        nym: G1Projective,
        signature: &schnorr::Signature,
        spend: &SpendProof,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message], "Message")?;
        let accepted = self.check_pseudonym_spend(
            &nym,
            &message_payload(&text, spend),
            signature,
            spend,
        );

        let mut outbound = vec![Outbound::new(from, Event::MessageReply { accepted })];
        if accepted {
            self.message_log.push(nym);
            let id = self.message_log.len() as u64;
            info!(
                target: COORDINATOR_TARGET,
                id,
                nym = %KeyId::from(&nym),
                ind = spend.ind,
                "message posted"
            );
            outbound.extend(self.to_clients(Event::MessageBroadcast { id, text, nym }));
        }
        Ok(outbound)
    }

    /// Check that `nym` is in the table, signed `payload`, and holds the reputation it spends.
    fn check_pseudonym_spend(
        &self,
        nym: &G1Projective,
        payload: &[u8],
        signature: &schnorr::Signature,
        spend: &SpendProof,
    ) -> bool {
        let key = KeyId::from(nym);
        let commitment = match self.table.commitment_of(nym) {
            Some(commitment) => commitment,
            None => {
                warn!(target: COORDINATOR_TARGET, %key, "unknown pseudonym");
                return false;
            }
        };
        if !schnorr::verify(&self.table.bases.g, nym, payload, signature) {
            warn!(target: COORDINATOR_TARGET, %key, "bad pseudonym signature");
            return false;
        }
        match verify_spend(
            &self.table.bases.pedersen,
            &self.fujiokam,
            &commitment,
            spend,
        ) {
            Ok(()) => true,
            Err(failure) => {
                warn!(target: COORDINATOR_TARGET, %key, %failure, "spend refused");
                false
            }
        }
    }

    fn count_vote(
        &mut self,
        from: NodeId,
        message_id: u64,
        up: bool,
        nym: &G1Projective,
        signature: &lrs::LinkableSignature,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Vote], "Vote")?;
        let accepted = self.check_vote(message_id, nym, signature);
        if accepted {
            let target = self.message_log[(message_id - 1) as usize];
            let tally = self
                .tallies
                .entry(KeyId::from(&target))
                .or_insert(Tally {
                    nym: target,
                    delta: 0,
                });
            tally.delta += if up { 1 } else { -1 };
            debug!(target: COORDINATOR_TARGET, message_id, up, "vote counted");
        }
        Ok(vec![Outbound::new(from, Event::VoteReply { accepted })])
    }

    fn check_vote(
        &mut self,
        message_id: u64,
        nym: &G1Projective,
        signature: &lrs::LinkableSignature,
    ) -> bool {
        if message_id == 0 || message_id > self.message_log.len() as u64 {
            warn!(target: COORDINATOR_TARGET, message_id, "vote on an unknown message");
            return false;
        }
        if self.table.position(nym).is_none() {
            warn!(
                target: COORDINATOR_TARGET,
                key = %KeyId::from(nym),
                "vote from an unknown pseudonym"
            );
            return false;
        }
        let ring = self.table.keys();
        if !lrs::verify(&vote_payload(message_id), &self.table.bases.g, &ring, signature) {
            warn!(target: COORDINATOR_TARGET, message_id, "bad ring signature");
            return false;
        }
        if !self.vote_tags.insert(KeyId::from(signature.tag())) {
            warn!(target: COORDINATOR_TARGET, message_id, "repeated vote");
            return false;
        }
        true
    }

    fn finish_round(
        &mut self,
        from: NodeId,
        transcript: TableTranscript,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::RoundEnd], "RoundEnd")?;
        if self.servers.first().map(|(id, _)| *id) != Some(from) {
            return Err(Error::MissingPeer(from));
        }
        self.check_transcript(&transcript, true)?;

        let table = transcript.into_latest();
        let known: HashSet<KeyId> = self.clients.values().map(KeyId::from).collect();
        if let Some(entry) = table
            .entries
            .iter()
            .find(|entry| !known.contains(&KeyId::from(&entry.key)))
        {
            return Err(Error::UnknownPseudonym {
                key: KeyId::from(&entry.key),
            });
        }

        info!(target: COORDINATOR_TARGET, entries = table.len(), "round closed");
        self.table = table;
        self.phase = Phase::ReadyForNewRound;
        Ok(Vec::new())
    }

    /// Check that every server shuffled once, in chain order, or in reverse order when `returning`.
    fn check_transcript(&self, transcript: &TableTranscript, returning: bool) -> Result<(), Error> {
        if transcript.start() != &self.table {
            return Err(Error::ShuffleRejected { hop: 0 });
        }
        if transcript.hops().len() != self.servers.len() {
            return Err(Error::ShuffleRejected {
                hop: transcript.hops().len().min(self.servers.len()),
            });
        }
        let mut chain: Vec<NodeId> = self.servers.iter().map(|(id, _)| *id).collect();
        if returning {
            chain.reverse();
        }
        if let Some(hop) = transcript
            .hops()
            .iter()
            .zip(&chain)
            .position(|(hop, expected)| hop.server != *expected)
        {
            warn!(target: COORDINATOR_TARGET, hop, "transcript hop from the wrong server");
            return Err(Error::ShuffleRejected { hop });
        }
        transcript.verify()
    }

    fn post_bridge(
        &mut self,
        address: String,
        nym: G1Projective,
        signature: &schnorr::Signature,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message, Phase::Vote], "PostBridge")?;
        let key = KeyId::from(&nym);
        if self.table.position(&nym).is_none() {
            warn!(target: COORDINATOR_TARGET, %key, "bridge from an unknown pseudonym");
        } else if !schnorr::verify(
            &self.table.bases.g,
            &nym,
            &bridge_payload(&address, &nym),
            signature,
        ) {
            warn!(target: COORDINATOR_TARGET, %key, "bad bridge signature");
        } else {
            debug!(target: COORDINATOR_TARGET, %key, "bridge posted");
            self.bridges.push(Bridge {
                address,
                provider: nym,
                assigned: false,
            });
        }
        Ok(Vec::new())
    }

    fn request_bridges(
        &mut self,
        rng: &mut impl Rng,
        client: NodeId,
        nym: G1Projective,
        spend: SpendProof,
        signature: &schnorr::Signature,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message, Phase::Vote], "RequestBridges")?;
        let refused = || {
            vec![Outbound::new(
                client,
                Event::BridgesAssigned {
                    assignments: Vec::new(),
                },
            )]
        };
        if !self.check_pseudonym_spend(&nym, &request_payload(&spend), signature, &spend) {
            return Ok(refused());
        }

        let chosen: Vec<usize> = self
            .bridges
            .iter()
            .enumerate()
            .filter(|(_, bridge)| !bridge.assigned && bridge.provider != nym)
            .map(|(index, _)| index)
            .take(spend.ind as usize)
            .collect();
        if chosen.is_empty() {
            debug!(target: COORDINATOR_TARGET, "no bridges to hand out");
            return Ok(refused());
        }

        let generator = G1Projective::generator();
        let assignments = chosen
            .iter()
            .map(|&index| {
                let bridge = &mut self.bridges[index];
                bridge.assigned = true;
                let assignment = Assignment {
                    requester: nym,
                    address: bridge.address.clone(),
                    provider: bridge.provider,
                };
                let signature =
                    schnorr::sign(&mut *rng, &generator, &self.signing_key, &assignment.to_bytes());
                SignedAssignment {
                    assignment,
                    endorsements: vec![Endorsement {
                        signer: self.public_key,
                        signature,
                    }],
                }
            })
            .collect::<Vec<_>>();

        if self.servers.is_empty() {
            return Ok(vec![Outbound::new(
                client,
                Event::BridgesAssigned { assignments },
            )]);
        }

        let request = self.next_request;
        self.next_request += 1;
        let event = Event::SignAssignments {
            request,
            nym,
            spend,
            assignments: assignments
                .iter()
                .map(|signed| signed.assignment.clone())
                .collect(),
        };
        let _ = self.requests.insert(
            request,
            PendingRequest {
                client,
                bridges: chosen,
                assignments,
                awaiting: self.servers.iter().map(|(id, _)| *id).collect(),
            },
        );
        debug!(target: COORDINATOR_TARGET, request, "collecting endorsements");
        Ok(self.to_servers(event))
    }

    fn collect_signatures(
        &mut self,
        server: NodeId,
        request: u64,
        signatures: Option<Vec<schnorr::Signature>>,
    ) -> Result<Vec<Outbound>, Error> {
        let signer = self
            .servers
            .iter()
            .find(|(id, _)| *id == server)
            .map(|(_, key)| *key)
            .ok_or(Error::MissingPeer(server))?;
        let pending = match self.requests.get_mut(&request) {
            Some(pending) => pending,
            None => {
                warn!(target: COORDINATOR_TARGET, request, %server, "endorsements for no request");
                return Ok(Vec::new());
            }
        };
        if !pending.awaiting.remove(&server) {
            warn!(target: COORDINATOR_TARGET, request, %server, "unrequested endorsements");
            return Ok(Vec::new());
        }

        let generator = G1Projective::generator();
        let endorsed = match signatures {
            Some(signatures) if signatures.len() == pending.assignments.len() => pending
                .assignments
                .iter_mut()
                .zip(signatures)
                .all(|(signed, signature)| {
                    let valid = schnorr::verify(
                        &generator,
                        &signer,
                        &signed.assignment.to_bytes(),
                        &signature,
                    );
                    signed.endorsements.push(Endorsement { signer, signature });
                    valid
                }),
            _ => false,
        };
        if endorsed && !pending.awaiting.is_empty() {
            return Ok(Vec::new());
        }

        let pending = self
            .requests
            .remove(&request)
            .expect("the request was pending above");
        let assignments = if endorsed {
            info!(
                target: COORDINATOR_TARGET,
                request,
                bridges = pending.assignments.len(),
                "bridges assigned"
            );
            pending.assignments
        } else {
            warn!(target: COORDINATOR_TARGET, request, %server, "server refused the assignment");
            for index in pending.bridges {
                self.bridges[index].assigned = false;
            }
            Vec::new()
        };
        Ok(vec![Outbound::new(
            pending.client,
            Event::BridgesAssigned { assignments },
        )])
    }

    fn to_clients(&self, event: Event) -> Vec<Outbound> {
        self.clients
            .keys()
            .map(|client| Outbound::new(*client, event.clone()))
            .collect()
    }

    fn to_servers(&self, event: Event) -> Vec<Outbound> {
        self.servers
            .iter()
            .map(|(server, _)| Outbound::new(*server, event.clone()))
            .collect()
    }

    fn expect_phase(&self, allowed: &[Phase], event: &'static str) -> Result<(), Error> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(self.unexpected(event))
        }
    }

    fn unexpected(&self, event: &'static str) -> Error {
        Error::UnexpectedEvent {
            phase: self.phase,
            event,
        }
    }
}
