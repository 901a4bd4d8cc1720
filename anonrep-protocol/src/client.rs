//! A client: the holder of a long-term secret `x` and of the opening of its reputation commitment.
//!
//! A client keeps its reputation and blinding factor locally. Shuffles rotate the Pedersen base
//! and scale the commitment with it, so the opening `(reputation, r)` stays valid round after
//! round; only vote tallies change the reputation, and they are announced in the clear.

use crate::{
    config::ClientConfig, event::*, logging::CLIENT_TARGET, spend::SpendProof, table::*,
    types::*, Error, NodeId, Phase, Rng, Verification,
};
use anonrep_crypto::integer::scalar_from_i64;
use ff::Field;
use tracing::{debug, info, warn};

/// A message seen on the board this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// One-based position in the round's log.
    pub id: u64,
    /// The message text.
    pub text: String,
    /// The poster's pseudonym.
    pub nym: G1Projective,
}

#[derive(Debug, Clone)]
struct RoundView {
    table: Table,
    index: usize,
    nym: G1Projective,
}

/// A client's state.
#[derive(Debug)]
pub struct Client {
    id: NodeId,
    config: ClientConfig,
    secret: Scalar,
    public_key: G1Projective,
    phase: Phase,
    fujiokam: Option<FujiOkamBase>,
    honesty: Option<(HonestyCommitments, HonestyChallenge)>,
    generators_verified: bool,
    reputation: i64,
    blinding: Option<BlindingFactor>,
    round: Option<RoundView>,
    messages: Vec<PostedMessage>,
    replies: Vec<bool>,
    bridges: Vec<SignedAssignment>,
}

impl Client {
    /// Set up client `id` with a new long-term secret.
    pub fn new(rng: &mut impl Rng, id: NodeId, config: ClientConfig) -> Self {
        let secret = Scalar::random(&mut *rng);
        Self {
            id,
            config,
            secret,
            public_key: G1Projective::generator() * secret,
            phase: Phase::Configuration,
            fujiokam: None,
            honesty: None,
            generators_verified: false,
            reputation: 0,
            blinding: None,
            round: None,
            messages: Vec::new(),
            replies: Vec::new(),
            bridges: Vec::new(),
        }
    }

    /// This client's address.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The client's long-term key `x·G`.
    pub fn public_key(&self) -> &G1Projective {
        &self.public_key
    }

    /// The phase the client has been told about.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The client's current reputation.
    pub fn reputation(&self) -> i64 {
        self.reputation
    }

    /// Whether the coordinator's generators passed the honesty check.
    pub fn generators_verified(&self) -> bool {
        self.generators_verified
    }

    /// The client's pseudonym this round, once the table is published.
    pub fn nym(&self) -> Option<&G1Projective> {
        self.round.as_ref().map(|round| &round.nym)
    }

    /// Messages seen this round.
    pub fn messages(&self) -> &[PostedMessage] {
        &self.messages
    }

    /// The coordinator's decisions on this client's messages and votes, oldest first.
    pub fn replies(&self) -> &[bool] {
        &self.replies
    }

    /// Bridges granted to this client, each carrying every endorsement.
    pub fn bridges(&self) -> &[SignedAssignment] {
        &self.bridges
    }

    /// The request to join.
    pub fn register(&self) -> Outbound {
        Outbound::new(
            NodeId::Coordinator,
            Event::ClientRegister {
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
        if from != NodeId::Coordinator {
            return Err(Error::MissingPeer(from));
        }
        match event {
            Event::RegisterConfirmation { fujiokam, honesty } => {
                let size = self.config.honesty_proof_size;
                if honesty.size() != size {
                    warn!(
                        target: CLIENT_TARGET,
                        client = %self.id,
                        got = honesty.size(),
                        "honesty proof has the wrong size"
                    );
                    return Err(anonrep_crypto::Error::LengthMismatch {
                        expected: size,
                        got: honesty.size(),
                    }
                    .into());
                }
                let challenge = HonestyChallenge::random(&mut *rng, size);
                self.fujiokam = Some(fujiokam);
                self.honesty = Some((honesty, challenge.clone()));
                Ok(vec![Outbound::new(
                    NodeId::Coordinator,
                    Event::HonestyChallenge { challenge },
                )])
            }
            Event::HonestyAnswer { answer } => self.check_generators(&answer),
            Event::InitialBlinding { credit, blinding } => {
                debug!(target: CLIENT_TARGET, client = %self.id, credit, "admitted");
                self.reputation = credit as i64;
                self.blinding = Some(blinding);
                Ok(Vec::new())
            }
            Event::AnnouncementFinalize { table } => self.enter_round(table),
            Event::MessageBroadcast { id, text, nym } => {
                self.messages.push(PostedMessage { id, text, nym });
                Ok(Vec::new())
            }
            Event::MessageReply { accepted } | Event::VoteReply { accepted } => {
                self.replies.push(accepted);
                Ok(Vec::new())
            }
            Event::VoteStart => {
                if self.round.is_some() {
                    self.phase = Phase::Vote;
                }
                Ok(Vec::new())
            }
            Event::RoundEndTally { tallies } => {
                self.leave_round(&tallies);
                Ok(Vec::new())
            }
            Event::BridgesAssigned { assignments } => {
                for signed in assignments {
                    match signed.verify() {
                        Verification::Verified => self.bridges.push(signed),
                        Verification::Failed => {
                            warn!(target: CLIENT_TARGET, client = %self.id, "unendorsed bridge")
                        }
                    }
                }
                Ok(Vec::new())
            }
            other => Err(Error::UnexpectedEvent {
                phase: self.phase,
                event: other.name(),
            }),
        }
    }

    fn check_generators(&mut self, answer: &HonestyAnswer) -> Result<Vec<Outbound>, Error> {
        let (commitments, challenge) = self.honesty.take().ok_or(Error::UnexpectedEvent {
            phase: self.phase,
            event: "HonestyAnswer",
        })?;
        let fujiokam = self.fujiokam.as_ref().ok_or(Error::NotReady("fujiokam base"))?;

        let index = check_honesty(fujiokam, &commitments, &challenge, answer);
        self.generators_verified = index == 0;
        if index != 0 {
            warn!(target: CLIENT_TARGET, client = %self.id, index, "dishonest generators");
            if self.config.strict_honesty {
                self.fujiokam = None;
                return Err(Error::DishonestGenerators { index });
            }
        }
        info!(target: CLIENT_TARGET, client = %self.id, "registered");
        self.phase = Phase::ReadyForNewRound;
        Ok(Vec::new())
    }

    fn enter_round(&mut self, table: Table) -> Result<Vec<Outbound>, Error> {
        self.messages.clear();
        self.round = None;
        let blinding = match self.blinding {
            Some(blinding) => blinding,
            None => {
                debug!(target: CLIENT_TARGET, client = %self.id, "not admitted yet");
                return Ok(Vec::new());
            }
        };

        let nym = table.bases.g * self.secret;
        let index = table.position(&nym).ok_or(Error::UnknownPseudonym {
            key: KeyId::from(&nym),
        })?;
        let opens = table.bases.pedersen.verify(
            scalar_from_i64(self.reputation),
            blinding,
            &table.entries[index].value,
        );
        if !opens {
            warn!(
                target: CLIENT_TARGET,
                client = %self.id,
                "commitment does not open to the local reputation"
            );
        }

        info!(target: CLIENT_TARGET, client = %self.id, nym = %KeyId::from(&nym), "round started");
        self.round = Some(RoundView { table, index, nym });
        self.phase = Phase::Message;
        Ok(Vec::new())
    }

    fn leave_round(&mut self, tallies: &[Tally]) {
        if let Some(round) = self.round.take() {
            if let Some(tally) = tallies.iter().find(|tally| tally.nym == round.nym) {
                self.reputation += tally.delta;
                info!(
                    target: CLIENT_TARGET,
                    client = %self.id,
                    delta = tally.delta,
                    reputation = self.reputation,
                    "reputation updated"
                );
            }
        }
        if self.phase != Phase::Configuration {
            self.phase = Phase::ReadyForNewRound;
        }
    }

    /// Post `text` under this round's pseudonym, proving a reputation of at least `ind`.
    pub fn post(
        &self,
        rng: &mut impl Rng,
        text: &str,
        ind: u64,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message], "Message")?;
        let (round, spend) = self.spend(&mut *rng, ind)?;
        let signature = schnorr::sign(
            &mut *rng,
            &round.table.bases.g,
            &self.secret,
            &message_payload(text, &spend),
        );
        Ok(vec![Outbound::new(
            NodeId::Coordinator,
            Event::Message {
                text: text.to_string(),
                nym: round.nym,
                signature,
                spend,
            },
        )])
    }

    /// Vote on message `message_id`; `up` adds one point to its poster, otherwise one is taken.
    pub fn vote(
        &self,
        rng: &mut impl Rng,
        message_id: u64,
        up: bool,
    ) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Vote], "Vote")?;
        let round = self.round.as_ref().ok_or(Error::NotReady("round table"))?;
        let signature = lrs::sign(
            rng,
            &vote_payload(message_id),
            &round.table.bases.g,
            &round.table.keys(),
            round.index,
            &self.secret,
        )?;
        Ok(vec![Outbound::new(
            NodeId::Coordinator,
            Event::Vote {
                message_id,
                up,
                nym: round.nym,
                signature,
            },
        )])
    }

    /// Offer a bridge at `address` under this round's pseudonym.
    pub fn post_bridge(&self, rng: &mut impl Rng, address: &str) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message, Phase::Vote], "PostBridge")?;
        let round = self.round.as_ref().ok_or(Error::NotReady("round table"))?;
        let signature = schnorr::sign(
            rng,
            &round.table.bases.g,
            &self.secret,
            &bridge_payload(address, &round.nym),
        );
        Ok(vec![Outbound::new(
            NodeId::Coordinator,
            Event::PostBridge {
                address: address.to_string(),
                nym: round.nym,
                signature,
            },
        )])
    }

    /// Spend `ind` reputation on up to `ind` bridges.
    pub fn request_bridges(&self, rng: &mut impl Rng, ind: u64) -> Result<Vec<Outbound>, Error> {
        self.expect_phase(&[Phase::Message, Phase::Vote], "RequestBridges")?;
        let (round, spend) = self.spend(&mut *rng, ind)?;
        let signature = schnorr::sign(
            &mut *rng,
            &round.table.bases.g,
            &self.secret,
            &request_payload(&spend),
        );
        Ok(vec![Outbound::new(
            NodeId::Coordinator,
            Event::RequestBridges {
                nym: round.nym,
                spend,
                signature,
            },
        )])
    }

    fn spend(&self, rng: &mut impl Rng, ind: u64) -> Result<(&RoundView, SpendProof), Error> {
        let round = self.round.as_ref().ok_or(Error::NotReady("round table"))?;
        let fujiokam = self.fujiokam.as_ref().ok_or(Error::NotReady("fujiokam base"))?;
        let blinding = self.blinding.ok_or(Error::NotReady("blinding factor"))?;
        if i128::from(ind) > i128::from(self.reputation) {
            return Err(Error::InsufficientReputation {
                ind,
                reputation: self.reputation,
            });
        }
        let spend = SpendProof::new(
            rng,
            &round.table.bases.pedersen,
            fujiokam,
            self.reputation,
            blinding,
            &round.table.entries[round.index].value,
            ind,
        )?;
        Ok((round, spend))
    }

    fn expect_phase(&self, allowed: &[Phase], event: &'static str) -> Result<(), Error> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(Error::UnexpectedEvent {
                phase: self.phase,
                event,
            })
        }
    }
}
