//! The messages parties exchange, and the byte strings they sign.

use crate::{spend::SpendProof, table::*, types::*, NodeId, Verification};
use serde::{Deserialize, Serialize};

/// Everything one party can send another.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A server asks to join the end of the chain.
    ServerRegister {
        /// The server's long-term signing key.
        #[serde(with = "SerializeElement")]
        public_key: G1Projective,
    },
    /// The coordinator places a server in the chain.
    ServerRegisterReply {
        /// The hop before the new server.
        previous: NodeId,
        /// The integer commitment parameters spends are checked under.
        fujiokam: FujiOkamBase,
    },
    /// A server gains a successor in the chain.
    UpdateNextHop {
        /// The new next hop.
        next: NodeId,
    },
    /// A client asks to join.
    ClientRegister {
        /// The client's long-term key `x·G`.
        #[serde(with = "SerializeElement")]
        public_key: G1Projective,
    },
    /// The coordinator accepts a client and opens an honesty proof for its integer commitment
    /// parameters.
    RegisterConfirmation {
        /// The integer commitment parameters.
        fujiokam: FujiOkamBase,
        /// The first message of the honesty proof.
        honesty: HonestyCommitments,
    },
    /// A client challenges the honesty proof.
    HonestyChallenge {
        /// One bit per honesty commitment.
        challenge: HonestyChallenge,
    },
    /// The coordinator answers an honesty challenge.
    HonestyAnswer {
        /// One integer per challenge bit.
        answer: HonestyAnswer,
    },
    /// A client is admitted to the table with its starting credit.
    InitialBlinding {
        /// The credit the client's commitment opens to.
        credit: u64,
        /// The blinding factor of the client's commitment.
        blinding: BlindingFactor,
    },
    /// The table on its way through the chain at the start of a round.
    Announcement {
        /// The starting table and every shuffle so far.
        transcript: TableTranscript,
    },
    /// The pseudonym table for the round.
    AnnouncementFinalize {
        /// Pseudonyms and commitments under the round's bases.
        table: Table,
    },
    /// A client posts a message under its pseudonym.
    Message {
        /// The message text.
        text: String,
        /// The poster's pseudonym.
        #[serde(with = "SerializeElement")]
        nym: G1Projective,
        /// The pseudonym's signature over [`message_payload`].
        signature: schnorr::Signature,
        /// Proof the poster holds the reputation it spends.
        spend: SpendProof,
    },
    /// The coordinator's decision on a message.
    MessageReply {
        /// Whether the message was posted.
        accepted: bool,
    },
    /// A posted message.
    MessageBroadcast {
        /// One-based position of the message in the round's log.
        id: u64,
        /// The message text.
        text: String,
        /// The poster's pseudonym.
        #[serde(with = "SerializeElement")]
        nym: G1Projective,
    },
    /// Voting is open.
    VoteStart,
    /// A client votes on a message.
    Vote {
        /// The message voted on.
        message_id: u64,
        /// `true` for `+1`, `false` for `-1`.
        up: bool,
        /// The voter's pseudonym.
        #[serde(with = "SerializeElement")]
        nym: G1Projective,
        /// Ring signature over [`vote_payload`] by a member of the round's pseudonyms.
        signature: lrs::LinkableSignature,
    },
    /// The coordinator's decision on a vote.
    VoteReply {
        /// Whether the vote was counted.
        accepted: bool,
    },
    /// The table on its way back through the chain at the end of a round.
    RoundEnd {
        /// The round table with the votes applied, and every shuffle so far.
        transcript: TableTranscript,
    },
    /// The net votes every pseudonym received this round.
    RoundEndTally {
        /// Non-zero tallies.
        tallies: Vec<Tally>,
    },
    /// A client offers a bridge.
    PostBridge {
        /// The bridge address.
        address: String,
        /// The provider's pseudonym.
        #[serde(with = "SerializeElement")]
        nym: G1Projective,
        /// The pseudonym's signature over [`bridge_payload`].
        signature: schnorr::Signature,
    },
    /// A client spends reputation for bridges.
    RequestBridges {
        /// The requester's pseudonym.
        #[serde(with = "SerializeElement")]
        nym: G1Projective,
        /// Proof the requester holds the reputation it spends; one bridge per point.
        spend: SpendProof,
        /// The pseudonym's signature over [`request_payload`].
        signature: schnorr::Signature,
    },
    /// The coordinator asks every server to endorse an assignment.
    SignAssignments {
        /// Identifies the request.
        request: u64,
        /// The requester's pseudonym.
        #[serde(with = "SerializeElement")]
        nym: G1Projective,
        /// The requester's spend, re-checked by every server.
        spend: SpendProof,
        /// The proposed assignments.
        assignments: Vec<Assignment>,
    },
    /// A server's answer to [`Event::SignAssignments`].
    GotSignatures {
        /// Identifies the request.
        request: u64,
        /// The signatures, one per assignment, or `None` if the server refused.
        signatures: Option<Vec<schnorr::Signature>>,
    },
    /// The bridges a request was granted.
    BridgesAssigned {
        /// The assignments with every endorsement.
        assignments: Vec<SignedAssignment>,
    },
}

impl Event {
    /// The variant name, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ServerRegister { .. } => "ServerRegister",
            Event::ServerRegisterReply { .. } => "ServerRegisterReply",
            Event::UpdateNextHop { .. } => "UpdateNextHop",
            Event::ClientRegister { .. } => "ClientRegister",
            Event::RegisterConfirmation { .. } => "RegisterConfirmation",
            Event::HonestyChallenge { .. } => "HonestyChallenge",
            Event::HonestyAnswer { .. } => "HonestyAnswer",
            Event::InitialBlinding { .. } => "InitialBlinding",
            Event::Announcement { .. } => "Announcement",
            Event::AnnouncementFinalize { .. } => "AnnouncementFinalize",
            Event::Message { .. } => "Message",
            Event::MessageReply { .. } => "MessageReply",
            Event::MessageBroadcast { .. } => "MessageBroadcast",
            Event::VoteStart => "VoteStart",
            Event::Vote { .. } => "Vote",
            Event::VoteReply { .. } => "VoteReply",
            Event::RoundEnd { .. } => "RoundEnd",
            Event::RoundEndTally { .. } => "RoundEndTally",
            Event::PostBridge { .. } => "PostBridge",
            Event::RequestBridges { .. } => "RequestBridges",
            Event::SignAssignments { .. } => "SignAssignments",
            Event::GotSignatures { .. } => "GotSignatures",
            Event::BridgesAssigned { .. } => "BridgesAssigned",
        }
    }
}

impl Encode for Event {}

/// An event and the party it is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// The recipient.
    pub to: NodeId,
    /// The event.
    pub event: Event,
}

impl Outbound {
    /// Address `event` to `to`.
    pub fn new(to: NodeId, event: Event) -> Self {
        Self { to, event }
    }
}

/// Net votes for one pseudonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// The pseudonym voted on.
    #[serde(with = "SerializeElement")]
    pub nym: G1Projective,
    /// Up-votes minus down-votes.
    pub delta: i64,
}

/// A bridge handed to a requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// The pseudonym that asked for bridges.
    #[serde(with = "SerializeElement")]
    pub requester: G1Projective,
    /// The bridge address.
    pub address: String,
    /// The pseudonym that offered the bridge.
    #[serde(with = "SerializeElement")]
    pub provider: G1Projective,
}

impl Encode for Assignment {}

/// A signature over an [`Assignment`] by a long-term key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// The signer's long-term key under the standard generator.
    #[serde(with = "SerializeElement")]
    pub signer: G1Projective,
    /// The signature over the encoded assignment.
    pub signature: schnorr::Signature,
}

/// An assignment endorsed by the coordinator and every server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAssignment {
    /// The assignment.
    pub assignment: Assignment,
    /// One endorsement per signer.
    pub endorsements: Vec<Endorsement>,
}

impl SignedAssignment {
    /// Check every endorsement. An assignment with no endorsements fails.
    pub fn verify(&self) -> Verification {
        let payload = self.assignment.to_bytes();
        let all_valid = !self.endorsements.is_empty()
            && self.endorsements.iter().all(|endorsement| {
                schnorr::verify(
                    &G1Projective::generator(),
                    &endorsement.signer,
                    &payload,
                    &endorsement.signature,
                )
            });
        Verification::from(all_valid)
    }
}

/// The bytes a pseudonym signs to post `text` with `spend`.
pub fn message_payload(text: &str, spend: &SpendProof) -> Vec<u8> {
    let mut payload = b"message:".to_vec();
    payload.extend_from_slice(&(text.len() as u64).to_be_bytes());
    payload.extend_from_slice(text.as_bytes());
    payload.extend_from_slice(&spend.to_bytes());
    payload
}

/// The bytes a voter ring-signs. They depend only on the message, so two votes by one pseudonym
/// on one message carry the same tag.
pub fn vote_payload(message_id: u64) -> Vec<u8> {
    let mut payload = b"vote:".to_vec();
    payload.extend_from_slice(&message_id.to_be_bytes());
    payload
}

/// The bytes a pseudonym signs to offer a bridge.
pub fn bridge_payload(address: &str, nym: &G1Projective) -> Vec<u8> {
    let mut payload = b"bridge:".to_vec();
    payload.extend_from_slice(nym.to_bytes().as_ref());
    payload.extend_from_slice(address.as_bytes());
    payload
}

/// The bytes a pseudonym signs to request bridges with `spend`.
pub fn request_payload(spend: &SpendProof) -> Vec<u8> {
    let mut payload = b"request:".to_vec();
    payload.extend_from_slice(&spend.to_bytes());
    payload
}

#[cfg(test)]
mod test {
    use super::*;
    use ff::Field;

    fn assignment() -> Assignment {
        Assignment {
            requester: G1Projective::generator() * Scalar::from(3u64),
            address: "198.51.100.7:443".to_string(),
            provider: G1Projective::generator() * Scalar::from(4u64),
        }
    }

    #[test]
    fn endorsed_assignments_verify() {
        let mut rng = crate::test::rng();
        let assignment = assignment();
        let endorsements = (0..3)
            .map(|_| {
                let secret = Scalar::random(&mut rng);
                Endorsement {
                    signer: G1Projective::generator() * secret,
                    signature: schnorr::sign(
                        &mut rng,
                        &G1Projective::generator(),
                        &secret,
                        &assignment.to_bytes(),
                    ),
                }
            })
            .collect::<Vec<_>>();
        let signed = SignedAssignment {
            assignment: assignment.clone(),
            endorsements: endorsements.clone(),
        };
        assert_eq!(signed.verify(), Verification::Verified);

        let mut altered = signed.clone();
        altered.assignment.address = "203.0.113.9:443".to_string();
        assert_eq!(altered.verify(), Verification::Failed);

        let unendorsed = SignedAssignment {
            assignment,
            endorsements: Vec::new(),
        };
        assert_eq!(unendorsed.verify(), Verification::Failed);
    }

    #[test]
    fn vote_payloads_depend_only_on_the_message() {
        assert_eq!(vote_payload(3), vote_payload(3));
        assert_ne!(vote_payload(3), vote_payload(4));
    }

    #[test]
    fn events_decode_from_their_encoding() {
        let event = Event::MessageBroadcast {
            id: 1,
            text: "hello".to_string(),
            nym: G1Projective::generator(),
        };
        assert_eq!(Event::from_bytes(&event.to_bytes()).unwrap(), event);
        assert_eq!(event.name(), "MessageBroadcast");
        assert!(Event::from_bytes(&[0xff; 3]).is_err());
    }
}
