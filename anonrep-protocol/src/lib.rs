/*!
This crate describes the round protocol of an anonymous reputation system \[1\] built on the
primitives in `anonrep-crypto`.

Three roles take part. A coordinator keeps the reputation table and the message board. A chain of
servers shuffles the table at the start of every round, so each client appears under a fresh
pseudonym, and shuffles it back at the end of the round. Clients post messages under their
pseudonyms, prove in zero knowledge that they hold enough reputation, and vote on each other's
messages with linkable ring signatures.

Every role is a state machine that consumes one [`Event`] at a time and returns the events it
wants delivered. The [`runtime`] module runs roles as tokio tasks connected by channels.

 # References

 1: Ennan Zhai, David Isaac Wolinsky, Ruichuan Chen, Ewa Syta, Chao Teng, and Bryan Ford.
 "AnonRep: Towards Tracking-Resistant Anonymous Reputation". NSDI 2016.
 */
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]
pub mod client;
pub mod config;
pub mod coordinator;
pub mod event;
pub mod logging;
pub mod runtime;
pub mod server;
pub mod spend;
pub mod table;

pub use client::Client;
pub use config::{ClientConfig, CoordinatorConfig, ServerConfig};
pub use coordinator::Coordinator;
pub use event::{Event, Outbound};
pub use server::Server;
pub use spend::{verify_spend, SpendCheckFailure, SpendProof};
pub use table::{KeyId, TableTranscript};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[allow(unused)]
mod types {
    pub use anonrep_crypto::{
        fujiokam::*, lrs, pedersen::*, schnorr, shuffle::*, BlindingFactor, Encode,
        SerializeElement,
    };
    pub use bls12_381::{G1Affine, G1Projective, Scalar};
    pub use group::{Group, GroupEncoding};
}

/// Trait synonym for a cryptographically secure random number generator.
pub trait Rng: rand::CryptoRng + rand::RngCore {}
impl<T: rand::CryptoRng + rand::RngCore> Rng for T {}

/// The result of a verification of some property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the result of a verification should always be checked"]
pub enum Verification {
    /// A verification succeeded.
    Verified,
    /// A verification failed.
    Failed,
}

impl From<bool> for Verification {
    fn from(passed: bool) -> Self {
        if passed {
            Verification::Verified
        } else {
            Verification::Failed
        }
    }
}

/// Addresses of the parties in a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeId {
    /// The single coordinator.
    Coordinator,
    /// A shuffling server.
    Server(u32),
    /// A client.
    Client(u32),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Coordinator => write!(f, "coordinator"),
            NodeId::Server(id) => write!(f, "server-{}", id),
            NodeId::Client(id) => write!(f, "client-{}", id),
        }
    }
}

/// Where a party stands in the round cycle.
///
/// The coordinator moves `Configuration → ReadyForNewRound → Announce → Message → Vote →
/// RoundEnd → ReadyForNewRound`; voting is optional, so `Message` may also go straight to
/// `RoundEnd`. Clients track the same phases from the broadcasts they receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Servers are still joining the chain.
    Configuration,
    /// Between rounds; the table holds long-term keys.
    ReadyForNewRound,
    /// The table is travelling through the server chain.
    Announce,
    /// Pseudonyms are public and clients may post.
    Message,
    /// Clients may vote on the round's messages.
    Vote,
    /// The table is travelling back through the server chain.
    RoundEnd,
}

/// Errors raised while handling protocol events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The coordinator's Fujisaki-Okamoto generators failed the honesty check.
    #[error("the commitment generators failed the honesty check at position {index}")]
    DishonestGenerators {
        /// The one-based position of the first failing round.
        index: usize,
    },
    /// A shuffle in the server chain did not verify.
    #[error("the shuffle produced at hop {hop} of the server chain did not verify")]
    ShuffleRejected {
        /// Zero-based index of the offending hop.
        hop: usize,
    },
    /// A pseudonym or long-term key did not appear where it was expected.
    #[error("key {key} is not in the table")]
    UnknownPseudonym {
        /// The missing key.
        key: KeyId,
    },
    /// An event arrived in a phase that does not accept it.
    #[error("{event} is not accepted during {phase:?}")]
    UnexpectedEvent {
        /// The phase of the receiving party.
        phase: Phase,
        /// The name of the event.
        event: &'static str,
    },
    /// An event came from, or was addressed to, a party that is not known.
    #[error("no known peer {0}")]
    MissingPeer(NodeId),
    /// A channel between tasks was closed.
    #[error("channel closed")]
    ChannelClosed,
    /// A client tried to spend more reputation than it holds.
    #[error("cannot spend {ind} with reputation {reputation}")]
    InsufficientReputation {
        /// The requested spend.
        ind: u64,
        /// The current reputation.
        reputation: i64,
    },
    /// A client acted before it received the parameters the action needs.
    #[error("{0} is not available yet")]
    NotReady(&'static str),
    /// An underlying cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] anonrep_crypto::Error),
}
