//! Per-role configuration.
//!
//! Every config deserializes with defaults for the fields it omits, so a deployment only has to
//! spell out what it changes.

use serde::{Deserialize, Serialize};

/// Reputation credited to a client when it joins.
pub const STARTING_CREDIT: u64 = 5;

/// Rounds per generator in the honesty proof of the Fujisaki-Okamoto base.
pub const HONESTY_PROOF_SIZE: usize = 80;

/// Bit length of each safe prime in the Fujisaki-Okamoto modulus.
pub const FUJIOKAM_PRIME_BITS: u64 = 256;

/// Capacity of every bounded channel in the runtime.
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// Label the round-zero Pedersen base is hashed from.
pub const DEFAULT_PEDERSEN_LABEL: &str = "anonrep round zero";

/// Parameters of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Reputation given to each newly admitted client.
    pub starting_credit: u64,
    /// Rounds per generator in each honesty proof.
    pub honesty_proof_size: usize,
    /// Bit length of each prime factor of the Fujisaki-Okamoto modulus.
    pub fujiokam_prime_bits: u64,
    /// Label the initial Pedersen base is derived from.
    pub pedersen_label: String,
    /// Capacity of the coordinator's inbox.
    pub inbox_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            starting_credit: STARTING_CREDIT,
            honesty_proof_size: HONESTY_PROOF_SIZE,
            fujiokam_prime_bits: FUJIOKAM_PRIME_BITS,
            pedersen_label: DEFAULT_PEDERSEN_LABEL.to_string(),
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

/// Parameters of a shuffling server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Capacity of the server's inbox.
    pub inbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

/// Parameters of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Refuse to continue if the coordinator's generators fail the honesty check. When unset, a
    /// failure is logged and the client carries on.
    pub strict_honesty: bool,
    /// Rounds per generator the client demands in the coordinator's honesty proof.
    pub honesty_proof_size: usize,
    /// Capacity of the client's inbox.
    pub inbox_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            strict_honesty: true,
            honesty_proof_size: HONESTY_PROOF_SIZE,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::de::value::{self, MapDeserializer};

    #[test]
    fn defaults_match_the_deployment_constants() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.starting_credit, 5);
        assert_eq!(config.honesty_proof_size, 80);
        assert_eq!(config.fujiokam_prime_bits, 256);
        assert!(ClientConfig::default().strict_honesty);
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let fields = vec![("strict_honesty", false)].into_iter();
        let partial = ClientConfig::deserialize(MapDeserializer::<_, value::Error>::new(fields))
            .expect("a partial config deserializes");
        assert!(!partial.strict_honesty);
        assert_eq!(partial.honesty_proof_size, HONESTY_PROOF_SIZE);
        assert_eq!(partial.inbox_capacity, DEFAULT_INBOX_CAPACITY);

        let fields = vec![("starting_credit", 7u64)].into_iter();
        let partial =
            CoordinatorConfig::deserialize(MapDeserializer::<_, value::Error>::new(fields))
                .expect("a partial config deserializes");
        assert_eq!(partial.starting_credit, 7);
        assert_eq!(partial.honesty_proof_size, HONESTY_PROOF_SIZE);
    }
}
