#![allow(dead_code)]

use anonrep_protocol::{
    runtime::Envelope, Client, ClientConfig, Coordinator, CoordinatorConfig, Error, NodeId,
    Outbound, Server, ServerConfig,
};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::VecDeque;

// Seeded rng for replicable tests.
pub fn seeded_rng() -> StdRng {
    const TEST_RNG_SEED: [u8; 32] = *b"NEVER USE THIS FOR ANYTHING REAL";
    StdRng::from_seed(TEST_RNG_SEED)
}

/// Small parameters so that setting up a coordinator takes milliseconds.
pub fn coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        fujiokam_prime_bits: 48,
        honesty_proof_size: 8,
        ..CoordinatorConfig::default()
    }
}

/// Client parameters matching [`coordinator_config`].
pub fn client_config() -> ClientConfig {
    ClientConfig {
        honesty_proof_size: coordinator_config().honesty_proof_size,
        ..ClientConfig::default()
    }
}

/// Every party of a deployment, connected by a FIFO queue instead of a network.
pub struct Deployment {
    pub coordinator: Coordinator,
    pub servers: Vec<Server>,
    pub clients: Vec<Client>,
    queue: VecDeque<Envelope>,
}

impl Deployment {
    /// Register `servers` servers, close configuration, then register `clients` clients and let
    /// them finish their honesty checks.
    pub fn new(rng: &mut StdRng, servers: u32, clients: u32) -> Self {
        let coordinator = Coordinator::new(&mut *rng, coordinator_config());
        let servers = (1..=servers)
            .map(|i| Server::new(&mut *rng, NodeId::Server(i), ServerConfig::default()))
            .collect();
        let clients = (1..=clients)
            .map(|i| Client::new(&mut *rng, NodeId::Client(i), client_config()))
            .collect();
        let mut deployment = Self {
            coordinator,
            servers,
            clients,
            queue: VecDeque::new(),
        };

        let registrations: Vec<_> = deployment
            .servers
            .iter()
            .map(|server| (server.id(), server.register()))
            .collect();
        for (id, register) in registrations {
            deployment.send(id, vec![register]);
        }
        deployment.settle(rng);
        deployment.coordinator.finish_configuration().unwrap();

        let registrations: Vec<_> = deployment
            .clients
            .iter()
            .map(|client| (client.id(), client.register()))
            .collect();
        for (id, register) in registrations {
            deployment.send(id, vec![register]);
        }
        deployment.settle(rng);
        deployment
    }

    /// Queue events from `from`.
    pub fn send(&mut self, from: NodeId, outbound: Vec<Outbound>) {
        self.queue
            .extend(outbound.into_iter().map(|out| Envelope::new(from, out)));
    }

    /// Deliver queued events until none are left, panicking on the first rejected one.
    pub fn settle(&mut self, rng: &mut StdRng) {
        let errors = self.settle_collecting(rng);
        assert!(errors.is_empty(), "events were rejected: {:?}", errors);
    }

    /// Deliver queued events until none are left, returning the rejected ones.
    pub fn settle_collecting(&mut self, rng: &mut StdRng) -> Vec<(NodeId, Error)> {
        let mut errors = Vec::new();
        while let Some(Envelope { from, to, event }) = self.queue.pop_front() {
            let result = match to {
                NodeId::Coordinator => self.coordinator.handle(from, event, &mut *rng),
                NodeId::Server(_) => self.server_mut(to).handle(from, event, &mut *rng),
                NodeId::Client(_) => self.client_mut(to).handle(from, event, &mut *rng),
            };
            match result {
                Ok(outbound) => self.send(to, outbound),
                Err(error) => errors.push((to, error)),
            }
        }
        errors
    }

    /// Run the coordinator's `start_round` and deliver everything it causes.
    pub fn start_round(&mut self, rng: &mut StdRng) {
        let outbound = self.coordinator.start_round(&mut *rng).unwrap();
        self.send(NodeId::Coordinator, outbound);
        self.settle(rng);
    }

    pub fn start_vote(&mut self, rng: &mut StdRng) {
        let outbound = self.coordinator.start_vote().unwrap();
        self.send(NodeId::Coordinator, outbound);
        self.settle(rng);
    }

    pub fn end_round(&mut self, rng: &mut StdRng) {
        let outbound = self.coordinator.end_round().unwrap();
        self.send(NodeId::Coordinator, outbound);
        self.settle(rng);
    }

    /// Let client `index` act and deliver the result.
    pub fn client_acts<F>(&mut self, rng: &mut StdRng, index: usize, action: F)
    where
        F: FnOnce(&Client, &mut StdRng) -> Result<Vec<Outbound>, Error>,
    {
        let outbound = action(&self.clients[index], &mut *rng).unwrap();
        let id = self.clients[index].id();
        self.send(id, outbound);
        self.settle(rng);
    }

    fn server_mut(&mut self, id: NodeId) -> &mut Server {
        self.servers
            .iter_mut()
            .find(|server| server.id() == id)
            .unwrap()
    }

    fn client_mut(&mut self, id: NodeId) -> &mut Client {
        self.clients
            .iter_mut()
            .find(|client| client.id() == id)
            .unwrap()
    }
}
