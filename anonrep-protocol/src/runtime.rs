/*!
Runs roles as tokio tasks.

Every role runs in its own task with an inbox of [`Envelope`]s and a queue of operator commands.
A [`Router`] task owns the address book and forwards envelopes in the order it receives them, so
two events sent by one party arrive in the order they were sent.

Roles stay synchronous: a task takes one envelope or command at a time, runs the role's handler,
and hands whatever the handler returns to the router.
*/

use crate::{logging::RUNTIME_TARGET, Client, Coordinator, Error, Event, NodeId, Outbound, Server};
use rand::rngs::StdRng;
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// An event in transit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The sender.
    pub from: NodeId,
    /// The recipient.
    pub to: NodeId,
    /// The event.
    pub event: Event,
}

impl Envelope {
    /// Stamp an outbound event with its sender.
    pub fn new(from: NodeId, outbound: Outbound) -> Self {
        Self {
            from,
            to: outbound.to,
            event: outbound.event,
        }
    }
}

/// A party that can run in a task.
pub trait Role: Send + 'static {
    /// The party's address.
    fn id(&self) -> NodeId;

    /// Process one event.
    fn handle_event(
        &mut self,
        from: NodeId,
        event: Event,
        rng: &mut StdRng,
    ) -> Result<Vec<Outbound>, Error>;
}

impl Role for Coordinator {
    fn id(&self) -> NodeId {
        NodeId::Coordinator
    }

    fn handle_event(
        &mut self,
        from: NodeId,
        event: Event,
        rng: &mut StdRng,
    ) -> Result<Vec<Outbound>, Error> {
        self.handle(from, event, rng)
    }
}

impl Role for Server {
    fn id(&self) -> NodeId {
        Server::id(self)
    }

    fn handle_event(
        &mut self,
        from: NodeId,
        event: Event,
        rng: &mut StdRng,
    ) -> Result<Vec<Outbound>, Error> {
        self.handle(from, event, rng)
    }
}

impl Role for Client {
    fn id(&self) -> NodeId {
        Client::id(self)
    }

    fn handle_event(
        &mut self,
        from: NodeId,
        event: Event,
        rng: &mut StdRng,
    ) -> Result<Vec<Outbound>, Error> {
        self.handle(from, event, rng)
    }
}

#[derive(Debug)]
enum RouterMessage {
    Register(NodeId, mpsc::Sender<Envelope>),
    Deliver(Envelope),
}

/// Handle to the task that forwards envelopes between inboxes.
#[derive(Debug, Clone)]
pub struct Router {
    sender: mpsc::Sender<RouterMessage>,
}

impl Router {
    /// Start the router task.
    pub fn spawn(capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let task = tokio::spawn(route(receiver));
        (Self { sender }, task)
    }

    /// Queue an envelope for delivery.
    pub async fn deliver(&self, envelope: Envelope) -> Result<(), Error> {
        self.sender
            .send(RouterMessage::Deliver(envelope))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    async fn register(&self, id: NodeId, inbox: mpsc::Sender<Envelope>) -> Result<(), Error> {
        self.sender
            .send(RouterMessage::Register(id, inbox))
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}

async fn route(mut receiver: mpsc::Receiver<RouterMessage>) {
    let mut inboxes: HashMap<NodeId, mpsc::Sender<Envelope>> = HashMap::new();
    while let Some(message) = receiver.recv().await {
        match message {
            RouterMessage::Register(id, inbox) => {
                debug!(target: RUNTIME_TARGET, %id, "route added");
                let _ = inboxes.insert(id, inbox);
            }
            RouterMessage::Deliver(envelope) => {
                let (from, to, event) = (envelope.from, envelope.to, envelope.event.name());
                let delivered = match inboxes.get(&to) {
                    Some(inbox) => inbox.send(envelope).await.is_ok(),
                    None => false,
                };
                if !delivered {
                    let error = Error::MissingPeer(to);
                    warn!(target: RUNTIME_TARGET, %from, event, %error, "dropped event");
                }
            }
        }
    }
    info!(target: RUNTIME_TARGET, "router stopped");
}

type Command<R> = Box<dyn FnOnce(&mut R, &mut StdRng) -> Vec<Outbound> + Send>;

/// Handle to a running role.
#[derive(Debug)]
pub struct ActorHandle<R> {
    id: NodeId,
    commands: mpsc::Sender<Command<R>>,
    task: JoinHandle<()>,
}

impl<R: Role> ActorHandle<R> {
    /// The address of the role.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Run `f` on the role inside its task. Events `f` returns are routed like handler output.
    pub async fn call<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut R, &mut StdRng) -> (T, Vec<Outbound>) + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let command: Command<R> = Box::new(move |role, rng| {
            let (value, outbound) = f(role, rng);
            let _ = reply.send(value);
            outbound
        });
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ChannelClosed)?;
        receiver.await.map_err(|_| Error::ChannelClosed)
    }

    /// Run an operator action, such as starting a round or posting a message.
    pub async fn act<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut R, &mut StdRng) -> Result<Vec<Outbound>, Error> + Send + 'static,
    {
        self.call(move |role, rng| match f(role, rng) {
            Ok(outbound) => (Ok(()), outbound),
            Err(error) => (Err(error), Vec::new()),
        })
        .await?
    }

    /// Read from the role's state.
    pub async fn inspect<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> T + Send + 'static,
    {
        self.call(move |role, _| (f(role), Vec::new())).await
    }

    /// Stop the task once it has drained its command queue.
    pub async fn shutdown(self) -> Result<(), Error> {
        drop(self.commands);
        self.task.await.map_err(|_| Error::ChannelClosed)
    }
}

/// Start `role` in a new task and register its inbox with `router`.
pub async fn spawn<R: Role>(
    router: &Router,
    role: R,
    rng: StdRng,
    capacity: usize,
) -> Result<ActorHandle<R>, Error> {
    let id = role.id();
    let (inbox_sender, inbox) = mpsc::channel(capacity);
    let (commands, command_receiver) = mpsc::channel(capacity);
    router.register(id, inbox_sender).await?;
    let task = tokio::spawn(run(role, rng, inbox, command_receiver, router.clone()));
    Ok(ActorHandle { id, commands, task })
}

async fn run<R: Role>(
    mut role: R,
    mut rng: StdRng,
    mut inbox: mpsc::Receiver<Envelope>,
    mut commands: mpsc::Receiver<Command<R>>,
    router: Router,
) {
    let id = role.id();
    loop {
        let outbound = tokio::select! {
            Some(envelope) = inbox.recv() => {
                let event = envelope.event.name();
                debug!(target: RUNTIME_TARGET, %id, from = %envelope.from, event, "handling");
                match role.handle_event(envelope.from, envelope.event, &mut rng) {
                    Ok(outbound) => outbound,
                    Err(error) => {
                        warn!(target: RUNTIME_TARGET, %id, event, %error, "event rejected");
                        Vec::new()
                    }
                }
            }
            command = commands.recv() => match command {
                Some(command) => command(&mut role, &mut rng),
                None => break,
            },
        };
        for outbound in outbound {
            if router.deliver(Envelope::new(id, outbound)).await.is_err() {
                warn!(target: RUNTIME_TARGET, %id, "router is gone");
                return;
            }
        }
    }
    debug!(target: RUNTIME_TARGET, %id, "task stopped");
}

/// A coordinator, a server chain and a set of clients, each running in its own task.
#[derive(Debug)]
pub struct Network {
    /// The router connecting every party.
    pub router: Router,
    /// The coordinator.
    pub coordinator: ActorHandle<Coordinator>,
    /// The servers, in chain order.
    pub servers: Vec<ActorHandle<Server>>,
    /// The clients.
    pub clients: Vec<ActorHandle<Client>>,
}

impl Network {
    /// Start every party and queue the registrations: servers first, in order, then clients.
    ///
    /// `rng` seeds one generator per party. The coordinator still has to close configuration once
    /// the servers have joined.
    pub async fn launch(
        rng: &mut StdRng,
        coordinator: Coordinator,
        servers: Vec<Server>,
        clients: Vec<Client>,
        capacity: usize,
    ) -> Result<Self, Error> {
        use rand::SeedableRng;

        let (router, _) = Router::spawn(capacity);
        let mut fork = || StdRng::from_rng(&mut *rng).expect("seeding from a StdRng does not fail");

        let coordinator = spawn(&router, coordinator, fork(), capacity).await?;
        let mut server_handles = Vec::with_capacity(servers.len());
        for server in servers {
            let register = server.register();
            let handle = spawn(&router, server, fork(), capacity).await?;
            router.deliver(Envelope::new(handle.id(), register)).await?;
            server_handles.push(handle);
        }
        let mut client_handles = Vec::with_capacity(clients.len());
        for client in clients {
            let register = client.register();
            let handle = spawn(&router, client, fork(), capacity).await?;
            router.deliver(Envelope::new(handle.id(), register)).await?;
            client_handles.push(handle);
        }

        Ok(Self {
            router,
            coordinator,
            servers: server_handles,
            clients: client_handles,
        })
    }
}
