mod test_utils;

use anonrep_protocol::{
    logging,
    runtime::{ActorHandle, Network, Role},
    Client, Coordinator, NodeId, Phase, Server, ServerConfig,
};
use std::time::Duration;
use test_utils::{client_config, coordinator_config, seeded_rng};

/// Poll `handle` until `check` holds, giving up after a few seconds.
async fn eventually<R, F>(handle: &ActorHandle<R>, check: F)
where
    R: Role,
    F: Fn(&R) -> bool + Clone + Send + 'static,
{
    for _ in 0..400 {
        let check = check.clone();
        if handle.inspect(move |role| check(role)).await.unwrap() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("{} never reached the expected state", handle.id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_round_runs_over_channels() {
    let _guard = logging::test_subscriber();
    let mut rng = seeded_rng();

    let coordinator = Coordinator::new(&mut rng, coordinator_config());
    let servers = (1..=2)
        .map(|i| Server::new(&mut rng, NodeId::Server(i), ServerConfig::default()))
        .collect();
    let clients = (1..=2)
        .map(|i| Client::new(&mut rng, NodeId::Client(i), client_config()))
        .collect();
    let network = Network::launch(&mut rng, coordinator, servers, clients, 64)
        .await
        .unwrap();

    eventually(&network.coordinator, |c: &Coordinator| c.servers().len() == 2).await;
    network
        .coordinator
        .act(|c, _| c.finish_configuration().map(|()| Vec::new()))
        .await
        .unwrap();
    for client in &network.clients {
        eventually(client, |c: &Client| c.phase() == Phase::ReadyForNewRound).await;
    }

    network.coordinator.act(|c, rng| c.start_round(rng)).await.unwrap();
    for client in &network.clients {
        eventually(client, |c: &Client| c.nym().is_some()).await;
    }
    assert_eq!(
        network.coordinator.inspect(|c| c.phase()).await.unwrap(),
        Phase::Message
    );

    network.clients[0]
        .act(|c, rng| c.post(rng, "over channels", 1))
        .await
        .unwrap();
    eventually(&network.clients[1], |c: &Client| c.messages().len() == 1).await;

    network.coordinator.act(|c, _| c.start_vote()).await.unwrap();
    eventually(&network.clients[1], |c: &Client| c.phase() == Phase::Vote).await;
    network.clients[1]
        .act(|c, rng| c.vote(rng, 1, true))
        .await
        .unwrap();
    eventually(&network.clients[1], |c: &Client| c.replies() == [true]).await;

    network.coordinator.act(|c, _| c.end_round()).await.unwrap();
    eventually(&network.coordinator, |c: &Coordinator| {
        c.phase() == Phase::ReadyForNewRound
    })
    .await;
    eventually(&network.clients[0], |c: &Client| c.reputation() == 6).await;
    eventually(&network.clients[1], |c: &Client| c.reputation() == 5).await;

    for server in network.servers {
        server.shutdown().await.unwrap();
    }
}
