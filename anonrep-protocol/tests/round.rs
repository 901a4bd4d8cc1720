mod test_utils;

use anonrep_protocol::{Error, Event, NodeId, Phase};
use test_utils::{seeded_rng, Deployment};

#[test]
fn reputation_follows_votes_across_rounds() {
    let mut rng = seeded_rng();
    let mut deployment = Deployment::new(&mut rng, 2, 3);
    for client in &deployment.clients {
        assert!(client.generators_verified());
        assert_eq!(client.phase(), Phase::ReadyForNewRound);
    }

    deployment.start_round(&mut rng);
    assert_eq!(deployment.coordinator.phase(), Phase::Message);
    assert_eq!(deployment.coordinator.table().len(), 3);
    let first_nyms: Vec<_> = deployment
        .clients
        .iter()
        .map(|client| *client.nym().expect("every client has a pseudonym"))
        .collect();
    for (client, nym) in deployment.clients.iter().zip(&first_nyms) {
        assert_eq!(client.reputation(), 5);
        // Pseudonyms do not reveal long-term keys.
        assert_ne!(nym, client.public_key());
        assert!(deployment.coordinator.table().position(nym).is_some());
    }

    deployment.client_acts(&mut rng, 0, |client, rng| client.post(rng, "first", 2));
    deployment.client_acts(&mut rng, 1, |client, rng| client.post(rng, "second", 0));
    assert_eq!(deployment.coordinator.message_count(), 2);
    for client in &deployment.clients {
        let texts: Vec<_> = client.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
    assert_eq!(deployment.clients[0].messages()[0].nym, first_nyms[0]);

    deployment.start_vote(&mut rng);
    deployment.client_acts(&mut rng, 1, |client, rng| client.vote(rng, 1, true));
    deployment.client_acts(&mut rng, 2, |client, rng| client.vote(rng, 1, true));
    deployment.client_acts(&mut rng, 0, |client, rng| client.vote(rng, 2, false));
    // A second vote on the same message carries the same tag.
    deployment.client_acts(&mut rng, 1, |client, rng| client.vote(rng, 1, false));
    assert_eq!(deployment.clients[0].replies(), &[true, true]);
    assert_eq!(deployment.clients[1].replies(), &[true, true, false]);

    deployment.end_round(&mut rng);
    assert_eq!(deployment.coordinator.phase(), Phase::ReadyForNewRound);
    let reputations: Vec<_> = deployment.clients.iter().map(|c| c.reputation()).collect();
    assert_eq!(reputations, vec![7, 4, 5]);
    // Between rounds the table holds long-term keys again.
    for client in &deployment.clients {
        assert!(deployment
            .coordinator
            .table()
            .position(client.public_key())
            .is_some());
        assert_eq!(client.phase(), Phase::ReadyForNewRound);
    }

    deployment.start_round(&mut rng);
    let second_nym = *deployment.clients[0].nym().unwrap();
    assert_ne!(second_nym, first_nyms[0]);
    assert!(deployment.clients[0].messages().is_empty());

    // The updated commitment still opens to the whole reputation.
    deployment.client_acts(&mut rng, 0, |client, rng| client.post(rng, "again", 7));
    assert_eq!(deployment.clients[0].replies().last(), Some(&true));

    let overspend = deployment.clients[1].post(&mut rng, "too much", 5);
    assert_eq!(
        overspend,
        Err(Error::InsufficientReputation {
            ind: 5,
            reputation: 4
        })
    );
}

#[test]
fn tampered_spends_are_refused() {
    let mut rng = seeded_rng();
    let mut deployment = Deployment::new(&mut rng, 1, 2);
    deployment.start_round(&mut rng);

    let mut outbound = deployment.clients[0].post(&mut rng, "boast", 1).unwrap();
    match &mut outbound[0].event {
        Event::Message { spend, .. } => spend.ind = 3,
        other => panic!("unexpected event {:?}", other),
    }
    deployment.send(NodeId::Client(1), outbound);
    deployment.settle(&mut rng);

    assert_eq!(deployment.clients[0].replies(), &[false]);
    assert_eq!(deployment.coordinator.message_count(), 0);
    assert!(deployment.clients[1].messages().is_empty());
}

#[test]
fn events_outside_their_phase_are_rejected() {
    let mut rng = seeded_rng();
    let mut deployment = Deployment::new(&mut rng, 1, 2);
    deployment.start_round(&mut rng);

    let late = deployment.clients[0].post(&mut rng, "late", 1).unwrap();
    deployment.start_vote(&mut rng);
    deployment.send(NodeId::Client(1), late);
    let errors = deployment.settle_collecting(&mut rng);
    assert_eq!(
        errors,
        vec![(
            NodeId::Coordinator,
            Error::UnexpectedEvent {
                phase: Phase::Vote,
                event: "Message"
            }
        )]
    );

    // Clients refuse to act out of phase as well.
    assert!(matches!(
        deployment.clients[0].post(&mut rng, "late again", 1),
        Err(Error::UnexpectedEvent {
            phase: Phase::Vote,
            ..
        })
    ));

    // Only the coordinator talks to clients.
    let forged = deployment.clients[1].handle(NodeId::Server(1), Event::VoteStart, &mut rng);
    assert_eq!(forged, Err(Error::MissingPeer(NodeId::Server(1))));
}

#[test]
fn late_clients_join_at_the_next_round() {
    let mut rng = seeded_rng();
    let mut deployment = Deployment::new(&mut rng, 1, 1);
    deployment.start_round(&mut rng);

    let late = anonrep_protocol::Client::new(
        &mut rng,
        NodeId::Client(9),
        test_utils::client_config(),
    );
    let register = late.register();
    deployment.clients.push(late);
    deployment.send(NodeId::Client(9), vec![register]);
    deployment.settle(&mut rng);
    assert_eq!(deployment.coordinator.table().len(), 1);
    assert!(deployment.clients[1].nym().is_none());

    deployment.end_round(&mut rng);
    deployment.start_round(&mut rng);
    assert_eq!(deployment.coordinator.table().len(), 2);
    assert!(deployment.clients[1].nym().is_some());
    assert_eq!(deployment.clients[1].reputation(), 5);
}
