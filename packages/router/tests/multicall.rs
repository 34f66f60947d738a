//! Integration tests for atomic relayer batches

mod helpers;

use helpers::*;
use ibc_eureka_router::{
    LightClientError, MsgOutcome, PacketOutcome, RouterError, RouterEvent, RouterMsg,
    UpdateResult,
};
use ibc_eureka_types::{
    ics24::{self, CommitmentKind},
    Height, MsgAckPacket, MsgRecvPacket,
};

const TS_101: u64 = COUNTERPARTY_NOW + 12;

fn recv(env: &TestEnv, sequence: u64) -> (RouterMsg, ibc_eureka_types::Packet) {
    let packet = incoming_packet(env, sequence);
    let msg = RouterMsg::RecvPacket(MsgRecvPacket {
        packet: packet.clone(),
        proof_commitment: vec![],
        proof_height: Height::at(101),
    });
    (msg, packet)
}

#[test]
fn update_then_recv_in_one_batch() {
    let env = setup();
    let (recv_1, packet_1) = recv(&env, 1);
    let (recv_2, packet_2) = recv(&env, 2);
    let update = RouterMsg::UpdateClient {
        client_id: env.client_id.clone(),
        client_message: header(
            101,
            TS_101,
            vec![
                packet_commitment_fact(&packet_1),
                packet_commitment_fact(&packet_2),
            ],
            2,
        ),
    };

    let res = env
        .router
        .multicall(&relayer(), &[update, recv_1.clone(), recv_2, recv_1])
        .unwrap();
    assert_eq!(
        res.value,
        vec![
            MsgOutcome::Update(UpdateResult::Update),
            MsgOutcome::Packet(PacketOutcome::Applied),
            MsgOutcome::Packet(PacketOutcome::Applied),
            MsgOutcome::Packet(PacketOutcome::Noop),
        ]
    );
    assert!(matches!(res.events[0], RouterEvent::ClientUpdated { .. }));
    assert_eq!(res.events.last(), Some(&RouterEvent::Noop));
    assert_eq!(MockApp::count(&env.app.recv_calls), 2);
    assert_eq!(env.router.latest_height(&env.client_id).unwrap(), Height::at(101));
}

#[test]
fn failing_message_discards_whole_batch() {
    let env = setup();
    let (recv_1, packet_1) = recv(&env, 1);
    let (recv_2, _) = recv(&env, 2);
    let update = RouterMsg::UpdateClient {
        client_id: env.client_id.clone(),
        client_message: header(101, TS_101, vec![packet_commitment_fact(&packet_1)], 2),
    };

    let res = env.router.multicall(&relayer(), &[update, recv_1, recv_2]);
    assert!(matches!(
        &res,
        Err(RouterError::MulticallFailed { index: 2, source })
            if matches!(**source, RouterError::LightClient {
                source: LightClientError::VerificationFailed { .. },
                ..
            })
    ));

    assert_eq!(
        env.router.latest_height(&env.client_id).unwrap(),
        Height::at(INITIAL_HEIGHT)
    );
    assert_eq!(
        env.router
            .commitment(&env.client_id, CommitmentKind::PacketReceipt, 1)
            .unwrap(),
        None
    );
}

#[test]
fn failed_batch_restores_deleted_commitments() {
    let env = setup();
    let sent = env
        .router
        .send_packet(&app_caller(), send_msg(&env, NOW + 100))
        .unwrap();
    let RouterEvent::SendPacket { packet } = &sent.events[0] else {
        panic!("unexpected events {:?}", sent.events);
    };
    attest(&env, 101, NOW + 10, vec![ack_fact(packet, SUCCESS_ACK)]);

    let ack = RouterMsg::AckPacket(MsgAckPacket {
        packet: packet.clone(),
        acknowledgement: SUCCESS_ACK.to_vec(),
        proof_acked: vec![],
        proof_height: Height::at(101),
    });
    let update = RouterMsg::UpdateClient {
        client_id: env.client_id.clone(),
        client_message: header(102, NOW + 20, vec![], 2),
    };
    let (unattested, _) = recv(&env, 1);

    let res = env
        .router
        .multicall(&relayer(), &[update, ack.clone(), unattested]);
    assert!(matches!(res, Err(RouterError::MulticallFailed { index: 2, .. })));
    assert_eq!(
        env.router
            .commitment(&env.client_id, CommitmentKind::PacketCommitment, 1)
            .unwrap(),
        Some(ics24::packet_commitment_bytes32(packet))
    );
    assert_eq!(env.router.latest_height(&env.client_id).unwrap(), Height::at(101));
    // callbacks already made are not undone
    assert_eq!(MockApp::count(&env.app.ack_calls), 1);

    let res = env.router.multicall(&relayer(), &[ack]).unwrap();
    assert_eq!(res.value, vec![MsgOutcome::Packet(PacketOutcome::Applied)]);
    assert_eq!(
        env.router
            .commitment(&env.client_id, CommitmentKind::PacketCommitment, 1)
            .unwrap(),
        None
    );
}

#[test]
fn unknown_client_reports_first_referencing_message() {
    let env = setup();
    let (recv_1, _) = recv(&env, 1);
    let update = RouterMsg::UpdateClient {
        client_id: "attestor-42".to_string(),
        client_message: vec![],
    };

    let res = env.router.multicall(&relayer(), &[recv_1, update]);
    assert!(matches!(
        res,
        Err(RouterError::MulticallFailed { index: 1, source })
            if matches!(*source, RouterError::ClientNotFound(_))
    ));
}

#[test]
fn empty_batch_is_a_no_op() {
    let env = setup();
    let res = env.router.multicall(&relayer(), &[]).unwrap();
    assert!(res.value.is_empty());
    assert!(res.events.is_empty());
}
