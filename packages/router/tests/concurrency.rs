//! Integration tests for concurrent relayers and applications

mod helpers;

use std::{collections::BTreeSet, thread};

use helpers::*;
use ibc_eureka_router::PacketOutcome;
use ibc_eureka_types::{Height, MsgRecvPacket};

const THREADS: usize = 8;

#[test]
fn concurrent_recv_of_same_packet_applies_once() {
    let env = setup();
    let packet = incoming_packet(&env, 1);
    attest(&env, 101, COUNTERPARTY_NOW + 5, vec![packet_commitment_fact(&packet)]);
    let msg = MsgRecvPacket {
        packet,
        proof_commitment: vec![],
        proof_height: Height::at(101),
    };

    let outcomes: Vec<PacketOutcome> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| env.router.recv_packet(&relayer(), &msg).unwrap().value))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let applied = outcomes
        .iter()
        .filter(|o| **o == PacketOutcome::Applied)
        .count();
    assert_eq!(applied, 1);
    assert_eq!(outcomes.len() - applied, THREADS - 1);
    assert_eq!(MockApp::count(&env.app.recv_calls), 1);
}

#[test]
fn concurrent_sends_get_distinct_gap_free_sequences() {
    const PER_THREAD: usize = 10;
    let env = setup();

    let sequences: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..PER_THREAD)
                        .map(|_| {
                            env.router
                                .send_packet(&app_caller(), send_msg(&env, NOW + 100))
                                .unwrap()
                                .value
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let total = (THREADS * PER_THREAD) as u64;
    let unique: BTreeSet<u64> = sequences.iter().copied().collect();
    assert_eq!(sequences.len() as u64, total);
    assert_eq!(unique, (1..=total).collect());
    assert_eq!(env.router.next_sequence_send(&env.client_id).unwrap(), total + 1);
}
