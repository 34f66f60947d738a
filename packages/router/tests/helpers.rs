//! Common test utilities and fixtures
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use attestor_light_client::{
    client_state::ClientState,
    test_utils::{addresses, signed_header, signers},
};
use attestor_packet_membership::{PacketCommitments, PacketCompact};
use ibc_eureka_router::{
    AppError, AttestorClient, Caller, IbcApp, ManualClock, OnAcknowledgementPacketCallback,
    OnRecvPacketCallback, OnSendPacketCallback, OnTimeoutPacketCallback, Role, Router,
    RouterConfig,
};
use ibc_eureka_types::{
    ics24, CounterpartyInfo, Height, MsgSendPacket, Packet, Payload, UNIVERSAL_ERROR_ACK,
};

/// Host time at setup
pub const NOW: u64 = 1_700_000_000;
/// Counterparty time at the initial trusted height
pub const COUNTERPARTY_NOW: u64 = 1_699_999_000;
pub const INITIAL_HEIGHT: u64 = 100;
pub const COUNTERPARTY_CLIENT: &str = "client-7";
pub const PORT: &str = "transfer";
pub const APP_ADDRESS: &str = "transfer-app";
pub const SUCCESS_ACK: &[u8] = br#"{"result":"AQ=="}"#;

pub fn merkle_prefix() -> Vec<Vec<u8>> {
    vec![b"ibc".to_vec()]
}

pub fn relayer() -> Caller {
    Caller::new("relayer").with_role(Role::Relayer)
}

pub fn admin() -> Caller {
    Caller::new("admin")
        .with_role(Role::Customizer)
        .with_role(Role::IdCustomizer)
}

pub fn app_caller() -> Caller {
    Caller::new(APP_ADDRESS)
}

/// What the mock application does when it receives a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvBehaviour {
    Ack(Vec<u8>),
    Empty,
    UniversalErrorAck,
    Fail,
    Panic,
}

/// Scripted application counting its callbacks
#[derive(Debug)]
pub struct MockApp {
    pub recv_behaviour: Mutex<RecvBehaviour>,
    pub fail_ack: AtomicBool,
    pub fail_send: AtomicBool,
    pub send_calls: AtomicUsize,
    pub recv_calls: AtomicUsize,
    pub ack_calls: AtomicUsize,
    pub timeout_calls: AtomicUsize,
}

impl Default for MockApp {
    fn default() -> Self {
        Self {
            recv_behaviour: Mutex::new(RecvBehaviour::Ack(SUCCESS_ACK.to_vec())),
            fail_ack: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            send_calls: AtomicUsize::new(0),
            recv_calls: AtomicUsize::new(0),
            ack_calls: AtomicUsize::new(0),
            timeout_calls: AtomicUsize::new(0),
        }
    }
}

impl MockApp {
    pub fn set_recv(&self, behaviour: RecvBehaviour) {
        *self.recv_behaviour.lock().unwrap() = behaviour;
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl IbcApp for MockApp {
    fn on_send_packet(&self, _msg: &OnSendPacketCallback<'_>) -> Result<(), AppError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err("send rejected".into());
        }
        Ok(())
    }

    fn on_recv_packet(&self, _msg: &OnRecvPacketCallback<'_>) -> Result<Vec<u8>, AppError> {
        self.recv_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.recv_behaviour.lock().unwrap().clone();
        match behaviour {
            RecvBehaviour::Ack(ack) => Ok(ack),
            RecvBehaviour::Empty => Ok(vec![]),
            RecvBehaviour::UniversalErrorAck => Ok(UNIVERSAL_ERROR_ACK.to_vec()),
            RecvBehaviour::Fail => Err("recv failed".into()),
            RecvBehaviour::Panic => panic!("application bug"),
        }
    }

    fn on_acknowledgement_packet(
        &self,
        _msg: &OnAcknowledgementPacketCallback<'_>,
    ) -> Result<(), AppError> {
        self.ack_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ack.load(Ordering::SeqCst) {
            return Err("ack failed".into());
        }
        Ok(())
    }

    fn on_timeout_packet(&self, _msg: &OnTimeoutPacketCallback<'_>) -> Result<(), AppError> {
        self.timeout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestEnv {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub app: Arc<MockApp>,
    pub client_id: String,
}

/// Attestor client with two attestors, both required
pub fn attestor_client() -> AttestorClient {
    let client_state =
        ClientState::new(addresses()[..2].to_vec(), 2, Height::at(INITIAL_HEIGHT)).unwrap();
    AttestorClient::new(client_state, COUNTERPARTY_NOW).unwrap()
}

/// Route router logs to the test output; later calls are no-ops
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(RouterConfig::default().log_level())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn setup() -> TestEnv {
    init_tracing();
    let clock = Arc::new(ManualClock::new(NOW));
    let router = Router::new(RouterConfig::default(), clock.clone()).unwrap();
    let app = Arc::new(MockApp::default());

    let client_id = router
        .add_client(
            &admin(),
            CounterpartyInfo {
                client_id: COUNTERPARTY_CLIENT.to_string(),
                merkle_prefix: merkle_prefix(),
            },
            Box::new(attestor_client()),
            None,
        )
        .unwrap()
        .value;
    router
        .add_ibc_app(&admin(), PORT, APP_ADDRESS, app.clone())
        .unwrap();

    TestEnv {
        router,
        clock,
        app,
        client_id,
    }
}

pub fn payload() -> Payload {
    Payload {
        source_port: PORT.to_string(),
        dest_port: PORT.to_string(),
        version: "ics20-1".to_string(),
        encoding: "application/json".to_string(),
        value: br#"{"amount":"100"}"#.to_vec(),
    }
}

/// Packet sent by the counterparty to `env.client_id`
pub fn incoming_packet(env: &TestEnv, sequence: u64) -> Packet {
    Packet {
        sequence,
        source_client: COUNTERPARTY_CLIENT.to_string(),
        dest_client: env.client_id.clone(),
        timeout_timestamp: NOW + 600,
        payloads: vec![payload()],
    }
}

pub fn send_msg(env: &TestEnv, timeout_timestamp: u64) -> MsgSendPacket {
    MsgSendPacket {
        source_client: env.client_id.clone(),
        timeout_timestamp,
        payload: payload(),
    }
}

/// Counterparty store path as seen through the merkle prefix
pub fn counterparty_path(path: &[u8]) -> Vec<u8> {
    ics24::prefixed_path(&merkle_prefix(), path).unwrap().remove(0)
}

/// Fact attesting the counterparty commitment of `packet`
pub fn packet_commitment_fact(packet: &Packet) -> PacketCompact {
    PacketCompact::for_path(
        &counterparty_path(&ics24::packet_commitment_path(
            &packet.source_client,
            packet.sequence,
        )),
        ics24::packet_commitment_bytes32(packet),
    )
}

/// Fact attesting the counterparty acknowledgement of `packet`
pub fn ack_fact(packet: &Packet, ack: &[u8]) -> PacketCompact {
    PacketCompact::for_path(
        &counterparty_path(&ics24::packet_acknowledgement_commitment_path(
            &packet.dest_client,
            packet.sequence,
        )),
        ics24::packet_acknowledgement_commitment_bytes32(&[ack]).unwrap(),
    )
}

/// Fact attesting the counterparty never received `packet`
pub fn receipt_absence_fact(packet: &Packet) -> PacketCompact {
    PacketCompact::absent(&counterparty_path(&ics24::packet_receipt_commitment_path(
        &packet.dest_client,
        packet.sequence,
    )))
}

/// JSON header at `height` signed by the first `signer_count` attestors
pub fn header(
    height: u64,
    timestamp: u64,
    facts: Vec<PacketCompact>,
    signer_count: usize,
) -> Vec<u8> {
    let header = signed_header(
        Height::at(height),
        timestamp,
        PacketCommitments::new(facts),
        &signers()[..signer_count],
    );
    serde_json::to_vec(&header).unwrap()
}

/// Update the client to `height` with a fully signed header
pub fn attest(env: &TestEnv, height: u64, timestamp: u64, facts: Vec<PacketCompact>) {
    env.router
        .update_client(&relayer(), &env.client_id, &header(height, timestamp, facts, 2))
        .unwrap();
}
