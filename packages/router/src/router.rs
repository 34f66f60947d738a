//! ICS26 packet router: send, recv, ack and timeout over registered clients.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use ibc_eureka_types::{
    ics24::{self, CommitmentKind},
    CounterpartyInfo, Height, MsgAckPacket, MsgRecvPacket, MsgSendPacket, MsgTimeoutPacket, Packet,
    UNIVERSAL_ERROR_ACK,
};
use tracing::{debug, instrument, warn};

use crate::{
    access::{Caller, Role},
    app_registry::{
        AppRegistry, IbcApp, OnAcknowledgementPacketCallback, OnRecvPacketCallback,
        OnSendPacketCallback, OnTimeoutPacketCallback,
    },
    client_registry::{ClientRegistration, ClientRegistry, ClientSlot},
    clock::HostClock,
    config::RouterConfig,
    error::RouterError,
    events::RouterEvent,
    light_client::{ClientStatus, LightClient, MembershipMsg, NonMembershipMsg, UpdateResult},
};

/// Result of a router operation with the events it emitted, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<T> {
    /// Operation result
    pub value: T,
    /// Emitted events
    pub events: Vec<RouterEvent>,
}

impl<T> Response<T> {
    pub(crate) fn publish(value: T, events: Vec<RouterEvent>) -> Self {
        events.iter().for_each(RouterEvent::log);
        Self { value, events }
    }
}

/// Whether a packet operation took effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// State changed and the application was called
    Applied,
    /// Already done before; nothing changed
    Noop,
}

/// The packet router
pub struct Router {
    pub(crate) config: RouterConfig,
    pub(crate) clock: Arc<dyn HostClock>,
    pub(crate) clients: ClientRegistry,
    pub(crate) apps: AppRegistry,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("clients", &self.clients)
            .field("apps", &self.apps)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create an empty router
    ///
    /// # Errors
    /// The configuration is invalid
    pub fn new(config: RouterConfig, clock: Arc<dyn HostClock>) -> Result<Self, RouterError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            clients: ClientRegistry::default(),
            apps: AppRegistry::default(),
        })
    }

    /// Router configuration
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Registered clients
    #[must_use]
    pub const fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Registered applications
    #[must_use]
    pub const fn apps(&self) -> &AppRegistry {
        &self.apps
    }

    /// Register a light client. Returns the assigned client id.
    ///
    /// # Errors
    /// - Caller is not a customizer, or asks for a custom id without being an id customizer
    /// - Invalid identifiers or counterparty info
    /// - Custom id already taken
    #[instrument(skip_all, fields(caller = caller.id()))]
    pub fn add_client(
        &self,
        caller: &Caller,
        counterparty_info: CounterpartyInfo,
        verifier: Box<dyn LightClient>,
        custom_id: Option<String>,
    ) -> Result<Response<String>, RouterError> {
        caller.require(Role::Customizer)?;
        if custom_id.is_some() {
            caller.require(Role::IdCustomizer)?;
        }

        let registration = self.clients.register(counterparty_info, verifier, custom_id)?;
        let event = RouterEvent::ClientAdded {
            client_id: registration.client_id.clone(),
            client_type: registration.client_type,
            counterparty_info: registration.counterparty_info,
        };
        Ok(Response::publish(registration.client_id, vec![event]))
    }

    /// Bind an application to a port
    ///
    /// # Errors
    /// - Caller is not a customizer
    /// - Invalid port id or port already bound
    #[instrument(skip_all, fields(caller = caller.id(), port_id = port_id))]
    pub fn add_ibc_app(
        &self,
        caller: &Caller,
        port_id: &str,
        app_address: &str,
        app: Arc<dyn IbcApp>,
    ) -> Result<Response<()>, RouterError> {
        caller.require(Role::Customizer)?;
        self.apps.add(port_id, app_address, app)?;

        let event = RouterEvent::IBCAppAdded {
            port_id: port_id.to_string(),
            app_address: app_address.to_string(),
        };
        Ok(Response::publish((), vec![event]))
    }

    /// Status of a client
    ///
    /// # Errors
    /// The client does not exist
    pub fn client_status(&self, client_id: &str) -> Result<ClientStatus, RouterError> {
        Ok(self.clients.get(client_id)?.lock()?.verifier.status())
    }

    /// Latest trusted height of a client
    ///
    /// # Errors
    /// The client does not exist
    pub fn latest_height(&self, client_id: &str) -> Result<Height, RouterError> {
        Ok(self.clients.get(client_id)?.lock()?.verifier.latest_height())
    }

    /// Stored commitment of `kind` under `(client_id, sequence)`
    ///
    /// # Errors
    /// The client does not exist
    pub fn commitment(
        &self,
        client_id: &str,
        kind: CommitmentKind,
        sequence: u64,
    ) -> Result<Option<[u8; 32]>, RouterError> {
        Ok(self.clients.get(client_id)?.lock()?.store.get(kind, sequence))
    }

    /// Sequence the next packet sent through `client_id` will get
    ///
    /// # Errors
    /// The client does not exist
    pub fn next_sequence_send(&self, client_id: &str) -> Result<u64, RouterError> {
        Ok(self.clients.get(client_id)?.lock()?.store.peek_next_sequence())
    }

    /// Update a client with a light client specific message
    ///
    /// # Errors
    /// Caller is not a relayer, the client does not exist or rejects the message
    #[instrument(skip_all, fields(caller = caller.id(), client_id = client_id))]
    pub fn update_client(
        &self,
        caller: &Caller,
        client_id: &str,
        client_message: &[u8],
    ) -> Result<Response<UpdateResult>, RouterError> {
        caller.require(Role::Relayer)?;
        let entry = self.clients.get(client_id)?;
        let mut slot = entry.lock()?;

        let mut events = Vec::new();
        let result = Self::handle_update_client(
            &entry.registration,
            &mut slot,
            client_message,
            &mut events,
        )?;
        Ok(Response::publish(result, events))
    }

    /// Freeze a client with evidence of misbehaviour
    ///
    /// # Errors
    /// Caller is not a relayer, the client does not exist or the evidence is rejected
    #[instrument(skip_all, fields(caller = caller.id(), client_id = client_id))]
    pub fn submit_misbehaviour(
        &self,
        caller: &Caller,
        client_id: &str,
        misbehaviour: &[u8],
    ) -> Result<Response<()>, RouterError> {
        caller.require(Role::Relayer)?;
        let entry = self.clients.get(client_id)?;
        let mut slot = entry.lock()?;

        slot.verifier
            .submit_misbehaviour(misbehaviour)
            .map_err(|e| RouterError::light_client(client_id, e))?;

        let event = RouterEvent::ClientFrozen {
            client_id: client_id.to_string(),
        };
        Ok(Response::publish((), vec![event]))
    }

    /// Send a packet from the application owning the payload's source port.
    /// Returns the assigned sequence.
    ///
    /// # Errors
    /// - Caller does not own the source port
    /// - Timeout not in the future or too far in the future
    /// - Client missing or not active
    /// - The application rejects the packet
    #[instrument(skip_all, fields(caller = caller.id(), client_id = %msg.source_client))]
    pub fn send_packet(
        &self,
        caller: &Caller,
        msg: MsgSendPacket,
    ) -> Result<Response<u64>, RouterError> {
        let port_id = &msg.payload.source_port;
        let app = self.apps.get(port_id)?;
        if app.app_address != caller.id() {
            return Err(RouterError::UnauthorizedSender {
                caller: caller.id().to_string(),
                port_id: port_id.clone(),
            });
        }

        let now = self.clock.now();
        if msg.timeout_timestamp <= now {
            return Err(RouterError::InvalidTimeoutTimestamp {
                timeout_timestamp: msg.timeout_timestamp,
                now,
            });
        }
        let duration = msg.timeout_timestamp - now;
        if duration > self.config.max_timeout_duration {
            return Err(RouterError::InvalidTimeoutDuration {
                duration,
                max: self.config.max_timeout_duration,
            });
        }

        let entry = self.clients.get(&msg.source_client)?;
        let mut slot = entry.lock()?;
        ensure_active(&entry.registration, &slot)?;

        let packet = Packet {
            sequence: slot.store.peek_next_sequence(),
            source_client: msg.source_client,
            dest_client: entry.registration.counterparty_info.client_id.clone(),
            timeout_timestamp: msg.timeout_timestamp,
            payloads: vec![msg.payload],
        };

        app.app
            .on_send_packet(&OnSendPacketCallback {
                source_client: &packet.source_client,
                dest_client: &packet.dest_client,
                sequence: packet.sequence,
                payload: &packet.payloads[0],
                sender: caller.id(),
            })
            .map_err(|e| RouterError::FailedCallback {
                port_id: port_id_of(&packet),
                reason: e.to_string(),
            })?;

        let sequence = slot.store.next_sequence();
        slot.store.set(
            CommitmentKind::PacketCommitment,
            sequence,
            ics24::packet_commitment_bytes32(&packet),
        );

        Ok(Response::publish(sequence, vec![RouterEvent::SendPacket { packet }]))
    }

    /// Receive a packet from the counterparty
    ///
    /// # Errors
    /// - Caller is not a relayer
    /// - A different packet was received under the same sequence
    /// - Counterparty, payload count or timeout checks fail
    /// - Client missing, not active, or the proof does not verify
    #[instrument(skip_all, fields(
        caller = caller.id(),
        client_id = %msg.packet.dest_client,
        sequence = msg.packet.sequence
    ))]
    pub fn recv_packet(
        &self,
        caller: &Caller,
        msg: &MsgRecvPacket,
    ) -> Result<Response<PacketOutcome>, RouterError> {
        caller.require(Role::Relayer)?;
        let entry = self.clients.get(&msg.packet.dest_client)?;
        let mut slot = entry.lock()?;

        let mut events = Vec::new();
        let outcome =
            self.handle_recv_packet(caller, &entry.registration, &mut slot, msg, &mut events)?;
        Ok(Response::publish(outcome, events))
    }

    /// Acknowledge a sent packet
    ///
    /// # Errors
    /// - Caller is not a relayer
    /// - Counterparty, payload count or commitment checks fail
    /// - Client missing, not active, or the proof does not verify
    /// - The application fails to process the acknowledgement
    #[instrument(skip_all, fields(
        caller = caller.id(),
        client_id = %msg.packet.source_client,
        sequence = msg.packet.sequence
    ))]
    pub fn ack_packet(
        &self,
        caller: &Caller,
        msg: &MsgAckPacket,
    ) -> Result<Response<PacketOutcome>, RouterError> {
        caller.require(Role::Relayer)?;
        let entry = self.clients.get(&msg.packet.source_client)?;
        let mut slot = entry.lock()?;

        let mut events = Vec::new();
        let outcome =
            self.handle_ack_packet(caller, &entry.registration, &mut slot, msg, &mut events)?;
        Ok(Response::publish(outcome, events))
    }

    /// Time out a sent packet
    ///
    /// # Errors
    /// - Caller is not a relayer
    /// - Counterparty, payload count or commitment checks fail
    /// - Client missing, not active, or the proof does not verify
    /// - The counterparty has not reached the packet timeout
    /// - The application fails to process the timeout
    #[instrument(skip_all, fields(
        caller = caller.id(),
        client_id = %msg.packet.source_client,
        sequence = msg.packet.sequence
    ))]
    pub fn timeout_packet(
        &self,
        caller: &Caller,
        msg: &MsgTimeoutPacket,
    ) -> Result<Response<PacketOutcome>, RouterError> {
        caller.require(Role::Relayer)?;
        let entry = self.clients.get(&msg.packet.source_client)?;
        let mut slot = entry.lock()?;

        let mut events = Vec::new();
        let outcome =
            self.handle_timeout_packet(caller, &entry.registration, &mut slot, msg, &mut events)?;
        Ok(Response::publish(outcome, events))
    }

    pub(crate) fn handle_update_client(
        registration: &ClientRegistration,
        slot: &mut ClientSlot,
        client_message: &[u8],
        events: &mut Vec<RouterEvent>,
    ) -> Result<UpdateResult, RouterError> {
        let client_id = &registration.client_id;
        let result = slot
            .verifier
            .update_client(client_message)
            .map_err(|e| RouterError::light_client(client_id, e))?;

        events.push(RouterEvent::ClientUpdated {
            client_id: client_id.clone(),
            height: slot.verifier.latest_height(),
            result,
        });
        if result == UpdateResult::Misbehaviour {
            events.push(RouterEvent::ClientFrozen {
                client_id: client_id.clone(),
            });
        }
        Ok(result)
    }

    pub(crate) fn handle_recv_packet(
        &self,
        caller: &Caller,
        registration: &ClientRegistration,
        slot: &mut ClientSlot,
        msg: &MsgRecvPacket,
        events: &mut Vec<RouterEvent>,
    ) -> Result<PacketOutcome, RouterError> {
        let packet = &msg.packet;
        let receipt = ics24::packet_receipt_commitment_bytes32(packet);

        if let Some(stored) = slot.store.get(CommitmentKind::PacketReceipt, packet.sequence) {
            if stored != receipt {
                return Err(RouterError::PacketReceiptMismatch {
                    client_id: packet.dest_client.clone(),
                    sequence: packet.sequence,
                });
            }
            debug!("packet already received");
            events.push(RouterEvent::Noop);
            return Ok(PacketOutcome::Noop);
        }

        self.check_payload_count(packet)?;
        check_counterparty(registration, &packet.source_client)?;

        let now = self.clock.now();
        if packet.timeout_timestamp <= now {
            return Err(RouterError::InvalidTimeoutTimestamp {
                timeout_timestamp: packet.timeout_timestamp,
                now,
            });
        }

        let apps = packet
            .payloads
            .iter()
            .map(|payload| self.apps.get(&payload.dest_port))
            .collect::<Result<Vec<_>, _>>()?;

        ensure_active(registration, slot)?;
        verify_membership(
            registration,
            slot,
            msg.proof_height,
            ics24::packet_commitment_path(&packet.source_client, packet.sequence),
            ics24::packet_commitment_bytes32(packet).to_vec(),
            &msg.proof_commitment,
        )?;

        slot.store
            .set(CommitmentKind::PacketReceipt, packet.sequence, receipt);

        let mut acknowledgements = Vec::with_capacity(packet.payloads.len());
        for (payload, app) in packet.payloads.iter().zip(&apps) {
            let callback = OnRecvPacketCallback {
                source_client: &packet.source_client,
                dest_client: &packet.dest_client,
                sequence: packet.sequence,
                payload,
                relayer: caller.id(),
            };
            let ack = match catch_unwind(AssertUnwindSafe(|| app.app.on_recv_packet(&callback))) {
                Ok(Ok(ack)) if !ack.is_empty() && ack != UNIVERSAL_ERROR_ACK => Some(ack),
                Ok(Ok(_)) => {
                    warn!(
                        port_id = %payload.dest_port,
                        "application returned an error acknowledgement"
                    );
                    None
                }
                Ok(Err(e)) => {
                    warn!(
                        port_id = %payload.dest_port,
                        error = %e,
                        "application failed to receive packet"
                    );
                    None
                }
                Err(_) => {
                    warn!(port_id = %payload.dest_port, "application panicked receiving packet");
                    None
                }
            };
            if let Some(ack) = ack {
                acknowledgements.push(ack);
            } else {
                acknowledgements = vec![UNIVERSAL_ERROR_ACK.to_vec()];
                break;
            }
        }

        let ack_commitment = ics24::packet_acknowledgement_commitment_bytes32(&acknowledgements)?;
        slot.store
            .set(CommitmentKind::AckCommitment, packet.sequence, ack_commitment);

        events.push(RouterEvent::RecvPacket {
            packet: packet.clone(),
        });
        events.push(RouterEvent::WriteAcknowledgement {
            dest_client: packet.dest_client.clone(),
            sequence: packet.sequence,
            packet: packet.clone(),
            acknowledgements,
        });
        Ok(PacketOutcome::Applied)
    }

    pub(crate) fn handle_ack_packet(
        &self,
        caller: &Caller,
        registration: &ClientRegistration,
        slot: &mut ClientSlot,
        msg: &MsgAckPacket,
        events: &mut Vec<RouterEvent>,
    ) -> Result<PacketOutcome, RouterError> {
        let packet = &msg.packet;
        self.check_payload_count(packet)?;
        check_counterparty(registration, &packet.dest_client)?;

        if !check_sent_commitment(slot, packet)? {
            debug!("packet already acknowledged or timed out");
            events.push(RouterEvent::Noop);
            return Ok(PacketOutcome::Noop);
        }

        ensure_active(registration, slot)?;
        let ack_commitment =
            ics24::packet_acknowledgement_commitment_bytes32(&[&msg.acknowledgement])?;
        verify_membership(
            registration,
            slot,
            msg.proof_height,
            ics24::packet_acknowledgement_commitment_path(&packet.dest_client, packet.sequence),
            ack_commitment.to_vec(),
            &msg.proof_acked,
        )?;

        for payload in &packet.payloads {
            let app = self.apps.get(&payload.source_port)?;
            let callback = OnAcknowledgementPacketCallback {
                source_client: &packet.source_client,
                dest_client: &packet.dest_client,
                sequence: packet.sequence,
                payload,
                acknowledgement: &msg.acknowledgement,
                relayer: caller.id(),
            };
            invoke(&payload.source_port, || {
                app.app.on_acknowledgement_packet(&callback)
            })?;
        }

        slot.store
            .delete(CommitmentKind::PacketCommitment, packet.sequence);
        events.push(RouterEvent::AckPacket {
            packet: packet.clone(),
            acknowledgement: msg.acknowledgement.clone(),
        });
        Ok(PacketOutcome::Applied)
    }

    pub(crate) fn handle_timeout_packet(
        &self,
        caller: &Caller,
        registration: &ClientRegistration,
        slot: &mut ClientSlot,
        msg: &MsgTimeoutPacket,
        events: &mut Vec<RouterEvent>,
    ) -> Result<PacketOutcome, RouterError> {
        let packet = &msg.packet;
        self.check_payload_count(packet)?;
        check_counterparty(registration, &packet.dest_client)?;

        if !check_sent_commitment(slot, packet)? {
            debug!("packet already acknowledged or timed out");
            events.push(RouterEvent::Noop);
            return Ok(PacketOutcome::Noop);
        }

        ensure_active(registration, slot)?;
        let path = ics24::prefixed_path(
            &registration.counterparty_info.merkle_prefix,
            &ics24::packet_receipt_commitment_path(&packet.dest_client, packet.sequence),
        )?;
        let counterparty_timestamp = slot
            .verifier
            .verify_non_membership(&NonMembershipMsg {
                height: msg.proof_height,
                path,
                proof: msg.proof_timeout.clone(),
            })
            .map_err(|e| RouterError::light_client(&registration.client_id, e))?;

        if counterparty_timestamp < packet.timeout_timestamp {
            return Err(RouterError::PacketNotTimedOut {
                sequence: packet.sequence,
                counterparty_timestamp,
                timeout_timestamp: packet.timeout_timestamp,
            });
        }

        for payload in &packet.payloads {
            let app = self.apps.get(&payload.source_port)?;
            let callback = OnTimeoutPacketCallback {
                source_client: &packet.source_client,
                dest_client: &packet.dest_client,
                sequence: packet.sequence,
                payload,
                relayer: caller.id(),
            };
            invoke(&payload.source_port, || app.app.on_timeout_packet(&callback))?;
        }

        slot.store
            .delete(CommitmentKind::PacketCommitment, packet.sequence);
        events.push(RouterEvent::TimeoutPacket {
            packet: packet.clone(),
        });
        Ok(PacketOutcome::Applied)
    }

    fn check_payload_count(&self, packet: &Packet) -> Result<(), RouterError> {
        let expected = self.config.max_payloads_per_packet;
        if packet.payloads.is_empty() || packet.payloads.len() > expected {
            return Err(RouterError::InvalidPayloadCount {
                count: packet.payloads.len(),
                expected,
            });
        }
        Ok(())
    }
}

fn port_id_of(packet: &Packet) -> String {
    packet
        .payloads
        .first()
        .map(|p| p.source_port.clone())
        .unwrap_or_default()
}

fn ensure_active(registration: &ClientRegistration, slot: &ClientSlot) -> Result<(), RouterError> {
    match slot.verifier.status() {
        ClientStatus::Active => Ok(()),
        ClientStatus::Frozen | ClientStatus::Expired => Err(RouterError::ClientNotActive {
            client_id: registration.client_id.clone(),
        }),
    }
}

fn check_counterparty(registration: &ClientRegistration, actual: &str) -> Result<(), RouterError> {
    let expected = &registration.counterparty_info.client_id;
    if expected == actual {
        Ok(())
    } else {
        Err(RouterError::InvalidCounterparty {
            expected: expected.clone(),
            actual: actual.to_string(),
        })
    }
}

/// Returns whether the packet is still awaiting ack or timeout; a stored
/// commitment for a different packet is an error.
fn check_sent_commitment(slot: &ClientSlot, packet: &Packet) -> Result<bool, RouterError> {
    let Some(stored) = slot
        .store
        .get(CommitmentKind::PacketCommitment, packet.sequence)
    else {
        return Ok(false);
    };
    if stored != ics24::packet_commitment_bytes32(packet) {
        return Err(RouterError::PacketCommitmentMismatch {
            client_id: packet.source_client.clone(),
            sequence: packet.sequence,
        });
    }
    Ok(true)
}

fn verify_membership(
    registration: &ClientRegistration,
    slot: &ClientSlot,
    height: Height,
    path: Vec<u8>,
    value: Vec<u8>,
    proof: &[u8],
) -> Result<u64, RouterError> {
    let path = ics24::prefixed_path(&registration.counterparty_info.merkle_prefix, &path)?;
    slot.verifier
        .verify_membership(&MembershipMsg {
            height,
            path,
            value,
            proof: proof.to_vec(),
        })
        .map_err(|e| RouterError::light_client(&registration.client_id, e))
}

/// Runs an application callback whose failure aborts the operation.
fn invoke<F>(port_id: &str, callback: F) -> Result<(), RouterError>
where
    F: FnOnce() -> Result<(), crate::app_registry::AppError>,
{
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RouterError::FailedCallback {
            port_id: port_id.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(RouterError::FailedCallback {
            port_id: port_id.to_string(),
            reason: "application panicked".to_string(),
        }),
    }
}
