//! Router events, returned in emission order by every operation

use ibc_eureka_types::{CounterpartyInfo, Height, Packet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::light_client::UpdateResult;

/// Observable router event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterEvent {
    /// A packet was committed for sending
    SendPacket {
        /// The sent packet
        packet: Packet,
    },
    /// A packet was received
    RecvPacket {
        /// The received packet
        packet: Packet,
    },
    /// An acknowledgement commitment was written
    WriteAcknowledgement {
        /// Local client the packet arrived on
        dest_client: String,
        /// Packet sequence
        sequence: u64,
        /// The received packet
        packet: Packet,
        /// Acknowledgements, one per payload
        acknowledgements: Vec<Vec<u8>>,
    },
    /// A sent packet was acknowledged
    AckPacket {
        /// The acknowledged packet
        packet: Packet,
        /// Acknowledgement written by the counterparty
        acknowledgement: Vec<u8>,
    },
    /// A sent packet timed out
    TimeoutPacket {
        /// The timed out packet
        packet: Packet,
    },
    /// The requested effect had already happened
    Noop,
    /// A client was registered
    ClientAdded {
        /// Assigned client id
        client_id: String,
        /// Verifier type
        client_type: String,
        /// Counterparty chain information
        counterparty_info: CounterpartyInfo,
    },
    /// A client processed an update
    ClientUpdated {
        /// Client id
        client_id: String,
        /// Latest trusted height after the update
        height: Height,
        /// Outcome
        result: UpdateResult,
    },
    /// A client was frozen for misbehaviour
    ClientFrozen {
        /// Client id
        client_id: String,
    },
    /// An application was bound to a port
    IBCAppAdded {
        /// Port id
        port_id: String,
        /// Application address
        app_address: String,
    },
}

impl RouterEvent {
    /// Log the event
    pub fn log(&self) {
        match self {
            Self::SendPacket { packet } => info!(
                client_id = %packet.source_client,
                sequence = packet.sequence,
                "send packet"
            ),
            Self::RecvPacket { packet } => info!(
                client_id = %packet.dest_client,
                sequence = packet.sequence,
                "recv packet"
            ),
            Self::WriteAcknowledgement {
                dest_client,
                sequence,
                ..
            } => info!(client_id = %dest_client, sequence, "write acknowledgement"),
            Self::AckPacket { packet, .. } => info!(
                client_id = %packet.source_client,
                sequence = packet.sequence,
                "acknowledge packet"
            ),
            Self::TimeoutPacket { packet } => info!(
                client_id = %packet.source_client,
                sequence = packet.sequence,
                "timeout packet"
            ),
            Self::Noop => info!("noop"),
            Self::ClientAdded {
                client_id,
                client_type,
                ..
            } => info!(%client_id, %client_type, "client added"),
            Self::ClientUpdated {
                client_id,
                height,
                result,
            } => info!(%client_id, %height, ?result, "client updated"),
            Self::ClientFrozen { client_id } => warn!(%client_id, "client frozen"),
            Self::IBCAppAdded {
                port_id,
                app_address,
            } => info!(%port_id, %app_address, "ibc app added"),
        }
    }
}
