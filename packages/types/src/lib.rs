#![doc = "Core IBC Eureka types: identifiers, heights, packets and ICS24 commitments"]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod height;
pub mod ics24;
pub mod identifier;
pub mod msgs;
pub mod packet;

pub use height::Height;
pub use ics24::{Ics24Error, UNIVERSAL_ERROR_ACK};
pub use identifier::IdentifierError;
pub use msgs::{CounterpartyInfo, MsgAckPacket, MsgRecvPacket, MsgSendPacket, MsgTimeoutPacket};
pub use packet::{Packet, Payload};
