#![doc = "ICS26 packet router for IBC Eureka"]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod access;
pub mod app_registry;
pub mod client_registry;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod light_client;
pub mod multicall;
pub mod persist;
pub mod router;
pub mod store;

pub use access::{Caller, Role};
pub use app_registry::{
    AppError, IbcApp, OnAcknowledgementPacketCallback, OnRecvPacketCallback,
    OnSendPacketCallback, OnTimeoutPacketCallback,
};
pub use client_registry::ClientRegistration;
pub use clock::{HostClock, ManualClock, SystemClock};
pub use config::{ConfigError, RouterConfig};
pub use error::RouterError;
pub use events::RouterEvent;
pub use light_client::{AttestorClient, ClientStatus, LightClient, LightClientError, UpdateResult};
pub use multicall::{MsgOutcome, RouterMsg};
pub use persist::{PersistedState, StateResolver};
pub use router::{PacketOutcome, Response, Router};
