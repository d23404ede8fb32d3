//! WebSocket signaling for pairing a technician with a remote expert and
//! relaying their WebRTC negotiation traffic.

mod actor;
mod messages;
mod registry;
mod server;
mod types;

pub use actor::RelayHandle;
pub use messages::{ClientMessage, ServerMessage};
pub use server::{DEFAULT_PORT, SignalingServer};
pub use types::{ConnId, OutboundMessage, Role, RoomToken, SignalingError};
