use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Signaling server errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("room manager unavailable: {0}")]
    RelayUnavailable(String),
}

const CONN_ID_LEN: usize = 13;
const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Connection ID: 13-byte fixed array ("conn_" + 8 hex), stable for the
/// lifetime of one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId {
    bytes: [u8; CONN_ID_LEN],
    len: u8,
}

impl ConnId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONN_ID_LEN];
        bytes[..5].copy_from_slice(b"conn_");

        let mut rng = rand::rng();
        let value: u32 = rng.random();

        for i in 0..8 {
            let nibble = ((value >> (28 - i * 4)) & 0xF) as usize;
            bytes[5 + i] = HEX_CHARS[nibble];
        }
        Self {
            bytes,
            len: CONN_ID_LEN as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ConnId {
    fn from(s: &str) -> Self {
        let mut bytes = [0u8; CONN_ID_LEN];
        let src = s.as_bytes();
        let len = src.len().min(CONN_ID_LEN);
        bytes[..len].copy_from_slice(&src[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }
}

/// Room token: opaque string chosen by the clients, never generated here.
/// Arbitrary length, so this is a heap string rather than a fixed array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomToken(String);

impl RoomToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which seat a participant occupies in a room. The two roles are mutually
/// exclusive per room and gate who may originate offers vs answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Technician,
    Expert,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Technician => "technician",
            Role::Expert => "expert",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

#[derive(Debug)]
pub(crate) struct PeerState {
    /// Channel for outbound messages to this peer.
    pub tx: mpsc::UnboundedSender<OutboundMessage>,
}

/// One two-seat rendezvous. Role slots, when occupied, always reference
/// members; membership never exceeds two.
#[derive(Debug, Default)]
pub(crate) struct Room {
    pub technician: Option<ConnId>,
    pub expert: Option<ConnId>,
    pub members: HashMap<ConnId, PeerState>,
}

impl Room {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn role_holder(&self, role: Role) -> Option<ConnId> {
        match role {
            Role::Technician => self.technician,
            Role::Expert => self.expert,
        }
    }

    /// Admit a member into the given role slot. Callers check admissibility
    /// first; this only records the membership.
    pub fn add_member(&mut self, id: ConnId, role: Role, state: PeerState) {
        self.members.insert(id, state);
        match role {
            Role::Technician => self.technician = Some(id),
            Role::Expert => self.expert = Some(id),
        }
    }

    /// Drop a member and release whichever role slot it held.
    pub fn remove_member(&mut self, id: ConnId) {
        self.members.remove(&id);
        if self.technician == Some(id) {
            self.technician = None;
        }
        if self.expert == Some(id) {
            self.expert = None;
        }
    }

    /// The member that is not `id`, if any. Used for undirected relay.
    pub fn other_member(&self, id: ConnId) -> Option<ConnId> {
        self.members.keys().copied().find(|m| *m != id)
    }

    pub fn sender_to(&self, id: ConnId) -> Option<&mpsc::UnboundedSender<OutboundMessage>> {
        self.members.get(&id).map(|p| &p.tx)
    }
}
