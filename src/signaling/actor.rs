use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::messages::ServerMessage;
use super::registry::{Admission, RoomRegistry, admission};
use super::types::{ConnId, OutboundMessage, PeerState, Role, RoomToken, SignalingError};

/// Commands sent to the room manager actor
pub(crate) enum RoomCommand {
    Join {
        token: RoomToken,
        role: Role,
        conn_id: ConnId,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    },
    Offer {
        token: RoomToken,
        sender: ConnId,
        sdp: Value,
    },
    Answer {
        token: RoomToken,
        sender: ConnId,
        sdp: Value,
    },
    IceCandidate {
        token: RoomToken,
        sender: ConnId,
        candidate: Value,
    },
    Disconnect {
        conn_id: ConnId,
    },
}

/// All room state lives in this task. Commands are handled one at a time,
/// so registry mutations are atomic with respect to each other without any
/// locking.
pub(crate) async fn room_manager(mut rx: mpsc::Receiver<RoomCommand>) {
    let mut registry = RoomRegistry::new();
    // Reverse index: which room each connection sits in. A connection
    // belongs to at most one room by contract, which makes disconnect an
    // O(1) lookup instead of a scan over all rooms.
    let mut conn_rooms: HashMap<ConnId, RoomToken> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RoomCommand::Join {
                token,
                role,
                conn_id,
                peer_tx,
            } => handle_join(&mut registry, &mut conn_rooms, token, role, conn_id, peer_tx),
            RoomCommand::Offer { token, sender, sdp } => {
                handle_offer(&mut registry, &token, sender, sdp)
            }
            RoomCommand::Answer { token, sender, sdp } => {
                handle_answer(&mut registry, &token, sender, sdp)
            }
            RoomCommand::IceCandidate {
                token,
                sender,
                candidate,
            } => handle_ice_candidate(&mut registry, &token, sender, candidate),
            RoomCommand::Disconnect { conn_id } => {
                handle_disconnect(&mut registry, &mut conn_rooms, conn_id)
            }
        }
    }
}

fn send(tx: &mpsc::UnboundedSender<OutboundMessage>, msg: &ServerMessage) {
    let json = serde_json::to_string(msg).expect("ServerMessage serialization should never fail");
    let _ = tx.send(OutboundMessage::from(json));
}

fn send_to_member(registry: &mut RoomRegistry, token: &RoomToken, id: ConnId, msg: &ServerMessage) {
    if let Some(tx) = registry.find_mut(token).and_then(|room| room.sender_to(id)) {
        send(tx, msg);
    }
}

fn handle_join(
    registry: &mut RoomRegistry,
    conn_rooms: &mut HashMap<ConnId, RoomToken>,
    token: RoomToken,
    role: Role,
    conn_id: ConnId,
    peer_tx: mpsc::UnboundedSender<OutboundMessage>,
) {
    // Single-room membership is a contract: a connection already seated
    // somewhere cannot take a second seat.
    if let Some(current) = conn_rooms.get(&conn_id) {
        debug!(
            "Ignoring join from {} for room {}: already in room {}",
            conn_id, token, current
        );
        return;
    }

    let room = registry.get_or_create(&token);
    match admission(room, role) {
        Admission::RoomFull => {
            debug!("Room {} is full for {}", token, conn_id);
            send(&peer_tx, &ServerMessage::RoomFull {
                room_id: token.clone(),
            });
            return;
        }
        Admission::RoleTaken => {
            debug!("{} role taken in room {}", role, token);
            let message = match role {
                Role::Technician => "Technician role already taken in this room.",
                Role::Expert => "Expert role already taken in this room.",
            };
            send(&peer_tx, &ServerMessage::UserTypeTaken {
                message: message.to_string(),
            });
            return;
        }
        Admission::Granted => {}
    }

    room.add_member(conn_id, role, PeerState { tx: peer_tx });
    conn_rooms.insert(conn_id, token.clone());

    let peer_count = room.member_count();
    info!("{} joined room {} as {}", conn_id, token, role);

    if let Some(tx) = room.sender_to(conn_id) {
        send(tx, &ServerMessage::JoinedRoom {
            room_id: token.clone(),
            user_type: role,
            peer_count,
        });
    }

    if peer_count == 2 {
        info!("Two users in room {}, starting call", token);
        for seat in [Role::Expert, Role::Technician] {
            if let Some(tx) = room.role_holder(seat).and_then(|id| room.sender_to(id)) {
                send(tx, &ServerMessage::StartCall {
                    role: seat,
                    room_id: token.clone(),
                });
            }
        }
    } else if role == Role::Technician {
        // Lone technician waits; a lone expert gets no such notice.
        if let Some(tx) = room.sender_to(conn_id) {
            send(tx, &ServerMessage::WaitingForExpert { room_id: token });
        }
    }
}

/// Offers travel one way: from the expert to the technician. Anything else
/// is dropped without feedback.
fn handle_offer(registry: &mut RoomRegistry, token: &RoomToken, sender: ConnId, sdp: Value) {
    let Some(room) = registry.find_mut(token) else {
        debug!("Dropping offer from {}: unknown room {}", sender, token);
        return;
    };
    let (Some(technician), Some(expert)) = (room.technician, room.expert) else {
        debug!("Dropping offer from {}: room {} not paired", sender, token);
        return;
    };
    if sender != expert {
        debug!("Dropping offer from {}: not the expert of {}", sender, token);
        return;
    }
    debug!("Relaying offer from {} to {} in {}", sender, technician, token);
    if let Some(tx) = room.sender_to(technician) {
        send(tx, &ServerMessage::Offer { sdp });
    }
}

/// Answers travel the opposite way: from the technician to the expert.
fn handle_answer(registry: &mut RoomRegistry, token: &RoomToken, sender: ConnId, sdp: Value) {
    let Some(room) = registry.find_mut(token) else {
        debug!("Dropping answer from {}: unknown room {}", sender, token);
        return;
    };
    let (Some(technician), Some(expert)) = (room.technician, room.expert) else {
        debug!("Dropping answer from {}: room {} not paired", sender, token);
        return;
    };
    if sender != technician {
        debug!("Dropping answer from {}: not the technician of {}", sender, token);
        return;
    }
    debug!("Relaying answer from {} to {} in {}", sender, expert, token);
    if let Some(tx) = room.sender_to(expert) {
        send(tx, &ServerMessage::Answer { sdp });
    }
}

/// ICE candidates are undirected: whichever other member is present gets
/// them, regardless of role, and never the sender itself.
fn handle_ice_candidate(
    registry: &mut RoomRegistry,
    token: &RoomToken,
    sender: ConnId,
    candidate: Value,
) {
    let Some(room) = registry.find_mut(token) else {
        debug!("Dropping candidate from {}: unknown room {}", sender, token);
        return;
    };
    let Some(other) = room.other_member(sender) else {
        debug!("Dropping candidate from {}: no peer in {}", sender, token);
        return;
    };
    if let Some(tx) = room.sender_to(other) {
        send(tx, &ServerMessage::IceCandidate { candidate });
    }
}

/// The only teardown trigger. Idempotent: a connection with no seat is a
/// no-op.
fn handle_disconnect(
    registry: &mut RoomRegistry,
    conn_rooms: &mut HashMap<ConnId, RoomToken>,
    conn_id: ConnId,
) {
    let Some(token) = conn_rooms.remove(&conn_id) else {
        return;
    };

    let mut remaining: Option<ConnId> = None;
    if let Some(room) = registry.find_mut(&token) {
        room.remove_member(conn_id);
        remaining = room.members.keys().copied().next();
    }
    info!("{} left room {}", conn_id, token);

    if registry.drop_if_empty(&token) {
        info!("Room {} is now empty and removed", token);
    } else if let Some(peer) = remaining {
        send_to_member(registry, &token, peer, &ServerMessage::PeerDisconnected {
            message: "The other user has disconnected.".to_string(),
        });
    }
}

/// Handle to communicate with the room manager actor
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

impl RelayHandle {
    /// Take a seat in a room, registering the connection's outbound channel
    pub async fn join(
        &self,
        token: RoomToken,
        role: Role,
        conn_id: ConnId,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<(), SignalingError> {
        self.send_command(RoomCommand::Join {
            token,
            role,
            conn_id,
            peer_tx,
        })
        .await
    }

    pub async fn offer(
        &self,
        token: RoomToken,
        sender: ConnId,
        sdp: Value,
    ) -> Result<(), SignalingError> {
        self.send_command(RoomCommand::Offer { token, sender, sdp })
            .await
    }

    pub async fn answer(
        &self,
        token: RoomToken,
        sender: ConnId,
        sdp: Value,
    ) -> Result<(), SignalingError> {
        self.send_command(RoomCommand::Answer { token, sender, sdp })
            .await
    }

    pub async fn ice_candidate(
        &self,
        token: RoomToken,
        sender: ConnId,
        candidate: Value,
    ) -> Result<(), SignalingError> {
        self.send_command(RoomCommand::IceCandidate {
            token,
            sender,
            candidate,
        })
        .await
    }

    /// Vacate whatever seat the connection holds. Fire-and-forget: called
    /// on every connection exit path, including abnormal ones.
    pub async fn disconnect(&self, conn_id: ConnId) {
        let _ = self.tx.send(RoomCommand::Disconnect { conn_id }).await;
    }

    async fn send_command(&self, cmd: RoomCommand) -> Result<(), SignalingError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SignalingError::RelayUnavailable("command channel closed".to_string()))
    }
}
