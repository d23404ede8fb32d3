use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Role, RoomToken};

/// Messages sent from client to server. Each JSON frame carries an `event`
/// tag; payload field names match the browser clients (`roomID`,
/// `userType`, `sdp`, `candidate`).
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientMessage {
    /// Take a seat in a room, creating it if this is the first join
    #[serde(rename = "join_room")]
    JoinRoom {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
        #[serde(rename = "userType")]
        user_type: Role,
    },

    /// Session description from the expert, relayed to the technician
    #[serde(rename = "offer")]
    Offer {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
        sdp: Value,
    },

    /// Session description from the technician, relayed to the expert
    #[serde(rename = "answer")]
    Answer {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
        sdp: Value,
    },

    /// Connectivity candidate, relayed to whoever else is in the room
    #[serde(rename = "ice_candidate")]
    IceCandidate {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
        candidate: Value,
    },
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerMessage {
    /// Seat taken successfully; echoes the assigned role and room occupancy
    #[serde(rename = "joined_room")]
    JoinedRoom {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
        #[serde(rename = "userType")]
        user_type: Role,
        #[serde(rename = "peerCount")]
        peer_count: usize,
    },

    /// Join rejected: both seats are occupied
    #[serde(rename = "room_full")]
    RoomFull {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
    },

    /// Join rejected: the requested role is held by someone else
    #[serde(rename = "user_type_taken")]
    UserTypeTaken { message: String },

    /// Technician is alone in the room
    #[serde(rename = "waiting_for_expert")]
    WaitingForExpert {
        #[serde(rename = "roomID")]
        room_id: RoomToken,
    },

    /// Both seats filled; negotiation may begin. `type` tells each
    /// recipient which side it is on.
    #[serde(rename = "start_call")]
    StartCall {
        #[serde(rename = "type")]
        role: Role,
        #[serde(rename = "roomID")]
        room_id: RoomToken,
    },

    /// Relayed session description (verbatim)
    #[serde(rename = "offer")]
    Offer { sdp: Value },

    /// Relayed session description (verbatim)
    #[serde(rename = "answer")]
    Answer { sdp: Value },

    /// Relayed connectivity candidate (verbatim)
    #[serde(rename = "ice_candidate")]
    IceCandidate { candidate: Value },

    /// The other participant left the room
    #[serde(rename = "peer_disconnected")]
    PeerDisconnected { message: String },

    /// Frame could not be parsed
    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join_room() {
        let json = r#"{"event": "join_room", "roomID": "bay-1", "userType": "technician"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::JoinRoom { room_id, user_type } = msg {
            assert_eq!(room_id.as_str(), "bay-1");
            assert_eq!(user_type, Role::Technician);
        } else {
            panic!("Expected JoinRoom");
        }
    }

    #[test]
    fn parse_join_room_rejects_unknown_role() {
        let json = r#"{"event": "join_room", "roomID": "bay-1", "userType": "observer"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn parse_offer_keeps_sdp_opaque() {
        let json = r#"{"event": "offer", "roomID": "bay-1", "sdp": {"type": "offer", "sdp": "v=0..."}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::Offer { room_id, sdp } = msg {
            assert_eq!(room_id.as_str(), "bay-1");
            assert_eq!(sdp["sdp"], "v=0...");
        } else {
            panic!("Expected Offer");
        }
    }

    #[test]
    fn parse_ice_candidate() {
        let json = r#"{"event": "ice_candidate", "roomID": "bay-1", "candidate": {"candidate": "candidate:1 1 udp ..."}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::IceCandidate { .. }));
    }

    #[test]
    fn serialize_joined_room() {
        let msg = ServerMessage::JoinedRoom {
            room_id: RoomToken::from("bay-1"),
            user_type: Role::Expert,
            peer_count: 2,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"event\":\"joined_room\""));
        assert!(json.contains("\"roomID\":\"bay-1\""));
        assert!(json.contains("\"userType\":\"expert\""));
        assert!(json.contains("\"peerCount\":2"));
    }

    #[test]
    fn serialize_room_full() {
        let msg = ServerMessage::RoomFull {
            room_id: RoomToken::from("bay-1"),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("room_full"));
        assert!(json.contains("bay-1"));
    }

    #[test]
    fn serialize_start_call_carries_role_as_type() {
        let msg = ServerMessage::StartCall {
            role: Role::Technician,
            room_id: RoomToken::from("bay-1"),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"event\":\"start_call\""));
        assert!(json.contains("\"type\":\"technician\""));
        assert!(json.contains("\"roomID\":\"bay-1\""));
    }

    #[test]
    fn serialize_relayed_offer_is_verbatim() {
        let sdp = serde_json::json!({"type": "offer", "sdp": "v=0\r\no=- 4611731400430051336"});
        let msg = ServerMessage::Offer { sdp: sdp.clone() };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["sdp"], sdp);
    }

    #[test]
    fn serialize_peer_disconnected() {
        let msg = ServerMessage::PeerDisconnected {
            message: "The other user has disconnected.".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("peer_disconnected"));
        assert!(json.contains("The other user has disconnected."));
    }

    #[test]
    fn serialize_error() {
        let msg = ServerMessage::Error {
            message: "Invalid message".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Invalid message"));
    }
}
