use std::collections::HashMap;

use super::types::{Role, Room, RoomToken};

/// Room capacity: exactly two seats, one technician and one expert.
pub(crate) const ROOM_CAPACITY: usize = 2;

/// Outcome of an admission check, computed without side effects so the
/// join rules are testable apart from any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Granted,
    RoomFull,
    RoleTaken,
}

/// Decide whether a connection may take `role` in `room`. Capacity is
/// checked before role occupancy, matching the join precedence: a full
/// room reports full even when the requested role is also taken.
pub(crate) fn admission(room: &Room, role: Role) -> Admission {
    if room.member_count() >= ROOM_CAPACITY {
        return Admission::RoomFull;
    }
    if room.role_holder(role).is_some() {
        return Admission::RoleTaken;
    }
    Admission::Granted
}

/// Owned map of room token to room state. Rooms are created lazily on the
/// first join for a token and removed the instant their membership drops
/// to zero; there is no other garbage collection.
#[derive(Debug, Default)]
pub(crate) struct RoomRegistry {
    rooms: HashMap<RoomToken, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing room for `token`, or a fresh empty one inserted under it.
    pub fn get_or_create(&mut self, token: &RoomToken) -> &mut Room {
        self.rooms.entry(token.clone()).or_default()
    }

    /// Lookup without creation. Relay handlers use this so that a message
    /// referencing an unknown room never materializes a room.
    pub fn find_mut(&mut self, token: &RoomToken) -> Option<&mut Room> {
        self.rooms.get_mut(token)
    }

    pub fn contains(&self, token: &RoomToken) -> bool {
        self.rooms.contains_key(token)
    }

    /// Remove the room under `token` if it has no members left.
    /// Returns true when the room was dropped.
    pub fn drop_if_empty(&mut self, token: &RoomToken) -> bool {
        if self.rooms.get(token).is_some_and(Room::is_empty) {
            self.rooms.remove(token);
            true
        } else {
            false
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
