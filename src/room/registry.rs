//! Room registry
//!
//! Maps room codes to their membership and drives the room lifecycle:
//! creation, capacity-limited joining, join notification, and cleanup on disconnect.
//! Every operation runs under one mutex so no caller ever sees a half-updated room.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Participant, ParticipantHandle};
use crate::server::{ServerMessage, ROOM_NOT_FOUND_OR_FULL};

/// Maximum number of participants in a room
pub const ROOM_CAPACITY: usize = 2;

/// Errors that can occur during registry operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("{ROOM_NOT_FOUND_OR_FULL}: {0}")]
    NotFoundOrFull(String),
}

/// Result type for registry operations
pub type RoomResult<T> = Result<T, RoomError>;

impl From<RoomError> for ServerMessage {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFoundOrFull(_) => ServerMessage::room_not_found_or_full(),
        }
    }
}

/// Room occupancy states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// One participant, open for joining
    Waiting,
    /// Two participants, rejects further joins
    Full,
}

/// What a disconnect did to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The participant had no room, its room no longer exists, or it was no longer a member
    NoRoom,
    /// The participant left; the room still has members
    Left { code: String, remaining: usize },
    /// The participant left and the room was deleted
    RoomDeleted { code: String },
}

/// A pairing slot holding up to [`ROOM_CAPACITY`] participants
#[derive(Debug)]
struct Room {
    members: Vec<ParticipantHandle>,
}

impl Room {
    fn with_owner(owner: ParticipantHandle) -> Self {
        Self {
            members: vec![owner],
        }
    }

    fn state(&self) -> RoomState {
        if self.members.len() >= ROOM_CAPACITY {
            RoomState::Full
        } else {
            RoomState::Waiting
        }
    }
}

/// Owns every active room
///
/// Shared across connection tasks behind an `Arc`. The participant list of a room is only
/// ever touched through these methods.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Create the room `code` with `requester` as its only member
    ///
    /// An existing room under the same code is replaced without notice.
    pub async fn create_room(&self, code: &str, requester: &mut Participant) {
        let mut rooms = self.rooms.lock().await;

        let room = Room::with_owner(requester.handle().clone());
        if let Some(previous) = rooms.insert(code.to_string(), room) {
            debug!(
                "Room {} replaced, dropping {} previous member(s)",
                code,
                previous.members.len()
            );
        }
        requester.set_current_room(code);
        requester.send(ServerMessage::room_created(code));

        info!("Room created: {} by {}", code, requester.id());
    }

    /// Add `requester` to the waiting room `code` and notify the existing member
    ///
    /// Fails without touching any state unless the room exists with exactly one member.
    pub async fn join_room(&self, code: &str, requester: &mut Participant) -> RoomResult<()> {
        let mut rooms = self.rooms.lock().await;

        let room = match rooms.get_mut(code) {
            Some(room) if room.members.len() == 1 => room,
            _ => {
                debug!("Join rejected for {} on room {}", requester.id(), code);
                return Err(RoomError::NotFoundOrFull(code.to_string()));
            }
        };

        room.members.push(requester.handle().clone());
        requester.set_current_room(code);
        requester.send(ServerMessage::room_joined(code));

        for member in room.members.iter().filter(|m| m.id() != requester.id()) {
            member.send(ServerMessage::opponent_joined(code));
        }

        info!("Room joined: {} by {}", code, requester.id());
        Ok(())
    }

    /// Remove `requester` from the room it last created or joined
    ///
    /// The remaining member is not notified. A room left empty is deleted.
    pub async fn handle_disconnect(&self, requester: &Participant) -> DisconnectOutcome {
        let Some(code) = requester.current_room() else {
            return DisconnectOutcome::NoRoom;
        };

        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(code) else {
            debug!("Room {} already gone for {}", code, requester.id());
            return DisconnectOutcome::NoRoom;
        };

        let before = room.members.len();
        room.members.retain(|m| m.id() != requester.id());
        let remaining = room.members.len();

        if remaining == before {
            debug!("{} is no longer a member of room {}", requester.id(), code);
            DisconnectOutcome::NoRoom
        } else if remaining == 0 {
            rooms.remove(code);
            info!("Room deleted: {}", code);
            DisconnectOutcome::RoomDeleted {
                code: code.to_string(),
            }
        } else {
            debug!("{} left room {}, {} remaining", requester.id(), code, remaining);
            DisconnectOutcome::Left {
                code: code.to_string(),
                remaining,
            }
        }
    }

    /// Number of rooms currently registered
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Occupancy state of a room, `None` if it does not exist
    #[allow(dead_code)]
    pub async fn room_state(&self, code: &str) -> Option<RoomState> {
        self.rooms.lock().await.get(code).map(Room::state)
    }

    /// Member ids of a room in join order
    #[allow(dead_code)]
    pub async fn members(&self, code: &str) -> Option<Vec<Uuid>> {
        self.rooms
            .lock()
            .await
            .get(code)
            .map(|room| room.members.iter().map(ParticipantHandle::id).collect())
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
