//! Connected participants
//!
//! A participant is one live client connection. Rooms hold cheap clonable
//! [`ParticipantHandle`]s; the connection itself owns the [`Participant`] and with it the
//! back-reference to the room it last created or joined.

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::server::ServerMessage;

/// Non-owning reference to a connection, stored in room membership lists
#[derive(Debug, Clone)]
pub struct ParticipantHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ParticipantHandle {
    /// Participant identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a message for delivery to this participant
    ///
    /// Best effort: returns `false` if the connection has already gone away.
    pub fn send(&self, message: ServerMessage) -> bool {
        match self.tx.send(message) {
            Ok(()) => true,
            Err(_) => {
                debug!("Dropping message for closed participant {}", self.id);
                false
            }
        }
    }
}

impl PartialEq for ParticipantHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParticipantHandle {}

/// A connected client as seen by the connection that owns it
#[derive(Debug)]
pub struct Participant {
    handle: ParticipantHandle,
    /// Code of the room this participant last created or joined.
    /// May be stale: the room can be deleted or replaced at any time.
    current_room: Option<String>,
}

impl Participant {
    /// Create a participant with a fresh id, returning the receiving end of its outbox
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let participant = Self {
            handle: ParticipantHandle {
                id: Uuid::new_v4(),
                tx,
            },
            current_room: None,
        };
        (participant, rx)
    }

    /// Participant identifier
    pub fn id(&self) -> Uuid {
        self.handle.id
    }

    /// Handle suitable for storing in a room
    pub fn handle(&self) -> &ParticipantHandle {
        &self.handle
    }

    /// Code of the room last created or joined, if any
    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    pub(crate) fn set_current_room(&mut self, code: impl Into<String>) {
        self.current_room = Some(code.into());
    }

    /// Queue a message for delivery to this participant
    pub fn send(&self, message: ServerMessage) -> bool {
        self.handle.send(message)
    }
}
