//! WebSocket connection handler
//!
//! Turns inbound frames of a single connection into registry calls.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::protocol::{decode_client_bytes, decode_client_message, ClientMessage, ProtocolResult};
use super::ServerMessage;
use crate::room::{DisconnectOutcome, Participant, RoomRegistry};

/// Handles a single WebSocket connection
pub struct ConnectionHandler {
    registry: Arc<RoomRegistry>,
    participant: Participant,
}

impl ConnectionHandler {
    /// Create a new connection handler
    ///
    /// Returns the handler together with the receiver of everything queued for this
    /// connection, which the transport drains into its sink.
    pub fn new(registry: Arc<RoomRegistry>) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (participant, outbox) = Participant::new();
        (
            Self {
                registry,
                participant,
            },
            outbox,
        )
    }

    /// Identifier of the participant behind this connection
    pub fn participant_id(&self) -> Uuid {
        self.participant.id()
    }

    /// Handle a text frame
    pub async fn handle_text(&mut self, text: &str) {
        let decoded = decode_client_message(text);
        self.dispatch(decoded).await;
    }

    /// Handle a binary frame, treating its payload as UTF-8 text
    pub async fn handle_binary(&mut self, data: &[u8]) {
        let decoded = decode_client_bytes(data);
        self.dispatch(decoded).await;
    }

    async fn dispatch(&mut self, decoded: ProtocolResult<Option<ClientMessage>>) {
        match decoded {
            Ok(Some(message)) => self.handle_message(message).await,
            Ok(None) => {
                debug!("Ignoring unrecognised message from {}", self.participant.id());
            }
            Err(e) => {
                debug!("Malformed message from {}: {}", self.participant.id(), e);
                self.handle_malformed_message();
            }
        }
    }

    async fn handle_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::CreateRoom { code } => {
                self.registry.create_room(&code, &mut self.participant).await;
            }
            ClientMessage::JoinRoom { code } => {
                if let Err(e) = self.registry.join_room(&code, &mut self.participant).await {
                    self.participant.send(e.into());
                }
            }
        }
    }

    /// Reply to an undecodable frame; no room state is touched
    pub fn handle_malformed_message(&self) {
        self.participant.send(ServerMessage::invalid_json());
    }

    /// Release this connection's room membership
    ///
    /// Consumes the handler so cleanup runs at most once per connection.
    pub async fn handle_disconnect(self) -> DisconnectOutcome {
        self.registry.handle_disconnect(&self.participant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomState;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_create_and_join_via_text() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut host, mut host_rx) = ConnectionHandler::new(Arc::clone(&registry));
        let (mut guest, mut guest_rx) = ConnectionHandler::new(Arc::clone(&registry));

        host.handle_text(r#"{"type": "create_room", "code": "ROOM1"}"#)
            .await;
        guest
            .handle_text(r#"{"type": "join_room", "code": "ROOM1"}"#)
            .await;

        assert_eq!(
            drain(&mut host_rx),
            vec![
                ServerMessage::room_created("ROOM1"),
                ServerMessage::opponent_joined("ROOM1")
            ]
        );
        assert_eq!(drain(&mut guest_rx), vec![ServerMessage::room_joined("ROOM1")]);
        assert_eq!(registry.room_state("ROOM1").await, Some(RoomState::Full));
    }

    #[tokio::test]
    async fn test_join_failure_replies_with_error() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut guest, mut guest_rx) = ConnectionHandler::new(Arc::clone(&registry));

        guest
            .handle_text(r#"{"type": "join_room", "code": "MISSING"}"#)
            .await;

        assert_eq!(
            drain(&mut guest_rx),
            vec![ServerMessage::room_not_found_or_full()]
        );
    }

    #[tokio::test]
    async fn test_malformed_message_isolated() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut host, mut host_rx) = ConnectionHandler::new(Arc::clone(&registry));

        host.handle_text(r#"{"type": "create_room", "code": "R"}"#)
            .await;
        drain(&mut host_rx);

        host.handle_text("{not json").await;

        assert_eq!(drain(&mut host_rx), vec![ServerMessage::invalid_json()]);
        assert_eq!(registry.members("R").await, Some(vec![host.participant_id()]));
    }

    #[tokio::test]
    async fn test_unknown_type_is_noop() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut client, mut rx) = ConnectionHandler::new(Arc::clone(&registry));

        client.handle_text(r#"{"type": "ping"}"#).await;
        client.handle_text(r#"{"code": "R"}"#).await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_string_codes_become_room_keys() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut host, mut host_rx) = ConnectionHandler::new(Arc::clone(&registry));
        let (mut guest, mut guest_rx) = ConnectionHandler::new(Arc::clone(&registry));

        host.handle_text(r#"{"type": "create_room", "code": 1234}"#)
            .await;
        assert_eq!(drain(&mut host_rx), vec![ServerMessage::room_created("1234")]);
        assert_eq!(registry.room_state("1234").await, Some(RoomState::Waiting));

        // numeric and string forms name the same room
        guest
            .handle_text(r#"{"type": "join_room", "code": "1234"}"#)
            .await;
        assert_eq!(drain(&mut guest_rx), vec![ServerMessage::room_joined("1234")]);
        assert_eq!(drain(&mut host_rx), vec![ServerMessage::opponent_joined("1234")]);
    }

    #[tokio::test]
    async fn test_missing_code_creates_undefined_room() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut host, mut host_rx) = ConnectionHandler::new(Arc::clone(&registry));

        host.handle_text(r#"{"type": "create_room"}"#).await;

        assert_eq!(
            drain(&mut host_rx),
            vec![ServerMessage::room_created("undefined")]
        );
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(
            registry.members("undefined").await,
            Some(vec![host.participant_id()])
        );
    }

    #[tokio::test]
    async fn test_binary_frames() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut client, mut rx) = ConnectionHandler::new(Arc::clone(&registry));

        client
            .handle_binary(br#"{"type": "create_room", "code": "BIN"}"#)
            .await;
        client.handle_binary(&[0xc3, 0x28]).await;

        assert_eq!(
            drain(&mut rx),
            vec![
                ServerMessage::room_created("BIN"),
                ServerMessage::invalid_json()
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut host, _host_rx) = ConnectionHandler::new(Arc::clone(&registry));

        host.handle_text(r#"{"type": "create_room", "code": "GONE"}"#)
            .await;
        let outcome = host.handle_disconnect().await;

        assert_eq!(
            outcome,
            DisconnectOutcome::RoomDeleted {
                code: "GONE".to_string()
            }
        );
        assert_eq!(registry.room_count().await, 0);
    }
}
