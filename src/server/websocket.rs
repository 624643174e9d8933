//! WebSocket server implementation
//!
//! Provides a WebSocket server that listens on a configurable port and pairs
//! matchmaking clients through the room registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::{ConnectionHandler, ServerMessage};
use crate::room::RoomRegistry;

/// How long shutdown waits for open connections to close and clean up
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Configuration for the WebSocket server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(bind: String, port: u16) -> Self {
        Self { bind, port }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// WebSocket server for matchmaking clients
pub struct WebSocketServer {
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServer {
    /// Create a new WebSocket server
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            registry: Arc::new(RoomRegistry::new()),
            shutdown_tx,
        }
    }

    /// Room registry shared by all connections
    #[allow(dead_code)]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Trigger server shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind to the configured address and run the WebSocket server
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    ///
    /// Each connection is handled concurrently. Once a shutdown signal is received, waits up to
    /// [`SHUTDOWN_GRACE`] for every connection to send Close and release its room.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        info!("WebSocket server started on ws://{}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                // Accept new connections
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let registry = Arc::clone(&self.registry);
                            let shutdown_rx = self.shutdown_tx.subscribe();

                            connections.spawn(async move {
                                if let Err(e) = handle_connection(stream, peer_addr, registry, shutdown_rx).await {
                                    error!("Connection error from {}: {}", peer_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                // Reap finished connection tasks
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        if !connections.is_empty() {
            info!("Waiting for {} open connections to close...", connections.len());
        }
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "Aborting {} connections still open after {:?}",
                connections.len(),
                SHUTDOWN_GRACE
            );
            connections.shutdown().await;
        }

        let room_count = self.registry.room_count().await;
        if room_count > 0 {
            info!("Discarding {} open rooms", room_count);
        }

        Ok(())
    }
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<RoomRegistry>,
    shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    // Upgrade to WebSocket
    let ws_stream = accept_async(stream).await?;
    info!("Client connected from {}", peer_addr);

    let (mut handler, outbox) = ConnectionHandler::new(registry);
    debug!("Participant {} assigned to {}", handler.participant_id(), peer_addr);

    let result = message_loop(ws_stream, peer_addr, &mut handler, outbox, shutdown_rx).await;

    // Runs exactly once, whatever ended the loop
    let outcome = handler.handle_disconnect().await;
    debug!("Cleanup for {}: {:?}", peer_addr, outcome);

    info!("Connection from {} closed", peer_addr);
    result
}

/// Pump frames between the socket and the handler until the connection ends
async fn message_loop(
    ws_stream: tokio_tungstenite::WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    handler: &mut ConnectionHandler,
    mut outbox: tokio::sync::mpsc::UnboundedReceiver<ServerMessage>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            // Receive messages from client
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from {}: {}", peer_addr, text);
                        handler.handle_text(&text).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Received binary message from {} ({} bytes)", peer_addr, data.len());
                        handler.handle_binary(&data).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sender.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pong messages
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} requested close", peer_addr);
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frame, ignore
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Connection closed by {}", peer_addr);
                        break;
                    }
                }
            }
            // Deliver queued notifications
            Some(message) = outbox.recv() => {
                let json = message.to_json()?;
                ws_sender.send(Message::Text(json)).await?;
            }
            // Handle shutdown signal
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing connection to {}", peer_addr);
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    Ok(())
}
