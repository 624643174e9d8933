//! WebSocket server module
//!
//! Handles WebSocket connections from matchmaking clients and routes their
//! requests to the room registry.

mod handler;
mod protocol;
mod websocket;

pub use handler::*;
pub use protocol::*;
pub use websocket::*;
