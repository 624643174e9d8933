//! Room management module
//!
//! Tracks which connected participants share a room code and enforces the
//! two-player pairing rules.

mod participant;
mod registry;

pub use participant::*;
pub use registry::*;
