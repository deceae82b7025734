//! Relay wire protocol.
//!
//! This module defines the framing and message types spoken with the
//! relay.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Framed |
//! |---------|-----------|--------|
//! | Preamble `host:port:name` | Client → Relay | No (sent once) |
//! | Relay notice | Relay → Client | No (first text only) |
//! | `Setup` | Server → Client | Yes |
//! | `move` / `stop` / `timeout` | Server → Client | Yes |
//! | `claim` / `pass` | Client → Server | Yes |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound claim/pass builders |
//! | `frame` | `<N>:<json>` codec and inbound decoder |
//! | `message` | Typed wire messages |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound move request builders.
pub mod command;

/// Length-prefixed framing.
pub mod frame;

/// Wire message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{build_claim, build_pass};
pub use frame::{Inbound, InboundDecoder, decode, decode_all, encode};
pub use message::{
    Claim, Map, Move, Moves, Pass, River, Score, ServerMessage, Settings, Setup, Site, Stop,
};
