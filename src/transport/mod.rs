//! WebSocket transport layer.
//!
//! This module handles the connection between the client and the relay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │         WebSocket            │  Relay          │
//! │                 │◄────────────────────────────►│                 │
//! │  Connection     │     ws://host:5000           │  → game server  │
//! │                 │                              │    (game_port)  │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::open` - Spawn the I/O task, connect to the relay
//! 2. Send preamble `host:game_port:name`, emit `Opened`
//! 3. Decode inbound text into `Inbound` events, send outbound frames
//! 4. `Connection::close` or relay close - emit `Closed`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `endpoint` | Relay address and preamble |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Relay endpoint addressing.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionEvent, ConnectionEvents};
pub use endpoint::{DEFAULT_HOST, DEFAULT_RELAY_PORT, Endpoint, validate_display_name};
