//! Punter client - a participant client for turn-based river-claiming games.
//!
//! This library connects to a game server through a WebSocket relay, keeps
//! track of who owns which river, and lets the user claim a river or pass
//! when it is their turn.
//!
//! # Architecture
//!
//! The client is split into a pure state machine and thin I/O around it:
//!
//! - **Transport**: one WebSocket connection to the relay, with its own task
//! - **Session**: consumes decoded messages and user requests, returns
//!   [`Update`]s and never touches the network
//! - **Renderer**: receives every visible effect through the [`Renderer`]
//!   trait
//!
//! Key design principles:
//!
//! - Each [`Client`] owns: one [`Session`] + at most one relay connection
//! - Frames are `<N>:<json>` with `N` counted in bytes
//! - Moves that arrive before setup are buffered and replayed
//! - Every error is recoverable; the worst case is a disconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use punter_client::{Client, Endpoint, Result, TracingRenderer};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (client, handle) = Client::builder().build()?;
//!
//!     // Join the game on port 9001 behind the local relay
//!     handle.request_connect(Endpoint::localhost(9001), "alice")?;
//!
//!     let mut renderer = TracingRenderer;
//!     let session = client.run(&mut renderer).await;
//!     println!("scores: {:?}", session.scores());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client driver: [`Client`], [`ClientHandle`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`game`] | River ownership: [`Ledger`], [`Edge`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frame codec and wire message types |
//! | [`render`] | [`Renderer`] trait and punter colours |
//! | [`session`] | Session state machine |
//! | [`transport`] | WebSocket relay connection |

// ============================================================================
// Modules
// ============================================================================

/// Client driver and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Canonical edges and river ownership.
pub mod game;

/// Type-safe identifiers for punters, sites and sessions.
pub mod identifiers;

/// Relay wire protocol: framing, messages and move builders.
pub mod protocol;

/// Presentation boundary.
pub mod render;

/// Session state machine.
///
/// Pure transitions from inbound events and user requests to [`Update`]s.
pub mod session;

/// WebSocket transport layer.
///
/// Internal module handling the relay connection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientHandle, ClientOptions};

// Error types
pub use error::{Error, Result};

// Game types
pub use game::{Edge, Ledger};

// Identifier types
pub use identifiers::{PunterId, SessionId, SiteId};

// Protocol types
pub use protocol::{
    Claim, Inbound, InboundDecoder, Map, Move, Pass, River, Score, ServerMessage, Settings, Setup,
    Site, Stop,
};

// Rendering
pub use render::{LogCategory, PALETTE, Renderer, TracingRenderer, punter_colour};

// Session types
pub use session::{ConnectionState, Session, TurnState, Update};

// Transport types
pub use transport::{Endpoint, DEFAULT_RELAY_PORT};
