//! Error types for the punter client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use punter_client::{Result, SiteId};
//!
//! fn example(handle: &ClientHandle) -> Result<()> {
//!     handle.request_claim(SiteId::new(1), SiteId::new(2))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! No error is fatal to the process. The worst outcome is a disconnect,
//! which the user recovers from by reconnecting.
//!
//! | Category | Variants | Handling |
//! |----------|----------|----------|
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`], [`Error::WebSocket`] | Status change, connect re-enabled |
//! | Frame decode | [`Error::FrameDecode`] | Logged, frame dropped |
//! | Protocol | [`Error::Protocol`], [`Error::DuplicateInit`], [`Error::UnexpectedMessage`] | Logged, event ignored |
//! | User action | [`Error::NotOurTurn`], [`Error::NotReady`], [`Error::EdgeOwned`], [`Error::UnknownEdge`], [`Error::AlreadyConnected`] | Rejected before send |
//! | Configuration | [`Error::Config`] | Returned from builders |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`] | Wrapped |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::game::Edge;
use crate::identifiers::PunterId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when an endpoint, display name or client option is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Relay did not accept the connection in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The connection's I/O task stopped without reporting why.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Send attempted while no connection is open.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Malformed length prefix or invalid JSON body.
    #[error("Frame decode error: {message}")]
    FrameDecode {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation by the server.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// A second setup message arrived after initialization.
    #[error("Duplicate init message")]
    DuplicateInit,

    /// Message received in a state that cannot accept it.
    #[error("Unexpected {kind} message while {state}")]
    UnexpectedMessage {
        /// Message kind (`move`, `stop`, ...).
        kind: &'static str,
        /// Session state at the time.
        state: &'static str,
    },

    // ========================================================================
    // User Action Errors
    // ========================================================================
    /// Local action attempted while it is another punter's turn.
    #[error("Not your turn")]
    NotOurTurn,

    /// Local action attempted before the game is ready.
    #[error("Game not ready")]
    NotReady,

    /// Connect requested while a session is already active.
    #[error("Already connected")]
    AlreadyConnected,

    /// Edge already owned.
    ///
    /// A user-action error for local claims, a protocol error when the
    /// server sends the claim.
    #[error("Edge {edge} already claimed by punter {owner}")]
    EdgeOwned {
        /// Canonical edge.
        edge: Edge,
        /// Current owner.
        owner: PunterId,
    },

    /// No river connects the two sites.
    #[error("No river {edge}")]
    UnknownEdge {
        /// Canonical site pair.
        edge: Edge,
    },

    // ========================================================================
    // Client Errors
    // ========================================================================
    /// The client event loop is no longer running.
    #[error("Client closed")]
    ClientClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Relay URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a frame decode error.
    #[inline]
    pub fn frame_decode(message: impl Into<String>) -> Self {
        Self::FrameDecode {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unexpected message error.
    #[inline]
    pub fn unexpected_message(kind: &'static str, state: &'static str) -> Self {
        Self::UnexpectedMessage { kind, state }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if this is a frame decode error.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::FrameDecode { .. })
    }

    /// Returns `true` if this is a protocol error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::DuplicateInit | Self::UnexpectedMessage { .. }
        )
    }

    /// Returns `true` if this error rejects a local user action.
    #[inline]
    #[must_use]
    pub fn is_user_action_error(&self) -> bool {
        matches!(
            self,
            Self::NotOurTurn
                | Self::NotReady
                | Self::AlreadyConnected
                | Self::EdgeOwned { .. }
                | Self::UnknownEdge { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Transport errors are recovered by reconnecting.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_transport_error() || self.is_decode_error() || self.is_protocol_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    use crate::identifiers::SiteId;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_edge_owned_display() {
        let err = Error::EdgeOwned {
            edge: Edge::canonical(SiteId::new(3), SiteId::new(2)),
            owner: PunterId::new(0),
        };
        assert_eq!(err.to_string(), "Edge 2 -- 3 already claimed by punter 0");
    }

    #[test]
    fn test_categories_are_disjoint() {
        let errors = [
            Error::NotConnected,
            Error::frame_decode("bad prefix"),
            Error::DuplicateInit,
            Error::NotOurTurn,
        ];

        for err in &errors {
            let hits = [
                err.is_transport_error(),
                err.is_decode_error(),
                err.is_protocol_error(),
                err.is_user_action_error(),
            ]
            .iter()
            .filter(|hit| **hit)
            .count();
            assert_eq!(hits, 1, "{err} should be in exactly one category");
        }
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::ConnectionClosed.is_recoverable());
        assert!(Error::frame_decode("x").is_recoverable());
        assert!(!Error::config("x").is_recoverable());
        assert!(!Error::NotOurTurn.is_recoverable());
    }

    #[test]
    fn test_unexpected_message_display() {
        let err = Error::unexpected_message("move", "disconnected");
        assert_eq!(err.to_string(), "Unexpected move message while disconnected");
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
