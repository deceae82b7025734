//! Typed wire messages.
//!
//! Server messages are distinguished by their top-level key, not by a type
//! tag:
//!
//! | Key | Message | Direction |
//! |-----|---------|-----------|
//! | `map` | [`Setup`] | Server → Client |
//! | `move` | moves of the last round | Server → Client |
//! | `stop` | [`Stop`] | Server → Client |
//! | `timeout` | move deadline missed | Server → Client |
//! | `you` | handshake echo | Server → Client |
//! | `claim` / `pass` | [`Move`] | Client → Server |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonObject, Value};

use crate::error::{Error, Result};
use crate::identifiers::{PunterId, SiteId};

// ============================================================================
// Map
// ============================================================================

/// A map site. Coordinates are optional and only used for layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Site identifier.
    pub id: SiteId,

    /// Layout x coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    /// Layout y coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl Site {
    /// Creates a site without coordinates.
    #[inline]
    #[must_use]
    pub const fn new(id: SiteId) -> Self {
        Self { id, x: None, y: None }
    }
}

/// A river between two sites, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct River {
    /// First site as sent.
    pub source: SiteId,
    /// Second site as sent.
    pub target: SiteId,
}

impl River {
    /// Creates a river.
    #[inline]
    #[must_use]
    pub const fn new(source: SiteId, target: SiteId) -> Self {
        Self { source, target }
    }
}

/// The game graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    /// Graph nodes.
    pub sites: Vec<Site>,
    /// Graph edges.
    pub rivers: Vec<River>,
    /// Sites holding a mine.
    #[serde(default)]
    pub mines: Vec<SiteId>,
}

// ============================================================================
// Setup
// ============================================================================

/// Optional rule extensions announced with the setup message.
///
/// Recorded for the renderer; the client does not play them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Futures enabled.
    #[serde(default)]
    pub futures: bool,
    /// Splurges enabled.
    #[serde(default)]
    pub splurges: bool,
    /// Options enabled.
    #[serde(default)]
    pub options: bool,
}

/// Initial message: our punter ID, the punter count and the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    /// Our punter ID.
    pub punter: PunterId,
    /// Number of punters in the game.
    pub punters: u64,
    /// The game graph.
    pub map: Map,
    /// Rule extensions, when the server sends them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

// ============================================================================
// Moves
// ============================================================================

/// Claim of one river.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claiming punter.
    pub punter: PunterId,
    /// First site, not canonicalized.
    pub source: SiteId,
    /// Second site, not canonicalized.
    pub target: SiteId,
}

/// A punter declining to claim this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    /// Passing punter.
    pub punter: PunterId,
}

/// One move, serialized as `{"claim": {...}}` or `{"pass": {...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    /// River claim.
    Claim(Claim),
    /// Pass.
    Pass(Pass),
}

impl Move {
    /// Returns the punter who made the move.
    #[inline]
    #[must_use]
    pub const fn punter(&self) -> PunterId {
        match self {
            Self::Claim(claim) => claim.punter,
            Self::Pass(pass) => pass.punter,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim(claim) => write!(
                f,
                "punter #{} claimed edge {} -- {}",
                claim.punter, claim.source, claim.target
            ),
            Self::Pass(pass) => write!(f, "punter #{} passed", pass.punter),
        }
    }
}

/// Body of a `move` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moves {
    /// Moves of the last round, in server order.
    pub moves: Vec<Move>,
}

// ============================================================================
// Stop
// ============================================================================

/// Final score of one punter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Punter.
    pub punter: PunterId,
    /// Score.
    pub score: i64,
}

/// End-of-game message: the last moves and the final scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Moves made since the last `move` message.
    #[serde(default)]
    pub moves: Vec<Move>,
    /// Final scores, in server order.
    #[serde(default)]
    pub scores: Vec<Score>,
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A classified server → client message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Game setup (the init event).
    Setup(Setup),
    /// Moves of the last round.
    Move(Moves),
    /// Game over.
    Stop(Stop),
    /// We missed the move deadline (seconds).
    Timeout(f64),
    /// Handshake echo carrying our name.
    Handshake(String),
}

impl ServerMessage {
    /// Classifies a decoded JSON value by its top-level key.
    ///
    /// `map` wins over the other keys, matching how the relay tags setup.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the value is not an object, has no known key,
    /// or the body under the key is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(Error::protocol(format!("expected JSON object, got {other}")));
            }
        };

        if object.contains_key("map") {
            return parse_body("setup", Value::Object(object)).map(Self::Setup);
        }
        if let Some(body) = object.remove("move") {
            return parse_body("move", body).map(Self::Move);
        }
        if let Some(body) = object.remove("stop") {
            return parse_body("stop", body).map(Self::Stop);
        }
        if let Some(body) = object.remove("timeout") {
            return parse_body("timeout", body).map(Self::Timeout);
        }
        if let Some(body) = object.remove("you") {
            return parse_body("handshake", body).map(Self::Handshake);
        }

        Err(Error::protocol(format!(
            "unknown message with keys [{}]",
            key_list(&object)
        )))
    }

    /// Short message kind for logs and errors.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Setup(_) => "setup",
            Self::Move(_) => "move",
            Self::Stop(_) => "stop",
            Self::Timeout(_) => "timeout",
            Self::Handshake(_) => "handshake",
        }
    }
}

/// Deserializes one message body, mapping failures to protocol errors.
fn parse_body<T: DeserializeOwned>(kind: &str, body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| Error::protocol(format!("malformed {kind} message: {e}")))
}

fn key_list(object: &JsonObject<String, Value>) -> String {
    object.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// Tests
// ============================================================================
