//! Session outputs.
//!
//! Session handlers do no I/O. Each returns the [`Update`]s it produced;
//! the client loop sends frames, closes the connection and forwards the
//! rest to the [`Renderer`].

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::{PunterId, SiteId};
use crate::protocol::{Map, Move, Score};
use crate::render::{LogCategory, Renderer};

// ============================================================================
// Update
// ============================================================================

/// One effect produced by a session transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// The map arrived.
    Init(Map),
    /// A river changed owner. Sites are in canonical order.
    EdgeOwned {
        /// New owner.
        punter: PunterId,
        /// Lower site.
        source: SiteId,
        /// Upper site.
        target: SiteId,
    },
    /// The turn changed hands.
    TurnChanged(bool),
    /// The game ended.
    GameOver(Vec<Score>),
    /// A game log line.
    Log {
        /// Category.
        category: LogCategory,
        /// Text.
        text: String,
    },
    /// New connection status line.
    Status(String),
    /// Send this move to the server.
    Send(Move),
    /// Close the connection.
    Close,
}

impl Update {
    /// Creates a log update.
    #[inline]
    pub fn log(category: LogCategory, text: impl Into<String>) -> Self {
        Self::Log {
            category,
            text: text.into(),
        }
    }

    /// Creates a status update.
    #[inline]
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }

    /// Forwards this update to `renderer`. Transport actions are skipped.
    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        match self {
            Self::Init(map) => renderer.on_init(map),
            Self::EdgeOwned {
                punter,
                source,
                target,
            } => renderer.on_edge_owned(*punter, *source, *target),
            Self::TurnChanged(is_ours) => renderer.on_turn_changed(*is_ours),
            Self::GameOver(scores) => renderer.on_game_over(scores),
            Self::Log { category, text } => renderer.on_log_line(*category, text),
            Self::Status(status) => renderer.on_status(status),
            Self::Send(_) | Self::Close => {}
        }
    }
}
