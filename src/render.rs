//! Display-layer collaborator interface.
//!
//! The session never draws anything. It reports what changed through
//! [`Renderer`], and the display layer (a graph view, a terminal, a test)
//! decides what to do with it.
//!
//! [`TracingRenderer`] forwards every callback to `tracing` and is what the
//! client uses when nothing else is plugged in.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{error, info};

use crate::identifiers::{PunterId, SiteId};
use crate::protocol::{Map, Score};

// ============================================================================
// Constants
// ============================================================================

/// Punter colours, indexed by punter ID modulo the palette length.
pub const PALETTE: [&str; 20] = [
    "#1f77b4", "#ff7f0e", "#e377c2", "#bcbd22", "#d62728", "#17becf", "#8c564b", "#2ca02c",
    "#9467bd", "#98df8a", "#ff9896", "#c5b0d5", "#aec7e8", "#c49c94", "#ffbb78", "#f7b6d2",
    "#7f7f7f", "#c7c7c7", "#dbdb8d", "#9edae5",
];

/// Returns the display colour of `punter` as a CSS hex string.
#[must_use]
pub fn punter_colour(punter: PunterId) -> &'static str {
    // Modulo keeps the index below 20, so the cast cannot truncate.
    PALETTE[(punter.as_u64() % PALETTE.len() as u64) as usize]
}

// ============================================================================
// LogCategory
// ============================================================================

/// Category of a game log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Session progress.
    Info,
    /// A river claim.
    Move,
    /// A pass.
    Pass,
    /// A final score.
    Score,
    /// Any rejected frame, event or action.
    Error,
    /// Unframed relay text.
    Relay,
}

impl LogCategory {
    /// Lowercase label used as the log line prefix.
    #[inline]
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Move => "move",
            Self::Pass => "pass",
            Self::Score => "score",
            Self::Error => "error",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Callbacks exposed to the display layer.
///
/// Every method has an empty default, so implementors only override what
/// they draw.
pub trait Renderer {
    /// The map arrived; the game graph can be drawn.
    fn on_init(&mut self, _map: &Map) {}

    /// A river changed owner. Suitable for animation.
    fn on_edge_owned(&mut self, _punter: PunterId, _source: SiteId, _target: SiteId) {}

    /// The turn changed hands.
    fn on_turn_changed(&mut self, _is_ours: bool) {}

    /// The game ended with these scores, in server order.
    fn on_game_over(&mut self, _scores: &[Score]) {}

    /// A line for the game log.
    fn on_log_line(&mut self, _category: LogCategory, _text: &str) {}

    /// The one-line connection status changed.
    fn on_status(&mut self, _status: &str) {}
}

// ============================================================================
// TracingRenderer
// ============================================================================

/// A [`Renderer`] that writes everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn on_init(&mut self, map: &Map) {
        info!(
            sites = map.sites.len(),
            rivers = map.rivers.len(),
            mines = map.mines.len(),
            "Game graph received"
        );
    }

    fn on_edge_owned(&mut self, punter: PunterId, source: SiteId, target: SiteId) {
        info!(%punter, %source, %target, colour = punter_colour(punter), "Edge owned");
    }

    fn on_turn_changed(&mut self, is_ours: bool) {
        info!(is_ours, "Turn changed");
    }

    fn on_game_over(&mut self, scores: &[Score]) {
        for score in scores {
            info!(punter = %score.punter, score = score.score, "Final score");
        }
    }

    fn on_log_line(&mut self, category: LogCategory, text: &str) {
        match category {
            LogCategory::Error => error!("{category}: {text}"),
            _ => info!("{category}: {text}"),
        }
    }

    fn on_status(&mut self, status: &str) {
        info!(status, "Status");
    }
}

// ============================================================================
// Tests
// ============================================================================
