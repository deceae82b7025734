//! Client session state machine.
//!
//! This module turns inbound protocol events and local requests into state
//! transitions, without doing any I/O itself.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `pending` | Moves buffered before the setup message |
//! | `state` | [`Session`] and its transitions |
//! | `update` | [`Update`] effects returned by every handler |

// ============================================================================
// Submodules
// ============================================================================

/// Moves buffered before initialization.
pub mod pending;

/// The session state machine.
pub mod state;

/// Effects produced by session transitions.
pub mod update;

// ============================================================================
// Re-exports
// ============================================================================

pub use pending::PendingMoves;
pub use state::{ConnectionState, Session, TurnState};
pub use update::Update;
