//! Local game model.
//!
//! The client keeps exactly one piece of game state: which punter owns
//! which river. Everything else (the map, the scores) is handed straight to
//! the renderer.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `ledger` | Canonical edges and river ownership |

// ============================================================================
// Submodules
// ============================================================================

/// Canonical edges and the river ownership ledger.
pub mod ledger;

// ============================================================================
// Re-exports
// ============================================================================

pub use ledger::{Edge, Ledger};
