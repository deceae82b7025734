//! Moves received before the map.

use crate::identifiers::PunterId;
use crate::protocol::{Claim, Move};

/// Moves buffered while the session waits for its setup message.
///
/// Claims keep arrival order. Passes do not touch the ledger, so only the
/// fact that one happened (and who made the last one) is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingMoves {
    claims: Vec<Claim>,
    pass: Option<PunterId>,
}

impl PendingMoves {
    /// Buffers one move.
    pub fn push(&mut self, mv: Move) {
        match mv {
            Move::Claim(claim) => self.claims.push(claim),
            Move::Pass(pass) => self.pass = Some(pass.punter),
        }
    }

    /// Buffered claims, oldest first.
    #[inline]
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// The punter of the last buffered pass, if any pass arrived.
    #[inline]
    #[must_use]
    pub const fn pass(&self) -> Option<PunterId> {
        self.pass
    }

    /// Returns `true` if nothing was buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty() && self.pass.is_none()
    }

    /// Consumes the buffer into its claims and pass flag.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (Vec<Claim>, Option<PunterId>) {
        (self.claims, self.pass)
    }
}
