//! Outbound move requests.
//!
//! Requests are built from the local selection exactly as the player made
//! it. Endpoints are not canonicalized; the receiver does that, the same
//! way this client canonicalizes the server's moves.
//!
//! Whether a request may be sent at all is decided by
//! [`Session::can_act`](crate::session::Session::can_act).

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::identifiers::{PunterId, SiteId};

use super::frame;
use super::message::{Claim, Move, Pass};

// ============================================================================
// Builders
// ============================================================================

/// Builds a claim request for the river between `source` and `target`.
#[inline]
#[must_use]
pub const fn build_claim(punter: PunterId, source: SiteId, target: SiteId) -> Move {
    Move::Claim(Claim {
        punter,
        source,
        target,
    })
}

/// Builds a pass request.
#[inline]
#[must_use]
pub const fn build_pass(punter: PunterId) -> Move {
    Move::Pass(Pass { punter })
}

impl Move {
    /// Encodes this move as a wire frame.
    ///
    /// # Errors
    ///
    /// [`Error::Json`](crate::Error::Json) if serialization fails.
    #[inline]
    pub fn to_frame(&self) -> Result<String> {
        frame::encode(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_keeps_wire_order() {
        let claim = build_claim(PunterId::new(1), SiteId::new(7), SiteId::new(3));
        let Move::Claim(inner) = claim else {
            panic!("expected claim");
        };
        assert_eq!(inner.source, SiteId::new(7));
        assert_eq!(inner.target, SiteId::new(3));
    }

    #[test]
    fn test_claim_frame() {
        let frame = build_claim(PunterId::new(1), SiteId::new(7), SiteId::new(3))
            .to_frame()
            .unwrap();
        let body = r#"{"claim":{"punter":1,"source":7,"target":3}}"#;
        assert_eq!(frame, format!("{}:{}", body.len(), body));
    }

    #[test]
    fn test_pass_frame() {
        let frame = build_pass(PunterId::new(4)).to_frame().unwrap();
        assert_eq!(frame, r#"21:{"pass":{"punter":4}}"#);
    }
}
