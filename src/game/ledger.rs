//! River ownership ledger.
//!
//! Rivers are undirected. The server does not order a claim's endpoints,
//! so every lookup goes through [`Edge::canonical`], which stores the lower
//! site first.
//!
//! Ownership is write-once: a claimed river is never reassigned, and a
//! rejected claim leaves the ledger untouched.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{PunterId, SiteId};
use crate::protocol::Map;

// ============================================================================
// Edge
// ============================================================================

/// An undirected river in canonical `(lower, upper)` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    lower: SiteId,
    upper: SiteId,
}

impl Edge {
    /// Builds the canonical edge between two sites, in either order.
    #[inline]
    #[must_use]
    pub fn canonical(a: SiteId, b: SiteId) -> Self {
        if a <= b {
            Self { lower: a, upper: b }
        } else {
            Self { lower: b, upper: a }
        }
    }

    /// Lower site.
    #[inline]
    #[must_use]
    pub const fn lower(&self) -> SiteId {
        self.lower
    }

    /// Upper site.
    #[inline]
    #[must_use]
    pub const fn upper(&self) -> SiteId {
        self.upper
    }

    /// Returns `true` if both ends are the same site.
    #[inline]
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.lower == self.upper
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.lower, self.upper)
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Ownership record for every river on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    rivers: FxHashMap<Edge, Option<PunterId>>,
}

impl Ledger {
    /// Builds an empty ledger with every river of `map` unowned.
    ///
    /// Self-loop rivers are skipped; they can never be claimed.
    #[must_use]
    pub fn from_map(map: &Map) -> Self {
        let mut rivers = FxHashMap::default();

        for river in &map.rivers {
            let edge = Edge::canonical(river.source, river.target);
            if edge.is_loop() {
                warn!(site = %edge.lower(), "Skipping self-loop river");
                continue;
            }
            rivers.insert(edge, None);
        }

        Self { rivers }
    }

    /// Records `punter` as the owner of the river between `a` and `b`.
    ///
    /// Returns the previous owner, which is always `None` on success.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownEdge`] if no river connects the sites
    /// - [`Error::EdgeOwned`] if the river is already owned
    pub fn apply_claim(&mut self, punter: PunterId, a: SiteId, b: SiteId) -> Result<Option<PunterId>> {
        let edge = Edge::canonical(a, b);

        // Self-loops are never inserted, so they fall through here too.
        let Some(slot) = self.rivers.get_mut(&edge) else {
            return Err(Error::UnknownEdge { edge });
        };

        if let Some(owner) = *slot {
            return Err(Error::EdgeOwned { edge, owner });
        }

        trace!(%punter, %edge, "River claimed");
        Ok(slot.replace(punter))
    }

    /// Records a pass. Passes own nothing, so this never fails.
    #[inline]
    pub fn apply_pass(&mut self, punter: PunterId) {
        trace!(%punter, "Pass recorded");
    }

    /// Returns the owner of the river between `a` and `b`, if any.
    #[inline]
    #[must_use]
    pub fn owner_of(&self, a: SiteId, b: SiteId) -> Option<PunterId> {
        self.rivers.get(&Edge::canonical(a, b)).copied().flatten()
    }

    /// Returns `true` if a river connects `a` and `b`.
    #[inline]
    #[must_use]
    pub fn contains(&self, a: SiteId, b: SiteId) -> bool {
        self.rivers.contains_key(&Edge::canonical(a, b))
    }

    /// Iterates over all rivers with their owners, in no particular order.
    pub fn edges(&self) -> impl Iterator<Item = (Edge, Option<PunterId>)> + '_ {
        self.rivers.iter().map(|(edge, owner)| (*edge, *owner))
    }

    /// Returns the rivers owned by `punter`, sorted.
    #[must_use]
    pub fn edges_owned_by(&self, punter: PunterId) -> Vec<Edge> {
        let mut owned: Vec<Edge> = self
            .rivers
            .iter()
            .filter(|(_, owner)| **owner == Some(punter))
            .map(|(edge, _)| *edge)
            .collect();
        owned.sort_unstable();
        owned
    }

    /// Number of claimed rivers.
    #[must_use]
    pub fn owned_count(&self) -> usize {
        self.rivers.values().filter(|owner| owner.is_some()).count()
    }

    /// Total number of rivers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rivers.len()
    }

    /// Returns `true` if the map has no rivers.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rivers.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::protocol::{River, Site};

    fn site(id: u64) -> SiteId {
        SiteId::new(id)
    }

    fn punter(id: u64) -> PunterId {
        PunterId::new(id)
    }

    fn triangle() -> Map {
        Map {
            sites: (1..=3).map(|id| Site::new(site(id))).collect(),
            rivers: vec![
                River::new(site(1), site(2)),
                River::new(site(3), site(2)),
                River::new(site(1), site(3)),
            ],
            mines: vec![site(1)],
        }
    }

    #[test]
    fn test_new_ledger_is_unowned() {
        let ledger = Ledger::from_map(&triangle());
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.owned_count(), 0);
        assert!(ledger.contains(site(2), site(3)));
        assert_eq!(ledger.owner_of(site(1), site(2)), None);
    }

    #[test]
    fn test_claim_is_direction_independent() {
        let mut ledger = Ledger::from_map(&triangle());
        let previous = ledger.apply_claim(punter(0), site(3), site(2)).unwrap();

        assert_eq!(previous, None);
        assert_eq!(ledger.owner_of(site(2), site(3)), Some(punter(0)));
        assert_eq!(ledger.owner_of(site(3), site(2)), Some(punter(0)));
    }

    #[test]
    fn test_second_claim_fails_without_mutation() {
        let mut ledger = Ledger::from_map(&triangle());
        ledger.apply_claim(punter(0), site(1), site(2)).unwrap();
        let snapshot = ledger.clone();

        let err = ledger.apply_claim(punter(1), site(2), site(1)).unwrap_err();

        assert!(matches!(err, Error::EdgeOwned { owner, .. } if owner == punter(0)));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_same_punter_cannot_reclaim() {
        let mut ledger = Ledger::from_map(&triangle());
        ledger.apply_claim(punter(0), site(1), site(2)).unwrap();
        assert!(ledger.apply_claim(punter(0), site(1), site(2)).is_err());
    }

    #[test]
    fn test_unknown_edge_rejected() {
        let map = Map {
            sites: (1..=3).map(|id| Site::new(site(id))).collect(),
            rivers: vec![River::new(site(1), site(2))],
            mines: vec![],
        };
        let mut ledger = Ledger::from_map(&map);

        let err = ledger.apply_claim(punter(0), site(2), site(3)).unwrap_err();
        assert!(matches!(err, Error::UnknownEdge { .. }));
        assert_eq!(ledger.owned_count(), 0);
    }

    #[test]
    fn test_self_loop_rejected() {
        let map = Map {
            sites: vec![Site::new(site(1))],
            rivers: vec![River::new(site(1), site(1))],
            mines: vec![],
        };
        let mut ledger = Ledger::from_map(&map);

        assert!(ledger.is_empty());
        assert!(ledger.apply_claim(punter(0), site(1), site(1)).is_err());
    }

    #[test]
    fn test_pass_changes_nothing() {
        let mut ledger = Ledger::from_map(&triangle());
        let snapshot = ledger.clone();
        ledger.apply_pass(punter(1));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_edges_owned_by_sorted() {
        let mut ledger = Ledger::from_map(&triangle());
        ledger.apply_claim(punter(1), site(3), site(1)).unwrap();
        ledger.apply_claim(punter(1), site(2), site(1)).unwrap();
        ledger.apply_claim(punter(0), site(2), site(3)).unwrap();

        assert_eq!(
            ledger.edges_owned_by(punter(1)),
            vec![Edge::canonical(site(1), site(2)), Edge::canonical(site(1), site(3))]
        );
        assert_eq!(ledger.edges().count(), 3);
    }

    #[test]
    fn test_edge_display() {
        assert_eq!(Edge::canonical(site(9), site(4)).to_string(), "4 -- 9");
    }

    proptest! {
        #[test]
        fn prop_canonical_is_symmetric(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(
                Edge::canonical(site(a), site(b)),
                Edge::canonical(site(b), site(a))
            );
        }

        #[test]
        fn prop_canonical_is_idempotent(a in any::<u64>(), b in any::<u64>()) {
            let once = Edge::canonical(site(a), site(b));
            let twice = Edge::canonical(once.lower(), once.upper());
            prop_assert_eq!(once, twice);
            prop_assert!(once.lower() <= once.upper());
        }
    }
}
