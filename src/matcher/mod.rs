//! The three matching strategies.
//!
//! * [`GreedyMatcher`] peels off the best anchor pair and recurses on the split graphs.
//! * [`AdaptiveMatcher`] maximizes a similarity tree, optionally skipping short branches.
//! * [`TopologicalMatcher`] minimizes a distance that also accounts for unmatched ancestors.

mod adaptive;
mod greedy;
mod matched_pair;
mod topological;

pub use self::adaptive::AdaptiveMatcher;
pub use self::greedy::GreedyMatcher;
pub use self::topological::TopologicalMatcher;

use crate::assignment::NodeMap;
use crate::graph::Graph;
use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use crate::params::MatchParams;
use closed01::Closed01;

/// Outcome of a match: a score in [0, 1] and the node correspondences found.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub similarity: Closed01<f64>,
    pub node_map: NodeMap,
}

impl MatchResult {
    pub fn empty() -> MatchResult {
        MatchResult {
            similarity: Closed01::zero(),
            node_map: NodeMap::new(),
        }
    }

    #[inline]
    pub fn similarity(&self) -> f64 {
        self.similarity.get()
    }
}

pub trait Matcher<N: NodeAttributes, E: EdgeAttributes> {
    /// Compares `g0` (the query) with `g1` (the model).
    ///
    /// Both graphs must have their derived values computed.
    fn match_graphs(&mut self, g0: &Graph<N, E>, g1: &Graph<N, E>, params: &MatchParams) -> MatchResult;
}

/// Clamps a normalized score into the unit interval.
pub(crate) fn unit_score(score: f64) -> Closed01<f64> {
    debug_assert!(score > -1e-9 && score < 1.0 + 1e-9, "score {} out of range", score);
    Closed01::new(score.max(0.0).min(1.0))
}
