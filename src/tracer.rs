use crate::assignment::ParamIndices;
use log::trace;
use petgraph::stable_graph::NodeIndex;
use std::fmt::Debug;

/// Observer of the decisions taken by a matcher. All methods default to doing nothing.
pub trait MatchTracer: Debug {
    /// A candidate root pairing has been fully scored.
    fn root_candidate(&self, _nodes: [NodeIndex; 2], _params: &ParamIndices, _score: f64) {}

    /// The greedy matcher committed to an anchor pair.
    fn anchor_chosen(&self, _nodes: [NodeIndex; 2], _weight: f64, _similarity: f64) {}

    fn similarity(&self, _matcher: &str, _similarity: f64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl MatchTracer for NoopTracer {}

/// Forwards every event to the `log` crate at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracer;

impl MatchTracer for LogTracer {
    fn root_candidate(&self, nodes: [NodeIndex; 2], params: &ParamIndices, score: f64) {
        trace!(
            "root candidate ({}, {}) params {:?}: {}",
            nodes[0].index(),
            nodes[1].index(),
            params,
            score
        );
    }

    fn anchor_chosen(&self, nodes: [NodeIndex; 2], weight: f64, similarity: f64) {
        trace!(
            "anchor ({}, {}) weight {} similarity {}",
            nodes[0].index(),
            nodes[1].index(),
            weight,
            similarity
        );
    }

    fn similarity(&self, matcher: &str, similarity: f64) {
        trace!("{} similarity: {}", matcher, similarity);
    }
}
