use super::matched_pair::MatchedNodePair;
use super::{unit_score, MatchResult, Matcher};
use crate::assignment::{NodeMap, NodeMatch, ParamIndices};
use crate::bipartite::BipartiteGraph;
use crate::graph::Graph;
use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use crate::params::MatchParams;
use crate::score_norm::ScoreNorm;
use crate::similarity::SimilarityMeasurer;
use crate::tracer::{LogTracer, MatchTracer};
use crate::tsv::tsv_similarity;
use closed01::Closed01;
use log::debug;
use ndarray::Array2;
use petgraph::stable_graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};

/// Matches two graphs by repeatedly committing to the best available node pair.
///
/// Each anchor pair splits both graphs into the subgraph rooted at the anchor and the
/// remainder. The subgraphs are matched first, which keeps the correspondence hierarchical,
/// then the remainders, after penalizing pairs that would break the sibling relations of the
/// anchor.
#[derive(Debug)]
pub struct GreedyMatcher<M> {
    measurer: M,
    tracer: Box<dyn MatchTracer>,
}

impl<M> GreedyMatcher<M> {
    pub fn new(measurer: M) -> GreedyMatcher<M> {
        GreedyMatcher {
            measurer,
            tracer: Box::new(LogTracer),
        }
    }

    pub fn with_tracer<T: MatchTracer + 'static>(mut self, tracer: T) -> GreedyMatcher<M> {
        self.tracer = Box::new(tracer);
        self
    }

    /// Node similarities indexed by traversal index, blended with the TSV similarity.
    fn similarity_matrix<N, E>(&self, g0: &Graph<N, E>, g1: &Graph<N, E>, tsv_weight: f64) -> Array2<f64>
    where
        N: NodeAttributes,
        E: EdgeAttributes,
        M: SimilarityMeasurer<N, E>,
    {
        let params = ParamIndices::default();
        let mut sim = Array2::zeros((g0.node_count(), g1.node_count()));

        for u in g0.node_indices() {
            for v in g1.node_indices() {
                let node_sim = self.measurer.node_similarity(g0, u, g1, v, &params).get();
                let s = if node_sim > 0.0 && tsv_weight > 0.0 {
                    tsv_weight * tsv_similarity(g0.tsv(u), g1.tsv(v)) + (1.0 - tsv_weight) * node_sim
                } else {
                    node_sim
                };
                sim[[g0.tidx(u), g1.tidx(v)]] = s;
            }
        }

        sim
    }
}

struct GreedyState<'a> {
    params: &'a MatchParams,
    tracer: &'a dyn MatchTracer,
    sim: Array2<f64>,
    pair: MatchedNodePair,
    // query node -> (model node, similarity when matched)
    map: BTreeMap<NodeIndex, (NodeIndex, f64)>,
    matched_model: BTreeSet<NodeIndex>,
}

impl<'a> GreedyState<'a> {
    /// Matches what is left of both graphs and returns the sum of the similarities of the
    /// pairs committed on the way. Both graphs are consumed by the splitting.
    fn match_step<N: Clone, E: Clone>(&mut self, mut g0: Graph<N, E>, mut g1: Graph<N, E>) -> f64 {
        if g0.is_empty() || g1.is_empty() {
            return 0.0;
        }

        // A singleton has already been matched, unless this is the very first step.
        if (g0.node_count() == 1 || g1.node_count() == 1) && !self.map.is_empty() {
            return 0.0;
        }

        let (v0, v1) = match self.best_anchor(&g0, &g1) {
            Some(anchor) => anchor,
            None => return 0.0,
        };

        // Traversal indices must be read before splitting.
        let (i, j) = (g0.tidx(v0), g1.tidx(v1));
        let mut weight = self.sim[[i, j]];

        self.map.insert(v0, (v1, weight));
        self.matched_model.insert(v1);

        let sub0 = g0.split_subgraph(v0);
        let sub1 = g1.split_subgraph(v1);

        self.pair.set_empty();
        weight += self.match_step(sub0, sub1);

        self.pair.set_nodes(i, j);

        if !g0.is_empty() && !g1.is_empty() {
            let penalty = self.params.break_sibling_relation_penalty;
            self.pair.update_similarity_matrix(&mut self.sim, penalty);
            weight += self.match_step(g0, g1);
        }

        weight
    }

    /// Solves the assignment between the unmatched nodes of both graphs on their similarities
    /// and returns the selected pair of largest weight, where the weight blends similarity and
    /// relative node mass.
    fn best_anchor<N, E>(&self, g0: &Graph<N, E>, g1: &Graph<N, E>) -> Option<(NodeIndex, NodeIndex)> {
        let mut bg: BipartiteGraph<NodeIndex, f64> = BipartiteGraph::new();

        for v in g0.node_indices() {
            if !self.map.contains_key(&v) {
                bg.add_node(0, v);
            }
        }
        for v in g1.node_indices() {
            if !self.matched_model.contains(&v) {
                bg.add_node(1, v);
            }
        }

        let smw = self.params.similarity_mass_weight;
        let mass0 = g0.cumulative_mass() as f64;
        let mass1 = g1.cumulative_mass() as f64;

        for a in 0..bg.node_count(0) {
            let u = *bg.node(0, a);
            let i = g0.tidx(u);

            for b in 0..bg.node_count(1) {
                let v = *bg.node(1, b);
                let j = g1.tidx(v);

                let s = self.sim[[i, j]];
                if s <= 0.0 {
                    continue;
                }

                if self.params.preserve_ancestor_relation && !self.pair.ancestor_relation_preserved(i, j) {
                    continue;
                }

                let rel0 = g0.mass(u) as f64 / mass0;
                let rel1 = g1.mass(v) as f64 / mass1;
                debug_assert!(rel0 <= 1.0 && rel1 <= 1.0);

                bg.add_edge(a, b, s, smw * s + (1.0 - smw) * rel0.max(rel1));
            }
        }

        let mut best: Option<(f64, usize)> = None;
        for k in bg.solve_max_weight_assignment() {
            let w = bg.edges()[k].value;
            if best.map_or(true, |(max, _)| w > max) {
                best = Some((w, k));
            }
        }

        best.map(|(w, k)| {
            let e = &bg.edges()[k];
            let (u, v) = (*bg.node(0, e.source), *bg.node(1, e.target));
            self.tracer.anchor_chosen([u, v], w, e.weight);
            (u, v)
        })
    }
}

impl<N, E, M> Matcher<N, E> for GreedyMatcher<M>
where
    N: NodeAttributes + Clone,
    E: EdgeAttributes + Clone,
    M: SimilarityMeasurer<N, E>,
{
    fn match_graphs(&mut self, g0: &Graph<N, E>, g1: &Graph<N, E>, params: &MatchParams) -> MatchResult {
        params.assert_valid();

        if g0.is_empty() || g1.is_empty() {
            return MatchResult::empty();
        }

        let sim = self.similarity_matrix(g0, g1, params.tsv_similarity_weight);

        let mut state = GreedyState {
            params,
            tracer: &*self.tracer,
            sim,
            pair: MatchedNodePair::new(g0, g1),
            map: BTreeMap::new(),
            matched_model: BTreeSet::new(),
        };

        let total = state.match_step(g0.clone(), g1.clone());

        let similarity = unit_score(ScoreNorm::Mean.normalize(total, g0.node_count(), g1.node_count()));

        debug!(
            "greedy match '{}' / '{}': {} pairs, weight {}, similarity {}",
            g0.label(),
            g1.label(),
            state.map.len(),
            total,
            similarity.get()
        );
        self.tracer.similarity("greedy", similarity.get());

        let node_map: NodeMap = state
            .map
            .into_iter()
            .map(|(u, (v, s))| {
                let m = NodeMatch {
                    node: v,
                    similarity: Closed01::new(s),
                    params: ParamIndices::default(),
                };
                (u, m)
            })
            .collect();

        MatchResult { similarity, node_map }
    }
}
