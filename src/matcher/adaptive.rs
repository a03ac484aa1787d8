use super::{unit_score, MatchResult, Matcher};
use crate::assignment::{NodeAssignment, ParamIndices};
use crate::bipartite::BipartiteGraph;
use crate::graph::Graph;
use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use crate::params::MatchParams;
use crate::score_norm::ScoreNorm;
use crate::similarity::SimilarityMeasurer;
use crate::tracer::{LogTracer, MatchTracer};
use log::debug;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};

/// Level of the nodes tried as roots. Level 0 holds the synthetic root of the graph builder.
const ROOT_LEVEL: usize = 1;

/// Number of interpretations of a root pair tried.
const ROOT_INTERPRETATIONS: u8 = 4;

/// Maximizes the similarity of a tree of node pairs grown from every pair of level 1 nodes.
///
/// At every pair the children are matched by a bipartite assignment. Edges leading to short
/// intermediate nodes may be skipped, in which case the grandchildren are matched instead.
#[derive(Debug)]
pub struct AdaptiveMatcher<M> {
    measurer: M,
    tracer: Box<dyn MatchTracer>,
    root: Option<NodeAssignment>,
}

impl<M> AdaptiveMatcher<M> {
    pub fn new(measurer: M) -> AdaptiveMatcher<M> {
        AdaptiveMatcher {
            measurer,
            tracer: Box::new(LogTracer),
            root: None,
        }
    }

    pub fn with_tracer<T: MatchTracer + 'static>(mut self, tracer: T) -> AdaptiveMatcher<M> {
        self.tracer = Box::new(tracer);
        self
    }

    /// The best root pairing of the last match, with its tree of child pairings.
    pub fn root_assignment(&self) -> Option<&NodeAssignment> {
        self.root.as_ref()
    }
}

/// An edge considered when matching the children of a pair.
#[derive(Debug, Clone, Copy)]
struct EdgeChoice {
    edge: EdgeIndex,
    skip: bool,
    invert: bool,
}

impl EdgeChoice {
    fn child<N, E>(&self, g: &Graph<N, E>) -> NodeIndex {
        if self.invert {
            g.source(self.edge)
        } else {
            g.target(self.edge)
        }
    }
}

/// Skipped out-edges of one node, per endpoint of the node.
#[derive(Debug, Clone, Copy, Default)]
struct SkipEdges {
    e0: Option<EdgeIndex>,
    e1: Option<EdgeIndex>,
}

impl SkipEdges {
    fn contains(&self, e: EdgeIndex) -> bool {
        self.e0 == Some(e) || self.e1 == Some(e)
    }
}

/// Finds the out-edge of `v` attached at `endpoint` that leads to the shortest node that can
/// be skipped: a node with a single parent and children, all reached through non-empty edges.
fn skip_edge<N: NodeAttributes, E: EdgeAttributes>(g: &Graph<N, E>, v: NodeIndex, endpoint: usize) -> Option<EdgeIndex> {
    let mut best: Option<(f64, EdgeIndex)> = None;

    for e in g.out_edges(v) {
        let attrs = g.edge(e);
        if attrs.is_empty() || attrs.endpoint() != Some(endpoint) {
            continue;
        }

        let w = g.target(e);
        if g.out_degree(w) == 0 || g.in_degree(w) != 1 {
            continue;
        }

        if g.out_edges(w).into_iter().any(|ee| g.edge(ee).is_empty()) {
            continue;
        }

        let length = g.node(w).length();
        if best.map_or(true, |(min, _)| length < min) {
            best = Some((length, e));
        }
    }

    best.map(|(_, e)| e)
}

struct AdaptiveSearch<'a, N, E, M> {
    graphs: [&'a Graph<N, E>; 2],
    measurer: &'a M,
    params: &'a MatchParams,
    // pairs on the current recursion path, per side
    path: [Vec<NodeIndex>; 2],
}

impl<'a, N, E, M> AdaptiveSearch<'a, N, E, M>
where
    N: NodeAttributes,
    E: EdgeAttributes,
    M: SimilarityMeasurer<N, E>,
{
    fn on_path(&self, nodes: [NodeIndex; 2]) -> bool {
        self.path[0].contains(&nodes[0]) || self.path[1].contains(&nodes[1])
    }

    /// Sets the node similarity and the subtree similarity sum of `na`, and attaches its best
    /// child pairings.
    fn rooted_tree_similarity(&mut self, na: &mut NodeAssignment) {
        let [g0, g1] = self.graphs;
        let node_similarity = self
            .measurer
            .node_similarity(g0, na.node(0), g1, na.node(1), na.params())
            .get();

        self.path[0].push(na.node(0));
        self.path[1].push(na.node(1));

        let no_skips = [SkipEdges::default(); 2];
        let mut best_sum = self.child_similarity(na, &no_skips, node_similarity);

        if !self.params.disable_node_skipping {
            let mut skips = no_skips;
            let mut best: Option<NodeAssignment> = None;

            for side in 0..2 {
                let g = self.graphs[side];
                let e0 = skip_edge(g, na.node(side), 0);
                let e1 = skip_edge(g, na.node(side), 1);

                for &(skip0, skip1) in &[(false, true), (true, false), (true, true)] {
                    if (skip0 && e0.is_none()) || (skip1 && e1.is_none()) {
                        continue;
                    }

                    skips[side] = SkipEdges {
                        e0: if skip0 { e0 } else { None },
                        e1: if skip1 { e1 } else { None },
                    };

                    let mut alt = NodeAssignment::new(na.nodes(), *na.params(), [na.in_edge(0), na.in_edge(1)]);
                    let sum = self.child_similarity(&mut alt, &skips, node_similarity);

                    if sum > best_sum {
                        best_sum = sum;
                        best = Some(alt);
                    }
                }

                skips[side] = SkipEdges::default();
            }

            if let Some(alt) = best {
                *na = alt;
            }
        }

        self.path[0].pop();
        self.path[1].pop();
    }

    /// Matches the children of `na` for a fixed choice of skipped edges and returns the
    /// resulting subtree similarity sum.
    fn child_similarity(&mut self, na: &mut NodeAssignment, skips: &[SkipEdges; 2], node_similarity: f64) -> f64 {
        let mut bg: BipartiteGraph<EdgeChoice, NodeAssignment> = BipartiteGraph::new();

        for side in 0..2 {
            let g = self.graphs[side];
            let v = na.node(side);
            let in_edge = na.in_edge(side);

            for e in g.out_edges(v) {
                if Some(e) == in_edge {
                    continue;
                }

                if skips[side].contains(e) {
                    for ee in g.out_edges(g.target(e)) {
                        bg.add_node(side, EdgeChoice { edge: ee, skip: true, invert: false });
                    }
                } else {
                    bg.add_node(side, EdgeChoice { edge: e, skip: false, invert: false });
                }
            }

            // Look backwards through the other parents.
            for e in g.in_edges(v) {
                if Some(e) != in_edge && !g.is_root(g.source(e)) {
                    bg.add_node(side, EdgeChoice { edge: e, skip: false, invert: true });
                }
            }
        }

        let [g0, g1] = self.graphs;
        let mut edge_params = ParamIndices::root(na.params()[0]);

        for a in 0..bg.node_count(0) {
            let c0 = *bg.node(0, a);
            edge_params[1] = c0.skip as u8;
            edge_params[3] = c0.invert as u8;

            for b in 0..bg.node_count(1) {
                let c1 = *bg.node(1, b);
                edge_params[2] = c1.skip as u8;
                edge_params[4] = c1.invert as u8;

                let nodes = [c0.child(g0), c1.child(g1)];
                if self.on_path(nodes) {
                    continue;
                }

                let edge_sim = self.measurer.edge_similarity(g0, c0.edge, g1, c1.edge, &edge_params).get();
                if edge_sim <= 0.0 {
                    continue;
                }

                let mut node_params = edge_params;
                node_params[0] = 0;

                let mut child = NodeAssignment::new(nodes, node_params, [Some(c0.edge), Some(c1.edge)]);
                self.rooted_tree_similarity(&mut child);

                let weight = child.subtree_similarity_sum() * edge_sim;
                child.set_subtree_similarity_sum(weight);

                if weight > 0.0 {
                    bg.add_edge(a, b, weight, child);
                }
            }
        }

        let mut child_sum = 0.0;
        for c in bg.into_max_weight_assignment() {
            child_sum += c.weight;
            na.add_child(c.value);
        }

        na.set_node_similarity(node_similarity);
        na.set_subtree_similarity_sum(node_similarity + child_sum);
        na.subtree_similarity_sum()
    }
}

fn nodes_at_level<N, E>(g: &Graph<N, E>, level: usize) -> Vec<NodeIndex> {
    g.node_indices()
        .into_iter()
        .filter(|&v| g.level(v) == Some(level))
        .collect()
}

impl<N, E, M> Matcher<N, E> for AdaptiveMatcher<M>
where
    N: NodeAttributes,
    E: EdgeAttributes,
    M: SimilarityMeasurer<N, E>,
{
    fn match_graphs(&mut self, g0: &Graph<N, E>, g1: &Graph<N, E>, params: &MatchParams) -> MatchResult {
        params.assert_valid();
        self.root = None;

        let roots0 = nodes_at_level(g0, ROOT_LEVEL);
        let roots1 = nodes_at_level(g1, ROOT_LEVEL);

        let mut search = AdaptiveSearch {
            graphs: [g0, g1],
            measurer: &self.measurer,
            params,
            path: [Vec::new(), Vec::new()],
        };

        let mut best: Option<NodeAssignment> = None;

        for &v0 in &roots0 {
            for &v1 in &roots1 {
                for p in 0..ROOT_INTERPRETATIONS {
                    let mut na = NodeAssignment::new(
                        [v0, v1],
                        ParamIndices::root(p),
                        [g0.first_in_edge(v0), g1.first_in_edge(v1)],
                    );
                    search.rooted_tree_similarity(&mut na);

                    let sum = na.subtree_similarity_sum();
                    self.tracer.root_candidate([v0, v1], na.params(), sum);

                    if best.as_ref().map_or(true, |b| sum > b.subtree_similarity_sum()) {
                        best = Some(na);
                    }
                }
            }
        }

        let root = match best {
            Some(root) => root,
            None => {
                debug!("adaptive match '{}' / '{}': no root candidates", g0.label(), g1.label());
                return MatchResult::empty();
            }
        };

        // A node reached along several paths counts once. The synthetic root is not counted.
        let node_map = root.node_map();
        let sum: f64 = node_map.values().map(|m| m.similarity.get()).sum();
        let similarity = unit_score(ScoreNorm::Min.normalize(sum, g0.node_count() - 1, g1.node_count() - 1));

        debug!(
            "adaptive match '{}' / '{}': root ({}, {}), tree sum {}, map sum {}, similarity {}",
            g0.label(),
            g1.label(),
            root.node(0).index(),
            root.node(1).index(),
            root.subtree_similarity_sum(),
            sum,
            similarity.get()
        );
        self.tracer.similarity("adaptive", similarity.get());

        self.root = Some(root);

        MatchResult { similarity, node_map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Bone {
        endpoint: usize,
        empty: bool,
    }

    impl EdgeAttributes for Bone {
        fn is_empty(&self) -> bool {
            self.empty
        }

        fn endpoint(&self) -> Option<usize> {
            Some(self.endpoint)
        }
    }

    #[test]
    fn test_skip_edge_prefers_shortest() {
        // 0 -> 1 -> 3, 0 -> 2 -> 4, 0 -> 5 (leaf)
        let mut g: Graph<f64, Bone> = Graph::new("skip");
        let costs = [1.0, 3.0, 2.0, 1.0, 1.0, 0.5];
        let n: Vec<_> = costs.iter().map(|&c| g.add_node(c)).collect();
        let bone = |endpoint| Bone { endpoint, empty: false };
        g.add_edge(n[0], n[1], bone(0));
        g.add_edge(n[0], n[2], bone(0));
        g.add_edge(n[0], n[5], bone(0));
        g.add_edge(n[1], n[3], bone(0));
        g.add_edge(n[2], n[4], bone(0));
        g.compute_derived_values();

        let e = skip_edge(&g, n[0], 0).unwrap();
        assert_eq!(n[2], g.target(e));
        assert_eq!(None, skip_edge(&g, n[0], 1));
    }

    #[test]
    fn test_skip_edge_rejects_empty_grandchild_edges() {
        let mut g: Graph<f64, Bone> = Graph::new("skip");
        let n: Vec<_> = (0..3).map(|_| g.add_node(1.0)).collect();
        g.add_edge(n[0], n[1], Bone { endpoint: 1, empty: false });
        g.add_edge(n[1], n[2], Bone { endpoint: 0, empty: true });
        g.compute_derived_values();

        assert_eq!(None, skip_edge(&g, n[0], 1));
    }
}
