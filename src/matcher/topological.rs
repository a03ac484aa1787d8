use super::{unit_score, MatchResult, Matcher};
use crate::assignment::{NodeAssignment, ParamIndices};
use crate::bipartite::BipartiteGraph;
use crate::graph::Graph;
use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use crate::params::MatchParams;
use crate::score_norm::ScoreNorm;
use crate::similarity::SimilarityMeasurer;
use crate::tracer::{LogTracer, MatchTracer};
use approx::abs_diff_eq;
use log::{debug, trace};
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use std::collections::HashMap;

const ROOT_LEVEL: usize = 1;
const ROOT_INTERPRETATIONS: u8 = 4;

/// Minimizes the distance between two graphs as seen from a pair of nodes.
///
/// The distance of a pair is the distance of the subtrees rooted at it (matching children by a
/// bipartite assignment at every level) plus the distance of what lies above it, obtained by
/// matching the parents of the pair, their remaining children and their own parents in turn.
/// A deep pair can therefore be chosen over its ancestors when that is cheaper.
///
/// Distances are memoized per pair of nodes, interpretation and excluded child pair, and
/// computed with an explicit stack so that deep graphs do not exhaust the call stack.
#[derive(Debug)]
pub struct TopologicalMatcher<M> {
    measurer: M,
    tracer: Box<dyn MatchTracer>,
    root: Option<NodeAssignment>,
}

impl<M> TopologicalMatcher<M> {
    pub fn new(measurer: M) -> TopologicalMatcher<M> {
        TopologicalMatcher {
            measurer,
            tracer: Box::new(LogTracer),
            root: None,
        }
    }

    pub fn with_tracer<T: MatchTracer + 'static>(mut self, tracer: T) -> TopologicalMatcher<M> {
        self.tracer = Box::new(tracer);
        self
    }

    /// The best pairing of the last match, with its children and its chain of parents.
    pub fn root_assignment(&self) -> Option<&NodeAssignment> {
        self.root.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RootedKey {
    nodes: [NodeIndex; 2],
    params: ParamIndices,
    // child pair whose subtrees are left out
    excluded: Option<[NodeIndex; 2]>,
}

impl RootedKey {
    fn new(nodes: [NodeIndex; 2], params: ParamIndices) -> RootedKey {
        RootedKey {
            nodes,
            params,
            excluded: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChildLink {
    nodes: [NodeIndex; 2],
    edges: [EdgeIndex; 2],
    edge_similarity: f64,
    weighted_distance: f64,
}

#[derive(Debug, Clone)]
struct RootedDistance {
    distance: f64,
    node_similarity: f64,
    children: Vec<ChildLink>,
}

#[derive(Debug, Clone, Copy)]
struct ParentLink {
    parents: [NodeIndex; 2],
    edges: [EdgeIndex; 2],
    edge_similarity: f64,
    weighted_distance: f64,
}

#[derive(Debug, Clone, Copy)]
struct ParentsDistance {
    distance: f64,
    best: Option<ParentLink>,
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Rooted(RootedKey),
    Parents([NodeIndex; 2]),
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Enter(Task),
    Exit(Task),
}

struct TopologicalSearch<'a, N, E, M> {
    graphs: [&'a Graph<N, E>; 2],
    measurer: &'a M,
    rooted: HashMap<RootedKey, RootedDistance>,
    parents: HashMap<[NodeIndex; 2], ParentsDistance>,
}

impl<'a, N, E, M> TopologicalSearch<'a, N, E, M>
where
    N: NodeAttributes,
    E: EdgeAttributes,
    M: SimilarityMeasurer<N, E>,
{
    fn new(graphs: [&'a Graph<N, E>; 2], measurer: &'a M) -> Self {
        TopologicalSearch {
            graphs,
            measurer,
            rooted: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    fn graph_distance(&mut self, nodes: [NodeIndex; 2], params: ParamIndices) -> f64 {
        let key = RootedKey::new(nodes, params);
        self.solve(Task::Rooted(key));
        self.solve(Task::Parents(nodes));
        self.rooted[&key].distance + self.parents[&nodes].distance
    }

    fn is_solved(&self, task: &Task) -> bool {
        match task {
            Task::Rooted(key) => self.rooted.contains_key(key),
            Task::Parents(nodes) => self.parents.contains_key(nodes),
        }
    }

    fn solve(&mut self, task: Task) {
        let mut stack = vec![Frame::Enter(task)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(task) => {
                    if self.is_solved(&task) {
                        continue;
                    }
                    stack.push(Frame::Exit(task));
                    for dep in self.dependencies(&task) {
                        if !self.is_solved(&dep) {
                            stack.push(Frame::Enter(dep));
                        }
                    }
                }
                Frame::Exit(task) => {
                    if self.is_solved(&task) {
                        continue;
                    }
                    match task {
                        Task::Rooted(key) => self.compute_rooted_distance(key),
                        Task::Parents(nodes) => self.compute_parents_distance(nodes),
                    }
                }
            }
        }
    }

    fn dependencies(&self, task: &Task) -> Vec<Task> {
        match task {
            Task::Rooted(key) => self
                .child_candidates(key)
                .into_iter()
                .map(|(_, link)| Task::Rooted(RootedKey::new(link.nodes, ParamIndices::default())))
                .collect(),
            Task::Parents(nodes) => {
                let mut deps = Vec::new();
                for (parents, _, _) in self.parent_candidates(*nodes) {
                    deps.push(Task::Rooted(RootedKey {
                        nodes: parents,
                        params: ParamIndices::default(),
                        excluded: Some(*nodes),
                    }));
                    deps.push(Task::Parents(parents));
                }
                deps
            }
        }
    }

    fn out_edges(&self, side: usize, key: &RootedKey) -> Vec<EdgeIndex> {
        let g = self.graphs[side];
        let mut edges = g.out_edges(key.nodes[side]);
        if let Some(excluded) = key.excluded {
            edges.retain(|&e| g.target(e) != excluded[side]);
        }
        edges
    }

    /// Pairs of out-edges of a pair that may correspond: their positions among the out-edges,
    /// the child pair and the edge similarity.
    fn child_candidates(&self, key: &RootedKey) -> Vec<([usize; 2], ChildLink)> {
        let [g0, g1] = self.graphs;
        let edge_params = ParamIndices::root(key.params[0]);
        let out0 = self.out_edges(0, key);
        let out1 = self.out_edges(1, key);

        let mut candidates = Vec::new();
        for (a, &e0) in out0.iter().enumerate() {
            for (b, &e1) in out1.iter().enumerate() {
                let sim = self.measurer.edge_similarity(g0, e0, g1, e1, &edge_params).get();
                if sim > 0.0 {
                    let link = ChildLink {
                        nodes: [g0.target(e0), g1.target(e1)],
                        edges: [e0, e1],
                        edge_similarity: sim,
                        weighted_distance: 0.0,
                    };
                    candidates.push(([a, b], link));
                }
            }
        }
        candidates
    }

    /// Pairs of in-edges of a pair that may correspond, with their similarity.
    fn parent_candidates(&self, nodes: [NodeIndex; 2]) -> Vec<([NodeIndex; 2], [EdgeIndex; 2], f64)> {
        let [g0, g1] = self.graphs;
        let params = ParamIndices::default();
        let in1 = g1.in_edges(nodes[1]);

        let mut candidates = Vec::new();
        for e0 in g0.in_edges(nodes[0]) {
            for &e1 in &in1 {
                let sim = self.measurer.edge_similarity(g0, e0, g1, e1, &params).get();
                if sim > 0.0 {
                    candidates.push(([g0.source(e0), g1.source(e1)], [e0, e1], sim));
                }
            }
        }
        candidates
    }

    /// Distance of the subtrees rooted at a pair. Unmatched children cost their whole subtree,
    /// matched ones a blend of their distance and of that cost, weighted by edge similarity.
    fn compute_rooted_distance(&mut self, key: RootedKey) {
        let [g0, g1] = self.graphs;
        let [v0, v1] = key.nodes;

        let (node_distance, similarity) = self.measurer.node_distance(g0, v0, g1, v1, &key.params);
        assert!(node_distance >= 0.0, "negative node distance {}", node_distance);

        let out = [self.out_edges(0, &key), self.out_edges(1, &key)];
        let mut bg: BipartiteGraph<EdgeIndex, ChildLink> = BipartiteGraph::new();
        for side in 0..2 {
            for &e in &out[side] {
                bg.add_node(side, e);
            }
        }

        for ([a, b], mut link) in self.child_candidates(&key) {
            let d = self.rooted[&RootedKey::new(link.nodes, ParamIndices::default())].distance;
            let unmatched_cost = g0.subtree_cost(link.nodes[0]) + g1.subtree_cost(link.nodes[1]);
            link.weighted_distance = link.edge_similarity * d + (1.0 - link.edge_similarity) * unmatched_cost;

            // Matching a pair saves its unmatched cost and costs its weighted distance.
            let gain = unmatched_cost - link.weighted_distance;
            if gain > 0.0 {
                bg.add_edge(a, b, gain, link);
            }
        }

        let chosen = bg.into_max_weight_assignment();

        let mut matched = [vec![false; out[0].len()], vec![false; out[1].len()]];
        let mut distance = node_distance;
        for c in &chosen {
            matched[0][c.source] = true;
            matched[1][c.target] = true;
            distance += c.value.weighted_distance;
        }

        for side in 0..2 {
            let g = self.graphs[side];
            for (k, &e) in out[side].iter().enumerate() {
                if !matched[side][k] {
                    distance += g.subtree_cost(g.target(e));
                }
            }
        }

        self.rooted.insert(
            key,
            RootedDistance {
                distance,
                node_similarity: similarity.get(),
                children: chosen.into_iter().map(|c| c.value).collect(),
            },
        );
    }

    /// Distance of everything outside the subtrees of a pair, through its best parent pair.
    fn compute_parents_distance(&mut self, nodes: [NodeIndex; 2]) {
        let [g0, g1] = self.graphs;
        let complement = g0.subtree_complement_cost(nodes[0]) + g1.subtree_complement_cost(nodes[1]);

        let mut best: Option<ParentLink> = None;
        for (parents, edges, edge_sim) in self.parent_candidates(nodes) {
            let siblings = RootedKey {
                nodes: parents,
                params: ParamIndices::default(),
                excluded: Some(nodes),
            };
            let parents_complement = self.rooted[&siblings].distance + self.parents[&parents].distance;
            let wd = edge_sim * parents_complement + (1.0 - edge_sim) * complement;

            if best.map_or(true, |b| wd < b.weighted_distance) {
                best = Some(ParentLink {
                    parents,
                    edges,
                    edge_similarity: edge_sim,
                    weighted_distance: wd,
                });
            }
        }

        let distance = match best {
            Some(link) => link.weighted_distance,
            None => {
                // Nothing above can be matched.
                let mut cost = 0.0;
                for side in 0..2 {
                    let g = self.graphs[side];
                    if !g.is_root(nodes[side]) {
                        cost += g.subtree_complement_cost(nodes[side]);
                    }
                }
                cost
            }
        };

        self.parents.insert(nodes, ParentsDistance { distance, best });
    }

    /// Builds the pairing tree of a solved rooted distance.
    fn rooted_assignment(&self, key: &RootedKey, in_edges: [Option<EdgeIndex>; 2], edge_sim: f64) -> NodeAssignment {
        let entry = &self.rooted[key];

        let mut na = NodeAssignment::new(key.nodes, key.params, in_edges);
        na.set_node_similarity(entry.node_similarity * edge_sim);
        na.set_distance(entry.distance);

        for link in &entry.children {
            let child_key = RootedKey::new(link.nodes, ParamIndices::default());
            let mut child = self.rooted_assignment(&child_key, [Some(link.edges[0]), Some(link.edges[1])], link.edge_similarity);
            child.set_weighted_distance(link.weighted_distance);
            na.add_child(child);
        }

        na
    }

    /// Builds the chain of parent pairings above a pair, each with its other children.
    fn parent_assignment(&self, nodes: [NodeIndex; 2]) -> Option<NodeAssignment> {
        let link = self.parents[&nodes].best?;

        let grandparent = self.parents[&link.parents].best;
        let in_edges = match grandparent {
            Some(gp) => [Some(gp.edges[0]), Some(gp.edges[1])],
            None => [None, None],
        };

        let key = RootedKey {
            nodes: link.parents,
            params: ParamIndices::default(),
            excluded: Some(nodes),
        };

        let mut parent = self.rooted_assignment(&key, in_edges, link.edge_similarity);
        parent.set_given_child(nodes);
        parent.set_weighted_distance(link.weighted_distance);

        if let Some(gp) = self.parent_assignment(link.parents) {
            parent.set_parent(gp);
        }

        Some(parent)
    }
}

fn root_candidates<N, E>(g: &Graph<N, E>, include_roots: bool) -> Vec<NodeIndex> {
    g.node_indices()
        .into_iter()
        .filter(|&v| match g.level(v) {
            Some(ROOT_LEVEL) => true,
            Some(0) => include_roots,
            _ => false,
        })
        .collect()
}

impl<N, E, M> Matcher<N, E> for TopologicalMatcher<M>
where
    N: NodeAttributes,
    E: EdgeAttributes,
    M: SimilarityMeasurer<N, E>,
{
    fn match_graphs(&mut self, g0: &Graph<N, E>, g1: &Graph<N, E>, params: &MatchParams) -> MatchResult {
        params.assert_valid();
        self.root = None;

        let roots0 = root_candidates(g0, params.include_root_nodes);
        let roots1 = root_candidates(g1, params.include_root_nodes);

        let mut search = TopologicalSearch::new([g0, g1], &self.measurer);

        // (distance, average level, root key)
        let mut best: Option<(f64, f64, RootedKey)> = None;

        for &v0 in &roots0 {
            for &v1 in &roots1 {
                let level = (g0.level(v0).unwrap_or(0) + g1.level(v1).unwrap_or(0)) as f64 / 2.0;

                for p in 0..ROOT_INTERPRETATIONS {
                    let params = ParamIndices::root(p);
                    let distance = search.graph_distance([v0, v1], params);
                    self.tracer.root_candidate([v0, v1], &params, distance);

                    let better = match best {
                        None => true,
                        Some((d, l, _)) => {
                            if abs_diff_eq!(distance, d, epsilon = 1e-12) {
                                level < l
                            } else {
                                distance < d
                            }
                        }
                    };

                    if better {
                        best = Some((distance, level, RootedKey::new([v0, v1], params)));
                    }
                }
            }
        }

        let (distance, _, key) = match best {
            Some(best) => best,
            None => {
                debug!("topological match '{}' / '{}': no root candidates", g0.label(), g1.label());
                return MatchResult::empty();
            }
        };

        trace!(
            "topological: {} rooted and {} parent distances memoized",
            search.rooted.len(),
            search.parents.len()
        );

        let [v0, v1] = key.nodes;
        let mut root = search.rooted_assignment(&key, [g0.first_in_edge(v0), g1.first_in_edge(v1)], 1.0);
        root.set_weighted_distance(distance);
        if let Some(parent) = search.parent_assignment(key.nodes) {
            root.set_parent(parent);
        }

        let node_map = root.node_map();
        let sum: f64 = node_map.values().map(|m| m.similarity.get()).sum();
        let similarity = unit_score(ScoreNorm::Min.normalize(sum, g0.node_count(), g1.node_count()));

        debug!(
            "topological match '{}' / '{}': root ({}, {}), distance {}, similarity {}",
            g0.label(),
            g1.label(),
            v0.index(),
            v1.index(),
            distance,
            similarity.get()
        );
        self.tracer.similarity("topological", similarity.get());

        self.root = Some(root);

        MatchResult { similarity, node_map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::IgnoreNodeAttributes;

    #[test]
    fn test_parents_distance_of_leaf_pair() {
        // 0 -> 1, 0 -> 2 on both sides
        let mut g: Graph<f64, f64> = Graph::new("fork");
        let n: Vec<_> = (0..3).map(|_| g.add_node(1.0)).collect();
        g.add_edge(n[0], n[1], 1.0);
        g.add_edge(n[0], n[2], 1.0);
        g.compute_derived_values();

        let mut search = TopologicalSearch::new([&g, &g], &IgnoreNodeAttributes);
        assert_eq!(0.0, search.graph_distance([n[1], n[1]], ParamIndices::default()));
        assert_eq!(0.0, search.graph_distance([n[0], n[0]], ParamIndices::default()));

        let parent = search.parent_assignment([n[1], n[1]]).unwrap();
        assert_eq!([n[0], n[0]], parent.nodes());
        assert_eq!(Some([n[1], n[1]]), parent.given_child());
        assert_eq!(1, parent.children().len());
        assert_eq!([n[2], n[2]], parent.children()[0].nodes());
    }

    #[test]
    fn test_unmatched_children_cost_their_subtree() {
        // 0 -> 1 -> 2 against a single node
        let mut g0: Graph<f64, f64> = Graph::new("path");
        let n: Vec<_> = (0..3).map(|_| g0.add_node(1.0)).collect();
        g0.add_edge(n[0], n[1], 1.0);
        g0.add_edge(n[1], n[2], 1.0);
        g0.compute_derived_values();

        let mut g1: Graph<f64, f64> = Graph::new("single");
        let m = g1.add_node(1.0);
        g1.compute_derived_values();

        let mut search = TopologicalSearch::new([&g0, &g1], &IgnoreNodeAttributes);
        assert_eq!(2.0, search.graph_distance([n[0], m], ParamIndices::default()));
        // the parent of 1 is left unmatched
        assert_eq!(2.0, search.graph_distance([n[1], m], ParamIndices::default()));
    }
}
