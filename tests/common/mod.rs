#![allow(dead_code)]

use asexp::sexp::Sexp;
use closed01::Closed01;
use graph_io_gml::parse_gml;
use skeleton_graph_matching::{
    EdgeAttributes, Graph, GraphBuilder, NodeAttributes, NodeIndex, ParamIndices, SimilarityMeasurer,
};
use std::fs;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn convert_weight(w: Option<&Sexp>) -> Option<f64> {
    match w {
        Some(s) => s.get_float(),
        None => {
            // use a default
            Some(1.0)
        }
    }
}

/// Loads a GML file whose node weights are the node costs and whose edge weights are the
/// edge weights. Derived values are computed.
pub fn load_graph(graph_file: &str) -> Graph<f64, f64> {
    let graph_str = fs::read_to_string(graph_file).unwrap();

    let graph = parse_gml(
        &graph_str,
        &|node_sexp| -> Option<f64> { node_sexp.and_then(|se| se.get_float()) },
        &convert_weight,
    )
    .unwrap();

    let mut builder = GraphBuilder::new(graph_file);
    for v in graph.node_indices() {
        builder.add_node(v.index(), graph[v]);
    }
    for e in graph.raw_edges() {
        builder.add_edge(e.source().index(), e.target().index(), e.weight);
    }
    builder.build()
}

/// A labelled part with a cost.
#[derive(Debug, Clone)]
pub struct Part {
    pub label: &'static str,
    pub cost: f64,
}

impl NodeAttributes for Part {
    fn cost(&self) -> f64 {
        self.cost
    }
}

/// Nodes are identical if their labels are, and unrelated otherwise.
#[derive(Debug)]
pub struct SameLabel;

impl<E: EdgeAttributes> SimilarityMeasurer<Part, E> for SameLabel {
    fn node_similarity(
        &self,
        g0: &Graph<Part, E>,
        v0: NodeIndex,
        g1: &Graph<Part, E>,
        v1: NodeIndex,
        _params: &ParamIndices,
    ) -> Closed01<f64> {
        if g0.node(v0).label == g1.node(v1).label {
            Closed01::one()
        } else {
            Closed01::zero()
        }
    }
}

/// Builds a graph of unit cost parts. Node ids are positions in `labels`.
pub fn parts(name: &str, labels: &[&'static str], edges: &[(usize, usize)]) -> Graph<Part, f64> {
    let mut builder = GraphBuilder::new(name);
    for (id, &label) in labels.iter().enumerate() {
        builder.add_node(id, Part { label, cost: 1.0 });
    }
    for &(s, t) in edges {
        builder.add_edge(s, t, 1.0);
    }
    builder.build()
}

/// A bone attached at one endpoint of its parent.
#[derive(Debug, Clone)]
pub struct Bone {
    pub endpoint: usize,
}

impl EdgeAttributes for Bone {
    fn endpoint(&self) -> Option<usize> {
        Some(self.endpoint)
    }
}

/// Like `parts`, but edges are `(source, target, endpoint)` bones.
pub fn bones(name: &str, labels: &[&'static str], edges: &[(usize, usize, usize)]) -> Graph<Part, Bone> {
    let mut builder = GraphBuilder::new(name);
    for (id, &label) in labels.iter().enumerate() {
        builder.add_node(id, Part { label, cost: 1.0 });
    }
    for &(s, t, endpoint) in edges {
        builder.add_edge(s, t, Bone { endpoint });
    }
    builder.build()
}

/// The node map of a match, as pairs of labels.
pub fn label_pairs<E>(
    g0: &Graph<Part, E>,
    g1: &Graph<Part, E>,
    node_map: &skeleton_graph_matching::NodeMap,
) -> Vec<(&'static str, &'static str)> {
    node_map
        .iter()
        .map(|(&u, m)| (g0.node(u).label, g1.node(m.node).label))
        .collect()
}

pub fn find_node<N, E>(g: &Graph<N, E>, pred: impl Fn(&N) -> bool) -> NodeIndex {
    g.node_indices().into_iter().find(|&v| pred(g.node(v))).unwrap()
}
