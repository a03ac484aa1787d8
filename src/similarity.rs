use crate::assignment::ParamIndices;
use crate::graph::Graph;
use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use closed01::Closed01;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use std::fmt::Debug;

/// Scores node and edge correspondences between two graphs.
///
/// Both graphs are passed along with the indices so that a measurer can look at derived values
/// (levels, masses, signatures) as well as at the node payloads. A similarity of 0 means that
/// the correspondence is not allowed.
///
/// NOTE: Returned values MUST be in the range [0, 1].
pub trait SimilarityMeasurer<N: NodeAttributes, E: EdgeAttributes>: Debug {
    fn node_similarity(
        &self,
        g0: &Graph<N, E>,
        v0: NodeIndex,
        g1: &Graph<N, E>,
        v1: NodeIndex,
        params: &ParamIndices,
    ) -> Closed01<f64>;

    fn edge_similarity(
        &self,
        _g0: &Graph<N, E>,
        _e0: EdgeIndex,
        _g1: &Graph<N, E>,
        _e1: EdgeIndex,
        _params: &ParamIndices,
    ) -> Closed01<f64> {
        Closed01::one()
    }

    /// Returns the distance between two nodes together with their similarity.
    ///
    /// Defaults to `(1 - similarity) * (cost(v0) + cost(v1))`: identical nodes are at distance
    /// 0, unrelated ones cost as much as matching neither.
    fn node_distance(
        &self,
        g0: &Graph<N, E>,
        v0: NodeIndex,
        g1: &Graph<N, E>,
        v1: NodeIndex,
        params: &ParamIndices,
    ) -> (f64, Closed01<f64>) {
        let similarity = self.node_similarity(g0, v0, g1, v1, params);
        let cost = g0.node(v0).cost() + g1.node(v1).cost();
        (similarity.inv().get() * cost, similarity)
    }
}

/// Treats every pair of nodes as identical. Useful to compare pure topology.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreNodeAttributes;

impl<N: NodeAttributes, E: EdgeAttributes> SimilarityMeasurer<N, E> for IgnoreNodeAttributes {
    fn node_similarity(
        &self,
        _g0: &Graph<N, E>,
        _v0: NodeIndex,
        _g1: &Graph<N, E>,
        _v1: NodeIndex,
        _params: &ParamIndices,
    ) -> Closed01<f64> {
        Closed01::one()
    }
}

/// Compares node costs and edge weights by their ratio.
#[derive(Debug, Default, Clone, Copy)]
pub struct CostRatio;

fn ratio(a: f64, b: f64) -> Closed01<f64> {
    let (a, b) = (a.abs(), b.abs());
    let max = a.max(b);
    if max == 0.0 {
        Closed01::one()
    } else {
        Closed01::new(a.min(b) / max)
    }
}

impl<N: NodeAttributes, E: EdgeAttributes> SimilarityMeasurer<N, E> for CostRatio {
    fn node_similarity(
        &self,
        g0: &Graph<N, E>,
        v0: NodeIndex,
        g1: &Graph<N, E>,
        v1: NodeIndex,
        _params: &ParamIndices,
    ) -> Closed01<f64> {
        ratio(g0.node(v0).cost(), g1.node(v1).cost())
    }

    fn edge_similarity(
        &self,
        g0: &Graph<N, E>,
        e0: EdgeIndex,
        g1: &Graph<N, E>,
        e1: EdgeIndex,
        _params: &ParamIndices,
    ) -> Closed01<f64> {
        ratio(g0.edge(e0).weight(), g1.edge(e1).weight())
    }
}

#[test]
fn test_cost_ratio() {
    let mut g0: Graph<f64, f64> = Graph::new("a");
    let a = g0.add_node(2.0);
    let b = g0.add_node(1.0);
    let e0 = g0.add_edge(a, b, 4.0);
    let g1 = g0.clone();
    let p = ParamIndices::default();

    assert_eq!(0.5, CostRatio.node_similarity(&g0, a, &g1, b, &p).get());
    assert_eq!(1.0, CostRatio.edge_similarity(&g0, e0, &g1, e0, &p).get());

    let (dist, sim) = CostRatio.node_distance(&g0, a, &g1, b, &p);
    assert_eq!(0.5, sim.get());
    assert_eq!(1.5, dist);
}
