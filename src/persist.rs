//! JSON record of a graph.
//!
//! The record keeps the structure, the metadata and the graph-level derived values. Per node
//! derived values are not stored: call [`Graph::compute_derived_values`] on a loaded graph
//! before matching it.

use crate::error::{GraphError, GraphResult};
use crate::graph::{BoundingBox, Graph};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedNode<N> {
    pub id: usize,
    pub attrs: N,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEdge<E> {
    pub source: usize,
    pub target: usize,
    pub attrs: E,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedGraph<N, E> {
    pub class_name: String,
    pub label: String,
    pub nodes: Vec<PersistedNode<N>>,
    pub edges: Vec<PersistedEdge<E>>,
    pub max_branching_factor: usize,
    pub total_signature_sum: f64,
    pub view_numbers: (i32, i32),
    pub object_name: String,
    pub total_cost: f64,
    pub closure: Vec<Vec<u8>>,
    pub cumulative_mass: usize,
    pub bounding_box: BoundingBox,
}

impl<N: Clone, E: Clone> PersistedGraph<N, E> {
    /// Captures `g`. Node ids are the positions of the nodes in index order.
    pub fn from_graph(class_name: &str, g: &Graph<N, E>) -> PersistedGraph<N, E> {
        let indices = g.node_indices();
        let ids: BTreeMap<_, _> = indices.iter().enumerate().map(|(id, &v)| (v, id)).collect();

        let nodes = indices
            .iter()
            .enumerate()
            .map(|(id, &v)| PersistedNode {
                id,
                attrs: g.node(v).clone(),
            })
            .collect();

        let edges = g
            .edge_indices()
            .into_iter()
            .map(|e| PersistedEdge {
                source: ids[&g.source(e)],
                target: ids[&g.target(e)],
                attrs: g.edge(e).clone(),
            })
            .collect();

        let closure = g.closure_matrix().outer_iter().map(|row| row.to_vec()).collect();

        PersistedGraph {
            class_name: class_name.to_string(),
            label: g.label().to_string(),
            nodes,
            edges,
            max_branching_factor: g.max_branching_factor(),
            total_signature_sum: g.total_signature_sum(),
            view_numbers: g.view_numbers(),
            object_name: g.object_name().to_string(),
            total_cost: g.total_cost(),
            closure,
            cumulative_mass: g.cumulative_mass(),
            bounding_box: g.bounding_box(),
        }
    }

    /// Rebuilds the graph, checking that the record is of class `expected_class`.
    pub fn into_graph(self, expected_class: &str) -> GraphResult<Graph<N, E>> {
        if self.class_name != expected_class {
            return Err(GraphError::ClassMismatch {
                expected: expected_class.to_string(),
                found: self.class_name,
            });
        }

        let mut g = Graph::new(&self.label);
        let mut node_map = BTreeMap::new();

        for node in self.nodes {
            if node_map.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            let v = g.add_node(node.attrs);
            node_map.insert(node.id, v);
        }

        for edge in self.edges {
            match (node_map.get(&edge.source), node_map.get(&edge.target)) {
                (Some(&s), Some(&t)) => {
                    g.add_edge(s, t, edge.attrs);
                }
                _ => {
                    return Err(GraphError::UnknownEndpoint {
                        source_id: edge.source,
                        target_id: edge.target,
                    })
                }
            }
        }

        let n = g.node_count();
        let rows = self.closure.len();
        if !self.closure.is_empty() {
            let cols = self.closure[0].len();
            if rows != n || self.closure.iter().any(|r| r.len() != n) {
                return Err(GraphError::ClosureShape { rows, cols, nodes: n });
            }
            let flat = self.closure.into_iter().flatten().collect();
            g.closure = Array2::from_shape_vec((n, n), flat).map_err(|_| GraphError::ClosureShape {
                rows,
                cols,
                nodes: n,
            })?;
        }

        g.set_object_name(&self.object_name);
        g.set_view_numbers(self.view_numbers.0, self.view_numbers.1);
        g.set_bounding_box(self.bounding_box);
        g.total_cost = self.total_cost;
        g.cumulative_mass = self.cumulative_mass;
        g.max_branching_factor = self.max_branching_factor;
        g.total_signature_sum = self.total_signature_sum;

        Ok(g)
    }
}

impl<N: Serialize, E: Serialize> PersistedGraph<N, E> {
    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<N: DeserializeOwned, E: DeserializeOwned> PersistedGraph<N, E> {
    pub fn from_json(json: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fork() -> Graph<f64, f64> {
        let mut g = Graph::new("fork");
        let n: Vec<_> = [1.0, 2.0, 3.0].iter().map(|&c| g.add_node(c)).collect();
        g.add_edge(n[0], n[1], 0.5);
        g.add_edge(n[0], n[2], 1.0);
        g.set_object_name("hand");
        g.set_view_numbers(3, 7);
        g.compute_derived_values();
        g
    }

    #[test]
    fn test_json_record() {
        let g = fork();
        let json = PersistedGraph::from_graph("BoneGraph", &g).to_json().unwrap();

        let mut h: Graph<f64, f64> = PersistedGraph::from_json(&json).unwrap().into_graph("BoneGraph").unwrap();
        assert_eq!(3, h.node_count());
        assert_eq!(2, h.edge_count());
        assert_eq!("hand", h.object_name());
        assert_eq!((3, 7), h.view_numbers());
        assert_eq!(g.cumulative_mass(), h.cumulative_mass());
        assert_eq!(g.closure_matrix(), h.closure_matrix());

        h.compute_derived_values();
        assert_eq!(g.total_cost(), h.total_cost());
        assert_eq!(g.total_signature_sum(), h.total_signature_sum());
    }

    #[test]
    fn test_class_mismatch() {
        let record = PersistedGraph::from_graph("BoneGraph", &fork());
        match record.into_graph("ShockGraph") {
            Err(GraphError::ClassMismatch { found, .. }) => assert_eq!("BoneGraph", found),
            other => panic!("unexpected {:?}", other.map(|g| g.node_count())),
        }
    }

    #[test]
    fn test_unknown_endpoint() {
        let mut record = PersistedGraph::from_graph("BoneGraph", &fork());
        record.edges[0].target = 42;
        assert!(matches!(
            record.into_graph("BoneGraph"),
            Err(GraphError::UnknownEndpoint { target_id: 42, .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let res = PersistedGraph::<f64, f64>::from_json("{\"class_name\": 1}");
        assert!(matches!(res, Err(GraphError::Json(_))));
    }
}
