use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use crate::tsv::Tsv;
use ndarray::Array2;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A node of a [`Graph`]: the payload plus the values derived from the graph structure.
#[derive(Debug, Clone)]
pub struct DagNode<N> {
    attrs: N,
    pub(crate) level: Option<usize>,
    pub(crate) traversal_index: Option<usize>,
    pub(crate) subtree_cost: f64,
    pub(crate) mass: usize,
    pub(crate) signature: f64,
    pub(crate) tsv: Tsv,
}

impl<N> DagNode<N> {
    fn new(attrs: N) -> DagNode<N> {
        DagNode {
            attrs,
            level: None,
            traversal_index: None,
            subtree_cost: 0.0,
            mass: 0,
            signature: 0.0,
            tsv: Tsv::default(),
        }
    }

    pub fn attrs(&self) -> &N {
        &self.attrs
    }

    pub(crate) fn attrs_mut(&mut self) -> &mut N {
        &mut self.attrs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// A directed acyclic skeleton graph.
///
/// Nodes may have several parents ("loopy" nodes), but there are no directed cycles. Node and
/// edge indices stay valid when other nodes are removed, so indices of a graph and of the
/// subgraphs split off it refer to the same nodes.
///
/// Call [`Graph::compute_derived_values`] after every structural change and before matching.
#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    pub(crate) inner: StableGraph<DagNode<N>, E, Directed>,
    label: String,
    object_name: String,
    view_numbers: (i32, i32),
    bounding_box: BoundingBox,

    // derived values
    pub(crate) total_cost: f64,
    pub(crate) closure: Array2<u8>,
    pub(crate) cumulative_mass: usize,
    pub(crate) max_branching_factor: usize,
    pub(crate) total_signature_sum: f64,
}

impl<N, E> Graph<N, E> {
    pub fn new(label: &str) -> Graph<N, E> {
        Graph {
            inner: StableGraph::new(),
            label: label.to_string(),
            object_name: label.to_string(),
            view_numbers: (0, 0),
            bounding_box: BoundingBox::default(),
            total_cost: 0.0,
            closure: Array2::zeros((0, 0)),
            cumulative_mass: 0,
            max_branching_factor: 0,
            total_signature_sum: 0.0,
        }
    }

    pub fn add_node(&mut self, attrs: N) -> NodeIndex {
        self.inner.add_node(DagNode::new(attrs))
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, attrs: E) -> EdgeIndex {
        self.inner.add_edge(source, target, attrs)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn contains_node(&self, v: NodeIndex) -> bool {
        self.inner.contains_node(v)
    }

    /// All node indices, in ascending order.
    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.inner.node_indices().collect()
    }

    /// All edge indices, in ascending order.
    pub fn edge_indices(&self) -> Vec<EdgeIndex> {
        self.inner.edge_indices().collect()
    }

    #[inline]
    pub fn node(&self, v: NodeIndex) -> &N {
        self.inner[v].attrs()
    }

    #[inline]
    pub fn node_mut(&mut self, v: NodeIndex) -> &mut N {
        self.inner[v].attrs_mut()
    }

    #[inline]
    pub fn edge(&self, e: EdgeIndex) -> &E {
        &self.inner[e]
    }

    #[inline]
    pub fn edge_mut(&mut self, e: EdgeIndex) -> &mut E {
        &mut self.inner[e]
    }

    #[inline]
    pub fn source(&self, e: EdgeIndex) -> NodeIndex {
        self.endpoints(e).0
    }

    #[inline]
    pub fn target(&self, e: EdgeIndex) -> NodeIndex {
        self.endpoints(e).1
    }

    fn endpoints(&self, e: EdgeIndex) -> (NodeIndex, NodeIndex) {
        match self.inner.edge_endpoints(e) {
            Some(ends) => ends,
            None => panic!("edge {:?} is not part of graph '{}'", e, self.label),
        }
    }

    fn edges_sorted(&self, v: NodeIndex, dir: Direction) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self.inner.edges_directed(v, dir).map(|e| e.id()).collect();
        edges.sort();
        edges
    }

    /// Out edges of `v` in insertion order.
    pub fn out_edges(&self, v: NodeIndex) -> Vec<EdgeIndex> {
        self.edges_sorted(v, Direction::Outgoing)
    }

    /// In edges of `v` in insertion order.
    pub fn in_edges(&self, v: NodeIndex) -> Vec<EdgeIndex> {
        self.edges_sorted(v, Direction::Incoming)
    }

    pub fn first_in_edge(&self, v: NodeIndex) -> Option<EdgeIndex> {
        self.in_edges(v).into_iter().next()
    }

    pub fn children(&self, v: NodeIndex) -> Vec<NodeIndex> {
        self.out_edges(v).into_iter().map(|e| self.target(e)).collect()
    }

    pub fn parents(&self, v: NodeIndex) -> Vec<NodeIndex> {
        self.in_edges(v).into_iter().map(|e| self.source(e)).collect()
    }

    pub fn in_degree(&self, v: NodeIndex) -> usize {
        self.inner.edges_directed(v, Direction::Incoming).count()
    }

    pub fn out_degree(&self, v: NodeIndex) -> usize {
        self.inner.edges_directed(v, Direction::Outgoing).count()
    }

    pub fn is_root(&self, v: NodeIndex) -> bool {
        self.in_degree(v) == 0
    }

    /// All nodes without parents, in ascending index order.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.inner.node_indices().filter(|&v| self.is_root(v)).collect()
    }

    /// Every node reachable from `v`, including `v` itself, in depth-first order.
    pub fn reachable_from(&self, v: NodeIndex) -> Vec<NodeIndex> {
        let mut dfs = Dfs::new(&self.inner, v);
        let mut nodes = Vec::new();
        while let Some(u) = dfs.next(&self.inner) {
            nodes.push(u);
        }
        nodes
    }

    /// Removes `v` and every node reachable from it.
    pub fn delete_subgraph(&mut self, v: NodeIndex) {
        for u in self.reachable_from(v) {
            self.inner.remove_node(u);
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn set_object_name(&mut self, name: &str) {
        self.object_name = name.to_string();
    }

    pub fn view_numbers(&self) -> (i32, i32) {
        self.view_numbers
    }

    pub fn set_view_numbers(&mut self, view0: i32, view1: i32) {
        self.view_numbers = (view0, view1);
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn set_bounding_box(&mut self, bbox: BoundingBox) {
        self.bounding_box = bbox;
    }

    /// Distance of `v` from a root. Loopy nodes keep the largest depth. `None` before the
    /// derived values are computed.
    #[inline]
    pub fn level(&self, v: NodeIndex) -> Option<usize> {
        self.inner[v].level
    }

    /// Pre-order index of `v`, unique in `0..node_count()` once the derived values are computed.
    #[inline]
    pub fn traversal_index(&self, v: NodeIndex) -> Option<usize> {
        self.inner[v].traversal_index
    }

    pub(crate) fn tidx(&self, v: NodeIndex) -> usize {
        match self.inner[v].traversal_index {
            Some(i) => i,
            None => panic!("derived values of graph '{}' have not been computed", self.label),
        }
    }

    #[inline]
    pub fn subtree_cost(&self, v: NodeIndex) -> f64 {
        self.inner[v].subtree_cost
    }

    /// Cost of the whole graph minus that of the subtree rooted at `v`.
    #[inline]
    pub fn subtree_complement_cost(&self, v: NodeIndex) -> f64 {
        self.total_cost - self.subtree_cost(v)
    }

    #[inline]
    pub fn mass(&self, v: NodeIndex) -> usize {
        self.inner[v].mass
    }

    /// The scalar subtree signature of `v`.
    #[inline]
    pub fn signature(&self, v: NodeIndex) -> f64 {
        self.inner[v].signature
    }

    /// The sorted signatures of the children of `v`.
    #[inline]
    pub fn tsv(&self, v: NodeIndex) -> &Tsv {
        &self.inner[v].tsv
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn cumulative_mass(&self) -> usize {
        self.cumulative_mass
    }

    pub fn max_branching_factor(&self) -> usize {
        self.max_branching_factor
    }

    pub fn total_signature_sum(&self) -> f64 {
        self.total_signature_sum
    }

    /// Reflexive reachability matrix indexed by traversal index.
    pub fn closure_matrix(&self) -> &Array2<u8> {
        &self.closure
    }

    /// `true` if `v` can be reached from `u` (every node reaches itself). Both indices are
    /// traversal indices.
    pub fn reaches(&self, u: usize, v: usize) -> bool {
        self.closure[[u, v]] != 0
    }
}

impl<N: Clone, E: Clone> Graph<N, E> {
    /// Separates the subgraph rooted at `v` and returns it.
    ///
    /// The subgraph contains `v` and all its descendants; they are removed from `self`,
    /// together with every edge that led into them. Node indices, derived node values,
    /// the transitive closure and the cumulative mass are retained in both parts. If `v` is a
    /// root, the whole graph is moved to the returned value and `self` is left empty.
    pub fn split_subgraph(&mut self, v: NodeIndex) -> Graph<N, E> {
        if self.is_root(v) {
            let sub = self.clone();
            self.inner.clear();
            return sub;
        }

        let subtree = self.reachable_from(v);
        let mut sub = self.clone();

        let keep: std::collections::HashSet<NodeIndex> = subtree.iter().copied().collect();
        for u in self.inner.node_indices().collect::<Vec<_>>() {
            if !keep.contains(&u) {
                sub.inner.remove_node(u);
            }
        }

        for u in subtree {
            self.inner.remove_node(u);
        }

        sub
    }
}

/// Builds a graph from externally numbered nodes.
pub struct GraphBuilder<N: Debug, E: Debug> {
    // maps node_id to the node index in the graph.
    node_map: BTreeMap<usize, NodeIndex>,
    graph: Graph<N, E>,
}

impl<N: Debug, E: Debug> GraphBuilder<N, E> {
    pub fn new(label: &str) -> GraphBuilder<N, E> {
        GraphBuilder {
            node_map: BTreeMap::new(),
            graph: Graph::new(label),
        }
    }

    pub fn graph(self) -> Graph<N, E> {
        self.graph
    }

    pub fn node_index(&self, node_id: usize) -> Option<NodeIndex> {
        self.node_map.get(&node_id).copied()
    }

    pub fn add_node(&mut self, node_id: usize, node_value: N) -> NodeIndex {
        match self.node_map.entry(node_id) {
            Entry::Vacant(e) => {
                let idx = self.graph.add_node(node_value);
                e.insert(idx);
                idx
            }
            Entry::Occupied(_) => {
                panic!("duplicate node id {}", node_id);
            }
        }
    }

    /// Adds an edge between two already added nodes.
    pub fn add_edge(&mut self, source_node_id: usize, target_node_id: usize, weight: E) -> EdgeIndex {
        let source = match self.node_map.get(&source_node_id) {
            Some(&idx) => idx,
            None => panic!("unknown source node id {}", source_node_id),
        };
        let target = match self.node_map.get(&target_node_id) {
            Some(&idx) => idx,
            None => panic!("unknown target node id {}", target_node_id),
        };
        self.graph.add_edge(source, target, weight)
    }
}

impl<N: NodeAttributes + Debug, E: EdgeAttributes + Debug> GraphBuilder<N, E> {
    /// Returns the graph with its derived values computed.
    pub fn build(self) -> Graph<N, E> {
        let mut graph = self.graph;
        graph.compute_derived_values();
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Graph<f64, ()>, Vec<NodeIndex>) {
        // 0 -> 1 -> 2, 0 -> 3
        let mut g = Graph::new("tree");
        let n: Vec<_> = (0..4).map(|_| g.add_node(1.0)).collect();
        g.add_edge(n[0], n[1], ());
        g.add_edge(n[1], n[2], ());
        g.add_edge(n[0], n[3], ());
        (g, n)
    }

    #[test]
    fn test_adjacency() {
        let (g, n) = tree();
        assert_eq!(vec![n[0]], g.roots());
        assert_eq!(vec![n[1], n[3]], g.children(n[0]));
        assert_eq!(vec![n[1]], g.parents(n[2]));
        assert_eq!(2, g.out_degree(n[0]));
        assert_eq!(1, g.in_degree(n[3]));
        assert_eq!(3, g.reachable_from(n[0]).len() - 1);
    }

    #[test]
    fn test_split_subgraph_keeps_indices() {
        let (mut g, n) = tree();
        let sub = g.split_subgraph(n[1]);

        assert_eq!(2, sub.node_count());
        assert!(sub.contains_node(n[1]) && sub.contains_node(n[2]));
        assert_eq!(vec![n[1]], sub.roots());

        assert_eq!(2, g.node_count());
        assert!(g.contains_node(n[0]) && g.contains_node(n[3]));
        assert_eq!(vec![n[3]], g.children(n[0]));
    }

    #[test]
    fn test_split_subgraph_at_root_takes_all() {
        let (mut g, n) = tree();
        let sub = g.split_subgraph(n[0]);
        assert_eq!(4, sub.node_count());
        assert!(g.is_empty());
    }

    #[test]
    fn test_delete_subgraph() {
        let (mut g, n) = tree();
        g.delete_subgraph(n[1]);
        assert_eq!(2, g.node_count());
        assert_eq!(vec![n[3]], g.children(n[0]));
    }
}
