//! Node correspondences produced by the matchers.

use closed01::Closed01;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut};

pub const NUM_MATCH_PARAMS: usize = 5;

/// Interpretation choices for a node pair, consumed by the similarity measurer.
///
/// * `[0]`: interpretation of the root pair (0..4), inherited by edge comparisons.
/// * `[1]`, `[2]`: the edge on side 0 / side 1 skips an intermediate node.
/// * `[3]`, `[4]`: the edge on side 0 / side 1 is followed backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamIndices(pub [u8; NUM_MATCH_PARAMS]);

impl ParamIndices {
    pub fn root(interpretation: u8) -> ParamIndices {
        let mut p = ParamIndices::default();
        p.0[0] = interpretation;
        p
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&p| p == 0)
    }
}

impl Index<usize> for ParamIndices {
    type Output = u8;

    fn index(&self, i: usize) -> &u8 {
        &self.0[i]
    }
}

impl IndexMut<usize> for ParamIndices {
    fn index_mut(&mut self, i: usize) -> &mut u8 {
        &mut self.0[i]
    }
}

/// Where a node of graph 0 went in graph 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMatch {
    pub node: NodeIndex,
    pub similarity: Closed01<f64>,
    pub params: ParamIndices,
}

/// One-to-one map from nodes of graph 0 to nodes of graph 1. Unmatched nodes are absent.
pub type NodeMap = BTreeMap<NodeIndex, NodeMatch>;

/// A pairing of one node of each graph, the root of a tree of pairings.
///
/// Children are owned by their parent. The topological matcher also attaches a chain of parent
/// pairings, each owning the siblings it was matched with.
#[derive(Debug, Clone)]
pub struct NodeAssignment {
    nodes: [NodeIndex; 2],
    in_edges: [Option<EdgeIndex>; 2],
    params: ParamIndices,
    node_similarity: Option<f64>,
    subtree_similarity_sum: f64,
    distance: Option<f64>,
    weighted_distance: Option<f64>,
    children: Vec<NodeAssignment>,
    parent: Option<Box<NodeAssignment>>,
    given_child: Option<[NodeIndex; 2]>,
}

impl NodeAssignment {
    pub fn new(nodes: [NodeIndex; 2], params: ParamIndices, in_edges: [Option<EdgeIndex>; 2]) -> NodeAssignment {
        NodeAssignment {
            nodes,
            in_edges,
            params,
            node_similarity: None,
            subtree_similarity_sum: 0.0,
            distance: None,
            weighted_distance: None,
            children: Vec::new(),
            parent: None,
            given_child: None,
        }
    }

    #[inline]
    pub fn node(&self, side: usize) -> NodeIndex {
        self.nodes[side]
    }

    #[inline]
    pub fn nodes(&self) -> [NodeIndex; 2] {
        self.nodes
    }

    #[inline]
    pub fn in_edge(&self, side: usize) -> Option<EdgeIndex> {
        self.in_edges[side]
    }

    #[inline]
    pub fn params(&self) -> &ParamIndices {
        &self.params
    }

    /// Similarity of the pair alone, 0 until computed.
    pub fn node_similarity(&self) -> f64 {
        self.node_similarity.unwrap_or(0.0)
    }

    pub fn has_node_similarity(&self) -> bool {
        self.node_similarity.is_some()
    }

    pub fn set_node_similarity(&mut self, similarity: f64) {
        assert!(
            (0.0..=1.0).contains(&similarity),
            "node similarity {} is not in [0, 1]",
            similarity
        );
        self.node_similarity = Some(similarity);
    }

    pub fn subtree_similarity_sum(&self) -> f64 {
        self.subtree_similarity_sum
    }

    pub fn set_subtree_similarity_sum(&mut self, sum: f64) {
        self.subtree_similarity_sum = sum;
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn has_distance(&self) -> bool {
        self.distance.is_some()
    }

    pub fn set_distance(&mut self, distance: f64) {
        assert!(distance >= 0.0, "negative distance {}", distance);
        self.distance = Some(distance);
    }

    pub fn weighted_distance(&self) -> Option<f64> {
        self.weighted_distance
    }

    pub fn set_weighted_distance(&mut self, distance: f64) {
        self.weighted_distance = Some(distance);
    }

    pub fn children(&self) -> &[NodeAssignment] {
        &self.children
    }

    pub fn add_child(&mut self, child: NodeAssignment) {
        self.children.push(child);
    }

    pub fn parent(&self) -> Option<&NodeAssignment> {
        self.parent.as_deref()
    }

    pub fn set_parent(&mut self, parent: NodeAssignment) {
        self.parent = Some(Box::new(parent));
    }

    /// The child pairing through which a parent pairing was reached.
    pub fn given_child(&self) -> Option<[NodeIndex; 2]> {
        self.given_child
    }

    pub fn set_given_child(&mut self, nodes: [NodeIndex; 2]) {
        self.given_child = Some(nodes);
    }

    /// Number of pairings in this tree, parents included.
    pub fn pairing_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.pairing_count()).sum::<usize>()
            + self.parent.as_ref().map_or(0, |p| p.pairing_count())
    }

    /// Flattens the tree into a one-to-one node map.
    ///
    /// Visits this pairing, then its children depth-first, then the parent chain (each parent
    /// followed by its children). A node already mapped on either side keeps its first pairing.
    pub fn node_map(&self) -> NodeMap {
        let mut map = NodeMap::new();
        let mut used = BTreeSet::new();
        self.copy_assignment(&mut map, &mut used);
        self.copy_children(&mut map, &mut used);
        self.copy_parents(&mut map, &mut used);
        map
    }

    /// Sum of the node similarities of the flattened map.
    pub fn matched_similarity_sum(&self) -> f64 {
        self.node_map().values().map(|m| m.similarity.get()).sum()
    }

    fn copy_assignment(&self, map: &mut NodeMap, used: &mut BTreeSet<NodeIndex>) {
        if map.contains_key(&self.nodes[0]) || used.contains(&self.nodes[1]) {
            return;
        }
        used.insert(self.nodes[1]);
        map.insert(
            self.nodes[0],
            NodeMatch {
                node: self.nodes[1],
                similarity: Closed01::new(self.node_similarity()),
                params: self.params,
            },
        );
    }

    fn copy_children(&self, map: &mut NodeMap, used: &mut BTreeSet<NodeIndex>) {
        for child in &self.children {
            child.copy_assignment(map, used);
            child.copy_children(map, used);
        }
    }

    fn copy_parents(&self, map: &mut NodeMap, used: &mut BTreeSet<NodeIndex>) {
        if let Some(parent) = &self.parent {
            parent.copy_assignment(map, used);
            parent.copy_children(map, used);
            parent.copy_parents(map, used);
        }
    }
}
