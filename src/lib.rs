//! Similarity and node correspondences between hierarchical skeleton graphs.
//!
//! A skeleton graph is a rooted DAG whose nodes stand for skeletal parts (bones, shock
//! branches) and whose edges record how the parts attach to each other. After
//! [`Graph::compute_derived_values`], each node knows its level, its pre-order traversal
//! index, its subtree cost, its mass, and the topological signature vector (TSV) of its
//! children.
//!
//! Three matchers compare a query graph with a model graph:
//!
//! * [`GreedyMatcher`] commits to the best anchor pair and recurses on the split graphs.
//! * [`AdaptiveMatcher`] maximizes the similarity of a tree of pairs, skipping short parts.
//! * [`TopologicalMatcher`] minimizes an edit-like distance over children and ancestors.
//!
//! Each returns a similarity in [0, 1] and a one-to-one map of query to model nodes. What
//! makes two nodes similar is decided by a [`SimilarityMeasurer`].

mod assignment;
mod bipartite;
mod derived;
mod error;
mod graph;
mod graph_traits;
mod matcher;
mod params;
mod persist;
mod score_norm;
mod similarity;
mod spectral;
mod tracer;
mod tsv;

pub use crate::assignment::{NodeAssignment, NodeMap, NodeMatch, ParamIndices, NUM_MATCH_PARAMS};
pub use crate::bipartite::{BipartiteGraph, Correspondence};
pub use crate::error::{GraphError, GraphResult};
pub use crate::graph::{BoundingBox, DagNode, Graph, GraphBuilder};
pub use crate::graph_traits::{EdgeAttributes, NodeAttributes};
pub use crate::matcher::{AdaptiveMatcher, GreedyMatcher, MatchResult, Matcher, TopologicalMatcher};
pub use crate::params::MatchParams;
pub use crate::persist::{PersistedEdge, PersistedGraph, PersistedNode};
pub use crate::score_norm::ScoreNorm;
pub use crate::similarity::{CostRatio, IgnoreNodeAttributes, SimilarityMeasurer};
pub use crate::spectral::{largest_singular_value_sum, DenseSvd, SingularValues};
pub use crate::tracer::{LogTracer, MatchTracer, NoopTracer};
pub use crate::tsv::{tsv_similarity, Tsv};

pub use petgraph::stable_graph::{EdgeIndex, NodeIndex};
