//! Values derived from the structure of a [`Graph`]: levels, traversal indices, subtree costs,
//! transitive closure, node masses and subtree signatures.

use crate::graph::Graph;
use crate::graph_traits::{EdgeAttributes, NodeAttributes};
use crate::spectral::{largest_singular_value_sum, DenseSvd};
use crate::tsv::Tsv;
use log::debug;
use ndarray::{s, Array1, Array2};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashMap;

const ROOT_NODE_LEVEL: usize = 0;

impl<N: NodeAttributes, E: EdgeAttributes> Graph<N, E> {
    /// Computes all the derived values of the graph.
    ///
    /// Must be called once after any structural change and before matching.
    ///
    /// # Panics
    ///
    /// If the graph has no root or if a node has a non-positive cost.
    pub fn compute_derived_values(&mut self) {
        let roots = self.roots();
        assert!(!roots.is_empty(), "graph '{}' has no root node", self.label());

        self.reset_node_info();
        self.total_cost = 0.0;

        let mut next_index = 0;
        for &root in &roots {
            next_index = self.compute_node_info(root, ROOT_NODE_LEVEL, next_index);
            self.total_cost += self.subtree_cost(root);
        }
        debug_assert_eq!(next_index, self.node_count());

        self.compute_transitive_closure();
        self.compute_node_masses();

        self.cumulative_mass = 0;
        self.max_branching_factor = 0;
        self.total_signature_sum = 0.0;

        let svd = DenseSvd;
        for &root in &roots {
            self.compute_tsvs(root, &svd);
            self.cumulative_mass += self.mass(root);
        }

        for v in self.node_indices() {
            self.inner[v].attrs_mut().compute_derived_values();
            self.total_signature_sum += self.tsv(v).norm();
            self.max_branching_factor = self.max_branching_factor.max(self.out_degree(v));
        }

        for e in self.edge_indices() {
            self.edge_mut(e).compute_derived_values();
        }

        debug!(
            "derived values of '{}': {} nodes, {} roots, cost {}, cumulative mass {}, max branching {}",
            self.label(),
            self.node_count(),
            roots.len(),
            self.total_cost,
            self.cumulative_mass,
            self.max_branching_factor
        );
    }

    fn reset_node_info(&mut self) {
        for v in self.node_indices() {
            let node = &mut self.inner[v];
            node.level = None;
            node.traversal_index = None;
        }
    }

    /// Visits the subtree rooted at `v` depth-first, setting levels, traversal indices and
    /// subtree costs. Returns the next free traversal index.
    fn compute_node_info(&mut self, v: NodeIndex, level: usize, mut next_index: usize) -> usize {
        {
            let node = &mut self.inner[v];

            // Loopy nodes keep the greatest level.
            if node.level.map_or(true, |l| l < level) {
                node.level = Some(level);
            }

            if node.traversal_index.is_none() {
                node.traversal_index = Some(next_index);
                next_index += 1;
            }
        }

        let cost = self.node(v).cost();
        assert!(cost > 0.0, "node {:?} of graph '{}' has cost {}", v, self.label(), cost);

        let mut subtree_cost = cost;
        for u in self.children(v) {
            next_index = self.compute_node_info(u, level + 1, next_index);
            subtree_cost += self.subtree_cost(u);
        }
        self.inner[v].subtree_cost = subtree_cost;

        next_index
    }

    fn compute_transitive_closure(&mut self) {
        let n = self.node_count();
        let mut closure = Array2::<u8>::zeros((n, n));

        for v in self.node_indices() {
            let i = self.tidx(v);
            for u in self.reachable_from(v) {
                closure[[i, self.tidx(u)]] = 1;
            }
        }

        self.closure = closure;
    }

    /// mass = T · (T · 1), where T is the reflexive transitive closure.
    fn compute_node_masses(&mut self) {
        let n = self.node_count();
        assert_eq!((n, n), self.closure.dim());

        let t = self.closure.mapv(usize::from);
        let ones = Array1::<usize>::ones(n);
        let masses = t.dot(&t.dot(&ones));

        for v in self.node_indices() {
            let i = self.tidx(v);
            self.inner[v].mass = masses[i];
        }
    }

    fn compute_tsvs(&mut self, root: NodeIndex, svd: &DenseSvd) -> f64 {
        let n = self.mass(root);
        assert!(n > 0);

        let mut adj = Array2::<f64>::zeros((n, n));
        let mut loopy_nodes = HashMap::new();
        let mut last = 0;

        self.compute_tsvs_rec(root, &mut last, &mut adj, &mut loopy_nodes, svd)
    }

    /// Fills the local adjacency matrix of the subtree rooted at `v`, starting at row `*last`,
    /// and returns the signature of `v`.
    ///
    /// A child with several parents that was already visited keeps its matrix index and its
    /// signature. If that index lies before row `i`, the edge to it falls outside the
    /// submatrix of `v`, so `v` gets a fresh matrix of its own.
    fn compute_tsvs_rec(
        &mut self,
        v: NodeIndex,
        last: &mut usize,
        adj: &mut Array2<f64>,
        loopy_nodes: &mut HashMap<NodeIndex, usize>,
        svd: &DenseSvd,
    ) -> f64 {
        let i = *last;
        let mut child_signatures = Vec::with_capacity(self.out_degree(v));
        let mut escapes_submatrix = false;

        for e in self.out_edges(v) {
            let w = self.target(e);
            let weight = self.edge(e).weight();

            let visited = if self.in_degree(w) > 1 {
                loopy_nodes.get(&w).copied()
            } else {
                None
            };

            let signature = match visited {
                Some(k) => {
                    escapes_submatrix |= k < i;
                    add_antisymmetric_edge(adj, weight, i, k);
                    self.signature(w)
                }
                None => {
                    *last += 1;
                    add_antisymmetric_edge(adj, weight, i, *last);
                    if self.in_degree(w) > 1 {
                        loopy_nodes.insert(w, *last);
                    }
                    self.compute_tsvs_rec(w, last, adj, loopy_nodes, svd)
                }
            };

            child_signatures.push(signature);
        }

        if escapes_submatrix {
            return self.compute_tsvs(v, svd);
        }

        // NOTE: sums the largest outdegree(v) singular values, not outdegree(v) - 1.
        let sub = adj.slice(s![i..=*last, i..=*last]);
        let signature = largest_singular_value_sum(svd, sub, self.out_degree(v));

        let node = &mut self.inner[v];
        node.signature = signature;
        node.tsv = Tsv::new(child_signatures);

        signature
    }
}

fn add_antisymmetric_edge(adj: &mut Array2<f64>, weight: f64, src: usize, tgt: usize) {
    adj[[src, tgt]] = weight;
    adj[[tgt, src]] = -weight;
}
