use crate::graph::Graph;
use approx::abs_diff_eq;
use ndarray::Array2;

/// The last anchor pair of the greedy matcher, by traversal index.
///
/// Splitting destroys the ancestor and sibling information of the graphs, so the closure
/// matrices and the parents of every node are captured up front.
#[derive(Debug, Clone)]
pub(crate) struct MatchedNodePair {
    nodes: Option<(usize, usize)>,
    closures: [Array2<u8>; 2],
    parents: [Vec<Vec<usize>>; 2],
}

fn parents_by_traversal_index<N, E>(g: &Graph<N, E>) -> Vec<Vec<usize>> {
    let mut parents = vec![Vec::new(); g.node_count()];
    for v in g.node_indices() {
        parents[g.tidx(v)] = g.parents(v).into_iter().map(|u| g.tidx(u)).collect();
    }
    parents
}

impl MatchedNodePair {
    pub fn new<N, E>(query: &Graph<N, E>, model: &Graph<N, E>) -> MatchedNodePair {
        MatchedNodePair {
            nodes: None,
            closures: [query.closure_matrix().clone(), model.closure_matrix().clone()],
            parents: [parents_by_traversal_index(query), parents_by_traversal_index(model)],
        }
    }

    pub fn set_empty(&mut self) {
        self.nodes = None;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_none()
    }

    pub fn set_nodes(&mut self, q: usize, m: usize) {
        self.nodes = Some((q, m));
    }

    fn is_ancestor(&self, side: usize, u: usize, v: usize) -> bool {
        self.closures[side][[u, v]] != 0
    }

    /// `true` if `qq` is an ancestor of the query anchor exactly when `mm` is one of the model
    /// anchor. Always `true` without an anchor.
    pub fn ancestor_relation_preserved(&self, qq: usize, mm: usize) -> bool {
        match self.nodes {
            Some((q, m)) => self.is_ancestor(0, qq, q) == self.is_ancestor(1, mm, m),
            None => true,
        }
    }

    /// Nodes reachable from any parent of `v`, parents excluded. Empty if `v` is its only
    /// sibling.
    fn siblings(&self, side: usize, v: usize) -> Vec<bool> {
        let closure = &self.closures[side];
        let mut sibs: Vec<bool> = Vec::new();

        for &p in &self.parents[side][v] {
            let row = closure.row(p);
            if sibs.is_empty() {
                sibs = row.iter().map(|&x| x != 0).collect();
            } else {
                for (s, &x) in sibs.iter_mut().zip(row.iter()) {
                    *s |= x != 0;
                }
            }
            sibs[p] = false;
        }

        if sibs.iter().filter(|&&s| s).count() <= 1 {
            sibs.clear();
        }
        sibs
    }

    /// Multiplies by `alpha` the similarity of every pair in which exactly one node is a
    /// sibling of its anchor.
    pub fn update_similarity_matrix(&self, sim: &mut Array2<f64>, alpha: f64) {
        assert!((0.0..=1.0).contains(&alpha));

        if abs_diff_eq!(alpha, 1.0) {
            return;
        }

        let (q, m) = match self.nodes {
            Some(nodes) => nodes,
            None => return,
        };

        let sq = self.siblings(0, q);
        let sm = self.siblings(1, m);

        // Without siblings on one side there is no relation to preserve.
        if sq.is_empty() || sm.is_empty() {
            return;
        }

        for (i, &si) in sq.iter().enumerate() {
            for (j, &sj) in sm.iter().enumerate() {
                if si != sj {
                    sim[[i, j]] *= alpha;
                }
            }
        }
    }
}
