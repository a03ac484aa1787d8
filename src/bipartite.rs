//! Maximum weight bipartite assignment.
//!
//! The candidate correspondences between two node sets are solved with the Hungarian method
//! (`munkres`). The weight matrix is padded to a square one; missing edges get weight 0, so a
//! maximum weight assignment of the padded matrix is a maximum weight matching of the sparse
//! graph once the padding pairs are dropped.
//!
//! Ties are broken by the Hungarian method itself: given the same insertion order of nodes and
//! edges the same optimal matching is returned. Callers must not rely on any particular tie
//! winner beyond the optimality of the total weight.

use munkres::{solve_assignment, WeightMatrix};

/// A candidate correspondence between node `source` of set 0 and node `target` of set 1.
#[derive(Debug, Clone)]
pub struct Correspondence<U> {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
    pub value: U,
}

/// Bipartite graph with node information of type `T` and edge information of type `U`.
#[derive(Debug, Clone)]
pub struct BipartiteGraph<T, U> {
    sets: [Vec<T>; 2],
    edges: Vec<Correspondence<U>>,
}

impl<T, U> Default for BipartiteGraph<T, U> {
    fn default() -> Self {
        BipartiteGraph {
            sets: [Vec::new(), Vec::new()],
            edges: Vec::new(),
        }
    }
}

impl<T, U> BipartiteGraph<T, U> {
    pub fn new() -> BipartiteGraph<T, U> {
        Self::default()
    }

    /// Adds a node to set 0 or set 1 and returns its position in that set.
    pub fn add_node(&mut self, set: usize, value: T) -> usize {
        assert!(set == 0 || set == 1);
        self.sets[set].push(value);
        self.sets[set].len() - 1
    }

    pub fn node_count(&self, set: usize) -> usize {
        self.sets[set].len()
    }

    pub fn nodes(&self, set: usize) -> &[T] {
        &self.sets[set]
    }

    pub fn node(&self, set: usize, i: usize) -> &T {
        &self.sets[set][i]
    }

    /// Adds a candidate correspondence. Callers only add edges with positive weight.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64, value: U) {
        assert!(source < self.sets[0].len() && target < self.sets[1].len());
        assert!(weight.is_finite(), "edge weight must be finite");
        self.edges.push(Correspondence {
            source,
            target,
            weight,
            value,
        });
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Correspondence<U>] {
        &self.edges
    }

    /// Computes a one-to-one assignment between set 0 and set 1 of maximum total weight.
    ///
    /// Returns the indices (into [`edges`](Self::edges)) of the selected correspondences, in
    /// ascending order of their set 0 node. An empty edge set yields an empty assignment.
    pub fn solve_max_weight_assignment(&self) -> Vec<usize> {
        if self.edges.is_empty() {
            return Vec::new();
        }

        let (n0, n1) = (self.sets[0].len(), self.sets[1].len());
        let n = n0.max(n1);

        // Best edge for each cell. Parallel edges keep the first one of maximum weight.
        let mut cell: Vec<Option<usize>> = vec![None; n * n];
        let mut max_weight = 0.0_f64;
        for (k, e) in self.edges.iter().enumerate() {
            let idx = e.source * n + e.target;
            match cell[idx] {
                Some(old) if self.edges[old].weight >= e.weight => {}
                _ => cell[idx] = Some(k),
            }
            max_weight = max_weight.max(e.weight);
        }

        let costs: Vec<f64> = cell
            .iter()
            .map(|c| match c {
                Some(k) => max_weight - self.edges[*k].weight.max(0.0),
                None => max_weight,
            })
            .collect();

        let mut weights = WeightMatrix::from_row_vec(n, costs);
        let positions = match solve_assignment(&mut weights) {
            Ok(positions) => positions,
            Err(err) => panic!("bipartite assignment is not solvable: {:?}", err),
        };

        let mut selected: Vec<(usize, usize)> = positions
            .into_iter()
            .filter_map(|pos| cell[pos.row * n + pos.column].map(|k| (pos.row, k)))
            .filter(|&(_, k)| self.edges[k].weight > 0.0)
            .collect();
        selected.sort();

        selected.into_iter().map(|(_, k)| k).collect()
    }

    /// Solves the assignment and returns the selected correspondences, consuming the graph.
    pub fn into_max_weight_assignment(self) -> Vec<Correspondence<U>> {
        let mut selected = self.solve_max_weight_assignment();
        selected.sort_unstable();

        let mut chosen = Vec::with_capacity(selected.len());
        let mut next = selected.into_iter().peekable();
        for (k, e) in self.edges.into_iter().enumerate() {
            if next.peek() == Some(&k) {
                next.next();
                chosen.push(e);
            }
        }
        chosen.sort_by_key(|c| c.source);
        chosen
    }

    /// Sums the weights of the given correspondences.
    pub fn sum_weights(&self, selected: &[usize]) -> f64 {
        selected.iter().map(|&k| self.edges[k].weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_optimum_3x3() {
        let mut g: BipartiteGraph<char, ()> = BipartiteGraph::new();
        for c in "abc".chars() {
            g.add_node(0, c);
        }
        for c in "xyz".chars() {
            g.add_node(1, c);
        }
        let w = [[4.0, 1.0, 3.0], [2.0, 0.5, 5.0], [3.0, 2.0, 2.0]];
        for i in 0..3 {
            for j in 0..3 {
                g.add_edge(i, j, w[i][j], ());
            }
        }

        // a-x (4) + b-z (5) + c-y (2) = 11 is the unique maximum.
        let selected = g.solve_max_weight_assignment();
        let pairs: Vec<_> = selected
            .iter()
            .map(|&k| (g.edges()[k].source, g.edges()[k].target))
            .collect();
        assert_eq!(vec![(0, 0), (1, 2), (2, 1)], pairs);
        assert_eq!(11.0, g.sum_weights(&selected));
    }

    #[test]
    fn test_rectangular_sparse() {
        let mut g: BipartiteGraph<usize, &str> = BipartiteGraph::new();
        g.add_node(0, 0);
        g.add_node(0, 1);
        g.add_node(1, 0);
        g.add_edge(0, 0, 1.0, "weak");
        g.add_edge(1, 0, 3.0, "strong");

        let chosen = g.into_max_weight_assignment();
        assert_eq!(1, chosen.len());
        assert_eq!("strong", chosen[0].value);
    }

    #[test]
    fn test_empty() {
        let mut g: BipartiteGraph<usize, ()> = BipartiteGraph::new();
        g.add_node(0, 0);
        assert!(g.solve_max_weight_assignment().is_empty());
    }
}
