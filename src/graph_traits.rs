//! Traits describing what the matching engine needs to know about node and edge payloads.
//!
//! The engine never looks at the concrete skeleton flavour of a graph. Everything it needs
//! (costs, lengths, edge weights, attachment information) is asked through these traits.

/// Payload of a graph node.
pub trait NodeAttributes {
    /// The local cost of the node. MUST be strictly positive.
    fn cost(&self) -> f64;

    /// Length of the skeletal part represented by the node. Used to pick the shortest
    /// candidate when skipping nodes. Defaults to the node cost.
    fn length(&self) -> f64 {
        self.cost()
    }

    /// Called once per node at the end of `Graph::compute_derived_values`.
    fn compute_derived_values(&mut self) {}
}

/// Payload of a graph edge.
pub trait EdgeAttributes {
    /// Weight used in the local adjacency matrices of the subtree signatures.
    fn weight(&self) -> f64 {
        1.0
    }

    /// An edge is "empty" if it has no geometric support, e.g. it only links a
    /// node to a synthetic root. Empty edges never take part in node skipping.
    fn is_empty(&self) -> bool {
        false
    }

    /// Which endpoint (0 or 1) of the source node the target attaches to, if known.
    fn endpoint(&self) -> Option<usize> {
        None
    }

    /// Called once per edge at the end of `Graph::compute_derived_values`.
    fn compute_derived_values(&mut self) {}
}

impl NodeAttributes for f64 {
    fn cost(&self) -> f64 {
        *self
    }
}

impl EdgeAttributes for f64 {
    fn weight(&self) -> f64 {
        *self
    }
}

impl EdgeAttributes for () {}
