//! Graphviz DOT rendering.

/// Types that can render themselves as a Graphviz DOT graph.
pub trait ToDot {
    /// Returns the graph in DOT format.
    fn to_dot(&self) -> String;
}
