//! Deduplicated edge sets
//!
//! An `EdgeSet` is only ever built through a `distinct` pass, so holding one
//! means holding a set: no two identical `(source, destination)` pairs.
//! Edge sets are immutable; every contraction produces a new one.

use crate::error::Result;
use crate::node::NodeId;
use stargraph_dataflow::Engine;

/// Directed edge `(source, destination)`
pub type Edge<N> = (N, N);

pub struct EdgeSet<E: Engine, N: NodeId> {
    edges: E::Dataset<Edge<N>>,
}

impl<E: Engine, N: NodeId> Clone for EdgeSet<E, N> {
    fn clone(&self) -> Self {
        Self {
            edges: self.edges.clone(),
        }
    }
}

impl<E: Engine, N: NodeId> EdgeSet<E, N> {
    /// Deduplicate a dataset of edges into a set
    pub fn from_edges(engine: &E, edges: &E::Dataset<Edge<N>>) -> Result<Self> {
        Ok(Self {
            edges: engine.distinct(edges)?,
        })
    }

    /// Build a set from in-memory edges
    pub fn from_vec(engine: &E, edges: Vec<Edge<N>>) -> Result<Self> {
        Self::from_edges(engine, &engine.parallelize(edges))
    }

    pub fn empty(engine: &E) -> Self {
        Self {
            edges: engine.parallelize(Vec::new()),
        }
    }

    pub fn dataset(&self) -> &E::Dataset<Edge<N>> {
        &self.edges
    }

    pub fn len(&self, engine: &E) -> usize {
        engine.count(&self.edges)
    }

    pub fn is_empty(&self, engine: &E) -> bool {
        self.len(engine) == 0
    }

    /// All edges in ascending order
    pub fn to_sorted_vec(&self, engine: &E) -> Vec<Edge<N>> {
        let mut edges = engine.collect(&self.edges);
        edges.sort_unstable();
        edges
    }
}
