//! Component mapping
//!
//! The converged edge set is the mapping: each edge `(node, representative)`
//! labels one node with the minimum identifier of its component.
//! Representatives carry a self-loop `(r, r)`.

use crate::edge_set::EdgeSet;
use crate::error::Result;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use stargraph_dataflow::Engine;
use std::collections::BTreeMap;
use std::fmt;

/// One output record: a node and its component representative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment<N> {
    pub node: N,
    pub representative: N,
}

impl<N: fmt::Display> fmt::Display for Assignment<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.node, self.representative)
    }
}

pub struct ComponentMapping<E: Engine, N: NodeId> {
    edges: EdgeSet<E, N>,
}

impl<E: Engine, N: NodeId> ComponentMapping<E, N> {
    /// Reinterpret a converged edge set as a mapping
    pub fn from_converged(edges: EdgeSet<E, N>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &EdgeSet<E, N> {
        &self.edges
    }

    /// Output records, one per node
    pub fn assignments(&self, engine: &E) -> Result<E::Dataset<Assignment<N>>> {
        Ok(engine.map(self.edges.dataset(), |&(node, representative)| Assignment {
            node,
            representative,
        })?)
    }

    /// Number of labelled nodes
    pub fn node_count(&self, engine: &E) -> usize {
        self.edges.len(engine)
    }

    /// Number of components (one self-loop per representative)
    pub fn component_count(&self, engine: &E) -> Result<usize> {
        let roots = engine.flat_map(self.edges.dataset(), |&(node, rep)| {
            (node == rep).then_some(node)
        })?;
        Ok(engine.count(&roots))
    }

    /// Whole mapping in memory, keyed by node
    pub fn to_btree_map(&self, engine: &E) -> BTreeMap<N, N> {
        let mut map = BTreeMap::new();
        for (node, rep) in engine.collect(self.edges.dataset()) {
            map.entry(node)
                .and_modify(|current: &mut N| *current = (*current).min(rep))
                .or_insert(rep);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stargraph_dataflow::{EngineConfig, LocalEngine};

    #[test]
    fn test_assignment_display() {
        let a = Assignment {
            node: 5u64,
            representative: 4u64,
        };
        assert_eq!(a.to_string(), "5 4");
    }

    #[test]
    fn test_mapping_views() {
        let engine =
            LocalEngine::start(EngineConfig::default().with_workers(1).with_partitions(2)).unwrap();
        let edges =
            EdgeSet::from_vec(&engine, vec![(1u64, 1u64), (2, 1), (3, 1), (4, 4), (5, 4)]).unwrap();
        let mapping = ComponentMapping::from_converged(edges);

        assert_eq!(mapping.node_count(&engine), 5);
        assert_eq!(mapping.component_count(&engine).unwrap(), 2);
        assert_eq!(
            mapping.to_btree_map(&engine),
            BTreeMap::from([(1, 1), (2, 1), (3, 1), (4, 4), (5, 4)])
        );

        let mut records: Vec<String> = engine
            .collect(&mapping.assignments(&engine).unwrap())
            .iter()
            .map(|a| a.to_string())
            .collect();
        records.sort();
        assert_eq!(records, vec!["1 1", "2 1", "3 1", "4 4", "5 4"]);
    }
}
