//! Star contraction (large-star / small-star)
//!
//! One round is large-star on the previous round's output followed by
//! small-star on the large-star result. Both operations are
//! map → group-by-source (shuffle) → reduce → distinct, and both are pure
//! functions of their input edge set, so the engine may re-execute any part
//! of a round.
//!
//! # Large-star
//! The mapper emits every edge in both orientations so each grouping key sees
//! its undirected neighborhood `N(s)`. With `c = min(min N(s), s)`, the
//! reducer emits `(t, c)` for every `t ∈ N(s)` with `t ≥ s`.
//!
//! # Small-star
//! The mapper orients every edge from the larger endpoint to the smaller one.
//! With `m = min(N(s) ∪ {s})`, the reducer emits `(t, m)` for every
//! `t ∈ N(s) ∪ {s}`. Afterwards every edge `(a, b)` has `b ≤ a`.
//!
//! # References
//! - Kiveris et al. "Connected Components in MapReduce and Beyond" (SoCC 2014)

use crate::edge_set::{Edge, EdgeSet};
use crate::error::{CoreError, Result};
use crate::node::NodeId;
use stargraph_dataflow::Engine;
use std::cmp::min;
use std::iter;
use tracing::debug;

/// Large-star reducer for one neighborhood
pub fn large_star_reduce<N: NodeId>(node: N, neighbors: &[N]) -> Vec<Edge<N>> {
    let Some(&smallest) = neighbors.iter().min() else {
        return Vec::new();
    };
    let target = min(smallest, node);

    neighbors
        .iter()
        .filter(|&&t| t >= node)
        .map(|&t| (t, target))
        .collect()
}

/// Small-star reducer for one neighborhood (the node itself is added to it)
pub fn small_star_reduce<N: NodeId>(node: N, neighbors: &[N]) -> Vec<Edge<N>> {
    let target = neighbors.iter().copied().fold(node, min);

    neighbors
        .iter()
        .copied()
        .chain(iter::once(node))
        .map(|t| (t, target))
        .collect()
}

/// Point an edge from its larger endpoint to its smaller one
pub fn orient_down<N: NodeId>(a: N, b: N) -> Edge<N> {
    if b <= a {
        (a, b)
    } else {
        (b, a)
    }
}

/// Output of one full round
pub struct RoundOutput<E: Engine, N: NodeId> {
    pub large_star: EdgeSet<E, N>,
    pub small_star: EdgeSet<E, N>,
}

/// Applies the contraction operations over an engine
#[derive(Debug, Clone, Copy)]
pub struct StarContractor {
    check_invariants: bool,
}

impl Default for StarContractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StarContractor {
    pub fn new() -> Self {
        Self {
            check_invariants: true,
        }
    }

    /// Verify the oriented-down invariant after every small-star
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    pub fn checks_invariants(&self) -> bool {
        self.check_invariants
    }

    pub fn large_star<E: Engine, N: NodeId>(
        &self,
        engine: &E,
        edges: &EdgeSet<E, N>,
    ) -> Result<EdgeSet<E, N>> {
        let symmetric = engine.flat_map(edges.dataset(), |&(u, v)| [(u, v), (v, u)])?;
        let neighborhoods = engine.group_by_key(&symmetric)?;
        let emitted = engine.flat_map(&neighborhoods, |(node, neighbors)| {
            large_star_reduce(*node, neighbors)
        })?;
        EdgeSet::from_edges(engine, &emitted)
    }

    pub fn small_star<E: Engine, N: NodeId>(
        &self,
        engine: &E,
        edges: &EdgeSet<E, N>,
    ) -> Result<EdgeSet<E, N>> {
        let oriented = engine.map(edges.dataset(), |&(a, b)| orient_down(a, b))?;
        let neighborhoods = engine.group_by_key(&oriented)?;
        let emitted = engine.flat_map(&neighborhoods, |(node, neighbors)| {
            small_star_reduce(*node, neighbors)
        })?;
        let result = EdgeSet::from_edges(engine, &emitted)?;

        if self.check_invariants {
            verify_oriented_down(engine, &result)?;
        }
        Ok(result)
    }

    /// Large-star then small-star; both results are kept for the convergence check
    pub fn round<E: Engine, N: NodeId>(
        &self,
        engine: &E,
        edges: &EdgeSet<E, N>,
    ) -> Result<RoundOutput<E, N>> {
        let large_star = self.large_star(engine, edges)?;
        debug!("large-star produced {} edges", large_star.len(engine));

        let small_star = self.small_star(engine, &large_star)?;
        debug!("small-star produced {} edges", small_star.len(engine));

        Ok(RoundOutput {
            large_star,
            small_star,
        })
    }
}

/// Fail with an ordering error if any edge `(a, b)` has `b > a`
pub fn verify_oriented_down<E: Engine, N: NodeId>(engine: &E, edges: &EdgeSet<E, N>) -> Result<()> {
    let upward = engine.flat_map(edges.dataset(), |&(a, b)| (b > a).then_some((a, b)))?;
    if let Some((src, dst)) = engine.collect(&upward).into_iter().min() {
        return Err(CoreError::Ordering {
            src: src.to_string(),
            dst: dst.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stargraph_dataflow::{EngineConfig, LocalEngine};

    fn engine() -> LocalEngine {
        LocalEngine::start(EngineConfig::default().with_workers(2).with_partitions(3)).unwrap()
    }

    fn sorted(mut edges: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_large_star_reduce_only_rewires_upper_neighbors() {
        // N(2) = {1, 3, 5}: c = 1, only 3 and 5 are >= 2
        assert_eq!(sorted(large_star_reduce(2u64, &[1, 3, 5])), vec![(3, 1), (5, 1)]);
        // N(4) = {6, 9}: c = 4 (the node itself is smaller than every neighbor)
        assert_eq!(sorted(large_star_reduce(4u64, &[9, 6])), vec![(6, 4), (9, 4)]);
        // self-loop keeps pointing at itself
        assert_eq!(large_star_reduce(3u64, &[3]), vec![(3, 3)]);
        assert!(large_star_reduce(3u64, &[]).is_empty());
    }

    #[test]
    fn test_small_star_reduce_collapses_onto_minimum() {
        assert_eq!(
            sorted(small_star_reduce(5u64, &[3, 2])),
            vec![(2, 2), (3, 2), (5, 2)]
        );
        assert_eq!(small_star_reduce(7u64, &[7]), vec![(7, 7), (7, 7)]);
    }

    #[test]
    fn test_orient_down() {
        assert_eq!(orient_down(1u64, 2), (2, 1));
        assert_eq!(orient_down(2u64, 1), (2, 1));
        assert_eq!(orient_down(4u64, 4), (4, 4));
    }

    #[test]
    fn test_first_round_on_scenario_graph() {
        let engine = engine();
        let input = EdgeSet::from_vec(
            &engine,
            vec![(1u64, 2u64), (2, 1), (2, 3), (3, 2), (4, 5), (5, 4)],
        )
        .unwrap();

        let out = StarContractor::new().round(&engine, &input).unwrap();

        assert_eq!(
            out.large_star.to_sorted_vec(&engine),
            vec![(2, 1), (3, 1), (5, 4)]
        );
        assert_eq!(
            out.small_star.to_sorted_vec(&engine),
            vec![(1, 1), (2, 1), (3, 1), (4, 4), (5, 4)]
        );
    }

    #[test]
    fn test_large_star_sees_both_orientations() {
        // downward-only input: without re-symmetrizing, node 1 would lose 2 and 3
        let engine = engine();
        let input = EdgeSet::from_vec(&engine, vec![(1u64, 1u64), (2, 1), (3, 1)]).unwrap();

        let out = StarContractor::new().large_star(&engine, &input).unwrap();

        assert_eq!(out.to_sorted_vec(&engine), vec![(1, 1), (2, 1), (3, 1)]);
    }

    #[test]
    fn test_small_star_output_is_oriented_down() {
        let engine = engine();
        let input = EdgeSet::from_vec(&engine, vec![(1u64, 9u64), (9, 4), (4, 7), (2, 2)]).unwrap();

        let out = StarContractor::new().small_star(&engine, &input).unwrap();

        for (a, b) in out.to_sorted_vec(&engine) {
            assert!(b <= a, "edge ({a}, {b}) points upward");
        }
    }

    #[test]
    fn test_verify_oriented_down_reports_upward_edge() {
        let engine = engine();
        let set = EdgeSet::from_vec(&engine, vec![(2u64, 1u64), (3, 8), (1, 4)]).unwrap();

        let err = verify_oriented_down(&engine, &set).unwrap_err();
        match err {
            CoreError::Ordering { src, dst } => {
                assert_eq!(src, "1");
                assert_eq!(dst, "4");
            }
            other => panic!("expected ordering error, got {other}"),
        }
    }
}
