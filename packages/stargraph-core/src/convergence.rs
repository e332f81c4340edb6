//! Fixed-point detection
//!
//! A round has converged when its large-star output and small-star output
//! are identical as sets, i.e. `|(A \ B) ∪ (B \ A)| = 0`.

use crate::edge_set::EdgeSet;
use crate::error::Result;
use crate::node::NodeId;
use stargraph_dataflow::Engine;

/// Cardinality of the symmetric difference of two edge sets
pub fn symmetric_difference_count<E: Engine, N: NodeId>(
    engine: &E,
    a: &EdgeSet<E, N>,
    b: &EdgeSet<E, N>,
) -> Result<usize> {
    let a_only = engine.set_difference(a.dataset(), b.dataset())?;
    let b_only = engine.set_difference(b.dataset(), a.dataset())?;
    Ok(engine.count(&engine.union(&a_only, &b_only)))
}

/// True when the two sets are identical
pub fn has_converged<E: Engine, N: NodeId>(
    engine: &E,
    a: &EdgeSet<E, N>,
    b: &EdgeSet<E, N>,
) -> Result<bool> {
    Ok(symmetric_difference_count(engine, a, b)? == 0)
}
