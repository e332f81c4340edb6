/*
 * Stargraph Core - connected components by star contraction
 *
 * Pipeline:
 * - ingest/       : raw "u v" records → symmetric, deduplicated edge set
 * - contraction/  : large-star and small-star rounds
 * - convergence/  : symmetric-difference fixed-point oracle
 * - mapping/      : converged edge set as node → representative
 *
 * Everything here is written against `stargraph_dataflow::Engine`; no
 * algorithm touches a concrete executor's collection type.
 */

pub mod contraction;
pub mod convergence;
pub mod edge_set;
pub mod error;
pub mod ingest;
pub mod mapping;
pub mod node;

// Re-exports
pub use contraction::{
    large_star_reduce, orient_down, small_star_reduce, verify_oriented_down, RoundOutput,
    StarContractor,
};
pub use convergence::{has_converged, symmetric_difference_count};
pub use edge_set::{Edge, EdgeSet};
pub use error::{CoreError, Result};
pub use ingest::{ingest, parse_record, Ingested, Malformed, ParsedLine};
pub use mapping::{Assignment, ComponentMapping};
pub use node::NodeId;
