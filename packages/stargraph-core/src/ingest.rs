//! Edge ingestion
//!
//! Raw text records become the round-1 edge set: every record `u v` yields
//! both `(u, v)` and `(v, u)`, and the result is deduplicated. A single
//! malformed record aborts the whole ingestion; no partial edge set escapes.

use crate::edge_set::{Edge, EdgeSet};
use crate::error::{CoreError, Result};
use crate::node::NodeId;
use stargraph_dataflow::{Engine, TextRecord};
use std::sync::Arc;
use tracing::{debug, info};

/// Decoded form of one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine<N> {
    Edge(N, N),
    /// Empty or whitespace-only line, not a record
    Blank,
    Malformed(Malformed),
}

/// A record that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub source: Arc<str>,
    pub line: usize,
    pub record: String,
    pub reason: String,
}

impl From<Malformed> for CoreError {
    fn from(m: Malformed) -> Self {
        CoreError::Parse {
            location: m.source.to_string(),
            line: m.line,
            record: m.record,
            reason: m.reason,
        }
    }
}

impl<N> ParsedLine<N> {
    fn edge(&self) -> Option<Edge<N>>
    where
        N: Copy,
    {
        match self {
            ParsedLine::Edge(u, v) => Some((*u, *v)),
            _ => None,
        }
    }

    fn malformed(&self) -> Option<Malformed> {
        match self {
            ParsedLine::Malformed(m) => Some(m.clone()),
            _ => None,
        }
    }
}

/// Decode one line: exactly two whitespace-separated node identifiers
pub fn parse_record<N: NodeId>(record: &TextRecord) -> ParsedLine<N> {
    let malformed = |reason: String| {
        ParsedLine::Malformed(Malformed {
            source: record.source.clone(),
            line: record.line,
            record: record.text.clone(),
            reason,
        })
    };

    if record.text.contains(char::REPLACEMENT_CHARACTER) {
        return malformed("invalid UTF-8".to_string());
    }

    let tokens: Vec<&str> = record.text.split_whitespace().collect();
    match tokens.as_slice() {
        [] => ParsedLine::Blank,
        [u, v] => match (N::parse_token(u), N::parse_token(v)) {
            (Some(u), Some(v)) => ParsedLine::Edge(u, v),
            (None, _) => malformed(format!("invalid node identifier {:?}", u)),
            (_, None) => malformed(format!("invalid node identifier {:?}", v)),
        },
        other => malformed(format!(
            "expected 2 node identifiers, found {}",
            other.len()
        )),
    }
}

/// Result of ingestion
pub struct Ingested<E: Engine, N: NodeId> {
    /// Symmetric, deduplicated edge set
    pub edges: EdgeSet<E, N>,
    /// Number of edge records read (blank lines excluded)
    pub records: usize,
}

/// Turn raw records into the initial edge set.
///
/// When several records are malformed, the one with the smallest
/// `(source, line)` is reported so the diagnostic does not depend on
/// partitioning.
pub fn ingest<E: Engine, N: NodeId>(
    engine: &E,
    lines: &E::Dataset<TextRecord>,
) -> Result<Ingested<E, N>> {
    let parsed = engine.map(lines, parse_record::<N>)?;

    let failures = engine.flat_map(&parsed, ParsedLine::malformed)?;
    let failure_count = engine.count(&failures);
    if failure_count > 0 {
        let first = engine
            .collect(&failures)
            .into_iter()
            .min_by(|a, b| (&a.source, a.line).cmp(&(&b.source, b.line)));
        debug!("Ingestion found {} malformed records", failure_count);
        if let Some(first) = first {
            return Err(first.into());
        }
    }

    let edges = engine.flat_map(&parsed, ParsedLine::edge)?;
    let records = engine.count(&edges);

    let symmetric = engine.flat_map(&edges, |&(u, v)| [(u, v), (v, u)])?;
    let edges = EdgeSet::from_edges(engine, &symmetric)?;

    info!(
        "Count of objects is {} ({} directed edges after symmetrization)",
        records,
        edges.len(engine)
    );

    Ok(Ingested { edges, records })
}
