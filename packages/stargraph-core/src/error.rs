use stargraph_dataflow::DataflowError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A record that does not decode to exactly two node identifiers
    #[error("Parse error at {location}:{line}: {reason} (record: {record:?})")]
    Parse {
        location: String,
        line: usize,
        record: String,
        reason: String,
    },

    /// An edge violates the oriented-down invariant, so `Ord` on the node type is not total
    #[error("Ordering error: edge ({src}, {dst}) points upward after small-star; node identifiers are not totally ordered")]
    Ordering { src: String, dst: String },

    #[error("Engine error: {0}")]
    Engine(#[from] DataflowError),
}

impl CoreError {
    pub fn is_parse(&self) -> bool {
        matches!(self, CoreError::Parse { .. })
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, CoreError::Ordering { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_location() {
        let err = CoreError::Parse {
            location: "edges.txt".to_string(),
            line: 7,
            record: "x y".to_string(),
            reason: "invalid node identifier \"x\"".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("edges.txt:7"));
        assert!(msg.contains("\"x y\""));
        assert!(err.is_parse());
        assert!(!err.is_ordering());
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: CoreError = DataflowError::execution("distinct partition 0 failed").into();
        assert!(matches!(err, CoreError::Engine(_)));
        assert!(err.to_string().contains("distinct partition 0 failed"));
    }
}
