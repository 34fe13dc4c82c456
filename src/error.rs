/// Errors raised by the presolve.  Unreachable OD pairs are not errors: they are
/// recorded as `NoPathRecord`s and reported after the dispatch.
#[derive(Debug, thiserror::Error)]
pub enum PresolveError {
    /// The scenario's cost table or toggles are incomplete or inconsistent, or a
    /// weight failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A search found an edge cost that contradicts a finalized distance.  The
    /// search algorithms assume non-negative weights, so this is a configuration bug.
    #[error("negative weight on edge {from_node} -> {to_node}: {detail}")]
    NegativeWeight {
        from_node: i64,
        to_node: i64,
        detail: String,
    },

    /// A hop of a materialized path has no parallel edge usable by the commodity.
    #[error("no edge from {from_node} to {to_node} matches modes [{modes}] (route {route_id})")]
    GraphConsistency {
        from_node: i64,
        to_node: i64,
        route_id: u64,
        modes: String,
    },

    #[error("routing task for commodity {commodity_id} rooted at node {root_node} failed: {source}")]
    WorkerFailure {
        commodity_id: String,
        root_node: i64,
        #[source]
        source: Box<PresolveError>,
    },

    /// A task panicked; the panic message is preserved.
    #[error("routing task for commodity {commodity_id} rooted at node {root_node} panicked: {message}")]
    WorkerPanic {
        commodity_id: String,
        root_node: i64,
        message: String,
    },

    #[error("malformed input in {file}: {detail}")]
    Input { file: String, detail: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl PresolveError {
    pub fn input(file: &str, detail: impl Into<String>) -> PresolveError {
        PresolveError::Input {
            file: String::from(file),
            detail: detail.into(),
        }
    }

    /// True for the errors that the cost/weight taxonomy calls configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PresolveError::Configuration(_) | PresolveError::NegativeWeight { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PresolveError>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PresolveError::Configuration(String::from("no rail cost for solid"));
        assert_eq!(err.to_string(), "configuration error: no rail cost for solid");
        assert!(err.is_configuration());

        let err = PresolveError::GraphConsistency {
            from_node: 1,
            to_node: 2,
            route_id: 7,
            modes: String::from("road"),
        };
        assert_eq!(err.to_string(), "no edge from 1 to 2 matches modes [road] (route 7)");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_worker_failure_keeps_source() {
        use std::error::Error;
        let inner = PresolveError::Configuration(String::from("bad"));
        let err = PresolveError::WorkerFailure {
            commodity_id: String::from("corn"),
            root_node: 3,
            source: Box::new(inner),
        };
        assert!(err.to_string().contains("configuration error: bad"));
        assert!(err.source().is_some());
    }
}
