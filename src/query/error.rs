//! Query error types
//!
//! Defines all error conditions that can occur while compiling a query,
//! talking to the search backend and decoding its response.

use thiserror::Error;

use crate::search::TransportError;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// The query definition cannot be compiled
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The backend call failed
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    /// The backend response does not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

impl QueryError {
    /// Shorthand for [`QueryError::InvalidQuery`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}

/// Undecodable responses are a shape problem, not a transport failure
impl From<TransportError> for QueryError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Decode(message) => QueryError::Decode(message),
            other => QueryError::Transport(other),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::invalid("table is required");
        assert_eq!(err.to_string(), "Invalid query: table is required");

        let err = QueryError::Transport(TransportError::Timeout);
        assert_eq!(err.to_string(), "Transport error: Request timeout");
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: QueryError = TransportError::Decode("missing hits".into()).into();
        assert!(matches!(err, QueryError::Decode(ref m) if m == "missing hits"));

        let err: QueryError = TransportError::Unavailable.into();
        assert!(matches!(err, QueryError::Transport(TransportError::Unavailable)));
    }
}
