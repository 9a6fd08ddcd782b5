//! Error types for drug lookup and import.

use medibridge_core::ApiError;
use thiserror::Error;

/// Errors that can occur during drug lookup operations.
#[derive(Debug, Error)]
pub enum DrugLookupError {
    /// Search operation failed with the specified query and reason.
    #[error("Search failed for query '{query}': {reason}")]
    SearchFailed {
        /// The search query that failed
        query: String,
        /// The reason for the failure
        reason: String,
    },

    /// Network communication error occurred during search.
    #[error("Network error: {reason}")]
    NetworkError {
        /// The reason for the network error
        reason: String,
    },

    /// The server rejected the session token.
    #[error("Not authorized to search the drug catalogue")]
    Unauthorized,

    /// Failed to parse search results or response data.
    #[error("Parse error: {reason}")]
    ParseError {
        /// The reason for the parse error
        reason: String,
    },
}

impl DrugLookupError {
    /// Wraps an API failure for the given query.
    pub fn from_api(query: &str, error: ApiError) -> Self {
        match error {
            ApiError::Network { reason } => DrugLookupError::NetworkError { reason },
            ApiError::Unauthorized => DrugLookupError::Unauthorized,
            ApiError::Decode { reason } => DrugLookupError::ParseError { reason },
            ApiError::Status { status, message } => DrugLookupError::SearchFailed {
                query: query.to_string(),
                reason: format!("status {status}: {message}"),
            },
        }
    }
}

/// Errors that reject a drug catalogue import as a whole.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    /// The file has no header line.
    #[error("Import file is empty")]
    Empty,

    /// The header does not name a `name` column.
    #[error("Import file must have a 'name' column (found: {header})")]
    MissingNameColumn {
        /// The header line as read
        header: String,
    },
}
