use thiserror::Error;

/// Errors returned by [`SearchClient`](crate::SearchClient) operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenSearch returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
