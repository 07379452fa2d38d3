//! OpenSearch REST client for the alerting service.
//!
//! A thin, connection-pooled wrapper over the handful of OpenSearch
//! endpoints the engine consumes: `_search`, document indexing (with
//! `refresh=wait_for` for read-your-writes state persistence), index
//! existence/creation, and cluster health.

mod client;
mod error;

pub use client::SearchClient;
pub use error::SearchError;
