use std::sync::Arc;

use vigil_core::Config;
use vigil_engine::AlertScheduler;
use vigil_search::SearchClient;

/// Shared state behind every handler.
///
/// `search` and `scheduler` are `None` when the first OpenSearch probe
/// failed at startup: the service then runs degraded — liveness stays
/// green, readiness and the alerting endpoints report 503.
pub struct AppState {
    pub config: Config,
    pub search: Option<Arc<SearchClient>>,
    pub scheduler: Option<Arc<AlertScheduler>>,
}
