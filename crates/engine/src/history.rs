//! Append-only alert event history backed by OpenSearch.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use vigil_search::SearchClient;

use crate::event::AlertEvent;

/// Stores and queries alert history events.
///
/// Writes never propagate failures (a lost history event must not break a
/// tick); reads go to OpenSearch on demand, nothing is cached.
pub struct HistoryRecorder {
    client: Arc<SearchClient>,
    history_index: String,
}

impl HistoryRecorder {
    pub fn new(client: Arc<SearchClient>, history_index: impl Into<String>) -> Self {
        Self {
            client,
            history_index: history_index.into(),
        }
    }

    /// Create the history index with mappings if it doesn't exist.
    pub async fn initialize(&self) {
        match self.client.index_exists(&self.history_index).await {
            Ok(true) => {}
            Ok(false) => {
                let body = json!({
                    "settings": {"number_of_shards": 1, "number_of_replicas": 1},
                    "mappings": {
                        "properties": {
                            "rule_name": {"type": "keyword"},
                            "event_type": {"type": "keyword"},
                            "timestamp": {"type": "date"},
                            "value": {"type": "float"},
                            "threshold": {"type": "float"},
                            "operator": {"type": "keyword"},
                            "condition_met": {"type": "boolean"},
                            "notification_sent": {"type": "boolean"},
                            "notification_status": {"type": "keyword"},
                            "metadata": {"type": "object", "enabled": true},
                            "query_took_ms": {"type": "integer"},
                            "error": {"type": "text"},
                        }
                    }
                });
                match self.client.create_index(&self.history_index, &body).await {
                    Ok(()) => info!(index = %self.history_index, "created history index"),
                    Err(e) => {
                        warn!(index = %self.history_index, error = %e, "failed to create history index")
                    }
                }
            }
            Err(e) => warn!(index = %self.history_index, error = %e, "history index check failed"),
        }
    }

    /// Append one event. Failures are logged and swallowed.
    pub async fn record(&self, event: &AlertEvent) {
        let body = match serde_json::to_value(event) {
            Ok(body) => body,
            Err(e) => {
                error!(rule_name = %event.rule_name, error = %e, "failed to serialize alert event");
                return;
            }
        };
        if let Err(e) = self.client.index_doc(&self.history_index, None, &body, None).await {
            error!(rule_name = %event.rule_name, error = %e, "failed to record alert event");
        }
    }

    /// Query history newest-first, optionally filtered by rule name.
    ///
    /// `time_from` is an OpenSearch-relative bound like `now-24h`. Errors
    /// are logged and reported as an empty page.
    pub async fn get_history(
        &self,
        rule_name: Option<&str>,
        limit: usize,
        time_from: &str,
    ) -> Vec<Value> {
        let mut must = vec![json!({"range": {"timestamp": {"gte": time_from}}})];
        if let Some(rule_name) = rule_name {
            must.push(json!({"term": {"rule_name": rule_name}}));
        }
        let body = json!({
            "query": {"bool": {"must": must}},
            "sort": [{"timestamp": {"order": "desc"}}],
            "size": limit,
        });

        match self.client.search(&self.history_index, &body).await {
            Ok(response) => response["hits"]["hits"]
                .as_array()
                .map(|hits| hits.iter().map(|hit| hit["_source"].clone()).collect())
                .unwrap_or_default(),
            Err(e) => {
                error!(error = %e, "failed to query alert history");
                Vec::new()
            }
        }
    }
}
