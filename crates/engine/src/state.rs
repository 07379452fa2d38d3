//! Alert state tracking: transitions, throttle enforcement, persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use vigil_rules::schema::AlertRule;
use vigil_search::SearchClient;

/// Possible states for an alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Ok,
    Firing,
    Resolved,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Firing => "firing",
            Self::Resolved => "resolved",
        }
    }
}

/// Persisted state record for a single alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStateRecord {
    pub rule_name: String,
    #[serde(default)]
    pub state: AlertState,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_fired: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_resolved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_notified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consecutive_fires: u32,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub message: Option<String>,
}

impl AlertStateRecord {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            state: AlertState::Ok,
            last_checked: None,
            last_fired: None,
            last_resolved: None,
            last_notified: None,
            consecutive_fires: 0,
            current_value: None,
            threshold: 0.0,
            message: None,
        }
    }
}

/// Result of evaluating a state transition.
#[derive(Debug, Clone, Copy)]
pub struct StateTransition {
    pub previous_state: AlertState,
    pub new_state: AlertState,
    pub changed: bool,
    pub should_notify: bool,
}

/// Manages alert state transitions and throttle enforcement.
///
/// In-memory state is authoritative for the running service; every update
/// is written through to OpenSearch (keyed by rule name, with
/// `refresh=wait_for`) so a restart resumes where the last run stopped.
/// Persistence failures are logged and survived.
///
/// Records are created lazily: a rule never evaluated before starts from
/// OK with all timestamps unset.
pub struct StateManager {
    client: Arc<SearchClient>,
    state_index: String,
    states: Mutex<HashMap<String, AlertStateRecord>>,
}

impl StateManager {
    pub fn new(client: Arc<SearchClient>, state_index: impl Into<String>) -> Self {
        Self {
            client,
            state_index: state_index.into(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Create the state index if needed and load existing records.
    ///
    /// Both steps degrade gracefully: a failed bootstrap or restore leaves
    /// an empty in-memory map and the engine runs on.
    pub async fn initialize(&self) {
        self.ensure_index().await;
        self.load_states().await;
    }

    async fn ensure_index(&self) {
        match self.client.index_exists(&self.state_index).await {
            Ok(true) => {}
            Ok(false) => {
                let body = json!({
                    "settings": {"number_of_shards": 1, "number_of_replicas": 1},
                    "mappings": {
                        "properties": {
                            "rule_name": {"type": "keyword"},
                            "state": {"type": "keyword"},
                            "last_checked": {"type": "date"},
                            "last_fired": {"type": "date"},
                            "last_resolved": {"type": "date"},
                            "last_notified": {"type": "date"},
                            "consecutive_fires": {"type": "integer"},
                            "current_value": {"type": "float"},
                            "threshold": {"type": "float"},
                            "message": {"type": "text"},
                        }
                    }
                });
                match self.client.create_index(&self.state_index, &body).await {
                    Ok(()) => info!(index = %self.state_index, "created state index"),
                    Err(e) => warn!(index = %self.state_index, error = %e, "failed to create state index"),
                }
            }
            Err(e) => warn!(index = %self.state_index, error = %e, "state index check failed"),
        }
    }

    async fn load_states(&self) {
        let body = json!({"query": {"match_all": {}}, "size": 1000});
        match self.client.search(&self.state_index, &body).await {
            Ok(response) => {
                let hits = response["hits"]["hits"].as_array().cloned().unwrap_or_default();
                let mut states = self.states.lock().expect("states lock poisoned");
                for hit in hits {
                    match serde_json::from_value::<AlertStateRecord>(hit["_source"].clone()) {
                        Ok(record) => {
                            states.insert(record.rule_name.clone(), record);
                        }
                        Err(e) => warn!(error = %e, "skipping malformed state record"),
                    }
                }
                info!(count = states.len(), "loaded existing alert states");
            }
            Err(e) => warn!(error = %e, "could not load existing states"),
        }
    }

    /// Snapshot of the current state for a rule, defaulting to OK.
    pub fn get_state(&self, rule_name: &str) -> AlertStateRecord {
        let mut states = self.states.lock().expect("states lock poisoned");
        states
            .entry(rule_name.to_string())
            .or_insert_with(|| AlertStateRecord::new(rule_name))
            .clone()
    }

    /// Evaluate and apply a state transition at the current wall time.
    pub async fn update_state(
        &self,
        rule: &AlertRule,
        condition_met: bool,
        current_value: f64,
    ) -> StateTransition {
        self.update_state_at(rule, condition_met, current_value, Utc::now())
            .await
    }

    /// Evaluate and apply a state transition at an explicit instant.
    ///
    /// Deterministic variant used by tests and replay tooling; production
    /// callers go through [`update_state`](Self::update_state).
    pub async fn update_state_at(
        &self,
        rule: &AlertRule,
        condition_met: bool,
        current_value: f64,
        now: DateTime<Utc>,
    ) -> StateTransition {
        let (transition, snapshot) = {
            let mut states = self.states.lock().expect("states lock poisoned");
            let record = states
                .entry(rule.name.clone())
                .or_insert_with(|| AlertStateRecord::new(rule.name.clone()));

            let previous_state = record.state;
            record.last_checked = Some(now);
            record.current_value = Some(current_value);
            record.threshold = rule.condition.value;

            let should_notify = if condition_met {
                if matches!(previous_state, AlertState::Ok | AlertState::Resolved) {
                    // Entering FIRING always notifies; the throttle only
                    // gates repeats while the alert stays firing.
                    record.state = AlertState::Firing;
                    record.last_fired = Some(now);
                    record.consecutive_fires = 1;
                    true
                } else {
                    record.consecutive_fires += 1;
                    throttle_allows(record.last_notified, rule, now)
                }
            } else {
                match previous_state {
                    AlertState::Firing => {
                        record.state = AlertState::Resolved;
                        record.last_resolved = Some(now);
                        record.consecutive_fires = 0;
                        true
                    }
                    AlertState::Resolved => {
                        record.state = AlertState::Ok;
                        record.consecutive_fires = 0;
                        false
                    }
                    AlertState::Ok => false,
                }
            };

            let new_state = record.state;
            if should_notify {
                // Throttle is an admission gate: the clock starts when a
                // notification is admitted, not when delivery succeeds.
                record.last_notified = Some(now);
            }

            (
                StateTransition {
                    previous_state,
                    new_state,
                    changed: previous_state != new_state,
                    should_notify,
                },
                record.clone(),
            )
        };

        self.persist(&snapshot).await;
        transition
    }

    /// Write one record through to OpenSearch. `refresh=wait_for` makes
    /// the write visible to the restore query a restart would issue.
    async fn persist(&self, record: &AlertStateRecord) {
        let body = match serde_json::to_value(record) {
            Ok(body) => body,
            Err(e) => {
                error!(rule_name = %record.rule_name, error = %e, "failed to serialize state");
                return;
            }
        };
        if let Err(e) = self
            .client
            .index_doc(&self.state_index, Some(&record.rule_name), &body, Some("wait_for"))
            .await
        {
            error!(rule_name = %record.rule_name, error = %e, "failed to persist state");
        }
    }
}

/// Whether the throttle window has passed since the last notification.
fn throttle_allows(last_notified: Option<DateTime<Utc>>, rule: &AlertRule, now: DateTime<Utc>) -> bool {
    match last_notified {
        None => true,
        Some(last) => {
            let elapsed = now.signed_duration_since(last).num_seconds();
            elapsed >= rule.throttle.window_secs() as i64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rule() -> AlertRule {
        serde_json::from_value(json!({
            "name": "state-test",
            "description": "state machine test rule",
            "schedule": {"interval": "1m"},
            "query": {
                "index": ["logs-*"],
                "time_range": {"from": "now-5m", "to": "now"},
                "filter": {"match_all": {}}
            },
            "condition": {"type": "threshold", "operator": "gt", "value": 100},
            "actions": [{
                "type": "webhook",
                "name": "hook",
                "webhook": {"url": "https://example.com", "body": {}}
            }],
            "throttle": {"value": 15, "unit": "minutes"},
            "metadata": {"severity": "high", "category": "test", "owner": "qa"}
        }))
        .unwrap()
    }

    async fn manager_with_sink() -> (MockServer, StateManager) {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/\.alerts-state/_doc/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "updated"})))
            .mount(&server)
            .await;
        let client = Arc::new(SearchClient::with_base_url(server.uri()).unwrap());
        let manager = StateManager::new(client, ".alerts-state");
        (server, manager)
    }

    fn t0() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn ok_to_firing_notifies() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        let transition = manager.update_state_at(&rule, true, 150.0, t0()).await;

        assert_eq!(transition.previous_state, AlertState::Ok);
        assert_eq!(transition.new_state, AlertState::Firing);
        assert!(transition.changed);
        assert!(transition.should_notify);

        let record = manager.get_state("state-test");
        assert_eq!(record.state, AlertState::Firing);
        assert_eq!(record.consecutive_fires, 1);
        assert_eq!(record.last_fired, Some(t0()));
        assert_eq!(record.last_notified, Some(t0()));
        assert_eq!(record.last_checked, Some(t0()));
        assert_eq!(record.current_value, Some(150.0));
        assert_eq!(record.threshold, 100.0);
    }

    #[tokio::test]
    async fn sustained_firing_is_throttled() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        manager.update_state_at(&rule, true, 150.0, t0()).await;
        let next = t0() + Duration::minutes(1);
        let transition = manager.update_state_at(&rule, true, 200.0, next).await;

        assert_eq!(transition.new_state, AlertState::Firing);
        assert!(!transition.changed);
        assert!(!transition.should_notify);

        let record = manager.get_state("state-test");
        assert_eq!(record.consecutive_fires, 2);
        // last_notified must not advance on a suppressed tick.
        assert_eq!(record.last_notified, Some(t0()));
        assert_eq!(record.last_checked, Some(next));
    }

    #[tokio::test]
    async fn throttle_admits_after_window() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        manager.update_state_at(&rule, true, 150.0, t0()).await;
        manager
            .update_state_at(&rule, true, 200.0, t0() + Duration::minutes(1))
            .await;
        let late = t0() + Duration::minutes(16);
        let transition = manager.update_state_at(&rule, true, 200.0, late).await;

        assert!(transition.should_notify);
        assert!(!transition.changed);
        assert_eq!(manager.get_state("state-test").last_notified, Some(late));
        assert_eq!(manager.get_state("state-test").consecutive_fires, 3);
    }

    #[tokio::test]
    async fn throttle_boundary_is_inclusive() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        manager.update_state_at(&rule, true, 150.0, t0()).await;
        // Exactly at the window edge: 15 minutes later.
        let edge = t0() + Duration::minutes(15);
        let transition = manager.update_state_at(&rule, true, 160.0, edge).await;
        assert!(transition.should_notify);
    }

    #[tokio::test]
    async fn resolve_then_ok_then_refire() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        manager.update_state_at(&rule, true, 150.0, t0()).await;

        let resolve_at = t0() + Duration::minutes(5);
        let resolved = manager.update_state_at(&rule, false, 50.0, resolve_at).await;
        assert_eq!(resolved.previous_state, AlertState::Firing);
        assert_eq!(resolved.new_state, AlertState::Resolved);
        assert!(resolved.changed);
        assert!(resolved.should_notify);
        let record = manager.get_state("state-test");
        assert_eq!(record.consecutive_fires, 0);
        assert_eq!(record.last_resolved, Some(resolve_at));

        let ok = manager
            .update_state_at(&rule, false, 40.0, t0() + Duration::minutes(10))
            .await;
        assert_eq!(ok.new_state, AlertState::Ok);
        assert!(ok.changed);
        assert!(!ok.should_notify);

        let refire_at = t0() + Duration::minutes(20);
        let refired = manager.update_state_at(&rule, true, 150.0, refire_at).await;
        assert_eq!(refired.previous_state, AlertState::Ok);
        assert_eq!(refired.new_state, AlertState::Firing);
        assert!(refired.should_notify);
        assert_eq!(manager.get_state("state-test").consecutive_fires, 1);
        assert_eq!(manager.get_state("state-test").last_fired, Some(refire_at));
    }

    #[tokio::test]
    async fn resolved_to_firing_notifies_immediately() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        manager.update_state_at(&rule, true, 150.0, t0()).await;
        manager
            .update_state_at(&rule, false, 50.0, t0() + Duration::minutes(1))
            .await;
        // Fire again straight from RESOLVED, well inside the throttle
        // window: entering FIRING always notifies.
        let transition = manager
            .update_state_at(&rule, true, 180.0, t0() + Duration::minutes(2))
            .await;
        assert_eq!(transition.previous_state, AlertState::Resolved);
        assert_eq!(transition.new_state, AlertState::Firing);
        assert!(transition.should_notify);
    }

    #[tokio::test]
    async fn ok_stays_ok_silently() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        let transition = manager.update_state_at(&rule, false, 5.0, t0()).await;
        assert_eq!(transition.previous_state, AlertState::Ok);
        assert_eq!(transition.new_state, AlertState::Ok);
        assert!(!transition.changed);
        assert!(!transition.should_notify);

        let record = manager.get_state("state-test");
        assert_eq!(record.consecutive_fires, 0);
        assert!(record.last_notified.is_none());
        assert_eq!(record.last_checked, Some(t0()));
    }

    #[tokio::test]
    async fn consecutive_fires_positive_iff_firing() {
        let (_server, manager) = manager_with_sink().await;
        let rule = rule();

        let mut at = t0();
        for (met, _value) in [(true, 0), (true, 0), (false, 0), (false, 0), (true, 0)] {
            manager.update_state_at(&rule, met, 120.0, at).await;
            let record = manager.get_state("state-test");
            assert_eq!(
                record.consecutive_fires > 0,
                record.state == AlertState::Firing,
                "invariant violated at state {:?}",
                record.state
            );
            at += Duration::minutes(1);
        }
    }

    #[tokio::test]
    async fn persistence_failure_keeps_memory_authoritative() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = Arc::new(SearchClient::with_base_url(server.uri()).unwrap());
        let manager = StateManager::new(client, ".alerts-state");

        let transition = manager.update_state_at(&rule(), true, 150.0, t0()).await;
        assert!(transition.should_notify);
        assert_eq!(manager.get_state("state-test").state, AlertState::Firing);
    }

    #[tokio::test]
    async fn persist_writes_through_with_wait_for() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/\.alerts-state/_doc/state-test$"))
            .and(wiremock::matchers::query_param("refresh", "wait_for"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "created"})))
            .expect(1)
            .mount(&server)
            .await;
        let client = Arc::new(SearchClient::with_base_url(server.uri()).unwrap());
        let manager = StateManager::new(client, ".alerts-state");

        manager.update_state_at(&rule(), true, 150.0, t0()).await;
    }

    #[tokio::test]
    async fn initialize_restores_records_from_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(r"^/\.alerts-state$"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/\.alerts-state/_search$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{
                    "_source": {
                        "rule_name": "restored-rule",
                        "state": "firing",
                        "consecutive_fires": 4,
                        "threshold": 100.0,
                        "last_notified": "2026-03-01T11:00:00Z"
                    }
                }]}
            })))
            .mount(&server)
            .await;

        let client = Arc::new(SearchClient::with_base_url(server.uri()).unwrap());
        let manager = StateManager::new(client, ".alerts-state");
        manager.initialize().await;

        let record = manager.get_state("restored-rule");
        assert_eq!(record.state, AlertState::Firing);
        assert_eq!(record.consecutive_fires, 4);
        assert!(record.last_notified.is_some());
    }

    #[tokio::test]
    async fn initialize_degrades_to_empty_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Arc::new(SearchClient::with_base_url(server.uri()).unwrap());
        let manager = StateManager::new(client, ".alerts-state");
        manager.initialize().await;

        // Unknown rule defaults to OK.
        assert_eq!(manager.get_state("anything").state, AlertState::Ok);
    }
}
