//! [`AlertScheduler`] — ties all alerting services together with
//! task-per-rule periodic scheduling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use vigil_notify::WebhookNotifier;
use vigil_rules::schema::{parse_interval, AlertRule};
use vigil_rules::RuleLoader;

use crate::evaluator::{ConditionEvaluator, EvaluationResult};
use crate::event::{ActionResult, AlertEvent, EventType, NotificationStatus};
use crate::executor::QueryExecutor;
use crate::history::HistoryRecorder;
use crate::state::{AlertState, StateManager, StateTransition};

/// How long an in-flight tick may keep running after `stop()` before it
/// is abandoned.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything a tick needs; shared by all per-rule tasks.
struct SchedulerInner {
    rule_loader: Arc<RuleLoader>,
    query_executor: QueryExecutor,
    state_manager: Arc<StateManager>,
    notifier: Arc<WebhookNotifier>,
    history: Arc<HistoryRecorder>,
}

/// Owns one periodic task per enabled rule.
///
/// Each rule's ticks are serialized by construction (a single task runs
/// them); across rules, ticks interleave freely on the runtime. A tick
/// that overruns its interval skips the next start rather than queueing
/// a backlog.
pub struct AlertScheduler {
    inner: Arc<SchedulerInner>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    running: AtomicBool,
}

impl AlertScheduler {
    pub fn new(
        rule_loader: Arc<RuleLoader>,
        query_executor: QueryExecutor,
        state_manager: Arc<StateManager>,
        notifier: Arc<WebhookNotifier>,
        history: Arc<HistoryRecorder>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                rule_loader,
                query_executor,
                state_manager,
                notifier,
                history,
            }),
            tasks: Mutex::new(HashMap::new()),
            shutdown_tx: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn rule_loader(&self) -> &RuleLoader {
        &self.inner.rule_loader
    }

    pub fn state_manager(&self) -> &StateManager {
        &self.inner.state_manager
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.inner.history
    }

    /// Load rules and install a periodic tick for every enabled rule.
    pub async fn start(&self) {
        self.inner.rule_loader.load_all();
        let installed = self.install_all();
        self.running.store(true, Ordering::Relaxed);
        info!(rules = installed, "scheduler started");
    }

    /// Cancel all ticks. In-flight ticks get a bounded grace period, then
    /// are abandoned. No new ticks start afterwards.
    pub async fn stop(&self) {
        self.cancel_all().await;
        self.running.store(false, Ordering::Relaxed);
        info!("scheduler stopped");
    }

    /// Cancel all ticks, reload rules from disk, and reinstall.
    ///
    /// Ticks in flight at cancellation either complete against the old
    /// rule snapshot or are abandoned at the grace boundary; they never
    /// observe the new rule set.
    pub async fn reload(&self) {
        self.cancel_all().await;
        self.inner.rule_loader.reload();
        let installed = self.install_all();
        info!(rules = installed, "rules reloaded and rescheduled");
    }

    /// Manually run one rule's check synchronously.
    ///
    /// Returns a `manual_trigger` event snapshot, or `None` for an
    /// unknown rule.
    pub async fn trigger_manual(&self, rule_name: &str) -> Option<AlertEvent> {
        let rule = self.inner.rule_loader.get(rule_name)?;
        self.inner.check_alert(&rule).await;

        let state = self.inner.state_manager.get_state(rule_name);
        let mut event = AlertEvent::new(rule_name, EventType::ManualTrigger, Utc::now());
        event.value = state.current_value;
        event.threshold = state.threshold;
        event.condition_met = state.state == AlertState::Firing;
        Some(event)
    }

    fn install_all(&self) -> usize {
        let (tx, _) = watch::channel(false);
        let rules = self.inner.rule_loader.get_enabled();
        let mut installed = 0;
        for rule in rules {
            if self.install(rule, tx.subscribe()) {
                installed += 1;
            }
        }
        *self.shutdown_tx.lock().expect("shutdown lock poisoned") = Some(tx);
        installed
    }

    /// Install the periodic task for one rule. Returns false (with an
    /// error log) when the interval doesn't parse.
    fn install(&self, rule: AlertRule, mut shutdown_rx: watch::Receiver<bool>) -> bool {
        let period = match parse_interval(&rule.schedule.interval) {
            Ok(period) => period,
            Err(e) => {
                error!(rule_name = %rule.name, error = %e, "rule not scheduled");
                return false;
            }
        };

        debug!(rule_name = %rule.name, interval = %rule.schedule.interval, "scheduled rule");
        let inner = Arc::clone(&self.inner);
        let name = rule.name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it so
            // the first evaluation happens one period after install.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let started = tokio::time::Instant::now();
                        inner.check_alert(&rule).await;
                        if started.elapsed() > period {
                            warn!(
                                rule_name = %rule.name,
                                interval = %rule.schedule.interval,
                                "tick overran its interval; next scheduled start will be skipped"
                            );
                        }
                    }
                }
            }
            debug!(rule_name = %rule.name, "tick loop stopped");
        });

        self.tasks
            .lock()
            .expect("tasks lock poisoned")
            .insert(name, handle);
        true
    }

    async fn cancel_all(&self) {
        let sender = self.shutdown_tx.lock().expect("shutdown lock poisoned").take();
        if let Some(tx) = sender {
            let _ = tx.send(true);
        }
        let handles: Vec<(String, JoinHandle<()>)> = self
            .tasks
            .lock()
            .expect("tasks lock poisoned")
            .drain()
            .collect();
        for (name, mut handle) in handles {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!(rule_name = %name, "tick did not finish within grace period; aborting");
                handle.abort();
            }
        }
    }
}

impl SchedulerInner {
    /// Main alert check for one rule:
    /// 1. execute query
    /// 2. evaluate condition
    /// 3. update state
    /// 4. send notifications if admitted
    /// 5. record history event
    async fn check_alert(&self, rule: &AlertRule) {
        let now = Utc::now();
        debug!(rule_name = %rule.name, "checking alert");

        let query_result = self.query_executor.execute(rule).await;
        if !query_result.success {
            let mut event = AlertEvent::new(&rule.name, EventType::Error, now);
            event.threshold = rule.condition.value;
            event.operator = rule.condition.operator.clone();
            event.error = query_result.error;
            self.history.record(&event).await;
            return;
        }

        let eval = ConditionEvaluator::evaluate(rule, &query_result);
        debug!("{}", eval.message);

        let transition = self
            .state_manager
            .update_state(rule, eval.condition_met, eval.actual_value)
            .await;

        let mut notification_sent = false;
        let mut notification_status = None;
        let mut notification_results = Vec::new();

        if transition.should_notify {
            let context = notification_context(rule, &eval, &transition, now);
            // Actions fan out concurrently; all results are collected
            // before the history event is written so the event stays
            // atomic per tick.
            let sends = rule.actions.iter().map(|action| {
                let context = &context;
                async move { (action.name.clone(), self.notifier.send(action, context).await) }
            });
            for (action, result) in futures::future::join_all(sends).await {
                notification_results.push(ActionResult {
                    action,
                    status: if result.success { "success" } else { "failed" }.to_string(),
                    success: result.success,
                });
            }

            let successes = notification_results.iter().filter(|r| r.success).count();
            let total = notification_results.len();
            if total > 0 {
                notification_sent = successes > 0;
                notification_status = Some(if successes == total {
                    NotificationStatus::Success
                } else if successes > 0 {
                    NotificationStatus::Partial
                } else {
                    NotificationStatus::Failed
                });
            }
        }

        if transition.changed || transition.should_notify {
            let event_type = if transition.new_state == AlertState::Firing {
                EventType::Fired
            } else {
                EventType::Resolved
            };
            let mut event = AlertEvent::new(&rule.name, event_type, now);
            event.value = Some(eval.actual_value);
            event.threshold = eval.threshold;
            event.operator = eval.operator.clone();
            event.condition_met = eval.condition_met;
            event.notification_sent = notification_sent;
            event.notification_status = notification_status;
            event.notification_results = notification_results;
            event.metadata = HashMap::from([
                ("severity".to_string(), json!(rule.metadata.severity)),
                ("category".to_string(), json!(rule.metadata.category)),
            ]);
            event.query_took_ms = Some(query_result.took_ms);
            self.history.record(&event).await;
        }
    }
}

/// The context object `{{alert.<key>}}` placeholders resolve against.
fn notification_context(
    rule: &AlertRule,
    eval: &EvaluationResult,
    transition: &StateTransition,
    now: chrono::DateTime<Utc>,
) -> Value {
    json!({
        "name": rule.name,
        "description": rule.description,
        "result_count": eval.actual_value,
        "threshold": eval.threshold,
        "timestamp": now.to_rfc3339(),
        "severity": rule.metadata.severity,
        "environment": rule.metadata.category,
        "service": rule.metadata.owner,
        "state": transition.new_state.as_str(),
        "operator": eval.operator,
    })
}
