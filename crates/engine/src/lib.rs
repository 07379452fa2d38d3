//! The alerting engine core.
//!
//! Ties together rule evaluation end to end: execute the rule's
//! OpenSearch query, compare the numeric result to the threshold, drive
//! the per-rule state machine (with throttling and persistence), fan out
//! webhook notifications, and append history events. The scheduler owns
//! one periodic task per enabled rule; every per-rule failure is
//! recovered locally and never affects sibling rules.

pub mod evaluator;
pub mod event;
pub mod executor;
pub mod history;
pub mod scheduler;
pub mod state;

pub use evaluator::{ConditionEvaluator, EvaluationResult};
pub use event::{ActionResult, AlertEvent, EventType, NotificationStatus};
pub use executor::{QueryExecutor, QueryResult};
pub use history::HistoryRecorder;
pub use scheduler::AlertScheduler;
pub use state::{AlertState, AlertStateRecord, StateManager, StateTransition};
