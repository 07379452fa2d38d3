//! Compares query results against threshold conditions.

use vigil_rules::schema::AlertRule;

use crate::executor::QueryResult;

/// Result of evaluating a condition.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub condition_met: bool,
    pub actual_value: f64,
    pub threshold: f64,
    pub operator: String,
    pub message: String,
}

/// Evaluates threshold conditions against query results.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Apply the rule's operator to `(actual, threshold)`.
    ///
    /// An unrecognized operator yields `condition_met = false` with a
    /// diagnostic message; it never panics or errors.
    pub fn evaluate(rule: &AlertRule, query_result: &QueryResult) -> EvaluationResult {
        let actual = query_result.value;
        let threshold = rule.condition.value;
        let operator = rule.condition.operator.clone();

        let condition_met = match operator.as_str() {
            "gt" => actual > threshold,
            "gte" => actual >= threshold,
            "lt" => actual < threshold,
            "lte" => actual <= threshold,
            "eq" => actual == threshold,
            other => {
                return EvaluationResult {
                    condition_met: false,
                    actual_value: actual,
                    threshold,
                    operator: operator.clone(),
                    message: format!("unknown operator: {other}"),
                };
            }
        };

        EvaluationResult {
            condition_met,
            actual_value: actual,
            threshold,
            operator: operator.clone(),
            message: format!(
                "alert '{}': {} {} {} = {}",
                rule.name, actual, operator, threshold, condition_met
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule_with(operator: &str, value: f64) -> AlertRule {
        serde_json::from_value(json!({
            "name": "eval-test",
            "description": "evaluator test rule",
            "schedule": {"interval": "1m"},
            "query": {
                "index": ["logs-*"],
                "time_range": {"from": "now-5m", "to": "now"},
                "filter": {"match_all": {}}
            },
            "condition": {"type": "threshold", "operator": operator, "value": value},
            "actions": [{
                "type": "webhook",
                "name": "hook",
                "webhook": {"url": "https://example.com", "body": {}}
            }],
            "throttle": {"value": 5, "unit": "minutes"},
            "metadata": {"severity": "low", "category": "test", "owner": "qa"}
        }))
        .unwrap()
    }

    fn result(value: f64) -> QueryResult {
        QueryResult {
            value,
            took_ms: 1,
            success: true,
            error: None,
        }
    }

    #[test]
    fn all_operators_compare_correctly() {
        let cases = [
            ("gt", 150.0, 100.0, true),
            ("gt", 100.0, 100.0, false),
            ("gte", 100.0, 100.0, true),
            ("gte", 99.0, 100.0, false),
            ("lt", 50.0, 100.0, true),
            ("lt", 100.0, 100.0, false),
            ("lte", 100.0, 100.0, true),
            ("lte", 101.0, 100.0, false),
            ("eq", 100.0, 100.0, true),
            ("eq", 100.5, 100.0, false),
        ];
        for (operator, actual, threshold, expected) in cases {
            let eval = ConditionEvaluator::evaluate(&rule_with(operator, threshold), &result(actual));
            assert_eq!(
                eval.condition_met, expected,
                "{actual} {operator} {threshold}"
            );
            assert_eq!(eval.actual_value, actual);
            assert_eq!(eval.threshold, threshold);
        }
    }

    #[test]
    fn unknown_operator_does_not_panic() {
        let eval = ConditionEvaluator::evaluate(&rule_with("between", 100.0), &result(150.0));
        assert!(!eval.condition_met);
        assert!(eval.message.contains("unknown operator"));
        assert_eq!(eval.operator, "between");
    }

    #[test]
    fn message_carries_comparison_details() {
        let eval = ConditionEvaluator::evaluate(&rule_with("gt", 100.0), &result(150.0));
        assert!(eval.message.contains("eval-test"));
        assert!(eval.message.contains("150"));
        assert!(eval.message.contains("true"));
    }
}
