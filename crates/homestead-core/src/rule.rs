//! Automation rule documents
//!
//! These are the durably-stored rule definitions managed by the external
//! API. The engine reads them and writes back `last_executed_at`; it never
//! creates or deletes them.

use crate::value::{Operator, Value, ValueType};
use crate::HomeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored automation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    /// Document id
    pub id: String,
    /// Home (tenant) scope
    pub home: HomeId,
    /// Disabled rules are never loaded into the engine
    pub enabled: bool,
    /// What fires this rule; the variant also fixes the rule type
    #[serde(flatten)]
    pub trigger: RuleTrigger,
    /// Ordered actions executed on trigger
    pub actions: Vec<RuleAction>,
    /// Last time the engine executed this rule
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Trigger variants for automation rules
///
/// A rule is either condition-based (fired by sensor events) or time-based
/// (fired by the schedule poller); the tagged representation makes the
/// "condition present iff condition-based" invariant unrepresentable to
/// violate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleTrigger {
    ConditionBased { condition: ConditionSpec },
    TimeBased { schedule: ScheduleSpec },
}

/// The single condition of a condition-based rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Sensor whose events are inspected
    pub sensor: String,
    /// Field of the event snapshot to compare
    pub field: String,
    /// Declared kind of the observed value
    pub value_type: ValueType,
    pub operator: Operator,
    /// Value the observation is compared against
    pub expected: Value,
}

/// Cron-like schedule of a time-based rule
///
/// Each field is optional; an absent field is a wildcard. `second` and
/// `month` are carried for completeness but do not participate in schedule
/// keying.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u32>,
}

impl ScheduleSpec {
    /// Render as a 5-field expression string ("minute hour dom month dow"),
    /// absent fields as `*`.
    #[must_use]
    pub fn to_expression(&self) -> String {
        let field = |f: Option<u32>| f.map_or_else(|| "*".to_string(), |v| v.to_string());
        format!(
            "{} {} {} {} {}",
            field(self.minute),
            field(self.hour),
            field(self.day_of_month),
            field(self.month),
            field(self.day_of_week),
        )
    }
}

/// One action of an automation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAction {
    /// Target device name
    pub device: String,
    /// Command name (e.g. "set_speed")
    pub command: String,
    /// Optional command parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl AutomationRule {
    /// Create an enabled condition-based rule with a fresh id
    #[must_use]
    pub fn condition_based(
        home: HomeId,
        condition: ConditionSpec,
        actions: Vec<RuleAction>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            home,
            enabled: true,
            trigger: RuleTrigger::ConditionBased { condition },
            actions,
            last_executed_at: None,
        }
    }

    /// Create an enabled time-based rule with a fresh id
    #[must_use]
    pub fn time_based(home: HomeId, schedule: ScheduleSpec, actions: Vec<RuleAction>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            home,
            enabled: true,
            trigger: RuleTrigger::TimeBased { schedule },
            actions,
            last_executed_at: None,
        }
    }

    /// Sensor this rule listens to, if condition-based
    #[must_use]
    pub fn condition_sensor(&self) -> Option<&str> {
        match &self.trigger {
            RuleTrigger::ConditionBased { condition } => Some(condition.sensor.as_str()),
            RuleTrigger::TimeBased { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_type_tag_round_trips() {
        let json = serde_json::json!({
            "id": "r1",
            "home": "h1",
            "enabled": true,
            "rule_type": "condition_based",
            "condition": {
                "sensor": "living-room",
                "field": "temperature",
                "value_type": "number",
                "operator": "gt",
                "expected": 25.0
            },
            "actions": [{"device": "fan", "command": "turn_on"}]
        });
        let rule: AutomationRule = serde_json::from_value(json).unwrap();
        assert!(matches!(rule.trigger, RuleTrigger::ConditionBased { .. }));
        assert_eq!(rule.condition_sensor(), Some("living-room"));
        assert!(rule.last_executed_at.is_none());

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["rule_type"], "condition_based");
    }

    #[test]
    fn schedule_spec_renders_wildcards() {
        let spec = ScheduleSpec {
            minute: Some(0),
            hour: Some(8),
            day_of_week: Some(1),
            ..Default::default()
        };
        assert_eq!(spec.to_expression(), "0 8 * * 1");
        assert_eq!(ScheduleSpec::default().to_expression(), "* * * * *");
    }
}
