//! Internal rule representations and cache entry shapes
//!
//! The platform stores rules in two independently-evolved shapes:
//! AutomationRule documents and device-embedded auto-behavior/schedule
//! arrays. Internally both collapse into one tagged variant per trigger
//! kind, so evaluation and dispatch are written once. Cache entries are
//! encoded canonically (actions sorted by name) so semantically identical
//! rules collide regardless of field order.

use crate::cron::CronExpr;
use crate::error::EngineError;
use homestead_core::{
    ActionStep, AutomationRule, ConditionSpec, DeviceRecord, DeviceScheduleRule, HomeId,
    RuleAction, RuleTrigger, Value, ValueRange,
};
use serde::{Deserialize, Serialize};

/// One command message: a target device and its ordered steps
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCommand {
    pub device: String,
    pub steps: Vec<ActionStep>,
}

/// Group a document's action list into per-device commands, preserving
/// action order within each device.
#[must_use]
pub fn group_actions(actions: &[RuleAction]) -> Vec<DeviceCommand> {
    let mut commands: Vec<DeviceCommand> = Vec::new();
    for action in actions {
        let step = ActionStep {
            name: action.command.clone(),
            value: action
                .parameters
                .clone()
                .unwrap_or(Value::Structured(serde_json::Value::Null)),
        };
        match commands.iter_mut().find(|c| c.device == action.device) {
            Some(command) => command.steps.push(step),
            None => commands.push(DeviceCommand {
                device: action.device.clone(),
                steps: vec![step],
            }),
        }
    }
    commands
}

/// A condition rule in evaluable form
#[derive(Debug, Clone)]
pub struct ConditionRule {
    pub rule_id: String,
    pub home: HomeId,
    pub spec: ConditionSpec,
    pub commands: Vec<DeviceCommand>,
}

/// A schedule rule in evaluable form, flattened to one target device
#[derive(Debug, Clone)]
pub struct ScheduleRule {
    /// Backing document id, when the rule came from an AutomationRule
    pub rule_id: Option<String>,
    pub home: HomeId,
    pub device: String,
    pub cron: CronExpr,
    pub steps: Vec<ActionStep>,
}

/// Unified internal rule variant
#[derive(Debug, Clone)]
pub enum EngineRule {
    Condition(ConditionRule),
    Schedule(ScheduleRule),
}

impl EngineRule {
    /// Adapt an AutomationRule document
    ///
    /// Time-based documents yield one schedule rule per target device;
    /// condition-based documents yield a single condition rule.
    pub fn from_document(rule: &AutomationRule) -> Result<Vec<Self>, EngineError> {
        match &rule.trigger {
            RuleTrigger::ConditionBased { condition } => Ok(vec![Self::Condition(ConditionRule {
                rule_id: rule.id.clone(),
                home: rule.home.clone(),
                spec: condition.clone(),
                commands: group_actions(&rule.actions),
            })]),
            RuleTrigger::TimeBased { schedule } => {
                let cron = CronExpr::parse(&schedule.to_expression())?;
                Ok(group_actions(&rule.actions)
                    .into_iter()
                    .map(|command| {
                        Self::Schedule(ScheduleRule {
                            rule_id: Some(rule.id.clone()),
                            home: rule.home.clone(),
                            device: command.device,
                            cron,
                            steps: command.steps,
                        })
                    })
                    .collect())
            }
        }
    }

    /// Adapt the schedule array embedded on a device record
    pub fn from_device(device: &DeviceRecord) -> Result<Vec<Self>, EngineError> {
        device
            .schedule
            .iter()
            .map(|rule| {
                Ok(Self::Schedule(ScheduleRule {
                    rule_id: None,
                    home: device.home.clone(),
                    device: device.name.clone(),
                    cron: CronExpr::parse(&rule.cron)?,
                    steps: rule.action.clone(),
                }))
            })
            .collect()
    }
}

/// Actions sorted by name (then serialized value, for a total order)
fn sorted_steps(steps: &[ActionStep]) -> Vec<ActionStep> {
    let mut sorted = steps.to_vec();
    sorted.sort_by(|a, b| {
        let a_value = serde_json::to_string(&a.value).unwrap_or_default();
        let b_value = serde_json::to_string(&b.value).unwrap_or_default();
        (&a.name, a_value).cmp(&(&b.name, b_value))
    });
    sorted
}

/// One entry of a `rules:{home}:{measure}` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRuleEntry {
    pub device_name: String,
    pub range: ValueRange,
    pub action: Vec<ActionStep>,
}

impl CachedRuleEntry {
    /// Build the canonical entry for one embedded behavior rule
    #[must_use]
    pub fn new(device_name: &str, range: ValueRange, action: &[ActionStep]) -> Self {
        Self {
            device_name: device_name.to_string(),
            range,
            action: sorted_steps(action),
        }
    }

    /// Canonical JSON encoding (stable field and action order)
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One entry of a `schedule:{m}:{h}:{dow}:{dom}` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScheduleEntry {
    pub home: HomeId,
    pub device_name: String,
    pub cron: String,
    pub action: Vec<ActionStep>,
    /// Backing document id, when projected from an AutomationRule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl CachedScheduleEntry {
    /// Build the canonical entry for one schedule rule
    #[must_use]
    pub fn new(rule: &ScheduleRule) -> Self {
        Self {
            home: rule.home.clone(),
            device_name: rule.device.clone(),
            cron: rule.cron.to_string(),
            action: sorted_steps(&rule.steps),
            rule_id: rule.rule_id.clone(),
        }
    }

    /// Canonical JSON encoding (stable field and action order)
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Canonical fingerprint of an embedded behavior rule, used for duplicate
/// detection on the device's source record. Unlike the cache entry it
/// includes the measure, which the cache carries in the key instead.
pub fn behavior_fingerprint(
    device_name: &str,
    measure: &str,
    range: ValueRange,
    action: &[ActionStep],
) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Fingerprint<'a> {
        name: &'a str,
        measure: &'a str,
        range: ValueRange,
        action: Vec<ActionStep>,
    }
    serde_json::to_string(&Fingerprint {
        name: device_name,
        measure,
        range,
        action: sorted_steps(action),
    })
}

/// Canonical fingerprint of an embedded schedule rule
pub fn schedule_fingerprint(
    device_name: &str,
    rule: &DeviceScheduleRule,
) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Fingerprint<'a> {
        name: &'a str,
        cron: &'a str,
        action: Vec<ActionStep>,
    }
    serde_json::to_string(&Fingerprint {
        name: device_name,
        cron: &rule.cron,
        action: sorted_steps(&rule.action),
    })
}
