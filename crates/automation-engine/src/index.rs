//! In-process condition rule index

use crate::model::ConditionRule;
use dashmap::DashMap;

/// sensor → condition rules, rebuilt wholesale from the durable store
///
/// The index is ephemeral: it is fully repopulated at startup and after
/// rule-set mutations, never patched incrementally.
#[derive(Default)]
pub struct ConditionRuleIndex {
    rules: DashMap<String, Vec<ConditionRule>>,
}

impl ConditionRuleIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire index contents
    pub fn rebuild(&self, rules: Vec<ConditionRule>) {
        self.rules.clear();
        for rule in rules {
            self.rules
                .entry(rule.spec.sensor.clone())
                .or_default()
                .push(rule);
        }
    }

    /// Rules listening to a sensor, in registration order
    #[must_use]
    pub fn rules_for(&self, sensor: &str) -> Vec<ConditionRule> {
        self.rules
            .get(sensor)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Total number of indexed rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.iter().map(|e| e.value().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
