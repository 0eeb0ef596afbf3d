//! Homestead domain model
//!
//! This crate provides the shared domain types of the Homestead platform
//! (homes, values, devices, rules, readings) and the durable-store
//! abstraction the automation engine reads rules from.

pub mod device;
pub mod error;
pub mod reading;
pub mod rule;
pub mod store;
pub mod value;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use device::{AutoBehaviorRule, DeviceRecord, DeviceScheduleRule, DeviceStatus};
pub use error::StoreError;
pub use reading::SensorReading;
pub use rule::{AutomationRule, ConditionSpec, RuleAction, RuleTrigger, ScheduleSpec};
pub use store::{FileStore, MemoryStore, RuleStore};
pub use value::{ActionStep, Operator, Value, ValueRange, ValueType};

/// Tenant (household) identifier
///
/// Every device, sensor, and rule is scoped to exactly one home; cache keys
/// and dispatch payloads carry it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(String);

impl HomeId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HomeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HomeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
