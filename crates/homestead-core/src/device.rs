//! Device records and their embedded automation rules

use crate::value::{ActionStep, ValueRange};
use crate::HomeId;
use serde::{Deserialize, Serialize};

/// Device lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Inactive,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A condition→action rule embedded on a device record
///
/// Fires when a reading for `measure` lands inside `range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBehaviorRule {
    /// Sensor measure this rule watches (e.g. "temperature")
    pub measure: String,
    /// Inclusive value range that triggers the rule
    pub range: ValueRange,
    /// Ordered command steps sent to the device on trigger
    pub action: Vec<ActionStep>,
}

/// A time-based rule embedded on a device record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceScheduleRule {
    /// 5-field expression "minute hour day-of-month month day-of-week";
    /// each field is `*` or a single integer
    pub cron: String,
    /// Ordered command steps sent to the device on trigger
    pub action: Vec<ActionStep>,
}

/// A device as stored by the platform
///
/// Device CRUD is owned by the external API; the engine reads these records
/// and writes back mutated rule arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Home this device belongs to
    pub home: HomeId,
    /// Device name, unique within the home
    pub name: String,
    #[serde(default)]
    pub status: DeviceStatus,
    /// Embedded auto-behavior rules
    #[serde(default)]
    pub auto_behavior: Vec<AutoBehaviorRule>,
    /// Embedded schedule rules
    #[serde(default)]
    pub schedule: Vec<DeviceScheduleRule>,
}

impl DeviceRecord {
    /// Create a bare active device
    #[must_use]
    pub fn new(home: HomeId, name: impl Into<String>) -> Self {
        Self {
            home,
            name: name.into(),
            status: DeviceStatus::Active,
            auto_behavior: Vec::new(),
            schedule: Vec::new(),
        }
    }

    /// Whether this device carries any embedded automation rules
    #[must_use]
    pub fn has_automations(&self) -> bool {
        !self.auto_behavior.is_empty() || !self.schedule.is_empty()
    }
}
