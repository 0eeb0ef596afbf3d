//! Sensor measurement readings

use crate::HomeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensor measurement as delivered by the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Home the sensor belongs to
    pub home: HomeId,
    /// Sensor name, unique within the home
    pub sensor: String,
    /// Measure name (e.g. "temperature", "humidity")
    pub measure: String,
    /// Observed value
    pub value: f64,
    /// Measurement timestamp
    pub timestamp: DateTime<Utc>,
}
