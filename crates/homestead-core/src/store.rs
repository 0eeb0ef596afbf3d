//! Rule/device store abstraction
//!
//! The durable store owns rule definitions; the engine reads them at
//! startup (and on demand) and writes back execution bookkeeping and
//! mutated embedded-rule arrays. `MemoryStore` backs tests and embedded
//! setups, `FileStore` persists to a JSON file.

use crate::device::DeviceRecord;
use crate::error::StoreError;
use crate::rule::AutomationRule;
use crate::HomeId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// Access to durably-stored automation rules and devices
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All enabled automation rule documents
    async fn load_enabled_rules(&self) -> Result<Vec<AutomationRule>, StoreError>;

    /// All devices carrying at least one embedded automation rule
    async fn load_automated_devices(&self) -> Result<Vec<DeviceRecord>, StoreError>;

    /// Fetch one device record
    async fn get_device(
        &self,
        home: &HomeId,
        name: &str,
    ) -> Result<Option<DeviceRecord>, StoreError>;

    /// Write back a device record (embedded rule arrays included)
    async fn put_device(&self, device: DeviceRecord) -> Result<(), StoreError>;

    /// Record that a rule document was executed
    async fn record_execution(&self, rule_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    rules: DashMap<String, AutomationRule>,
    devices: DashMap<(String, String), DeviceRecord>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a rule document
    pub fn insert_rule(&self, rule: AutomationRule) {
        self.rules.insert(rule.id.clone(), rule);
    }

    /// Seed a device record
    pub fn insert_device(&self, device: DeviceRecord) {
        self.devices
            .insert((device.home.to_string(), device.name.clone()), device);
    }

    /// Last recorded execution time for a rule
    #[must_use]
    pub fn last_executed(&self, rule_id: &str) -> Option<DateTime<Utc>> {
        self.rules.get(rule_id).and_then(|r| r.last_executed_at)
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn load_enabled_rules(&self) -> Result<Vec<AutomationRule>, StoreError> {
        Ok(self
            .rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn load_automated_devices(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        Ok(self
            .devices
            .iter()
            .filter(|d| d.has_automations())
            .map(|d| d.value().clone())
            .collect())
    }

    async fn get_device(
        &self,
        home: &HomeId,
        name: &str,
    ) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self
            .devices
            .get(&(home.to_string(), name.to_string()))
            .map(|d| d.value().clone()))
    }

    async fn put_device(&self, device: DeviceRecord) -> Result<(), StoreError> {
        self.devices
            .insert((device.home.to_string(), device.name.clone()), device);
        Ok(())
    }

    async fn record_execution(&self, rule_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut rule = self
            .rules
            .get_mut(rule_id)
            .ok_or_else(|| StoreError::RuleNotFound(rule_id.to_string()))?;
        rule.last_executed_at = Some(at);
        Ok(())
    }
}

/// Serialized shape of the file-backed store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    rules: Vec<AutomationRule>,
    #[serde(default)]
    devices: Vec<DeviceRecord>,
}

/// JSON-file-backed store
pub struct FileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl FileStore {
    /// Open a store file; a missing or unreadable file starts empty
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load_data(&path).await;
        Self {
            path,
            data: RwLock::new(data),
        }
    }

    /// Persist the current contents atomically
    async fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(data)?;

        // Write atomically: write to temp file, then rename
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json).await?;
        fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(
            "Saved {} rules and {} devices to {:?}",
            data.rules.len(),
            data.devices.len(),
            self.path
        );
        Ok(())
    }
}

/// Load store contents from disk, tolerating absence and corruption
async fn load_data(path: &Path) -> StoreData {
    match fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str::<StoreData>(&contents) {
            Ok(data) => {
                tracing::info!(
                    "Loaded {} rules and {} devices from {:?}",
                    data.rules.len(),
                    data.devices.len(),
                    path
                );
                data
            }
            Err(e) => {
                tracing::warn!("Failed to parse store file {:?}: {}", path, e);
                StoreData::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No store file found at {:?}, starting fresh", path);
            StoreData::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read store file {:?}: {}", path, e);
            StoreData::default()
        }
    }
}

#[async_trait]
impl RuleStore for FileStore {
    async fn load_enabled_rules(&self) -> Result<Vec<AutomationRule>, StoreError> {
        let data = self.data.read().await;
        Ok(data.rules.iter().filter(|r| r.enabled).cloned().collect())
    }

    async fn load_automated_devices(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .devices
            .iter()
            .filter(|d| d.has_automations())
            .cloned()
            .collect())
    }

    async fn get_device(
        &self,
        home: &HomeId,
        name: &str,
    ) -> Result<Option<DeviceRecord>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .devices
            .iter()
            .find(|d| d.home == *home && d.name == name)
            .cloned())
    }

    async fn put_device(&self, device: DeviceRecord) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        match data
            .devices
            .iter_mut()
            .find(|d| d.home == device.home && d.name == device.name)
        {
            Some(existing) => *existing = device,
            None => data.devices.push(device),
        }
        self.save(&data).await
    }

    async fn record_execution(&self, rule_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let rule = data
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| StoreError::RuleNotFound(rule_id.to_string()))?;
        rule.last_executed_at = Some(at);
        self.save(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::AutoBehaviorRule;
    use crate::value::{ActionStep, ValueRange};

    fn behavior_device(home: &str, name: &str) -> DeviceRecord {
        let mut device = DeviceRecord::new(HomeId::from(home), name);
        device.auto_behavior.push(AutoBehaviorRule {
            measure: "temperature".to_string(),
            range: ValueRange::at_least(28.0),
            action: vec![ActionStep::new("speed", "4")],
        });
        device
    }

    #[tokio::test]
    async fn memory_store_filters_devices_without_rules() {
        let store = MemoryStore::new();
        store.insert_device(behavior_device("h1", "fan"));
        store.insert_device(DeviceRecord::new(HomeId::from("h1"), "plain-bulb"));

        let automated = store.load_automated_devices().await.unwrap();
        assert_eq!(automated.len(), 1);
        assert_eq!(automated[0].name, "fan");
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await;
        store.put_device(behavior_device("h1", "fan")).await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await;
        let device = reopened
            .get_device(&HomeId::from("h1"), "fan")
            .await
            .unwrap()
            .expect("device persisted");
        assert_eq!(device.auto_behavior.len(), 1);
    }

    #[tokio::test]
    async fn file_store_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nope.json")).await;
        assert!(store.load_enabled_rules().await.unwrap().is_empty());
    }
}
