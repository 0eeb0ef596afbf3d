//! Core automation engine

use crate::cache::BehaviorRuleCache;
use crate::config::EngineConfig;
use crate::cron::CronExpr;
use crate::dispatch::CommandDispatcher;
use crate::error::EngineError;
use crate::evaluator::evaluate_condition;
use crate::index::ConditionRuleIndex;
use crate::keys::{minute_bucket, rules_key};
use crate::model::{
    behavior_fingerprint, schedule_fingerprint, CachedScheduleEntry, EngineRule, ScheduleRule,
};
use crate::scheduler::{ExecutionGuard, TickTime};
use bytes::Bytes;
use chrono::Utc;
use homestead_cache::CacheStore;
use homestead_core::{
    ActionStep, AutoBehaviorRule, DeviceRecord, DeviceScheduleRule, DeviceStatus, HomeId,
    RuleStore, SensorReading, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted by the automation engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A rule matched and its commands were handed to the dispatcher
    RuleTriggered { home: String, source: String },
    /// One command message was handed to the transport
    CommandDispatched { home: String, device: String },
    /// A behavior rule matched but is still cooling down
    CooldownSuppressed {
        home: String,
        device: String,
        measure: String,
    },
    /// A schedule candidate lost the per-minute dedupe race
    DuplicateSuppressed { device: String, bucket: i64 },
    /// Index and cache projections were rebuilt
    IndexRebuilt {
        condition_rules: usize,
        schedule_rules: usize,
    },
}

/// The automation engine
///
/// Wires sensor events and schedule ticks through rule lookup, evaluation,
/// gating, dispatch, and bookkeeping. All mutable state is either in the
/// cache store or in the in-process condition index; the engine itself is
/// shared behind an `Arc`.
pub struct AutomationEngine {
    store: Arc<dyn RuleStore>,
    cache: Arc<dyn CacheStore>,
    dispatcher: Arc<dyn CommandDispatcher>,
    config: EngineConfig,
    index: ConditionRuleIndex,
    behaviors: BehaviorRuleCache,
    guard: ExecutionGuard,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl AutomationEngine {
    /// Create a new engine over its three collaborators
    pub fn new(
        store: Arc<dyn RuleStore>,
        cache: Arc<dyn CacheStore>,
        dispatcher: Arc<dyn CommandDispatcher>,
        config: EngineConfig,
    ) -> Self {
        let config = config.normalized();
        let (event_tx, _) = broadcast::channel(64);
        let behaviors = BehaviorRuleCache::new(Arc::clone(&cache), config.cooldown);
        let guard = ExecutionGuard::new(Arc::clone(&cache), config.execution_window);

        Self {
            store,
            cache,
            dispatcher,
            config,
            index: ConditionRuleIndex::new(),
            behaviors,
            guard,
            event_tx,
        }
    }

    /// Subscribe to engine events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Rebuild the condition index and cache projections from the store
    ///
    /// Individual projection failures are logged and skipped; the result is
    /// accepted as partial. Only a store read failure is returned, and even
    /// that leaves the engine serviceable with stale or empty indexes until
    /// the next rebuild.
    pub async fn init(&self) -> Result<(), EngineError> {
        let rules = self.store.load_enabled_rules().await?;
        let devices = self.store.load_automated_devices().await?;

        let mut conditions = Vec::new();
        let mut schedules = Vec::new();
        for rule in &rules {
            match EngineRule::from_document(rule) {
                Ok(variants) => {
                    for variant in variants {
                        match variant {
                            EngineRule::Condition(c) => conditions.push(c),
                            EngineRule::Schedule(s) => schedules.push(s),
                        }
                    }
                }
                Err(e) => tracing::warn!("Skipping unusable rule {}: {}", rule.id, e),
            }
        }
        for device in &devices {
            match EngineRule::from_device(device) {
                Ok(variants) => {
                    for variant in variants {
                        if let EngineRule::Schedule(s) = variant {
                            schedules.push(s);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping schedules of device {}: {}", device.name, e);
                }
            }
        }

        let condition_rules = conditions.len();
        self.index.rebuild(conditions);

        // The cache is a derived projection: clear each key once, then
        // re-append current entries. Keys whose rules disappeared while
        // the engine was down are left to expire with their usefulness.
        let mut cleared: HashSet<String> = HashSet::new();
        let mut behavior_rules = 0usize;
        for device in &devices {
            for rule in &device.auto_behavior {
                let key = rules_key(&device.home, &rule.measure);
                if !self.clear_once(&mut cleared, &key).await {
                    continue;
                }
                match self.behaviors.add(&device.home, &device.name, rule).await {
                    Ok(()) => behavior_rules += 1,
                    Err(e) => tracing::warn!(
                        "Failed to project behavior rule of {}: {}",
                        device.name,
                        e
                    ),
                }
            }
        }

        let mut schedule_rules = 0usize;
        for schedule in &schedules {
            if self.project_schedule(&mut cleared, schedule).await {
                schedule_rules += 1;
            }
        }

        tracing::info!(
            "Engine initialized: {} condition rules, {} behavior rules, {} schedule rules",
            condition_rules,
            behavior_rules,
            schedule_rules
        );
        let _ = self.event_tx.send(EngineEvent::IndexRebuilt {
            condition_rules,
            schedule_rules,
        });
        Ok(())
    }

    /// Delete a projection key the first time it is touched in a rebuild
    async fn clear_once(&self, cleared: &mut HashSet<String>, key: &str) -> bool {
        if !cleared.insert(key.to_string()) {
            return true;
        }
        match self.cache.delete(key).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to clear projection key {}: {}", key, e);
                false
            }
        }
    }

    async fn project_schedule(
        &self,
        cleared: &mut HashSet<String>,
        schedule: &ScheduleRule,
    ) -> bool {
        let entry = CachedScheduleEntry::new(schedule);
        let json = match entry.canonical_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode schedule entry for {}: {}", schedule.device, e);
                return false;
            }
        };
        for key in schedule.cron.expand() {
            if !self.clear_once(cleared, &key).await {
                return false;
            }
            if let Err(e) = self.cache.list_push(&key, Bytes::from(json.clone())).await {
                tracing::warn!("Failed to project schedule entry at {}: {}", key, e);
                return false;
            }
        }
        true
    }

    /// Start the free-running schedule tick loop
    pub fn start(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let poll_interval = self.config.poll_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                engine.on_schedule_tick().await;
            }
        });

        tracing::info!("Schedule poller started (interval {:?})", poll_interval);
    }

    /// Feed one ingested measurement through both evaluation paths
    ///
    /// The device auto-behavior projection is matched on (home, measure,
    /// value); the condition-document path sees the reading as a
    /// single-field snapshot keyed by sensor.
    pub async fn handle_reading(&self, reading: &SensorReading) {
        self.evaluate_behavior(&reading.home, &reading.measure, reading.value)
            .await;

        let fields = HashMap::from([(reading.measure.clone(), Value::Number(reading.value))]);
        self.on_sensor_event(&reading.sensor, &fields).await;
    }

    /// Condition-document path: evaluate all rules listening to a sensor
    ///
    /// Matching rules execute unconditionally; there is no cooldown at this
    /// layer. Rules whose condition field is absent from the snapshot are
    /// skipped silently.
    pub async fn on_sensor_event(&self, sensor: &str, fields: &HashMap<String, Value>) {
        for rule in self.index.rules_for(sensor) {
            match evaluate_condition(&rule.spec, fields) {
                Some(true) => {
                    tracing::info!("Condition rule {} triggered by {}", rule.rule_id, sensor);
                    let _ = self.event_tx.send(EngineEvent::RuleTriggered {
                        home: rule.home.to_string(),
                        source: rule.rule_id.clone(),
                    });
                    for command in &rule.commands {
                        self.dispatch_one(&rule.home, &command.device, &command.steps)
                            .await;
                    }
                    if let Err(e) = self.store.record_execution(&rule.rule_id, Utc::now()).await {
                        tracing::warn!(
                            "Failed to record execution of rule {}: {}",
                            rule.rule_id,
                            e
                        );
                    }
                }
                Some(false) | None => {}
            }
        }
    }

    /// Auto-behavior path: match a measurement against projected rules
    pub async fn evaluate_behavior(&self, home: &HomeId, measure: &str, value: f64) {
        self.evaluate_behavior_at(home, measure, value, Utc::now().timestamp_millis())
            .await;
    }

    /// Auto-behavior path with an explicit evaluation instant
    pub async fn evaluate_behavior_at(
        &self,
        home: &HomeId,
        measure: &str,
        value: f64,
        now_ms: i64,
    ) {
        let matches = match self.behaviors.evaluate(home, measure, value, now_ms).await {
            Ok(matches) => matches,
            Err(e) => {
                // Unreachable cache means nothing fires this cycle; the
                // next reading is the retry.
                tracing::warn!("Behavior evaluation for {}:{} skipped: {}", home, measure, e);
                return;
            }
        };

        for matched in matches {
            if matched.fired {
                let _ = self.event_tx.send(EngineEvent::RuleTriggered {
                    home: home.to_string(),
                    source: format!("behavior:{measure}[{}]", matched.index),
                });
                self.dispatch_one(home, &matched.device, &matched.steps).await;
            } else {
                tracing::debug!(
                    "Behavior rule {}[{}] for {} still cooling down",
                    measure,
                    matched.index,
                    matched.device
                );
                let _ = self.event_tx.send(EngineEvent::CooldownSuppressed {
                    home: home.to_string(),
                    device: matched.device,
                    measure: measure.to_string(),
                });
            }
        }
    }

    /// Time path: probe the schedule keys for the current instant
    pub async fn on_schedule_tick(&self) {
        self.tick_at(TickTime::now()).await;
    }

    /// Time path with an explicit poll instant
    pub async fn tick_at(&self, tick: TickTime) {
        for key in tick.probe_keys() {
            let entries = match self.cache.list_range(&key).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Schedule probe {} failed: {}", key, e);
                    continue;
                }
            };

            for raw in &entries {
                let entry: CachedScheduleEntry = match serde_json::from_slice(raw) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping malformed schedule entry at {}: {}", key, e);
                        continue;
                    }
                };
                self.run_schedule_candidate(&entry, tick.epoch_ms).await;
            }
        }
    }

    async fn run_schedule_candidate(&self, entry: &CachedScheduleEntry, epoch_ms: i64) {
        match self.guard.try_acquire(&entry.device_name, epoch_ms).await {
            Ok(true) => {
                tracing::info!(
                    "Schedule '{}' fired for device {}",
                    entry.cron,
                    entry.device_name
                );
                let _ = self.event_tx.send(EngineEvent::RuleTriggered {
                    home: entry.home.to_string(),
                    source: format!("schedule:{}", entry.cron),
                });
                self.dispatch_one(&entry.home, &entry.device_name, &entry.action)
                    .await;
                if let Some(rule_id) = &entry.rule_id {
                    if let Err(e) = self.store.record_execution(rule_id, Utc::now()).await {
                        tracing::warn!("Failed to record execution of rule {}: {}", rule_id, e);
                    }
                }
            }
            Ok(false) => {
                tracing::debug!(
                    "Device {} already served in bucket {}",
                    entry.device_name,
                    minute_bucket(epoch_ms)
                );
                let _ = self.event_tx.send(EngineEvent::DuplicateSuppressed {
                    device: entry.device_name.clone(),
                    bucket: minute_bucket(epoch_ms),
                });
            }
            Err(e) => {
                tracing::warn!(
                    "Execution guard unavailable for {}: {}",
                    entry.device_name,
                    e
                );
            }
        }
    }

    async fn dispatch_one(&self, home: &HomeId, device: &str, steps: &[ActionStep]) {
        match self.dispatcher.dispatch(home, device, steps).await {
            Ok(()) => {
                let _ = self.event_tx.send(EngineEvent::CommandDispatched {
                    home: home.to_string(),
                    device: device.to_string(),
                });
            }
            Err(e) => {
                // An attempt was made; transport-level retry is not ours.
                tracing::warn!("Dispatch to {} failed: {}", device, e);
            }
        }
    }

    /// Add an auto-behavior rule to a device
    pub async fn add_behavior_rule(
        &self,
        home: &HomeId,
        device_name: &str,
        rule: AutoBehaviorRule,
    ) -> Result<(), EngineError> {
        if rule.measure.trim().is_empty() {
            return Err(EngineError::Validation("measure must not be empty".into()));
        }
        if !rule.range.is_valid() {
            return Err(EngineError::Validation(
                "range must carry at least one bound and must not be inverted".into(),
            ));
        }
        validate_steps(&rule.action)?;

        let mut device = self.active_device(home, device_name).await?;

        let fingerprint =
            behavior_fingerprint(device_name, &rule.measure, rule.range, &rule.action)?;
        for existing in &device.auto_behavior {
            let existing_fp = behavior_fingerprint(
                device_name,
                &existing.measure,
                existing.range,
                &existing.action,
            )?;
            if existing_fp == fingerprint {
                return Err(EngineError::Validation(
                    "an identical behavior rule already exists on this device".into(),
                ));
            }
        }

        device.auto_behavior.push(rule.clone());
        self.store.put_device(device).await?;
        self.behaviors.add(home, device_name, &rule).await?;

        tracing::info!(
            "Added behavior rule on {} ({}:{})",
            device_name,
            home,
            rule.measure
        );
        Ok(())
    }

    /// Remove an auto-behavior rule from a device
    pub async fn remove_behavior_rule(
        &self,
        home: &HomeId,
        device_name: &str,
        rule: &AutoBehaviorRule,
    ) -> Result<(), EngineError> {
        let mut device = self
            .store
            .get_device(home, device_name)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("device {device_name}")))?;

        let fingerprint =
            behavior_fingerprint(device_name, &rule.measure, rule.range, &rule.action)?;
        let mut position = None;
        for (i, existing) in device.auto_behavior.iter().enumerate() {
            let existing_fp = behavior_fingerprint(
                device_name,
                &existing.measure,
                existing.range,
                &existing.action,
            )?;
            if existing_fp == fingerprint {
                position = Some(i);
                break;
            }
        }
        let position = position.ok_or_else(|| {
            EngineError::NotFound(format!("no matching behavior rule on {device_name}"))
        })?;

        device.auto_behavior.remove(position);
        self.store.put_device(device).await?;
        if !self.behaviors.remove(home, device_name, rule).await? {
            tracing::warn!(
                "Behavior projection for {} held no matching entry",
                device_name
            );
        }

        tracing::info!("Removed behavior rule from {} ({})", device_name, home);
        Ok(())
    }

    /// Add a schedule rule to a device
    pub async fn add_schedule_rule(
        &self,
        home: &HomeId,
        device_name: &str,
        rule: DeviceScheduleRule,
    ) -> Result<(), EngineError> {
        let cron = CronExpr::parse(&rule.cron)?;
        validate_steps(&rule.action)?;

        let mut device = self.active_device(home, device_name).await?;

        let fingerprint = schedule_fingerprint(device_name, &rule)?;
        for existing in &device.schedule {
            if schedule_fingerprint(device_name, existing)? == fingerprint {
                return Err(EngineError::Validation(
                    "an identical schedule rule already exists on this device".into(),
                ));
            }
        }

        device.schedule.push(rule.clone());
        self.store.put_device(device).await?;

        let entry = CachedScheduleEntry::new(&ScheduleRule {
            rule_id: None,
            home: home.clone(),
            device: device_name.to_string(),
            cron,
            steps: rule.action.clone(),
        });
        let json = entry.canonical_json()?;
        for key in cron.expand() {
            self.cache
                .list_push(&key, Bytes::from(json.clone()))
                .await?;
        }

        tracing::info!(
            "Added schedule rule '{}' on {} ({})",
            rule.cron,
            device_name,
            home
        );
        Ok(())
    }

    /// Remove a schedule rule from a device
    pub async fn remove_schedule_rule(
        &self,
        home: &HomeId,
        device_name: &str,
        rule: &DeviceScheduleRule,
    ) -> Result<(), EngineError> {
        let cron = CronExpr::parse(&rule.cron)?;

        let mut device = self
            .store
            .get_device(home, device_name)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("device {device_name}")))?;

        let fingerprint = schedule_fingerprint(device_name, rule)?;
        let mut position = None;
        for (i, existing) in device.schedule.iter().enumerate() {
            if schedule_fingerprint(device_name, existing)? == fingerprint {
                position = Some(i);
                break;
            }
        }
        let position = position.ok_or_else(|| {
            EngineError::NotFound(format!("no matching schedule rule on {device_name}"))
        })?;

        device.schedule.remove(position);
        self.store.put_device(device).await?;

        let entry = CachedScheduleEntry::new(&ScheduleRule {
            rule_id: None,
            home: home.clone(),
            device: device_name.to_string(),
            cron,
            steps: rule.action.clone(),
        });
        let json = entry.canonical_json()?;
        for key in cron.expand() {
            if !self.cache.list_remove(&key, json.as_bytes()).await? {
                tracing::warn!("Schedule projection at {} held no matching entry", key);
            }
        }

        tracing::info!(
            "Removed schedule rule '{}' from {} ({})",
            rule.cron,
            device_name,
            home
        );
        Ok(())
    }

    async fn active_device(
        &self,
        home: &HomeId,
        device_name: &str,
    ) -> Result<DeviceRecord, EngineError> {
        let device = self
            .store
            .get_device(home, device_name)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("device {device_name}")))?;
        if device.status != DeviceStatus::Active {
            return Err(EngineError::Validation(format!(
                "device {device_name} is not active"
            )));
        }
        Ok(device)
    }
}

fn validate_steps(steps: &[ActionStep]) -> Result<(), EngineError> {
    if steps.is_empty() {
        return Err(EngineError::Validation(
            "action list must not be empty".into(),
        ));
    }
    if steps.iter().any(|s| s.name.trim().is_empty()) {
        return Err(EngineError::Validation(
            "action names must not be empty".into(),
        ));
    }
    Ok(())
}
