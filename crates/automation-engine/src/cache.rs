//! Behavior-rule cache and cooldown gate
//!
//! Auto-behavior rules are projected into per-(home, measure) cache lists;
//! evaluation reads the whole list and range-matches each entry. A matched
//! entry must also clear its cooldown marker, keyed by (list key, entry
//! index), before it fires again.

use crate::error::EngineError;
use crate::keys::{cooldown_key, rules_key};
use crate::model::CachedRuleEntry;
use bytes::Bytes;
use homestead_cache::CacheStore;
use homestead_core::{ActionStep, AutoBehaviorRule, HomeId};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of range-matching one cached entry
#[derive(Debug, Clone)]
pub struct BehaviorMatch {
    /// Position in the rule list; doubles as the cooldown identity
    pub index: usize,
    pub device: String,
    pub steps: Vec<ActionStep>,
    /// False when the range matched but the cooldown suppressed the firing
    pub fired: bool,
}

/// Cache-backed projection of device auto-behavior rules
pub struct BehaviorRuleCache {
    cache: Arc<dyn CacheStore>,
    cooldown: Duration,
}

impl BehaviorRuleCache {
    pub fn new(cache: Arc<dyn CacheStore>, cooldown: Duration) -> Self {
        Self { cache, cooldown }
    }

    /// Append the canonical entry for a behavior rule
    ///
    /// The caller is responsible for having rejected duplicates against the
    /// device's source record first.
    pub async fn add(
        &self,
        home: &HomeId,
        device_name: &str,
        rule: &AutoBehaviorRule,
    ) -> Result<(), EngineError> {
        let entry = CachedRuleEntry::new(device_name, rule.range, &rule.action);
        let json = entry.canonical_json()?;
        self.cache
            .list_push(&rules_key(home, &rule.measure), Bytes::from(json))
            .await?;
        Ok(())
    }

    /// Remove the first value-equal entry for a behavior rule
    ///
    /// Returns false when the projection held no such entry (the durable
    /// record is authoritative; a missing projection entry is only logged).
    pub async fn remove(
        &self,
        home: &HomeId,
        device_name: &str,
        rule: &AutoBehaviorRule,
    ) -> Result<bool, EngineError> {
        let entry = CachedRuleEntry::new(device_name, rule.range, &rule.action);
        let json = entry.canonical_json()?;
        Ok(self
            .cache
            .list_remove(&rules_key(home, &rule.measure), json.as_bytes())
            .await?)
    }

    /// Evaluate one measurement against the projected rules
    ///
    /// Returns every range-matched entry; entries that cleared their
    /// cooldown have it stamped with `now_ms` and are flagged `fired`.
    /// Malformed cache entries are skipped.
    pub async fn evaluate(
        &self,
        home: &HomeId,
        measure: &str,
        value: f64,
        now_ms: i64,
    ) -> Result<Vec<BehaviorMatch>, EngineError> {
        let key = rules_key(home, measure);
        let entries = self.cache.list_range(&key).await?;

        let mut matches = Vec::new();
        for (index, raw) in entries.iter().enumerate() {
            let entry: CachedRuleEntry = match serde_json::from_slice(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping malformed entry {} at {}: {}", index, key, e);
                    continue;
                }
            };

            if !entry.range.contains(value) {
                continue;
            }

            let fired = self.check_cooldown(&key, index, now_ms).await?;
            if fired {
                // Non-atomic check-then-write: two near-simultaneous
                // evaluations can both pass before either stamps the
                // marker. The window is bounded by one cache round trip.
                let marker = cooldown_key(&key, index);
                if let Err(e) = self
                    .cache
                    .set(&marker, Bytes::from(now_ms.to_string()))
                    .await
                {
                    tracing::warn!("Failed to stamp cooldown marker {}: {}", marker, e);
                }
            }

            matches.push(BehaviorMatch {
                index,
                device: entry.device_name,
                steps: entry.action,
                fired,
            });
        }
        Ok(matches)
    }

    async fn check_cooldown(
        &self,
        rules_key: &str,
        index: usize,
        now_ms: i64,
    ) -> Result<bool, EngineError> {
        let marker = cooldown_key(rules_key, index);
        let Some(raw) = self.cache.get(&marker).await? else {
            return Ok(true);
        };
        let last_ms: i64 = match String::from_utf8_lossy(&raw).parse() {
            Ok(ms) => ms,
            Err(_) => {
                tracing::warn!("Unreadable cooldown marker {}, treating as absent", marker);
                return Ok(true);
            }
        };
        let cooldown_ms = self.cooldown.as_millis() as i64;
        Ok(now_ms.saturating_sub(last_ms) >= cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homestead_cache::MemoryCache;
    use homestead_core::ValueRange;

    fn behavior(measure: &str, range: ValueRange) -> AutoBehaviorRule {
        AutoBehaviorRule {
            measure: measure.to_string(),
            range,
            action: vec![ActionStep::new("speed", "4")],
        }
    }

    fn rules(cooldown_ms: u64) -> BehaviorRuleCache {
        BehaviorRuleCache::new(
            Arc::new(MemoryCache::new()),
            Duration::from_millis(cooldown_ms),
        )
    }

    #[tokio::test]
    async fn in_range_value_fires() {
        let rules = rules(30_000);
        let home = HomeId::from("h1");
        rules
            .add(&home, "fan", &behavior("temperature", ValueRange::at_least(28.0)))
            .await
            .unwrap();

        let matches = rules.evaluate(&home, "temperature", 30.0, 0).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].fired);
        assert_eq!(matches[0].device, "fan");

        let matches = rules.evaluate(&home, "temperature", 20.0, 0).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn cooldown_suppresses_until_elapsed() {
        let rules = rules(30_000);
        let home = HomeId::from("h1");
        rules
            .add(&home, "fan", &behavior("temperature", ValueRange::at_least(28.0)))
            .await
            .unwrap();

        let first = rules.evaluate(&home, "temperature", 30.0, 0).await.unwrap();
        assert!(first[0].fired);

        for now_ms in [1, 15_000, 29_999] {
            let suppressed = rules
                .evaluate(&home, "temperature", 30.0, now_ms)
                .await
                .unwrap();
            assert!(!suppressed[0].fired, "still cooling at {now_ms}ms");
        }

        let eligible = rules
            .evaluate(&home, "temperature", 30.0, 30_000)
            .await
            .unwrap();
        assert!(eligible[0].fired);
    }

    #[tokio::test]
    async fn rules_on_same_measure_cool_down_independently() {
        let rules = rules(30_000);
        let home = HomeId::from("h1");
        rules
            .add(&home, "fan", &behavior("temperature", ValueRange::between(20.0, 40.0)))
            .await
            .unwrap();
        rules
            .add(&home, "vent", &behavior("temperature", ValueRange::at_least(35.0)))
            .await
            .unwrap();

        // First reading only lands in the fan's range
        let matches = rules.evaluate(&home, "temperature", 25.0, 0).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].fired);

        // Second reading hits both; the vent's cooldown is untouched
        let matches = rules
            .evaluate(&home, "temperature", 36.0, 1000)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert!(!matches[0].fired, "fan still cooling");
        assert!(matches[1].fired, "vent fires on its first match");
    }

    #[tokio::test]
    async fn remove_deletes_single_projection_entry() {
        let rules = rules(30_000);
        let home = HomeId::from("h1");
        let rule = behavior("temperature", ValueRange::at_least(28.0));
        rules.add(&home, "fan", &rule).await.unwrap();

        assert!(rules.remove(&home, "fan", &rule).await.unwrap());
        assert!(!rules.remove(&home, "fan", &rule).await.unwrap());
        let matches = rules.evaluate(&home, "temperature", 30.0, 0).await.unwrap();
        assert!(matches.is_empty());
    }
}
