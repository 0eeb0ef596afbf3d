//! Cache keyspace
//!
//! All engine state in the cache lives under two fixed prefixes:
//! `rules:` for behavior-rule projections and their cooldown markers,
//! `schedule:` for schedule projections and execution-dedupe markers.

use homestead_core::HomeId;

/// Width of one execution-dedupe bucket in milliseconds
pub const BUCKET_MILLIS: i64 = 60_000;

/// Key of the behavior-rule list for one home and measure
#[must_use]
pub fn rules_key(home: &HomeId, measure: &str) -> String {
    format!("rules:{home}:{measure}")
}

/// Key of the cooldown marker for one entry of a behavior-rule list
#[must_use]
pub fn cooldown_key(rules_key: &str, index: usize) -> String {
    format!("{rules_key}:cooldown:{index}")
}

/// Key of a schedule list; `None` renders as the literal `*` segment
#[must_use]
pub fn schedule_key(
    minute: Option<u32>,
    hour: Option<u32>,
    day_of_week: Option<u32>,
    day_of_month: Option<u32>,
) -> String {
    let seg = |f: Option<u32>| f.map_or_else(|| "*".to_string(), |v| v.to_string());
    format!(
        "schedule:{}:{}:{}:{}",
        seg(minute),
        seg(hour),
        seg(day_of_week),
        seg(day_of_month),
    )
}

/// Key of the execution-dedupe marker for one device and minute bucket
#[must_use]
pub fn execution_key(device: &str, bucket: i64) -> String {
    format!("schedule:exec:{device}:{bucket}")
}

/// Minute bucket of an epoch-milliseconds timestamp
#[must_use]
pub fn minute_bucket(epoch_ms: i64) -> i64 {
    epoch_ms.div_euclid(BUCKET_MILLIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats() {
        let home = HomeId::from("h1");
        assert_eq!(rules_key(&home, "temperature"), "rules:h1:temperature");
        assert_eq!(
            cooldown_key("rules:h1:temperature", 2),
            "rules:h1:temperature:cooldown:2"
        );
        assert_eq!(
            schedule_key(Some(30), Some(22), None, None),
            "schedule:30:22:*:*"
        );
        assert_eq!(execution_key("fan", 29_000_000), "schedule:exec:fan:29000000");
    }

    #[test]
    fn bucket_is_sixty_seconds_wide() {
        assert_eq!(minute_bucket(0), 0);
        assert_eq!(minute_bucket(59_999), 0);
        assert_eq!(minute_bucket(60_000), 1);
        assert_eq!(minute_bucket(119_999), 1);
    }
}
