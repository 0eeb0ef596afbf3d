//! Constrained cron expression parsing and key expansion
//!
//! Schedule expressions are five whitespace-separated fields
//! "minute hour day-of-month month day-of-week", each either the literal
//! `*` or a single integer. Ranges, lists, and steps are rejected: the
//! engine keys schedules by exact field tuples, and a wildcard is stored
//! as a literal `*` segment rather than expanded to a concrete range.

use crate::error::EngineError;
use crate::keys::schedule_key;
use std::fmt;

/// One field of a schedule expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronField {
    /// Wildcard (`*`)
    Any,
    /// A single literal value
    At(u32),
}

impl CronField {
    fn parse(raw: &str, name: &str, min: u32, max: u32) -> Result<Self, EngineError> {
        if raw == "*" {
            return Ok(Self::Any);
        }
        let value: u32 = raw.parse().map_err(|_| {
            EngineError::Validation(format!(
                "{name} field must be '*' or a single integer, got '{raw}'"
            ))
        })?;
        if value < min || value > max {
            return Err(EngineError::Validation(format!(
                "{name} field out of range ({min}-{max}): {value}"
            )));
        }
        Ok(Self::At(value))
    }

    /// Literal value, or `None` for the wildcard
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Any => None,
            Self::At(v) => Some(*v),
        }
    }

    /// The set of key segments this field contributes to the expansion.
    /// Literal-or-wildcard fields always contribute exactly one element.
    fn axis(&self) -> Vec<Option<u32>> {
        vec![self.value()]
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::At(v) => write!(f, "{v}"),
        }
    }
}

/// A parsed 5-field schedule expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronExpr {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    /// Parsed for validity but not part of the schedule key
    pub month: CronField,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: CronField,
}

impl CronExpr {
    /// Parse an expression string
    pub fn parse(expr: &str) -> Result<Self, EngineError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(EngineError::Validation(format!(
                "schedule expression must have 5 fields, got {}: '{expr}'",
                fields.len()
            )));
        }
        Ok(Self {
            minute: CronField::parse(fields[0], "minute", 0, 59)?,
            hour: CronField::parse(fields[1], "hour", 0, 23)?,
            day_of_month: CronField::parse(fields[2], "day-of-month", 1, 31)?,
            month: CronField::parse(fields[3], "month", 1, 12)?,
            day_of_week: CronField::parse(fields[4], "day-of-week", 0, 6)?,
        })
    }

    /// Expand into the schedule cache keys this expression occupies
    ///
    /// The expansion is the Cartesian product over the four keyed axes
    /// (minute, hour, day-of-week, day-of-month); month is dropped. Since
    /// each axis holds a single element, every expression currently yields
    /// exactly one key.
    #[must_use]
    pub fn expand(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for minute in self.minute.axis() {
            for hour in self.hour.axis() {
                for dow in self.day_of_week.axis() {
                    for dom in self.day_of_month.axis() {
                        keys.push(schedule_key(minute, hour, dow, dom));
                    }
                }
            }
        }
        keys
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_monday_morning() {
        let expr = CronExpr::parse("0 8 * * 1").unwrap();
        assert_eq!(expr.expand(), vec!["schedule:0:8:1:*".to_string()]);
    }

    #[test]
    fn expands_nightly() {
        let expr = CronExpr::parse("30 22 * * *").unwrap();
        assert_eq!(expr.expand(), vec!["schedule:30:22:*:*".to_string()]);
    }

    #[test]
    fn wildcards_stay_literal() {
        let expr = CronExpr::parse("* * * * *").unwrap();
        assert_eq!(expr.expand(), vec!["schedule:*:*:*:*".to_string()]);
    }

    #[test]
    fn month_is_parsed_but_not_keyed() {
        let expr = CronExpr::parse("0 8 * 6 1").unwrap();
        assert_eq!(expr.month, CronField::At(6));
        assert_eq!(expr.expand(), vec!["schedule:0:8:1:*".to_string()]);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronExpr::parse("0 8 * *").is_err());
        assert!(CronExpr::parse("0 8 * * * *").is_err());
    }

    #[test]
    fn rejects_ranges_lists_and_steps() {
        assert!(CronExpr::parse("0-30 8 * * 1").is_err());
        assert!(CronExpr::parse("0,30 8 * * 1").is_err());
        assert!(CronExpr::parse("*/5 8 * * 1").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(CronExpr::parse("60 8 * * 1").is_err());
        assert!(CronExpr::parse("0 24 * * 1").is_err());
        assert!(CronExpr::parse("0 8 0 * 1").is_err());
        assert!(CronExpr::parse("0 8 32 * 1").is_err());
        assert!(CronExpr::parse("0 8 * 13 1").is_err());
        assert!(CronExpr::parse("0 8 * * 7").is_err());
    }

    #[test]
    fn display_round_trips() {
        let expr = CronExpr::parse("30 22 * 6 1").unwrap();
        assert_eq!(expr.to_string(), "30 22 * 6 1");
    }
}
