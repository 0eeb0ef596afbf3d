//! Automation engine for Homestead
//!
//! Triggers device commands from live sensor measurements and from
//! wall-clock schedules, with idempotent consumption of at-least-once
//! infrastructure: cooldown gating on the behavior path and per-minute
//! execution dedupe on the time path.

pub mod cache;
pub mod config;
pub mod cron;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod keys;
pub mod model;
pub mod scheduler;

pub use cache::{BehaviorMatch, BehaviorRuleCache};
pub use config::EngineConfig;
pub use cron::{CronExpr, CronField};
pub use dispatch::{CommandDispatcher, DispatchError};
pub use engine::{AutomationEngine, EngineEvent};
pub use error::EngineError;
pub use scheduler::{ExecutionGuard, TickTime};
