//! Daemon configuration
//!
//! Cache and broker endpoints are required: without them the engine cannot
//! run, so a missing value halts boot at argument parsing.

use automation_engine::EngineConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Homestead automation engine daemon
#[derive(Parser, Debug)]
#[command(name = "homestead-daemon", version)]
pub struct Args {
    /// Redis connection URL for the rule cache (e.g. redis://127.0.0.1/)
    #[arg(long, env = "HOMESTEAD_REDIS_URL")]
    pub redis_url: String,

    /// MQTT broker host
    #[arg(long, env = "HOMESTEAD_MQTT_HOST")]
    pub mqtt_host: String,

    /// MQTT broker port
    #[arg(long, env = "HOMESTEAD_MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    /// MQTT client identifier
    #[arg(long, env = "HOMESTEAD_MQTT_CLIENT_ID", default_value = "homestead-engine")]
    pub mqtt_client_id: String,

    /// Topic sensor telemetry arrives on
    #[arg(
        long,
        env = "HOMESTEAD_TELEMETRY_TOPIC",
        default_value = "homestead/telemetry"
    )]
    pub telemetry_topic: String,

    /// Control channel device commands are published on
    #[arg(
        long,
        env = "HOMESTEAD_CONTROL_TOPIC",
        default_value = "homestead/control"
    )]
    pub control_topic: String,

    /// Path of the JSON rule/device store file
    #[arg(long, env = "HOMESTEAD_DATA_FILE", default_value = "data/store.json")]
    pub data_file: PathBuf,

    /// Cooldown between firings of one behavior rule, in milliseconds
    #[arg(long, env = "HOMESTEAD_COOLDOWN_MS", default_value_t = 30_000)]
    pub cooldown_ms: u64,

    /// Schedule poll interval, in seconds
    #[arg(long, env = "HOMESTEAD_POLL_INTERVAL_SECS", default_value_t = 60)]
    pub poll_interval_secs: u64,

    /// TTL of execution-dedupe markers, in seconds
    #[arg(long, env = "HOMESTEAD_EXECUTION_WINDOW_SECS", default_value_t = 90)]
    pub execution_window_secs: u64,
}

impl Args {
    /// Engine timings derived from the CLI/env settings
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cooldown: Duration::from_millis(self.cooldown_ms),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            execution_window: Duration::from_secs(self.execution_window_secs),
        }
    }
}
