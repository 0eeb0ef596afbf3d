//! Homestead automation engine daemon
//!
//! Connects the engine to its production collaborators: a Redis rule
//! cache, an MQTT broker (command dispatch and sensor-telemetry
//! ingestion), and a JSON-file rule store.

use automation_engine::{AutomationEngine, EngineConfig, EngineError};
use clap::Parser;
use homestead_cache::RedisCache;
use homestead_core::FileStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod mqtt;

use config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let engine_config: EngineConfig = args.engine_config();

    // Cache and broker connections are required at startup
    let cache = RedisCache::connect(&args.redis_url)
        .await
        .map_err(|e| EngineError::Configuration(format!("cache connection failed: {e}")))?;

    let (client, eventloop) = mqtt::connect(&args.mqtt_host, args.mqtt_port, &args.mqtt_client_id);
    let dispatcher = Arc::new(mqtt::MqttDispatcher::new(
        client.clone(),
        args.control_topic.clone(),
    ));

    let store = Arc::new(FileStore::open(&args.data_file).await);

    let engine = Arc::new(AutomationEngine::new(
        store,
        Arc::new(cache),
        dispatcher,
        engine_config,
    ));

    // A failed rebuild leaves stale or empty indexes until the next
    // attempt; it does not stop the daemon.
    if let Err(e) = engine.init().await {
        tracing::error!("Initial rule rebuild incomplete: {}", e);
    }

    engine.start();
    tracing::info!("Homestead automation engine running");

    let ingestion = mqtt::start_event_loop(
        client,
        eventloop,
        Arc::clone(&engine),
        args.telemetry_topic.clone(),
    );
    ingestion.await?;
    Ok(())
}
