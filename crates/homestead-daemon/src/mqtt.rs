//! MQTT wiring: command dispatch and telemetry ingestion

use async_trait::async_trait;
use automation_engine::{AutomationEngine, CommandDispatcher, DispatchError};
use homestead_core::{ActionStep, HomeId, SensorReading};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Create the shared MQTT client
pub fn connect(host: &str, port: u16, client_id: &str) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(true);
    AsyncClient::new(options, 64)
}

/// Wire payload of one device command
#[derive(Serialize)]
struct CommandPayload<'a> {
    name: &'a str,
    action: &'a [ActionStep],
}

/// Publishes device commands on the fixed control channel
///
/// QoS 1 gives at-least-once delivery; retries beyond that are the
/// broker's concern, not ours.
pub struct MqttDispatcher {
    client: AsyncClient,
    topic: String,
}

impl MqttDispatcher {
    pub fn new(client: AsyncClient, topic: String) -> Self {
        Self { client, topic }
    }
}

#[async_trait]
impl CommandDispatcher for MqttDispatcher {
    async fn dispatch(
        &self,
        home: &HomeId,
        device: &str,
        steps: &[ActionStep],
    ) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(&CommandPayload {
            name: device,
            action: steps,
        })
        .map_err(|e| DispatchError::Broker(e.to_string()))?;

        tracing::debug!("Publishing command for {} ({})", device, home);
        self.client
            .publish(&self.topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| DispatchError::Broker(e.to_string()))
    }
}

/// Run the MQTT event loop: connection upkeep plus telemetry ingestion
///
/// Each inbound telemetry payload is decoded into a `SensorReading` and
/// handed to the engine; malformed payloads are logged and dropped. The
/// subscription is (re-)established on every connack so it survives
/// reconnects.
pub fn start_event_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    engine: Arc<AutomationEngine>,
    telemetry_topic: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("Connected to MQTT broker");
                    if let Err(e) = client
                        .subscribe(&telemetry_topic, QoS::AtLeastOnce)
                        .await
                    {
                        tracing::error!("Failed to subscribe to {}: {}", telemetry_topic, e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != telemetry_topic {
                        continue;
                    }
                    match serde_json::from_slice::<SensorReading>(&publish.payload) {
                        Ok(reading) => engine.handle_reading(&reading).await,
                        Err(e) => {
                            tracing::warn!("Dropping malformed telemetry payload: {}", e);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT connection error: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    })
}
