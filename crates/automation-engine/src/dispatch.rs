//! Command dispatch seam

use async_trait::async_trait;
use homestead_core::{ActionStep, HomeId};
use thiserror::Error;

/// Errors surfaced by dispatcher implementations
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Broker rejected or never accepted the publish attempt
    #[error("broker error: {0}")]
    Broker(String),
}

/// Publishes device commands to the control channel
///
/// A successful dispatch means an attempt was handed to the transport, not
/// that the device acted. Delivery retries are the transport's own
/// (at-least-once) concern; implementations must not add their own retry
/// loop.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Publish one command message for a device
    async fn dispatch(
        &self,
        home: &HomeId,
        device: &str,
        steps: &[ActionStep],
    ) -> Result<(), DispatchError>;
}
