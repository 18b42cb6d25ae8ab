use anyhow::Result;
use async_trait::async_trait;

/// Fire-and-forget operator notifications.
///
/// Used once per machine when a default retention is silently applied.
/// Delivery failures are logged by the caller and never fail the machine.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, machine: &str, reason: &str) -> Result<()>;
}
