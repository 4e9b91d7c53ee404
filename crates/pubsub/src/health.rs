//! Broker health checks.

use telemetry::health;
use tracing::warn;

use crate::broker::Broker;

/// Probes the broker and records the result in the global health registry.
pub async fn check_broker(broker: &dyn Broker) -> bool {
    let healthy = broker.health_check().await;
    if !healthy {
        warn!("Broker health check failed");
    }
    health().broker.record(healthy, "broker unreachable");
    healthy
}
