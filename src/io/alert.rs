//! Alert signalling
//!
//! The engine talks to an `AlertSink`; production publishes a boolean alert
//! attribute per item back into the world model, standalone mode prints to
//! the operator console instead.

use crate::infra::stats::SolverStats;
use crate::io::codec;
use crate::io::world_model::WorldModelPublisher;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait AlertSink: Send {
    /// Raise the alert for one item
    async fn set_alert(&mut self, item_id: &str, at: u64);
    /// Retract the alert for one item
    async fn clear_alert(&mut self, item_id: &str, at: u64);
    /// Retract alerts for every required item (door-close group reset)
    async fn clear_all_alerts(&mut self, at: u64);
}

/// Publishes alerts as boolean attributes through the world-model publisher.
///
/// Fire-and-forget: a failed publish is logged and counted, never retried,
/// and engine state is not rolled back. A missed alert publish is not fatal
/// for a best-effort monitoring signal.
pub struct WorldModelAlertSink {
    publisher: WorldModelPublisher,
    attribute: String,
    items: Vec<String>,
    stats: Arc<SolverStats>,
}

impl WorldModelAlertSink {
    pub fn new(
        publisher: WorldModelPublisher,
        attribute: &str,
        items: &[String],
        stats: Arc<SolverStats>,
    ) -> Self {
        Self {
            publisher,
            attribute: attribute.to_string(),
            items: items.to_vec(),
            stats,
        }
    }

    async fn publish_flag(&mut self, item_id: &str, raised: bool, at: u64) {
        let raw = codec::encode_boolean(raised);
        if let Err(e) = self.publisher.publish(item_id, &self.attribute, &raw, at).await {
            self.stats.record_publish_failure();
            warn!(item = %item_id, raised, error = %e, "alert_publish_failed");
        }
    }

    pub async fn disconnect(&mut self) {
        self.publisher.disconnect().await;
    }
}

#[async_trait]
impl AlertSink for WorldModelAlertSink {
    async fn set_alert(&mut self, item_id: &str, at: u64) {
        info!(item = %item_id, at, "alert_raised");
        self.stats.record_alert_raised();
        self.publish_flag(item_id, true, at).await;
    }

    async fn clear_alert(&mut self, item_id: &str, at: u64) {
        info!(item = %item_id, at, "alert_cleared");
        self.stats.record_alert_cleared();
        self.publish_flag(item_id, false, at).await;
    }

    async fn clear_all_alerts(&mut self, at: u64) {
        info!(at, "alerts_cleared_all");
        for item in self.items.clone() {
            self.stats.record_alert_cleared();
            self.publish_flag(&item, false, at).await;
        }
    }
}

/// Standalone mode: alert transitions go to stdout for a human watching the
/// terminal, nothing is published.
pub struct ConsoleAlertSink {
    items: Vec<String>,
}

impl ConsoleAlertSink {
    pub fn new(items: &[String]) -> Self {
        Self { items: items.to_vec() }
    }
}

#[async_trait]
impl AlertSink for ConsoleAlertSink {
    async fn set_alert(&mut self, item_id: &str, _at: u64) {
        println!("ALERT: {item_id} appears to have been left behind");
    }

    async fn clear_alert(&mut self, item_id: &str, _at: u64) {
        println!("clear: {item_id} is moving again");
    }

    async fn clear_all_alerts(&mut self, _at: u64) {
        for item in &self.items {
            println!("clear: {item} (door closed)");
        }
    }
}
