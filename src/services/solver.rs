//! Poll/dispatch loop bridging world-model streams to the decision engine
//!
//! Opens one live stream for item mobility and one for door state, pumps
//! available batches into the engine each tick, and reopens both streams
//! whenever either completes or fails. Shutdown is a cooperative watch flag
//! observed at poll boundaries.

use crate::domain::types::epoch_ms;
use crate::infra::config::Config;
use crate::infra::stats::SolverStats;
use crate::io::alert::AlertSink;
use crate::io::codec;
use crate::io::world_model::{
    AttributeSample, IdentifierUpdate, StreamHandle, StreamRequest, WorldModelSubscriber,
};
use crate::services::engine::DecisionEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Build a filter matching exactly one of the given literal names
pub fn alternation(names: &[String]) -> String {
    let escaped: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    format!("^(?:{})$", escaped.join("|"))
}

/// Map a decoded door attribute value to "door is open"
pub fn door_open_value(decoded: bool, value_is_closed: bool) -> bool {
    if value_is_closed {
        !decoded
    } else {
        decoded
    }
}

pub struct Solver<S: AlertSink> {
    config: Config,
    engine: DecisionEngine<S>,
    subscriber: WorldModelSubscriber,
    stats: Arc<SolverStats>,
}

impl<S: AlertSink> Solver<S> {
    pub fn new(config: Config, sink: S, stats: Arc<SolverStats>) -> Self {
        let engine = DecisionEngine::new(
            config.required_items(),
            config.doors(),
            config.delay_tolerance_ms(),
            config.suppress_all_missing(),
            sink,
        );
        let subscriber = WorldModelSubscriber::new(&config);
        Self { config, engine, subscriber, stats }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.engine.sink_mut()
    }

    /// Run until the shutdown flag is set. Transport failure is never fatal:
    /// the loop keeps reconnecting with a delay between attempts.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let item_filter = alternation(self.config.required_items());
        let mobility_filter = alternation(self.config.mobility_attributes());
        let door_filter = alternation(self.config.doors());
        let door_attr_filter = alternation(self.config.door_attributes());

        let reconnect_delay = Duration::from_millis(self.config.reconnect_delay_ms());

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Live tail from now; history before startup is not our business
            let from = epoch_ms();
            let mobility_request = StreamRequest {
                id_pattern: item_filter.clone(),
                attribute_pattern: mobility_filter.clone(),
                from,
                to: None,
            };
            let door_request = StreamRequest {
                id_pattern: door_filter.clone(),
                attribute_pattern: door_attr_filter.clone(),
                from,
                to: None,
            };

            let mut mobility_stream = match self.subscriber.open_stream(&mobility_request).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(error = %e, "mobility_stream_open_failed");
                    self.stats.record_stream_restart();
                    sleep_or_shutdown(reconnect_delay, &mut shutdown).await;
                    continue;
                }
            };
            let mut door_stream = match self.subscriber.open_stream(&door_request).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(error = %e, "door_stream_open_failed");
                    mobility_stream.cancel();
                    self.stats.record_stream_restart();
                    sleep_or_shutdown(reconnect_delay, &mut shutdown).await;
                    continue;
                }
            };
            info!("streams_opened");

            let restart = self.pump(&mut mobility_stream, &mut door_stream, &mut shutdown).await;
            mobility_stream.cancel();
            door_stream.cancel();

            if !restart {
                break; // shutdown requested
            }
            self.stats.record_stream_restart();
            warn!("streams_restarting");
            sleep_or_shutdown(reconnect_delay, &mut shutdown).await;
        }
        info!("solver_stopped");
    }

    /// Pump both streams until one of them ends (returns true, caller
    /// resubscribes) or shutdown is requested (returns false).
    async fn pump(
        &mut self,
        mobility_stream: &mut StreamHandle,
        door_stream: &mut StreamHandle,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms());

        loop {
            // Mobility before door within a tick: a door-open evaluation must
            // see every movement observation that arrived alongside it.
            while let Some(batch) = mobility_stream.try_next() {
                self.dispatch_mobility(batch).await;
            }
            while let Some(batch) = door_stream.try_next() {
                self.dispatch_door(batch).await;
            }

            if mobility_stream.is_complete()
                || mobility_stream.is_error()
                || door_stream.is_complete()
                || door_stream.is_error()
            {
                // A batch can land between the drains above and this check;
                // pull anything still buffered before tearing the streams down
                while let Some(batch) = mobility_stream.try_next() {
                    self.dispatch_mobility(batch).await;
                }
                while let Some(batch) = door_stream.try_next() {
                    self.dispatch_door(batch).await;
                }
                return true;
            }
            if *shutdown.borrow() {
                return false;
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    async fn dispatch_mobility(&mut self, batch: Vec<IdentifierUpdate>) {
        for update in batch {
            for sample in update.attributes {
                match decode_boolean_sample(&sample) {
                    Ok(mobile) => {
                        self.stats.record_mobility_update();
                        self.engine
                            .ingest_mobility(&update.identifier, mobile, sample.timestamp)
                            .await;
                    }
                    Err(e) => {
                        self.stats.record_decode_failure();
                        warn!(item = %update.identifier, attribute = %sample.name, error = %e, "mobility_decode_failed");
                    }
                }
            }
        }
    }

    async fn dispatch_door(&mut self, batch: Vec<IdentifierUpdate>) {
        let value_is_closed = self.config.door_value_is_closed();
        for update in batch {
            for sample in update.attributes {
                match decode_boolean_sample(&sample) {
                    Ok(value) => {
                        self.stats.record_door_update();
                        let open = door_open_value(value, value_is_closed);
                        self.engine.ingest_door(&update.identifier, open, sample.timestamp).await;
                    }
                    Err(e) => {
                        self.stats.record_decode_failure();
                        warn!(door = %update.identifier, attribute = %sample.name, error = %e, "door_decode_failed");
                    }
                }
            }
        }
    }
}

fn decode_boolean_sample(sample: &AttributeSample) -> anyhow::Result<bool> {
    let raw = sample.raw()?;
    Ok(codec::decode_boolean(&raw)?)
}

async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.changed() => {}
    }
}
