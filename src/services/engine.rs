//! Missing-item decision engine
//!
//! Single source of truth for "is item X currently considered present" and
//! for the alert set computed when a door opens. The engine is owned by one
//! task (the solver loop); nothing else touches the mobility map or the
//! open-door set, so there is no locking here.

use crate::domain::types::MobilityState;
use crate::io::alert::AlertSink;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub struct DecisionEngine<S: AlertSink> {
    /// Mobility record per required item, fixed at construction
    items: HashMap<String, MobilityState>,
    /// Watched door identifiers, fixed at construction
    doors: HashSet<String>,
    /// Doors currently reported open; "a door is open" = non-empty
    open_doors: HashSet<String>,
    /// Items whose alert was last signalled as raised, for dedupe
    raised: HashSet<String>,
    /// Grace period after last movement, milliseconds
    tolerance_ms: u64,
    /// Treat an all-missing evaluation as a sensor anomaly and raise nothing
    suppress_all_missing: bool,
    sink: S,
}

impl<S: AlertSink> DecisionEngine<S> {
    pub fn new(
        required_items: &[String],
        doors: &[String],
        tolerance_ms: u64,
        suppress_all_missing: bool,
        sink: S,
    ) -> Self {
        let items = required_items
            .iter()
            .map(|id| (id.clone(), MobilityState::new()))
            .collect();
        Self {
            items,
            doors: doors.iter().cloned().collect(),
            open_doors: HashSet::new(),
            raised: HashSet::new(),
            tolerance_ms,
            suppress_all_missing,
            sink,
        }
    }

    /// Fold in one mobility observation.
    ///
    /// An item that starts moving while a door is open has its alert cleared
    /// right away (caught it on the way out), without waiting for the next
    /// door event.
    pub async fn ingest_mobility(&mut self, item_id: &str, mobile: bool, observed_at: u64) {
        let Some(state) = self.items.get_mut(item_id) else {
            debug!(item = %item_id, "mobility_unknown_item");
            return;
        };

        if mobile {
            state.mark_mobile(observed_at);
        } else {
            state.mark_still();
            return;
        }

        if !self.open_doors.is_empty() && self.raised.remove(item_id) {
            info!(item = %item_id, "item_moving_again");
            self.sink.clear_alert(item_id, observed_at).await;
        }
    }

    /// Fold in one door observation.
    ///
    /// Opening transition (no door open -> at least one open) evaluates the
    /// missing set and raises alerts for it. Closing transition (last open
    /// door closes) resets the whole group.
    pub async fn ingest_door(&mut self, door_id: &str, open: bool, observed_at: u64) {
        if !self.doors.contains(door_id) {
            debug!(door = %door_id, "door_unknown_id");
            return;
        }

        let was_open = !self.open_doors.is_empty();
        if open {
            self.open_doors.insert(door_id.to_string());
        } else {
            self.open_doors.remove(door_id);
        }
        let now_open = !self.open_doors.is_empty();

        if !was_open && now_open {
            let missing = self.evaluate_missing(observed_at);
            info!(door = %door_id, missing = ?missing, "door_opened");
            for item in missing {
                if self.raised.insert(item.clone()) {
                    self.sink.set_alert(&item, observed_at).await;
                }
            }
        } else if was_open && !now_open {
            info!(door = %door_id, "door_closed");
            self.raised.clear();
            self.sink.clear_all_alerts(observed_at).await;
        }
    }

    /// Items judged forgotten at `now`: not currently mobile and last mobile
    /// at least `tolerance_ms` ago (never-mobile counts as infinitely ago).
    ///
    /// When nothing in the group is present the result is suppressed (if
    /// configured): all-missing usually means the tracker has no data yet,
    /// not that everything walked off.
    pub fn evaluate_missing(&self, now: u64) -> Vec<String> {
        let mut missing: Vec<String> = self
            .items
            .iter()
            .filter(|(_, state)| {
                let within_tolerance = state
                    .elapsed_since_mobile(now)
                    .is_some_and(|elapsed| elapsed < self.tolerance_ms);
                !(state.is_mobile() || within_tolerance)
            })
            .map(|(id, _)| id.clone())
            .collect();

        if self.suppress_all_missing && missing.len() == self.items.len() {
            warn!(items = missing.len(), "all_missing_suppressed");
            return Vec::new();
        }

        missing.sort();
        missing
    }

    pub fn door_open(&self) -> bool {
        !self.open_doors.is_empty()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[cfg(test)]
    fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const T0: u64 = 1_000_000;
    const TOLERANCE_MS: u64 = 30_000;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SinkCall {
        Set(String, u64),
        Clear(String, u64),
        ClearAll(u64),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<SinkCall>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn set_alert(&mut self, item_id: &str, at: u64) {
            self.calls.push(SinkCall::Set(item_id.to_string(), at));
        }

        async fn clear_alert(&mut self, item_id: &str, at: u64) {
            self.calls.push(SinkCall::Clear(item_id.to_string(), at));
        }

        async fn clear_all_alerts(&mut self, at: u64) {
            self.calls.push(SinkCall::ClearAll(at));
        }
    }

    fn engine(suppress: bool) -> DecisionEngine<RecordingSink> {
        DecisionEngine::new(
            &["wallet".to_string(), "keys".to_string()],
            &["front door".to_string(), "back door".to_string()],
            TOLERANCE_MS,
            suppress,
            RecordingSink::default(),
        )
    }

    #[tokio::test]
    async fn test_forgotten_item_alerted_on_door_open() {
        // Scenario A: wallet moving, keys never seen moving
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_door("front door", true, T0 + 10_000).await;

        assert_eq!(engine.sink().calls, vec![SinkCall::Set("keys".to_string(), T0 + 10_000)]);
    }

    #[tokio::test]
    async fn test_all_missing_is_suppressed() {
        // Scenario B: neither item has ever moved; treat as bootstrap anomaly
        let mut engine = engine(true);
        engine.ingest_door("front door", true, T0 + 10_000).await;

        assert!(engine.sink().calls.is_empty());
    }

    #[tokio::test]
    async fn test_all_missing_alerts_when_suppression_disabled() {
        let mut engine = engine(false);
        engine.ingest_door("front door", true, T0 + 10_000).await;

        assert_eq!(
            engine.sink().calls,
            vec![
                SinkCall::Set("keys".to_string(), T0 + 10_000),
                SinkCall::Set("wallet".to_string(), T0 + 10_000),
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_item_missing_after_tolerance() {
        // Scenario C: keys moved at t+5s then went still; door opens at t+40s
        let mut engine = engine(true);
        engine.ingest_mobility("keys", true, T0 + 5_000).await;
        engine.ingest_mobility("keys", false, T0 + 6_000).await;
        engine.ingest_mobility("wallet", true, T0 + 39_000).await;
        engine.ingest_door("front door", true, T0 + 40_000).await;

        assert_eq!(engine.sink().calls, vec![SinkCall::Set("keys".to_string(), T0 + 40_000)]);
    }

    #[tokio::test]
    async fn test_tolerance_boundary_is_strict() {
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_mobility("keys", true, T0).await;
        engine.ingest_mobility("keys", false, T0 + 1).await;

        // elapsed == tolerance: missing
        let missing = engine.evaluate_missing(T0 + TOLERANCE_MS);
        assert_eq!(missing, vec!["keys".to_string()]);

        // elapsed == tolerance - 1: still within grace period
        let missing = engine.evaluate_missing(T0 + TOLERANCE_MS - 1);
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_door_close_resets_whole_group() {
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_door("front door", true, T0 + 1_000).await;
        engine.ingest_door("front door", false, T0 + 5_000).await;

        assert_eq!(
            engine.sink().calls,
            vec![
                SinkCall::Set("keys".to_string(), T0 + 1_000),
                SinkCall::ClearAll(T0 + 5_000),
            ]
        );
        assert!(engine.raised.is_empty());
    }

    #[tokio::test]
    async fn test_mobility_while_door_open_clears_alert_immediately() {
        // Scenario D: alert on keys, then keys start moving before any
        // further door event
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_door("front door", true, T0 + 1_000).await;
        engine.ingest_mobility("keys", true, T0 + 3_000).await;

        assert_eq!(
            engine.sink().calls,
            vec![
                SinkCall::Set("keys".to_string(), T0 + 1_000),
                SinkCall::Clear("keys".to_string(), T0 + 3_000),
            ]
        );
    }

    #[tokio::test]
    async fn test_mobility_without_raised_alert_publishes_nothing() {
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_door("front door", true, T0 + 1_000).await;
        // wallet was never alerted; its movement must not publish a clear
        engine.ingest_mobility("wallet", true, T0 + 2_000).await;

        assert_eq!(engine.sink().calls, vec![SinkCall::Set("keys".to_string(), T0 + 1_000)]);
    }

    #[tokio::test]
    async fn test_repeated_open_does_not_duplicate_alerts() {
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_door("front door", true, T0 + 1_000).await;
        engine.ingest_door("front door", true, T0 + 2_000).await;

        assert_eq!(engine.sink().calls, vec![SinkCall::Set("keys".to_string(), T0 + 1_000)]);
    }

    #[tokio::test]
    async fn test_second_door_opening_is_not_a_new_transition() {
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_door("front door", true, T0 + 1_000).await;
        engine.ingest_door("back door", true, T0 + 2_000).await;
        // Closing one of two open doors is not a close transition either
        engine.ingest_door("front door", false, T0 + 3_000).await;

        assert!(engine.door_open());
        assert_eq!(engine.sink().calls, vec![SinkCall::Set("keys".to_string(), T0 + 1_000)]);

        // Last open door closes: now the group resets
        engine.ingest_door("back door", false, T0 + 4_000).await;
        assert!(!engine.door_open());
        assert_eq!(engine.sink().calls.last(), Some(&SinkCall::ClearAll(T0 + 4_000)));
    }

    #[tokio::test]
    async fn test_unknown_identifiers_are_ignored() {
        let mut engine = engine(true);
        engine.ingest_mobility("phone", true, T0).await;
        engine.ingest_door("garage", true, T0).await;

        assert_eq!(engine.items.len(), 2);
        assert!(!engine.door_open());
        assert!(engine.sink().calls.is_empty());
    }

    #[tokio::test]
    async fn test_mobile_flag_alone_makes_item_present() {
        // A set mobile flag keeps the item present no matter how old the
        // last-mobile timestamp is
        let mut engine = engine(true);
        engine.ingest_mobility("wallet", true, T0).await;
        engine.ingest_mobility("keys", true, T0 - 500_000).await;

        let missing = engine.evaluate_missing(T0 + 10_000_000);
        assert!(missing.is_empty());
    }
}
