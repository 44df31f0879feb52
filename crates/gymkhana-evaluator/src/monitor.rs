//! Per-run bookkeeping over the telemetry stream.
//!
//! [`RunMonitor`] turns the raw `activeNode`/`cte` fields of each
//! telemetry frame into the higher-level sink callbacks: `each_node` when
//! the car reaches a new track node, `each_turn` when the node index
//! wraps backwards (one completed lap), and `on_car_leaving_road` when
//! the cross-track error first exceeds the bound.

use gymkhana_client::handler::EventHandler;
use gymkhana_client::protocol::Telemetry;
use tracing::{debug, warn};

/// Cross-track error beyond which the car counts as off the road.
pub const DEFAULT_CTE_BOUND: f64 = 5.0;

/// Lap, node, and off-road tracking for one evaluation run.
///
/// The monitor is edge-triggered throughout: a callback fires when the
/// observed value changes, never on every frame. Leaving the road fires
/// once per excursion and rearms when the car comes back inside the
/// bound.
#[derive(Debug)]
pub struct RunMonitor {
    turn_limit: u32,
    cte_bound: f64,
    last_node: Option<i64>,
    laps: u32,
    off_road: bool,
}

impl RunMonitor {
    /// Fresh monitor with no frames seen.
    #[must_use]
    pub const fn new(turn_limit: u32) -> Self {
        Self {
            turn_limit,
            cte_bound: DEFAULT_CTE_BOUND,
            last_node: None,
            laps: 0,
            off_road: false,
        }
    }

    /// Builder: override the off-road bound.
    #[must_use]
    pub const fn with_cte_bound(mut self, bound: f64) -> Self {
        self.cte_bound = bound;
        self
    }

    /// Completed laps so far.
    #[must_use]
    pub const fn laps(&self) -> u32 {
        self.laps
    }

    /// Whether the run has reached its lap limit.
    #[must_use]
    pub const fn turn_limit_reached(&self) -> bool {
        self.laps >= self.turn_limit
    }

    /// Fold one telemetry frame into the run, firing sink callbacks for
    /// whatever changed.
    ///
    /// The first frame establishes the node baseline and fires
    /// `each_node`; a lap needs a previous node to compare against, so
    /// the earliest possible `each_turn` is the second frame.
    pub fn observe(&mut self, frame: &Telemetry, handler: &dyn EventHandler) {
        let node = frame.active_node;
        if self.last_node != Some(node) {
            if let Some(prev) = self.last_node {
                // The node index only decreases when the car crosses the
                // start line back onto the first segment.
                if node < prev {
                    self.laps += 1;
                    debug!(laps = self.laps, "lap completed");
                    handler.each_turn(self.laps);
                }
            }
            handler.each_node(node);
            self.last_node = Some(node);
        }

        let outside = frame.cte.abs() > self.cte_bound;
        if outside && !self.off_road {
            warn!(cte = frame.cte, bound = self.cte_bound, "car left the road");
            handler.on_car_leaving_road(frame.cte);
        }
        self.off_road = outside;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use gymkhana_core::readiness::ReadinessState;

    use super::*;

    #[derive(Debug, Default)]
    struct RecordingSink {
        readiness: Arc<ReadinessState>,
        events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventHandler for RecordingSink {
        fn readiness(&self) -> &Arc<ReadinessState> {
            &self.readiness
        }

        fn each_turn(&self, turn: u32) {
            self.events.lock().unwrap().push(format!("turn:{turn}"));
        }

        fn each_node(&self, node: i64) {
            self.events.lock().unwrap().push(format!("node:{node}"));
        }

        fn on_car_leaving_road(&self, cte: f64) {
            self.events.lock().unwrap().push(format!("off_road:{cte}"));
        }
    }

    fn frame(node: i64, cte: f64) -> Telemetry {
        Telemetry::new(node, cte)
    }

    // ---- nodes ----

    #[test]
    fn first_frame_sets_baseline_and_fires_node() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(3, 0.0), &sink);
        assert_eq!(sink.events(), vec!["node:3"]);
        assert_eq!(monitor.laps(), 0);
    }

    #[test]
    fn repeated_node_fires_nothing() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(3, 0.0), &sink);
        monitor.observe(&frame(3, 0.1), &sink);
        monitor.observe(&frame(3, -0.1), &sink);
        assert_eq!(sink.events(), vec!["node:3"]);
    }

    #[test]
    fn advancing_node_fires_each_node() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(3, 0.0), &sink);
        monitor.observe(&frame(4, 0.0), &sink);
        monitor.observe(&frame(7, 0.0), &sink);
        assert_eq!(sink.events(), vec!["node:3", "node:4", "node:7"]);
        assert_eq!(monitor.laps(), 0);
    }

    // ---- laps ----

    #[test]
    fn backwards_wrap_counts_a_lap() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(41, 0.0), &sink);
        monitor.observe(&frame(0, 0.0), &sink);
        assert_eq!(sink.events(), vec!["node:41", "turn:1", "node:0"]);
        assert_eq!(monitor.laps(), 1);
    }

    #[test]
    fn each_turn_receives_running_count() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        for node in [40, 41, 0, 41, 1] {
            monitor.observe(&frame(node, 0.0), &sink);
        }
        assert_eq!(
            sink.events(),
            vec!["node:40", "node:41", "turn:1", "node:0", "node:41", "turn:2", "node:1"]
        );
        assert_eq!(monitor.laps(), 2);
    }

    #[test]
    fn turn_limit_reached_at_limit() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(2);
        assert!(!monitor.turn_limit_reached());
        for node in [5, 0, 5, 0] {
            monitor.observe(&frame(node, 0.0), &sink);
        }
        assert_eq!(monitor.laps(), 2);
        assert!(monitor.turn_limit_reached());
    }

    // ---- off-road ----

    #[test]
    fn off_road_fires_on_crossing_the_bound() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(1, 4.9), &sink);
        monitor.observe(&frame(1, 6.0), &sink);
        assert_eq!(sink.events(), vec!["node:1", "off_road:6"]);
    }

    #[test]
    fn off_road_does_not_refire_while_outside() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(1, 6.0), &sink);
        monitor.observe(&frame(1, 6.5), &sink);
        monitor.observe(&frame(1, 7.0), &sink);
        assert_eq!(sink.events(), vec!["node:1", "off_road:6"]);
    }

    #[test]
    fn off_road_rearms_after_returning() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(1, 6.0), &sink);
        monitor.observe(&frame(1, 0.5), &sink);
        monitor.observe(&frame(1, -7.0), &sink);
        assert_eq!(sink.events(), vec!["node:1", "off_road:6", "off_road:-7"]);
    }

    #[test]
    fn negative_excursion_counts() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(1, -5.1), &sink);
        assert_eq!(sink.events(), vec!["node:1", "off_road:-5.1"]);
    }

    #[test]
    fn bound_itself_is_still_on_the_road() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10);
        monitor.observe(&frame(1, 5.0), &sink);
        monitor.observe(&frame(1, -5.0), &sink);
        assert_eq!(sink.events(), vec!["node:1"]);
    }

    #[test]
    fn custom_bound_applies() {
        let sink = RecordingSink::default();
        let mut monitor = RunMonitor::new(10).with_cte_bound(1.0);
        monitor.observe(&frame(1, 1.5), &sink);
        assert_eq!(sink.events(), vec!["node:1", "off_road:1.5"]);
    }
}
