//! Event sink trait for decoded telegrams.

use std::sync::Arc;

use gymkhana_core::readiness::ReadinessState;

use crate::protocol::Telemetry;

// ---------------------------------------------------------------------------
// EventHandler
// ---------------------------------------------------------------------------

/// Receiver of decoded simulator events.
///
/// Every callback defaults to a no-op so a sink implements only what it
/// cares about. A sink owns (or shares) one [`ReadinessState`], exposed via
/// [`EventHandler::readiness`]; the client flips `car_is_ready` through it
/// and the readiness gate parks on it.
///
/// The first four callbacks are wire-dispatched. The rest are driven by the
/// harness: `each_node` / `each_turn` / `on_car_leaving_road` from the run
/// monitor as telemetry is digested, and `on_exit_scene` / `on_quit_app`
/// when a run is wound down.
pub trait EventHandler: Send + Sync {
    /// Readiness flags owned by this sink.
    fn readiness(&self) -> &Arc<ReadinessState>;

    /// The simulator menu is up; scenes can be listed and loaded.
    fn on_scene_selection_ready(&self) {}

    /// The requested scene finished loading.
    fn on_scene_loaded(&self) {}

    /// The car spawned in the scene.
    fn on_car_loaded(&self) {}

    /// One telemetry frame arrived.
    fn on_telemetry(&self, _frame: &Telemetry) {}

    /// The harness is leaving the current scene.
    fn on_exit_scene(&self) {}

    /// The harness is shutting the simulator down.
    fn on_quit_app(&self) {}

    /// A lap completed; `turn` is the total completed so far.
    fn each_turn(&self, _turn: u32) {}

    /// The car reached a new track node.
    fn each_node(&self, _node: i64) {}

    /// |cte| crossed the configured bound.
    fn on_car_leaving_road(&self, _cte: f64) {}
}

// ---------------------------------------------------------------------------
// NoopHandler
// ---------------------------------------------------------------------------

/// A sink that tracks readiness and ignores every event.
#[derive(Debug, Default)]
pub struct NoopHandler {
    readiness: Arc<ReadinessState>,
}

impl NoopHandler {
    /// Sink with a fresh readiness state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink sharing an existing readiness state.
    #[must_use]
    pub fn with_state(readiness: Arc<ReadinessState>) -> Self {
        Self { readiness }
    }
}

impl EventHandler for NoopHandler {
    fn readiness(&self) -> &Arc<ReadinessState> {
        &self.readiness
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
