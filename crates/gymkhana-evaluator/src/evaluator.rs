//! Run orchestration on top of an arbitrary event sink.
//!
//! [`Evaluator`] decorates a user-provided [`EventHandler`]: every
//! callback is forwarded unchanged, and on top of that `car_loaded` arms
//! the [`ReadinessGate`] and telemetry frames feed the [`RunMonitor`].
//! The owning thread learns whether the run started through
//! [`Evaluator::wait_for_start`].

use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gymkhana_client::handler::EventHandler;
use gymkhana_client::protocol::Telemetry;
use gymkhana_core::config::EvaluatorConfig;
use gymkhana_core::readiness::ReadinessState;
use thiserror::Error;

use crate::gate::{GateOutcome, GatePhase, ReadinessGate};
use crate::monitor::RunMonitor;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced while waiting for the evaluation run to start.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The gate was armed but the controller stayed silent.
    #[error("no car controller ready to drive after {waited:?}")]
    ControllerTimeout {
        /// How long the gate waited before giving up.
        waited: Duration,
    },

    /// The overall deadline passed without the gate resolving.
    #[error("run did not start within {limit:?}")]
    StartDeadline {
        /// The caller-imposed deadline.
        limit: Duration,
    },

    /// The single gate outcome was already consumed.
    #[error("readiness gate already resolved; no further outcome will arrive")]
    GateSpent,
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Sink decorator that runs the launch gate and the run monitor.
///
/// Wire an `Evaluator` between the client and the driving logic: the
/// client dispatches into the evaluator, the evaluator forwards into the
/// inner sink and keeps the run bookkeeping on the side.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use gymkhana_client::NoopHandler;
/// use gymkhana_core::config::EvaluatorConfig;
/// use gymkhana_evaluator::Evaluator;
///
/// let sink = Arc::new(NoopHandler::new());
/// let evaluator = Evaluator::new(sink, &EvaluatorConfig::default());
/// assert_eq!(evaluator.laps(), 0);
/// ```
pub struct Evaluator {
    inner: Arc<dyn EventHandler>,
    gate: Arc<ReadinessGate>,
    monitor: Mutex<RunMonitor>,
}

impl Evaluator {
    /// Wrap `inner`, sharing its readiness flags with the gate.
    #[must_use]
    pub fn new(inner: Arc<dyn EventHandler>, config: &EvaluatorConfig) -> Self {
        let gate = Arc::new(ReadinessGate::new(Arc::clone(inner.readiness()), config));
        let monitor = Mutex::new(RunMonitor::new(config.turn_limit));
        Self {
            inner,
            gate,
            monitor,
        }
    }

    /// Block until the gate resolves.
    ///
    /// Blocks indefinitely if the car never loads; once the gate is armed
    /// the wait is bounded by the configured `max_wait` plus the launch
    /// delay.
    pub fn wait_for_start(&self) -> Result<(), EvaluatorError> {
        match self.gate.wait_outcome() {
            Some(GateOutcome::Started) => Ok(()),
            Some(GateOutcome::TimedOut { waited }) => {
                Err(EvaluatorError::ControllerTimeout { waited })
            }
            None => Err(EvaluatorError::GateSpent),
        }
    }

    /// Like [`wait_for_start`](Self::wait_for_start) with an overall
    /// deadline covering the time before the car loads as well.
    pub fn wait_for_start_timeout(&self, limit: Duration) -> Result<(), EvaluatorError> {
        match self.gate.wait_outcome_timeout(limit) {
            Ok(GateOutcome::Started) => Ok(()),
            Ok(GateOutcome::TimedOut { waited }) => {
                Err(EvaluatorError::ControllerTimeout { waited })
            }
            Err(RecvTimeoutError::Timeout) => Err(EvaluatorError::StartDeadline { limit }),
            Err(RecvTimeoutError::Disconnected) => Err(EvaluatorError::GateSpent),
        }
    }

    /// Completed laps so far.
    #[must_use]
    pub fn laps(&self) -> u32 {
        self.monitor.lock().expect("run monitor lock poisoned").laps()
    }

    /// Whether the run has reached its lap limit.
    #[must_use]
    pub fn turn_limit_reached(&self) -> bool {
        self.monitor
            .lock()
            .expect("run monitor lock poisoned")
            .turn_limit_reached()
    }

    /// Current phase of the launch gate.
    #[must_use]
    pub fn gate_phase(&self) -> GatePhase {
        self.gate.phase()
    }
}

impl EventHandler for Evaluator {
    fn readiness(&self) -> &Arc<ReadinessState> {
        self.inner.readiness()
    }

    fn on_scene_selection_ready(&self) {
        self.inner.on_scene_selection_ready();
    }

    fn on_scene_loaded(&self) {
        self.inner.on_scene_loaded();
    }

    fn on_car_loaded(&self) {
        self.inner.on_car_loaded();
        self.gate.arm();
    }

    fn on_telemetry(&self, frame: &Telemetry) {
        self.inner.on_telemetry(frame);
        self.monitor
            .lock()
            .expect("run monitor lock poisoned")
            .observe(frame, self.inner.as_ref());
    }

    fn on_exit_scene(&self) {
        self.inner.on_exit_scene();
    }

    fn on_quit_app(&self) {
        self.inner.on_quit_app();
    }

    fn each_turn(&self, turn: u32) {
        self.inner.each_turn(turn);
    }

    fn each_node(&self, node: i64) {
        self.inner.each_node(node);
    }

    fn on_car_leaving_road(&self, cte: f64) {
        self.inner.on_car_leaving_road(cte);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
