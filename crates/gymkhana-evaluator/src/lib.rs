//! Evaluation-run orchestration for the simulator client.
//!
//! Plugs into the [`gymkhana_client`] event sink seam and manages the
//! lifecycle of one evaluation run:
//!
//! - [`gate`] — [`ReadinessGate`], the one-shot wait between the car
//!   loading and the controller signalling it is ready to drive
//! - [`monitor`] — [`RunMonitor`], lap counting and off-road detection
//!   over the telemetry stream
//! - [`evaluator`](mod@evaluator) — [`Evaluator`], a sink decorator that ties the
//!   gate and the monitor to the callback flow

pub mod evaluator;
pub mod gate;
pub mod monitor;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use evaluator::{Evaluator, EvaluatorError};
pub use gate::{GateOutcome, GatePhase, ReadinessGate};
pub use monitor::{DEFAULT_CTE_BOUND, RunMonitor};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        DEFAULT_CTE_BOUND, Evaluator, EvaluatorError, GateOutcome, GatePhase, ReadinessGate,
        RunMonitor,
    };
}
