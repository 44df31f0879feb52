//! Launch gate between car arrival and the start of driving.
//!
//! [`ReadinessGate`] owns the window in which the car is loaded but the
//! controller has not yet signalled it is ready. Arming the gate spawns a
//! background waiter that blocks on the controller condvar in
//! [`ReadinessState`] and resolves exactly once, either into a running
//! evaluation or a timeout. The resolution is delivered to the owning
//! thread over a channel rather than acted on inside the waiter.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gymkhana_core::config::EvaluatorConfig;
use gymkhana_core::readiness::ReadinessState;
use tracing::{debug, error, info};

// ---------------------------------------------------------------------------
// GatePhase
// ---------------------------------------------------------------------------

/// Lifecycle phase of the launch gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GatePhase {
    /// Before the car has loaded.
    #[default]
    Idle,
    /// Waiter spawned, blocking on the controller signal.
    WaitingForController,
    /// Controller arrived in time; the run is underway.
    Running,
    /// Controller never arrived; the run is abandoned.
    TimedOut,
}

impl GatePhase {
    /// Returns `true` once the gate has resolved (Running or TimedOut).
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Running | Self::TimedOut)
    }

    /// Returns `true` while the background waiter is parked.
    #[must_use]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::WaitingForController)
    }
}

// ---------------------------------------------------------------------------
// GateOutcome
// ---------------------------------------------------------------------------

/// Resolution of an armed gate, delivered over the outcome channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// The controller signalled ready and the run has started.
    Started,
    /// The controller stayed silent for the whole wait window.
    TimedOut {
        /// How long the waiter actually blocked.
        waited: Duration,
    },
}

// ---------------------------------------------------------------------------
// ReadinessGate
// ---------------------------------------------------------------------------

/// One-shot gate from `car_loaded` to the start of the evaluation run.
///
/// Repeated arming is a no-op: only the first `car_loaded` spawns a
/// waiter, and a resolved gate never rearms. The waiter parks on the
/// controller condvar in chunks of `check_interval` so the deadline is
/// honoured even if a wakeup is missed.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use gymkhana_core::{config::EvaluatorConfig, readiness::ReadinessState};
/// use gymkhana_evaluator::gate::{GatePhase, ReadinessGate};
///
/// let state = Arc::new(ReadinessState::new());
/// let gate = Arc::new(ReadinessGate::new(state, &EvaluatorConfig::default()));
/// assert_eq!(gate.phase(), GatePhase::Idle);
/// ```
pub struct ReadinessGate {
    state: Arc<ReadinessState>,
    max_wait: Duration,
    check_interval: Duration,
    launch_delay: Duration,
    phase: Mutex<GatePhase>,
    outcome_tx: Mutex<Option<Sender<GateOutcome>>>,
    outcome_rx: Mutex<Receiver<GateOutcome>>,
}

impl ReadinessGate {
    /// Build an idle gate over the shared readiness flags.
    #[must_use]
    pub fn new(state: Arc<ReadinessState>, config: &EvaluatorConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state,
            max_wait: config.max_wait_duration(),
            check_interval: config.check_interval_duration(),
            launch_delay: config.launch_delay_duration(),
            phase: Mutex::new(GatePhase::Idle),
            outcome_tx: Mutex::new(Some(tx)),
            outcome_rx: Mutex::new(rx),
        }
    }

    /// Current gate phase.
    #[must_use]
    pub fn phase(&self) -> GatePhase {
        *self.phase.lock().expect("gate phase lock poisoned")
    }

    /// Arm the gate, spawning the background waiter.
    ///
    /// Returns `true` if a waiter was spawned. Arming an already armed or
    /// resolved gate does nothing and returns `false`.
    pub fn arm(self: &Arc<Self>) -> bool {
        let tx = {
            let mut phase = self.phase.lock().expect("gate phase lock poisoned");
            if *phase != GatePhase::Idle {
                debug!(phase = ?*phase, "gate already armed; ignoring repeat car_loaded");
                return false;
            }
            let Some(tx) = self
                .outcome_tx
                .lock()
                .expect("gate sender lock poisoned")
                .take()
            else {
                return false;
            };
            *phase = GatePhase::WaitingForController;
            tx
        };

        info!(max_wait = ?self.max_wait, "car loaded; waiting for controller");
        let gate = Arc::clone(self);
        thread::spawn(move || gate.wait_for_resolution(&tx));
        true
    }

    /// Block until the gate resolves and return its outcome.
    ///
    /// Returns `None` once the single outcome has already been consumed.
    pub fn wait_outcome(&self) -> Option<GateOutcome> {
        self.outcome_rx
            .lock()
            .expect("gate receiver lock poisoned")
            .recv()
            .ok()
    }

    /// Like [`wait_outcome`](Self::wait_outcome) with an overall deadline.
    ///
    /// The limit covers the whole wait, including time before the gate is
    /// armed.
    pub fn wait_outcome_timeout(&self, limit: Duration) -> Result<GateOutcome, RecvTimeoutError> {
        self.outcome_rx
            .lock()
            .expect("gate receiver lock poisoned")
            .recv_timeout(limit)
    }

    /// Waiter body. Runs on the spawned thread; resolves the gate once.
    fn wait_for_resolution(&self, tx: &Sender<GateOutcome>) {
        let begun = Instant::now();
        if self.state.wait_for_controller(self.max_wait, self.check_interval) {
            if !self.launch_delay.is_zero() {
                debug!(delay = ?self.launch_delay, "controller ready; pausing before launch");
                thread::sleep(self.launch_delay);
            }
            self.state.set_driving();
            info!(waited = ?begun.elapsed(), "evaluation run started");
            self.resolve(tx, GatePhase::Running, GateOutcome::Started);
        } else {
            let waited = begun.elapsed();
            error!(?waited, "controller never became ready; abandoning run");
            self.resolve(tx, GatePhase::TimedOut, GateOutcome::TimedOut { waited });
        }
    }

    fn resolve(&self, tx: &Sender<GateOutcome>, phase: GatePhase, outcome: GateOutcome) {
        *self.phase.lock().expect("gate phase lock poisoned") = phase;
        // The owner may already have torn down its receiver; nothing left
        // to notify in that case.
        let _ = tx.send(outcome);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config(max_wait: f64, launch_delay: f64) -> EvaluatorConfig {
        EvaluatorConfig {
            turn_limit: 3,
            max_wait,
            check_interval: 0.005,
            launch_delay,
        }
    }

    fn gate_with(config: &EvaluatorConfig) -> (Arc<ReadinessGate>, Arc<ReadinessState>) {
        let state = Arc::new(ReadinessState::new());
        let gate = Arc::new(ReadinessGate::new(Arc::clone(&state), config));
        (gate, state)
    }

    // ---- phases ----

    #[test]
    fn phase_default_is_idle() {
        assert_eq!(GatePhase::default(), GatePhase::Idle);
    }

    #[test]
    fn phase_resolved_detection() {
        assert!(!GatePhase::Idle.is_resolved());
        assert!(!GatePhase::WaitingForController.is_resolved());
        assert!(GatePhase::Running.is_resolved());
        assert!(GatePhase::TimedOut.is_resolved());
    }

    #[test]
    fn phase_waiting_detection() {
        assert!(!GatePhase::Idle.is_waiting());
        assert!(GatePhase::WaitingForController.is_waiting());
        assert!(!GatePhase::Running.is_waiting());
        assert!(!GatePhase::TimedOut.is_waiting());
    }

    // ---- arming ----

    #[test]
    fn new_gate_is_idle() {
        let (gate, _) = gate_with(&quick_config(1.0, 0.0));
        assert_eq!(gate.phase(), GatePhase::Idle);
    }

    #[test]
    fn arm_spawns_single_waiter() {
        let (gate, _) = gate_with(&quick_config(5.0, 0.0));
        assert!(gate.arm());
        assert_eq!(gate.phase(), GatePhase::WaitingForController);
        // A repeat car_loaded does not spawn a second waiter.
        assert!(!gate.arm());
    }

    // ---- resolution ----

    #[test]
    fn controller_ready_resolves_started() {
        let (gate, state) = gate_with(&quick_config(5.0, 0.0));
        assert!(gate.arm());
        state.set_controller_ready();

        assert_eq!(gate.wait_outcome(), Some(GateOutcome::Started));
        assert_eq!(gate.phase(), GatePhase::Running);
        assert!(state.car_is_driving());
    }

    #[test]
    fn silent_controller_resolves_timed_out() {
        let (gate, state) = gate_with(&quick_config(0.03, 0.0));
        assert!(gate.arm());

        match gate.wait_outcome() {
            Some(GateOutcome::TimedOut { waited }) => {
                assert!(waited >= Duration::from_millis(30));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(gate.phase(), GatePhase::TimedOut);
        assert!(!state.car_is_driving());
    }

    #[test]
    fn launch_delay_runs_before_start() {
        let (gate, state) = gate_with(&quick_config(5.0, 0.05));
        assert!(gate.arm());

        let begun = Instant::now();
        state.set_controller_ready();
        assert_eq!(gate.wait_outcome(), Some(GateOutcome::Started));
        assert!(begun.elapsed() >= Duration::from_millis(50));
        assert!(state.car_is_driving());
    }

    #[test]
    fn resolved_gate_does_not_rearm() {
        let (gate, _) = gate_with(&quick_config(0.02, 0.0));
        assert!(gate.arm());
        let _ = gate.wait_outcome();
        assert_eq!(gate.phase(), GatePhase::TimedOut);
        assert!(!gate.arm());
        assert_eq!(gate.phase(), GatePhase::TimedOut);
    }

    #[test]
    fn second_wait_sees_closed_channel() {
        let (gate, state) = gate_with(&quick_config(5.0, 0.0));
        assert!(gate.arm());
        state.set_controller_ready();

        assert_eq!(gate.wait_outcome(), Some(GateOutcome::Started));
        // The waiter dropped the sender with the single outcome delivered.
        assert_eq!(gate.wait_outcome(), None);
    }

    #[test]
    fn wait_outcome_timeout_expires_when_unarmed() {
        let (gate, _) = gate_with(&quick_config(5.0, 0.0));
        let err = gate
            .wait_outcome_timeout(Duration::from_millis(10))
            .unwrap_err();
        assert_eq!(err, RecvTimeoutError::Timeout);
        assert_eq!(gate.phase(), GatePhase::Idle);
    }

    #[test]
    fn wait_outcome_timeout_delivers_started() {
        let (gate, state) = gate_with(&quick_config(5.0, 0.0));
        assert!(gate.arm());
        state.set_controller_ready();
        let outcome = gate.wait_outcome_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome, GateOutcome::Started);
    }

    // ---- Send + Sync ----

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn gate_is_send_sync() {
        assert_send_sync::<ReadinessGate>();
        assert_send_sync::<GatePhase>();
        assert_send_sync::<GateOutcome>();
    }
}
