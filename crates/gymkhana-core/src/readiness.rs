//! Readiness flags shared across the telegram, controller, and gate threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

// ---------------------------------------------------------------------------
// ReadinessState
// ---------------------------------------------------------------------------

/// Shared readiness flags for one evaluation run.
///
/// Three independent signals cross thread boundaries here:
/// - `car_is_ready`: the simulator finished loading the car (set by the
///   telegram dispatch path).
/// - `car_controller_is_ready`: the external controller reported in (set
///   from whatever context the controller runs on).
/// - `car_is_driving`: the readiness gate fired the run start.
///
/// The car flags are plain atomics. The controller flag is a mutex-guarded
/// bool paired with a condition variable so the gate parks instead of
/// polling and wakes the moment the controller signals.
#[derive(Debug, Default)]
pub struct ReadinessState {
    car_ready: AtomicBool,
    driving: AtomicBool,
    controller_ready: Mutex<bool>,
    controller_signal: Condvar,
}

impl ReadinessState {
    /// Create a state with all flags cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a `car_loaded` telegram has been dispatched.
    #[must_use]
    pub fn car_is_ready(&self) -> bool {
        self.car_ready.load(Ordering::SeqCst)
    }

    /// Mark the car loaded.
    pub fn set_car_ready(&self) {
        self.car_ready.store(true, Ordering::SeqCst);
    }

    /// True once the gate has fired the run start.
    #[must_use]
    pub fn car_is_driving(&self) -> bool {
        self.driving.load(Ordering::SeqCst)
    }

    /// Mark the run as started.
    pub fn set_driving(&self) {
        self.driving.store(true, Ordering::SeqCst);
    }

    /// True once the external controller has reported ready.
    #[must_use]
    pub fn controller_is_ready(&self) -> bool {
        *self
            .controller_ready
            .lock()
            .expect("readiness lock poisoned")
    }

    /// Mark the controller ready and wake any parked waiter.
    pub fn set_controller_ready(&self) {
        {
            let mut ready = self
                .controller_ready
                .lock()
                .expect("readiness lock poisoned");
            *ready = true;
        }
        self.controller_signal.notify_all();
        debug!("car controller reported ready");
    }

    /// Park until the controller is ready or `timeout` elapses.
    ///
    /// Each individual park is bounded by `recheck`, so the deadline is
    /// re-examined at least that often. A readiness signal wakes the waiter
    /// immediately. Returns true if readiness was observed before the
    /// deadline.
    pub fn wait_for_controller(&self, timeout: Duration, recheck: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ready = self
            .controller_ready
            .lock()
            .expect("readiness lock poisoned");
        while !*ready {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let park = (deadline - now).min(recheck);
            let (guard, _timed_out) = self
                .controller_signal
                .wait_timeout(ready, park)
                .expect("readiness lock poisoned");
            ready = guard;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
