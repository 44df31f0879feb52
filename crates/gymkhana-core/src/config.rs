use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_turn_limit() -> u32 {
    10
}
const fn default_max_wait() -> f64 {
    600.0
}
const fn default_check_interval() -> f64 {
    1.0 / 60.0
}
const fn default_launch_delay() -> f64 {
    5.0
}

// ---------------------------------------------------------------------------
// EvaluatorConfig
// ---------------------------------------------------------------------------

/// Evaluation run configuration, captured once at Evaluator construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Completed track laps that end a run (default: 10).
    #[serde(default = "default_turn_limit")]
    pub turn_limit: u32,

    /// Maximum time in seconds to wait for the car controller after the car
    /// is loaded (default: 600).
    #[serde(default = "default_max_wait")]
    pub max_wait: f64,

    /// Upper bound in seconds on a single wait park; the deadline is
    /// re-checked at least this often (default: 1/60).
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,

    /// Pause in seconds between observing controller readiness and firing
    /// the run start (default: 5).
    #[serde(default = "default_launch_delay")]
    pub launch_delay: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            turn_limit: default_turn_limit(),
            max_wait: default_max_wait(),
            check_interval: default_check_interval(),
            launch_delay: default_launch_delay(),
        }
    }
}

impl EvaluatorConfig {
    /// Validate configuration. Returns Err on invalid values.
    ///
    /// The duration accessors convert through [`Duration::from_secs_f64`],
    /// which panics on negative or non-finite input, so every time field
    /// must pass this check before those are used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_wait.is_finite() || self.max_wait <= 0.0 {
            return Err(ConfigError::InvalidMaxWait(self.max_wait));
        }
        if !self.check_interval.is_finite() || self.check_interval <= 0.0 {
            return Err(ConfigError::InvalidCheckInterval(self.check_interval));
        }
        if self.check_interval > self.max_wait {
            return Err(ConfigError::CheckIntervalExceedsMaxWait);
        }
        if !self.launch_delay.is_finite() || self.launch_delay < 0.0 {
            return Err(ConfigError::InvalidLaunchDelay(self.launch_delay));
        }
        if self.turn_limit == 0 {
            return Err(ConfigError::ZeroTurnLimit);
        }
        Ok(())
    }

    /// Controller wait deadline as a [`Duration`].
    #[must_use]
    pub fn max_wait_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_wait)
    }

    /// Per-park bound as a [`Duration`].
    #[must_use]
    pub fn check_interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.check_interval)
    }

    /// Pre-launch pause as a [`Duration`].
    #[must_use]
    pub fn launch_delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.launch_delay)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
