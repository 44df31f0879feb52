use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid max_wait: {0} (must be a positive number of seconds)")]
    InvalidMaxWait(f64),

    #[error("Invalid check_interval: {0} (must be a positive number of seconds)")]
    InvalidCheckInterval(f64),

    #[error("check_interval must be <= max_wait")]
    CheckIntervalExceedsMaxWait,

    #[error("Invalid launch_delay: {0} (must be a finite, non-negative number of seconds)")]
    InvalidLaunchDelay(f64),

    #[error("turn_limit must be >= 1")]
    ZeroTurnLimit,
}
