// gymkhana-core: Config, readiness flags, and errors for the Gymkhana evaluation harness.

pub mod config;
pub mod error;
pub mod readiness;
