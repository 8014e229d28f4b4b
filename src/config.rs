//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Sweep interval used when none, or zero, is configured
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

// == Compute Mode ==
/// Where a miss computation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeMode {
    /// On its own tokio task; finishes and fills the cache even if every
    /// waiter goes away.
    #[default]
    Spawned,
    /// On the waiting callers' tasks; stops once none of them is left.
    Inline,
}

impl FromStr for ComputeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spawned" => Ok(ComputeMode::Spawned),
            "inline" => Ok(ComputeMode::Inline),
            other => Err(format!("unknown compute mode: {}", other)),
        }
    }
}

/// Rule cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Seconds an entry stays past expiry before the sweep may delete it
    pub grace_period: u64,
    /// Service-side Producer timeout in milliseconds, 0 = none
    pub compute_timeout_ms: u64,
    /// Where miss computations run
    pub compute_mode: ComputeMode,
    /// Optional JSON seed file for the binary
    pub seed_file: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds, must be positive (default: 30)
    /// - `GRACE_PERIOD` - Grace after expiry in seconds (default: 5)
    /// - `COMPUTE_TIMEOUT_MS` - Producer timeout, 0 disables (default: 0)
    /// - `COMPUTE_MODE` - `spawned` or `inline` (default: spawned)
    /// - `SEED_FILE` - Path to a JSON seed file (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sweep_interval: parse_var("SWEEP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sweep_interval),
            grace_period: parse_var("GRACE_PERIOD").unwrap_or(defaults.grace_period),
            compute_timeout_ms: parse_var("COMPUTE_TIMEOUT_MS")
                .unwrap_or(defaults.compute_timeout_ms),
            compute_mode: parse_var("COMPUTE_MODE").unwrap_or(defaults.compute_mode),
            seed_file: env::var("SEED_FILE").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period)
    }

    /// `None` when no service-side timeout is configured.
    pub fn compute_timeout(&self) -> Option<Duration> {
        (self.compute_timeout_ms > 0).then(|| Duration::from_millis(self.compute_timeout_ms))
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL.as_secs(),
            grace_period: 5,
            compute_timeout_ms: 0,
            compute_mode: ComputeMode::Spawned,
            seed_file: None,
        }
    }
}
