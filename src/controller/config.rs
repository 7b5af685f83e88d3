//! Process-wide configuration for the operator
//!
//! The three knobs are read once at startup and passed into the shared
//! [`Context`](crate::controller::Context) as immutable configuration.

use std::time::Duration;

use tracing::warn;

/// Operator configuration
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Maximum number of clusters reconciled in parallel
    pub reconcile_concurrency: u16,
    /// Delay before a failed reconcile is retried
    pub requeue_duration: Duration,
    /// Delete autoscaler-nominated victims before measuring residual drift
    pub prioritize_workers_to_delete: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            reconcile_concurrency: 1,
            requeue_duration: Duration::from_secs(2),
            prioritize_workers_to_delete: false,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from the environment, falling back to defaults
    ///
    /// Unparseable values are logged and replaced by the default rather than
    /// aborting startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let reconcile_concurrency = parse_env(
            "RECONCILE_CONCURRENCY",
            defaults.reconcile_concurrency,
            |raw| raw.parse::<u16>().ok().filter(|n| *n > 0),
        );
        let requeue_duration = parse_env(
            "DEFAULT_REQUEUE_SECONDS",
            defaults.requeue_duration,
            |raw| raw.parse::<u64>().ok().map(Duration::from_secs),
        );
        let prioritize_workers_to_delete = parse_env(
            "PRIORITIZE_WORKERS_TO_DELETE",
            defaults.prioritize_workers_to_delete,
            |raw| raw.parse::<bool>().ok(),
        );

        Self {
            reconcile_concurrency,
            requeue_duration,
            prioritize_workers_to_delete,
        }
    }
}

fn parse_env<T>(key: &str, default: T, parse: impl FnOnce(&str) -> Option<T>) -> T {
    match std::env::var(key) {
        Ok(raw) => parse(&raw).unwrap_or_else(|| {
            warn!(%key, value = %raw, "ignoring unparseable environment value");
            default
        }),
        Err(_) => default,
    }
}
