//! Error types for the rule cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Rule Cache Error Enum ==
/// Unified error type for the rule cache.
///
/// `Clone` so that a single failed computation can be handed to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleCacheError {
    /// The Producer returned an error or timed out. Never cached.
    #[error("Computation failed for {rule_type}/{key}: {cause}")]
    ComputeFailed {
        rule_type: String,
        key: String,
        cause: String,
    },

    /// A write lost the version race against a newer one
    #[error("Stale write for {rule_type}/{key}: version {attempted} does not exceed stored version {stored}")]
    StaleWrite {
        rule_type: String,
        key: String,
        attempted: u64,
        stored: u64,
    },

    /// Backend connectivity failure
    #[error("Entry store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid identity or payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RuleCacheError {
    /// Builds a `ComputeFailed` from a Producer error, keeping its full cause chain.
    pub fn compute_failed(rule_type: &str, key: &str, cause: &anyhow::Error) -> Self {
        RuleCacheError::ComputeFailed {
            rule_type: rule_type.to_string(),
            key: key.to_string(),
            cause: format!("{:#}", cause),
        }
    }

    /// Returns true for errors a caller may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RuleCacheError::ComputeFailed { .. } | RuleCacheError::StoreUnavailable(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the rule cache.
pub type Result<T> = std::result::Result<T, RuleCacheError>;
