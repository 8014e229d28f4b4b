//! Rule Cache Entry Module
//!
//! Defines entry identity and the stored entry with its validity window.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{MAX_KEY_LENGTH, MAX_PAYLOAD_SIZE};
use crate::error::{Result, RuleCacheError};

// == Entry Id ==
/// Unique identity of a cached rule: `(rule_type, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryId {
    /// Category of cached rule, e.g. "segmentation"
    pub rule_type: String,
    /// Subject within the rule type, e.g. a customer id
    pub key: String,
}

impl EntryId {
    pub fn new(rule_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            rule_type: rule_type.into(),
            key: key.into(),
        }
    }

    // == Validate ==
    /// Checks that both parts are non-empty and within [`MAX_KEY_LENGTH`].
    pub fn validate(&self) -> Result<()> {
        for (name, part) in [("rule type", &self.rule_type), ("key", &self.key)] {
            if part.is_empty() {
                return Err(RuleCacheError::InvalidRequest(format!(
                    "{} cannot be empty",
                    name
                )));
            }
            if part.len() > MAX_KEY_LENGTH {
                return Err(RuleCacheError::InvalidRequest(format!(
                    "{} exceeds maximum length of {} bytes",
                    name, MAX_KEY_LENGTH
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rule_type, self.key)
    }
}

// == Rule Cache Entry ==
/// A stored rule payload with its validity window and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCacheEntry {
    #[serde(flatten)]
    pub id: EntryId,
    /// Opaque computed payload, never interpreted by the cache
    pub payload: Vec<u8>,
    /// Time of last (re)computation
    pub created_at: DateTime<Utc>,
    /// Time after which the entry is stale
    pub expires_at: DateTime<Utc>,
    /// Strictly increasing per identity, across deletes too
    pub version: u64,
}

impl RuleCacheEntry {
    // == Constructor ==
    /// Creates an entry valid for `ttl` from `now`.
    ///
    /// Rejects a non-positive TTL, since `expires_at` must be strictly after
    /// `created_at`, and payloads larger than [`MAX_PAYLOAD_SIZE`].
    pub fn new(
        id: EntryId,
        payload: Vec<u8>,
        now: DateTime<Utc>,
        ttl: std::time::Duration,
        version: u64,
    ) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RuleCacheError::InvalidRequest(format!(
                "payload exceeds maximum size of {} bytes",
                MAX_PAYLOAD_SIZE
            )));
        }

        let ttl = Duration::from_std(ttl)
            .map_err(|_| RuleCacheError::InvalidRequest("ttl is out of range".to_string()))?;
        if ttl <= Duration::zero() {
            return Err(RuleCacheError::InvalidRequest(
                "ttl must be greater than zero".to_string(),
            ));
        }

        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| RuleCacheError::InvalidRequest("ttl is out of range".to_string()))?;

        Ok(Self {
            id,
            payload,
            created_at: now,
            expires_at,
            version,
        })
    }

    // == Is Expired ==
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
