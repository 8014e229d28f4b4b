//! Entry Store Module
//!
//! The contract a backing store must satisfy to hold rule cache entries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache::{EntryId, RuleCacheEntry};
use crate::error::Result;

// == Expired Entry ==
/// An identity selected for reaping, with the version and expiry observed
/// when it was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredEntry {
    pub id: EntryId,
    pub version: u64,
    pub expires_at: DateTime<Utc>,
}

// == Entry Store Trait ==
/// Keyed storage for rule cache entries with an expiry range index.
///
/// Implementations must keep their expiry index consistent with the entries
/// for each identity on every `put` and delete. No cross-identity transaction
/// is required.
///
/// Versions are tracked per identity as a high-water mark that survives
/// physical deletion, so a version number is never reused for an identity. Connectivity failures are reported as
/// [`RuleCacheError::StoreUnavailable`](crate::error::RuleCacheError::StoreUnavailable).
#[async_trait]
pub trait EntryStore: Send + Sync + 'static {
    /// Returns the stored entry, stale or not.
    async fn get(&self, id: &EntryId) -> Result<Option<RuleCacheEntry>>;

    /// Highest version ever written or retired for `id`, 0 if none.
    async fn latest_version(&self, id: &EntryId) -> Result<u64>;

    /// Upserts `entry`.
    ///
    /// Fails with `StaleWrite` unless `entry.version` is greater than
    /// [`latest_version`](Self::latest_version).
    async fn put(&self, entry: RuleCacheEntry) -> Result<()>;

    /// Removes the entry unconditionally and retires the next version, so a
    /// write prepared before the delete fails with `StaleWrite`. Applies
    /// whether or not an entry existed. Returns whether one existed.
    async fn delete(&self, id: &EntryId) -> Result<bool>;

    /// Like [`delete`](Self::delete) for every identity of `rule_type` the
    /// store has seen. Returns how many entries were removed.
    async fn delete_type(&self, rule_type: &str) -> Result<u64>;

    /// Removes the entry only if its stored version equals `version`. The
    /// version stays retired.
    async fn compare_and_delete(&self, id: &EntryId, version: u64) -> Result<bool>;

    /// Lists entries with `expires_at <= cutoff`, soonest first.
    async fn list_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        rule_type: Option<&str>,
    ) -> Result<Vec<ExpiredEntry>>;

    /// Number of physically stored entries, stale ones included.
    async fn len(&self) -> Result<usize>;
}

#[async_trait]
impl<T: EntryStore> EntryStore for std::sync::Arc<T> {
    async fn get(&self, id: &EntryId) -> Result<Option<RuleCacheEntry>> {
        (**self).get(id).await
    }

    async fn latest_version(&self, id: &EntryId) -> Result<u64> {
        (**self).latest_version(id).await
    }

    async fn put(&self, entry: RuleCacheEntry) -> Result<()> {
        (**self).put(entry).await
    }

    async fn delete(&self, id: &EntryId) -> Result<bool> {
        (**self).delete(id).await
    }

    async fn delete_type(&self, rule_type: &str) -> Result<u64> {
        (**self).delete_type(rule_type).await
    }

    async fn compare_and_delete(&self, id: &EntryId, version: u64) -> Result<bool> {
        (**self).compare_and_delete(id, version).await
    }

    async fn list_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        rule_type: Option<&str>,
    ) -> Result<Vec<ExpiredEntry>> {
        (**self).list_expired_before(cutoff, rule_type).await
    }

    async fn len(&self) -> Result<usize> {
        (**self).len().await
    }
}
