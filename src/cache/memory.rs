//! In-Memory Entry Store Module
//!
//! Reference [`EntryStore`] backend combining HashMap storage with an expiry index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::cache::{EntryId, EntryStore, ExpiredEntry, ExpiryIndex, RuleCacheEntry};
use crate::error::{Result, RuleCacheError};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<EntryId, RuleCacheEntry>,
    index: ExpiryIndex,
    /// Version high-water mark per identity; outlives deleted entries
    versions: HashMap<EntryId, u64>,
}

impl Inner {
    fn remove(&mut self, id: &EntryId) -> Option<RuleCacheEntry> {
        let removed = self.entries.remove(id)?;
        self.index.remove(id, removed.expires_at);
        Some(removed)
    }

    fn latest_version(&self, id: &EntryId) -> u64 {
        self.versions.get(id).copied().unwrap_or(0)
    }

    /// Removes the entry and burns one version.
    fn retire(&mut self, id: &EntryId) -> bool {
        let removed = self.remove(id).is_some();
        *self.versions.entry(id.clone()).or_insert(0) += 1;
        removed
    }
}

// == Memory Entry Store ==
/// Entries, their expiry index and the version high-water marks behind a
/// single lock, so every mutation updates all three for its identity.
///
/// High-water marks are kept for every identity ever written, one `u64` each.
#[derive(Debug)]
pub struct MemoryEntryStore {
    inner: RwLock<Inner>,
    available: AtomicBool,
}

impl MemoryEntryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            available: AtomicBool::new(true),
        }
    }

    // == Availability ==
    /// Takes the store offline or back online. While offline every operation
    /// fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RuleCacheError::StoreUnavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }
}

impl Default for MemoryEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn get(&self, id: &EntryId) -> Result<Option<RuleCacheEntry>> {
        self.ensure_available()?;
        Ok(self.inner.read().await.entries.get(id).cloned())
    }

    async fn latest_version(&self, id: &EntryId) -> Result<u64> {
        self.ensure_available()?;
        Ok(self.inner.read().await.latest_version(id))
    }

    async fn put(&self, entry: RuleCacheEntry) -> Result<()> {
        self.ensure_available()?;
        let mut inner = self.inner.write().await;

        let latest = inner.latest_version(&entry.id);
        if entry.version <= latest {
            return Err(RuleCacheError::StaleWrite {
                rule_type: entry.id.rule_type.clone(),
                key: entry.id.key.clone(),
                attempted: entry.version,
                stored: latest,
            });
        }

        inner.remove(&entry.id);
        inner.index.insert(entry.id.clone(), entry.expires_at);
        inner.versions.insert(entry.id.clone(), entry.version);
        inner.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.inner.write().await.retire(id))
    }

    async fn delete_type(&self, rule_type: &str) -> Result<u64> {
        self.ensure_available()?;
        let mut inner = self.inner.write().await;

        let ids: Vec<EntryId> = inner
            .versions
            .keys()
            .filter(|id| id.rule_type == rule_type)
            .cloned()
            .collect();

        let mut removed = 0;
        for id in &ids {
            if inner.retire(id) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn compare_and_delete(&self, id: &EntryId, version: u64) -> Result<bool> {
        self.ensure_available()?;
        let mut inner = self.inner.write().await;

        let matches = inner
            .entries
            .get(id)
            .map_or(false, |stored| stored.version == version);
        if matches {
            inner.remove(id);
        }
        Ok(matches)
    }

    async fn list_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        rule_type: Option<&str>,
    ) -> Result<Vec<ExpiredEntry>> {
        self.ensure_available()?;
        let inner = self.inner.read().await;

        Ok(inner
            .index
            .range_before(cutoff, rule_type)
            .into_iter()
            .filter_map(|id| {
                inner.entries.get(&id).map(|entry| ExpiredEntry {
                    version: entry.version,
                    expires_at: entry.expires_at,
                    id,
                })
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        self.ensure_available()?;
        Ok(self.inner.read().await.entries.len())
    }
}
