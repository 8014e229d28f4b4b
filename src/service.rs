//! Rule Cache Service
//!
//! Orchestrates lookups, miss computation, invalidation and sweeping over an
//! [`EntryStore`] and a [`Producer`].
//!
//! Concurrent misses on one identity share a single computation. The table of
//! in-flight computations is guarded by a mutex that is only held to look up,
//! insert or remove a flight, never across a Producer call or a store call.
//!
//! Every write carries the store's latest version plus one, read before the
//! Producer is called. Invalidation retires a version in the store, so a
//! computation that started before it can never land.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, Clock, EntryId, EntryStore, RuleCacheEntry, StatsRecorder, SystemClock,
};
use crate::config::{ComputeMode, Config};
use crate::error::{Result, RuleCacheError};
use crate::producer::{Computed, Producer};

type FlightFuture = BoxFuture<'static, Result<Vec<u8>>>;

type FlightTable = HashMap<EntryId, Flight>;

// == Flight ==
/// A registered in-flight computation.
struct Flight {
    token: u64,
    handle: FlightHandle,
}

enum FlightHandle {
    /// A spawned computation runs to completion on its own, so it stays
    /// joinable until it deregisters itself.
    Strong(Shared<FlightFuture>),
    /// An inline computation lives only as long as some waiter polls it.
    Weak(WeakShared<FlightFuture>),
}

impl Flight {
    fn join(&self) -> Option<Shared<FlightFuture>> {
        match &self.handle {
            FlightHandle::Strong(shared) => Some(shared.clone()),
            FlightHandle::Weak(weak) => weak.upgrade(),
        }
    }
}

/// Deregisters a flight when its computation ends, is cancelled or panics.
struct FlightGuard<'a> {
    flights: &'a Mutex<FlightTable>,
    id: &'a EntryId,
    token: u64,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flights = lock_table(self.flights);
        if flights.get(self.id).map_or(false, |flight| flight.token == self.token) {
            flights.remove(self.id);
        }
    }
}

fn lock_table(flights: &Mutex<FlightTable>) -> MutexGuard<'_, FlightTable> {
    flights.lock().unwrap_or_else(|e| e.into_inner())
}

// == Service Options ==
/// Tunables for [`RuleCacheService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// How long past expiry an entry survives before `reap` may delete it
    pub grace_period: Duration,
    /// Service-side limit on a Producer call
    pub compute_timeout: Option<Duration>,
    /// Where miss computations run
    pub compute_mode: ComputeMode,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            grace_period: config.grace_period(),
            compute_timeout: config.compute_timeout(),
            compute_mode: config.compute_mode,
        }
    }
}

// == Reap Report ==
/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Entries selected from the expiry index
    pub scanned: usize,
    /// Entries deleted
    pub removed: usize,
    /// Entries left alone because they were refreshed or already gone
    pub skipped: usize,
    /// Entries whose delete failed; retried on the next sweep
    pub failed: usize,
}

struct Inner<S, P> {
    store: S,
    producer: P,
    clock: Arc<dyn Clock>,
    flights: Mutex<FlightTable>,
    next_token: AtomicU64,
    stats: StatsRecorder,
    options: ServiceOptions,
}

// == Rule Cache Service ==
/// TTL rule cache with singleflight miss coalescing.
///
/// Cloning is cheap and every clone shares the same store, producer and
/// in-flight table.
pub struct RuleCacheService<S, P> {
    inner: Arc<Inner<S, P>>,
}

impl<S, P> Clone for RuleCacheService<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: EntryStore, P: Producer> RuleCacheService<S, P> {
    // == Constructors ==
    /// Creates a service on the system clock with default options.
    pub fn new(store: S, producer: P) -> Self {
        Self::with_options(store, producer, Arc::new(SystemClock), ServiceOptions::default())
    }

    /// Creates a service from configuration.
    pub fn from_config(store: S, producer: P, config: &Config) -> Self {
        Self::with_options(store, producer, Arc::new(SystemClock), ServiceOptions::from(config))
    }

    pub fn with_options(
        store: S,
        producer: P,
        clock: Arc<dyn Clock>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                producer,
                clock,
                flights: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
                stats: StatsRecorder::new(),
                options,
            }),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // == Get ==
    /// Returns the payload for `(rule_type, key)`, computing it on a miss.
    ///
    /// A live entry is returned as-is. An absent or expired one joins the
    /// computation already in flight for this identity, or starts one.
    /// Producer failures surface as `ComputeFailed` and are not cached.
    pub async fn get(&self, rule_type: &str, key: &str) -> Result<Vec<u8>> {
        let id = EntryId::new(rule_type, key);
        id.validate()?;

        if let Some(entry) = self.inner.store.get(&id).await? {
            if !entry.is_expired_at(self.inner.clock.now()) {
                self.inner.stats.record_hit();
                debug!(version = entry.version, "Cache hit for {}", id);
                return Ok(entry.payload);
            }
        }

        self.inner.stats.record_miss();
        debug!("Cache miss for {}", id);
        self.join_flight(id).await
    }

    // == Peek ==
    /// Returns the live entry without ever computing one.
    pub async fn peek(&self, rule_type: &str, key: &str) -> Result<Option<RuleCacheEntry>> {
        let id = EntryId::new(rule_type, key);
        id.validate()?;

        let now = self.inner.clock.now();
        Ok(self
            .inner
            .store
            .get(&id)
            .await?
            .filter(|entry| !entry.is_expired_at(now)))
    }

    // == Put ==
    /// Writes a payload directly, e.g. to warm the cache.
    ///
    /// Returns the version written, or `None` if a concurrent writer got a
    /// newer version in first.
    pub async fn put(
        &self,
        rule_type: &str,
        key: &str,
        payload: Vec<u8>,
        ttl: Duration,
    ) -> Result<Option<u64>> {
        let id = EntryId::new(rule_type, key);
        id.validate()?;

        let base_version = self.inner.store.latest_version(&id).await?;
        let entry = RuleCacheEntry::new(id, payload, self.inner.clock.now(), ttl, base_version + 1)?;
        self.inner.write(entry).await
    }

    // == Invalidate ==
    /// Deletes the entry for `(rule_type, key)` regardless of expiry.
    ///
    /// Any computation in flight for it is detached first, so the next `get`
    /// calls the Producer again. Its callers still get their result, but
    /// the store rejects its write. Returns whether an entry was deleted.
    pub async fn invalidate(&self, rule_type: &str, key: &str) -> Result<bool> {
        let id = EntryId::new(rule_type, key);
        id.validate()?;

        self.inner.detach_flights(|flight_id| *flight_id == id);
        let removed = self.inner.store.delete(&id).await?;
        if removed {
            self.inner.stats.record_invalidations(1);
        }

        info!("Invalidated {} (removed: {})", id, removed);
        Ok(removed)
    }

    // == Invalidate Type ==
    /// Deletes every entry of `rule_type`. Returns how many were deleted.
    pub async fn invalidate_type(&self, rule_type: &str) -> Result<u64> {
        if rule_type.is_empty() {
            return Err(RuleCacheError::InvalidRequest(
                "rule type cannot be empty".to_string(),
            ));
        }

        let detached = self
            .inner
            .detach_flights(|flight_id| flight_id.rule_type == rule_type);

        // A cold identity has no trace in the store yet; retire its version
        // explicitly so the detached write is refused.
        let mut removed = 0;
        for id in &detached {
            if self.inner.store.delete(id).await? {
                removed += 1;
            }
        }
        removed += self.inner.store.delete_type(rule_type).await?;
        self.inner.stats.record_invalidations(removed);

        info!(
            "Invalidated rule type {}: removed {} entries, detached {} computations",
            rule_type,
            removed,
            detached.len()
        );
        Ok(removed)
    }

    // == Reap ==
    /// Deletes entries that expired more than the grace period ago.
    ///
    /// Each delete is conditional on the version seen when the entry was
    /// selected, so an entry refreshed in the meantime is left alone.
    /// Individual delete failures are logged and counted; the next sweep
    /// picks them up again.
    pub async fn reap(&self) -> Result<ReapReport> {
        self.reap_scoped(None).await
    }

    /// Like [`reap`](Self::reap), restricted to one rule type.
    pub async fn reap_type(&self, rule_type: &str) -> Result<ReapReport> {
        self.reap_scoped(Some(rule_type)).await
    }

    async fn reap_scoped(&self, rule_type: Option<&str>) -> Result<ReapReport> {
        let grace = chrono::Duration::from_std(self.inner.options.grace_period)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let cutoff = self.inner.clock.now() - grace;

        let candidates = self
            .inner
            .store
            .list_expired_before(cutoff, rule_type)
            .await?;

        let mut report = ReapReport {
            scanned: candidates.len(),
            ..ReapReport::default()
        };

        for candidate in candidates {
            match self
                .inner
                .store
                .compare_and_delete(&candidate.id, candidate.version)
                .await
            {
                Ok(true) => report.removed += 1,
                Ok(false) => {
                    debug!(
                        version = candidate.version,
                        "Skipped reaping {}: refreshed or already removed", candidate.id
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to reap {}: {}", candidate.id, e);
                    report.failed += 1;
                }
            }
        }

        self.inner.stats.record_reaped(report.removed as u64);
        Ok(report)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> Result<CacheStats> {
        // Flights deregister themselves on completion or cancellation.
        let in_flight = self.inner.lock_flights().len();
        let total_entries = self.inner.store.len().await?;
        Ok(self.inner.stats.snapshot(total_entries, in_flight))
    }

    // == Singleflight ==
    /// Joins the flight registered for `id`, or registers a new one.
    fn join_flight(&self, id: EntryId) -> Shared<FlightFuture> {
        let mut flights = self.inner.lock_flights();

        if let Some(shared) = flights.get(&id).and_then(Flight::join) {
            self.inner.stats.record_coalesced();
            debug!("Joined in-flight computation for {}", id);
            return shared;
        }

        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let (shared, handle) = self.start_flight(id.clone(), token);
        flights.insert(id, Flight { token, handle });
        shared
    }

    fn start_flight(&self, id: EntryId, token: u64) -> (Shared<FlightFuture>, FlightHandle) {
        let inner = Arc::clone(&self.inner);
        let flight_id = id.clone();
        let run = async move {
            let _guard = FlightGuard {
                flights: &inner.flights,
                id: &flight_id,
                token,
            };
            inner.compute_and_store(&flight_id).await
        };

        match self.inner.options.compute_mode {
            ComputeMode::Inline => {
                let shared = run.boxed().shared();
                let handle = match shared.downgrade() {
                    Some(weak) => FlightHandle::Weak(weak),
                    None => FlightHandle::Strong(shared.clone()),
                };
                (shared, handle)
            }
            ComputeMode::Spawned => {
                let task = tokio::spawn(run);
                let shared = async move {
                    task.await.unwrap_or_else(|e| {
                        Err(RuleCacheError::ComputeFailed {
                            rule_type: id.rule_type,
                            key: id.key,
                            cause: format!("computation task failed: {}", e),
                        })
                    })
                }
                .boxed()
                .shared();
                (shared.clone(), FlightHandle::Strong(shared))
            }
        }
    }
}

impl<S: EntryStore, P: Producer> Inner<S, P> {
    fn lock_flights(&self) -> MutexGuard<'_, FlightTable> {
        lock_table(&self.flights)
    }

    /// Unregisters matching flights and returns their identities.
    fn detach_flights(&self, matches: impl Fn(&EntryId) -> bool) -> Vec<EntryId> {
        let mut flights = self.lock_flights();
        let detached: Vec<EntryId> = flights.keys().filter(|id| matches(id)).cloned().collect();
        for id in &detached {
            flights.remove(id);
        }
        detached
    }

    /// Body of one flight: re-check, compute, write.
    async fn compute_and_store(&self, id: &EntryId) -> Result<Vec<u8>> {
        // Read first: an invalidation after this point makes our write stale.
        let base_version = self.store.latest_version(id).await?;

        // A flight that just finished may already have filled the store.
        if let Some(entry) = self.store.get(id).await? {
            if !entry.is_expired_at(self.clock.now()) {
                return Ok(entry.payload);
            }
        }

        self.stats.record_computation();
        let computed = match self.call_producer(id).await {
            Ok(computed) => computed,
            Err(e) => {
                self.stats.record_compute_failure();
                warn!("{}", e);
                return Err(e);
            }
        };

        let entry = match RuleCacheEntry::new(
            id.clone(),
            computed.payload,
            self.clock.now(),
            computed.ttl,
            base_version + 1,
        ) {
            Ok(entry) => entry,
            Err(e) => {
                self.stats.record_compute_failure();
                warn!("Producer output rejected for {}: {}", id, e);
                return Err(RuleCacheError::ComputeFailed {
                    rule_type: id.rule_type.clone(),
                    key: id.key.clone(),
                    cause: e.to_string(),
                });
            }
        };
        let payload = entry.payload.clone();
        self.write(entry).await?;

        Ok(payload)
    }

    async fn call_producer(&self, id: &EntryId) -> Result<Computed> {
        let compute = self.producer.compute(&id.rule_type, &id.key);

        let outcome = match self.options.compute_timeout {
            Some(limit) => match tokio::time::timeout(limit, compute).await {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow::anyhow!("producer timed out after {:?}", limit)),
            },
            None => compute.await,
        };

        outcome.map_err(|cause| RuleCacheError::compute_failed(&id.rule_type, &id.key, &cause))
    }

    /// Stores `entry`, swallowing a lost version race.
    async fn write(&self, entry: RuleCacheEntry) -> Result<Option<u64>> {
        let version = entry.version;
        let id = entry.id.clone();

        match self.store.put(entry).await {
            Ok(()) => {
                debug!(version, "Stored {}", id);
                Ok(Some(version))
            }
            Err(RuleCacheError::StaleWrite { stored, .. }) => {
                self.stats.record_stale_write();
                debug!(version, stored, "Discarded stale write for {}", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryEntryStore};
    use crate::producer::FnProducer;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    type TestService = RuleCacheService<MemoryEntryStore, Arc<CountingProducer>>;

    struct CountingProducer {
        calls: AtomicUsize,
        ttl: Duration,
        fail: std::sync::atomic::AtomicBool,
    }

    impl CountingProducer {
        fn new(ttl: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                ttl,
                fail: std::sync::atomic::AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Producer for CountingProducer {
        async fn compute(&self, rule_type: &str, key: &str) -> anyhow::Result<Computed> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("model service unreachable");
            }
            Ok(Computed::new(format!("{}:{}:{}", rule_type, key, n), self.ttl))
        }
    }

    fn service(mode: ComputeMode) -> (TestService, Arc<CountingProducer>, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let producer = CountingProducer::new(Duration::from_secs(60));
        let options = ServiceOptions {
            grace_period: Duration::ZERO,
            compute_timeout: None,
            compute_mode: mode,
        };
        let service = RuleCacheService::with_options(
            MemoryEntryStore::new(),
            Arc::clone(&producer),
            Arc::new(clock.clone()),
            options,
        );
        (service, producer, clock)
    }

    #[tokio::test]
    async fn test_get_computes_then_hits() {
        let (service, producer, _) = service(ComputeMode::Spawned);

        let first = service.get("segmentation", "C001").await.unwrap();
        let second = service.get("segmentation", "C001").await.unwrap();

        assert_eq!(first, b"segmentation:C001:1");
        assert_eq!(first, second);
        assert_eq!(producer.calls(), 1);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_recompute_after_expiry_bumps_version() {
        let (service, producer, clock) = service(ComputeMode::Inline);

        service.get("return-risk", "C003").await.unwrap();
        clock.advance(chrono::Duration::seconds(61));
        let payload = service.get("return-risk", "C003").await.unwrap();

        assert_eq!(payload, b"return-risk:C003:2");
        assert_eq!(producer.calls(), 2);
        let entry = service.peek("return-risk", "C003").await.unwrap().unwrap();
        assert_eq!(entry.version, 2);
    }

    #[tokio::test]
    async fn test_compute_failure_is_not_cached() {
        let (service, producer, _) = service(ComputeMode::Spawned);
        producer.fail.store(true, Ordering::SeqCst);

        let err = service.get("segmentation", "C001").await.unwrap_err();
        assert!(matches!(err, RuleCacheError::ComputeFailed { .. }));
        assert!(err.to_string().contains("model service unreachable"));
        assert!(service.peek("segmentation", "C001").await.unwrap().is_none());

        producer.fail.store(false, Ordering::SeqCst);
        let payload = service.get("segmentation", "C001").await.unwrap();
        assert_eq!(payload, b"segmentation:C001:2");
        assert_eq!(service.stats().await.unwrap().compute_failures, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_from_producer_fails() {
        let producer = FnProducer::new(|_: String, _: String| async {
            Ok::<_, anyhow::Error>(Computed::new("x", Duration::ZERO))
        });
        let service = RuleCacheService::new(MemoryEntryStore::new(), producer);

        let err = service.get("segmentation", "C001").await.unwrap_err();
        assert!(matches!(err, RuleCacheError::ComputeFailed { .. }));
        assert_eq!(service.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_from_producer_fails() {
        let producer = FnProducer::new(|_: String, _: String| async {
            Ok::<_, anyhow::Error>(Computed::new("x", Duration::from_secs(1 << 45)))
        });
        let options = ServiceOptions {
            compute_mode: ComputeMode::Inline,
            ..ServiceOptions::default()
        };
        let service = RuleCacheService::with_options(
            MemoryEntryStore::new(),
            producer,
            Arc::new(SystemClock),
            options,
        );

        let err = service.get("segmentation", "C001").await.unwrap_err();
        assert!(matches!(err, RuleCacheError::ComputeFailed { .. }));
        assert!(err.to_string().contains("out of range"));

        let err = service
            .put("segmentation", "C001", vec![1], Duration::from_secs(1 << 45))
            .await
            .unwrap_err();
        assert!(matches!(err, RuleCacheError::InvalidRequest(_)));
        assert_eq!(service.stats().await.unwrap().in_flight, 0);
    }

    #[tokio::test]
    async fn test_version_keeps_climbing_across_invalidate() {
        let (service, _, _) = service(ComputeMode::Spawned);

        service.get("return-risk", "C003").await.unwrap();
        service.invalidate("return-risk", "C003").await.unwrap();
        service.get("return-risk", "C003").await.unwrap();

        let entry = service.peek("return-risk", "C003").await.unwrap().unwrap();
        assert_eq!(entry.version, 3);
    }

    #[tokio::test]
    async fn test_compute_timeout() {
        let producer = FnProducer::new(|_: String, _: String| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, anyhow::Error>(Computed::new("late", Duration::from_secs(60)))
        });
        let options = ServiceOptions {
            compute_timeout: Some(Duration::from_millis(20)),
            ..ServiceOptions::default()
        };
        let service = RuleCacheService::with_options(
            MemoryEntryStore::new(),
            producer,
            Arc::new(SystemClock),
            options,
        );

        let err = service.get("segmentation", "C001").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let (service, producer, _) = service(ComputeMode::Spawned);

        service.get("segmentation", "C001").await.unwrap();
        assert!(service.invalidate("segmentation", "C001").await.unwrap());
        assert!(!service.invalidate("segmentation", "C001").await.unwrap());

        service.get("segmentation", "C001").await.unwrap();
        assert_eq!(producer.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_type() {
        let (service, producer, _) = service(ComputeMode::Spawned);

        service.get("segmentation", "C001").await.unwrap();
        service.get("segmentation", "C002").await.unwrap();
        service.get("return-risk", "C003").await.unwrap();

        assert_eq!(service.invalidate_type("segmentation").await.unwrap(), 2);
        assert!(service.peek("return-risk", "C003").await.unwrap().is_some());

        service.get("segmentation", "C001").await.unwrap();
        assert_eq!(producer.calls(), 4);
        assert!(service.invalidate_type("").await.is_err());
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let (service, producer, _) = service(ComputeMode::Spawned);
        let payload = vec![0u8, 159, 146, 150, 255];

        let version = service
            .put("association", "bread", payload.clone(), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(version, Some(1));

        assert_eq!(service.get("association", "bread").await.unwrap(), payload);
        assert_eq!(producer.calls(), 0);

        let version = service
            .put("association", "bread", vec![1], Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(version, Some(2));
    }

    #[tokio::test]
    async fn test_reap_respects_grace_period() {
        let clock = ManualClock::new(Utc::now());
        let options = ServiceOptions {
            grace_period: Duration::from_secs(10),
            ..ServiceOptions::default()
        };
        let service = RuleCacheService::with_options(
            MemoryEntryStore::new(),
            CountingProducer::new(Duration::from_secs(60)),
            Arc::new(clock.clone()),
            options,
        );
        service.get("segmentation", "C001").await.unwrap();

        clock.advance(chrono::Duration::seconds(65));
        assert_eq!(service.reap().await.unwrap().removed, 0);

        clock.advance(chrono::Duration::seconds(10));
        let report = service.reap().await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(service.stats().await.unwrap().reaped, 1);
    }

    #[tokio::test]
    async fn test_reap_type_scoped() {
        let (service, _, clock) = service(ComputeMode::Spawned);

        service.get("segmentation", "C001").await.unwrap();
        service.get("return-risk", "C003").await.unwrap();
        clock.advance(chrono::Duration::seconds(61));

        let report = service.reap_type("return-risk").await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(service.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_unavailable_is_surfaced() {
        let (service, producer, _) = service(ComputeMode::Spawned);
        service.store().set_available(false);

        let err = service.get("segmentation", "C001").await.unwrap_err();
        assert!(matches!(err, RuleCacheError::StoreUnavailable(_)));
        assert!(matches!(
            service.invalidate("segmentation", "C001").await,
            Err(RuleCacheError::StoreUnavailable(_))
        ));
        assert!(service.reap().await.is_err());
        assert_eq!(producer.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_identity_rejected() {
        let (service, producer, _) = service(ComputeMode::Spawned);

        let err = service.get("", "C001").await.unwrap_err();
        assert!(matches!(err, RuleCacheError::InvalidRequest(_)));
        assert_eq!(producer.calls(), 0);
    }
}
