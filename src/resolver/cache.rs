//! Single-flight cache from coordinate keys to zone identifiers.

use crate::coord::GeoPoint;
use crate::resolver::lookup::ZoneLookup;
use crate::resolver::types::{ResolveError, ResolverStats};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Outcome shared between the leading caller and its waiters.
type Outcome = Result<String, ResolveError>;

/// State of a single cache entry.
///
/// A key is either absent from the map, pending with an in-flight lookup, or
/// resolved. There is no failed state: a failed lookup removes the entry.
enum Slot {
    /// Lookup completed; the zone identifier is final for this key.
    Resolved(String),
    /// Lookup in flight; waiters subscribe to the channel for the outcome.
    Pending(broadcast::Sender<Outcome>),
}

/// Role a caller takes after registering against the cache.
enum Role {
    /// Another caller owns the lookup; wait for its broadcast.
    Waiter(broadcast::Receiver<Outcome>),
    /// This caller installed the pending entry and must perform the lookup.
    Leader(broadcast::Sender<Outcome>),
}

/// Caching resolver from coordinates to IANA zone identifiers.
///
/// An explicit, constructible object with an injectable [`ZoneLookup`]
/// collaborator, so tests can substitute fakes and independent caches can
/// coexist. Entries are keyed by [`GeoPoint::cache_key`] and live for the
/// resolver's lifetime once resolved; there is no TTL.
///
/// # Guarantees
///
/// - At most one external lookup is in flight per distinct key; lookups for
///   different keys proceed concurrently.
/// - All callers that join before a lookup completes observe the identical
///   result or identical error.
/// - A failed lookup is evicted before the error propagates, so a later call
///   for the same key retries from scratch.
pub struct ZoneResolver<L> {
    lookup: L,
    entries: DashMap<String, Slot>,
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    coalesced_waits: AtomicU64,
    lookups_started: AtomicU64,
    lookups_failed: AtomicU64,
}

impl<L: ZoneLookup> ZoneResolver<L> {
    /// Creates a resolver over the given lookup collaborator.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            entries: DashMap::new(),
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            coalesced_waits: AtomicU64::new(0),
            lookups_started: AtomicU64::new(0),
            lookups_failed: AtomicU64::new(0),
        }
    }

    /// Resolves a coordinate to its IANA zone identifier.
    ///
    /// Returns the cached identifier when present. On a miss, performs the
    /// external lookup exactly once per key; concurrent callers for the same
    /// key await that single lookup instead of starting their own.
    ///
    /// # Errors
    ///
    /// Propagates the lookup's failure to every current waiter. The failure
    /// is not cached.
    pub async fn resolve(&self, point: &GeoPoint) -> Result<String, ResolveError> {
        let key = point.cache_key();
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        // Entry API gives an atomic check-and-insert, so two callers can
        // never both believe they are first for the same key. The guard is
        // dropped before any await below.
        let role = match self.entries.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => match entry.get() {
                Slot::Resolved(zone_id) => {
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(zone_id.clone());
                }
                Slot::Pending(tx) => {
                    self.coalesced_waits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Joining in-flight zone lookup");
                    Role::Waiter(tx.subscribe())
                }
            },
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                // Only one message is ever sent per channel; the slack is
                // harmless.
                let (tx, _rx) = broadcast::channel(4);
                entry.insert(Slot::Pending(tx.clone()));
                self.lookups_started.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %key,
                    lookup = self.lookup.name(),
                    "Cache miss - starting zone lookup"
                );
                Role::Leader(tx)
            }
        };

        match role {
            Role::Waiter(mut rx) => match rx.recv().await {
                Ok(outcome) => outcome,
                // The leader was dropped without broadcasting; its entry has
                // been evicted, so a retry will start a fresh lookup.
                Err(_) => Err(ResolveError::LookupAbandoned),
            },
            Role::Leader(tx) => self.lead_lookup(point, &key, tx).await,
        }
    }

    /// Performs the external lookup as the leading caller and publishes the
    /// outcome to the map and to all waiters.
    async fn lead_lookup(
        &self,
        point: &GeoPoint,
        key: &str,
        tx: broadcast::Sender<Outcome>,
    ) -> Result<String, ResolveError> {
        // If this future is dropped mid-lookup the pending entry must not
        // linger, or waiters would block forever and later callers would
        // join a lookup nobody is running.
        let mut evict_guard = EvictOnDrop {
            entries: &self.entries,
            key,
            armed: true,
        };

        let result = self
            .lookup
            .zone_id(point.latitude(), point.longitude())
            .await;
        evict_guard.armed = false;

        match &result {
            Ok(zone_id) => {
                // Promote before broadcasting so a reader that misses the
                // broadcast finds the resolved entry.
                self.entries
                    .insert(key.to_string(), Slot::Resolved(zone_id.clone()));
                debug!(key = %key, zone_id = %zone_id, "Zone lookup resolved");
            }
            Err(error) => {
                // Evict before broadcasting: by the time any caller sees the
                // error, the key is as if it had never been looked up.
                self.entries.remove(key);
                self.lookups_failed.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %error, "Zone lookup failed - entry evicted");
            }
        }

        let _ = tx.send(result.clone());
        result
    }

    /// Returns the cached zone identifier for a point, without resolving.
    ///
    /// Returns `None` for absent and pending entries.
    pub fn cached_zone(&self, point: &GeoPoint) -> Option<String> {
        let entry = self.entries.get(&point.cache_key())?;
        match entry.value() {
            Slot::Resolved(zone_id) => Some(zone_id.clone()),
            Slot::Pending(_) => None,
        }
    }

    /// Returns the number of entries (resolved and pending).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    ///
    /// In-flight lookups are not interrupted; they still broadcast to their
    /// waiters and record their outcome when they complete.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            coalesced_waits: self.coalesced_waits.load(Ordering::Relaxed),
            lookups_started: self.lookups_started.load(Ordering::Relaxed),
            lookups_failed: self.lookups_failed.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            cache_hits = stats.cache_hits,
            coalesced = stats.coalesced_waits,
            lookups = stats.lookups_started,
            failed = stats.lookups_failed,
            hit_ratio = format!("{:.1}%", stats.hit_ratio() * 100.0),
            entries = self.len(),
            "Zone resolver statistics"
        );
    }
}

/// Evicts a pending entry if the leading caller is dropped before it records
/// an outcome. Removing the slot drops its channel sender, so waiters
/// observe a closed channel rather than hanging.
struct EvictOnDrop<'a> {
    entries: &'a DashMap<String, Slot>,
    key: &'a str,
    armed: bool,
}

impl Drop for EvictOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.entries.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;
    use tokio::time::{sleep, Duration};

    /// Scripted lookup: counts calls, pops pre-seeded outcomes, and can be
    /// gated so a lookup stays in flight until the test releases it.
    #[derive(Clone)]
    struct ScriptedLookup {
        calls: Arc<AtomicUsize>,
        outcomes: Arc<Mutex<Vec<Result<String, ResolveError>>>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedLookup {
        fn with_outcomes(outcomes: Vec<Result<String, ResolveError>>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                outcomes: Arc::new(Mutex::new(outcomes)),
                gate: None,
            }
        }

        fn ok(zone_id: &str) -> Self {
            Self::with_outcomes(vec![Ok(zone_id.to_string())])
        }

        fn gated(mut self) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            self.gate = Some(Arc::clone(&gate));
            (self.clone(), gate)
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ZoneLookup for ScriptedLookup {
        async fn zone_id(&self, _lat: f64, _lon: f64) -> Result<String, ResolveError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes.lock().unwrap().remove(0)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn knox() -> GeoPoint {
        GeoPoint::new(41.285433, -86.626029).unwrap()
    }

    #[tokio::test]
    async fn test_second_resolve_hits_cache() {
        let lookup = ScriptedLookup::ok("America/Indiana/Knox");
        let resolver = ZoneResolver::new(lookup.clone());

        let first = resolver.resolve(&knox()).await.unwrap();
        let second = resolver.resolve(&knox()).await.unwrap();

        assert_eq!(first, "America/Indiana/Knox");
        assert_eq!(second, first);
        assert_eq!(lookup.call_count(), 1, "Cached result must not re-lookup");
        assert_eq!(resolver.len(), 1);
    }

    #[tokio::test]
    async fn test_cached_zone_peek() {
        let lookup = ScriptedLookup::ok("America/Indiana/Knox");
        let resolver = ZoneResolver::new(lookup);

        assert_eq!(resolver.cached_zone(&knox()), None);
        resolver.resolve(&knox()).await.unwrap();
        assert_eq!(
            resolver.cached_zone(&knox()),
            Some("America/Indiana/Knox".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_resolves_trigger_single_lookup() {
        let (lookup, gate) = ScriptedLookup::ok("America/Chicago").gated();
        let resolver = Arc::new(ZoneResolver::new(lookup.clone()));

        let mut handles = vec![];
        for _ in 0..10 {
            let r = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move { r.resolve(&knox()).await }));
        }

        // Let every task register against the pending entry, then release
        // the one lookup that is actually running.
        sleep(Duration::from_millis(20)).await;
        gate.add_permits(1);

        let results = futures::future::join_all(handles).await;
        for result in results {
            assert_eq!(result.unwrap().unwrap(), "America/Chicago");
        }

        assert_eq!(lookup.call_count(), 1, "Exactly one lookup should run");

        let stats = resolver.stats();
        assert_eq!(stats.total_requests, 10);
        assert_eq!(stats.lookups_started, 1);
        assert_eq!(stats.coalesced_waits, 9);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_cached() {
        let lookup = ScriptedLookup::with_outcomes(vec![
            Err(ResolveError::LookupFailed("service unavailable".into())),
            Ok("America/Indiana/Knox".to_string()),
        ]);
        let resolver = ZoneResolver::new(lookup.clone());

        let first = resolver.resolve(&knox()).await;
        assert_eq!(
            first.unwrap_err(),
            ResolveError::LookupFailed("service unavailable".into())
        );
        assert!(resolver.is_empty(), "Failed entry must be evicted");

        let second = resolver.resolve(&knox()).await;
        assert_eq!(second.unwrap(), "America/Indiana/Knox");
        assert_eq!(lookup.call_count(), 2, "Retry must perform a new lookup");
    }

    #[tokio::test]
    async fn test_failure_propagates_to_all_waiters() {
        let error = ResolveError::NoCoverage {
            lat: 41.285433,
            lon: -86.626029,
        };
        let (lookup, gate) =
            ScriptedLookup::with_outcomes(vec![Err(error.clone())]).gated();
        let resolver = Arc::new(ZoneResolver::new(lookup));

        let mut handles = vec![];
        for _ in 0..4 {
            let r = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move { r.resolve(&knox()).await }));
        }

        sleep(Duration::from_millis(20)).await;
        gate.add_permits(1);

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap_err(), error);
        }

        assert!(resolver.is_empty());
        assert_eq!(resolver.stats().lookups_failed, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_resolve_independently() {
        let lookup = ScriptedLookup::with_outcomes(vec![
            Ok("America/Indiana/Knox".to_string()),
            Ok("America/Phoenix".to_string()),
        ]);
        let resolver = ZoneResolver::new(lookup.clone());
        let tucson = GeoPoint::new(32.114510, -110.939259).unwrap();

        let knox_zone = resolver.resolve(&knox()).await.unwrap();
        let tucson_zone = resolver.resolve(&tucson).await.unwrap();

        assert_eq!(knox_zone, "America/Indiana/Knox");
        assert_eq!(tucson_zone, "America/Phoenix");
        assert_eq!(lookup.call_count(), 2);
        assert_eq!(resolver.len(), 2);
    }

    #[tokio::test]
    async fn test_nearby_points_share_cache_entry() {
        let lookup = ScriptedLookup::ok("America/Indiana/Knox");
        let resolver = ZoneResolver::new(lookup.clone());

        // Rounds to the same (41.29, -86.63) key as knox().
        let nearby = GeoPoint::new(41.288901, -86.631444).unwrap();

        resolver.resolve(&knox()).await.unwrap();
        let zone = resolver.resolve(&nearby).await.unwrap();

        assert_eq!(zone, "America/Indiana/Knox");
        assert_eq!(lookup.call_count(), 1);
        assert_eq!(resolver.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_new_lookup() {
        let lookup = ScriptedLookup::with_outcomes(vec![
            Ok("America/Indiana/Knox".to_string()),
            Ok("America/Indiana/Knox".to_string()),
        ]);
        let resolver = ZoneResolver::new(lookup.clone());

        resolver.resolve(&knox()).await.unwrap();
        resolver.clear();
        assert!(resolver.is_empty());

        resolver.resolve(&knox()).await.unwrap();
        assert_eq!(lookup.call_count(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_leader_evicts_entry_and_unblocks_waiters() {
        let (lookup, _gate) = ScriptedLookup::ok("America/Chicago").gated();
        let resolver = Arc::new(ZoneResolver::new(lookup.clone()));

        // Leader blocks on the gate, which is never released.
        let leader = {
            let r = Arc::clone(&resolver);
            tokio::spawn(async move { r.resolve(&knox()).await })
        };
        sleep(Duration::from_millis(20)).await;
        assert_eq!(resolver.len(), 1, "Pending entry should be installed");

        // A waiter joins the pending entry.
        let waiter = {
            let r = Arc::clone(&resolver);
            tokio::spawn(async move { r.resolve(&knox()).await })
        };
        sleep(Duration::from_millis(20)).await;

        // Dropping the leader mid-lookup must evict the entry and fail the
        // waiter with an abandonment error rather than hanging it.
        leader.abort();
        let outcome = waiter.await.unwrap();
        assert_eq!(outcome.unwrap_err(), ResolveError::LookupAbandoned);
        assert!(resolver.is_empty());
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stats_hit_ratio() {
        let lookup = ScriptedLookup::ok("America/Indiana/Knox");
        let resolver = ZoneResolver::new(lookup);

        resolver.resolve(&knox()).await.unwrap();
        resolver.resolve(&knox()).await.unwrap();
        resolver.resolve(&knox()).await.unwrap();
        resolver.resolve(&knox()).await.unwrap();

        let stats = resolver.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.cache_hits, 3);
        assert_eq!(stats.lookups_started, 1);
        assert!((stats.hit_ratio() - 0.75).abs() < 0.001);
    }
}
