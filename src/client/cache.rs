//! Client-side query cache
//!
//! Fetched views are cached with a TTL and invalidated wholesale after a
//! lifecycle transition, so the next read re-fetches. Nothing is merged.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::{CompanyId, Incident, IncidentId, IncidentSummary, PortfolioEntry};

// ============================================================================
// LRU Cache Implementation
// ============================================================================

/// A simple LRU cache with TTL support
pub struct LruCache<K, V> {
    /// Maximum number of entries
    max_entries: usize,
    /// Time-to-live for entries
    ttl: Duration,
    /// The cache entries
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    /// Cache statistics
    stats: CacheStats,
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_accessed: Instant,
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new LRU cache
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.created_at.elapsed() > self.ttl {
                entries.remove(key);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }

            entry.last_accessed = Instant::now();
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.value.clone());
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: now,
            },
        );
    }

    /// Remove every entry whose key matches `pred`
    pub async fn invalidate_where<F>(&self, pred: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !pred(k));
        let removed = before - entries.len();
        self.stats
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Clear all entries
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

// ============================================================================
// Query Cache
// ============================================================================

/// Identity of a fetched view
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Incidents,
    Incident(IncidentId),
    Portfolio,
    CompanyIncidents(CompanyId),
    CompanyIncident(CompanyId, IncidentId),
}

impl QueryKey {
    /// Whether a status change of `incident_id` can alter this view
    pub fn depends_on(&self, incident_id: &IncidentId) -> bool {
        match self {
            // List views change membership or status
            QueryKey::Incidents | QueryKey::Portfolio | QueryKey::CompanyIncidents(_) => true,
            QueryKey::Incident(id) | QueryKey::CompanyIncident(_, id) => id == incident_id,
        }
    }
}

/// A cached view
#[derive(Debug, Clone)]
pub enum CachedQuery {
    Summaries(Vec<IncidentSummary>),
    Incident(Incident),
    Portfolio(Vec<PortfolioEntry>),
}

const MAX_CACHED_QUERIES: usize = 256;

/// TTL cache of fetched views
pub struct QueryCache {
    inner: LruCache<QueryKey, CachedQuery>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: LruCache::new(MAX_CACHED_QUERIES, ttl),
        }
    }

    pub async fn summaries(&self, key: &QueryKey) -> Option<Vec<IncidentSummary>> {
        match self.inner.get(key).await {
            Some(CachedQuery::Summaries(items)) => Some(items),
            _ => None,
        }
    }

    pub async fn incident(&self, key: &QueryKey) -> Option<Incident> {
        match self.inner.get(key).await {
            Some(CachedQuery::Incident(incident)) => Some(incident),
            _ => None,
        }
    }

    pub async fn portfolio(&self) -> Option<Vec<PortfolioEntry>> {
        match self.inner.get(&QueryKey::Portfolio).await {
            Some(CachedQuery::Portfolio(items)) => Some(items),
            _ => None,
        }
    }

    pub async fn insert(&self, key: QueryKey, value: CachedQuery) {
        self.inner.insert(key, value).await;
    }

    /// Drop every view a transition of `incident_id` may have changed
    pub async fn invalidate_incident(&self, incident_id: &IncidentId) -> usize {
        self.inner
            .invalidate_where(|key| key.depends_on(incident_id))
            .await
    }

    pub async fn clear(&self) {
        self.inner.clear().await;
    }

    pub fn stats(&self) -> &CacheStats {
        self.inner.stats()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProofStatus;
    use chrono::Utc;

    fn summary(id: &str) -> IncidentSummary {
        IncidentSummary {
            incident_id: id.into(),
            detected_at: Utc::now(),
            proof_status: ProofStatus::NeedProof,
        }
    }

    #[tokio::test]
    async fn test_lru_cache_basic() {
        let cache: LruCache<String, i32> = LruCache::new(10, Duration::from_secs(60));

        cache.insert("a".to_string(), 1).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(1));
        assert_eq!(cache.get(&"b".to_string()).await, None);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[tokio::test]
    async fn test_lru_cache_eviction() {
        let cache: LruCache<i32, i32> = LruCache::new(2, Duration::from_secs(60));

        cache.insert(1, 1).await;
        cache.insert(2, 2).await;
        cache.get(&1).await;
        cache.insert(3, 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&1).await, Some(1));
        assert_eq!(cache.get(&2).await, None);
    }

    #[tokio::test]
    async fn test_lru_cache_ttl() {
        let cache: LruCache<i32, i32> = LruCache::new(10, Duration::from_millis(10));
        cache.insert(1, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&1).await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_caching() {
        let cache: LruCache<i32, i32> = LruCache::new(10, Duration::ZERO);
        cache.insert(1, 1).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_incident() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let id: IncidentId = "INC-1".into();
        let other: IncidentId = "INC-2".into();

        cache
            .insert(QueryKey::Incidents, CachedQuery::Summaries(vec![summary("INC-1")]))
            .await;
        cache
            .insert(
                QueryKey::CompanyIncidents("acme".into()),
                CachedQuery::Summaries(vec![]),
            )
            .await;
        cache
            .insert(
                QueryKey::Incident(other.clone()),
                CachedQuery::Summaries(vec![]),
            )
            .await;

        assert_eq!(cache.invalidate_incident(&id).await, 2);
        assert!(cache.summaries(&QueryKey::Incidents).await.is_none());
        assert!(cache
            .summaries(&QueryKey::Incident(other))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_typed_lookup_mismatch() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache
            .insert(QueryKey::Portfolio, CachedQuery::Summaries(vec![]))
            .await;
        assert!(cache.portfolio().await.is_none());
    }
}
