//! Read-through cache for daily history.
//!
//! Provides in-memory caching with TTL for price bars so repeated screening
//! runs and indicator requests do not refetch the same series.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::provider::{HistoryProvider, ProviderError};
use super::{AdjustMode, PriceBar};

/// Longest TTL accepted (one week).
const MAX_TTL_SECS: u64 = 7 * 24 * 3600;

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl_secs: i64) -> Self {
        Self {
            data,
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// History cache keyed by symbol, adjustment mode and lookback.
pub struct HistoryCache {
    bars: RwLock<HashMap<String, CacheEntry<Vec<PriceBar>>>>,
    ttl_secs: i64,
}

impl HistoryCache {
    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            bars: RwLock::new(HashMap::new()),
            ttl_secs,
        }
    }

    fn key(symbol: &str, adjust: AdjustMode, lookback_days: u32) -> String {
        format!("{}:{}:{}", symbol, adjust, lookback_days)
    }

    /// Get cached bars if not expired
    pub fn get(&self, symbol: &str, adjust: AdjustMode, lookback_days: u32) -> Option<Vec<PriceBar>> {
        let key = Self::key(symbol, adjust, lookback_days);
        let cache = self.bars.read().ok()?;

        cache.get(&key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.data.clone())
            }
        })
    }

    /// Store bars, pruning expired entries first so the map only holds live series.
    pub fn set(&self, symbol: &str, adjust: AdjustMode, lookback_days: u32, bars: Vec<PriceBar>) {
        let key = Self::key(symbol, adjust, lookback_days);
        let entry = CacheEntry::new(bars, self.ttl_secs);

        if let Ok(mut cache) = self.bars.write() {
            cache.retain(|_, entry| !entry.is_expired());
            cache.insert(key, entry);
        }
    }
}

/// `HistoryProvider` decorator that serves repeated requests from a TTL cache.
///
/// Errors are never cached.
pub struct CachedHistoryProvider {
    inner: Arc<dyn HistoryProvider>,
    cache: HistoryCache,
}

impl CachedHistoryProvider {
    pub fn new(inner: Arc<dyn HistoryProvider>, ttl_secs: u64) -> Self {
        Self {
            inner,
            cache: HistoryCache::with_ttl(ttl_secs.min(MAX_TTL_SECS) as i64),
        }
    }
}

#[async_trait]
impl HistoryProvider for CachedHistoryProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        adjust: AdjustMode,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        if let Some(bars) = self.cache.get(symbol, adjust, lookback_days) {
            debug!(symbol = symbol, "History cache hit");
            return Ok(bars);
        }

        let bars = self.inner.fetch_history(symbol, adjust, lookback_days).await?;
        self.cache.set(symbol, adjust, lookback_days, bars.clone());
        Ok(bars)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_bar(day: u32) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: 10.0,
            high: 11.0,
            low: 9.5,
            close: 10.5,
            volume: 1000.0,
        }
    }

    fn entries(cache: &HistoryCache) -> usize {
        cache.bars.read().unwrap().len()
    }

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl HistoryProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_history(
            &self,
            _symbol: &str,
            _adjust: AdjustMode,
            _lookback_days: u32,
        ) -> Result<Vec<PriceBar>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Network("down".into()));
            }
            Ok(vec![make_bar(2), make_bar(3)])
        }
    }

    #[test]
    fn test_cache_set_get() {
        let cache = HistoryCache::with_ttl(60);
        cache.set("600000", AdjustMode::Forward, 180, vec![make_bar(2)]);

        assert_eq!(cache.get("600000", AdjustMode::Forward, 180).unwrap().len(), 1);
        assert!(cache.get("600000", AdjustMode::None, 180).is_none());
        assert!(cache.get("600000", AdjustMode::Forward, 30).is_none());
    }

    #[test]
    fn test_cache_expired_entry_is_miss() {
        let cache = HistoryCache::with_ttl(-1);
        cache.set("600000", AdjustMode::Forward, 180, vec![make_bar(2)]);

        assert!(cache.get("600000", AdjustMode::Forward, 180).is_none());
    }

    #[test]
    fn test_set_prunes_expired_entries() {
        let cache = HistoryCache::with_ttl(-1);
        cache.set("600000", AdjustMode::Forward, 180, vec![make_bar(2)]);
        cache.set("600000", AdjustMode::None, 180, vec![make_bar(2)]);
        cache.set("000001", AdjustMode::Forward, 180, vec![make_bar(2)]);

        // Only the entry just written survives
        assert_eq!(entries(&cache), 1);
    }

    #[test]
    fn test_set_keeps_live_entries() {
        let cache = HistoryCache::with_ttl(60);
        cache.set("600000", AdjustMode::Forward, 180, vec![make_bar(2)]);
        cache.set("600000", AdjustMode::None, 180, vec![make_bar(2)]);
        cache.set("000001", AdjustMode::Forward, 180, vec![make_bar(2)]);

        assert_eq!(entries(&cache), 3);
    }

    #[tokio::test]
    async fn test_cached_provider_reads_through_once() {
        let inner = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedHistoryProvider::new(inner.clone(), 300);

        let first = cached.fetch_history("600000", AdjustMode::Forward, 180).await.unwrap();
        let second = cached.fetch_history("600000", AdjustMode::Forward, 180).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_provider_does_not_cache_errors() {
        let inner = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedHistoryProvider::new(inner.clone(), 300);

        assert!(cached.fetch_history("600000", AdjustMode::Forward, 180).await.is_err());
        assert!(cached.fetch_history("600000", AdjustMode::Forward, 180).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(entries(&cached.cache), 0);
    }
}
