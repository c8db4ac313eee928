use crate::domains::coverage::service::CoverageService;
use crate::domains::coverage::types::{CoverageReport, FilterSet};
use crate::domains::geo::types::FeatureCollection;
use crate::errors::{DomainError, ServiceError, ServiceResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Stable key for a filter: SHA-256 of its JSON form
pub fn filter_cache_key(filter: &FilterSet) -> ServiceResult<String> {
    let encoded = serde_json::to_vec(filter)
        .map_err(|e| DomainError::Internal(format!("Failed to encode filter for cache key: {}", e)))?;
    Ok(hex::encode(Sha256::digest(&encoded)))
}

struct Entry<T> {
    stored_at: Instant,
    value: T,
}

/// TTL map guarded by a std mutex; the lock is never held across an await
struct TtlMap<T: Clone> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> TtlMap<T> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> ServiceResult<std::sync::MutexGuard<'_, HashMap<String, Entry<T>>>> {
        self.entries
            .lock()
            .map_err(|_| ServiceError::Domain(DomainError::Internal("coverage cache lock poisoned".to_string())))
    }

    fn get(&self, key: &str) -> ServiceResult<Option<T>> {
        let mut entries = self.lock()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    fn put(&self, key: String, value: T) -> ServiceResult<()> {
        let mut entries = self.lock()?;
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        entries.insert(key, Entry { stored_at: Instant::now(), value });
        Ok(())
    }

    fn clear(&self) -> ServiceResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Memoizing decorator over any `CoverageService`.
/// A zero TTL turns caching off and every call goes to the inner service.
pub struct CachedCoverageService {
    inner: Arc<dyn CoverageService>,
    ttl: Duration,
    reports: TtlMap<Arc<CoverageReport>>,
    heatmaps: TtlMap<Arc<FeatureCollection>>,
}

impl CachedCoverageService {
    pub fn new(inner: Arc<dyn CoverageService>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            reports: TtlMap::new(ttl),
            heatmaps: TtlMap::new(ttl),
        }
    }

    fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Drop every memoized result
    pub fn invalidate(&self) -> ServiceResult<()> {
        self.reports.clear()?;
        self.heatmaps.clear()?;
        log::debug!("Coverage cache invalidated");
        Ok(())
    }
}

#[async_trait]
impl CoverageService for CachedCoverageService {
    async fn county_report(&self, filter: &FilterSet) -> ServiceResult<CoverageReport> {
        if !self.enabled() {
            return self.inner.county_report(filter).await;
        }

        let key = filter_cache_key(filter)?;
        if let Some(hit) = self.reports.get(&key)? {
            log::debug!("Coverage report cache hit {}", key);
            return Ok((*hit).clone());
        }

        let report = self.inner.county_report(filter).await?;
        self.reports.put(key, Arc::new(report.clone()))?;
        Ok(report)
    }

    async fn heatmap(&self, filter: &FilterSet) -> ServiceResult<FeatureCollection> {
        if !self.enabled() {
            return self.inner.heatmap(filter).await;
        }

        let key = filter_cache_key(filter)?;
        if let Some(hit) = self.heatmaps.get(&key)? {
            log::debug!("Heatmap cache hit {}", key);
            return Ok((*hit).clone());
        }

        let collection = self.inner.heatmap(filter).await?;
        self.heatmaps.put(key, Arc::new(collection.clone()))?;
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::coverage::service::tests::fixed_repository;
    use crate::domains::coverage::service::CoverageServiceImpl;
    use crate::domains::geo::reconciler::GeoNameReconciler;
    use crate::domains::geo::source::StaticBoundarySource;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_cache_key_ignores_insertion_order() {
        let a = FilterSet::new().with_county_ids(vec![3, 1, 2]).with_periods(vec!["2024-06".into(), "2024-05".into()]);
        let b = FilterSet::new().with_county_ids(vec![1, 2, 3]).with_periods(vec!["2024-05".into(), "2024-06".into()]);
        let c = FilterSet::new().with_county_ids(vec![1, 2]);

        assert_eq!(filter_cache_key(&a).unwrap(), filter_cache_key(&b).unwrap());
        assert_ne!(filter_cache_key(&a).unwrap(), filter_cache_key(&c).unwrap());
        assert_eq!(filter_cache_key(&a).unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_report_is_memoized_until_invalidated() {
        let repo = fixed_repository();
        let inner = Arc::new(CoverageServiceImpl::new(
            repo.clone(),
            Arc::new(StaticBoundarySource::new(FeatureCollection::new(vec![]))),
            GeoNameReconciler::default(),
        ));
        let cached = CachedCoverageService::new(inner, Duration::from_secs(300));
        let filter = FilterSet::new().with_county_ids(vec![1]);

        let first = cached.county_report(&filter).await.unwrap();
        let second = cached.county_report(&filter).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.reads.load(Ordering::SeqCst), 1);

        // A different filter is a different entry
        cached.county_report(&FilterSet::new()).await.unwrap();
        assert_eq!(repo.reads.load(Ordering::SeqCst), 2);

        cached.invalidate().unwrap();
        cached.county_report(&filter).await.unwrap();
        assert_eq!(repo.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_heatmap_is_memoized() {
        let repo = fixed_repository();
        let inner = Arc::new(CoverageServiceImpl::new(
            repo.clone(),
            Arc::new(StaticBoundarySource::new(FeatureCollection::new(vec![]))),
            GeoNameReconciler::default(),
        ));
        let cached = CachedCoverageService::new(inner, Duration::from_secs(300));
        let filter = FilterSet::new().with_periods(vec!["2024-05".into()]);

        let first = cached.heatmap(&filter).await.unwrap();
        let second = cached.heatmap(&filter).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.reads.load(Ordering::SeqCst), 1);

        cached.invalidate().unwrap();
        cached.heatmap(&filter).await.unwrap();
        assert_eq!(repo.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let repo = fixed_repository();
        let inner = Arc::new(CoverageServiceImpl::new(
            repo.clone(),
            Arc::new(StaticBoundarySource::new(FeatureCollection::new(vec![]))),
            GeoNameReconciler::default(),
        ));
        let cached = CachedCoverageService::new(inner, Duration::from_millis(50));
        let filter = FilterSet::new();

        cached.county_report(&filter).await.unwrap();
        cached.heatmap(&filter).await.unwrap();
        cached.county_report(&filter).await.unwrap();
        assert_eq!(repo.reads.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(80)).await;

        // Stale entries are dropped and recomputed
        cached.county_report(&filter).await.unwrap();
        cached.heatmap(&filter).await.unwrap();
        assert_eq!(repo.reads.load(Ordering::SeqCst), 4);
        assert_eq!(cached.reports.lock().unwrap().len(), 1);
        assert_eq!(cached.heatmaps.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_put_sweeps_expired_entries() {
        let map: TtlMap<u32> = TtlMap::new(Duration::from_millis(20));
        map.put("a".to_string(), 1).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        map.put("b".to_string(), 2).unwrap();

        let entries = map.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("b"));
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_caching() {
        let repo = fixed_repository();
        let inner = Arc::new(CoverageServiceImpl::new(
            repo.clone(),
            Arc::new(StaticBoundarySource::new(FeatureCollection::new(vec![]))),
            GeoNameReconciler::default(),
        ));
        let cached = CachedCoverageService::new(inner, Duration::ZERO);

        cached.county_report(&FilterSet::new()).await.unwrap();
        cached.heatmap(&FilterSet::new()).await.unwrap();
        assert_eq!(repo.reads.load(Ordering::SeqCst), 2);
    }
}
