use crate::domains::coverage::aggregator::CoverageAggregator;
use crate::domains::coverage::repository::ParticipationRepository;
use crate::domains::coverage::types::{CoverageReport, FilterSet};
use crate::domains::geo::reconciler::GeoNameReconciler;
use crate::domains::geo::source::BoundarySource;
use crate::domains::geo::types::FeatureCollection;
use crate::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait defining coverage service operations
#[async_trait]
pub trait CoverageService: Send + Sync {
    /// Per-county statistics with intensity scale and totals (dashboard view)
    async fn county_report(&self, filter: &FilterSet) -> ServiceResult<CoverageReport>;

    /// Boundary features with county statistics merged in (heatmap view).
    /// The collection carries an `intensity_levels` member for the color scale.
    async fn heatmap(&self, filter: &FilterSet) -> ServiceResult<FeatureCollection>;
}

/// Implementation of the coverage service
#[derive(Clone)]
pub struct CoverageServiceImpl {
    repo: Arc<dyn ParticipationRepository>,
    boundaries: Arc<dyn BoundarySource>,
    reconciler: GeoNameReconciler,
}

impl CoverageServiceImpl {
    pub fn new(
        repo: Arc<dyn ParticipationRepository>,
        boundaries: Arc<dyn BoundarySource>,
        reconciler: GeoNameReconciler,
    ) -> Self {
        Self {
            repo,
            boundaries,
            reconciler,
        }
    }
}

#[async_trait]
impl CoverageService for CoverageServiceImpl {
    async fn county_report(&self, filter: &FilterSet) -> ServiceResult<CoverageReport> {
        let records = self.repo.fetch_participation().await?;
        let counties = self.repo.fetch_counties().await?;

        Ok(CoverageAggregator::report(&records, filter, &counties))
    }

    async fn heatmap(&self, filter: &FilterSet) -> ServiceResult<FeatureCollection> {
        // Boundaries first: without them there is nothing to render
        let boundaries = self.boundaries.load().await?;
        let report = self.county_report(filter).await?;

        let mut collection = self.reconciler.merge_collection(&report.counties, &boundaries);
        let levels = serde_json::to_value(&report.levels)
            .map_err(|e| ServiceError::ServiceUnavailable(format!("Failed to encode intensity levels: {}", e)))?;
        collection.extra.insert("intensity_levels".to_string(), levels);

        Ok(collection)
    }
}
