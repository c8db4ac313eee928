use crate::domains::geo::types::FeatureCollection;
use crate::errors::{DomainError, DomainResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Supplies parsed county boundaries
#[async_trait]
pub trait BoundarySource: Send + Sync {
    /// Fails with `DomainError::SourceUnavailable` when the boundaries cannot be read or parsed
    async fn load(&self) -> DomainResult<FeatureCollection>;
}

/// GeoJSON FeatureCollection stored on disk
#[derive(Debug, Clone)]
pub struct FileBoundarySource {
    path: PathBuf,
}

impl FileBoundarySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BoundarySource for FileBoundarySource {
    async fn load(&self) -> DomainResult<FeatureCollection> {
        let source_name = self.path.display().to_string();

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DomainError::source_unavailable(&source_name, &e.to_string()))?;

        let collection: FeatureCollection = serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::source_unavailable(&source_name, &format!("invalid GeoJSON: {}", e)))?;

        log::debug!("Loaded {} boundary features from {}", collection.features.len(), source_name);
        Ok(collection)
    }
}

/// Boundaries held in memory
#[derive(Debug, Clone)]
pub struct StaticBoundarySource {
    collection: FeatureCollection,
}

impl StaticBoundarySource {
    pub fn new(collection: FeatureCollection) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl BoundarySource for StaticBoundarySource {
    async fn load(&self) -> DomainResult<FeatureCollection> {
        Ok(self.collection.clone())
    }
}
