use crate::domains::geo::types::DEFAULT_LABEL_PROPERTY;
use crate::errors::{DomainError, DomainResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATABASE_URL: &str = "COVERAGE_DATABASE_URL";
pub const ENV_BOUNDARY_PATH: &str = "COVERAGE_BOUNDARY_PATH";
pub const ENV_LABEL_PROPERTY: &str = "COVERAGE_LABEL_PROPERTY";
pub const ENV_CACHE_TTL_SECS: &str = "COVERAGE_CACHE_TTL_SECS";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const MAX_CACHE_TTL_SECS: u64 = 86_400;

fn default_label_property() -> String {
    DEFAULT_LABEL_PROPERTY.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// sqlx connection string, e.g. `sqlite:storage/training.sqlite`
    pub database_url: String,
    /// GeoJSON FeatureCollection with county boundaries
    pub boundary_path: PathBuf,
    #[serde(default = "default_label_property")]
    pub label_property: String,
    /// 0 disables memoization
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl EngineConfig {
    pub fn new(database_url: &str, boundary_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: database_url.to_string(),
            boundary_path: boundary_path.into(),
            label_property: default_label_property(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }

    /// Read from the environment, loading a `.env` file first if one exists
    pub fn from_env() -> DomainResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(ENV_DATABASE_URL)
            .ok_or_else(|| ValidationError::required(ENV_DATABASE_URL))?;
        let boundary_path = lookup(ENV_BOUNDARY_PATH)
            .ok_or_else(|| ValidationError::required(ENV_BOUNDARY_PATH))?;
        let label_property = lookup(ENV_LABEL_PROPERTY).unwrap_or_else(default_label_property);
        let cache_ttl_secs = match lookup(ENV_CACHE_TTL_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ValidationError::format(ENV_CACHE_TTL_SECS, "must be a whole number of seconds")
            })?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        let config = Self {
            database_url,
            boundary_path: PathBuf::from(boundary_path),
            label_property,
            cache_ttl_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.database_url.trim().is_empty() {
            return Err(DomainError::Validation(ValidationError::required("database_url")));
        }
        if self.boundary_path.as_os_str().is_empty() {
            return Err(DomainError::Validation(ValidationError::required("boundary_path")));
        }
        if self.label_property.trim().is_empty() {
            return Err(DomainError::Validation(ValidationError::required("label_property")));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(DomainError::Validation(ValidationError::range(
                "cache_ttl_secs",
                0,
                MAX_CACHE_TTL_SECS,
            )));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
