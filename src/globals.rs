use crate::config::EngineConfig;
use crate::domains::coverage::cache::CachedCoverageService;
use crate::domains::coverage::repository::{ParticipationRepository, SqliteParticipationRepository};
use crate::domains::coverage::service::{CoverageService, CoverageServiceImpl};
use crate::domains::geo::reconciler::GeoNameReconciler;
use crate::domains::geo::source::{BoundarySource, FileBoundarySource};
use crate::ffi::error::{FFIError, FFIResult};
use lazy_static::lazy_static;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);

    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
    static ref CONFIG: Mutex<Option<EngineConfig>> = Mutex::new(None);

    static ref COVERAGE_SERVICE: Mutex<Option<Arc<CachedCoverageService>>> = Mutex::new(None);
}

/// Set up logging, the database pool and the coverage services. Safe to call more than once.
pub async fn initialize(config: EngineConfig) -> FFIResult<()> {
    // Acquire the async mutex to ensure single initialization
    let _guard = INIT_MUTEX.lock().await;

    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    let result = initialize_internal(config).await;

    // Mark as initialized only if successful
    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

/// Initialize env_logger once, defaulting to `debug` in debug builds and `info` otherwise
pub fn init_logging() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

async fn initialize_internal(config: EngineConfig) -> FFIResult<()> {
    init_logging();

    config.validate().map_err(FFIError::from)?;

    log::info!("Initializing coverage engine (database: {}, boundaries: {})",
        config.database_url, config.boundary_path.display());

    let pool = SqlitePool::connect(&config.database_url)
        .await
        .map_err(|e| FFIError::internal(format!("Failed to connect to database: {}", e)))?;

    let repo: Arc<dyn ParticipationRepository> = Arc::new(SqliteParticipationRepository::new(pool.clone()));
    let boundaries: Arc<dyn BoundarySource> = Arc::new(FileBoundarySource::new(&config.boundary_path));
    let reconciler = GeoNameReconciler::new(&config.label_property);

    let inner: Arc<dyn CoverageService> = Arc::new(CoverageServiceImpl::new(
        repo,
        boundaries,
        reconciler,
    ));
    let service = Arc::new(CachedCoverageService::new(inner, config.cache_ttl()));

    *DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))? = Some(pool);
    *COVERAGE_SERVICE.lock().map_err(|_| FFIError::internal("COVERAGE_SERVICE lock poisoned".to_string()))? = Some(service);
    *CONFIG.lock().map_err(|_| FFIError::internal("CONFIG lock poisoned".to_string()))? = Some(config);

    log::info!("Coverage engine initialized");
    Ok(())
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

pub fn get_db_pool() -> FFIResult<SqlitePool> {
    DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("Database pool not initialized".to_string()))
}
pub fn get_config() -> FFIResult<EngineConfig> {
    CONFIG.lock().map_err(|_| FFIError::internal("CONFIG lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("Config not initialized".to_string()))
}
pub fn get_coverage_service() -> FFIResult<Arc<CachedCoverageService>> {
    COVERAGE_SERVICE.lock().map_err(|_| FFIError::internal("COVERAGE_SERVICE lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("CoverageService not initialized".to_string()))
}
