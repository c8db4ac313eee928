// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod ffi;
pub mod globals;
pub mod types;

pub use config::EngineConfig;

// Entry point for initialization
/// Initialize the library from the given configuration.
/// This function must be called before any service getter in `globals`.
pub async fn initialize(config: EngineConfig) -> ffi::FFIResult<()> {
    globals::initialize(config).await
}

/// Initialize from `COVERAGE_*` environment variables (and `.env`)
pub async fn initialize_from_env() -> ffi::FFIResult<()> {
    let config = EngineConfig::from_env().map_err(ffi::error::FFIError::from)?;
    globals::initialize(config).await
}

/// Get a reference to the SQLite connection pool
/// This is primarily for internal use
pub fn get_db_pool() -> ffi::FFIResult<sqlx::SqlitePool> {
    globals::get_db_pool()
}
