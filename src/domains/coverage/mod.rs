pub mod aggregator;
pub mod cache;
pub mod repository;
pub mod service;
pub mod types;

pub use aggregator::CoverageAggregator;
pub use cache::CachedCoverageService;
pub use repository::{ParticipationRepository, SqliteParticipationRepository};
pub use service::{CoverageService, CoverageServiceImpl};
pub use types::{CountyRef, CountyStats, CoverageReport, FilterSet, ParticipationRecord, TrainingType};
