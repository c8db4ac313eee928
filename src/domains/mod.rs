pub mod coverage;
pub mod geo;

pub use coverage::{CoverageAggregator, CoverageService, CountyStats, FilterSet};
pub use geo::GeoNameReconciler;
