pub mod reconciler;
pub mod source;
pub mod types;

pub use reconciler::GeoNameReconciler;
pub use source::{BoundarySource, FileBoundarySource, StaticBoundarySource};
pub use types::{BoundaryFeature, FeatureCollection};
