use coverage_core::domains::coverage::aggregator::CoverageAggregator;
use coverage_core::domains::coverage::service::CoverageService;
use coverage_core::domains::coverage::types::FilterSet;
use coverage_core::domains::geo::reconciler::GeoNameReconciler;
use coverage_core::domains::geo::source::{BoundarySource, FileBoundarySource};
use coverage_core::{globals, EngineConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🗺️  Coverage Heatmap Debug Tool");
    println!("==============================");

    let config = EngineConfig::from_env()?;
    println!("📍 Database:   {}", config.database_url);
    println!("📍 Boundaries: {}", config.boundary_path.display());

    // Optional filter as the first argument, e.g. '{"periods":["2024-05"]}'
    let filter: FilterSet = match env::args().nth(1) {
        Some(raw) => serde_json::from_str(&raw)?,
        None => FilterSet::default(),
    };

    globals::initialize(config.clone()).await?;
    let service = globals::get_coverage_service()?;

    print_county_report(service.as_ref(), &filter).await?;
    print_unmatched_boundaries(service.as_ref(), &filter, &config).await?;

    println!("\n✅ DEBUG SESSION COMPLETED");
    Ok(())
}

async fn print_county_report(
    service: &dyn CoverageService,
    filter: &FilterSet,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = service.county_report(filter).await?;

    println!("\n📊 COUNTY COVERAGE");
    println!("------------------");
    println!(
        "{:<20} {:>9} {:>12} {:>10} {:>9} {:>9}  band",
        "county", "trainings", "enrollments", "facilities", "intensity", "coverage"
    );
    for county in CoverageAggregator::top_counties(&report.counties, report.counties.len()) {
        let band = CoverageAggregator::band(county.intensity, &report.levels);
        println!(
            "{:<20} {:>9} {:>12} {:>10} {:>9.2} {:>8.1}%  {}",
            county.county_name,
            county.training_count,
            county.participant_count,
            county.facility_count,
            county.intensity,
            county.coverage_percentage,
            band.as_str()
        );
    }

    let s = &report.summary;
    println!("\n   Trainings: {}  Enrollments: {}  Participants: {}  Facilities: {}",
        s.total_trainings, s.total_enrollments, s.unique_participants, s.facilities_reached);
    println!("   Counties with trainings: {}/{}  Average coverage: {:.1}%",
        s.counties_with_trainings, s.total_counties, s.average_coverage_percentage);
    println!("   Scale max intensity: {:.2}", report.levels.max_intensity);
    Ok(())
}

async fn print_unmatched_boundaries(
    service: &dyn CoverageService,
    filter: &FilterSet,
    config: &EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🔗 BOUNDARY NAME RECONCILIATION");
    println!("-------------------------------");

    let boundaries = match FileBoundarySource::new(&config.boundary_path).load().await {
        Ok(collection) => collection,
        Err(e) => {
            println!("❌ {}", e);
            return Ok(());
        }
    };

    let report = service.county_report(filter).await?;
    let outcome = GeoNameReconciler::new(&config.label_property)
        .merge_with_outcome(&report.counties, &boundaries.features);

    println!("   Matched {} of {} features", outcome.matched, boundaries.features.len());
    for label in &outcome.unmatched_labels {
        println!("   ⚠️  {}", label.as_deref().unwrap_or("<no label>"));
    }
    Ok(())
}
