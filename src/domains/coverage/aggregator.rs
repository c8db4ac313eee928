use crate::domains::coverage::types::{
    CountyRef, CountyStats, CoverageReport, CoverageSummary, FilterSet, GeographyChain,
    GeographyScope, IntensityBand, IntensityLevels, ParticipationRecord,
};
use crate::types::{RecordId, YearMonth};
use std::collections::{HashMap, HashSet};

const TRAINING_WEIGHT: f64 = 0.4;
const COHORT_WEIGHT: f64 = 0.4;
const FACILITY_WEIGHT: f64 = 0.2;

/// Scale used when no county has any intensity
const DEFAULT_MAX_INTENSITY: f64 = 100.0;

/// Stateless county coverage aggregation.
///
/// All functions are pure over their arguments and never fail: records with a
/// broken geography chain are dropped and malformed period tokens are ignored.
pub struct CoverageAggregator;

/// Filter predicate with period tokens parsed once
struct CompiledFilter<'a> {
    filter: &'a FilterSet,
    months: Vec<YearMonth>,
}

impl<'a> CompiledFilter<'a> {
    fn new(filter: &'a FilterSet) -> Self {
        Self {
            filter,
            months: filter.period_months(),
        }
    }

    fn matches(&self, record: &ParticipationRecord, geo: &GeographyChain) -> bool {
        let f = self.filter;

        if !f.program_ids.is_empty() {
            match record.program_id {
                Some(id) if f.program_ids.contains(&id) => {}
                _ => return false,
            }
        }

        if !f.training_types.is_empty() && !f.training_types.contains(&record.training_type) {
            return false;
        }

        // An all-malformed period list leaves no valid month and imposes no restriction
        if !self.months.is_empty() {
            match record.start_date {
                Some(date) if self.months.iter().any(|m| m.contains(date)) => {}
                _ => return false,
            }
        }

        let in_scope = match f.geography_scope() {
            GeographyScope::Unrestricted => true,
            GeographyScope::Facilities(ids) => ids.contains(&geo.facility_id),
            GeographyScope::Subcounties(ids) => ids.contains(&geo.subcounty_id),
            GeographyScope::Counties(ids) => ids.contains(&geo.county_id),
        };
        if !in_scope {
            return false;
        }

        if let Some(department_id) = f.department_id {
            if record.department_id != Some(department_id) {
                return false;
            }
        }

        if let Some(cadre_id) = f.cadre_id {
            if record.cadre_id != Some(cadre_id) {
                return false;
            }
        }

        true
    }
}

#[derive(Default)]
struct CountyGroup {
    trainings: HashSet<RecordId>,
    facilities: HashSet<RecordId>,
    enrollments: i64,
}

impl CoverageAggregator {
    /// Records that pass `filter`, paired with their resolved geography
    pub fn filter_records<'r>(
        records: &'r [ParticipationRecord],
        filter: &FilterSet,
    ) -> Vec<(&'r ParticipationRecord, GeographyChain)> {
        let compiled = CompiledFilter::new(filter);
        let mut skipped = 0usize;

        let matched: Vec<_> = records
            .iter()
            .filter_map(|record| match record.geography() {
                Some(geo) => Some((record, geo)),
                None => {
                    skipped += 1;
                    None
                }
            })
            .filter(|(record, geo)| compiled.matches(record, geo))
            .collect();

        if skipped > 0 {
            log::debug!("Skipped {} participation records without a facility/subcounty/county chain", skipped);
        }
        matched
    }

    /// One `CountyStats` per entry of `all_counties`, in the same order
    pub fn aggregate(
        records: &[ParticipationRecord],
        filter: &FilterSet,
        all_counties: &[CountyRef],
    ) -> Vec<CountyStats> {
        let matched = Self::filter_records(records, filter);
        Self::stats_from_matches(&matched, all_counties)
    }

    fn stats_from_matches(
        matched: &[(&ParticipationRecord, GeographyChain)],
        all_counties: &[CountyRef],
    ) -> Vec<CountyStats> {
        let mut groups: HashMap<RecordId, CountyGroup> = HashMap::new();
        for (record, geo) in matched {
            let group = groups.entry(geo.county_id).or_default();
            group.trainings.insert(record.training_id);
            group.facilities.insert(geo.facility_id);
            group.enrollments += 1;
        }

        all_counties
            .iter()
            .map(|county| {
                let (training_count, participant_count, facility_count) = groups
                    .get(&county.id)
                    .map(|g| (g.trainings.len() as i64, g.enrollments, g.facilities.len() as i64))
                    .unwrap_or((0, 0, 0));

                CountyStats {
                    county_id: county.id,
                    county_name: county.name.clone(),
                    training_count,
                    participant_count,
                    facility_count,
                    intensity: Self::intensity(training_count, participant_count, facility_count),
                    coverage_percentage: Self::coverage_percentage(facility_count, county.total_facilities),
                }
            })
            .collect()
    }

    /// Training volume, average cohort size and facility reach blended with fixed weights
    pub fn intensity(training_count: i64, participant_count: i64, facility_count: i64) -> f64 {
        if training_count <= 0 {
            return 0.0;
        }
        let trainings = training_count as f64;
        let cohort = participant_count.max(0) as f64 / trainings.max(1.0);
        trainings * TRAINING_WEIGHT + cohort * COHORT_WEIGHT + facility_count.max(0) as f64 * FACILITY_WEIGHT
    }

    /// Share of a county's facilities with at least one match, rounded to one decimal
    pub fn coverage_percentage(facilities_with_match: i64, total_facilities: i64) -> f64 {
        if total_facilities <= 0 {
            return 0.0;
        }
        let raw = facilities_with_match.max(0) as f64 / total_facilities as f64 * 100.0;
        round_to(raw, 1).clamp(0.0, 100.0)
    }

    pub fn intensity_levels(stats: &[CountyStats]) -> IntensityLevels {
        let max = stats.iter().map(|s| s.intensity).fold(0.0_f64, f64::max);
        let max_intensity = if max > 0.0 { max } else { DEFAULT_MAX_INTENSITY };

        IntensityLevels {
            max_intensity,
            low: max_intensity * 0.25,
            medium: max_intensity * 0.5,
            high: max_intensity * 0.75,
            very_high: max_intensity,
        }
    }

    pub fn band(intensity: f64, levels: &IntensityLevels) -> IntensityBand {
        if intensity <= 0.0 {
            IntensityBand::None
        } else if intensity <= levels.low {
            IntensityBand::Low
        } else if intensity <= levels.medium {
            IntensityBand::Medium
        } else if intensity <= levels.high {
            IntensityBand::High
        } else {
            IntensityBand::VeryHigh
        }
    }

    /// County rows, intensity scale and totals from one filtering pass
    pub fn report(
        records: &[ParticipationRecord],
        filter: &FilterSet,
        all_counties: &[CountyRef],
    ) -> CoverageReport {
        let matched = Self::filter_records(records, filter);
        let counties = Self::stats_from_matches(&matched, all_counties);
        let levels = Self::intensity_levels(&counties);

        let known: HashSet<RecordId> = all_counties.iter().map(|c| c.id).collect();
        let in_known = matched.iter().filter(|(_, geo)| known.contains(&geo.county_id));

        let mut trainings = HashSet::new();
        let mut participants = HashSet::new();
        let mut facilities = HashSet::new();
        let mut enrollments = 0i64;
        for (record, geo) in in_known {
            trainings.insert(record.training_id);
            participants.insert(record.participant_user_id);
            facilities.insert(geo.facility_id);
            enrollments += 1;
        }

        let average_coverage_percentage = if counties.is_empty() {
            0.0
        } else {
            let total: f64 = counties.iter().map(|c| c.coverage_percentage).sum();
            round_to(total / counties.len() as f64, 1)
        };

        let summary = CoverageSummary {
            total_trainings: trainings.len() as i64,
            total_enrollments: enrollments,
            unique_participants: participants.len() as i64,
            facilities_reached: facilities.len() as i64,
            counties_with_trainings: counties.iter().filter(|c| c.training_count > 0).count() as i64,
            total_counties: counties.len() as i64,
            average_coverage_percentage,
        };

        CoverageReport { counties, levels, summary }
    }

    /// Highest-intensity counties first; ties broken by name
    pub fn top_counties(stats: &[CountyStats], limit: usize) -> Vec<CountyStats> {
        let mut ranked: Vec<CountyStats> = stats.to_vec();
        ranked.sort_by(|a, b| {
            b.intensity
                .total_cmp(&a.intensity)
                .then_with(|| a.county_name.cmp(&b.county_name))
        });
        ranked.truncate(limit);
        ranked
    }
}

/// Round half away from zero to `decimals` places
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
