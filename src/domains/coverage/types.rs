use crate::types::{parse_iso_date, RecordId, YearMonth};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;

/// Category of a training event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingType {
    ProgramTraining,
    FacilityMentorship,
}

impl TrainingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingType::ProgramTraining => "program_training",
            TrainingType::FacilityMentorship => "facility_mentorship",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "program_training" => Some(TrainingType::ProgramTraining),
            "facility_mentorship" => Some(TrainingType::FacilityMentorship),
            _ => None,
        }
    }
}

impl fmt::Display for TrainingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One participant enrolled in one training event, pre-joined with its
/// facility -> subcounty -> county chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub training_id: RecordId,
    pub training_type: TrainingType,
    pub program_id: Option<RecordId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub facility_id: Option<RecordId>,
    pub subcounty_id: Option<RecordId>,
    pub county_id: Option<RecordId>,
    pub participant_user_id: RecordId,
    pub department_id: Option<RecordId>,
    pub cadre_id: Option<RecordId>,
}

/// Fully resolved geography of a participation record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeographyChain {
    pub facility_id: RecordId,
    pub subcounty_id: RecordId,
    pub county_id: RecordId,
}

impl ParticipationRecord {
    /// The facility -> subcounty -> county chain, if every link is present
    pub fn geography(&self) -> Option<GeographyChain> {
        Some(GeographyChain {
            facility_id: self.facility_id?,
            subcounty_id: self.subcounty_id?,
            county_id: self.county_id?,
        })
    }
}

/// SQLite row for a participation record (LEFT JOINed, so links may be NULL)
#[derive(Debug, Clone, FromRow)]
pub struct ParticipationRow {
    pub training_id: i64,
    pub training_type: String,
    pub program_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub facility_id: Option<i64>,
    pub subcounty_id: Option<i64>,
    pub county_id: Option<i64>,
    pub participant_user_id: i64,
    pub department_id: Option<i64>,
    pub cadre_id: Option<i64>,
}

impl ParticipationRow {
    /// Convert to a record. Rows with an unknown training type are rejected;
    /// unparseable dates degrade to `None`.
    pub fn into_record(self) -> Option<ParticipationRecord> {
        let training_type = match TrainingType::from_str(&self.training_type) {
            Some(t) => t,
            None => {
                log::debug!(
                    "Skipping participation in training {}: unknown training type '{}'",
                    self.training_id, self.training_type
                );
                return None;
            }
        };

        let parse_date = |value: &Option<String>, field: &str| -> Option<NaiveDate> {
            let raw = value.as_deref()?;
            let parsed = parse_iso_date(raw);
            if parsed.is_none() {
                log::debug!("Training {}: ignoring unparseable {} '{}'", self.training_id, field, raw);
            }
            parsed
        };

        Some(ParticipationRecord {
            training_id: self.training_id,
            training_type,
            program_id: self.program_id,
            start_date: parse_date(&self.start_date, "start_date"),
            end_date: parse_date(&self.end_date, "end_date"),
            facility_id: self.facility_id,
            subcounty_id: self.subcounty_id,
            county_id: self.county_id,
            participant_user_id: self.participant_user_id,
            department_id: self.department_id,
            cadre_id: self.cadre_id,
        })
    }
}

/// A county known to the system, with its county-wide facility total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CountyRef {
    pub id: RecordId,
    pub name: String,
    pub total_facilities: i64,
}

impl CountyRef {
    pub fn new(id: RecordId, name: &str, total_facilities: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            total_facilities,
        }
    }
}

/// The single geography restriction that is effectively applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeographyScope<'a> {
    Unrestricted,
    Facilities(&'a BTreeSet<RecordId>),
    Subcounties(&'a BTreeSet<RecordId>),
    Counties(&'a BTreeSet<RecordId>),
}

/// Caller supplied filter for coverage queries. Empty fields impose no restriction.
///
/// ```rust
/// use coverage_core::domains::coverage::types::{FilterSet, TrainingType};
///
/// let filter = FilterSet::new()
///     .with_training_types(vec![TrainingType::ProgramTraining])
///     .with_periods(vec!["2024-05".to_string(), "2024-06".to_string()])
///     .with_county_ids(vec![3]);
/// ```
///
/// Ordered sets keep the serialized form deterministic, which the cache relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub program_ids: BTreeSet<RecordId>,
    pub training_types: BTreeSet<TrainingType>,
    /// `YYYY-MM` tokens, OR-combined. Malformed tokens are ignored.
    pub periods: BTreeSet<String>,
    pub county_ids: BTreeSet<RecordId>,
    pub subcounty_ids: BTreeSet<RecordId>,
    pub facility_ids: BTreeSet<RecordId>,
    pub department_id: Option<RecordId>,
    pub cadre_id: Option<RecordId>,
}

impl FilterSet {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program_ids(mut self, ids: Vec<RecordId>) -> Self {
        self.program_ids = ids.into_iter().collect();
        self
    }

    pub fn with_training_types(mut self, types: Vec<TrainingType>) -> Self {
        self.training_types = types.into_iter().collect();
        self
    }

    pub fn with_periods(mut self, periods: Vec<String>) -> Self {
        self.periods = periods.into_iter().collect();
        self
    }

    pub fn with_county_ids(mut self, ids: Vec<RecordId>) -> Self {
        self.county_ids = ids.into_iter().collect();
        self
    }

    pub fn with_subcounty_ids(mut self, ids: Vec<RecordId>) -> Self {
        self.subcounty_ids = ids.into_iter().collect();
        self
    }

    pub fn with_facility_ids(mut self, ids: Vec<RecordId>) -> Self {
        self.facility_ids = ids.into_iter().collect();
        self
    }

    pub fn with_department(mut self, department_id: RecordId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn with_cadre(mut self, cadre_id: RecordId) -> Self {
        self.cadre_id = Some(cadre_id);
        self
    }

    /// Most specific geography wins: facility > subcounty > county
    pub fn geography_scope(&self) -> GeographyScope<'_> {
        if !self.facility_ids.is_empty() {
            GeographyScope::Facilities(&self.facility_ids)
        } else if !self.subcounty_ids.is_empty() {
            GeographyScope::Subcounties(&self.subcounty_ids)
        } else if !self.county_ids.is_empty() {
            GeographyScope::Counties(&self.county_ids)
        } else {
            GeographyScope::Unrestricted
        }
    }

    /// Valid period months; malformed tokens are dropped with a debug log
    pub fn period_months(&self) -> Vec<YearMonth> {
        self.periods
            .iter()
            .filter_map(|token| {
                let parsed = YearMonth::parse(token);
                if parsed.is_none() {
                    log::debug!("Skipping malformed period token '{}'", token);
                }
                parsed
            })
            .collect()
    }
}

/// Per-county statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyStats {
    pub county_id: RecordId,
    pub county_name: String,
    pub training_count: i64,
    pub participant_count: i64,
    pub facility_count: i64,
    pub intensity: f64,
    pub coverage_percentage: f64,
}

/// Presentation bucket for an intensity value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityBand {
    None,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl IntensityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityBand::None => "none",
            IntensityBand::Low => "low",
            IntensityBand::Medium => "medium",
            IntensityBand::High => "high",
            IntensityBand::VeryHigh => "very_high",
        }
    }
}

/// Color-scale thresholds at 25/50/75/100 % of the maximum intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityLevels {
    pub max_intensity: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

/// Totals across the filtered participation set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total_trainings: i64,
    pub total_enrollments: i64,
    pub unique_participants: i64,
    pub facilities_reached: i64,
    pub counties_with_trainings: i64,
    pub total_counties: i64,
    pub average_coverage_percentage: f64,
}

/// Dashboard payload: county rows plus scale and totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub counties: Vec<CountyStats>,
    pub levels: IntensityLevels,
    pub summary: CoverageSummary,
}
