use crate::domains::coverage::types::CountyStats;
use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property used by the Kenya county boundary file
pub const DEFAULT_LABEL_PROPERTY: &str = "COUNTY";

/// County name placed on features that carry no label at all
pub const UNKNOWN_COUNTY: &str = "Unknown County";

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

/// One named polygon from an external boundary file.
/// Members other than `type`, `properties` and `geometry` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoundaryFeature {
    pub fn new(properties: Map<String, Value>, geometry: Value) -> Self {
        Self {
            kind: feature_type(),
            properties,
            geometry,
            extra: Map::new(),
        }
    }

    /// Label text of `property`; numeric labels are rendered as text
    pub fn label(&self, property: &str) -> Option<String> {
        match self.properties.get(property)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<BoundaryFeature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        Self {
            kind: collection_type(),
            features,
            extra: Map::new(),
        }
    }
}

/// The statistics merged into each feature's properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyProperties {
    pub county_id: Option<RecordId>,
    pub county_name: String,
    pub training_count: i64,
    pub participant_count: i64,
    pub facility_count: i64,
    pub intensity: f64,
    pub coverage_percentage: f64,
}

impl CountyProperties {
    /// Zero-valued payload for a feature with no matching county
    pub fn unmatched(label: Option<&str>) -> Self {
        Self {
            county_id: None,
            county_name: label.unwrap_or(UNKNOWN_COUNTY).to_string(),
            training_count: 0,
            participant_count: 0,
            facility_count: 0,
            intensity: 0.0,
            coverage_percentage: 0.0,
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("county_id".to_string(), self.county_id.map_or(Value::Null, Value::from));
        map.insert("county_name".to_string(), Value::from(self.county_name));
        map.insert("training_count".to_string(), Value::from(self.training_count));
        map.insert("participant_count".to_string(), Value::from(self.participant_count));
        map.insert("facility_count".to_string(), Value::from(self.facility_count));
        map.insert("intensity".to_string(), Value::from(self.intensity));
        map.insert("coverage_percentage".to_string(), Value::from(self.coverage_percentage));
        map
    }
}

impl From<&CountyStats> for CountyProperties {
    fn from(stats: &CountyStats) -> Self {
        Self {
            county_id: Some(stats.county_id),
            county_name: stats.county_name.clone(),
            training_count: stats.training_count,
            participant_count: stats.participant_count,
            facility_count: stats.facility_count,
            intensity: stats.intensity,
            coverage_percentage: stats.coverage_percentage,
        }
    }
}

/// Outcome of one merge pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub features: Vec<BoundaryFeature>,
    pub matched: usize,
    /// Labels (or `None` for unlabeled features) that found no county
    pub unmatched_labels: Vec<Option<String>>,
}
