use crate::domains::coverage::types::CountyStats;
use crate::domains::geo::types::{
    BoundaryFeature, CountyProperties, FeatureCollection, MergeOutcome, DEFAULT_LABEL_PROPERTY,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn punctuation_regex() -> &'static Regex {
    static PUNCTUATION_REGEX: OnceLock<Regex> = OnceLock::new();
    PUNCTUATION_REGEX.get_or_init(|| Regex::new(r"[\s\-'.]+").unwrap())
}

fn strip_spaces(value: &str) -> String {
    whitespace_regex().replace_all(value, "").into_owned()
}

fn strip_punctuation(value: &str) -> String {
    punctuation_regex().replace_all(value, "").into_owned()
}

/// Uppercase the first letter of every whitespace-separated word, lowercase the rest.
/// Runs of whitespace collapse to a single space.
fn title_case(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keys under which a database county name is registered
pub fn county_name_keys(name: &str) -> Vec<String> {
    let trimmed = name.trim();
    let upper = trimmed.to_uppercase();
    vec![
        upper.clone(),
        strip_spaces(&upper),
        strip_punctuation(&upper),
        trimmed.to_string(),
        strip_spaces(trimmed),
    ]
}

/// Variants of a boundary label tried in order after the raw label
pub fn label_variants(label: &str) -> Vec<String> {
    let trimmed = label.trim();
    let upper = trimmed.to_uppercase();
    vec![
        upper.clone(),
        trimmed.to_lowercase(),
        title_case(trimmed),
        strip_spaces(&upper),
        strip_punctuation(&upper),
    ]
}

/// Merges county statistics into boundary features by best-effort name matching
#[derive(Debug, Clone)]
pub struct GeoNameReconciler {
    label_property: String,
}

impl Default for GeoNameReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_PROPERTY)
    }
}

impl GeoNameReconciler {
    pub fn new(label_property: &str) -> Self {
        Self {
            label_property: label_property.to_string(),
        }
    }

    pub fn label_property(&self) -> &str {
        &self.label_property
    }

    fn build_lookup(stats: &[CountyStats]) -> HashMap<String, CountyProperties> {
        let mut lookup = HashMap::new();
        for county in stats {
            let payload = CountyProperties::from(county);
            for key in county_name_keys(&county.county_name) {
                lookup.insert(key, payload.clone());
            }
        }
        lookup
    }

    fn find<'a>(
        lookup: &'a HashMap<String, CountyProperties>,
        label: &str,
    ) -> Option<&'a CountyProperties> {
        if let Some(hit) = lookup.get(label) {
            return Some(hit);
        }
        label_variants(label).iter().find_map(|variant| lookup.get(variant))
    }

    /// New features with statistics merged into their properties
    pub fn merge(&self, stats: &[CountyStats], features: &[BoundaryFeature]) -> Vec<BoundaryFeature> {
        self.merge_with_outcome(stats, features).features
    }

    pub fn merge_with_outcome(&self, stats: &[CountyStats], features: &[BoundaryFeature]) -> MergeOutcome {
        let lookup = Self::build_lookup(stats);
        let mut matched = 0usize;
        let mut unmatched_labels = Vec::new();

        let merged = features
            .iter()
            .map(|feature| {
                let label = feature.label(&self.label_property);
                let payload = match label.as_deref().and_then(|l| Self::find(&lookup, l)) {
                    Some(hit) => {
                        matched += 1;
                        hit.clone()
                    }
                    None => {
                        unmatched_labels.push(label.clone());
                        CountyProperties::unmatched(label.as_deref())
                    }
                };

                let mut out = feature.clone();
                out.properties.extend(payload.into_map());
                out
            })
            .collect();

        if !unmatched_labels.is_empty() {
            log::warn!(
                "{} of {} boundary features matched no county: {:?}",
                unmatched_labels.len(),
                features.len(),
                unmatched_labels
            );
        }

        MergeOutcome {
            features: merged,
            matched,
            unmatched_labels,
        }
    }

    /// Merge into a whole collection, keeping its non-feature members
    pub fn merge_collection(&self, stats: &[CountyStats], collection: &FeatureCollection) -> FeatureCollection {
        FeatureCollection {
            kind: collection.kind.clone(),
            features: self.merge(stats, &collection.features),
            extra: collection.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn stats(id: i64, name: &str, trainings: i64) -> CountyStats {
        CountyStats {
            county_id: id,
            county_name: name.to_string(),
            training_count: trainings,
            participant_count: trainings * 3,
            facility_count: 1,
            intensity: 2.5,
            coverage_percentage: 12.5,
        }
    }

    fn feature(label: Value) -> BoundaryFeature {
        let mut props = Map::new();
        props.insert("COUNTY".to_string(), label);
        props.insert("AREA".to_string(), json!(2495.0));
        BoundaryFeature::new(props, json!({"type": "Polygon", "coordinates": []}))
    }

    fn unlabeled() -> BoundaryFeature {
        BoundaryFeature::new(Map::new(), Value::Null)
    }

    const STAT_KEYS: [&str; 7] = [
        "county_id",
        "county_name",
        "training_count",
        "participant_count",
        "facility_count",
        "intensity",
        "coverage_percentage",
    ];

    fn stat_payload(f: &BoundaryFeature) -> Vec<Value> {
        STAT_KEYS.iter().map(|k| f.properties[*k].clone()).collect()
    }

    #[test]
    fn test_name_keys() {
        assert_eq!(
            county_name_keys(" Trans Nzoia "),
            vec!["TRANS NZOIA", "TRANSNZOIA", "TRANSNZOIA", "Trans Nzoia", "TransNzoia"]
        );
        assert_eq!(strip_punctuation("ELGEYO-MARAKWET"), "ELGEYOMARAKWET");
        assert_eq!(strip_punctuation("MURANG'A"), "MURANGA");
        assert_eq!(title_case("TAITA TAVETA"), "Taita Taveta");
    }

    #[test]
    fn test_title_case_collapses_whitespace() {
        assert_eq!(title_case("taita\ttaveta"), "Taita Taveta");
        assert_eq!(title_case("  homa   BAY \n"), "Homa Bay");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_spelling_variants_reconcile_to_same_payload() {
        let reconciler = GeoNameReconciler::default();
        let all = vec![stats(26, "Trans Nzoia", 4), stats(47, "Nairobi", 9)];
        let features = vec![
            feature(json!("TRANSNZOIA")),
            feature(json!("Trans-Nzoia")),
            feature(json!("trans nzoia")),
        ];

        let merged = reconciler.merge(&all, &features);
        assert_eq!(merged.len(), 3);
        let first = stat_payload(&merged[0]);
        assert_eq!(first[0], json!(26));
        assert_eq!(first[1], json!("Trans Nzoia"));
        assert_eq!(stat_payload(&merged[1]), first);
        assert_eq!(stat_payload(&merged[2]), first);
    }

    #[test]
    fn test_unmatched_feature_gets_sentinel() {
        let reconciler = GeoNameReconciler::default();
        let outcome = reconciler.merge_with_outcome(&[stats(47, "Nairobi", 9)], &[feature(json!("Atlantis"))]);
        let props = &outcome.features[0].properties;

        assert_eq!(props["county_id"], Value::Null);
        assert_eq!(props["county_name"], json!("Atlantis"));
        assert_eq!(props["training_count"], json!(0));
        assert_eq!(props["participant_count"], json!(0));
        assert_eq!(props["facility_count"], json!(0));
        assert_eq!(props["intensity"], json!(0.0));
        assert_eq!(props["coverage_percentage"], json!(0.0));
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.unmatched_labels, vec![Some("Atlantis".to_string())]);
    }

    #[test]
    fn test_missing_label_uses_unknown_county() {
        let reconciler = GeoNameReconciler::default();
        let merged = reconciler.merge(&[stats(47, "Nairobi", 9)], &[unlabeled(), feature(Value::Null)]);
        for f in &merged {
            assert_eq!(f.properties["county_name"], json!("Unknown County"));
            for key in STAT_KEYS {
                assert!(f.properties.contains_key(key), "missing {}", key);
            }
        }
    }

    #[test]
    fn test_merge_preserves_order_and_other_properties() {
        let reconciler = GeoNameReconciler::default();
        let all = vec![stats(1, "Mombasa", 2), stats(47, "Nairobi", 9)];
        let mut stale = feature(json!("NAIROBI"));
        stale.properties.insert("training_count".to_string(), json!(999));
        let features = vec![stale, feature(json!("Mombasa"))];

        let merged = reconciler.merge(&all, &features);
        assert_eq!(merged[0].properties["county_id"], json!(47));
        assert_eq!(merged[0].properties["training_count"], json!(9));
        assert_eq!(merged[0].properties["AREA"], json!(2495.0));
        assert_eq!(merged[0].properties["COUNTY"], json!("NAIROBI"));
        assert_eq!(merged[0].geometry, json!({"type": "Polygon", "coordinates": []}));
        assert_eq!(merged[1].properties["county_id"], json!(1));

        // Inputs stay untouched
        assert_eq!(features[0].properties["training_count"], json!(999));
        assert!(!features[1].properties.contains_key("county_id"));
    }

    #[test]
    fn test_custom_label_property_and_collection_members() {
        let reconciler = GeoNameReconciler::new("shapeName");
        let raw = json!({
            "type": "FeatureCollection",
            "name": "kenya_counties",
            "features": [
                {"type": "Feature", "id": 7, "properties": {"shapeName": "Nairobi"}, "geometry": null}
            ]
        });
        let collection: FeatureCollection = serde_json::from_value(raw).unwrap();
        let merged = reconciler.merge_collection(&[stats(47, "Nairobi", 9)], &collection);

        assert_eq!(merged.extra["name"], json!("kenya_counties"));
        assert_eq!(merged.features[0].extra["id"], json!(7));
        assert_eq!(merged.features[0].properties["county_id"], json!(47));

        let serialized = serde_json::to_value(&merged).unwrap();
        assert_eq!(serialized["type"], json!("FeatureCollection"));
        assert_eq!(serialized["features"][0]["type"], json!("Feature"));
    }
}
