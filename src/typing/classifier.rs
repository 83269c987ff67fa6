//! Classification of hits into CRISPR-Cas families

use super::mapping::TypeMapping;
use crate::results::HitRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// E-value at or below which a hit is high confidence
pub const HIGH_CONFIDENCE_E_VALUE: f64 = 1e-10;

/// E-value at or below which a hit is medium confidence
pub const MEDIUM_CONFIDENCE_E_VALUE: f64 = 1e-5;

/// Confidence tier derived from the e-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Tier for an e-value using the fixed thresholds
    pub fn from_e_value(e_value: f64) -> Self {
        if e_value <= HIGH_CONFIDENCE_E_VALUE {
            Self::High
        } else if e_value <= MEDIUM_CONFIDENCE_E_VALUE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Self::High),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            other => Err(format!("unknown confidence tier: {}", other)),
        }
    }
}

/// Probability score in [0, 100] from an e-value.
///
/// `-10 * log10(e)` capped at 100; an exact zero is maximal. E-values above 1
/// (and infinity) floor at 0.
pub fn probability(e_value: f64) -> f64 {
    if e_value <= 0.0 {
        return 100.0;
    }
    let p = -10.0 * e_value.log10();
    if p > 0.0 {
        p.min(100.0)
    } else {
        0.0
    }
}

/// Family assignment for a single hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub query_id: String,
    pub family_label: String,
    pub confidence: Confidence,
    pub probability: f64,
    pub e_value: f64,
    pub score: f64,
    pub source_model: String,
}

/// Classifies hits against a type mapping
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    mapping: TypeMapping,
    dedup_by_query: bool,
}

impl Classifier {
    pub fn new(mapping: TypeMapping) -> Self {
        Self {
            mapping,
            dedup_by_query: false,
        }
    }

    /// Keep only the best hit per query id
    pub fn with_dedup_by_query(mut self, dedup: bool) -> Self {
        self.dedup_by_query = dedup;
        self
    }

    pub fn mapping(&self) -> &TypeMapping {
        &self.mapping
    }

    /// Classify a single hit
    pub fn classify(&self, hit: &HitRecord) -> ClassificationResult {
        let family_label = self.mapping.label_for(&hit.target_name).to_string();

        ClassificationResult {
            query_id: hit.query_id.clone(),
            family_label,
            confidence: Confidence::from_e_value(hit.e_value),
            probability: probability(hit.e_value),
            e_value: hit.e_value,
            score: hit.score,
            source_model: hit.source_model.clone(),
        }
    }

    /// Classify every hit, one result per hit unless dedup is enabled
    pub fn classify_all(&self, hits: &[HitRecord]) -> Vec<ClassificationResult> {
        let selected: Vec<&HitRecord> = if self.dedup_by_query {
            best_hit_per_query(hits)
        } else {
            hits.iter().collect()
        };

        let results: Vec<_> = selected.into_iter().map(|h| self.classify(h)).collect();

        let unknown = results
            .iter()
            .filter(|r| r.family_label == super::mapping::UNKNOWN_LABEL)
            .count();
        info!(
            "Classified {} hits ({} without a matching family)",
            results.len(),
            unknown
        );

        results
    }
}

/// Best hit per query in first-seen query order
fn best_hit_per_query(hits: &[HitRecord]) -> Vec<&HitRecord> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut best: Vec<&HitRecord> = Vec::new();

    for hit in hits {
        match index.get(hit.query_id.as_str()) {
            Some(&i) => {
                if hit.is_better_than(best[i]) {
                    best[i] = hit;
                }
            }
            None => {
                index.insert(hit.query_id.as_str(), best.len());
                best.push(hit);
            }
        }
    }

    debug!("Reduced {} hits to {} best hits", hits.len(), best.len());
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_boundaries() {
        assert_eq!(Confidence::from_e_value(0.0), Confidence::High);
        assert_eq!(Confidence::from_e_value(1e-10), Confidence::High);
        assert_eq!(Confidence::from_e_value(1.1e-10), Confidence::Medium);
        assert_eq!(Confidence::from_e_value(1e-5), Confidence::Medium);
        assert_eq!(Confidence::from_e_value(1.0001e-5), Confidence::Low);
        assert_eq!(Confidence::from_e_value(f64::INFINITY), Confidence::Low);
    }

    #[test]
    fn test_probability_formula() {
        assert_eq!(probability(0.0), 100.0);
        assert_eq!(probability(1e-200), 100.0);
        assert!((probability(1e-5) - 50.0).abs() < 1e-9);
        assert!((probability(0.01) - 20.0).abs() < 1e-9);
        assert_eq!(probability(1.0), 0.0);
        assert_eq!(probability(5.0), 0.0);
        assert_eq!(probability(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_probability_is_non_increasing() {
        let e_values = [0.0, 1e-300, 1e-50, 1e-12, 1e-10, 3e-7, 1e-5, 0.02, 0.5, 1.0, 9.0];
        let probs: Vec<f64> = e_values.iter().map(|e| probability(*e)).collect();
        for pair in probs.windows(2) {
            assert!(pair[0] >= pair[1], "{:?}", probs);
        }
    }

    #[test]
    fn test_classify_cas9_hit() {
        let classifier = Classifier::default();
        let hit = HitRecord::new("protA", "cas9_hmm", 1e-12, 250.3, "cas9_hmm");
        let result = classifier.classify(&hit);

        assert_eq!(result.query_id, "protA");
        assert!(result.family_label.contains("Cas9"));
        assert_eq!(result.confidence, Confidence::High);
        assert!((result.probability - 100.0).abs() < 1e-9);
        assert_eq!(result.score, 250.3);
    }

    #[test]
    fn test_one_result_per_hit_by_default() {
        let hits = vec![
            HitRecord::new("p1", "cas9", 1e-20, 100.0, "cas9"),
            HitRecord::new("p1", "cas3", 1e-30, 120.0, "cas3"),
            HitRecord::new("p2", "tnpb", 0.5, 3.0, "tnpb"),
        ];
        let results = Classifier::default().classify_all(&hits);
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].family_label, "Unknown");
        assert_eq!(results[2].confidence, Confidence::Low);
    }

    #[test]
    fn test_dedup_keeps_best_hit() {
        let hits = vec![
            HitRecord::new("p1", "cas9", 1e-20, 100.0, "cas9"),
            HitRecord::new("p2", "cas1", 1e-6, 30.0, "cas1"),
            HitRecord::new("p1", "cas3", 1e-30, 120.0, "cas3"),
        ];
        let results = Classifier::default()
            .with_dedup_by_query(true)
            .classify_all(&hits);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query_id, "p1");
        assert_eq!(results[0].family_label, "Type I (Cas3)");
        assert_eq!(results[1].query_id, "p2");
    }

    #[test]
    fn test_confidence_parse() {
        assert_eq!("Medium".parse::<Confidence>().unwrap(), Confidence::Medium);
        assert!("medium".parse::<Confidence>().is_err());
        assert_eq!(Confidence::Low.to_string(), "Low");
    }
}
