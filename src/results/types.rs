//! Hit record and per-model bookkeeping types

use serde::{Deserialize, Serialize};

/// A single match between a query sequence and a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    /// Sequence identifier of the query protein
    pub query_id: String,
    /// Matched model name as reported by the tool (model id if absent)
    pub target_name: String,
    /// Never negative; `f64::INFINITY` means "no evidence"
    pub e_value: f64,
    /// Bit score, 0.0 when unparseable
    pub score: f64,
    /// Model that produced this hit
    pub source_model: String,
}

impl HitRecord {
    /// Create a new hit, coercing an invalid e-value to infinity
    pub fn new(
        query_id: impl Into<String>,
        target_name: impl Into<String>,
        e_value: f64,
        score: f64,
        source_model: impl Into<String>,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            target_name: target_name.into(),
            e_value: sanitize_e_value(e_value),
            score,
            source_model: source_model.into(),
        }
    }

    /// Ordering key for "best hit": lower e-value, then higher score
    pub fn is_better_than(&self, other: &HitRecord) -> bool {
        match self.e_value.total_cmp(&other.e_value) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.score > other.score,
        }
    }
}

/// Map NaN and negative e-values to +inf
pub fn sanitize_e_value(e_value: f64) -> f64 {
    if e_value.is_nan() || e_value < 0.0 {
        f64::INFINITY
    } else {
        e_value
    }
}

/// A model whose search invocation failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: String,
    pub error: String,
}

/// Timing information for a completed model search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTiming {
    pub model: String,
    pub elapsed_ms: u64,
    pub hit_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_e_values_become_infinite() {
        let hit = HitRecord::new("p1", "cas9", -1.0, 10.0, "cas9");
        assert!(hit.e_value.is_infinite());

        let hit = HitRecord::new("p1", "cas9", f64::NAN, 10.0, "cas9");
        assert_eq!(hit.e_value, f64::INFINITY);

        let hit = HitRecord::new("p1", "cas9", 0.0, 10.0, "cas9");
        assert_eq!(hit.e_value, 0.0);
    }

    #[test]
    fn test_best_hit_ordering() {
        let strong = HitRecord::new("p1", "cas9", 1e-30, 100.0, "cas9");
        let weak = HitRecord::new("p1", "cas3", 1e-5, 200.0, "cas3");
        assert!(strong.is_better_than(&weak));
        assert!(!weak.is_better_than(&strong));

        let tied = HitRecord::new("p1", "cas3", 1e-30, 150.0, "cas3");
        assert!(tied.is_better_than(&strong));
    }
}
