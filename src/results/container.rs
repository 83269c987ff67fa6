//! Hit collection for aggregating search results from multiple models

use super::types::*;
use std::collections::HashSet;

/// Flat collection of hits from every model, in completion order
#[derive(Debug, Clone, Default)]
pub struct HitCollection {
    /// All hits, appended as tasks complete
    hits: Vec<HitRecord>,
    /// Models whose invocation failed
    failures: Vec<ModelFailure>,
    /// Per-model timings, in completion order
    timings: Vec<ModelTiming>,
}

impl HitCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one task's hits, preserving their order
    pub fn extend_hits(&mut self, hits: Vec<HitRecord>) {
        self.hits.extend(hits);
    }

    /// Record a failed model
    pub fn add_failure(&mut self, model: impl Into<String>, error: impl Into<String>) {
        self.failures.push(ModelFailure {
            model: model.into(),
            error: error.into(),
        });
    }

    /// Record model timing
    pub fn add_timing(&mut self, timing: ModelTiming) {
        self.timings.push(timing);
    }

    /// Get all hits
    pub fn hits(&self) -> &[HitRecord] {
        &self.hits
    }

    /// Consume the collection, returning the hits
    pub fn into_hits(self) -> Vec<HitRecord> {
        self.hits
    }

    /// Get failed models
    pub fn failures(&self) -> &[ModelFailure] {
        &self.failures
    }

    /// Get timings
    pub fn timings(&self) -> &[ModelTiming] {
        &self.timings
    }

    /// Get total hit count
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of distinct query sequences with at least one hit
    pub fn query_count(&self) -> usize {
        self.hits
            .iter()
            .map(|h| h.query_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Hits produced by one model
    pub fn hits_for_model<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a HitRecord> + 'a {
        self.hits.iter().filter(move |h| h.source_model == model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order_without_dedup() {
        let mut collection = HitCollection::new();
        collection.extend_hits(vec![
            HitRecord::new("p1", "cas9", 1e-20, 100.0, "cas9"),
            HitRecord::new("p2", "cas9", 1e-3, 10.0, "cas9"),
        ]);
        collection.extend_hits(vec![HitRecord::new("p1", "cas3", 1e-8, 50.0, "cas3")]);

        assert_eq!(collection.hit_count(), 3);
        assert_eq!(collection.query_count(), 2);

        let order: Vec<_> = collection.hits().iter().map(|h| h.source_model.as_str()).collect();
        assert_eq!(order, vec!["cas9", "cas9", "cas3"]);
        assert_eq!(collection.hits_for_model("cas3").count(), 1);
    }

    #[test]
    fn test_failures_and_timings() {
        let mut collection = HitCollection::new();
        collection.add_failure("cas12", "hmmsearch exited with exit status: 1");
        collection.add_timing(ModelTiming {
            model: "cas9".to_string(),
            elapsed_ms: 12,
            hit_count: 0,
        });

        assert!(collection.is_empty());
        assert_eq!(collection.failures()[0].model, "cas12");
        assert_eq!(collection.timings().len(), 1);
    }
}
