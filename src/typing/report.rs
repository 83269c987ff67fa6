//! Ranked text report of classification results

use super::classifier::ClassificationResult;
use super::output::format_general;
use chrono::{DateTime, Local};
use std::collections::HashSet;

/// Label counts in order of first appearance
pub fn family_counts(results: &[ClassificationResult]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for result in results {
        match counts.iter_mut().find(|(label, _)| *label == result.family_label) {
            Some((_, count)) => *count += 1,
            None => counts.push((result.family_label.clone(), 1)),
        }
    }
    counts
}

/// Results sorted by descending probability; ties keep their input order
pub fn ranked(results: &[ClassificationResult]) -> Vec<&ClassificationResult> {
    let mut sorted: Vec<&ClassificationResult> = results.iter().collect();
    sorted.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    sorted
}

/// Render the Markdown report
pub fn render_report(results: &[ClassificationResult], generated: DateTime<Local>) -> String {
    let proteins: HashSet<&str> = results.iter().map(|r| r.query_id.as_str()).collect();

    let mut report = String::from("# CRISPR-Cas Protein Classification Report\n\n");
    report.push_str(&format!(
        "Generated: {}\n\n",
        generated.format("%Y-%m-%d %H:%M:%S")
    ));

    report.push_str("## Summary\n");
    report.push_str(&format!(
        "Number of proteins analyzed: {}\nNumber of classified hits: {}\n\n",
        proteins.len(),
        results.len()
    ));

    report.push_str("## Type Distribution\n");
    for (label, count) in family_counts(results) {
        report.push_str(&format!("- {}: {} proteins\n", label, count));
    }
    report.push('\n');

    report.push_str("## Detailed Results (Sorted by Probability)\n");
    for result in ranked(results) {
        report.push_str(&format!(
            "- {}: {} (Confidence: {}, Probability: {:.1}%, E-value: {})\n",
            result.query_id,
            result.family_label,
            result.confidence,
            result.probability,
            format_general(result.e_value, 4)
        ));
    }

    report
}
