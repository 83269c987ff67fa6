//! Parser for `hmmsearch --tblout` tabular output
//!
//! Data lines are whitespace delimited. The first 18 columns are fixed and the
//! remainder is a free-text description, so a line is split into at most 23
//! fields. Only the first six carry information used here:
//!
//! | index | column            |
//! |-------|-------------------|
//! | 0     | target (sequence) |
//! | 2     | query (model)     |
//! | 4     | full-seq e-value  |
//! | 5     | full-seq score    |

use super::types::HitRecord;
use tracing::{debug, warn};

/// Maximum number of fields a line is split into
pub const MAX_FIELDS: usize = 23;

/// Rows with fewer fields than this are malformed
pub const MIN_FIELDS: usize = 9;

/// Placeholder the tool prints for an absent name
const PLACEHOLDER: &str = "-";

/// Parse all lines of one model's output into hit records.
///
/// Comment lines, blank lines and malformed rows are skipped. This never
/// fails; the result is the best-effort list of rows that could be read.
pub fn parse_tblout<I, S>(lines: I, model_id: &str) -> Vec<HitRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hits = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        let line = line.as_ref();
        if is_ignorable(line) {
            continue;
        }

        match parse_line(line, model_id) {
            Some(hit) => hits.push(hit),
            None => {
                skipped += 1;
                warn!(
                    "Skipping malformed {} output line: {}",
                    model_id,
                    line.trim_end()
                );
            }
        }
    }

    if skipped > 0 {
        debug!("{}: parsed {} hits, skipped {} lines", model_id, hits.len(), skipped);
    }

    hits
}

/// Parse a single data line. Returns `None` for rows with too few fields.
pub fn parse_line(line: &str, model_id: &str) -> Option<HitRecord> {
    let fields: Vec<&str> = line.split_whitespace().take(MAX_FIELDS).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let query_id = fields[0];
    let target_name = match fields[2] {
        PLACEHOLDER => model_id,
        name => name,
    };

    let e_value = fields[4].parse::<f64>().unwrap_or_else(|_| {
        debug!("Unparseable e-value '{}' for {}, using inf", fields[4], query_id);
        f64::INFINITY
    });
    let score = fields[5].parse::<f64>().unwrap_or_else(|_| {
        debug!("Unparseable score '{}' for {}, using 0.0", fields[5], query_id);
        0.0
    });

    Some(HitRecord::new(query_id, target_name, e_value, score, model_id))
}

fn is_ignorable(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}
