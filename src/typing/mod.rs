//! CRISPR-Cas typing module
//!
//! Maps hits to family labels by ordered keyword lookup, derives confidence
//! and probability from the e-value, and renders tabular and text output.

mod classifier;
mod mapping;
pub mod output;
pub mod report;

pub use classifier::*;
pub use mapping::{TypeMapping, UNKNOWN_LABEL};
pub use output::{read_tsv, write_tsv, TSV_HEADER};
pub use report::render_report;
