//! cas-typer: parallel HMM search and CRISPR-Cas protein typing
//!
//! Runs `hmmsearch` once per profile model against a protein set, merges the
//! hits and classifies each one into a CRISPR-Cas family by keyword lookup.

pub mod catalog;
pub mod config;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod results;
pub mod search;
pub mod sequences;
pub mod typing;

pub use catalog::{Model, ModelCatalog};
pub use config::Settings;
pub use error::{Error, ToolError};
pub use pipeline::{Pipeline, RunConfig, RunSummary};
pub use results::{HitCollection, HitRecord};
pub use search::{Dispatcher, HmmSearch, SearchTool};
pub use typing::{ClassificationResult, Classifier, Confidence, TypeMapping};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
