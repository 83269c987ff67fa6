//! Search orchestration module
//!
//! Runs the external search tool once per model with bounded concurrency,
//! parses each model's output and aggregates the hits.

mod executor;
mod models;
mod tool;

pub use executor::Dispatcher;
pub use models::*;
pub use tool::{HmmSearch, SearchTool, DEFAULT_BINARY};
