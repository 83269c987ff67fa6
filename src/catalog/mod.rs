//! Model catalog module
//!
//! Enumerates the profile models available for searching.

mod registry;

pub use registry::{Model, ModelCatalog, DEFAULT_MODEL_EXTENSION};
