//! Hit records, tabular output parsing and aggregation

mod container;
pub mod parser;
mod types;

pub use container::HitCollection;
pub use parser::parse_tblout;
pub use types::*;
