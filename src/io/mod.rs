//! Input/output helpers.
//!
//! - CSV dataset ingest + validation (`ingest`)
//! - result, sensitivity-log and dataset exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
