//! Parameter identification.
//!
//! Responsibilities:
//!
//! - score a raw parameter vector against the dataset (`goal`)
//! - run many randomized minimizations per (model, method) in parallel
//! - rank the outcomes per method and per model (`search`)

pub mod goal;
pub mod search;

pub use goal::*;
pub use search::*;
