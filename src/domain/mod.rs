//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - experimental observations (`DataRow`) and their summary stats
//! - the model and method registries (`ModelKind`, `Method`)
//! - run configuration (`FitConfig`) and export records (`ResultsFile`)

pub mod types;

pub use types::*;
