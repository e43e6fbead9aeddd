//! Mathematical utilities: line searches, finite differences, spacing helpers.

pub mod line_search;
pub mod numdiff;

pub use line_search::*;
pub use numdiff::*;
