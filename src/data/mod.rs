//! Dataset generation.

pub mod synthetic;

pub use synthetic::*;
