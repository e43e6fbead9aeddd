//! Constitutive material-strength models.
//!
//! Models are implemented as small, stateless capability objects so that the
//! goal function and the search code can stay generic.

pub mod johnson_cook;
pub mod khan_huang_liang;
pub mod model;
pub mod zerilli_armstrong;

pub use johnson_cook::*;
pub use khan_huang_liang::*;
pub use model::*;
pub use zerilli_armstrong::*;
