//! Local sensitivity (identifiability) analysis around a fitted optimum.
//!
//! Each parameter is perturbed in both directions by a decreasing sequence of
//! magnitudes and the resulting change in the goal function is recorded. A
//! parameter whose perturbation never raises the fitness past a threshold is
//! not determined by the data.

pub mod analysis;

pub use analysis::*;

use crate::math::linspace_exclusive;

/// Sequence of perturbation magnitudes, as fractions of the maximum deviation.
///
/// Implementations must return values in `(0, 1]`.
pub trait DeviationSteps {
    fn fractions(&self, samples: usize) -> Vec<f64>;
}

/// `samples` evenly spaced fractions from `1.0` down to (excluding) `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSteps;

impl DeviationSteps for LinearSteps {
    fn fractions(&self, samples: usize) -> Vec<f64> {
        linspace_exclusive(1.0, 0.0, samples)
    }
}
