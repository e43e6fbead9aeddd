//! The model capability contract.
//!
//! A material model is a pure function `σ(ε, ε̇, T; p)` plus the metadata the
//! optimizer needs: parameter labels, a scaling vector mapping the optimizer's
//! raw (order-one) parameters to physical units, and optional box bounds on the
//! physical parameters.

use crate::error::AppError;

/// Reference strain rate `ε̇0` (1/s).
pub const REFERENCE_STRAIN_RATE: f64 = 1e-3;
/// Reference (room) temperature (K).
pub const REFERENCE_TEMPERATURE: f64 = 293.15;
/// Melting temperature of the reference steel (K).
pub const MELTING_TEMPERATURE: f64 = 1425.0 + 273.15;

/// Raw-space step for the default central-difference derivatives.
pub const DERIVATIVE_STEP: f64 = 1e-9;

/// Homologous temperature `T* = (T - T_ref) / (T_melt - T_ref)`.
pub fn homologous_temperature(temperature: f64) -> f64 {
    (temperature - REFERENCE_TEMPERATURE) / (MELTING_TEMPERATURE - REFERENCE_TEMPERATURE)
}

/// Dimensionless strain rate `ε̇ / ε̇0`.
pub fn relative_strain_rate(strain_rate: f64) -> f64 {
    strain_rate / REFERENCE_STRAIN_RATE
}

/// Capability interface implemented by every constitutive model.
///
/// Implementations are stateless; parameters are always passed in.
pub trait MaterialModel: Send + Sync {
    /// Short identifier (e.g. `JC`).
    fn name(&self) -> &'static str;

    /// Parameter labels, in parameter order.
    fn labels(&self) -> &'static [&'static str];

    /// Factors mapping raw optimizer parameters to physical units.
    fn scaling(&self) -> &'static [f64];

    fn parameter_count(&self) -> usize {
        self.labels().len()
    }

    fn lower_bounds(&self) -> Vec<f64> {
        vec![f64::NEG_INFINITY; self.parameter_count()]
    }

    fn upper_bounds(&self) -> Vec<f64> {
        vec![f64::INFINITY; self.parameter_count()]
    }

    /// Whether the model constrains its physical parameters at all.
    fn has_bounds(&self) -> bool {
        self.lower_bounds().iter().any(|v| v.is_finite())
            || self.upper_bounds().iter().any(|v| v.is_finite())
    }

    /// Flow stress for physical (already scaled) parameters.
    fn stress(&self, params: &[f64], strain: f64, strain_rate: f64, temperature: f64) -> f64;

    /// Flow stress for raw parameters.
    ///
    /// # Panics
    /// Panics if `raw` is shorter than `parameter_count()`; callers validate
    /// lengths through [`ModelInstance::new`] first.
    fn evaluate(&self, raw: &[f64], strain: f64, strain_rate: f64, temperature: f64) -> f64 {
        let params = scale(raw, self.scaling());
        self.stress(&params, strain, strain_rate, temperature)
    }

    /// Partial derivatives of the flow stress w.r.t. each physical parameter.
    ///
    /// The default is [`numerical_derivatives`].
    fn derivatives(
        &self,
        raw: &[f64],
        strain: f64,
        strain_rate: f64,
        temperature: f64,
    ) -> Vec<(&'static str, f64)> {
        numerical_derivatives(self, raw, strain, strain_rate, temperature)
    }
}

/// Central difference in raw space, divided by each parameter's scaling factor.
pub fn numerical_derivatives<M: MaterialModel + ?Sized>(
    model: &M,
    raw: &[f64],
    strain: f64,
    strain_rate: f64,
    temperature: f64,
) -> Vec<(&'static str, f64)> {
    let scaling = model.scaling();
    let mut work = raw.to_vec();
    model
        .labels()
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            let x = work[i];
            work[i] = x + DERIVATIVE_STEP;
            let up = model.evaluate(&work, strain, strain_rate, temperature);
            work[i] = x - DERIVATIVE_STEP;
            let down = model.evaluate(&work, strain, strain_rate, temperature);
            work[i] = x;
            let d_raw = (up - down) / (2.0 * DERIVATIVE_STEP);
            (label, d_raw / scaling[i])
        })
        .collect()
}

/// A model bound to one raw parameter vector.
#[derive(Clone, Copy)]
pub struct ModelInstance<'a> {
    model: &'a dyn MaterialModel,
    raw: &'a [f64],
}

impl<'a> ModelInstance<'a> {
    pub fn new(model: &'a dyn MaterialModel, raw: &'a [f64]) -> Result<Self, AppError> {
        if raw.len() != model.scaling().len() {
            return Err(AppError::validation(format!(
                "Invalid number of parameters for {}: expected {}, got {}.",
                model.name(),
                model.scaling().len(),
                raw.len()
            )));
        }
        Ok(Self { model, raw })
    }

    /// Physical parameters: `raw ⊙ scaling`.
    pub fn effective(&self) -> Vec<f64> {
        scale(self.raw, self.model.scaling())
    }

    /// Whether the physical parameters lie within the model's declared bounds.
    pub fn within_bounds(&self) -> bool {
        if !self.model.has_bounds() {
            return true;
        }
        let params = self.effective();
        let lower = self.model.lower_bounds();
        let upper = self.model.upper_bounds();
        params
            .iter()
            .zip(lower.iter().zip(upper.iter()))
            .all(|(&p, (&lo, &hi))| p >= lo && p <= hi)
    }

    pub fn stress(&self, strain: f64, strain_rate: f64, temperature: f64) -> f64 {
        self.model.evaluate(self.raw, strain, strain_rate, temperature)
    }

    pub fn derivatives(&self, strain: f64, strain_rate: f64, temperature: f64) -> Vec<(&'static str, f64)> {
        self.model.derivatives(self.raw, strain, strain_rate, temperature)
    }

    /// Physical parameters keyed by label, in parameter order.
    pub fn labeled(&self) -> Vec<(&'static str, f64)> {
        self.model
            .labels()
            .iter()
            .copied()
            .zip(self.effective())
            .collect()
    }
}

pub fn scale(raw: &[f64], scaling: &[f64]) -> Vec<f64> {
    raw.iter().zip(scaling.iter()).map(|(r, s)| r * s).collect()
}

/// Convert physical parameters back to raw optimizer space.
pub fn unscale(params: &[f64], scaling: &[f64]) -> Vec<f64> {
    params.iter().zip(scaling.iter()).map(|(p, s)| p / s).collect()
}
