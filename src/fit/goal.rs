//! Goal function: mean squared relative stress error.
//!
//! For raw parameters `p` and rows `(ε_i, ε̇_i, T_i, σ_i)`:
//!
//! ```text
//! F(p) = mean_i ((σ_model(ε_i, ε̇_i, T_i; p) - σ_i) / σ_i)^2
//! ```
//!
//! Unusable parameter sets score `+∞` instead of failing: parameters outside
//! the model's declared bounds (the model is not evaluated at all) and any
//! evaluation that produces a non-finite value.

use crate::domain::DataRow;
use crate::error::AppError;
use crate::models::{MaterialModel, ModelInstance};

pub fn goal_function(raw: &[f64], rows: &[DataRow], model: &dyn MaterialModel) -> Result<f64, AppError> {
    let instance = ModelInstance::new(model, raw)?;
    if rows.is_empty() {
        return Err(AppError::validation("Dataset is empty."));
    }
    if !instance.within_bounds() {
        return Ok(f64::INFINITY);
    }

    let mut sum = 0.0;
    for row in rows {
        let predicted = instance.stress(row.strain, row.strain_rate, row.temperature);
        let rel = (predicted - row.stress) / row.stress;
        sum += rel * rel;
    }
    let fitness = sum / rows.len() as f64;
    Ok(if fitness.is_finite() { fitness } else { f64::INFINITY })
}

/// Gradient of the goal function w.r.t. each physical parameter, keyed `dF/d{label}`.
pub fn goal_function_derivatives(
    raw: &[f64],
    rows: &[DataRow],
    model: &dyn MaterialModel,
) -> Result<Vec<(String, f64)>, AppError> {
    let instance = ModelInstance::new(model, raw)?;
    if rows.is_empty() {
        return Err(AppError::validation("Dataset is empty."));
    }

    let mut sums = vec![0.0; model.parameter_count()];
    for row in rows {
        let predicted = instance.stress(row.strain, row.strain_rate, row.temperature);
        let weight = 2.0 * (predicted - row.stress) / (row.stress * row.stress);
        let partials = instance.derivatives(row.strain, row.strain_rate, row.temperature);
        for (s, (_, d)) in sums.iter_mut().zip(partials.iter()) {
            *s += weight * d;
        }
    }

    let n = rows.len() as f64;
    Ok(model
        .labels()
        .iter()
        .zip(sums)
        .map(|(label, s)| (format!("dF/d{label}"), s / n))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JohnsonCook;

    /// `σ = A`, scaled by 1e8.
    struct Constant;

    impl MaterialModel for Constant {
        fn name(&self) -> &'static str {
            "CONST"
        }
        fn labels(&self) -> &'static [&'static str] {
            &["A"]
        }
        fn scaling(&self) -> &'static [f64] {
            &[1e8]
        }
        fn lower_bounds(&self) -> Vec<f64> {
            vec![0.0]
        }
        fn stress(&self, params: &[f64], _: f64, _: f64, _: f64) -> f64 {
            params[0]
        }
    }

    fn rows(stress: &[f64]) -> Vec<DataRow> {
        stress
            .iter()
            .enumerate()
            .map(|(i, &s)| DataRow {
                strain: 0.05 * (i + 1) as f64,
                strain_rate: 1e-3,
                temperature: 293.15,
                stress: s,
            })
            .collect()
    }

    #[test]
    fn exact_model_scores_zero() {
        let data = [DataRow {
            strain: 0.1,
            strain_rate: 1e-3,
            temperature: 293.15,
            stress: 1e8,
        }];
        let f = goal_function(&[1.0], &data, &Constant).unwrap();
        assert_eq!(f, 0.0);
    }

    #[test]
    fn mean_of_squared_relative_errors() {
        let data = rows(&[1e8, 4e8]);
        // predictions 2e8: errors (1)^2 and (-0.5)^2
        let f = goal_function(&[2.0], &data, &Constant).unwrap();
        assert!((f - 0.625).abs() < 1e-12, "f={f}");
    }

    #[test]
    fn out_of_bounds_is_infinite() {
        let data = rows(&[2e8]);
        assert_eq!(goal_function(&[-1.0], &data, &Constant).unwrap(), f64::INFINITY);
        // JC with m = 1.5 > 1
        let jc = [0.3, 0.05, 0.3, 0.01, 1.5];
        assert_eq!(goal_function(&jc, &data, &JohnsonCook).unwrap(), f64::INFINITY);
    }

    #[test]
    fn non_finite_evaluation_is_infinite() {
        // Negative strain with a fractional exponent gives NaN.
        let mut data = rows(&[2e8]);
        data[0].strain = -0.1;
        let jc = [0.3, 0.05, 0.3, 0.01, 1.0];
        assert_eq!(goal_function(&jc, &data, &JohnsonCook).unwrap(), f64::INFINITY);
    }

    #[test]
    fn wrong_length_and_empty_rows_are_errors() {
        let data = rows(&[2e8]);
        assert!(goal_function(&[1.0, 2.0], &data, &Constant).is_err());
        assert!(goal_function(&[1.0], &[], &Constant).is_err());
    }

    #[test]
    fn repeated_calls_agree_and_leave_rows_untouched() {
        let data = rows(&[1.5e8, 2.5e8, 3e8]);
        let before = data.clone();
        let a = goal_function(&[2.2], &data, &Constant).unwrap();
        let b = goal_function(&[2.2], &data, &Constant).unwrap();
        assert_eq!(a, b);
        assert_eq!(data, before);
        assert!(a >= 0.0);
    }

    #[test]
    fn derivatives_match_finite_difference() {
        let data = rows(&[1e8, 4e8]);
        let raw = [2.0];
        let d = goal_function_derivatives(&raw, &data, &Constant).unwrap();
        assert_eq!(d[0].0, "dF/dA");

        // Physical step h on A is raw step h / 1e8.
        let h = 1e3;
        let up = goal_function(&[raw[0] + h / 1e8], &data, &Constant).unwrap();
        let down = goal_function(&[raw[0] - h / 1e8], &data, &Constant).unwrap();
        let fd = (up - down) / (2.0 * h);
        assert!(((d[0].1 - fd) / fd).abs() < 1e-4, "{} vs {fd}", d[0].1);
    }
}
