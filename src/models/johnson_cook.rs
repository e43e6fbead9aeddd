//! Johnson-Cook and modified Johnson-Cook flow stress.

use super::model::{MaterialModel, homologous_temperature, relative_strain_rate};

/// Floor applied to logarithm arguments in closed-form derivatives.
const LOG_FLOOR: f64 = 1e-9;

/// `σ = (A + B ε^n)(1 + C ln(ε̇/ε̇0))(1 - T*^m)`
#[derive(Debug, Clone, Copy, Default)]
pub struct JohnsonCook;

impl MaterialModel for JohnsonCook {
    fn name(&self) -> &'static str {
        "JC"
    }

    fn labels(&self) -> &'static [&'static str] {
        &["A", "B", "n", "C", "m"]
    }

    fn scaling(&self) -> &'static [f64] {
        &[1e9, 1e10, 1.0, 1.0, 1.0]
    }

    fn lower_bounds(&self) -> Vec<f64> {
        vec![0.0, 0.0, 0.0, f64::NEG_INFINITY, 0.0]
    }

    fn upper_bounds(&self) -> Vec<f64> {
        vec![f64::INFINITY, f64::INFINITY, f64::INFINITY, f64::INFINITY, 1.0]
    }

    fn stress(&self, p: &[f64], strain: f64, strain_rate: f64, temperature: f64) -> f64 {
        let (a, b, n, c, m) = (p[0], p[1], p[2], p[3], p[4]);
        let t_h = homologous_temperature(temperature);
        let r_h = relative_strain_rate(strain_rate);

        (a + b * strain.powf(n)) * (1.0 + c * r_h.ln()) * (1.0 - t_h.powf(m))
    }
}

/// Modified Johnson-Cook with strain-dependent rate and thermal terms:
///
/// `σ = A1 ε^n1 (1 + (b1 + b2 ε + b3 ε²) ln(ε̇/ε̇0)) exp((L1 + L2 ε) T*)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedJohnsonCook;

impl MaterialModel for ModifiedJohnsonCook {
    fn name(&self) -> &'static str {
        "MJC"
    }

    fn labels(&self) -> &'static [&'static str] {
        &["A1", "n1", "b1", "b2", "b3", "L1", "L2"]
    }

    fn scaling(&self) -> &'static [f64] {
        &[1e9, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
    }

    fn lower_bounds(&self) -> Vec<f64> {
        let mut lower = vec![f64::NEG_INFINITY; 7];
        lower[0] = 0.0;
        lower[1] = 0.0;
        lower
    }

    fn stress(&self, p: &[f64], strain: f64, strain_rate: f64, temperature: f64) -> f64 {
        let (a1, n1, b1, b2, b3, l1, l2) = (p[0], p[1], p[2], p[3], p[4], p[5], p[6]);
        let t_h = homologous_temperature(temperature);
        let r_h = relative_strain_rate(strain_rate);

        let rate_dep = b1 + strain * (b2 + strain * b3);
        let temp_dep = l1 + l2 * strain;

        a1 * strain.powf(n1) * (1.0 + rate_dep * r_h.ln()) * (temp_dep * t_h).exp()
    }

    fn derivatives(
        &self,
        raw: &[f64],
        strain: f64,
        strain_rate: f64,
        temperature: f64,
    ) -> Vec<(&'static str, f64)> {
        let p = super::model::scale(raw, self.scaling());
        let (a1, n1, b1, b2, b3, l1, l2) = (p[0], p[1], p[2], p[3], p[4], p[5], p[6]);
        let t_h = homologous_temperature(temperature);
        let r_h = relative_strain_rate(strain_rate);

        let s_safe = strain.max(LOG_FLOOR);
        let r_safe = r_h.max(LOG_FLOOR);

        let rate_dep = b1 + strain * (b2 + strain * b3);
        let temp_dep = l1 + l2 * strain;
        let hardening = strain.powf(n1);
        let base = a1 * hardening;
        let rate = 1.0 + rate_dep * r_h.ln();
        let thermal = (temp_dep * t_h).exp();

        let d_rate = base * r_safe.ln() * thermal;
        let d_thermal = base * rate * thermal * t_h;

        let labels = self.labels();
        vec![
            (labels[0], hardening * rate * thermal),
            (labels[1], s_safe.ln() * base * rate * thermal),
            (labels[2], d_rate),
            (labels[3], d_rate * strain),
            (labels[4], d_rate * strain * strain),
            (labels[5], d_thermal),
            (labels[6], d_thermal * strain),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::model::{REFERENCE_STRAIN_RATE, REFERENCE_TEMPERATURE, numerical_derivatives};

    #[test]
    fn jc_reduces_to_yield_plus_hardening_at_reference_state() {
        // At ε̇ = ε̇0 and T = T_ref the rate and thermal factors are both 1.
        let p = [3e8, 5e8, 0.4, 0.02, 1.0];
        let s = JohnsonCook.stress(&p, 0.1, REFERENCE_STRAIN_RATE, REFERENCE_TEMPERATURE);
        let expected = 3e8 + 5e8 * 0.1f64.powf(0.4);
        assert!((s - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn jc_softens_with_temperature() {
        let p = [3e8, 5e8, 0.4, 0.02, 1.0];
        let cold = JohnsonCook.stress(&p, 0.1, 1.0, 293.15);
        let hot = JohnsonCook.stress(&p, 0.1, 1.0, 773.15);
        assert!(hot < cold);
    }

    #[test]
    fn mjc_closed_form_matches_numerical() {
        let raw = [0.4, 0.3, 0.01, 0.002, -0.001, -0.8, 0.1];
        for &(e, r, t) in &[(0.05, 1.0, 373.15), (0.2, 100.0, 573.15), (0.1, 1e-2, 293.15)] {
            let closed = ModifiedJohnsonCook.derivatives(&raw, e, r, t);
            let numeric = numerical_derivatives(&ModifiedJohnsonCook, &raw, e, r, t);
            for ((label, a), (_, b)) in closed.iter().zip(numeric.iter()) {
                let scale = a.abs().max(b.abs()).max(1.0);
                assert!(
                    (a - b).abs() / scale < 1e-4,
                    "d/d{label}: closed={a}, numeric={b}"
                );
            }
        }
    }
}
