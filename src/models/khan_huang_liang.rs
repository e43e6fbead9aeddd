//! Khan-Huang-Liang flow stress.

use super::model::{MaterialModel, homologous_temperature, scale};

/// Upper strain-rate bound `D0` of the KHL hardening term (1/s).
const D0: f64 = 1e6;

/// Floor applied to logarithm arguments in closed-form derivatives.
const LOG_FLOOR: f64 = 1e-9;

/// `σ = (A + B (1 - ln ε̇ / ln D0)^n1 ε^n0)(1 - T*^m) ε̇^C`
#[derive(Debug, Clone, Copy, Default)]
pub struct KhanHuangLiang;

impl MaterialModel for KhanHuangLiang {
    fn name(&self) -> &'static str {
        "KHL"
    }

    fn labels(&self) -> &'static [&'static str] {
        &["A", "B", "n0", "n1", "C", "m"]
    }

    fn scaling(&self) -> &'static [f64] {
        &[1e9, 1e9, 1.0, 1.0, 1.0, 1.0]
    }

    fn lower_bounds(&self) -> Vec<f64> {
        vec![0.0, 0.0, f64::NEG_INFINITY, f64::NEG_INFINITY, 0.0, 0.0]
    }

    fn upper_bounds(&self) -> Vec<f64> {
        let mut upper = vec![f64::INFINITY; 6];
        upper[5] = 1.0;
        upper
    }

    fn stress(&self, p: &[f64], strain: f64, strain_rate: f64, temperature: f64) -> f64 {
        let (a, b, n0, n1, c, m) = (p[0], p[1], p[2], p[3], p[4], p[5]);
        let t_h = homologous_temperature(temperature);

        let rate = strain_rate.powf(c);
        let softening = 1.0 - t_h.powf(m);
        let hardening = (1.0 - strain_rate.ln() / D0.ln()).powf(n1) * strain.powf(n0);

        (a + b * hardening) * softening * rate
    }

    fn derivatives(
        &self,
        raw: &[f64],
        strain: f64,
        strain_rate: f64,
        temperature: f64,
    ) -> Vec<(&'static str, f64)> {
        let p = scale(raw, self.scaling());
        let (a, b, n0, n1, c, m) = (p[0], p[1], p[2], p[3], p[4], p[5]);
        let t_h = homologous_temperature(temperature);

        let s_safe = strain.max(LOG_FLOOR);
        let r_safe = strain_rate.max(LOG_FLOOR);
        let t_safe = t_h.max(LOG_FLOOR);

        let rate = strain_rate.powf(c);
        let softening = 1.0 - t_h.powf(m);
        let ln_diff = 1.0 - r_safe.ln() / D0.ln();
        let strain_term = strain.powf(n0);
        let hardening = ln_diff.powf(n1) * strain_term;
        let flow = a + b * hardening;

        let labels = self.labels();
        vec![
            (labels[0], rate * softening),
            (labels[1], rate * softening * hardening),
            (labels[2], b * hardening * s_safe.ln() * softening * rate),
            (labels[3], b * hardening * ln_diff.ln() * softening * rate),
            (labels[4], flow * softening * rate * r_safe.ln()),
            (labels[5], -flow * rate * t_h.powf(m) * t_safe.ln()),
        ]
    }
}
