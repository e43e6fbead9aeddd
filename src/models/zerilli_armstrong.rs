//! Zerilli-Armstrong flow stress for FCC and BCC metals.

use super::model::{MaterialModel, relative_strain_rate};

/// `σ = C2 √ε exp(-C3 + C4 ln(ε̇/ε̇0)) + C6`
#[derive(Debug, Clone, Copy, Default)]
pub struct ZerilliArmstrongFcc;

impl MaterialModel for ZerilliArmstrongFcc {
    fn name(&self) -> &'static str {
        "ZA-FCC"
    }

    fn labels(&self) -> &'static [&'static str] {
        &["C2", "C3", "C4", "C6"]
    }

    fn scaling(&self) -> &'static [f64] {
        &[1e9, 1.0, 1.0, 1e9]
    }

    fn stress(&self, p: &[f64], strain: f64, strain_rate: f64, _temperature: f64) -> f64 {
        let (c2, c3, c4, c6) = (p[0], p[1], p[2], p[3]);
        let exponent = -c3 + c4 * relative_strain_rate(strain_rate).ln();
        c2 * strain.sqrt() * exponent.exp() + c6
    }
}

/// `σ = C1 exp(T (-C3 + C4 ln(ε̇/ε̇0))) + C6 + C5 ε^n`
#[derive(Debug, Clone, Copy, Default)]
pub struct ZerilliArmstrongBcc;

impl MaterialModel for ZerilliArmstrongBcc {
    fn name(&self) -> &'static str {
        "ZA-BCC"
    }

    fn labels(&self) -> &'static [&'static str] {
        &["C1", "C3", "C4", "C5", "n", "C6"]
    }

    fn scaling(&self) -> &'static [f64] {
        &[1e9, 1e-2, 1e-2, 1e9, 1e-2, 1e9]
    }

    fn lower_bounds(&self) -> Vec<f64> {
        vec![0.0, f64::NEG_INFINITY, f64::NEG_INFINITY, 0.0, 0.0, 0.0]
    }

    fn stress(&self, p: &[f64], strain: f64, strain_rate: f64, temperature: f64) -> f64 {
        let (c1, c3, c4, c5, n, c6) = (p[0], p[1], p[2], p[3], p[4], p[5]);
        let exponent = -c3 + c4 * relative_strain_rate(strain_rate).ln();
        c1 * (temperature * exponent).exp() + c6 + c5 * strain.powf(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::model::REFERENCE_STRAIN_RATE;

    #[test]
    fn fcc_is_athermal_offset_at_zero_strain() {
        let p = [1e9, 0.5, 0.01, 2e8];
        let s = ZerilliArmstrongFcc.stress(&p, 0.0, 1.0, 293.15);
        assert!((s - 2e8).abs() < 1e-6);
    }

    #[test]
    fn bcc_reference_rate_has_pure_thermal_exponent() {
        let p = [5e8, 2e-3, 1e-4, 4e8, 0.3, 1e8];
        let t = 400.0;
        let s = ZerilliArmstrongBcc.stress(&p, 0.2, REFERENCE_STRAIN_RATE, t);
        let expected = 5e8 * (-t * 2e-3f64).exp() + 1e8 + 4e8 * 0.2f64.powf(0.3);
        assert!((s - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn fcc_declares_no_bounds() {
        assert!(!ZerilliArmstrongFcc.has_bounds());
        assert!(ZerilliArmstrongBcc.has_bounds());
    }
}
