//! Finite-difference gradients and evenly spaced sequences.

use crate::error::AppError;

/// Relative step for central differences: `sqrt(machine epsilon)`.
const REL_STEP: f64 = 1.490_116_119_384_765_6e-8;

/// Central-difference gradient of `f` at `x`.
///
/// The step for coordinate `i` is `REL_STEP * max(|x_i|, 1)`.
pub fn central_gradient<F>(f: &mut F, x: &[f64]) -> Result<Vec<f64>, AppError>
where
    F: FnMut(&[f64]) -> Result<f64, AppError>,
{
    let mut work = x.to_vec();
    let mut grad = vec![0.0; x.len()];
    for i in 0..x.len() {
        let xi = x[i];
        let h = REL_STEP * xi.abs().max(1.0);
        work[i] = xi + h;
        let up = f(&work)?;
        work[i] = xi - h;
        let down = f(&work)?;
        work[i] = xi;
        grad[i] = (up - down) / (2.0 * h);
    }
    Ok(grad)
}

/// `count` evenly spaced values from `start` towards `stop`, excluding `stop`.
///
/// Mirrors `linspace(start, stop, count, endpoint=false)`.
pub fn linspace_exclusive(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let step = (stop - start) / count as f64;
    (0..count).map(|k| start + step * k as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_of_quadratic() {
        let mut f = |x: &[f64]| -> Result<f64, AppError> { Ok(x[0] * x[0] + 3.0 * x[1]) };
        let g = central_gradient(&mut f, &[2.0, -1.0]).unwrap();
        assert!((g[0] - 4.0).abs() < 1e-6);
        assert!((g[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn linspace_exclusive_descending() {
        let v = linspace_exclusive(1.0, 0.0, 4);
        assert_eq!(v.len(), 4);
        let expected = [1.0, 0.75, 0.5, 0.25];
        for (a, b) in v.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-15);
        }
    }
}
