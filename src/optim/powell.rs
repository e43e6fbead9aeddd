//! Powell's conjugate direction method.
//!
//! Each cycle performs one line minimization along every direction in the set,
//! then tries the extrapolated direction `x_new - x_old` and, when it passes
//! Powell's test, swaps it in for the direction of largest decrease.

use super::{Counted, LOCAL_ITERATIONS_PER_PARAM, Minimum, Objective};
use crate::error::AppError;
use crate::math::minimize_along;

pub fn powell(objective: &dyn Objective, x0: &[f64], tol: f64) -> Result<Minimum, AppError> {
    let f = Counted::new(objective);
    let n = x0.len();
    let max_iter = LOCAL_ITERATIONS_PER_PARAM * n;

    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut d = vec![0.0; n];
            d[i] = 1.0;
            d
        })
        .collect();

    let mut x = x0.to_vec();
    let mut fx = f.eval(&x)?;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;
        let x_start = x.clone();
        let f_start = fx;
        let mut biggest_drop = 0.0;
        let mut biggest_index = 0;

        for (i, d) in directions.iter().enumerate() {
            let f_before = fx;
            let (xn, fxn) = line_minimize(&f, &x, d, fx, tol)?;
            x = xn;
            fx = fxn;
            if f_before - fx > biggest_drop {
                biggest_drop = f_before - fx;
                biggest_index = i;
            }
        }

        if !f_start.is_finite() && !fx.is_finite() {
            // No direction leaves the infeasible region.
            break;
        }
        if !f_start.is_finite() {
            // Left the infeasible region this cycle; restart from the new point.
            continue;
        }
        if 2.0 * (f_start - fx) <= tol * (f_start.abs() + fx.abs()) + 1e-20 {
            converged = true;
            break;
        }

        let direction: Vec<f64> = x.iter().zip(x_start.iter()).map(|(a, b)| a - b).collect();
        let extrapolated: Vec<f64> = x.iter().zip(direction.iter()).map(|(a, d)| a + d).collect();
        let f_ext = f.eval(&extrapolated)?;

        if f_start > f_ext {
            let t = 2.0 * (f_start + f_ext - 2.0 * fx) * (f_start - fx - biggest_drop).powi(2)
                - biggest_drop * (f_start - f_ext).powi(2);
            if t < 0.0 {
                let (xn, fxn) = line_minimize(&f, &x, &direction, fx, tol)?;
                x = xn;
                fx = fxn;
                directions.swap(biggest_index, n - 1);
                directions[n - 1] = direction;
            }
        }
    }

    Ok(Minimum {
        x,
        fun: fx,
        iterations,
        evaluations: f.evaluations(),
        converged,
    })
}

fn line_minimize(
    f: &Counted<'_>,
    x: &[f64],
    d: &[f64],
    fx: f64,
    tol: f64,
) -> Result<(Vec<f64>, f64), AppError> {
    let mut work = x.to_vec();
    let mut phi = |alpha: f64| -> Result<f64, AppError> {
        for ((w, xi), di) in work.iter_mut().zip(x.iter()).zip(d.iter()) {
            *w = xi + alpha * di;
        }
        f.eval(&work)
    };
    let (alpha, f_alpha) = minimize_along(&mut phi, fx, tol)?;
    let moved = x.iter().zip(d.iter()).map(|(xi, di)| xi + alpha * di).collect();
    Ok((moved, f_alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::test_functions::{rosenbrock, sphere};

    #[test]
    fn converges_on_shifted_sphere() {
        let m = powell(&sphere, &[3.0, 3.0, 3.0], 1e-8).unwrap();
        assert!(m.converged);
        for (i, v) in m.x.iter().enumerate() {
            assert!((v - i as f64).abs() < 1e-4, "x[{i}]={v}");
        }
    }

    #[test]
    fn improves_rosenbrock() {
        let x0 = [-1.2, 1.0];
        let f0 = rosenbrock(&x0).unwrap();
        let m = powell(&rosenbrock, &x0, 1e-8).unwrap();
        assert!(m.fun < f0 * 1e-3, "fun={}", m.fun);
    }

    #[test]
    fn infeasible_start_terminates() {
        let flat = |_: &[f64]| -> Result<f64, AppError> { Ok(f64::INFINITY) };
        let m = powell(&flat, &[1.0, 1.0], 1e-6).unwrap();
        assert!(!m.converged);
        assert_eq!(m.iterations, 1);
    }
}
