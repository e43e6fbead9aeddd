//! One-dimensional minimization along a search direction.
//!
//! Used by Powell's method. The objective is `φ(α) = f(x + α d)`; we first
//! bracket a minimum by golden-ratio expansion and then shrink the bracket by
//! golden-section search.
//!
//! Numerical notes:
//! - `+∞` objective values are legal (they mark unusable parameter sets) and
//!   simply compare as "worse" than any finite value.
//! - Both phases are iteration-capped, so a flat or all-infinite landscape
//!   terminates with the best point seen rather than looping.

use crate::error::AppError;

const GOLDEN: f64 = 1.618_033_988_749_895;
const INV_GOLDEN: f64 = 0.618_033_988_749_895;
const MAX_BRACKET_STEPS: usize = 50;
const MAX_SECTION_STEPS: usize = 100;

/// A bracketing triple `a < b < c` (or `a > b > c`) with `f(b) <= f(a), f(c)`.
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub fa: f64,
    pub fb: f64,
    pub fc: f64,
}

/// Expand `[a, b]` downhill until the middle point is the lowest of three.
pub fn bracket_minimum<F>(f: &mut F, a: f64, b: f64, fa: f64) -> Result<Bracket, AppError>
where
    F: FnMut(f64) -> Result<f64, AppError>,
{
    let (mut a, mut b) = (a, b);
    let (mut fa, mut fb) = (fa, f(b)?);
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = b + GOLDEN * (b - a);
    let mut fc = f(c)?;
    let mut steps = 0;
    while fc < fb && steps < MAX_BRACKET_STEPS {
        a = b;
        fa = fb;
        b = c;
        fb = fc;
        c = b + GOLDEN * (b - a);
        fc = f(c)?;
        steps += 1;
    }

    Ok(Bracket { a, b, c, fa, fb, fc })
}

/// Golden-section search inside a bracket.
///
/// Stops when the interval is narrower than `tol * (|x| + tol)`.
/// Returns the best abscissa and its value.
pub fn golden_section<F>(f: &mut F, bracket: Bracket, tol: f64) -> Result<(f64, f64), AppError>
where
    F: FnMut(f64) -> Result<f64, AppError>,
{
    let (mut lo, mut hi) = if bracket.a < bracket.c {
        (bracket.a, bracket.c)
    } else {
        (bracket.c, bracket.a)
    };

    // Track the best point seen, starting from the bracket itself.
    let mut best = (bracket.b, bracket.fb);
    for &(x, fx) in &[(bracket.a, bracket.fa), (bracket.c, bracket.fc)] {
        if fx < best.1 {
            best = (x, fx);
        }
    }

    let mut x1 = hi - INV_GOLDEN * (hi - lo);
    let mut x2 = lo + INV_GOLDEN * (hi - lo);
    let mut f1 = f(x1)?;
    let mut f2 = f(x2)?;

    for _ in 0..MAX_SECTION_STEPS {
        if (hi - lo).abs() <= tol * (best.0.abs() + tol) {
            break;
        }
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_GOLDEN * (hi - lo);
            f1 = f(x1)?;
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_GOLDEN * (hi - lo);
            f2 = f(x2)?;
        }
        if f1 < best.1 {
            best = (x1, f1);
        }
        if f2 < best.1 {
            best = (x2, f2);
        }
    }

    Ok(best)
}

/// Minimize `f(x + α d)` over `α`, starting from `α = 0` with value `fx`.
///
/// Returns `(α*, f(x + α* d))`. Never returns a point worse than `α = 0`.
pub fn minimize_along<F>(f: &mut F, fx: f64, tol: f64) -> Result<(f64, f64), AppError>
where
    F: FnMut(f64) -> Result<f64, AppError>,
{
    let bracket = bracket_minimum(f, 0.0, 1.0, fx)?;
    let (alpha, f_alpha) = golden_section(f, bracket, tol)?;
    if f_alpha < fx { Ok((alpha, f_alpha)) } else { Ok((0.0, fx)) }
}
