//! Particle swarm optimization (constriction variant).
//!
//! The initial population is the caller's batch of guesses; nothing is
//! resampled. Velocities start small and random. Each particle follows
//!
//! ```text
//! v <- w v + c1 r1 (pbest - x) + c2 r2 (gbest - x)
//! x <- x + v
//! ```
//!
//! with `r1, r2 ~ U(0, 1)` drawn per coordinate.
//!
//! Stops when the global best has not improved by more than `tol` (relative)
//! for `STALL_LIMIT` consecutive iterations, when every particle sits within
//! `tol` of the global best, or at `SWARM_MAX_ITERATIONS`.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Counted, Minimum, Objective, SWARM_MAX_ITERATIONS};
use crate::error::AppError;

const INERTIA: f64 = 0.7298;
const COGNITIVE: f64 = 1.49618;
const SOCIAL: f64 = 1.49618;
const INITIAL_VELOCITY: f64 = 0.1;
const STALL_LIMIT: usize = 25;

struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_value: f64,
}

pub fn particle_swarm(
    objective: &dyn Objective,
    batch: &[Vec<f64>],
    tol: f64,
    rng: &mut StdRng,
) -> Result<Minimum, AppError> {
    let f = Counted::new(objective);

    let mut swarm = Vec::with_capacity(batch.len());
    for guess in batch {
        let value = f.eval(guess)?;
        let velocity = guess
            .iter()
            .map(|_| rng.gen_range(-INITIAL_VELOCITY..INITIAL_VELOCITY))
            .collect();
        swarm.push(Particle {
            position: guess.clone(),
            velocity,
            best_position: guess.clone(),
            best_value: value,
        });
    }

    // First strictly-better particle wins, so ties favour earlier guesses.
    let (mut global_position, mut global_value) = best_of(&swarm);

    let mut iterations = 0;
    let mut stalled = 0;
    let mut converged = false;

    while iterations < SWARM_MAX_ITERATIONS {
        iterations += 1;
        let previous = global_value;

        for particle in swarm.iter_mut() {
            for (d, v) in particle.velocity.iter_mut().enumerate() {
                let r1: f64 = rng.r#gen();
                let r2: f64 = rng.r#gen();
                let x = particle.position[d];
                *v = INERTIA * *v
                    + COGNITIVE * r1 * (particle.best_position[d] - x)
                    + SOCIAL * r2 * (global_position[d] - x);
            }
            for (x, v) in particle.position.iter_mut().zip(particle.velocity.iter()) {
                *x += v;
            }
            let value = f.eval(&particle.position)?;
            if value < particle.best_value {
                particle.best_value = value;
                particle.best_position.clone_from(&particle.position);
            }
            if value < global_value {
                global_value = value;
                global_position.clone_from(&particle.position);
            }
        }

        if improved(previous, global_value, tol) {
            stalled = 0;
        } else {
            stalled += 1;
        }
        let settled = stalled >= STALL_LIMIT || collapsed(&swarm, &global_position, tol);
        if global_value.is_finite() && settled {
            converged = true;
            break;
        }
    }

    Ok(Minimum {
        x: global_position,
        fun: global_value,
        iterations,
        evaluations: f.evaluations(),
        converged,
    })
}

fn best_of(swarm: &[Particle]) -> (Vec<f64>, f64) {
    let mut best = &swarm[0];
    for p in &swarm[1..] {
        if p.best_value < best.best_value {
            best = p;
        }
    }
    (best.best_position.clone(), best.best_value)
}

fn improved(previous: f64, current: f64, tol: f64) -> bool {
    if !previous.is_finite() {
        return current.is_finite();
    }
    previous - current > tol * previous.abs()
}

fn collapsed(swarm: &[Particle], global: &[f64], tol: f64) -> bool {
    swarm.iter().all(|p| {
        p.position
            .iter()
            .zip(global.iter())
            .all(|(x, g)| (x - g).abs() <= tol)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::test_functions::sphere;
    use rand::SeedableRng;

    fn batch(rng: &mut StdRng, size: usize, dim: usize) -> Vec<Vec<f64>> {
        (0..size)
            .map(|_| (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect())
            .collect()
    }

    #[test]
    fn finds_sphere_minimum() {
        let mut rng = StdRng::seed_from_u64(7);
        let guesses = batch(&mut rng, 20, 3);
        let m = particle_swarm(&sphere, &guesses, 1e-10, &mut rng).unwrap();
        assert!(m.fun < 1e-3, "fun={}", m.fun);
        assert!(m.iterations <= SWARM_MAX_ITERATIONS);
    }

    #[test]
    fn never_worse_than_best_guess() {
        let mut rng = StdRng::seed_from_u64(3);
        let guesses = batch(&mut rng, 5, 2);
        let start = guesses
            .iter()
            .map(|g| sphere(g).unwrap())
            .fold(f64::INFINITY, f64::min);
        let m = particle_swarm(&sphere, &guesses, 1e-3, &mut rng).unwrap();
        assert!(m.fun <= start);
    }

    #[test]
    fn same_seed_same_result() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(11);
            let guesses = batch(&mut rng, 8, 2);
            particle_swarm(&sphere, &guesses, 1e-6, &mut rng).unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.x, b.x);
        assert_eq!(a.fun, b.fun);
    }

    #[test]
    fn infeasible_swarm_hits_cap() {
        let mut rng = StdRng::seed_from_u64(5);
        let flat = |_: &[f64]| -> Result<f64, AppError> { Ok(f64::INFINITY) };
        let m = particle_swarm(&flat, &[vec![0.1], vec![0.9]], 1e-3, &mut rng).unwrap();
        assert!(!m.converged);
        assert_eq!(m.iterations, SWARM_MAX_ITERATIONS);
    }
}
