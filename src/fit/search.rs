//! Multi-start, multi-method parameter search.
//!
//! For every (model, method) pair we draw `attempts` random raw guesses from
//! the unit hypercube and run one minimization per guess. The particle swarm
//! is the exception: the whole batch seeds a single swarm run.
//!
//! All tasks of all groups run on one fixed-size rayon pool. Each task owns a
//! private copy of the dataset, so no state is shared between tasks beyond
//! the read-only model capability.
//!
//! Ranking is deterministic given the attempts: stable ascending sort by
//! fitness, so ties keep discovery order (method order, then submission order).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::domain::{DataRow, Method};
use crate::error::AppError;
use crate::fit::goal_function;
use crate::models::MaterialModel;
use crate::optim::{minimize, minimize_population};

/// Default number of ranked results kept per group.
pub const MAX_RESULTS: usize = 5;
/// Default convergence tolerance applied to every method.
pub const DEFAULT_TOLERANCE: f64 = 2.5e-3;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Random starts per (model, method); the swarm size for PSO.
    pub attempts: usize,
    pub max_results: usize,
    pub tolerance: f64,
    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Seed for reproducible guesses. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            max_results: MAX_RESULTS,
            tolerance: DEFAULT_TOLERANCE,
            workers: None,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.attempts == 0 {
            return Err(AppError::validation("attempts must be at least 1."));
        }
        if self.max_results == 0 {
            return Err(AppError::validation("max_results must be at least 1."));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AppError::validation(format!(
                "tolerance must be positive, got {}.",
                self.tolerance
            )));
        }
        if self.workers == Some(0) {
            return Err(AppError::validation("workers must be at least 1."));
        }
        Ok(())
    }

    /// Dedicated pool with `workers` threads (rayon's default when unset).
    ///
    /// Shared by the search and the per-result post-processing so `workers`
    /// bounds the whole run.
    pub fn worker_pool(&self) -> Result<rayon::ThreadPool, AppError> {
        if self.workers == Some(0) {
            return Err(AppError::validation("workers must be at least 1."));
        }
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.workers {
            builder = builder.num_threads(workers);
        }
        builder
            .build()
            .map_err(|e| AppError::task(format!("Failed to start worker pool: {e}")))
    }
}

/// One finished minimization.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Raw (unscaled) parameters.
    pub params: Vec<f64>,
    pub fitness: f64,
    pub method: Method,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Top-K attempts, best first.
#[derive(Debug, Clone)]
pub struct RankedResults {
    pub model: String,
    /// `None` for the cross-method ranking of a model.
    pub method: Option<Method>,
    pub attempts: Vec<Attempt>,
}

impl RankedResults {
    pub fn best(&self) -> Option<&Attempt> {
        self.attempts.first()
    }
}

/// Search outcome for one model.
#[derive(Debug, Clone)]
pub struct ModelSearch {
    pub model: String,
    /// One entry per requested method, in request order.
    pub per_method: Vec<RankedResults>,
    pub overall: RankedResults,
}

/// Stable ascending sort by fitness, truncated to `min(k, len)`.
pub fn rank_top_k(mut attempts: Vec<Attempt>, k: usize) -> Vec<Attempt> {
    attempts.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    attempts.truncate(k);
    attempts
}

enum Task {
    Local(Vec<f64>),
    Swarm { batch: Vec<Vec<f64>>, seed: u64 },
}

struct Group<'a> {
    model: &'a dyn MaterialModel,
    method: Method,
    tasks: Vec<Task>,
}

/// Run every (model, method) group and rank the results.
pub fn run_search(
    models: &[&dyn MaterialModel],
    methods: &[Method],
    rows: &[DataRow],
    config: &SearchConfig,
) -> Result<Vec<ModelSearch>, AppError> {
    config.validate()?;
    if models.is_empty() {
        return Err(AppError::validation("No models selected."));
    }
    if methods.is_empty() {
        return Err(AppError::validation("No methods selected."));
    }
    if rows.is_empty() {
        return Err(AppError::validation("Dataset is empty."));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // Guesses are drawn up front in (model, method, attempt) order so a seed
    // fixes every task's input regardless of scheduling.
    let mut groups = Vec::with_capacity(models.len() * methods.len());
    for &model in models {
        for &method in methods {
            let n = model.parameter_count();
            let guesses: Vec<Vec<f64>> = (0..config.attempts)
                .map(|_| (0..n).map(|_| rng.gen_range(0.0..1.0)).collect())
                .collect();
            let tasks = if method.is_swarm() {
                let seed: u64 = rng.r#gen();
                vec![Task::Swarm { batch: guesses, seed }]
            } else {
                guesses.into_iter().map(Task::Local).collect()
            };
            groups.push(Group { model, method, tasks });
        }
    }

    let pool = config.worker_pool()?;

    tracing::info!(
        groups = groups.len(),
        tasks = groups.iter().map(|g| g.tasks.len()).sum::<usize>(),
        workers = pool.current_num_threads(),
        "search started"
    );

    let finished: Vec<Vec<Attempt>> = pool.install(|| {
        groups
            .par_iter()
            .map(|group| run_group(group, rows, config.tolerance))
            .collect::<Result<Vec<_>, AppError>>()
    })?;

    let mut out = Vec::with_capacity(models.len());
    let mut finished = finished.into_iter();
    for &model in models {
        let mut per_method = Vec::with_capacity(methods.len());
        let mut all = Vec::new();
        for &method in methods {
            let attempts = finished.next().unwrap_or_default();
            all.extend(attempts.iter().cloned());
            let ranked = rank_top_k(attempts, config.max_results);
            if let Some(best) = ranked.first() {
                tracing::info!(
                    model = model.name(),
                    method = method.label(),
                    fitness = best.fitness,
                    "best attempt"
                );
            }
            per_method.push(RankedResults {
                model: model.name().to_string(),
                method: Some(method),
                attempts: ranked,
            });
        }
        out.push(ModelSearch {
            model: model.name().to_string(),
            per_method,
            overall: RankedResults {
                model: model.name().to_string(),
                method: None,
                attempts: rank_top_k(all, config.max_results),
            },
        });
    }
    Ok(out)
}

fn run_group(group: &Group<'_>, rows: &[DataRow], tol: f64) -> Result<Vec<Attempt>, AppError> {
    tracing::debug!(
        model = group.model.name(),
        method = group.method.label(),
        tasks = group.tasks.len(),
        "group started"
    );
    // Indexed collect keeps submission order.
    group
        .tasks
        .par_iter()
        .map(|task| run_task(group.model, group.method, task, rows, tol))
        .collect()
}

fn run_task(
    model: &dyn MaterialModel,
    method: Method,
    task: &Task,
    rows: &[DataRow],
    tol: f64,
) -> Result<Attempt, AppError> {
    let data = rows.to_vec();
    let objective = |x: &[f64]| goal_function(x, &data, model);

    let minimum = match task {
        Task::Local(guess) => minimize(&objective, guess, method, tol),
        Task::Swarm { batch, seed } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            minimize_population(&objective, batch, tol, &mut rng)
        }
    }
    .map_err(|e| {
        AppError::new(
            e.kind(),
            format!("{} / {} task failed: {}", model.name(), method.label(), e.message()),
        )
    })?;

    tracing::debug!(
        model = model.name(),
        method = method.label(),
        fitness = minimum.fun,
        iterations = minimum.iterations,
        converged = minimum.converged,
        "task finished"
    );

    Ok(Attempt {
        params: minimum.x,
        fitness: minimum.fun,
        method,
        iterations: minimum.iterations,
        evaluations: minimum.evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JohnsonCook;

    fn attempt(fitness: f64, tag: f64) -> Attempt {
        Attempt {
            params: vec![tag],
            fitness,
            method: Method::NelderMead,
            iterations: 0,
            evaluations: 0,
        }
    }

    /// `σ = A + B ε`, scaled by 1e8.
    struct Linear;

    impl MaterialModel for Linear {
        fn name(&self) -> &'static str {
            "LIN"
        }
        fn labels(&self) -> &'static [&'static str] {
            &["A", "B"]
        }
        fn scaling(&self) -> &'static [f64] {
            &[1e8, 1e8]
        }
        fn stress(&self, p: &[f64], strain: f64, _: f64, _: f64) -> f64 {
            p[0] + p[1] * strain
        }
    }

    fn linear_rows() -> Vec<DataRow> {
        (1..=10)
            .map(|i| {
                let strain = 0.05 * i as f64;
                DataRow {
                    strain,
                    strain_rate: 1e-3,
                    temperature: 293.15,
                    stress: 2e8 + 3e8 * strain,
                }
            })
            .collect()
    }

    fn config(attempts: usize, seed: u64) -> SearchConfig {
        SearchConfig {
            attempts,
            workers: Some(2),
            seed: Some(seed),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn ranking_is_stable_and_truncated() {
        let ranked = rank_top_k(
            vec![attempt(0.3, 0.0), attempt(0.1, 1.0), attempt(0.1, 2.0), attempt(f64::INFINITY, 3.0)],
            3,
        );
        let tags: Vec<f64> = ranked.iter().map(|a| a.params[0]).collect();
        assert_eq!(tags, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn fewer_attempts_than_k_keeps_all() {
        let ranked = rank_top_k(vec![attempt(0.2, 0.0), attempt(0.4, 1.0), attempt(0.1, 2.0)], 5);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].fitness <= w[1].fitness));
    }

    #[test]
    fn local_search_recovers_linear_model() {
        let rows = linear_rows();
        let models: [&dyn MaterialModel; 1] = [&Linear];
        let mut cfg = config(4, 42);
        cfg.tolerance = 1e-8;
        let out = run_search(&models, &[Method::NelderMead, Method::Bfgs], &rows, &cfg).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].per_method.len(), 2);
        for ranked in &out[0].per_method {
            assert_eq!(ranked.attempts.len(), 4);
            assert!(ranked.attempts.windows(2).all(|w| w[0].fitness <= w[1].fitness));
        }
        let best = out[0].overall.best().unwrap();
        assert!(best.fitness < 1e-6, "fitness={}", best.fitness);
        assert!((best.params[0] - 2.0).abs() < 1e-2);
        assert!((best.params[1] - 3.0).abs() < 1e-2);
    }

    #[test]
    fn swarm_runs_one_task_per_group() {
        let rows = linear_rows();
        let models: [&dyn MaterialModel; 1] = [&Linear];
        let out = run_search(&models, &[Method::Pso], &rows, &config(6, 3)).unwrap();
        let ranked = &out[0].per_method[0];
        assert_eq!(ranked.method, Some(Method::Pso));
        assert_eq!(ranked.attempts.len(), 1);
        assert!(ranked.attempts[0].fitness.is_finite());
    }

    #[test]
    fn top_results_capped_at_max_results() {
        let rows = linear_rows();
        let models: [&dyn MaterialModel; 1] = [&Linear];
        let out = run_search(&models, &[Method::Powell], &rows, &config(7, 9)).unwrap();
        assert_eq!(out[0].per_method[0].attempts.len(), MAX_RESULTS);
        assert_eq!(out[0].overall.attempts.len(), MAX_RESULTS);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let rows = linear_rows();
        let models: [&dyn MaterialModel; 2] = [&Linear, &JohnsonCook];
        let methods = [Method::NelderMead, Method::Pso];
        let a = run_search(&models, &methods, &rows, &config(3, 17)).unwrap();
        let b = run_search(&models, &methods, &rows, &config(3, 17)).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.model, y.model);
            for (rx, ry) in x.per_method.iter().zip(y.per_method.iter()) {
                let fx: Vec<f64> = rx.attempts.iter().map(|t| t.fitness).collect();
                let fy: Vec<f64> = ry.attempts.iter().map(|t| t.fitness).collect();
                assert_eq!(fx, fy);
            }
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let rows = linear_rows();
        let models: [&dyn MaterialModel; 1] = [&Linear];
        let mut cfg = config(3, 1);
        cfg.tolerance = 0.0;
        assert!(run_search(&models, &[Method::Powell], &rows, &cfg).is_err());
        assert!(run_search(&models, &[], &rows, &config(3, 1)).is_err());
        assert!(run_search(&[], &[Method::Powell], &rows, &config(3, 1)).is_err());
        assert!(run_search(&models, &[Method::Powell], &[], &config(3, 1)).is_err());
    }

    #[test]
    fn worker_pool_honours_worker_count() {
        let cfg = SearchConfig { workers: Some(3), ..SearchConfig::default() };
        let pool = cfg.worker_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        assert_eq!(pool.install(rayon::current_num_threads), 3);

        let zero = SearchConfig { workers: Some(0), ..SearchConfig::default() };
        assert!(zero.worker_pool().is_err());
    }
}
