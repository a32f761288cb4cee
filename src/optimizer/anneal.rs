//! Simulated-annealing search over heat grids.
//!
//! A plain synchronous accept/reject loop. Improving moves are always
//! taken; a worsening move of size `delta` is taken with probability
//! `exp(-delta / T)` (Metropolis). The loop ends when the temperature falls
//! below the minimum, the move budget is spent, or the cost reaches the
//! configured threshold.
//!
//! Restarts are independent, individually seeded computations with no
//! shared state; the cheapest result wins and ties go to the lowest restart
//! index, so the outcome does not depend on thread scheduling.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Lundy & Mees (1986), "Convergence of an Annealing Algorithm"

use rand::Rng;
use tracing::debug;

use super::config::{CoolingSchedule, OptimizerConfig};
use super::design::{assign_lanes, deal, Grid};
use crate::schedule::fairness_cost;
use crate::shuffle::SecureShuffle;

/// A heat-grid search space: start point, cost and move generator.
pub(crate) trait GridProblem: Sync {
    fn initial_solution(&self, rng: &mut SecureShuffle) -> Grid;

    /// Fairness cost. Lower is better.
    fn cost(&self, grid: &Grid) -> f64;

    /// Proposes a neighbouring grid, or `None` when the sampled move would
    /// break a heat (the move still consumes budget).
    fn neighbor(&self, grid: &Grid, rng: &mut SecureShuffle) -> Option<Grid>;
}

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub(crate) struct AnnealOutcome {
    pub best: Grid,
    pub best_cost: f64,
    pub iterations: usize,
    pub accepted_moves: usize,
    pub improving_moves: usize,
    pub final_temperature: f64,
    /// Best cost sampled at regular intervals.
    pub cost_history: Vec<f64>,
    /// Index of the restart that produced `best`.
    pub restart: usize,
}

/// Runs `config.restarts` independent searches and keeps the cheapest.
pub(crate) fn anneal<P: GridProblem>(
    problem: &P,
    config: &OptimizerConfig,
    rng: &mut SecureShuffle,
) -> AnnealOutcome {
    let streams: Vec<SecureShuffle> = (0..config.restarts.max(1)).map(|_| rng.fork()).collect();
    let mut outcomes = run_restarts(problem, config, streams);

    let best_index = (0..outcomes.len()).fold(0, |best, i| {
        if outcomes[i].best_cost < outcomes[best].best_cost {
            i
        } else {
            best
        }
    });
    let mut outcome = outcomes.swap_remove(best_index);
    outcome.restart = best_index;

    debug!(
        cost = outcome.best_cost,
        iterations = outcome.iterations,
        restart = outcome.restart,
        "annealing finished"
    );
    outcome
}

#[cfg(feature = "parallel")]
fn run_restarts<P: GridProblem>(
    problem: &P,
    config: &OptimizerConfig,
    streams: Vec<SecureShuffle>,
) -> Vec<AnnealOutcome> {
    use rayon::prelude::*;

    if config.parallel {
        streams
            .into_par_iter()
            .map(|mut rng| run_single(problem, config, &mut rng))
            .collect()
    } else {
        streams
            .into_iter()
            .map(|mut rng| run_single(problem, config, &mut rng))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn run_restarts<P: GridProblem>(
    problem: &P,
    config: &OptimizerConfig,
    streams: Vec<SecureShuffle>,
) -> Vec<AnnealOutcome> {
    streams
        .into_iter()
        .map(|mut rng| run_single(problem, config, &mut rng))
        .collect()
}

fn run_single<P: GridProblem>(
    problem: &P,
    config: &OptimizerConfig,
    rng: &mut SecureShuffle,
) -> AnnealOutcome {
    let mut current = problem.initial_solution(rng);
    let mut current_cost = problem.cost(&current);
    let mut best = current.clone();
    let mut best_cost = current_cost;

    let mut temperature = config.initial_temperature;
    let mut total_iterations = 0usize;
    let mut accepted_moves = 0usize;
    let mut improving_moves = 0usize;

    let cooler = Cooler::new(config);
    let history_interval = 100.max(config.iterations_per_temperature);
    let mut cost_history = vec![best_cost];
    let mut step = 0usize;

    let budget_spent = |n: usize| config.max_iterations > 0 && n >= config.max_iterations;

    'outer: while temperature > config.min_temperature {
        let inner_iters = match config.cooling {
            CoolingSchedule::LundyMees { .. } => 1,
            _ => config.iterations_per_temperature,
        };

        for _ in 0..inner_iters {
            if budget_spent(total_iterations) || best_cost <= config.cost_threshold {
                break 'outer;
            }
            total_iterations += 1;

            if let Some(neighbor) = problem.neighbor(&current, rng) {
                let neighbor_cost = problem.cost(&neighbor);
                let delta = neighbor_cost - current_cost;

                let accept = if delta < 0.0 {
                    improving_moves += 1;
                    true
                } else {
                    rng.random_range(0.0..1.0) < (-delta / temperature).exp()
                };

                if accept {
                    current = neighbor;
                    current_cost = neighbor_cost;
                    accepted_moves += 1;
                    if current_cost < best_cost {
                        best = current.clone();
                        best_cost = current_cost;
                    }
                }
            }

            if total_iterations.is_multiple_of(history_interval) {
                cost_history.push(best_cost);
            }
        }

        temperature = cooler.next(temperature, step);
        step += 1;
    }

    if cost_history
        .last()
        .is_none_or(|&last| (last - best_cost).abs() > 1e-15)
    {
        cost_history.push(best_cost);
    }

    AnnealOutcome {
        best,
        best_cost,
        iterations: total_iterations,
        accepted_moves,
        improving_moves,
        final_temperature: temperature,
        cost_history,
        restart: 0,
    }
}

/// Temperature sequence of one annealing run.
struct Cooler {
    schedule: CoolingSchedule,
    start: f64,
    floor: f64,
    /// Drop per step under [`CoolingSchedule::Linear`]: the budget spread
    /// over `max_iterations / iterations_per_temperature` steps.
    decrement: f64,
}

impl Cooler {
    fn new(config: &OptimizerConfig) -> Self {
        let steps = match (config.max_iterations, config.iterations_per_temperature) {
            (0, _) | (_, 0) => 1000,
            (budget, per_step) => (budget / per_step).max(1),
        };
        Self {
            schedule: config.cooling,
            start: config.initial_temperature,
            floor: config.min_temperature,
            decrement: (config.initial_temperature - config.min_temperature) / steps as f64,
        }
    }

    fn next(&self, temperature: f64, step: usize) -> f64 {
        match self.schedule {
            CoolingSchedule::Geometric { alpha } => temperature * alpha,
            CoolingSchedule::Linear => (self.start - (step + 1) as f64 * self.decrement).max(self.floor),
            CoolingSchedule::LundyMees { beta } => temperature / (1.0 + beta * temperature),
        }
    }
}

/// Opponent-spread refinement of an exact design.
///
/// Only swaps the cars occupying the same lane in two different heats, so
/// every car keeps its appearance count and its lane usage.
pub(crate) struct LaneLockedSwap {
    pub start: Grid,
    pub cars: usize,
    pub lanes: usize,
}

impl GridProblem for LaneLockedSwap {
    fn initial_solution(&self, _rng: &mut SecureShuffle) -> Grid {
        self.start.clone()
    }

    fn cost(&self, grid: &Grid) -> f64 {
        fairness_cost(grid, self.cars, self.lanes)
    }

    fn neighbor(&self, grid: &Grid, rng: &mut SecureShuffle) -> Option<Grid> {
        if grid.len() < 2 || self.lanes == 0 {
            return None;
        }
        let lane = rng.random_range(0..self.lanes);
        let h1 = rng.random_range(0..grid.len());
        let h2 = rng.random_range(0..grid.len());
        if h1 == h2 {
            return None;
        }
        let (a, b) = (grid[h1][lane]?, grid[h2][lane]?);
        if a == b || grid[h1].contains(&Some(b)) || grid[h2].contains(&Some(a)) {
            return None;
        }
        let mut next = grid.clone();
        next[h1][lane] = Some(b);
        next[h2][lane] = Some(a);
        Some(next)
    }
}

/// Unconstrained balance search used when no exact design exists.
///
/// Starts from a freshly shuffled deal and mixes two moves: exchanging two
/// occupied slots across heats, and moving a car to another lane of its own
/// heat. Neither move changes how often a car races.
pub(crate) struct FreeBalance {
    pub cars: usize,
    pub runs: usize,
    pub lanes: usize,
}

impl GridProblem for FreeBalance {
    fn initial_solution(&self, rng: &mut SecureShuffle) -> Grid {
        let order: Vec<usize> = rng.shuffle(&(0..self.cars).collect::<Vec<_>>());
        let k = self.cars.min(self.lanes);
        let heats: Vec<Vec<usize>> = deal(self.cars, self.runs, k)
            .into_iter()
            .map(|heat| heat.into_iter().map(|i| order[i]).collect())
            .collect();
        assign_lanes(&heats, self.cars, self.lanes)
    }

    fn cost(&self, grid: &Grid) -> f64 {
        fairness_cost(grid, self.cars, self.lanes)
    }

    fn neighbor(&self, grid: &Grid, rng: &mut SecureShuffle) -> Option<Grid> {
        if grid.is_empty() || self.lanes == 0 {
            return None;
        }
        let mut next = grid.clone();

        if grid.len() > 1 && rng.random_bool(0.5) {
            let occupied: Vec<(usize, usize)> = grid
                .iter()
                .enumerate()
                .flat_map(|(h, row)| {
                    row.iter()
                        .enumerate()
                        .filter(|(_, car)| car.is_some())
                        .map(move |(lane, _)| (h, lane))
                })
                .collect();
            if occupied.len() < 2 {
                return None;
            }
            let (h1, l1) = occupied[rng.random_range(0..occupied.len())];
            let (h2, l2) = occupied[rng.random_range(0..occupied.len())];
            if h1 == h2 {
                return None;
            }
            let (a, b) = (grid[h1][l1]?, grid[h2][l2]?);
            if a == b || grid[h1].contains(&Some(b)) || grid[h2].contains(&Some(a)) {
                return None;
            }
            next[h1][l1] = Some(b);
            next[h2][l2] = Some(a);
        } else {
            let h = rng.random_range(0..grid.len());
            let l1 = rng.random_range(0..self.lanes);
            let l2 = rng.random_range(0..self.lanes);
            if l1 == l2 || (grid[h][l1].is_none() && grid[h][l2].is_none()) {
                return None;
            }
            next[h].swap(l1, l2);
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::design::heat_size;
    use crate::schedule::appearance_counts_idx;

    fn exact_start(n: usize, lanes: usize, runs: usize) -> LaneLockedSwap {
        let heats = deal(n, runs, heat_size(n, lanes));
        LaneLockedSwap {
            start: assign_lanes(&heats, n, lanes),
            cars: n,
            lanes,
        }
    }

    fn quick_config() -> OptimizerConfig {
        OptimizerConfig::default()
            .with_max_iterations(4_000)
            .with_restarts(2)
    }

    #[test]
    fn test_refinement_improves_repeated_opponents() {
        let problem = exact_start(12, 4, 3);
        let start_cost = problem.cost(&problem.start);
        let outcome = anneal(&problem, &quick_config(), &mut SecureShuffle::from_seed(42));
        assert!(outcome.best_cost < start_cost);
        assert!(outcome.improving_moves > 0);
    }

    #[test]
    fn test_lane_locked_moves_preserve_structure() {
        let problem = exact_start(10, 4, 2);
        let outcome = anneal(&problem, &quick_config(), &mut SecureShuffle::from_seed(7));
        let counts = appearance_counts_idx(&outcome.best, 10);
        assert!(counts.iter().all(|&c| c == 2));
        for (before, after) in problem.start.iter().zip(&outcome.best) {
            let occupied = |row: &Vec<Option<usize>>| row.iter().map(Option::is_some).collect::<Vec<_>>();
            assert_eq!(occupied(before), occupied(after));
        }
    }

    #[test]
    fn test_free_balance_keeps_appearances() {
        let problem = FreeBalance {
            cars: 7,
            runs: 3,
            lanes: 4,
        };
        let outcome = anneal(&problem, &quick_config(), &mut SecureShuffle::from_seed(3));
        let counts = appearance_counts_idx(&outcome.best, 7);
        assert!(counts.iter().all(|&c| c == 3));
        for row in &outcome.best {
            let cars: Vec<usize> = row.iter().flatten().copied().collect();
            let mut dedup = cars.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(cars.len(), dedup.len());
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let problem = FreeBalance {
            cars: 6,
            runs: 2,
            lanes: 4,
        };
        let a = anneal(&problem, &quick_config(), &mut SecureShuffle::from_seed(99));
        let b = anneal(&problem, &quick_config(), &mut SecureShuffle::from_seed(99));
        assert_eq!(a.best, b.best);
        assert_eq!(a.restart, b.restart);
    }

    #[test]
    fn test_max_iterations_limit() {
        let problem = FreeBalance {
            cars: 9,
            runs: 3,
            lanes: 4,
        };
        let config = OptimizerConfig::default()
            .with_max_iterations(100)
            .with_restarts(1);
        let outcome = anneal(&problem, &config, &mut SecureShuffle::from_seed(1));
        assert!(outcome.iterations <= 100);
    }

    #[test]
    fn test_threshold_stops_immediately() {
        let problem = exact_start(8, 4, 4);
        let config = quick_config().with_cost_threshold(1e9);
        let outcome = anneal(&problem, &config, &mut SecureShuffle::from_seed(1));
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn test_cost_history_non_increasing() {
        let problem = exact_start(12, 4, 3);
        let outcome = anneal(&problem, &quick_config(), &mut SecureShuffle::from_seed(5));
        for window in outcome.cost_history.windows(2) {
            assert!(window[1] <= window[0] + 1e-12);
        }
    }

    #[test]
    fn test_linear_and_lundy_mees_terminate() {
        let problem = exact_start(8, 4, 2);
        let linear = quick_config().with_cooling(CoolingSchedule::Linear);
        let lm = quick_config().with_cooling(CoolingSchedule::LundyMees { beta: 0.5 });
        for config in [linear, lm] {
            let outcome = anneal(&problem, &config, &mut SecureShuffle::from_seed(2));
            assert!(outcome.iterations <= 4_000);
            assert!(outcome.final_temperature > 0.0);
        }
    }

    #[test]
    fn test_linear_cooling_reaches_floor() {
        let config = OptimizerConfig::default()
            .with_cooling(CoolingSchedule::Linear)
            .with_initial_temperature(2.0)
            .with_min_temperature(0.0)
            .with_iterations_per_temperature(10)
            .with_max_iterations(40);
        let cooler = Cooler::new(&config);
        let temps: Vec<f64> = (0..5).map(|step| cooler.next(2.0, step)).collect();
        assert_eq!(temps, vec![1.5, 1.0, 0.5, 0.0, 0.0]);

        // A budget smaller than one step drops straight to the floor.
        let short = Cooler::new(&config.clone().with_max_iterations(5));
        assert_eq!(short.next(2.0, 0), 0.0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_restarts_match_sequential() {
        let problem = FreeBalance {
            cars: 9,
            runs: 3,
            lanes: 4,
        };
        let config = quick_config().with_restarts(4);
        let sequential = anneal(&problem, &config.clone().with_parallel(false), &mut SecureShuffle::from_seed(11));
        let parallel = anneal(&problem, &config.with_parallel(true), &mut SecureShuffle::from_seed(11));
        assert_eq!(sequential.best, parallel.best);
        assert_eq!(sequential.best_cost, parallel.best_cost);
        assert_eq!(sequential.restart, parallel.restart);
        assert_eq!(sequential.iterations, parallel.iterations);
    }
}
