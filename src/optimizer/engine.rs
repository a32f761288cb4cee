//! Heat generation entry point.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::anneal::{anneal, AnnealOutcome, FreeBalance, LaneLockedSwap};
use super::config::{OptimizerConfig, RoundRobinOptions};
use super::design::{admits_exact, assign_lanes, deal, heat_size, Grid};
use super::round_robin::round_robin;
use crate::catalog::{CarId, Division};
use crate::error::{InfeasibleScheduleError, Parameter};
use crate::schedule::{Heat, HeatFormat, HeatSet, MAX_LANES};
use crate::shuffle::SecureShuffle;

/// Builds fair heat schedules for one division at a time.
///
/// # Examples
///
/// ```
/// use u_derby::catalog::{CarId, Division};
/// use u_derby::optimizer::FairnessOptimizer;
/// use u_derby::schedule::HeatFormat;
/// use u_derby::shuffle::SecureShuffle;
///
/// let cars: Vec<CarId> = (1..=8).map(CarId).collect();
/// let heats = FairnessOptimizer::default()
///     .generate_heats(
///         &Division::new("Wolf", "A"),
///         &cars,
///         4,
///         4,
///         HeatFormat::PerfectN,
///         &mut SecureShuffle::from_seed(1),
///     )
///     .unwrap();
/// assert_eq!(heats.len(), 8);
/// assert!(heats.metrics().exact);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FairnessOptimizer {
    config: OptimizerConfig,
    round_robin: RoundRobinOptions,
}

impl FairnessOptimizer {
    /// Creates an optimizer after validating `config`.
    pub fn new(config: OptimizerConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            config,
            round_robin: RoundRobinOptions::default(),
        })
    }

    pub fn with_round_robin(mut self, options: RoundRobinOptions) -> Self {
        self.round_robin = options;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Generates the heats for `racers` on a `num_lanes` track.
    ///
    /// `runs_per_car` is ignored by [`HeatFormat::RoundRobin`], whose run
    /// count follows from the group size. A Perfect-N request whose counts
    /// admit no exact design is answered with a Partial-Perfect-N schedule
    /// and `metrics().exact == false`.
    ///
    /// # Errors
    ///
    /// [`InfeasibleScheduleError`] naming the offending parameter when the
    /// lane count is outside `1..=8` (`2..=8` for round-robin), `runs_per_car`
    /// is zero, or `racers` is empty or repeats a car.
    pub fn generate_heats(
        &self,
        division: &Division,
        racers: &[CarId],
        num_lanes: usize,
        runs_per_car: usize,
        format: HeatFormat,
        rng: &mut SecureShuffle,
    ) -> Result<HeatSet, InfeasibleScheduleError> {
        check_request(division, racers, num_lanes, runs_per_car, format)?;

        let order = rng.shuffle(racers);
        let heat_set = match format {
            HeatFormat::PerfectN if admits_exact(order.len(), num_lanes, runs_per_car) => {
                self.perfect(division, order, num_lanes, runs_per_car)
            }
            HeatFormat::PerfectN => {
                warn!(
                    %division,
                    cars = order.len(),
                    num_lanes,
                    runs_per_car,
                    "no exact Perfect-N design, falling back to Partial-Perfect-N"
                );
                self.partial(division, order, num_lanes, runs_per_car, rng)
            }
            HeatFormat::PartialPerfectN => self.partial(division, order, num_lanes, runs_per_car, rng),
            HeatFormat::RoundRobin => self.head_to_head(division, order, num_lanes),
        };

        let metrics = heat_set.metrics();
        info!(
            %division,
            format = %heat_set.format(),
            heats = metrics.heat_count,
            exact = metrics.exact,
            max_deviation = metrics.max_deviation,
            fairness_cost = metrics.fairness_cost,
            "generated heats"
        );
        Ok(heat_set)
    }

    fn perfect(&self, division: &Division, order: Vec<CarId>, lanes: usize, runs: usize) -> HeatSet {
        let n = order.len();
        let start = assign_lanes(&deal(n, runs, heat_size(n, lanes)), n, lanes);

        // A fixed seed keeps Perfect-N a function of the dealt order.
        let grid = if n > lanes && self.config.refine_iterations > 0 {
            let refine = self
                .config
                .clone()
                .with_max_iterations(self.config.refine_iterations);
            let problem = LaneLockedSwap {
                start,
                cars: n,
                lanes,
            };
            let outcome = anneal(&problem, &refine, &mut SecureShuffle::from_seed(self.config.refine_seed));
            log_search(division, &outcome);
            outcome.best
        } else {
            start
        };

        let heat_set = assemble(division, HeatFormat::PerfectN, lanes, runs, order, &grid, &[]);
        let exact = heat_set.metrics().max_deviation == 0;
        heat_set.mark_exact(exact)
    }

    fn partial(
        &self,
        division: &Division,
        order: Vec<CarId>,
        lanes: usize,
        runs: usize,
        rng: &mut SecureShuffle,
    ) -> HeatSet {
        let problem = FreeBalance {
            cars: order.len(),
            runs,
            lanes,
        };
        let outcome = anneal(&problem, &self.config, rng);
        log_search(division, &outcome);
        assemble(division, HeatFormat::PartialPerfectN, lanes, runs, order, &outcome.best, &[])
    }

    fn head_to_head(&self, division: &Division, order: Vec<CarId>, lanes: usize) -> HeatSet {
        let n = order.len();
        let heats = round_robin(n, lanes, &self.round_robin);
        let runs = match n {
            0 | 1 => 0,
            n if n <= lanes && self.round_robin.rotate_lanes => n,
            n if n <= lanes => 1,
            n => n - 1,
        };
        let (grid, rounds): (Grid, Vec<Option<usize>>) = heats.into_iter().map(|h| (h.row, h.round)).unzip();
        let heat_set = assemble(division, HeatFormat::RoundRobin, lanes, runs, order, &grid, &rounds);
        let exact = heat_set.metrics().max_deviation == 0;
        heat_set.mark_exact(exact)
    }
}

fn check_request(
    division: &Division,
    racers: &[CarId],
    num_lanes: usize,
    runs_per_car: usize,
    format: HeatFormat,
) -> Result<(), InfeasibleScheduleError> {
    let min_lanes = if format == HeatFormat::RoundRobin { 2 } else { 1 };
    if num_lanes < min_lanes || num_lanes > MAX_LANES {
        return Err(InfeasibleScheduleError::new(
            division,
            Parameter::Lanes(num_lanes),
            format!("{format} needs between {min_lanes} and {MAX_LANES} lanes"),
        ));
    }
    if runs_per_car == 0 {
        return Err(InfeasibleScheduleError::new(
            division,
            Parameter::RunsPerCar(runs_per_car),
            "every car must race at least once",
        ));
    }
    if racers.is_empty() {
        return Err(InfeasibleScheduleError::new(
            division,
            Parameter::Racers(0),
            "no racers to schedule",
        ));
    }
    let mut seen = HashSet::with_capacity(racers.len());
    if let Some(dup) = racers.iter().find(|&&car| !seen.insert(car)) {
        return Err(InfeasibleScheduleError::new(
            division,
            Parameter::Racers(racers.len()),
            format!("car {dup} is listed more than once"),
        ));
    }
    Ok(())
}

fn assemble(
    division: &Division,
    format: HeatFormat,
    lanes: usize,
    runs: usize,
    order: Vec<CarId>,
    grid: &Grid,
    rounds: &[Option<usize>],
) -> HeatSet {
    let heats = grid
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let slots: Vec<Option<CarId>> = row.iter().map(|slot| slot.map(|c| order[c])).collect();
            let heat = Heat::from_slots(i + 1, &slots);
            match rounds.get(i).copied().flatten() {
                Some(round) => heat.in_round(round),
                None => heat,
            }
        })
        .collect();
    HeatSet::new(division.clone(), format, lanes, runs, order, heats)
}

fn log_search(division: &Division, outcome: &AnnealOutcome) {
    debug!(
        %division,
        initial_cost = outcome.cost_history.first().copied().unwrap_or(outcome.best_cost),
        best_cost = outcome.best_cost,
        iterations = outcome.iterations,
        accepted = outcome.accepted_moves,
        improving = outcome.improving_moves,
        final_temperature = outcome.final_temperature,
        "fairness search done"
    );
}
