//! Optimizer configuration and cooling schedules.

/// How the annealing temperature falls between steps.
#[derive(Debug, Clone, Copy)]
pub enum CoolingSchedule {
    /// `T_{k+1} = alpha * T_k`.
    Geometric {
        /// In `(0, 1)`; closer to 1 cools more slowly.
        alpha: f64,
    },

    /// Equal drops from the initial to the minimum temperature, spread over
    /// the iteration budget.
    Linear,

    /// `T / (1 + beta * T)` after every single move (Lundy and Mees).
    LundyMees {
        /// Usually `(T_0 - T_min) / (max_iterations * T_0 * T_min)`.
        beta: f64,
    },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric { alpha: 0.95 }
    }
}

/// Configuration for heat generation.
///
/// The annealing parameters drive both the Partial-Perfect-N local search
/// and the opponent-spread refinement of exact Perfect-N designs. Costs are
/// variances of small integer counts, so temperatures are small.
///
/// # Examples
///
/// ```
/// use u_derby::optimizer::{CoolingSchedule, OptimizerConfig};
///
/// let config = OptimizerConfig::default()
///     .with_max_iterations(5_000)
///     .with_restarts(2)
///     .with_cooling(CoolingSchedule::Geometric { alpha: 0.9 });
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Starting temperature. Higher values accept more worsening moves.
    pub initial_temperature: f64,

    /// The search stops once the temperature drops below this.
    pub min_temperature: f64,

    pub cooling: CoolingSchedule,

    /// Moves tried at each temperature level (ignored by `LundyMees`).
    pub iterations_per_temperature: usize,

    /// Hard move budget per restart. 0 = bounded by temperature only.
    pub max_iterations: usize,

    /// Stop as soon as the fairness cost is at or below this value.
    pub cost_threshold: f64,

    /// Independent restarts of the local search; the cheapest wins.
    pub restarts: usize,

    /// Run restarts on the rayon pool (requires the `parallel` feature).
    pub parallel: bool,

    /// Move budget for the opponent-spread pass over exact Perfect-N designs.
    /// 0 disables the pass.
    pub refine_iterations: usize,

    /// Seed of the Perfect-N refinement pass, fixed so the exact design is
    /// a deterministic function of its input order.
    pub refine_seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 0.5,
            min_temperature: 1e-4,
            cooling: CoolingSchedule::default(),
            iterations_per_temperature: 100,
            max_iterations: 20_000,
            cost_threshold: 0.0,
            restarts: 4,
            parallel: cfg!(feature = "parallel"),
            refine_iterations: 10_000,
            refine_seed: 0x5eed_4d45,
        }
    }
}

impl OptimizerConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_cost_threshold(mut self, threshold: f64) -> Self {
        self.cost_threshold = threshold;
        self
    }

    pub fn with_restarts(mut self, n: usize) -> Self {
        self.restarts = n;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_refine_iterations(mut self, n: usize) -> Self {
        self.refine_iterations = n;
        self
    }

    pub fn with_refine_seed(mut self, seed: u64) -> Self {
        self.refine_seed = seed;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_temperature <= 0.0 {
            return Err("initial_temperature must be positive".into());
        }
        if self.min_temperature <= 0.0 {
            return Err("min_temperature must be positive".into());
        }
        if self.min_temperature >= self.initial_temperature {
            return Err("min_temperature must be less than initial_temperature".into());
        }
        if self.restarts == 0 {
            return Err("restarts must be at least 1".into());
        }
        if self.cost_threshold < 0.0 {
            return Err("cost_threshold must not be negative".into());
        }
        match self.cooling {
            CoolingSchedule::Geometric { alpha } => {
                if alpha <= 0.0 || alpha >= 1.0 {
                    return Err(format!("geometric alpha must be in (0, 1), got {alpha}"));
                }
            }
            CoolingSchedule::LundyMees { beta } => {
                if beta <= 0.0 {
                    return Err(format!("lundy-mees beta must be positive, got {beta}"));
                }
            }
            CoolingSchedule::Linear => {}
        }
        Ok(())
    }
}

/// Options for round-robin (head-to-head) schedules.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinOptions {
    /// When the whole group fits in one heat, race it once per car with
    /// cars rotated so each runs every used lane, instead of a single heat.
    pub rotate_lanes: bool,
}

impl RoundRobinOptions {
    pub fn with_rotate_lanes(mut self, rotate: bool) -> Self {
        self.rotate_lanes = rotate;
        self
    }
}
