//! Multi-lane race scheduling and ranking.
//!
//! Schedules timed races for cars grouped by class and group, tallies the
//! recorded outcomes into competition rankings and settles podium ties with
//! runoffs:
//!
//! - **Catalog**: validated racer records, keyed by car number.
//! - **Shuffle**: the single randomness object, OS-seeded or reproducible.
//! - **Optimizer**: Perfect-N, Partial-Perfect-N and round-robin heat
//!   generation with simulated-annealing fairness refinement.
//! - **Validator**: structural gate and fairness audit for heat sets.
//! - **Results**: configurable point policies, competition ranking
//!   (`1, 2, 2, 4`) and podium tie detection.
//! - **Runoff**: round-robin schedules restricted to tied cars.
//! - **Pipeline**: the per-division workflow as an explicit state machine.
//! - **Store**: tabular storage behind a narrow trait.
//!
//! # Example
//!
//! ```
//! use u_derby::catalog::{Catalog, RacerRecord};
//! use u_derby::optimizer::FairnessOptimizer;
//! use u_derby::results::{aggregate, Direction, MissingResult, PointPolicy, Scoring};
//! use u_derby::schedule::HeatFormat;
//! use u_derby::shuffle::SecureShuffle;
//! use u_derby::simulate::simulate_results;
//! use u_derby::validator::validate;
//!
//! let catalog = Catalog::load(
//!     (1..=6).map(|car| RacerRecord::new(car, &format!("Racer {car}"), "Tiger", "A")),
//! )
//! .unwrap();
//! let division = &catalog.divisions()[0];
//! let mut rng = SecureShuffle::from_seed(7);
//!
//! let heats = FairnessOptimizer::default()
//!     .generate_heats(division, &catalog.cars_in(division), 3, 3, HeatFormat::PerfectN, &mut rng)
//!     .unwrap();
//! validate(&heats).unwrap();
//!
//! let results = simulate_results(&heats, &mut rng);
//! let policy = PointPolicy::new(Scoring::PlaceSum, Direction::LowerIsBetter, MissingResult::Fail);
//! let ranking = aggregate(&heats, &results, &policy).unwrap();
//! assert_eq!(ranking.len(), 6);
//! assert_eq!(ranking.entries()[0].rank, 1);
//! ```

pub mod catalog;
pub mod error;
pub mod optimizer;
pub mod pipeline;
pub mod results;
pub mod runoff;
pub mod schedule;
pub mod shuffle;
pub mod simulate;
pub mod store;
pub mod validator;

pub use error::DerbyError;
