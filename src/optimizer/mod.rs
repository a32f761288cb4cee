//! Fair heat generation.
//!
//! Three formats share one entry point, [`FairnessOptimizer::generate_heats`]:
//!
//! - **Perfect-N**: a deterministic balanced design (cyclic dealing plus
//!   bipartite lane colouring) whose opponent spread is refined by lane-locked
//!   swaps under a fixed-seed annealing pass.
//! - **Partial-Perfect-N**: simulated annealing over free slot and lane moves
//!   when no exact design exists.
//! - **Round-robin**: circle-method pairings, every pair meeting once.
//!
//! # Fairness cost
//!
//! `var(lane occupancy per car) + var(co-occurrence per pair)`, both as
//! population variances. Zero means every car uses every lane equally and
//! meets every opponent equally often.
//!
//! # Parallelism
//!
//! With the `parallel` feature and [`OptimizerConfig::parallel`] set,
//! annealing restarts run on the rayon pool. Each restart owns a forked
//! [`SecureShuffle`](crate::shuffle::SecureShuffle), so results are the same
//! with or without it.

mod anneal;
mod config;
mod design;
mod engine;
mod round_robin;

pub use config::{CoolingSchedule, OptimizerConfig, RoundRobinOptions};
pub use engine::FairnessOptimizer;
