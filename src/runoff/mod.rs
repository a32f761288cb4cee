//! Tie-breaking runoffs for podium ties.
//!
//! A runoff is a round-robin heat set over the cars sharing a rank from 1 to
//! 3. Two tied cars race a single heat; larger ties race every pair.

mod roster;
mod scheduler;

pub use roster::{RunoffRoster, RunoffRow};
pub use scheduler::{build_runoff, build_runoffs, RunoffHeatSet, RunoffOptions};
