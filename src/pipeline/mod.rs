//! Per-division race workflow.
//!
//! ```text
//! Unscheduled -> Scheduled -> Raced -> Ranked
//!     Ranked -> Final                      (no podium tie)
//!     Ranked -> TiedAtTop -> RunoffScheduled -> RunoffRaced -> RunoffRanked
//!     RunoffRanked -> TiedAtTop | Final
//! ```
//!
//! `Ranked` and `RunoffRanked` settle immediately: the pipeline moves on to
//! `TiedAtTop` or `Final` within the same call. Runoff rounds are bounded by
//! [`RunoffPolicy::max_rounds`]; ties still standing after the last round are
//! kept as shared ranks and reported by [`DivisionPipeline::unresolved`].

mod division;
mod stage;

pub use division::{DivisionPipeline, RunoffPolicy};
pub use stage::{Stage, StageError};
