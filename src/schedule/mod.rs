//! Heat schedules.
//!
//! A [`HeatSet`] is the ordered list of [`Heat`]s for one division together
//! with the parameters it was built for and a [`ScheduleMetrics`] fairness
//! summary. Heat sets are produced by the optimizer and the runoff
//! scheduler and are treated as immutable afterwards.

mod metrics;
mod types;

pub use metrics::{heats_by_car, pair_meetings, ScheduleMetrics};
pub use types::{Heat, HeatFormat, HeatSet, Lane, LaneEntry, MAX_LANES};

pub(crate) use metrics::fairness_cost;
#[cfg(test)]
pub(crate) use metrics::appearance_counts_idx;
