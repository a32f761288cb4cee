//! Result tallying, competition ranking and tie detection.
//!
//! [`aggregate`] turns one division's recorded outcomes into a [`Ranking`].
//! Scores are derived on every pass and never stored as a source of truth.
//! Equal scores share a rank and the next rank skips ahead by the size of
//! the tie (`10, 8, 8, 5` ranks as `1, 2, 2, 4`). Ties at ranks 1 to 3 are
//! reported as [`TieGroup`]s for the runoff scheduler.

mod aggregate;
mod policy;
mod types;

pub use aggregate::aggregate;
pub use policy::{Direction, MissingResult, PointPolicy, Scoring, TieBreak};
pub use types::{Outcome, RaceResult, RankEntry, Ranking, TieGroup, PODIUM};
