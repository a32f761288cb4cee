//! Scoring conventions.

use serde::{Deserialize, Serialize};

/// How raw outcomes become a car's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scoring {
    /// Points equal the placement (1st = 1). Summed.
    PlaceSum,
    /// First place earns `points_for_first`, each later place one less,
    /// never below zero. Summed.
    PlaceLinear { points_for_first: u32 },
    /// `table[place - 1]` points per heat, zero past the end. Summed.
    PlaceTable(Vec<f64>),
    /// Sum of heat times.
    TotalTime,
    /// Mean heat time.
    AverageTime,
    /// Best single heat time in the ranking direction.
    BestTime,
}

impl Scoring {
    pub fn uses_places(&self) -> bool {
        matches!(
            self,
            Scoring::PlaceSum | Scoring::PlaceLinear { .. } | Scoring::PlaceTable(_)
        )
    }

    /// Points for one placement. Only meaningful for place scorings.
    pub(crate) fn points(&self, place: f64) -> f64 {
        match self {
            Scoring::PlaceLinear { points_for_first } => (f64::from(*points_for_first) + 1.0 - place).max(0.0),
            Scoring::PlaceTable(table) => {
                if place < 1.0 {
                    0.0
                } else {
                    table.get(place.round() as usize - 1).copied().unwrap_or(0.0)
                }
            }
            _ => place,
        }
    }
}

/// Which end of the score scale wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

impl Direction {
    /// Whether `a` beats `b`.
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::LowerIsBetter => a < b,
            Direction::HigherIsBetter => a > b,
        }
    }
}

/// What to do with a scheduled car that has no recorded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MissingResult {
    /// Reject the whole aggregation.
    Fail,
    /// Placement equal to the heat size, or the worst time recorded in that
    /// heat.
    LastPlace,
    /// This raw outcome value (a placement or a time, per the scoring).
    Fixed(f64),
}

/// Secondary ordering for equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    #[default]
    None,
    /// More first-place finishes ranks higher.
    MostWins,
}

/// Complete scoring convention for one aggregation.
///
/// Has no `Default`; callers spell out every convention.
///
/// # Examples
///
/// ```
/// use u_derby::results::{Direction, MissingResult, PointPolicy, Scoring, TieBreak};
///
/// let policy = PointPolicy::new(Scoring::PlaceSum, Direction::LowerIsBetter, MissingResult::Fail)
///     .with_tie_break(TieBreak::MostWins);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPolicy {
    pub scoring: Scoring,
    pub direction: Direction,
    pub missing: MissingResult,
    pub tie_break: TieBreak,
    /// Scores closer than this are equal.
    pub tie_epsilon: f64,
}

impl PointPolicy {
    pub fn new(scoring: Scoring, direction: Direction, missing: MissingResult) -> Self {
        Self {
            scoring,
            direction,
            missing,
            tie_break: TieBreak::None,
            tie_epsilon: 1e-9,
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_tie_epsilon(mut self, epsilon: f64) -> Self {
        self.tie_epsilon = epsilon;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.tie_epsilon.is_finite() || self.tie_epsilon < 0.0 {
            return Err("tie_epsilon must be finite and non-negative".into());
        }
        if let Scoring::PlaceTable(table) = &self.scoring {
            if table.is_empty() {
                return Err("place table must have at least one entry".into());
            }
            if table.iter().any(|p| !p.is_finite()) {
                return Err("place table entries must be finite".into());
            }
        }
        if let MissingResult::Fixed(v) = self.missing {
            if !v.is_finite() {
                return Err("fixed fallback must be finite".into());
            }
        }
        Ok(())
    }
}
