//! Error types shared across the crate.
//!
//! Each fatal error carries enough context (division, heat index, car id)
//! to locate the failure without re-running the pipeline.

use crate::catalog::{CarId, Division};
use crate::schedule::Lane;

/// Malformed racer input. Fatal: aborts before any scheduling happens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate car id {car} (rows {first_row} and {row})")]
    DuplicateCar {
        car: CarId,
        first_row: usize,
        row: usize,
    },

    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid value {value:?} for field '{field}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Catalog lookup miss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("car {car} is not in the catalog")]
pub struct NotFoundError {
    pub car: CarId,
}

/// The scheduling parameter that made a request infeasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Lanes(usize),
    RunsPerCar(usize),
    Racers(usize),
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameter::Lanes(n) => write!(f, "num_lanes = {n}"),
            Parameter::RunsPerCar(n) => write!(f, "runs_per_car = {n}"),
            Parameter::Racers(n) => write!(f, "racers = {n}"),
        }
    }
}

/// Invalid scheduling parameters for a division.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot schedule {division}: {parameter} ({reason})")]
pub struct InfeasibleScheduleError {
    pub division: Division,
    pub parameter: Parameter,
    pub reason: String,
}

impl InfeasibleScheduleError {
    pub(crate) fn new(division: &Division, parameter: Parameter, reason: impl Into<String>) -> Self {
        Self {
            division: division.clone(),
            parameter,
            reason: reason.into(),
        }
    }
}

/// A single structural defect inside a generated schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The same car occupies more than one lane of a heat.
    DuplicateCar { heat: usize, car: CarId },
    /// A lane is assigned twice in a heat, or lies outside the track.
    LaneConflict { heat: usize, lane: Lane },
    /// Two heats share a heat number.
    DuplicateHeat { heat: usize },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::DuplicateCar { heat, car } => write!(f, "car {car} repeated in heat {heat}"),
            Conflict::LaneConflict { heat, lane } => write!(f, "lane {lane} conflict in heat {heat}"),
            Conflict::DuplicateHeat { heat } => write!(f, "heat number {heat} used more than once"),
        }
    }
}

/// Structural violations found after generation. Indicates a broken
/// optimizer invariant; the schedule is rejected, never repaired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schedule for {division} has {} conflict(s), first: {}", conflicts.len(), first_conflict(conflicts))]
pub struct ScheduleConflictError {
    pub division: Division,
    pub conflicts: Vec<Conflict>,
}

fn first_conflict(conflicts: &[Conflict]) -> String {
    conflicts
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".into())
}

/// Problems with recorded results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResultsError {
    #[error("{division}: no result recorded for car {car} in heat {heat}")]
    Incomplete {
        division: Division,
        heat: usize,
        car: CarId,
    },

    #[error("{division}: result for car {car} in heat {heat} lane {lane} does not match the schedule")]
    UnscheduledResult {
        division: Division,
        heat: usize,
        lane: Lane,
        car: CarId,
    },

    #[error("{division}: car {car} has more than one result in heat {heat}")]
    DuplicateResult {
        division: Division,
        heat: usize,
        car: CarId,
    },

    #[error("{division}: car {car} in heat {heat} recorded a {found}, policy expects a {expected}")]
    OutcomeMismatch {
        division: Division,
        heat: usize,
        car: CarId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{division}: car {car} in heat {heat} has placement {place}, heat seats {heat_size}")]
    InvalidPlacement {
        division: Division,
        heat: usize,
        car: CarId,
        place: u32,
        heat_size: usize,
    },

    #[error("{division}: car {car} in heat {heat} has time {value}, expected a finite non-negative number")]
    InvalidTime {
        division: Division,
        heat: usize,
        car: CarId,
        value: f64,
    },

    #[error("{division}: invalid point policy: {reason}")]
    InvalidPolicy { division: Division, reason: String },

    #[error("{division}: heat {heat} has no recorded time to derive a fallback for car {car}")]
    NoFallback {
        division: Division,
        heat: usize,
        car: CarId,
    },
}

/// Storage adapter failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table '{0}' not found")]
    MissingTable(String),
}

/// Umbrella error for the pipeline and the command-line surface.
#[derive(Debug, thiserror::Error)]
pub enum DerbyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Infeasible(#[from] InfeasibleScheduleError),

    #[error(transparent)]
    Conflict(#[from] ScheduleConflictError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error(transparent)]
    Stage(#[from] crate::pipeline::StageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
