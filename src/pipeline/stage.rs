//! Workflow stages and transition errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Division;

/// Where a division stands in the race workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Unscheduled,
    Scheduled,
    Raced,
    Ranked,
    TiedAtTop,
    RunoffScheduled,
    RunoffRaced,
    RunoffRanked,
    Final,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unscheduled => "unscheduled",
            Stage::Scheduled => "scheduled",
            Stage::Raced => "raced",
            Stage::Ranked => "ranked",
            Stage::TiedAtTop => "tied at top",
            Stage::RunoffScheduled => "runoff scheduled",
            Stage::RunoffRaced => "runoff raced",
            Stage::RunoffRanked => "runoff ranked",
            Stage::Final => "final",
        };
        f.write_str(name)
    }
}

/// An operation was requested in a stage that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{division}: cannot {action} while {stage}")]
pub struct StageError {
    pub division: Division,
    pub stage: Stage,
    pub action: &'static str,
}
