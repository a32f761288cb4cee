//! Round-robin heats for tied podium cars.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Division;
use crate::error::InfeasibleScheduleError;
use crate::optimizer::{FairnessOptimizer, RoundRobinOptions};
use crate::results::{Ranking, TieGroup, PODIUM};
use crate::schedule::{HeatFormat, HeatSet};
use crate::shuffle::SecureShuffle;

/// Runoff scheduling options.
#[derive(Debug, Clone, Default)]
pub struct RunoffOptions {
    /// Round-robin options for the runoff heats.
    pub round_robin: RoundRobinOptions,
}

impl RunoffOptions {
    /// Races a small tie once per car with lanes rotated, instead of once.
    pub fn with_rotate_lanes(mut self, rotate: bool) -> Self {
        self.round_robin = self.round_robin.with_rotate_lanes(rotate);
        self
    }
}

/// A runoff schedule tagged with the rank it settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunoffHeatSet {
    pub rank: usize,
    pub heats: HeatSet,
}

/// Round-robin heats for one tie group.
///
/// Returns `Ok(None)` for groups that do not qualify: fewer than two cars,
/// or a rank outside the podium.
pub fn build_runoff(
    division: &Division,
    group: &TieGroup,
    num_lanes: usize,
    options: &RunoffOptions,
    rng: &mut SecureShuffle,
) -> Result<Option<HeatSet>, InfeasibleScheduleError> {
    if group.cars.len() < 2 || group.rank == 0 || group.rank > PODIUM {
        return Ok(None);
    }
    let heats = FairnessOptimizer::default()
        .with_round_robin(options.round_robin.clone())
        .generate_heats(division, &group.cars, num_lanes, 1, HeatFormat::RoundRobin, rng)?;
    info!(%division, rank = group.rank, cars = group.cars.len(), heats = heats.len(), "runoff scheduled");
    Ok(Some(heats))
}

/// One runoff per podium tie in `ranking`; empty when there is none.
pub fn build_runoffs(
    ranking: &Ranking,
    num_lanes: usize,
    options: &RunoffOptions,
    rng: &mut SecureShuffle,
) -> Result<Vec<RunoffHeatSet>, InfeasibleScheduleError> {
    let mut runoffs = Vec::new();
    for group in ranking.tie_groups() {
        if let Some(heats) = build_runoff(&ranking.division, &group, num_lanes, options, rng)? {
            runoffs.push(RunoffHeatSet {
                rank: group.rank,
                heats,
            });
        }
    }
    Ok(runoffs)
}
