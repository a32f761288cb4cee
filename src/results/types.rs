//! Outcomes, rank entries and rankings.

use serde::{Deserialize, Serialize};

use crate::catalog::{CarId, Division};
use crate::schedule::Lane;

/// A recorded heat outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// 1-based finishing position.
    Place(u32),
    /// Elapsed time in seconds.
    Time(f64),
}

impl Outcome {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Outcome::Place(_) => "placement",
            Outcome::Time(_) => "time",
        }
    }
}

/// One car's outcome in one heat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub heat: usize,
    pub lane: Lane,
    pub car: CarId,
    pub outcome: Outcome,
}

impl RaceResult {
    pub fn place(heat: usize, lane: Lane, car: CarId, place: u32) -> Self {
        Self {
            heat,
            lane,
            car,
            outcome: Outcome::Place(place),
        }
    }

    pub fn time(heat: usize, lane: Lane, car: CarId, seconds: f64) -> Self {
        Self {
            heat,
            lane,
            car,
            outcome: Outcome::Time(seconds),
        }
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub car: CarId,
    /// Competition rank: tied cars share it, the next rank skips ahead.
    pub rank: usize,
    pub score: f64,
    pub tied: bool,
    pub heats_run: usize,
    pub first_places: usize,
    pub avg_heat_size: f64,
    /// Average heat size as a percentage of the lane count.
    pub heat_size_pct: f64,
    /// Distinct opponents met, as a percentage of the other cars.
    pub opponent_uniqueness_pct: f64,
}

/// Cars sharing a podium rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieGroup {
    pub rank: usize,
    pub cars: Vec<CarId>,
}

/// Highest rank that still counts as contested.
pub const PODIUM: usize = 3;

/// Ordered standings for one division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub division: Division,
    pub entries: Vec<RankEntry>,
}

impl Ranking {
    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    pub fn entry(&self, car: CarId) -> Option<&RankEntry> {
        self.entries.iter().find(|e| e.car == car)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every shared rank, in ranking order.
    pub fn shared_ranks(&self) -> Vec<TieGroup> {
        let mut groups: Vec<TieGroup> = Vec::new();
        for entry in self.entries.iter().filter(|e| e.tied) {
            match groups.last_mut() {
                Some(group) if group.rank == entry.rank => group.cars.push(entry.car),
                _ => groups.push(TieGroup {
                    rank: entry.rank,
                    cars: vec![entry.car],
                }),
            }
        }
        groups
    }

    /// Shared ranks on the podium (1 to 3), the ones a runoff settles.
    pub fn tie_groups(&self) -> Vec<TieGroup> {
        self.shared_ranks()
            .into_iter()
            .filter(|g| g.rank <= PODIUM && g.cars.len() >= 2)
            .collect()
    }

    pub fn has_top_tie(&self) -> bool {
        !self.tie_groups().is_empty()
    }
}
