//! Heats and heat sets.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::metrics::ScheduleMetrics;
use crate::catalog::{CarId, Division};

/// Most lanes a track may have (labels `A`..=`H`).
pub const MAX_LANES: usize = 8;

/// Zero-based lane index, displayed as a letter (`A` is lane 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lane(pub u8);

impl Lane {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn label(self) -> char {
        (b'A' + self.0) as char
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.0 as usize) < 26 {
            write!(f, "{}", self.label())
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Heat-generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeatFormat {
    /// Exact balanced design; falls back to `PartialPerfectN` when the
    /// counts admit none.
    PerfectN,
    /// Best-effort balance via local search.
    PartialPerfectN,
    /// Every pair of cars meets (head-to-head).
    RoundRobin,
}

impl fmt::Display for HeatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeatFormat::PerfectN => "Perfect-N",
            HeatFormat::PartialPerfectN => "Partial-Perfect-N",
            HeatFormat::RoundRobin => "Round-Robin",
        };
        f.write_str(s)
    }
}

/// One car in one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneEntry {
    pub lane: Lane,
    pub car: CarId,
}

/// A single race: lane entries keyed by lane. Unlisted lanes are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heat {
    /// 1-based heat number within its heat set.
    pub index: usize,
    /// Round-robin round this heat belongs to (1-based), if any.
    #[serde(default)]
    pub round: Option<usize>,
    pub entries: Vec<LaneEntry>,
}

impl Heat {
    /// Builds a heat, ordering entries by lane.
    pub fn new(index: usize, mut entries: Vec<LaneEntry>) -> Self {
        entries.sort_by_key(|e| e.lane);
        Self {
            index,
            round: None,
            entries,
        }
    }

    pub fn in_round(mut self, round: usize) -> Self {
        self.round = Some(round);
        self
    }

    /// Builds a heat from a lane-indexed slot row.
    pub(crate) fn from_slots(index: usize, slots: &[Option<CarId>]) -> Self {
        let entries = slots
            .iter()
            .enumerate()
            .filter_map(|(lane, car)| {
                car.map(|car| LaneEntry {
                    lane: Lane(lane as u8),
                    car,
                })
            })
            .collect();
        Self::new(index, entries)
    }

    pub fn cars(&self) -> impl Iterator<Item = CarId> + '_ {
        self.entries.iter().map(|e| e.car)
    }

    pub fn contains(&self, car: CarId) -> bool {
        self.entries.iter().any(|e| e.car == car)
    }

    pub fn car_in(&self, lane: Lane) -> Option<CarId> {
        self.entries.iter().find(|e| e.lane == lane).map(|e| e.car)
    }

    pub fn lane_of(&self, car: CarId) -> Option<Lane> {
        self.entries.iter().find(|e| e.car == car).map(|e| e.lane)
    }

    /// Number of occupied lanes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered heats for one division: the artifact handed to race execution.
///
/// Regenerated wholesale; there is no API for patching heats in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatSet {
    division: Division,
    format: HeatFormat,
    num_lanes: usize,
    runs_per_car: usize,
    cars: Vec<CarId>,
    heats: Vec<Heat>,
    metrics: ScheduleMetrics,
}

impl HeatSet {
    /// Assembles a heat set and computes its fairness metrics.
    ///
    /// `cars` is the full roster the schedule was built for, including cars
    /// that ended up in no heat.
    pub fn new(
        division: Division,
        format: HeatFormat,
        num_lanes: usize,
        runs_per_car: usize,
        cars: Vec<CarId>,
        heats: Vec<Heat>,
    ) -> Self {
        let metrics = ScheduleMetrics::measure(&heats, &cars, num_lanes, runs_per_car);
        Self {
            division,
            format,
            num_lanes,
            runs_per_car,
            cars,
            heats,
            metrics,
        }
    }

    pub(crate) fn mark_exact(mut self, exact: bool) -> Self {
        self.metrics.exact = exact;
        self
    }

    pub fn division(&self) -> &Division {
        &self.division
    }

    pub fn format(&self) -> HeatFormat {
        self.format
    }

    pub fn num_lanes(&self) -> usize {
        self.num_lanes
    }

    pub fn runs_per_car(&self) -> usize {
        self.runs_per_car
    }

    pub fn cars(&self) -> &[CarId] {
        &self.cars
    }

    pub fn heats(&self) -> &[Heat] {
        &self.heats
    }

    pub fn heat(&self, index: usize) -> Option<&Heat> {
        self.heats.iter().find(|h| h.index == index)
    }

    pub fn metrics(&self) -> &ScheduleMetrics {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.heats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heats.is_empty()
    }
}
