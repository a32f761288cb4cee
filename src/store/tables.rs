//! Table row shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CarId, Catalog, RacerRecord};
use crate::error::NotFoundError;
use crate::results::{Ranking, RaceResult};
use crate::runoff::{RunoffHeatSet, RunoffRoster};
use crate::schedule::HeatSet;

/// One row of a `<Class>_<Group>_Rankings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    #[serde(rename = "Car")]
    pub car: CarId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Tied")]
    pub tied: bool,
    #[serde(rename = "Heat_Count")]
    pub heats_run: usize,
    #[serde(rename = "First_Place_Count")]
    pub first_places: usize,
    #[serde(rename = "Avg_Heat_Size")]
    pub avg_heat_size: f64,
    #[serde(rename = "Heat_Size_Pct")]
    pub heat_size_pct: f64,
    #[serde(rename = "Opponent_Uniqueness_Pct")]
    pub opponent_uniqueness_pct: f64,
}

impl RankingRow {
    /// Ranking rows with racer names from the catalog.
    pub fn from_ranking(ranking: &Ranking, catalog: &Catalog) -> Result<Vec<Self>, NotFoundError> {
        ranking
            .entries()
            .iter()
            .map(|e| {
                Ok(Self {
                    car: e.car,
                    name: catalog.lookup(e.car)?.name.clone(),
                    score: e.score,
                    rank: e.rank,
                    tied: e.tied,
                    heats_run: e.heats_run,
                    first_places: e.first_places,
                    avg_heat_size: e.avg_heat_size,
                    heat_size_pct: e.heat_size_pct,
                    opponent_uniqueness_pct: e.opponent_uniqueness_pct,
                })
            })
            .collect()
    }
}

/// The "Runoff" table: who is racing off and their heats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunoffSheet {
    #[serde(default)]
    pub roster: RunoffRoster,
    #[serde(default)]
    pub heats: Vec<RunoffHeatSet>,
}

/// Every table of a race day.
///
/// Division tables are keyed by their sanitized titles
/// (`Tiger_A`, `Tiger_A_Rankings`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(rename = "Racers", default)]
    pub racers: Vec<RacerRecord>,
    #[serde(rename = "HeatsByCar", default)]
    pub heats_by_car: BTreeMap<CarId, Vec<usize>>,
    #[serde(rename = "Heats", default)]
    pub heats: BTreeMap<String, HeatSet>,
    #[serde(rename = "Results", default)]
    pub results: BTreeMap<String, Vec<RaceResult>>,
    #[serde(rename = "Rankings", default)]
    pub rankings: BTreeMap<String, Vec<RankingRow>>,
    #[serde(rename = "Runoff", default)]
    pub runoff: Option<RunoffSheet>,
}

impl Workbook {
    pub fn with_racers(racers: Vec<RacerRecord>) -> Self {
        Self {
            racers,
            ..Self::default()
        }
    }
}
