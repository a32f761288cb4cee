//! Runoff roster rows.

use serde::{Deserialize, Serialize};

use crate::catalog::{CarId, Catalog};
use crate::error::NotFoundError;
use crate::results::Ranking;

/// One line of the runoff sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunoffRow {
    #[serde(rename = "Car")]
    pub car: CarId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "LastRank")]
    pub last_rank: usize,
}

/// Racers involved in podium ties across all divisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunoffRoster {
    pub rows: Vec<RunoffRow>,
}

impl RunoffRoster {
    /// Collects the tied podium cars of every ranking, with catalog details.
    pub fn build<'a, I>(catalog: &Catalog, rankings: I) -> Result<Self, NotFoundError>
    where
        I: IntoIterator<Item = &'a Ranking>,
    {
        let mut rows = Vec::new();
        for ranking in rankings {
            for group in ranking.tie_groups() {
                for car in group.cars {
                    let racer = catalog.lookup(car)?;
                    rows.push(RunoffRow {
                        car,
                        name: racer.name.clone(),
                        class: racer.class.clone(),
                        group: racer.group.clone(),
                        description: racer.description.clone(),
                        last_rank: group.rank,
                    });
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Division, RacerRecord};
    use crate::results::RankEntry;

    fn entry(car: u32, rank: usize, tied: bool) -> RankEntry {
        RankEntry {
            car: CarId(car),
            rank,
            score: 0.0,
            tied,
            heats_run: 1,
            first_places: 0,
            avg_heat_size: 2.0,
            heat_size_pct: 50.0,
            opponent_uniqueness_pct: 100.0,
        }
    }

    #[test]
    fn test_roster_rows() {
        let catalog = Catalog::load(vec![
            RacerRecord::new(1, "Ann", "Tiger", "A").with_description("blue"),
            RacerRecord::new(2, "Ben", "Tiger", "A"),
            RacerRecord::new(3, "Cal", "Tiger", "A"),
        ])
        .unwrap();
        let ranking = Ranking {
            division: Division::new("Tiger", "A"),
            entries: vec![entry(1, 1, false), entry(2, 2, true), entry(3, 2, true)],
        };
        let roster = RunoffRoster::build(&catalog, [&ranking]).unwrap();
        assert_eq!(roster.rows.len(), 2);
        assert_eq!(roster.rows[0].name, "Ben");
        assert_eq!(roster.rows[0].last_rank, 2);
        assert_eq!(roster.rows[1].car, CarId(3));
    }

    #[test]
    fn test_unknown_car_fails() {
        let catalog = Catalog::load(vec![RacerRecord::new(1, "Ann", "Tiger", "A")]).unwrap();
        let ranking = Ranking {
            division: Division::new("Tiger", "A"),
            entries: vec![entry(1, 1, true), entry(7, 1, true)],
        };
        assert_eq!(
            RunoffRoster::build(&catalog, [&ranking]).unwrap_err(),
            NotFoundError { car: CarId(7) }
        );
    }
}
