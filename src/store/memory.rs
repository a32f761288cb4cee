//! In-memory store.

use std::collections::BTreeMap;

use super::tables::{RankingRow, RunoffSheet, Workbook};
use super::RaceStore;
use crate::catalog::{CarId, Division, RacerRecord};
use crate::error::StoreError;
use crate::results::RaceResult;
use crate::schedule::HeatSet;

/// In-memory tables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    book: Workbook,
}

impl MemoryStore {
    pub fn new(racers: Vec<RacerRecord>) -> Self {
        Self {
            book: Workbook::with_racers(racers),
        }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.book
    }
}

impl From<Workbook> for MemoryStore {
    fn from(book: Workbook) -> Self {
        Self { book }
    }
}

impl RaceStore for MemoryStore {
    fn racers(&self) -> Result<Vec<RacerRecord>, StoreError> {
        Ok(self.book.racers.clone())
    }

    fn divisions(&self) -> Result<Vec<Division>, StoreError> {
        Ok(read::divisions(&self.book))
    }

    fn heats(&self, division: &Division) -> Result<HeatSet, StoreError> {
        read::heats(&self.book, division)
    }

    fn write_heats(&mut self, heats: &HeatSet) -> Result<(), StoreError> {
        self.book.heats.insert(heats.division().table_name(), heats.clone());
        Ok(())
    }

    fn write_heat_summary(&mut self, summary: &BTreeMap<CarId, Vec<usize>>) -> Result<(), StoreError> {
        self.book.heats_by_car = summary.clone();
        Ok(())
    }

    fn results(&self, division: &Division) -> Result<Vec<RaceResult>, StoreError> {
        read::results(&self.book, division)
    }

    fn write_results(&mut self, division: &Division, results: &[RaceResult]) -> Result<(), StoreError> {
        self.book.results.insert(division.table_name(), results.to_vec());
        Ok(())
    }

    fn write_rankings(&mut self, division: &Division, rows: &[RankingRow]) -> Result<(), StoreError> {
        self.book.rankings.insert(division.rankings_table_name(), rows.to_vec());
        Ok(())
    }

    fn runoff(&self) -> Result<RunoffSheet, StoreError> {
        read::runoff(&self.book)
    }

    fn write_runoff(&mut self, sheet: &RunoffSheet) -> Result<(), StoreError> {
        self.book.runoff = Some(sheet.clone());
        Ok(())
    }
}

/// Lookups shared by the store implementations.
pub(super) mod read {
    use super::*;

    pub fn divisions(book: &Workbook) -> Vec<Division> {
        book.heats.values().map(|h| h.division().clone()).collect()
    }

    pub fn heats(book: &Workbook, division: &Division) -> Result<HeatSet, StoreError> {
        let table = division.table_name();
        book.heats.get(&table).cloned().ok_or(StoreError::MissingTable(table))
    }

    pub fn results(book: &Workbook, division: &Division) -> Result<Vec<RaceResult>, StoreError> {
        let table = division.table_name();
        book.results.get(&table).cloned().ok_or(StoreError::MissingTable(table))
    }

    pub fn runoff(book: &Workbook) -> Result<RunoffSheet, StoreError> {
        book.runoff
            .clone()
            .ok_or_else(|| StoreError::MissingTable("Runoff".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Heat, HeatFormat, Lane, LaneEntry};

    fn heats() -> HeatSet {
        let entries = vec![
            LaneEntry {
                lane: Lane(0),
                car: CarId(1),
            },
            LaneEntry {
                lane: Lane(1),
                car: CarId(2),
            },
        ];
        HeatSet::new(
            Division::new("Tiger", "A"),
            HeatFormat::PerfectN,
            2,
            1,
            vec![CarId(1), CarId(2)],
            vec![Heat::new(1, entries)],
        )
    }

    #[test]
    fn test_heats_round_trip_by_division() {
        let mut store = MemoryStore::new(vec![RacerRecord::new(1, "Ann", "Tiger", "A")]);
        store.write_heats(&heats()).unwrap();
        assert_eq!(store.divisions().unwrap(), vec![Division::new("Tiger", "A")]);
        assert_eq!(store.heats(&Division::new("Tiger", "A")).unwrap(), heats());
        assert_eq!(store.racers().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_tables() {
        let store = MemoryStore::default();
        let division = Division::new("Bear", "B");
        assert!(matches!(store.heats(&division), Err(StoreError::MissingTable(t)) if t == "Bear_B"));
        assert!(matches!(store.results(&division), Err(StoreError::MissingTable(_))));
        assert!(matches!(store.runoff(), Err(StoreError::MissingTable(t)) if t == "Runoff"));
    }

    #[test]
    fn test_rankings_keyed_by_rankings_title() {
        let mut store = MemoryStore::default();
        store.write_rankings(&Division::new("Tiger", "A"), &[]).unwrap();
        assert!(store.workbook().rankings.contains_key("Tiger_A_Rankings"));
    }
}
