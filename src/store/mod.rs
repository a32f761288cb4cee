//! Tabular storage behind a narrow read/write interface.
//!
//! The core never touches files directly. [`RaceStore`] names the tables the
//! workflow reads and writes; [`MemoryStore`] keeps them in memory and
//! [`JsonWorkbook`] keeps them in one JSON document on disk, replaced
//! atomically on every write.

mod memory;
mod tables;
mod workbook;

pub use memory::MemoryStore;
pub use tables::{RankingRow, RunoffSheet, Workbook};
pub use workbook::JsonWorkbook;

use std::collections::BTreeMap;

use crate::catalog::{CarId, Division, RacerRecord};
use crate::error::StoreError;
use crate::results::RaceResult;
use crate::schedule::HeatSet;

/// Read/write access to the race tables.
///
/// Each write replaces one whole table; a failed write leaves the previous
/// contents in place.
pub trait RaceStore {
    /// Raw rows of the "Racers" table.
    fn racers(&self) -> Result<Vec<RacerRecord>, StoreError>;

    /// Divisions that have a stored schedule.
    fn divisions(&self) -> Result<Vec<Division>, StoreError>;

    fn heats(&self, division: &Division) -> Result<HeatSet, StoreError>;

    fn write_heats(&mut self, heats: &HeatSet) -> Result<(), StoreError>;

    /// Heat numbers per car across every division, shown next to the racers.
    fn write_heat_summary(&mut self, summary: &BTreeMap<CarId, Vec<usize>>) -> Result<(), StoreError>;

    fn results(&self, division: &Division) -> Result<Vec<RaceResult>, StoreError>;

    fn write_results(&mut self, division: &Division, results: &[RaceResult]) -> Result<(), StoreError>;

    fn write_rankings(&mut self, division: &Division, rows: &[RankingRow]) -> Result<(), StoreError>;

    fn runoff(&self) -> Result<RunoffSheet, StoreError>;

    fn write_runoff(&mut self, sheet: &RunoffSheet) -> Result<(), StoreError>;
}
