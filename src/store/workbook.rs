//! JSON workbook on disk.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::memory::read;
use super::tables::{RankingRow, RunoffSheet, Workbook};
use super::RaceStore;
use crate::catalog::{CarId, Division, RacerRecord};
use crate::error::StoreError;
use crate::results::RaceResult;
use crate::schedule::HeatSet;

/// A workbook kept as one JSON document.
///
/// Every write serializes the updated workbook to a sibling temporary file
/// and renames it over the original, so readers see either the old or the
/// new document, never a partial one. The in-memory copy only changes once
/// the rename succeeded.
#[derive(Debug, Clone)]
pub struct JsonWorkbook {
    path: PathBuf,
    book: Workbook,
}

impl JsonWorkbook {
    /// Opens an existing workbook.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let text = fs::read_to_string(&path)?;
        let book = serde_json::from_str(&text)?;
        Ok(Self { path, book })
    }

    /// Writes a new workbook holding only the racers table.
    pub fn create(path: impl AsRef<Path>, racers: Vec<RacerRecord>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let book = Workbook::with_racers(racers);
        persist(&path, &book)?;
        Ok(Self { path, book })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn workbook(&self) -> &Workbook {
        &self.book
    }

    fn commit(&mut self, table: &str, update: impl FnOnce(&mut Workbook)) -> Result<(), StoreError> {
        let mut next = self.book.clone();
        update(&mut next);
        persist(&self.path, &next)?;
        self.book = next;
        debug!(path = %self.path.display(), table, "workbook table written");
        Ok(())
    }
}

fn persist(path: &Path, book: &Workbook) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(book)?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(json.as_bytes())?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

impl RaceStore for JsonWorkbook {
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
        let table = heats.division().table_name();
        self.commit(&table.clone(), |book| {
            book.heats.insert(table, heats.clone());
        })
    }

    fn write_heat_summary(&mut self, summary: &BTreeMap<CarId, Vec<usize>>) -> Result<(), StoreError> {
        self.commit("HeatsByCar", |book| book.heats_by_car = summary.clone())
    }

    fn results(&self, division: &Division) -> Result<Vec<RaceResult>, StoreError> {
        read::results(&self.book, division)
    }

    fn write_results(&mut self, division: &Division, results: &[RaceResult]) -> Result<(), StoreError> {
        let table = division.table_name();
        self.commit(&table.clone(), |book| {
            book.results.insert(table, results.to_vec());
        })
    }

    fn write_rankings(&mut self, division: &Division, rows: &[RankingRow]) -> Result<(), StoreError> {
        let table = division.rankings_table_name();
        self.commit(&table.clone(), |book| {
            book.rankings.insert(table, rows.to_vec());
        })
    }

    fn runoff(&self) -> Result<RunoffSheet, StoreError> {
        read::runoff(&self.book)
    }

    fn write_runoff(&mut self, sheet: &RunoffSheet) -> Result<(), StoreError> {
        self.commit("Runoff", |book| book.runoff = Some(sheet.clone()))
    }
}
