//! Per-division workflow driver.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::stage::{Stage, StageError};
use crate::catalog::{CarId, Division};
use crate::error::DerbyError;
use crate::optimizer::FairnessOptimizer;
use crate::results::{aggregate, PointPolicy, RaceResult, Ranking, TieGroup};
use crate::runoff::{build_runoffs, RunoffHeatSet, RunoffOptions};
use crate::schedule::{HeatFormat, HeatSet};
use crate::shuffle::SecureShuffle;
use crate::validator::{audit, validate};

/// How far podium ties are chased.
#[derive(Debug, Clone)]
pub struct RunoffPolicy {
    /// Runoff rounds allowed per division. A tie still standing after the
    /// last round stays a shared rank.
    pub max_rounds: usize,
    pub options: RunoffOptions,
}

impl Default for RunoffPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 2,
            options: RunoffOptions::default(),
        }
    }
}

impl RunoffPolicy {
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_options(mut self, options: RunoffOptions) -> Self {
        self.options = options;
        self
    }
}

/// Drives one (class, group) from an empty schedule to final standings.
///
/// Every operation checks the current [`Stage`] first and fails with a
/// [`StageError`] when called out of order.
#[derive(Debug, Clone)]
pub struct DivisionPipeline {
    division: Division,
    stage: Stage,
    points: PointPolicy,
    runoff_policy: RunoffPolicy,
    heats: Option<HeatSet>,
    results: Vec<RaceResult>,
    ranking: Option<Ranking>,
    runoffs: Vec<RunoffHeatSet>,
    runoff_results: BTreeMap<usize, Vec<RaceResult>>,
    rounds: usize,
    unresolved: Vec<TieGroup>,
}

impl DivisionPipeline {
    pub fn new(division: Division, points: PointPolicy, runoff_policy: RunoffPolicy) -> Self {
        Self {
            division,
            stage: Stage::Unscheduled,
            points,
            runoff_policy,
            heats: None,
            results: Vec::new(),
            ranking: None,
            runoffs: Vec::new(),
            runoff_results: BTreeMap::new(),
            rounds: 0,
            unresolved: Vec::new(),
        }
    }

    pub fn division(&self) -> &Division {
        &self.division
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn heats(&self) -> Option<&HeatSet> {
        self.heats.as_ref()
    }

    /// Current standings, with any settled runoffs already applied.
    pub fn ranking(&self) -> Option<&Ranking> {
        self.ranking.as_ref()
    }

    /// Runoffs of the latest round.
    pub fn runoffs(&self) -> &[RunoffHeatSet] {
        &self.runoffs
    }

    pub fn runoff_rounds(&self) -> usize {
        self.rounds
    }

    /// Podium ties left standing once the runoff rounds ran out.
    pub fn unresolved(&self) -> &[TieGroup] {
        &self.unresolved
    }

    pub fn is_final(&self) -> bool {
        self.stage == Stage::Final
    }

    /// Generates, validates and audits the division's heats.
    ///
    /// Allowed before racing starts; scheduling again replaces the heats.
    pub fn schedule(
        &mut self,
        optimizer: &FairnessOptimizer,
        cars: &[CarId],
        num_lanes: usize,
        runs_per_car: usize,
        format: HeatFormat,
        rng: &mut SecureShuffle,
    ) -> Result<&HeatSet, DerbyError> {
        self.require(&[Stage::Unscheduled, Stage::Scheduled], "schedule heats")?;
        let heats = optimizer.generate_heats(&self.division, cars, num_lanes, runs_per_car, format, rng)?;
        self.adopt(heats, cars)
    }

    /// Accepts a schedule produced elsewhere, e.g. read back from a store.
    pub fn load_schedule(&mut self, heats: HeatSet) -> Result<&HeatSet, DerbyError> {
        self.require(&[Stage::Unscheduled, Stage::Scheduled], "load heats")?;
        let cars = heats.cars().to_vec();
        self.adopt(heats, &cars)
    }

    fn adopt(&mut self, heats: HeatSet, cars: &[CarId]) -> Result<&HeatSet, DerbyError> {
        validate(&heats)?;
        audit(&heats, cars);
        self.enter(Stage::Scheduled);
        Ok(self.heats.insert(heats))
    }

    pub fn record_results(&mut self, results: Vec<RaceResult>) -> Result<(), DerbyError> {
        self.require(&[Stage::Scheduled], "record results")?;
        self.results = results;
        self.enter(Stage::Raced);
        Ok(())
    }

    /// Aggregates the recorded results and settles into `TiedAtTop` or
    /// `Final`. Returns the stage reached.
    pub fn rank(&mut self) -> Result<Stage, DerbyError> {
        self.require(&[Stage::Raced], "rank results")?;
        let heats = self.heats.as_ref().ok_or_else(|| self.stage_error("rank without heats"))?;
        let ranking = aggregate(heats, &self.results, &self.points)?;
        self.ranking = Some(ranking);
        self.enter(Stage::Ranked);
        Ok(self.settle())
    }

    /// Builds one runoff per podium tie of the current standings.
    pub fn schedule_runoffs(&mut self, num_lanes: usize, rng: &mut SecureShuffle) -> Result<&[RunoffHeatSet], DerbyError> {
        self.require(&[Stage::TiedAtTop], "schedule runoffs")?;
        let ranking = self.ranking.as_ref().ok_or_else(|| self.stage_error("schedule runoffs without standings"))?;
        let runoffs = build_runoffs(ranking, num_lanes, &self.runoff_policy.options, rng)?;
        for runoff in &runoffs {
            validate(&runoff.heats)?;
        }
        self.rounds += 1;
        self.runoffs = runoffs;
        self.runoff_results.clear();
        self.enter(Stage::RunoffScheduled);
        Ok(&self.runoffs)
    }

    /// Records the results of the runoff settling `rank`. Once every runoff
    /// of the round has results the division moves to `RunoffRaced`.
    pub fn record_runoff_results(&mut self, rank: usize, results: Vec<RaceResult>) -> Result<Stage, DerbyError> {
        self.require(&[Stage::RunoffScheduled], "record runoff results")?;
        if !self.runoffs.iter().any(|r| r.rank == rank) {
            return Err(self.stage_error("record results for a rank without a runoff").into());
        }
        self.runoff_results.insert(rank, results);
        if self.runoffs.iter().all(|r| self.runoff_results.contains_key(&r.rank)) {
            self.enter(Stage::RunoffRaced);
        }
        Ok(self.stage)
    }

    /// Ranks every runoff, reorders the tied blocks of the standings and
    /// settles into `TiedAtTop` or `Final`. Returns the stage reached.
    pub fn rank_runoffs(&mut self) -> Result<Stage, DerbyError> {
        self.require(&[Stage::RunoffRaced], "rank runoffs")?;
        let mut settled = Vec::with_capacity(self.runoffs.len());
        for runoff in &self.runoffs {
            let results = self.runoff_results.get(&runoff.rank).map(Vec::as_slice).unwrap_or(&[]);
            settled.push((runoff.rank, aggregate(&runoff.heats, results, &self.points)?));
        }

        let ranking = self.ranking.as_mut().ok_or_else(|| StageError {
            division: self.division.clone(),
            stage: self.stage,
            action: "rank runoffs without standings",
        })?;
        for (rank, runoff) in &settled {
            apply_runoff(ranking, *rank, runoff);
        }
        self.enter(Stage::RunoffRanked);
        Ok(self.settle())
    }

    fn settle(&mut self) -> Stage {
        let ties = self.ranking.as_ref().map(Ranking::tie_groups).unwrap_or_default();
        if ties.is_empty() {
            self.unresolved.clear();
            self.enter(Stage::Final);
        } else if self.rounds < self.runoff_policy.max_rounds {
            self.enter(Stage::TiedAtTop);
        } else {
            for group in &ties {
                warn!(division = %self.division, rank = group.rank, cars = ?group.cars, "tie left unresolved");
            }
            self.unresolved = ties;
            self.enter(Stage::Final);
        }
        if self.stage == Stage::Final {
            info!(division = %self.division, runoff_rounds = self.rounds, "standings final");
        }
        self.stage
    }

    fn require(&self, allowed: &[Stage], action: &'static str) -> Result<(), StageError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(self.stage_error(action))
        }
    }

    fn stage_error(&self, action: &'static str) -> StageError {
        StageError {
            division: self.division.clone(),
            stage: self.stage,
            action,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(division = %self.division, from = %self.stage, to = %stage, "stage change");
        self.stage = stage;
    }
}

/// Reorders the block of cars sharing `rank` by their runoff standing.
/// A runoff rank `r` maps to `rank + r - 1`; runoff ties stay tied.
fn apply_runoff(ranking: &mut Ranking, rank: usize, runoff: &Ranking) {
    let Some(start) = ranking.entries.iter().position(|e| e.rank == rank) else {
        return;
    };
    let len = ranking.entries[start..].iter().take_while(|e| e.rank == rank).count();
    let block = &mut ranking.entries[start..start + len];

    block.sort_by_key(|e| (runoff.entry(e.car).map_or(usize::MAX, |r| r.rank), e.car));
    for entry in block.iter_mut() {
        if let Some(settled) = runoff.entry(entry.car) {
            entry.rank = rank + settled.rank - 1;
            entry.tied = settled.tied;
        }
    }
}
