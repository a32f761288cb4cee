//! Race-day command line.
//!
//! Usage:
//!   derby generate derby.json --lanes 4 --runs 4 --format perfect-n
//!   derby simulate derby.json --seed 7
//!   derby process derby.json --scoring place-sum --missing fail
//!   derby runoff derby.json --lanes 4

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use u_derby::catalog::{Catalog, Division};
use u_derby::optimizer::{FairnessOptimizer, OptimizerConfig, RoundRobinOptions};
use u_derby::pipeline::{DivisionPipeline, RunoffPolicy, Stage};
use u_derby::results::{Direction, MissingResult, PointPolicy, Scoring, TieBreak, TieGroup};
use u_derby::runoff::{build_runoff, RunoffHeatSet, RunoffOptions, RunoffRoster};
use u_derby::schedule::{heats_by_car, HeatFormat, HeatSet};
use u_derby::shuffle::SecureShuffle;
use u_derby::simulate::{simulate_results, simulate_times};
use u_derby::store::{JsonWorkbook, RaceStore, RankingRow, RunoffSheet};
use u_derby::validator::{audit, validate};

#[derive(Parser, Debug)]
#[command(name = "derby")]
#[command(about = "Heat scheduling, ranking and runoffs for multi-lane races")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate heats for every class and group in the workbook
    Generate {
        /// JSON workbook holding the Racers table
        workbook: PathBuf,

        /// Lanes on the track (1-8)
        #[arg(long, default_value_t = 4)]
        lanes: usize,

        /// Heats per car (defaults to the lane count)
        #[arg(long)]
        runs: Option<usize>,

        #[arg(long, value_enum, default_value_t = FormatArg::PerfectN)]
        format: FormatArg,

        /// Race small groups once per car with lanes rotated (round-robin only)
        #[arg(long)]
        rotate_lanes: bool,

        /// Annealing restarts for Partial-Perfect-N
        #[arg(long, default_value_t = 4)]
        restarts: usize,

        /// Seed for a reproducible schedule
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Fill in random results for every scheduled heat
    Simulate {
        workbook: PathBuf,

        /// Record heat times around this many seconds instead of placements
        #[arg(long)]
        times: Option<f64>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Rank recorded results and list podium ties
    Process {
        workbook: PathBuf,

        #[arg(long, value_enum, default_value_t = ScoringArg::PlaceSum)]
        scoring: ScoringArg,

        /// Points for first place with place-linear scoring
        #[arg(long, default_value_t = 4)]
        points_for_first: u32,

        /// Override the scoring's natural direction
        #[arg(long, value_enum)]
        direction: Option<DirectionArg>,

        #[arg(long, value_enum, default_value_t = MissingArg::Fail)]
        missing: MissingArg,

        /// Break equal scores by number of first places
        #[arg(long)]
        most_wins: bool,
    },

    /// Schedule runoff heats for the ties listed by `process`
    Runoff {
        workbook: PathBuf,

        #[arg(long, default_value_t = 4)]
        lanes: usize,

        #[arg(long)]
        rotate_lanes: bool,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    PerfectN,
    Partial,
    RoundRobin,
}

impl From<FormatArg> for HeatFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::PerfectN => HeatFormat::PerfectN,
            FormatArg::Partial => HeatFormat::PartialPerfectN,
            FormatArg::RoundRobin => HeatFormat::RoundRobin,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScoringArg {
    PlaceSum,
    PlaceLinear,
    TotalTime,
    AverageTime,
    BestTime,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionArg {
    Lower,
    Higher,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MissingArg {
    Fail,
    LastPlace,
}

/// `RUST_LOG` when set and parseable, `info` otherwise.
fn default_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .init();

    match Cli::parse().command {
        Commands::Generate {
            workbook,
            lanes,
            runs,
            format,
            rotate_lanes,
            restarts,
            seed,
        } => {
            let config = OptimizerConfig::default().with_restarts(restarts);
            let optimizer = FairnessOptimizer::new(config)
                .map_err(|e| anyhow!("invalid optimizer config: {e}"))?
                .with_round_robin(RoundRobinOptions::default().with_rotate_lanes(rotate_lanes));
            generate(workbook, &optimizer, lanes, runs.unwrap_or(lanes), format.into(), seed)
        }
        Commands::Simulate { workbook, times, seed } => simulate(workbook, times, seed),
        Commands::Process {
            workbook,
            scoring,
            points_for_first,
            direction,
            missing,
            most_wins,
        } => {
            let policy = point_policy(scoring, points_for_first, direction, missing, most_wins);
            policy.validate().map_err(|e| anyhow!("invalid point policy: {e}"))?;
            process(workbook, &policy)
        }
        Commands::Runoff {
            workbook,
            lanes,
            rotate_lanes,
            seed,
        } => runoff(workbook, lanes, RunoffOptions::default().with_rotate_lanes(rotate_lanes), seed),
    }
}

fn open(path: &Path) -> Result<(JsonWorkbook, Catalog)> {
    let book = JsonWorkbook::open(path).with_context(|| format!("opening {}", path.display()))?;
    let catalog = Catalog::load(book.racers()?).context("loading the Racers table")?;
    Ok((book, catalog))
}

fn generate(
    path: PathBuf,
    optimizer: &FairnessOptimizer,
    lanes: usize,
    runs: usize,
    format: HeatFormat,
    seed: Option<u64>,
) -> Result<()> {
    let (mut book, catalog) = open(&path)?;
    let mut rng = SecureShuffle::new(seed);

    let mut all: Vec<HeatSet> = Vec::new();
    for division in catalog.divisions() {
        let cars = catalog.cars_in(&division);
        let heats = optimizer.generate_heats(&division, &cars, lanes, runs, format, &mut rng)?;
        validate(&heats)?;
        audit(&heats, &cars);
        book.write_heats(&heats)?;
        info!(%division, table = %division.table_name(), heats = heats.len(), "heats written");
        all.push(heats);
    }
    book.write_heat_summary(&heats_by_car(all.iter().flat_map(HeatSet::heats)))?;
    Ok(())
}

fn simulate(path: PathBuf, times: Option<f64>, seed: Option<u64>) -> Result<()> {
    let (mut book, _) = open(&path)?;
    let mut rng = SecureShuffle::new(seed);
    for division in book.divisions()? {
        let heats = book.heats(&division)?;
        let results = match times {
            Some(base) => simulate_times(&heats, base, base * 0.1, &mut rng),
            None => simulate_results(&heats, &mut rng),
        };
        book.write_results(&division, &results)?;
    }
    Ok(())
}

fn point_policy(
    scoring: ScoringArg,
    points_for_first: u32,
    direction: Option<DirectionArg>,
    missing: MissingArg,
    most_wins: bool,
) -> PointPolicy {
    let (scoring, natural) = match scoring {
        ScoringArg::PlaceSum => (Scoring::PlaceSum, Direction::LowerIsBetter),
        ScoringArg::PlaceLinear => (Scoring::PlaceLinear { points_for_first }, Direction::HigherIsBetter),
        ScoringArg::TotalTime => (Scoring::TotalTime, Direction::LowerIsBetter),
        ScoringArg::AverageTime => (Scoring::AverageTime, Direction::LowerIsBetter),
        ScoringArg::BestTime => (Scoring::BestTime, Direction::LowerIsBetter),
    };
    let direction = match direction {
        Some(DirectionArg::Lower) => Direction::LowerIsBetter,
        Some(DirectionArg::Higher) => Direction::HigherIsBetter,
        None => natural,
    };
    let missing = match missing {
        MissingArg::Fail => MissingResult::Fail,
        MissingArg::LastPlace => MissingResult::LastPlace,
    };
    let tie_break = if most_wins { TieBreak::MostWins } else { TieBreak::None };
    PointPolicy::new(scoring, direction, missing).with_tie_break(tie_break)
}

fn process(path: PathBuf, policy: &PointPolicy) -> Result<()> {
    let (mut book, catalog) = open(&path)?;

    // Runoffs are scheduled by the `runoff` command, so no rounds here.
    let runoff_policy = RunoffPolicy::default().with_max_rounds(0);
    let mut rankings = Vec::new();
    for division in book.divisions()? {
        let mut pipeline = DivisionPipeline::new(division.clone(), policy.clone(), runoff_policy.clone());
        pipeline.load_schedule(book.heats(&division)?)?;
        pipeline.record_results(book.results(&division)?)?;
        if pipeline.rank()? != Stage::Final {
            return Err(anyhow!("{division}: standings did not settle"));
        }
        let ranking = pipeline
            .ranking()
            .cloned()
            .ok_or_else(|| anyhow!("{division}: no standings"))?;
        book.write_rankings(&division, &RankingRow::from_ranking(&ranking, &catalog)?)?;
        for group in pipeline.unresolved() {
            warn!(%division, rank = group.rank, cars = ?group.cars, "podium tie, run `derby runoff`");
        }
        rankings.push(ranking);
    }

    let roster = RunoffRoster::build(&catalog, &rankings)?;
    if !roster.is_empty() {
        book.write_runoff(&RunoffSheet {
            roster,
            heats: Vec::new(),
        })?;
    }
    Ok(())
}

fn runoff(path: PathBuf, lanes: usize, options: RunoffOptions, seed: Option<u64>) -> Result<()> {
    let (mut book, _) = open(&path)?;
    let mut sheet = book.runoff().context("no Runoff table; run `derby process` first")?;
    let mut rng = SecureShuffle::new(seed);

    let mut ties: BTreeMap<(Division, usize), TieGroup> = BTreeMap::new();
    for row in &sheet.roster.rows {
        let division = Division::new(row.class.clone(), row.group.clone());
        ties.entry((division, row.last_rank))
            .or_insert_with(|| TieGroup {
                rank: row.last_rank,
                cars: Vec::new(),
            })
            .cars
            .push(row.car);
    }

    sheet.heats.clear();
    for ((division, rank), group) in &ties {
        if let Some(heats) = build_runoff(division, group, lanes, &options, &mut rng)? {
            validate(&heats)?;
            sheet.heats.push(RunoffHeatSet { rank: *rank, heats });
        }
    }
    info!(runoffs = sheet.heats.len(), "runoff heats scheduled");
    book.write_runoff(&sheet)?;
    Ok(())
}
