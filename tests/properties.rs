//! Property tests for the scheduling and ranking invariants.

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;

use u_derby::catalog::{CarId, Division};
use u_derby::optimizer::{FairnessOptimizer, OptimizerConfig};
use u_derby::results::{aggregate, Direction, MissingResult, PointPolicy, RaceResult, Scoring};
use u_derby::runoff::{build_runoffs, RunoffOptions};
use u_derby::schedule::{pair_meetings, Heat, HeatFormat, HeatSet, Lane, LaneEntry};
use u_derby::shuffle::SecureShuffle;
use u_derby::validator::validate;

const CASES: u32 = 24;

fn optimizer() -> FairnessOptimizer {
    let config = OptimizerConfig::default()
        .with_max_iterations(1_500)
        .with_restarts(1)
        .with_refine_iterations(1_500);
    FairnessOptimizer::new(config).unwrap()
}

fn cars(n: u32) -> Vec<CarId> {
    (1..=n).map(|c| CarId(c * 10)).collect()
}

fn appearances(set: &HeatSet) -> BTreeMap<CarId, usize> {
    let mut counts: BTreeMap<CarId, usize> = set.cars().iter().map(|&c| (c, 0)).collect();
    for heat in set.heats() {
        for car in heat.cars() {
            *counts.entry(car).or_insert(0) += 1;
        }
    }
    counts
}

/// Every car races alone; its single time is its score.
fn solo_heats(scores: &[u8]) -> (HeatSet, Vec<RaceResult>) {
    let roster: Vec<CarId> = (1..=scores.len() as u32).map(CarId).collect();
    let heats = roster
        .iter()
        .enumerate()
        .map(|(i, &car)| Heat::new(i + 1, vec![LaneEntry { lane: Lane(0), car }]))
        .collect();
    let results = roster
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(i, (&car, &s))| RaceResult::time(i + 1, Lane(0), car, f64::from(s)))
        .collect();
    let set = HeatSet::new(Division::new("Solo", "General"), HeatFormat::PerfectN, 1, 1, roster, heats);
    (set, results)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(CASES))]

    #[test]
    fn perfect_n_is_structurally_valid_and_balanced(
        n in 1u32..=12,
        lanes in 1usize..=8,
        runs in 1usize..=4,
        seed in any::<u64>(),
    ) {
        let set = optimizer()
            .generate_heats(&Division::new("P", "A"), &cars(n), lanes, runs, HeatFormat::PerfectN, &mut SecureShuffle::from_seed(seed))
            .unwrap();
        prop_assert!(validate(&set).is_ok());
        let counts = appearances(&set);
        if set.metrics().exact {
            prop_assert!(counts.values().all(|&c| c == runs));
        } else {
            prop_assert_eq!(set.format(), HeatFormat::PartialPerfectN);
            prop_assert!(counts.values().all(|&c| c.abs_diff(runs) <= 1));
        }
        prop_assert!(set.heats().iter().all(|h| h.len() <= lanes));
    }

    #[test]
    fn partial_deviation_is_bounded(
        n in 2u32..=11,
        lanes in 2usize..=6,
        runs in 1usize..=4,
        seed in any::<u64>(),
    ) {
        let set = optimizer()
            .generate_heats(&Division::new("P", "B"), &cars(n), lanes, runs, HeatFormat::PartialPerfectN, &mut SecureShuffle::from_seed(seed))
            .unwrap();
        prop_assert!(validate(&set).is_ok());
        prop_assert!(set.metrics().max_deviation <= 1);
        let sizes: Vec<usize> = set.heats().iter().map(Heat::len).collect();
        let spread = sizes.iter().max().unwrap() - sizes.iter().min().unwrap();
        prop_assert!(spread <= 1);
    }

    #[test]
    fn round_robin_pairs_meet_once(
        n in 2u32..=10,
        lanes in 2usize..=6,
        seed in any::<u64>(),
    ) {
        let roster = cars(n);
        let set = optimizer()
            .generate_heats(&Division::new("R", "A"), &roster, lanes, 1, HeatFormat::RoundRobin, &mut SecureShuffle::from_seed(seed))
            .unwrap();
        prop_assert!(validate(&set).is_ok());
        let meetings = pair_meetings(set.heats());
        let n = n as usize;
        prop_assert_eq!(meetings.len(), n * (n - 1) / 2);
        prop_assert!(meetings.values().all(|&m| m == 1));

        if n > lanes {
            let rounds: HashSet<usize> = set.heats().iter().filter_map(|h| h.round).collect();
            let expected_rounds = if n % 2 == 1 { n } else { n - 1 };
            prop_assert_eq!(rounds.len(), expected_rounds);
            let mut byes: BTreeMap<CarId, usize> = BTreeMap::new();
            for round in rounds {
                let racing: HashSet<CarId> = set
                    .heats()
                    .iter()
                    .filter(|h| h.round == Some(round))
                    .flat_map(|h| h.cars())
                    .collect();
                for &car in &roster {
                    if !racing.contains(&car) {
                        *byes.entry(car).or_insert(0) += 1;
                    }
                }
            }
            if n % 2 == 1 {
                prop_assert_eq!(byes.len(), n);
                prop_assert!(byes.values().all(|&b| b == 1));
            } else {
                prop_assert!(byes.is_empty());
            }
        }
    }

    #[test]
    fn competition_ranks_count_strictly_better(scores in prop::collection::vec(0u8..6, 1..12)) {
        let (set, results) = solo_heats(&scores);
        let policy = PointPolicy::new(Scoring::TotalTime, Direction::LowerIsBetter, MissingResult::Fail);
        let ranking = aggregate(&set, &results, &policy).unwrap();
        prop_assert_eq!(ranking.len(), scores.len());
        for entry in ranking.entries() {
            let own = scores[entry.car.0 as usize - 1];
            let better = scores.iter().filter(|&&s| s < own).count();
            let equal = scores.iter().filter(|&&s| s == own).count();
            prop_assert_eq!(entry.rank, better + 1);
            prop_assert_eq!(entry.tied, equal > 1);
        }
        for pair in ranking.entries().windows(2) {
            prop_assert!(pair[0].rank <= pair[1].rank);
        }
    }

    #[test]
    fn runoffs_only_for_podium_ties(scores in prop::collection::vec(0u8..6, 1..12), seed in any::<u64>()) {
        let (set, results) = solo_heats(&scores);
        let policy = PointPolicy::new(Scoring::TotalTime, Direction::LowerIsBetter, MissingResult::Fail);
        let ranking = aggregate(&set, &results, &policy).unwrap();

        let mut expected = 0;
        let mut distinct: Vec<u8> = scores.clone();
        distinct.sort_unstable();
        distinct.dedup();
        for s in distinct {
            let rank = scores.iter().filter(|&&x| x < s).count() + 1;
            let size = scores.iter().filter(|&&x| x == s).count();
            if rank <= 3 && size >= 2 {
                expected += 1;
            }
        }

        let runoffs = build_runoffs(&ranking, 2, &RunoffOptions::default(), &mut SecureShuffle::from_seed(seed)).unwrap();
        prop_assert_eq!(runoffs.len(), expected);
        prop_assert_eq!(ranking.has_top_tie(), expected > 0);
        for runoff in &runoffs {
            prop_assert!(runoff.rank <= 3);
            let tied: Vec<CarId> = ranking.entries().iter().filter(|e| e.rank == runoff.rank).map(|e| e.car).collect();
            let meetings = pair_meetings(runoff.heats.heats());
            prop_assert_eq!(meetings.len(), tied.len() * (tied.len() - 1) / 2);
        }
    }

    #[test]
    fn validation_and_aggregation_are_idempotent(n in 2u32..=9, seed in any::<u64>()) {
        let mut rng = SecureShuffle::from_seed(seed);
        let set = optimizer()
            .generate_heats(&Division::new("I", "A"), &cars(n), 4, 2, HeatFormat::PartialPerfectN, &mut rng)
            .unwrap();
        let snapshot = set.clone();
        prop_assert_eq!(validate(&set), validate(&set));
        prop_assert_eq!(&set, &snapshot);

        let results = u_derby::simulate::simulate_results(&set, &mut rng);
        let policy = PointPolicy::new(Scoring::PlaceSum, Direction::LowerIsBetter, MissingResult::Fail);
        let first = aggregate(&set, &results, &policy).unwrap();
        let second = aggregate(&set, &results, &policy).unwrap();
        prop_assert_eq!(first, second);
    }
}
