//! Score tallying and competition ranking.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use tracing::{info, warn};

use super::policy::{Direction, MissingResult, PointPolicy, Scoring, TieBreak};
use super::types::{Outcome, RaceResult, RankEntry, Ranking};
use crate::catalog::CarId;
use crate::error::ResultsError;
use crate::schedule::{Heat, HeatSet};

/// Per-car tally for one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreCard {
    pub car: CarId,
    pub values: Vec<f64>,
    pub score: f64,
    pub wins: usize,
    pub heat_size_total: usize,
    pub opponents: BTreeSet<CarId>,
}

impl ScoreCard {
    fn new(car: CarId) -> Self {
        Self {
            car,
            values: Vec::new(),
            score: 0.0,
            wins: 0,
            heat_size_total: 0,
            opponents: BTreeSet::new(),
        }
    }
}

/// Tallies `results` against `heat_set` and ranks the scheduled cars.
///
/// Every scheduled (heat, car) slot is resolved to a raw outcome, falling
/// back per [`MissingResult`] when nothing was recorded. Cars in no heat are
/// not ranked. The result depends only on the inputs, not on result order.
///
/// # Errors
///
/// [`ResultsError`] with division, heat and car context for a result that
/// does not match the schedule, a duplicate, an outcome of the wrong kind, a
/// placement outside `1..=heat size`, a time that is negative or not finite,
/// or a missing result under [`MissingResult::Fail`]. A policy failing
/// [`PointPolicy::validate`] is rejected before any result is read.
///
/// # Examples
///
/// ```
/// use u_derby::catalog::{CarId, Division};
/// use u_derby::results::{aggregate, Direction, MissingResult, PointPolicy, RaceResult, Scoring};
/// use u_derby::schedule::{Heat, HeatFormat, HeatSet, Lane, LaneEntry};
///
/// let entries = (0..3u8)
///     .map(|l| LaneEntry { lane: Lane(l), car: CarId(u32::from(l) + 1) })
///     .collect();
/// let heats = HeatSet::new(
///     Division::new("Tiger", "A"),
///     HeatFormat::PerfectN,
///     3,
///     1,
///     vec![CarId(1), CarId(2), CarId(3)],
///     vec![Heat::new(1, entries)],
/// );
/// let results = vec![
///     RaceResult::place(1, Lane(0), CarId(1), 2),
///     RaceResult::place(1, Lane(1), CarId(2), 1),
///     RaceResult::place(1, Lane(2), CarId(3), 3),
/// ];
/// let policy = PointPolicy::new(Scoring::PlaceSum, Direction::LowerIsBetter, MissingResult::Fail);
/// let ranking = aggregate(&heats, &results, &policy).unwrap();
/// assert_eq!(ranking.entries()[0].car, CarId(2));
/// ```
pub fn aggregate(heat_set: &HeatSet, results: &[RaceResult], policy: &PointPolicy) -> Result<Ranking, ResultsError> {
    policy.validate().map_err(|reason| ResultsError::InvalidPolicy {
        division: heat_set.division().clone(),
        reason,
    })?;
    let recorded = index_results(heat_set, results, policy)?;

    let mut cards: HashMap<CarId, ScoreCard> = HashMap::new();
    for heat in heat_set.heats() {
        let mut values = Vec::with_capacity(heat.len());
        for car in heat.cars() {
            let value = match recorded.get(&(heat.index, car)) {
                Some(outcome) => raw_value(outcome),
                None => fallback(heat_set, heat, car, &recorded, policy)?,
            };
            values.push((car, value));
        }

        let winners = heat_winners(heat, &recorded, policy);
        for (car, value) in values {
            let card = cards.entry(car).or_insert_with(|| ScoreCard::new(car));
            card.values.push(value);
            card.heat_size_total += heat.len();
            card.opponents.extend(heat.cars().filter(|&other| other != car));
            if winners.contains(&car) {
                card.wins += 1;
            }
        }
    }

    let mut cards: Vec<ScoreCard> = cards.into_values().collect();
    for card in &mut cards {
        card.score = score(&card.values, policy);
    }

    let others = heat_set.cars().len().saturating_sub(1);
    let entries: Vec<RankEntry> = rank(cards, policy)
        .into_iter()
        .map(|(card, rank, tied)| {
            let heats_run = card.values.len();
            let avg_heat_size = if heats_run == 0 {
                0.0
            } else {
                card.heat_size_total as f64 / heats_run as f64
            };
            RankEntry {
                car: card.car,
                rank,
                score: card.score,
                tied,
                heats_run,
                first_places: card.wins,
                avg_heat_size,
                heat_size_pct: percent(avg_heat_size, heat_set.num_lanes() as f64),
                opponent_uniqueness_pct: percent(card.opponents.len() as f64, others as f64),
            }
        })
        .collect();

    let ranking = Ranking {
        division: heat_set.division().clone(),
        entries,
    };
    for group in ranking.tie_groups() {
        warn!(division = %ranking.division, rank = group.rank, cars = ?group.cars, "tie on the podium");
    }
    info!(division = %ranking.division, cars = ranking.len(), "ranked results");
    Ok(ranking)
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

type Recorded = HashMap<(usize, CarId), Outcome>;

fn index_results(heat_set: &HeatSet, results: &[RaceResult], policy: &PointPolicy) -> Result<Recorded, ResultsError> {
    let division = heat_set.division();
    let expected = if policy.scoring.uses_places() {
        "placement"
    } else {
        "time"
    };

    let mut recorded = HashMap::with_capacity(results.len());
    for result in results {
        let heat = heat_set
            .heat(result.heat)
            .filter(|h| h.car_in(result.lane) == Some(result.car))
            .ok_or_else(|| ResultsError::UnscheduledResult {
                division: division.clone(),
                heat: result.heat,
                lane: result.lane,
                car: result.car,
            })?;

        if result.outcome.kind() != expected {
            return Err(ResultsError::OutcomeMismatch {
                division: division.clone(),
                heat: result.heat,
                car: result.car,
                expected,
                found: result.outcome.kind(),
            });
        }
        match result.outcome {
            Outcome::Place(place) if place == 0 || place as usize > heat.len() => {
                return Err(ResultsError::InvalidPlacement {
                    division: division.clone(),
                    heat: result.heat,
                    car: result.car,
                    place,
                    heat_size: heat.len(),
                });
            }
            Outcome::Time(value) if !value.is_finite() || value < 0.0 => {
                return Err(ResultsError::InvalidTime {
                    division: division.clone(),
                    heat: result.heat,
                    car: result.car,
                    value,
                });
            }
            _ => {}
        }
        if recorded.insert((result.heat, result.car), result.outcome).is_some() {
            return Err(ResultsError::DuplicateResult {
                division: division.clone(),
                heat: result.heat,
                car: result.car,
            });
        }
    }
    Ok(recorded)
}

fn raw_value(outcome: &Outcome) -> f64 {
    match *outcome {
        Outcome::Place(place) => f64::from(place),
        Outcome::Time(seconds) => seconds,
    }
}

fn recorded_times<'a>(heat: &'a Heat, recorded: &'a Recorded) -> impl Iterator<Item = (CarId, f64)> + 'a {
    heat.cars().filter_map(move |car| match recorded.get(&(heat.index, car)) {
        Some(Outcome::Time(t)) => Some((car, *t)),
        _ => None,
    })
}

fn fallback(
    heat_set: &HeatSet,
    heat: &Heat,
    car: CarId,
    recorded: &Recorded,
    policy: &PointPolicy,
) -> Result<f64, ResultsError> {
    match policy.missing {
        MissingResult::Fail => Err(ResultsError::Incomplete {
            division: heat_set.division().clone(),
            heat: heat.index,
            car,
        }),
        MissingResult::Fixed(value) => Ok(value),
        MissingResult::LastPlace if policy.scoring.uses_places() => Ok(heat.len() as f64),
        MissingResult::LastPlace => {
            let worst = recorded_times(heat, recorded)
                .map(|(_, t)| t)
                .reduce(|a, b| if policy.direction.better(a, b) { b } else { a });
            worst.ok_or_else(|| ResultsError::NoFallback {
                division: heat_set.division().clone(),
                heat: heat.index,
                car,
            })
        }
    }
}

/// Cars credited with first place: a recorded placement of 1, or the best
/// recorded time in the heat.
fn heat_winners(heat: &Heat, recorded: &Recorded, policy: &PointPolicy) -> Vec<CarId> {
    if policy.scoring.uses_places() {
        return heat
            .cars()
            .filter(|&car| recorded.get(&(heat.index, car)) == Some(&Outcome::Place(1)))
            .collect();
    }
    let times: Vec<(CarId, f64)> = recorded_times(heat, recorded).collect();
    let Some(best) = times
        .iter()
        .map(|&(_, t)| t)
        .reduce(|a, b| if policy.direction.better(b, a) { b } else { a })
    else {
        return Vec::new();
    };
    times
        .into_iter()
        .filter(|&(_, t)| (t - best).abs() <= policy.tie_epsilon)
        .map(|(car, _)| car)
        .collect()
}

fn score(values: &[f64], policy: &PointPolicy) -> f64 {
    match &policy.scoring {
        Scoring::TotalTime => values.iter().sum(),
        Scoring::AverageTime if values.is_empty() => 0.0,
        Scoring::AverageTime => values.iter().sum::<f64>() / values.len() as f64,
        Scoring::BestTime => values
            .iter()
            .copied()
            .reduce(|a, b| if policy.direction.better(b, a) { b } else { a })
            .unwrap_or(0.0),
        scoring => values.iter().map(|&place| scoring.points(place)).sum(),
    }
}

fn by_direction(direction: Direction, a: f64, b: f64) -> Ordering {
    match direction {
        Direction::LowerIsBetter => a.total_cmp(&b),
        Direction::HigherIsBetter => b.total_cmp(&a),
    }
}

/// Orders cards and assigns competition ranks (`1, 2, 2, 4`).
///
/// Scores within `tie_epsilon` of a block's leading score form one block.
/// Inside a block cars are ordered by the tie-breaker, then car id; only
/// cars still level on the tie-breaker share a rank.
pub(crate) fn rank(mut cards: Vec<ScoreCard>, policy: &PointPolicy) -> Vec<(ScoreCard, usize, bool)> {
    cards.sort_by(|a, b| by_direction(policy.direction, a.score, b.score).then(a.car.cmp(&b.car)));

    let level = |a: &ScoreCard, b: &ScoreCard| match policy.tie_break {
        TieBreak::None => true,
        TieBreak::MostWins => a.wins == b.wins,
    };

    let mut ranked = Vec::with_capacity(cards.len());
    let mut rest = cards.into_iter().peekable();
    while let Some(leader) = rest.next() {
        let lead_score = leader.score;
        let mut block = vec![leader];
        while let Some(next) = rest.next_if(|c| (c.score - lead_score).abs() <= policy.tie_epsilon) {
            block.push(next);
        }
        match policy.tie_break {
            TieBreak::None => block.sort_by_key(|c| c.car),
            TieBreak::MostWins => block.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.car.cmp(&b.car))),
        }

        let mut sizes = Vec::new();
        let mut start = 0;
        for i in 1..=block.len() {
            if i == block.len() || !level(&block[start], &block[i]) {
                sizes.push(i - start);
                start = i;
            }
        }

        let mut members = block.into_iter();
        for size in sizes {
            let position = ranked.len() + 1;
            for card in members.by_ref().take(size) {
                ranked.push((card, position, size > 1));
            }
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Division;
    use crate::schedule::{HeatFormat, Lane, LaneEntry};

    fn card(car: u32, score: f64, wins: usize) -> ScoreCard {
        let mut card = ScoreCard::new(CarId(car));
        card.score = score;
        card.wins = wins;
        card
    }

    fn ranks(cards: Vec<ScoreCard>, policy: &PointPolicy) -> Vec<(u32, usize, bool)> {
        rank(cards, policy)
            .into_iter()
            .map(|(card, rank, tied)| (card.car.0, rank, tied))
            .collect()
    }

    fn points_policy() -> PointPolicy {
        PointPolicy::new(
            Scoring::PlaceLinear { points_for_first: 4 },
            Direction::HigherIsBetter,
            MissingResult::Fail,
        )
    }

    fn place_sum(missing: MissingResult) -> PointPolicy {
        PointPolicy::new(Scoring::PlaceSum, Direction::LowerIsBetter, missing)
    }

    /// Two full heats of cars 1-4, lanes rotated by one.
    fn two_heats() -> HeatSet {
        let heat = |index: usize, shift: u32| {
            let entries = (0..4u32)
                .map(|l| LaneEntry {
                    lane: Lane(l as u8),
                    car: CarId((l + shift) % 4 + 1),
                })
                .collect();
            Heat::new(index, entries)
        };
        HeatSet::new(
            Division::new("Tiger", "A"),
            HeatFormat::PerfectN,
            4,
            2,
            (1..=4).map(CarId).collect(),
            vec![heat(1, 0), heat(2, 1)],
        )
    }

    fn placed(set: &HeatSet, places: [[u32; 4]; 2]) -> Vec<RaceResult> {
        let mut results = Vec::new();
        for (h, heat) in set.heats().iter().enumerate() {
            for entry in &heat.entries {
                let place = places[h][entry.car.0 as usize - 1];
                results.push(RaceResult::place(heat.index, entry.lane, entry.car, place));
            }
        }
        results
    }

    #[test]
    fn test_competition_ranking_with_tie() {
        let cards = vec![card(1, 10.0, 0), card(2, 8.0, 0), card(3, 8.0, 0), card(4, 5.0, 0)];
        assert_eq!(
            ranks(cards, &points_policy()),
            vec![(1, 1, false), (2, 2, true), (3, 2, true), (4, 4, false)]
        );
    }

    #[test]
    fn test_competition_ranking_distinct() {
        let cards = vec![card(4, 7.0, 0), card(2, 9.0, 0), card(1, 10.0, 0), card(3, 8.0, 0)];
        assert_eq!(
            ranks(cards, &points_policy()),
            vec![(1, 1, false), (2, 2, false), (3, 3, false), (4, 4, false)]
        );
    }

    #[test]
    fn test_epsilon_groups_near_scores() {
        let policy = points_policy().with_tie_epsilon(0.01);
        let cards = vec![card(1, 8.0, 0), card(2, 8.005, 0), card(3, 7.0, 0)];
        assert_eq!(
            ranks(cards, &policy),
            vec![(1, 1, true), (2, 1, true), (3, 3, false)]
        );
    }

    #[test]
    fn test_most_wins_splits_tie() {
        let policy = points_policy().with_tie_break(TieBreak::MostWins);
        let cards = vec![card(1, 8.0, 0), card(2, 8.0, 2), card(3, 8.0, 2), card(4, 5.0, 1)];
        assert_eq!(
            ranks(cards, &policy),
            vec![(2, 1, true), (3, 1, true), (1, 3, false), (4, 4, false)]
        );
    }

    #[test]
    fn test_place_sum_aggregate() {
        let set = two_heats();
        // car 1..4 places in heat 1 and heat 2
        let results = placed(&set, [[1, 2, 3, 4], [3, 2, 1, 4]]);
        let ranking = aggregate(&set, &results, &place_sum(MissingResult::Fail)).unwrap();
        let rows: Vec<(u32, usize, f64)> = ranking.entries().iter().map(|e| (e.car.0, e.rank, e.score)).collect();
        assert_eq!(rows, vec![(1, 1, 4.0), (2, 1, 4.0), (3, 1, 4.0), (4, 4, 8.0)]);
        assert_eq!(ranking.tie_groups().len(), 1);
        assert_eq!(ranking.tie_groups()[0].cars, vec![CarId(1), CarId(2), CarId(3)]);

        let broken = aggregate(
            &set,
            &results,
            &place_sum(MissingResult::Fail).with_tie_break(TieBreak::MostWins),
        )
        .unwrap();
        let rows: Vec<(u32, usize)> = broken.entries().iter().map(|e| (e.car.0, e.rank)).collect();
        assert_eq!(rows, vec![(1, 1), (3, 1), (2, 3), (4, 4)]);
    }

    #[test]
    fn test_statistics() {
        let set = two_heats();
        let results = placed(&set, [[1, 2, 3, 4], [2, 1, 3, 4]]);
        let ranking = aggregate(&set, &results, &place_sum(MissingResult::Fail)).unwrap();
        let first = ranking.entry(CarId(1)).unwrap();
        assert_eq!(first.heats_run, 2);
        assert_eq!(first.first_places, 1);
        assert_eq!(first.avg_heat_size, 4.0);
        assert_eq!(first.heat_size_pct, 100.0);
        assert_eq!(first.opponent_uniqueness_pct, 100.0);
    }

    #[test]
    fn test_missing_result_policies() {
        let set = two_heats();
        let mut results = placed(&set, [[1, 2, 3, 4], [2, 1, 3, 4]]);
        results.retain(|r| !(r.heat == 2 && r.car == CarId(4)));

        let err = aggregate(&set, &results, &place_sum(MissingResult::Fail)).unwrap_err();
        assert!(matches!(err, ResultsError::Incomplete { heat: 2, car: CarId(4), .. }));

        let last = aggregate(&set, &results, &place_sum(MissingResult::LastPlace)).unwrap();
        assert_eq!(last.entry(CarId(4)).unwrap().score, 8.0);

        let fixed = aggregate(&set, &results, &place_sum(MissingResult::Fixed(10.0))).unwrap();
        assert_eq!(fixed.entry(CarId(4)).unwrap().score, 14.0);
    }

    #[test]
    fn test_rejects_bad_results() {
        let set = two_heats();
        let policy = place_sum(MissingResult::LastPlace);
        let lane_of_1 = set.heats()[0].lane_of(CarId(1)).unwrap();

        let wrong_lane = vec![RaceResult::place(1, Lane(3), CarId(1), 1)];
        assert!(matches!(
            aggregate(&set, &wrong_lane, &policy),
            Err(ResultsError::UnscheduledResult { .. })
        ));

        let no_heat = vec![RaceResult::place(9, lane_of_1, CarId(1), 1)];
        assert!(matches!(
            aggregate(&set, &no_heat, &policy),
            Err(ResultsError::UnscheduledResult { heat: 9, .. })
        ));

        let twice = vec![
            RaceResult::place(1, lane_of_1, CarId(1), 1),
            RaceResult::place(1, lane_of_1, CarId(1), 2),
        ];
        assert!(matches!(
            aggregate(&set, &twice, &policy),
            Err(ResultsError::DuplicateResult { .. })
        ));

        let timed = vec![RaceResult::time(1, lane_of_1, CarId(1), 2.5)];
        assert!(matches!(
            aggregate(&set, &timed, &policy),
            Err(ResultsError::OutcomeMismatch { expected: "placement", .. })
        ));

        let fifth = vec![RaceResult::place(1, lane_of_1, CarId(1), 5)];
        assert!(matches!(
            aggregate(&set, &fifth, &policy),
            Err(ResultsError::InvalidPlacement { place: 5, heat_size: 4, .. })
        ));
    }

    #[test]
    fn test_time_scorings() {
        let set = two_heats();
        let mut results = Vec::new();
        for heat in set.heats() {
            for entry in &heat.entries {
                let t = 3.0 + f64::from(entry.car.0) * 0.1 + heat.index as f64 * 0.01;
                results.push(RaceResult::time(heat.index, entry.lane, entry.car, t));
            }
        }
        let total = PointPolicy::new(Scoring::TotalTime, Direction::LowerIsBetter, MissingResult::Fail);
        let ranking = aggregate(&set, &results, &total).unwrap();
        let order: Vec<u32> = ranking.entries().iter().map(|e| e.car.0).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(ranking.entry(CarId(1)).unwrap().first_places, 2);
        assert!((ranking.entry(CarId(1)).unwrap().score - 6.23).abs() < 1e-9);

        let best = PointPolicy::new(Scoring::BestTime, Direction::LowerIsBetter, MissingResult::Fail);
        let ranking = aggregate(&set, &results, &best).unwrap();
        assert!((ranking.entry(CarId(2)).unwrap().score - 3.21).abs() < 1e-9);

        let average = PointPolicy::new(Scoring::AverageTime, Direction::LowerIsBetter, MissingResult::Fail);
        let ranking = aggregate(&set, &results, &average).unwrap();
        assert!((ranking.entry(CarId(3)).unwrap().score - 3.315).abs() < 1e-9);
    }

    #[test]
    fn test_missing_time_uses_slowest_in_heat() {
        let set = two_heats();
        let mut results = Vec::new();
        for heat in set.heats() {
            for entry in &heat.entries {
                if heat.index == 1 && entry.car == CarId(2) {
                    continue;
                }
                results.push(RaceResult::time(heat.index, entry.lane, entry.car, f64::from(entry.car.0)));
            }
        }
        let policy = PointPolicy::new(Scoring::TotalTime, Direction::LowerIsBetter, MissingResult::LastPlace);
        let ranking = aggregate(&set, &results, &policy).unwrap();
        assert_eq!(ranking.entry(CarId(2)).unwrap().score, 4.0 + 2.0);

        let second_heat_only: Vec<RaceResult> = results.iter().filter(|r| r.heat == 2).cloned().collect();
        let err = aggregate(&set, &second_heat_only, &policy).unwrap_err();
        assert!(matches!(err, ResultsError::NoFallback { heat: 1, .. }), "{err:?}");
    }

    #[test]
    fn test_rejects_unusable_times() {
        let set = two_heats();
        let policy = PointPolicy::new(Scoring::TotalTime, Direction::HigherIsBetter, MissingResult::LastPlace);
        for bad in [f64::NAN, f64::INFINITY, -5.0] {
            let entry = set.heats()[0].entries[1];
            let results = vec![RaceResult::time(1, entry.lane, entry.car, bad)];
            match aggregate(&set, &results, &policy) {
                Err(ResultsError::InvalidTime { heat: 1, car, .. }) => assert_eq!(car, entry.car),
                other => panic!("time {bad} accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_fixed_fallback() {
        let set = two_heats();
        let policy = PointPolicy::new(Scoring::TotalTime, Direction::LowerIsBetter, MissingResult::Fixed(f64::NAN));
        let err = aggregate(&set, &[], &policy).unwrap_err();
        assert!(matches!(err, ResultsError::InvalidPolicy { .. }), "{err:?}");
    }

    #[test]
    fn test_aggregation_is_idempotent_and_order_free() {
        let set = two_heats();
        let results = placed(&set, [[4, 2, 3, 1], [1, 3, 2, 4]]);
        let policy = place_sum(MissingResult::Fail);
        let first = aggregate(&set, &results, &policy).unwrap();
        let second = aggregate(&set, &results, &policy).unwrap();
        assert_eq!(first, second);

        let mut reversed = results.clone();
        reversed.reverse();
        assert_eq!(aggregate(&set, &reversed, &policy).unwrap(), first);
    }
}
