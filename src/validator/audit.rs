//! Fairness and completeness audit.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::warn;

use crate::catalog::{CarId, Division};
use crate::schedule::{pair_meetings, HeatFormat, HeatSet, Lane};

/// Fewest cars a heat should hold when the group has more than one car.
const MIN_HEAT_SIZE: usize = 2;

/// A fairness or completeness concern. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A roster car appears in no heat.
    MissingCar { car: CarId },
    /// A scheduled car is not on the roster.
    UnknownCar { heat: usize, car: CarId },
    /// Appearance count outside the tolerance for the format.
    AppearanceMismatch {
        car: CarId,
        expected: usize,
        actual: usize,
    },
    UndersizedHeat { heat: usize, size: usize },
    /// A car uses one lane more often than its balanced share.
    LaneRepeat {
        car: CarId,
        lane: Lane,
        count: usize,
        allowed: usize,
    },
    /// Round-robin pair that never meets.
    MissingPair { a: CarId, b: CarId },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MissingCar { car } => write!(f, "car {car} is in no heat"),
            Finding::UnknownCar { heat, car } => write!(f, "heat {heat} holds unknown car {car}"),
            Finding::AppearanceMismatch {
                car,
                expected,
                actual,
            } => write!(f, "car {car} races {actual} time(s), expected {expected}"),
            Finding::UndersizedHeat { heat, size } => {
                write!(f, "heat {heat} has only {size} car(s)")
            }
            Finding::LaneRepeat {
                car,
                lane,
                count,
                allowed,
            } => write!(f, "car {car} uses lane {lane} {count} time(s), share is {allowed}"),
            Finding::MissingPair { a, b } => write!(f, "cars {a} and {b} never meet"),
        }
    }
}

/// Findings for one division's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub division: Division,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Audits `heat_set` against the expected `roster`.
///
/// Perfect-N and round-robin schedules must give every car exactly
/// `runs_per_car` heats; Partial-Perfect-N may deviate by one.
pub fn audit(heat_set: &HeatSet, roster: &[CarId]) -> AuditReport {
    let mut findings = Vec::new();
    let known: HashSet<CarId> = roster.iter().copied().collect();

    let mut appearances: BTreeMap<CarId, usize> = roster.iter().map(|&c| (c, 0)).collect();
    let mut lane_use: BTreeMap<(CarId, Lane), usize> = BTreeMap::new();

    for heat in heat_set.heats() {
        if roster.len() > 1 && heat.len() < MIN_HEAT_SIZE {
            findings.push(Finding::UndersizedHeat {
                heat: heat.index,
                size: heat.len(),
            });
        }
        for entry in &heat.entries {
            if !known.contains(&entry.car) {
                findings.push(Finding::UnknownCar {
                    heat: heat.index,
                    car: entry.car,
                });
                continue;
            }
            *appearances.entry(entry.car).or_insert(0) += 1;
            *lane_use.entry((entry.car, entry.lane)).or_insert(0) += 1;
        }
    }

    let expected = heat_set.runs_per_car();
    let tolerance = match heat_set.format() {
        HeatFormat::PartialPerfectN => 1,
        HeatFormat::PerfectN | HeatFormat::RoundRobin => 0,
    };
    for (&car, &actual) in &appearances {
        if actual == 0 && expected > 0 {
            findings.push(Finding::MissingCar { car });
        } else if actual.abs_diff(expected) > tolerance {
            findings.push(Finding::AppearanceMismatch {
                car,
                expected,
                actual,
            });
        }
    }

    // Lanes actually in play: small groups never reach the outer lanes.
    let widest = heat_set.heats().iter().map(|h| h.len()).max().unwrap_or(0);
    let lanes_in_play = widest.min(heat_set.num_lanes()).max(1);
    for (&(car, lane), &count) in &lane_use {
        let allowed = appearances.get(&car).copied().unwrap_or(0).div_ceil(lanes_in_play);
        if count > allowed {
            findings.push(Finding::LaneRepeat {
                car,
                lane,
                count,
                allowed,
            });
        }
    }

    if heat_set.format() == HeatFormat::RoundRobin {
        let meetings = pair_meetings(heat_set.heats());
        let mut cars: Vec<CarId> = roster.to_vec();
        cars.sort_unstable();
        for (i, &a) in cars.iter().enumerate() {
            for &b in &cars[i + 1..] {
                if !meetings.contains_key(&(a, b)) {
                    findings.push(Finding::MissingPair { a, b });
                }
            }
        }
    }

    for finding in &findings {
        warn!(division = %heat_set.division(), "{finding}");
    }
    AuditReport {
        division: heat_set.division().clone(),
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::FairnessOptimizer;
    use crate::schedule::{Heat, LaneEntry};
    use crate::shuffle::SecureShuffle;

    fn roster(n: u32) -> Vec<CarId> {
        (1..=n).map(CarId).collect()
    }

    fn entry(lane: u8, car: u32) -> LaneEntry {
        LaneEntry {
            lane: Lane(lane),
            car: CarId(car),
        }
    }

    #[test]
    fn test_generated_schedules_audit_clean() {
        let opt = FairnessOptimizer::default();
        let division = Division::new("Webelos", "General");
        for (format, n) in [
            (HeatFormat::PerfectN, 12),
            (HeatFormat::PartialPerfectN, 9),
            (HeatFormat::RoundRobin, 6),
        ] {
            let cars = roster(n);
            let set = opt
                .generate_heats(&division, &cars, 4, 3, format, &mut SecureShuffle::from_seed(8))
                .unwrap();
            let report = audit(&set, &cars);
            let appearance_issues: Vec<_> = report
                .findings
                .iter()
                .filter(|f| !matches!(f, Finding::LaneRepeat { .. }))
                .collect();
            assert!(appearance_issues.is_empty(), "{format}: {appearance_issues:?}");
        }
    }

    #[test]
    fn test_perfect_n_has_no_lane_repeats() {
        let cars = roster(12);
        let set = FairnessOptimizer::default()
            .generate_heats(
                &Division::new("Bear", "A"),
                &cars,
                4,
                3,
                HeatFormat::PerfectN,
                &mut SecureShuffle::from_seed(1),
            )
            .unwrap();
        assert!(audit(&set, &cars).is_clean());
    }

    #[test]
    fn test_reports_missing_and_undersized() {
        let heats = vec![
            Heat::new(1, vec![entry(0, 1), entry(1, 2)]),
            Heat::new(2, vec![entry(0, 9)]),
        ];
        let set = HeatSet::new(
            Division::new("Bear", "A"),
            HeatFormat::PerfectN,
            2,
            1,
            roster(3),
            heats,
        );
        let report = audit(&set, &roster(3));
        assert!(report.findings.contains(&Finding::MissingCar { car: CarId(3) }));
        assert!(report.findings.contains(&Finding::UndersizedHeat { heat: 2, size: 1 }));
        assert!(report.findings.contains(&Finding::UnknownCar {
            heat: 2,
            car: CarId(9)
        }));
    }

    #[test]
    fn test_reports_lane_repeat_and_missing_pair() {
        let heats = vec![
            Heat::new(1, vec![entry(0, 1), entry(1, 2)]).in_round(1),
            Heat::new(2, vec![entry(0, 1), entry(1, 3)]).in_round(2),
        ];
        let set = HeatSet::new(
            Division::new("Bear", "A"),
            HeatFormat::RoundRobin,
            2,
            2,
            roster(3),
            heats,
        );
        let report = audit(&set, &roster(3));
        assert!(report.findings.contains(&Finding::LaneRepeat {
            car: CarId(1),
            lane: Lane(0),
            count: 2,
            allowed: 1
        }));
        assert!(report.findings.contains(&Finding::MissingPair {
            a: CarId(2),
            b: CarId(3)
        }));
    }
}
