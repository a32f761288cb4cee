//! Head-to-head round-robin construction (circle method).
//!
//! With `n` cars (plus one dummy when `n` is odd, giving `m` slots), slot 0
//! stays fixed and the remaining slots rotate one step per round. Round `r`
//! pairs position `i` with position `m - 1 - i`. Over `m - 1` rounds every
//! unordered pair meets exactly once and no car appears twice in a round.
//! The dummy sits in the fixed slot, so its partner (the car with the bye)
//! changes every round and each car sits out exactly once.
//!
//! # References
//!
//! - Kirkman (1847); the "circle method" for round-robin tournaments

use super::config::RoundRobinOptions;

/// One generated heat over roster indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoundRobinHeat {
    /// 1-based round, `None` for single-heat groups.
    pub round: Option<usize>,
    pub row: Vec<Option<usize>>,
}

/// Every pair once. Groups that fit on the track race together instead.
pub(crate) fn round_robin(n: usize, lanes: usize, options: &RoundRobinOptions) -> Vec<RoundRobinHeat> {
    if n < 2 || lanes < 2 {
        return Vec::new();
    }
    if n <= lanes {
        return small_group(n, lanes, options.rotate_lanes);
    }

    let mut slots: Vec<Option<usize>> = Vec::with_capacity(n + 1);
    if n % 2 == 1 {
        slots.push(None);
    }
    slots.extend((0..n).map(Some));
    let m = slots.len();

    let mut usage = vec![vec![0usize; lanes]; n];
    let mut load = vec![0usize; lanes];
    let mut heats = Vec::with_capacity(n * (n - 1) / 2);

    for round in 0..m - 1 {
        for i in 0..m / 2 {
            if let (Some(a), Some(b)) = (slots[i], slots[m - 1 - i]) {
                let (la, lb) = pick_lanes(&usage[a], &usage[b], &load);
                usage[a][la] += 1;
                usage[b][lb] += 1;
                load[la] += 1;
                load[lb] += 1;

                let mut row = vec![None; lanes];
                row[la] = Some(a);
                row[lb] = Some(b);
                heats.push(RoundRobinHeat {
                    round: Some(round + 1),
                    row,
                });
            }
        }
        slots[1..].rotate_right(1);
    }
    heats
}

/// Lane pair minimising each car's own lane repeats, then overall lane load.
fn pick_lanes(usage_a: &[usize], usage_b: &[usize], load: &[usize]) -> (usize, usize) {
    let lanes = usage_a.len();
    let mut best = (0, 1);
    let mut best_key = (usize::MAX, usize::MAX);
    for p in 0..lanes {
        for q in 0..lanes {
            if p == q {
                continue;
            }
            let key = (usage_a[p] + usage_b[q], load[p] + load[q]);
            if key < best_key {
                best_key = key;
                best = (p, q);
            }
        }
    }
    best
}

fn small_group(n: usize, lanes: usize, rotate: bool) -> Vec<RoundRobinHeat> {
    let heats = if rotate { n } else { 1 };
    (0..heats)
        .map(|h| {
            let mut row = vec![None; lanes];
            for (lane, slot) in row.iter_mut().take(n).enumerate() {
                *slot = Some((h + lane) % n);
            }
            RoundRobinHeat { round: None, row }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn pairs_of(heats: &[RoundRobinHeat]) -> HashMap<(usize, usize), usize> {
        let mut pairs = HashMap::new();
        for heat in heats {
            let cars: Vec<usize> = heat.row.iter().flatten().copied().collect();
            for (i, &a) in cars.iter().enumerate() {
                for &b in &cars[i + 1..] {
                    *pairs.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                }
            }
        }
        pairs
    }

    #[test]
    fn test_every_pair_exactly_once() {
        for n in 2..=11 {
            let heats = round_robin(n, 2, &RoundRobinOptions::default());
            let pairs = pairs_of(&heats);
            assert_eq!(pairs.len(), n * (n - 1) / 2, "n={n}");
            assert!(pairs.values().all(|&c| c == 1), "n={n}");
        }
    }

    #[test]
    fn test_no_car_twice_per_round() {
        let heats = round_robin(7, 4, &RoundRobinOptions::default());
        let mut per_round: HashMap<usize, HashSet<usize>> = HashMap::new();
        for heat in &heats {
            let round = heat.round.unwrap();
            for &car in heat.row.iter().flatten() {
                assert!(per_round.entry(round).or_default().insert(car));
            }
        }
        assert_eq!(per_round.len(), 7);
    }

    #[test]
    fn test_odd_count_byes_rotate() {
        let n = 9;
        let heats = round_robin(n, 4, &RoundRobinOptions::default());
        let rounds = n;
        let mut byes = vec![0; n];
        for round in 1..=rounds {
            let racing: HashSet<usize> = heats
                .iter()
                .filter(|h| h.round == Some(round))
                .flat_map(|h| h.row.iter().flatten().copied())
                .collect();
            assert_eq!(racing.len(), n - 1);
            for (car, count) in byes.iter_mut().enumerate() {
                if !racing.contains(&car) {
                    *count += 1;
                }
            }
        }
        assert!(byes.iter().all(|&b| b == 1));
    }

    #[test]
    fn test_lanes_are_spread() {
        let heats = round_robin(6, 4, &RoundRobinOptions::default());
        let mut usage = vec![vec![0; 4]; 6];
        for heat in &heats {
            for (lane, car) in heat.row.iter().enumerate() {
                if let Some(c) = car {
                    usage[*c][lane] += 1;
                }
            }
        }
        for lanes in usage {
            let max = *lanes.iter().max().unwrap();
            assert!(max <= 2, "lane usage {lanes:?}");
        }
    }

    #[test]
    fn test_small_group_single_heat() {
        let heats = round_robin(3, 4, &RoundRobinOptions::default());
        assert_eq!(heats.len(), 1);
        assert_eq!(heats[0].row, vec![Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_small_group_rotation() {
        let options = RoundRobinOptions::default().with_rotate_lanes(true);
        let heats = round_robin(3, 4, &options);
        assert_eq!(heats.len(), 3);
        for car in 0..3 {
            let lanes: HashSet<usize> = heats
                .iter()
                .filter_map(|h| h.row.iter().position(|&c| c == Some(car)))
                .collect();
            assert_eq!(lanes.len(), 3);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(round_robin(1, 4, &RoundRobinOptions::default()).is_empty());
        assert!(round_robin(5, 1, &RoundRobinOptions::default()).is_empty());
    }
}
