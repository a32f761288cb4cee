//! Fairness measurements over heat schedules.
//!
//! The fairness cost minimized by the optimizer is
//!
//! ```text
//! cost = Var(lane occupancy per (car, lane)) + Var(co-occurrence per car pair)
//! ```
//!
//! Both variances are population variances. A schedule in which every car
//! uses every lane equally often and meets every other car equally often
//! has cost 0.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::types::Heat;
use crate::catalog::CarId;

/// Lane-indexed heat rows over roster indices (`None` = empty lane).
pub(crate) type SlotRows = [Vec<Option<usize>>];

/// Fairness summary attached to every [`HeatSet`](super::HeatSet).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    /// Whether an exact balanced design was constructed.
    pub exact: bool,
    pub heat_count: usize,
    /// Fewest heats any roster car appears in.
    pub min_appearances: usize,
    /// Most heats any roster car appears in.
    pub max_appearances: usize,
    /// Largest `|appearances - runs_per_car|` over the roster.
    pub max_deviation: usize,
    pub lane_variance: f64,
    pub opponent_variance: f64,
    /// `lane_variance + opponent_variance`.
    pub fairness_cost: f64,
}

impl ScheduleMetrics {
    pub(crate) fn measure(heats: &[Heat], cars: &[CarId], num_lanes: usize, runs_per_car: usize) -> Self {
        let rows = to_slot_rows(heats, cars, num_lanes);
        let counts = appearance_counts_idx(&rows, cars.len());

        let min_appearances = counts.iter().copied().min().unwrap_or(0);
        let max_appearances = counts.iter().copied().max().unwrap_or(0);
        let max_deviation = counts
            .iter()
            .map(|&c| c.abs_diff(runs_per_car))
            .max()
            .unwrap_or(0);

        let lane_variance = lane_variance(&rows, cars.len(), num_lanes);
        let opponent_variance = pair_variance(&rows, cars.len());

        Self {
            exact: false,
            heat_count: heats.len(),
            min_appearances,
            max_appearances,
            max_deviation,
            lane_variance,
            opponent_variance,
            fairness_cost: lane_variance + opponent_variance,
        }
    }
}

/// Maps heats onto roster indices. Cars outside the roster and lanes past
/// `num_lanes` are dropped; the validator reports those separately.
pub(crate) fn to_slot_rows(heats: &[Heat], cars: &[CarId], num_lanes: usize) -> Vec<Vec<Option<usize>>> {
    let index: HashMap<CarId, usize> = cars.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    heats
        .iter()
        .map(|heat| {
            let mut row = vec![None; num_lanes];
            for entry in &heat.entries {
                if let (Some(slot), Some(&i)) = (row.get_mut(entry.lane.index()), index.get(&entry.car)) {
                    *slot = Some(i);
                }
            }
            row
        })
        .collect()
}

pub(crate) fn appearance_counts_idx(rows: &SlotRows, n_cars: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_cars];
    for car in rows.iter().flatten().flatten() {
        counts[*car] += 1;
    }
    counts
}

/// Variance of the `n_cars x n_lanes` occupancy matrix.
pub(crate) fn lane_variance(rows: &SlotRows, n_cars: usize, n_lanes: usize) -> f64 {
    if n_cars == 0 || n_lanes == 0 {
        return 0.0;
    }
    let mut counts = vec![0usize; n_cars * n_lanes];
    for row in rows {
        for (lane, car) in row.iter().enumerate() {
            if let Some(c) = car {
                counts[c * n_lanes + lane] += 1;
            }
        }
    }
    variance(counts.iter().map(|&c| c as f64))
}

/// Variance of co-occurrence counts over all unordered car pairs.
pub(crate) fn pair_variance(rows: &SlotRows, n_cars: usize) -> f64 {
    if n_cars < 2 {
        return 0.0;
    }
    let counts = pair_matrix(rows, n_cars);
    variance(
        (0..n_cars)
            .flat_map(|a| ((a + 1)..n_cars).map(move |b| (a, b)))
            .map(|(a, b)| counts[a * n_cars + b] as f64),
    )
}

/// Symmetric `n x n` co-occurrence matrix, row-major.
pub(crate) fn pair_matrix(rows: &SlotRows, n_cars: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_cars * n_cars];
    for row in rows {
        let present: Vec<usize> = row.iter().flatten().copied().collect();
        for (i, &a) in present.iter().enumerate() {
            for &b in &present[i + 1..] {
                counts[a * n_cars + b] += 1;
                counts[b * n_cars + a] += 1;
            }
        }
    }
    counts
}

pub(crate) fn fairness_cost(rows: &SlotRows, n_cars: usize, n_lanes: usize) -> f64 {
    lane_variance(rows, n_cars, n_lanes) + pair_variance(rows, n_cars)
}

fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// How many heats each pair of cars shares. Keys are ordered `(low, high)`.
pub fn pair_meetings(heats: &[Heat]) -> BTreeMap<(CarId, CarId), usize> {
    let mut meetings = BTreeMap::new();
    for heat in heats {
        let cars: Vec<CarId> = heat.cars().collect();
        for (i, &a) in cars.iter().enumerate() {
            for &b in &cars[i + 1..] {
                let key = if a < b { (a, b) } else { (b, a) };
                *meetings.entry(key).or_insert(0) += 1;
            }
        }
    }
    meetings
}

/// Heat numbers each car is scheduled in, across any number of heat sets.
pub fn heats_by_car<'a, I>(heats: I) -> BTreeMap<CarId, Vec<usize>>
where
    I: IntoIterator<Item = &'a Heat>,
{
    let mut by_car: BTreeMap<CarId, Vec<usize>> = BTreeMap::new();
    for heat in heats {
        for car in heat.cars() {
            by_car.entry(car).or_default().push(heat.index);
        }
    }
    by_car
}
