//! Random race outcomes for dry runs and demos.

use rand::Rng;
use tracing::info;

use crate::results::RaceResult;
use crate::schedule::HeatSet;
use crate::shuffle::SecureShuffle;

/// Random finishing order for every heat: each heat's cars are shuffled and
/// placed 1, 2, ... in that order.
pub fn simulate_results(heat_set: &HeatSet, rng: &mut SecureShuffle) -> Vec<RaceResult> {
    let mut results = Vec::with_capacity(heat_set.heats().iter().map(|h| h.len()).sum());
    for heat in heat_set.heats() {
        let finish = rng.shuffle(&heat.entries);
        for (place, entry) in finish.iter().enumerate() {
            results.push(RaceResult::place(heat.index, entry.lane, entry.car, place as u32 + 1));
        }
    }
    info!(division = %heat_set.division(), results = results.len(), "simulated placements");
    results
}

/// Random heat times drawn uniformly from `base ± spread` seconds.
pub fn simulate_times(heat_set: &HeatSet, base: f64, spread: f64, rng: &mut SecureShuffle) -> Vec<RaceResult> {
    let spread = spread.abs();
    let mut results = Vec::new();
    for heat in heat_set.heats() {
        for entry in &heat.entries {
            let t = if spread > 0.0 {
                rng.random_range(base - spread..=base + spread)
            } else {
                base
            };
            results.push(RaceResult::time(heat.index, entry.lane, entry.car, t));
        }
    }
    info!(division = %heat_set.division(), results = results.len(), "simulated times");
    results
}
