//! Structural schedule checks.

use std::collections::HashSet;

use crate::error::{Conflict, ScheduleConflictError};
use crate::schedule::HeatSet;

/// Checks that heat numbers are unique, that no heat repeats a car or a
/// lane and that every lane exists on the track.
///
/// Reports every conflict, not just the first. Never modifies the heats, so
/// validating twice gives the same answer.
pub fn validate(heat_set: &HeatSet) -> Result<(), ScheduleConflictError> {
    let mut conflicts = Vec::new();
    let mut numbers = HashSet::new();

    for heat in heat_set.heats() {
        if !numbers.insert(heat.index) {
            conflicts.push(Conflict::DuplicateHeat { heat: heat.index });
        }
        let mut cars = HashSet::new();
        let mut lanes = HashSet::new();
        for entry in &heat.entries {
            if entry.lane.index() >= heat_set.num_lanes() || !lanes.insert(entry.lane) {
                conflicts.push(Conflict::LaneConflict {
                    heat: heat.index,
                    lane: entry.lane,
                });
            }
            if !cars.insert(entry.car) {
                conflicts.push(Conflict::DuplicateCar {
                    heat: heat.index,
                    car: entry.car,
                });
            }
        }
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(ScheduleConflictError {
            division: heat_set.division().clone(),
            conflicts,
        })
    }
}
