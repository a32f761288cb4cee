//! Deterministic schedule construction.
//!
//! Two steps build every Perfect-N style starting point:
//!
//! 1. **Dealing.** Cars are dealt from a cyclic stream `0, 1, .., n-1, 0, ..`
//!    into `ceil(n * runs / k)` heats whose sizes differ by at most one,
//!    where `k = min(n, lanes)`. Each car receives exactly `runs` slots and
//!    a heat never holds more than `n` consecutive stream positions, so no
//!    car repeats within a heat.
//! 2. **Lane colouring.** Heats and cars form a bipartite multigraph with one
//!    edge per appearance. A car's appearances are split into blocks of `k`;
//!    a proper `k`-edge-colouring of heats x blocks (König) gives every heat
//!    distinct lanes and every block distinct lanes, so each car uses each
//!    lane `floor(runs / k)` or `ceil(runs / k)` times.

use std::collections::HashMap;

/// Lane-indexed heat rows over roster indices.
pub(crate) type Grid = Vec<Vec<Option<usize>>>;

/// Heat size for `n` cars on `lanes` lanes.
pub(crate) fn heat_size(n: usize, lanes: usize) -> usize {
    n.min(lanes)
}

/// Whether the counts admit an exact balanced design: every heat full and
/// every car able to use each lane equally often.
pub(crate) fn admits_exact(n: usize, lanes: usize, runs: usize) -> bool {
    let k = heat_size(n, lanes);
    k > 0 && (n * runs) % k == 0 && (runs <= k || runs % k == 0)
}

/// Deals `n` cars, `runs` times each, into evenly sized heats of at most `k`.
pub(crate) fn deal(n: usize, runs: usize, k: usize) -> Vec<Vec<usize>> {
    let total = n * runs;
    if total == 0 || k == 0 {
        return Vec::new();
    }
    let heats = total.div_ceil(k);
    let base = total / heats;
    let extra = total % heats;

    let mut stream = (0..n).cycle();
    (0..heats)
        .map(|h| {
            let size = base + usize::from(h < extra);
            stream.by_ref().take(size).collect()
        })
        .collect()
}

/// Assigns lanes `0..k` to dealt heats by bipartite edge colouring and lays
/// the result out on `lanes` lanes. Falls back to positional lanes if the
/// colouring cannot place an appearance.
pub(crate) fn assign_lanes(heats: &[Vec<usize>], n: usize, lanes: usize) -> Grid {
    let k = heats.iter().map(Vec::len).max().unwrap_or(0).min(lanes);
    colour(heats, n, k, lanes).unwrap_or_else(|| positional(heats, lanes))
}

fn positional(heats: &[Vec<usize>], lanes: usize) -> Grid {
    heats
        .iter()
        .map(|cars| {
            let mut row = vec![None; lanes];
            for (slot, &car) in row.iter_mut().zip(cars) {
                *slot = Some(car);
            }
            row
        })
        .collect()
}

fn colour(heats: &[Vec<usize>], n: usize, k: usize, lanes: usize) -> Option<Grid> {
    if k == 0 {
        return Some(vec![vec![None; lanes]; heats.len()]);
    }

    // Block = (car, appearance / k).
    let mut seen = vec![0usize; n];
    let mut block_ids: HashMap<(usize, usize), usize> = HashMap::new();
    let mut block_car: Vec<usize> = Vec::new();
    let mut edges = Vec::new();
    for (h, cars) in heats.iter().enumerate() {
        for &car in cars {
            let key = (car, seen[car] / k);
            seen[car] += 1;
            let b = *block_ids.entry(key).or_insert_with(|| {
                block_car.push(car);
                block_car.len() - 1
            });
            edges.push((h, b));
        }
    }

    let mut heat_at: Vec<Vec<Option<usize>>> = vec![vec![None; k]; heats.len()];
    let mut block_at: Vec<Vec<Option<usize>>> = vec![vec![None; k]; block_car.len()];
    let path_limit = 2 * (heats.len() + block_car.len()) + 2;

    for (h, b) in edges {
        let a = (0..k).find(|&c| heat_at[h][c].is_none())?;
        let beta = (0..k).find(|&c| block_at[b][c].is_none())?;

        let chosen = if block_at[b][a].is_none() {
            a
        } else if heat_at[h][beta].is_none() {
            beta
        } else {
            // Flip the a/beta alternating path that starts at `b`; `h` cannot
            // lie on it because `a` is free at `h`.
            let mut path = Vec::new();
            let mut block = b;
            while path.len() < path_limit {
                let Some(h2) = block_at[block][a] else { break };
                path.push((h2, block, a));
                let Some(b2) = heat_at[h2][beta] else { break };
                path.push((h2, b2, beta));
                block = b2;
            }
            for &(hh, bb, c) in &path {
                heat_at[hh][c] = None;
                block_at[bb][c] = None;
            }
            for &(hh, bb, c) in &path {
                let flipped = if c == a { beta } else { a };
                heat_at[hh][flipped] = Some(bb);
                block_at[bb][flipped] = Some(hh);
            }
            a
        };

        if heat_at[h][chosen].is_some() || block_at[b][chosen].is_some() {
            return None;
        }
        heat_at[h][chosen] = Some(b);
        block_at[b][chosen] = Some(h);
    }

    Some(
        heat_at
            .iter()
            .map(|row| {
                let mut lanes_row = vec![None; lanes];
                for (lane, block) in row.iter().enumerate() {
                    lanes_row[lane] = block.map(|b| block_car[b]);
                }
                lanes_row
            })
            .collect(),
    )
}
