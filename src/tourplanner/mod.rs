//! Tour Planner: filters POIs, builds the pairwise distance matrix in
//! parallel, prunes unreachable POIs, orders the survivors and
//! reconstructs the leg sequence. Each stage consumes the previous
//! stage's output, with no attempt to interleave them.

pub mod order;

use std::sync::atomic::{AtomicUsize, Ordering};

use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::conf::{Config, StartLocation};
use crate::error::TarnError;
use crate::graph::{CostWeights, Graph, NodeId};
use crate::maploader::Poi;
use crate::pathengine;

/// Above this many surviving POIs, ordering switches from exact Held-Karp
/// to simulated annealing.
pub const EXACT_ORDERING_THRESHOLD: usize = 18;

/// One leg of the finished tour: the POIs at either end and the
/// junction-level node path between their best graph nodes (inclusive).
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub from: Poi,
    pub to: Poi,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TourResult {
    pub legs: Vec<Leg>,
}

/// Filters POIs by elevation range, area range, bounding box and name
/// blacklist.
pub fn filter_pois(pois: &[Poi], config: &Config) -> Vec<Poi> {
    let tc = &config.tarn_constraints;
    let mc = &config.map_constraints;
    pois.iter()
        .filter(|p| {
            let elevation = p.elevation as f64;
            elevation >= tc.min_elevation
                && elevation <= tc.max_elevation
                && p.area.map_or(true, |a| a >= tc.min_area && a <= tc.max_area)
                && p.lat >= mc.min_latitude
                && p.lat <= mc.max_latitude
                && p.lon >= mc.min_longitude
                && p.lon <= mc.max_longitude
                && !tc.blacklist.contains(&p.name)
        })
        .cloned()
        .collect()
}

/// Prepends a synthetic "Start" POI when the configuration names one.
pub fn inject_start(mut pois: Vec<Poi>, start: &Option<StartLocation>) -> Vec<Poi> {
    if let Some(loc) = start {
        pois.insert(
            0,
            Poi {
                name: "Start".to_string(),
                source_id: 0,
                lat: loc.latitude,
                lon: loc.longitude,
                elevation: 0.0,
                area: None,
            },
        );
    }
    pois
}

struct PairResult {
    i: usize,
    j: usize,
    cost: f64,
    nodes: Vec<NodeId>,
}

/// Computes the full pairwise distance matrix. Best graph nodes are
/// resolved once, up front, for every POI, since a POI's closest node
/// does not depend on which pair is being computed. Pairs are then routed
/// independently via `rayon`; progress crossing each 10% boundary is
/// logged once, guarded by a CAS loop on a shared atomic so concurrent
/// workers never double-log a boundary.
pub fn compute_pairwise_distances(
    graph: &Graph,
    pois: &[Poi],
    weights: &CostWeights,
) -> (Vec<Vec<f64>>, FxHashMap<(usize, usize), Vec<NodeId>>) {
    let n = pois.len();
    let best_nodes: Vec<Option<NodeId>> = pois
        .iter()
        .map(|p| graph.closest(p.lat, p.lon).map(|(id, _)| id))
        .collect();

    let pairs: Vec<(usize, usize)> = (0..n).tuple_combinations().collect();
    let total = pairs.len();
    let progress = AtomicUsize::new(0);
    let last_decile = AtomicUsize::new(0);

    let results: Vec<PairResult> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let path = match (best_nodes[i], best_nodes[j]) {
                (Some(a), Some(b)) => pathengine::astar(graph, a, b, weights),
                _ => None,
            };
            let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
            report_progress(done, total, &last_decile);
            match path {
                Some(p) => PairResult { i, j, cost: p.cost, nodes: p.nodes },
                None => {
                    warn!("no path between poi {i} and poi {j}");
                    PairResult { i, j, cost: f64::INFINITY, nodes: Vec::new() }
                }
            }
        })
        .collect();

    let mut matrix = vec![vec![f64::INFINITY; n]; n];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] = 0.0;
    }
    let mut paths = FxHashMap::default();
    for r in results {
        matrix[r.i][r.j] = r.cost;
        matrix[r.j][r.i] = r.cost;
        paths.insert((r.i, r.j), r.nodes);
    }
    (matrix, paths)
}

fn report_progress(done: usize, total: usize, last_decile: &AtomicUsize) {
    if total == 0 {
        return;
    }
    let decile = done * 10 / total;
    let mut prev = last_decile.load(Ordering::Relaxed);
    while decile > prev {
        match last_decile.compare_exchange(prev, decile, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => {
                info!("pairwise distances: {}% ({done}/{total})", decile * 10);
                break;
            }
            Err(actual) => prev = actual,
        }
    }
}

/// Unreachable-pair pruning. Index 0 (the synthetic start, or POI 0) is
/// always kept. A fixed "more than 2 reachable legs" threshold would also
/// prune fully-connected POIs whenever fewer than 3 others exist, which
/// is wrong for a trivial two-POI tour. This scales the threshold down to
/// `min(2, other_pois - 1)` so a POI reaching every other surviving POI
/// is never pruned purely for lack of candidates, while still matching
/// the fixed-threshold behaviour once there are enough POIs for it to
/// bite.
pub fn prune_unreachable(matrix: &[Vec<f64>], max_leg: f64) -> Vec<usize> {
    let n = matrix.len();
    let other_pois = n.saturating_sub(1);
    let threshold = other_pois.saturating_sub(1).min(2);
    let mut kept = vec![0];
    for (i, row) in matrix.iter().enumerate().skip(1) {
        let reachable_legs = row
            .iter()
            .enumerate()
            .filter(|&(j, &d)| j != i && d.is_finite() && d < max_leg)
            .count();
        if reachable_legs > threshold {
            kept.push(i);
        } else {
            warn!("poi {i} pruned: only {reachable_legs} legs under {max_leg}m");
        }
    }
    kept
}

fn submatrix(matrix: &[Vec<f64>], kept: &[usize]) -> Vec<Vec<f64>> {
    kept.iter().map(|&i| kept.iter().map(|&j| matrix[i][j]).collect()).collect()
}

/// Turns an order over `kept`'s local indices into a closed sequence of
/// legs, each carrying the path stored under the canonical (lower,
/// higher) global-index key, reversed when traversed from high to low.
fn build_legs(order: &[usize], kept: &[usize], pois: &[Poi], paths: &FxHashMap<(usize, usize), Vec<NodeId>>) -> Vec<Leg> {
    let n = order.len();
    (0..n)
        .map(|k| {
            let from_global = kept[order[k]];
            let to_global = kept[order[(k + 1) % n]];
            let nodes = if from_global < to_global {
                paths.get(&(from_global, to_global)).cloned().unwrap_or_default()
            } else {
                let mut reversed = paths.get(&(to_global, from_global)).cloned().unwrap_or_default();
                reversed.reverse();
                reversed
            };
            Leg { from: pois[from_global].clone(), to: pois[to_global].clone(), nodes }
        })
        .collect()
}

/// Runs the full pipeline: filter (or take the on-disk order, in
/// "ordered POIs" mode), inject the start, build the matrix, prune
/// (skipped in ordered mode), order, and reconstruct.
///
/// "Ordered POIs" mode has no explicit name-list field in the
/// configuration; it means "route the POIs in the order they appear in
/// the loaded artifact," the only order a caller can otherwise control.
pub fn plan(graph: &Graph, all_pois: &[Poi], config: &Config, seed: u64) -> Result<TourResult, TarnError> {
    let weights = CostWeights::from(&config.path_cost);
    let ordered_mode = config.tarn_constraints.use_ordered_tarns;

    let sequence = if ordered_mode {
        inject_start(all_pois.to_vec(), &config.path_constraints.start_location)
    } else {
        inject_start(filter_pois(all_pois, config), &config.path_constraints.start_location)
    };

    if sequence.len() < 2 {
        return Err(TarnError::Config {
            field: "tarn_constraints".to_string(),
            reason: "fewer than 2 pois available to plan a tour".to_string(),
        });
    }

    let (matrix, paths) = compute_pairwise_distances(graph, &sequence, &weights);

    if ordered_mode {
        let order: Vec<usize> = (0..sequence.len()).collect();
        let kept: Vec<usize> = (0..sequence.len()).collect();
        return Ok(TourResult { legs: build_legs(&order, &kept, &sequence, &paths) });
    }

    let kept = prune_unreachable(&matrix, config.path_constraints.max_length);
    if kept.len() < 2 {
        return Err(TarnError::Config {
            field: "tarn_constraints".to_string(),
            reason: "fewer than 2 pois survive pruning".to_string(),
        });
    }
    let sub = submatrix(&matrix, &kept);

    let local_order = if kept.len() <= EXACT_ORDERING_THRESHOLD {
        order::held_karp(&sub)
    } else {
        order::anneal(&sub, config.path_constraints.min_length, seed)
    };

    Ok(TourResult { legs: build_legs(&local_order, &kept, &sequence, &paths) })
}
