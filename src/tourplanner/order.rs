//! Ordering strategies: exact Held-Karp bitmask DP for small instances,
//! simulated annealing otherwise. The annealing step takes an explicit
//! `seed` so it stays a pure, seedable function of its inputs rather than
//! depending on wall-clock entropy.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Held-Karp DP: `dp[mask][pos]` is the minimum cost of a path starting
/// at index 0, visiting exactly the POIs in `mask` (including `pos`), and
/// ending at `pos`. Index 0 is always included in the tour and always
/// visited first. Returns a visiting order starting and conceptually
/// closing back at 0.
pub fn held_karp(dist: &[Vec<f64>]) -> Vec<usize> {
    let n = dist.len();
    if n <= 1 {
        return (0..n).collect();
    }

    let size = 1usize << n;
    let mut dp = vec![vec![f64::INFINITY; n]; size];
    let mut parent = vec![vec![usize::MAX; n]; size];
    dp[1][0] = 0.0;

    for mask in 1..size {
        if mask & 1 == 0 {
            continue; // every visited set must include the origin
        }
        for pos in 0..n {
            if mask & (1 << pos) == 0 {
                continue;
            }
            let current = dp[mask][pos];
            if !current.is_finite() {
                continue;
            }
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                let candidate = current + dist[pos][next];
                let next_mask = mask | (1 << next);
                if candidate < dp[next_mask][next] {
                    dp[next_mask][next] = candidate;
                    parent[next_mask][next] = pos;
                }
            }
        }
    }

    let full = size - 1;
    let mut best_cost = f64::INFINITY;
    let mut best_pos = 0;
    for pos in 1..n {
        let closing = dp[full][pos] + dist[pos][0];
        if closing < best_cost {
            best_cost = closing;
            best_pos = pos;
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut mask = full;
    let mut pos = best_pos;
    loop {
        order.push(pos);
        let prev = parent[mask][pos];
        mask ^= 1 << pos;
        if prev == usize::MAX {
            break;
        }
        pos = prev;
    }
    order.reverse();
    order
}

/// Brute-force permutation search, fixing index 0, used only to validate
/// `held_karp` against small random instances.
#[cfg(test)]
pub fn brute_force(dist: &[Vec<f64>]) -> (Vec<usize>, f64) {
    fn permute(remaining: &mut Vec<usize>, chosen: &mut Vec<usize>, dist: &[Vec<f64>], best: &mut (Vec<usize>, f64)) {
        if remaining.is_empty() {
            let cost = cycle_cost(chosen, dist);
            if cost < best.1 {
                *best = (chosen.clone(), cost);
            }
            return;
        }
        for i in 0..remaining.len() {
            let next = remaining.remove(i);
            chosen.push(next);
            permute(remaining, chosen, dist, best);
            chosen.pop();
            remaining.insert(i, next);
        }
    }

    let n = dist.len();
    let mut remaining: Vec<usize> = (1..n).collect();
    let mut chosen = vec![0];
    let mut best = (vec![], f64::INFINITY);
    permute(&mut remaining, &mut chosen, dist, &mut best);
    best
}

#[cfg(test)]
fn cycle_cost(order: &[usize], dist: &[Vec<f64>]) -> f64 {
    let n = order.len();
    (0..n).map(|k| dist[order[k]][order[(k + 1) % n]]).sum()
}

/// Tour objective: mean leg distance, with legs shorter than `min_leg`
/// penalised by a factor of 10.
fn objective(order: &[usize], dist: &[Vec<f64>], min_leg: f64) -> f64 {
    let n = order.len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = (0..n)
        .map(|k| {
            let d = dist[order[k]][order[(k + 1) % n]];
            if d < min_leg {
                d * 10.0
            } else {
                d
            }
        })
        .sum();
    total / n as f64
}

/// Simulated annealing: identity permutation start, swaps of two
/// non-origin positions, temperature schedule `T *= 0.99995` down to
/// `T <= 1`. Tracks the best-seen tour, so the result is never worse than
/// the identity tour by construction.
pub fn anneal(dist: &[Vec<f64>], min_leg: f64, seed: u64) -> Vec<usize> {
    let n = dist.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut tour: Vec<usize> = (0..n).collect();
    let mut current_cost = objective(&tour, dist, min_leg);
    let mut best = tour.clone();
    let mut best_cost = current_cost;

    let mut temperature = 100_000.0f64;
    while temperature > 1.0 {
        let i = rng.gen_range(1..n);
        let j = rng.gen_range(1..n);
        if i != j {
            tour.swap(i, j);
            let new_cost = objective(&tour, dist, min_leg);
            let accept = new_cost < current_cost || rng.gen::<f64>() < ((current_cost - new_cost) / temperature).exp();
            if accept {
                current_cost = new_cost;
                if new_cost < best_cost {
                    best_cost = new_cost;
                    best = tour.clone();
                }
            } else {
                tour.swap(i, j);
            }
        }
        temperature *= 0.99995;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric(edges: &[(usize, usize, f64)], n: usize) -> Vec<Vec<f64>> {
        let mut m = vec![vec![f64::INFINITY; n]; n];
        for i in 0..n {
            m[i][i] = 0.0;
        }
        for &(a, b, d) in edges {
            m[a][b] = d;
            m[b][a] = d;
        }
        m
    }

    #[test]
    fn held_karp_solves_square() {
        // A unit square, shortest cycle is the perimeter, not the diagonals.
        let dist = vec![
            vec![0.0, 1.0, 2.0_f64.sqrt(), 1.0],
            vec![1.0, 0.0, 1.0, 2.0_f64.sqrt()],
            vec![2.0_f64.sqrt(), 1.0, 0.0, 1.0],
            vec![1.0, 2.0_f64.sqrt(), 1.0, 0.0],
        ];
        let order = held_karp(&dist);
        let cost = cycle_cost(&order, &dist);
        assert!((cost - 4.0).abs() < 1e-9, "expected perimeter 4.0, got {cost}");
    }

    #[test]
    fn held_karp_matches_brute_force_on_random_instances() {
        let instances = [
            symmetric(&[(0, 1, 3.0), (0, 2, 4.0), (1, 2, 5.0), (1, 3, 2.0), (2, 3, 6.0), (0, 3, 7.0)], 4),
            symmetric(
                &[
                    (0, 1, 2.0), (0, 2, 9.0), (0, 3, 10.0), (0, 4, 7.0),
                    (1, 2, 6.0), (1, 3, 4.0), (1, 4, 3.0),
                    (2, 3, 8.0), (2, 4, 5.0),
                    (3, 4, 6.0),
                ],
                5,
            ),
        ];
        for dist in instances {
            let exact_order = held_karp(&dist);
            let exact_cost = cycle_cost(&exact_order, &dist);
            let (_, brute_cost) = brute_force(&dist);
            assert!((exact_cost - brute_cost).abs() < 1e-6, "{exact_cost} != {brute_cost}");
        }
    }

    #[test]
    fn anneal_never_beats_best_seen_below_identity() {
        let dist = symmetric(&[(0, 1, 3.0), (0, 2, 4.0), (1, 2, 5.0), (1, 3, 2.0), (2, 3, 6.0), (0, 3, 7.0)], 4);
        let identity_cost = objective(&[0, 1, 2, 3], &dist, 0.0);
        let order = anneal(&dist, 0.0, 42);
        let final_cost = objective(&order, &dist, 0.0);
        assert!(final_cost <= identity_cost + 1e-9);
    }

    #[test]
    fn anneal_is_deterministic_for_a_given_seed() {
        let dist = symmetric(&[(0, 1, 3.0), (0, 2, 4.0), (1, 2, 5.0), (1, 3, 2.0), (2, 3, 6.0), (0, 3, 7.0)], 4);
        let a = anneal(&dist, 0.0, 7);
        let b = anneal(&dist, 0.0, 7);
        assert_eq!(a, b);
    }
}
