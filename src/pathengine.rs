//! Path Engine: A* over the routing graph with a bidirectional-DFS
//! connectivity pre-check and an endpoint-perturbation fallback, using a
//! `BinaryHeap` and `rustc_hash` sets for the open/closed sets.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{CostWeights, Graph, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    pub cost: f64,
}

struct HeapEntry {
    f: f64,
    seq: u64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    /// Reversed so `BinaryHeap` (a max-heap) pops the smallest `f` first;
    /// for equal `f`, the smallest `seq` (earliest-inserted) pops first,
    /// giving a FIFO tie-break.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bidirectional DFS reachability check: two frontiers grow alternately
/// from `start` and `goal`; as soon as one frontier visits a node the
/// other has already visited, the pair is connected.
pub fn connected(graph: &Graph, start: NodeId, goal: NodeId) -> bool {
    if start == goal {
        return true;
    }
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return false;
    }

    let mut stack_a = vec![start];
    let mut visited_a: FxHashSet<NodeId> = FxHashSet::default();
    visited_a.insert(start);
    let mut stack_b = vec![goal];
    let mut visited_b: FxHashSet<NodeId> = FxHashSet::default();
    visited_b.insert(goal);

    while !stack_a.is_empty() || !stack_b.is_empty() {
        if let Some(node) = stack_a.pop() {
            if visited_b.contains(&node) {
                return true;
            }
            for (neighbour, _) in graph.neighbours(node) {
                if visited_a.insert(neighbour) {
                    stack_a.push(neighbour);
                }
            }
        }
        if let Some(node) = stack_b.pop() {
            if visited_a.contains(&node) {
                return true;
            }
            for (neighbour, _) in graph.neighbours(node) {
                if visited_b.insert(neighbour) {
                    stack_b.push(neighbour);
                }
            }
        }
    }
    false
}

/// A* with a Haversine-distance heuristic. Returns `None` if `start`/`goal`
/// are unknown or no path exists; the path engine never panics or
/// propagates an error for an unreachable pair.
pub fn astar(graph: &Graph, start: NodeId, goal: NodeId, weights: &CostWeights) -> Option<PathResult> {
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return None;
    }
    if start == goal {
        return Some(PathResult { nodes: vec![start], cost: 0.0 });
    }

    let goal_node = graph.node(goal)?;
    let (goal_lat, goal_lon) = (goal_node.lat, goal_node.lon);

    let mut open = BinaryHeap::new();
    let mut g_score: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut came_from: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut closed: FxHashSet<NodeId> = FxHashSet::default();
    let mut seq: u64 = 0;

    g_score.insert(start, 0.0);
    let h0 = graph.node(start)?.distance_to(goal_lat, goal_lon);
    open.push(HeapEntry { f: h0, seq, node: start });
    seq += 1;

    while let Some(HeapEntry { node, .. }) = open.pop() {
        if node == goal {
            let cost = g_score[&node];
            return Some(reconstruct(&came_from, node, cost));
        }
        if !closed.insert(node) {
            continue;
        }
        let g_current = g_score[&node];
        for (neighbour, edge) in graph.neighbours(node) {
            if closed.contains(&neighbour) {
                continue;
            }
            let tentative = g_current + edge.cost(weights);
            let improves = match g_score.get(&neighbour) {
                Some(&existing) => tentative < existing,
                None => true,
            };
            if improves {
                g_score.insert(neighbour, tentative);
                came_from.insert(neighbour, node);
                let h = match graph.node(neighbour) {
                    Some(n) => n.distance_to(goal_lat, goal_lon),
                    None => continue,
                };
                open.push(HeapEntry { f: tentative + h, seq, node: neighbour });
                seq += 1;
            }
        }
    }
    trace!("astar: no path {start} -> {goal}");
    None
}

fn reconstruct(came_from: &FxHashMap<NodeId, NodeId>, goal: NodeId, cost: f64) -> PathResult {
    let mut nodes = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        nodes.push(prev);
        current = prev;
    }
    nodes.reverse();
    PathResult { nodes, cost }
}

/// Scans graph nodes in increasing distance from `(lat, lon)`, returning
/// the first one connected to `anchor`, at radii `{r, 2r, .., 10r}`.
pub fn find_nearby_connected_node(graph: &Graph, lat: f64, lon: f64, anchor: NodeId, radius: f64) -> Option<NodeId> {
    for multiple in 1..=10 {
        let r = radius * multiple as f64;
        let mut candidates: Vec<(NodeId, f64)> = Vec::new();
        graph.iterate(|node| {
            let d = node.distance_to(lat, lon);
            if d <= r {
                candidates.push((node.id, d));
            }
        });
        candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        for (id, _) in candidates {
            if connected(graph, id, anchor) {
                return Some(id);
            }
        }
    }
    None
}

pub struct Perturbation {
    pub new_start: NodeId,
    pub new_goal: NodeId,
    pub path: PathResult,
}

/// Endpoint perturbation: run when `connected(start, goal)` is false.
/// Tries up to 15 attempts, doubling the search radius every five
/// failures, alternating between relocating the start near a candidate
/// goal and relocating the goal itself.
pub fn perturb_and_route(graph: &Graph, start: NodeId, goal: NodeId, weights: &CostWeights) -> Option<Perturbation> {
    let start_node = graph.node(start)?;
    let (start_lat, start_lon) = (start_node.lat, start_node.lon);
    let original_goal = graph.node(goal)?;
    let (goal_lat, goal_lon) = (original_goal.lat, original_goal.lon);

    let mut current_goal = goal;
    let mut attempted_goals: FxHashSet<NodeId> = FxHashSet::default();
    attempted_goals.insert(goal);
    let mut radius = 50.0;

    for attempt in 1..=15 {
        if let Some(candidate_start) = find_nearby_connected_node(graph, start_lat, start_lon, current_goal, radius) {
            if let Some(path) = astar(graph, candidate_start, current_goal, weights) {
                debug!("perturbation succeeded after {attempt} attempts: start {start} -> {candidate_start}");
                return Some(Perturbation { new_start: candidate_start, new_goal: current_goal, path });
            }
        }

        let mut best: Option<(NodeId, f64)> = None;
        graph.iterate(|node| {
            if attempted_goals.contains(&node.id) {
                return;
            }
            let d = node.distance_to(goal_lat, goal_lon);
            if d >= radius && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node.id, d));
            }
        });

        match best {
            Some((candidate_goal, _)) => {
                attempted_goals.insert(candidate_goal);
                current_goal = candidate_goal;
            }
            None => break,
        }

        if attempt % 5 == 0 {
            radius *= 2.0;
        }
    }
    warn!("endpoint perturbation exhausted 15 attempts for {start} -> {goal}");
    None
}
