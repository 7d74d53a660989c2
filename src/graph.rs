//! The in-memory routing graph: nodes, undirected edges and adjacency.
//! Edges live in a contiguous `Vec` keyed by index, and adjacency entries
//! carry `(neighbour_node_id, edge_index)` pairs. This avoids the
//! reference-cycle problem of storing two copies of each undirected edge
//! and keeps iteration cache-friendly.

use rustc_hash::FxHashMap;

use crate::geo::haversine_distance_m;

pub type NodeId = i64;

/// A stable, immutable graph node. `ways_count` is only meaningful during
/// map building (it identifies junctions); it is carried here so the map
/// loader and builder can share one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f32,
    pub ways_count: u32,
}

impl Node {
    pub fn new(id: NodeId, lat: f64, lon: f64, elevation: f32) -> Self {
        Self {
            id,
            lat,
            lon,
            elevation,
            ways_count: 0,
        }
    }

    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        haversine_distance_m(self.lat, self.lon, lat, lon)
    }
}

/// An undirected edge between two junction nodes. `geometry` is the
/// ordered polyline inclusive of both endpoints; its first and last ids
/// equal `endpoint_a`/`endpoint_b` in some order.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    pub length_m: f64,
    pub slope: f64,
    /// 0 = off-road path .. 6 = motorway; -1 ("unknown") is normalised to 0
    /// by the time an edge reaches the graph.
    pub traffic: i32,
    /// 0..=5 hiking difficulty scale; -1 normalised to 0.
    pub difficulty: i32,
    pub source_way_id: i64,
    pub geometry: Vec<NodeId>,
}

impl Edge {
    /// Geometry oriented so it starts at `from`. Returns `None` if `from`
    /// is neither endpoint.
    pub fn geometry_from(&self, from: NodeId) -> Option<Vec<NodeId>> {
        if from == self.endpoint_a {
            Some(self.geometry.clone())
        } else if from == self.endpoint_b {
            let mut g = self.geometry.clone();
            g.reverse();
            Some(g)
        } else {
            None
        }
    }

    pub fn other_end(&self, from: NodeId) -> Option<NodeId> {
        if from == self.endpoint_a {
            Some(self.endpoint_b)
        } else if from == self.endpoint_b {
            Some(self.endpoint_a)
        } else {
            None
        }
    }
}

/// Cost weights for the edge cost formula:
/// `cost = w_L*L + w_e*(s + 3) + w_c*c + w_d*d`.
#[derive(Debug, Clone, Copy)]
pub struct CostWeights {
    pub length: f64,
    pub elevation: f64,
    pub traffic: f64,
    pub difficulty: f64,
}

impl Edge {
    pub fn cost(&self, weights: &CostWeights) -> f64 {
        weights.length * self.length_m
            + weights.elevation * (self.slope + 3.0)
            + weights.traffic * self.traffic as f64
            + weights.difficulty * self.difficulty as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct AdjacencyEntry {
    neighbour: NodeId,
    edge_index: usize,
}

/// Undirected adjacency over an arena of edges.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: FxHashMap<NodeId, Node>,
    edges: Vec<Edge>,
    adjacency: FxHashMap<NodeId, Vec<AdjacencyEntry>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.adjacency.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Appends the edge to the arena and wires both adjacency lists.
    /// Rejects edges whose endpoints are not distinct, or that reference a
    /// geometry node absent from the graph.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), String> {
        if edge.endpoint_a == edge.endpoint_b {
            return Err(format!(
                "edge {}..{} has identical endpoints",
                edge.endpoint_a, edge.endpoint_b
            ));
        }
        for id in &edge.geometry {
            if !self.nodes.contains_key(id) {
                return Err(format!("edge references unknown geometry node {id}"));
            }
        }
        if !self.nodes.contains_key(&edge.endpoint_a) || !self.nodes.contains_key(&edge.endpoint_b)
        {
            return Err("edge endpoints must exist as nodes".to_string());
        }

        let index = self.edges.len();
        self.adjacency
            .entry(edge.endpoint_a)
            .or_default()
            .push(AdjacencyEntry {
                neighbour: edge.endpoint_b,
                edge_index: index,
            });
        self.adjacency
            .entry(edge.endpoint_b)
            .or_default()
            .push(AdjacencyEntry {
                neighbour: edge.endpoint_a,
                edge_index: index,
            });
        self.edges.push(edge);
        Ok(())
    }

    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &Edge)> {
        self.adjacency
            .get(&node)
            .into_iter()
            .flatten()
            .map(|e| (e.neighbour, &self.edges[e.edge_index]))
    }

    pub fn iterate<F: FnMut(&Node)>(&self, mut f: F) {
        for node in self.nodes.values() {
            f(node);
        }
    }

    /// Linear scan for the nearest graph node to (lat, lon) — acceptable
    /// because it is called at most once per POI per run.
    pub fn closest(&self, lat: f64, lon: f64) -> Option<(NodeId, f64)> {
        let mut best: Option<(NodeId, f64)> = None;
        for node in self.nodes.values() {
            let d = node.distance_to(lat, lon);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node.id, d));
            }
        }
        best
    }
}

/// Normalises the raw `-1` ("unknown") sentinel used in artifacts to `0`.
pub fn normalise_rank(raw: i32) -> i32 {
    if raw < 0 {
        0
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, lat: f64, lon: f64) -> Node {
        Node::new(id, lat, lon, 0.0)
    }

    fn edge(a: NodeId, b: NodeId, len: f64) -> Edge {
        Edge {
            endpoint_a: a,
            endpoint_b: b,
            length_m: len,
            slope: 0.0,
            traffic: 0,
            difficulty: 0,
            source_way_id: 1,
            geometry: vec![a, b],
        }
    }

    #[test]
    fn edge_appears_in_both_adjacency_lists() {
        let mut g = Graph::new();
        g.add_node(node(1, 0.0, 0.0));
        g.add_node(node(2, 0.0, 0.001));
        g.add_edge(edge(1, 2, 100.0)).unwrap();

        let from_1: Vec<_> = g.neighbours(1).map(|(n, _)| n).collect();
        let from_2: Vec<_> = g.neighbours(2).map(|(n, _)| n).collect();
        assert_eq!(from_1, vec![2]);
        assert_eq!(from_2, vec![1]);
    }

    #[test]
    fn add_edge_rejects_unknown_geometry_node() {
        let mut g = Graph::new();
        g.add_node(node(1, 0.0, 0.0));
        g.add_node(node(2, 0.0, 0.001));
        let mut e = edge(1, 2, 100.0);
        e.geometry = vec![1, 99, 2];
        assert!(g.add_edge(e).is_err());
    }

    #[test]
    fn add_edge_rejects_equal_endpoints() {
        let mut g = Graph::new();
        g.add_node(node(1, 0.0, 0.0));
        assert!(g.add_edge(edge(1, 1, 10.0)).is_err());
    }

    #[test]
    fn geometry_from_reverses_for_other_endpoint() {
        let e = edge(1, 2, 100.0);
        assert_eq!(e.geometry_from(1), Some(vec![1, 2]));
        assert_eq!(e.geometry_from(2), Some(vec![2, 1]));
        assert_eq!(e.geometry_from(3), None);
    }

    #[test]
    fn closest_returns_nearest_by_haversine() {
        let mut g = Graph::new();
        g.add_node(node(1, 0.0, 0.0));
        g.add_node(node(2, 1.0, 1.0));
        let (id, _) = g.closest(0.01, 0.01).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn normalise_rank_maps_unknown_to_zero() {
        assert_eq!(normalise_rank(-1), 0);
        assert_eq!(normalise_rank(0), 0);
        assert_eq!(normalise_rank(4), 4);
    }
}
