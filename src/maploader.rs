//! Map Loader: turns the three on-disk artifacts back into an in-memory
//! `Graph` plus a POI list: read each artifact, build the in-memory
//! structure, log a summary.

use std::path::Path;

use log::{info, warn};

use crate::artifact::{self, PoiRecord};
use crate::error::TarnError;
use crate::graph::{Edge, Graph, Node};

/// A point of interest: a tarn, or the synthetic "Start" location injected
/// by the Tour Planner. Immutable — the "best graph node" cache for a POI
/// lives in the Tour Planner, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub name: String,
    pub source_id: i64,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f32,
    pub area: Option<f64>,
}

impl From<PoiRecord> for Poi {
    fn from(r: PoiRecord) -> Self {
        Poi {
            name: r.name,
            source_id: r.osm_id,
            lat: r.lat,
            lon: r.lon,
            elevation: r.elevation,
            area: r.area,
        }
    }
}

/// Loads the nodes/edges/POIs artifacts into a `Graph` and a POI list.
/// Malformed artifact rows are already skipped-and-warned by `artifact`;
/// edges that fail `Graph::add_edge`'s invariants are likewise skipped
/// here rather than aborting the whole load.
pub fn load(nodes_path: &Path, edges_path: &Path, pois_path: &Path) -> Result<(Graph, Vec<Poi>), TarnError> {
    let node_records = artifact::read_nodes_csv(nodes_path)?;
    let edge_records = artifact::read_edges_csv(edges_path)?;
    let poi_records = artifact::read_pois_csv(pois_path)?;

    let mut graph = Graph::new();
    for record in &node_records {
        graph.add_node(Node::new(record.id, record.lat, record.lon, record.elevation));
    }

    let mut edge_count = 0;
    for record in edge_records {
        let edge = Edge {
            endpoint_a: record.source_id,
            endpoint_b: record.target_id,
            length_m: record.length,
            slope: record.slope,
            traffic: record.cars,
            difficulty: record.difficulty,
            source_way_id: record.osm_id,
            geometry: record.geometry,
        };
        match graph.add_edge(edge) {
            Ok(()) => edge_count += 1,
            Err(reason) => warn!("{}: skipping edge {}: {reason}", edges_path.display(), record.id),
        }
    }

    let pois: Vec<Poi> = poi_records.into_iter().map(Poi::from).collect();

    info!(
        "map loader: {} nodes, {edge_count} edges, {} pois",
        graph.node_count(),
        pois.len()
    );

    Ok((graph, pois))
}
