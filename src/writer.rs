//! Path Writer: expands the tour's junction-level legs into full-resolution
//! polylines and emits the per-leg CSVs plus a combined waypoint/track
//! document. Per-leg tables use a fixed CSV header with one row per
//! record; the output directory is cleared of stale CSVs before each run.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use log::{info, warn};

use crate::error::TarnError;
use crate::geo::haversine_distance_m;
use crate::graph::{Graph, NodeId};
use crate::tourplanner::{Leg, TourResult};

#[derive(Debug, Clone, PartialEq)]
pub struct LegRow {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub segment_length_m: f64,
    pub elevation: f32,
}

/// Expands a leg's junction-level node path into the full polyline, by
/// substituting each hop with its edge's geometry (oriented to match
/// travel direction) and dropping the shared node at each internal hop
/// boundary.
pub fn expand_leg(graph: &Graph, leg_nodes: &[NodeId]) -> Vec<NodeId> {
    if leg_nodes.len() < 2 {
        return leg_nodes.to_vec();
    }
    let hop_count = leg_nodes.len() - 1;
    let mut expanded = Vec::new();
    for (hop_index, window) in leg_nodes.windows(2).enumerate() {
        let (a, b) = (window[0], window[1]);
        let edge = graph.neighbours(a).find(|(n, _)| *n == b).map(|(_, e)| e);
        let Some(edge) = edge else {
            warn!("no edge between {a} and {b} along the tour path");
            continue;
        };
        let mut geometry = edge.geometry_from(a).unwrap_or_else(|| edge.geometry.clone());
        let is_final_hop = hop_index + 1 == hop_count;
        if !is_final_hop {
            geometry.pop();
        }
        expanded.extend(geometry);
    }
    expanded
}

/// Converts an expanded polyline into the tabular row format.
/// `segment_length_m` is the distance from the previous row, not a
/// cumulative distance.
pub fn leg_rows(graph: &Graph, expanded: &[NodeId]) -> Vec<LegRow> {
    let mut rows = Vec::with_capacity(expanded.len());
    let mut prev_coords: Option<(f64, f64)> = None;
    for (i, id) in expanded.iter().enumerate() {
        let Some(node) = graph.node(*id) else { continue };
        let segment_length_m = match prev_coords {
            Some((lat, lon)) => haversine_distance_m(lat, lon, node.lat, node.lon),
            None => 0.0,
        };
        rows.push(LegRow { id: i as i64, lat: node.lat, lon: node.lon, segment_length_m, elevation: node.elevation });
        prev_coords = Some((node.lat, node.lon));
    }
    rows
}

fn sanitise_filename(name: &str) -> String {
    name.replace(' ', "_")
}

fn write_leg_csv(path: &Path, rows: &[LegRow]) -> Result<(), TarnError> {
    let mut file = fs::File::create(path).map_err(|e| io_err(path, e))?;
    writeln!(file, "id,lat,lon,segment_length_m,elevation").map_err(|e| io_err(path, e))?;
    for row in rows {
        writeln!(
            file,
            "{},{:.6},{:.6},{},{}",
            row.id, row.lat, row.lon, row.segment_length_m, row.elevation
        )
        .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Writes a minimal GPX 1.1 document: one `<wpt>` per POI visited, and one
/// named `<trkseg>` per leg.
fn write_combined_document(path: &Path, legs: &[Leg], expanded_legs: &[Vec<NodeId>], graph: &Graph) -> Result<(), TarnError> {
    let mut file = fs::File::create(path).map_err(|e| io_err(path, e))?;
    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>").map_err(|e| io_err(path, e))?;
    writeln!(file, "<gpx version=\"1.1\" creator=\"tarn-tour-planner\">").map_err(|e| io_err(path, e))?;

    for leg in legs {
        writeln!(
            file,
            "  <wpt lat=\"{:.6}\" lon=\"{:.6}\"><name>{}</name></wpt>",
            leg.from.lat, leg.from.lon, leg.from.name
        )
        .map_err(|e| io_err(path, e))?;
    }

    writeln!(file, "  <trk><name>tour</name>").map_err(|e| io_err(path, e))?;
    for (leg, nodes) in legs.iter().zip(expanded_legs) {
        writeln!(
            file,
            "    <trkseg name=\"{}_to_{}\">",
            sanitise_filename(&leg.from.name),
            sanitise_filename(&leg.to.name)
        )
        .map_err(|e| io_err(path, e))?;
        for id in nodes {
            if let Some(node) = graph.node(*id) {
                writeln!(file, "      <trkpt lat=\"{:.6}\" lon=\"{:.6}\"><ele>{}</ele></trkpt>", node.lat, node.lon, node.elevation)
                    .map_err(|e| io_err(path, e))?;
            }
        }
        writeln!(file, "    </trkseg>").map_err(|e| io_err(path, e))?;
    }
    writeln!(file, "  </trk>").map_err(|e| io_err(path, e))?;
    writeln!(file, "</gpx>").map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Clears `output_dir` of any prior leg CSVs, then writes one CSV per leg
/// plus the combined waypoint/track document at `gpx_path`.
pub fn write_tour(output_dir: &Path, gpx_path: &Path, tour: &TourResult, graph: &Graph) -> Result<(), TarnError> {
    clear_output_dir(output_dir)?;
    fs::create_dir_all(output_dir).map_err(|e| io_err(output_dir, e))?;

    let mut expanded_legs = Vec::with_capacity(tour.legs.len());
    for leg in &tour.legs {
        let expanded = expand_leg(graph, &leg.nodes);
        let rows = leg_rows(graph, &expanded);
        let filename = format!("{}_to_{}.csv", sanitise_filename(&leg.from.name), sanitise_filename(&leg.to.name));
        write_leg_csv(&output_dir.join(filename), &rows)?;
        expanded_legs.push(expanded);
    }

    write_combined_document(gpx_path, &tour.legs, &expanded_legs, graph)?;

    info!("path writer: wrote {} leg files to {}", tour.legs.len(), output_dir.display());
    Ok(())
}

fn clear_output_dir(output_dir: &Path) -> Result<(), TarnError> {
    if !output_dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(output_dir).map_err(|e| io_err(output_dir, e))? {
        let entry = entry.map_err(|e| io_err(output_dir, e))?;
        if entry.path().extension().map_or(false, |ext| ext == "csv") {
            fs::remove_file(entry.path()).map_err(|e| io_err(&entry.path(), e))?;
        }
    }
    Ok(())
}

fn io_err(path: &Path, e: impl std::fmt::Display) -> TarnError {
    TarnError::Artifact { file: path.display().to_string(), line: 0, reason: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};
    use crate::maploader::Poi;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn unique_dir(name: &str) -> std::path::PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("tarn-writer-test-{n}-{name}"))
    }

    fn three_node_path() -> Graph {
        let mut g = Graph::new();
        g.add_node(Node::new(1, 0.0, 0.0, 10.0));
        g.add_node(Node::new(2, 0.0, 0.001, 20.0));
        g.add_node(Node::new(3, 0.0, 0.002, 30.0));
        g.add_edge(Edge { endpoint_a: 1, endpoint_b: 2, length_m: 100.0, slope: 0.0, traffic: 0, difficulty: 0, source_way_id: 1, geometry: vec![1, 2] }).unwrap();
        g.add_edge(Edge { endpoint_a: 2, endpoint_b: 3, length_m: 100.0, slope: 0.0, traffic: 0, difficulty: 0, source_way_id: 1, geometry: vec![2, 3] }).unwrap();
        g
    }

    #[test]
    fn expand_leg_drops_shared_nodes_at_hop_boundaries() {
        let g = three_node_path();
        let expanded = expand_leg(&g, &[1, 2, 3]);
        assert_eq!(expanded, vec![1, 2, 3]);
    }

    #[test]
    fn expand_leg_reverses_geometry_against_edge_direction() {
        let g = three_node_path();
        let expanded = expand_leg(&g, &[3, 2, 1]);
        assert_eq!(expanded, vec![3, 2, 1]);
    }

    #[test]
    fn write_tour_creates_one_csv_per_leg_and_a_gpx_document() {
        let graph = three_node_path();
        let poi_a = Poi { name: "A".to_string(), source_id: 1, lat: 0.0, lon: 0.0, elevation: 10.0, area: None };
        let poi_c = Poi { name: "C".to_string(), source_id: 2, lat: 0.0, lon: 0.002, elevation: 30.0, area: None };
        let tour = TourResult {
            legs: vec![
                Leg { from: poi_a.clone(), to: poi_c.clone(), nodes: vec![1, 2, 3] },
                Leg { from: poi_c, to: poi_a, nodes: vec![3, 2, 1] },
            ],
        };

        let out_dir = unique_dir("out");
        let gpx_path = unique_dir("tour.gpx");
        write_tour(&out_dir, &gpx_path, &tour, &graph).unwrap();

        assert!(out_dir.join("A_to_C.csv").exists());
        assert!(out_dir.join("C_to_A.csv").exists());
        assert!(gpx_path.exists());

        let gpx_contents = fs::read_to_string(&gpx_path).unwrap();
        assert!(gpx_contents.contains("<trkseg name=\"A_to_C\">"));

        fs::remove_dir_all(&out_dir).ok();
        fs::remove_file(&gpx_path).ok();
    }
}
