//! Converts a raw OSM-like extract plus a DEM into the three map artifacts:
//! nodes are streamed in first, then ways are classified and buffered, and
//! `finish()` splits walkable ways at junctions and derives tarn geometry.

pub mod tags;

use std::collections::HashMap;

use log::{debug, info, log_enabled, trace, warn};
use log::Level::Trace;
use rustc_hash::FxHashMap;

use crate::artifact::{EdgeRecord, NodeRecord, PoiRecord};
use crate::elevation::{sample_or_zero, ElevationSampler};
use crate::geo::{equirectangular_project, haversine_distance_m};
use crate::graph::{normalise_rank, NodeId};

#[derive(Debug, Clone, Copy)]
pub struct BBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

struct BuildNode {
    lat: f64,
    lon: f64,
    elevation: f32,
    ways_count: u32,
}

struct WalkableWay {
    way_id: i64,
    refs: Vec<NodeId>,
    traffic: i32,
    difficulty: i32,
}

struct TarnWay {
    way_id: i64,
    name: String,
    refs: Vec<NodeId>,
}

/// Accumulates nodes and classified ways across the two intake passes,
/// then produces the three output artifacts on `finish()`.
pub struct MapBuilder {
    bbox: BBox,
    nodes: FxHashMap<NodeId, BuildNode>,
    walkable_ways: Vec<WalkableWay>,
    tarn_ways: Vec<TarnWay>,
    seen_tarn_names: HashMap<String, ()>,
    next_segment_id: i64,
    skipped_ways: u64,
}

impl MapBuilder {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            nodes: FxHashMap::default(),
            walkable_ways: Vec::new(),
            tarn_ways: Vec::new(),
            seen_tarn_names: HashMap::new(),
            next_segment_id: 1,
            skipped_ways: 0,
        }
    }

    /// Pass 1: record a node's location and a lazily-sampled elevation.
    pub fn intake_node(&mut self, id: NodeId, lat: f64, lon: f64, elevation_sampler: &mut Option<ElevationSampler>) {
        let elevation = sample_or_zero(elevation_sampler, lat, lon);
        self.nodes.insert(
            id,
            BuildNode {
                lat,
                lon,
                elevation,
                ways_count: 0,
            },
        );
    }

    /// Pass 2: classify and buffer a way; walkable ways bump their nodes'
    /// `ways_count`, tarn ways are deduplicated by name immediately.
    pub fn intake_way(&mut self, way_id: i64, refs: Vec<NodeId>, tag_pairs: Vec<(String, String)>) {
        if refs.len() < 2 {
            trace!("way {way_id}: skipped, fewer than 2 nodes");
            self.skipped_ways += 1;
            return;
        }
        if !refs.iter().all(|id| self.nodes.contains_key(id)) {
            trace!("way {way_id}: skipped, references unknown node");
            self.skipped_ways += 1;
            return;
        }
        if refs
            .iter()
            .any(|id| {
                let n = &self.nodes[id];
                !self.bbox.contains(n.lat, n.lon)
            })
        {
            trace!("way {way_id}: skipped, leaves bounding box");
            self.skipped_ways += 1;
            return;
        }

        let walkable = tags::is_walkable(&tag_pairs);
        let tarn = tags::tarn_name(&tag_pairs);

        if !walkable && tarn.is_none() {
            self.skipped_ways += 1;
            return;
        }

        if walkable {
            for id in &refs {
                self.nodes.get_mut(id).unwrap().ways_count += 1;
            }
            let traffic = normalise_rank(tags::traffic_rank(&tag_pairs));
            let difficulty = normalise_rank(tags::difficulty_rank(&tag_pairs));
            self.walkable_ways.push(WalkableWay {
                way_id,
                refs,
                traffic,
                difficulty,
            });
        } else if let Some(name) = tarn {
            if self.seen_tarn_names.contains_key(&name) {
                warn!("tarn '{name}' (way {way_id}) is a duplicate by name, dropping");
            } else {
                self.seen_tarn_names.insert(name.clone(), ());
                self.tarn_ways.push(TarnWay { way_id, name, refs });
            }
        }
    }

    /// Runs edge splitting and tarn geometry, producing the artifact
    /// records.
    pub fn finish(mut self, elevation_sampler: &mut Option<ElevationSampler>) -> MapBuilderOutput {
        let mut edges = Vec::new();
        for way in &self.walkable_ways {
            edges.extend(self.split_into_edges(way));
        }

        let mut pois = Vec::new();
        for tarn in &self.tarn_ways {
            if let Some(poi) = self.tarn_to_poi(tarn, elevation_sampler) {
                pois.push(poi);
            }
        }

        let nodes: Vec<NodeRecord> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.ways_count > 0)
            .map(|(id, n)| NodeRecord {
                id: *id,
                lat: n.lat,
                lon: n.lon,
                elevation: n.elevation,
            })
            .collect();

        info!(
            "map builder finished: {} nodes, {} edges, {} pois, {} ways skipped",
            nodes.len(),
            edges.len(),
            pois.len(),
            self.skipped_ways
        );

        MapBuilderOutput { nodes, edges, pois }
    }

    fn split_into_edges(&mut self, way: &WalkableWay) -> Vec<EdgeRecord> {
        let refs = &way.refs;
        let mut edges = Vec::new();
        let mut start = 0usize;
        for i in 1..refs.len() - 1 {
            if self.nodes[&refs[i]].ways_count > 1 {
                edges.push(self.build_edge(way, start, i));
                start = i;
            }
        }
        edges.push(self.build_edge(way, start, refs.len() - 1));
        edges
    }

    fn build_edge(&mut self, way: &WalkableWay, start: usize, end: usize) -> EdgeRecord {
        let geometry: Vec<NodeId> = way.refs[start..=end].to_vec();
        let mut length = 0.0;
        let mut ascent = 0.0;
        let mut descent = 0.0;
        for window in geometry.windows(2) {
            let a = &self.nodes[&window[0]];
            let b = &self.nodes[&window[1]];
            length += haversine_distance_m(a.lat, a.lon, b.lat, b.lon);
            let delta = b.elevation as f64 - a.elevation as f64;
            if delta > 0.0 {
                ascent += delta;
            } else {
                descent += -delta;
            }
        }
        let slope = if length > 0.0 {
            (ascent - descent) / length
        } else {
            0.0
        };

        let id = self.next_segment_id;
        self.next_segment_id += 1;
        if log_enabled!(Trace) {
            trace!("way {}: segment {} ({} nodes, {:.1}m)", way.way_id, id, geometry.len(), length);
        }

        EdgeRecord {
            id,
            osm_id: way.way_id,
            source_id: geometry[0],
            target_id: *geometry.last().unwrap(),
            length,
            slope,
            difficulty: way.difficulty,
            cars: way.traffic,
            geometry,
        }
    }

    fn tarn_to_poi(&self, tarn: &TarnWay, elevation_sampler: &mut Option<ElevationSampler>) -> Option<PoiRecord> {
        let coords: Vec<(f64, f64)> = tarn
            .refs
            .iter()
            .map(|id| {
                let n = &self.nodes[id];
                (n.lat, n.lon)
            })
            .collect();
        if coords.is_empty() {
            return None;
        }

        let centroid_lat = coords.iter().map(|(lat, _)| lat).sum::<f64>() / coords.len() as f64;
        let centroid_lon = coords.iter().map(|(_, lon)| lon).sum::<f64>() / coords.len() as f64;

        let projected: Vec<(f64, f64)> = coords
            .iter()
            .map(|(lat, lon)| equirectangular_project(*lat, *lon))
            .collect();
        let area = shoelace_area(&projected);

        let elevation = sample_or_zero(elevation_sampler, centroid_lat, centroid_lon);

        debug!("tarn '{}' (way {}): centroid=({centroid_lat:.5},{centroid_lon:.5}) area={area:.1}m2", tarn.name, tarn.way_id);

        Some(PoiRecord {
            osm_id: tarn.way_id,
            name: tarn.name.clone(),
            lat: centroid_lat,
            lon: centroid_lon,
            elevation,
            area: Some(area),
        })
    }
}

/// Half the absolute value of the shoelace sum over projected (x, y)
/// points.
fn shoelace_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        sum += x0 * y1 - x1 * y0;
    }
    sum.abs() / 2.0
}

pub struct MapBuilderOutput {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub pois: Vec<PoiRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_bbox() -> BBox {
        BBox { min_lat: -90.0, max_lat: 90.0, min_lon: -180.0, max_lon: 180.0 }
    }

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn splits_way_at_shared_junction_node() {
        let mut builder = MapBuilder::new(wide_bbox());
        let mut sampler = None;
        // A - B - C, and a second way sharing B, making B a junction.
        builder.intake_node(1, 0.0, 0.0, &mut sampler);
        builder.intake_node(2, 0.0, 0.001, &mut sampler);
        builder.intake_node(3, 0.0, 0.002, &mut sampler);
        builder.intake_node(4, 0.001, 0.001, &mut sampler);

        builder.intake_way(100, vec![1, 2, 3], tags(&[("highway", "path")]));
        builder.intake_way(101, vec![4, 2], tags(&[("highway", "path")]));

        let output = builder.finish(&mut sampler);
        // way 100 splits into [1,2] and [2,3]; way 101 stays as one edge [4,2].
        assert_eq!(output.edges.len(), 3);
        assert!(output.edges.iter().any(|e| e.geometry == vec![1, 2]));
        assert!(output.edges.iter().any(|e| e.geometry == vec![2, 3]));
        assert!(output.edges.iter().any(|e| e.geometry == vec![4, 2]));
    }

    #[test]
    fn way_with_unknown_node_is_skipped() {
        let mut builder = MapBuilder::new(wide_bbox());
        let mut sampler = None;
        builder.intake_node(1, 0.0, 0.0, &mut sampler);
        builder.intake_way(100, vec![1, 999], tags(&[("highway", "path")]));
        let output = builder.finish(&mut sampler);
        assert!(output.edges.is_empty());
        assert!(output.nodes.is_empty());
    }

    #[test]
    fn way_leaving_bbox_is_dropped_entirely() {
        let mut builder = MapBuilder::new(BBox { min_lat: 0.0, max_lat: 1.0, min_lon: 0.0, max_lon: 1.0 });
        let mut sampler = None;
        builder.intake_node(1, 0.5, 0.5, &mut sampler);
        builder.intake_node(2, 5.0, 5.0, &mut sampler);
        builder.intake_way(100, vec![1, 2], tags(&[("highway", "path")]));
        let output = builder.finish(&mut sampler);
        assert!(output.edges.is_empty());
    }

    #[test]
    fn tarn_dedup_by_name_keeps_first() {
        let mut builder = MapBuilder::new(wide_bbox());
        let mut sampler = None;
        for id in 1..=8 {
            builder.intake_node(id, (id as f64) * 0.001, (id as f64) * 0.001, &mut sampler);
        }
        builder.intake_way(200, vec![1, 2, 3, 1], tags(&[("natural", "water"), ("name", "Angle Tarn")]));
        builder.intake_way(201, vec![4, 5, 6, 4], tags(&[("natural", "water"), ("name", "Angle Tarn")]));
        let output = builder.finish(&mut sampler);
        assert_eq!(output.pois.len(), 1);
        assert_eq!(output.pois[0].osm_id, 200);
    }

    #[test]
    fn tarn_area_of_known_rectangle_matches_analytic_area() {
        // A small rectangle near the equator: 0.001 deg lat/lon square.
        let mut builder = MapBuilder::new(wide_bbox());
        let mut sampler = None;
        builder.intake_node(1, 0.0, 0.0, &mut sampler);
        builder.intake_node(2, 0.0, 0.001, &mut sampler);
        builder.intake_node(3, 0.001, 0.001, &mut sampler);
        builder.intake_node(4, 0.001, 0.0, &mut sampler);
        builder.intake_way(300, vec![1, 2, 3, 4, 1], tags(&[("natural", "water"), ("name", "Square Tarn")]));
        let output = builder.finish(&mut sampler);
        assert_eq!(output.pois.len(), 1);

        // Analytic: side ~= R * 0.001deg-in-rad meters (lat and lon sides close at equator).
        let side_m = crate::geo::EARTH_RADIUS_M * 0.001f64.to_radians();
        let expected = side_m * side_m;
        let actual = output.pois[0].area.unwrap();
        assert!((actual - expected).abs() / expected < 0.01, "expected {expected}, got {actual}");
    }

    #[test]
    fn traffic_and_difficulty_unknown_tags_normalise_to_zero() {
        let mut builder = MapBuilder::new(wide_bbox());
        let mut sampler = None;
        builder.intake_node(1, 0.0, 0.0, &mut sampler);
        builder.intake_node(2, 0.0, 0.001, &mut sampler);
        builder.intake_way(100, vec![1, 2], tags(&[]));
        let output = builder.finish(&mut sampler);
        assert_eq!(output.edges[0].cars, 0);
        assert_eq!(output.edges[0].difficulty, 0);
    }
}
