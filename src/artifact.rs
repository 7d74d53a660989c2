//! The three map-builder artifact formats: nodes, edges and POIs.
//! Nodes/POIs are fixed-column CSV (handled with `csv` + `serde`). Edges
//! have a variable-length geometry tail, so they get a hand-rolled
//! reader/writer instead — the number of trailing fields varies per row.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::TarnError;
use crate::graph::{normalise_rank, NodeId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: i64,
    pub osm_id: i64,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub length: f64,
    pub slope: f64,
    pub difficulty: i32,
    pub cars: i32,
    pub geometry: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoiRecord {
    pub osm_id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f32,
    pub area: Option<f64>,
}

pub fn write_nodes_csv(path: &Path, nodes: &[NodeRecord]) -> Result<(), TarnError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| io_err(path, e))?;
    writer
        .write_record(["id", "lat", "lon", "elevation"])
        .map_err(|e| io_err(path, e))?;
    for node in nodes {
        writer
            .write_record([
                node.id.to_string(),
                format!("{:.6}", node.lat),
                format!("{:.6}", node.lon),
                node.elevation.to_string(),
            ])
            .map_err(|e| io_err(path, e))?;
    }
    writer.flush().map_err(|e| TarnError::Artifact {
        file: path.display().to_string(),
        line: 0,
        reason: e.to_string(),
    })?;
    Ok(())
}

pub fn read_nodes_csv(path: &Path) -> Result<Vec<NodeRecord>, TarnError> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| io_err(path, e))?;
    let mut result = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        match row {
            Ok(record) => result.push(record),
            Err(e) => warn!("{}:{}: skipping malformed node row: {e}", path.display(), line + 2),
        }
    }
    Ok(result)
}

pub fn write_edges_csv(path: &Path, edges: &[EdgeRecord]) -> Result<(), TarnError> {
    let mut file = File::create(path).map_err(|e| io_err(path, e))?;
    writeln!(file, "id,osm_id,source_id,target_id,length,slope,difficulty,cars,geometry")
        .map_err(|e| io_err(path, e))?;
    for edge in edges {
        let geometry = edge
            .geometry
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            edge.id,
            edge.osm_id,
            edge.source_id,
            edge.target_id,
            edge.length,
            edge.slope,
            edge.difficulty,
            edge.cars,
            geometry
        )
        .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Reads the edges artifact. The `geometry` tail is a variable number of
/// plain (unquoted) comma-separated node ids — parsed by taking the fixed
/// 8-column prefix and collecting the rest.
pub fn read_edges_csv(path: &Path) -> Result<Vec<EdgeRecord>, TarnError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let reader = BufReader::new(file);
    let mut result = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_err(path, e))?;
        if line_no == 0 {
            continue; // header
        }
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 9 {
            warn!(
                "{}:{}: skipping malformed edge row (too few fields)",
                path.display(),
                line_no + 1
            );
            continue;
        }
        let parsed = (|| -> Result<EdgeRecord, std::num::ParseIntError> {
            Ok(EdgeRecord {
                id: fields[0].parse()?,
                osm_id: fields[1].parse()?,
                source_id: fields[2].parse()?,
                target_id: fields[3].parse()?,
                length: fields[4].parse().unwrap_or(0.0),
                slope: fields[5].parse().unwrap_or(0.0),
                difficulty: normalise_rank(fields[6].parse().unwrap_or(-1)),
                cars: normalise_rank(fields[7].parse().unwrap_or(-1)),
                geometry: fields[8..]
                    .iter()
                    .filter_map(|s| s.parse().ok())
                    .collect(),
            })
        })();
        match parsed {
            Ok(record) => result.push(record),
            Err(e) => warn!(
                "{}:{}: skipping malformed edge row: {e}",
                path.display(),
                line_no + 1
            ),
        }
    }
    Ok(result)
}

pub fn write_pois_csv(path: &Path, pois: &[PoiRecord]) -> Result<(), TarnError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| io_err(path, e))?;
    writer
        .write_record(["osm_id", "name", "lat", "lon", "elevation", "area"])
        .map_err(|e| io_err(path, e))?;
    for poi in pois {
        writer
            .write_record([
                poi.osm_id.to_string(),
                format!("\"{}\"", poi.name.replace('"', "\"\"")),
                format!("{:.6}", poi.lat),
                format!("{:.6}", poi.lon),
                poi.elevation.to_string(),
                poi.area.map(|a| a.to_string()).unwrap_or_default(),
            ])
            .map_err(|e| io_err(path, e))?;
    }
    writer.flush().map_err(|e| TarnError::Artifact {
        file: path.display().to_string(),
        line: 0,
        reason: e.to_string(),
    })?;
    Ok(())
}

pub fn read_pois_csv(path: &Path) -> Result<Vec<PoiRecord>, TarnError> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| io_err(path, e))?;
    let mut result = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        match row {
            Ok(record) => result.push(record),
            Err(e) => warn!("{}:{}: skipping malformed POI row: {e}", path.display(), line + 2),
        }
    }
    Ok(result)
}

fn io_err(path: &Path, e: impl std::fmt::Display) -> TarnError {
    TarnError::Artifact {
        file: path.display().to_string(),
        line: 0,
        reason: e.to_string(),
    }
}
