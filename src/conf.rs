//! Planner configuration: sections deserialised from JSON via
//! `serde`/`serde_json`, validated up front (fail fast with a named field,
//! before any expensive work starts).

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::TarnError;
use crate::graph::CostWeights;

#[derive(Debug, Clone, Deserialize)]
pub struct FilenamesConfig {
    pub map_nodes: String,
    pub map_edges: String,
    pub map_tarns: String,
    pub output_dir: String,
    pub gpx: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathCostConfig {
    pub length_weight: f64,
    pub elevation_weight: f64,
    pub difficulty_weight: f64,
    pub cars_weight: f64,
}

impl From<&PathCostConfig> for CostWeights {
    fn from(c: &PathCostConfig) -> Self {
        CostWeights {
            length: c.length_weight,
            elevation: c.elevation_weight,
            traffic: c.cars_weight,
            difficulty: c.difficulty_weight,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TarnConstraintsConfig {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub min_area: f64,
    pub max_area: f64,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub use_ordered_tarns: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathConstraintsConfig {
    pub min_length: f64,
    pub max_length: f64,
    /// Accepted but not enforced on the final tour.
    #[serde(default)]
    pub max_elevation: Option<f64>,
    #[serde(default)]
    pub max_difficulty: Option<f64>,
    #[serde(default)]
    pub max_cars: Option<f64>,
    #[serde(default)]
    pub start_location: Option<StartLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConstraintsConfig {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub filenames: FilenamesConfig,
    pub path_cost: PathCostConfig,
    pub tarn_constraints: TarnConstraintsConfig,
    pub path_constraints: PathConstraintsConfig,
    pub map_constraints: MapConstraintsConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, TarnError> {
        let raw = fs::read_to_string(path).map_err(|e| TarnError::Config {
            field: "filenames".to_string(),
            reason: format!("could not read config file {}: {e}", path.display()),
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| TarnError::Config {
            field: "<root>".to_string(),
            reason: format!("malformed config JSON: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Required-filename and min-le-max range checks.
    pub fn validate(&self) -> Result<(), TarnError> {
        let required = [
            ("filenames.map_nodes", &self.filenames.map_nodes),
            ("filenames.map_edges", &self.filenames.map_edges),
            ("filenames.map_tarns", &self.filenames.map_tarns),
            ("filenames.output_dir", &self.filenames.output_dir),
            ("filenames.gpx", &self.filenames.gpx),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(TarnError::Config {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        check_range(
            "tarn_constraints.min_elevation/max_elevation",
            self.tarn_constraints.min_elevation,
            self.tarn_constraints.max_elevation,
        )?;
        check_range(
            "tarn_constraints.min_area/max_area",
            self.tarn_constraints.min_area,
            self.tarn_constraints.max_area,
        )?;
        check_range(
            "path_constraints.min_length/max_length",
            self.path_constraints.min_length,
            self.path_constraints.max_length,
        )?;
        check_range(
            "map_constraints.min_latitude/max_latitude",
            self.map_constraints.min_latitude,
            self.map_constraints.max_latitude,
        )?;
        check_range(
            "map_constraints.min_longitude/max_longitude",
            self.map_constraints.min_longitude,
            self.map_constraints.max_longitude,
        )?;

        Ok(())
    }
}

fn check_range(field: &str, min: f64, max: f64) -> Result<(), TarnError> {
    if min > max {
        return Err(TarnError::Config {
            field: field.to_string(),
            reason: format!("min ({min}) must be <= max ({max})"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> &'static str {
        r#"{
            "filenames": {"map_nodes": "n.csv", "map_edges": "e.csv", "map_tarns": "p.csv", "output_dir": "out", "gpx": "out/tour.gpx"},
            "path_cost": {"length_weight": 1.0, "elevation_weight": 0.2, "difficulty_weight": 0.1, "cars_weight": 10.0},
            "tarn_constraints": {"min_elevation": 500, "max_elevation": 800, "min_area": 500, "max_area": 1000000},
            "path_constraints": {"min_length": 0, "max_length": 20000},
            "map_constraints": {"min_latitude": 54.2, "max_latitude": 54.7, "min_longitude": -3.5, "max_longitude": -2.5}
        }"#
    }

    #[test]
    fn parses_and_validates_minimal_config() {
        let config: Config = serde_json::from_str(valid_json()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.tarn_constraints.blacklist, Vec::<String>::new());
        assert!(!config.tarn_constraints.use_ordered_tarns);
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config: Config = serde_json::from_str(valid_json()).unwrap();
        config.tarn_constraints.min_elevation = 900.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TarnError::Config { .. }));
    }

    #[test]
    fn rejects_empty_required_filename() {
        let mut config: Config = serde_json::from_str(valid_json()).unwrap();
        config.filenames.map_nodes = "".to_string();
        assert!(config.validate().is_err());
    }
}
