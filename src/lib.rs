//! Tarn Tour Planner: builds a routing graph from an OSM-like extract and
//! elevation raster, then plans multi-day hiking tours across a chosen
//! set of tarns. See the `map-builder` and `tarn-planner` binaries for
//! the two pipeline stages.

pub mod artifact;
pub mod conf;
pub mod elevation;
pub mod error;
pub mod geo;
pub mod graph;
pub mod logging;
pub mod mapbuilder;
pub mod maploader;
pub mod pathengine;
pub mod tourplanner;
pub mod writer;
