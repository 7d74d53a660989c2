//! Map Builder binary: streams an OSM extract and an elevation raster into
//! the three on-disk artifacts consumed by `tarn-planner`.

use std::path::PathBuf;

use clap::Parser;
use log::error;
use osm_io::osm::model::element::Element;
use osm_io::osm::pbf;

use tarn_tour_planner::artifact;
use tarn_tour_planner::elevation::ElevationSampler;
use tarn_tour_planner::logging;
use tarn_tour_planner::mapbuilder::{BBox, MapBuilder};

/// Builds the routing graph and tarn artifacts from an OSM extract and a
/// GeoTIFF elevation raster.
#[derive(Parser)]
struct Args {
    /// Path to the OSM extract (PBF format).
    osm_file: PathBuf,
    /// Path to the elevation raster (GeoTIFF).
    dem_file: PathBuf,

    #[arg(long, default_value = "map_nodes.csv")]
    nodes_out: PathBuf,
    #[arg(long, default_value = "map_edges.csv")]
    edges_out: PathBuf,
    #[arg(long, default_value = "map_tarns.csv")]
    tarns_out: PathBuf,

    #[arg(long, allow_hyphen_values = true, default_value_t = -90.0)]
    min_lat: f64,
    #[arg(long, default_value_t = 90.0)]
    max_lat: f64,
    #[arg(long, allow_hyphen_values = true, default_value_t = -180.0)]
    min_lon: f64,
    #[arg(long, default_value_t = 180.0)]
    max_lon: f64,
}

fn main() -> anyhow::Result<()> {
    logging::init()?;
    let args = Args::parse();

    let mut stopwatch = benchmark_rs::stopwatch::StopWatch::new();
    stopwatch.start();

    let bbox = BBox {
        min_lat: args.min_lat,
        max_lat: args.max_lat,
        min_lon: args.min_lon,
        max_lon: args.max_lon,
    };

    let mut sampler = match ElevationSampler::open(&args.dem_file) {
        Ok(sampler) => Some(sampler),
        Err(e) => {
            error!("failed to open elevation raster {}: {e}, continuing with elevation 0", args.dem_file.display());
            None
        }
    };

    let mut builder = MapBuilder::new(bbox);
    let reader = pbf::reader::Reader::new(&args.osm_file)?;
    for element in reader.elements()? {
        match element {
            Element::Node { node } => {
                builder.intake_node(node.id(), node.coordinate().lat(), node.coordinate().lon(), &mut sampler);
            }
            Element::Way { way } => {
                let tags = way.tags().iter().map(|t| (t.k().clone(), t.v().clone())).collect();
                builder.intake_way(way.id(), way.refs().clone(), tags);
            }
            _ => {}
        }
    }

    let output = builder.finish(&mut sampler);
    artifact::write_nodes_csv(&args.nodes_out, &output.nodes)?;
    artifact::write_edges_csv(&args.edges_out, &output.edges)?;
    artifact::write_pois_csv(&args.tarns_out, &output.pois)?;

    log::info!("map builder finished, time: {}", stopwatch);
    Ok(())
}
