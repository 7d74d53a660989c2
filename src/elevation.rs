//! Elevation sampling from a single-band raster via a fixed affine
//! geotransform. The source extract and the DEM are assumed to already
//! share WGS84, so this sampler does no CRS reprojection.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use georaster::geotiff::{GeoTiffReader, RasterValue};
use log::warn;

/// Sentinel returned for out-of-extent queries.
pub const NO_DATA: f32 = f32::NEG_INFINITY;

/// A raster identified by its 6-value affine geotransform and pixel extent.
pub struct ElevationSampler {
    origin_x: f64,
    pixel_w: f64,
    origin_y: f64,
    pixel_h: f64,
    width_px: u32,
    height_px: u32,
    reader: GeoTiffReader<BufReader<File>>,
}

impl ElevationSampler {
    /// Opens `path` and reads its geotransform and raster dimensions.
    pub fn open(path: &Path) -> Result<Self, crate::error::TarnError> {
        let file = File::open(path)
            .map_err(|e| crate::error::TarnError::Elevation(format!("{}: {e}", path.display())))?;
        let reader = GeoTiffReader::open(BufReader::new(file))
            .map_err(|e| crate::error::TarnError::Elevation(format!("{}: {e}", path.display())))?;

        let origin = reader
            .origin()
            .ok_or_else(|| crate::error::TarnError::Elevation("raster has no origin".to_string()))?;
        let pixel_size = reader.pixel_size().ok_or_else(|| {
            crate::error::TarnError::Elevation("raster has no pixel size".to_string())
        })?;
        let dims = reader
            .images()
            .first()
            .and_then(|img| img.dimensions)
            .ok_or_else(|| crate::error::TarnError::Elevation("raster has no dimensions".to_string()))?;

        Ok(Self {
            origin_x: origin[0],
            pixel_w: pixel_size[0],
            origin_y: origin[1],
            pixel_h: -pixel_size[1].abs(),
            width_px: dims.0,
            height_px: dims.1,
            reader,
        })
    }

    /// Maps (lon, lat) to the containing pixel by truncation and returns the
    /// single-band value there. Returns `NO_DATA` when out of extent; an
    /// unsupported band type is logged and treated as no-data.
    pub fn sample(&mut self, lat: f64, lon: f64) -> f32 {
        let px = ((lon - self.origin_x) / self.pixel_w) as i64;
        let py = ((lat - self.origin_y) / self.pixel_h) as i64;

        if px < 0 || py < 0 || px as u32 >= self.width_px || py as u32 >= self.height_px {
            return NO_DATA;
        }

        match self.reader.read_pixel(px as u32, py as u32) {
            RasterValue::NoData => NO_DATA,
            v => raster_value_as_f32(&v).unwrap_or_else(|| {
                warn!("unsupported raster band type at ({lat}, {lon}), treating as no-data");
                NO_DATA
            }),
        }
    }
}

fn raster_value_as_f32(value: &RasterValue) -> Option<f32> {
    match value {
        RasterValue::NoData => None,
        RasterValue::U8(v) => Some(*v as f32),
        RasterValue::U16(v) => Some(*v as f32),
        RasterValue::U32(v) => Some(*v as f32),
        RasterValue::U64(v) => Some(*v as f32),
        RasterValue::I8(v) => Some(*v as f32),
        RasterValue::I16(v) => Some(*v as f32),
        RasterValue::I32(v) => Some(*v as f32),
        RasterValue::I64(v) => Some(*v as f32),
        RasterValue::F32(v) => Some(*v),
        RasterValue::F64(v) => Some(*v as f32),
        _ => None,
    }
}

/// Best-effort sample used during map building: out-of-extent queries and a
/// missing raster (already reported once at startup, see `map_builder.rs`)
/// both fall back to elevation 0.
pub fn sample_or_zero(sampler: &mut Option<ElevationSampler>, lat: f64, lon: f64) -> f32 {
    match sampler {
        Some(s) => {
            let v = s.sample(lat, lon);
            if v == NO_DATA {
                0.0
            } else {
                v
            }
        }
        None => 0.0,
    }
}
