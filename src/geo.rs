//! Great-circle distance, degree/radian conversions and the equirectangular
//! projection used to compute tarn centroid/area in meters.

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn to_radians(deg: f64) -> f64 {
    deg.to_radians()
}

pub fn to_degrees(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Great-circle (Haversine) distance between two lat/lon points, in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = to_radians(lat1);
    let phi2 = to_radians(lat2);
    let d_phi = to_radians(lat2 - lat1);
    let d_lambda = to_radians(lon2 - lon1);

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Equirectangular projection to meters around an arbitrary reference
/// latitude: x = R * lon * cos(lat), y = R * lat, angles in radians.
pub fn equirectangular_project(lat_deg: f64, lon_deg: f64) -> (f64, f64) {
    let lat = to_radians(lat_deg);
    let lon = to_radians(lon_deg);
    let x = EARTH_RADIUS_M * lon * lat.cos();
    let y = EARTH_RADIUS_M * lat;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_distance() {
        assert_eq!(haversine_distance_m(54.5, -3.0, 54.5, -3.0), 0.0);
    }

    #[test]
    fn haversine_known_distance_one_degree_latitude() {
        // One degree of latitude is close to 111.2 km everywhere.
        let d = haversine_distance_m(54.0, -3.0, 55.0, -3.0);
        assert!((d - 111_195.0).abs() < 500.0, "distance was {d}");
    }

    #[test]
    fn projection_round_trip_scale() {
        let (x0, y0) = equirectangular_project(54.5, -3.0);
        let (x1, y1) = equirectangular_project(54.5, -2.0);
        // one degree of longitude at this latitude projects to roughly
        // R * cos(lat) * (pi/180) meters.
        let expected = EARTH_RADIUS_M * (54.5f64.to_radians()).cos() * 1f64.to_radians();
        assert!(((x1 - x0).abs() - expected).abs() < 1.0);
        assert_eq!(y0, y1);
    }
}
