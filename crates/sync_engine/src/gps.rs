//! Map coordinates to latitude/longitude
//!
//! Every map location has a reference coordinate at its origin; ego
//! positions are offsets in meters (x east, y north) from it.

const EARTH_RADIUS_METERS: f64 = 6.378137e6;

/// `(location, latitude, longitude)` of each map origin
const REFERENCE_COORDINATES: [(&str, f64, f64); 4] = [
    ("boston-seaport", 42.336849169438615, -71.05785369873047),
    ("singapore-onenorth", 1.2882100868743724, 103.78475189208984),
    ("singapore-hollandvillage", 1.2993652317780957, 103.78217697143555),
    ("singapore-queenstown", 1.2782562240223188, 103.76741409301758),
];

fn reference(location: &str) -> Option<(f64, f64)> {
    REFERENCE_COORDINATES
        .iter()
        .find(|(name, _, _)| *name == location)
        .map(|(_, lat, lon)| (*lat, *lon))
}

/// `(latitude, longitude)` in degrees of a map position; `None` for an
/// unknown location
pub fn to_lat_lon(location: &str, x: f64, y: f64) -> Option<(f64, f64)> {
    let (ref_lat, ref_lon) = reference(location)?;
    let distance = x.hypot(y);
    // clockwise from north
    let bearing = x.atan2(y);

    let lat = ref_lat.to_radians();
    let lon = ref_lon.to_radians();
    let angular = distance / EARTH_RADIUS_METERS;

    let target_lat =
        (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing.cos()).asin();
    let target_lon = lon
        + (bearing.sin() * angular.sin() * lat.cos())
            .atan2(angular.cos() - lat.sin() * target_lat.sin());

    Some((target_lat.to_degrees(), target_lon.to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_reference() {
        let (lat, lon) = to_lat_lon("boston-seaport", 0.0, 0.0).unwrap();
        assert!((lat - 42.336849169438615).abs() < 1e-12);
        assert!((lon + 71.05785369873047).abs() < 1e-12);
    }

    #[test]
    fn test_north_and_east_offsets() {
        let (lat0, lon0) = to_lat_lon("singapore-onenorth", 0.0, 0.0).unwrap();
        let (lat, lon) = to_lat_lon("singapore-onenorth", 0.0, 1000.0).unwrap();
        assert!(lat > lat0);
        assert!((lon - lon0).abs() < 1e-9);
        // ~0.009 degrees per km of latitude
        assert!((lat - lat0 - 0.00898).abs() < 1e-4);

        let (lat, lon) = to_lat_lon("singapore-onenorth", 1000.0, 0.0).unwrap();
        assert!(lon > lon0);
        assert!((lat - lat0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_location() {
        assert!(to_lat_lon("atlantis", 0.0, 0.0).is_none());
    }
}
