use crate::store::{LatLon, Place};

/// Mean earth radius in meters, as used by the haversine formula.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points.
pub fn distance_m(a: LatLon, b: LatLon) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// The nearest place whose proximity zone contains the fix.
///
/// A place is a candidate only if the distance to its center is strictly
/// less than its radius. Among candidates the minimum distance wins;
/// equal distances keep the first candidate in iteration order.
pub fn closest(fix: LatLon, places: &[Place]) -> Option<&Place> {
    let mut closest: Option<&Place> = None;
    let mut closest_dist = 0.0;
    for place in places {
        let dist = distance_m(fix, place.location);
        if dist < f64::from(place.radius_m) && (closest.is_none() || dist < closest_dist) {
            closest = Some(place);
            closest_dist = dist;
        }
    }
    closest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: i64, name: &str, lat: f64, lon: f64, radius_m: u32) -> Place {
        Place {
            id,
            name: name.to_string(),
            location: LatLon::new(lat, lon),
            radius_m,
        }
    }

    // One degree of latitude is roughly 111.2 km; these offsets give
    // distances of about 11 m per 0.0001 degrees.
    const HANNOVER: LatLon = LatLon {
        lat: 52.3832,
        lon: 9.7195,
    };

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert!(distance_m(HANNOVER, HANNOVER) < 1e-9);
    }

    #[test]
    fn distance_of_one_degree_latitude() {
        let north = LatLon::new(HANNOVER.lat + 1.0, HANNOVER.lon);
        let d = distance_m(HANNOVER, north);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn empty_list_yields_none() {
        assert!(closest(HANNOVER, &[]).is_none());
    }

    #[test]
    fn fix_outside_every_zone_yields_none() {
        let places = vec![place(1, "office", HANNOVER.lat + 0.01, HANNOVER.lon, 100)];
        assert!(closest(HANNOVER, &places).is_none());
    }

    #[test]
    fn single_containing_zone_wins() {
        let places = vec![
            place(1, "far", HANNOVER.lat + 0.01, HANNOVER.lon, 100),
            place(2, "here", HANNOVER.lat + 0.0001, HANNOVER.lon, 50),
        ];
        assert_eq!(closest(HANNOVER, &places).map(|p| p.id), Some(2));
    }

    #[test]
    fn overlapping_zones_pick_the_nearer_center() {
        // ~11 m and ~55 m away, both with the fix inside their radius.
        let places = vec![
            place(1, "fifty", HANNOVER.lat + 0.0005, HANNOVER.lon, 200),
            place(2, "ten", HANNOVER.lat + 0.0001, HANNOVER.lon, 200),
        ];
        assert_eq!(closest(HANNOVER, &places).map(|p| p.id), Some(2));
    }

    #[test]
    fn boundary_distance_is_not_a_candidate() {
        // Center ~111 m away with a 111 m radius: strictly-less-than keeps
        // the place out once the distance reaches the radius.
        let center = LatLon::new(HANNOVER.lat + 0.001, HANNOVER.lon);
        let d = distance_m(HANNOVER, center);
        let places = vec![place(1, "edge", center.lat, center.lon, d.floor() as u32)];
        assert!(closest(HANNOVER, &places).is_none());
    }

    #[test]
    fn equal_distances_keep_the_first_candidate() {
        let places = vec![
            place(1, "east", HANNOVER.lat, HANNOVER.lon + 0.0002, 100),
            place(2, "west", HANNOVER.lat, HANNOVER.lon - 0.0002, 100),
        ];
        assert_eq!(closest(HANNOVER, &places).map(|p| p.id), Some(1));
    }
}
