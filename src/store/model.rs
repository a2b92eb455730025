use std::path::PathBuf;

/// A geographic point (WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A completed audio recording
///
/// Latitude, longitude and place are display strings; the empty string is
/// the sentinel for "unknown" / "none", never an absent column.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Store-assigned primary key (0 before persistence)
    pub id: i64,
    /// Start instant, seconds since epoch
    pub timestamp: i64,
    /// Formatted start date, e.g. "03.07."
    pub start_date: String,
    /// Formatted start time, e.g. "08:36"
    pub start_time: String,
    /// Formatted duration, e.g. "02:34"
    pub duration: String,
    /// The captured audio asset; its lifetime is tied to this row
    pub file: PathBuf,
    /// Latitude as a decimal string ("" = unknown)
    pub latitude: String,
    /// Longitude as a decimal string ("" = unknown)
    pub longitude: String,
    /// Name of the associated place ("" = none)
    pub place: String,
}

/// A named location with a circular proximity zone
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Store-assigned primary key (0 = not yet persisted)
    pub id: i64,
    pub name: String,
    pub location: LatLon,
    /// Proximity zone radius in meters (always > 0)
    pub radius_m: u32,
}

/// Persisted map center and zoom level; at most one exists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub center: LatLon,
    pub zoom: f64,
}
