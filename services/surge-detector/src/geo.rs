//! Great-circle geometry on a spherical Earth.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 { distance_km(self.lat, self.lon, other.lat, other.lon) }
}

/// Haversine distance in kilometers.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        assert_eq!(distance_km(25.1, 51.3, 25.1, 51.3), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn symmetric_and_antipodal() {
        let a = distance_km(51.5074, -0.1278, 48.8566, 2.3522);
        let b = distance_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((a - b).abs() < 1e-9);
        assert!((a - 343.5).abs() < 2.0, "london-paris {a}");
        let half = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((half - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn coordinate_validation() {
        assert!(Coordinate::new(89.9, -179.9).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }
}
