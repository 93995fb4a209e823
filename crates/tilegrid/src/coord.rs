use std::fmt;

/// Fixed-point units per degree (1e-7 degree, about 1 cm at the equator).
pub const SCALE: i32 = 10_000_000;

/// Largest valid absolute latitude, in fixed-point units.
pub const LAT_LIMIT: i32 = 90 * SCALE;

/// Largest valid absolute longitude, in fixed-point units.
pub const LON_LIMIT: i32 = 180 * SCALE;

/// A latitude/longitude pair in fixed-point units of 1e-7 degree.
///
/// Integers keep partition decisions identical across builds and platforms;
/// floating-point degrees are only produced at the edges (display, rendering).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub lat: i32,
    pub lon: i32,
}

impl Coord {
    #[inline] pub const fn new(lat: i32, lon: i32) -> Self { Self { lat, lon } }

    /// Build from fixed-point values, rejecting anything outside the globe.
    pub fn checked(lat: i32, lon: i32) -> Option<Self> {
        let coord = Self::new(lat, lon);
        coord.is_valid().then_some(coord)
    }

    /// Convert from degrees, rounding to the nearest fixed-point unit.
    /// Returns `None` for non-finite or out-of-range input.
    pub fn from_degrees(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() { return None }

        let lat = (lat * SCALE as f64).round();
        let lon = (lon * SCALE as f64).round();
        if lat.abs() > LAT_LIMIT as f64 || lon.abs() > LON_LIMIT as f64 { return None }

        Some(Self::new(lat as i32, lon as i32))
    }

    /// Latitude in degrees.
    #[inline] pub fn lat_degrees(&self) -> f64 { self.lat as f64 / SCALE as f64 }

    /// Longitude in degrees.
    #[inline] pub fn lon_degrees(&self) -> f64 { self.lon as f64 / SCALE as f64 }

    /// True if both components are within the valid latitude/longitude range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-LAT_LIMIT..=LAT_LIMIT).contains(&self.lat) && (-LON_LIMIT..=LON_LIMIT).contains(&self.lon)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lat_degrees(), self.lon_degrees())
    }
}

impl From<Coord> for geo::Coord<f64> {
    /// Degrees with `x = lon`, `y = lat`.
    fn from(c: Coord) -> Self {
        geo::Coord { x: c.lon_degrees(), y: c.lat_degrees() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_degrees_rounds_to_nearest_unit() {
        let c = Coord::from_degrees(52.520_008_04, 13.404_954_06).unwrap();
        assert_eq!(c, Coord::new(525_200_080, 134_049_541));
    }

    #[test]
    fn limits_are_accepted() {
        assert!(Coord::from_degrees(90.0, 180.0).is_some());
        assert!(Coord::from_degrees(-90.0, -180.0).is_some());
        assert_eq!(Coord::from_degrees(-90.0, 180.0), Some(Coord::new(-LAT_LIMIT, LON_LIMIT)));
    }

    #[test]
    fn out_of_range_and_nan_are_rejected() {
        assert!(Coord::from_degrees(90.000_001, 0.0).is_none());
        assert!(Coord::from_degrees(0.0, -180.5).is_none());
        assert!(Coord::from_degrees(f64::NAN, 0.0).is_none());
        assert!(Coord::from_degrees(0.0, f64::INFINITY).is_none());
        assert!(Coord::checked(LAT_LIMIT + 1, 0).is_none());
    }

    #[test]
    fn degrees_round_trip() {
        let c = Coord::new(-337_000_000, 1_512_500_000);
        assert_eq!(c.lat_degrees(), -33.7);
        assert_eq!(c.lon_degrees(), 151.25);
        assert_eq!(c.to_string(), "(-33.7000000, 151.2500000)");
    }

    #[test]
    fn geo_coord_is_lon_lat() {
        let g: geo::Coord<f64> = Coord::new(10 * SCALE, 20 * SCALE).into();
        assert_eq!((g.x, g.y), (20.0, 10.0));
    }
}
