use super::{GeocentricCoord, GeodeticCoord};

pub const WGS84_A: f64 = 6_378_137.0;
pub const WGS84_B: f64 = 6_356_752.314245;
pub const WGS84_F: f64 = (WGS84_A - WGS84_B) / WGS84_A;
pub const WGS84_E_SQ: f64 = WGS84_F * (2.0 - WGS84_F);

/// Sphere radius used by the local scene approximation.
pub const FLAT_EARTH_RADIUS: f64 = 6_366_707.02;
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

impl GeodeticCoord {
    pub fn to_geocentric(&self) -> GeocentricCoord {
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        // Prime vertical radius of curvature.
        let n = WGS84_A / (1.0 - WGS84_E_SQ * sin_lat * sin_lat).sqrt();

        GeocentricCoord::new(
            (self.alt + n) * cos_lat * cos_lon,
            (self.alt + n) * cos_lat * sin_lon,
            (self.alt + (1.0 - WGS84_E_SQ) * n) * sin_lat,
        )
    }
}

impl GeocentricCoord {
    /// Bowring's closed-form inverse via the parametric latitude.
    pub fn to_geodetic(&self) -> GeodeticCoord {
        let eps = WGS84_E_SQ / (1.0 - WGS84_E_SQ);
        let p = (self.x * self.x + self.y * self.y).sqrt();
        let q = (self.z * WGS84_A).atan2(p * WGS84_B);
        let (sin_q, cos_q) = q.sin_cos();

        let lat = (self.z + eps * WGS84_B * sin_q.powi(3))
            .atan2(p - WGS84_E_SQ * WGS84_A * cos_q.powi(3));
        let lon = self.y.atan2(self.x);

        let sin_lat = lat.sin();
        let v = WGS84_A / (1.0 - WGS84_E_SQ * sin_lat * sin_lat).sqrt();

        GeodeticCoord::new(lat.to_degrees(), lon.to_degrees(), p / lat.cos() - v)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const FIXTURE_GEOD: GeodeticCoord = GeodeticCoord::new(32.0779731, 34.7736588, 3.3);
    pub const FIXTURE_GEOC: GeocentricCoord =
        GeocentricCoord::new(4_443_404.345_474_955_6, 3_085_217.842_607_895_8, 3_367_762.495_332_846_4);

    #[test]
    fn test_geodetic_to_geocentric_fixture() {
        let geoc = FIXTURE_GEOD.to_geocentric();
        assert!((geoc.x - FIXTURE_GEOC.x).abs() < 0.001);
        assert!((geoc.y - FIXTURE_GEOC.y).abs() < 0.001);
        assert!((geoc.z - FIXTURE_GEOC.z).abs() < 0.001);
    }

    #[test]
    fn test_geocentric_to_geodetic_fixture() {
        let geod = FIXTURE_GEOC.to_geodetic();
        assert!((geod.lat - FIXTURE_GEOD.lat).abs() < 1e-5);
        assert!((geod.lon - FIXTURE_GEOD.lon).abs() < 1e-5);
        assert!((geod.alt - FIXTURE_GEOD.alt).abs() < 0.001);
    }

    #[test]
    fn test_surface_points_roundtrip() {
        let points = [
            GeodeticCoord::new(0.0, 0.0, 0.0),
            GeodeticCoord::new(-33.86, 151.21, 58.0),
            GeodeticCoord::new(64.13, -21.9, 1200.0),
            GeodeticCoord::new(-54.8, -68.3, 10.0),
            GeodeticCoord::new(45.0, 179.5, 2000.0),
        ];
        for point in points {
            let back = point.to_geocentric().to_geodetic();
            assert!((back.lat - point.lat).abs() < 1e-5, "{point:?} -> {back:?}");
            assert!((back.lon - point.lon).abs() < 1e-5, "{point:?} -> {back:?}");
            assert!((back.alt - point.alt).abs() < 1e-3, "{point:?} -> {back:?}");
        }
    }

    #[test]
    fn test_equator_prime_meridian_is_on_x_axis() {
        let geoc = GeodeticCoord::new(0.0, 0.0, 0.0).to_geocentric();
        assert!((geoc.x - WGS84_A).abs() < 1e-6);
        assert!(geoc.y.abs() < 1e-6);
        assert!(geoc.z.abs() < 1e-6);
    }
}
