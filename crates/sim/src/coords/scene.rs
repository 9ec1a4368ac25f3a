use std::f64::consts::PI;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::ellipsoid::FLAT_EARTH_RADIUS;
use super::{GeocentricCoord, GeodeticCoord, LatLon};

/// Reference point of the local scene frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneOrigin {
    pub lat: f64,
    pub lon: f64,
}

impl SceneOrigin {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    fn metres_per_degree_lat() -> f64 {
        FLAT_EARTH_RADIUS * PI / 180.0
    }

    fn metres_per_degree_lon(&self) -> f64 {
        FLAT_EARTH_RADIUS * PI * self.lat.to_radians().cos() / 180.0
    }

    pub fn geodetic_to_scene(&self, geod: &GeodeticCoord) -> DVec3 {
        DVec3::new(
            (geod.lon - self.lon) * self.metres_per_degree_lon(),
            geod.alt,
            (geod.lat - self.lat) * Self::metres_per_degree_lat(),
        )
    }

    pub fn scene_to_geodetic(&self, scene: DVec3) -> GeodeticCoord {
        GeodeticCoord::new(
            scene.z / Self::metres_per_degree_lat() + self.lat,
            scene.x / self.metres_per_degree_lon() + self.lon,
            scene.y,
        )
    }

    pub fn geocentric_to_scene(&self, geoc: &GeocentricCoord) -> DVec3 {
        self.geodetic_to_scene(&geoc.to_geodetic())
    }

    pub fn scene_to_geocentric(&self, scene: DVec3) -> GeocentricCoord {
        self.scene_to_geodetic(scene).to_geocentric()
    }
}

impl From<LatLon> for SceneOrigin {
    fn from(lat_lon: LatLon) -> Self {
        Self::new(lat_lon.lat, lat_lon.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ellipsoid::tests::{FIXTURE_GEOC, FIXTURE_GEOD};

    const ORIGIN: SceneOrigin = SceneOrigin::new(32.055304, 34.7564563);
    const SCENE: DVec3 = DVec3::new(1620.092_510_684_6, 3.3, 2519.002_738_667_2);

    fn assert_close(actual: DVec3, expected: DVec3, tolerance: f64) {
        assert!(
            (actual - expected).abs().max_element() < tolerance,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn test_geodetic_to_scene_fixture() {
        assert_close(ORIGIN.geodetic_to_scene(&FIXTURE_GEOD), SCENE, 0.015);
    }

    #[test]
    fn test_geocentric_to_scene_fixture() {
        assert_close(ORIGIN.geocentric_to_scene(&FIXTURE_GEOC), SCENE, 0.015);
    }

    #[test]
    fn test_scene_to_geodetic_fixture() {
        let geod = ORIGIN.scene_to_geodetic(SCENE);
        assert!((geod.lat - FIXTURE_GEOD.lat).abs() < 0.001);
        assert!((geod.lon - FIXTURE_GEOD.lon).abs() < 0.001);
        assert!((geod.alt - FIXTURE_GEOD.alt).abs() < 0.001);
    }

    #[test]
    fn test_scene_to_geocentric_fixture() {
        let geoc = ORIGIN.scene_to_geocentric(SCENE);
        assert!((geoc.x - FIXTURE_GEOC.x).abs() < 0.015);
        assert!((geoc.y - FIXTURE_GEOC.y).abs() < 0.015);
        assert!((geoc.z - FIXTURE_GEOC.z).abs() < 0.015);
    }

    #[test]
    fn test_origin_maps_to_scene_zero() {
        let at_origin = GeodeticCoord::new(ORIGIN.lat, ORIGIN.lon, 0.0);
        assert_close(ORIGIN.geodetic_to_scene(&at_origin), DVec3::ZERO, 1e-9);
    }

    #[test]
    fn test_axes_point_east_up_north() {
        let north = ORIGIN.geodetic_to_scene(&GeodeticCoord::new(ORIGIN.lat + 0.01, ORIGIN.lon, 0.0));
        let east = ORIGIN.geodetic_to_scene(&GeodeticCoord::new(ORIGIN.lat, ORIGIN.lon + 0.01, 0.0));
        assert!(north.z > 0.0 && north.x.abs() < 1e-9);
        assert!(east.x > 0.0 && east.z.abs() < 1e-9);
        assert!(east.x < north.z);
    }
}
