//! Earth reference frames and the conversions between them.
//!
//! Geodetic and geocentric coordinates follow WGS-84. The local scene frame is
//! an equirectangular approximation around a [`SceneOrigin`]: x points east,
//! y up and z north. It is only valid near the origin.

mod ellipsoid;
mod orientation;
mod scene;
mod utm;

pub use ellipsoid::{
    FLAT_EARTH_RADIUS, WGS84_A, WGS84_B, WGS84_E_SQ, WGS84_F, UTM_SCALE_FACTOR,
};
pub use orientation::{SceneEuler, orientation_to_scene_euler, scene_euler_to_orientation};
pub use scene::SceneOrigin;
pub use utm::UtmCoord;

use serde::{Deserialize, Serialize};

use crate::pdu::Vector3Double;

/// Latitude and longitude in degrees, altitude in metres above the ellipsoid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCoord {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl GeodeticCoord {
    pub const fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<GeodeticCoord> for LatLon {
    fn from(geod: GeodeticCoord) -> Self {
        geod.lat_lon()
    }
}

/// Earth-centred, earth-fixed cartesian position in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocentricCoord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GeocentricCoord {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_squared(&self, other: &GeocentricCoord) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }
}

impl From<Vector3Double> for GeocentricCoord {
    fn from(v: Vector3Double) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<GeocentricCoord> for Vector3Double {
    fn from(v: GeocentricCoord) -> Self {
        Vector3Double::new(v.x, v.y, v.z)
    }
}
