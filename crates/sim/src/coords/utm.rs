use serde::{Deserialize, Serialize};

use super::GeodeticCoord;
use super::ellipsoid::{UTM_SCALE_FACTOR, WGS84_A, WGS84_B};

const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Easting `x`, northing `y` and altitude `z` in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UtmCoord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub zone: i32,
    pub north: bool,
}

impl UtmCoord {
    pub const fn new(x: f64, y: f64, z: f64, zone: i32, north: bool) -> Self {
        Self {
            x,
            y,
            z,
            zone,
            north,
        }
    }

    pub fn to_geodetic(&self) -> GeodeticCoord {
        let x = (self.x - FALSE_EASTING) / UTM_SCALE_FACTOR;
        let mut y = self.y;
        if !self.north {
            y -= FALSE_NORTHING_SOUTH;
        }
        let y = y / UTM_SCALE_FACTOR;

        let (lat, lon) = map_xy_to_lat_lon(x, y, central_meridian(self.zone));
        GeodeticCoord::new(lat.to_degrees(), lon.to_degrees(), self.z)
    }
}

impl GeodeticCoord {
    pub fn to_utm(&self) -> UtmCoord {
        let zone = ((self.lon + 180.0) / 6.0).floor() as i32 + 1;
        let (x, y) = map_lat_lon_to_xy(
            self.lat.to_radians(),
            self.lon.to_radians(),
            central_meridian(zone),
        );

        let x = x * UTM_SCALE_FACTOR + FALSE_EASTING;
        let mut y = y * UTM_SCALE_FACTOR;
        if y < 0.0 {
            y += FALSE_NORTHING_SOUTH;
        }

        UtmCoord::new(x, y, self.alt, zone, self.lat >= 0.0)
    }
}

fn central_meridian(zone: i32) -> f64 {
    (-183.0 + zone as f64 * 6.0).to_radians()
}

fn third_flattening() -> f64 {
    (WGS84_A - WGS84_B) / (WGS84_A + WGS84_B)
}

fn second_eccentricity_sq() -> f64 {
    (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B)
}

fn rectifying_radius(n: f64) -> f64 {
    (WGS84_A + WGS84_B) / 2.0 * (1.0 + n.powi(2) / 4.0 + n.powi(4) / 64.0)
}

/// Distance along the meridian from the equator to latitude `phi`.
fn arc_length_of_meridian(phi: f64) -> f64 {
    let n = third_flattening();
    let alpha = rectifying_radius(n);
    let beta = -3.0 * n / 2.0 + 9.0 * n.powi(3) / 16.0 - 3.0 * n.powi(5) / 32.0;
    let gamma = 15.0 * n.powi(2) / 16.0 - 15.0 * n.powi(4) / 32.0;
    let delta = -35.0 * n.powi(3) / 48.0 + 105.0 * n.powi(5) / 256.0;
    let epsilon = 315.0 * n.powi(4) / 512.0;

    alpha
        * (phi
            + beta * (2.0 * phi).sin()
            + gamma * (4.0 * phi).sin()
            + delta * (6.0 * phi).sin()
            + epsilon * (8.0 * phi).sin())
}

/// Latitude whose meridian arc length equals the northing `y`.
fn footpoint_latitude(y: f64) -> f64 {
    let n = third_flattening();
    let y = y / rectifying_radius(n);
    let beta = 3.0 * n / 2.0 - 27.0 * n.powi(3) / 32.0 + 269.0 * n.powi(5) / 512.0;
    let gamma = 21.0 * n.powi(2) / 16.0 - 55.0 * n.powi(4) / 32.0;
    let delta = 151.0 * n.powi(3) / 96.0 - 417.0 * n.powi(5) / 128.0;
    let epsilon = 1097.0 * n.powi(4) / 512.0;

    y + beta * (2.0 * y).sin()
        + gamma * (4.0 * y).sin()
        + delta * (6.0 * y).sin()
        + epsilon * (8.0 * y).sin()
}

/// Transverse Mercator projection about `lambda0`, unscaled and without
/// false easting or northing.
fn map_lat_lon_to_xy(phi: f64, lambda: f64, lambda0: f64) -> (f64, f64) {
    let cos_phi = phi.cos();
    let nu2 = second_eccentricity_sq() * cos_phi * cos_phi;
    let n = WGS84_A * WGS84_A / (WGS84_B * (1.0 + nu2).sqrt());
    let t = phi.tan();
    let t2 = t * t;
    let l = lambda - lambda0;

    let l3coef = 1.0 - t2 + nu2;
    let l4coef = 5.0 - t2 + 9.0 * nu2 + 4.0 * nu2 * nu2;
    let l5coef = 5.0 - 18.0 * t2 + t2 * t2 + 14.0 * nu2 - 58.0 * t2 * nu2;
    let l6coef = 61.0 - 58.0 * t2 + t2 * t2 + 270.0 * nu2 - 330.0 * t2 * nu2;
    let l7coef = 61.0 - 479.0 * t2 + 179.0 * t2 * t2 - t2 * t2 * t2;
    let l8coef = 1385.0 - 3111.0 * t2 + 543.0 * t2 * t2 - t2 * t2 * t2;

    let x = n * cos_phi * l
        + n / 6.0 * cos_phi.powi(3) * l3coef * l.powi(3)
        + n / 120.0 * cos_phi.powi(5) * l5coef * l.powi(5)
        + n / 5040.0 * cos_phi.powi(7) * l7coef * l.powi(7);

    let y = arc_length_of_meridian(phi)
        + t / 2.0 * n * cos_phi.powi(2) * l.powi(2)
        + t / 24.0 * n * cos_phi.powi(4) * l4coef * l.powi(4)
        + t / 720.0 * n * cos_phi.powi(6) * l6coef * l.powi(6)
        + t / 40320.0 * n * cos_phi.powi(8) * l8coef * l.powi(8);

    (x, y)
}

/// Inverse of [`map_lat_lon_to_xy`]. Returns radians.
fn map_xy_to_lat_lon(x: f64, y: f64, lambda0: f64) -> (f64, f64) {
    let phif = footpoint_latitude(y);
    let cf = phif.cos();
    let nuf2 = second_eccentricity_sq() * cf * cf;
    let nf = WGS84_A * WGS84_A / (WGS84_B * (1.0 + nuf2).sqrt());
    let tf = phif.tan();
    let tf2 = tf * tf;
    let tf4 = tf2 * tf2;

    let x1frac = 1.0 / (nf * cf);
    let x2frac = tf / (2.0 * nf.powi(2));
    let x3frac = 1.0 / (6.0 * nf.powi(3) * cf);
    let x4frac = tf / (24.0 * nf.powi(4));
    let x5frac = 1.0 / (120.0 * nf.powi(5) * cf);
    let x6frac = tf / (720.0 * nf.powi(6));
    let x7frac = 1.0 / (5040.0 * nf.powi(7) * cf);
    let x8frac = tf / (40320.0 * nf.powi(8));

    let x2poly = -1.0 - nuf2;
    let x3poly = -1.0 - 2.0 * tf2 - nuf2;
    let x4poly = 5.0 + 3.0 * tf2 + 6.0 * nuf2
        - 6.0 * tf2 * nuf2
        - 3.0 * nuf2 * nuf2
        - 9.0 * tf2 * nuf2 * nuf2;
    let x5poly = 5.0 + 28.0 * tf2 + 24.0 * tf4 + 6.0 * nuf2 + 8.0 * tf2 * nuf2;
    let x6poly = -61.0 - 90.0 * tf2 - 45.0 * tf4 - 107.0 * nuf2 + 162.0 * tf2 * nuf2;
    let x7poly = -61.0 - 662.0 * tf2 - 1320.0 * tf4 - 720.0 * tf4 * tf2;
    let x8poly = 1385.0 + 3633.0 * tf2 + 4095.0 * tf4 + 1575.0 * tf4 * tf2;

    let lat = phif
        + x2frac * x2poly * x.powi(2)
        + x4frac * x4poly * x.powi(4)
        + x6frac * x6poly * x.powi(6)
        + x8frac * x8poly * x.powi(8);

    let lon = lambda0
        + x1frac * x
        + x3frac * x3poly * x.powi(3)
        + x5frac * x5poly * x.powi(5)
        + x7frac * x7poly * x.powi(7);

    (lat, lon)
}
