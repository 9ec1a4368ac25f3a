//! Body orientation in the geocentric frame versus scene Euler angles.
//!
//! The wire carries psi/theta/phi rotations of the body relative to the
//! earth-centred axes. The scene frame is locally level and north aligned,
//! so converting between the two needs the latitude and longitude of the
//! body. Passing the wrong position yields a tilted result without any error.

use glam::{DQuat, EulerRot};
use serde::{Deserialize, Serialize};

use super::LatLon;
use crate::pdu::Vector3Float;

/// Scene rotation in degrees: `pitch` about x (positive nose down), `yaw`
/// about y (clockwise from north seen from above) and `roll` about z.
/// Applied roll first, then pitch, then yaw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneEuler {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl SceneEuler {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn to_quat(&self) -> DQuat {
        DQuat::from_euler(
            EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    pub fn from_quat(rotation: DQuat) -> Self {
        let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
        Self::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
    }

    /// Shortest-arc angle between the two rotations, in degrees.
    pub fn angle_to(&self, other: &SceneEuler) -> f64 {
        self.to_quat().angle_between(other.to_quat()).to_degrees()
    }
}

struct SinCos {
    sin: f64,
    cos: f64,
}

impl SinCos {
    fn of(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self { sin, cos }
    }
}

pub fn scene_euler_to_orientation(euler: SceneEuler, at: LatLon) -> Vector3Float {
    let lat = SinCos::of(at.lat.to_radians());
    let lon = SinCos::of(at.lon.to_radians());
    let yaw = SinCos::of(euler.yaw.to_radians());
    let pitch = SinCos::of(-euler.pitch.to_radians());
    let roll = SinCos::of(-euler.roll.to_radians());

    let cos_lat_cos_lon = lat.cos * lon.cos;
    let cos_lat_sin_lon = lat.cos * lon.sin;
    let sin_lat_cos_lon = lat.sin * lon.cos;
    let sin_lat_sin_lon = lat.sin * lon.sin;

    let a11 = -lon.sin * yaw.sin * pitch.cos - sin_lat_cos_lon * yaw.cos * pitch.cos
        + cos_lat_cos_lon * pitch.sin;
    let a12 = lon.cos * yaw.sin * pitch.cos - sin_lat_sin_lon * yaw.cos * pitch.cos
        + cos_lat_sin_lon * pitch.sin;
    let a23 = lat.cos * (-yaw.sin * roll.cos + yaw.cos * pitch.sin * roll.sin)
        - lat.sin * pitch.cos * roll.sin;
    let a33 = lat.cos * (yaw.sin * roll.sin + yaw.cos * pitch.sin * roll.cos)
        - lat.sin * pitch.cos * roll.cos;

    let psi = a12.atan2(a11);
    let theta = (-lat.cos * yaw.cos * pitch.cos - lat.sin * pitch.sin)
        .clamp(-1.0, 1.0)
        .asin();
    let phi = a23.atan2(a33);

    Vector3Float::new(psi as f32, theta as f32, phi as f32)
}

pub fn orientation_to_scene_euler(orientation: Vector3Float, at: LatLon) -> SceneEuler {
    let lat = SinCos::of(at.lat.to_radians());
    let lon = SinCos::of(at.lon.to_radians());
    let psi = SinCos::of(orientation.x as f64);
    let theta = SinCos::of(orientation.y as f64);
    let phi = SinCos::of(orientation.z as f64);

    let cos_lat_cos_lon = lat.cos * lon.cos;
    let cos_lat_sin_lon = lat.cos * lon.sin;
    let sin_lat_cos_lon = lat.sin * lon.cos;
    let sin_lat_sin_lon = lat.sin * lon.sin;
    let cos_theta_cos_psi = theta.cos * psi.cos;
    let cos_theta_sin_psi = theta.cos * psi.sin;

    let b11 = -lon.sin * cos_theta_cos_psi + lon.cos * cos_theta_sin_psi;
    let b12 = -sin_lat_cos_lon * cos_theta_cos_psi
        - sin_lat_sin_lon * cos_theta_sin_psi
        - lat.cos * theta.sin;

    let sin_phi_sin_theta = phi.sin * theta.sin;
    let cos_phi_sin_theta = phi.cos * theta.sin;

    let b23 = cos_lat_cos_lon * (-phi.cos * psi.sin + sin_phi_sin_theta * psi.cos)
        + cos_lat_sin_lon * (phi.cos * psi.cos + sin_phi_sin_theta * psi.sin)
        + lat.sin * phi.sin * theta.cos;
    let b33 = cos_lat_cos_lon * (phi.sin * psi.sin + cos_phi_sin_theta * psi.cos)
        + cos_lat_sin_lon * (-phi.sin * psi.cos + cos_phi_sin_theta * psi.sin)
        + lat.sin * phi.cos * theta.cos;

    let pitch = -(cos_lat_cos_lon * cos_theta_cos_psi + cos_lat_sin_lon * cos_theta_sin_psi
        - lat.sin * theta.sin)
        .clamp(-1.0, 1.0)
        .asin();
    let yaw = b11.atan2(b12);
    let roll = -(-b23).atan2(-b33);

    SceneEuler::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    const FIXTURE: LatLon = LatLon::new(32.0779731, 34.7736588);

    fn assert_same_rotation(a: SceneEuler, b: SceneEuler) {
        let angle = a.angle_to(&b);
        assert!(angle < 1e-3, "{a:?} vs {b:?}: {angle} degrees apart");
    }

    #[test]
    fn test_east_facing_at_null_island() {
        let at = LatLon::new(0.0, 0.0);
        let orientation = scene_euler_to_orientation(SceneEuler::new(0.0, 90.0, 0.0), at);
        assert!((orientation.x - FRAC_PI_2).abs() < 1e-6);
        assert!(orientation.y.abs() < 1e-6);
        assert!((orientation.z + FRAC_PI_2).abs() < 1e-6);

        let euler = orientation_to_scene_euler(orientation, at);
        assert!(euler.pitch.abs() < 1e-4);
        assert!((euler.yaw - 90.0).abs() < 1e-4);
        assert!(euler.roll.abs() < 1e-4);
    }

    #[test]
    fn test_roundtrip_at_fixture() {
        let poses = [
            SceneEuler::new(0.0, 0.0, 0.0),
            SceneEuler::new(0.0, 45.0, 0.0),
            SceneEuler::new(10.0, -120.0, 5.0),
            SceneEuler::new(-30.0, 170.0, -20.0),
            SceneEuler::new(5.0, 300.0, 60.0),
        ];
        for pose in poses {
            let orientation = scene_euler_to_orientation(pose, FIXTURE);
            let back = orientation_to_scene_euler(orientation, FIXTURE);
            assert_same_rotation(pose, back);
        }
    }

    #[test]
    fn test_orientation_depends_on_position() {
        let pose = SceneEuler::new(0.0, 30.0, 0.0);
        let here = scene_euler_to_orientation(pose, FIXTURE);
        let elsewhere = scene_euler_to_orientation(pose, LatLon::new(-10.0, 120.0));
        assert_ne!(here, elsewhere);

        let misread = orientation_to_scene_euler(here, LatLon::new(-10.0, 120.0));
        assert!(pose.angle_to(&misread) > 1.0);
    }

    #[test]
    fn test_angle_to_takes_shortest_arc() {
        let a = SceneEuler::new(0.0, 179.0, 0.0);
        let b = SceneEuler::new(0.0, -179.0, 0.0);
        assert!((a.angle_to(&b) - 2.0).abs() < 1e-4);
        let wrapped = SceneEuler::new(0.0, 370.0, 0.0);
        assert!(SceneEuler::new(0.0, 10.0, 0.0).angle_to(&wrapped) < 1e-4);
    }

    #[test]
    fn test_quat_roundtrip() {
        let euler = SceneEuler::new(20.0, 75.0, -10.0);
        assert_same_rotation(euler, SceneEuler::from_quat(euler.to_quat()));
    }
}
