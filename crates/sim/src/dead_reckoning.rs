//! Kinematic prediction between state updates.

use std::time::Duration;

use glam::{DQuat, DVec3};

use crate::coords::{
    GeocentricCoord, SceneEuler, SceneOrigin, orientation_to_scene_euler,
    scene_euler_to_orientation,
};
use crate::pdu::{DeadReckoningAlgorithm, EntityStatePdu, Vector3Float};

/// Predicted geocentric position and wire orientation after `elapsed`.
///
/// Algorithms without a model here, including unknown raw values, are
/// treated as static.
pub fn extrapolate(state: &EntityStatePdu, elapsed: Duration) -> (GeocentricCoord, Vector3Float) {
    let t = elapsed.as_secs_f64();
    let dr = &state.dead_reckoning;

    let first_order = || state.location.to_dvec3() + state.linear_velocity.to_dvec3() * t;
    let second_order = || first_order() + dr.linear_acceleration.to_dvec3() * (0.5 * t * t);
    let rotated = || state.orientation + dr.angular_velocity * t as f32;

    let (location, orientation) = match dr.algorithm.canonical() {
        DeadReckoningAlgorithm::Fpw => (first_order(), state.orientation),
        DeadReckoningAlgorithm::Rpw => (first_order(), rotated()),
        DeadReckoningAlgorithm::Rvw => (second_order(), rotated()),
        DeadReckoningAlgorithm::Fvw => (second_order(), state.orientation),
        _ => (state.location.to_dvec3(), state.orientation),
    };

    (GeocentricCoord::new(location.x, location.y, location.z), orientation)
}

/// Position and rotation in the local scene frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenePose {
    pub position: DVec3,
    pub euler: SceneEuler,
}

impl ScenePose {
    pub fn rotation(&self) -> DQuat {
        self.euler.to_quat()
    }
}

/// Extrapolates `state` and expresses the result in the scene frame.
pub fn predict_scene_pose(
    state: &EntityStatePdu,
    elapsed: Duration,
    origin: &SceneOrigin,
) -> ScenePose {
    let (location, orientation) = extrapolate(state, elapsed);
    let geod = location.to_geodetic();
    ScenePose {
        position: origin.geodetic_to_scene(&geod),
        euler: orientation_to_scene_euler(orientation, geod.lat_lon()),
    }
}

impl EntityStatePdu {
    /// Writes location and orientation from a scene-frame pose.
    pub fn set_scene_pose(&mut self, origin: &SceneOrigin, pose: &ScenePose) {
        let geod = origin.scene_to_geodetic(pose.position);
        self.location = geod.to_geocentric().into();
        self.orientation = scene_euler_to_orientation(pose.euler, geod.lat_lon());
    }

    pub fn scene_pose(&self, origin: &SceneOrigin) -> ScenePose {
        predict_scene_pose(self, Duration::ZERO, origin)
    }
}
