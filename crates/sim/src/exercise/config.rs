use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coords::SceneOrigin;
use crate::directory::DEFAULT_HEARTBEAT_TIMEOUT;
use crate::pdu::PROTOCOL_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// Inbound datagrams for any other exercise are dropped.
    pub exercise_id: u8,
    pub protocol_version: u8,
    pub heartbeat_timeout: Duration,
    pub scene_origin: SceneOrigin,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            exercise_id: 1,
            protocol_version: PROTOCOL_VERSION,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            scene_origin: SceneOrigin::default(),
        }
    }
}
