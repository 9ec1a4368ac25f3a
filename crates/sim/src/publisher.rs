//! Adaptive send-rate control for locally owned entities.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::coords::{GeocentricCoord, orientation_to_scene_euler};
use crate::dead_reckoning::extrapolate;
use crate::pdu::EntityStatePdu;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub heartbeat: Duration,
    /// Metres of dead-reckoning error tolerated before resending.
    pub movement_threshold: f64,
    /// Degrees of dead-reckoning error tolerated before resending.
    pub rotation_threshold: f64,
    /// Upper bound on updates per second. Zero or less disables the limit.
    pub max_send_rate: f64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(5),
            movement_threshold: 0.05,
            rotation_threshold: 1.0,
            max_send_rate: 60.0,
        }
    }
}

impl PublisherConfig {
    pub fn min_interval(&self) -> Duration {
        if self.max_send_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(1.0 / self.max_send_rate).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendReason {
    FirstSend,
    Heartbeat,
    StateChanged,
    Diverged,
}

#[derive(Debug, Clone)]
pub struct EntityPublisher {
    state: EntityStatePdu,
    config: PublisherConfig,
    last_sent: Option<EntityStatePdu>,
    last_send_time: Option<Instant>,
}

impl EntityPublisher {
    pub fn new(state: EntityStatePdu, config: PublisherConfig) -> Self {
        Self {
            state,
            config,
            last_sent: None,
            last_send_time: None,
        }
    }

    pub fn state(&self) -> &EntityStatePdu {
        &self.state
    }

    /// The owning collaborator updates the authoritative state through this.
    pub fn state_mut(&mut self) -> &mut EntityStatePdu {
        &mut self.state
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PublisherConfig {
        &mut self.config
    }

    pub fn last_sent(&self) -> Option<&EntityStatePdu> {
        self.last_sent.as_ref()
    }

    pub fn last_send_time(&self) -> Option<Instant> {
        self.last_send_time
    }

    /// Why the current state must go out now, if it must.
    pub fn decide(&self, now: Instant) -> Option<SendReason> {
        let (Some(last_sent), Some(last_send_time)) = (&self.last_sent, self.last_send_time)
        else {
            return Some(SendReason::FirstSend);
        };

        let since_send = now.saturating_duration_since(last_send_time);
        if since_send < self.config.min_interval() {
            return None;
        }

        if since_send >= self.config.heartbeat {
            Some(SendReason::Heartbeat)
        } else if state_changed(&self.state, last_sent) {
            Some(SendReason::StateChanged)
        } else if self.diverged(last_sent, since_send) {
            Some(SendReason::Diverged)
        } else {
            None
        }
    }

    pub fn should_send(&self, now: Instant) -> bool {
        self.decide(now).is_some()
    }

    /// Records the current state as sent at `now`.
    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(self.state.clone());
        self.last_send_time = Some(now);
    }

    /// Runs the send decision and commits the snapshot when it says yes. The
    /// caller transmits [`state`](Self::state) whenever this returns `Some`.
    /// When the transmit can fail, call [`decide`](Self::decide) and
    /// [`mark_sent`](Self::mark_sent) separately, as
    /// [`Exercise::publish`](crate::Exercise::publish) does.
    pub fn tick(&mut self, now: Instant) -> Option<SendReason> {
        let reason = self.decide(now)?;
        self.mark_sent(now);
        Some(reason)
    }

    fn diverged(&self, last_sent: &EntityStatePdu, since_send: Duration) -> bool {
        let (predicted_location, predicted_orientation) = extrapolate(last_sent, since_send);
        let current_location: GeocentricCoord = self.state.location.into();

        let threshold = self.config.movement_threshold;
        if predicted_location.distance_squared(&current_location) > threshold * threshold {
            return true;
        }

        let predicted = orientation_to_scene_euler(
            predicted_orientation,
            predicted_location.to_geodetic().lat_lon(),
        );
        let current = orientation_to_scene_euler(
            self.state.orientation,
            current_location.to_geodetic().lat_lon(),
        );
        predicted.angle_to(&current) > self.config.rotation_threshold
    }
}

fn state_changed(current: &EntityStatePdu, sent: &EntityStatePdu) -> bool {
    current.entity_id != sent.entity_id
        || current.force_id != sent.force_id
        || current.entity_type != sent.entity_type
        || current.alternative_entity_type != sent.alternative_entity_type
        || current.appearance != sent.appearance
        || current.marking != sent.marking
        || current.capabilities != sent.capabilities
        || current.articulated_parts != sent.articulated_parts
}
