mod config;
mod connection;
mod transport;

pub use config::ExerciseConfig;
pub use connection::{ConnectionStats, ExerciseConnection, SendError, SubscribeError};
pub use transport::{MemoryNetwork, MemoryTransport, Transport};

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::coords::SceneOrigin;
use crate::directory::EntityDirectory;
use crate::pdu::{EntityStatePdu, Pdu};
use crate::publisher::{EntityPublisher, PublisherConfig, SendReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublisherId(u64);

/// One participant in an exercise: connection, remote-entity directory and
/// the publishers of locally owned entities, all advanced by [`tick`](Self::tick).
pub struct Exercise<T> {
    connection: ExerciseConnection<T>,
    directory: EntityDirectory,
    publishers: BTreeMap<PublisherId, EntityPublisher>,
    next_publisher: u64,
}

impl<T: Transport> Exercise<T> {
    pub fn new(transport: T, config: ExerciseConfig) -> Self {
        let directory = EntityDirectory::new(config.heartbeat_timeout);
        Self {
            connection: ExerciseConnection::new(transport, config),
            directory,
            publishers: BTreeMap::new(),
            next_publisher: 0,
        }
    }

    pub fn config(&self) -> &ExerciseConfig {
        self.connection.config()
    }

    pub fn scene_origin(&self) -> &SceneOrigin {
        &self.connection.config().scene_origin
    }

    pub fn connection(&self) -> &ExerciseConnection<T> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ExerciseConnection<T> {
        &mut self.connection
    }

    pub fn directory(&self) -> &EntityDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut EntityDirectory {
        &mut self.directory
    }

    pub fn add_publisher(&mut self, state: EntityStatePdu, config: PublisherConfig) -> PublisherId {
        let id = PublisherId(self.next_publisher);
        self.next_publisher += 1;
        log::debug!("publishing entity {}", state.entity_id);
        self.publishers.insert(id, EntityPublisher::new(state, config));
        id
    }

    pub fn remove_publisher(&mut self, id: PublisherId) -> Option<EntityPublisher> {
        self.publishers.remove(&id)
    }

    pub fn publisher(&self, id: PublisherId) -> Option<&EntityPublisher> {
        self.publishers.get(&id)
    }

    pub fn publisher_mut(&mut self, id: PublisherId) -> Option<&mut EntityPublisher> {
        self.publishers.get_mut(&id)
    }

    pub fn publishers(&self) -> impl Iterator<Item = (PublisherId, &EntityPublisher)> {
        self.publishers.iter().map(|(id, publisher)| (*id, publisher))
    }

    /// Advances everything by one step at `now`: inbound traffic is
    /// dispatched, publishers send what they must and silent remote entities
    /// are expired.
    pub fn tick(&mut self, now: Instant) {
        if let Err(e) = self.connection.receive() {
            log::warn!("receive failed: {e}");
        }
        self.connection.update_timestamp();

        self.directory
            .set_local_ids(self.publishers.values().map(|p| p.state().entity_id));

        let directory = &mut self.directory;
        self.connection.dispatch(|pdu| {
            if let Pdu::EntityState(state) = pdu {
                directory.handle_entity_state(state, now);
            }
        });

        let ids: Vec<PublisherId> = self.publishers.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.publish(id, now) {
                log::warn!("failed to publish {id:?}: {e}");
            }
        }

        self.directory.expire(now);
    }

    /// Sends the publisher's state if its send policy asks for it at `now`.
    ///
    /// The state only counts as sent once the transport accepted it, so a
    /// failed attempt is retried on the next call.
    pub fn publish(
        &mut self,
        id: PublisherId,
        now: Instant,
    ) -> Result<Option<SendReason>, SendError> {
        let Some(publisher) = self.publishers.get_mut(&id) else {
            return Ok(None);
        };
        let Some(reason) = publisher.decide(now) else {
            return Ok(None);
        };

        let state = publisher.state();
        log::debug!("sending entity {} ({reason:?})", state.entity_id);
        self.connection.send(&Pdu::EntityState(state.clone()))?;
        publisher.mark_sent(now);
        Ok(Some(reason))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::pdu::{ArticulatedPart, CodecError, EntityId};

    #[test]
    fn test_failed_send_is_retried() {
        let network = MemoryNetwork::new();
        let mut exercise = Exercise::new(network.endpoint(), ExerciseConfig::default());
        let state = EntityStatePdu {
            entity_id: EntityId::new(1, 1, 1),
            articulated_parts: vec![ArticulatedPart::default(); 256],
            ..Default::default()
        };
        let id = exercise.add_publisher(state, PublisherConfig::default());

        let t0 = Instant::now();
        let err = exercise.publish(id, t0).unwrap_err();
        assert!(matches!(
            err,
            SendError::Codec(CodecError::LengthOverflow { count: 256, .. })
        ));
        assert!(exercise.publisher(id).unwrap().last_sent().is_none());

        exercise.tick(t0 + Duration::from_millis(20));
        assert_eq!(exercise.connection().stats().datagrams_sent, 0);

        exercise
            .publisher_mut(id)
            .unwrap()
            .state_mut()
            .articulated_parts
            .truncate(4);
        let later = t0 + Duration::from_millis(40);
        assert_eq!(exercise.publish(id, later).unwrap(), Some(SendReason::FirstSend));
        assert_eq!(exercise.publisher(id).unwrap().last_send_time(), Some(later));
        assert_eq!(exercise.connection().stats().datagrams_sent, 1);
        assert_eq!(exercise.publish(id, later).unwrap(), None);
    }

    #[test]
    fn test_publish_unknown_id_is_a_no_op() {
        let network = MemoryNetwork::new();
        let mut exercise = Exercise::new(network.endpoint(), ExerciseConfig::default());
        let id = exercise.add_publisher(EntityStatePdu::default(), PublisherConfig::default());
        exercise.remove_publisher(id);
        assert_eq!(exercise.publish(id, Instant::now()).unwrap(), None);
    }
}
