//! Remote entities seen on the exercise and their lifecycle.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::coords::SceneOrigin;
use crate::dead_reckoning::{ScenePose, predict_scene_pose};
use crate::pdu::{EntityId, EntityStatePdu};
use crate::subscription::{SubscriptionId, Subscribers};

pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntity {
    state: EntityStatePdu,
    last_update: Instant,
}

impl RemoteEntity {
    pub fn id(&self) -> EntityId {
        self.state.entity_id
    }

    pub fn state(&self) -> &EntityStatePdu {
        &self.state
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    pub fn since_update(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_update)
    }

    /// Dead-reckoned pose at `now` in the scene frame.
    pub fn scene_pose(&self, now: Instant, origin: &SceneOrigin) -> ScenePose {
        predict_scene_pose(&self.state, self.since_update(now), origin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityEvent<'a> {
    Joined(&'a RemoteEntity),
    Updated(&'a RemoteEntity),
    Left(&'a RemoteEntity),
}

impl<'a> EntityEvent<'a> {
    pub fn entity(&self) -> &'a RemoteEntity {
        match self {
            EntityEvent::Joined(entity)
            | EntityEvent::Updated(entity)
            | EntityEvent::Left(entity) => entity,
        }
    }
}

type EntityCallback = dyn for<'a> FnMut(&EntityEvent<'a>);

#[derive(Debug)]
pub struct EntityDirectory {
    entities: HashMap<EntityId, RemoteEntity>,
    local_ids: HashSet<EntityId>,
    heartbeat_timeout: Duration,
    subscribers: Subscribers<EntityCallback>,
}

impl EntityDirectory {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            entities: HashMap::new(),
            local_ids: HashSet::new(),
            heartbeat_timeout,
            subscribers: Subscribers::new(),
        }
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&EntityEvent<'_>) + 'static) -> SubscriptionId {
        self.subscribers.add(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Ids published from this process. Updates carrying them are ignored.
    pub fn set_local_ids(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.local_ids.clear();
        self.local_ids.extend(ids);
    }

    pub fn is_local(&self, id: &EntityId) -> bool {
        self.local_ids.contains(id)
    }

    pub fn handle_entity_state(&mut self, state: &EntityStatePdu, now: Instant) {
        let id = state.entity_id;
        if self.local_ids.contains(&id) {
            log::trace!("ignoring echo of local entity {id}");
            return;
        }

        let joined = !self.entities.contains_key(&id);
        let entity = self.entities.entry(id).or_insert_with(|| RemoteEntity {
            state: EntityStatePdu::default(),
            last_update: now,
        });
        entity.state.clone_from(state);
        entity.last_update = now;

        let event = if joined {
            log::info!("entity {id} joined ({})", entity.state.marking.text);
            EntityEvent::Joined(entity)
        } else {
            EntityEvent::Updated(entity)
        };
        for callback in self.subscribers.iter_mut() {
            callback(&event);
        }
    }

    /// Removes entities silent for at least the heartbeat timeout.
    pub fn expire(&mut self, now: Instant) -> usize {
        let timeout = self.heartbeat_timeout;
        let expired: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.since_update(now) >= timeout)
            .map(RemoteEntity::id)
            .collect();

        for id in &expired {
            let Some(entity) = self.entities.remove(id) else {
                continue;
            };
            log::info!("entity {id} left after {:?} of silence", entity.since_update(now));
            let event = EntityEvent::Left(&entity);
            for callback in self.subscribers.iter_mut() {
                callback(&event);
            }
        }

        expired.len()
    }

    pub fn get(&self, id: &EntityId) -> Option<&RemoteEntity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Seen {
        Joined(EntityId),
        Updated(EntityId),
        Left(EntityId),
    }

    fn recording(directory: &mut EntityDirectory) -> Rc<RefCell<Vec<Seen>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        directory.subscribe(move |event| {
            let id = event.entity().id();
            sink.borrow_mut().push(match event {
                EntityEvent::Joined(_) => Seen::Joined(id),
                EntityEvent::Updated(_) => Seen::Updated(id),
                EntityEvent::Left(_) => Seen::Left(id),
            });
        });
        seen
    }

    fn state(id: EntityId) -> EntityStatePdu {
        EntityStatePdu {
            entity_id: id,
            ..Default::default()
        }
    }

    #[test]
    fn test_join_update_leave() {
        let t0 = Instant::now();
        let id = EntityId::new(1, 2, 3);
        let mut directory = EntityDirectory::default();
        let seen = recording(&mut directory);

        directory.handle_entity_state(&state(id), t0);
        assert_eq!(*seen.borrow(), [Seen::Joined(id)]);
        assert_eq!(directory.len(), 1);

        directory.handle_entity_state(&state(id), t0 + Duration::from_secs(10));
        assert_eq!(seen.borrow().last(), Some(&Seen::Updated(id)));

        assert_eq!(directory.expire(t0 + Duration::from_secs(24)), 0);
        assert!(directory.contains(&id));

        assert_eq!(directory.expire(t0 + Duration::from_secs(25)), 1);
        assert_eq!(seen.borrow().last(), Some(&Seen::Left(id)));
        assert!(directory.get(&id).is_none());

        assert_eq!(directory.expire(t0 + Duration::from_secs(60)), 0);
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_rejoin_after_timeout() {
        let t0 = Instant::now();
        let id = EntityId::new(5, 5, 5);
        let mut directory = EntityDirectory::default();
        let seen = recording(&mut directory);

        directory.handle_entity_state(&state(id), t0);
        directory.expire(t0 + Duration::from_secs(15));
        directory.handle_entity_state(&state(id), t0 + Duration::from_secs(16));

        assert_eq!(
            *seen.borrow(),
            [Seen::Joined(id), Seen::Left(id), Seen::Joined(id)]
        );
    }

    #[test]
    fn test_local_ids_are_never_tracked() {
        let t0 = Instant::now();
        let local = EntityId::new(1, 1, 1);
        let remote = EntityId::new(2, 2, 2);
        let mut directory = EntityDirectory::default();
        let seen = recording(&mut directory);
        directory.set_local_ids([local]);

        directory.handle_entity_state(&state(local), t0);
        directory.handle_entity_state(&state(remote), t0);

        assert!(directory.is_local(&local));
        assert!(!directory.contains(&local));
        assert_eq!(*seen.borrow(), [Seen::Joined(remote)]);
    }

    #[test]
    fn test_update_replaces_state_and_clock() {
        let t0 = Instant::now();
        let id = EntityId::new(1, 2, 3);
        let mut directory = EntityDirectory::default();

        directory.handle_entity_state(&state(id), t0);
        let mut moved = state(id);
        moved.location.x = 42.0;
        directory.handle_entity_state(&moved, t0 + Duration::from_secs(3));

        let entity = directory.get(&id).unwrap();
        assert_eq!(entity.state(), &moved);
        assert_eq!(entity.last_update(), t0 + Duration::from_secs(3));
        assert_eq!(entity.since_update(t0 + Duration::from_secs(5)), Duration::from_secs(2));
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let t0 = Instant::now();
        let mut directory = EntityDirectory::default();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let id = directory.subscribe(move |_| *sink.borrow_mut() += 1);

        directory.handle_entity_state(&state(EntityId::new(1, 1, 1)), t0);
        assert!(directory.unsubscribe(id));
        directory.handle_entity_state(&state(EntityId::new(1, 1, 2)), t0);

        assert_eq!(*seen.borrow(), 1);
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn test_custom_timeout() {
        let t0 = Instant::now();
        let mut directory = EntityDirectory::new(Duration::from_secs(2));
        directory.handle_entity_state(&state(EntityId::new(1, 1, 1)), t0);
        assert_eq!(directory.expire(t0 + Duration::from_millis(1_999)), 0);
        assert_eq!(directory.expire(t0 + Duration::from_secs(2)), 1);
        assert!(directory.is_empty());
    }
}
