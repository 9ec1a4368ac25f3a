use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use dissim::{
    DetonationPdu, EntityEvent, EntityId, EntityStatePdu, EventReportPdu, Exercise,
    ExerciseConfig, FirePdu, MarkingText, MemoryNetwork, MemoryTransport, PduKind,
    PublisherConfig, SceneEuler, SceneOrigin, ScenePose, Vector3Float,
};
use dissim::pdu::{
    DeadReckoningAlgorithm, DetonationResult, FixedDatumRecord, VariableDatumRecord,
};
use glam::DVec3;

const ORIGIN: SceneOrigin = SceneOrigin::new(32.055304, 34.7564563);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lifecycle {
    Joined(EntityId),
    Updated(EntityId),
    Left(EntityId),
}

fn participant(network: &MemoryNetwork, exercise_id: u8) -> Exercise<MemoryTransport> {
    let config = ExerciseConfig {
        exercise_id,
        scene_origin: ORIGIN,
        ..Default::default()
    };
    Exercise::new(network.endpoint(), config)
}

fn record_lifecycle(exercise: &mut Exercise<MemoryTransport>) -> Rc<RefCell<Vec<Lifecycle>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    exercise.directory_mut().subscribe(move |event| {
        let id = event.entity().id();
        sink.borrow_mut().push(match event {
            EntityEvent::Joined(_) => Lifecycle::Joined(id),
            EntityEvent::Updated(_) => Lifecycle::Updated(id),
            EntityEvent::Left(_) => Lifecycle::Left(id),
        });
    });
    log
}

fn entity(id: EntityId, marking: &str, position: DVec3) -> EntityStatePdu {
    let mut state = EntityStatePdu {
        entity_id: id,
        marking: MarkingText::ascii(marking),
        ..Default::default()
    };
    state.dead_reckoning.algorithm = DeadReckoningAlgorithm::Fpw;
    state.set_scene_pose(
        &ORIGIN,
        &ScenePose {
            position,
            euler: SceneEuler::new(0.0, 90.0, 0.0),
        },
    );
    state
}

fn joins(log: &[Lifecycle]) -> usize {
    log.iter()
        .filter(|event| matches!(event, Lifecycle::Joined(_)))
        .count()
}

#[test]
fn test_participants_discover_each_other() {
    let network = MemoryNetwork::new();
    let mut alice = participant(&network, 1);
    let mut bob = participant(&network, 1);
    let alice_log = record_lifecycle(&mut alice);
    let bob_log = record_lifecycle(&mut bob);

    let a = EntityId::new(1, 1, 1);
    let b = EntityId::new(2, 1, 1);
    alice.add_publisher(entity(a, "ALPHA", DVec3::ZERO), PublisherConfig::default());
    bob.add_publisher(entity(b, "BRAVO", DVec3::new(100.0, 0.0, 0.0)), PublisherConfig::default());

    let t0 = Instant::now();
    alice.tick(t0);
    bob.tick(t0);
    alice.tick(t0 + Duration::from_millis(20));

    assert_eq!(*alice_log.borrow(), [Lifecycle::Joined(b)]);
    assert_eq!(*bob_log.borrow(), [Lifecycle::Joined(a)]);

    let seen_by_alice = alice.directory().get(&b).unwrap();
    assert_eq!(seen_by_alice.state().marking.text, "BRAVO");
    assert!(!alice.directory().contains(&a));
    assert!(!bob.directory().contains(&b));

    let pose = seen_by_alice.scene_pose(t0 + Duration::from_millis(20), alice.scene_origin());
    assert!((pose.position - DVec3::new(100.0, 0.0, 0.0)).length() < 0.01, "{pose:?}");
    assert!(pose.euler.angle_to(&SceneEuler::new(0.0, 90.0, 0.0)) < 0.01);
}

#[test]
fn test_heartbeats_keep_entity_alive_until_publisher_stops() {
    let network = MemoryNetwork::new();
    let mut alice = participant(&network, 1);
    let mut bob = participant(&network, 1);
    let alice_log = record_lifecycle(&mut alice);

    let b = EntityId::new(2, 1, 1);
    let publisher = bob.add_publisher(entity(b, "BRAVO", DVec3::ZERO), PublisherConfig::default());

    let t0 = Instant::now();
    let mut now = t0;
    for _ in 0..60 {
        bob.tick(now);
        alice.tick(now);
        now += Duration::from_secs(1);
    }
    assert!(alice.directory().contains(&b));
    assert_eq!(joins(&alice_log.borrow()), 1);
    let heartbeats = bob.connection().stats().datagrams_sent;
    assert!((12..=13).contains(&heartbeats), "{heartbeats} sends in 60s");

    let last_update = alice.directory().get(&b).unwrap().last_update();
    bob.remove_publisher(publisher);

    while now < last_update + Duration::from_secs(15) {
        bob.tick(now);
        alice.tick(now);
        now += Duration::from_millis(250);
    }
    alice.tick(now);

    assert!(!alice.directory().contains(&b));
    let log = alice_log.borrow();
    assert_eq!(log.last(), Some(&Lifecycle::Left(b)));
    assert_eq!(log.iter().filter(|e| **e == Lifecycle::Left(b)).count(), 1);
}

#[test]
fn test_dead_reckoned_motion_needs_no_updates() {
    let network = MemoryNetwork::new();
    let mut alice = participant(&network, 1);
    let mut bob = participant(&network, 1);

    let a = EntityId::new(1, 1, 1);
    let start = entity(a, "MOVER", DVec3::ZERO);
    let east_step = ORIGIN.scene_to_geocentric(DVec3::new(1.0, 0.0, 0.0));
    let here = ORIGIN.scene_to_geocentric(DVec3::ZERO);
    let velocity = Vector3Float::new(
        ((east_step.x - here.x) * 10.0) as f32,
        ((east_step.y - here.y) * 10.0) as f32,
        ((east_step.z - here.z) * 10.0) as f32,
    );

    let mut state = start.clone();
    state.linear_velocity = velocity;
    let publisher = alice.add_publisher(state, PublisherConfig::default());

    let t0 = Instant::now();
    let mut elapsed = Duration::ZERO;
    while elapsed <= Duration::from_secs(4) {
        let now = t0 + elapsed;
        let position = DVec3::new(10.0 * elapsed.as_secs_f64(), 0.0, 0.0);
        let state = alice.publisher_mut(publisher).unwrap().state_mut();
        state.set_scene_pose(
            &ORIGIN,
            &ScenePose {
                position,
                euler: SceneEuler::new(0.0, 90.0, 0.0),
            },
        );
        alice.tick(now);
        bob.tick(now);
        elapsed += Duration::from_millis(50);
    }

    assert_eq!(alice.connection().stats().datagrams_sent, 1);

    let now = t0 + Duration::from_secs(4);
    let remote = bob.directory().get(&a).unwrap();
    let pose = remote.scene_pose(now, bob.scene_origin());
    assert!((pose.position - DVec3::new(40.0, 0.0, 0.0)).length() < 0.05, "{pose:?}");
}

#[test]
fn test_discrete_change_is_sent_immediately() {
    let network = MemoryNetwork::new();
    let mut alice = participant(&network, 1);
    let mut bob = participant(&network, 1);
    let bob_log = record_lifecycle(&mut bob);

    let a = EntityId::new(1, 1, 1);
    let publisher = alice.add_publisher(entity(a, "ALPHA", DVec3::ZERO), PublisherConfig::default());

    let t0 = Instant::now();
    alice.tick(t0);
    bob.tick(t0);

    alice.publisher_mut(publisher).unwrap().state_mut().marking = MarkingText::ascii("ALPHA-2");
    let t1 = t0 + Duration::from_millis(100);
    alice.tick(t1);
    bob.tick(t1);

    assert_eq!(*bob_log.borrow(), [Lifecycle::Joined(a), Lifecycle::Updated(a)]);
    assert_eq!(bob.directory().get(&a).unwrap().state().marking.text, "ALPHA-2");
}

#[test]
fn test_warfare_and_event_reports_reach_subscribers() {
    let network = MemoryNetwork::new();
    let mut alice = participant(&network, 4);
    let mut bob = participant(&network, 4);

    let log = Rc::new(RefCell::new(Vec::new()));
    let fires = Rc::clone(&log);
    bob.connection_mut()
        .subscribe::<FirePdu>(move |fire| fires.borrow_mut().push(format!("fire {}", fire.range)))
        .unwrap();
    let detonations = Rc::clone(&log);
    bob.connection_mut()
        .subscribe::<DetonationPdu>(move |detonation| {
            detonations
                .borrow_mut()
                .push(format!("detonation {:?}", detonation.result));
        })
        .unwrap();
    let reports = Rc::clone(&log);
    bob.connection_mut()
        .subscribe::<EventReportPdu>(move |report| {
            let payload = String::from_utf8_lossy(&report.variable_datums[0].value).into_owned();
            reports.borrow_mut().push(format!("report {payload}"));
        })
        .unwrap();

    let shooter = EntityId::new(1, 1, 1);
    alice
        .connection_mut()
        .send_body(&FirePdu {
            firing_entity_id: shooter,
            range: 1500.0,
            ..Default::default()
        })
        .unwrap();
    alice
        .connection_mut()
        .send_body(&DetonationPdu {
            firing_entity_id: shooter,
            result: DetonationResult::EntityImpact,
            ..Default::default()
        })
        .unwrap();
    alice
        .connection_mut()
        .send_body(&EventReportPdu {
            originating_entity_id: shooter,
            event_type: 77,
            fixed_datums: vec![FixedDatumRecord { id: 1, value: -5 }],
            variable_datums: vec![VariableDatumRecord {
                id: 2,
                value: b"sector clear".to_vec(),
            }],
            ..Default::default()
        })
        .unwrap();

    bob.tick(Instant::now());

    let mut log = log.borrow().clone();
    log.sort();
    assert_eq!(
        log,
        [
            "detonation EntityImpact",
            "fire 1500",
            "report sector clear",
        ]
    );
    assert_eq!(bob.connection().subscriber_count(PduKind::Fire), 1);
}

#[test]
fn test_other_exercises_are_invisible() {
    let network = MemoryNetwork::new();
    let mut alice = participant(&network, 1);
    let mut mallory = participant(&network, 2);
    let alice_log = record_lifecycle(&mut alice);

    mallory.add_publisher(
        entity(EntityId::new(6, 6, 6), "OTHER", DVec3::ZERO),
        PublisherConfig::default(),
    );

    let t0 = Instant::now();
    mallory.tick(t0);
    alice.tick(t0);

    assert!(alice_log.borrow().is_empty());
    assert!(alice.directory().is_empty());
    assert_eq!(alice.connection().stats().foreign_exercise, 1);
}
