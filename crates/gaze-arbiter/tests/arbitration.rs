//! Scenario tests across several contributors sharing one registry.

use gaze_arbiter::contributors::{make_rng, FaceLookAt, LookAround, SoundLookAround, TelepresenceLookAt};
use gaze_arbiter::{
    ArbitrationRegistry, Contributor, GazeContext, LookAroundConfig, PerceptionConfig, SharedFrames, SoundConfig,
    TelepresenceConfig,
};
use gaze_models::{
    DirectionOfArrival, FrameId, FrameStatus, FrameTransform, GazeEvent, PerceivedEntity, PerceptionFeed, Point2,
    Point3, Position, SensorId, Timestamp, Topic,
};

struct World {
    frames: SharedFrames,
    registry: ArbitrationRegistry,
    contributors: Vec<Box<dyn Contributor>>,
}

impl World {
    fn new() -> Self {
        let frames = SharedFrames::default();
        frames.insert(FrameId::from("camera:head"), FrameTransform::translated(Point3::new(0.05, 0.45, 0.0)));
        let ctx = GazeContext::new(frames.clone(), SensorId::from("head"));
        let topic = Topic::look();

        let contributors: Vec<Box<dyn Contributor>> = vec![
            Box::new(LookAround::idle(topic.clone(), LookAroundConfig::idle(), make_rng(Some(1))).unwrap()),
            Box::new(FaceLookAt::new(topic.clone(), PerceptionConfig::default(), ctx.clone())),
            Box::new(SoundLookAround::new(topic.clone(), SoundConfig::default(), ctx)),
            Box::new(TelepresenceLookAt::new(topic, TelepresenceConfig::default())),
        ];

        let mut world = Self {
            registry: ArbitrationRegistry::new(frames.clone()),
            frames,
            contributors,
        };
        for c in world.contributors.iter_mut() {
            c.start(Timestamp::ZERO, &mut world.registry).unwrap();
        }
        world
    }

    fn send(&mut self, event: GazeEvent, ms: u64) {
        if let GazeEvent::FrameStatus(status) = &event {
            self.frames.set_online(&status.frame, status.online);
        }
        for c in self.contributors.iter_mut() {
            // Contributor faults stay contained.
            let _ = c.on_event(&event, Timestamp::from_millis(ms), &mut self.registry);
        }
    }

    fn tick(&mut self, ms: u64) {
        for c in self.contributors.iter_mut() {
            c.on_tick(Timestamp::from_millis(ms), &mut self.registry).unwrap();
        }
    }

    fn winner(&self) -> String {
        self.registry
            .winner(&Topic::look())
            .map(|w| w.contributor)
            .unwrap_or_default()
    }
}

fn faces(ms: u64) -> GazeEvent {
    GazeEvent::Perception {
        sensor: SensorId::from("head"),
        feed: PerceptionFeed::Entities(vec![
            PerceivedEntity::face(1, Point3::new(1.2, 0.0, 0.1), Timestamp::from_millis(ms)),
            PerceivedEntity::face(2, Point3::new(1.5, 0.05, -0.3), Timestamp::from_millis(ms)),
        ]),
    }
}

fn voice(active: bool, azimuth: f64, ms: u64) -> GazeEvent {
    GazeEvent::VoiceActivity {
        active,
        direction: Some(DirectionOfArrival { azimuth_deg: azimuth }),
        time: Timestamp::from_millis(ms),
    }
}

#[test]
fn test_priority_layers_stack_and_unwind() {
    let mut world = World::new();
    assert_eq!(world.winner(), "idle_look_around");

    world.send(faces(100), 100);
    assert_eq!(world.winner(), "face_look_at");

    world.send(voice(true, 45.0, 200), 200);
    assert_eq!(world.winner(), "sound_look_around");

    world.send(GazeEvent::TelepresenceSession { active: true }, 300);
    world.send(
        GazeEvent::TelepresenceClick {
            frame: FrameId::robot(),
            position: Position::Planar(Point2::new(0.1, 0.0)),
            distance: Some(2.0),
            time: Timestamp::from_millis(300),
        },
        300,
    );
    assert_eq!(world.winner(), "telepresence");

    world.send(GazeEvent::TelepresenceSession { active: false }, 400);
    assert_eq!(world.winner(), "sound_look_around");

    // Sound history expires, faces go stale, idle remains.
    world.tick(5300);
    assert_eq!(world.winner(), "idle_look_around");
}

#[test]
fn test_face_tracking_disabled_with_two_faces() {
    let mut world = World::new();
    world.send(faces(10), 10);
    assert_eq!(world.winner(), "face_look_at");

    world.send(GazeEvent::RobotMode { face_tracking: false }, 20);
    assert_eq!(world.winner(), "idle_look_around");
}

#[test]
fn test_sensor_dropout_falls_back_and_recovers() {
    let mut world = World::new();
    world.send(faces(10), 10);
    assert_eq!(world.winner(), "face_look_at");

    let camera = FrameId::from("camera:head");
    world.send(
        GazeEvent::FrameStatus(FrameStatus {
            frame: camera.clone(),
            online: false,
            transform: None,
        }),
        20,
    );
    assert_eq!(world.winner(), "idle_look_around");

    world.send(
        GazeEvent::FrameStatus(FrameStatus {
            frame: camera,
            online: true,
            transform: None,
        }),
        30,
    );
    assert_eq!(world.winner(), "face_look_at");
}

#[test]
fn test_winner_converted_to_robot_frame() {
    let mut world = World::new();
    world.send(
        GazeEvent::Perception {
            sensor: SensorId::from("head"),
            feed: PerceptionFeed::Entities(vec![PerceivedEntity::face(
                9,
                Point3::new(1.0, 0.0, 0.0),
                Timestamp::from_millis(5),
            )]),
        },
        5,
    );
    let (winner, point) = world
        .registry
        .winner_in(&Topic::look(), &FrameId::robot())
        .unwrap()
        .unwrap();
    assert_eq!(winner.candidate.identifier, "face-9");
    assert!(point.distance_to(&Point3::new(1.05, 0.45, 0.0)) < 1e-9);
}
