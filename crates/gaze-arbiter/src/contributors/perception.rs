//! Face and camera object look-at.
//!
//! One candidate per perceived entity of the active sensor, expressed in that
//! sensor's frame. An offline feed leaves the previous candidates standing
//! until they go stale; an empty feed clears them at once.

use gaze_models::{
    GazeEvent, LookCandidate, PerceivedEntity, PerceptionFeed, PriorityClass, SensorId, Timestamp, Topic,
};
use serde_json::json;
use tracing::{debug, info, trace};

use super::{Contributor, SlotBinding};
use crate::config::PerceptionConfig;
use crate::context::{GazeContext, SensorWatch};
use crate::error::GazeResult;
use crate::geometry::squeeze_toward;
use crate::registry::ArbitrationRegistry;
use crate::telemetry::ContributorDiagnostics;

#[derive(Debug)]
pub struct FaceLookAt {
    config: PerceptionConfig,
    sensor: SensorWatch,
    active: SensorId,
    tracking: bool,
    slot: SlotBinding,
    last_update: Option<Timestamp>,
    tracked: usize,
}

impl FaceLookAt {
    pub fn new(topic: Topic, config: PerceptionConfig, ctx: GazeContext) -> Self {
        let sensor = ctx.watch_sensor();
        let active = sensor.current();
        Self {
            tracking: config.face_tracking,
            config,
            sensor,
            active,
            slot: SlotBinding::new(topic, "face_look_at", PriorityClass::Perception),
            last_update: None,
            tracked: 0,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    fn candidate(&self, entity: &PerceivedEntity) -> LookCandidate {
        let saccades = squeeze_toward(&entity.landmarks, &entity.position, self.config.squeeze);
        LookCandidate::new(format!("{}-{}", entity.kind, entity.id), entity.position, entity.time)
            .with_saccades(saccades)
    }

    fn clear(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.last_update = None;
        self.tracked = 0;
        self.slot.clear(registry)
    }

    /// Follow the active sensor: new frame, old candidates dropped.
    fn sync_sensor(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        if let Some(sensor) = self.sensor.changed() {
            debug!(from = %self.active, to = %sensor, "Perception switching sensor");
            self.active = sensor;
            self.slot.set_frame(registry, self.active.frame())?;
            self.clear(registry)?;
        }
        Ok(())
    }

    fn on_feed(
        &mut self,
        sensor: &SensorId,
        feed: &PerceptionFeed,
        now: Timestamp,
        registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        if *sensor != self.active {
            trace!(sensor = %sensor, "Ignoring perception from inactive sensor");
            return Ok(());
        }
        if !self.tracking {
            return self.clear(registry);
        }

        match feed {
            PerceptionFeed::Offline => {
                trace!(sensor = %sensor, "Perception offline, keeping candidates");
                Ok(())
            }
            PerceptionFeed::Entities(entities) if entities.is_empty() => self.clear(registry),
            PerceptionFeed::Entities(entities) => {
                let candidates: Vec<LookCandidate> = entities
                    .iter()
                    .filter(|e| e.position.is_finite())
                    .map(|e| self.candidate(e))
                    .collect();
                self.tracked = candidates.len();
                self.last_update = Some(now);
                self.slot.push(registry, candidates)
            }
        }
    }
}

impl Contributor for FaceLookAt {
    fn name(&self) -> &str {
        self.slot.name()
    }

    fn start(&mut self, _now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.sensor.changed();
        self.active = self.sensor.current();
        self.slot.register(registry, self.active.frame())?;
        Ok(())
    }

    fn on_tick(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.sync_sensor(registry)?;
        if let Some(last) = self.last_update {
            if now.saturating_since(last) > self.config.stale_after() {
                debug!(sensor = %self.active, "Perception candidates went stale");
                self.clear(registry)?;
            }
        }
        Ok(())
    }

    fn on_event(&mut self, event: &GazeEvent, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.sync_sensor(registry)?;
        match event {
            GazeEvent::RobotMode { face_tracking } => {
                if self.tracking != *face_tracking {
                    info!(enabled = *face_tracking, "Face tracking toggled");
                }
                self.tracking = *face_tracking;
                if !self.tracking {
                    self.clear(registry)?;
                }
                Ok(())
            }
            GazeEvent::Perception { sensor, feed } => self.on_feed(sensor, feed, now, registry),
            _ => Ok(()),
        }
    }

    fn shutdown(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.release(registry)
    }

    fn diagnostics(&self) -> ContributorDiagnostics {
        ContributorDiagnostics {
            name: self.slot.name().to_string(),
            details: json!({
                "sensor": self.active,
                "tracking": self.tracking,
                "entities": self.tracked,
                "last_update": self.last_update,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SharedFrames;
    use gaze_models::{FrameId, FrameTransform, Point3};

    fn setup() -> (GazeContext, ArbitrationRegistry, FaceLookAt) {
        let frames = SharedFrames::default();
        frames.insert(FrameId::from("camera:head"), FrameTransform::identity());
        frames.insert(FrameId::from("camera:chest"), FrameTransform::identity());
        let ctx = GazeContext::new(frames.clone(), SensorId::from("head"));
        let mut registry = ArbitrationRegistry::new(frames);
        let mut face = FaceLookAt::new(Topic::look(), PerceptionConfig::default(), ctx.clone());
        face.start(Timestamp::ZERO, &mut registry).unwrap();
        (ctx, registry, face)
    }

    fn faces(sensor: &str, ids: &[u64], ms: u64) -> GazeEvent {
        GazeEvent::Perception {
            sensor: SensorId::from(sensor),
            feed: PerceptionFeed::Entities(
                ids.iter()
                    .map(|&id| PerceivedEntity::face(id, Point3::new(1.0, 0.1 * id as f64, 0.0), Timestamp::from_millis(ms)))
                    .collect(),
            ),
        }
    }

    fn live(registry: &ArbitrationRegistry) -> usize {
        registry
            .snapshot()
            .topics
            .iter()
            .flat_map(|t| t.slots.iter())
            .filter(|s| s.name == "face_look_at")
            .map(|s| s.candidates.len())
            .sum()
    }

    #[test]
    fn test_one_candidate_per_entity() {
        let (_, mut registry, mut face) = setup();
        face.on_event(&faces("head", &[1, 2], 10), Timestamp::from_millis(10), &mut registry)
            .unwrap();
        assert_eq!(live(&registry), 2);
        let winner = registry.winner(&Topic::look()).unwrap();
        assert!(winner.candidate.identifier.starts_with("face-"));
        assert_eq!(winner.frame.as_str(), "camera:head");
    }

    #[test]
    fn test_disable_tracking_clears_immediately() {
        let (_, mut registry, mut face) = setup();
        face.on_event(&faces("head", &[1, 2], 10), Timestamp::from_millis(10), &mut registry)
            .unwrap();
        face.on_event(&GazeEvent::RobotMode { face_tracking: false }, Timestamp::from_millis(11), &mut registry)
            .unwrap();
        assert_eq!(live(&registry), 0);

        face.on_event(&faces("head", &[3], 20), Timestamp::from_millis(20), &mut registry)
            .unwrap();
        assert_eq!(live(&registry), 0);
    }

    #[test]
    fn test_offline_keeps_empty_clears() {
        let (_, mut registry, mut face) = setup();
        face.on_event(&faces("head", &[1], 10), Timestamp::from_millis(10), &mut registry)
            .unwrap();

        let offline = GazeEvent::Perception {
            sensor: SensorId::from("head"),
            feed: PerceptionFeed::Offline,
        };
        face.on_event(&offline, Timestamp::from_millis(20), &mut registry).unwrap();
        assert_eq!(live(&registry), 1);

        face.on_event(&faces("head", &[], 30), Timestamp::from_millis(30), &mut registry)
            .unwrap();
        assert_eq!(live(&registry), 0);
    }

    #[test]
    fn test_stale_candidates_cleared_on_tick() {
        let (_, mut registry, mut face) = setup();
        face.on_event(&faces("head", &[1], 0), Timestamp::ZERO, &mut registry).unwrap();
        face.on_tick(Timestamp::from_millis(1000), &mut registry).unwrap();
        assert_eq!(live(&registry), 1);
        face.on_tick(Timestamp::from_millis(1600), &mut registry).unwrap();
        assert_eq!(live(&registry), 0);
    }

    #[test]
    fn test_inactive_sensor_ignored_and_switch_clears() {
        let (ctx, mut registry, mut face) = setup();
        face.on_event(&faces("chest", &[1], 10), Timestamp::from_millis(10), &mut registry)
            .unwrap();
        assert_eq!(live(&registry), 0);

        face.on_event(&faces("head", &[1], 10), Timestamp::from_millis(10), &mut registry)
            .unwrap();
        ctx.set_active_sensor(SensorId::from("chest"));
        face.on_event(&faces("chest", &[4], 20), Timestamp::from_millis(20), &mut registry)
            .unwrap();

        let winner = registry.winner(&Topic::look()).unwrap();
        assert_eq!(winner.candidate.identifier, "face-4");
        assert_eq!(winner.frame.as_str(), "camera:chest");
        assert_eq!(live(&registry), 1);
    }

    #[test]
    fn test_saccades_squeezed_toward_centre() {
        let (_, mut registry, mut face) = setup();
        let entity = PerceivedEntity::face(7, Point3::new(1.0, 0.0, 0.0), Timestamp::from_millis(1))
            .with_landmarks(vec![Point3::new(1.0, 0.2, 0.0)]);
        let event = GazeEvent::Perception {
            sensor: SensorId::from("head"),
            feed: PerceptionFeed::Entities(vec![entity]),
        };
        face.on_event(&event, Timestamp::from_millis(1), &mut registry).unwrap();
        let winner = registry.winner(&Topic::look()).unwrap();
        assert_eq!(winner.candidate.identifier, "face-7");
        assert!((winner.candidate.saccade_points[0].y - 0.1).abs() < 1e-9);
    }
}
