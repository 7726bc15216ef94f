//! Sound look-around.
//!
//! Turns toward the direction of arrival when someone starts speaking. Each
//! remembered source contributes one candidate at face height; a new onset
//! within `angle_threshold_deg` of a remembered source is a duplicate.
//! Sources are forgotten `cooldown` after they were heard; ageing uses the
//! driver clock, the producer's stamp only orders candidates.

use std::collections::VecDeque;

use gaze_models::{
    DirectionOfArrival, FrameId, GazeEvent, LookCandidate, PerceptionFeed, Point3, PriorityClass, Timestamp, Topic,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{Contributor, SlotBinding};
use crate::config::SoundConfig;
use crate::context::GazeContext;
use crate::error::GazeResult;
use crate::geometry::{angle_between_deg, direction_point};
use crate::registry::ArbitrationRegistry;
use crate::telemetry::{self, ContributorDiagnostics};

/// A remembered sound source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoundObservation {
    pub id: u64,
    pub time: Timestamp,
    pub heard_at: Timestamp,
    pub azimuth_deg: f64,
    pub point: Point3,
}

#[derive(Debug)]
pub struct SoundLookAround {
    config: SoundConfig,
    ctx: GazeContext,
    slot: SlotBinding,
    history: VecDeque<SoundObservation>,
    voice_active: bool,
    face_height: Option<f64>,
    next_id: u64,
}

impl SoundLookAround {
    pub fn new(topic: Topic, config: SoundConfig, ctx: GazeContext) -> Self {
        Self {
            config,
            ctx,
            slot: SlotBinding::new(topic, "sound_look_around", PriorityClass::Sound),
            history: VecDeque::new(),
            voice_active: false,
            face_height: None,
            next_id: 0,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &SoundObservation> {
        self.history.iter()
    }

    /// Smoothed face height, or the configured default before any face was seen.
    pub fn face_height(&self) -> f64 {
        self.face_height.unwrap_or(self.config.default_face_height)
    }

    fn publish_history(&self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        let candidates = self
            .history
            .iter()
            .map(|o| LookCandidate::new(format!("sound-{}", o.id), o.point, o.time).with_distance(self.config.distance))
            .collect();
        self.slot.push(registry, candidates)
    }

    /// Forget sources older than the cooldown. Returns true if any was removed.
    fn prune(&mut self, now: Timestamp) -> bool {
        let before = self.history.len();
        let cooldown = self.config.cooldown();
        self.history.retain(|o| now.saturating_since(o.heard_at) <= cooldown);
        telemetry::record_sound_history(self.history.len());
        self.history.len() != before
    }

    fn on_voice(
        &mut self,
        active: bool,
        direction: Option<&DirectionOfArrival>,
        time: Timestamp,
        now: Timestamp,
        registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        let onset = active && !self.voice_active;
        self.voice_active = active;
        if !onset {
            return Ok(());
        }
        let Some(direction) = direction else {
            debug!("Voice onset without direction of arrival");
            return Ok(());
        };
        if !direction.azimuth_deg.is_finite() {
            warn!(azimuth = direction.azimuth_deg, "Dropping voice event with invalid direction");
            telemetry::record_malformed_event("voice_activity");
            return Ok(());
        }

        if self.prune(now) {
            self.publish_history(registry)?;
        }
        let azimuth = direction.azimuth_deg;
        if self
            .history
            .iter()
            .any(|o| angle_between_deg(o.azimuth_deg, azimuth) < self.config.angle_threshold_deg)
        {
            debug!(azimuth, "Sound source already attended, suppressing");
            telemetry::record_sound_suppressed();
            return Ok(());
        }

        self.next_id += 1;
        let point = direction_point(azimuth, self.config.distance, self.face_height());
        self.history.push_back(SoundObservation {
            id: self.next_id,
            time,
            heard_at: now,
            azimuth_deg: azimuth,
            point,
        });
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
        telemetry::record_sound_history(self.history.len());
        debug!(azimuth, height = point.y, "New sound source");
        self.publish_history(registry)
    }

    /// Fold observed entity heights into the face-height estimate.
    fn observe_faces(&mut self, sensor_frame: &FrameId, feed: &PerceptionFeed) {
        let PerceptionFeed::Entities(entities) = feed else {
            return;
        };
        let alpha = self.config.face_height_alpha;
        for entity in entities {
            let Ok(in_robot) = self.ctx.frames().convert(entity.position, sensor_frame, &FrameId::robot()) else {
                continue;
            };
            if !in_robot.y.is_finite() {
                continue;
            }
            self.face_height = Some(match self.face_height {
                Some(h) => h + alpha * (in_robot.y - h),
                None => in_robot.y,
            });
        }
    }
}

impl Contributor for SoundLookAround {
    fn name(&self) -> &str {
        self.slot.name()
    }

    fn start(&mut self, _now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.register(registry, FrameId::robot())?;
        Ok(())
    }

    fn on_tick(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        if self.prune(now) {
            if self.history.is_empty() {
                debug!("Sound history empty, clearing");
            }
            self.publish_history(registry)?;
        }
        Ok(())
    }

    fn on_event(&mut self, event: &GazeEvent, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        match event {
            GazeEvent::VoiceActivity { active, direction, time } => {
                self.on_voice(*active, direction.as_ref(), *time, now, registry)
            }
            GazeEvent::Perception { sensor, feed } => {
                self.observe_faces(&sensor.frame(), feed);
                Ok(())
            }
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
                "history": self.history,
                "voice_active": self.voice_active,
                "face_height": self.face_height(),
            }),
        }
    }
}
