//! Telepresence look-at: the remote operator's clicks.

use gaze_models::{FeatureClick, FrameId, GazeEvent, LookCandidate, Point3, Position, PriorityClass, Timestamp, Topic};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{Contributor, SlotBinding};
use crate::config::TelepresenceConfig;
use crate::error::{GazeError, GazeResult};
use crate::registry::ArbitrationRegistry;
use crate::telemetry::{self, ContributorDiagnostics};

#[derive(Debug)]
pub struct TelepresenceLookAt {
    config: TelepresenceConfig,
    slot: SlotBinding,
    session_active: bool,
    last_click: Option<Timestamp>,
}

impl TelepresenceLookAt {
    pub fn new(topic: Topic, config: TelepresenceConfig) -> Self {
        Self {
            config,
            slot: SlotBinding::new(topic, "telepresence", PriorityClass::Override),
            session_active: false,
            last_click: None,
        }
    }

    pub fn session_active(&self) -> bool {
        self.session_active
    }

    fn look_at(
        &mut self,
        frame: &FrameId,
        candidate: LookCandidate,
        registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        self.last_click = Some(candidate.sample_time);
        self.slot.set_frame(registry, frame.clone())?;
        self.slot.push(registry, vec![candidate])
    }

    fn on_click(
        &mut self,
        frame: &FrameId,
        position: &Position,
        distance: Option<f64>,
        time: Timestamp,
        registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        if !position.to_point3(1.0).is_finite() {
            telemetry::record_malformed_event("telepresence_click");
            return Err(GazeError::malformed_event("click position is not finite"));
        }
        let candidate = LookCandidate::new("click", *position, time)
            .with_distance(distance.unwrap_or(self.config.default_distance));
        debug!(frame = %frame, "Operator click");
        self.look_at(frame, candidate, registry)
    }

    fn on_feature(&mut self, click: &FeatureClick, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        let Some(center) = feature_center(click) else {
            warn!(shape = %click.shape, points = click.points.len(), "Dropping feature click without usable centre");
            telemetry::record_malformed_event("feature_click");
            return Ok(());
        };
        let candidate = LookCandidate::new(format!("feature-{}", click.shape), center, click.time)
            .with_distance(self.config.default_distance);
        debug!(frame = %click.frame, shape = %click.shape, "Operator feature click");
        self.look_at(&click.frame, candidate, registry)
    }
}

/// Centre point of a clicked feature, by shape.
fn feature_center(click: &FeatureClick) -> Option<Point3> {
    let center = match click.shape.as_str() {
        "rectangle" => Point3::centroid(&click.points),
        "vector" => click.points.first().copied(),
        _ => None,
    }?;
    center.is_finite().then_some(center)
}

impl Contributor for TelepresenceLookAt {
    fn name(&self) -> &str {
        self.slot.name()
    }

    fn start(&mut self, _now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.register(registry, FrameId::robot())?;
        Ok(())
    }

    fn on_event(&mut self, event: &GazeEvent, _now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        match event {
            GazeEvent::TelepresenceSession { active } => {
                if self.session_active != *active {
                    info!(active = *active, "Telepresence session changed");
                }
                self.session_active = *active;
                if !self.session_active {
                    self.slot.clear(registry)?;
                }
                Ok(())
            }
            GazeEvent::TelepresenceClick { .. } | GazeEvent::FeatureClick(_) if !self.session_active => {
                debug!(kind = event.kind(), "Ignoring click outside a telepresence session");
                Ok(())
            }
            GazeEvent::TelepresenceClick {
                frame,
                position,
                distance,
                time,
            } => self.on_click(frame, position, *distance, *time, registry),
            GazeEvent::FeatureClick(click) => self.on_feature(click, registry),
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
                "session_active": self.session_active,
                "last_click": self.last_click,
            }),
        }
    }
}
