//! Glances: brief diversions away from a target that has been held too long.
//!
//! The topic counts as idle while the winner computed without the glance
//! slot keeps the same target. Once that has lasted longer than a randomly
//! drawn delay, a point offset from the active sensor's neutral axis is
//! pushed, held for `glance_duration`, then cleared.

use std::time::Duration;

use gaze_models::{FrameId, LookCandidate, Point3, PriorityClass, Timestamp, Topic, Winner};
use rand::rngs::StdRng;
use serde_json::json;
use tracing::debug;

use super::{sample_delay, sample_range, Contributor, SlotBinding};
use crate::config::GlanceConfig;
use crate::context::{GazeContext, SensorWatch};
use crate::error::GazeResult;
use crate::registry::ArbitrationRegistry;
use crate::telemetry::{self, ContributorDiagnostics};

#[derive(Debug)]
pub struct Glances {
    config: GlanceConfig,
    ctx: GazeContext,
    sensor: SensorWatch,
    frame: FrameId,
    slot: SlotBinding,
    rng: StdRng,
    delay: Duration,
    stable_since: Timestamp,
    observed: Option<Winner>,
    glance_until: Option<Timestamp>,
    last_glanced: Option<Timestamp>,
    count: u64,
}

impl Glances {
    pub fn new(topic: Topic, config: GlanceConfig, ctx: GazeContext, rng: StdRng) -> Self {
        let sensor = ctx.watch_sensor();
        let frame = sensor.current().frame();
        Self {
            config,
            ctx,
            sensor,
            frame,
            slot: SlotBinding::new(topic, "glances", PriorityClass::Glance),
            rng,
            delay: Duration::ZERO,
            stable_since: Timestamp::ZERO,
            observed: None,
            glance_until: None,
            last_glanced: None,
            count: 0,
        }
    }

    pub fn last_glanced(&self) -> Option<Timestamp> {
        self.last_glanced
    }

    pub fn is_glancing(&self) -> bool {
        self.glance_until.is_some()
    }

    fn sync_sensor(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        if let Some(sensor) = self.sensor.changed() {
            self.frame = sensor.frame();
            self.slot.set_frame(registry, self.frame.clone())?;
        }
        Ok(())
    }

    fn restart_wait(&mut self, now: Timestamp) {
        self.stable_since = now;
        self.delay = sample_delay(&mut self.rng, self.config.delay_range_ms);
    }

    /// Track whether the rest of the topic kept its target.
    fn observe(&mut self, now: Timestamp, registry: &ArbitrationRegistry) -> GazeResult<()> {
        let current = registry.winner_excluding(self.slot.topic(), &self.slot.handle()?);
        let same = match (&self.observed, &current) {
            (Some(a), Some(b)) => a.same_target(b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.stable_since = now;
        }
        self.observed = current;
        Ok(())
    }

    fn fire(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        if !self.ctx.frames().is_available(&self.frame) {
            debug!(frame = %self.frame, "Glance skipped, sensor frame unavailable");
            self.restart_wait(now);
            return Ok(());
        }

        let y = sample_range(&mut self.rng, self.config.y_offset_range);
        let z = sample_range(&mut self.rng, self.config.z_offset_range);
        self.count += 1;
        let candidate = LookCandidate::new(
            format!("glance-{}", self.count),
            Point3::new(self.config.distance, y, z),
            now,
        );
        self.slot.push(registry, vec![candidate])?;
        self.glance_until = Some(now + self.config.glance_duration());
        self.last_glanced = Some(now);
        telemetry::record_glance();
        debug!(frame = %self.frame, y, z, "Glance fired");
        Ok(())
    }
}

impl Contributor for Glances {
    fn name(&self) -> &str {
        self.slot.name()
    }

    fn start(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.sensor.changed();
        self.frame = self.sensor.current().frame();
        let handle = self.slot.register(registry, self.frame.clone())?;
        self.observed = registry.winner_excluding(self.slot.topic(), &handle);
        self.restart_wait(now);
        Ok(())
    }

    fn on_tick(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.sync_sensor(registry)?;

        if let Some(until) = self.glance_until {
            if now >= until {
                self.slot.clear(registry)?;
                self.glance_until = None;
                self.restart_wait(now);
            }
            return Ok(());
        }

        self.observe(now, registry)?;
        if now.saturating_since(self.stable_since) > self.delay {
            self.fire(now, registry)?;
        }
        Ok(())
    }

    fn on_event(
        &mut self,
        _event: &gaze_models::GazeEvent,
        _now: Timestamp,
        registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        self.sync_sensor(registry)
    }

    fn shutdown(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.release(registry)
    }

    fn diagnostics(&self) -> ContributorDiagnostics {
        ContributorDiagnostics {
            name: self.slot.name().to_string(),
            details: json!({
                "frame": self.frame,
                "glancing": self.is_glancing(),
                "last_glanced": self.last_glanced,
                "delay_ms": self.delay.as_millis() as u64,
                "glances": self.count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributors::make_rng;
    use crate::geometry::SharedFrames;
    use gaze_models::{FrameTransform, SensorId};

    struct Fixture {
        ctx: GazeContext,
        registry: ArbitrationRegistry,
        glances: Glances,
        idle: gaze_models::SlotHandle,
    }

    fn fixture() -> Fixture {
        let frames = SharedFrames::default();
        frames.insert(FrameId::from("camera:head"), FrameTransform::identity());
        frames.insert(FrameId::from("camera:chest"), FrameTransform::identity());
        let ctx = GazeContext::new(frames.clone(), SensorId::from("head"));
        let mut registry = ArbitrationRegistry::new(frames);
        let idle = registry
            .register(Topic::look(), "idle", FrameId::robot(), PriorityClass::Exploration)
            .unwrap();
        registry
            .update(&idle, vec![LookCandidate::new("zone", Point3::new(2.0, 0.0, 0.0), Timestamp::ZERO)])
            .unwrap();

        let config = GlanceConfig {
            delay_range_ms: (500, 500),
            glance_duration_ms: 200,
            ..GlanceConfig::default()
        };
        let mut glances = Glances::new(Topic::look(), config, ctx.clone(), make_rng(Some(9)));
        glances.start(Timestamp::ZERO, &mut registry).unwrap();
        Fixture {
            ctx,
            registry,
            glances,
            idle,
        }
    }

    fn tick(f: &mut Fixture, ms: u64) {
        f.glances.on_tick(Timestamp::from_millis(ms), &mut f.registry).unwrap();
    }

    #[test]
    fn test_glance_fires_after_stable_delay_and_clears() {
        let mut f = fixture();
        tick(&mut f, 400);
        assert!(!f.glances.is_glancing());

        tick(&mut f, 600);
        assert!(f.glances.is_glancing());
        let winner = f.registry.winner(&Topic::look()).unwrap();
        assert_eq!(winner.contributor, "glances");
        assert_eq!(winner.frame.as_str(), "camera:head");

        tick(&mut f, 700);
        assert!(f.glances.is_glancing());
        tick(&mut f, 800);
        assert!(!f.glances.is_glancing());
        assert_eq!(f.registry.winner(&Topic::look()).unwrap().contributor, "idle");
        assert_eq!(f.glances.last_glanced(), Some(Timestamp::from_millis(600)));
    }

    #[test]
    fn test_target_change_resets_wait() {
        let mut f = fixture();
        tick(&mut f, 100);
        f.registry
            .update(
                &f.idle,
                vec![LookCandidate::new("zone-2", Point3::new(2.0, 0.1, 0.0), Timestamp::from_millis(300))],
            )
            .unwrap();
        tick(&mut f, 400);
        tick(&mut f, 800);
        assert!(!f.glances.is_glancing());
        tick(&mut f, 1000);
        assert!(f.glances.is_glancing());
    }

    #[test]
    fn test_offline_sensor_skips_glance() {
        let mut f = fixture();
        f.ctx.frames().set_online(&FrameId::from("camera:head"), false);
        tick(&mut f, 100);
        tick(&mut f, 600);
        assert!(!f.glances.is_glancing());
        assert!(f.glances.last_glanced().is_none());
    }

    #[test]
    fn test_follows_active_sensor() {
        let mut f = fixture();
        f.ctx.set_active_sensor(SensorId::from("chest"));
        tick(&mut f, 100);
        tick(&mut f, 700);
        let winner = f.registry.winner(&Topic::look()).unwrap();
        assert_eq!(winner.frame.as_str(), "camera:chest");
    }
}
