//! Look-at contributors.
//!
//! Each contributor owns one behaviour and one registry slot. It is driven
//! through two entry points, [`Contributor::on_tick`] at its own cadence and
//! [`Contributor::on_event`] for every bus event, and only ever touches its
//! own slot. Errors are returned to the driver, which logs them and carries
//! on; they never reach other contributors.

mod gaze_target;
mod glances;
mod look_around;
mod perception;
mod sound;
mod telepresence;

pub use gaze_target::{GazeTargetLookAt, GazeTargetStore, StoredTarget};
pub use glances::Glances;
pub use look_around::LookAround;
pub use perception::FaceLookAt;
pub use sound::{SoundLookAround, SoundObservation};
pub use telepresence::TelepresenceLookAt;

use std::time::Duration;

use gaze_models::{FrameId, GazeEvent, LookCandidate, PriorityClass, SlotHandle, Timestamp, Topic};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::GazeConfig;
use crate::context::GazeContext;
use crate::error::{GazeError, GazeResult};
use crate::registry::ArbitrationRegistry;
use crate::telemetry::ContributorDiagnostics;

/// A behaviour that proposes look-at candidates.
pub trait Contributor: Send {
    /// Slot name, unique within the topic.
    fn name(&self) -> &str;

    /// Register the slot and emit any initial candidate.
    fn start(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()>;

    /// Periodic update.
    fn on_tick(&mut self, _now: Timestamp, _registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        Ok(())
    }

    /// Handle one bus event. Variants the contributor does not care about are ignored.
    fn on_event(
        &mut self,
        _event: &GazeEvent,
        _now: Timestamp,
        _registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        Ok(())
    }

    /// Release the slot.
    fn shutdown(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()>;

    /// Free-form state for diagnostics.
    fn diagnostics(&self) -> ContributorDiagnostics;
}

/// A contributor together with its tick period.
pub struct Scheduled {
    pub contributor: Box<dyn Contributor>,
    pub period: Duration,
}

impl std::fmt::Debug for Scheduled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduled")
            .field("contributor", &self.contributor.name())
            .field("period", &self.period)
            .finish()
    }
}

/// Build the standard contributor set described by `config`.
pub fn standard_set(config: &GazeConfig, ctx: &GazeContext) -> GazeResult<Vec<Scheduled>> {
    config.validate()?;
    let topic = config.topic.clone();
    let schedule = &config.schedule;
    let seed = |offset: u64| config.seed.map(|s| s.wrapping_add(offset));

    Ok(vec![
        scheduled(
            Box::new(LookAround::idle(topic.clone(), config.idle.clone(), make_rng(seed(1)))?),
            schedule.exploration_ms,
        ),
        scheduled(
            Box::new(LookAround::body(topic.clone(), config.body.clone(), make_rng(seed(2)))?),
            schedule.exploration_ms,
        ),
        scheduled(
            Box::new(Glances::new(topic.clone(), config.glances.clone(), ctx.clone(), make_rng(seed(3)))),
            schedule.glances_ms,
        ),
        scheduled(
            Box::new(FaceLookAt::new(topic.clone(), config.perception.clone(), ctx.clone())),
            schedule.perception_ms,
        ),
        scheduled(
            Box::new(SoundLookAround::new(topic.clone(), config.sound.clone(), ctx.clone())),
            schedule.sound_ms,
        ),
        scheduled(
            Box::new(TelepresenceLookAt::new(topic.clone(), config.telepresence.clone())),
            schedule.passive_ms,
        ),
        scheduled(Box::new(GazeTargetLookAt::new(topic, &config.gaze_target)), schedule.passive_ms),
    ])
}

fn scheduled(contributor: Box<dyn Contributor>, period_ms: u64) -> Scheduled {
    Scheduled {
        contributor,
        period: Duration::from_millis(period_ms.max(1)),
    }
}

/// Seeded RNG for reproducible runs, OS entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Uniform sample from `[lo, hi]`; degenerate ranges return `lo`.
pub(crate) fn sample_range(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}

/// Uniform delay from a millisecond range.
pub(crate) fn sample_delay(rng: &mut StdRng, (lo, hi): (u64, u64)) -> Duration {
    let ms = if hi > lo { rng.random_range(lo..=hi) } else { lo };
    Duration::from_millis(ms)
}

/// The registry slot a contributor owns, once started.
#[derive(Debug)]
pub(crate) struct SlotBinding {
    topic: Topic,
    name: &'static str,
    priority: PriorityClass,
    handle: Option<SlotHandle>,
}

impl SlotBinding {
    pub(crate) fn new(topic: Topic, name: &'static str, priority: PriorityClass) -> Self {
        Self {
            topic,
            name,
            priority,
            handle: None,
        }
    }

    pub(crate) fn topic(&self) -> &Topic {
        &self.topic
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn register(&mut self, registry: &mut ArbitrationRegistry, frame: FrameId) -> GazeResult<SlotHandle> {
        let handle = registry.register(self.topic.clone(), self.name, frame, self.priority)?;
        self.handle = Some(handle);
        Ok(handle)
    }

    pub(crate) fn handle(&self) -> GazeResult<SlotHandle> {
        self.handle.ok_or_else(|| GazeError::NotStarted(self.name.to_string()))
    }

    pub(crate) fn push(&self, registry: &mut ArbitrationRegistry, candidates: Vec<LookCandidate>) -> GazeResult<()> {
        registry.update(&self.handle()?, candidates)
    }

    pub(crate) fn clear(&self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        registry.clear(&self.handle()?)
    }

    pub(crate) fn set_frame(&self, registry: &mut ArbitrationRegistry, frame: FrameId) -> GazeResult<()> {
        registry.update_frame(&self.handle()?, frame)
    }

    pub(crate) fn release(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        if let Some(handle) = self.handle.take() {
            registry.unregister(&handle)?;
            debug!(contributor = self.name, "Slot released");
        }
        Ok(())
    }
}
