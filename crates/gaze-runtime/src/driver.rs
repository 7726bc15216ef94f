//! Single-threaded gaze driver.
//!
//! One [`GazeDriver::step`] drains the queued bus events into every
//! contributor, ticks the contributors whose period has elapsed, then
//! publishes winner changes. Events queued between steps are handled as a
//! batch at the start of the next step, never in the middle of a tick.

use std::collections::VecDeque;
use std::time::Duration;

use gaze_arbiter::{
    standard_set, telemetry, ArbitrationRegistry, DiagnosticsSnapshot, GazeConfig, GazeContext, Scheduled,
    SharedFrames, WinnerChange,
};
use gaze_models::{FrameTransform, GazeEvent, Timestamp, Topic, Winner};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::RuntimeResult;
use crate::logging::DriverLogger;

struct Entry {
    scheduled: Scheduled,
    next_due: Timestamp,
    faults: u64,
}

impl Entry {
    fn name(&self) -> &str {
        self.scheduled.contributor.name()
    }
}

pub struct GazeDriver {
    ctx: GazeContext,
    registry: ArbitrationRegistry,
    entries: Vec<Entry>,
    queue: VecDeque<GazeEvent>,
    logger: DriverLogger,
    started: bool,
}

impl std::fmt::Debug for GazeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazeDriver")
            .field("contributors", &self.entries.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("queued", &self.queue.len())
            .field("started", &self.started)
            .finish()
    }
}

impl GazeDriver {
    /// Driver with the standard contributor set.
    pub fn new(config: &GazeConfig, frames: SharedFrames) -> RuntimeResult<Self> {
        let ctx = GazeContext::new(frames, config.initial_sensor.clone());
        let contributors = standard_set(config, &ctx)?;
        Ok(Self::with_contributors(ctx, contributors))
    }

    /// Driver with a custom contributor set.
    pub fn with_contributors(ctx: GazeContext, contributors: Vec<Scheduled>) -> Self {
        let registry = ArbitrationRegistry::new(ctx.frames().clone());
        let entries = contributors
            .into_iter()
            .map(|scheduled| Entry {
                scheduled,
                next_due: Timestamp::ZERO,
                faults: 0,
            })
            .collect();
        Self {
            ctx,
            registry,
            entries,
            queue: VecDeque::new(),
            logger: DriverLogger,
            started: false,
        }
    }

    pub fn context(&self) -> &GazeContext {
        &self.ctx
    }

    pub fn registry(&self) -> &ArbitrationRegistry {
        &self.registry
    }

    pub fn subscribe(&mut self, topic: &Topic) -> watch::Receiver<Option<Winner>> {
        self.registry.subscribe(topic)
    }

    pub fn winner(&self, topic: &Topic) -> Option<Winner> {
        self.registry.winner(topic)
    }

    /// Register every contributor and emit initial candidates.
    ///
    /// Registration failures (duplicate slot names) are configuration bugs and abort startup.
    pub fn start(&mut self, now: Timestamp) -> RuntimeResult<()> {
        for entry in self.entries.iter_mut() {
            entry.scheduled.contributor.start(now, &mut self.registry)?;
            entry.next_due = now + entry.scheduled.period;
        }
        self.started = true;
        self.logger.log_start(self.entries.len());
        Ok(())
    }

    /// Queue an event for the next step.
    pub fn enqueue(&mut self, event: GazeEvent) {
        self.queue.push_back(event);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Run one driver step and return the published winner changes.
    pub fn step(&mut self, now: Timestamp) -> Vec<WinnerChange> {
        while let Some(event) = self.queue.pop_front() {
            self.dispatch(&event, now);
        }

        for entry in self.entries.iter_mut() {
            if now < entry.next_due {
                continue;
            }
            entry.next_due = now + entry.scheduled.period;
            if let Err(e) = entry.scheduled.contributor.on_tick(now, &mut self.registry) {
                entry.faults += 1;
                telemetry::record_contributor_fault(entry.scheduled.contributor.name());
                self.logger.log_fault(entry.scheduled.contributor.name(), "tick", &e);
            }
        }

        let changes = self.registry.publish(now);
        for change in &changes {
            self.logger.log_winner(change);
        }
        changes
    }

    /// Apply shared-state events, then hand the event to every contributor.
    fn dispatch(&mut self, event: &GazeEvent, now: Timestamp) {
        debug!(kind = event.kind(), "Dispatching event");
        match event {
            GazeEvent::FrameStatus(status) => {
                let frames = self.ctx.frames();
                if let Some(transform) = status.transform {
                    frames.insert(status.frame.clone(), transform);
                } else if !frames.set_online(&status.frame, status.online) {
                    info!(frame = %status.frame, "Frame registered with identity placement");
                    frames.insert(status.frame.clone(), FrameTransform::identity());
                }
                frames.set_online(&status.frame, status.online);
            }
            GazeEvent::ActiveSensor { sensor } => {
                self.ctx.set_active_sensor(sensor.clone());
            }
            _ => {}
        }

        for entry in self.entries.iter_mut() {
            if let Err(e) = entry.scheduled.contributor.on_event(event, now, &mut self.registry) {
                entry.faults += 1;
                telemetry::record_contributor_fault(entry.scheduled.contributor.name());
                self.logger.log_fault(entry.scheduled.contributor.name(), event.kind(), &e);
            }
        }
    }

    /// Shortest contributor period; the natural upper bound for the step interval.
    pub fn min_period(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.scheduled.period).min()
    }

    /// Contained faults per contributor.
    pub fn faults(&self) -> Vec<(String, u64)> {
        self.entries
            .iter()
            .map(|e| (e.name().to_string(), e.faults))
            .collect()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot::new(
            self.registry.snapshot(),
            self.entries
                .iter()
                .map(|e| e.scheduled.contributor.diagnostics())
                .collect(),
        )
    }

    /// Unregister every contributor. Failures are logged; shutdown always completes.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        for entry in self.entries.iter_mut() {
            if let Err(e) = entry.scheduled.contributor.shutdown(&mut self.registry) {
                entry.faults += 1;
                self.logger.log_fault(entry.scheduled.contributor.name(), "shutdown", &e);
            }
        }
        self.started = false;
        let faults = self.entries.iter().map(|e| e.faults).sum();
        self.logger.log_shutdown(faults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_models::{FrameId, FrameStatus, SensorId};

    fn driver() -> GazeDriver {
        let frames = SharedFrames::default();
        frames.insert(FrameId::from("camera:head"), FrameTransform::identity());
        let config = GazeConfig {
            seed: Some(17),
            ..GazeConfig::default()
        };
        let mut driver = GazeDriver::new(&config, frames).unwrap();
        driver.start(Timestamp::ZERO).unwrap();
        driver
    }

    #[test]
    fn test_first_step_publishes_exploration() {
        let mut driver = driver();
        let changes = driver.step(Timestamp::from_millis(1));
        assert_eq!(changes.len(), 1);
        // Idle and body tie on priority and start time; idle registered first.
        let winner = changes[0].winner.as_ref().unwrap();
        assert_eq!(winner.contributor, "idle_look_around");
    }

    #[test]
    fn test_events_drained_before_tick() {
        let mut driver = driver();
        driver.enqueue(GazeEvent::TelepresenceSession { active: true });
        driver.enqueue(GazeEvent::TelepresenceClick {
            frame: FrameId::robot(),
            position: gaze_models::Point3::new(1.0, 0.0, 0.0).into(),
            distance: None,
            time: Timestamp::from_millis(5),
        });
        assert_eq!(driver.queued(), 2);

        driver.step(Timestamp::from_millis(5));
        assert_eq!(driver.queued(), 0);
        assert_eq!(driver.winner(&Topic::look()).unwrap().contributor, "telepresence");
    }

    #[test]
    fn test_frame_status_and_sensor_switch_update_shared_state() {
        let mut driver = driver();
        driver.enqueue(GazeEvent::FrameStatus(FrameStatus {
            frame: FrameId::from("camera:chest"),
            online: true,
            transform: None,
        }));
        driver.enqueue(GazeEvent::ActiveSensor {
            sensor: SensorId::from("chest"),
        });
        driver.step(Timestamp::from_millis(1));

        assert!(driver.context().frames().is_available(&FrameId::from("camera:chest")));
        assert_eq!(driver.context().active_sensor(), SensorId::from("chest"));
    }

    #[test]
    fn test_contributor_fault_is_contained() {
        let mut driver = driver();
        driver.enqueue(GazeEvent::TelepresenceSession { active: true });
        driver.enqueue(GazeEvent::TelepresenceClick {
            frame: FrameId::robot(),
            position: gaze_models::Point3::new(f64::NAN, 0.0, 0.0).into(),
            distance: None,
            time: Timestamp::from_millis(5),
        });
        driver.step(Timestamp::from_millis(5));

        let faults: u64 = driver.faults().iter().map(|(_, n)| n).sum();
        assert_eq!(faults, 1);
        assert!(driver.winner(&Topic::look()).is_some());
    }

    #[test]
    fn test_shutdown_unregisters_all() {
        let mut driver = driver();
        driver.step(Timestamp::from_millis(1));
        driver.shutdown();
        assert_eq!(driver.registry().slot_count(), 0);
        assert!(driver.step(Timestamp::from_millis(2))[0].winner.is_none());
    }

    #[test]
    fn test_diagnostics_cover_all_contributors() {
        let driver = driver();
        let snapshot = driver.diagnostics();
        assert_eq!(snapshot.contributors.len(), 7);
        assert!(serde_json::to_string(&snapshot).unwrap().contains("idle_look_around"));
    }
}
