//! Idle and body look-around.
//!
//! Wanders over the scan envelope, preferring zones that have not been
//! visited recently. The body variant additionally limits how far the
//! vertical coordinate can move between two consecutive points.

use gaze_models::{FrameId, LookCandidate, Point3, PriorityClass, Timestamp, Topic};
use rand::rngs::StdRng;
use serde_json::json;
use tracing::debug;

use super::{sample_delay, sample_range, Contributor, SlotBinding};
use crate::config::LookAroundConfig;
use crate::error::GazeResult;
use crate::registry::ArbitrationRegistry;
use crate::telemetry::{self, ContributorDiagnostics};
use crate::zones::ZoneGrid;

#[derive(Debug)]
pub struct LookAround {
    config: LookAroundConfig,
    slot: SlotBinding,
    grid: ZoneGrid,
    rng: StdRng,
    next_change: Timestamp,
    last_point: Option<Point3>,
    last_zone: Option<usize>,
    picks: u64,
}

impl LookAround {
    pub fn new(name: &'static str, topic: Topic, config: LookAroundConfig, rng: StdRng) -> GazeResult<Self> {
        config.validate()?;
        let grid = ZoneGrid::new(
            config.y_range,
            config.z_range,
            config.n_y,
            config.n_z,
            config.zone_cooldown(),
        );
        Ok(Self {
            slot: SlotBinding::new(topic, name, PriorityClass::Exploration),
            config,
            grid,
            rng,
            next_change: Timestamp::ZERO,
            last_point: None,
            last_zone: None,
            picks: 0,
        })
    }

    /// Eye-level wandering.
    pub fn idle(topic: Topic, config: LookAroundConfig, rng: StdRng) -> GazeResult<Self> {
        Self::new("idle_look_around", topic, config, rng)
    }

    /// Whole-body orientation.
    pub fn body(topic: Topic, config: LookAroundConfig, rng: StdRng) -> GazeResult<Self> {
        Self::new("body_look_around", topic, config, rng)
    }

    pub fn last_point(&self) -> Option<Point3> {
        self.last_point
    }

    pub fn last_zone(&self) -> Option<usize> {
        self.last_zone
    }

    /// Vertical sampling window, limited around the previous point when
    /// `max_y_movement` is set.
    fn vertical_window(&self, zone: (f64, f64)) -> (f64, f64) {
        let (Some(max), Some(last)) = (self.config.max_y_movement, self.last_point) else {
            return zone;
        };
        let (lo, hi) = (last.y - max, last.y + max);
        let clamped = (lo.max(zone.0), hi.min(zone.1));
        if clamped.0 <= clamped.1 {
            return clamped;
        }
        let envelope = self.config.y_range;
        (lo.max(envelope.0), hi.min(envelope.1))
    }

    fn sample_point(&mut self, y_range: (f64, f64), z_range: (f64, f64)) -> Point3 {
        let y_range = self.vertical_window(y_range);
        let y = sample_range(&mut self.rng, y_range);
        let z = sample_range(&mut self.rng, z_range);
        Point3::new(self.config.distance, y, z)
    }

    fn emit(&mut self, point: Point3, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.picks += 1;
        self.last_point = Some(point);
        let candidate = LookCandidate::new(format!("look-{}", self.picks), point, now);
        self.slot.push(registry, vec![candidate])
    }

    fn schedule_next(&mut self, now: Timestamp) {
        self.next_change = now + sample_delay(&mut self.rng, self.config.delay_range_ms);
    }
}

impl Contributor for LookAround {
    fn name(&self) -> &str {
        self.slot.name()
    }

    fn start(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.register(registry, FrameId::robot())?;
        let point = self.sample_point(self.config.y_range, self.config.z_range);
        self.emit(point, now, registry)?;
        self.schedule_next(now);
        Ok(())
    }

    fn on_tick(&mut self, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        if now <= self.next_change {
            return Ok(());
        }

        let (y_range, z_range) = match self.grid.pick(now, &mut self.rng) {
            Some(zone) => {
                self.last_zone = Some(zone.index);
                (zone.y_range, zone.z_range)
            }
            None => {
                self.last_zone = None;
                (self.config.y_range, self.config.z_range)
            }
        };
        telemetry::record_zone_pick(self.slot.name(), self.last_zone, self.grid.cooling_count());

        let point = self.sample_point(y_range, z_range);
        debug!(
            contributor = self.slot.name(),
            zone = ?self.last_zone,
            y = point.y,
            z = point.z,
            "Look-around point chosen"
        );
        self.emit(point, now, registry)?;
        self.schedule_next(now);
        Ok(())
    }

    fn shutdown(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.release(registry)
    }

    fn diagnostics(&self) -> ContributorDiagnostics {
        ContributorDiagnostics {
            name: self.slot.name().to_string(),
            details: json!({
                "zone": self.last_zone,
                "zones": self.grid.len(),
                "cooling": self.grid.cooling_count(),
                "point": self.last_point,
                "next_change": self.next_change,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributors::make_rng;
    use crate::geometry::SharedFrames;

    fn run(config: LookAroundConfig, ticks: u64, step_ms: u64) -> Vec<(Timestamp, Point3, Option<usize>)> {
        let mut registry = ArbitrationRegistry::new(SharedFrames::default());
        let mut look = LookAround::idle(Topic::look(), config, make_rng(Some(5))).unwrap();
        look.start(Timestamp::ZERO, &mut registry).unwrap();

        let mut points = vec![(Timestamp::ZERO, look.last_point().unwrap(), None)];
        for i in 1..=ticks {
            let now = Timestamp::from_millis(i * step_ms);
            let before = look.picks;
            look.on_tick(now, &mut registry).unwrap();
            if look.picks != before {
                points.push((now, look.last_point().unwrap(), look.last_zone()));
            }
        }
        points
    }

    #[test]
    fn test_points_stay_inside_envelope() {
        for (n_y, n_z) in [(1, 1), (1, 3), (2, 4), (5, 1), (3, 3)] {
            let config = LookAroundConfig {
                n_y,
                n_z,
                delay_range_ms: (10, 50),
                zone_cooldown_ms: 200,
                ..LookAroundConfig::idle()
            };
            let (y, z) = (config.y_range, config.z_range);
            for (_, p, _) in run(config, 500, 10) {
                assert!(p.y >= y.0 && p.y <= y.1, "y {} outside {:?}", p.y, y);
                assert!(p.z >= z.0 && p.z <= z.1, "z {} outside {:?}", p.z, z);
            }
        }
    }

    #[test]
    fn test_zone_not_repeated_within_cooldown() {
        let config = LookAroundConfig {
            n_y: 2,
            n_z: 3,
            delay_range_ms: (50, 100),
            zone_cooldown_ms: 1000,
            ..LookAroundConfig::idle()
        };
        let picks = run(config, 2000, 10);
        for (i, (t1, _, z1)) in picks.iter().enumerate() {
            let Some(z1) = z1 else { continue };
            for (t2, _, z2) in &picks[i + 1..] {
                if z2 == &Some(*z1) {
                    assert!(t2.saturating_since(*t1).as_millis() >= 1000);
                }
            }
        }
    }

    #[test]
    fn test_body_vertical_step_bounded() {
        let config = LookAroundConfig {
            delay_range_ms: (10, 30),
            zone_cooldown_ms: 100,
            n_y: 3,
            ..LookAroundConfig::body()
        };
        let max = config.max_y_movement.unwrap();
        let picks = run(config, 1000, 10);
        assert!(picks.len() > 10);
        for pair in picks.windows(2) {
            assert!((pair[1].1.y - pair[0].1.y).abs() <= max + 1e-12);
        }
    }

    #[test]
    fn test_waits_for_next_change() {
        let mut registry = ArbitrationRegistry::new(SharedFrames::default());
        let config = LookAroundConfig {
            delay_range_ms: (1000, 1000),
            ..LookAroundConfig::idle()
        };
        let mut look = LookAround::idle(Topic::look(), config, make_rng(Some(1))).unwrap();
        look.start(Timestamp::ZERO, &mut registry).unwrap();
        let first = look.last_point();

        look.on_tick(Timestamp::from_millis(1000), &mut registry).unwrap();
        assert_eq!(look.last_point(), first);
        look.on_tick(Timestamp::from_millis(1001), &mut registry).unwrap();
        assert_ne!(look.last_point(), first);
        assert!(look.last_zone().is_some());
    }

    #[test]
    fn test_winner_is_sole_candidate() {
        let mut registry = ArbitrationRegistry::new(SharedFrames::default());
        let mut look = LookAround::idle(Topic::look(), LookAroundConfig::idle(), make_rng(Some(2))).unwrap();
        look.start(Timestamp::ZERO, &mut registry).unwrap();
        let winner = registry.winner(&Topic::look()).unwrap();
        assert_eq!(winner.contributor, "idle_look_around");
        assert_eq!(winner.frame, FrameId::robot());

        look.shutdown(&mut registry).unwrap();
        assert!(registry.winner(&Topic::look()).is_none());
    }
}
