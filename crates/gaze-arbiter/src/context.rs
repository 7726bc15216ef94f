//! Explicit shared context handed to every contributor at construction.
//!
//! Holds the two pieces of broadcast state: the frame table and the
//! active-sensor selector. Contributors keep a [`SensorWatch`] and re-derive
//! their reference frame whenever it reports a change.

use std::sync::Arc;

use gaze_models::{FrameId, SensorId};
use tokio::sync::watch;
use tracing::info;

use crate::geometry::SharedFrames;

/// Shared context for all contributors of one driver.
#[derive(Debug, Clone)]
pub struct GazeContext {
    frames: SharedFrames,
    sensor_tx: Arc<watch::Sender<SensorId>>,
}

impl GazeContext {
    /// Create a context with an initial active sensor.
    pub fn new(frames: SharedFrames, active_sensor: SensorId) -> Self {
        let (sensor_tx, _) = watch::channel(active_sensor);
        Self {
            frames,
            sensor_tx: Arc::new(sensor_tx),
        }
    }

    pub fn frames(&self) -> &SharedFrames {
        &self.frames
    }

    /// Currently active perception sensor.
    pub fn active_sensor(&self) -> SensorId {
        self.sensor_tx.borrow().clone()
    }

    /// Neutral frame of the currently active sensor.
    pub fn active_frame(&self) -> FrameId {
        self.sensor_tx.borrow().frame()
    }

    /// Switch the active sensor. Returns false when it was already active.
    pub fn set_active_sensor(&self, sensor: SensorId) -> bool {
        let changed = self.sensor_tx.send_if_modified(|current| {
            if *current == sensor {
                false
            } else {
                *current = sensor.clone();
                true
            }
        });
        if changed {
            info!(sensor = %sensor, "Active sensor switched");
        }
        changed
    }

    /// Subscribe to active-sensor changes.
    pub fn watch_sensor(&self) -> SensorWatch {
        SensorWatch {
            rx: self.sensor_tx.subscribe(),
        }
    }
}

/// Subscription to the active-sensor selector.
#[derive(Debug, Clone)]
pub struct SensorWatch {
    rx: watch::Receiver<SensorId>,
}

impl SensorWatch {
    /// Current sensor without marking it seen.
    pub fn current(&self) -> SensorId {
        self.rx.borrow().clone()
    }

    /// The new sensor if it changed since the last call, marking it seen.
    pub fn changed(&mut self) -> Option<SensorId> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_watch_reports_change_once() {
        let ctx = GazeContext::new(SharedFrames::default(), SensorId::from("head"));
        let mut watch = ctx.watch_sensor();
        assert_eq!(watch.changed(), None);

        assert!(ctx.set_active_sensor(SensorId::from("chest")));
        assert_eq!(watch.changed(), Some(SensorId::from("chest")));
        assert_eq!(watch.changed(), None);
        assert_eq!(ctx.active_frame().as_str(), "camera:chest");
    }

    #[test]
    fn test_same_sensor_is_not_a_change() {
        let ctx = GazeContext::new(SharedFrames::default(), SensorId::from("head"));
        let mut watch = ctx.watch_sensor();
        assert!(!ctx.set_active_sensor(SensorId::from("head")));
        assert_eq!(watch.changed(), None);
    }
}
