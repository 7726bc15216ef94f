//! Scan-envelope zones with cooldown.
//!
//! The envelope `(y_range, z_range)` is split into `n_y × n_z` cells. A zone
//! is either available or cooling down; the two sets always partition the
//! grid. Cooldown is fixed, so the cooling queue stays sorted by expiry and
//! only its front ever needs checking.

use std::collections::VecDeque;
use std::time::Duration;

use gaze_models::Timestamp;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

/// One cell of the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub index: usize,
    pub y_range: (f64, f64),
    pub z_range: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct ZoneGrid {
    zones: Vec<Zone>,
    available: Vec<usize>,
    cooling: VecDeque<(Timestamp, usize)>,
    cooldown: Duration,
}

impl ZoneGrid {
    /// Partition the envelope. Zero counts are treated as 1.
    pub fn new(y_range: (f64, f64), z_range: (f64, f64), n_y: usize, n_z: usize, cooldown: Duration) -> Self {
        let n_y = n_y.max(1);
        let n_z = n_z.max(1);
        let dy = (y_range.1 - y_range.0) / n_y as f64;
        let dz = (z_range.1 - z_range.0) / n_z as f64;

        let mut zones = Vec::with_capacity(n_y * n_z);
        for iy in 0..n_y {
            for iz in 0..n_z {
                // Pin the outer edges so float error never leaves the envelope.
                let y_hi = if iy + 1 == n_y { y_range.1 } else { y_range.0 + dy * (iy + 1) as f64 };
                let z_hi = if iz + 1 == n_z { z_range.1 } else { z_range.0 + dz * (iz + 1) as f64 };
                zones.push(Zone {
                    index: zones.len(),
                    y_range: (y_range.0 + dy * iy as f64, y_hi),
                    z_range: (z_range.0 + dz * iz as f64, z_hi),
                });
            }
        }

        let available = (0..zones.len()).collect();
        Self {
            zones,
            available,
            cooling: VecDeque::new(),
            cooldown,
        }
    }

    /// Return zones whose cooldown has passed to the available set.
    pub fn release_expired(&mut self, now: Timestamp) {
        while let Some(&(expiry, index)) = self.cooling.front() {
            if expiry > now {
                break;
            }
            self.cooling.pop_front();
            self.available.push(index);
        }
    }

    /// Pick an available zone uniformly and put it on cooldown.
    ///
    /// `None` means every zone is cooling; callers fall back to the full envelope.
    pub fn pick(&mut self, now: Timestamp, rng: &mut StdRng) -> Option<Zone> {
        self.release_expired(now);
        if self.available.is_empty() {
            return None;
        }
        let slot = rng.random_range(0..self.available.len());
        let index = self.available.swap_remove(slot);
        self.cooling.push_back((now + self.cooldown, index));
        self.zones.get(index).copied()
    }

    pub fn zone(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn cooling_count(&self) -> usize {
        self.cooling.len()
    }
}
