//! Arbitration registry.
//!
//! Per topic, a table of named contributor slots in registration order. Each
//! slot holds the last candidate set its contributor pushed. The winner is
//! recomputed from the union of all slots on demand; the last published
//! winner is kept only to decide whether subscribers need a notification.
//!
//! Selection order:
//! 1. highest [`PriorityClass`] among non-empty slots whose frame is available
//! 2. most recent `sample_time`
//! 3. within a slot, first candidate with the most recent `sample_time`
//! 4. earliest registered slot

use std::collections::{BTreeMap, HashMap};

use gaze_models::{FrameId, LookCandidate, Point3, PriorityClass, SlotHandle, Timestamp, Topic, Winner};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::error::{GazeError, GazeResult};
use crate::geometry::SharedFrames;
use crate::telemetry;

/// Distance used to lift planar winners when converting between frames.
const DEFAULT_LIFT_DISTANCE: f64 = 1.0;

#[derive(Debug)]
struct Slot {
    handle: SlotHandle,
    name: String,
    frame: FrameId,
    priority: PriorityClass,
    candidates: Vec<LookCandidate>,
    frame_skips: u64,
}

impl Slot {
    /// Most recent candidate; the first one wins ties.
    fn freshest(&self) -> Option<&LookCandidate> {
        let mut best: Option<&LookCandidate> = None;
        for candidate in &self.candidates {
            match best {
                Some(b) if candidate.sample_time <= b.sample_time => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}

#[derive(Debug)]
struct TopicTable {
    slots: Vec<Slot>,
    last_winner: Option<Winner>,
    notifier: watch::Sender<Option<Winner>>,
}

impl TopicTable {
    fn new() -> Self {
        let (notifier, _) = watch::channel(None);
        Self {
            slots: Vec::new(),
            last_winner: None,
            notifier,
        }
    }
}

/// A published change of a topic's winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerChange {
    pub topic: Topic,
    pub at: Timestamp,
    pub winner: Option<Winner>,
}

/// Diagnostic view of one slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSnapshot {
    pub name: String,
    pub priority: PriorityClass,
    pub frame: FrameId,
    pub frame_available: bool,
    /// Publishes in which this slot held candidates but its frame was unavailable.
    pub frame_skips: u64,
    pub candidates: Vec<LookCandidate>,
}

/// Diagnostic view of one topic.
#[derive(Debug, Clone, Serialize)]
pub struct TopicSnapshot {
    pub topic: Topic,
    pub slots: Vec<SlotSnapshot>,
    pub winner: Option<Winner>,
}

/// Diagnostic view of every topic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrySnapshot {
    pub topics: Vec<TopicSnapshot>,
}

/// Merges contributor proposals into one winner per topic.
#[derive(Debug)]
pub struct ArbitrationRegistry {
    frames: SharedFrames,
    topics: BTreeMap<Topic, TopicTable>,
    index: HashMap<SlotHandle, Topic>,
}

impl ArbitrationRegistry {
    pub fn new(frames: SharedFrames) -> Self {
        Self {
            frames,
            topics: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn frames(&self) -> &SharedFrames {
        &self.frames
    }

    /// Register a contributor slot on a topic.
    pub fn register(
        &mut self,
        topic: Topic,
        name: impl Into<String>,
        frame: FrameId,
        priority: PriorityClass,
    ) -> GazeResult<SlotHandle> {
        let name = name.into();
        let table = self.topics.entry(topic.clone()).or_insert_with(TopicTable::new);
        if table.slots.iter().any(|s| s.name == name) {
            return Err(GazeError::AlreadyRegistered { topic, name });
        }

        let handle = SlotHandle::new();
        info!(
            topic = %topic,
            contributor = %name,
            frame = %frame,
            priority = %priority,
            "Registered contributor"
        );
        table.slots.push(Slot {
            handle,
            name,
            frame,
            priority,
            candidates: Vec::new(),
            frame_skips: 0,
        });
        self.index.insert(handle, topic);
        Ok(handle)
    }

    fn slot_mut(&mut self, handle: &SlotHandle) -> GazeResult<&mut Slot> {
        let topic = self.index.get(handle).ok_or(GazeError::UnknownSlot(*handle))?;
        self.topics
            .get_mut(topic)
            .and_then(|t| t.slots.iter_mut().find(|s| s.handle == *handle))
            .ok_or(GazeError::UnknownSlot(*handle))
    }

    fn slot(&self, handle: &SlotHandle) -> GazeResult<&Slot> {
        let topic = self.index.get(handle).ok_or(GazeError::UnknownSlot(*handle))?;
        self.topics
            .get(topic)
            .and_then(|t| t.slots.iter().find(|s| s.handle == *handle))
            .ok_or(GazeError::UnknownSlot(*handle))
    }

    /// Replace the slot's candidate set. An empty set clears it.
    pub fn update(&mut self, handle: &SlotHandle, candidates: Vec<LookCandidate>) -> GazeResult<()> {
        let slot = self.slot_mut(handle)?;
        trace!(contributor = %slot.name, count = candidates.len(), "Candidate set replaced");
        telemetry::record_update(&slot.name, candidates.len());
        slot.candidates = candidates;
        Ok(())
    }

    /// Change the slot's frame. Stored candidates are not transformed.
    pub fn update_frame(&mut self, handle: &SlotHandle, frame: FrameId) -> GazeResult<()> {
        let slot = self.slot_mut(handle)?;
        if slot.frame != frame {
            debug!(contributor = %slot.name, from = %slot.frame, to = %frame, "Slot frame changed");
            slot.frame = frame;
        }
        Ok(())
    }

    pub fn clear(&mut self, handle: &SlotHandle) -> GazeResult<()> {
        self.update(handle, Vec::new())
    }

    /// Remove the slot. Its candidates stop competing immediately.
    pub fn unregister(&mut self, handle: &SlotHandle) -> GazeResult<()> {
        let topic = self.index.remove(handle).ok_or(GazeError::UnknownSlot(*handle))?;
        if let Some(table) = self.topics.get_mut(&topic) {
            if let Some(pos) = table.slots.iter().position(|s| s.handle == *handle) {
                let slot = table.slots.remove(pos);
                info!(topic = %topic, contributor = %slot.name, "Unregistered contributor");
            }
        }
        Ok(())
    }

    /// Current candidate set of a slot.
    pub fn candidates(&self, handle: &SlotHandle) -> GazeResult<&[LookCandidate]> {
        Ok(&self.slot(handle)?.candidates)
    }

    /// Current frame of a slot.
    pub fn frame_of(&self, handle: &SlotHandle) -> GazeResult<&FrameId> {
        Ok(&self.slot(handle)?.frame)
    }

    fn select(&self, topic: &Topic, exclude: Option<&SlotHandle>) -> Option<Winner> {
        let table = self.topics.get(topic)?;
        let mut best: Option<(&Slot, &LookCandidate)> = None;

        for slot in &table.slots {
            if exclude == Some(&slot.handle) {
                continue;
            }
            let Some(candidate) = slot.freshest() else {
                continue;
            };
            if !self.frames.is_available(&slot.frame) {
                trace!(contributor = %slot.name, frame = %slot.frame, "Skipping slot with unavailable frame");
                continue;
            }
            // Strictly better only, so earlier registrations keep ties.
            let better = match best {
                None => true,
                Some((b_slot, b_cand)) => {
                    (slot.priority, candidate.sample_time) > (b_slot.priority, b_cand.sample_time)
                }
            };
            if better {
                best = Some((slot, candidate));
            }
        }

        best.map(|(slot, candidate)| Winner {
            topic: topic.clone(),
            contributor: slot.name.clone(),
            priority: slot.priority,
            frame: slot.frame.clone(),
            candidate: candidate.clone(),
        })
    }

    /// The winning candidate of a topic. Unknown or empty topics have none.
    pub fn winner(&self, topic: &Topic) -> Option<Winner> {
        self.select(topic, None)
    }

    /// The winner as if the given slot were empty.
    pub fn winner_excluding(&self, topic: &Topic, handle: &SlotHandle) -> Option<Winner> {
        self.select(topic, Some(handle))
    }

    /// The winner with its position converted into `to_frame`.
    pub fn winner_in(&self, topic: &Topic, to_frame: &FrameId) -> GazeResult<Option<(Winner, Point3)>> {
        let Some(winner) = self.winner(topic) else {
            return Ok(None);
        };
        let distance = winner.candidate.distance.unwrap_or(DEFAULT_LIFT_DISTANCE);
        let point = self
            .frames
            .convert_position(&winner.candidate.position, distance, &winner.frame, to_frame)?;
        Ok(Some((winner, point)))
    }

    /// Receive the topic's winner every time it changes on [`publish`](Self::publish).
    pub fn subscribe(&mut self, topic: &Topic) -> watch::Receiver<Option<Winner>> {
        self.topics
            .entry(topic.clone())
            .or_insert_with(TopicTable::new)
            .notifier
            .subscribe()
    }

    /// Recompute every topic's winner and notify subscribers of changes.
    pub fn publish(&mut self, now: Timestamp) -> Vec<WinnerChange> {
        let topics: Vec<Topic> = self.topics.keys().cloned().collect();
        let mut changes = Vec::new();

        for topic in topics {
            self.count_frame_skips(&topic);
            let winner = self.select(&topic, None);
            let Some(table) = self.topics.get_mut(&topic) else {
                continue;
            };
            if table.last_winner == winner {
                continue;
            }

            let target_changed = match (&table.last_winner, &winner) {
                (Some(a), Some(b)) => !a.same_target(b),
                (None, None) => false,
                _ => true,
            };
            if target_changed {
                info!(
                    topic = %topic,
                    contributor = winner.as_ref().map(|w| w.contributor.as_str()).unwrap_or("none"),
                    identifier = winner.as_ref().map(|w| w.candidate.identifier.as_str()).unwrap_or(""),
                    "Winner changed"
                );
                telemetry::record_winner_change(topic.as_str(), winner.as_ref().map(|w| w.contributor.as_str()));
            }

            table.last_winner = winner.clone();
            table.notifier.send_replace(winner.clone());
            changes.push(WinnerChange {
                topic,
                at: now,
                winner,
            });
        }
        changes
    }

    fn count_frame_skips(&mut self, topic: &Topic) {
        let frames = &self.frames;
        let Some(table) = self.topics.get_mut(topic) else {
            return;
        };
        for slot in table.slots.iter_mut() {
            if !slot.candidates.is_empty() && !frames.is_available(&slot.frame) {
                slot.frame_skips += 1;
                telemetry::record_frame_skip(&slot.name);
            }
        }
    }

    /// Serializable view of every topic and slot.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let topics = self
            .topics
            .iter()
            .map(|(topic, table)| TopicSnapshot {
                topic: topic.clone(),
                slots: table
                    .slots
                    .iter()
                    .map(|s| SlotSnapshot {
                        name: s.name.clone(),
                        priority: s.priority,
                        frame: s.frame.clone(),
                        frame_available: self.frames.is_available(&s.frame),
                        frame_skips: s.frame_skips,
                        candidates: s.candidates.clone(),
                    })
                    .collect(),
                winner: self.select(topic, None),
            })
            .collect();
        RegistrySnapshot { topics }
    }

    /// Number of registered slots across all topics.
    pub fn slot_count(&self) -> usize {
        self.index.len()
    }
}
