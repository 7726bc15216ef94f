//! Gaze telemetry.
//!
//! Metrics go through the `metrics` facade; with no recorder installed the
//! macros are no-ops. Diagnostics snapshots are a read-only side channel for
//! observability tooling.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::registry::RegistrySnapshot;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Candidate set replacements by contributor.
    pub const CANDIDATE_UPDATES_TOTAL: &str = "gaze_candidate_updates_total";

    /// Winner changes by topic and contributor.
    pub const WINNER_CHANGES_TOTAL: &str = "gaze_winner_changes_total";

    /// Slots skipped during arbitration because their frame was unavailable.
    pub const FRAME_SKIPS_TOTAL: &str = "gaze_frame_skips_total";

    /// Sound events suppressed as duplicates of a recent source.
    pub const SOUND_SUPPRESSED_TOTAL: &str = "gaze_sound_suppressed_total";

    /// Current sound history length.
    pub const SOUND_HISTORY_LEN: &str = "gaze_sound_history_len";

    /// Exploration zone picks; `zone` is "fallback" when all zones were cooling.
    pub const ZONE_PICKS_TOTAL: &str = "gaze_zone_picks_total";

    /// Zones currently on cooldown.
    pub const ZONES_COOLING: &str = "gaze_zones_cooling";

    /// Glances fired.
    pub const GLANCES_TOTAL: &str = "gaze_glances_total";

    /// Events dropped because their payload could not be interpreted.
    pub const MALFORMED_EVENTS_TOTAL: &str = "gaze_malformed_events_total";

    /// Contained contributor faults by contributor.
    pub const CONTRIBUTOR_FAULTS_TOTAL: &str = "gaze_contributor_faults_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_update(contributor: &str, candidates: usize) {
    counter!(
        names::CANDIDATE_UPDATES_TOTAL,
        "contributor" => contributor.to_string(),
        "empty" => (candidates == 0).to_string()
    )
    .increment(1);
}

pub fn record_winner_change(topic: &str, contributor: Option<&str>) {
    counter!(
        names::WINNER_CHANGES_TOTAL,
        "topic" => topic.to_string(),
        "contributor" => contributor.unwrap_or("none").to_string()
    )
    .increment(1);
}

pub fn record_frame_skip(contributor: &str) {
    counter!(names::FRAME_SKIPS_TOTAL, "contributor" => contributor.to_string()).increment(1);
}

pub fn record_sound_suppressed() {
    counter!(names::SOUND_SUPPRESSED_TOTAL).increment(1);
}

pub fn record_sound_history(len: usize) {
    gauge!(names::SOUND_HISTORY_LEN).set(len as f64);
}

pub fn record_zone_pick(contributor: &str, zone: Option<usize>, cooling: usize) {
    let zone = zone.map(|z| z.to_string()).unwrap_or_else(|| "fallback".to_string());
    counter!(
        names::ZONE_PICKS_TOTAL,
        "contributor" => contributor.to_string(),
        "zone" => zone
    )
    .increment(1);
    gauge!(names::ZONES_COOLING, "contributor" => contributor.to_string()).set(cooling as f64);
}

pub fn record_glance() {
    counter!(names::GLANCES_TOTAL).increment(1);
}

pub fn record_malformed_event(kind: &str) {
    counter!(names::MALFORMED_EVENTS_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_contributor_fault(contributor: &str) {
    counter!(names::CONTRIBUTOR_FAULTS_TOTAL, "contributor" => contributor.to_string()).increment(1);
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Free-form diagnostics of one contributor (chosen zone, sound history, ...).
#[derive(Debug, Clone, Serialize)]
pub struct ContributorDiagnostics {
    pub name: String,
    pub details: serde_json::Value,
}

/// Point-in-time view of the whole subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    pub captured_at: DateTime<Utc>,
    pub registry: RegistrySnapshot,
    pub contributors: Vec<ContributorDiagnostics>,
}

impl DiagnosticsSnapshot {
    pub fn new(registry: RegistrySnapshot, contributors: Vec<ContributorDiagnostics>) -> Self {
        Self {
            captured_at: Utc::now(),
            registry,
            contributors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::CANDIDATE_UPDATES_TOTAL.starts_with("gaze_"));
        assert!(names::WINNER_CHANGES_TOTAL.contains("winner"));
        assert!(names::SOUND_SUPPRESSED_TOTAL.contains("sound"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_update("idle", 1);
        record_zone_pick("idle", None, 4);
        record_winner_change("look", None);
    }
}
