//! Arbitration winner with provenance.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::candidate::LookCandidate;
use crate::frame::FrameId;
use crate::priority::PriorityClass;
use crate::topic::Topic;

/// The candidate chosen for a topic, and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Winner {
    pub topic: Topic,
    /// Name of the contributor slot that produced the candidate
    pub contributor: String,
    pub priority: PriorityClass,
    /// Frame the candidate position is expressed in
    pub frame: FrameId,
    pub candidate: LookCandidate,
}

impl Winner {
    /// Same producer and same candidate identity (ignores position updates).
    pub fn same_target(&self, other: &Winner) -> bool {
        self.contributor == other.contributor && self.candidate.identifier == other.candidate.identifier
    }
}
