//! Shared data models for the gaze arbitration subsystem.
//!
//! This crate provides Serde-serializable types for:
//! - Points, positions and named reference frames
//! - Look-at candidates and arbitration winners
//! - Contributor priority classes and slot handles
//! - The closed set of bus events delivered to contributors

pub mod candidate;
pub mod event;
pub mod frame;
pub mod geometry;
pub mod priority;
pub mod time;
pub mod topic;
pub mod winner;

// Re-export common types
pub use candidate::LookCandidate;
pub use event::{
    DirectionOfArrival, FeatureClick, FrameStatus, FrameTransform, GazeEvent, GazeTargetCommand,
    PerceivedEntity, PerceptionFeed,
};
pub use frame::{FrameId, SensorId};
pub use geometry::{Point2, Point3, Position};
pub use priority::{PriorityClass, SlotHandle};
pub use time::Timestamp;
pub use topic::Topic;
pub use winner::Winner;
