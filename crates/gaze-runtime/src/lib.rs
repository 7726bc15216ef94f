//! Gaze runtime.
//!
//! This crate provides:
//! - The single-threaded driver that feeds events and ticks to contributors
//! - Environment configuration
//! - Tracing setup
//! - JSON-lines bus adapter for stdin/stdout

pub mod bus;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;

pub use config::RuntimeConfig;
pub use driver::GazeDriver;
pub use error::{RuntimeError, RuntimeResult};
