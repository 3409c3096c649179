//! Utility re-exports for the clawbot subsystem layer.
//!
//! - `controllers`: the `Subsystem` contract and the drive, elevator and intake mechanisms
//! - `hal`: actuator and heading-sensor seams, units, and simulated devices
//! - `math`: unit conversions for sprockets and differential drives
//! - `motion`: bounded waits on blocking motion commands
//! - `sequence`: data-driven command steps and the sequential runner
//! - `telemetry`: label/value sinks

pub mod config;
pub mod controllers;
pub mod error;
pub mod hal;
pub mod math;
pub mod motion;
pub mod sequence;
pub mod telemetry;

pub use config::RobotConfig;
pub use controllers::{Robot, Subsystem, SubsystemRegistry};
pub use embassy_time::Duration;
pub use error::{ConfigError, SequenceError, SubsystemError};
pub use motion::Outcome;
pub use sequence::{Sequencer, SystemCommand};
pub use telemetry::TelemetrySink;
