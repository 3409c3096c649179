//! Data-driven command steps.
//!
//! Routines are JSON arrays of [`SystemCommand`]s, tagged the same way at every level:
//! `"ct"` picks the subsystem and `"dc"`, `"ec"` or `"ic"` picks the operation.
//!
//! ```json
//! [
//!   { "ct": "d", "dc": "drive_distance", "direction": "forward", "distance": 12,
//!     "units": "inches" },
//!   { "ct": "d", "dc": "turn_to_angle", "direction": "left", "angle": 90,
//!     "units": "degrees" },
//!   { "ct": "stop_all" }
//! ]
//! ```
//!
//! Driver control produces the same commands from controller input, see [`teleop_commands`].
//! Commands reach the control task through [`COMMAND_CHANNEL`] and are run by a [`Sequencer`].

pub mod runner;
pub mod teleop;

use alloc::vec::Vec;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use serde::{Deserialize, Serialize};

pub use runner::{Sequencer, StepReport};
pub use teleop::{teleop_commands, Gamepad};

use crate::utils::hal::{Direction, DistanceUnits, RotationUnits, TurnDirection, VelocityUnits};

/// Channel used to hand commands to the control task.
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, SystemCommand, 16> = Channel::new();

fn blocking_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ct", rename_all = "snake_case")] // ct = command type
pub enum SystemCommand {
    D(DriveCommand),
    E(ElevatorCommand),
    I(IntakeCommand),
    /// Pause the sequence.
    Wait { ms: u32 },
    /// Stop every subsystem.
    StopAll,
}

/// Serialized with tag `"dc"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dc", rename_all = "snake_case")]
pub enum DriveCommand {
    /// Open-loop arcade mix, both in percent.
    Arcade { linear: f64, rotate: f64 },
    Drive {
        direction: Direction,
        speed: f64,
        units: VelocityUnits,
    },
    DriveDistance {
        direction: Direction,
        distance: f64,
        units: DistanceUnits,
        #[serde(default = "blocking_default")]
        blocking: bool,
    },
    TurnToAngle {
        direction: TurnDirection,
        angle: f64,
        units: RotationUnits,
        #[serde(default = "blocking_default")]
        blocking: bool,
    },
    Stop,
}

/// Serialized with tag `"ec"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ec", rename_all = "snake_case")]
pub enum ElevatorCommand {
    SetPosition {
        mm: f64,
        #[serde(default = "blocking_default")]
        blocking: bool,
    },
    SetVoltage { direction: Direction, volts: f64 },
    SetPower { percent: f64 },
    Stop,
}

/// Serialized with tag `"ic"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ic", rename_all = "snake_case")]
pub enum IntakeCommand {
    SetPosition {
        rotations: f64,
        #[serde(default = "blocking_default")]
        blocking: bool,
    },
    SetVoltage { direction: Direction, volts: f64 },
    Stop,
}

/// Parse a JSON array of commands.
pub fn parse_routine(json: &str) -> Result<Vec<SystemCommand>, serde_json::Error> {
    serde_json::from_str(json)
}
