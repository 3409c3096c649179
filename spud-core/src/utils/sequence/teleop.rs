//! Driver-control mapping from controller state to commands.

use super::{DriveCommand, ElevatorCommand, IntakeCommand, SystemCommand};
use crate::utils::hal::Direction;

/// Voltage applied to the lift and the claw while their buttons are held.
pub const MANUAL_VOLTS: f64 = 4.0;

/// Snapshot of the controller inputs used by driver control.
///
/// Axes are in percent, -100 to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gamepad {
    /// Right stick horizontal; turns the robot.
    pub axis1: f64,
    /// Left stick vertical; drives forward and back.
    pub axis3: f64,
    pub button_x: bool,
    pub button_b: bool,
    pub button_y: bool,
    pub button_a: bool,
}

/// One tick of driver control: arcade drive, then the lift, then the claw.
///
/// X raises and B lowers the lift; Y opens and A closes the claw. With neither button of a
/// pair held, that mechanism is stopped. X and Y win over B and A.
pub fn teleop_commands(pad: &Gamepad) -> [SystemCommand; 3] {
    let drive = SystemCommand::D(DriveCommand::Arcade {
        linear: pad.axis3,
        rotate: pad.axis1,
    });

    let elevator = SystemCommand::E(match held(pad.button_x, pad.button_b) {
        Some(direction) => ElevatorCommand::SetVoltage {
            direction,
            volts: MANUAL_VOLTS,
        },
        None => ElevatorCommand::Stop,
    });

    let intake = SystemCommand::I(match held(pad.button_y, pad.button_a) {
        Some(direction) => IntakeCommand::SetVoltage {
            direction,
            volts: MANUAL_VOLTS,
        },
        None => IntakeCommand::Stop,
    });

    [drive, elevator, intake]
}

fn held(forward: bool, reverse: bool) -> Option<Direction> {
    if forward {
        Some(Direction::Forward)
    } else if reverse {
        Some(Direction::Reverse)
    } else {
        None
    }
}
