//! Sequential execution of [`SystemCommand`]s against a [`Robot`].

use alloc::vec::Vec;
use core::fmt;

use embedded_hal::delay::DelayNs;

use super::{DriveCommand, ElevatorCommand, IntakeCommand, SystemCommand};
use crate::utils::{controllers::Robot, error::SequenceError, motion::Outcome};

/// What a single step of a routine ended with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Same numbering as [`SequenceError::step`].
    pub step: usize,
    pub command: SystemCommand,
    pub outcome: Outcome,
}

/// Runs commands one after another; a blocking command finishes before the next starts.
///
/// Every command gets the next step number, whether it came through [`Sequencer::execute`] or
/// [`Sequencer::run`]. A fresh sequencer running one routine numbers steps by their index in it.
pub struct Sequencer<D> {
    delay: D,
    executed: usize,
}

impl<D: DelayNs> Sequencer<D> {
    pub fn new(delay: D) -> Self {
        Self { delay, executed: 0 }
    }

    /// Number of commands executed so far, failed ones included.
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Execute one command and return its outcome as-is.
    pub fn execute<E: fmt::Debug>(
        &mut self,
        robot: &mut Robot<'_, E>,
        command: &SystemCommand,
    ) -> Result<Outcome, SequenceError<E>> {
        self.step(robot, command).map(|(_, outcome)| outcome)
    }

    /// Run a routine to completion.
    ///
    /// Suppressed and superseded steps are logged and the routine carries on. A step that fails
    /// or times out stops every subsystem and aborts the routine.
    pub fn run<E: fmt::Debug>(
        &mut self,
        robot: &mut Robot<'_, E>,
        steps: &[SystemCommand],
    ) -> Result<Vec<StepReport>, SequenceError<E>> {
        let mut reports = Vec::with_capacity(steps.len());

        for command in steps {
            let (step, outcome) = match self.step(robot, command) {
                Ok(done) => done,
                Err(err) => {
                    tracing::error!(step = err.step(), "step failed, stopping all subsystems");
                    robot.stop_all();
                    return Err(err);
                }
            };

            match outcome {
                Outcome::TimedOut => {
                    tracing::error!(step, "step timed out, stopping all subsystems");
                    robot.stop_all();
                    return Err(SequenceError::MotionTimeout { step });
                }
                Outcome::SuppressedAtBound(_)
                | Outcome::StoppedAtBound(_)
                | Outcome::Superseded => {
                    tracing::warn!(step, ?outcome, "step did not complete, continuing");
                }
                Outcome::Dispatched | Outcome::Arrived => {}
            }
            reports.push(StepReport {
                step,
                command: *command,
                outcome,
            });
        }
        Ok(reports)
    }

    /// Number the command, then dispatch it.
    fn step<E: fmt::Debug>(
        &mut self,
        robot: &mut Robot<'_, E>,
        command: &SystemCommand,
    ) -> Result<(usize, Outcome), SequenceError<E>> {
        let step = self.executed;
        self.executed += 1;
        tracing::info!(step, ?command, "running step");

        match self.dispatch(robot, command) {
            Ok(outcome) => Ok((step, outcome)),
            Err(source) => {
                tracing::error!(step, ?source, "step failed");
                Err(SequenceError::Subsystem { step, source })
            }
        }
    }

    fn dispatch<E: fmt::Debug>(
        &mut self,
        robot: &mut Robot<'_, E>,
        command: &SystemCommand,
    ) -> Result<Outcome, E> {
        match *command {
            SystemCommand::D(cmd) => match cmd {
                DriveCommand::Arcade { linear, rotate } => {
                    robot.drive.arcade_drive(linear, rotate)?;
                    Ok(Outcome::Dispatched)
                }
                DriveCommand::Drive {
                    direction,
                    speed,
                    units,
                } => {
                    robot.drive.drive(direction, speed, units)?;
                    Ok(Outcome::Dispatched)
                }
                DriveCommand::DriveDistance {
                    direction,
                    distance,
                    units,
                    blocking,
                } => robot.drive.drive_distance(direction, distance, units, blocking),
                DriveCommand::TurnToAngle {
                    direction,
                    angle,
                    units,
                    blocking,
                } => robot.drive.turn_to_angle(direction, angle, units, blocking),
                DriveCommand::Stop => {
                    robot.drive.stop();
                    Ok(Outcome::Dispatched)
                }
            },
            SystemCommand::E(cmd) => match cmd {
                ElevatorCommand::SetPosition { mm, blocking } => {
                    robot.elevator.set_position_mm(mm, blocking)
                }
                ElevatorCommand::SetVoltage { direction, volts } => {
                    robot.elevator.set_voltage(direction, volts)
                }
                ElevatorCommand::SetPower { percent } => robot.elevator.set_power_percent(percent),
                ElevatorCommand::Stop => {
                    robot.elevator.stop();
                    Ok(Outcome::Dispatched)
                }
            },
            SystemCommand::I(cmd) => match cmd {
                IntakeCommand::SetPosition {
                    rotations,
                    blocking,
                } => robot.intake.set_position_rotations(rotations, blocking),
                IntakeCommand::SetVoltage { direction, volts } => {
                    robot.intake.set_voltage(direction, volts)?;
                    Ok(Outcome::Dispatched)
                }
                IntakeCommand::Stop => {
                    robot.intake.stop();
                    Ok(Outcome::Dispatched)
                }
            },
            SystemCommand::Wait { ms } => {
                self.delay.delay_ms(ms);
                Ok(Outcome::Arrived)
            }
            SystemCommand::StopAll => {
                robot.stop_all();
                Ok(Outcome::Dispatched)
            }
        }
    }
}
