//! Subsystem contract and mechanisms.
//!
//! - `drive`: two-motor differential drivetrain with heading feedback
//! - `elevator`: sprocket-driven lift bounded by upper and lower limit switches
//! - `intake`: claw with a surface-contact switch
//!
//! Every mechanism implements [`Subsystem`] so the control loop can tick, report and stop them
//! uniformly through a [`SubsystemRegistry`].

pub mod drive;
pub mod elevator;
pub mod intake;

use alloc::vec::Vec;
use core::fmt;

pub use drive::Drive;
pub use elevator::Elevator;
pub use intake::Intake;

use crate::utils::{
    hal::{Direction, DistanceUnits, RotationUnits, TurnDirection, VelocityUnits},
    motion::Outcome,
    telemetry::TelemetrySink,
};

/// Capability contract every mechanism implements.
pub trait Subsystem {
    /// Identity used to prefix telemetry labels.
    fn name(&self) -> &str;

    /// Per-tick bookkeeping followed by telemetry. Never blocks.
    fn periodic(&mut self, telemetry: &mut dyn TelemetrySink);

    /// Publish current observable state.
    fn print_telemetry(&mut self, telemetry: &mut dyn TelemetrySink);

    /// Command zero output immediately. Safe to call at any time, any number of times.
    fn stop(&mut self);
}

/// Motion state of a single-axis mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanismState {
    Idle,
    /// Chasing a position target on the actuator's own controller.
    Positioning { direction: Direction },
    /// Spinning open-loop.
    Manual { direction: Direction },
}

impl MechanismState {
    pub fn is_moving(&self) -> bool {
        !matches!(self, MechanismState::Idle)
    }

    /// Direction of travel, if moving.
    pub fn direction(&self) -> Option<Direction> {
        match *self {
            MechanismState::Idle => None,
            MechanismState::Positioning { direction } | MechanismState::Manual { direction } => {
                Some(direction)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MechanismState::Idle => "IDLE",
            MechanismState::Positioning { .. } => "POSITIONING",
            MechanismState::Manual { .. } => "MANUAL",
        }
    }
}

/// Operations the sequencer may issue to a drivetrain.
pub trait DriveControl: Subsystem {
    type Error: fmt::Debug;

    fn arcade_drive(&mut self, linear_pct: f64, rotational_pct: f64) -> Result<(), Self::Error>;

    fn drive(
        &mut self,
        direction: Direction,
        speed: f64,
        units: VelocityUnits,
    ) -> Result<(), Self::Error>;

    fn drive_distance(
        &mut self,
        direction: Direction,
        distance: f64,
        units: DistanceUnits,
        blocking: bool,
    ) -> Result<Outcome, Self::Error>;

    fn turn_to_angle(
        &mut self,
        direction: TurnDirection,
        angle: f64,
        units: RotationUnits,
        blocking: bool,
    ) -> Result<Outcome, Self::Error>;

    fn heading_degrees(&mut self) -> Result<f64, Self::Error>;

    fn as_subsystem(&mut self) -> &mut dyn Subsystem;
}

/// Operations the sequencer may issue to an elevator.
pub trait ElevatorControl: Subsystem {
    type Error: fmt::Debug;

    fn set_position_mm(&mut self, target_mm: f64, blocking: bool) -> Result<Outcome, Self::Error>;

    fn set_voltage(&mut self, direction: Direction, volts: f64) -> Result<Outcome, Self::Error>;

    fn set_power_percent(&mut self, percent: f64) -> Result<Outcome, Self::Error>;

    fn position_mm(&mut self) -> Result<f64, Self::Error>;

    fn at_target(&mut self) -> Result<bool, Self::Error>;

    fn as_subsystem(&mut self) -> &mut dyn Subsystem;
}

/// Operations the sequencer may issue to an intake.
pub trait IntakeControl: Subsystem {
    type Error: fmt::Debug;

    fn set_position_rotations(
        &mut self,
        target: f64,
        blocking: bool,
    ) -> Result<Outcome, Self::Error>;

    fn set_voltage(&mut self, direction: Direction, volts: f64) -> Result<(), Self::Error>;

    fn position_rotations(&mut self) -> Result<f64, Self::Error>;

    fn touching_surface(&mut self) -> Result<bool, Self::Error>;

    fn as_subsystem(&mut self) -> &mut dyn Subsystem;
}

/// Ordered collection of subsystems driven together by the control loop.
#[derive(Default)]
pub struct SubsystemRegistry<'a> {
    entries: Vec<&'a mut dyn Subsystem>,
}

impl<'a> SubsystemRegistry<'a> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append a subsystem; it is ticked after every subsystem registered before it.
    pub fn register(&mut self, subsystem: &'a mut dyn Subsystem) -> &mut Self {
        self.entries.push(subsystem);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.name()).collect()
    }

    pub fn periodic(&mut self, telemetry: &mut dyn TelemetrySink) {
        for subsystem in self.entries.iter_mut() {
            subsystem.periodic(telemetry);
        }
    }

    pub fn print_telemetry(&mut self, telemetry: &mut dyn TelemetrySink) {
        for subsystem in self.entries.iter_mut() {
            subsystem.print_telemetry(telemetry);
        }
    }

    pub fn stop_all(&mut self) {
        for subsystem in self.entries.iter_mut() {
            tracing::info!(name = subsystem.name(), "stopping subsystem");
            subsystem.stop();
        }
    }
}

/// The three mechanisms of the clawbot, borrowed from the wiring layer.
pub struct Robot<'a, E: fmt::Debug> {
    pub drive: &'a mut dyn DriveControl<Error = E>,
    pub elevator: &'a mut dyn ElevatorControl<Error = E>,
    pub intake: &'a mut dyn IntakeControl<Error = E>,
}

impl<'a, E: fmt::Debug> Robot<'a, E> {
    pub fn new(
        drive: &'a mut dyn DriveControl<Error = E>,
        elevator: &'a mut dyn ElevatorControl<Error = E>,
        intake: &'a mut dyn IntakeControl<Error = E>,
    ) -> Self {
        Self {
            drive,
            elevator,
            intake,
        }
    }

    /// Drive, elevator, intake, in that order.
    pub fn registry(&mut self) -> SubsystemRegistry<'_> {
        let mut registry = SubsystemRegistry::new();
        registry
            .register(self.drive.as_subsystem())
            .register(self.elevator.as_subsystem())
            .register(self.intake.as_subsystem());
        registry
    }

    pub fn periodic(&mut self, telemetry: &mut dyn TelemetrySink) {
        self.registry().periodic(telemetry);
    }

    pub fn stop_all(&mut self) {
        self.registry().stop_all();
    }
}
