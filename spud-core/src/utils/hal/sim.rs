//! Simulated devices for host-side runs and tests.
//!
//! Each device is a cheap clonable handle over shared state, so a test can hand one clone to a
//! subsystem and inspect the other afterwards. Devices may share a [`Journal`] to record the
//! global order of commands and arrivals across motors.

use alloc::{collections::VecDeque, rc::Rc, vec::Vec};
use core::{
    cell::{Cell, RefCell},
    convert::Infallible,
};

use super::{Actuator, Direction, HeadingSensor, MotionStatus, RotationUnits, VelocityUnits};

/// Command last applied to a simulated actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCommand {
    Voltage { direction: Direction, volts: f64 },
    Velocity { direction: Direction, velocity: f64, units: VelocityUnits },
    Position { degrees: f64 },
    Stop,
}

impl ActuatorCommand {
    /// True when the command produces no motor output.
    pub fn is_zero_output(&self) -> bool {
        match *self {
            ActuatorCommand::Stop => true,
            ActuatorCommand::Voltage { volts, .. } => volts == 0.0,
            ActuatorCommand::Velocity { velocity, .. } => velocity == 0.0,
            ActuatorCommand::Position { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    Command { device: &'static str, command: ActuatorCommand },
    Arrived { device: &'static str },
}

/// Shared, ordered record of events across simulated devices.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<SimEvent>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: SimEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// How long a simulated position move takes, counted in status polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Report `InProgress` this many times, then arrive.
    AfterPolls(u32),
    /// Never arrive.
    Never,
}

#[derive(Debug)]
struct ActuatorState {
    position_deg: f64,
    direction: Direction,
    output: ActuatorCommand,
    target_deg: Option<f64>,
    arrival: Arrival,
    remaining_polls: u32,
    superseded: bool,
    history: Vec<ActuatorCommand>,
}

/// Simulated smart motor.
#[derive(Debug, Clone)]
pub struct SimActuator {
    name: &'static str,
    state: Rc<RefCell<ActuatorState>>,
    journal: Journal,
}

impl SimActuator {
    /// A motor at position zero that arrives on the first status poll.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Rc::new(RefCell::new(ActuatorState {
                position_deg: 0.0,
                direction: Direction::Forward,
                output: ActuatorCommand::Stop,
                target_deg: None,
                arrival: Arrival::AfterPolls(0),
                remaining_polls: 0,
                superseded: false,
                history: Vec::new(),
            })),
            journal: Journal::new(),
        }
    }

    /// Record commands and arrivals into a shared journal.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_arrival(self, arrival: Arrival) -> Self {
        self.state.borrow_mut().arrival = arrival;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set_arrival(&self, arrival: Arrival) {
        self.state.borrow_mut().arrival = arrival;
    }

    /// Teleport the shaft, e.g. to start a scenario mid-travel.
    pub fn set_position_degrees(&self, degrees: f64) {
        self.state.borrow_mut().position_deg = degrees;
    }

    pub fn set_direction(&self, direction: Direction) {
        self.state.borrow_mut().direction = direction;
    }

    pub fn position_degrees(&self) -> f64 {
        self.state.borrow().position_deg
    }

    pub fn output(&self) -> ActuatorCommand {
        self.state.borrow().output
    }

    pub fn target_degrees(&self) -> Option<f64> {
        self.state.borrow().target_deg
    }

    /// Every command applied since construction, oldest first.
    pub fn history(&self) -> Vec<ActuatorCommand> {
        self.state.borrow().history.clone()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    fn apply(&self, command: ActuatorCommand) {
        let mut state = self.state.borrow_mut();
        match command {
            ActuatorCommand::Position { degrees } => {
                if let Some(direction) = Direction::of(degrees - state.position_deg) {
                    state.direction = direction;
                }
                let arrival = state.arrival;
                state.target_deg = Some(degrees);
                state.remaining_polls = match arrival {
                    Arrival::AfterPolls(n) => n,
                    Arrival::Never => 0,
                };
                state.superseded = false;
            }
            ActuatorCommand::Voltage { direction, .. }
            | ActuatorCommand::Velocity { direction, .. } => {
                if state.target_deg.take().is_some() {
                    state.superseded = true;
                }
                state.direction = direction;
            }
            ActuatorCommand::Stop => {
                if state.target_deg.take().is_some() {
                    state.superseded = true;
                }
            }
        }
        state.output = command;
        state.history.push(command);
        drop(state);

        self.journal.push(SimEvent::Command {
            device: self.name,
            command,
        });
    }
}

impl Actuator for SimActuator {
    type Error = Infallible;

    fn spin_voltage(&mut self, direction: Direction, volts: f64) -> Result<(), Self::Error> {
        self.apply(ActuatorCommand::Voltage { direction, volts });
        Ok(())
    }

    fn spin_velocity(
        &mut self,
        direction: Direction,
        velocity: f64,
        units: VelocityUnits,
    ) -> Result<(), Self::Error> {
        self.apply(ActuatorCommand::Velocity {
            direction,
            velocity,
            units,
        });
        Ok(())
    }

    fn spin_to_position(&mut self, position: f64, units: RotationUnits) -> Result<(), Self::Error> {
        self.apply(ActuatorCommand::Position {
            degrees: units.to_degrees(position),
        });
        Ok(())
    }

    fn position(&mut self, units: RotationUnits) -> Result<f64, Self::Error> {
        Ok(units.from_degrees(self.state.borrow().position_deg))
    }

    fn direction(&mut self) -> Result<Direction, Self::Error> {
        Ok(self.state.borrow().direction)
    }

    fn motion_status(&mut self) -> Result<MotionStatus, Self::Error> {
        let mut state = self.state.borrow_mut();
        let Some(target) = state.target_deg else {
            let superseded = state.superseded;
            return Ok(if superseded {
                MotionStatus::Superseded
            } else {
                MotionStatus::Complete
            });
        };

        let arrival = state.arrival;
        let remaining = state.remaining_polls;
        match arrival {
            Arrival::Never => Ok(MotionStatus::InProgress),
            Arrival::AfterPolls(_) if remaining > 0 => {
                state.remaining_polls -= 1;
                Ok(MotionStatus::InProgress)
            }
            Arrival::AfterPolls(_) => {
                state.position_deg = target;
                state.target_deg = None;
                drop(state);
                self.journal.push(SimEvent::Arrived { device: self.name });
                Ok(MotionStatus::Complete)
            }
        }
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.apply(ActuatorCommand::Stop);
        Ok(())
    }
}

/// Simulated limit switch; pressed reads high.
#[derive(Debug, Clone, Default)]
pub struct SimSwitch(Rc<Cell<bool>>);

impl SimSwitch {
    pub fn new(pressed: bool) -> Self {
        Self(Rc::new(Cell::new(pressed)))
    }

    pub fn set_pressed(&self, pressed: bool) {
        self.0.set(pressed);
    }

    pub fn is_pressed(&self) -> bool {
        self.0.get()
    }
}

impl embedded_hal::digital::ErrorType for SimSwitch {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for SimSwitch {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

#[derive(Debug)]
struct HeadingState {
    heading: f64,
    script: VecDeque<f64>,
    calibration_polls: u32,
    calibrating: bool,
}

/// Simulated inertial sensor.
///
/// Readings queued with [`SimHeading::queue_readings`] are returned one per `heading()` call;
/// once drained, the last reading repeats.
#[derive(Debug, Clone)]
pub struct SimHeading(Rc<RefCell<HeadingState>>);

impl SimHeading {
    pub fn new(heading: f64) -> Self {
        Self(Rc::new(RefCell::new(HeadingState {
            heading,
            script: VecDeque::new(),
            calibration_polls: 0,
            calibrating: false,
        })))
    }

    /// Number of `is_calibrating()` polls that report `true` after calibration starts.
    pub fn with_calibration_polls(self, polls: u32) -> Self {
        self.0.borrow_mut().calibration_polls = polls;
        self
    }

    pub fn set_heading(&self, heading: f64) {
        self.0.borrow_mut().heading = heading;
    }

    pub fn queue_readings<I: IntoIterator<Item = f64>>(&self, readings: I) {
        self.0.borrow_mut().script.extend(readings);
    }
}

impl HeadingSensor for SimHeading {
    type Error = Infallible;

    fn heading(&mut self) -> Result<f64, Self::Error> {
        let mut state = self.0.borrow_mut();
        if let Some(next) = state.script.pop_front() {
            state.heading = next;
        }
        Ok(state.heading)
    }

    fn start_calibration(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.calibrating = true;
        state.heading = 0.0;
        Ok(())
    }

    fn is_calibrating(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.calibrating && state.calibration_polls > 0 {
            state.calibration_polls -= 1;
            return Ok(true);
        }
        state.calibrating = false;
        Ok(false)
    }
}
