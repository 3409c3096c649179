//! Hardware seams for the clawbot.
//!
//! Every mechanism talks to its motors through [`Actuator`] and to the inertial sensor through
//! [`HeadingSensor`]. Limit switches use `embedded_hal::digital::InputPin` directly, with a high
//! level meaning "pressed". Vendor drivers implement these traits on the robot; the [`sim`] module
//! implements them on the host.

pub mod sim;

use serde::{Deserialize, Serialize};

/// Direction a motor spins or a mechanism travels.
///
/// For the elevator, `Forward` extends (raises) the lift and `Reverse` retracts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// Direction of travel implied by the sign of `delta`, or `None` for no travel.
    pub fn of(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(Direction::Forward)
        } else if delta < 0.0 {
            Some(Direction::Reverse)
        } else {
            None
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// `1.0` for forward, `-1.0` for reverse.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

/// Direction of an in-place turn. Heading grows clockwise, so a right turn increases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnits {
    Mm,
    Cm,
    Inches,
}

impl DistanceUnits {
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            DistanceUnits::Mm => value,
            DistanceUnits::Cm => value * 10.0,
            DistanceUnits::Inches => value * 25.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationUnits {
    Degrees,
    Revolutions,
}

impl RotationUnits {
    pub fn to_degrees(self, value: f64) -> f64 {
        match self {
            RotationUnits::Degrees => value,
            RotationUnits::Revolutions => value * 360.0,
        }
    }

    pub fn from_degrees(self, degrees: f64) -> f64 {
        match self {
            RotationUnits::Degrees => degrees,
            RotationUnits::Revolutions => degrees / 360.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityUnits {
    /// Percent of the motor's maximum velocity.
    Percent,
    Rpm,
    /// Degrees per second.
    Dps,
}

/// Progress of the actuator's own closed-loop position controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    /// A position target is still being chased.
    InProgress,
    /// The last position target was reached, or no position target is active.
    Complete,
    /// The position target was replaced by another command before arrival.
    Superseded,
}

/// A smart motor with an internal position/velocity controller.
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Spin open-loop at `volts` in `direction` until another command arrives.
    fn spin_voltage(&mut self, direction: Direction, volts: f64) -> Result<(), Self::Error>;

    /// Spin at a held velocity in `direction` until another command arrives.
    fn spin_velocity(
        &mut self,
        direction: Direction,
        velocity: f64,
        units: VelocityUnits,
    ) -> Result<(), Self::Error>;

    /// Start moving toward an absolute position. Returns as soon as the command is accepted;
    /// progress is reported through [`Actuator::motion_status`].
    fn spin_to_position(&mut self, position: f64, units: RotationUnits) -> Result<(), Self::Error>;

    fn position(&mut self, units: RotationUnits) -> Result<f64, Self::Error>;

    /// Direction the motor is currently commanded to spin in.
    fn direction(&mut self) -> Result<Direction, Self::Error>;

    fn motion_status(&mut self) -> Result<MotionStatus, Self::Error>;

    /// Command zero output.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

impl<T: Actuator + ?Sized> Actuator for &mut T {
    type Error = T::Error;

    fn spin_voltage(&mut self, direction: Direction, volts: f64) -> Result<(), Self::Error> {
        T::spin_voltage(self, direction, volts)
    }

    fn spin_velocity(
        &mut self,
        direction: Direction,
        velocity: f64,
        units: VelocityUnits,
    ) -> Result<(), Self::Error> {
        T::spin_velocity(self, direction, velocity, units)
    }

    fn spin_to_position(&mut self, position: f64, units: RotationUnits) -> Result<(), Self::Error> {
        T::spin_to_position(self, position, units)
    }

    fn position(&mut self, units: RotationUnits) -> Result<f64, Self::Error> {
        T::position(self, units)
    }

    fn direction(&mut self) -> Result<Direction, Self::Error> {
        T::direction(self)
    }

    fn motion_status(&mut self) -> Result<MotionStatus, Self::Error> {
        T::motion_status(self)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        T::stop(self)
    }
}

/// Coarse classification of a sensor driver error.
///
/// Sensor drivers rarely share an error type with the motor driver, so subsystems keep only
/// the kind, the same way `embedded_hal::digital::ErrorKind` erases pin errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SensorErrorKind {
    /// The bus or link to the sensor failed.
    Communication,
    /// The sensor is still calibrating or has not produced a reading yet.
    NotReady,
    Other,
}

impl core::fmt::Display for SensorErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorErrorKind::Communication => f.write_str("communication with the sensor failed"),
            SensorErrorKind::NotReady => f.write_str("sensor not ready"),
            SensorErrorKind::Other => f.write_str("sensor error"),
        }
    }
}

/// Error returned by a sensor driver.
pub trait SensorError: core::fmt::Debug {
    fn kind(&self) -> SensorErrorKind;
}

impl SensorError for core::convert::Infallible {
    fn kind(&self) -> SensorErrorKind {
        match *self {}
    }
}

impl SensorError for SensorErrorKind {
    fn kind(&self) -> SensorErrorKind {
        *self
    }
}

/// Inertial heading source.
///
/// Heading is reported in degrees within `[0, 360)`, increasing clockwise, zeroed by the
/// sensor's own calibration.
pub trait HeadingSensor {
    type Error: SensorError;

    fn heading(&mut self) -> Result<f64, Self::Error>;

    /// Begin the one-time calibration routine.
    fn start_calibration(&mut self) -> Result<(), Self::Error>;

    fn is_calibrating(&mut self) -> Result<bool, Self::Error>;
}

impl<T: HeadingSensor + ?Sized> HeadingSensor for &mut T {
    type Error = T::Error;

    fn heading(&mut self) -> Result<f64, Self::Error> {
        T::heading(self)
    }

    fn start_calibration(&mut self) -> Result<(), Self::Error> {
        T::start_calibration(self)
    }

    fn is_calibrating(&mut self) -> Result<bool, Self::Error> {
        T::is_calibrating(self)
    }
}
