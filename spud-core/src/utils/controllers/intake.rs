//! Claw-style intake.
//!
//! The claw moves to absolute rotation setpoints. Its open and close range is symmetric and
//! safe, so nothing bounds the setpoint; the surface switch under the claw only reports contact.

use alloc::{format, string::String};

use embedded_hal::{delay::DelayNs, digital::InputPin};

use super::{IntakeControl, MechanismState, Subsystem};
use crate::utils::{
    config::MotionConfig,
    error::{ConfigError, SubsystemError},
    hal::{Actuator, Direction, MotionStatus, RotationUnits},
    motion::{self, Outcome},
    telemetry::TelemetrySink,
};

pub struct Intake<M, S, D> {
    name: String,
    motor: M,
    surface: S,
    delay: D,
    motion: MotionConfig,
    position_setpoint_rotations: f64,
    state: MechanismState,
    label_position: String,
    label_touching: String,
}

impl<M, S, D> Intake<M, S, D>
where
    M: Actuator,
    S: InputPin,
    D: DelayNs,
{
    pub fn new(name: &str, motor: M, surface: S, delay: D) -> Result<Self, ConfigError> {
        ConfigError::require_name(name)?;

        Ok(Self {
            name: String::from(name),
            motor,
            surface,
            delay,
            motion: MotionConfig::default(),
            position_setpoint_rotations: 0.0,
            state: MechanismState::Idle,
            label_position: format!("{name}/POSITION_ROTATIONS"),
            label_touching: format!("{name}/TOUCHING_SURFACE"),
        })
    }

    /// Override the timeout and poll interval used by blocking moves.
    pub fn with_motion(mut self, motion: MotionConfig) -> Result<Self, ConfigError> {
        motion.validate()?;
        self.motion = motion;
        Ok(self)
    }

    pub fn setpoint_rotations(&self) -> f64 {
        self.position_setpoint_rotations
    }

    pub fn state(&self) -> MechanismState {
        self.state
    }

    /// Move the claw to an absolute rotation count.
    ///
    /// With `blocking`, waits for arrival, supersession or the motion timeout; a timed-out move
    /// leaves the motor stopped.
    pub fn set_position_rotations(
        &mut self,
        target: f64,
        blocking: bool,
    ) -> Result<Outcome, SubsystemError<M::Error>> {
        self.position_setpoint_rotations = target;

        let current = self.position_rotations()?;
        let direction = Direction::of(target - current).unwrap_or(Direction::Forward);

        self.motor
            .spin_to_position(target, RotationUnits::Revolutions)
            .map_err(SubsystemError::Actuator)?;
        self.state = MechanismState::Positioning { direction };
        tracing::info!(name = %self.name, target, blocking, "intake moving to position");

        if !blocking {
            return Ok(Outcome::Dispatched);
        }

        let Self {
            motor, delay, motion, ..
        } = self;
        let outcome = motion::await_with(delay, motion, || -> Result<_, SubsystemError<M::Error>> {
            Ok(match motor.motion_status().map_err(SubsystemError::Actuator)? {
                MotionStatus::InProgress => None,
                MotionStatus::Complete => Some(Outcome::Arrived),
                MotionStatus::Superseded => Some(Outcome::Superseded),
            })
        })?;

        if outcome == Outcome::TimedOut {
            self.halt()?;
        } else {
            self.state = MechanismState::Idle;
        }
        Ok(outcome)
    }

    /// Open-loop drive. A negative voltage spins opposite to `direction`.
    pub fn set_voltage(
        &mut self,
        direction: Direction,
        volts: f64,
    ) -> Result<(), SubsystemError<M::Error>> {
        let direction = if volts < 0.0 { direction.opposite() } else { direction };
        let volts = libm::fabs(volts);

        self.motor
            .spin_voltage(direction, volts)
            .map_err(SubsystemError::Actuator)?;
        self.state = if volts == 0.0 {
            MechanismState::Idle
        } else {
            MechanismState::Manual { direction }
        };
        Ok(())
    }

    pub fn position_rotations(&mut self) -> Result<f64, SubsystemError<M::Error>> {
        self.motor
            .position(RotationUnits::Revolutions)
            .map_err(SubsystemError::Actuator)
    }

    pub fn touching_surface(&mut self) -> Result<bool, SubsystemError<M::Error>> {
        self.surface.is_high().map_err(SubsystemError::input)
    }

    pub fn halt(&mut self) -> Result<(), SubsystemError<M::Error>> {
        self.state = MechanismState::Idle;
        self.motor.stop().map_err(SubsystemError::Actuator)
    }
}

impl<M, S, D> Subsystem for Intake<M, S, D>
where
    M: Actuator,
    S: InputPin,
    D: DelayNs,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn periodic(&mut self, telemetry: &mut dyn TelemetrySink) {
        if let MechanismState::Positioning { .. } = self.state {
            match self.motor.motion_status() {
                Ok(MotionStatus::InProgress) => {}
                Ok(_) => self.state = MechanismState::Idle,
                Err(error) => {
                    tracing::error!(name = %self.name, ?error, "failed to poll intake motor")
                }
            }
        }
        self.print_telemetry(telemetry);
    }

    fn print_telemetry(&mut self, telemetry: &mut dyn TelemetrySink) {
        match self.position_rotations() {
            Ok(rotations) => telemetry.write_output(&self.label_position, rotations.into()),
            Err(error) => {
                tracing::error!(name = %self.name, %error, "failed to read intake position")
            }
        }
        match self.touching_surface() {
            Ok(touching) => telemetry.write_output(&self.label_touching, touching.into()),
            Err(error) => {
                tracing::error!(name = %self.name, %error, "failed to read surface switch")
            }
        }
    }

    fn stop(&mut self) {
        if let Err(error) = self.halt() {
            tracing::error!(name = %self.name, %error, "failed to stop intake");
        }
    }
}

impl<M, S, D> IntakeControl for Intake<M, S, D>
where
    M: Actuator,
    S: InputPin,
    D: DelayNs,
{
    type Error = SubsystemError<M::Error>;

    fn set_position_rotations(
        &mut self,
        target: f64,
        blocking: bool,
    ) -> Result<Outcome, Self::Error> {
        Intake::set_position_rotations(self, target, blocking)
    }

    fn set_voltage(&mut self, direction: Direction, volts: f64) -> Result<(), Self::Error> {
        Intake::set_voltage(self, direction, volts)
    }

    fn position_rotations(&mut self) -> Result<f64, Self::Error> {
        Intake::position_rotations(self)
    }

    fn touching_surface(&mut self) -> Result<bool, Self::Error> {
        Intake::touching_surface(self)
    }

    fn as_subsystem(&mut self) -> &mut dyn Subsystem {
        self
    }
}
