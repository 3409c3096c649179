//! Single-stage linear lift driven through a chain sprocket.
//!
//! Heights are given in millimeters of carriage travel and converted to motor degrees with the
//! sprocket's pitch circumference. Two limit switches mark the ends of travel: a command that
//! would drive further into a pressed switch is replaced by a stop and reported as
//! [`Outcome::SuppressedAtBound`].

use alloc::{format, string::String};

use embedded_hal::{delay::DelayNs, digital::InputPin};

use super::{ElevatorControl, MechanismState, Subsystem};
use crate::utils::{
    config::{ElevatorGeometry, MotionConfig},
    error::{ConfigError, SubsystemError},
    hal::{Actuator, Direction, MotionStatus, RotationUnits, VelocityUnits},
    math::conversions::{degrees_to_mm, mm_to_degrees},
    motion::{self, Bound, Outcome},
    telemetry::TelemetrySink,
};

struct Labels {
    position: String,
    at_target: String,
    at_upper: String,
    at_lower: String,
}

/// Limit-switch bounded lift.
pub struct Elevator<M, U, L, D> {
    name: String,
    motor: M,
    upper: U,
    lower: L,
    delay: D,
    geometry: ElevatorGeometry,
    circumference_mm: f64,
    motion: MotionConfig,
    height_setpoint_mm: f64,
    state: MechanismState,
    labels: Labels,
}

/// Switch guarding travel in `direction`, if it is pressed.
fn tripped_bound<U, L, E>(
    upper: &mut U,
    lower: &mut L,
    direction: Direction,
) -> Result<Option<Bound>, SubsystemError<E>>
where
    U: InputPin,
    L: InputPin,
    E: core::fmt::Debug,
{
    match direction {
        Direction::Forward if upper.is_high().map_err(SubsystemError::input)? => {
            Ok(Some(Bound::Upper))
        }
        Direction::Reverse if lower.is_high().map_err(SubsystemError::input)? => {
            Ok(Some(Bound::Lower))
        }
        _ => Ok(None),
    }
}

impl<M, U, L, D> Elevator<M, U, L, D>
where
    M: Actuator,
    U: InputPin,
    L: InputPin,
    D: DelayNs,
{
    /// Bind an elevator to its motor and switches.
    ///
    /// `geometry` falls back to the 12-tooth sprocket on 12.7 mm chain with a 1 mm tolerance.
    pub fn new(
        name: &str,
        motor: M,
        upper: U,
        lower: L,
        delay: D,
        geometry: Option<ElevatorGeometry>,
    ) -> Result<Self, ConfigError> {
        ConfigError::require_name(name)?;
        let geometry = geometry.unwrap_or_default();
        geometry.validate()?;

        Ok(Self {
            name: String::from(name),
            motor,
            upper,
            lower,
            delay,
            circumference_mm: geometry.circumference_mm(),
            geometry,
            motion: MotionConfig::default(),
            height_setpoint_mm: 0.0,
            state: MechanismState::Idle,
            labels: Labels {
                position: format!("{name}/POSITION_MM"),
                at_target: format!("{name}/AT_TARGET"),
                at_upper: format!("{name}/AT_UPPER"),
                at_lower: format!("{name}/AT_LOWER"),
            },
        })
    }

    /// Override the timeout and poll interval used by blocking moves.
    pub fn with_motion(mut self, motion: MotionConfig) -> Result<Self, ConfigError> {
        motion.validate()?;
        self.motion = motion;
        Ok(self)
    }

    pub fn setpoint_mm(&self) -> f64 {
        self.height_setpoint_mm
    }

    pub fn state(&self) -> MechanismState {
        self.state
    }

    pub fn circumference_mm(&self) -> f64 {
        self.circumference_mm
    }

    pub fn geometry(&self) -> &ElevatorGeometry {
        &self.geometry
    }

    /// Move the carriage to `target_mm`.
    ///
    /// The direction of travel is taken from the target relative to the current height; when
    /// they are equal, the motor's reported direction is used instead. If the switch guarding
    /// that direction is pressed, the motor is stopped and `SuppressedAtBound` is returned.
    ///
    /// With `blocking`, waits for arrival, a supersession, a limit switch tripping mid-move, or
    /// the motion timeout. A timed-out or bound-stopped move leaves the motor stopped.
    pub fn set_position_mm(
        &mut self,
        target_mm: f64,
        blocking: bool,
    ) -> Result<Outcome, SubsystemError<M::Error>> {
        self.height_setpoint_mm = target_mm;

        let current_mm = self.position_mm()?;
        let travel = match Direction::of(target_mm - current_mm) {
            Some(direction) => direction,
            None => self.motor.direction().map_err(SubsystemError::Actuator)?,
        };

        if let Some(bound) = tripped_bound(&mut self.upper, &mut self.lower, travel)? {
            tracing::warn!(
                name = %self.name,
                ?bound,
                target_mm,
                "setpoint suppressed at limit switch"
            );
            self.halt()?;
            return Ok(Outcome::SuppressedAtBound(bound));
        }

        let degrees = mm_to_degrees(target_mm, self.circumference_mm);
        self.motor
            .spin_to_position(degrees, RotationUnits::Degrees)
            .map_err(SubsystemError::Actuator)?;
        self.state = MechanismState::Positioning { direction: travel };
        tracing::info!(
            name = %self.name,
            target_mm,
            degrees,
            blocking,
            "elevator moving to height"
        );

        if !blocking {
            return Ok(Outcome::Dispatched);
        }
        self.wait_for_arrival(travel)
    }

    fn wait_for_arrival(&mut self, travel: Direction) -> Result<Outcome, SubsystemError<M::Error>> {
        let Self {
            motor,
            upper,
            lower,
            delay,
            motion,
            ..
        } = self;

        let outcome = motion::await_with(delay, motion, || -> Result<_, SubsystemError<M::Error>> {
            match motor.motion_status().map_err(SubsystemError::Actuator)? {
                MotionStatus::Complete => return Ok(Some(Outcome::Arrived)),
                MotionStatus::Superseded => return Ok(Some(Outcome::Superseded)),
                MotionStatus::InProgress => {}
            }
            Ok(tripped_bound(upper, lower, travel)?.map(Outcome::StoppedAtBound))
        })?;

        match outcome {
            Outcome::TimedOut | Outcome::StoppedAtBound(_) => {
                tracing::warn!(name = %self.name, ?outcome, "elevator move stopped early");
                self.halt()?;
            }
            _ => self.state = MechanismState::Idle,
        }
        Ok(outcome)
    }

    /// Open-loop drive at `volts`, refused when pushing into a pressed switch.
    ///
    /// A negative voltage spins opposite to `direction`. Zero volts stops the motor.
    pub fn set_voltage(
        &mut self,
        direction: Direction,
        volts: f64,
    ) -> Result<Outcome, SubsystemError<M::Error>> {
        let direction = if volts < 0.0 { direction.opposite() } else { direction };
        let volts = libm::fabs(volts);
        if volts == 0.0 {
            self.halt()?;
            return Ok(Outcome::Dispatched);
        }

        if let Some(bound) = tripped_bound(&mut self.upper, &mut self.lower, direction)? {
            tracing::warn!(
                name = %self.name,
                ?bound,
                volts,
                "manual drive suppressed at limit switch"
            );
            self.halt()?;
            return Ok(Outcome::SuppressedAtBound(bound));
        }

        self.motor
            .spin_voltage(direction, volts)
            .map_err(SubsystemError::Actuator)?;
        self.state = MechanismState::Manual { direction };
        Ok(Outcome::Dispatched)
    }

    /// Open-loop drive at a signed percentage of full speed, clamped to ±100.
    pub fn set_power_percent(&mut self, percent: f64) -> Result<Outcome, SubsystemError<M::Error>> {
        let percent = percent.clamp(-100.0, 100.0);
        let Some(direction) = Direction::of(percent) else {
            self.halt()?;
            return Ok(Outcome::Dispatched);
        };

        if let Some(bound) = tripped_bound(&mut self.upper, &mut self.lower, direction)? {
            tracing::warn!(
                name = %self.name,
                ?bound,
                percent,
                "manual drive suppressed at limit switch"
            );
            self.halt()?;
            return Ok(Outcome::SuppressedAtBound(bound));
        }

        self.motor
            .spin_velocity(direction, libm::fabs(percent), VelocityUnits::Percent)
            .map_err(SubsystemError::Actuator)?;
        self.state = MechanismState::Manual { direction };
        Ok(Outcome::Dispatched)
    }

    /// Current carriage height.
    pub fn position_mm(&mut self) -> Result<f64, SubsystemError<M::Error>> {
        let degrees = self
            .motor
            .position(RotationUnits::Degrees)
            .map_err(SubsystemError::Actuator)?;
        Ok(degrees_to_mm(degrees, self.circumference_mm))
    }

    /// True while the carriage is strictly within tolerance of the setpoint.
    pub fn at_target(&mut self) -> Result<bool, SubsystemError<M::Error>> {
        let position = self.position_mm()?;
        Ok(self.within_tolerance(position))
    }

    fn within_tolerance(&self, position_mm: f64) -> bool {
        libm::fabs(position_mm - self.height_setpoint_mm) < self.geometry.tolerance_mm
    }

    pub fn at_upper_bound(&mut self) -> Result<bool, SubsystemError<M::Error>> {
        self.upper.is_high().map_err(SubsystemError::input)
    }

    pub fn at_lower_bound(&mut self) -> Result<bool, SubsystemError<M::Error>> {
        self.lower.is_high().map_err(SubsystemError::input)
    }

    /// Stop the motor and return to idle.
    pub fn halt(&mut self) -> Result<(), SubsystemError<M::Error>> {
        self.state = MechanismState::Idle;
        self.motor.stop().map_err(SubsystemError::Actuator)
    }

    /// Retire finished moves and stop any move that has run into a pressed switch.
    fn watch_bounds(&mut self) -> Result<(), SubsystemError<M::Error>> {
        let direction = match self.state {
            MechanismState::Idle => return Ok(()),
            MechanismState::Positioning { direction } => {
                match self.motor.motion_status().map_err(SubsystemError::Actuator)? {
                    MotionStatus::InProgress => direction,
                    MotionStatus::Complete | MotionStatus::Superseded => {
                        self.state = MechanismState::Idle;
                        return Ok(());
                    }
                }
            }
            MechanismState::Manual { direction } => direction,
        };

        if let Some(bound) = tripped_bound(&mut self.upper, &mut self.lower, direction)? {
            tracing::warn!(
                name = %self.name,
                ?bound,
                "limit switch tripped while moving, stopping"
            );
            self.halt()?;
        }
        Ok(())
    }
}

impl<M, U, L, D> Subsystem for Elevator<M, U, L, D>
where
    M: Actuator,
    U: InputPin,
    L: InputPin,
    D: DelayNs,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn periodic(&mut self, telemetry: &mut dyn TelemetrySink) {
        if let Err(error) = self.watch_bounds() {
            tracing::error!(name = %self.name, %error, "elevator bound check failed");
        }
        self.print_telemetry(telemetry);
    }

    fn print_telemetry(&mut self, telemetry: &mut dyn TelemetrySink) {
        match self.position_mm() {
            Ok(position) => {
                let at_target = self.within_tolerance(position);
                telemetry.write_output(&self.labels.position, position.into());
                telemetry.write_output(&self.labels.at_target, at_target.into());
            }
            Err(error) => {
                tracing::error!(name = %self.name, %error, "failed to read elevator position")
            }
        }
        match self.at_upper_bound() {
            Ok(pressed) => telemetry.write_output(&self.labels.at_upper, pressed.into()),
            Err(error) => {
                tracing::error!(name = %self.name, %error, "failed to read upper limit switch")
            }
        }
        match self.at_lower_bound() {
            Ok(pressed) => telemetry.write_output(&self.labels.at_lower, pressed.into()),
            Err(error) => {
                tracing::error!(name = %self.name, %error, "failed to read lower limit switch")
            }
        }
    }

    fn stop(&mut self) {
        if let Err(error) = self.halt() {
            tracing::error!(name = %self.name, %error, "failed to stop elevator");
        }
    }
}

impl<M, U, L, D> ElevatorControl for Elevator<M, U, L, D>
where
    M: Actuator,
    U: InputPin,
    L: InputPin,
    D: DelayNs,
{
    type Error = SubsystemError<M::Error>;

    fn set_position_mm(&mut self, target_mm: f64, blocking: bool) -> Result<Outcome, Self::Error> {
        Elevator::set_position_mm(self, target_mm, blocking)
    }

    fn set_voltage(&mut self, direction: Direction, volts: f64) -> Result<Outcome, Self::Error> {
        Elevator::set_voltage(self, direction, volts)
    }

    fn set_power_percent(&mut self, percent: f64) -> Result<Outcome, Self::Error> {
        Elevator::set_power_percent(self, percent)
    }

    fn position_mm(&mut self) -> Result<f64, Self::Error> {
        Elevator::position_mm(self)
    }

    fn at_target(&mut self) -> Result<bool, Self::Error> {
        Elevator::at_target(self)
    }

    fn as_subsystem(&mut self) -> &mut dyn Subsystem {
        self
    }
}
