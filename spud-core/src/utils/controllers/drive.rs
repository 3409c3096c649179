//! Two-motor differential ("tank") drivetrain.
//!
//! Distance and turn commands are turned into relative position targets for the wheel motors
//! using the drive geometry, and each motor's own controller chases its target. After a
//! blocking turn the inertial heading is checked and small corrective pivots are issued until
//! the heading is within tolerance.

use alloc::{format, string::String};

use embedded_hal::delay::DelayNs;

use super::{DriveControl, Subsystem};
use crate::utils::{
    config::{DriveGeometry, MotionConfig, TurnConfig},
    error::{ConfigError, SubsystemError},
    hal::{
        Actuator, Direction, DistanceUnits, HeadingSensor, MotionStatus, RotationUnits,
        TurnDirection, VelocityUnits,
    },
    math::conversions::{
        desaturate, heading_error, turn_arc_mm, wheel_travel_to_motor_degrees, wrap_heading,
    },
    motion::{self, Outcome},
    telemetry::TelemetrySink,
};

/// Spin at a signed percentage of full speed.
fn spin_percent<M: Actuator>(motor: &mut M, percent: f64) -> Result<(), M::Error> {
    let direction = Direction::of(percent).unwrap_or(Direction::Forward);
    motor.spin_velocity(direction, libm::fabs(percent), VelocityUnits::Percent)
}

pub struct Drive<L, R, H, D> {
    name: String,
    left: L,
    right: R,
    heading: H,
    delay: D,
    geometry: DriveGeometry,
    motion: MotionConfig,
    turn: TurnConfig,
    label_heading: String,
    label_left: String,
    label_right: String,
}

impl<L, R, H, D> Drive<L, R, H, D>
where
    L: Actuator,
    R: Actuator<Error = L::Error>,
    H: HeadingSensor,
    D: DelayNs,
{
    /// Bind a drivetrain to its motors and inertial sensor.
    ///
    /// The heading sensor must already be calibrated. `geometry` falls back to the clawbot's
    /// 319.19 mm wheels on a 320 mm track.
    pub fn new(
        name: &str,
        left: L,
        right: R,
        heading: H,
        delay: D,
        geometry: Option<DriveGeometry>,
    ) -> Result<Self, ConfigError> {
        ConfigError::require_name(name)?;
        let geometry = geometry.unwrap_or_default();
        geometry.validate()?;

        Ok(Self {
            name: String::from(name),
            left,
            right,
            heading,
            delay,
            geometry,
            motion: MotionConfig::default(),
            turn: TurnConfig::default(),
            label_heading: format!("{name}/HEADING_DEG"),
            label_left: format!("{name}/LEFT_POSITION_DEG"),
            label_right: format!("{name}/RIGHT_POSITION_DEG"),
        })
    }

    pub fn with_motion(mut self, motion: MotionConfig) -> Result<Self, ConfigError> {
        motion.validate()?;
        self.motion = motion;
        Ok(self)
    }

    pub fn with_turn(mut self, turn: TurnConfig) -> Result<Self, ConfigError> {
        turn.validate()?;
        self.turn = turn;
        Ok(self)
    }

    pub fn geometry(&self) -> &DriveGeometry {
        &self.geometry
    }

    /// Open-loop arcade mixing. Both inputs are percentages of full output, clamped to ±100;
    /// the mixed sides are scaled down together if either would exceed 100.
    pub fn arcade_drive(
        &mut self,
        linear_pct: f64,
        rotational_pct: f64,
    ) -> Result<(), SubsystemError<L::Error>> {
        let linear = linear_pct.clamp(-100.0, 100.0);
        let rotational = rotational_pct.clamp(-100.0, 100.0);
        let [left, right] = desaturate([linear + rotational, linear - rotational], 100.0);

        spin_percent(&mut self.left, left).map_err(SubsystemError::Actuator)?;
        spin_percent(&mut self.right, right).map_err(SubsystemError::Actuator)
    }

    /// Drive straight at a held velocity until another command or `stop()`.
    pub fn drive(
        &mut self,
        direction: Direction,
        speed: f64,
        units: VelocityUnits,
    ) -> Result<(), SubsystemError<L::Error>> {
        let direction = if speed < 0.0 { direction.opposite() } else { direction };
        let speed = libm::fabs(speed);
        tracing::info!(name = %self.name, ?direction, speed, ?units, "driving");

        self.left
            .spin_velocity(direction, speed, units)
            .map_err(SubsystemError::Actuator)?;
        self.right
            .spin_velocity(direction, speed, units)
            .map_err(SubsystemError::Actuator)
    }

    /// Drive straight for `distance`. A negative distance travels opposite to `direction`.
    pub fn drive_distance(
        &mut self,
        direction: Direction,
        distance: f64,
        units: DistanceUnits,
        blocking: bool,
    ) -> Result<Outcome, SubsystemError<L::Error>> {
        let distance_mm = units.to_mm(distance) * direction.sign();
        let degrees = wheel_travel_to_motor_degrees(
            distance_mm,
            self.geometry.wheel_circumference_mm(),
            self.geometry.external_gear_ratio,
        );
        tracing::info!(name = %self.name, distance_mm, degrees, blocking, "driving distance");

        self.move_wheels(degrees, degrees, blocking)
    }

    /// Turn in place by `angle`.
    ///
    /// With `blocking`, waits for the wheels to arrive and then corrects against the heading
    /// measured at the start of the turn.
    pub fn turn_to_angle(
        &mut self,
        direction: TurnDirection,
        angle: f64,
        units: RotationUnits,
        blocking: bool,
    ) -> Result<Outcome, SubsystemError<L::Error>> {
        let turn_deg = units.to_degrees(angle) * direction.sign();
        let start = self.heading_degrees()?;
        let target = wrap_heading(start + turn_deg);
        tracing::info!(name = %self.name, start, target, blocking, "turning");

        let outcome = self.pivot(turn_deg, blocking)?;
        if !blocking || outcome != Outcome::Arrived {
            return Ok(outcome);
        }
        self.correct_heading(target)
    }

    pub fn heading_degrees(&mut self) -> Result<f64, SubsystemError<L::Error>> {
        self.heading.heading().map_err(SubsystemError::heading)
    }

    pub fn halt(&mut self) -> Result<(), SubsystemError<L::Error>> {
        let left = self.left.stop().map_err(SubsystemError::Actuator);
        let right = self.right.stop().map_err(SubsystemError::Actuator);
        left.and(right)
    }

    /// Spin in place by a signed angle; positive is clockwise.
    fn pivot(
        &mut self,
        turn_deg: f64,
        blocking: bool,
    ) -> Result<Outcome, SubsystemError<L::Error>> {
        let arc_mm = turn_arc_mm(
            turn_deg,
            self.geometry.track_width_mm(),
            self.geometry.wheel_base_mm(),
        );
        let degrees = wheel_travel_to_motor_degrees(
            arc_mm,
            self.geometry.wheel_circumference_mm(),
            self.geometry.external_gear_ratio,
        );
        self.move_wheels(degrees, -degrees, blocking)
    }

    fn correct_heading(&mut self, target: f64) -> Result<Outcome, SubsystemError<L::Error>> {
        let tolerance = self.turn.heading_tolerance_deg;

        for attempt in 0..self.turn.max_corrections {
            let error = heading_error(self.heading_degrees()?, target);
            if libm::fabs(error) <= tolerance {
                return Ok(Outcome::Arrived);
            }
            tracing::debug!(name = %self.name, attempt, error, "correcting heading");

            let outcome = self.pivot(error, true)?;
            if outcome != Outcome::Arrived {
                return Ok(outcome);
            }
        }

        let error = heading_error(self.heading_degrees()?, target);
        if libm::fabs(error) > tolerance {
            tracing::warn!(
                name = %self.name,
                error,
                "heading still outside tolerance after corrections"
            );
        }
        Ok(Outcome::Arrived)
    }

    /// Offset both wheels from their current positions and optionally wait for both to arrive.
    ///
    /// If the right motor rejects its target after the left one took it, both are stopped.
    fn move_wheels(
        &mut self,
        left_deg: f64,
        right_deg: f64,
        blocking: bool,
    ) -> Result<Outcome, SubsystemError<L::Error>> {
        let left_target = self
            .left
            .position(RotationUnits::Degrees)
            .map_err(SubsystemError::Actuator)?
            + left_deg;
        let right_target = self
            .right
            .position(RotationUnits::Degrees)
            .map_err(SubsystemError::Actuator)?
            + right_deg;

        self.left
            .spin_to_position(left_target, RotationUnits::Degrees)
            .map_err(SubsystemError::Actuator)?;
        if let Err(error) = self.right.spin_to_position(right_target, RotationUnits::Degrees) {
            tracing::error!(name = %self.name, ?error, "right motor rejected target, stopping");
            if let Err(stop_error) = self.halt() {
                tracing::error!(name = %self.name, %stop_error, "failed to stop drive");
            }
            return Err(SubsystemError::Actuator(error));
        }

        if !blocking {
            return Ok(Outcome::Dispatched);
        }

        let Self {
            left,
            right,
            delay,
            motion,
            ..
        } = self;
        let outcome = motion::await_with(delay, motion, || -> Result<_, SubsystemError<L::Error>> {
            let left = left.motion_status().map_err(SubsystemError::Actuator)?;
            let right = right.motion_status().map_err(SubsystemError::Actuator)?;
            Ok(match (left, right) {
                (MotionStatus::Superseded, _) | (_, MotionStatus::Superseded) => {
                    Some(Outcome::Superseded)
                }
                (MotionStatus::Complete, MotionStatus::Complete) => Some(Outcome::Arrived),
                _ => None,
            })
        })?;

        if outcome == Outcome::TimedOut {
            tracing::warn!(name = %self.name, "drive move timed out, stopping");
            self.halt()?;
        }
        Ok(outcome)
    }
}

impl<L, R, H, D> Subsystem for Drive<L, R, H, D>
where
    L: Actuator,
    R: Actuator<Error = L::Error>,
    H: HeadingSensor,
    D: DelayNs,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn periodic(&mut self, telemetry: &mut dyn TelemetrySink) {
        self.print_telemetry(telemetry);
    }

    fn print_telemetry(&mut self, telemetry: &mut dyn TelemetrySink) {
        match self.heading_degrees() {
            Ok(heading) => telemetry.write_output(&self.label_heading, heading.into()),
            Err(error) => tracing::error!(name = %self.name, %error, "failed to read heading"),
        }
        match self.left.position(RotationUnits::Degrees) {
            Ok(position) => telemetry.write_output(&self.label_left, position.into()),
            Err(error) => tracing::error!(name = %self.name, ?error, "failed to read left motor"),
        }
        match self.right.position(RotationUnits::Degrees) {
            Ok(position) => telemetry.write_output(&self.label_right, position.into()),
            Err(error) => tracing::error!(name = %self.name, ?error, "failed to read right motor"),
        }
    }

    fn stop(&mut self) {
        if let Err(error) = self.halt() {
            tracing::error!(name = %self.name, %error, "failed to stop drive");
        }
    }
}

impl<L, R, H, D> DriveControl for Drive<L, R, H, D>
where
    L: Actuator,
    R: Actuator<Error = L::Error>,
    H: HeadingSensor,
    D: DelayNs,
{
    type Error = SubsystemError<L::Error>;

    fn arcade_drive(&mut self, linear_pct: f64, rotational_pct: f64) -> Result<(), Self::Error> {
        Drive::arcade_drive(self, linear_pct, rotational_pct)
    }

    fn drive(
        &mut self,
        direction: Direction,
        speed: f64,
        units: VelocityUnits,
    ) -> Result<(), Self::Error> {
        Drive::drive(self, direction, speed, units)
    }

    fn drive_distance(
        &mut self,
        direction: Direction,
        distance: f64,
        units: DistanceUnits,
        blocking: bool,
    ) -> Result<Outcome, Self::Error> {
        Drive::drive_distance(self, direction, distance, units, blocking)
    }

    fn turn_to_angle(
        &mut self,
        direction: TurnDirection,
        angle: f64,
        units: RotationUnits,
        blocking: bool,
    ) -> Result<Outcome, Self::Error> {
        Drive::turn_to_angle(self, direction, angle, units, blocking)
    }

    fn heading_degrees(&mut self) -> Result<f64, Self::Error> {
        Drive::heading_degrees(self)
    }

    fn as_subsystem(&mut self) -> &mut dyn Subsystem {
        self
    }
}
