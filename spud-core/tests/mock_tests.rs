use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::{
    delay::NoopDelay,
    digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction},
};
use spud_core::utils::{
    config::MotionConfig,
    controllers::{Drive, Elevator, Intake, MechanismState, Robot, Subsystem, SubsystemRegistry},
    error::{SequenceError, SubsystemError},
    hal::{
        sim::{ActuatorCommand, Arrival, Journal, SimActuator, SimEvent, SimHeading, SimSwitch},
        Actuator, Direction, DistanceUnits, HeadingSensor, MotionStatus, RotationUnits,
        SensorError, SensorErrorKind, TurnDirection, VelocityUnits,
    },
    math::conversions::{mm_to_degrees, turn_arc_mm, wheel_travel_to_motor_degrees},
    motion::{Bound, Outcome},
    sequence::{
        parse_routine, DriveCommand, IntakeCommand, Sequencer, SystemCommand,
    },
    telemetry::{RecordingSink, ScreenSink},
};

type SimError = SubsystemError<Infallible>;
type SimElevator<U = SimSwitch, L = SimSwitch> = Elevator<SimActuator, U, L, NoopDelay>;
type SimDrive = Drive<SimActuator, SimActuator, SimHeading, NoopDelay>;
type SimIntake = Intake<SimActuator, SimSwitch, NoopDelay>;

const AUTON: &str = include_str!("../../spud-app/mock-brain/routines/auton.json");

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

/// Motor degrees for a straight drive of `mm` with the default geometry.
fn drive_degrees(mm: f64) -> f64 {
    wheel_travel_to_motor_degrees(mm, 319.19, 1.0)
}

/// Motor degrees per wheel for an in-place turn of `angle` with the default geometry.
fn pivot_degrees(angle: f64) -> f64 {
    drive_degrees(turn_arc_mm(angle, 320.0, 130.0))
}

struct ElevatorRig {
    motor: SimActuator,
    upper: SimSwitch,
    lower: SimSwitch,
    elevator: SimElevator,
}

fn elevator_rig() -> ElevatorRig {
    let motor = SimActuator::new("lift");
    let upper = SimSwitch::new(false);
    let lower = SimSwitch::new(false);
    let elevator = Elevator::new(
        "Elevator",
        motor.clone(),
        upper.clone(),
        lower.clone(),
        NoopDelay::new(),
        None,
    )
    .unwrap();
    ElevatorRig {
        motor,
        upper,
        lower,
        elevator,
    }
}

struct DriveRig {
    left: SimActuator,
    right: SimActuator,
    imu: SimHeading,
    journal: Journal,
    drive: SimDrive,
}

fn drive_rig() -> DriveRig {
    let journal = Journal::new();
    let left = SimActuator::new("left").with_journal(journal.clone());
    let right = SimActuator::new("right").with_journal(journal.clone());
    let imu = SimHeading::new(0.0);
    let drive = Drive::new(
        "Drive",
        left.clone(),
        right.clone(),
        imu.clone(),
        NoopDelay::new(),
        None,
    )
    .unwrap();
    DriveRig {
        left,
        right,
        imu,
        journal,
        drive,
    }
}

fn intake_rig(journal: &Journal) -> (SimActuator, SimSwitch, SimIntake) {
    let motor = SimActuator::new("claw").with_journal(journal.clone());
    let surface = SimSwitch::new(false);
    let intake = Intake::new("Intake", motor.clone(), surface.clone(), NoopDelay::new()).unwrap();
    (motor, surface, intake)
}

fn short_motion() -> MotionConfig {
    MotionConfig {
        timeout_ms: 50,
        poll_ms: 10,
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Delay that commands `motor` at voltage the first time it sleeps, as another caller would.
struct InterruptingDelay {
    motor: SimActuator,
    fired: bool,
}

impl InterruptingDelay {
    fn new(motor: SimActuator) -> Self {
        Self {
            motor,
            fired: false,
        }
    }
}

impl DelayNs for InterruptingDelay {
    fn delay_ns(&mut self, _ns: u32) {
        if !self.fired {
            self.fired = true;
            infallible(self.motor.spin_voltage(Direction::Reverse, 6.0));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MotorFault;

/// Motor that refuses position targets when `rejects_targets` is set.
struct RejectingMotor {
    inner: SimActuator,
    rejects_targets: bool,
}

impl Actuator for RejectingMotor {
    type Error = MotorFault;

    fn spin_voltage(&mut self, direction: Direction, volts: f64) -> Result<(), MotorFault> {
        Ok(infallible(self.inner.spin_voltage(direction, volts)))
    }

    fn spin_velocity(
        &mut self,
        direction: Direction,
        velocity: f64,
        units: VelocityUnits,
    ) -> Result<(), MotorFault> {
        Ok(infallible(self.inner.spin_velocity(direction, velocity, units)))
    }

    fn spin_to_position(&mut self, position: f64, units: RotationUnits) -> Result<(), MotorFault> {
        if self.rejects_targets {
            return Err(MotorFault);
        }
        Ok(infallible(self.inner.spin_to_position(position, units)))
    }

    fn position(&mut self, units: RotationUnits) -> Result<f64, MotorFault> {
        Ok(infallible(self.inner.position(units)))
    }

    fn direction(&mut self) -> Result<Direction, MotorFault> {
        Ok(infallible(self.inner.direction()))
    }

    fn motion_status(&mut self) -> Result<MotionStatus, MotorFault> {
        Ok(infallible(self.inner.motion_status()))
    }

    fn stop(&mut self) -> Result<(), MotorFault> {
        Ok(infallible(self.inner.stop()))
    }
}

#[derive(Debug)]
struct ImuFault;

impl SensorError for ImuFault {
    fn kind(&self) -> SensorErrorKind {
        SensorErrorKind::Communication
    }
}

/// Inertial sensor whose bus is down.
struct DisconnectedImu;

impl HeadingSensor for DisconnectedImu {
    type Error = ImuFault;

    fn heading(&mut self) -> Result<f64, ImuFault> {
        Err(ImuFault)
    }

    fn start_calibration(&mut self) -> Result<(), ImuFault> {
        Err(ImuFault)
    }

    fn is_calibrating(&mut self) -> Result<bool, ImuFault> {
        Err(ImuFault)
    }
}

#[test]
fn test_elevator_moves_to_height_in_motor_degrees() {
    let mut rig = elevator_rig();
    let circ = rig.elevator.circumference_mm();
    assert!((circ - 154.16).abs() < 0.05);

    let outcome = rig.elevator.set_position_mm(500.0, true).unwrap();
    assert_eq!(outcome, Outcome::Arrived);

    let expected = mm_to_degrees(500.0, circ);
    match rig.motor.history().as_slice() {
        [ActuatorCommand::Position { degrees }] => assert_close(*degrees, expected),
        other => panic!("unexpected commands: {other:?}"),
    }
    assert_close(rig.elevator.position_mm().unwrap(), 500.0);
    assert!(rig.elevator.at_target().unwrap());
    assert_eq!(rig.elevator.state(), MechanismState::Idle);
}

#[test]
fn test_elevator_non_blocking_move_is_dispatched() {
    let mut rig = elevator_rig();
    rig.motor.set_arrival(Arrival::Never);

    let outcome = rig.elevator.set_position_mm(120.0, false).unwrap();
    assert_eq!(outcome, Outcome::Dispatched);
    assert_eq!(
        rig.elevator.state(),
        MechanismState::Positioning {
            direction: Direction::Forward
        }
    );
    assert_eq!(rig.elevator.setpoint_mm(), 120.0);
}

#[test]
fn test_elevator_refuses_to_drive_past_lower_switch() {
    let mut rig = elevator_rig();
    rig.motor.set_direction(Direction::Reverse);
    rig.lower.set_pressed(true);

    let outcome = rig.elevator.set_position_mm(-50.0, true).unwrap();
    assert_eq!(outcome, Outcome::SuppressedAtBound(Bound::Lower));
    assert_eq!(rig.motor.history(), [ActuatorCommand::Stop]);
    assert_eq!(rig.elevator.state(), MechanismState::Idle);
}

#[test]
fn test_elevator_may_leave_a_pressed_switch() {
    let mut rig = elevator_rig();
    rig.lower.set_pressed(true);

    let outcome = rig.elevator.set_position_mm(50.0, true).unwrap();
    assert_eq!(outcome, Outcome::Arrived);
}

#[test]
fn test_elevator_upper_switch_suppresses_with_single_read() {
    let mut upper = PinMock::new(&[PinTransaction::get(PinState::High)]);
    let mut lower = PinMock::new(&[]);
    let motor = SimActuator::new("lift");
    let mut elevator: SimElevator<PinMock, PinMock> = Elevator::new(
        "Elevator",
        motor.clone(),
        upper.clone(),
        lower.clone(),
        NoopDelay::new(),
        None,
    )
    .unwrap();

    let outcome = elevator.set_position_mm(500.0, true).unwrap();
    assert_eq!(outcome, Outcome::SuppressedAtBound(Bound::Upper));
    assert_eq!(motor.output(), ActuatorCommand::Stop);

    upper.done();
    lower.done();
}

#[test]
fn test_elevator_stops_when_switch_trips_mid_move() {
    let mut upper = PinMock::new(&[
        PinTransaction::get(PinState::Low),
        PinTransaction::get(PinState::Low),
        PinTransaction::get(PinState::High),
    ]);
    let mut lower = PinMock::new(&[]);
    let motor = SimActuator::new("lift").with_arrival(Arrival::AfterPolls(5));
    let mut elevator: SimElevator<PinMock, PinMock> = Elevator::new(
        "Elevator",
        motor.clone(),
        upper.clone(),
        lower.clone(),
        NoopDelay::new(),
        None,
    )
    .unwrap();

    let outcome = elevator.set_position_mm(200.0, true).unwrap();
    assert_eq!(outcome, Outcome::StoppedAtBound(Bound::Upper));
    assert_eq!(motor.output(), ActuatorCommand::Stop);
    assert_eq!(elevator.state(), MechanismState::Idle);

    upper.done();
    lower.done();
}

#[test]
fn test_elevator_at_target_tolerance() {
    let mut rig = elevator_rig();
    rig.motor.set_arrival(Arrival::Never);
    rig.elevator.set_position_mm(100.0, false).unwrap();
    let circ = rig.elevator.circumference_mm();

    rig.motor.set_position_degrees(mm_to_degrees(99.5, circ));
    assert!(rig.elevator.at_target().unwrap());

    rig.motor.set_position_degrees(mm_to_degrees(100.9, circ));
    assert!(rig.elevator.at_target().unwrap());

    rig.motor.set_position_degrees(mm_to_degrees(102.0, circ));
    assert!(!rig.elevator.at_target().unwrap());
}

#[test]
fn test_elevator_stop_is_idempotent() {
    let mut rig = elevator_rig();
    rig.elevator.set_voltage(Direction::Forward, 4.0).unwrap();

    rig.elevator.stop();
    rig.elevator.stop();

    assert_eq!(rig.motor.output(), ActuatorCommand::Stop);
    assert_eq!(rig.elevator.state(), MechanismState::Idle);
}

#[test]
fn test_elevator_blocking_move_times_out_and_stops() {
    let mut rig = elevator_rig();
    rig.motor.set_arrival(Arrival::Never);
    let mut elevator = rig.elevator.with_motion(short_motion()).unwrap();

    let outcome = elevator.set_position_mm(300.0, true).unwrap();
    assert_eq!(outcome, Outcome::TimedOut);
    assert_eq!(rig.motor.output(), ActuatorCommand::Stop);
}

#[test]
fn test_elevator_voltage_is_refused_at_upper_switch() {
    let mut rig = elevator_rig();
    rig.upper.set_pressed(true);

    let up = rig.elevator.set_voltage(Direction::Forward, 4.0).unwrap();
    assert_eq!(up, Outcome::SuppressedAtBound(Bound::Upper));

    // negative volts flip the direction, away from the pressed switch
    let down = rig.elevator.set_voltage(Direction::Forward, -4.0).unwrap();
    assert_eq!(down, Outcome::Dispatched);
    assert_eq!(
        rig.motor.output(),
        ActuatorCommand::Voltage {
            direction: Direction::Reverse,
            volts: 4.0
        }
    );
}

#[test]
fn test_elevator_manual_drive_is_refused_at_lower_switch() {
    let mut rig = elevator_rig();
    rig.lower.set_pressed(true);

    let volts = rig.elevator.set_voltage(Direction::Reverse, 4.0).unwrap();
    assert_eq!(volts, Outcome::SuppressedAtBound(Bound::Lower));
    assert_eq!(rig.motor.output(), ActuatorCommand::Stop);

    let power = rig.elevator.set_power_percent(-30.0).unwrap();
    assert_eq!(power, Outcome::SuppressedAtBound(Bound::Lower));
    assert_eq!(rig.motor.history(), [ActuatorCommand::Stop, ActuatorCommand::Stop]);
    assert_eq!(rig.elevator.state(), MechanismState::Idle);
}

#[test]
fn test_elevator_blocking_move_superseded_by_voltage() {
    let motor = SimActuator::new("lift").with_arrival(Arrival::AfterPolls(3));
    let mut elevator = Elevator::new(
        "Elevator",
        motor.clone(),
        SimSwitch::new(false),
        SimSwitch::new(false),
        InterruptingDelay::new(motor.clone()),
        None,
    )
    .unwrap();

    let outcome = elevator.set_position_mm(200.0, true).unwrap();
    assert_eq!(outcome, Outcome::Superseded);
    assert_eq!(elevator.state(), MechanismState::Idle);
    assert_eq!(motor.target_degrees(), None);
    assert_eq!(
        motor.output(),
        ActuatorCommand::Voltage {
            direction: Direction::Reverse,
            volts: 6.0
        }
    );
}

#[test]
fn test_elevator_periodic_stops_manual_drive_at_switch() {
    let mut rig = elevator_rig();
    let mut sink = RecordingSink::new();
    rig.elevator.set_power_percent(150.0).unwrap();
    assert_eq!(
        rig.elevator.state(),
        MechanismState::Manual {
            direction: Direction::Forward
        }
    );

    rig.elevator.periodic(&mut sink);
    assert!(!rig.motor.output().is_zero_output());

    rig.upper.set_pressed(true);
    rig.elevator.periodic(&mut sink);
    assert_eq!(rig.motor.output(), ActuatorCommand::Stop);
    assert_eq!(rig.elevator.state(), MechanismState::Idle);
    assert_eq!(sink.last("Elevator/AT_UPPER"), Some("true"));
    assert_eq!(sink.last("Elevator/AT_LOWER"), Some("false"));
}

#[test]
fn test_intake_moves_in_order() {
    let journal = Journal::new();
    let (motor, _surface, mut intake) = intake_rig(&journal);

    assert_eq!(intake.set_position_rotations(0.8, true).unwrap(), Outcome::Arrived);
    assert_eq!(intake.set_position_rotations(0.31, true).unwrap(), Outcome::Arrived);

    let events = journal.events();
    assert!(matches!(
        events.as_slice(),
        [
            SimEvent::Command {
                command: ActuatorCommand::Position { .. },
                ..
            },
            SimEvent::Arrived { .. },
            SimEvent::Command {
                command: ActuatorCommand::Position { .. },
                ..
            },
            SimEvent::Arrived { .. },
        ]
    ));
    assert_close(intake.position_rotations().unwrap(), 0.31);
    assert_close(motor.position_degrees(), 0.31 * 360.0);
}

#[test]
fn test_intake_blocking_move_times_out_and_stops() {
    let journal = Journal::new();
    let (motor, _surface, intake) = intake_rig(&journal);
    motor.set_arrival(Arrival::Never);
    let mut intake = intake.with_motion(short_motion()).unwrap();

    let outcome = intake.set_position_rotations(0.5, true).unwrap();
    assert_eq!(outcome, Outcome::TimedOut);
    assert_eq!(motor.output(), ActuatorCommand::Stop);
    assert_eq!(intake.state(), MechanismState::Idle);
}

#[test]
fn test_intake_non_blocking_move_settles_in_periodic() {
    let journal = Journal::new();
    let (motor, _surface, mut intake) = intake_rig(&journal);
    motor.set_arrival(Arrival::AfterPolls(1));
    let mut sink = RecordingSink::new();

    let outcome = intake.set_position_rotations(0.25, false).unwrap();
    assert_eq!(outcome, Outcome::Dispatched);
    assert_eq!(
        intake.state(),
        MechanismState::Positioning {
            direction: Direction::Forward
        }
    );

    intake.periodic(&mut sink);
    assert!(intake.state().is_moving());
    intake.periodic(&mut sink);
    assert_eq!(intake.state(), MechanismState::Idle);
    assert_close(motor.position_degrees(), 90.0);
}

#[test]
fn test_intake_blocking_move_superseded_by_voltage() {
    let motor = SimActuator::new("claw").with_arrival(Arrival::AfterPolls(3));
    let mut intake = Intake::new(
        "Intake",
        motor.clone(),
        SimSwitch::new(false),
        InterruptingDelay::new(motor.clone()),
    )
    .unwrap();

    let outcome = intake.set_position_rotations(1.0, true).unwrap();
    assert_eq!(outcome, Outcome::Superseded);
    assert_eq!(intake.state(), MechanismState::Idle);
}

#[test]
fn test_intake_telemetry_reports_surface_contact() {
    let journal = Journal::new();
    let (_motor, surface, mut intake) = intake_rig(&journal);
    let mut sink = RecordingSink::new();

    surface.set_pressed(true);
    intake.print_telemetry(&mut sink);

    assert_eq!(sink.last("Intake/POSITION_ROTATIONS"), Some("0.00"));
    assert_eq!(sink.last("Intake/TOUCHING_SURFACE"), Some("true"));
}

#[test]
fn test_drive_distance_then_turn() {
    let mut rig = drive_rig();
    rig.imu.queue_readings([0.0, 270.0]);

    let outcome = rig
        .drive
        .drive_distance(Direction::Forward, 300.0, DistanceUnits::Mm, true)
        .unwrap();
    assert_eq!(outcome, Outcome::Arrived);
    assert_close(rig.left.position_degrees(), drive_degrees(300.0));
    assert_close(rig.right.position_degrees(), drive_degrees(300.0));

    let outcome = rig
        .drive
        .turn_to_angle(TurnDirection::Left, 90.0, RotationUnits::Degrees, true)
        .unwrap();
    assert_eq!(outcome, Outcome::Arrived);
    assert_close(rig.left.position_degrees(), drive_degrees(300.0) - pivot_degrees(90.0));
    assert_close(rig.right.position_degrees(), drive_degrees(300.0) + pivot_degrees(90.0));

    // the turn is only commanded after the drive has arrived
    let devices: Vec<_> = rig
        .journal
        .events()
        .into_iter()
        .map(|event| match event {
            SimEvent::Command { device, .. } => ("command", device),
            SimEvent::Arrived { device } => ("arrived", device),
        })
        .collect();
    assert_eq!(
        devices,
        [
            ("command", "left"),
            ("command", "right"),
            ("arrived", "left"),
            ("arrived", "right"),
            ("command", "left"),
            ("command", "right"),
            ("arrived", "left"),
            ("arrived", "right"),
        ]
    );
}

#[test]
fn test_turn_corrects_heading_error() {
    let mut rig = drive_rig();
    rig.imu.queue_readings([0.0, 80.0, 90.0]);

    let outcome = rig
        .drive
        .turn_to_angle(TurnDirection::Right, 90.0, RotationUnits::Degrees, true)
        .unwrap();
    assert_eq!(outcome, Outcome::Arrived);

    let positions = rig
        .left
        .history()
        .into_iter()
        .filter(|cmd| matches!(cmd, ActuatorCommand::Position { .. }))
        .count();
    assert_eq!(positions, 2);
    assert_close(rig.left.position_degrees(), pivot_degrees(100.0));
    assert_close(rig.right.position_degrees(), -pivot_degrees(100.0));
}

#[test]
fn test_turn_gives_up_after_max_corrections() {
    let mut rig = drive_rig();
    rig.imu.queue_readings([0.0, 80.0]);

    let outcome = rig
        .drive
        .turn_to_angle(TurnDirection::Right, 90.0, RotationUnits::Degrees, true)
        .unwrap();
    assert_eq!(outcome, Outcome::Arrived);
    assert_eq!(rig.right.history().len(), 3);
}

#[test]
fn test_arcade_mix_is_desaturated() {
    let mut rig = drive_rig();
    rig.drive.arcade_drive(100.0, 50.0).unwrap();

    match (rig.left.output(), rig.right.output()) {
        (
            ActuatorCommand::Velocity {
                direction: Direction::Forward,
                velocity: left,
                ..
            },
            ActuatorCommand::Velocity {
                direction: Direction::Forward,
                velocity: right,
                ..
            },
        ) => {
            assert_close(left, 100.0);
            assert_close(right, 100.0 / 3.0);
        }
        other => panic!("unexpected outputs: {other:?}"),
    }
}

#[test]
fn test_drive_negative_speed_flips_direction() {
    let mut rig = drive_rig();
    rig.drive
        .drive(Direction::Forward, -50.0, VelocityUnits::Rpm)
        .unwrap();

    let expected = ActuatorCommand::Velocity {
        direction: Direction::Reverse,
        velocity: 50.0,
        units: VelocityUnits::Rpm,
    };
    assert_eq!(rig.left.output(), expected);
    assert_eq!(rig.right.output(), expected);
}

#[test]
fn test_drive_halts_when_right_motor_rejects_target() {
    let left = SimActuator::new("left");
    let right = SimActuator::new("right");
    let mut drive = Drive::new(
        "Drive",
        RejectingMotor {
            inner: left.clone(),
            rejects_targets: false,
        },
        RejectingMotor {
            inner: right.clone(),
            rejects_targets: true,
        },
        SimHeading::new(0.0),
        NoopDelay::new(),
        None,
    )
    .unwrap();

    let err = drive
        .drive_distance(Direction::Forward, 100.0, DistanceUnits::Mm, true)
        .unwrap_err();
    assert!(matches!(err, SubsystemError::Actuator(MotorFault)));
    assert!(matches!(
        left.history().as_slice(),
        [ActuatorCommand::Position { .. }, ActuatorCommand::Stop]
    ));
    assert_eq!(left.target_degrees(), None);
    assert_eq!(right.history(), [ActuatorCommand::Stop]);
}

#[test]
fn test_drive_reports_heading_sensor_fault_kind() {
    let left = SimActuator::new("left");
    let mut drive = Drive::new(
        "Drive",
        left.clone(),
        SimActuator::new("right"),
        DisconnectedImu,
        NoopDelay::new(),
        None,
    )
    .unwrap();

    let err = drive.heading_degrees().unwrap_err();
    assert!(matches!(
        err,
        SubsystemError::Heading(SensorErrorKind::Communication)
    ));

    let err = drive
        .turn_to_angle(TurnDirection::Left, 90.0, RotationUnits::Degrees, true)
        .unwrap_err();
    assert!(matches!(err, SubsystemError::Heading(_)));
    assert!(left.history().is_empty());
}

#[test]
fn test_drive_timeout_stops_both_sides() {
    let mut rig = drive_rig();
    rig.right.set_arrival(Arrival::Never);
    let mut drive = rig.drive.with_motion(short_motion()).unwrap();

    let outcome = drive
        .drive_distance(Direction::Reverse, 100.0, DistanceUnits::Mm, true)
        .unwrap();
    assert_eq!(outcome, Outcome::TimedOut);
    assert_eq!(rig.left.output(), ActuatorCommand::Stop);
    assert_eq!(rig.right.output(), ActuatorCommand::Stop);
}

#[test]
fn test_registry_stops_every_subsystem() {
    let journal = Journal::new();
    let mut elevator = elevator_rig();
    let (claw, _surface, mut intake) = intake_rig(&journal);
    elevator.elevator.set_voltage(Direction::Forward, 4.0).unwrap();
    intake.set_voltage(Direction::Reverse, 4.0).unwrap();

    let mut registry = SubsystemRegistry::new();
    registry.register(&mut elevator.elevator).register(&mut intake);
    assert_eq!(registry.names(), ["Elevator", "Intake"]);

    registry.stop_all();
    registry.stop_all();
    assert_eq!(elevator.motor.output(), ActuatorCommand::Stop);
    assert_eq!(claw.output(), ActuatorCommand::Stop);
}

#[test]
fn test_robot_periodic_fills_screen() {
    let journal = Journal::new();
    let mut drive = drive_rig();
    let mut elevator = elevator_rig();
    let (_claw, _surface, mut intake) = intake_rig(&journal);
    let mut robot: Robot<'_, SimError> =
        Robot::new(&mut drive.drive, &mut elevator.elevator, &mut intake);
    assert_eq!(robot.registry().names(), ["Drive", "Elevator", "Intake"]);

    let mut screen = ScreenSink::default();
    robot.periodic(&mut screen);
    robot.periodic(&mut screen);

    assert_eq!(screen.lines().len(), 9);
    assert_eq!(screen.line_for("Drive/HEADING_DEG"), Some("Drive/HEADING_DEG: 0.00"));
    assert_eq!(screen.line_for("Elevator/POSITION_MM"), Some("Elevator/POSITION_MM: 0.00"));
    assert_eq!(screen.line_for("Intake/TOUCHING_SURFACE"), Some("Intake/TOUCHING_SURFACE: false"));
}

#[test]
fn test_sequencer_runs_auton_routine() {
    let journal = Journal::new();
    let mut drive = drive_rig();
    drive.imu.queue_readings([0.0, 270.0]);
    let mut elevator = elevator_rig();
    let (_claw, _surface, mut intake) = intake_rig(&journal);
    let mut robot: Robot<'_, SimError> =
        Robot::new(&mut drive.drive, &mut elevator.elevator, &mut intake);

    let routine = parse_routine(AUTON).unwrap();
    let mut sequencer = Sequencer::new(NoopDelay::new());
    let reports = sequencer.run(&mut robot, &routine).unwrap();

    let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, [Outcome::Arrived, Outcome::Arrived, Outcome::Dispatched]);
    assert_eq!(reports[2].command, SystemCommand::StopAll);
    assert_eq!(sequencer.executed(), 3);
    assert_eq!(drive.left.output(), ActuatorCommand::Stop);
}

#[test]
fn test_sequencer_continues_past_suppressed_step() {
    let journal = Journal::new();
    let mut drive = drive_rig();
    let mut elevator = elevator_rig();
    elevator.upper.set_pressed(true);
    let (_claw, _surface, mut intake) = intake_rig(&journal);
    let mut robot: Robot<'_, SimError> =
        Robot::new(&mut drive.drive, &mut elevator.elevator, &mut intake);

    let routine = parse_routine(
        r#"[
            {"ct":"e","ec":"set_position","mm":100},
            {"ct":"i","ic":"set_position","rotations":1.0}
        ]"#,
    )
    .unwrap();
    let reports = Sequencer::new(NoopDelay::new()).run(&mut robot, &routine).unwrap();

    assert_eq!(reports[0].outcome, Outcome::SuppressedAtBound(Bound::Upper));
    assert_eq!(reports[1].outcome, Outcome::Arrived);
}

#[test]
fn test_sequencer_aborts_on_timeout() {
    let journal = Journal::new();
    let mut rig = drive_rig();
    rig.left.set_arrival(Arrival::Never);
    let mut drive = rig.drive.with_motion(short_motion()).unwrap();
    let mut elevator = elevator_rig();
    let (claw, _surface, mut intake) = intake_rig(&journal);
    let mut robot: Robot<'_, SimError> =
        Robot::new(&mut drive, &mut elevator.elevator, &mut intake);

    let routine = parse_routine(
        r#"[
            {"ct":"i","ic":"set_voltage","direction":"forward","volts":4.0},
            {"ct":"d","dc":"drive_distance","direction":"forward","distance":10,"units":"cm"},
            {"ct":"e","ec":"set_position","mm":100}
        ]"#,
    )
    .unwrap();
    let err = Sequencer::new(NoopDelay::new())
        .run(&mut robot, &routine)
        .unwrap_err();

    assert!(matches!(err, SequenceError::MotionTimeout { step: 1 }));
    assert_eq!(err.step(), 1);
    assert_eq!(claw.output(), ActuatorCommand::Stop);
    assert_eq!(rig.left.output(), ActuatorCommand::Stop);
    assert_eq!(elevator.motor.history(), [ActuatorCommand::Stop]);
}

#[test]
fn test_sequencer_steps_count_across_run_and_execute() {
    let journal = Journal::new();
    let mut drive = Drive::new(
        "Drive",
        SimActuator::new("left"),
        SimActuator::new("right"),
        DisconnectedImu,
        NoopDelay::new(),
        None,
    )
    .unwrap();
    let mut elevator = elevator_rig();
    let (claw, _surface, mut intake) = intake_rig(&journal);
    let mut robot: Robot<'_, SimError> =
        Robot::new(&mut drive, &mut elevator.elevator, &mut intake);

    let turn = SystemCommand::D(DriveCommand::TurnToAngle {
        direction: TurnDirection::Right,
        angle: 45.0,
        units: RotationUnits::Degrees,
        blocking: true,
    });
    let mut sequencer = Sequencer::new(NoopDelay::new());
    sequencer
        .execute(
            &mut robot,
            &SystemCommand::I(IntakeCommand::SetVoltage {
                direction: Direction::Forward,
                volts: 4.0,
            }),
        )
        .unwrap();

    let err = sequencer
        .run(&mut robot, &[SystemCommand::Wait { ms: 20 }, turn])
        .unwrap_err();
    assert!(matches!(
        err,
        SequenceError::Subsystem {
            step: 2,
            source: SubsystemError::Heading(SensorErrorKind::Communication),
        }
    ));
    assert_eq!(claw.output(), ActuatorCommand::Stop);

    let err = sequencer.execute(&mut robot, &turn).unwrap_err();
    assert_eq!(err.step(), 3);
    assert_eq!(sequencer.executed(), 4);
}
