use std::{fs, path::PathBuf, process};

use clap::{Parser, ValueEnum};
use embassy_executor::{Executor, Spawner};
use embassy_time::{Delay, Duration, Ticker};
use spud_core::utils::{
    RobotConfig,
    controllers::{Drive, Elevator, Intake, Robot},
    hal::sim::{Arrival, SimActuator, SimHeading, SimSwitch},
    motion::{Outcome, calibrate_heading},
    sequence::{
        COMMAND_CHANNEL, Gamepad, Sequencer, SystemCommand, parse_routine, teleop_commands,
    },
    telemetry::TracingSink,
};
use static_cell::StaticCell;
use tracing::{error, info, warn};

/// Control loop period of the brain.
const TICK: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Run the routine file once.
    Auton,
    /// Replay a scripted driver session.
    Teleop,
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// Robot configuration (JSON); defaults apply to anything left out
    #[clap(long)]
    config: Option<PathBuf>,
    /// Autonomous routine (JSON array of commands)
    #[clap(long, default_value = "routines/auton.json")]
    routine: PathBuf,
    #[clap(long, value_enum, default_value = "auton")]
    mode: Mode,
    /// Control ticks to run before shutting down
    #[clap(long, default_value_t = 400)]
    ticks: u32,
    /// Status polls a simulated motor takes to reach a position target
    #[clap(long, default_value_t = 3)]
    arrive_after: u32,
}

#[embassy_executor::task]
async fn auton_task(routine: Vec<SystemCommand>) {
    info!(steps = routine.len(), "queueing autonomous routine");
    for command in routine {
        COMMAND_CHANNEL.send(command).await;
    }
}

/// Scripted controller frames: (ticks to hold, inputs).
fn driver_script() -> Vec<(u32, Gamepad)> {
    vec![
        (
            40,
            Gamepad {
                axis3: 60.0,
                ..Gamepad::default()
            },
        ),
        (
            20,
            Gamepad {
                axis3: 30.0,
                axis1: 50.0,
                ..Gamepad::default()
            },
        ),
        (
            30,
            Gamepad {
                button_x: true,
                ..Gamepad::default()
            },
        ),
        (
            20,
            Gamepad {
                button_a: true,
                ..Gamepad::default()
            },
        ),
        (
            30,
            Gamepad {
                button_b: true,
                ..Gamepad::default()
            },
        ),
        (1, Gamepad::default()),
    ]
}

#[embassy_executor::task]
async fn teleop_task() {
    let mut ticker = Ticker::every(TICK);
    for (hold, pad) in driver_script() {
        info!(?pad, hold, "controller input");
        for _ in 0..hold {
            for command in teleop_commands(&pad) {
                COMMAND_CHANNEL.send(command).await;
            }
            ticker.next().await;
        }
    }
}

#[embassy_executor::task]
async fn control_task(config: RobotConfig, ticks: u32, arrive_after: u32) {
    let arrival = Arrival::AfterPolls(arrive_after);
    let mut imu = SimHeading::new(0.0).with_calibration_polls(4);
    match calibrate_heading(&mut imu, &mut Delay, Duration::from_secs(3)) {
        Ok(Outcome::Arrived) => {}
        Ok(outcome) => warn!(?outcome, "starting without a calibrated heading"),
        Err(e) => match e {},
    }

    let built = Drive::new(
        "Drive",
        SimActuator::new("left").with_arrival(arrival),
        SimActuator::new("right").with_arrival(arrival),
        imu,
        Delay,
        Some(config.drive),
    )
    .and_then(|d| d.with_motion(config.motion))
    .and_then(|d| d.with_turn(config.turn))
    .and_then(|drive| {
        let elevator = Elevator::new(
            "Elevator",
            SimActuator::new("lift").with_arrival(arrival),
            SimSwitch::new(false),
            SimSwitch::new(false),
            Delay,
            Some(config.elevator),
        )?
        .with_motion(config.motion)?;
        let intake = Intake::new(
            "Intake",
            SimActuator::new("claw").with_arrival(arrival),
            SimSwitch::new(false),
            Delay,
        )?
        .with_motion(config.motion)?;
        Ok((drive, elevator, intake))
    });
    let (mut drive, mut elevator, mut intake) = match built {
        Ok(parts) => parts,
        Err(e) => {
            error!(%e, "failed to build subsystems");
            process::exit(1);
        }
    };

    let mut robot = Robot::new(&mut drive, &mut elevator, &mut intake);
    let mut sequencer = Sequencer::new(Delay);
    let mut sink = TracingSink;
    let mut ticker = Ticker::every(TICK);

    for _ in 0..ticks {
        while let Ok(command) = COMMAND_CHANNEL.try_receive() {
            match sequencer.execute(&mut robot, &command) {
                Ok(Outcome::TimedOut) => {
                    error!(?command, "command timed out, stopping all subsystems");
                    robot.stop_all();
                }
                Ok(outcome) if outcome.is_incomplete() => {
                    warn!(?command, ?outcome, "command did not complete")
                }
                Ok(_) => {}
                Err(e) => error!(%e, "command failed"),
            }
        }
        robot.periodic(&mut sink);
        ticker.next().await;
    }

    robot.stop_all();
    info!(executed = sequencer.executed(), "control loop finished");
    process::exit(0);
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner, opts: Opts) {
    let config = match &opts.config {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| RobotConfig::from_json(&json).map_err(|e| e.to_string())),
        None => Ok(RobotConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "invalid configuration");
            process::exit(1);
        }
    };
    info!(?config, "robot configuration");

    match opts.mode {
        Mode::Auton => {
            let routine = fs::read_to_string(&opts.routine)
                .map_err(|e| e.to_string())
                .and_then(|json| parse_routine(&json).map_err(|e| e.to_string()));
            match routine {
                Ok(routine) => spawner.spawn(auton_task(routine)).unwrap(),
                Err(e) => {
                    error!(%e, path = %opts.routine.display(), "failed to load routine");
                    process::exit(1);
                }
            }
        }
        Mode::Teleop => spawner.spawn(teleop_task()).unwrap(),
    }

    spawner
        .spawn(control_task(config, opts.ticks, opts.arrive_after))
        .unwrap();
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts = Opts::parse();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, opts)).unwrap();
    });
}
