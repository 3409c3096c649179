//! Bounded waits for blocking motion commands.
//!
//! A blocking command issues its target to the actuator and then polls for arrival every
//! `poll_interval`, giving up after `timeout`. Elapsed time is counted in poll intervals, so
//! the wait only needs an `embedded_hal::delay::DelayNs` and no wall clock.

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

use crate::utils::{config::MotionConfig, hal::HeadingSensor};

/// A limit switch marking one end of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Upper,
    Lower,
}

/// Result of a motion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command was accepted and the caller did not wait for it.
    Dispatched,
    /// The actuator reported reaching its target.
    Arrived,
    /// The actuator did not report arrival before the timeout. It has been stopped.
    TimedOut,
    /// Another command replaced the target before arrival.
    Superseded,
    /// The command would have driven into a tripped limit switch and was replaced by a stop.
    SuppressedAtBound(Bound),
    /// A limit switch tripped while moving toward it and the move was stopped.
    StoppedAtBound(Bound),
}

impl Outcome {
    /// True when the command ended somewhere other than where it was sent.
    pub fn is_incomplete(&self) -> bool {
        !matches!(self, Outcome::Dispatched | Outcome::Arrived)
    }
}

/// Poll `check` until it yields an outcome or the timeout elapses.
///
/// `check` runs once before any delay, so an actuator that is already done returns without
/// sleeping. Returns `Outcome::TimedOut` when time runs out; stopping the actuator is left to
/// the caller, which owns it.
pub fn await_motion<D, E, F>(
    delay: &mut D,
    timeout: Duration,
    poll_interval: Duration,
    mut check: F,
) -> Result<Outcome, E>
where
    D: DelayNs,
    F: FnMut() -> Result<Option<Outcome>, E>,
{
    let timeout_ms = timeout.as_millis();
    // DelayNs takes u32 milliseconds; longer intervals saturate
    let poll_ms = u32::try_from(poll_interval.as_millis())
        .unwrap_or(u32::MAX)
        .max(1);
    let mut elapsed_ms = 0u64;

    loop {
        if let Some(outcome) = check()? {
            return Ok(outcome);
        }
        if elapsed_ms >= timeout_ms {
            tracing::warn!(timeout_ms, "motion did not complete before timeout");
            return Ok(Outcome::TimedOut);
        }
        delay.delay_ms(poll_ms);
        elapsed_ms += u64::from(poll_ms);
    }
}

/// Same as [`await_motion`] with timing taken from a [`MotionConfig`].
pub fn await_with<D, E, F>(delay: &mut D, config: &MotionConfig, check: F) -> Result<Outcome, E>
where
    D: DelayNs,
    F: FnMut() -> Result<Option<Outcome>, E>,
{
    await_motion(delay, config.timeout(), config.poll_interval(), check)
}

/// Settle time before starting inertial calibration.
const CALIBRATION_SETTLE_MS: u32 = 200;
/// Interval between calibration status polls.
const CALIBRATION_POLL: Duration = Duration::from_millis(25);

/// Run the inertial sensor's one-time calibration and wait for it to finish.
///
/// Must run before any subsystem that reads heading is used. Returns `Outcome::Arrived` when
/// calibration completes and `Outcome::TimedOut` otherwise.
pub fn calibrate_heading<H, D>(
    sensor: &mut H,
    delay: &mut D,
    timeout: Duration,
) -> Result<Outcome, H::Error>
where
    H: HeadingSensor,
    D: DelayNs,
{
    delay.delay_ms(CALIBRATION_SETTLE_MS);
    sensor.start_calibration()?;
    tracing::info!("calibrating inertial sensor");

    let outcome = await_motion::<_, H::Error, _>(delay, timeout, CALIBRATION_POLL, || {
        Ok(if sensor.is_calibrating()? {
            None
        } else {
            Some(Outcome::Arrived)
        })
    })?;

    match outcome {
        Outcome::Arrived => tracing::info!("inertial calibration complete"),
        _ => tracing::error!(?outcome, "inertial calibration did not finish"),
    }
    Ok(outcome)
}
