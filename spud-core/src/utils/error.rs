//! Error types shared by the subsystems.

use core::fmt;

use embedded_hal::digital::ErrorKind;

use crate::utils::hal::{SensorError, SensorErrorKind};

/// Errors raised while commanding or reading a subsystem's devices.
#[derive(Debug)]
pub enum SubsystemError<E: fmt::Debug> {
    /// A motor rejected a command or a read.
    Actuator(E),
    /// The inertial sensor failed to report.
    Heading(SensorErrorKind),
    /// A limit switch could not be read.
    Input(ErrorKind),
}

impl<E: fmt::Debug> SubsystemError<E> {
    pub(crate) fn input<P: embedded_hal::digital::Error>(error: P) -> Self {
        SubsystemError::Input(error.kind())
    }

    pub(crate) fn heading<S: SensorError>(error: S) -> Self {
        SubsystemError::Heading(error.kind())
    }
}

impl<E: fmt::Debug> fmt::Display for SubsystemError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubsystemError::Actuator(e) => write!(f, "actuator error: {e:?}"),
            SubsystemError::Heading(kind) => write!(f, "heading sensor error: {kind}"),
            SubsystemError::Input(kind) => write!(f, "limit switch read failed: {kind}"),
        }
    }
}

/// Rejected construction or configuration inputs.
#[derive(Debug)]
pub enum ConfigError {
    /// Subsystem names label telemetry and must not be empty.
    EmptyName,
    /// A geometry or timing value must be finite and strictly positive.
    NotPositive { field: &'static str, value: f64 },
    /// The configuration document could not be parsed.
    Parse(serde_json::Error),
}

impl ConfigError {
    /// Check that `value` is finite and strictly positive.
    pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), Self> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NotPositive { field, value })
        }
    }

    pub(crate) fn require_name(name: &str) -> Result<(), Self> {
        if name.trim().is_empty() {
            Err(ConfigError::EmptyName)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyName => f.write_str("subsystem name is empty"),
            ConfigError::NotPositive { field, value } => {
                write!(f, "`{field}` must be a positive number, got {value}")
            }
            ConfigError::Parse(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse(error)
    }
}

/// Failure of one step of a command sequence.
///
/// `step` is the zero-based position of the failing command among every command the
/// [`Sequencer`](crate::utils::sequence::Sequencer) has executed, whichever entry point ran it.
#[derive(Debug)]
pub enum SequenceError<E: fmt::Debug> {
    /// A subsystem returned an error while executing the step.
    Subsystem { step: usize, source: E },
    /// A blocking step did not finish in time. Every subsystem has been stopped.
    MotionTimeout { step: usize },
}

impl<E: fmt::Debug> SequenceError<E> {
    pub fn step(&self) -> usize {
        match *self {
            SequenceError::Subsystem { step, .. } | SequenceError::MotionTimeout { step } => {
                step
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> fmt::Display for SequenceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceError::Subsystem { step, source } => {
                write!(f, "step {step} failed: {source}")
            }
            SequenceError::MotionTimeout { step } => write!(f, "step {step} timed out"),
        }
    }
}
