//! Robot geometry and timing configuration.
//!
//! Every field has a default matching the clawbot as built, so a JSON document only needs to
//! name the values it overrides:
//!
//! ```rust
//! use spud_core::utils::RobotConfig;
//! let cfg = RobotConfig::from_json(r#"{ "motion": { "timeout_ms": 500 } }"#).unwrap();
//! assert_eq!(cfg.motion.timeout_ms, 500);
//! assert_eq!(cfg.drive.track_width, 320.0);
//! ```

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::utils::{
    error::ConfigError,
    hal::DistanceUnits,
    math::conversions::sprocket_circumference_mm,
};

/// Differential drive geometry, expressed in `units`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveGeometry {
    pub wheel_circumference: f64,
    pub track_width: f64,
    pub wheel_base: f64,
    pub units: DistanceUnits,
    /// Motor turns per wheel turn.
    pub external_gear_ratio: f64,
}

impl Default for DriveGeometry {
    fn default() -> Self {
        Self {
            wheel_circumference: 319.19,
            track_width: 320.0,
            wheel_base: 130.0,
            units: DistanceUnits::Mm,
            external_gear_ratio: 1.0,
        }
    }
}

impl DriveGeometry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require_positive("wheel_circumference", self.wheel_circumference)?;
        ConfigError::require_positive("track_width", self.track_width)?;
        if !(self.wheel_base.is_finite() && self.wheel_base >= 0.0) {
            return Err(ConfigError::NotPositive {
                field: "wheel_base",
                value: self.wheel_base,
            });
        }
        ConfigError::require_positive("external_gear_ratio", self.external_gear_ratio)
    }

    pub fn wheel_circumference_mm(&self) -> f64 {
        self.units.to_mm(self.wheel_circumference)
    }

    pub fn track_width_mm(&self) -> f64 {
        self.units.to_mm(self.track_width)
    }

    pub fn wheel_base_mm(&self) -> f64 {
        self.units.to_mm(self.wheel_base)
    }
}

/// Sprocket-and-chain lift geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevatorGeometry {
    pub chain_pitch_mm: f64,
    pub sprocket_teeth: f64,
    /// `at_target()` window, exclusive.
    pub tolerance_mm: f64,
}

impl Default for ElevatorGeometry {
    fn default() -> Self {
        Self {
            chain_pitch_mm: 12.7,
            sprocket_teeth: 12.0,
            tolerance_mm: 1.0,
        }
    }
}

impl ElevatorGeometry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require_positive("chain_pitch_mm", self.chain_pitch_mm)?;
        // a sprocket needs at least three teeth for sin(π / teeth) to describe a pitch circle
        if !(self.sprocket_teeth.is_finite() && self.sprocket_teeth >= 3.0) {
            return Err(ConfigError::NotPositive {
                field: "sprocket_teeth",
                value: self.sprocket_teeth,
            });
        }
        ConfigError::require_positive("tolerance_mm", self.tolerance_mm)
    }

    pub fn circumference_mm(&self) -> f64 {
        sprocket_circumference_mm(self.chain_pitch_mm, self.sprocket_teeth)
    }
}

/// Bounds on blocking waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Give up on a blocking move after this long.
    pub timeout_ms: u64,
    /// Interval between arrival checks.
    pub poll_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            poll_ms: 10,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require_positive("timeout_ms", self.timeout_ms as f64)?;
        ConfigError::require_positive("poll_ms", f64::from(self.poll_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_ms))
    }
}

/// Heading correction applied after a blocking turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Acceptable heading error in degrees.
    pub heading_tolerance_deg: f64,
    /// Corrective moves attempted before accepting the heading as-is.
    pub max_corrections: u8,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            heading_tolerance_deg: 1.0,
            max_corrections: 2,
        }
    }
}

impl TurnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require_positive("heading_tolerance_deg", self.heading_tolerance_deg)
    }
}

/// Complete robot configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub drive: DriveGeometry,
    pub elevator: ElevatorGeometry,
    pub motion: MotionConfig,
    pub turn: TurnConfig,
}

impl RobotConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RobotConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drive.validate()?;
        self.elevator.validate()?;
        self.motion.validate()?;
        self.turn.validate()
    }
}
