//! Math utilities for the clawbot.
//!
//! This module provides unit conversions for the sprocket-driven elevator and the differential
//! drivetrain.

pub mod conversions;
