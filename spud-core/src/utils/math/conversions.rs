//! Unit conversions between physical setpoints and motor shaft angles.
//!
//! # Example
//! ```rust
//! use spud_core::utils::math::conversions::{sprocket_circumference_mm, mm_to_degrees};
//! let circumference = sprocket_circumference_mm(12.7, 12.0);
//! let degrees = mm_to_degrees(500.0, circumference);
//! assert!(degrees > 1000.0);
//! ```

use core::f64::consts::PI;

/// Pitch circumference of a chain sprocket.
///
/// The pitch diameter of a sprocket with `teeth` teeth on chain of pitch `pitch_mm` is
/// `pitch / sin(π / teeth)`.
pub fn sprocket_circumference_mm(pitch_mm: f64, teeth: f64) -> f64 {
    let pitch_diameter = pitch_mm / libm::sin(PI / teeth);
    pitch_diameter * PI
}

/// Linear travel to shaft rotation.
pub fn mm_to_degrees(mm: f64, circumference_mm: f64) -> f64 {
    (mm / circumference_mm) * 360.0
}

/// Shaft rotation to linear travel.
pub fn degrees_to_mm(degrees: f64, circumference_mm: f64) -> f64 {
    (degrees / 360.0) * circumference_mm
}

/// Motor degrees needed to roll a wheel `distance_mm` along the ground.
///
/// `gear_ratio` is motor turns per wheel turn.
pub fn wheel_travel_to_motor_degrees(
    distance_mm: f64,
    wheel_circumference_mm: f64,
    gear_ratio: f64,
) -> f64 {
    mm_to_degrees(distance_mm, wheel_circumference_mm) * gear_ratio
}

/// Arc each side of a skid-steer base travels while spinning in place by `angle_deg`.
///
/// The wheels scrub around a circle whose diameter is the diagonal between opposite contact
/// patches.
pub fn turn_arc_mm(angle_deg: f64, track_width_mm: f64, wheel_base_mm: f64) -> f64 {
    let turning_diameter = libm::hypot(track_width_mm, wheel_base_mm);
    PI * turning_diameter * angle_deg / 360.0
}

/// Wrap any angle into `[0, 360)`.
pub fn wrap_heading(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`. Positive is clockwise.
pub fn heading_error(from: f64, to: f64) -> f64 {
    let delta = wrap_heading(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Scale a pair of outputs down so neither exceeds `max` in magnitude, keeping their ratio.
pub fn desaturate(values: [f64; 2], max: f64) -> [f64; 2] {
    let largest = libm::fabs(values[0]).max(libm::fabs(values[1]));
    if largest > max {
        [values[0] * max / largest, values[1] * max / largest]
    } else {
        values
    }
}
