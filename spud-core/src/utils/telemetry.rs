//! Telemetry sinks.
//!
//! Subsystems publish their state as `label: value` pairs through a [`TelemetrySink`]. Two sinks
//! are provided: [`TracingSink`] emits structured `tracing` events, and [`ScreenSink`] lays the
//! values out as lines the way the brain screen shows them.

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use hashbrown::HashMap;

/// A single telemetry value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryValue<'a> {
    Number(f64),
    Integer(i64),
    Flag(bool),
    Text(&'a str),
}

impl fmt::Display for TelemetryValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Number(v) => write!(f, "{v:.2}"),
            TelemetryValue::Integer(v) => write!(f, "{v}"),
            TelemetryValue::Flag(v) => write!(f, "{v}"),
            TelemetryValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for TelemetryValue<'_> {
    fn from(value: f64) -> Self {
        TelemetryValue::Number(value)
    }
}

impl From<i64> for TelemetryValue<'_> {
    fn from(value: i64) -> Self {
        TelemetryValue::Integer(value)
    }
}

impl From<bool> for TelemetryValue<'_> {
    fn from(value: bool) -> Self {
        TelemetryValue::Flag(value)
    }
}

impl<'a> From<&'a str> for TelemetryValue<'a> {
    fn from(value: &'a str) -> Self {
        TelemetryValue::Text(value)
    }
}

/// Fire-and-forget label/value reporter.
pub trait TelemetrySink {
    fn write_output(&mut self, label: &str, value: TelemetryValue<'_>);

    /// Forget everything written so far.
    fn clear(&mut self) {}
}

/// Emits every value as a `tracing` event under the `telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn write_output(&mut self, label: &str, value: TelemetryValue<'_>) {
        tracing::debug!(target: "telemetry", label, %value);
    }
}

/// Rows available on the V5 brain screen at the default font.
pub const SCREEN_LINES: usize = 12;

/// Line-oriented sink modelled on the brain screen.
///
/// Each new label takes the next free line; writing the same label again updates its line in
/// place. Labels arriving after the screen is full are dropped until [`TelemetrySink::clear`].
#[derive(Debug, Clone)]
pub struct ScreenSink {
    lines: Vec<String>,
    rows: HashMap<String, usize>,
    capacity: usize,
}

impl Default for ScreenSink {
    fn default() -> Self {
        Self::new(SCREEN_LINES)
    }
}

impl ScreenSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Vec::with_capacity(capacity),
            rows: HashMap::new(),
            capacity,
        }
    }

    /// Rendered lines, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line the cursor will write the next new label to, starting at 1.
    pub fn current_line(&self) -> usize {
        self.lines.len() + 1
    }

    /// Rendered line for `label`, if it is on screen.
    pub fn line_for(&self, label: &str) -> Option<&str> {
        self.rows.get(label).map(|&row| self.lines[row].as_str())
    }
}

impl TelemetrySink for ScreenSink {
    fn write_output(&mut self, label: &str, value: TelemetryValue<'_>) {
        let rendered = format!("{label}: {value}");
        match self.rows.get(label) {
            Some(&row) => self.lines[row] = rendered,
            None if self.lines.len() < self.capacity => {
                self.rows.insert(label.to_string(), self.lines.len());
                self.lines.push(rendered);
            }
            None => {}
        }
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.rows.clear();
    }
}

/// Sink that keeps every write in order. Handy for asserting on telemetry.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub entries: Vec<(String, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent rendered value written under `label`.
    pub fn last(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl TelemetrySink for RecordingSink {
    fn write_output(&mut self, label: &str, value: TelemetryValue<'_>) {
        self.entries.push((label.to_string(), value.to_string()));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
