//! Core types for the diagnostics overlay.
//!
//! This module provides:
//! - [`Severity`] — Severity of a captured log line
//! - [`LogEvent`] — A stamped log line waiting for the next tick
//! - [`ValueEvent`] — A pre-formatted watch value update
//! - [`Color`] — RGBA color handed to render sinks

use serde::{Deserialize, Serialize};

/// Severity of a captured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Regular informational output
    #[default]
    Info,
    /// Warning conditions
    Warning,
    /// Error conditions
    Error,
    /// An exception escaped to the logger
    Exception,
    /// A failed assertion
    Assert,
}

impl Severity {
    /// Returns the string representation of this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Exception => "exception",
            Self::Assert => "assert",
        }
    }
}

/// A log line captured on some producer thread.
///
/// `frame` and `elapsed_millis` are stamped by the hub when the event is
/// reported, never by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// The log message
    pub message: String,
    /// Raw stack trace text, if the producer had one
    pub stacktrace: Option<String>,
    /// Severity of the line
    pub severity: Severity,
    /// Hub frame counter at report time
    pub frame: u64,
    /// Milliseconds since the start of the current tick at report time
    pub elapsed_millis: f32,
}

impl LogEvent {
    /// Creates a log event with explicit stamps.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        stacktrace: Option<String>,
        severity: Severity,
        frame: u64,
        elapsed_millis: f32,
    ) -> Self {
        Self {
            message: message.into(),
            stacktrace,
            severity,
            frame,
            elapsed_millis,
        }
    }
}

/// A watch value update. The value is already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueEvent {
    /// Watch key
    pub key: String,
    /// Display text of the value
    pub value: String,
}

impl ValueEvent {
    /// Creates a value event.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque yellow (`1, 0.92, 0.016`).
    pub const YELLOW: Self = Self::rgb(255, 235, 4);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque magenta.
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
