//! Overlay configuration.
//!
//! Read once at startup, either built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "scrollback": 200,
//!   "max_values": 50,
//!   "colors": { "warning": { "r": 255, "g": 200, "b": 0, "a": 255 } },
//!   "origin_qualified": true
//! }
//! ```
//!
//! Missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OverlayError, Result};
use crate::types::{Color, Severity};

/// Colors used for each severity class in the log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityColors {
    /// Color for `Warning` lines.
    pub warning: Color,
    /// Color for `Error` and `Assert` lines.
    pub error: Color,
    /// Color for `Exception` lines.
    pub exception: Color,
    /// Color for everything else.
    pub default: Color,
}

impl Default for SeverityColors {
    fn default() -> Self {
        Self {
            warning: Color::YELLOW,
            error: Color::RED,
            exception: Color::MAGENTA,
            default: Color::WHITE,
        }
    }
}

impl SeverityColors {
    /// Returns the color for a severity.
    #[must_use]
    pub const fn for_severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::Assert | Severity::Error => self.error,
            Severity::Exception => self.exception,
            Severity::Warning => self.warning,
            Severity::Info => self.default,
        }
    }
}

/// Configuration for the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Number of log lines kept in the scrollback.
    pub scrollback: usize,
    /// Maximum number of watched values shown at once.
    pub max_values: usize,
    /// Severity colors.
    pub colors: SeverityColors,
    /// Prefix log lines with `[Class.Method]` when an origin can be parsed.
    pub origin_qualified: bool,
    /// Scroll positions closer than this to the bottom count as the bottom.
    pub scroll_epsilon: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scrollback: 100,
            max_values: 100,
            colors: SeverityColors::default(),
            origin_qualified: cfg!(debug_assertions),
            scroll_epsilon: 0.0001,
        }
    }
}

impl OverlayConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result fails validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        debug!(
            path = %path.display(),
            scrollback = config.scrollback,
            max_values = config.max_values,
            "loaded overlay config"
        );
        Ok(config)
    }

    /// Serializes the config as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that the config can build an overlay.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidConfig`] for zero capacities or a
    /// non-positive scroll epsilon.
    pub fn validate(&self) -> Result<()> {
        if self.scrollback == 0 {
            return Err(OverlayError::InvalidConfig(
                "scrollback must be greater than zero".to_string(),
            ));
        }
        if self.max_values == 0 {
            return Err(OverlayError::InvalidConfig(
                "max_values must be greater than zero".to_string(),
            ));
        }
        if !(self.scroll_epsilon.is_finite() && self.scroll_epsilon > 0.0) {
            return Err(OverlayError::InvalidConfig(format!(
                "scroll_epsilon must be a positive number, got {}",
                self.scroll_epsilon
            )));
        }
        Ok(())
    }

    /// Sets the scrollback size.
    #[must_use]
    pub const fn with_scrollback(mut self, scrollback: usize) -> Self {
        self.scrollback = scrollback;
        self
    }

    /// Sets the maximum number of watched values.
    #[must_use]
    pub const fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = max_values;
        self
    }

    /// Enables or disables the `[Class.Method]` prefix.
    #[must_use]
    pub const fn with_origin_qualified(mut self, enabled: bool) -> Self {
        self.origin_qualified = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    #[test]
    fn defaults() {
        let config = OverlayConfig::default();
        assert_eq!(config.scrollback, 100);
        assert_eq!(config.max_values, 100);
        assert_eq!(config.origin_qualified, cfg!(debug_assertions));
        assert!((config.scroll_epsilon - 0.0001).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test_case(Severity::Info, Color::WHITE ; "info uses default")]
    #[test_case(Severity::Warning, Color::YELLOW ; "warning is yellow")]
    #[test_case(Severity::Error, Color::RED ; "error is red")]
    #[test_case(Severity::Assert, Color::RED ; "assert shares error color")]
    #[test_case(Severity::Exception, Color::MAGENTA ; "exception is magenta")]
    fn default_colors(severity: Severity, expected: Color) {
        assert_eq!(SeverityColors::default().for_severity(severity), expected);
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = OverlayConfig::from_json_str("{}").expect("empty object");
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let json = r#"{
            "scrollback": 5,
            "colors": { "warning": { "r": 1, "g": 2, "b": 3, "a": 4 } }
        }"#;
        let config = OverlayConfig::from_json_str(json).expect("partial config");
        assert_eq!(config.scrollback, 5);
        assert_eq!(config.max_values, 100);
        assert_eq!(config.colors.warning, Color::rgba(1, 2, 3, 4));
        assert_eq!(config.colors.error, Color::RED);
    }

    #[test]
    fn json_round_trip() {
        let config = OverlayConfig::default()
            .with_scrollback(7)
            .with_max_values(3)
            .with_origin_qualified(true);
        let json = config.to_json_string().expect("serialize");
        let back = OverlayConfig::from_json_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test_case(r#"{"scrollback": 0}"# ; "zero scrollback")]
    #[test_case(r#"{"max_values": 0}"# ; "zero max values")]
    #[test_case(r#"{"scroll_epsilon": 0.0}"# ; "zero epsilon")]
    #[test_case(r#"{"scroll_epsilon": -1.0}"# ; "negative epsilon")]
    fn invalid_configs_are_rejected(json: &str) {
        let result = OverlayConfig::from_json_str(json);
        assert!(matches!(result, Err(OverlayError::InvalidConfig(_))));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let result = OverlayConfig::from_json_str("{ scrollback: ");
        assert!(matches!(result, Err(OverlayError::Config(_))));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(br#"{"max_values": 12, "origin_qualified": false}"#)
            .expect("write config");

        let config = OverlayConfig::load(file.path()).expect("load config");
        assert_eq!(config.max_values, 12);
        assert!(!config.origin_qualified);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = OverlayConfig::load(dir.path().join("absent.json"));
        assert!(matches!(result, Err(OverlayError::Io(_))));
    }
}
