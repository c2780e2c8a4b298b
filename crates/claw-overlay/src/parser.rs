//! Origin recovery from raw stack traces.
//!
//! Log lines arrive with the producer's stack trace as plain text. The parser
//! extracts the first frame that belongs to user code so the log view can
//! render `[Class.Method]` in front of the message.
//!
//! Two frame shapes are recognised:
//!
//! - Coroutine state machines: `Spawner/<SpawnLoop>d__3:MoveNext ()`. The
//!   generated `MoveNext` hides the user-authored name, which is recovered from
//!   between the angle brackets.
//! - Plain frames: `MyGame.PlayerController:Update ()`. Frames of the logging
//!   facade itself (`Debug:Log*`, `Logger:Log*`, `MonoBehaviour:print`) are
//!   skipped.

use once_cell::sync::Lazy;
use regex::Regex;

/// Coroutine continuation frame: outer class, any separator, `<Name>`, generated suffix, `MoveNext`.
static COROUTINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\w.]+).<(\w+)>\w+.MoveNext").unwrap_or_else(|_| unreachable!())
});

/// `Class:Method` frame. Methods must start with a letter so `File.cs:42` is not a frame.
static METHOD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\w.]+):([A-Za-z_]\w*)").unwrap_or_else(|_| unreachable!()));

/// Classes whose `Log*` methods belong to the logging facade.
const LOGGER_CLASSES: &[&str] = &["Logger", "Debug"];

/// The origin of a log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    /// Class (possibly namespace-qualified)
    pub class: Option<String>,
    /// Method name
    pub method: Option<String>,
}

impl Origin {
    /// An origin that could not be determined.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            class: None,
            method: None,
        }
    }

    fn found(class: &str, method: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            method: Some(method.to_string()),
        }
    }

    /// Returns `Class.Method` when both parts are known.
    #[must_use]
    pub fn qualified(&self) -> Option<String> {
        match (&self.class, &self.method) {
            (Some(class), Some(method)) => Some(format!("{class}.{method}")),
            _ => None,
        }
    }

    /// Returns true if neither part is known.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.class.is_none() && self.method.is_none()
    }
}

/// Stateless stack trace parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackTraceParser;

impl StackTraceParser {
    /// Creates a parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses a stack trace, returning the first user-code origin.
    #[must_use]
    pub fn parse(&self, stacktrace: Option<&str>) -> Origin {
        match stacktrace {
            Some(trace) => parse_origin(trace),
            None => Origin::unknown(),
        }
    }
}

/// Parses a stack trace text, returning the first user-code origin.
#[must_use]
pub fn parse_origin(stacktrace: &str) -> Origin {
    if stacktrace.is_empty() {
        return Origin::unknown();
    }

    if let Some(caps) = COROUTINE_REGEX.captures(stacktrace) {
        if let (Some(class), Some(method)) = (caps.get(1), caps.get(2)) {
            return Origin::found(class.as_str(), method.as_str());
        }
    }

    METHOD_REGEX
        .captures_iter(stacktrace)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .find(|(class, method)| !is_logging_frame(class, method))
        .map_or_else(Origin::unknown, |(class, method)| {
            Origin::found(class, method)
        })
}

fn is_logging_frame(class: &str, method: &str) -> bool {
    let simple = class.rsplit('.').next().unwrap_or(class);
    (LOGGER_CLASSES.contains(&simple) && method.starts_with("Log"))
        || (simple == "MonoBehaviour" && method == "print")
}
