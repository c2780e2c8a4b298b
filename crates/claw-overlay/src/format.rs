//! Display formatting for watch values.
//!
//! Values are turned into text on the producer thread, before they are
//! queued. The hub and the value table only ever see strings.

use std::fmt::Write as _;

/// Decimals used for floating point watch values.
pub const FLOAT_DECIMALS: usize = 3;

/// Minimum hex digits used for byte watch values.
pub const BYTE_HEX_WIDTH: usize = 4;

/// A value that can be shown in the watch table.
pub trait WatchFormat {
    /// Formats the value for display.
    fn format_watch(&self) -> String;
}

/// Explicitly tagged watch value, for call sites that pick the representation.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchValue {
    /// Fixed-width float
    Float(f64),
    /// Hex byte
    Byte(u8),
    /// Text shown verbatim
    Text(String),
}

impl WatchFormat for WatchValue {
    fn format_watch(&self) -> String {
        match self {
            Self::Float(v) => format_float(*v),
            Self::Byte(v) => format_byte(*v),
            Self::Text(v) => v.clone(),
        }
    }
}

fn format_float(value: f64) -> String {
    format!("{value:.prec$}", prec = FLOAT_DECIMALS)
}

fn format_byte(value: u8) -> String {
    format!("{value:0width$X}", width = BYTE_HEX_WIDTH)
}

fn format_vector(components: &[f32]) -> String {
    let mut out = String::from("(");
    for (i, c) in components.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{c:.prec$}", prec = FLOAT_DECIMALS);
    }
    out.push(')');
    out
}

impl WatchFormat for f32 {
    fn format_watch(&self) -> String {
        format_float(f64::from(*self))
    }
}

impl WatchFormat for f64 {
    fn format_watch(&self) -> String {
        format_float(*self)
    }
}

impl WatchFormat for u8 {
    fn format_watch(&self) -> String {
        format_byte(*self)
    }
}

impl WatchFormat for [f32; 2] {
    fn format_watch(&self) -> String {
        format_vector(self)
    }
}

impl WatchFormat for [f32; 3] {
    fn format_watch(&self) -> String {
        format_vector(self)
    }
}

impl WatchFormat for [f32; 4] {
    fn format_watch(&self) -> String {
        format_vector(self)
    }
}

impl WatchFormat for (f32, f32) {
    fn format_watch(&self) -> String {
        format_vector(&[self.0, self.1])
    }
}

impl WatchFormat for (f32, f32, f32) {
    fn format_watch(&self) -> String {
        format_vector(&[self.0, self.1, self.2])
    }
}

macro_rules! display_watch {
    ($($t:ty),* $(,)?) => {
        $(
            impl WatchFormat for $t {
                fn format_watch(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_watch!(i8, i16, i32, i64, i128, isize, u16, u32, u64, u128, usize, bool, char, str, String);

impl<T: WatchFormat + ?Sized> WatchFormat for &T {
    fn format_watch(&self) -> String {
        (**self).format_watch()
    }
}
