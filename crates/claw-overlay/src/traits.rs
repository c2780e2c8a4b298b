//! Traits at the seams of the overlay.
//!
//! - [`HubSubscriber`] — consumers of drained events, called on the tick thread
//! - [`LogSink`] / [`ValueSink`] — the passive render layer fed by the views
//!
//! `()` implements both sinks as a null renderer.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::ring::SlotId;
use crate::types::{Color, LogEvent, ValueEvent};

/// Receives events drained by the hub.
///
/// All methods run on the single tick thread, in the order log → clear →
/// value → removal → tick end. A returned error is logged and does not stop
/// the drain. Implementations must not subscribe or drop subscriptions from
/// inside a callback.
pub trait HubSubscriber: Send {
    /// A log line, in global enqueue order.
    fn on_log(&mut self, event: &LogEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// A clear was requested since the last tick. Called at most once per tick.
    fn on_clear(&mut self) -> Result<()> {
        Ok(())
    }

    /// A watch value changed.
    fn on_value(&mut self, event: &ValueEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// A watch value was retracted.
    fn on_remove(&mut self, key: &str) -> Result<()> {
        let _ = key;
        Ok(())
    }

    /// All queues for this tick have been dispatched.
    fn on_tick_end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: HubSubscriber> HubSubscriber for Arc<Mutex<T>> {
    fn on_log(&mut self, event: &LogEvent) -> Result<()> {
        self.lock().on_log(event)
    }

    fn on_clear(&mut self) -> Result<()> {
        self.lock().on_clear()
    }

    fn on_value(&mut self, event: &ValueEvent) -> Result<()> {
        self.lock().on_value(event)
    }

    fn on_remove(&mut self, key: &str) -> Result<()> {
        self.lock().on_remove(key)
    }

    fn on_tick_end(&mut self) -> Result<()> {
        self.lock().on_tick_end()
    }
}

/// Scrollbar state of the log view.
///
/// `position` 0.0 is the bottom (newest entries). `size` is the handle size,
/// which shrinks as content grows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Handle position, 0.0 = bottom
    pub position: f32,
    /// Handle size
    pub size: f32,
}

impl ScrollMetrics {
    /// Creates scroll metrics.
    #[must_use]
    pub const fn new(position: f32, size: f32) -> Self {
        Self { position, size }
    }
}

/// Render target for the log scrollback.
pub trait LogSink: Send {
    /// Show `text` in `slot`, placed after every other visible line.
    fn on_log_display(&mut self, slot: SlotId, text: &str, color: Color);

    /// Hide every line.
    fn on_log_clear_all(&mut self);

    /// Show (`Some`) or hide (`None`) the stack trace panel of a line.
    fn on_log_details(&mut self, slot: SlotId, details: Option<&str>) {
        let _ = (slot, details);
    }

    /// Current scrollbar state.
    fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics::default()
    }

    /// Move the scrollbar handle.
    fn set_scroll_position(&mut self, position: f32) {
        let _ = position;
    }
}

/// Render target for the watch table.
pub trait ValueSink: Send {
    /// Show `key = value` in `slot` at visual row `rank`.
    fn on_value_display(&mut self, slot: SlotId, key: &str, value: &str, rank: usize);

    /// Move `slot` to visual row `rank`.
    fn on_value_reorder(&mut self, slot: SlotId, rank: usize) {
        let _ = (slot, rank);
    }

    /// `slot` no longer shows `key`.
    fn on_value_removed(&mut self, slot: SlotId, key: &str);
}

impl LogSink for () {
    fn on_log_display(&mut self, _slot: SlotId, _text: &str, _color: Color) {}

    fn on_log_clear_all(&mut self) {}
}

impl ValueSink for () {
    fn on_value_display(&mut self, _slot: SlotId, _key: &str, _value: &str, _rank: usize) {}

    fn on_value_removed(&mut self, _slot: SlotId, _key: &str) {}
}
