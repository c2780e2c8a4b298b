//! Log scrollback view.
//!
//! Maps drained log events onto a fixed pool of display slots. When the pool
//! is full, the line shown the longest is recycled for the new one. The view
//! also owns the scroll-lock heuristic that keeps the newest line in sight
//! unless the viewer has scrolled away from the bottom.

use tracing::trace;

use crate::config::{OverlayConfig, SeverityColors};
use crate::error::{OverlayError, Result};
use crate::parser::StackTraceParser;
use crate::ring::{RingBuffer, SlotId};
use crate::traits::{HubSubscriber, LogSink, ScrollMetrics};
use crate::types::{Color, LogEvent, Severity};

/// Content of one scrollback slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogLine {
    /// Rendered text, including the frame/time prefix
    pub text: String,
    /// Raw stack trace shown in the details panel
    pub stacktrace: Option<String>,
    /// Severity of the source event
    pub severity: Severity,
    /// Color the text is drawn in
    pub color: Color,
    /// Whether the details panel is open
    pub details_visible: bool,
}

/// Keeps the scrollback pinned to the bottom while the viewer is there.
///
/// Tracks the scrollbar state of the previous tick and the current one. At
/// the end of every tick, if the handle sat at the bottom last tick and the
/// content size has changed since, the handle is forced back to the bottom.
/// Content can grow without a new line arriving, so the view samples the
/// sink on every tick, not only when lines are pushed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollLock {
    epsilon: f32,
    last_position: f32,
    last_size: Option<f32>,
    current_position: f32,
    current_size: Option<f32>,
}

impl ScrollLock {
    /// Creates a lock with no previous tick, positioned at the bottom.
    #[must_use]
    pub const fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            last_position: 0.0,
            last_size: None,
            current_position: 0.0,
            current_size: None,
        }
    }

    /// Returns true if `position` counts as the bottom.
    #[must_use]
    pub fn is_nearly_zero(&self, position: f32) -> bool {
        position.abs() < self.epsilon
    }

    /// Maps nearly-zero positions onto exactly zero.
    #[must_use]
    pub fn snap(&self, position: f32) -> f32 {
        if self.is_nearly_zero(position) {
            0.0
        } else {
            position
        }
    }

    /// Records the scrollbar state seen during the current tick.
    pub fn observe(&mut self, metrics: ScrollMetrics) {
        self.current_position = metrics.position;
        self.current_size = Some(metrics.size);
    }

    /// Ends the tick. Returns true if the handle must be forced to the bottom.
    pub fn evaluate(&mut self) -> bool {
        let size_changed = match (self.last_size, self.current_size) {
            (Some(last), Some(current)) => (last - current).abs() > f32::EPSILON,
            (None, None) => false,
            _ => true,
        };
        let pin = self.is_nearly_zero(self.last_position) && size_changed;
        if pin {
            self.current_position = 0.0;
        }

        self.last_position = self.current_position;
        self.last_size = self.current_size;
        pin
    }
}

/// Scrollback of recent log lines, rendered through a [`LogSink`].
pub struct LogView<S: LogSink> {
    lines: RingBuffer<LogLine>,
    sink: S,
    colors: SeverityColors,
    origin_qualified: bool,
    parser: StackTraceParser,
    scroll: ScrollLock,
}

impl<S: LogSink> std::fmt::Debug for LogView<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogView")
            .field("capacity", &self.lines.capacity())
            .field("visible", &self.lines.active_len())
            .field("origin_qualified", &self.origin_qualified)
            .field("scroll", &self.scroll)
            .finish_non_exhaustive()
    }
}

impl<S: LogSink> LogView<S> {
    /// Creates a view with `config.scrollback` slots.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidConfig`] if `config.scrollback` is zero.
    pub fn new(config: &OverlayConfig, sink: S) -> Result<Self> {
        Ok(Self {
            lines: RingBuffer::new(config.scrollback)?,
            sink,
            colors: config.colors,
            origin_qualified: config.origin_qualified,
            parser: StackTraceParser::new(),
            scroll: ScrollLock::new(config.scroll_epsilon),
        })
    }

    /// Renders the text shown for an event.
    #[must_use]
    pub fn format_line(&self, event: &LogEvent) -> String {
        let prefix = format!("[{}:{:.2}]", event.frame, event.elapsed_millis);
        let origin = if self.origin_qualified {
            self.parser.parse(event.stacktrace.as_deref()).qualified()
        } else {
            None
        };

        match origin {
            Some(origin) => format!("{prefix}[{origin}]: {}", event.message),
            None => format!("{prefix}: {}", event.message),
        }
    }

    /// Shows an event in a fresh or recycled slot and returns the slot.
    pub fn push(&mut self, event: &LogEvent) -> SlotId {
        let text = self.format_line(event);
        let color = self.colors.for_severity(event.severity);

        let slot = self.lines.acquire_or_recycle();
        if let Some(line) = self.lines.get_mut(slot) {
            *line.content_mut() = LogLine {
                text,
                stacktrace: event.stacktrace.clone(),
                severity: event.severity,
                color,
                details_visible: false,
            };
            let line = line.content();
            self.sink.on_log_details(slot, None);
            self.sink.on_log_display(slot, &line.text, line.color);
        }

        self.scroll.observe(self.sink.scroll_metrics());
        trace!(slot = slot.0, severity = event.severity.as_str(), "log line displayed");
        slot
    }

    /// Hides every line and closes open detail panels. Slots keep their place
    /// in the reuse order.
    pub fn clear(&mut self) {
        self.lines.deactivate_all();
        for slot in self.lines.iter_mut() {
            let line = slot.content_mut();
            if line.details_visible {
                line.details_visible = false;
                self.sink.on_log_details(slot.id(), None);
            }
        }
        self.sink.on_log_clear_all();
        trace!("log view cleared");
    }

    /// Opens or closes the stack trace panel of a visible line.
    ///
    /// Returns whether the panel is now open.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::UnknownSlot`] for ids outside the pool and
    /// [`OverlayError::SlotInactive`] for hidden lines.
    pub fn toggle_details(&mut self, slot: SlotId) -> Result<bool> {
        let entry = self
            .lines
            .get_mut(slot)
            .ok_or(OverlayError::UnknownSlot(slot.0))?;
        if !entry.is_active() {
            return Err(OverlayError::SlotInactive(slot.0));
        }

        let line = entry.content_mut();
        line.details_visible = !line.details_visible;
        if line.details_visible {
            let details = line.stacktrace.as_deref().unwrap_or_default();
            self.sink.on_log_details(slot, Some(details));
        } else {
            self.sink.on_log_details(slot, None);
        }
        Ok(line.details_visible)
    }

    /// Handles a scrollbar movement reported by the render layer.
    pub fn on_scroll_changed(&mut self, position: f32) {
        let snapped = self.scroll.snap(position);
        if snapped.to_bits() != position.to_bits() {
            self.sink.set_scroll_position(snapped);
        }
        let size = self.sink.scroll_metrics().size;
        self.scroll.observe(ScrollMetrics::new(snapped, size));
    }

    /// Runs the scroll-lock check for the finished tick.
    pub fn end_tick(&mut self) {
        self.scroll.observe(self.sink.scroll_metrics());
        if self.scroll.evaluate() {
            self.sink.set_scroll_position(0.0);
            trace!("scroll pinned to bottom");
        }
    }

    /// Visible lines, oldest first.
    #[must_use]
    pub fn visible_lines(&self) -> Vec<LogLine> {
        self.lines
            .iter_display_order()
            .map(|slot| slot.content().clone())
            .collect()
    }

    /// The line held by a slot, visible or not.
    #[must_use]
    pub fn line(&self, slot: SlotId) -> Option<&LogLine> {
        self.lines.get(slot).map(|s| s.content())
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lines.capacity()
    }

    /// Scroll-lock state.
    #[must_use]
    pub const fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll
    }

    /// The render sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// The render sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: LogSink> HubSubscriber for LogView<S> {
    fn on_log(&mut self, event: &LogEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }

    fn on_clear(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn on_tick_end(&mut self) -> Result<()> {
        self.end_tick();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    /// Render sink that records every call.
    #[derive(Debug, Default)]
    struct RecordingSink {
        displayed: Vec<(SlotId, String, Color)>,
        details: Vec<(SlotId, Option<String>)>,
        clears: usize,
        metrics: ScrollMetrics,
        positions: Vec<f32>,
    }

    impl LogSink for RecordingSink {
        fn on_log_display(&mut self, slot: SlotId, text: &str, color: Color) {
            self.displayed.push((slot, text.to_string(), color));
        }

        fn on_log_clear_all(&mut self) {
            self.clears += 1;
        }

        fn on_log_details(&mut self, slot: SlotId, details: Option<&str>) {
            self.details.push((slot, details.map(str::to_string)));
        }

        fn scroll_metrics(&self) -> ScrollMetrics {
            self.metrics
        }

        fn set_scroll_position(&mut self, position: f32) {
            self.metrics.position = position;
            self.positions.push(position);
        }
    }

    fn view(scrollback: usize, qualified: bool) -> LogView<RecordingSink> {
        let config = OverlayConfig::default()
            .with_scrollback(scrollback)
            .with_origin_qualified(qualified);
        LogView::new(&config, RecordingSink::default()).expect("valid scrollback")
    }

    fn event(message: &str, severity: Severity) -> LogEvent {
        LogEvent::new(message, None, severity, 12, 3.456)
    }

    // ===========================================
    // Line rendering
    // ===========================================

    #[test]
    fn plain_line_format() {
        let view = view(4, false);
        assert_eq!(view.format_line(&event("hello", Severity::Info)), "[12:3.46]: hello");
    }

    #[test]
    fn qualified_line_includes_origin() {
        let view = view(4, true);
        let event = LogEvent::new(
            "hit",
            Some("Logger:LogWarning ()\nMyGame.Enemy:TakeDamage ()".to_string()),
            Severity::Warning,
            0,
            0.0,
        );
        assert_eq!(view.format_line(&event), "[0:0.00][MyGame.Enemy.TakeDamage]: hit");
    }

    #[test]
    fn qualified_line_without_origin_falls_back() {
        let view = view(4, true);
        assert_eq!(view.format_line(&event("bare", Severity::Info)), "[12:3.46]: bare");
    }

    #[test_case(Severity::Info, Color::WHITE ; "info")]
    #[test_case(Severity::Warning, Color::YELLOW ; "warning")]
    #[test_case(Severity::Error, Color::RED ; "error")]
    #[test_case(Severity::Assert, Color::RED ; "assert")]
    #[test_case(Severity::Exception, Color::MAGENTA ; "exception")]
    fn lines_are_colored_by_severity(severity: Severity, expected: Color) {
        let mut view = view(2, false);
        let slot = view.push(&event("x", severity));
        assert_eq!(view.line(slot).map(|l| l.color), Some(expected));
        assert_eq!(view.sink().displayed[0].2, expected);
    }

    // ===========================================
    // Recycling and clear
    // ===========================================

    #[test]
    fn overflow_recycles_oldest_line() {
        let mut view = view(3, false);
        let first = view.push(&event("a", Severity::Info));
        view.push(&event("b", Severity::Info));
        view.push(&event("c", Severity::Info));

        let fourth = view.push(&event("d", Severity::Info));
        assert_eq!(fourth, first);

        let texts: Vec<String> = view.visible_lines().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["[12:3.46]: b", "[12:3.46]: c", "[12:3.46]: d"]);
    }

    #[test]
    fn clear_hides_everything_and_keeps_order() {
        let mut view = view(3, false);
        let a = view.push(&event("a", Severity::Info));
        let b = view.push(&event("b", Severity::Info));
        assert!(view.toggle_details(a).is_ok());

        view.clear();
        assert!(view.visible_lines().is_empty());
        assert_eq!(view.sink().clears, 1);
        assert!(view.line(a).is_some_and(|l| !l.details_visible));

        // idle slot first, then hidden slots oldest first
        assert_eq!(view.push(&event("c", Severity::Info)), SlotId(2));
        assert_eq!(view.push(&event("d", Severity::Info)), a);
        assert_eq!(view.push(&event("e", Severity::Info)), b);
    }

    #[test]
    fn zero_scrollback_is_rejected() {
        let config = OverlayConfig::default().with_scrollback(0);
        assert!(matches!(
            LogView::new(&config, RecordingSink::default()),
            Err(OverlayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn clear_closes_open_detail_panels() {
        let mut view = view(3, false);
        let a = view.push(&event("a", Severity::Info));
        let b = view.push(&event("b", Severity::Info));
        assert_eq!(view.toggle_details(b).ok(), Some(true));
        view.sink_mut().details.clear();

        view.clear();
        assert_eq!(view.sink().details, vec![(b, None)]);
        assert!(view.line(a).is_some_and(|l| !l.details_visible));
        assert!(view.line(b).is_some_and(|l| !l.details_visible));
    }

    #[test]
    fn display_resets_details_panel() {
        let mut view = view(1, false);
        let slot = view.push(&event("a", Severity::Info));
        assert_eq!(view.toggle_details(slot).ok(), Some(true));

        view.push(&event("b", Severity::Info));
        assert!(view.line(slot).is_some_and(|l| !l.details_visible));
        assert_eq!(view.sink().details.last(), Some(&(slot, None)));
    }

    // ===========================================
    // Details panel
    // ===========================================

    #[test]
    fn toggle_details_flips_and_notifies() {
        let mut view = view(2, false);
        let slot = view.push(&LogEvent::new(
            "boom",
            Some("A:B ()".to_string()),
            Severity::Error,
            0,
            0.0,
        ));

        assert_eq!(view.toggle_details(slot).ok(), Some(true));
        assert_eq!(
            view.sink().details.last(),
            Some(&(slot, Some("A:B ()".to_string())))
        );
        assert_eq!(view.toggle_details(slot).ok(), Some(false));
        assert_eq!(view.sink().details.last(), Some(&(slot, None)));
    }

    #[test]
    fn toggle_details_rejects_hidden_and_unknown_slots() {
        let mut view = view(2, false);
        assert!(matches!(
            view.toggle_details(SlotId(0)),
            Err(OverlayError::SlotInactive(0))
        ));
        assert!(matches!(
            view.toggle_details(SlotId(5)),
            Err(OverlayError::UnknownSlot(5))
        ));

        let slot = view.push(&event("a", Severity::Info));
        view.clear();
        assert!(matches!(
            view.toggle_details(slot),
            Err(OverlayError::SlotInactive(_))
        ));
    }

    // ===========================================
    // Scroll lock
    // ===========================================

    #[test]
    fn first_tick_with_content_pins_to_bottom() {
        let mut lock = ScrollLock::new(0.0001);
        lock.observe(ScrollMetrics::new(0.0, 1.0));
        assert!(lock.evaluate());
    }

    #[test]
    fn first_tick_without_content_does_nothing() {
        let mut lock = ScrollLock::new(0.0001);
        assert!(!lock.evaluate());
    }

    #[test]
    fn at_bottom_and_size_changed_pins() {
        let mut lock = ScrollLock::new(0.0001);
        lock.observe(ScrollMetrics::new(0.00005, 0.8));
        lock.evaluate();

        lock.observe(ScrollMetrics::new(0.2, 0.6));
        assert!(lock.evaluate());
    }

    #[test]
    fn scrolled_away_never_pins() {
        let mut lock = ScrollLock::new(0.0001);
        lock.observe(ScrollMetrics::new(0.5, 0.8));
        lock.evaluate();

        lock.observe(ScrollMetrics::new(0.5, 0.4));
        assert!(!lock.evaluate());
        lock.observe(ScrollMetrics::new(0.5, 0.2));
        assert!(!lock.evaluate());
    }

    #[test]
    fn unchanged_size_does_not_pin() {
        let mut lock = ScrollLock::new(0.0001);
        lock.observe(ScrollMetrics::new(0.0, 0.5));
        lock.evaluate();
        assert!(!lock.evaluate());
    }

    #[test_case(0.00005, 0.0 ; "tiny positive snaps")]
    #[test_case(-0.00005, 0.0 ; "tiny negative snaps")]
    #[test_case(0.0, 0.0 ; "zero stays")]
    #[test_case(0.25, 0.25 ; "far position kept")]
    fn snap(position: f32, expected: f32) {
        let lock = ScrollLock::new(0.0001);
        assert!((lock.snap(position) - expected).abs() < f32::EPSILON);
    }

    #[test]
    fn view_forces_bottom_when_content_grows() {
        let mut view = view(8, false);
        view.sink_mut().metrics = ScrollMetrics::new(0.0, 1.0);
        view.push(&event("a", Severity::Info));
        view.end_tick();
        assert_eq!(view.sink().positions, vec![0.0]);

        // content grew while the viewer stayed at the bottom
        view.sink_mut().metrics = ScrollMetrics::new(0.3, 0.5);
        view.push(&event("b", Severity::Info));
        view.end_tick();
        assert_eq!(view.sink().positions, vec![0.0, 0.0]);
    }

    #[test]
    fn view_leaves_scrolled_viewer_alone() {
        let mut view = view(8, false);
        view.sink_mut().metrics = ScrollMetrics::new(0.0, 1.0);
        view.push(&event("a", Severity::Info));
        view.end_tick();

        view.sink_mut().metrics = ScrollMetrics::new(0.6, 1.0);
        view.on_scroll_changed(0.6);
        view.end_tick();

        view.sink_mut().metrics = ScrollMetrics::new(0.6, 0.5);
        view.push(&event("b", Severity::Info));
        view.end_tick();
        assert_eq!(view.sink().positions, vec![0.0]);
    }

    #[test]
    fn growth_without_new_lines_still_pins() {
        let mut view = view(8, false);
        view.sink_mut().metrics = ScrollMetrics::new(0.0, 1.0);
        view.push(&event("a", Severity::Info));
        view.end_tick();
        assert_eq!(view.sink().positions, vec![0.0]);

        // content resized by the render layer, no event this tick
        view.sink_mut().metrics = ScrollMetrics::new(0.05, 0.5);
        view.end_tick();
        assert_eq!(view.sink().positions, vec![0.0, 0.0]);
        assert!((view.sink().metrics.position).abs() < f32::EPSILON);

        // size stable again, nothing to do
        view.end_tick();
        assert_eq!(view.sink().positions.len(), 2);
    }

    #[test]
    fn nearly_zero_scroll_is_snapped_on_the_sink() {
        let mut view = view(8, false);
        view.on_scroll_changed(0.00002);
        assert_eq!(view.sink().positions, vec![0.0]);

        view.on_scroll_changed(0.4);
        assert_eq!(view.sink().positions, vec![0.0]);
    }

    #[test]
    fn subscriber_callbacks_drive_the_view() {
        let mut view = view(2, false);
        assert!(view.on_log(&event("a", Severity::Info)).is_ok());
        assert_eq!(view.visible_lines().len(), 1);
        assert!(view.on_clear().is_ok());
        assert!(view.visible_lines().is_empty());
        assert!(view.on_tick_end().is_ok());
    }
}
