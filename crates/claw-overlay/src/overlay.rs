//! One-call assembly of hub, log view and value table.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::clock::{Clock, MonotonicClock};
use crate::config::OverlayConfig;
use crate::error::Result;
use crate::frame_loop::FrameLoop;
use crate::hub::{DrainReport, EventHub, Subscription};
use crate::layer::HubLayer;
use crate::log_view::LogView;
use crate::traits::{LogSink, ValueSink};
use crate::value_table::ValueTable;

/// A hub wired to a log view and a value table.
///
/// The views are shared with the hub through `Arc<Mutex<_>>`; lock them on
/// the tick thread to inspect state or forward UI input such as
/// [`LogView::toggle_details`].
pub struct Overlay<L: LogSink, V: ValueSink> {
    config: OverlayConfig,
    hub: EventHub,
    log_view: Arc<Mutex<LogView<L>>>,
    value_table: Arc<Mutex<ValueTable<V>>>,
    _subscriptions: [Subscription; 2],
}

impl<L: LogSink, V: ValueSink> std::fmt::Debug for Overlay<L, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("config", &self.config)
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl<L, V> Overlay<L, V>
where
    L: LogSink + 'static,
    V: ValueSink + 'static,
{
    /// Builds an overlay stamping events with wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn new(config: OverlayConfig, log_sink: L, value_sink: V) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()), log_sink, value_sink)
    }

    /// Builds an overlay stamping events with `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn with_clock(
        config: OverlayConfig,
        clock: Arc<dyn Clock>,
        log_sink: L,
        value_sink: V,
    ) -> Result<Self> {
        config.validate()?;

        let hub = EventHub::with_clock(clock);
        let log_view = Arc::new(Mutex::new(LogView::new(&config, log_sink)?));
        let value_table = Arc::new(Mutex::new(ValueTable::new(&config, value_sink)?));

        let subscriptions = [
            hub.subscribe(Arc::clone(&log_view)),
            hub.subscribe(Arc::clone(&value_table)),
        ];
        debug!(
            scrollback = config.scrollback,
            max_values = config.max_values,
            origin_qualified = config.origin_qualified,
            "overlay assembled"
        );

        Ok(Self {
            config,
            hub,
            log_view,
            value_table,
            _subscriptions: subscriptions,
        })
    }

    /// The ingestion hub. Clone it to hand to producer threads.
    #[must_use]
    pub const fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// A `tracing` layer feeding this overlay.
    #[must_use]
    pub fn layer(&self) -> HubLayer {
        HubLayer::new(self.hub.clone())
    }

    /// The log view.
    #[must_use]
    pub const fn log_view(&self) -> &Arc<Mutex<LogView<L>>> {
        &self.log_view
    }

    /// The value table.
    #[must_use]
    pub const fn value_table(&self) -> &Arc<Mutex<ValueTable<V>>> {
        &self.value_table
    }

    /// The config the overlay was built from.
    #[must_use]
    pub const fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Attaches the drain to the host's frame loop.
    pub fn start(&self, frame_loop: &FrameLoop) {
        self.hub.start(frame_loop);
    }

    /// Detaches the drain from the host's frame loop.
    pub fn stop(&self, frame_loop: &FrameLoop) {
        self.hub.stop(frame_loop);
    }

    /// Drains the hub once, for hosts that drive ticks directly.
    pub fn tick(&self) -> DrainReport {
        self.hub.drain_and_dispatch()
    }
}
