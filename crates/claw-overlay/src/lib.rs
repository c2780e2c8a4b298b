//! # claw-overlay
//!
//! In-process diagnostics overlay for Clawbernetes runtimes: a live log
//! scrollback and a live table of watched values, fed from any thread and
//! rendered once per tick.
//!
//! This crate provides:
//!
//! - [`EventHub`] — Thread-safe ingestion, drained once per tick
//! - [`StackTraceParser`] — Recovers `Class.Method` origins from stack traces
//! - [`RingBuffer`] — Fixed-capacity slot pool with FIFO recycling
//! - [`LogView`] — Scrollback with severity colors and scroll-lock
//! - [`ValueTable`] — Sorted watch table with bounded capacity
//! - [`HubLayer`] — `tracing` layer forwarding host events to the hub
//! - [`Overlay`] — Hub and views assembled from one [`OverlayConfig`]
//! - [`FrameLoop`] — Per-frame hook registry the hub attaches to
//!
//! ## Example
//!
//! ```rust
//! use claw_overlay::{FrameLoop, Overlay, OverlayConfig};
//!
//! let overlay = Overlay::new(OverlayConfig::default(), (), ()).expect("valid config");
//! let frame_loop = FrameLoop::new();
//! overlay.start(&frame_loop);
//!
//! let hub = overlay.hub().clone();
//! std::thread::spawn(move || {
//!     hub.warn("worker started");
//!     hub.report_value("worker.load", &0.75f32);
//! })
//! .join()
//! .expect("worker thread");
//!
//! frame_loop.run_frame();
//! assert_eq!(overlay.value_table().lock().get("worker.load"), Some("0.750"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod frame_loop;
pub mod hub;
pub mod layer;
pub mod log_view;
pub mod overlay;
pub mod parser;
pub mod ring;
pub mod traits;
pub mod types;
pub mod value_table;

// Re-export main types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{OverlayConfig, SeverityColors};
pub use error::{OverlayError, Result};
pub use format::{WatchFormat, WatchValue};
pub use frame_loop::{FrameLoop, HookId};
pub use hub::{DrainReport, EventHub, SubscriberId, Subscription};
pub use layer::HubLayer;
pub use log_view::{LogLine, LogView, ScrollLock};
pub use overlay::Overlay;
pub use parser::{parse_origin, Origin, StackTraceParser};
pub use ring::{RingBuffer, Slot, SlotId};
pub use traits::{HubSubscriber, LogSink, ScrollMetrics, ValueSink};
pub use types::{Color, LogEvent, Severity, ValueEvent};
pub use value_table::{ValueEntry, ValueTable};
