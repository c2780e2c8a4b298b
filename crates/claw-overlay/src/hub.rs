//! Event ingestion and per-tick dispatch.
//!
//! This module provides:
//! - [`EventHub`] — Thread-safe ingestion point, drained once per tick
//! - [`Subscription`] — Handle that keeps a [`HubSubscriber`] registered
//! - [`DrainReport`] — What a single drain dispatched
//!
//! Producers on any thread enqueue onto lock-free MPSC channels. A single
//! consumer thread calls [`EventHub::drain_and_dispatch`] once per tick, which
//! empties the queues in the order log → clear → value → removal and fans the
//! events out to subscribers. Everything a subscriber touches stays on that
//! one thread.
//!
//! A hub has a single host loop. Starting it on a second [`FrameLoop`] moves
//! it there; the hook left on the previous loop stops draining.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::clock::{duration_to_nanos, Clock, MonotonicClock};
use crate::error::Result;
use crate::format::WatchFormat;
use crate::frame_loop::{FrameLoop, HookId};
use crate::traits::HubSubscriber;
use crate::types::{LogEvent, Severity, ValueEvent};

/// Identity of a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Summary of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Frame the drained events belong to
    pub frame: u64,
    /// Log events dispatched
    pub logs: usize,
    /// Whether a clear was dispatched
    pub cleared: bool,
    /// Value events dispatched
    pub values: usize,
    /// Removal events dispatched
    pub removals: usize,
    /// Subscriber callbacks that returned an error or panicked
    pub failures: usize,
    /// The drain was refused because another drain was running
    pub skipped: bool,
}

struct Queue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Queue<T> {
    fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    fn push(&self, item: T) {
        // The receiver lives as long as the sender, so this cannot fail.
        let _ = self.tx.send(item);
    }

    /// Takes at most the events queued right now.
    fn drain_pending(&self) -> impl Iterator<Item = T> + '_ {
        let pending = self.rx.len();
        self.rx.try_iter().take(pending)
    }
}

/// Consumer-side state, only touched on the tick thread.
#[derive(Default)]
struct Consumer {
    subscribers: Vec<(SubscriberId, Box<dyn HubSubscriber>)>,
    /// Last dispatched `(frame, elapsed_millis)`
    last_stamp: Option<(u64, f32)>,
}

struct Shared {
    hook_id: HookId,
    clock: Arc<dyn Clock>,
    logs: Queue<LogEvent>,
    values: Queue<ValueEvent>,
    removals: Queue<String>,
    clear_requested: AtomicBool,
    frame: AtomicU64,
    tick_started_nanos: AtomicU64,
    /// Id of the host [`FrameLoop`], or 0 when stopped
    attached_loop: AtomicU64,
    draining: AtomicBool,
    next_subscriber: AtomicU64,
    consumer: Mutex<Consumer>,
}

/// Thread-safe ingestion point for log lines and watch values.
///
/// Cloning is cheap; all clones share the same queues.
#[derive(Clone)]
pub struct EventHub {
    shared: Arc<Shared>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("hook_id", &self.shared.hook_id)
            .field("frame", &self.frame())
            .field("attached", &self.is_attached())
            .field("pending_logs", &self.pending_logs())
            .finish_non_exhaustive()
    }
}

impl EventHub {
    /// Creates a hub stamping events with wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// Creates a hub stamping events with the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let tick_started = duration_to_nanos(clock.now());
        Self {
            shared: Arc::new(Shared {
                hook_id: HookId::next(),
                clock,
                logs: Queue::new(),
                values: Queue::new(),
                removals: Queue::new(),
                clear_requested: AtomicBool::new(false),
                frame: AtomicU64::new(0),
                tick_started_nanos: AtomicU64::new(tick_started),
                attached_loop: AtomicU64::new(0),
                draining: AtomicBool::new(false),
                next_subscriber: AtomicU64::new(1),
                consumer: Mutex::new(Consumer::default()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Attaches the hub's drain to `frame_loop`, making it the host loop.
    ///
    /// Attaching again to the same loop is a no-op. Attaching to another loop
    /// moves the hub; the previous loop's hook no longer drains.
    pub fn start(&self, frame_loop: &FrameLoop) {
        let loop_id = frame_loop.id();
        let shared = Arc::downgrade(&self.shared);
        frame_loop.attach(self.shared.hook_id, move || {
            let host = Weak::upgrade(&shared)
                .filter(|shared| shared.attached_loop.load(Ordering::Acquire) == loop_id);
            if let Some(shared) = host {
                EventHub { shared }.drain_and_dispatch();
            }
        });

        let previous = self.shared.attached_loop.swap(loop_id, Ordering::AcqRel);
        if previous != 0 && previous != loop_id {
            debug!(
                hook = self.shared.hook_id.0,
                from = previous,
                to = loop_id,
                "event hub moved to another frame loop"
            );
        } else {
            debug!(
                hook = self.shared.hook_id.0,
                frame_loop = loop_id,
                "event hub attached to frame loop"
            );
        }
    }

    /// Detaches the hub from `frame_loop`. Queued events stay queued.
    ///
    /// Stopping a loop that is not the host only removes its stale hook; the
    /// hub stays attached to its host.
    pub fn stop(&self, frame_loop: &FrameLoop) {
        let loop_id = frame_loop.id();
        if frame_loop.detach(self.shared.hook_id) {
            debug!(
                hook = self.shared.hook_id.0,
                frame_loop = loop_id,
                pending_logs = self.pending_logs(),
                "event hub detached from frame loop"
            );
        }
        let _ = self.shared.attached_loop.compare_exchange(
            loop_id,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Returns true while the hub has a host frame loop.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.shared.attached_loop.load(Ordering::Acquire) != 0
    }

    /// The id under which this hub attaches to frame loops.
    #[must_use]
    pub fn hook_id(&self) -> HookId {
        self.shared.hook_id
    }

    // ------------------------------------------------------------------
    // Ingestion (any thread)
    // ------------------------------------------------------------------

    /// Queues a log line, stamped with the current frame and tick time.
    pub fn report_log(
        &self,
        message: impl Into<String>,
        stacktrace: Option<String>,
        severity: Severity,
    ) {
        let frame = self.shared.frame.load(Ordering::Acquire);
        let elapsed_millis = self.elapsed_millis();
        self.shared.logs.push(LogEvent::new(
            message,
            stacktrace,
            severity,
            frame,
            elapsed_millis,
        ));
    }

    /// Queues an info line without a stack trace.
    pub fn info(&self, message: impl Into<String>) {
        self.report_log(message, None, Severity::Info);
    }

    /// Queues a warning line without a stack trace.
    pub fn warn(&self, message: impl Into<String>) {
        self.report_log(message, None, Severity::Warning);
    }

    /// Queues an error line without a stack trace.
    pub fn error(&self, message: impl Into<String>) {
        self.report_log(message, None, Severity::Error);
    }

    /// Queues a watch value, formatted on the calling thread.
    pub fn report_value<V: WatchFormat + ?Sized>(&self, key: impl Into<String>, value: &V) {
        self.report_value_text(key, value.format_watch());
    }

    /// Queues an already formatted watch value.
    pub fn report_value_text(&self, key: impl Into<String>, value: impl Into<String>) {
        self.shared.values.push(ValueEvent::new(key, value));
    }

    /// Queues the retraction of a watch value.
    pub fn remove_value(&self, key: impl Into<String>) {
        self.shared.removals.push(key.into());
    }

    /// Requests a clear of the log scrollback on the next tick.
    pub fn clear(&self) {
        self.shared.clear_requested.store(true, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Subscribers
    // ------------------------------------------------------------------

    /// Registers a subscriber until the returned handle is dropped.
    pub fn subscribe(&self, subscriber: impl HubSubscriber + 'static) -> Subscription {
        let id = SubscriberId(self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.shared
            .consumer
            .lock()
            .subscribers
            .push((id, Box::new(subscriber)));
        debug!(subscriber = id.0, "subscriber registered");

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.consumer.lock().subscribers.len()
    }

    // ------------------------------------------------------------------
    // Tick (single consumer thread)
    // ------------------------------------------------------------------

    /// Drains every queue and dispatches to subscribers, then advances the frame.
    ///
    /// Must be called from one thread once per tick. A call made while another
    /// drain is running is refused and reported as `skipped`.
    pub fn drain_and_dispatch(&self) -> DrainReport {
        let shared = &*self.shared;
        if shared.draining.swap(true, Ordering::AcqRel) {
            warn!(hook = shared.hook_id.0, "drain already running, skipping");
            return DrainReport {
                skipped: true,
                ..DrainReport::default()
            };
        }

        let mut report = DrainReport {
            frame: shared.frame.load(Ordering::Acquire),
            ..DrainReport::default()
        };

        {
            let mut consumer = shared.consumer.lock();
            let Consumer {
                subscribers,
                last_stamp,
            } = &mut *consumer;

            for mut event in shared.logs.drain_pending() {
                make_monotonic(last_stamp, &mut event);
                report.logs += 1;
                report.failures += dispatch(subscribers, "log", |s| s.on_log(&event));
            }

            if shared.clear_requested.swap(false, Ordering::AcqRel) {
                report.cleared = true;
                report.failures += dispatch(subscribers, "clear", |s| s.on_clear());
            }

            for event in shared.values.drain_pending() {
                report.values += 1;
                report.failures += dispatch(subscribers, "value", |s| s.on_value(&event));
            }

            for key in shared.removals.drain_pending() {
                report.removals += 1;
                report.failures += dispatch(subscribers, "remove", |s| s.on_remove(&key));
            }

            report.failures += dispatch(subscribers, "tick_end", |s| s.on_tick_end());
        }

        shared.frame.fetch_add(1, Ordering::AcqRel);
        shared.tick_started_nanos.store(
            duration_to_nanos(shared.clock.now()),
            Ordering::Release,
        );
        shared.draining.store(false, Ordering::Release);

        trace!(
            frame = report.frame,
            logs = report.logs,
            values = report.values,
            removals = report.removals,
            failures = report.failures,
            "drained event hub"
        );
        report
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Current frame counter.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.shared.frame.load(Ordering::Acquire)
    }

    /// Log events waiting for the next drain.
    #[must_use]
    pub fn pending_logs(&self) -> usize {
        self.shared.logs.rx.len()
    }

    /// Value events waiting for the next drain.
    #[must_use]
    pub fn pending_values(&self) -> usize {
        self.shared.values.rx.len()
    }

    /// Removal events waiting for the next drain.
    #[must_use]
    pub fn pending_removals(&self) -> usize {
        self.shared.removals.rx.len()
    }

    /// Whether a clear is waiting for the next drain.
    #[must_use]
    pub fn clear_pending(&self) -> bool {
        self.shared.clear_requested.load(Ordering::Acquire)
    }

    #[allow(clippy::cast_precision_loss)]
    fn elapsed_millis(&self) -> f32 {
        let now = duration_to_nanos(self.shared.clock.now());
        let started = self.shared.tick_started_nanos.load(Ordering::Acquire);
        let elapsed = Duration::from_nanos(now.saturating_sub(started));
        (elapsed.as_secs_f64() * 1000.0) as f32
    }
}

/// Keeps a subscriber registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    shared: Weak<Shared>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    /// The subscriber's id.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Unsubscribes now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared
                .consumer
                .lock()
                .subscribers
                .retain(|(id, _)| *id != self.id);
            debug!(subscriber = self.id.0, "subscriber removed");
        }
    }
}

/// Producers stamp without coordination, so a stamp taken just before a tick
/// boundary can land behind a newer one. Clamp so dispatch order is non-decreasing.
fn make_monotonic(last: &mut Option<(u64, f32)>, event: &mut LogEvent) {
    if let Some((frame, elapsed)) = *last {
        if event.frame <= frame {
            event.frame = frame;
            event.elapsed_millis = event.elapsed_millis.max(elapsed);
        }
    }
    *last = Some((event.frame, event.elapsed_millis));
}

/// Runs one callback on every subscriber, isolating failures. Returns the failure count.
fn dispatch(
    subscribers: &mut [(SubscriberId, Box<dyn HubSubscriber>)],
    phase: &'static str,
    mut call: impl FnMut(&mut dyn HubSubscriber) -> Result<()>,
) -> usize {
    let mut failures = 0;
    for (id, subscriber) in subscribers.iter_mut() {
        match catch_unwind(AssertUnwindSafe(|| call(subscriber.as_mut()))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failures += 1;
                warn!(subscriber = id.0, phase, error = %e, "subscriber callback failed");
            }
            Err(payload) => {
                failures += 1;
                warn!(
                    subscriber = id.0,
                    phase,
                    panic = panic_message(payload.as_ref()),
                    "subscriber callback panicked"
                );
            }
        }
    }
    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
