//! Live table of watched values, sorted by key.
//!
//! Each distinct key holds one slot from a fixed pool. Unlike the log view,
//! the table never recycles: once every slot is taken, new keys are dropped
//! until a removal frees one. Keys are ordered byte-wise ascending and a
//! key's rank is its row in that order.

use tracing::trace;

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::ring::{RingBuffer, SlotId};
use crate::traits::{HubSubscriber, ValueSink};
use crate::types::ValueEvent;

/// Content of one table slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueEntry {
    /// Watch key
    pub key: String,
    /// Display text of the value
    pub value: String,
}

/// Sorted key/value table rendered through a [`ValueSink`].
pub struct ValueTable<S: ValueSink> {
    entries: RingBuffer<ValueEntry>,
    /// Displayed keys in ascending order with their slots
    sorted: Vec<(String, SlotId)>,
    sink: S,
}

impl<S: ValueSink> std::fmt::Debug for ValueTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueTable")
            .field("capacity", &self.entries.capacity())
            .field("len", &self.sorted.len())
            .finish_non_exhaustive()
    }
}

impl<S: ValueSink> ValueTable<S> {
    /// Creates a table with `config.max_values` slots.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidConfig`](crate::OverlayError::InvalidConfig)
    /// if `config.max_values` is zero.
    pub fn new(config: &OverlayConfig, sink: S) -> Result<Self> {
        Self::with_capacity(config.max_values, sink)
    }

    /// Creates a table with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidConfig`](crate::OverlayError::InvalidConfig)
    /// if `capacity` is zero.
    pub fn with_capacity(capacity: usize, sink: S) -> Result<Self> {
        Ok(Self {
            entries: RingBuffer::new(capacity)?,
            sorted: Vec::with_capacity(capacity),
            sink,
        })
    }

    fn position(&self, key: &str) -> std::result::Result<usize, usize> {
        self.sorted
            .binary_search_by(|(existing, _)| existing.as_str().cmp(key))
    }

    /// Shows `value` under `key`.
    ///
    /// Returns the key's slot, or `None` if the key is new and the table is
    /// full.
    pub fn set(&mut self, key: &str, value: &str) -> Option<SlotId> {
        match self.position(key) {
            Ok(rank) => {
                let slot = self.sorted[rank].1;
                if let Some(entry) = self.entries.get_mut(slot) {
                    value.clone_into(&mut entry.content_mut().value);
                }
                self.sink.on_value_display(slot, key, value, rank);
                Some(slot)
            }
            Err(rank) => {
                let Some(slot) = self.entries.try_acquire() else {
                    trace!(key, capacity = self.capacity(), "value table full, dropping key");
                    return None;
                };
                if let Some(entry) = self.entries.get_mut(slot) {
                    *entry.content_mut() = ValueEntry {
                        key: key.to_string(),
                        value: value.to_string(),
                    };
                }
                self.sorted.insert(rank, (key.to_string(), slot));

                for (row, (_, id)) in self.sorted.iter().enumerate() {
                    self.sink.on_value_reorder(*id, row);
                }
                self.sink.on_value_display(slot, key, value, rank);
                trace!(key, slot = slot.0, rank, "value key added");
                Some(slot)
            }
        }
    }

    /// Stops showing `key`, returning its slot to the pool.
    ///
    /// Returns false if the key was not shown.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::UnknownSlot`](crate::OverlayError::UnknownSlot)
    /// if the slot bookkeeping is out of sync with the pool.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let Ok(rank) = self.position(key) else {
            return Ok(false);
        };

        let (key, slot) = self.sorted.remove(rank);
        self.entries.release(slot)?;
        self.sink.on_value_removed(slot, &key);
        trace!(key, slot = slot.0, "value key removed");
        Ok(true)
    }

    /// Current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let rank = self.position(key).ok()?;
        let slot = self.sorted[rank].1;
        self.entries
            .get(slot)
            .map(|entry| entry.content().value.as_str())
    }

    /// Row of `key` in the sorted table.
    #[must_use]
    pub fn rank(&self, key: &str) -> Option<usize> {
        self.position(key).ok()
    }

    /// Snapshot of `(key, value, rank)` in row order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String, usize)> {
        self.sorted
            .iter()
            .enumerate()
            .filter_map(|(rank, (key, slot))| {
                let entry = self.entries.get(*slot)?;
                Some((key.clone(), entry.content().value.clone(), rank))
            })
            .collect()
    }

    /// Sorted keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.sorted.iter().map(|(key, _)| key.as_str())
    }

    /// Number of keys shown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Returns true if no key is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Maximum number of keys.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
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

impl<S: ValueSink> HubSubscriber for ValueTable<S> {
    fn on_value(&mut self, event: &ValueEvent) -> Result<()> {
        self.set(&event.key, &event.value);
        Ok(())
    }

    fn on_remove(&mut self, key: &str) -> Result<()> {
        self.remove(key).map(|_| ())
    }
}
