//! Fixed-capacity pool of reusable display slots.
//!
//! All slots are created up front. A slot is either idle (in the free pool)
//! or sits in the reuse order, oldest first. When no idle slot is left, the
//! oldest slot in the reuse order is recycled for new content. A buffer always
//! has at least one slot, so acquisition never fails.

use std::collections::VecDeque;

use crate::error::{OverlayError, Result};

/// Stable identity of a slot, valid for the lifetime of its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// A pooled display unit.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    id: SlotId,
    active: bool,
    content: T,
}

impl<T> Slot<T> {
    /// The slot's identity.
    #[must_use]
    pub const fn id(&self) -> SlotId {
        self.id
    }

    /// Whether the slot is currently shown.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The slot's content.
    #[must_use]
    pub const fn content(&self) -> &T {
        &self.content
    }

    /// Mutable access to the slot's content.
    pub fn content_mut(&mut self) -> &mut T {
        &mut self.content
    }
}

/// Fixed-capacity slot pool with FIFO recycling.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Slot<T>>,
    /// Released or never-used slots, next one handed out first
    idle: VecDeque<SlotId>,
    /// Slots holding content, oldest first
    order: VecDeque<SlotId>,
}

impl<T: Default> RingBuffer<T> {
    /// Creates a buffer with `capacity` idle slots of default content.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidConfig`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_factory(capacity, |_| T::default())
    }
}

impl<T> RingBuffer<T> {
    /// Creates a buffer, building each slot's initial content with `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidConfig`] if `capacity` is zero.
    pub fn with_factory(capacity: usize, mut factory: impl FnMut(SlotId) -> T) -> Result<Self> {
        if capacity == 0 {
            return Err(OverlayError::InvalidConfig(
                "ring buffer capacity must be greater than zero".to_string(),
            ));
        }

        let slots = (0..capacity)
            .map(|i| Slot {
                id: SlotId(i),
                active: false,
                content: factory(SlotId(i)),
            })
            .collect();

        Ok(Self {
            slots,
            idle: (0..capacity).map(SlotId).collect(),
            order: VecDeque::with_capacity(capacity),
        })
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently shown.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Number of slots in the idle pool.
    #[must_use]
    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }

    /// Hands out an idle slot, or recycles the one displayed the longest.
    ///
    /// The returned slot is active and moved to the back of the reuse order.
    /// Its content still holds whatever it showed before; callers overwrite it.
    pub fn acquire_or_recycle(&mut self) -> SlotId {
        // idle and order partition the slots, and there is at least one slot
        let id = self
            .idle
            .pop_front()
            .or_else(|| self.order.pop_front())
            .unwrap_or(SlotId(0));
        self.order.push_back(id);
        self.slots[id.0].active = true;
        id
    }

    /// Hands out an idle slot without ever recycling.
    pub fn try_acquire(&mut self) -> Option<SlotId> {
        let id = self.idle.pop_front()?;
        self.order.push_back(id);
        self.slots[id.0].active = true;
        Some(id)
    }

    /// Deactivates a slot and returns it to the idle pool.
    ///
    /// Releasing a slot that is already idle does nothing.
    pub fn release(&mut self, id: SlotId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or(OverlayError::UnknownSlot(id.0))?;
        slot.active = false;

        if let Some(pos) = self.order.iter().position(|s| *s == id) {
            self.order.remove(pos);
            self.idle.push_back(id);
        }
        Ok(())
    }

    /// Hides every slot while keeping the reuse order.
    ///
    /// Nothing is returned to the idle pool, so the next acquisitions recycle
    /// the hidden slots oldest first.
    pub fn deactivate_all(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
        }
    }

    /// Looks up a slot.
    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&Slot<T>> {
        self.slots.get(id.0)
    }

    /// Looks up a slot mutably.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut Slot<T>> {
        self.slots.get_mut(id.0)
    }

    /// Active slots, oldest first.
    pub fn iter_display_order(&self) -> impl Iterator<Item = &Slot<T>> + '_ {
        self.order
            .iter()
            .map(|id| &self.slots[id.0])
            .filter(|slot| slot.active)
    }

    /// All slots by id, active or not.
    pub fn iter(&self) -> impl Iterator<Item = &Slot<T>> + '_ {
        self.slots.iter()
    }

    /// All slots by id, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Slot<T>> + '_ {
        self.slots.iter_mut()
    }
}
