//! Fixed-capacity tick-indexed ring buffer.
//!
//! Every tick maps to slot `tick mod capacity`. Writes silently overwrite
//! whatever occupied the slot; the capacity acts as a trailing window and the
//! caller is responsible for only reading ticks inside it.

use crate::{HISTORY_CAPACITY, Tick};

/// Per-actor history of values indexed by tick.
#[derive(Debug, Clone)]
pub struct TickHistory<T> {
    slots: Box<[Option<T>]>,
    mask: usize,
}

impl<T> TickHistory<T> {
    /// Create a history with `capacity` slots.
    ///
    /// # Panics
    /// If `capacity` is zero, not a power of two, or larger than the tick
    /// space (65536).
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity <= usize::from(u16::MAX) + 1,
            "history capacity must be a power of two no larger than 65536, got {capacity}"
        );

        Self {
            slots: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot index used for `tick`.
    pub fn slot(&self, tick: Tick) -> usize {
        usize::from(tick) & self.mask
    }

    /// Store `value` at `tick`'s slot, replacing anything already there.
    pub fn record(&mut self, tick: Tick, value: T) {
        let slot = self.slot(tick);
        self.slots[slot] = Some(value);
    }

    /// Whatever occupies `tick`'s slot; `None` only if it was never written.
    pub fn get(&self, tick: Tick) -> Option<&T> {
        self.slots[self.slot(tick)].as_ref()
    }

    /// Forget every recorded value.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

impl<T> Default for TickHistory<T> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}
