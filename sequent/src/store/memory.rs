//! In-memory ring store.
//!
//! A fixed block of power-of-two slots indexed by bitmask. The store itself
//! is deliberately dumb: it writes, publishes, and reads slots under the
//! contracts documented on [`EventStore`]; serialization of appenders and the
//! capacity window (backpressure) are enforced by the publish path above it.

use crate::core::{Event, MAX_CAPACITY, MIN_CAPACITY};
use crate::store::cursor::CachePadded;
use crate::store::EventStore;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI64, Ordering};

/// Fixed-capacity in-memory event slots.
///
/// The default [`EventStore`] implementation: events live in a ring of
/// `capacity` slots, the slot for sequence `n` being `n & (capacity - 1)`.
/// A slot is overwritten exactly `capacity` sequences later, which is safe
/// because the publish path never runs further than `capacity` ahead of the
/// slowest group.
pub struct InMemoryEventStore<E> {
    slots: Box<[UnsafeCell<MaybeUninit<E>>]>,
    /// Highest sequence whose slot write is complete; -1 before any append.
    published: CachePadded<AtomicI64>,
    capacity_mask: usize,
}

// SAFETY: the store can move between threads when the events can.
unsafe impl<E: Send> Send for InMemoryEventStore<E> {}

// SAFETY: shared access is coordinated by the published counter - readers
// only touch slots at or below it (acquire), the appender only touches the
// slot above it (release on publish).
unsafe impl<E: Send + Sync> Sync for InMemoryEventStore<E> {}

impl<E> InMemoryEventStore<E> {
    /// Creates a store with at least `capacity` slots.
    ///
    /// The value is rounded up to the next power of two and clamped to
    /// `[MIN_CAPACITY, MAX_CAPACITY]`. `build_workflow` validates strictly
    /// before construction, so rounding only matters when constructing a
    /// store directly.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().clamp(MIN_CAPACITY, MAX_CAPACITY);
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            published: CachePadded::new(AtomicI64::new(-1)),
            capacity_mask: capacity - 1,
        }
    }

    fn slot_index(&self, sequence: i64) -> usize {
        sequence as usize & self.capacity_mask
    }
}

impl<E: Event> EventStore<E> for InMemoryEventStore<E> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn published(&self) -> i64 {
        self.published.get().load(Ordering::Acquire)
    }

    fn append(&self, sequence: i64, event: E) {
        debug_assert_eq!(
            sequence,
            self.published.get().load(Ordering::Relaxed) + 1,
            "append must be dense and serialized"
        );

        let idx = self.slot_index(sequence);

        // SAFETY: We have exclusive write access to this slot because:
        // 1. Appends are serialized by the caller (single insertion point),
        //    so no other append touches any slot concurrently.
        // 2. Readers only access slots at or below `published`, and this
        //    sequence is above it until the release store below.
        // 3. The slot's previous occupant (sequence - capacity) is outside
        //    every reader's window: the caller never appends more than
        //    `capacity` past the slowest cursor.
        // The occupant is initialized exactly when the ring has wrapped.
        unsafe {
            let slot = self.slots[idx].get();
            if sequence >= self.slots.len() as i64 {
                (*slot).assume_init_drop();
            }
            (*slot).write(event);
        }

        // Publish the slot; pairs with the acquire load in published()/read().
        self.published.get().store(sequence, Ordering::Release);
    }

    fn read(&self, sequence: i64) -> E {
        debug_assert!(
            sequence >= 0 && sequence <= self.published(),
            "read of unpublished sequence {sequence}"
        );

        // SAFETY: We have read access to this slot because:
        // 1. The slot was initialized by the append that published
        //    `sequence`; the acquire load behind the debug_assert (and in
        //    every gate the caller passed) pairs with that release store.
        // 2. No append overwrites it while any reader is below
        //    `sequence + capacity`, which the publish path guarantees.
        // Cloning out leaves the slot initialized for other readers.
        unsafe { (*self.slots[self.slot_index(sequence)].get()).assume_init_ref().clone() }
    }
}

impl<E> Drop for InMemoryEventStore<E> {
    fn drop(&mut self) {
        // Exclusive access; only the live window holds initialized slots.
        let published = self.published.get().load(Ordering::Relaxed);
        if published < 0 {
            return;
        }

        let window_start = (published + 1 - self.slots.len() as i64).max(0);
        for sequence in window_start..=published {
            let idx = self.slot_index(sequence);
            // SAFETY: each initialized slot is dropped exactly once; the
            // range covers exactly the sequences whose writes have not been
            // overwritten.
            unsafe {
                (*self.slots[idx].get()).assume_init_drop();
            }
        }
    }
}

impl<E> fmt::Debug for InMemoryEventStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field("capacity", &self.slots.len())
            .field("published", &self.published.get().load(Ordering::Relaxed))
            .finish()
    }
}
