//! Generic bounded ring, parameterised over concurrency mode.
//!
//! The layout keeps the two contended cursor words on their own cache
//! lines; everything after them is immutable once constructed:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ producer cursor (cache-padded)   ← producers contend here│
//! ├──────────────────────────────────────────────────────────┤
//! │ consumer cursor (cache-padded)   ← consumers contend here│
//! ├──────────────────────────────────────────────────────────┤
//! │ size / mask / capacity / descriptor counter / slot array │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Counters are free-running 32-bit values; a slot is always addressed as
//! `counter & mask`. Occupancy arithmetic is wrapping u32 subtraction:
//! `free = capacity + consumer.tail - producer.head` and
//! `available = producer.tail - consumer.head`, both of which stay in
//! `[0, capacity]` because the slot array is strictly larger than the
//! capacity.

use std::marker::PhantomData;
use std::mem;

use crossbeam_utils::CachePadded;

use crate::cursor::{Cursor, Mode};
use crate::descriptor::{DescriptorCounter, Fifo};
use crate::invariants::{debug_assert_quiescent, debug_assert_within_capacity};
use crate::math::align_up_pow2;
use crate::slot::Slot;

/// Bounded lock-free FIFO with four concurrency modes.
///
/// `SIZE` is the requested capacity; the slot array is rounded up to the
/// next power of two above it. `M` selects the reservation/commit protocol:
/// [`crate::Spsc`], [`crate::Mpmc`], [`crate::MpmcHts`] or
/// [`crate::MpmcRts`]. The mode also sets the default handle limits — one
/// producer and one consumer in SPSC mode, unlimited otherwise.
///
/// All modes are FIFO on commit order: elements become visible in the
/// order producer tails advance, which matches reservation order. Which
/// producer wins a reservation race is whatever the CAS schedule grants.
#[repr(C)]
pub struct Ring<T, M: Mode, const SIZE: u32> {
    producer: CachePadded<M::Side>,
    consumer: CachePadded<M::Side>,
    size: u32,
    mask: u32,
    capacity: u32,
    counter: DescriptorCounter,
    slots: Box<[Slot<T>]>,
    /// `fn() -> M` keeps the marker out of the auto-trait calculus: the
    /// ring is Send/Sync based on `T` and the cursors alone.
    _mode: PhantomData<fn() -> M>,
}

impl<T, M: Mode, const SIZE: u32> Ring<T, M, SIZE> {
    /// Creates an empty ring.
    ///
    /// # Panics
    ///
    /// Panics when `SIZE` is zero or exceeds 2³⁰ (the counter arithmetic
    /// is 32-bit and the rounded slot count must fit a `u32`).
    pub fn new() -> Self {
        assert!(SIZE >= 1, "ring capacity must be at least 1");
        assert!(
            SIZE <= 1 << 30,
            "ring capacity must not exceed 2^30 slots"
        );
        let size = align_up_pow2(SIZE);
        Self {
            producer: CachePadded::new(M::Side::new(SIZE)),
            consumer: CachePadded::new(M::Side::new(SIZE)),
            size,
            mask: size - 1,
            capacity: SIZE,
            counter: DescriptorCounter::new(M::MAX_PRODUCERS, M::MAX_CONSUMERS),
            slots: Slot::boxed_array(size as usize),
            _mode: PhantomData,
        }
    }

    /// Requested capacity (not the rounded slot count).
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    fn slot(&self, pos: u32) -> &Slot<T> {
        &self.slots[(pos & self.mask) as usize]
    }

    /// Attempts to enqueue one element; `false` when the ring is full (the
    /// value is dropped in that case).
    pub fn push(&self, value: T) -> bool {
        let capacity = self.capacity;
        let Some(pos) = self
            .producer
            .reserve(|head| capacity.wrapping_add(self.consumer.committed()).wrapping_sub(head))
        else {
            return false;
        };
        // SAFETY: the reservation protocol grants this producer exclusive
        // ownership of the slot, which stayed uninitialised since the
        // consumer side committed past it.
        unsafe { self.slot(pos).write(value) };
        self.producer.commit(pos);
        true
    }

    /// Attempts to dequeue one element into `out`; `false` when empty.
    pub fn pop(&self, out: &mut T) -> bool {
        let Some(pos) = self
            .consumer
            .reserve(|head| self.producer.committed().wrapping_sub(head))
        else {
            return false;
        };
        // SAFETY: the Acquire load of the producer's commit frontier
        // ordered the slot's construction before this reservation; the
        // consumer owns the slot until its own commit below.
        *out = unsafe { self.slot(pos).read() };
        self.consumer.commit(pos);
        true
    }
}

impl<T, M: Mode, const SIZE: u32> Default for Ring<T, M, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M: Mode, const SIZE: u32> Fifo for Ring<T, M, SIZE> {
    type Item = T;

    #[inline]
    fn push(&self, value: T) -> bool {
        Ring::push(self, value)
    }

    #[inline]
    fn pop(&self, out: &mut T) -> bool {
        Ring::pop(self, out)
    }

    fn descriptor(&self) -> &DescriptorCounter {
        &self.counter
    }
}

impl<T, M: Mode, const SIZE: u32> Drop for Ring<T, M, SIZE> {
    fn drop(&mut self) {
        debug_assert_quiescent!(self.counter);
        if mem::needs_drop::<T>() {
            // With every handle released and no operation in flight, both
            // cursors satisfy head == tail, so [consumer.head,
            // producer.head) is exactly the set of live slots.
            let mut pos = self.consumer.reserved();
            let end = self.producer.reserved();
            debug_assert_within_capacity!(end.wrapping_sub(pos), self.capacity);
            while pos != end {
                // SAFETY: slots in the live range were constructed by a
                // committed push and never consumed; `&mut self` rules out
                // concurrent access.
                unsafe { self.slot(pos).drop_in_place() };
                pos = pos.wrapping_add(1);
            }
        }
    }
}
