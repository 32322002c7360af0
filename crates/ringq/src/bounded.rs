//! Bounded single-producer single-consumer ring.
//!
//! # Memory ordering protocol
//!
//! Two free-running indices wrap at `capacity + 1` (one sentinel position,
//! so `read == write` unambiguously means empty and `write + 1 == read`
//! means full):
//!
//! **Producer (push):**
//! 1. Load `write_idx` with Relaxed (only the producer writes it)
//! 2. Load `read_idx` with Acquire (synchronizes with the consumer's
//!    Release store; the slot past `read_idx` is free to reuse)
//! 3. Construct the element in place
//! 4. Store `write_idx` with Release (publishes the element)
//!
//! **Consumer (pop):**
//! 1. Load `read_idx` with Relaxed (only the consumer writes it)
//! 2. Load `write_idx` with Acquire (synchronizes with the producer's
//!    Release store; elements up to `write_idx` are fully constructed)
//! 3. Move the element out
//! 4. Store `read_idx` with Release (returns the slot to the producer)
//!
//! The single-writer invariants are enforced through handle registration:
//! the descriptor counter admits at most one producer and one consumer
//! handle. Calling `push` from two threads without that discipline violates
//! the queue's contract.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::descriptor::{DescriptorCounter, Fifo};
use crate::error::QueueError;
use crate::invariants::debug_assert_quiescent;
use crate::slot::Slot;

/// Bounded lock-free SPSC FIFO with wrap-at-size indices.
///
/// Stores `capacity + 1` slots; the extra sentinel position is what lets
/// index equality distinguish empty from full. The read and write indices
/// live on separate cache lines so the producer and consumer never contend
/// on the same line.
pub struct BoundedSpscQueue<T> {
    size: usize,
    slots: Box<[Slot<T>]>,
    read_idx: CachePadded<AtomicUsize>,
    write_idx: CachePadded<AtomicUsize>,
    counter: DescriptorCounter,
}

impl<T> BoundedSpscQueue<T> {
    /// Creates a queue holding up to `capacity` elements.
    ///
    /// Fails with [`QueueError::CapacityTooSmall`] when `capacity` is zero.
    pub fn new(capacity: u32) -> Result<Self, QueueError> {
        if capacity < 1 {
            return Err(QueueError::CapacityTooSmall);
        }
        let size = capacity as usize + 1;
        Ok(Self {
            size,
            slots: Slot::boxed_array(size),
            read_idx: CachePadded::new(AtomicUsize::new(0)),
            write_idx: CachePadded::new(AtomicUsize::new(0)),
            counter: DescriptorCounter::new(1, 1),
        })
    }

    #[inline]
    fn wrap(&self, idx: usize) -> usize {
        let next = idx + 1;
        if next == self.size {
            0
        } else {
            next
        }
    }

    /// Attempts to enqueue one element; `false` when full (the value is
    /// dropped in that case).
    pub fn push(&self, value: T) -> bool {
        let cur_write = self.write_idx.load(Ordering::Relaxed);
        let next = self.wrap(cur_write);
        if next != self.read_idx.load(Ordering::Acquire) {
            // SAFETY: `cur_write` is outside the live range [read, write),
            // so the slot is uninitialised, and the single-producer
            // discipline means no one else writes it before the Release
            // store publishes it.
            unsafe { self.slots[cur_write].write(value) };
            self.write_idx.store(next, Ordering::Release);
            return true;
        }
        false
    }

    /// Attempts to dequeue into `out`; `false` when empty.
    pub fn pop(&self, out: &mut T) -> bool {
        let cur_read = self.read_idx.load(Ordering::Relaxed);
        if cur_read == self.write_idx.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `cur_read` is inside the live range; the Acquire load of
        // `write_idx` synchronizes with the producer's Release store, so the
        // element is fully constructed. Moving it out leaves the slot
        // uninitialised before the Release store returns it to the producer.
        *out = unsafe { self.slots[cur_read].read() };
        self.read_idx.store(self.wrap(cur_read), Ordering::Release);
        true
    }

    /// Borrows the head element without consuming it.
    ///
    /// The borrow is valid until the next `pop`/`pop_front` on this queue;
    /// the single-consumer discipline makes the inspect-then-consume
    /// pattern race-free.
    pub fn front(&self) -> Option<&T> {
        let cur_read = self.read_idx.load(Ordering::Relaxed);
        if cur_read == self.write_idx.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: the slot is initialised (inside the live range) and only
        // this consumer can retire it.
        Some(unsafe { self.slots[cur_read].as_ref() })
    }

    /// Drops the head element without returning it.
    ///
    /// # Panics
    ///
    /// Panics when the queue is empty. Popping blind is the second half of
    /// the `front`-then-`pop_front` pattern; calling it without a prior
    /// non-empty check is a programmer error, not backpressure.
    pub fn pop_front(&self) {
        let cur_read = self.read_idx.load(Ordering::Relaxed);
        assert_ne!(
            cur_read,
            self.write_idx.load(Ordering::Acquire),
            "pop_front on an empty queue"
        );
        // SAFETY: same liveness argument as `pop`.
        unsafe { self.slots[cur_read].drop_in_place() };
        self.read_idx.store(self.wrap(cur_read), Ordering::Release);
    }

    /// Returns `true` when no element is available.
    pub fn is_empty(&self) -> bool {
        self.read_idx.load(Ordering::Acquire) == self.write_idx.load(Ordering::Acquire)
    }

    /// Returns `true` when no free slot is available.
    pub fn is_full(&self) -> bool {
        let next = self.wrap(self.write_idx.load(Ordering::Acquire));
        next == self.read_idx.load(Ordering::Acquire)
    }

    /// Racy occupancy snapshot, always within `[0, capacity]`.
    ///
    /// Either index may be stale by the time both are read; the value is
    /// diagnostic, not a synchronisation primitive.
    pub fn approximate_size(&self) -> usize {
        let write = self.write_idx.load(Ordering::Acquire);
        let read = self.read_idx.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            write + self.size - read
        }
    }

    /// Maximum number of elements the queue can hold.
    pub fn capacity(&self) -> usize {
        self.size - 1
    }
}

impl<T> Fifo for BoundedSpscQueue<T> {
    type Item = T;

    #[inline]
    fn push(&self, value: T) -> bool {
        BoundedSpscQueue::push(self, value)
    }

    #[inline]
    fn pop(&self, out: &mut T) -> bool {
        BoundedSpscQueue::pop(self, out)
    }

    fn descriptor(&self) -> &DescriptorCounter {
        &self.counter
    }
}

impl<T> Drop for BoundedSpscQueue<T> {
    fn drop(&mut self) {
        debug_assert_quiescent!(self.counter);
        if mem::needs_drop::<T>() {
            let mut idx = self.read_idx.load(Ordering::Relaxed);
            let end = self.write_idx.load(Ordering::Relaxed);
            while idx != end {
                // SAFETY: [read, write) is exactly the initialised range,
                // and `&mut self` means no concurrent access.
                unsafe { self.slots[idx].drop_in_place() };
                idx = self.wrap(idx);
            }
        }
    }
}
