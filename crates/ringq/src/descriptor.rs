//! Handle registration: descriptor counting and scoped producer/consumer
//! handles.
//!
//! A queue's concurrency contract is enforced at handle granularity. Every
//! queue owns a [`DescriptorCounter`] with a fixed maximum number of
//! producer and consumer handles; SPSC-flavoured queues cap both sides at
//! one, the multi-producer ring modes default to unlimited. Registration is
//! the licence to call `push`/`pop` from a thread — the single-writer
//! fields inside the SPSC queues are sound precisely because at most one
//! producer handle and one consumer handle can exist at a time.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::QueueError;

/// Tracks how many producer and consumer handles are live on one queue.
///
/// The maxima are fixed at construction; [`DescriptorCounter::UNLIMITED`]
/// disables the corresponding check.
#[derive(Debug)]
pub struct DescriptorCounter {
    producers: AtomicU32,
    consumers: AtomicU32,
    max_producers: u32,
    max_consumers: u32,
}

impl DescriptorCounter {
    /// Sentinel maximum meaning "no limit".
    pub const UNLIMITED: u32 = u32::MAX;

    pub(crate) const fn new(max_producers: u32, max_consumers: u32) -> Self {
        Self {
            producers: AtomicU32::new(0),
            consumers: AtomicU32::new(0),
            max_producers,
            max_consumers,
        }
    }

    /// Number of currently registered producer handles.
    pub fn live_producers(&self) -> u32 {
        self.producers.load(Ordering::Acquire)
    }

    /// Number of currently registered consumer handles.
    pub fn live_consumers(&self) -> u32 {
        self.consumers.load(Ordering::Acquire)
    }

    /// Maximum number of producer handles.
    pub fn max_producers(&self) -> u32 {
        self.max_producers
    }

    /// Maximum number of consumer handles.
    pub fn max_consumers(&self) -> u32 {
        self.max_consumers
    }

    /// Claim a producer slot. Over-claims are undone before reporting the error.
    fn register_producer(&self) -> Result<(), QueueError> {
        let prev = self.producers.fetch_add(1, Ordering::SeqCst);
        if prev >= self.max_producers {
            self.producers.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::TooManyProducers {
                max: self.max_producers,
            });
        }
        Ok(())
    }

    fn register_consumer(&self) -> Result<(), QueueError> {
        let prev = self.consumers.fetch_add(1, Ordering::SeqCst);
        if prev >= self.max_consumers {
            self.consumers.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::TooManyConsumers {
                max: self.max_consumers,
            });
        }
        Ok(())
    }

    fn release_producer(&self) {
        self.producers.fetch_sub(1, Ordering::SeqCst);
    }

    fn release_consumer(&self) {
        self.consumers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Non-blocking FIFO surface shared by every queue in this crate.
///
/// `push` and `pop` never park the calling thread: they either complete or
/// report backpressure by returning `false`. Waiting, if any, is the
/// caller's choice (see [`crate::Backoff`]).
pub trait Fifo {
    /// Element type carried by the queue.
    type Item;

    /// Attempts to enqueue one element.
    ///
    /// Returns `false` when the queue is full, in which case `value` is
    /// dropped — clone before the call if you intend to retry with the same
    /// element.
    fn push(&self, value: Self::Item) -> bool;

    /// Attempts to dequeue one element into `out`, dropping the previous
    /// contents of `out` on success.
    ///
    /// Returns `false` when the queue is empty.
    fn pop(&self, out: &mut Self::Item) -> bool;

    /// The queue's handle registration counter.
    fn descriptor(&self) -> &DescriptorCounter;

    /// Registers a scoped producer handle.
    fn producer(&self) -> Result<Producer<'_, Self>, QueueError>
    where
        Self: Sized,
    {
        Producer::register(self)
    }

    /// Registers a scoped consumer handle.
    fn consumer(&self) -> Result<Consumer<'_, Self>, QueueError>
    where
        Self: Sized,
    {
        Consumer::register(self)
    }
}

/// Scoped producer registration on a queue.
///
/// Construction claims a producer slot in the queue's descriptor counter
/// and fails with [`QueueError::TooManyProducers`] once the limit is
/// reached; dropping the handle releases the slot. The handle cannot be
/// cloned, so each successful registration is released exactly once.
pub struct Producer<'a, Q: Fifo> {
    queue: &'a Q,
}

impl<'a, Q: Fifo> Producer<'a, Q> {
    fn register(queue: &'a Q) -> Result<Self, QueueError> {
        queue.descriptor().register_producer()?;
        Ok(Self { queue })
    }

    /// Forwards to the queue's `push`.
    #[inline]
    pub fn push(&self, value: Q::Item) -> bool {
        self.queue.push(value)
    }
}

impl<Q: Fifo> Drop for Producer<'_, Q> {
    fn drop(&mut self) {
        self.queue.descriptor().release_producer();
    }
}

/// Scoped consumer registration on a queue. See [`Producer`].
pub struct Consumer<'a, Q: Fifo> {
    queue: &'a Q,
}

impl<'a, Q: Fifo> Consumer<'a, Q> {
    fn register(queue: &'a Q) -> Result<Self, QueueError> {
        queue.descriptor().register_consumer()?;
        Ok(Self { queue })
    }

    /// Forwards to the queue's `pop`.
    #[inline]
    pub fn pop(&self, out: &mut Q::Item) -> bool {
        self.queue.pop(out)
    }
}

impl<Q: Fifo> Drop for Consumer<'_, Q> {
    fn drop(&mut self) {
        self.queue.descriptor().release_consumer();
    }
}
