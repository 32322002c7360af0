//! Unbounded single-producer single-consumer linked queue.
//!
//! A singly linked chain with a sentinel: `head` names the most recently
//! drained node, and its `next` field, when non-null, holds the next
//! deliverable value. The producer appends at `tail`; the consumer only
//! ever advances `head`.
//!
//! # Node recycling
//!
//! Two producer-private pointers form a freelist inside the chain itself.
//! `unused` lags behind the consumer; `head_copy` caches the last observed
//! consumer `head`. Nodes in `[unused, head_copy)` have been passed by the
//! consumer and belong to the producer again, so `push` reuses them before
//! touching the allocator. Only when the cache refresh (an Acquire load of
//! `head`) still yields nothing does the producer allocate. When producer
//! and consumer run at similar rates, steady state allocates nothing.
//!
//! Every node in the chain always holds a live value: `pop` backfills the
//! drained slot with `T::default()` rather than leaving it vacant, which
//! keeps teardown and recycling uniform (drained nodes linger on the
//! freelist holding their payload until reused or freed). This is why the
//! element type must be `Default`; the backfill is a plain default
//! construction per pop.

use std::cell::UnsafeCell;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crossbeam_utils::CachePadded;

use crate::descriptor::{DescriptorCounter, Fifo};
use crate::invariants::debug_assert_quiescent;

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: T,
}

impl<T> Node<T> {
    fn boxed(value: T) -> *mut Self {
        Box::into_raw(Box::new(Self {
            next: AtomicPtr::new(ptr::null_mut()),
            value,
        }))
    }
}

/// Producer-private cursors. Single-writer: only the registered producer
/// touches these, which is what licenses the `UnsafeCell`.
struct ProducerSide<T> {
    tail: *mut Node<T>,
    unused: *mut Node<T>,
    head_copy: *mut Node<T>,
}

/// Unbounded lock-free SPSC FIFO with a per-queue node freelist.
///
/// `push` never fails (it returns `true` unconditionally); backpressure
/// does not exist on this queue, only allocator pressure. The consumer-side
/// `head` and the producer-side pointer group live on separate cache lines.
pub struct UnboundedSpscQueue<T> {
    head: CachePadded<AtomicPtr<Node<T>>>,
    prod: CachePadded<UnsafeCell<ProducerSide<T>>>,
    len: AtomicU32,
    counter: DescriptorCounter,
}

// Safety: the queue hands each node to exactly one side at a time. The
// producer-side cursors are single-writer (enforced by the 1/1 descriptor
// limit), and all cross-thread publication goes through Release/Acquire
// pairs on `next` and `head`.
unsafe impl<T: Send> Send for UnboundedSpscQueue<T> {}
unsafe impl<T: Send> Sync for UnboundedSpscQueue<T> {}

impl<T: Default> UnboundedSpscQueue<T> {
    /// Creates an empty queue. The sentinel node is seeded with
    /// `T::default()`.
    pub fn new() -> Self {
        let sentinel = Node::boxed(T::default());
        Self {
            head: CachePadded::new(AtomicPtr::new(sentinel)),
            prod: CachePadded::new(UnsafeCell::new(ProducerSide {
                tail: sentinel,
                unused: sentinel,
                head_copy: sentinel,
            })),
            len: AtomicU32::new(0),
            counter: DescriptorCounter::new(1, 1),
        }
    }

    /// Enqueues one element. Always returns `true`.
    pub fn push(&self, value: T) -> bool {
        // SAFETY: single-producer discipline (descriptor limit of one
        // producer handle) makes this the only writer of the producer side.
        let prod = unsafe { &mut *self.prod.get() };
        let node = self.acquire_node(prod, value);
        // SAFETY: `tail` is the last node of the chain and owned by the
        // producer; the Release store publishes the fully constructed node.
        unsafe { (*prod.tail).next.store(node, Ordering::Release) };
        prod.tail = node;
        self.len.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Dequeues one element into `out`; `false` when empty.
    ///
    /// The drained node stays in the chain with a `T::default()` payload
    /// until the producer recycles it.
    pub fn pop(&self, out: &mut T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: `head` always points at a valid node owned by the queue.
        let next = unsafe { (*head).next.load(Ordering::Acquire) };
        if next.is_null() {
            return false;
        }
        // SAFETY: the Acquire load of `next` synchronizes with the
        // producer's Release store, so the node is fully constructed, and
        // the producer will not reclaim it until `head` moves past it.
        *out = unsafe { mem::replace(&mut (*next).value, T::default()) };
        self.head.store(next, Ordering::Release);
        self.len.fetch_sub(1, Ordering::Relaxed);
        true
    }

    /// Picks a node for the next append: freelist first, allocator last.
    fn acquire_node(&self, prod: &mut ProducerSide<T>, value: T) -> *mut Node<T> {
        if prod.unused != prod.head_copy {
            // SAFETY: checked just above.
            return unsafe { Self::recycle(prod, value) };
        }
        prod.head_copy = self.head.load(Ordering::Acquire);
        if prod.unused != prod.head_copy {
            // SAFETY: checked just above, against the refreshed cache.
            return unsafe { Self::recycle(prod, value) };
        }
        Node::boxed(value)
    }

    /// Reuses the node at `unused`, dropping its stale payload.
    ///
    /// # Safety
    ///
    /// Requires `prod.unused != prod.head_copy`: the consumer has moved past
    /// the node, so it belongs exclusively to the producer again.
    unsafe fn recycle(prod: &mut ProducerSide<T>, value: T) -> *mut Node<T> {
        let node = prod.unused;
        prod.unused = (*node).next.load(Ordering::Relaxed);
        (*node).value = value;
        (*node).next.store(ptr::null_mut(), Ordering::Relaxed);
        node
    }
}

impl<T> UnboundedSpscQueue<T> {
    /// Racy element count, incremented on push and decremented on pop.
    ///
    /// Diagnostic only: the 32-bit counter wraps after 2³² operations and
    /// either side's update may not be visible yet.
    pub fn approximate_size(&self) -> usize {
        self.len.load(Ordering::Relaxed) as usize
    }
}

impl<T: Default> Default for UnboundedSpscQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> Fifo for UnboundedSpscQueue<T> {
    type Item = T;

    #[inline]
    fn push(&self, value: T) -> bool {
        UnboundedSpscQueue::push(self, value)
    }

    #[inline]
    fn pop(&self, out: &mut T) -> bool {
        UnboundedSpscQueue::pop(self, out)
    }

    fn descriptor(&self) -> &DescriptorCounter {
        &self.counter
    }
}

impl<T> Drop for UnboundedSpscQueue<T> {
    fn drop(&mut self) {
        debug_assert_quiescent!(self.counter);
        let mut node = self.prod.get_mut().unused;
        while !node.is_null() {
            // SAFETY: `&mut self` means no concurrent access; every node
            // from `unused` onward is owned by the queue and holds a live
            // value, so reconstituting the Box drops both.
            let next = unsafe { (*node).next.load(Ordering::Relaxed) };
            drop(unsafe { Box::from_raw(node) });
            node = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let queue = UnboundedSpscQueue::new();
        for i in 0..100u64 {
            assert!(queue.push(i));
        }
        assert_eq!(queue.approximate_size(), 100);

        let mut out = 0u64;
        for i in 0..100 {
            assert!(queue.pop(&mut out));
            assert_eq!(out, i);
        }
        assert!(!queue.pop(&mut out));
        assert_eq!(queue.approximate_size(), 0);
    }

    #[test]
    fn recycles_drained_nodes() {
        let queue = UnboundedSpscQueue::new();
        let mut out = String::new();
        // Interleave so the freelist always has a drained node to hand back.
        for round in 0..1000 {
            assert!(queue.push(round.to_string()));
            assert!(queue.push((round + 1).to_string()));
            assert!(queue.pop(&mut out));
            assert_eq!(out, round.to_string());
            assert!(queue.pop(&mut out));
        }
        assert_eq!(queue.approximate_size(), 0);
    }

    #[test]
    fn drop_frees_pending_elements() {
        let queue = UnboundedSpscQueue::new();
        for i in 0..10 {
            queue.push(format!("pending-{i}"));
        }
        // Dropped with elements still queued; miri would flag any leak or
        // double free in the chain walk.
        drop(queue);
    }
}
