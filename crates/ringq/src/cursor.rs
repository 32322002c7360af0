//! Per-mode cursors for the generic [`crate::Ring`].
//!
//! Each side of a ring (producer, consumer) owns one cursor carrying two
//! 32-bit wrap-around counters: `head`, the reservation frontier, and
//! `tail`, the commit frontier. Every mode runs the same two-phase
//! protocol — reserve a position, do the slot work, commit — and differs
//! only in how reservation handles contention and how the commit
//! serialises against peers on the same side.
//!
//! # Memory ordering strategy
//!
//! - Counter values used to index the slot array are loaded with Acquire
//!   (the original DPDK protocol uses consume, which Rust does not have).
//! - Reservation CASes never publish slot contents and stay Relaxed in the
//!   classic MPMC mode; publication always travels through the commit
//!   store, which is Release in every mode.
//! - [`Cursor::committed`] is the load the *opposite* side uses to decide
//!   whether a slot is claimable, so it is Acquire in every mode: it pairs
//!   with the commit Release to order the slot contents before the claim.
//! - Spin waits (wait-your-turn tail commits, the HTS sync gate, the RTS
//!   window stall) re-load with the ordering of the loop they feed and
//!   issue [`std::hint::spin_loop`] between iterations. The hint is a
//!   courtesy to the sibling hyperthread; correctness never depends on it.

use std::hint;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::descriptor::DescriptorCounter;

/// One side of a ring: reservation and commit frontiers.
///
/// `reserve` claims the next position; `commit` publishes it to the
/// opposite side. The `budget` closure passed to `reserve` maps a candidate
/// position to the number of slots still claimable there, re-reading the
/// opposite side's commit frontier on every call so CAS retries see fresh
/// state.
pub trait Cursor: Send + Sync {
    /// Creates the cursor for a ring with the given requested capacity.
    fn new(capacity: u32) -> Self;

    /// Claims the next position, or returns `None` when `budget` reports
    /// no claimable slot.
    fn reserve(&self, budget: impl Fn(u32) -> u32) -> Option<u32>;

    /// Publishes the claim on `pos`, making the slot visible to the
    /// opposite side.
    fn commit(&self, pos: u32);

    /// Commit frontier, loaded with Acquire; pairs with the Release store
    /// in `commit`.
    fn committed(&self) -> u32;

    /// Reservation frontier. Teardown only; callers must guarantee no
    /// operation is in flight.
    fn reserved(&self) -> u32;
}

// ---------------------------------------------------------------------
// Packed 64-bit counter pairs (HTS and RTS)
// ---------------------------------------------------------------------

/// Packs two 32-bit counters into one word, first field in the high half.
///
/// The pack/unpack pair is the single source of truth for the layout: the
/// 64-bit CAS, the sync gate, and the frontier accessors all go through
/// it, so the layout choice is invisible to the protocol logic and
/// independent of target endianness.
#[inline]
const fn pack(hi: u32, lo: u32) -> u64 {
    ((hi as u64) << 32) | lo as u64
}

#[inline]
const fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

// ---------------------------------------------------------------------
// SPSC
// ---------------------------------------------------------------------

/// Cursor for the single-producer single-consumer mode.
///
/// With no peers on either side, reservation is a plain load + store and
/// the commit never waits.
pub struct SpscCursor {
    head: AtomicU32,
    tail: AtomicU32,
}

impl Cursor for SpscCursor {
    fn new(_capacity: u32) -> Self {
        Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }

    #[inline]
    fn reserve(&self, budget: impl Fn(u32) -> u32) -> Option<u32> {
        // Single writer: this thread is the only one moving `head`.
        let head = self.head.load(Ordering::Relaxed);
        if budget(head) < 1 {
            return None;
        }
        self.head.store(head.wrapping_add(1), Ordering::Relaxed);
        Some(head)
    }

    #[inline]
    fn commit(&self, pos: u32) {
        self.tail.store(pos.wrapping_add(1), Ordering::Release);
    }

    #[inline]
    fn committed(&self) -> u32 {
        self.tail.load(Ordering::Acquire)
    }

    #[inline]
    fn reserved(&self) -> u32 {
        self.head.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------
// MPMC, independent tails
// ---------------------------------------------------------------------

/// Cursor for the classic multi-producer mode.
///
/// Reservation is a CAS race on `head`; the commit waits until every peer
/// that reserved earlier has committed, so tails publish in reservation
/// order.
pub struct MpmcCursor {
    head: AtomicU32,
    tail: AtomicU32,
}

impl Cursor for MpmcCursor {
    fn new(_capacity: u32) -> Self {
        Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }

    fn reserve(&self, budget: impl Fn(u32) -> u32) -> Option<u32> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            if budget(head) < 1 {
                return None;
            }
            // Publication travels through `tail`; the reservation CAS
            // carries no payload and stays relaxed.
            match self.head.compare_exchange(
                head,
                head.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(head),
                Err(current) => head = current,
            }
        }
    }

    fn commit(&self, pos: u32) {
        // Wait-your-turn: peers that reserved before us commit before us.
        while self.tail.load(Ordering::Relaxed) != pos {
            hint::spin_loop();
        }
        self.tail.store(pos.wrapping_add(1), Ordering::Release);
    }

    #[inline]
    fn committed(&self) -> u32 {
        self.tail.load(Ordering::Acquire)
    }

    #[inline]
    fn reserved(&self) -> u32 {
        self.head.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------
// MPMC, head-tail synchronised
// ---------------------------------------------------------------------

/// Cursor for the head-tail synchronised mode.
///
/// Both counters live in one aligned 64-bit word. A reservation requires
/// the pair to be synchronised (`head == tail`, no reservation
/// outstanding) and claims via a 64-bit CAS over the whole word. The
/// commit is then a plain release store: no wait-your-turn spin, at the
/// cost of at most one reservation in flight per side.
pub struct HtsCursor {
    /// (head, tail), head in the high half.
    word: AtomicU64,
}

impl Cursor for HtsCursor {
    fn new(_capacity: u32) -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    fn reserve(&self, budget: impl Fn(u32) -> u32) -> Option<u32> {
        let mut cur = self.word.load(Ordering::Acquire);
        loop {
            let (mut head, mut tail) = unpack(cur);
            // Sync gate: wait out any outstanding reservation.
            while head != tail {
                hint::spin_loop();
                cur = self.word.load(Ordering::Acquire);
                (head, tail) = unpack(cur);
            }
            if budget(head) < 1 {
                return None;
            }
            match self.word.compare_exchange(
                cur,
                pack(head.wrapping_add(1), tail),
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(head),
                Err(current) => cur = current,
            }
        }
    }

    fn commit(&self, pos: u32) {
        // Between our reservation CAS and here the word reads
        // (pos + 1, pos), so no peer passes the sync gate and this store
        // has a single writer. Storing the full word re-synchronises the
        // pair.
        let next = pos.wrapping_add(1);
        self.word.store(pack(next, next), Ordering::Release);
    }

    #[inline]
    fn committed(&self) -> u32 {
        unpack(self.word.load(Ordering::Acquire)).1
    }

    #[inline]
    fn reserved(&self) -> u32 {
        unpack(self.word.load(Ordering::Relaxed)).0
    }
}

// ---------------------------------------------------------------------
// MPMC, relaxed tail sync
// ---------------------------------------------------------------------

/// Cursor for the relaxed tail sync mode.
///
/// Each frontier is a packed (position, reference) pair; the reference is
/// a generation counter bumped on every reservation. Commits CAS the tail
/// generation forward one at a time and, when the last outstanding
/// reservation commits, snap the tail position up to the head position in
/// one step. Multiple reservations may be in flight, bounded by
/// `dis_max = capacity / 8`.
pub struct RtsCursor {
    /// (position, reference), position in the high half.
    head: AtomicU64,
    tail: AtomicU64,
    dis_max: u32,
}

impl Cursor for RtsCursor {
    fn new(capacity: u32) -> Self {
        Self {
            head: AtomicU64::new(0),
            tail: AtomicU64::new(0),
            dis_max: capacity / 8,
        }
    }

    fn reserve(&self, budget: impl Fn(u32) -> u32) -> Option<u32> {
        let mut cur = self.head.load(Ordering::Acquire);
        loop {
            let (mut pos, mut generation) = unpack(cur);
            // Stall while too many reservations are uncommitted; keeps the
            // window the committers must close small.
            while pos.wrapping_sub(unpack(self.tail.load(Ordering::Relaxed)).0) > self.dis_max {
                hint::spin_loop();
                cur = self.head.load(Ordering::Acquire);
                (pos, generation) = unpack(cur);
            }
            if budget(pos) < 1 {
                return None;
            }
            match self.head.compare_exchange(
                cur,
                pack(pos.wrapping_add(1), generation.wrapping_add(1)),
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(pos),
                Err(current) => cur = current,
            }
        }
    }

    fn commit(&self, _pos: u32) {
        let mut cur = self.tail.load(Ordering::Acquire);
        loop {
            let (head_pos, head_gen) = unpack(self.head.load(Ordering::Relaxed));
            let (tail_pos, tail_gen) = unpack(cur);
            let next_gen = tail_gen.wrapping_add(1);
            // Once ours is the last outstanding reservation, close the gap
            // to the reservation frontier in one step.
            let next_pos = if next_gen == head_gen { head_pos } else { tail_pos };
            match self.tail.compare_exchange(
                cur,
                pack(next_pos, next_gen),
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(current) => cur = current,
            }
        }
    }

    #[inline]
    fn committed(&self) -> u32 {
        unpack(self.tail.load(Ordering::Acquire)).0
    }

    #[inline]
    fn reserved(&self) -> u32 {
        unpack(self.head.load(Ordering::Relaxed)).0
    }
}

// ---------------------------------------------------------------------
// Mode markers
// ---------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
}

/// Concurrency mode marker for [`crate::Ring`].
///
/// Sealed: the four modes below are the complete set.
pub trait Mode: sealed::Sealed + 'static {
    /// Cursor implementation used for both sides of the ring.
    type Side: Cursor;
    /// Default maximum number of producer handles.
    const MAX_PRODUCERS: u32;
    /// Default maximum number of consumer handles.
    const MAX_CONSUMERS: u32;
}

/// Single producer, single consumer.
pub struct Spsc;

/// Multi-producer/multi-consumer, independent tails committed in
/// reservation order.
pub struct Mpmc;

/// Multi-producer/multi-consumer, head-tail synchronised reservations.
pub struct MpmcHts;

/// Multi-producer/multi-consumer, relaxed tail sync with generation
/// counters.
pub struct MpmcRts;

impl sealed::Sealed for Spsc {}
impl Mode for Spsc {
    type Side = SpscCursor;
    const MAX_PRODUCERS: u32 = 1;
    const MAX_CONSUMERS: u32 = 1;
}

impl sealed::Sealed for Mpmc {}
impl Mode for Mpmc {
    type Side = MpmcCursor;
    const MAX_PRODUCERS: u32 = DescriptorCounter::UNLIMITED;
    const MAX_CONSUMERS: u32 = DescriptorCounter::UNLIMITED;
}

impl sealed::Sealed for MpmcHts {}
impl Mode for MpmcHts {
    type Side = HtsCursor;
    const MAX_PRODUCERS: u32 = DescriptorCounter::UNLIMITED;
    const MAX_CONSUMERS: u32 = DescriptorCounter::UNLIMITED;
}

impl sealed::Sealed for MpmcRts {}
impl Mode for MpmcRts {
    type Side = RtsCursor;
    const MAX_PRODUCERS: u32 = DescriptorCounter::UNLIMITED;
    const MAX_CONSUMERS: u32 = DescriptorCounter::UNLIMITED;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        for (hi, lo) in [(0, 0), (1, 0), (0, 1), (u32::MAX, 7), (42, u32::MAX)] {
            assert_eq!(unpack(pack(hi, lo)), (hi, lo));
        }
    }

    #[test]
    fn spsc_cursor_reserve_commit() {
        let cursor = SpscCursor::new(4);
        assert_eq!(cursor.reserve(|_| 1), Some(0));
        cursor.commit(0);
        assert_eq!(cursor.committed(), 1);
        assert_eq!(cursor.reserve(|_| 0), None);
        assert_eq!(cursor.reserved(), 1);
    }

    #[test]
    fn mpmc_cursor_commits_in_reservation_order() {
        let cursor = MpmcCursor::new(4);
        assert_eq!(cursor.reserve(|_| 2), Some(0));
        assert_eq!(cursor.reserve(|_| 2), Some(1));
        // In-order commits complete without waiting.
        cursor.commit(0);
        cursor.commit(1);
        assert_eq!(cursor.committed(), 2);
    }

    #[test]
    fn hts_cursor_resynchronises_on_commit() {
        let cursor = HtsCursor::new(4);
        assert_eq!(cursor.reserve(|_| 1), Some(0));
        cursor.commit(0);
        assert_eq!(cursor.committed(), 1);
        // The gate is open again: the next reservation proceeds.
        assert_eq!(cursor.reserve(|_| 1), Some(1));
        cursor.commit(1);
        assert_eq!(cursor.committed(), 2);
    }

    #[test]
    fn rts_cursor_snaps_tail_to_head() {
        let cursor = RtsCursor::new(64);
        assert_eq!(cursor.reserve(|_| 2), Some(0));
        assert_eq!(cursor.reserve(|_| 2), Some(1));
        // First commit bumps only the generation; the second closes the gap.
        cursor.commit(0);
        assert_eq!(cursor.committed(), 0);
        cursor.commit(1);
        assert_eq!(cursor.committed(), 2);
    }

    #[test]
    fn budget_exhaustion_returns_none() {
        let mpmc = MpmcCursor::new(4);
        assert_eq!(mpmc.reserve(|_| 0), None);
        let rts = RtsCursor::new(64);
        assert_eq!(rts.reserve(|_| 0), None);
        let hts = HtsCursor::new(4);
        assert_eq!(hts.reserve(|_| 0), None);
    }
}
