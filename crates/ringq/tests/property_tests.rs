//! Property-based tests: every queue is compared against a `VecDeque`
//! model under arbitrary single-threaded operation sequences. A bounded
//! FIFO that agrees with the model on every push result, pop result and
//! observer value cannot lose, duplicate or reorder elements.

use std::collections::VecDeque;

use proptest::prelude::*;
use ringq_rs::{BoundedSpscQueue, Mode, Mpmc, MpmcHts, MpmcRts, Ring, Spsc, UnboundedSpscQueue};

/// Drives a `Ring` and the model in lockstep. Single-threaded execution is
/// deterministic in every mode, so results must agree exactly.
fn check_ring_against_model<M: Mode>(ops: &[(bool, u64)]) {
    let ring = Ring::<u64, M, 16>::new();
    let mut model: VecDeque<u64> = VecDeque::new();
    let mut out = 0u64;

    for &(is_push, value) in ops {
        if is_push {
            let pushed = ring.push(value);
            assert_eq!(pushed, model.len() < 16, "push result diverged from model");
            if pushed {
                model.push_back(value);
            }
        } else {
            let popped = ring.pop(&mut out);
            assert_eq!(popped, !model.is_empty(), "pop result diverged from model");
            if popped {
                assert_eq!(Some(out), model.pop_front());
            }
        }
    }

    // Drain what is left; order must still match.
    while ring.pop(&mut out) {
        assert_eq!(Some(out), model.pop_front());
    }
    assert!(model.is_empty());
}

fn op_sequence() -> impl Strategy<Value = Vec<(bool, u64)>> {
    prop::collection::vec((any::<bool>(), any::<u64>()), 1..200)
}

proptest! {
    #[test]
    fn ring_spsc_matches_model(ops in op_sequence()) {
        check_ring_against_model::<Spsc>(&ops);
    }

    #[test]
    fn ring_mpmc_matches_model(ops in op_sequence()) {
        check_ring_against_model::<Mpmc>(&ops);
    }

    #[test]
    fn ring_hts_matches_model(ops in op_sequence()) {
        check_ring_against_model::<MpmcHts>(&ops);
    }

    #[test]
    fn ring_rts_matches_model(ops in op_sequence()) {
        check_ring_against_model::<MpmcRts>(&ops);
    }
}

proptest! {
    /// The bounded SPSC queue additionally exposes observers; all of them
    /// must agree with the model after every operation.
    #[test]
    fn bounded_spsc_matches_model(
        capacity in 1u32..=32,
        ops in op_sequence(),
    ) {
        let queue = BoundedSpscQueue::new(capacity).unwrap();
        let mut model: VecDeque<u64> = VecDeque::new();
        let mut out = 0u64;

        for &(is_push, value) in &ops {
            if is_push {
                let pushed = queue.push(value);
                prop_assert_eq!(pushed, model.len() < capacity as usize);
                if pushed {
                    model.push_back(value);
                }
            } else {
                let popped = queue.pop(&mut out);
                prop_assert_eq!(popped, !model.is_empty());
                if popped {
                    prop_assert_eq!(Some(out), model.pop_front());
                }
            }

            prop_assert_eq!(queue.approximate_size(), model.len());
            prop_assert_eq!(queue.is_empty(), model.is_empty());
            prop_assert_eq!(queue.is_full(), model.len() == capacity as usize);
            prop_assert_eq!(queue.front().copied(), model.front().copied());
        }
    }

    /// Full-signalling: C pushes fill a capacity-C queue, the next push is
    /// rejected, one pop reopens exactly one slot.
    #[test]
    fn bounded_spsc_full_signalling(capacity in 1u32..=64) {
        let queue = BoundedSpscQueue::new(capacity).unwrap();
        for i in 0..capacity {
            prop_assert!(queue.push(u64::from(i)));
        }
        prop_assert!(queue.is_full());
        prop_assert!(!queue.push(99));

        let mut out = 0u64;
        prop_assert!(queue.pop(&mut out));
        prop_assert_eq!(out, 0);
        prop_assert!(queue.push(99));
        prop_assert!(!queue.push(100));
        prop_assert_eq!(queue.approximate_size(), capacity as usize);
    }

    /// The unbounded queue accepts everything and replays it in order.
    #[test]
    fn unbounded_spsc_replays_in_order(values in prop::collection::vec(any::<u64>(), 0..200)) {
        let queue = UnboundedSpscQueue::new();
        for &value in &values {
            prop_assert!(queue.push(value));
        }
        prop_assert_eq!(queue.approximate_size(), values.len());

        let mut out = 0u64;
        for &expected in &values {
            prop_assert!(queue.pop(&mut out));
            prop_assert_eq!(out, expected);
        }
        prop_assert!(!queue.pop(&mut out));
    }
}
