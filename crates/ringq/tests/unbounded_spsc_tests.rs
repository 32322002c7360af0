//! Integration tests for the unbounded SPSC linked queue.

mod common;

use std::thread;

use common::DtorCounter;
use ringq_rs::{Backoff, Fifo, QueueError, UnboundedSpscQueue};

const STREAM_LEN: u64 = 1 << 20;

#[test]
fn ordered_stream_across_threads() {
    let queue = UnboundedSpscQueue::<u64>::new();

    thread::scope(|scope| {
        let producer = queue.producer().unwrap();
        let consumer = queue.consumer().unwrap();

        scope.spawn(move || {
            for value in 0..STREAM_LEN {
                assert!(producer.push(value));
            }
        });

        scope.spawn(move || {
            let mut out = 0u64;
            for expected in 0..STREAM_LEN {
                let mut backoff = Backoff::new();
                while !consumer.pop(&mut out) {
                    backoff.wait();
                }
                assert_eq!(out, expected);
            }
        });
    });

    assert_eq!(queue.approximate_size(), 0);
}

/// The sentinel and every drained freelist node keep holding a payload;
/// nothing is destroyed early, everything is destroyed on drop.
#[test]
fn freelist_accounting() {
    let _guard = common::dtor_lock();
    assert_eq!(DtorCounter::live(), 0);
    {
        let queue = UnboundedSpscQueue::<DtorCounter>::new();
        for _ in 0..10 {
            assert!(queue.push(DtorCounter::new()));
        }
        // 10 queued plus the always-present sentinel payload.
        assert_eq!(DtorCounter::live(), 11);
        {
            let mut dummy = DtorCounter::new();
            assert!(queue.pop(&mut dummy));
            assert!(queue.pop(&mut dummy));
        }
        // Drained nodes linger on the freelist, payload included.
        assert_eq!(DtorCounter::live(), 11);
    }
    assert_eq!(DtorCounter::live(), 0);

    {
        let queue = UnboundedSpscQueue::<DtorCounter>::new();
        for _ in 0..3 {
            assert!(queue.push(DtorCounter::new()));
        }
        assert_eq!(DtorCounter::live(), 4);
        {
            let mut dummy = DtorCounter::new();
            assert!(queue.pop(&mut dummy));
        }
        assert_eq!(DtorCounter::live(), 4);
        // First push recycles the drained node (stale payload destroyed,
        // new one placed); the second allocates fresh.
        assert!(queue.push(DtorCounter::new()));
        assert_eq!(DtorCounter::live(), 4);
        assert!(queue.push(DtorCounter::new()));
        assert_eq!(DtorCounter::live(), 5);
    }
    assert_eq!(DtorCounter::live(), 0);
}

#[test]
fn approximate_size_tracks_push_pop() {
    let queue = UnboundedSpscQueue::<u32>::new();
    assert_eq!(queue.approximate_size(), 0);

    for i in 0..100 {
        queue.push(i);
    }
    assert_eq!(queue.approximate_size(), 100);

    let mut out = 0;
    for _ in 0..40 {
        assert!(queue.pop(&mut out));
    }
    assert_eq!(queue.approximate_size(), 60);
}

#[test]
fn handle_registration_is_capped_at_one_each() {
    let queue = UnboundedSpscQueue::<u32>::new();
    let _producer = queue.producer().unwrap();
    assert_eq!(
        queue.producer().err(),
        Some(QueueError::TooManyProducers { max: 1 })
    );
    let _consumer = queue.consumer().unwrap();
    assert_eq!(
        queue.consumer().err(),
        Some(QueueError::TooManyConsumers { max: 1 })
    );
}

#[test]
fn string_payloads_with_steady_state_recycling() {
    let queue = UnboundedSpscQueue::<String>::new();

    thread::scope(|scope| {
        let producer = queue.producer().unwrap();
        let consumer = queue.consumer().unwrap();

        scope.spawn(move || {
            for i in 0..(STREAM_LEN / 4) {
                assert!(producer.push(i.to_string()));
            }
        });

        scope.spawn(move || {
            let mut out = String::new();
            for expected in 0..(STREAM_LEN / 4) {
                let mut backoff = Backoff::new();
                while !consumer.pop(&mut out) {
                    backoff.wait();
                }
                assert_eq!(out, expected.to_string());
            }
        });
    });
}
