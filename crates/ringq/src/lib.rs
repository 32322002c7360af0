//! ringq — bounded and unbounded lock-free FIFO queues.
//!
//! Three queue families for in-process message passing between threads,
//! sharing one handle/registration surface:
//!
//! - [`BoundedSpscQueue`]: fixed-capacity single-producer single-consumer
//!   ring with `front`/`pop_front` inspection and occupancy observers
//! - [`UnboundedSpscQueue`]: linked SPSC queue with a per-queue node
//!   freelist that bounds allocator traffic
//! - [`Ring`]: bounded ring generic over four concurrency modes — [`Spsc`],
//!   [`Mpmc`] (independent tails, DPDK-style), [`MpmcHts`] (head-tail
//!   synchronised) and [`MpmcRts`] (relaxed tail sync with generation
//!   counters)
//!
//! Every `push`/`pop` is non-blocking: `false` means full (push) or empty
//! (pop), and waiting is the caller's choice (see [`Backoff`]). Queues hand
//! out scoped [`Producer`]/[`Consumer`] handles whose registration is
//! capped per mode — one of each for the SPSC flavours, unlimited for the
//! multi modes.
//!
//! # Example
//!
//! ```
//! use ringq_rs::{Fifo, Mpmc, Ring};
//!
//! let ring = Ring::<u64, Mpmc, 1024>::new();
//! let producer = ring.producer().unwrap();
//! let consumer = ring.consumer().unwrap();
//!
//! assert!(producer.push(7));
//!
//! let mut out = 0;
//! assert!(consumer.pop(&mut out));
//! assert_eq!(out, 7);
//! ```

mod backoff;
mod bounded;
mod cursor;
mod descriptor;
mod error;
mod invariants;
mod math;
mod ring;
mod slot;
mod unbounded;

pub use backoff::Backoff;
pub use bounded::BoundedSpscQueue;
pub use cursor::{Cursor, Mode, Mpmc, MpmcHts, MpmcRts, Spsc};
pub use descriptor::{Consumer, DescriptorCounter, Fifo, Producer};
pub use error::QueueError;
pub use ring::Ring;
pub use unbounded::UnboundedSpscQueue;
