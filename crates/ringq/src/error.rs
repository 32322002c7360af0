use thiserror::Error;

/// Error types for queue construction and handle registration.
///
/// Backpressure (full on `push`, empty on `pop`) is signalled by a `false`
/// return, never by an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Requested capacity is below the minimum of one element.
    #[error("queue capacity must be at least 1")]
    CapacityTooSmall,
    /// Too many producer handles registered on this queue.
    #[error("too many producers registered (max: {max})")]
    TooManyProducers {
        /// The configured maximum number of producers.
        max: u32,
    },
    /// Too many consumer handles registered on this queue.
    #[error("too many consumers registered (max: {max})")]
    TooManyConsumers {
        /// The configured maximum number of consumers.
        max: u32,
    },
}
