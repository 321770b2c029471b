/// Represents the result of a non-blocking attempt to take an ID.
///
/// - [`IdGenStatus::Ready`] carries the next ID in emission order.
/// - [`IdGenStatus::Pending`] means nothing is buffered right now, either
///   because callers are outpacing the producer or because the worker's
///   sequence space for the day is exhausted.
///
/// # Example
///
/// ```
/// use dayflake::{DayflakeGenerator, IdGenStatus};
///
/// let generator = DayflakeGenerator::with_worker_id(1).unwrap();
/// let id = loop {
///     match generator.poll_id().unwrap() {
///         IdGenStatus::Ready { id } => break id,
///         IdGenStatus::Pending => std::thread::yield_now(),
///     }
/// };
/// assert_eq!(generator.decode(id).worker_id, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was taken and is ready to use.
    Ready {
        /// The generated ID.
        id: u64,
    },
    /// No ID is buffered. Retry after backing off.
    Pending,
}

/// Lifecycle state of a generator's sequence producer.
///
/// ```text
///  Filling --(sequence exhausted)--> DayExhausted
///  DayExhausted --(clock reports new day)--> Filling
///  Filling | DayExhausted --(close)--> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProducerState {
    /// Minting IDs and pushing them into the ring buffer (or waiting for room).
    Filling = 0,
    /// Waiting for the clock to report the next day.
    DayExhausted = 1,
    /// The producer thread has exited.
    Stopped = 2,
}

impl ProducerState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Filling,
            1 => Self::DayExhausted,
            _ => Self::Stopped,
        }
    }
}
