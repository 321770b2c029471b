use core::fmt;

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `dayflake` can emit.
///
/// Construction errors ([`Error::Config`], [`Error::WorkerIdSource`],
/// [`Error::Spawn`]) are fatal to startup and never retried internally. Once a
/// generator is running, callers see [`Error::Closed`] after a close and
/// [`Error::ProducerStopped`] if the producer thread died on its own.
///
/// Running out of sequence space for the current day is **not** an error. The
/// producer waits for the clock to report the next day, which callers observe
/// as back pressure.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The configuration was rejected at construction.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The generator has been closed and no longer serves IDs.
    #[error("generator is closed")]
    Closed,

    /// The worker ID source failed. There is no fallback worker ID.
    #[error("worker id source failed: {0}")]
    WorkerIdSource(#[source] Box<dyn core::error::Error + Send + Sync>),

    /// The OS refused to spawn the sequence producer thread.
    #[error("failed to spawn sequence producer: {0}")]
    Spawn(#[source] std::io::Error),

    /// The sequence producer thread panicked before it was joined.
    #[error("sequence producer panicked")]
    ProducerPanicked,

    /// The sequence producer exited without the generator being closed, so no
    /// further IDs will arrive. Call [`close`] to collect the cause.
    ///
    /// [`close`]: crate::DayflakeGenerator::close
    #[error("sequence producer stopped unexpectedly")]
    ProducerStopped,
}

/// Reasons a [`GeneratorConfig`] or its runtime inputs can be rejected.
///
/// [`GeneratorConfig`]: crate::GeneratorConfig
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ConfigError {
    /// A bit field was given a width of zero.
    #[error("`{field}` must be at least 1 bit wide")]
    ZeroWidth {
        /// Name of the offending field.
        field: BitField,
    },

    /// The three bit fields do not fit below the reserved sign bit.
    #[error("bit widths sum to {total}, exceeding the 63 available bits")]
    WidthOverflow {
        /// Sum of the configured widths.
        total: u32,
    },

    /// The ring buffer capacity is not an exact power of two.
    #[error("queue capacity {capacity} is not a power of two")]
    CapacityNotPowerOfTwo {
        /// Requested capacity.
        capacity: usize,
    },

    /// The ring buffer capacity is below the supported minimum.
    #[error("queue capacity {capacity} is below the minimum of {min}")]
    CapacityTooSmall {
        /// Requested capacity.
        capacity: usize,
        /// Smallest supported capacity.
        min: usize,
    },

    /// Randomized sequencing needs a positive upper bound.
    #[error("max random increment must be at least 1")]
    ZeroRandomIncrement,

    /// The initial sequence does not fit in the sequence field.
    #[error("initial sequence {initial} exceeds the maximum sequence {max}")]
    InitialSequenceOutOfRange {
        /// Configured initial sequence.
        initial: u64,
        /// Largest representable sequence.
        max: u64,
    },

    /// The worker ID source returned a value that does not fit the layout.
    #[error("worker id {worker_id} exceeds the maximum worker id {max}")]
    WorkerIdOutOfRange {
        /// Value returned by the source.
        worker_id: u64,
        /// Largest representable worker ID.
        max: u64,
    },

    /// The clock reports a time earlier than the configured epoch.
    #[error("clock reports {now_millis} ms, before the epoch at {epoch_millis} ms")]
    ClockBeforeEpoch {
        /// Current clock reading (ms since the Unix epoch).
        now_millis: u64,
        /// Configured epoch (ms since the Unix epoch).
        epoch_millis: u64,
    },

    /// The current day index does not fit in the day field.
    #[error("day index {day} exceeds the maximum day index {max}")]
    DayOutOfRange {
        /// Current day index.
        day: u64,
        /// Largest representable day index.
        max: u64,
    },
}

/// Identifies one of the three packed bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitField {
    /// Whole days since the epoch.
    DayIndex,
    /// Worker identity.
    WorkerId,
    /// Per-day sequence.
    Sequence,
}

impl fmt::Display for BitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DayIndex => "day_index_bits",
            Self::WorkerId => "worker_id_bits",
            Self::Sequence => "sequence_bits",
        })
    }
}
